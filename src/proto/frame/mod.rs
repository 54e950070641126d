//! RESP frame types.
//!
//! [`Frame`] is the owned tree the proxy builds for outgoing data, while
//! [`RawFrame`] describes a complete frame found inside a receive buffer
//! without copying it.

/// Frame type definitions.
pub mod types;

pub use types::{Frame, FrameKind, RawFrame};
