//! # Slotgate Proto
//!
//! RESP (Redis Serialization Protocol) framing for the proxy core.
//!
//! ## Modules
//!
//! - [`codec`] - Frame completeness checks, streaming decoder and encoder
//! - [`error`] - Error types shared by the whole crate
//! - [`frame`] - Frame types representing RESP data structures

pub mod codec;
/// Error types.
pub mod error;
pub mod frame;
