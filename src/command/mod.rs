//! Command classification.
//!
//! Maps a command name to a [`CommandId`] and its [`CommandShape`], the
//! position of the keys a request carries. Lookup is case-insensitive and
//! never allocates.
//!
//! # Example
//!
//! ```
//! use slotgate::command::{classify, shape_of, CommandId, CommandShape};
//!
//! let id = classify(b"mget");
//! assert_eq!(id, CommandId::Mget);
//! assert_eq!(shape_of(id), Some(CommandShape::MultiKey));
//! assert_eq!(classify(b"FLUSHALL"), CommandId::Unknown);
//! ```

mod shape;
mod table;

pub use shape::CommandShape;
pub use table::{classify, shape_of, CommandId};
