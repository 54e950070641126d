//! # Slotgate Core
//!
//! Building blocks shared by the routing layer.
//!
//! ## Modules
//!
//! - [`command`] - Commands the proxy sends on its own behalf
//! - [`config`] - Router settings
//! - [`builder`] - Router builder

pub use crate::proto::error::{Error, Result};

/// Router builder.
pub mod builder;
/// Command construction helpers.
pub mod command;
/// Router configuration.
pub mod config;
