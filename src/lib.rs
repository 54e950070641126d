//! # Slotgate
//!
//! Sans-IO routing core for a Redis Cluster proxy. It decodes RESP frames
//! from client and backend byte streams, classifies commands by where they
//! keep their keys, maps keys to hash slots, tracks which node owns each
//! slot and follows `MOVED`/`ASK`/`TRYAGAIN` redirects. Sockets, pooling and
//! timers belong to the caller.
//!
//! ## Features
//!
//! - `json` - Load [`RouterConfig`](core::config::RouterConfig) from JSON
//!
//! ## Example
//!
//! ```
//! use slotgate::cluster::Action;
//! use slotgate::Router;
//!
//! let router = Router::builder().seed("127.0.0.1:7000").build().unwrap();
//! let mut client = router.decoder();
//! client.append(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n");
//!
//! let mut request = router.accept("backend", &mut client).unwrap().unwrap();
//! // Nothing is known about "backend" yet: fetch its topology first.
//! assert!(matches!(request.start(), Action::Bootstrap { .. }));
//! ```

#![warn(missing_docs)]

pub mod cluster;
pub mod command;
pub mod core;
pub mod proto;

#[cfg(test)]
mod stress;

pub use crate::cluster::{key_slot, Router, TopologyStore};
pub use crate::core::builder::RouterBuilder;
pub use crate::core::{Error, Result};
