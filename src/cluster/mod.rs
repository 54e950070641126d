//! # Slotgate Cluster
//!
//! Redis Cluster routing: slot hashing, topology tracking, request
//! interpretation and redirect handling.
//!
//! ## Features
//!
//! - **Slot hashing**: CRC-16/XMODEM with `{...}` hash tags
//! - **Topology discovery**: Parses CLUSTER NODES dumps into a slot map
//! - **Redirect handling**: Follows MOVED, ASK and TRYAGAIN with a retry ceiling
//! - **Multi-key grouping**: Splits MGET/DEL/MSET keys into per-slot groups
//!
//! ## Example
//!
//! ```
//! use slotgate::cluster::{key_slot, TopologyStore};
//!
//! let store = TopologyStore::new();
//! store
//!     .replace_all("backend", "abc 127.0.0.1:7000 master - 0 0 1 connected 0-8191\n\
//!                              def 127.0.0.1:7001 master - 0 0 2 connected 8192-16383\n")
//!     .unwrap();
//!
//! let slot = key_slot(b"foo");
//! assert_eq!(slot, 12182);
//! assert_eq!(store.lookup("backend", slot).as_deref(), Some("127.0.0.1:7001"));
//! ```

pub mod commands;
mod errors;
mod node;
mod request;
mod router;
mod slot;
mod topology;

pub use errors::{interpret_reply, parse_redis_error, ErrorKind, Redirection};
pub use node::{Node, NodeId, Role, SlotRange};
pub use request::{interpret, Request, SlotGroup};
pub use router::{Action, InFlight, Router, State};
pub use slot::{crc16, key_slot, SLOT_COUNT};
pub use topology::{ReplaceSummary, TopologyStore};
