//! Commands the proxy issues to cluster nodes on its own behalf.

use bytes::{Bytes, BytesMut};

use crate::core::command::Cmd;

/// Creates a CLUSTER NODES command.
///
/// Returns a bulk string listing all nodes in the cluster with their ID,
/// address, flags, master/replica status, link state and slots served.
pub fn cluster_nodes() -> Cmd {
    Cmd::new("CLUSTER").arg("NODES")
}

/// Creates an ASKING command.
///
/// Used before retrying a command that received an ASK redirect.
/// ASKING is a one-time flag - it only affects the immediately following command.
pub fn asking() -> Cmd {
    Cmd::new("ASKING")
}

/// Prepends `ASKING` to an already-encoded request.
///
/// Both commands must go out on the same connection, in this order.
pub fn with_asking(request: &[u8]) -> Bytes {
    let asking = asking().encode();
    let mut buf = BytesMut::with_capacity(asking.len() + request.len());
    buf.extend_from_slice(&asking);
    buf.extend_from_slice(request);
    buf.freeze()
}
