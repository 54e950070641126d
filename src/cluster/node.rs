//! CLUSTER NODES line parsing.
//!
//! Each line of a CLUSTER NODES dump describes one node:
//!
//! ```text
//! <id> <ip:port@cport> <flags> <master> <ping-sent> <pong-recv> <config-epoch> <link-state> <slot> <slot> ... <slot>
//! ```
//!
//! A [`Node`] lives only as long as it takes to fold its slots into a
//! [`TopologyStore`](super::TopologyStore).

use crate::cluster::slot::SLOT_COUNT;
use crate::core::{Error, Result};

/// Minimum number of space-separated fields in a node line.
const MIN_FIELDS: usize = 8;

/// Unique identifier for a Redis node in the cluster.
///
/// Node IDs are 40-character hex strings assigned by Redis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new NodeId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the node ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Effective role of a node.
///
/// Nodes in `handshake` are treated as masters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Serves slots.
    Master,
    /// Replicates a master; never owns slots in the routing table.
    Replica,
}

/// An inclusive range of hash slots.
///
/// Always holds at least one slot: `end` never precedes `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRange {
    start: u16,
    end: u16,
}

impl SlotRange {
    /// Creates a range, clamping `end` up to `start` when it is smaller.
    pub fn new(start: u16, end: u16) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// First slot (inclusive).
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Last slot (inclusive).
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Returns true if the given slot is within this range.
    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }

    /// Returns the number of slots in this range.
    pub fn len(&self) -> usize {
        usize::from(self.end.saturating_sub(self.start)) + 1
    }

    /// Always false: a range holds at least one slot.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over every slot in the range.
    pub fn slots(&self) -> std::ops::RangeInclusive<u16> {
        self.start..=self.end
    }

    /// Parses `N` or `N-M`.
    ///
    /// Returns `Ok(None)` for `[...]` migration markers, which carry no
    /// ownership.
    fn parse(token: &str) -> std::result::Result<Option<Self>, String> {
        if token.starts_with('[') {
            return Ok(None);
        }
        let (start, end) = match token.split_once('-') {
            Some((start, end)) => (parse_slot(start)?, parse_slot(end)?),
            None => {
                let slot = parse_slot(token)?;
                (slot, slot)
            }
        };
        Ok(Some(Self::new(start, end)))
    }
}

fn parse_slot(token: &str) -> std::result::Result<u16, String> {
    match token.parse::<u16>() {
        Ok(slot) if slot < SLOT_COUNT => Ok(slot),
        _ => Err(format!("invalid slot '{}'", token)),
    }
}

/// One node parsed from a CLUSTER NODES line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Node ID.
    pub id: NodeId,
    /// `host:port`, with any `@cport` bus suffix removed. The host is empty
    /// when the node does not know its own address yet.
    pub address: String,
    /// Effective role.
    pub role: Role,
    /// The line describes the node the dump was fetched from.
    pub myself: bool,
    /// The link state field reads `connected`.
    pub connected: bool,
    /// Master this node replicates, if any.
    pub master_id: Option<NodeId>,
    /// Slots served. Always empty for replicas.
    pub slots: Vec<SlotRange>,
}

impl Node {
    /// Parses one line of a CLUSTER NODES dump.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTopologyLine`] if the line has fewer than 8
    /// fields, carries no role flag, or has an unparseable slot token.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotgate::cluster::{Node, Role};
    ///
    /// let line = "07c37dfeb235213a872192d90877d0cd55635b91 127.0.0.1:30004@31004 \
    ///             myself,master - 0 1426238317239 4 connected 0-5460";
    /// let node = Node::parse(line).unwrap();
    /// assert_eq!(node.address, "127.0.0.1:30004");
    /// assert_eq!(node.role, Role::Master);
    /// assert!(node.myself);
    /// assert!(node.owns_slots());
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedTopologyLine {
            line: line.to_string(),
            reason,
        };

        let fields: Vec<&str> = line
            .trim_end_matches(['\r', '\n'])
            .split(' ')
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() < MIN_FIELDS {
            return Err(malformed(format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            )));
        }

        let mut role = None;
        let mut myself = false;
        for flag in fields[2].split(',') {
            match flag {
                "myself" => myself = true,
                "master" | "handshake" => role = Some(Role::Master),
                "slave" | "replica" => role = Some(Role::Replica),
                _ => {}
            }
        }
        let role = role.ok_or_else(|| malformed(format!("no role in flags '{}'", fields[2])))?;

        let master_id = match fields[3] {
            "-" => None,
            id => Some(NodeId::new(id)),
        };

        let connected = fields[7].eq_ignore_ascii_case("connected");

        let mut slots = Vec::new();
        if role == Role::Master {
            for token in &fields[MIN_FIELDS..] {
                if let Some(range) = SlotRange::parse(token).map_err(malformed)? {
                    slots.push(range);
                }
            }
        }

        Ok(Self {
            id: NodeId::new(fields[0]),
            address: strip_bus_port(fields[1]).to_string(),
            role,
            myself,
            connected,
            master_id,
            slots,
        })
    }

    /// Returns true if this node's slots belong in the routing table.
    pub fn owns_slots(&self) -> bool {
        self.role == Role::Master && self.connected
    }

    /// Returns true if the address has no host part (`:7000`).
    pub fn has_empty_host(&self) -> bool {
        self.address.starts_with(':')
    }
}

/// `10.0.0.1:6379@16379,host.example` → `10.0.0.1:6379`.
fn strip_bus_port(address: &str) -> &str {
    match address.find(['@', ',']) {
        Some(end) => &address[..end],
        None => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 127.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-5460";
    const REPLICA: &str = "67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1 127.0.0.1:7003@17003 slave e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 0 1426238316232 1 connected";

    #[test]
    fn test_parse_master_line() {
        let node = Node::parse(MASTER).unwrap();
        assert_eq!(node.id.as_str(), "e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca");
        assert_eq!(node.address, "127.0.0.1:7000");
        assert_eq!(node.role, Role::Master);
        assert!(node.myself);
        assert!(node.connected);
        assert_eq!(node.master_id, None);
        assert_eq!(node.slots, vec![SlotRange::new(0, 5460)]);
        assert!(node.owns_slots());
    }

    #[test]
    fn test_parse_replica_line() {
        let node = Node::parse(REPLICA).unwrap();
        assert_eq!(node.role, Role::Replica);
        assert!(!node.myself);
        assert_eq!(
            node.master_id,
            Some(NodeId::new("e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca"))
        );
        assert!(node.slots.is_empty());
        assert!(!node.owns_slots());
    }

    #[test]
    fn test_handshake_is_master() {
        let node = Node::parse("abc 127.0.0.1:7005 handshake - 0 0 0 connected 100").unwrap();
        assert_eq!(node.role, Role::Master);
        assert_eq!(node.slots, vec![SlotRange::new(100, 100)]);
    }

    #[test]
    fn test_disconnected_master_owns_nothing() {
        let node = Node::parse("abc 127.0.0.1:7001 master - 0 0 2 disconnected 5461-10922").unwrap();
        assert!(!node.connected);
        assert_eq!(node.slots.len(), 1);
        assert!(!node.owns_slots());
    }

    #[test]
    fn test_link_state_case_insensitive() {
        let node = Node::parse("abc 127.0.0.1:7001 master - 0 0 2 CONNECTED 1").unwrap();
        assert!(node.connected);
    }

    #[test]
    fn test_multiple_ranges_and_clamp() {
        let node = Node::parse("abc 127.0.0.1:7002 master - 0 0 3 connected 0-10 20 40-30").unwrap();
        assert_eq!(
            node.slots,
            vec![
                SlotRange::new(0, 10),
                SlotRange::new(20, 20),
                SlotRange::new(40, 40),
            ]
        );
    }

    #[test]
    fn test_migration_markers_ignored() {
        let node = Node::parse(
            "abc 127.0.0.1:7002 master - 0 0 3 connected 0-10 [11->-def] [12-<-def]",
        )
        .unwrap();
        assert_eq!(node.slots, vec![SlotRange::new(0, 10)]);
    }

    #[test]
    fn test_short_line_rejected() {
        let err = Node::parse("abc 127.0.0.1:7000 master - 0 0 1").unwrap_err();
        assert!(matches!(err, Error::MalformedTopologyLine { .. }));
        assert!(err.to_string().contains("found 7"));
    }

    #[test]
    fn test_bad_slot_rejected() {
        assert!(Node::parse("abc 127.0.0.1:7000 master - 0 0 1 connected 0-x").is_err());
        assert!(Node::parse("abc 127.0.0.1:7000 master - 0 0 1 connected 16384").is_err());
    }

    #[test]
    fn test_no_role_rejected() {
        assert!(Node::parse("abc 127.0.0.1:7000 noaddr - 0 0 1 connected 0").is_err());
    }

    #[test]
    fn test_address_suffixes_stripped() {
        assert_eq!(strip_bus_port("10.0.0.1:6379@16379"), "10.0.0.1:6379");
        assert_eq!(strip_bus_port("10.0.0.1:6379@16379,node-a"), "10.0.0.1:6379");
        assert_eq!(strip_bus_port("10.0.0.1:6379"), "10.0.0.1:6379");
    }

    #[test]
    fn test_empty_host() {
        let node = Node::parse("abc :7000@17000 myself,master - 0 0 1 connected 0-16383").unwrap();
        assert_eq!(node.address, ":7000");
        assert!(node.has_empty_host());
    }

    #[test]
    fn test_trailing_carriage_return() {
        let node = Node::parse("abc 127.0.0.1:7000 master - 0 0 1 connected 5\r").unwrap();
        assert_eq!(node.slots, vec![SlotRange::new(5, 5)]);
    }

    #[test]
    fn test_slot_range_helpers() {
        let range = SlotRange::new(0, 100);
        assert!(range.contains(0));
        assert!(range.contains(100));
        assert!(!range.contains(101));
        assert_eq!(range.len(), 101);
        assert_eq!(range.slots().count(), 101);
        assert!(!range.is_empty());
        assert_eq!((range.start(), range.end()), (0, 100));
    }

    #[test]
    fn test_reversed_slot_range_holds_one_slot() {
        let range = SlotRange::new(40, 10);
        assert_eq!((range.start(), range.end()), (40, 40));
        assert_eq!(range.len(), 1);
        assert_eq!(range.slots().collect::<Vec<_>>(), vec![40]);
        assert!(!range.contains(10));
    }
}
