//! Slot ownership per cluster.
//!
//! A [`TopologyStore`] maps cluster name → slot → node address. It is
//! populated in bulk from a CLUSTER NODES dump and patched one slot at a time
//! when a node answers `MOVED`.
//!
//! Each cluster sits behind its own reader-writer lock, so lookups for
//! different clusters never contend and a replace only blocks readers of the
//! cluster being replaced, for as long as a pointer swap takes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::cluster::node::Node;
use crate::cluster::slot::SLOT_COUNT;
use crate::core::{Error, Result};

/// Slot table of one cluster.
#[derive(Debug)]
struct ClusterSlots {
    /// Indexed by slot; `None` means no known owner.
    owners: Vec<Option<Arc<str>>>,
    /// Distinct master addresses, in dump order.
    nodes: Vec<Arc<str>>,
    /// Set by the first successful replace.
    populated: bool,
}

impl ClusterSlots {
    fn empty() -> Self {
        Self {
            owners: vec![None; usize::from(SLOT_COUNT)],
            nodes: Vec::new(),
            populated: false,
        }
    }

    /// Returns the shared copy of `address`, registering it if new.
    fn intern(&mut self, address: &str) -> Arc<str> {
        if let Some(existing) = self.nodes.iter().find(|n| n.as_ref() == address) {
            return existing.clone();
        }
        let address: Arc<str> = Arc::from(address);
        self.nodes.push(address.clone());
        address
    }
}

/// Counts reported by [`TopologyStore::replace_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Node lines parsed.
    pub nodes: usize,
    /// Connected masters whose slots were recorded.
    pub masters: usize,
    /// Slots with an owner after the replace.
    pub slots: usize,
    /// Lines skipped as malformed.
    pub skipped: usize,
}

/// Process-wide slot → node map, keyed by cluster name.
///
/// Clusters are created empty on first reference and never removed.
///
/// # Example
///
/// ```
/// use slotgate::cluster::TopologyStore;
///
/// let store = TopologyStore::new();
/// assert!(store.bootstrap_needed("backend"));
///
/// store
///     .replace_all("backend", "abc 127.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-16383\n")
///     .unwrap();
/// assert!(!store.bootstrap_needed("backend"));
/// assert_eq!(store.lookup("backend", 42).as_deref(), Some("127.0.0.1:7000"));
///
/// store.patch_one("backend", 42, "127.0.0.1:7001");
/// assert_eq!(store.lookup("backend", 42).as_deref(), Some("127.0.0.1:7001"));
/// ```
#[derive(Debug, Default)]
pub struct TopologyStore {
    clusters: RwLock<HashMap<String, Arc<RwLock<ClusterSlots>>>>,
}

impl TopologyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot table of `cluster`, creating it on first reference.
    fn cluster(&self, cluster: &str) -> Arc<RwLock<ClusterSlots>> {
        if let Some(slots) = self.clusters.read().get(cluster) {
            return slots.clone();
        }
        self.clusters
            .write()
            .entry(cluster.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(ClusterSlots::empty())))
            .clone()
    }

    /// Returns the address of the node owning `slot`, if known.
    pub fn lookup(&self, cluster: &str, slot: u16) -> Option<Arc<str>> {
        let slots = self.cluster(cluster);
        let guard = slots.read();
        guard.owners.get(usize::from(slot)).cloned().flatten()
    }

    /// Returns true if `cluster` has never been populated.
    pub fn bootstrap_needed(&self, cluster: &str) -> bool {
        !self.cluster(cluster).read().populated
    }

    /// Returns every master address known for `cluster`, in dump order,
    /// followed by addresses learned from `MOVED`.
    pub fn nodes(&self, cluster: &str) -> Vec<Arc<str>> {
        self.cluster(cluster).read().nodes.clone()
    }

    /// Returns the number of slots of `cluster` that have an owner.
    pub fn covered_slots(&self, cluster: &str) -> usize {
        self.cluster(cluster)
            .read()
            .owners
            .iter()
            .filter(|owner| owner.is_some())
            .count()
    }

    /// Replaces the whole slot table of `cluster` with the contents of a
    /// CLUSTER NODES dump.
    ///
    /// See [`replace_all_from`](Self::replace_all_from).
    pub fn replace_all(&self, cluster: &str, dump: &str) -> Result<ReplaceSummary> {
        self.replace_all_from(cluster, dump, None)
    }

    /// Replaces the whole slot table of `cluster` with the contents of a
    /// CLUSTER NODES dump fetched from `origin`.
    ///
    /// Malformed lines are logged and skipped. Only connected masters (and
    /// nodes in handshake) contribute slots. Addresses with an empty host
    /// take the host of `origin`. The new table is built aside and swapped
    /// in under the write lock, so readers see either the old table or the
    /// new one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTopology`] if no line could be parsed; the
    /// previous table is kept.
    #[instrument(skip(self, dump), level = "debug")]
    pub fn replace_all_from(
        &self,
        cluster: &str,
        dump: &str,
        origin: Option<&str>,
    ) -> Result<ReplaceSummary> {
        let mut fresh = ClusterSlots::empty();
        let mut summary = ReplaceSummary::default();

        for line in dump.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let node = match Node::parse(line) {
                Ok(node) => node,
                Err(e) => {
                    warn!(cluster, error = %e, "skipping topology line");
                    summary.skipped += 1;
                    continue;
                }
            };
            summary.nodes += 1;

            if !node.owns_slots() {
                continue;
            }
            summary.masters += 1;

            let address = match (node.has_empty_host(), origin) {
                (true, Some(origin)) => resolve_host(&node.address, origin),
                _ => node.address.clone(),
            };
            let address = fresh.intern(&address);
            for range in &node.slots {
                for slot in range.slots() {
                    fresh.owners[usize::from(slot)] = Some(address.clone());
                }
            }
        }

        if summary.nodes == 0 {
            return Err(Error::EmptyTopology {
                cluster: cluster.to_string(),
            });
        }

        summary.slots = fresh.owners.iter().filter(|owner| owner.is_some()).count();
        fresh.populated = true;

        let slots = self.cluster(cluster);
        *slots.write() = fresh;

        info!(
            cluster,
            nodes = summary.nodes,
            masters = summary.masters,
            slots = summary.slots,
            skipped = summary.skipped,
            "topology replaced"
        );
        Ok(summary)
    }

    /// Points a single slot of `cluster` at `address`.
    ///
    /// Called when a node answers `MOVED`. Slots outside `0..16384` are
    /// ignored.
    pub fn patch_one(&self, cluster: &str, slot: u16, address: &str) {
        if slot >= SLOT_COUNT {
            warn!(cluster, slot, "ignoring patch for out-of-range slot");
            return;
        }
        let slots = self.cluster(cluster);
        let mut guard = slots.write();
        let address = guard.intern(address);
        debug!(cluster, slot, node = %address, "slot patched");
        guard.owners[usize::from(slot)] = Some(address);
    }
}

/// `:7004` fetched from `10.0.0.5:7000` → `10.0.0.5:7004`.
fn resolve_host(address: &str, origin: &str) -> String {
    let host = origin.rsplit_once(':').map_or(origin, |(host, _)| host);
    format!("{}{}", host, address)
}
