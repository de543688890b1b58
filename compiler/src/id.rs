// id.rs: Stable node identity for IR trees
//
// Every node receives a `NodeId` when it is constructed. Identity is the
// handle, not the content: two structurally identical subtrees (e.g. two
// states with the same name) keep distinct ids, and metadata tables key on
// these ids instead of on node addresses.
//
// Ids are allocated from a process-wide monotonic counter so they are never
// reused; a metadata entry keyed by a discarded node can only miss, never
// alias a newer node.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Stable identifier of a node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u64);

static NEXT_NODE: AtomicU64 = AtomicU64::new(0);

impl NodeId {
    /// Allocate a fresh id. Ids increase in allocation order.
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
