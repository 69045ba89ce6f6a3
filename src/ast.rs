use std::sync::atomic::{AtomicU32, Ordering};

/// Stable identity for a single AST node, assigned once at parse time.
/// The resolver's side table keys on this instead of pointer identity: a
/// node that participates in name resolution (`Variable`, `Assign`, `This`,
/// `Super`) carries one and never recomputes it.
pub type NodeId = u32;

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);

pub fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}
