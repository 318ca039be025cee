//! Node wrapper recycling.
//!
//! Generator-style content (particle emitters, streaming tiles) creates and
//! destroys nodes in hot loops; pooling the wrapper objects keeps that off
//! the allocator. Pooling has no bearing on correctness beyond one rule: a
//! pooled wrapper must be fully reset before reuse — no stale core
//! reference, no leftover hierarchy links, no flags.

use crate::core::CoreId;
use crate::scene::{Node, NodeKind};

/// Creates node wrappers, recycling released ones.
pub struct NodeFactory {
    pool: Vec<Node>,
    created: u64,
    recycled: u64,
}

impl NodeFactory {
    /// Creates a factory with an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: Vec::new(),
            created: 0,
            recycled: 0,
        }
    }

    /// Builds a node wrapper of the given kind, bound to `core`, pulling
    /// from the free pool when possible.
    pub fn create(&mut self, name: Option<String>, kind: NodeKind, core: Option<CoreId>) -> Node {
        let mut node = match self.pool.pop() {
            Some(mut pooled) => {
                pooled.reset();
                self.recycled += 1;
                pooled
            }
            None => {
                self.created += 1;
                Node::default()
            }
        };
        node.name = name;
        node.kind = kind;
        node.core = core;
        node
    }

    /// Returns a fully detached wrapper to the pool.
    ///
    /// The caller must already have released the node's core and destroyed
    /// its children; a wrapper that still references either is a bug.
    pub fn release(&mut self, mut node: Node) {
        debug_assert!(node.core.is_none(), "released node still references a core");
        debug_assert!(node.children.is_empty(), "released node still has children");
        node.reset();
        self.pool.push(node);
    }

    /// Wrappers currently waiting in the pool.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    /// Lifetime counters: `(fresh allocations, pool reuses)`.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.created, self.recycled)
    }
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new()
    }
}
