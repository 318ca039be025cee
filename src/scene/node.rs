//! A single scene graph element.
//!
//! # Design Principles
//!
//! - Nodes are small wrappers stored contiguously in the graph's arena;
//!   everything heavyweight (matrices, mesh data, texture layers) lives in a
//!   shared, reference-counted state core.
//! - Hierarchy links are arena handles, never owning pointers, so parent and
//!   child references cannot form ownership cycles.
//! - The `dirty` / `branch_dirty` / `instanced` flags are maintained by the
//!   compilation scheduler; user code reads them but never writes them.

use crate::core::CoreId;
use crate::scene::{NodeId, NodeKind};

/// A single node in a [`SceneGraph`](crate::scene::SceneGraph).
#[derive(Debug, Clone)]
pub struct Node {
    /// User-assigned id, unique within the graph and stable for the node's
    /// lifetime. Nodes without one are addressed by handle only.
    pub(crate) name: Option<String>,

    /// Kind tag deciding attribute handling and compilation levels.
    pub kind: NodeKind,

    /// The shared state core this node owns a reference on, if any.
    pub core: Option<CoreId>,

    // === Hierarchy ===
    /// Parent handle (`None` for the scene root).
    pub(crate) parent: Option<NodeId>,
    /// Ordered child handles.
    pub(crate) children: Vec<NodeId>,

    // === Compilation state (written by the scheduler) ===
    /// This node needs recompilation during the next pass.
    pub dirty: bool,
    /// This node's entire subtree needs recompilation during the next pass.
    pub branch_dirty: bool,
    /// This node is reachable through an instance edge. Recorded during
    /// traversal; consulted when promoting compilation levels.
    pub instanced: bool,

    /// Cleared when the node is scheduled for destruction, so late resource
    /// deliveries can be discarded.
    pub(crate) alive: bool,
}

impl Node {
    /// Creates a fresh node of the given kind, unbound to any core.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            core: None,
            parent: None,
            children: Vec::new(),
            dirty: false,
            branch_dirty: false,
            instanced: false,
            alive: true,
        }
    }

    /// Creates a fresh node carrying a user-assigned id.
    #[must_use]
    pub fn named(kind: NodeKind, name: &str) -> Self {
        let mut node = Self::new(kind);
        node.name = Some(name.to_string());
        node
    }

    /// Returns the user-assigned id, if any.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns a read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node is still live (not scheduled for destruction).
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Resets the wrapper to a pristine state for pool reuse.
    ///
    /// A recycled node must be indistinguishable from a freshly allocated
    /// one: no stale core reference, no leftover hierarchy links, no flags.
    pub(crate) fn reset(&mut self) {
        self.name = None;
        self.kind = NodeKind::Group;
        self.core = None;
        self.parent = None;
        self.children.clear();
        self.dirty = false;
        self.branch_dirty = false;
        self.instanced = false;
        self.alive = true;
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeKind::Group)
    }
}
