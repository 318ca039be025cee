//! Node mutation entry point.
//!
//! All user-visible mutation goes through a [`NodeSelector`], which applies
//! the change to the node's shared state core and notifies the compilation
//! scheduler with the identical `(op, attr)` tuple. Mutating core payloads
//! any other way would leave the draw list stale — there is deliberately no
//! public mutable access to core data.

use serde_json::Value;

use crate::engine::Engine;
use crate::errors::Result;
use crate::scene::{NodeId, NodeKind, NodeSpec, Op};

/// Borrowed handle for mutating one node.
pub struct NodeSelector<'a> {
    engine: &'a mut Engine,
    node: NodeId,
}

impl<'a> NodeSelector<'a> {
    pub(crate) fn new(engine: &'a mut Engine, node: NodeId) -> Self {
        Self { engine, node }
    }

    /// The selected node's handle.
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// The selected node's kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.engine
            .graph()
            .node(self.node)
            .map_or(NodeKind::Group, |n| n.kind.clone())
    }

    /// Replaces an attribute value.
    pub fn set(&mut self, attr: &str, value: impl Into<Value>) -> Result<()> {
        self.engine.apply(self.node, Op::Set, attr, &value.into())
    }

    /// Appends to a collection attribute.
    pub fn add(&mut self, attr: &str, value: impl Into<Value>) -> Result<()> {
        self.engine.apply(self.node, Op::Add, attr, &value.into())
    }

    /// Increments a numeric attribute.
    pub fn inc(&mut self, attr: &str, value: impl Into<Value>) -> Result<()> {
        self.engine.apply(self.node, Op::Inc, attr, &value.into())
    }

    /// Removes from a collection attribute.
    pub fn remove(&mut self, attr: &str, value: impl Into<Value>) -> Result<()> {
        self.engine.apply(self.node, Op::Remove, attr, &value.into())
    }

    /// Adds a child subtree under the selected node.
    pub fn add_child(&mut self, spec: &NodeSpec) -> Result<NodeId> {
        self.engine.add_node(self.node, spec)
    }

    /// Schedules a child subtree for destruction.
    pub fn remove_child(&mut self, child: NodeId) -> Result<()> {
        self.engine.destroy_node(child)
    }
}
