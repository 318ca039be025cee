//! Scene graph storage and hierarchy.
//!
//! The graph is a pure data layer: an arena of nodes addressed by handle,
//! a registry of user-assigned ids, and the instance-edge overlay. It never
//! talks to the compilation scheduler itself — the engine routes every
//! mutation through the scheduler so the two cannot drift apart.
//!
//! # Hierarchy
//!
//! Nodes form a tree through parent/child handle lists rooted at a single
//! implicit group node. Instance edges overlay a DAG on that tree: an
//! instance node references a target subtree defined elsewhere (usually
//! under a `library` node), and the graph maintains the reverse map from
//! target to instancing nodes so the scheduler can invalidate every
//! instance of mutated shared content together.

use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::errors::{Result, TrellisError};
use crate::scene::{Node, NodeId, NodeKind, SceneId};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Arena-backed scene graph with id registry and instance edges.
pub struct SceneGraph {
    id: SceneId,
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,

    /// User-assigned id → handle.
    names: FxHashMap<String, NodeId>,

    /// Target node → set of instance nodes referencing it.
    instances_of: FxHashMap<NodeId, FxHashSet<NodeId>>,

    /// Target name → instance nodes still waiting for the target to appear.
    unresolved: FxHashMap<String, FxHashSet<NodeId>>,
}

impl SceneGraph {
    /// Creates an empty graph holding only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Group));
        Self {
            id: SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)),
            nodes,
            root,
            names: FxHashMap::default(),
            instances_of: FxHashMap::default(),
            unresolved: FxHashMap::default(),
        }
    }

    /// The process-unique id of this scene.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Handle of the implicit root node.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read-only node access.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable node access.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Resolves a user-assigned id to a handle.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Iterates all `(handle, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    // ========================================================================
    // Insertion & hierarchy
    // ========================================================================

    /// Inserts a node under `parent` (the root when `None`), registering its
    /// user-assigned id and any instance edge it carries.
    ///
    /// Fails with `DuplicateNodeId` if the id is taken, or `InstanceCycle`
    /// if the node is an instance whose target subtree reaches back to it.
    pub fn insert(&mut self, node: Node, parent: Option<NodeId>) -> Result<NodeId> {
        if let Some(name) = &node.name
            && self.names.contains_key(name)
        {
            return Err(TrellisError::DuplicateNodeId(name.clone()));
        }

        let name = node.name.clone();
        let is_instance = node.kind.is_instance();
        let id = self.nodes.insert(node);

        let parent = parent.unwrap_or(self.root);
        self.nodes[id].parent = Some(parent);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }

        if let Some(name) = name {
            self.names.insert(name.clone(), id);
            if let Err(err) = self.resolve_waiting_instances(&name, id) {
                self.remove_single(id);
                return Err(err);
            }
        }

        if is_instance
            && let Err(err) = self.register_instance_edge(id)
        {
            self.remove_single(id);
            return Err(err);
        }

        Ok(id)
    }

    /// Re-parents `child` under `parent`, keeping both sides consistent.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) {
        if child == parent || child == self.root {
            log::warn!("ignoring attach of {child:?} to {parent:?}");
            return;
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        } else {
            log::error!("attach target {parent:?} not found; re-rooting child");
            self.nodes[self.root].children.push(child);
            self.nodes[child].parent = Some(self.root);
            return;
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Unlinks `child` from its parent's child list.
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent)
            && let Some(pos) = p.children.iter().position(|&c| c == child)
        {
            p.children.remove(pos);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
    }

    /// Collects `id` and all its descendants in depth-first preorder.
    #[must_use]
    pub fn collect_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.nodes.get(cur) else {
                continue;
            };
            out.push(cur);
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Removes a single, already-detached node from the arena and scrubs it
    /// from every registry. Returns the node wrapper for pool recycling.
    pub fn remove_single(&mut self, id: NodeId) -> Option<Node> {
        self.detach(id);
        let node = self.nodes.remove(id)?;

        if let Some(name) = &node.name {
            self.names.remove(name);
            self.unresolved.remove(name);
        }

        // Drop edges where this node was the instancer...
        if node.kind.is_instance() {
            for targets in self.instances_of.values_mut() {
                targets.remove(&id);
            }
            self.instances_of.retain(|_, v| !v.is_empty());
            if let NodeKind::Instance { target } = &node.kind
                && let Some(waiting) = self.unresolved.get_mut(target)
            {
                waiting.remove(&id);
            }
        }
        // ...and where it was the target. Instances of a vanished target go
        // back to searching.
        if let Some(instancers) = self.instances_of.remove(&id)
            && let Some(name) = &node.name
        {
            self.unresolved
                .entry(name.clone())
                .or_default()
                .extend(instancers);
        }

        Some(node)
    }

    // ========================================================================
    // Instance edges
    // ========================================================================

    /// The set of instance nodes referencing `target`, if any.
    #[must_use]
    pub fn instancers_of(&self, target: NodeId) -> Option<&FxHashSet<NodeId>> {
        self.instances_of.get(&target)
    }

    /// Resolves an instance node's target to a handle, when the target has
    /// been defined.
    #[must_use]
    pub fn instance_target(&self, instance: NodeId) -> Option<NodeId> {
        match &self.nodes.get(instance)?.kind {
            NodeKind::Instance { target } => self.lookup(target),
            _ => None,
        }
    }

    /// Whether the instance node is still waiting for its target.
    #[must_use]
    pub fn instance_searching(&self, instance: NodeId) -> bool {
        match self.nodes.get(instance).map(|n| &n.kind) {
            Some(NodeKind::Instance { target }) => !self.names.contains_key(target.as_str()),
            _ => false,
        }
    }

    fn register_instance_edge(&mut self, instance: NodeId) -> Result<()> {
        let NodeKind::Instance { target } = &self.nodes[instance].kind else {
            return Ok(());
        };
        let target_name = target.clone();
        if let Some(target_id) = self.lookup(&target_name) {
            self.check_instance_cycle(instance, target_id, &target_name)?;
            self.instances_of.entry(target_id).or_default().insert(instance);
        } else {
            // Target not defined yet; the engine keeps recompiling the
            // instance at branch level until it resolves.
            self.unresolved
                .entry(target_name)
                .or_default()
                .insert(instance);
        }
        Ok(())
    }

    fn resolve_waiting_instances(&mut self, name: &str, target_id: NodeId) -> Result<()> {
        let Some(waiting) = self.unresolved.remove(name) else {
            return Ok(());
        };
        for instance in waiting {
            self.check_instance_cycle(instance, target_id, name)?;
            self.instances_of.entry(target_id).or_default().insert(instance);
        }
        Ok(())
    }

    /// Rejects instance edges whose target subtree (following nested,
    /// resolved instances) reaches the instance node itself.
    fn check_instance_cycle(&self, instance: NodeId, target_id: NodeId, target_name: &str) -> Result<()> {
        let mut visited = FxHashSet::default();
        let mut stack = vec![target_id];
        while let Some(cur) = stack.pop() {
            if cur == instance {
                let instance_name = self
                    .nodes
                    .get(instance)
                    .and_then(|n| n.name.clone())
                    .unwrap_or_else(|| format!("{instance:?}"));
                return Err(TrellisError::InstanceCycle {
                    instance: instance_name,
                    target: target_name.to_string(),
                });
            }
            if !visited.insert(cur) {
                continue;
            }
            let Some(node) = self.nodes.get(cur) else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            if node.kind.is_instance()
                && let Some(nested) = self.instance_target(cur)
            {
                stack.push(nested);
            }
        }
        Ok(())
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(kind: NodeKind, name: &str) -> Node {
        let mut node = Node::new(kind);
        node.name = Some(name.to_string());
        node
    }

    #[test]
    fn insert_under_root_by_default() {
        let mut graph = SceneGraph::new();
        let id = graph.insert(Node::default(), None).unwrap();
        assert_eq!(graph.node(id).unwrap().parent(), Some(graph.root()));
        assert!(graph.node(graph.root()).unwrap().children().contains(&id));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = SceneGraph::new();
        graph.insert(named(NodeKind::Group, "a"), None).unwrap();
        assert!(matches!(
            graph.insert(named(NodeKind::Group, "a"), None),
            Err(TrellisError::DuplicateNodeId(_))
        ));
    }

    #[test]
    fn instance_edge_resolves_forward_and_backward() {
        let mut graph = SceneGraph::new();

        // Backward reference: target already defined.
        let target = graph.insert(named(NodeKind::Group, "lib"), None).unwrap();
        let inst = graph
            .insert(
                Node::new(NodeKind::Instance {
                    target: "lib".to_string(),
                }),
                None,
            )
            .unwrap();
        assert!(graph.instancers_of(target).unwrap().contains(&inst));

        // Forward reference: instance first, target later.
        let inst2 = graph
            .insert(
                Node::new(NodeKind::Instance {
                    target: "later".to_string(),
                }),
                None,
            )
            .unwrap();
        assert!(graph.instance_searching(inst2));
        let later = graph.insert(named(NodeKind::Group, "later"), None).unwrap();
        assert!(graph.instancers_of(later).unwrap().contains(&inst2));
        assert!(!graph.instance_searching(inst2));
    }

    #[test]
    fn instance_cycle_is_rejected() {
        let mut graph = SceneGraph::new();
        let group = graph.insert(named(NodeKind::Group, "outer"), None).unwrap();
        // An instance of its own ancestor subtree would recurse forever.
        let mut inst = Node::new(NodeKind::Instance {
            target: "outer".to_string(),
        });
        inst.name = Some("self_ref".to_string());
        let err = graph.insert(inst, Some(group));
        assert!(matches!(err, Err(TrellisError::InstanceCycle { .. })));
    }

    #[test]
    fn subtree_collection_is_preorder() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Node::default(), None).unwrap();
        let b = graph.insert(Node::default(), Some(a)).unwrap();
        let c = graph.insert(Node::default(), Some(b)).unwrap();
        let d = graph.insert(Node::default(), Some(a)).unwrap();
        assert_eq!(graph.collect_subtree(a), vec![a, b, c, d]);
    }

    #[test]
    fn removing_target_reverts_instances_to_searching() {
        let mut graph = SceneGraph::new();
        let target = graph.insert(named(NodeKind::Group, "lib"), None).unwrap();
        let inst = graph
            .insert(
                Node::new(NodeKind::Instance {
                    target: "lib".to_string(),
                }),
                None,
            )
            .unwrap();
        graph.remove_single(target);
        assert!(graph.instance_searching(inst));
        assert!(graph.instancers_of(target).is_none());
    }
}
