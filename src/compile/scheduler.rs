//! The incremental compilation scheduler.
//!
//! # Overview
//!
//! Every node mutation is reported here through [`Scheduler::notify`], which
//! resolves a [`CompileLevel`] for the mutation and enqueues a directive on
//! the owning scene's priority queue. Once per frame, before traversal,
//! [`Scheduler::schedule_compilations`] flushes the queue — coarsest
//! directives first — into per-node dirty state. During the traversal the
//! scheduler answers, via [`Scheduler::pre_visit`] and
//! [`Scheduler::needs_descend`], exactly which nodes must be revisited, so
//! an unchanged subtree costs nothing.
//!
//! # Instancing
//!
//! A node reachable through an instance edge has its compiled representation
//! relocated under the instance site during traversal, so narrow
//! invalidations on it would miss that relocation: `Node` and `Subtree`
//! requests on instanced nodes are promoted to `Branch`. Symmetrically, when
//! a dirty path crosses a node that is the target of instance edges, every
//! instancing node is flagged for full descent and its own path flagged
//! dirty, which keeps all instances of shared content consistent.
//!
//! # Scenes
//!
//! Per-scene state lives in an explicit registry keyed by [`SceneId`];
//! scenes are registered at construction and unregistered at teardown.
//! Scenes share nothing, so several engines can interleave on one thread.

use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::compile::{CompileLevel, config};
use crate::scene::{NodeId, Op, SceneGraph, SceneId};

/// An ephemeral directive to recompile part of the scene relative to a node.
#[derive(Debug, Clone)]
pub struct CompilationRequest {
    /// The mutated node.
    pub node: NodeId,
    /// The operation that triggered the request.
    pub op: Op,
    /// The mutated attribute.
    pub attr: String,
    /// Resolved compilation level.
    pub level: CompileLevel,
    /// Queue priority; coarser levels flush first.
    pub priority: CompileLevel,
}

impl PartialEq for CompilationRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for CompilationRequest {}

impl PartialOrd for CompilationRequest {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompilationRequest {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap pops the numerically lowest (most general) level first.
        other.priority.cmp(&self.priority)
    }
}

/// Per-scene dirty-tracking state.
///
/// Created when the scene is registered, cleared (not destroyed) after each
/// successful compilation pass, destroyed when the scene is torn down.
#[derive(Debug, Default)]
pub struct SceneCompilationState {
    /// Recompile everything on the next pass.
    pub(crate) compile_scene: bool,
    /// Something — possibly everything — needs compiling this frame.
    pub(crate) need_new_compile: bool,

    /// Pending directives, flushed before each traversal.
    pub(crate) queue: BinaryHeap<CompilationRequest>,
    /// Best pending level per node, for monotonic invalidation.
    pub(crate) notified: FxHashMap<NodeId, CompileLevel>,

    /// Nodes that must be recompiled individually.
    pub(crate) dirty_nodes: FxHashSet<NodeId>,
    /// Nodes whose subtrees must be descended unconditionally.
    pub(crate) dirty_within_branch: FxHashSet<NodeId>,
    /// Isolated roots from `Node`-level requests.
    pub(crate) node_roots: FxHashSet<NodeId>,
    /// Isolated roots from `Subtree`-level requests.
    pub(crate) subtree_roots: FxHashSet<NodeId>,

    // === Traversal-local state ===
    pub(crate) stack: SmallVec<[NodeId; 64]>,
    /// Nesting depth inside instance-target links.
    pub(crate) instance_depth: u32,
    /// Nesting depth inside subtrees flagged for full recompilation.
    pub(crate) branch_depth: u32,
    /// Nesting depth inside always-compile node kinds.
    pub(crate) always_depth: u32,
}

impl SceneCompilationState {
    fn new() -> Self {
        Self {
            // A freshly registered scene compiles in full on its first pass.
            compile_scene: true,
            need_new_compile: true,
            ..Self::default()
        }
    }

    fn reset_traversal(&mut self) {
        self.stack.clear();
        self.instance_depth = 0;
        self.branch_depth = 0;
        self.always_depth = 0;
    }
}

/// The dirty-tracking engine deciding what recompiles each frame.
pub struct Scheduler {
    scenes: FxHashMap<SceneId, SceneCompilationState>,
    /// Debug switch. When false, every mutation forces a full recompile,
    /// the non-incremental baseline.
    enabled: bool,
}

impl Scheduler {
    /// Creates a scheduler. `enabled` is the incremental-compilation switch.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            scenes: FxHashMap::default(),
            enabled,
        }
    }

    /// Whether incremental compilation is on.
    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    // ========================================================================
    // Scene registry
    // ========================================================================

    /// Registers a scene, creating its compilation state. The first pass
    /// after registration compiles the whole scene.
    pub fn register_scene(&mut self, id: SceneId) {
        if self.scenes.insert(id, SceneCompilationState::new()).is_some() {
            log::warn!("{id} registered twice; compilation state reset");
        }
    }

    /// Unregisters a scene, destroying its compilation state.
    pub fn unregister_scene(&mut self, id: SceneId) {
        if self.scenes.remove(&id).is_none() {
            log::warn!("unregister of unknown {id} ignored");
        }
    }

    /// Whether a scene is registered.
    #[must_use]
    pub fn is_registered(&self, id: SceneId) -> bool {
        self.scenes.contains_key(&id)
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Reports one node mutation.
    ///
    /// Looks up the configured level for `(kind, op, attr)`, promotes it for
    /// instanced nodes, and enqueues a directive — unless a broader one for
    /// the same node is already pending, or the whole scene is already
    /// flagged.
    pub fn notify(&mut self, graph: &SceneGraph, node: NodeId, op: Op, attr: &str) {
        let Some(state) = self.scenes.get_mut(&graph.id()) else {
            log::warn!("notify for unregistered {}", graph.id());
            return;
        };

        if !self.enabled {
            // Any update triggers a full recompile when disabled.
            state.need_new_compile = true;
            return;
        }

        if state.compile_scene {
            return; // Whole scene already flagged; finer requests are no-ops.
        }

        let Some(n) = graph.node(node) else {
            return;
        };

        let mut level =
            config::configured_level(&n.kind, op, attr).unwrap_or(CompileLevel::Scene);

        // An instanced node's compiled form is relocated under its instance
        // sites during traversal; recompile the whole branch so the
        // relocation is re-emitted everywhere.
        if n.instanced && matches!(level, CompileLevel::Node | CompileLevel::Subtree) {
            level = CompileLevel::Branch;
        }

        state.need_new_compile = true;

        log::trace!(
            "notify {} {}.{} on {node:?} -> {level}",
            n.kind.name(),
            op.name(),
            attr
        );

        if level == CompileLevel::Scene {
            state.compile_scene = true;
            state.queue.clear();
            state.notified.clear();
            return;
        }

        // Monotonic invalidation: never downgrade a broader pending request.
        if let Some(&pending) = state.notified.get(&node)
            && pending.at_least_as_general_as(level)
        {
            return;
        }
        state.notified.insert(node, level);

        state.queue.push(CompilationRequest {
            node,
            op,
            attr: attr.to_string(),
            level,
            priority: level,
        });
    }

    /// Best pending level for a node, if any. Diagnostic accessor.
    #[must_use]
    pub fn pending_level(&self, scene: SceneId, node: NodeId) -> Option<CompileLevel> {
        self.scenes.get(&scene)?.notified.get(&node).copied()
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Flushes the pending queue into per-node dirty state, coarsest
    /// directives first. Returns whether any compilation is needed this
    /// frame. Run once per frame, before traversal.
    pub fn schedule_compilations(&mut self, graph: &mut SceneGraph) -> bool {
        let Some(state) = self.scenes.get_mut(&graph.id()) else {
            log::warn!("schedule for unregistered {}", graph.id());
            return false;
        };

        state.reset_traversal();

        if !self.enabled {
            let needed = state.need_new_compile;
            state.need_new_compile = false;
            state.queue.clear();
            state.notified.clear();
            return needed;
        }

        if state.compile_scene {
            state.queue.clear();
            state.notified.clear();
            return true;
        }

        let had_requests = !state.queue.is_empty();

        while let Some(req) = state.queue.pop() {
            match req.level {
                CompileLevel::Scene => {
                    // Scene-level requests short-circuit in notify and are
                    // never queued.
                    debug_assert!(false, "scene-level request observed in flush loop");
                    state.compile_scene = true;
                    state.queue.clear();
                }
                CompileLevel::Branch => {
                    flag_compile_path(state, graph, req.node);
                    state.dirty_within_branch.insert(req.node);
                }
                CompileLevel::Path => {
                    flag_compile_path(state, graph, req.node);
                }
                CompileLevel::Subtree => {
                    // Skip if already descending here via a branch request.
                    if !state.dirty_within_branch.contains(&req.node) {
                        state.dirty_within_branch.insert(req.node);
                        state.subtree_roots.insert(req.node);
                    }
                    state.dirty_nodes.insert(req.node);
                }
                CompileLevel::Node => {
                    if !state.dirty_nodes.contains(&req.node)
                        && !state.dirty_within_branch.contains(&req.node)
                    {
                        state.dirty_nodes.insert(req.node);
                        state.node_roots.insert(req.node);
                    }
                }
            }
        }
        state.notified.clear();
        state.need_new_compile = false;

        // Mirror the dirty sets onto the node flags for inspection.
        for &id in &state.dirty_nodes {
            if let Some(n) = graph.node_mut(id) {
                n.dirty = true;
            }
        }
        for &id in &state.dirty_within_branch {
            if let Some(n) = graph.node_mut(id) {
                n.dirty = true;
                n.branch_dirty = true;
            }
        }

        had_requests || state.compile_scene
    }

    // ========================================================================
    // Traversal gating
    // ========================================================================

    /// Called when the traversal is about to visit `node`. Pushes the node
    /// onto the traversal stack, records whether it sits inside an instanced
    /// subtree, and returns whether it must be recompiled.
    pub fn pre_visit(&mut self, graph: &mut SceneGraph, node: NodeId) -> bool {
        let Some(state) = self.scenes.get_mut(&graph.id()) else {
            return true;
        };
        let Some(n) = graph.node_mut(node) else {
            return false;
        };

        state.stack.push(node);

        n.instanced = state.instance_depth > 0;

        if n.kind.is_instance() {
            state.instance_depth += 1;
        }
        if n.kind.always_compile() {
            state.always_depth += 1;
        }
        if state.dirty_within_branch.contains(&node) {
            state.branch_depth += 1;
        }

        !self.enabled
            || state.compile_scene
            || state.always_depth > 0
            || state.branch_depth > 0
            || state.dirty_nodes.contains(&node)
    }

    /// Called when the traversal leaves `node`; symmetric to
    /// [`Scheduler::pre_visit`].
    pub fn post_visit(&mut self, graph: &SceneGraph, node: NodeId) {
        let Some(state) = self.scenes.get_mut(&graph.id()) else {
            return;
        };
        if state.stack.last() != Some(&node) {
            return;
        }
        state.stack.pop();

        if let Some(n) = graph.node(node) {
            if n.kind.is_instance() {
                state.instance_depth -= 1;
            }
            if n.kind.always_compile() {
                state.always_depth -= 1;
            }
        }
        if state.dirty_within_branch.contains(&node) {
            state.branch_depth -= 1;
        }
    }

    /// Whether the traversal must descend into `node` from its parent. False
    /// means the entire subtree is unaffected this frame and is skipped.
    #[must_use]
    pub fn needs_descend(&self, scene: SceneId, node: NodeId) -> bool {
        let Some(state) = self.scenes.get(&scene) else {
            return true;
        };
        !self.enabled
            || state.compile_scene
            || state.branch_depth > 0
            || state.always_depth > 0
            || state.dirty_nodes.contains(&node)
            || state.dirty_within_branch.contains(&node)
    }

    /// Isolated compile roots: nodes to visit individually and subtree roots
    /// to descend, when they were not reached from the scene root.
    #[must_use]
    pub fn compile_roots(&self, scene: SceneId) -> (Vec<NodeId>, Vec<NodeId>) {
        let Some(state) = self.scenes.get(&scene) else {
            return (Vec::new(), Vec::new());
        };
        (
            state.node_roots.iter().copied().collect(),
            state.subtree_roots.iter().copied().collect(),
        )
    }

    /// Whether the whole scene is flagged for recompilation.
    #[must_use]
    pub fn compile_scene_flagged(&self, scene: SceneId) -> bool {
        self.scenes.get(&scene).is_some_and(|s| s.compile_scene)
    }

    /// Whether `node` is flagged dirty for the next pass.
    #[must_use]
    pub fn is_dirty(&self, scene: SceneId, node: NodeId) -> bool {
        self.scenes
            .get(&scene)
            .is_some_and(|s| s.dirty_nodes.contains(&node))
    }

    /// Whether `node` is flagged dirty-within-branch for the next pass.
    #[must_use]
    pub fn is_dirty_within_branch(&self, scene: SceneId, node: NodeId) -> bool {
        self.scenes
            .get(&scene)
            .is_some_and(|s| s.dirty_within_branch.contains(&node))
    }

    // ========================================================================
    // Pass completion
    // ========================================================================

    /// Clears per-pass state after a successful compilation, including the
    /// mirrored node flags. The scene state itself survives for the next
    /// frame.
    pub fn clear_pass(&mut self, graph: &mut SceneGraph) {
        let Some(state) = self.scenes.get_mut(&graph.id()) else {
            return;
        };

        for &id in state.dirty_nodes.iter().chain(&state.dirty_within_branch) {
            if let Some(n) = graph.node_mut(id) {
                n.dirty = false;
                n.branch_dirty = false;
            }
        }

        state.compile_scene = false;
        state.need_new_compile = false;
        state.dirty_nodes.clear();
        state.dirty_within_branch.clear();
        state.node_roots.clear();
        state.subtree_roots.clear();
        state.notified.clear();
        state.reset_traversal();
    }
}

/// Flags `node` and every ancestor up to the root for recompilation.
///
/// Crossing an instance node flags its target subtree for full descent.
/// Crossing a node that is the *target* of instance edges flags every
/// instancing node for full descent and recurses up from each of them, so a
/// mutation inside shared content invalidates all of its instances. The
/// visited set terminates the recursion on shared ancestors.
fn flag_compile_path(state: &mut SceneCompilationState, graph: &SceneGraph, target: NodeId) {
    let mut visited = FxHashSet::default();
    flag_path_inner(state, graph, target, &mut visited);
}

fn flag_path_inner(
    state: &mut SceneCompilationState,
    graph: &SceneGraph,
    start: NodeId,
    visited: &mut FxHashSet<NodeId>,
) {
    let mut cur = Some(start);
    while let Some(id) = cur {
        if !visited.insert(id) {
            break; // Path above here already flagged.
        }
        let Some(node) = graph.node(id) else {
            break;
        };

        if node.kind.is_instance() {
            // The instanced subtree is spliced in below this node; make sure
            // traversal descends into it.
            state.dirty_within_branch.insert(id);
        }
        state.dirty_nodes.insert(id);

        if let Some(instancers) = graph.instancers_of(id) {
            for &instance in instancers {
                state.dirty_within_branch.insert(instance);
                flag_path_inner(state, graph, instance, visited);
            }
        }

        cur = node.parent;
    }
}
