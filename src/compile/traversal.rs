//! The compilation pass.
//!
//! Depth-first traversal of the scene graph, gated node by node through the
//! scheduler. Visited nodes contribute their state core to the chain in
//! effect, and visited geometry nodes (re)register their draw object with
//! the draw list. Subtrees the scheduler reports clean are skipped
//! entirely, which is what makes a pass O(visited) rather than O(total).
//!
//! Isolated `Node`- and `Subtree`-level roots are compiled after the main
//! descent: their ancestors are clean, so the root descent never reaches
//! them. Their surrounding state chain is reconstructed by walking parent
//! links upward once — cheap, and only needed for nodes that were
//! explicitly flagged.

use glam::Affine3A;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::compile::Scheduler;
use crate::core::CoreFactory;
use crate::draw::{CoreChain, DrawList, ObjectKey};
use crate::scene::{NodeId, NodeKind, SceneGraph};

/// What one compilation pass did, for diagnostics and tests.
#[derive(Debug, Default)]
pub struct CompileStats {
    /// Every node recompiled this pass, in visit order.
    pub visited: Vec<NodeId>,
    /// Number of draw objects (re)registered.
    pub objects: usize,
}

/// Traversal context: the core chain and composed model matrix in effect.
#[derive(Clone, Copy)]
struct Frame {
    chain: CoreChain,
    model: Affine3A,
}

impl Frame {
    fn root() -> Self {
        Self {
            chain: CoreChain::default(),
            model: Affine3A::IDENTITY,
        }
    }

    fn absorb(&mut self, core: crate::core::CoreId, cores: &CoreFactory) {
        let Some(state_core) = cores.get(core) else {
            return;
        };
        self.chain.absorb(state_core.kind, core);
        if let Some(matrix) = state_core.data.matrix() {
            self.model = self.model * *matrix;
        }
    }
}

/// Runs one compilation pass over the scene graph.
///
/// The caller flushes the scheduler first ([`Scheduler::schedule_compilations`])
/// and clears pass state afterwards ([`Scheduler::clear_pass`]).
pub fn compile_pass(
    scheduler: &mut Scheduler,
    graph: &mut SceneGraph,
    cores: &CoreFactory,
    draw: &mut DrawList,
) -> CompileStats {
    let scene = graph.id();
    let mut stats = CompileStats::default();
    let mut visited = FxHashSet::default();

    // A full recompile re-registers every object; stale ones must not
    // survive from the previous structure.
    if scheduler.compile_scene_flagged(scene) || !scheduler.enabled() {
        draw.clear_objects();
    }

    let root = graph.root();
    if scheduler.needs_descend(scene, root) {
        walk(
            scheduler,
            graph,
            cores,
            draw,
            root,
            Frame::root(),
            None,
            0,
            &mut stats,
            &mut visited,
        );
    }

    // Isolated roots whose ancestors are clean. Skip any the main descent
    // already covered. Instanced nodes never land here — their requests are
    // promoted to branch level — so no instance site applies.
    let (node_roots, subtree_roots) = scheduler.compile_roots(scene);
    for id in subtree_roots.into_iter().chain(node_roots) {
        if visited.contains(&id) {
            continue;
        }
        let frame = seed_frame(graph, cores, id);
        walk(
            scheduler, graph, cores, draw, id, frame, None, 0, &mut stats, &mut visited,
        );
    }

    log::debug!(
        "{scene} compiled: {} nodes visited, {} objects",
        stats.visited.len(),
        stats.objects
    );

    stats
}

fn walk(
    scheduler: &mut Scheduler,
    graph: &mut SceneGraph,
    cores: &CoreFactory,
    draw: &mut DrawList,
    node: NodeId,
    mut frame: Frame,
    site: Option<NodeId>,
    library_depth: u32,
    stats: &mut CompileStats,
    visited: &mut FxHashSet<NodeId>,
) {
    let scene = graph.id();
    let compile = scheduler.pre_visit(graph, node);

    let Some(n) = graph.node(node) else {
        scheduler.post_visit(graph, node);
        return;
    };
    let is_geometry = matches!(n.kind, NodeKind::Geometry);
    let is_library = matches!(n.kind, NodeKind::Library);
    let is_instance = n.kind.is_instance();
    let core = n.core;
    let children: SmallVec<[NodeId; 8]> = n.children.iter().copied().collect();

    // Library content defines shared subtrees; it only draws when reached
    // through an instance edge, which enters at the target directly.
    let library_depth = library_depth + u32::from(is_library);

    if let Some(core_id) = core {
        frame.absorb(core_id, cores);
    }

    if compile {
        stats.visited.push(node);
        visited.insert(node);
        if is_geometry && library_depth == 0 {
            draw.register_object(
                ObjectKey {
                    geometry: node,
                    site,
                },
                frame.chain,
                frame.model,
                cores,
            );
            stats.objects += 1;
        }
    }

    // The instanced subtree compiles as a surrogate child of the instance
    // node, inheriting the state chain at the instance site.
    if is_instance
        && let Some(target) = graph.instance_target(node)
        && scheduler.needs_descend(scene, target)
    {
        walk(
            scheduler,
            graph,
            cores,
            draw,
            target,
            frame,
            Some(node),
            0,
            stats,
            visited,
        );
    }

    for child in children {
        if scheduler.needs_descend(scene, child) {
            walk(
                scheduler,
                graph,
                cores,
                draw,
                child,
                frame,
                site,
                library_depth,
                stats,
                visited,
            );
        }
    }

    scheduler.post_visit(graph, node);
}

/// Reconstructs the state chain above an isolated compile root by walking
/// parent links to the scene root once.
fn seed_frame(graph: &SceneGraph, cores: &CoreFactory, node: NodeId) -> Frame {
    let mut path: SmallVec<[NodeId; 32]> = SmallVec::new();
    let mut cur = graph.node(node).and_then(crate::scene::Node::parent);
    while let Some(id) = cur {
        path.push(id);
        cur = graph.node(id).and_then(crate::scene::Node::parent);
    }

    let mut frame = Frame::root();
    for &id in path.iter().rev() {
        if let Some(n) = graph.node(id)
            && let Some(core) = n.core
        {
            frame.absorb(core, cores);
        }
    }
    frame
}
