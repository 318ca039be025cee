//! Compilation Scheduler Integration Tests
//!
//! Tests for:
//! - Monotonic invalidation (broader pending requests are never downgraded)
//! - Minimal recompilation (one dirty leaf visits one node)
//! - Path invalidation (node + ancestors, subtree untouched)
//! - Instance consistency (all instances of mutated shared content recompile)
//! - Scene-level short circuit and idempotent flushes
//! - The disabled-compilation baseline

use std::collections::HashSet;

use serde_json::json;
use trellis::scene::Node;
use trellis::{
    CompileLevel, CoreFactory, DrawList, Engine, EngineSettings, NodeId, NodeKind, NodeSpec, Op,
    QueueLoader, SceneGraph, Scheduler, compile,
};

fn engine() -> Engine {
    Engine::new(EngineSettings::default(), Box::new(QueueLoader::new()))
}

fn visited_set(stats: &trellis::CompileStats) -> HashSet<NodeId> {
    stats.visited.iter().copied().collect()
}

// ============================================================================
// Monotonic invalidation
// ============================================================================

#[test]
fn node_then_branch_resolves_to_branch() {
    let mut engine = engine();
    let root = engine.graph().root();
    let shader = engine
        .add_node(root, &NodeSpec::new("shader").with_id("s"))
        .unwrap();
    engine.compile();
    let scene = engine.graph().id();

    engine
        .with_node(shader)
        .unwrap()
        .set("params", json!({"u_time": 0.5}))
        .unwrap();
    assert_eq!(
        engine.scheduler().pending_level(scene, shader),
        Some(CompileLevel::Node)
    );

    // Structural addition on the same node is branch level and must win.
    engine
        .add_node(shader, &NodeSpec::new("group"))
        .unwrap();
    assert_eq!(
        engine.scheduler().pending_level(scene, shader),
        Some(CompileLevel::Branch)
    );

    // The reverse order must not downgrade it either.
    engine
        .with_node(shader)
        .unwrap()
        .set("params", json!({"u_time": 1.0}))
        .unwrap();
    assert_eq!(
        engine.scheduler().pending_level(scene, shader),
        Some(CompileLevel::Branch)
    );
}

// ============================================================================
// Minimal recompilation
// ============================================================================

#[test]
fn node_level_leaf_mutation_visits_exactly_one_node() {
    let mut engine = engine();
    let root = engine.graph().root();
    let group = engine.add_node(root, &NodeSpec::new("group")).unwrap();
    let shader = engine
        .add_node(group, &NodeSpec::new("shader").with_attr("source", "fn main() {}"))
        .unwrap();
    engine.compile();

    engine
        .with_node(shader)
        .unwrap()
        .set("params", json!({"u_tint": [1.0, 0.0, 0.0]}))
        .unwrap();

    let stats = engine.compile().expect("compilation pending");
    assert_eq!(stats.visited, vec![shader]);
}

// ============================================================================
// Path invalidation (end-to-end scenario)
// ============================================================================

#[test]
fn material_path_mutation_revisits_ancestors_but_not_descendants() {
    let mut engine = engine();
    let root = engine.graph().root();
    let translate = engine
        .add_node(root, &NodeSpec::new("translate").with_attr("x", 1.0))
        .unwrap();
    let material = engine
        .add_node(translate, &NodeSpec::new("material"))
        .unwrap();
    let geometry = engine
        .add_node(
            material,
            &NodeSpec::new("geometry").with_attr("positions", json!([0.0, 0.0, 0.0])),
        )
        .unwrap();
    engine.compile();

    engine
        .with_node(material)
        .unwrap()
        .set("base_color", json!([0.8, 0.1, 0.1]))
        .unwrap();

    let stats = engine.compile().expect("compilation pending");
    let visited = visited_set(stats);
    let expected: HashSet<NodeId> = [root, translate, material].into_iter().collect();
    assert_eq!(visited, expected);
    assert!(!visited.contains(&geometry));
}

// ============================================================================
// Instance consistency
// ============================================================================

/// Builds: root -> library -> "shared" group (lights + geometry), plus two
/// instance nodes of "shared". Runs an initial full pass so instanced flags
/// are recorded.
fn instanced_scene() -> (SceneGraph, Scheduler, CoreFactory, DrawList, NodeId, NodeId, NodeId, NodeId) {
    let mut graph = SceneGraph::new();
    let library = graph.insert(Node::new(NodeKind::Library), None).unwrap();
    let shared = graph
        .insert(Node::named(NodeKind::Group, "shared"), Some(library))
        .unwrap();
    let lights = graph.insert(Node::new(NodeKind::Lights), Some(shared)).unwrap();
    graph
        .insert(Node::new(NodeKind::Geometry), Some(shared))
        .unwrap();
    let b = graph
        .insert(
            Node::new(NodeKind::Instance {
                target: "shared".to_string(),
            }),
            None,
        )
        .unwrap();
    let c = graph
        .insert(
            Node::new(NodeKind::Instance {
                target: "shared".to_string(),
            }),
            None,
        )
        .unwrap();

    let mut scheduler = Scheduler::new(true);
    scheduler.register_scene(graph.id());
    let cores = CoreFactory::new();
    let mut draw = DrawList::new();

    // Initial full pass records which nodes sit inside instanced subtrees.
    assert!(scheduler.schedule_compilations(&mut graph));
    compile::compile_pass(&mut scheduler, &mut graph, &cores, &mut draw);
    scheduler.clear_pass(&mut graph);

    (graph, scheduler, cores, draw, shared, lights, b, c)
}

#[test]
fn subtree_mutation_inside_shared_content_marks_every_instance() {
    let (mut graph, mut scheduler, _cores, _draw, shared, lights, b, c) = instanced_scene();
    let scene = graph.id();

    // The lights node was traversed through instance edges.
    assert!(graph.node(lights).unwrap().instanced);

    // Subtree-level mutation inside the shared content...
    scheduler.notify(&graph, lights, Op::Set, "lights");
    assert!(scheduler.schedule_compilations(&mut graph));

    // ...marks both instance sites for unconditional descent.
    assert!(scheduler.is_dirty_within_branch(scene, b));
    assert!(scheduler.is_dirty_within_branch(scene, c));
    // The shared subtree root and the mutated node are on the dirty path.
    assert!(scheduler.is_dirty(scene, shared));
    assert!(scheduler.is_dirty(scene, lights));
}

#[test]
fn instanced_node_requests_are_promoted_to_branch() {
    let (graph, mut scheduler, _cores, _draw, _shared, lights, _b, _c) = instanced_scene();
    let scene = graph.id();

    // Lights mutations are configured at subtree level, but the node is
    // instanced, so the pending request must be branch level.
    scheduler.notify(&graph, lights, Op::Set, "lights");
    assert_eq!(
        scheduler.pending_level(scene, lights),
        Some(CompileLevel::Branch)
    );
}

#[test]
fn instance_sites_are_revisited_when_shared_content_changes() {
    let (mut graph, mut scheduler, cores, mut draw, _shared, lights, b, c) = instanced_scene();

    scheduler.notify(&graph, lights, Op::Set, "lights");
    assert!(scheduler.schedule_compilations(&mut graph));
    let stats = compile::compile_pass(&mut scheduler, &mut graph, &cores, &mut draw);
    scheduler.clear_pass(&mut graph);

    let visited = visited_set(&stats);
    assert!(visited.contains(&b));
    assert!(visited.contains(&c));
    // The mutated node recompiles once per instance path.
    assert!(stats.visited.iter().filter(|&&n| n == lights).count() >= 2);
}

// ============================================================================
// Scene-level short circuit
// ============================================================================

#[test]
fn scene_level_request_clears_finer_pending_requests() {
    let mut engine = engine();
    let root = engine.graph().root();
    let shader = engine.add_node(root, &NodeSpec::new("shader")).unwrap();
    let material = engine.add_node(root, &NodeSpec::new("material")).unwrap();
    engine.compile();
    let scene = engine.graph().id();

    // Unconfigured shader source swap falls back to a scene recompile.
    engine
        .with_node(shader)
        .unwrap()
        .set("source", "fn main() { /* v2 */ }")
        .unwrap();

    // Finer requests afterwards have no additional effect.
    engine
        .with_node(material)
        .unwrap()
        .set("base_color", json!([0.0, 1.0, 0.0]))
        .unwrap();
    assert_eq!(engine.scheduler().pending_level(scene, material), None);

    // The pass visits everything.
    let total = engine.graph().len();
    let stats = engine.compile().expect("compilation pending");
    assert_eq!(visited_set(stats).len(), total);
}

// ============================================================================
// Idempotent flush
// ============================================================================

#[test]
fn flush_without_notifications_is_a_no_op() {
    let mut engine = engine();
    let root = engine.graph().root();
    engine
        .add_node(root, &NodeSpec::new("material"))
        .unwrap();

    assert!(engine.compile().is_some()); // initial pass
    assert!(engine.compile().is_none()); // nothing pending
    assert!(engine.compile().is_none()); // still nothing
}

// ============================================================================
// Disabled-compilation baseline
// ============================================================================

#[test]
fn disabled_compilation_revisits_the_whole_scene_on_any_change() {
    let settings = EngineSettings {
        incremental_compilation: false,
        ..EngineSettings::default()
    };
    let mut engine = Engine::new(settings, Box::new(QueueLoader::new()));
    let root = engine.graph().root();
    let translate = engine.add_node(root, &NodeSpec::new("translate")).unwrap();
    let material = engine
        .add_node(translate, &NodeSpec::new("material"))
        .unwrap();
    engine.compile();

    assert!(engine.compile().is_none()); // quiescent even when disabled

    // A path-level mutation still recompiles every node.
    let total = engine.graph().len();
    engine
        .with_node(material)
        .unwrap()
        .set("alpha", 0.5)
        .unwrap();
    let stats = engine.compile().expect("compilation pending");
    assert_eq!(visited_set(stats).len(), total);
}
