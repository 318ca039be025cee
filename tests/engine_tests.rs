//! Engine & Render Loop Integration Tests
//!
//! Tests for:
//! - Loop state machine: Stopped -> Running <-> Paused -> Stopped
//! - Frame cycle: compile-if-dirty, render, sleep
//! - Deferred node destruction between traversal and rendering
//! - Draw list refresh driven by attribute mutation
//! - User hooks and the engine event queue

use glam::Vec3;
use serde_json::json;
use trellis::draw::ObjectKey;
use trellis::{
    DrawCommand, Engine, EngineEvent, EngineSettings, LoopState, NodeSpec, QueueLoader,
    RecordingRasterizer, StartOptions, TrellisError,
};

fn engine() -> Engine {
    Engine::new(EngineSettings::default(), Box::new(QueueLoader::new()))
}

/// root -> translate -> material -> geometry, with ids.
fn simple_scene(engine: &mut Engine) -> (trellis::NodeId, trellis::NodeId, trellis::NodeId) {
    let root = engine.graph().root();
    let translate = engine
        .add_node(
            root,
            &NodeSpec::new("translate").with_id("xform").with_attr("x", 1.0),
        )
        .unwrap();
    let material = engine
        .add_node(translate, &NodeSpec::new("material").with_id("mat"))
        .unwrap();
    let geometry = engine
        .add_node(
            material,
            &NodeSpec::new("geometry")
                .with_id("geo")
                .with_attr("positions", json!([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
        )
        .unwrap();
    (translate, material, geometry)
}

// ============================================================================
// Loop state machine
// ============================================================================

#[test]
fn loop_state_transitions() {
    let mut engine = engine();
    assert_eq!(engine.loop_state(), LoopState::Stopped);

    engine.start(StartOptions::new()).unwrap();
    assert_eq!(engine.loop_state(), LoopState::Running);
    assert_eq!(engine.poll_event(), Some(EngineEvent::Started));

    engine.pause(true);
    assert_eq!(engine.loop_state(), LoopState::Paused);

    // Ticks do nothing while paused.
    let mut recorder = RecordingRasterizer::new();
    assert!(!engine.tick(&mut recorder, 0.016).unwrap());
    assert!(recorder.commands.is_empty());

    engine.pause(false);
    assert_eq!(engine.loop_state(), LoopState::Running);

    engine.stop();
    assert_eq!(engine.loop_state(), LoopState::Stopped);
}

#[test]
fn start_after_destroy_is_an_illegal_state() {
    let mut engine = engine();
    engine.destroy();
    assert!(matches!(
        engine.start(StartOptions::new()),
        Err(TrellisError::IllegalState(_))
    ));
    let mut recorder = RecordingRasterizer::new();
    assert!(engine.tick(&mut recorder, 0.016).is_err());
}

// ============================================================================
// Frame cycle: compile, render, sleep
// ============================================================================

#[test]
fn first_tick_renders_then_loop_sleeps() {
    let mut engine = engine();
    simple_scene(&mut engine);
    engine.start(StartOptions::new()).unwrap();
    let mut recorder = RecordingRasterizer::new();

    assert!(engine.tick(&mut recorder, 0.016).unwrap());
    assert_eq!(recorder.draw_count(), 1);

    // Nothing changed: no traversal, no render, one sleep notification.
    assert!(!engine.tick(&mut recorder, 0.016).unwrap());
    assert!(!engine.tick(&mut recorder, 0.016).unwrap());
    assert_eq!(recorder.frames, 1);

    let mut sleeps = 0;
    while let Some(event) = engine.poll_event() {
        if event == EngineEvent::Sleeping {
            sleeps += 1;
        }
    }
    assert_eq!(sleeps, 1);
}

#[test]
fn mutation_wakes_the_loop() {
    let mut engine = engine();
    let (_, material, _) = simple_scene(&mut engine);
    engine.start(StartOptions::new()).unwrap();
    let mut recorder = RecordingRasterizer::new();

    engine.tick(&mut recorder, 0.016).unwrap();
    assert!(!engine.tick(&mut recorder, 0.016).unwrap()); // asleep

    engine
        .with_node(material)
        .unwrap()
        .set("base_color", json!([0.1, 0.2, 0.9]))
        .unwrap();
    assert!(engine.tick(&mut recorder, 0.016).unwrap()); // awake again
    assert_eq!(recorder.frames, 2);
}

#[test]
fn render_frame_forces_a_redraw_without_changes() {
    let mut engine = engine();
    simple_scene(&mut engine);
    let mut recorder = RecordingRasterizer::new();

    assert!(engine.render_frame(&mut recorder, false).unwrap());
    assert!(!engine.render_frame(&mut recorder, false).unwrap());
    assert!(engine.render_frame(&mut recorder, true).unwrap());
}

// ============================================================================
// Deferred destruction
// ============================================================================

#[test]
fn destruction_is_deferred_to_the_next_frame() {
    let mut engine = engine();
    let (translate, _, geometry) = simple_scene(&mut engine);
    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();
    assert_eq!(engine.draw_list().object_count(), 1);

    engine.destroy_node(translate).unwrap();
    // The node is only enqueued; teardown has not run yet.
    assert!(engine.graph().node(geometry).is_some());
    assert!(!engine.graph().node(geometry).unwrap().is_alive());

    // Destroyed nodes reject further mutation.
    assert!(engine.with_node(geometry).is_none());

    // The next frame performs the batch teardown.
    engine.render_frame(&mut recorder, false).unwrap();
    assert!(engine.graph().node(geometry).is_none());
    assert_eq!(engine.draw_list().object_count(), 0);
}

#[test]
fn destroying_the_root_is_rejected() {
    let mut engine = engine();
    let root = engine.graph().root();
    assert!(matches!(
        engine.destroy_node(root),
        Err(TrellisError::IllegalState(_))
    ));
}

// ============================================================================
// Draw list refresh
// ============================================================================

#[test]
fn transform_mutation_updates_the_object_model_matrix() {
    let mut engine = engine();
    let (translate, _, geometry) = simple_scene(&mut engine);
    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();

    let key = ObjectKey {
        geometry,
        site: None,
    };
    let before = engine.draw_list().object(&key).unwrap().model.translation;
    assert!((before.x - 1.0).abs() < 1e-5);

    engine.with_node(translate).unwrap().set("x", 3.5).unwrap();
    engine.compile();

    let after = engine.draw_list().object(&key).unwrap().model.translation;
    assert!((after.x - 3.5).abs() < 1e-5);
}

#[test]
fn rendered_stream_binds_material_before_drawing() {
    let mut engine = engine();
    simple_scene(&mut engine);
    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();

    let bind_pos = recorder
        .commands
        .iter()
        .position(|c| matches!(c, DrawCommand::BindMaterial(_)));
    let draw_pos = recorder
        .commands
        .iter()
        .position(|c| matches!(c, DrawCommand::DrawGeometry(_)));
    assert!(bind_pos.unwrap() < draw_pos.unwrap());
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn idle_hook_mutations_keep_the_loop_awake() {
    let mut engine = engine();
    simple_scene(&mut engine);
    let options = StartOptions::new().with_idle(|engine: &mut Engine, frame| {
        let mut xform = engine.select("xform").unwrap();
        xform.set("x", frame.time).unwrap();
    });
    engine.start(options).unwrap();

    let mut recorder = RecordingRasterizer::new();
    for _ in 0..3 {
        assert!(engine.tick(&mut recorder, 0.016).unwrap());
    }
    assert_eq!(recorder.frames, 3);

    // The hook's mutations flowed into the compiled output.
    let time = engine.time();
    let geometry = engine.graph().lookup("geo").unwrap();
    let key = ObjectKey {
        geometry,
        site: None,
    };
    let translation: Vec3 = engine.draw_list().object(&key).unwrap().model.translation.into();
    assert!((translation.x - time).abs() < 1e-5);
}
