//! Asynchronous Resource Loading Integration Tests
//!
//! Tests for:
//! - Loading counters per node and scene-wide
//! - Texture layer and streamed geometry delivery
//! - Load failures surfacing as events, not errors
//! - Idempotent handling of late deliveries after core release

use serde_json::json;
use trellis::{
    Engine, EngineEvent, EngineSettings, NodeSpec, QueueLoader, RecordingRasterizer,
    ResourceDelivery, ResourcePayload,
};

fn engine_with_loader() -> (
    Engine,
    std::rc::Rc<std::cell::RefCell<Vec<trellis::ResourceRequest>>>,
) {
    let loader = QueueLoader::new();
    let requests = loader.handle();
    (
        Engine::new(EngineSettings::default(), Box::new(loader)),
        requests,
    )
}

fn texture_spec() -> NodeSpec {
    NodeSpec::new("texture").with_attr(
        "layers",
        json!([
            {"source": "img/base.png"},
            {"source": "img/detail.png", "blend_factor": 0.5}
        ]),
    )
}

// ============================================================================
// Loading counters
// ============================================================================

#[test]
fn texture_layers_count_as_pending_tasks() {
    let (mut engine, requests) = engine_with_loader();
    let root = engine.graph().root();
    let node = engine.add_node(root, &texture_spec()).unwrap();

    assert_eq!(requests.borrow().len(), 2);
    assert_eq!(engine.status().loading_tasks(), 2);
    assert_eq!(engine.status().node_tasks(node), 2);
    assert!(!engine.status().all_loaded());
}

#[test]
fn deliveries_drain_the_counters() {
    let (mut engine, requests) = engine_with_loader();
    let root = engine.graph().root();
    let node = engine.add_node(root, &texture_spec()).unwrap();
    engine.compile();

    let sender = engine.delivery_sender();
    let mut recorder = RecordingRasterizer::new();
    let pending: Vec<_> = requests.borrow().clone();
    for request in pending {
        sender
            .send(ResourceDelivery {
                core: request.core,
                layer: request.layer,
                source: request.source,
                result: Ok(ResourcePayload::Image {
                    width: 64,
                    height: 64,
                }),
            })
            .unwrap();
    }

    // Deliveries are drained at the top of the next frame.
    engine.render_frame(&mut recorder, false).unwrap();
    assert_eq!(engine.status().loading_tasks(), 0);
    assert!(engine.status().all_loaded());
    assert_eq!(engine.status().node_tasks(node), 0);
}

#[test]
fn streamed_geometry_applies_the_delivered_mesh() {
    let (mut engine, requests) = engine_with_loader();
    let root = engine.graph().root();
    let node = engine
        .add_node(
            root,
            &NodeSpec::new("geometry").with_attr("source", "meshes/rock.bin"),
        )
        .unwrap();
    engine.compile();
    assert_eq!(engine.status().node_tasks(node), 1);

    let request = requests.borrow()[0].clone();
    engine
        .delivery_sender()
        .send(ResourceDelivery {
            core: request.core,
            layer: 0,
            source: request.source,
            result: Ok(ResourcePayload::Geometry {
                positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                indices: vec![0, 1, 2],
            }),
        })
        .unwrap();

    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();

    assert!(engine.status().all_loaded());
    let core = engine.graph().node(node).unwrap().core.unwrap();
    match &engine.cores().get(core).unwrap().data {
        trellis::core::CoreData::Geometry(g) => {
            assert!(g.loaded);
            assert_eq!(g.vertex_count(), 3);
            assert_eq!(g.indices, vec![0, 1, 2]);
        }
        other => panic!("unexpected core payload: {other:?}"),
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn failed_loads_surface_as_events_and_the_loop_keeps_running() {
    let (mut engine, requests) = engine_with_loader();
    let root = engine.graph().root();
    let node = engine.add_node(root, &texture_spec()).unwrap();
    engine.compile();

    let request = requests.borrow()[0].clone();
    engine
        .delivery_sender()
        .send(ResourceDelivery {
            core: request.core,
            layer: request.layer,
            source: request.source.clone(),
            result: Err("404 not found".to_string()),
        })
        .unwrap();

    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();

    let error = loop {
        match engine.poll_event() {
            Some(EngineEvent::ResourceError {
                node: n,
                source,
                message,
            }) => break (n, source, message),
            Some(_) => continue,
            None => panic!("expected a resource error event"),
        }
    };
    assert_eq!(error.0, node);
    assert_eq!(error.1, request.source);
    assert!(error.2.contains("404"));

    // One failed, one still pending; the failed layer is not retried.
    assert_eq!(engine.status().node_tasks(node), 1);
    assert_eq!(requests.borrow().len(), 2);
}

// ============================================================================
// Late deliveries
// ============================================================================

#[test]
fn delivery_after_core_release_is_discarded() {
    let (mut engine, requests) = engine_with_loader();
    let root = engine.graph().root();
    let node = engine.add_node(root, &texture_spec()).unwrap();
    engine.compile();

    // Destroy the node while its loads are still pending.
    engine.destroy_node(node).unwrap();
    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();
    assert!(engine.status().all_loaded()); // doomed node's tasks forgotten

    // The loader replies afterwards; the result is simply dropped.
    let request = requests.borrow()[0].clone();
    engine
        .delivery_sender()
        .send(ResourceDelivery {
            core: request.core,
            layer: request.layer,
            source: request.source,
            result: Ok(ResourcePayload::Image {
                width: 8,
                height: 8,
            }),
        })
        .unwrap();
    engine.render_frame(&mut recorder, false).unwrap();

    assert!(engine.status().all_loaded());
    while let Some(event) = engine.poll_event() {
        assert!(!matches!(event, EngineEvent::ResourceError { .. }));
    }
}

#[test]
fn delivery_for_a_replaced_layer_stack_is_stale() {
    let (mut engine, requests) = engine_with_loader();
    let root = engine.graph().root();
    let node = engine.add_node(root, &texture_spec()).unwrap();
    engine.compile();
    let old_request = requests.borrow()[0].clone();

    // Replace the layer stack before the old loads finish.
    engine
        .with_node(node)
        .unwrap()
        .set("layers", json!([{"source": "img/other.png"}]))
        .unwrap();

    // The old delivery no longer matches any unloaded layer source.
    engine
        .delivery_sender()
        .send(ResourceDelivery {
            core: old_request.core,
            layer: old_request.layer,
            source: old_request.source,
            result: Ok(ResourcePayload::Image {
                width: 8,
                height: 8,
            }),
        })
        .unwrap();
    let mut recorder = RecordingRasterizer::new();
    engine.render_frame(&mut recorder, false).unwrap();

    // The replacement layer is still waiting for its own load.
    assert!(!engine.status().all_loaded());
    let core = engine.graph().node(node).unwrap().core.unwrap();
    match &engine.cores().get(core).unwrap().data {
        trellis::core::CoreData::Texture(t) => {
            assert_eq!(t.layers.len(), 1);
            assert!(!t.layers[0].loaded);
        }
        other => panic!("unexpected core payload: {other:?}"),
    }
}
