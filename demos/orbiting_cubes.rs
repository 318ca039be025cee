//! Two cubes sharing one material core, orbiting under a rotate node.
//!
//! Runs the engine headless against the recording rasterizer and prints how
//! little of the graph each frame recompiles once the scene is warm.

use anyhow::Result;
use serde_json::json;
use trellis::{
    Engine, EngineSettings, InstantLoader, NodeSpec, RecordingRasterizer, StartOptions,
};

fn cube(id: &str, x: f32) -> NodeSpec {
    NodeSpec::new("translate")
        .with_attr("x", x)
        .with_child(
            NodeSpec::new("material")
                .with_core_id("cube_material")
                .with_attr("base_color", json!([0.3, 0.6, 0.9]))
                .with_child(NodeSpec::new("geometry").with_id(id).with_attr(
                    "positions",
                    json!([
                        -0.5, -0.5, -0.5, 0.5, -0.5, -0.5, 0.5, 0.5, -0.5, -0.5, 0.5, -0.5,
                        -0.5, -0.5, 0.5, 0.5, -0.5, 0.5, 0.5, 0.5, 0.5, -0.5, 0.5, 0.5
                    ]),
                )),
        )
}

fn main() -> Result<()> {
    env_logger::init();

    let scene = NodeSpec::new("group")
        .with_child(NodeSpec::new("look_at").with_attr("eye", json!([0.0, 4.0, 10.0])))
        .with_child(
            NodeSpec::new("rotate")
                .with_id("orbit")
                .with_attr("y", 1.0)
                .with_child(cube("cube_left", -2.0))
                .with_child(cube("cube_right", 2.0)),
        );

    let mut engine = Engine::with_scene(
        EngineSettings::default(),
        Box::new(InstantLoader),
        &scene,
    )?;

    engine.start(StartOptions::new().with_idle(|engine, frame| {
        let mut orbit = engine.select("orbit").expect("orbit node");
        orbit.set("angle", f64::from(frame.time) * 45.0).expect("set angle");
    }))?;

    let mut rasterizer = RecordingRasterizer::new();
    for _ in 0..120 {
        engine.tick(&mut rasterizer, 1.0 / 60.0)?;
    }

    let total = engine.graph().len();
    let stats = engine.last_compile_stats().expect("compiled at least once");
    println!(
        "{} nodes in graph, {} revisited per frame, {} draw calls over {} frames",
        total,
        stats.visited.len(),
        rasterizer.draw_count(),
        rasterizer.frames,
    );
    Ok(())
}
