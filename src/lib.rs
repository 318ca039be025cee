#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Trellis: a retained-mode scene graph engine with incremental draw-list
//! compilation.
//!
//! A declarative hierarchy of nodes — transforms, materials, lights,
//! geometry, shaders, textures — compiles into a flattened, state-sorted
//! draw list for a rasterizer backend. After an arbitrary set of node
//! mutations, the compilation scheduler re-traverses only the parts of the
//! graph those mutations invalidated, while shared state cores and instance
//! edges keep many nodes backed by one bundle of GPU configuration.

pub mod compile;
pub mod core;
pub mod draw;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod scene;
pub mod settings;

pub use crate::compile::{CompileLevel, CompileStats, Scheduler};
pub use crate::core::{CoreFactory, CoreId, CoreKind, StateCore};
pub use crate::draw::{DirtyFlags, DrawCommand, DrawList, Rasterizer, RecordingRasterizer};
pub use crate::engine::{Engine, EngineEvent, FrameState, LoopState, SceneStatus};
pub use crate::errors::{Result, TrellisError};
pub use crate::loader::{
    InstantLoader, QueueLoader, ResourceDelivery, ResourceKind, ResourceLoader, ResourcePayload,
    ResourceRequest,
};
pub use crate::scene::{Node, NodeId, NodeKind, NodeSelector, NodeSpec, Op, SceneGraph, SceneId};
pub use crate::settings::{EngineSettings, StartOptions};
