//! State cores
//!
//! A state core is a shareable, reference-counted bundle of GPU-facing
//! configuration (transform matrix, material coefficients, texture layers,
//! shader source, ...) attached to one or more scene nodes. Sharing a core
//! between nodes is how the engine expresses instanced state: many geometry
//! nodes can reference one shader core, and recompiling any of them reuses
//! the same underlying draw-list state.
//!
//! Cores are owned by the [`CoreFactory`], which deduplicates them by
//! `(kind, explicit id)` and reclaims them when their use count reaches
//! zero.

pub mod data;
pub mod factory;

pub use data::{
    CameraCore, ClipCore, ClipMode, CoreData, FlagsCore, GeometryCore, LightDef, LightMode,
    LightsCore, MaterialCore, Primitive, ShaderCore, TextureCore, TextureLayer, XformCore,
    XformForm,
};
pub use factory::CoreFactory;

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a [`StateCore`] within a [`CoreFactory`].
    pub struct CoreId;
}

/// The kind of state a core bundles.
///
/// Several node kinds may map onto one core kind: all spatial transforms
/// (`translate`, `rotate`, `scale`, `look_at`) own `Xform` cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreKind {
    /// Model/view transform matrix
    Xform,
    /// Projection definition
    Camera,
    /// Surface material coefficients
    Material,
    /// Mesh data
    Geometry,
    /// Texture layer stack
    Texture,
    /// Shader stage
    Shader,
    /// Render flags
    Flags,
    /// Light list
    Lights,
    /// Clip plane
    Clip,
}

/// Load status of a core's backend resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreStatus {
    /// All backend resources are resident.
    Ready,
    /// One or more asynchronous resource loads are still outstanding.
    Loading {
        /// Number of outstanding loads.
        pending: u32,
    },
}

/// A shareable bundle of rendering configuration.
///
/// Immutable in structure once built; its payload is mutated in place by
/// node setters, which notify the compilation scheduler on behalf of every
/// referencing node.
#[derive(Debug, Clone)]
pub struct StateCore {
    /// Kind tag, fixed at construction.
    pub kind: CoreKind,

    /// Kind-specific payload.
    pub data: CoreData,

    /// Monotonic id minted by the factory; the draw list's state-sort key is
    /// built from these, so objects sharing cores sort adjacently.
    pub state_id: u64,

    /// Explicit sharing id, when the core was requested by name.
    pub core_id: Option<String>,

    /// Number of live nodes referencing this core.
    pub use_count: u32,

    /// Backend resource load status.
    pub status: CoreStatus,
}

impl StateCore {
    /// Whether all backend resources for this core are resident.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == CoreStatus::Ready
    }
}
