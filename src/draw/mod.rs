//! Flattened draw list.
//!
//! Compilation flattens the scene graph into draw objects — one per
//! geometry node per instance site — each carrying a snapshot of the state
//! core chain in effect at that point of the traversal. The list is sorted
//! by state-sort key so consecutive objects share as much GPU state as
//! possible, and rendering elides redundant binds between them.
//!
//! The scheduler's compilation levels exist specifically to avoid
//! invalidating this structure unnecessarily: in-place core mutations leave
//! object chains valid (core handles are stable), so only structural
//! recompilations rebuild objects.

pub mod rasterizer;

pub use rasterizer::{DrawCommand, Rasterizer, RecordingRasterizer};

use bitflags::bitflags;
use glam::Affine3A;
use rustc_hash::FxHashMap;

use crate::core::{CoreData, CoreFactory, CoreId, CoreKind};
use crate::scene::NodeId;

bitflags! {
    /// What parts of the draw pipeline must be refreshed before the next
    /// frame. Node setters touching visual state set `IMAGE` to force a
    /// redraw even absent structural recompilation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct DirtyFlags: u32 {
        /// Frame buffer needs redraw.
        const IMAGE       = 1 << 0;
        /// Command sequence needs re-emission.
        const DRAW_LIST   = 1 << 1;
        /// Object order needs re-sorting.
        const STATE_SORT  = 1 << 2;
        /// Object list membership changed.
        const OBJECT_LIST = 1 << 3;
    }
}

/// Snapshot of the nearest core of each kind above a point in the graph.
///
/// Core handles are stable across in-place mutation, so a chain stays valid
/// until the structure around it changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreChain {
    /// Innermost transform core.
    pub xform: Option<CoreId>,
    /// Nearest camera core.
    pub camera: Option<CoreId>,
    /// Nearest material core.
    pub material: Option<CoreId>,
    /// Nearest texture core.
    pub texture: Option<CoreId>,
    /// Nearest shader core.
    pub shader: Option<CoreId>,
    /// Nearest flags core.
    pub flags: Option<CoreId>,
    /// Nearest lights core.
    pub lights: Option<CoreId>,
    /// Nearest clip core.
    pub clip: Option<CoreId>,
    /// The geometry core being drawn.
    pub geometry: Option<CoreId>,
}

impl CoreChain {
    /// Records `core` in the slot for its kind.
    pub fn absorb(&mut self, kind: CoreKind, core: CoreId) {
        match kind {
            CoreKind::Xform => self.xform = Some(core),
            CoreKind::Camera => self.camera = Some(core),
            CoreKind::Material => self.material = Some(core),
            CoreKind::Texture => self.texture = Some(core),
            CoreKind::Shader => self.shader = Some(core),
            CoreKind::Flags => self.flags = Some(core),
            CoreKind::Lights => self.lights = Some(core),
            CoreKind::Clip => self.clip = Some(core),
            CoreKind::Geometry => self.geometry = Some(core),
        }
    }
}

/// Identifies one draw object: a geometry node, disambiguated by the
/// instance site it was reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// The geometry node.
    pub geometry: NodeId,
    /// Innermost instance node on the traversal path, if any.
    pub site: Option<NodeId>,
}

/// Ordering key for state sorting. Field order is sort priority: opaque
/// objects first, then grouped by shader, texture, material and transform
/// state ids so state switches are minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SortKey {
    /// Transparency bin; transparent objects draw last.
    pub transparent: bool,
    /// Shader state id.
    pub shader: u64,
    /// Texture state id.
    pub texture: u64,
    /// Material state id.
    pub material: u64,
    /// Transform state id.
    pub xform: u64,
}

/// One flattened draw object.
#[derive(Debug, Clone)]
pub struct DrawObject {
    /// Core chain snapshot taken at compilation.
    pub chain: CoreChain,
    /// Composed model matrix at this point of the traversal.
    pub model: Affine3A,
    /// State-sort key derived from the chain's state ids.
    pub key: SortKey,
}

/// The flattened, state-sorted draw sequence produced by compilation.
pub struct DrawList {
    objects: FxHashMap<ObjectKey, DrawObject>,
    order: Vec<ObjectKey>,
    flags: DirtyFlags,
}

// State id of 0 means "no core of that kind"; live ids are offset by one so
// absent state sorts before everything.
fn sort_id(core: Option<CoreId>, cores: &CoreFactory) -> u64 {
    core.and_then(|id| cores.get(id))
        .map_or(0, |c| c.state_id + 1)
}

impl DrawList {
    /// Creates an empty draw list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: FxHashMap::default(),
            order: Vec::new(),
            flags: DirtyFlags::all(), // First frame builds everything.
        }
    }

    /// Raises dirty flags, forcing the corresponding rebuild steps.
    pub fn mark(&mut self, flags: DirtyFlags) {
        self.flags |= flags;
    }

    /// Current dirty flags.
    #[must_use]
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.flags
    }

    /// Whether anything must be rebuilt or redrawn.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Number of registered objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Looks up a registered object.
    #[must_use]
    pub fn object(&self, key: &ObjectKey) -> Option<&DrawObject> {
        self.objects.get(key)
    }

    /// Registers (or refreshes) the draw object for a visited geometry node.
    ///
    /// Raises the narrowest set of dirty flags that covers the change: a new
    /// object invalidates the object list, a changed sort key invalidates
    /// the sort, anything at all invalidates the emitted commands.
    pub fn register_object(
        &mut self,
        key: ObjectKey,
        chain: CoreChain,
        model: Affine3A,
        cores: &CoreFactory,
    ) {
        let transparent = chain
            .flags
            .and_then(|id| cores.get(id))
            .is_some_and(|core| match &core.data {
                CoreData::Flags(f) => f.transparent,
                _ => false,
            });
        let sort_key = SortKey {
            transparent,
            shader: sort_id(chain.shader, cores),
            texture: sort_id(chain.texture, cores),
            material: sort_id(chain.material, cores),
            xform: sort_id(chain.xform, cores),
        };

        let object = DrawObject {
            chain,
            model,
            key: sort_key,
        };

        match self.objects.insert(key, object) {
            None => self.flags |= DirtyFlags::OBJECT_LIST
                | DirtyFlags::STATE_SORT
                | DirtyFlags::DRAW_LIST
                | DirtyFlags::IMAGE,
            Some(prev) => {
                if prev.key != sort_key {
                    self.flags |= DirtyFlags::STATE_SORT;
                }
                self.flags |= DirtyFlags::DRAW_LIST | DirtyFlags::IMAGE;
            }
        }
    }

    /// Removes every object belonging to a destroyed node, whether it was
    /// the geometry itself or the instance site it was drawn through.
    pub fn remove_node(&mut self, node: NodeId) {
        let before = self.objects.len();
        self.objects
            .retain(|key, _| key.geometry != node && key.site != Some(node));
        if self.objects.len() != before {
            self.flags |= DirtyFlags::OBJECT_LIST | DirtyFlags::DRAW_LIST | DirtyFlags::IMAGE;
        }
    }

    /// Drops all objects, e.g. before a full scene recompilation.
    pub fn clear_objects(&mut self) {
        if !self.objects.is_empty() {
            self.objects.clear();
            self.flags |= DirtyFlags::OBJECT_LIST | DirtyFlags::DRAW_LIST | DirtyFlags::IMAGE;
        }
    }

    /// Rebuilds, re-sorts and re-emits as the dirty flags demand, then
    /// clears them. Returns whether a frame was drawn.
    ///
    /// Redundant state binds between consecutive objects sharing cores are
    /// elided — this batching is what the state sort exists to maximize.
    pub fn render(
        &mut self,
        rasterizer: &mut dyn Rasterizer,
        cores: &CoreFactory,
        force: bool,
    ) -> bool {
        if self.flags.is_empty() && !force {
            return false;
        }

        if self.flags.contains(DirtyFlags::OBJECT_LIST) {
            self.order.clear();
            self.order.extend(self.objects.keys().copied());
            self.flags |= DirtyFlags::STATE_SORT;
        }

        if self.flags.contains(DirtyFlags::STATE_SORT) {
            let objects = &self.objects;
            self.order.sort_by_key(|key| objects[key].key);
            self.flags |= DirtyFlags::DRAW_LIST;
        }

        rasterizer.begin_frame();

        let mut bound = CoreChain::default();
        for key in &self.order {
            let object = &self.objects[key];

            // Disabled subtrees stay registered but draw nothing.
            let enabled = object
                .chain
                .flags
                .and_then(|id| cores.get(id))
                .is_none_or(|core| match &core.data {
                    CoreData::Flags(f) => f.enabled,
                    _ => true,
                });
            if !enabled {
                continue;
            }

            if object.chain.shader != bound.shader
                && let Some(id) = object.chain.shader
            {
                rasterizer.bind_shader(id);
                bound.shader = object.chain.shader;
            }
            if object.chain.texture != bound.texture
                && let Some(id) = object.chain.texture
            {
                rasterizer.bind_texture(id);
                bound.texture = object.chain.texture;
            }
            if object.chain.material != bound.material
                && let Some(id) = object.chain.material
            {
                rasterizer.bind_material(id);
                bound.material = object.chain.material;
            }
            if let Some(geometry) = object.chain.geometry {
                rasterizer.set_model_matrix(object.model);
                rasterizer.draw_geometry(geometry);
            }
        }

        rasterizer.end_frame();
        self.flags = DirtyFlags::empty();
        true
    }
}

impl Default for DrawList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FlagsCore, GeometryCore, MaterialCore, ShaderCore};
    use crate::scene::{Node, NodeKind, SceneGraph};

    fn geometry_key(graph: &mut SceneGraph) -> ObjectKey {
        let id = graph.insert(Node::new(NodeKind::Geometry), None).unwrap();
        ObjectKey {
            geometry: id,
            site: None,
        }
    }

    #[test]
    fn state_sort_groups_by_shader_first() {
        let mut graph = SceneGraph::new();
        let mut cores = CoreFactory::new();
        let mut draw = DrawList::new();

        let shader_a = cores
            .get_or_create(CoreKind::Shader, None, || {
                Ok(CoreData::Shader(ShaderCore::default()))
            })
            .unwrap();
        let shader_b = cores
            .get_or_create(CoreKind::Shader, None, || {
                Ok(CoreData::Shader(ShaderCore::default()))
            })
            .unwrap();
        let material = cores
            .get_or_create(CoreKind::Material, None, || {
                Ok(CoreData::Material(MaterialCore::default()))
            })
            .unwrap();
        let geo = cores
            .get_or_create(CoreKind::Geometry, None, || {
                Ok(CoreData::Geometry(GeometryCore::default()))
            })
            .unwrap();

        // Interleave shaders so sorting has to regroup them.
        for shader in [shader_a, shader_b, shader_a, shader_b] {
            let key = geometry_key(&mut graph);
            let chain = CoreChain {
                shader: Some(shader),
                material: Some(material),
                geometry: Some(geo),
                ..CoreChain::default()
            };
            draw.register_object(key, chain, Affine3A::IDENTITY, &cores);
        }

        let mut recorder = RecordingRasterizer::default();
        assert!(draw.render(&mut recorder, &cores, false));

        // Two shader binds, not four: objects sharing a shader are adjacent.
        let shader_binds = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::BindShader(_)))
            .count();
        assert_eq!(shader_binds, 2);
        let draws = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawGeometry(_)))
            .count();
        assert_eq!(draws, 4);
    }

    #[test]
    fn disabled_flags_core_culls_object() {
        let mut graph = SceneGraph::new();
        let mut cores = CoreFactory::new();
        let mut draw = DrawList::new();

        let flags = cores
            .get_or_create(CoreKind::Flags, None, || {
                Ok(CoreData::Flags(FlagsCore {
                    enabled: false,
                    ..FlagsCore::default()
                }))
            })
            .unwrap();
        let geo = cores
            .get_or_create(CoreKind::Geometry, None, || {
                Ok(CoreData::Geometry(GeometryCore::default()))
            })
            .unwrap();

        let key = geometry_key(&mut graph);
        let chain = CoreChain {
            flags: Some(flags),
            geometry: Some(geo),
            ..CoreChain::default()
        };
        draw.register_object(key, chain, Affine3A::IDENTITY, &cores);

        let mut recorder = RecordingRasterizer::default();
        draw.render(&mut recorder, &cores, false);
        assert!(
            !recorder
                .commands
                .iter()
                .any(|c| matches!(c, DrawCommand::DrawGeometry(_)))
        );
    }

    #[test]
    fn clean_list_skips_rendering_unless_forced() {
        let cores = CoreFactory::new();
        let mut draw = DrawList::new();
        let mut recorder = RecordingRasterizer::default();

        assert!(draw.render(&mut recorder, &cores, false)); // initial build
        assert!(!draw.render(&mut recorder, &cores, false)); // nothing dirty
        assert!(draw.render(&mut recorder, &cores, true)); // forced
    }

    #[test]
    fn removing_a_node_invalidates_the_object_list() {
        let mut graph = SceneGraph::new();
        let cores = CoreFactory::new();
        let mut draw = DrawList::new();
        let key = geometry_key(&mut graph);
        draw.register_object(key, CoreChain::default(), Affine3A::IDENTITY, &cores);
        let mut recorder = RecordingRasterizer::default();
        draw.render(&mut recorder, &cores, false);

        draw.remove_node(key.geometry);
        assert!(draw.dirty_flags().contains(DirtyFlags::OBJECT_LIST));
        assert_eq!(draw.object_count(), 0);
    }
}
