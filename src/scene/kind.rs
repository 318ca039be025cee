//! Node kinds
//!
//! The scene graph is heterogeneous: every node carries a [`NodeKind`] tag
//! that decides which state core it owns, how its attributes are applied and
//! how the compiler treats mutations of it. Kinds are a closed sum type so
//! the compiler's level table can match on the variant instead of dispatching
//! on strings.

use crate::core::CoreKind;
use crate::errors::{Result, TrellisError};

/// The kind of a scene node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Structural grouping node with no state of its own.
    Group,
    /// Subtree holding shared definitions; traversed only through instances.
    Library,
    /// Translation transform.
    Translate,
    /// Axis/angle rotation transform.
    Rotate,
    /// Scale transform.
    Scale,
    /// View transform defined by eye/look/up.
    LookAt,
    /// Projection definition.
    Camera,
    /// Surface material coefficients.
    Material,
    /// Mesh data, possibly streamed from an external source.
    Geometry,
    /// Texture layer stack, loaded asynchronously.
    Texture,
    /// Custom shader stage with lazy program generation.
    Shader,
    /// Render flags (enabled, transparent, picking, backfaces).
    Flags,
    /// Light source list.
    Lights,
    /// Clip plane.
    Clip,
    /// Reference to a subtree defined elsewhere in the graph.
    Instance {
        /// Node id of the instanced target subtree.
        target: String,
    },
}

impl NodeKind {
    /// Resolves a kind name from a scene description record.
    ///
    /// An empty name means [`NodeKind::Group`], matching the front-end
    /// convention that untyped records are plain grouping nodes. Instance
    /// records must carry a `target` attribute naming the instanced node.
    pub fn parse(name: &str, attributes: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(match name {
            "" | "node" | "group" => NodeKind::Group,
            "library" => NodeKind::Library,
            "translate" => NodeKind::Translate,
            "rotate" => NodeKind::Rotate,
            "scale" => NodeKind::Scale,
            "look_at" | "lookAt" => NodeKind::LookAt,
            "camera" => NodeKind::Camera,
            "material" => NodeKind::Material,
            "geometry" => NodeKind::Geometry,
            "texture" => NodeKind::Texture,
            "shader" => NodeKind::Shader,
            "flags" => NodeKind::Flags,
            "lights" => NodeKind::Lights,
            "clip" => NodeKind::Clip,
            "instance" => {
                let target = attributes
                    .get("target")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| TrellisError::Configuration {
                        context: "instance node".to_string(),
                        message: "missing \"target\" attribute".to_string(),
                    })?;
                NodeKind::Instance {
                    target: target.to_string(),
                }
            }
            other => return Err(TrellisError::UnknownNodeKind(other.to_string())),
        })
    }

    /// Kind name as it appears in scene descriptions and log lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Library => "library",
            NodeKind::Translate => "translate",
            NodeKind::Rotate => "rotate",
            NodeKind::Scale => "scale",
            NodeKind::LookAt => "look_at",
            NodeKind::Camera => "camera",
            NodeKind::Material => "material",
            NodeKind::Geometry => "geometry",
            NodeKind::Texture => "texture",
            NodeKind::Shader => "shader",
            NodeKind::Flags => "flags",
            NodeKind::Lights => "lights",
            NodeKind::Clip => "clip",
            NodeKind::Instance { .. } => "instance",
        }
    }

    /// The core kind owned by nodes of this kind, if any.
    ///
    /// All spatial transform kinds share the `Xform` core kind, so an
    /// explicit core id may be shared between, say, a `translate` and a
    /// `rotate` node.
    #[must_use]
    pub fn core_kind(&self) -> Option<CoreKind> {
        match self {
            NodeKind::Group | NodeKind::Library | NodeKind::Instance { .. } => None,
            NodeKind::Translate | NodeKind::Rotate | NodeKind::Scale | NodeKind::LookAt => {
                Some(CoreKind::Xform)
            }
            NodeKind::Camera => Some(CoreKind::Camera),
            NodeKind::Material => Some(CoreKind::Material),
            NodeKind::Geometry => Some(CoreKind::Geometry),
            NodeKind::Texture => Some(CoreKind::Texture),
            NodeKind::Shader => Some(CoreKind::Shader),
            NodeKind::Flags => Some(CoreKind::Flags),
            NodeKind::Lights => Some(CoreKind::Lights),
            NodeKind::Clip => Some(CoreKind::Clip),
        }
    }

    /// Whether the compiler must revisit this node's subtree whenever the
    /// traversal reaches it, regardless of dirty flags.
    ///
    /// Shader nodes regenerate programs lazily; once a traversal touches one,
    /// everything beneath it is recompiled against the regenerated program.
    #[must_use]
    pub fn always_compile(&self) -> bool {
        matches!(self, NodeKind::Shader)
    }

    /// Whether this is an instance node.
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self, NodeKind::Instance { .. })
    }
}
