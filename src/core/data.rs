//! Kind-specific core payloads and attribute application.
//!
//! Node setters route through [`CoreData::apply`], which mutates the shared
//! payload in place. The caller (the engine's selector) is responsible for
//! notifying the compilation scheduler afterwards with the same
//! `(op, attr)` tuple — this module only validates and stores values.

use glam::{Affine3A, Quat, Vec3};
use serde_json::Value;

use crate::errors::{Result, TrellisError};
use crate::scene::Op;

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn expect_f32(attr: &str, value: &Value) -> Result<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| TrellisError::AttributeType {
            attr: attr.to_string(),
            expected: "a number",
        })
}

fn expect_bool(attr: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "a boolean",
    })
}

fn expect_str<'a>(attr: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "a string",
    })
}

/// Accepts `[x, y, z]` or `{"x": .., "y": .., "z": ..}`.
fn expect_vec3(attr: &str, value: &Value) -> Result<Vec3> {
    if let Some(arr) = value.as_array()
        && arr.len() == 3
        && let (Some(x), Some(y), Some(z)) = (arr[0].as_f64(), arr[1].as_f64(), arr[2].as_f64())
    {
        return Ok(Vec3::new(x as f32, y as f32, z as f32));
    }
    if let Some(obj) = value.as_object() {
        let get = |k: &str| obj.get(k).and_then(Value::as_f64).unwrap_or(0.0) as f32;
        if obj.contains_key("x") || obj.contains_key("y") || obj.contains_key("z") {
            return Ok(Vec3::new(get("x"), get("y"), get("z")));
        }
        if obj.contains_key("r") || obj.contains_key("g") || obj.contains_key("b") {
            return Ok(Vec3::new(get("r"), get("g"), get("b")));
        }
    }
    Err(TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "a 3-component vector",
    })
}

fn expect_f32_array(attr: &str, value: &Value) -> Result<Vec<f32>> {
    let arr = value.as_array().ok_or_else(|| TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "an array of numbers",
    })?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| TrellisError::AttributeType {
                    attr: attr.to_string(),
                    expected: "an array of numbers",
                })
        })
        .collect()
}

fn expect_u32_array(attr: &str, value: &Value) -> Result<Vec<u32>> {
    let arr = value.as_array().ok_or_else(|| TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "an array of indices",
    })?;
    arr.iter()
        .map(|v| {
            v.as_u64()
                .map(|i| i as u32)
                .ok_or_else(|| TrellisError::AttributeType {
                    attr: attr.to_string(),
                    expected: "an array of indices",
                })
        })
        .collect()
}

fn unknown(kind: &'static str, attr: &str) -> TrellisError {
    TrellisError::UnknownAttribute {
        kind,
        attr: attr.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Parameters of a spatial transform core.
#[derive(Debug, Clone, PartialEq)]
pub enum XformForm {
    /// Translation by an offset.
    Translate {
        /// Offset in parent space.
        offset: Vec3,
    },
    /// Rotation around an axis, in degrees.
    Rotate {
        /// Rotation axis (need not be normalized).
        axis: Vec3,
        /// Angle in degrees.
        angle_deg: f32,
    },
    /// Non-uniform scale.
    Scale {
        /// Per-axis factors.
        factors: Vec3,
    },
    /// View transform defined by eye, look point and up vector.
    LookAt {
        /// Eye position.
        eye: Vec3,
        /// Point being looked at.
        look: Vec3,
        /// Up direction.
        up: Vec3,
    },
}

/// Shared transform state. The matrix is recomputed on every mutation so
/// traversal can compose model matrices without touching the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct XformCore {
    /// Transform parameters.
    pub form: XformForm,
    /// Matrix derived from `form`.
    pub matrix: Affine3A,
}

impl XformCore {
    /// Creates a transform core with the given parameters.
    #[must_use]
    pub fn new(form: XformForm) -> Self {
        let mut core = Self {
            form,
            matrix: Affine3A::IDENTITY,
        };
        core.recompute();
        core
    }

    fn recompute(&mut self) {
        self.matrix = match &self.form {
            XformForm::Translate { offset } => Affine3A::from_translation(*offset),
            XformForm::Rotate { axis, angle_deg } => {
                let axis = axis.try_normalize().unwrap_or(Vec3::Y);
                Affine3A::from_quat(Quat::from_axis_angle(axis, angle_deg.to_radians()))
            }
            XformForm::Scale { factors } => Affine3A::from_scale(*factors),
            XformForm::LookAt { eye, look, up } => {
                Affine3A::look_at_rh(*eye, *look, *up)
            }
        };
    }

    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        let inc = op == Op::Inc;
        match &mut self.form {
            XformForm::Translate { offset } => match attr {
                "x" => apply_scalar(&mut offset.x, attr, value, inc)?,
                "y" => apply_scalar(&mut offset.y, attr, value, inc)?,
                "z" => apply_scalar(&mut offset.z, attr, value, inc)?,
                "xyz" => apply_vec3(offset, attr, value, inc)?,
                _ => return Err(unknown("translate", attr)),
            },
            XformForm::Rotate { axis, angle_deg } => match attr {
                "angle" => apply_scalar(angle_deg, attr, value, inc)?,
                "x" => apply_scalar(&mut axis.x, attr, value, inc)?,
                "y" => apply_scalar(&mut axis.y, attr, value, inc)?,
                "z" => apply_scalar(&mut axis.z, attr, value, inc)?,
                _ => return Err(unknown("rotate", attr)),
            },
            XformForm::Scale { factors } => match attr {
                "x" => apply_scalar(&mut factors.x, attr, value, inc)?,
                "y" => apply_scalar(&mut factors.y, attr, value, inc)?,
                "z" => apply_scalar(&mut factors.z, attr, value, inc)?,
                "xyz" => apply_vec3(factors, attr, value, inc)?,
                _ => return Err(unknown("scale", attr)),
            },
            XformForm::LookAt { eye, look, up } => match attr {
                "eye" => apply_vec3(eye, attr, value, inc)?,
                "look" => apply_vec3(look, attr, value, inc)?,
                "up" => apply_vec3(up, attr, value, inc)?,
                _ => return Err(unknown("look_at", attr)),
            },
        }
        self.recompute();
        Ok(())
    }
}

fn apply_scalar(slot: &mut f32, attr: &str, value: &Value, inc: bool) -> Result<()> {
    let v = expect_f32(attr, value)?;
    if inc {
        *slot += v;
    } else {
        *slot = v;
    }
    Ok(())
}

fn apply_vec3(slot: &mut Vec3, attr: &str, value: &Value, inc: bool) -> Result<()> {
    let v = expect_vec3(attr, value)?;
    if inc {
        *slot += v;
    } else {
        *slot = v;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Projection definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCore {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl Default for CameraCore {
    fn default() -> Self {
        Self {
            fovy: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 5000.0,
        }
    }
}

impl CameraCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        let inc = op == Op::Inc;
        match attr {
            "fovy" => apply_scalar(&mut self.fovy, attr, value, inc),
            "aspect" => apply_scalar(&mut self.aspect, attr, value, inc),
            "near" => apply_scalar(&mut self.near, attr, value, inc),
            "far" => apply_scalar(&mut self.far, attr, value, inc),
            _ => Err(unknown("camera", attr)),
        }
    }
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

/// Surface material coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCore {
    /// Diffuse base color.
    pub base_color: Vec3,
    /// Specular highlight color.
    pub specular_color: Vec3,
    /// Specular intensity factor.
    pub specular: f32,
    /// Specular exponent.
    pub shine: f32,
    /// Self-illumination factor.
    pub emit: f32,
    /// Opacity.
    pub alpha: f32,
}

impl Default for MaterialCore {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            specular_color: Vec3::ONE,
            specular: 1.0,
            shine: 10.0,
            emit: 0.0,
            alpha: 1.0,
        }
    }
}

impl MaterialCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        let inc = op == Op::Inc;
        match attr {
            "base_color" => apply_vec3(&mut self.base_color, attr, value, inc),
            "specular_color" => apply_vec3(&mut self.specular_color, attr, value, inc),
            "specular" => apply_scalar(&mut self.specular, attr, value, inc),
            "shine" => apply_scalar(&mut self.shine, attr, value, inc),
            "emit" => apply_scalar(&mut self.emit, attr, value, inc),
            "alpha" => apply_scalar(&mut self.alpha, attr, value, inc),
            _ => Err(unknown("material", attr)),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Mesh primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Primitive {
    /// Triangle list
    #[default]
    Triangles,
    /// Line list
    Lines,
    /// Point list
    Points,
}

impl Primitive {
    fn parse(attr: &str, value: &Value) -> Result<Self> {
        match expect_str(attr, value)? {
            "triangles" => Ok(Primitive::Triangles),
            "lines" => Ok(Primitive::Lines),
            "points" => Ok(Primitive::Points),
            _ => Err(TrellisError::AttributeType {
                attr: attr.to_string(),
                expected: "one of \"triangles\", \"lines\", \"points\"",
            }),
        }
    }
}

/// Mesh data, possibly streamed from an external source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryCore {
    /// Primitive topology.
    pub primitive: Primitive,
    /// Interleaved position components (xyz).
    pub positions: Vec<f32>,
    /// Interleaved normal components (xyz).
    pub normals: Vec<f32>,
    /// Interleaved texture coordinates (uv).
    pub uvs: Vec<f32>,
    /// Triangle/line/point indices.
    pub indices: Vec<u32>,
    /// External source to stream the mesh from, if not inlined.
    pub source: Option<String>,
    /// Whether streamed data has arrived. Inlined geometry starts loaded.
    pub loaded: bool,
}

impl GeometryCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        if op == Op::Inc {
            return Err(unknown("geometry", attr));
        }
        match attr {
            "primitive" => self.primitive = Primitive::parse(attr, value)?,
            "positions" => self.positions = expect_f32_array(attr, value)?,
            "normals" => self.normals = expect_f32_array(attr, value)?,
            "uvs" => self.uvs = expect_f32_array(attr, value)?,
            "indices" => self.indices = expect_u32_array(attr, value)?,
            "source" => {
                self.source = Some(expect_str(attr, value)?.to_string());
                self.loaded = false;
            }
            _ => return Err(unknown("geometry", attr)),
        }
        Ok(())
    }

    /// Number of vertices described by the position array.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

// ---------------------------------------------------------------------------
// Texture
// ---------------------------------------------------------------------------

/// One layer of a texture stack.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureLayer {
    /// Source path or URL of the image.
    pub source: String,
    /// Blend factor against the layer below.
    pub blend_factor: f32,
    /// Whether the image has arrived from the loader.
    pub loaded: bool,
}

/// Texture layer stack, loaded asynchronously layer by layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureCore {
    /// Layers, composited bottom-up.
    pub layers: Vec<TextureLayer>,
}

impl TextureCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        match (op, attr) {
            (Op::Set, "layers") => {
                self.layers = parse_layers(attr, value)?;
                Ok(())
            }
            (Op::Add, "layers") => {
                self.layers.extend(parse_layers(attr, value)?);
                Ok(())
            }
            _ => Err(unknown("texture", attr)),
        }
    }

    /// Number of layers whose image has not arrived yet.
    #[must_use]
    pub fn pending_layers(&self) -> u32 {
        self.layers.iter().filter(|l| !l.loaded).count() as u32
    }
}

fn parse_layers(attr: &str, value: &Value) -> Result<Vec<TextureLayer>> {
    let arr = value.as_array().ok_or_else(|| TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "an array of layer objects",
    })?;
    arr.iter()
        .map(|entry| {
            let obj = entry.as_object().ok_or_else(|| TrellisError::AttributeType {
                attr: attr.to_string(),
                expected: "an array of layer objects",
            })?;
            let source = obj
                .get("source")
                .and_then(Value::as_str)
                .ok_or_else(|| TrellisError::Configuration {
                    context: "texture layer".to_string(),
                    message: "missing \"source\" field".to_string(),
                })?;
            Ok(TextureLayer {
                source: source.to_string(),
                blend_factor: obj
                    .get("blend_factor")
                    .and_then(Value::as_f64)
                    .unwrap_or(1.0) as f32,
                loaded: false,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shader
// ---------------------------------------------------------------------------

/// Custom shader stage. Program generation is lazy and expensive, which is
/// why shader nodes opt into unconditional recompilation when touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderCore {
    /// Shader source text.
    pub source: String,
    /// Hook names the generated program exposes.
    pub hooks: Vec<String>,
    /// Uniform parameter values, updatable without regenerating the program.
    pub params: serde_json::Map<String, Value>,
}

impl ShaderCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        match (op, attr) {
            (Op::Set, "source") => {
                self.source = expect_str(attr, value)?.to_string();
                Ok(())
            }
            (Op::Set | Op::Inc, "params") => {
                let obj = value.as_object().ok_or_else(|| TrellisError::AttributeType {
                    attr: attr.to_string(),
                    expected: "an object of parameter values",
                })?;
                for (k, v) in obj {
                    self.params.insert(k.clone(), v.clone());
                }
                Ok(())
            }
            _ => Err(unknown("shader", attr)),
        }
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Render flags inherited by the subtree below the owning node.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagsCore {
    /// Subtree participates in rendering at all.
    pub enabled: bool,
    /// Subtree is drawn in the transparency bin.
    pub transparent: bool,
    /// Subtree participates in picking.
    pub picking: bool,
    /// Back faces are drawn.
    pub backfaces: bool,
}

impl Default for FlagsCore {
    fn default() -> Self {
        Self {
            enabled: true,
            transparent: false,
            picking: true,
            backfaces: true,
        }
    }
}

impl FlagsCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        if !matches!(op, Op::Set | Op::Add) {
            return Err(unknown("flags", attr));
        }
        match attr {
            "enabled" => self.enabled = expect_bool(attr, value)?,
            "transparent" => self.transparent = expect_bool(attr, value)?,
            "picking" => self.picking = expect_bool(attr, value)?,
            "backfaces" => self.backfaces = expect_bool(attr, value)?,
            _ => return Err(unknown("flags", attr)),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lights
// ---------------------------------------------------------------------------

/// How a light illuminates the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightMode {
    /// Parallel rays along `dir`
    #[default]
    Directional,
    /// Omnidirectional from `pos`
    Point,
}

/// One light source.
#[derive(Debug, Clone, PartialEq)]
pub struct LightDef {
    /// Illumination mode.
    pub mode: LightMode,
    /// Light color.
    pub color: Vec3,
    /// Direction, for directional lights.
    pub dir: Vec3,
    /// Position, for point lights.
    pub pos: Vec3,
}

/// Light source list shared by the subtree below the owning node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightsCore {
    /// Active lights.
    pub lights: Vec<LightDef>,
}

impl LightsCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        match (op, attr) {
            (Op::Set, "lights") => {
                self.lights = parse_lights(attr, value)?;
                Ok(())
            }
            (Op::Add, "lights") => {
                self.lights.extend(parse_lights(attr, value)?);
                Ok(())
            }
            _ => Err(unknown("lights", attr)),
        }
    }
}

fn parse_lights(attr: &str, value: &Value) -> Result<Vec<LightDef>> {
    let arr = value.as_array().ok_or_else(|| TrellisError::AttributeType {
        attr: attr.to_string(),
        expected: "an array of light objects",
    })?;
    arr.iter()
        .map(|entry| {
            let obj = entry.as_object().ok_or_else(|| TrellisError::AttributeType {
                attr: attr.to_string(),
                expected: "an array of light objects",
            })?;
            let mode = match obj.get("mode").and_then(Value::as_str) {
                Some("point") => LightMode::Point,
                _ => LightMode::Directional,
            };
            let vec_field = |key: &str, default: Vec3| {
                obj.get(key)
                    .map(|v| expect_vec3(attr, v))
                    .transpose()
                    .map(|o| o.unwrap_or(default))
            };
            Ok(LightDef {
                mode,
                color: vec_field("color", Vec3::ONE)?,
                dir: vec_field("dir", -Vec3::Y)?,
                pos: vec_field("pos", Vec3::ZERO)?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// Which half-space a clip plane keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    /// Keep fragments in front of the plane
    #[default]
    Inside,
    /// Keep fragments behind the plane
    Outside,
    /// Plane has no effect
    Disabled,
}

/// A single clip plane composed along the traversal path.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipCore {
    /// Plane normal.
    pub normal: Vec3,
    /// Signed distance from origin.
    pub dist: f32,
    /// Half-space selection.
    pub mode: ClipMode,
}

impl Default for ClipCore {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            dist: 0.0,
            mode: ClipMode::Inside,
        }
    }
}

impl ClipCore {
    fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        let inc = op == Op::Inc;
        match attr {
            "x" => apply_scalar(&mut self.normal.x, attr, value, inc)?,
            "y" => apply_scalar(&mut self.normal.y, attr, value, inc)?,
            "z" => apply_scalar(&mut self.normal.z, attr, value, inc)?,
            "dist" => apply_scalar(&mut self.dist, attr, value, inc)?,
            "mode" => {
                self.mode = match expect_str(attr, value)? {
                    "inside" => ClipMode::Inside,
                    "outside" => ClipMode::Outside,
                    "disabled" => ClipMode::Disabled,
                    _ => {
                        return Err(TrellisError::AttributeType {
                            attr: attr.to_string(),
                            expected: "one of \"inside\", \"outside\", \"disabled\"",
                        });
                    }
                };
            }
            _ => return Err(unknown("clip", attr)),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CoreData
// ---------------------------------------------------------------------------

/// Kind-specific payload of a [`StateCore`](crate::core::StateCore).
#[derive(Debug, Clone, PartialEq)]
pub enum CoreData {
    /// Spatial transform
    Xform(XformCore),
    /// Projection
    Camera(CameraCore),
    /// Surface material
    Material(MaterialCore),
    /// Mesh data
    Geometry(GeometryCore),
    /// Texture stack
    Texture(TextureCore),
    /// Shader stage
    Shader(ShaderCore),
    /// Render flags
    Flags(FlagsCore),
    /// Light list
    Lights(LightsCore),
    /// Clip plane
    Clip(ClipCore),
}

impl CoreData {
    /// Default payload for a node kind, for kinds that own a core.
    ///
    /// The concrete transform form depends on the node kind even though all
    /// transforms share one core kind.
    #[must_use]
    pub fn default_for(kind: &crate::scene::NodeKind) -> Option<Self> {
        use crate::scene::NodeKind;
        Some(match kind {
            NodeKind::Translate => {
                CoreData::Xform(XformCore::new(XformForm::Translate { offset: Vec3::ZERO }))
            }
            NodeKind::Rotate => CoreData::Xform(XformCore::new(XformForm::Rotate {
                axis: Vec3::Y,
                angle_deg: 0.0,
            })),
            NodeKind::Scale => {
                CoreData::Xform(XformCore::new(XformForm::Scale { factors: Vec3::ONE }))
            }
            NodeKind::LookAt => CoreData::Xform(XformCore::new(XformForm::LookAt {
                eye: Vec3::new(0.0, 0.0, 10.0),
                look: Vec3::ZERO,
                up: Vec3::Y,
            })),
            NodeKind::Camera => CoreData::Camera(CameraCore::default()),
            NodeKind::Material => CoreData::Material(MaterialCore::default()),
            NodeKind::Geometry => CoreData::Geometry(GeometryCore::default()),
            NodeKind::Texture => CoreData::Texture(TextureCore::default()),
            NodeKind::Shader => CoreData::Shader(ShaderCore::default()),
            NodeKind::Flags => CoreData::Flags(FlagsCore::default()),
            NodeKind::Lights => CoreData::Lights(LightsCore::default()),
            NodeKind::Clip => CoreData::Clip(ClipCore::default()),
            NodeKind::Group | NodeKind::Library | NodeKind::Instance { .. } => return None,
        })
    }

    /// Applies one mutation to the payload.
    ///
    /// The caller notifies the compilation scheduler with the same tuple; a
    /// payload mutation that returns `Err` must not be followed by a notify.
    pub fn apply(&mut self, op: Op, attr: &str, value: &Value) -> Result<()> {
        match self {
            CoreData::Xform(x) => x.apply(op, attr, value),
            CoreData::Camera(c) => c.apply(op, attr, value),
            CoreData::Material(m) => m.apply(op, attr, value),
            CoreData::Geometry(g) => g.apply(op, attr, value),
            CoreData::Texture(t) => t.apply(op, attr, value),
            CoreData::Shader(s) => s.apply(op, attr, value),
            CoreData::Flags(f) => f.apply(op, attr, value),
            CoreData::Lights(l) => l.apply(op, attr, value),
            CoreData::Clip(c) => c.apply(op, attr, value),
        }
    }

    /// The transform matrix, when this is an xform payload.
    #[must_use]
    pub fn matrix(&self) -> Option<&Affine3A> {
        match self {
            CoreData::Xform(x) => Some(&x.matrix),
            _ => None,
        }
    }
}
