//! Rasterizer backend boundary.
//!
//! The engine never talks to a graphics API directly; it emits an abstract
//! command stream to a [`Rasterizer`] implementation. Real backends bind
//! programs and buffers; [`RecordingRasterizer`] just records the stream,
//! which is what the tests and demos inspect.

use glam::Affine3A;

use crate::core::CoreId;

/// Consumer of the draw list's command stream.
///
/// Commands arrive state-sorted and pre-batched: a `bind_*` call is only
/// issued when the bound core actually changes between objects.
pub trait Rasterizer {
    /// Frame begins; clear targets.
    fn begin_frame(&mut self);
    /// Bind the program generated for a shader core.
    fn bind_shader(&mut self, core: CoreId);
    /// Bind a texture core's layer stack.
    fn bind_texture(&mut self, core: CoreId);
    /// Upload a material core's coefficients.
    fn bind_material(&mut self, core: CoreId);
    /// Set the model matrix for the next draw.
    fn set_model_matrix(&mut self, model: Affine3A);
    /// Draw a geometry core.
    fn draw_geometry(&mut self, core: CoreId);
    /// Frame ends; present.
    fn end_frame(&mut self);
}

/// One recorded backend command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Frame began
    BeginFrame,
    /// Shader bound
    BindShader(CoreId),
    /// Texture bound
    BindTexture(CoreId),
    /// Material bound
    BindMaterial(CoreId),
    /// Model matrix set
    SetModelMatrix(Affine3A),
    /// Geometry drawn
    DrawGeometry(CoreId),
    /// Frame ended
    EndFrame,
}

/// Backend that records the command stream instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRasterizer {
    /// Commands recorded since construction or the last [`Self::clear`].
    pub commands: Vec<DrawCommand>,
    /// Number of completed frames.
    pub frames: u64,
}

impl RecordingRasterizer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets recorded commands, keeping the frame counter.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of draw calls recorded.
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawGeometry(_)))
            .count()
    }
}

impl Rasterizer for RecordingRasterizer {
    fn begin_frame(&mut self) {
        self.commands.push(DrawCommand::BeginFrame);
    }

    fn bind_shader(&mut self, core: CoreId) {
        self.commands.push(DrawCommand::BindShader(core));
    }

    fn bind_texture(&mut self, core: CoreId) {
        self.commands.push(DrawCommand::BindTexture(core));
    }

    fn bind_material(&mut self, core: CoreId) {
        self.commands.push(DrawCommand::BindMaterial(core));
    }

    fn set_model_matrix(&mut self, model: Affine3A) {
        self.commands.push(DrawCommand::SetModelMatrix(model));
    }

    fn draw_geometry(&mut self, core: CoreId) {
        self.commands.push(DrawCommand::DrawGeometry(core));
    }

    fn end_frame(&mut self) {
        self.commands.push(DrawCommand::EndFrame);
        self.frames += 1;
    }
}
