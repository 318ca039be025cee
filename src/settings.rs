//! Engine configuration.
//!
//! [`EngineSettings`] is plain data fixed at engine construction;
//! [`StartOptions`] carries the per-run hooks installed by
//! [`Engine::start`](crate::Engine::start).

use crate::engine::{Engine, FrameState};

/// Construction-time engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// The incremental compilation switch.
    ///
    /// When off, any mutation recompiles the entire scene — the
    /// non-incremental baseline, useful for correctness testing. Defaults
    /// to on.
    pub incremental_compilation: bool,

    /// Number of times the scene is drawn each frame (e.g. 2 for stereo
    /// eye passes).
    pub passes: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            incremental_compilation: true,
            passes: 1,
        }
    }
}

/// Per-frame hook invoked by the render loop.
pub type FrameHook = Box<dyn FnMut(&mut Engine, FrameState)>;

/// Options for one run of the render loop.
#[derive(Default)]
pub struct StartOptions {
    /// Invoked at the start of every tick, before compilation. The usual
    /// place for animation-style attribute mutation.
    pub on_idle: Option<FrameHook>,

    /// Invoked once when the loop finds nothing to compile or draw, then
    /// not again until after the next rendered frame.
    pub on_sleep: Option<FrameHook>,
}

impl StartOptions {
    /// Options with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle hook.
    #[must_use]
    pub fn with_idle(mut self, hook: impl FnMut(&mut Engine, FrameState) + 'static) -> Self {
        self.on_idle = Some(Box::new(hook));
        self
    }

    /// Sets the sleep hook.
    #[must_use]
    pub fn with_sleep(mut self, hook: impl FnMut(&mut Engine, FrameState) + 'static) -> Self {
        self.on_sleep = Some(Box::new(hook));
        self
    }
}
