//! Resource loader boundary.
//!
//! Texture images and streamed geometry arrive from outside the frame loop.
//! The engine hands a [`ResourceRequest`] to the configured
//! [`ResourceLoader`] together with a channel sender; the loader replies
//! whenever it likes — same tick, a later tick, or never — and the engine
//! drains the channel at the start of each tick. A delivery for a core that
//! has since been released, or a node that has since been destroyed, is
//! simply discarded.

use crate::core::CoreId;

/// What kind of resource a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A texture layer image.
    TextureImage,
    /// Streamed mesh data.
    GeometryData,
}

/// A pending load issued at core construction.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    /// The core awaiting the resource.
    pub core: CoreId,
    /// Which texture layer the request is for (0 for geometry).
    pub layer: usize,
    /// Source path or URL.
    pub source: String,
    /// Resource kind.
    pub kind: ResourceKind,
}

/// Decoded resource payload.
#[derive(Debug, Clone)]
pub enum ResourcePayload {
    /// A decoded image.
    Image {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Decoded mesh arrays.
    Geometry {
        /// Interleaved position components (xyz).
        positions: Vec<f32>,
        /// Triangle indices.
        indices: Vec<u32>,
    },
}

/// A completed (or failed) load, sent back over the delivery channel.
#[derive(Debug, Clone)]
pub struct ResourceDelivery {
    /// The core the request was issued for.
    pub core: CoreId,
    /// Which texture layer the delivery is for.
    pub layer: usize,
    /// Source path, echoed for error reporting.
    pub source: String,
    /// The payload, or a failure description.
    pub result: Result<ResourcePayload, String>,
}

/// Fulfils resource requests asynchronously.
pub trait ResourceLoader {
    /// Begins loading. The implementation sends a [`ResourceDelivery`] on
    /// `reply` when done; dropping the request without replying leaves the
    /// core in its loading state forever, which is legal but unhelpful.
    fn request(&mut self, request: ResourceRequest, reply: flume::Sender<ResourceDelivery>);
}

/// Loader that parks every request for the embedder (or a test) to fulfil
/// by hand through the engine's delivery sender.
///
/// The request list is behind a shared handle so it stays inspectable after
/// the loader is boxed into the engine.
#[derive(Debug, Default)]
pub struct QueueLoader {
    requests: std::rc::Rc<std::cell::RefCell<Vec<ResourceRequest>>>,
}

impl QueueLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared handle onto the parked requests.
    #[must_use]
    pub fn handle(&self) -> std::rc::Rc<std::cell::RefCell<Vec<ResourceRequest>>> {
        std::rc::Rc::clone(&self.requests)
    }
}

impl ResourceLoader for QueueLoader {
    fn request(&mut self, request: ResourceRequest, _reply: flume::Sender<ResourceDelivery>) {
        log::debug!("queued load of {:?} ({:?})", request.source, request.kind);
        self.requests.borrow_mut().push(request);
    }
}

/// Loader that immediately delivers an empty placeholder payload. Useful in
/// demos where load latency is irrelevant.
#[derive(Debug, Default)]
pub struct InstantLoader;

impl ResourceLoader for InstantLoader {
    fn request(&mut self, request: ResourceRequest, reply: flume::Sender<ResourceDelivery>) {
        let payload = match request.kind {
            ResourceKind::TextureImage => ResourcePayload::Image {
                width: 1,
                height: 1,
            },
            ResourceKind::GeometryData => ResourcePayload::Geometry {
                positions: Vec::new(),
                indices: Vec::new(),
            },
        };
        let _ = reply.send(ResourceDelivery {
            core: request.core,
            layer: request.layer,
            source: request.source,
            result: Ok(payload),
        });
    }
}
