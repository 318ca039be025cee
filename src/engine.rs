//! Engine Core Module
//!
//! This module contains [`Engine`], the owner of one scene graph and the
//! driver of its per-frame cycle. The engine is a pure instance without any
//! window management, so it can be driven by whatever supplies frame ticks
//! (a windowing loop, a test, a headless batch job).
//!
//! # Frame cycle
//!
//! Each [`Engine::tick`], in order:
//!
//! 1. invokes the user idle hook,
//! 2. drains asynchronous resource deliveries into the affected cores,
//! 3. performs batched node destruction (never mid-traversal),
//! 4. flushes the compilation scheduler and, if anything is pending,
//!    re-traverses exactly the invalidated parts of the graph,
//! 5. renders the draw list, or invokes the sleep hook when there is
//!    nothing to do.
//!
//! # Lifecycle
//!
//! `Stopped → Running ⇄ Paused → Stopped`, with `destroy` tearing the scene
//! down for good. `destroy_node` only enqueues; actual teardown happens at
//! the top of the next tick so destruction can never invalidate in-flight
//! traversal state.

use std::collections::VecDeque;

use crate::compile::{self, CompileStats, Scheduler};
use crate::core::{CoreData, CoreFactory, CoreId, CoreKind, CoreStatus};
use crate::draw::{DirtyFlags, DrawList, Rasterizer};
use crate::errors::{Result, TrellisError};
use crate::loader::{
    ResourceDelivery, ResourceKind, ResourceLoader, ResourcePayload, ResourceRequest,
};
use crate::scene::{NodeFactory, NodeId, NodeKind, NodeSelector, NodeSpec, Op, SceneGraph};
use crate::settings::{EngineSettings, StartOptions};

use rustc_hash::FxHashMap;

/// Render loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Not running.
    #[default]
    Stopped,
    /// Ticking normally.
    Running,
    /// Suspended without tearing down state.
    Paused,
}

/// Per-frame timing information passed to user hooks.
#[derive(Debug, Clone, Copy)]
pub struct FrameState {
    /// Total elapsed time since the loop started (in seconds).
    pub time: f32,
    /// Delta time since the last frame (in seconds).
    pub dt: f32,
    /// Total number of ticks since startup.
    pub frame_count: u64,
}

/// Observable engine events, polled by user code.
///
/// Resource failures arrive here rather than as errors because they occur
/// outside the call stack of any user action.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The render loop started.
    Started,
    /// The render loop stopped.
    Stopped,
    /// The loop went to sleep: nothing to compile or draw.
    Sleeping,
    /// An asynchronous resource load failed. The node keeps its previous
    /// (possibly placeholder) core.
    ResourceError {
        /// A node owning the affected core.
        node: NodeId,
        /// Source path of the failed resource.
        source: String,
        /// Loader-provided description.
        message: String,
    },
}

/// Per-node and scene-wide pending load counters, from which "all assets
/// loaded" is computed.
#[derive(Debug, Default)]
pub struct SceneStatus {
    node_tasks: FxHashMap<NodeId, u32>,
    total: u32,
}

impl SceneStatus {
    fn task_started(&mut self, node: NodeId) {
        *self.node_tasks.entry(node).or_insert(0) += 1;
        self.total += 1;
    }

    fn task_finished(&mut self, node: NodeId) {
        if let Some(count) = self.node_tasks.get_mut(&node) {
            *count -= 1;
            self.total -= 1;
            if *count == 0 {
                self.node_tasks.remove(&node);
            }
        }
    }

    fn forget_node(&mut self, node: NodeId) {
        if let Some(count) = self.node_tasks.remove(&node) {
            self.total -= count;
        }
    }

    /// Loads still in flight for one node.
    #[must_use]
    pub fn node_tasks(&self, node: NodeId) -> u32 {
        self.node_tasks.get(&node).copied().unwrap_or(0)
    }

    /// Loads still in flight scene-wide.
    #[must_use]
    pub fn loading_tasks(&self) -> u32 {
        self.total
    }

    /// Whether every requested asset has arrived (or failed).
    #[must_use]
    pub fn all_loaded(&self) -> bool {
        self.total == 0
    }
}

/// The engine: one scene graph, its compilation scheduler, core and node
/// factories, draw list and render loop.
pub struct Engine {
    settings: EngineSettings,

    graph: SceneGraph,
    scheduler: Scheduler,
    cores: CoreFactory,
    node_factory: NodeFactory,
    draw: DrawList,

    loader: Box<dyn ResourceLoader>,
    delivery_tx: flume::Sender<ResourceDelivery>,
    delivery_rx: flume::Receiver<ResourceDelivery>,

    events: VecDeque<EngineEvent>,
    nodes_to_destroy: Vec<NodeId>,
    status: SceneStatus,

    loop_state: LoopState,
    destroyed: bool,
    sleeping: bool,
    hooks: StartOptions,

    time: f32,
    frame_count: u64,
    last_stats: Option<CompileStats>,
}

impl Engine {
    /// Creates an engine with an empty scene graph.
    #[must_use]
    pub fn new(settings: EngineSettings, loader: Box<dyn ResourceLoader>) -> Self {
        let graph = SceneGraph::new();
        let mut scheduler = Scheduler::new(settings.incremental_compilation);
        scheduler.register_scene(graph.id());
        let (delivery_tx, delivery_rx) = flume::unbounded();

        Self {
            settings,
            graph,
            scheduler,
            cores: CoreFactory::new(),
            node_factory: NodeFactory::new(),
            draw: DrawList::new(),
            loader,
            delivery_tx,
            delivery_rx,
            events: VecDeque::new(),
            nodes_to_destroy: Vec::new(),
            status: SceneStatus::default(),
            loop_state: LoopState::Stopped,
            destroyed: false,
            sleeping: false,
            hooks: StartOptions::default(),
            time: 0.0,
            frame_count: 0,
            last_stats: None,
        }
    }

    /// Creates an engine and populates its graph from a scene description.
    pub fn with_scene(
        settings: EngineSettings,
        loader: Box<dyn ResourceLoader>,
        spec: &NodeSpec,
    ) -> Result<Self> {
        let mut engine = Self::new(settings, loader);
        let root = engine.graph.root();
        for child in &spec.children {
            engine.build_subtree(root, child)?;
        }
        Ok(engine)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The scene graph.
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The compilation scheduler.
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The state core factory.
    #[inline]
    #[must_use]
    pub fn cores(&self) -> &CoreFactory {
        &self.cores
    }

    /// The node factory.
    #[inline]
    #[must_use]
    pub fn node_factory(&self) -> &NodeFactory {
        &self.node_factory
    }

    /// The draw list.
    #[inline]
    #[must_use]
    pub fn draw_list(&self) -> &DrawList {
        &self.draw
    }

    /// Mutable draw list access, for setters that force redraws directly.
    #[inline]
    pub fn draw_list_mut(&mut self) -> &mut DrawList {
        &mut self.draw
    }

    /// Scene loading status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> &SceneStatus {
        &self.status
    }

    /// Current loop state.
    #[inline]
    #[must_use]
    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// Total ticks since startup.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Elapsed loop time in seconds.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Statistics of the most recent compilation pass.
    #[must_use]
    pub fn last_compile_stats(&self) -> Option<&CompileStats> {
        self.last_stats.as_ref()
    }

    /// Sender half of the resource delivery channel, for loaders that reply
    /// from outside the engine.
    #[must_use]
    pub fn delivery_sender(&self) -> flume::Sender<ResourceDelivery> {
        self.delivery_tx.clone()
    }

    /// Pops the oldest unconsumed engine event.
    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    // ========================================================================
    // Graph construction
    // ========================================================================

    /// Adds a subtree described by `spec` under `parent`, returning the new
    /// subtree root. Buffered node destructions run first so recycled ids
    /// cannot clash with the new nodes.
    pub fn add_node(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
        self.ensure_live()?;
        self.do_destroy_nodes();
        let id = self.build_subtree(parent, spec)?;
        self.scheduler.notify(&self.graph, parent, Op::Add, "node");
        Ok(id)
    }

    fn build_subtree(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
        let kind = NodeKind::parse(&spec.kind, &spec.attributes)?;

        let core = match kind.core_kind() {
            Some(core_kind) => Some(self.build_core(core_kind, &kind, spec)?),
            None => None,
        };

        let node = self.node_factory.create(spec.id.clone(), kind.clone(), core);
        let id = match self.graph.insert(node, Some(parent)) {
            Ok(id) => id,
            Err(err) => {
                if let Some(core_id) = core {
                    self.cores.release(core_id);
                }
                return Err(err);
            }
        };

        if let Some(core_id) = core {
            if self.cores.use_count(core_id) == 1 {
                self.sync_core_loads(core_id);
            } else {
                self.join_loading_core(core_id, id);
            }
        }

        // An unresolved instance keeps its branch recompiling until the
        // target appears.
        if kind.is_instance() && self.graph.instance_searching(id) {
            self.scheduler.notify(&self.graph, id, Op::Searching, "target");
        }

        for child in &spec.children {
            self.build_subtree(id, child)?;
        }
        Ok(id)
    }

    fn build_core(
        &mut self,
        core_kind: CoreKind,
        kind: &NodeKind,
        spec: &NodeSpec,
    ) -> Result<CoreId> {
        let kind_name = kind.name();
        let attributes = &spec.attributes;
        self.cores
            .get_or_create(core_kind, spec.core_id.as_deref(), || {
                let mut data =
                    CoreData::default_for(kind).ok_or_else(|| TrellisError::Configuration {
                        context: format!("{kind_name} node"),
                        message: "kind owns no state core".to_string(),
                    })?;
                for (attr, value) in attributes {
                    data.apply(Op::Set, attr, value)?;
                }
                if let CoreData::Geometry(g) = &mut data
                    && g.source.is_none()
                {
                    g.loaded = true;
                }
                Ok(data)
            })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Selects a node by user-assigned id for mutation.
    pub fn select(&mut self, name: &str) -> Option<NodeSelector<'_>> {
        let id = self.graph.lookup(name)?;
        self.with_node(id)
    }

    /// Selects a node by handle for mutation.
    pub fn with_node(&mut self, id: NodeId) -> Option<NodeSelector<'_>> {
        if !self.graph.node(id)?.is_alive() {
            return None;
        }
        Some(NodeSelector::new(self, id))
    }

    /// Applies one attribute mutation to a node's core and notifies the
    /// scheduler with the identical `(op, attr)` tuple — the sole
    /// recompilation trigger.
    pub(crate) fn apply(
        &mut self,
        node: NodeId,
        op: Op,
        attr: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        self.ensure_live()?;
        let n = self
            .graph
            .node(node)
            .ok_or_else(|| TrellisError::IllegalState("mutation of unknown node".to_string()))?;
        if !n.is_alive() {
            return Err(TrellisError::IllegalState(
                "mutation of destroyed node".to_string(),
            ));
        }
        let kind_name = n.kind.name();
        let Some(core_id) = n.core else {
            return Err(TrellisError::UnknownAttribute {
                kind: kind_name,
                attr: attr.to_string(),
            });
        };

        let core = self
            .cores
            .get_mut(core_id)
            .ok_or_else(|| TrellisError::IllegalState("node references released core".to_string()))?;
        core.data.apply(op, attr, value)?;

        // Visual state changed; redraw even absent structural recompilation.
        self.draw.mark(DirtyFlags::IMAGE);

        // Replacing layers or stream sources starts fresh loads.
        if matches!(attr, "layers" | "source") {
            self.sync_core_loads(core_id);
        }

        self.scheduler.notify(&self.graph, node, op, attr);
        Ok(())
    }

    // ========================================================================
    // Destruction
    // ========================================================================

    /// Schedules a node and its subtree for destruction. Teardown is
    /// batched and runs at the top of the next tick.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<()> {
        self.ensure_live()?;
        if id == self.graph.root() {
            return Err(TrellisError::IllegalState(
                "cannot destroy the scene root".to_string(),
            ));
        }
        let Some(node) = self.graph.node(id) else {
            return Err(TrellisError::IllegalState(
                "destroy of unknown node".to_string(),
            ));
        };
        if !node.is_alive() {
            return Ok(()); // Already scheduled.
        }
        let parent = node.parent();

        let subtree = self.graph.collect_subtree(id);
        for &n in &subtree {
            if let Some(node) = self.graph.node_mut(n) {
                node.alive = false;
            }
            // Stop tracking pending loads for doomed nodes.
            self.status.forget_node(n);
        }
        self.nodes_to_destroy.extend(subtree);

        if let Some(parent) = parent {
            self.scheduler.notify(&self.graph, parent, Op::Remove, "node");
        }
        Ok(())
    }

    /// Performs pending node destructions: each node's draw objects are
    /// dropped, its core released back to the core factory, and its wrapper
    /// recycled through the node factory.
    fn do_destroy_nodes(&mut self) {
        if self.nodes_to_destroy.is_empty() {
            return;
        }
        let list = std::mem::take(&mut self.nodes_to_destroy);
        // Reverse preorder destroys children before parents.
        for &id in list.iter().rev() {
            self.draw.remove_node(id);
            if let Some(mut node) = self.graph.remove_single(id) {
                if let Some(core) = node.core.take() {
                    self.cores.release(core);
                }
                node.children.clear();
                self.node_factory.release(node);
            }
        }
        self.draw.mark(DirtyFlags::IMAGE);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Starts the render loop. Idempotent while running; resumes from
    /// paused.
    pub fn start(&mut self, options: StartOptions) -> Result<()> {
        self.ensure_live()?;
        if self.loop_state == LoopState::Running {
            return Ok(());
        }
        self.hooks = options;
        self.loop_state = LoopState::Running;
        self.sleeping = false;
        self.events.push_back(EngineEvent::Started);
        Ok(())
    }

    /// Pauses or unpauses the loop without tearing down state.
    pub fn pause(&mut self, pause: bool) {
        match (self.loop_state, pause) {
            (LoopState::Running, true) => self.loop_state = LoopState::Paused,
            (LoopState::Paused, false) => self.loop_state = LoopState::Running,
            _ => {}
        }
    }

    /// Stops the render loop.
    pub fn stop(&mut self) {
        if self.loop_state != LoopState::Stopped {
            self.loop_state = LoopState::Stopped;
            self.events.push_back(EngineEvent::Stopped);
        }
    }

    /// Tears the scene down. Every subsequent lifecycle or mutation call
    /// fails with `IllegalState`.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        self.scheduler.unregister_scene(self.graph.id());
        self.destroyed = true;
    }

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            Err(TrellisError::IllegalState(
                "engine has been destroyed".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    // ========================================================================
    // Frame cycle
    // ========================================================================

    /// Runs one tick of the render loop. Returns whether a frame was drawn.
    ///
    /// Does nothing while stopped or paused (the embedder keeps calling;
    /// the loop decides).
    pub fn tick(&mut self, rasterizer: &mut dyn Rasterizer, dt: f32) -> Result<bool> {
        self.ensure_live()?;
        if self.loop_state != LoopState::Running {
            return Ok(false);
        }

        self.time += dt;
        self.frame_count += 1;
        let frame = FrameState {
            time: self.time,
            dt,
            frame_count: self.frame_count,
        };

        // Idle hook may mutate the scene; hooks are moved out so they can
        // borrow the engine.
        let mut hooks = std::mem::take(&mut self.hooks);
        if let Some(hook) = &mut hooks.on_idle {
            hook(self, frame);
        }

        self.drain_deliveries();
        self.do_destroy_nodes();

        let mut rendered_any = false;
        for pass in 0..self.settings.passes.max(1) {
            let carry = pass > 0 && rendered_any;
            let needs_compile = self.scheduler.schedule_compilations(&mut self.graph);
            if needs_compile || self.draw.is_dirty() || carry {
                self.sleeping = false;
                if needs_compile {
                    let stats = compile::compile_pass(
                        &mut self.scheduler,
                        &mut self.graph,
                        &self.cores,
                        &mut self.draw,
                    );
                    self.scheduler.clear_pass(&mut self.graph);
                    self.last_stats = Some(stats);
                }
                rendered_any |= self.draw.render(rasterizer, &self.cores, carry);
            }
        }

        if !rendered_any && !self.sleeping {
            self.sleeping = true;
            self.events.push_back(EngineEvent::Sleeping);
            if let Some(hook) = &mut hooks.on_sleep {
                hook(self, frame);
            }
        }
        self.hooks = hooks;

        Ok(rendered_any)
    }

    /// Renders a single frame outside the loop, compiling first if needed.
    /// With `force`, the frame is drawn even when nothing changed.
    pub fn render_frame(&mut self, rasterizer: &mut dyn Rasterizer, force: bool) -> Result<bool> {
        self.ensure_live()?;
        self.drain_deliveries();
        self.do_destroy_nodes();
        self.compile();
        Ok(self.draw.render(rasterizer, &self.cores, force))
    }

    /// Flushes the scheduler and, when anything is pending, runs one
    /// compilation pass. Returns the pass statistics, or `None` when no
    /// compilation was needed.
    ///
    /// Batched node destructions run first, as they do in the frame cycle.
    pub fn compile(&mut self) -> Option<&CompileStats> {
        self.do_destroy_nodes();
        if !self.scheduler.schedule_compilations(&mut self.graph) {
            return None;
        }
        let stats = compile::compile_pass(
            &mut self.scheduler,
            &mut self.graph,
            &self.cores,
            &mut self.draw,
        );
        self.scheduler.clear_pass(&mut self.graph);
        self.last_stats = Some(stats);
        self.last_stats.as_ref()
    }

    // ========================================================================
    // Resource loading
    // ========================================================================

    /// Issues loader requests for every not-yet-loaded layer or stream
    /// source of a core and resets its pending count. Owners' task counters
    /// track the outstanding requests.
    fn sync_core_loads(&mut self, core_id: CoreId) {
        let Some(core) = self.cores.get(core_id) else {
            return;
        };
        let superseded = match core.status {
            CoreStatus::Loading { pending } => pending,
            CoreStatus::Ready => 0,
        };

        let mut requests: Vec<ResourceRequest> = Vec::new();
        match &core.data {
            CoreData::Texture(t) => {
                for (layer, entry) in t.layers.iter().enumerate() {
                    if !entry.loaded {
                        requests.push(ResourceRequest {
                            core: core_id,
                            layer,
                            source: entry.source.clone(),
                            kind: ResourceKind::TextureImage,
                        });
                    }
                }
            }
            CoreData::Geometry(g) => {
                if !g.loaded
                    && let Some(source) = &g.source
                {
                    requests.push(ResourceRequest {
                        core: core_id,
                        layer: 0,
                        source: source.clone(),
                        kind: ResourceKind::GeometryData,
                    });
                }
            }
            _ => {}
        }

        let owners = self.owners_of(core_id);

        // Requests in flight for replaced content will be rejected as stale
        // on delivery; their task accounting ends here.
        for _ in 0..superseded {
            for &owner in &owners {
                self.status.task_finished(owner);
            }
        }

        if let Some(core) = self.cores.get_mut(core_id) {
            core.status = if requests.is_empty() {
                CoreStatus::Ready
            } else {
                CoreStatus::Loading {
                    pending: requests.len() as u32,
                }
            };
        }

        if requests.is_empty() {
            return;
        }

        for _ in &requests {
            for &owner in &owners {
                self.status.task_started(owner);
            }
        }
        for request in requests {
            self.loader.request(request, self.delivery_tx.clone());
        }
    }

    /// Counts an already-loading shared core's outstanding tasks against a
    /// node that just joined it.
    fn join_loading_core(&mut self, core_id: CoreId, node: NodeId) {
        if let Some(core) = self.cores.get(core_id)
            && let CoreStatus::Loading { pending } = core.status
        {
            for _ in 0..pending {
                self.status.task_started(node);
            }
        }
    }

    fn owners_of(&self, core_id: CoreId) -> Vec<NodeId> {
        self.graph
            .iter()
            .filter(|(_, n)| n.core == Some(core_id) && n.is_alive())
            .map(|(id, _)| id)
            .collect()
    }

    /// Drains the resource delivery channel. Each accepted delivery mutates
    /// the target core and re-notifies the scheduler on behalf of every
    /// owning node — indistinguishable from a synchronous attribute set
    /// arriving on a later tick. Deliveries for released cores or replaced
    /// sources are discarded.
    fn drain_deliveries(&mut self) {
        while let Ok(delivery) = self.delivery_rx.try_recv() {
            self.handle_delivery(delivery);
        }
    }

    fn handle_delivery(&mut self, delivery: ResourceDelivery) {
        let Some(core) = self.cores.get_mut(delivery.core) else {
            log::debug!("dropping delivery for released core: {:?}", delivery.source);
            return;
        };

        let succeeded = delivery.result.is_ok();
        let (accepted, notify_attr) = match &mut core.data {
            CoreData::Texture(t) => {
                let valid = t
                    .layers
                    .get(delivery.layer)
                    .is_some_and(|l| !l.loaded && l.source == delivery.source);
                if valid && succeeded {
                    t.layers[delivery.layer].loaded = true;
                }
                (valid, "image")
            }
            CoreData::Geometry(g) => {
                let valid = !g.loaded && g.source.as_deref() == Some(delivery.source.as_str());
                if valid
                    && let Ok(ResourcePayload::Geometry { positions, indices }) = &delivery.result
                {
                    g.positions.clone_from(positions);
                    g.indices.clone_from(indices);
                    g.loaded = true;
                }
                (valid, "data")
            }
            _ => (false, ""),
        };

        if !accepted {
            log::debug!("dropping stale delivery: {:?}", delivery.source);
            return;
        }

        if let CoreStatus::Loading { pending } = core.status {
            let left = pending.saturating_sub(1);
            core.status = if left == 0 {
                CoreStatus::Ready
            } else {
                CoreStatus::Loading { pending: left }
            };
        }

        let owners = self.owners_of(delivery.core);
        match &delivery.result {
            Ok(_) => {
                for &owner in &owners {
                    self.status.task_finished(owner);
                    self.scheduler
                        .notify(&self.graph, owner, Op::Loaded, notify_attr);
                }
                self.draw.mark(DirtyFlags::IMAGE);
            }
            Err(message) => {
                log::warn!("resource load failed: {:?}: {message}", delivery.source);
                for &owner in &owners {
                    self.status.task_finished(owner);
                    self.events.push_back(EngineEvent::ResourceError {
                        node: owner,
                        source: delivery.source.clone(),
                        message: message.clone(),
                    });
                }
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.destroyed {
            self.scheduler.unregister_scene(self.graph.id());
        }
    }
}
