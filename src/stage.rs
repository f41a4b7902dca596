//! Stage: the host-facing shell tying scene, dispatcher, and bus together.
//!
//! The frame loop itself lives in the host. Each frame the driver calls
//! [`Stage::handle_event`] once per decoded input event, [`Stage::update`]
//! once with the elapsed seconds, and [`Stage::draw`] once with its surface.
//! The bus pump runs inside `update` on its own throttled cadence.

use crate::bus::{AddressBus, Envelope, Signal, DEFAULT_QUEUE_CAPACITY};
use crate::bus::Payload;
use crate::event::dispatch::dispatch;
use crate::event::input::Event;
use crate::geometry::Rect;
use crate::render::{Palette, Surface};
use crate::scene::behavior::{Behavior, Cx};
use crate::scene::node::{Node, NodeId};
use crate::scene::tree::Scene;
use crate::window::DEFAULT_SNAP_THRESHOLD;

// ---------------------------------------------------------------------------
// StageConfig
// ---------------------------------------------------------------------------

/// Tunables for the stage.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Bound on queued envelopes.
    pub queue_capacity: usize,
    /// Seconds of accumulated frame time between bus pumps. Throttling the
    /// pump trades bounded message latency for throughput under event
    /// storms.
    pub pump_interval: f64,
    /// Default snap distance handed to window behaviors built by hosts.
    pub snap_threshold: i32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pump_interval: 0.2,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
        }
    }
}

impl StageConfig {
    /// Create a default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the envelope queue bound (builder).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the pump cadence in seconds (builder).
    pub fn with_pump_interval(mut self, seconds: f64) -> Self {
        self.pump_interval = seconds;
        self
    }

    /// Set the snap distance (builder).
    pub fn with_snap_threshold(mut self, threshold: i32) -> Self {
        self.snap_threshold = threshold;
        self
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Owns the scene, the bus, and the root node.
///
/// The root is registered first and therefore always holds address 0; it is
/// the sender for host-origin broadcasts such as theme pushes and shutdown.
pub struct Stage {
    pub scene: Scene,
    pub bus: AddressBus,
    root: NodeId,
    config: StageConfig,
    pump_accumulator: f64,
}

impl Stage {
    /// Create a stage whose root spans `width` x `height` at the origin.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_config(width, height, StageConfig::default())
    }

    /// Create a stage with explicit tunables.
    pub fn with_config(width: i32, height: i32, config: StageConfig) -> Self {
        let mut scene = Scene::new();
        let mut bus = AddressBus::with_capacity(config.queue_capacity);
        let root = scene.insert(
            Node::new("stage").with_rect(Rect::new(0, 0, width, height)).passthrough(true),
        );
        bus.register(&mut scene, root);
        Self { scene, bus, root, config, pump_accumulator: 0.0 }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The active configuration.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Borrow the scene and bus together as a behavior context.
    pub fn cx(&mut self) -> Cx<'_> {
        Cx { scene: &mut self.scene, bus: &mut self.bus }
    }

    // -----------------------------------------------------------------------
    // Mounting
    // -----------------------------------------------------------------------

    /// Attach `node` under `parent` and register it with the bus.
    pub fn spawn(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.scene.insert(node);
        self.scene.add(parent, id);
        let address = self.bus.register(&mut self.scene, id);
        tracing::debug!(%address, name = %self.scene.get(id).map(|n| n.name.as_str()).unwrap_or("?"), "spawned node");
        id
    }

    /// Attach `node` under `parent` with a behavior, and register it.
    pub fn spawn_with(
        &mut self,
        parent: NodeId,
        node: Node,
        behavior: impl Behavior + 'static,
    ) -> NodeId {
        let id = self.spawn(parent, node);
        self.scene.set_behavior(id, Box::new(behavior));
        id
    }

    /// Register `id` and every descendant with the bus.
    pub fn register_all(&mut self, id: NodeId) {
        for node in self.scene.walk_depth_first(id) {
            self.bus.register(&mut self.scene, node);
        }
    }

    /// Destroy `id` and its subtree, unregistering every destroyed address.
    pub fn destroy(&mut self, id: NodeId) -> Vec<NodeId> {
        self.cx().destroy(id)
    }

    // -----------------------------------------------------------------------
    // Frame entry points
    // -----------------------------------------------------------------------

    /// Dispatch one decoded input event through the tree. Events must be
    /// handed over one at a time, in arrival order.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        let root = self.root;
        let mut cx = Cx { scene: &mut self.scene, bus: &mut self.bus };
        dispatch(&mut cx, root, event)
    }

    /// Per-frame tick: advances the bus clock, pumps the bus when the
    /// throttle interval has accumulated, then updates behaviors depth-first.
    pub fn update(&mut self, dt: f64) {
        self.bus.tick(dt);

        self.pump_accumulator += dt;
        if self.pump_accumulator >= self.config.pump_interval {
            self.bus.pump(&mut self.scene);
            self.pump_accumulator = 0.0;
        }

        for id in self.scene.walk_depth_first(self.root) {
            if let Some(mut behavior) = self.scene.take_behavior(id) {
                behavior.update(&mut Cx { scene: &mut self.scene, bus: &mut self.bus }, id, dt);
                if self.scene.get(id).is_some_and(|node| !node.terminated) {
                    self.scene.put_behavior(id, behavior);
                }
            }
        }
    }

    /// Pump the bus immediately, bypassing the throttle. Hosts use this for
    /// deterministic tests and teardown.
    pub fn pump(&mut self) {
        self.bus.pump(&mut self.scene);
    }

    /// Draw the visible tree depth-first, back to front.
    ///
    /// The walk is unconditional over visible nodes; the per-node dirty flag
    /// is an advisory hook for hosts, not a draw gate.
    pub fn draw(&mut self, surface: &mut dyn Surface) {
        Self::draw_node(&mut self.scene, self.root, surface);
    }

    fn draw_node(scene: &mut Scene, id: NodeId, surface: &mut dyn Surface) {
        if !scene.get(id).is_some_and(|node| node.visible) {
            return;
        }
        if let Some(mut behavior) = scene.take_behavior(id) {
            behavior.draw(scene, id, surface);
            scene.put_behavior(id, behavior);
        }
        if let Some(node) = scene.get_mut(id) {
            node.dirty = false;
        }
        for child in scene.children(id).to_vec() {
            Self::draw_node(scene, child, surface);
        }
    }

    // -----------------------------------------------------------------------
    // Host-origin broadcasts
    // -----------------------------------------------------------------------

    /// Broadcast a palette to every registered node.
    pub fn set_theme(&mut self, palette: Palette) {
        let from = self.root_address();
        let _ = self
            .bus
            .post(Envelope::broadcast(from, Signal::Theme).with_payload(Payload::Palette(palette)));
    }

    /// Broadcast `Shutdown` from the root. Every other registrant destroys
    /// itself on the next pump; the root survives as sender.
    pub fn shutdown(&mut self) {
        let from = self.root_address();
        tracing::debug!("shutdown broadcast");
        let _ = self.bus.post(Envelope::broadcast(from, Signal::Shutdown));
    }

    fn root_address(&self) -> crate::bus::Address {
        self.scene
            .get(self.root)
            .and_then(|node| node.address())
            .expect("stage root is registered at construction")
    }
}

// ===========================================================================
// Tests
// ===========================================================================
