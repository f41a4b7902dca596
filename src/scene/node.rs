//! Node types: NodeId, Node.

use std::fmt;

use slotmap::new_key_type;

use crate::bus::Address;
use crate::event::dispatch::Handlers;
use crate::geometry::Rect;
use crate::render::Palette;

new_key_type! {
    /// Unique identifier for a scene node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// The single concrete entity type of the scene graph.
///
/// Every widget is a `Node`; what differs between widgets is the behavior
/// attached to the node in the scene, not the node type itself. The node
/// carries geometry, interaction flags, the bus address, the theme palette,
/// and the per-event handler lists.
pub struct Node {
    /// Human-readable name, surfaced in discovery metadata.
    pub name: String,
    /// Type tag, set from the attached behavior (e.g. "window", "probe").
    pub kind: &'static str,
    /// Local rectangle, relative to the parent. Mutated through the scene's
    /// geometry setters so invalidation and the 1x1 floor are preserved.
    pub(crate) rect: Rect,
    /// Whether this node and its subtree draw and receive events.
    pub visible: bool,
    /// Whether this node and its subtree receive events.
    pub enabled: bool,
    /// Whether this node currently holds focus among its siblings.
    pub active: bool,
    /// Excludes this node from consuming hit-tests; children still participate.
    pub passthrough: bool,
    /// Set by [`crate::scene::tree::Scene::invalidate`]; advisory for hosts.
    pub dirty: bool,
    /// Set by destroy. A terminated node is detached and ignored by the bus.
    pub terminated: bool,
    /// Bus address, assigned on first registration and kept for life.
    pub(crate) address: Option<Address>,
    /// Theme colors, replaced wholesale by a `Theme` envelope.
    pub palette: Palette,
    pub(crate) handlers: Handlers,
}

impl Node {
    /// Create a named node with default geometry (128x64 at the origin).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "node",
            rect: Rect::new(0, 0, 128, 64),
            visible: true,
            enabled: true,
            active: false,
            passthrough: false,
            dirty: true,
            terminated: false,
            address: None,
            palette: Palette::default(),
            handlers: Handlers::default(),
        }
    }

    /// Set the local rectangle (builder).
    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    /// Set visibility (builder).
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set enabled state (builder).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set passthrough (builder).
    pub fn passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// The local rectangle.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The bus address, if this node has ever been registered.
    pub fn address(&self) -> Option<Address> {
        self.address
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rect", &self.rect)
            .field("visible", &self.visible)
            .field("enabled", &self.enabled)
            .field("active", &self.active)
            .field("passthrough", &self.passthrough)
            .field("dirty", &self.dirty)
            .field("terminated", &self.terminated)
            .field("address", &self.address)
            .finish()
    }
}
