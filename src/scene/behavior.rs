//! Behavior trait: the polymorphism seam for nodes.
//!
//! The scene has a single concrete node type; what differs between widgets
//! is the [`Behavior`] attached to the node. Behaviors are temporarily taken
//! out of the scene while their hooks run, so a hook can receive `&mut Scene`
//! without aliasing itself.

use std::any::Any;

use super::node::NodeId;
use super::tree::Scene;
use crate::bus::{AddressBus, Envelope};
use crate::event::input::Event;
use crate::render::Surface;

// ---------------------------------------------------------------------------
// Cx
// ---------------------------------------------------------------------------

/// Mutable engine context handed to behavior hooks.
pub struct Cx<'a> {
    pub scene: &'a mut Scene,
    pub bus: &'a mut AddressBus,
}

impl Cx<'_> {
    /// Destroy `id` and its subtree, unregistering every destroyed node's
    /// address from the bus. Returns the destroyed ids, post-order.
    pub fn destroy(&mut self, id: NodeId) -> Vec<NodeId> {
        let destroyed = self.scene.destroy(id);
        for &node in &destroyed {
            if let Some(address) = self.scene.get(node).and_then(|n| n.address()) {
                self.bus.unregister(address);
            }
        }
        destroyed
    }
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// Widget-specific logic attached to a node.
///
/// All hooks are optional; the default behavior is an inert container. The
/// base event dispatch and the built-in message protocol run regardless of
/// what a behavior does — `process_event` layers *before* base hit-testing
/// (button releases and drags are widget territory), `on_message` layers
/// *after* the built-in protocol.
pub trait Behavior: Any {
    /// Type tag copied onto the node, surfaced in discovery metadata.
    fn kind(&self) -> &'static str {
        "node"
    }

    /// Per-frame tick, depth-first over the tree.
    fn update(&mut self, _cx: &mut Cx<'_>, _id: NodeId, _dt: f64) {}

    /// Draw this node. Called back-to-front after the subtree visibility
    /// check; the base pass draws nothing itself.
    fn draw(&mut self, _scene: &Scene, _id: NodeId, _surface: &mut dyn Surface) {}

    /// Widget-layer event processing. Return `true` to consume the event
    /// before base hit-testing runs for this node.
    fn process_event(&mut self, _cx: &mut Cx<'_>, _id: NodeId, _event: &Event) -> bool {
        false
    }

    /// React to an envelope after the built-in protocol has run.
    fn on_message(&mut self, _cx: &mut Cx<'_>, _id: NodeId, _envelope: &Envelope) {}

    /// Upcast for runtime type inspection.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for runtime type inspection.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ===========================================================================
// Tests
// ===========================================================================
