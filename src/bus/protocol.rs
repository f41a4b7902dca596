//! The message-handling contract every registered node satisfies.
//!
//! Because the scene has one concrete node type, the contract is implemented
//! once here; attached behaviors layer on top via
//! [`Behavior::on_message`](crate::scene::behavior::Behavior::on_message).

use super::{AddressBus, Envelope, Payload, Signal};
use crate::scene::behavior::Cx;
use crate::scene::node::NodeId;
use crate::scene::tree::Scene;

/// Deliver one envelope to one node: built-in protocol first, then the
/// node's behavior hook. Callers have already checked liveness.
pub(crate) fn deliver(scene: &mut Scene, bus: &mut AddressBus, id: NodeId, envelope: &Envelope) {
    let Some(own) = scene.get(id).and_then(|node| node.address()) else { return };
    // Loop prevention: a node never reacts to its own traffic.
    if own == envelope.sender {
        return;
    }

    match envelope.signal {
        Signal::Ping => {
            let metadata = scene.metadata_of(id, bus.now());
            let _ = bus.post(
                Envelope::unicast(envelope.sender, own, Signal::Pong)
                    .with_payload(Payload::Metadata(metadata)),
            );
        }
        Signal::Shutdown => {
            let destroyed = scene.destroy(id);
            for &node in &destroyed {
                if let Some(address) = scene.get(node).and_then(|n| n.address()) {
                    bus.unregister(address);
                }
            }
            // The node is gone; no behavior hook to run.
            return;
        }
        Signal::Redraw => {
            scene.invalidate(id);
            let metadata = scene.metadata_of(id, bus.now());
            let _ = bus.post(
                Envelope::unicast(envelope.sender, own, Signal::Ok)
                    .with_payload(Payload::Metadata(metadata)),
            );
        }
        Signal::Theme => {
            if let Payload::Palette(palette) = &envelope.payload {
                if let Some(node) = scene.get_mut(id) {
                    node.palette = *palette;
                }
                scene.invalidate(id);
            }
        }
        _ => {}
    }

    if let Some(mut behavior) = scene.take_behavior(id) {
        behavior.on_message(&mut Cx { scene, bus }, id, envelope);
        if scene.get(id).is_some_and(|node| !node.terminated) {
            scene.put_behavior(id, behavior);
        }
    }
}
