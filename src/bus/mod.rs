//! The address bus: registry, bounded FIFO queue, and pump.
//!
//! A process-wide mailbox system. Nodes register for an [`Address`], anyone
//! posts [`Envelope`]s, and [`AddressBus::pump`] delivers them in FIFO order
//! on the host's cadence. Posting never blocks: a full queue drops the
//! envelope and reports the failure, nothing more.

mod envelope;
pub(crate) mod protocol;

pub use envelope::{Address, Envelope, Metadata, Payload, Recipient, Signal};

use std::collections::BTreeMap;

use crate::scene::node::NodeId;
use crate::scene::tree::Scene;

/// Default bound on the number of queued envelopes.
pub const DEFAULT_QUEUE_CAPACITY: usize = 255;

/// The bus's only recoverable failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BusError {
    #[error("envelope dropped: queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
}

/// Address registry plus bounded envelope queue.
///
/// The registry maps addresses to arena keys, never to owning references;
/// a stale entry is harmless and skipped at delivery time. The clock is a
/// monotonic frame-time accumulator advanced by the host via [`tick`](Self::tick),
/// used only to stamp discovery metadata.
#[derive(Debug)]
pub struct AddressBus {
    registry: BTreeMap<Address, NodeId>,
    queue: Vec<Envelope>,
    next_address: u32,
    capacity: usize,
    clock: f64,
}

impl AddressBus {
    /// Create a bus with the default queue capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a bus with an explicit queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: BTreeMap::new(),
            queue: Vec::new(),
            next_address: 0,
            capacity,
            clock: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register `id`, assigning the next address if the node has never held
    /// one. Re-registering keeps the node's existing address (idempotent
    /// identity) and refreshes the registry entry.
    pub fn register(&mut self, scene: &mut Scene, id: NodeId) -> Address {
        let node = scene.get_mut(id).expect("registered node must exist");
        let address = match node.address {
            Some(address) => address,
            None => {
                let address = Address(self.next_address);
                self.next_address += 1;
                node.address = Some(address);
                address
            }
        };
        tracing::debug!(%address, name = %node.name, "registered node");
        self.registry.insert(address, id);
        address
    }

    /// Remove the registry mapping for `address`. The node itself is
    /// untouched and keeps its address for any later re-registration.
    pub fn unregister(&mut self, address: Address) {
        if self.registry.remove(&address).is_some() {
            tracing::debug!(%address, "unregistered node");
        }
    }

    /// The node registered at `address`, if any.
    pub fn lookup(&self, address: Address) -> Option<NodeId> {
        self.registry.get(&address).copied()
    }

    /// Snapshot of all current registrations, ascending by address.
    pub fn registered(&self) -> Vec<(Address, NodeId)> {
        self.registry.iter().map(|(&a, &n)| (a, n)).collect()
    }

    /// Number of registered nodes.
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Append an envelope to the queue.
    ///
    /// Fails without blocking when the queue is at capacity; the envelope is
    /// dropped and the caller may log. There is no retry.
    pub fn post(&mut self, envelope: Envelope) -> Result<(), BusError> {
        if self.queue.len() >= self.capacity {
            tracing::warn!(signal = ?envelope.signal, "bus queue full, envelope dropped");
            return Err(BusError::QueueFull { capacity: self.capacity });
        }
        self.queue.push(envelope);
        Ok(())
    }

    /// Read-only view of queued envelopes addressed to `address` or
    /// broadcast. Diagnostics only; never used by message logic.
    pub fn peek(&self, address: Address) -> Vec<&Envelope> {
        self.queue
            .iter()
            .filter(|env| match env.receiver {
                Recipient::Unicast(to) => to == address,
                Recipient::Broadcast => true,
            })
            .collect()
    }

    /// Number of envelopes currently queued.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Advance the bus clock by `dt` seconds of frame time.
    pub fn tick(&mut self, dt: f64) {
        self.clock += dt;
    }

    /// The bus clock, in seconds.
    pub fn now(&self) -> f64 {
        self.clock
    }

    // -----------------------------------------------------------------------
    // Pump
    // -----------------------------------------------------------------------

    /// Deliver every envelope queued before this call, in FIFO order.
    ///
    /// The queue is swapped out first, so anything posted *during* delivery
    /// lands in the next pump — re-entrant cascades cannot run unbounded.
    /// Broadcasts iterate a snapshot of the registry taken per envelope;
    /// nodes unregistered mid-pump are skipped (liveness is re-checked
    /// before each call), nodes registered mid-pump wait for the next one.
    pub fn pump(&mut self, scene: &mut Scene) {
        if self.queue.is_empty() {
            return;
        }
        let queue = std::mem::take(&mut self.queue);
        for envelope in queue {
            match envelope.receiver {
                Recipient::Broadcast => {
                    let snapshot = self.registered();
                    for (address, id) in snapshot {
                        if self.registry.get(&address) != Some(&id) {
                            continue; // unregistered mid-pump
                        }
                        if !self.is_live(scene, id) {
                            continue;
                        }
                        protocol::deliver(scene, self, id, &envelope);
                    }
                }
                Recipient::Unicast(address) => {
                    // A stale or missing target is a silent no-op.
                    if let Some(id) = self.lookup(address) {
                        if self.is_live(scene, id) {
                            protocol::deliver(scene, self, id, &envelope);
                        }
                    }
                }
            }
        }
    }

    fn is_live(&self, scene: &Scene, id: NodeId) -> bool {
        scene.get(id).is_some_and(|node| !node.terminated)
    }
}

impl Default for AddressBus {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::node::Node;

    fn fixture(n: usize) -> (Scene, AddressBus, Vec<NodeId>) {
        let mut scene = Scene::new();
        let mut bus = AddressBus::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| {
                let id = scene.insert(Node::new(format!("n{i}")));
                bus.register(&mut scene, id);
                id
            })
            .collect();
        (scene, bus, ids)
    }

    // ── Registration ─────────────────────────────────────────────────

    #[test]
    fn addresses_are_monotonic() {
        let (scene, _bus, ids) = fixture(3);
        let addrs: Vec<u32> =
            ids.iter().map(|&id| scene.get(id).unwrap().address().unwrap().0).collect();
        assert_eq!(addrs, vec![0, 1, 2]);
    }

    #[test]
    fn register_is_idempotent_on_address() {
        let (mut scene, mut bus, ids) = fixture(1);
        let first = scene.get(ids[0]).unwrap().address().unwrap();
        let again = bus.register(&mut scene, ids[0]);
        assert_eq!(first, again);
        assert_eq!(bus.registered_count(), 1);
    }

    #[test]
    fn addresses_are_never_reused() {
        let (mut scene, mut bus, ids) = fixture(2);
        bus.unregister(Address(1));
        scene.destroy(ids[1]);
        let fresh = scene.insert(Node::new("fresh"));
        let address = bus.register(&mut scene, fresh);
        assert_eq!(address, Address(2));
    }

    #[test]
    fn unregister_removes_mapping_only() {
        let (scene, mut bus, ids) = fixture(1);
        bus.unregister(Address(0));
        assert!(bus.lookup(Address(0)).is_none());
        // The node keeps its address for life.
        assert_eq!(scene.get(ids[0]).unwrap().address(), Some(Address(0)));
    }

    #[test]
    fn reregister_after_unregister_keeps_address() {
        let (mut scene, mut bus, ids) = fixture(1);
        bus.unregister(Address(0));
        let address = bus.register(&mut scene, ids[0]);
        assert_eq!(address, Address(0));
        assert_eq!(bus.lookup(Address(0)), Some(ids[0]));
    }

    // ── Queue ────────────────────────────────────────────────────────

    #[test]
    fn post_increases_queue_by_one() {
        let (_scene, mut bus, _ids) = fixture(1);
        assert_eq!(bus.queue_len(), 0);
        bus.post(Envelope::broadcast(Address(0), Signal::Ok)).unwrap();
        assert_eq!(bus.queue_len(), 1);
    }

    #[test]
    fn post_to_full_queue_fails_and_drops() {
        let mut scene = Scene::new();
        let mut bus = AddressBus::with_capacity(2);
        let id = scene.insert(Node::new("x"));
        bus.register(&mut scene, id);

        bus.post(Envelope::broadcast(Address(0), Signal::Ok)).unwrap();
        bus.post(Envelope::broadcast(Address(0), Signal::Ok)).unwrap();
        let result = bus.post(Envelope::broadcast(Address(0), Signal::Ok));
        assert_eq!(result, Err(BusError::QueueFull { capacity: 2 }));
        assert_eq!(bus.queue_len(), 2);
    }

    #[test]
    fn peek_filters_by_address_and_broadcast() {
        let (_scene, mut bus, _ids) = fixture(2);
        bus.post(Envelope::unicast(Address(0), Address(1), Signal::Ping)).unwrap();
        bus.post(Envelope::unicast(Address(1), Address(0), Signal::Pong)).unwrap();
        bus.post(Envelope::broadcast(Address(1), Signal::Redraw)).unwrap();

        let for_zero = bus.peek(Address(0));
        assert_eq!(for_zero.len(), 2); // its unicast + the broadcast
        assert_eq!(for_zero[0].signal, Signal::Ping);
        assert_eq!(for_zero[1].signal, Signal::Redraw);
    }

    #[test]
    fn peek_does_not_drain() {
        let (_scene, mut bus, _ids) = fixture(1);
        bus.post(Envelope::broadcast(Address(0), Signal::Ok)).unwrap();
        let _ = bus.peek(Address(0));
        assert_eq!(bus.queue_len(), 1);
    }

    // ── Pump ─────────────────────────────────────────────────────────

    #[test]
    fn unicast_to_unregistered_address_is_silent() {
        let (mut scene, mut bus, _ids) = fixture(1);
        bus.post(Envelope::unicast(Address(99), Address(0), Signal::Ping)).unwrap();
        bus.pump(&mut scene); // must not panic, queue drains
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn pump_empties_queue() {
        let (mut scene, mut bus, _ids) = fixture(2);
        bus.post(Envelope::broadcast(Address(0), Signal::Redraw)).unwrap();
        bus.pump(&mut scene);
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn redraw_marks_target_dirty_and_replies_ok() {
        let (mut scene, mut bus, ids) = fixture(2);
        scene.get_mut(ids[1]).unwrap().dirty = false;
        bus.post(Envelope::unicast(Address(1), Address(0), Signal::Redraw)).unwrap();
        bus.pump(&mut scene);
        assert!(scene.get(ids[1]).unwrap().dirty);
        // The Ok reply was posted during the pump, so it is still queued.
        let replies = bus.peek(Address(0));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].signal, Signal::Ok);
    }

    #[test]
    fn posts_during_pump_deliver_on_next_pump() {
        let (mut scene, mut bus, ids) = fixture(2);
        // Ping triggers a Pong reply posted mid-pump.
        bus.post(Envelope::unicast(Address(1), Address(0), Signal::Ping)).unwrap();
        bus.pump(&mut scene);
        assert_eq!(bus.queue_len(), 1, "reply is deferred, not delivered in-pass");

        scene.get_mut(ids[0]).unwrap().dirty = false;
        bus.pump(&mut scene);
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn ping_gets_pong_with_metadata() {
        let (mut scene, mut bus, _ids) = fixture(2);
        bus.tick(1.25);
        bus.post(Envelope::unicast(Address(1), Address(0), Signal::Ping)).unwrap();
        bus.pump(&mut scene);

        let replies = bus.peek(Address(0));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].signal, Signal::Pong);
        assert_eq!(replies[0].sender, Address(1));
        match &replies[0].payload {
            Payload::Metadata(meta) => {
                assert_eq!(meta.name, "n1");
                assert_eq!(meta.ts, 1.25);
            }
            other => panic!("expected metadata payload, got {other:?}"),
        }
    }

    #[test]
    fn sender_never_receives_own_broadcast() {
        let (mut scene, mut bus, ids) = fixture(3);
        for &id in &ids {
            scene.get_mut(id).unwrap().dirty = false;
        }
        bus.post(Envelope::broadcast(Address(1), Signal::Redraw)).unwrap();
        bus.pump(&mut scene);
        assert!(scene.get(ids[0]).unwrap().dirty);
        assert!(!scene.get(ids[1]).unwrap().dirty, "sender must ignore its own broadcast");
        assert!(scene.get(ids[2]).unwrap().dirty);
    }

    #[test]
    fn broadcast_shutdown_destroys_and_unregisters_all() {
        let (mut scene, mut bus, ids) = fixture(5);
        // Sender address outside the group so all five react.
        let host = scene.insert(Node::new("host"));
        let host_addr = bus.register(&mut scene, host);

        bus.post(Envelope::broadcast(host_addr, Signal::Shutdown)).unwrap();
        bus.pump(&mut scene);

        for id in ids {
            assert!(scene.get(id).unwrap().terminated);
        }
        assert_eq!(bus.registered_count(), 1); // only the host remains
    }

    #[test]
    fn theme_broadcast_copies_palette() {
        use crate::render::{Color, Palette};
        let (mut scene, mut bus, ids) = fixture(2);
        let palette = Palette {
            bg: Color::rgb(1, 2, 3),
            fg: Color::rgb(4, 5, 6),
            shade: Color::rgb(7, 8, 9),
            text: Color::rgb(10, 11, 12),
            text_dim: Color::rgb(13, 14, 15),
        };
        let host = scene.insert(Node::new("host"));
        let host_addr = bus.register(&mut scene, host);
        bus.post(
            Envelope::broadcast(host_addr, Signal::Theme).with_payload(Payload::Palette(palette)),
        )
        .unwrap();
        bus.pump(&mut scene);

        assert_eq!(scene.get(ids[0]).unwrap().palette, palette);
        assert_eq!(scene.get(ids[1]).unwrap().palette, palette);
    }

    #[test]
    fn clock_accumulates() {
        let mut bus = AddressBus::new();
        bus.tick(0.1);
        bus.tick(0.25);
        assert!((bus.now() - 0.35).abs() < 1e-9);
    }
}
