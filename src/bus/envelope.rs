//! Envelope values routed by the address bus.
//!
//! An [`Envelope`] is immutable once posted: a receiver (concrete address or
//! broadcast), the sender's address, a [`Signal`] from a closed enumeration,
//! and an opaque [`Payload`].

use std::fmt;

use crate::render::Palette;
use crate::scene::node::NodeId;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Integer mailbox key assigned to a node on first bus registration.
///
/// Addresses are unique, monotonically assigned, and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u32);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Where an envelope is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// One specific address; silently dropped if no longer registered.
    Unicast(Address),
    /// Every node registered at pump time, except the sender.
    Broadcast,
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// The closed set of response codes an envelope can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    // Generic states.
    Ok,
    Err,
    Busy,

    // Dialog answers.
    Yes,
    No,
    Cancel,

    // Discovery.
    Ping,
    Pong,

    // Management.
    Redraw,
    Shutdown,
    Theme,

    // Window advertisements.
    Lock,
    Snap,
    Settled,
    Bye,
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Self-descriptive node metadata attached to discovery replies.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub kind: String,
    pub child_count: usize,
    /// Bus clock at the moment the metadata was produced, in seconds.
    pub ts: f64,
}

/// The value slot of an envelope. Opaque to the bus itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    Metadata(Metadata),
    Palette(Palette),
    Node(NodeId),
    Text(String),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// An immutable message value. Queued by `post`, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub receiver: Recipient,
    pub sender: Address,
    pub signal: Signal,
    pub payload: Payload,
}

impl Envelope {
    /// An envelope addressed to one node, with no payload.
    pub fn unicast(to: Address, from: Address, signal: Signal) -> Self {
        Self { receiver: Recipient::Unicast(to), sender: from, signal, payload: Payload::None }
    }

    /// An envelope addressed to every registrant, with no payload.
    pub fn broadcast(from: Address, signal: Signal) -> Self {
        Self { receiver: Recipient::Broadcast, sender: from, signal, payload: Payload::None }
    }

    /// Attach a payload (builder).
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

// ===========================================================================
// Tests
// ===========================================================================
