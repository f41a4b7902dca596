//! Diagnostic behaviors: fault injection, latency probing, bus activity.
//!
//! These are engine-level instruments, not widgets. [`Load`] is the one
//! deliberately blocking facility in the crate: it stalls the calling thread
//! to simulate a slow component under test.

use std::any::Any;
use std::thread;
use std::time::Duration;

use crate::bus::{Envelope, Payload, Signal};
use crate::event::input::Event;
use crate::render::Surface;
use crate::scene::behavior::{Behavior, Cx};
use crate::scene::node::NodeId;
use crate::scene::tree::Scene;

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Milliseconds of delay per unit of resistance.
const LOAD_MS_PER_UNIT: f64 = 10.0;
/// Upper bound on a single injected stall.
const LOAD_MAX_MS: f64 = 50.0;

/// Fault injection: stalls update, event processing, and message handling
/// by `resistance` x 10 ms, capped at 50 ms per call.
///
/// Attach to an invisible node to degrade a whole frame loop on purpose.
pub struct Load {
    resistance: f64,
}

impl Load {
    /// Create a load with the given resistance (units of 10 ms).
    pub fn new(resistance: f64) -> Self {
        Self { resistance: resistance.max(0.0) }
    }

    /// Change the resistance; negative values clamp to zero.
    pub fn set_resistance(&mut self, resistance: f64) {
        self.resistance = resistance.max(0.0);
    }

    /// The injected stall per call.
    pub fn delay(&self) -> Duration {
        let ms = (self.resistance * LOAD_MS_PER_UNIT).min(LOAD_MAX_MS);
        Duration::from_micros((ms * 1000.0) as u64)
    }

    fn stall(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl Behavior for Load {
    fn kind(&self) -> &'static str {
        "load"
    }

    fn update(&mut self, _cx: &mut Cx<'_>, _id: NodeId, _dt: f64) {
        self.stall();
    }

    fn process_event(&mut self, _cx: &mut Cx<'_>, _id: NodeId, _event: &Event) -> bool {
        self.stall();
        false
    }

    fn on_message(&mut self, _cx: &mut Cx<'_>, _id: NodeId, _envelope: &Envelope) {
        self.stall();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// LatencyProbe
// ---------------------------------------------------------------------------

/// Broadcasts a `Ping` on a fixed interval and records round-trip times
/// from the `Pong` replies, using the bus clock.
pub struct LatencyProbe {
    interval: f64,
    elapsed: f64,
    samples: Vec<f64>,
    max_samples: usize,
}

impl LatencyProbe {
    /// Create a probe pinging every `interval` seconds, keeping up to
    /// `max_samples` round-trip samples.
    pub fn new(interval: f64, max_samples: usize) -> Self {
        Self { interval, elapsed: 0.0, samples: Vec::new(), max_samples }
    }

    /// The recorded round-trip samples, oldest first.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// The most recent round-trip time.
    pub fn latest(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    /// Mean round-trip time over the retained window.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    fn record(&mut self, rtt: f64) {
        self.samples.push(rtt);
        if self.samples.len() > self.max_samples {
            self.samples.remove(0);
        }
    }
}

impl Default for LatencyProbe {
    fn default() -> Self {
        Self::new(1.0, 64)
    }
}

impl Behavior for LatencyProbe {
    fn kind(&self) -> &'static str {
        "probe"
    }

    fn update(&mut self, cx: &mut Cx<'_>, id: NodeId, dt: f64) {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return;
        }
        self.elapsed = 0.0;
        if let Some(address) = cx.scene.get(id).and_then(|node| node.address()) {
            let _ = cx.bus.post(Envelope::broadcast(address, Signal::Ping));
        }
    }

    fn on_message(&mut self, cx: &mut Cx<'_>, id: NodeId, envelope: &Envelope) {
        if envelope.signal != Signal::Pong {
            return;
        }
        if let Payload::Metadata(metadata) = &envelope.payload {
            self.record(cx.bus.now() - metadata.ts);
            cx.scene.invalidate(id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Beacon
// ---------------------------------------------------------------------------

/// Lights up on any observed envelope and decays over the following frames.
/// A cheap visual indicator of bus traffic.
pub struct Beacon {
    timeout: f64,
    timer: f64,
    phase: f64,
    speed: f64,
}

impl Beacon {
    /// Create a beacon that stays lit for `timeout` seconds per envelope.
    pub fn new(timeout: f64) -> Self {
        Self { timeout, timer: 0.0, phase: 0.0, speed: 15.0 }
    }

    /// Whether the beacon is currently lit.
    pub fn is_active(&self) -> bool {
        self.timer > 0.0
    }

    /// Current glow in `[0.0, 1.0]`: ramps up with the pulse phase, fades
    /// with the remaining timer.
    pub fn intensity(&self) -> f64 {
        if self.timer <= 0.0 {
            return 0.0;
        }
        self.phase.min(1.0) * (self.timer / self.timeout).clamp(0.0, 1.0)
    }
}

impl Default for Beacon {
    fn default() -> Self {
        Self::new(0.95)
    }
}

impl Behavior for Beacon {
    fn kind(&self) -> &'static str {
        "beacon"
    }

    fn update(&mut self, cx: &mut Cx<'_>, id: NodeId, dt: f64) {
        if self.timer <= 0.0 {
            return;
        }
        self.timer = (self.timer - dt).max(0.0);
        self.phase += dt * self.speed;
        cx.scene.invalidate(id);
    }

    fn on_message(&mut self, cx: &mut Cx<'_>, id: NodeId, _envelope: &Envelope) {
        self.timer = self.timeout;
        self.phase = 0.0;
        cx.scene.invalidate(id);
    }

    fn draw(&mut self, scene: &Scene, id: NodeId, surface: &mut dyn Surface) {
        let Some(node) = scene.get(id) else { return };
        let abs = scene.absolute_rect(id);
        let intensity = self.intensity();
        if intensity > 0.0 {
            surface.fill_rect(abs, node.palette.fg.scaled(intensity));
        } else {
            surface.fill_rect(abs, node.palette.shade);
        }
        surface.stroke_rect(abs, node.palette.fg);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ===========================================================================
// Tests
// ===========================================================================
