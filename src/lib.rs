//! # atrium-ui
//!
//! A retained-mode UI scene graph for embedded desktop-style tooling —
//! debug overlays, editors, dialogs — driven by an external real-time frame
//! loop.
//!
//! Three subsystems carry the engine:
//!
//! - **[`scene`]** — Slotmap-backed component tree: exclusive ownership,
//!   coordinate composition, z-order, dirty propagation, and the
//!   [`Behavior`](scene::behavior::Behavior) seam for widget logic
//! - **[`event`]** — Decoded input events and the dispatch state machine:
//!   front-to-back hit-testing, sibling-scoped focus, passthrough
//! - **[`bus`]** — Address-based publish/subscribe: registration, bounded
//!   FIFO envelopes, broadcast, and the built-in message protocol
//!
//! Built on those:
//!
//! - **[`window`]** — Drag-to-move, bring-to-front, inter-window edge
//!   snapping, lock/snap advertisements
//! - **[`stage`]** — The host-facing shell: `update(dt)` / `draw(surface)` /
//!   `handle_event(event)` entry points and the throttled bus pump
//! - **[`diagnostics`]** — Fault injection, latency probing, bus beacons
//! - **[`geometry`]**, **[`render`]** — Points, rectangles, palettes, and
//!   the object-safe [`Surface`](render::Surface) draw seam

// Foundation
pub mod geometry;
pub mod render;

// Core systems
pub mod bus;
pub mod event;
pub mod scene;

// Built on the core
pub mod diagnostics;
pub mod stage;
pub mod window;
