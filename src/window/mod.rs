//! Window management: drag-to-move, z-order, edge snapping, toggles.
//!
//! A window is an ordinary node with a [`Window`] behavior attached. Every
//! capability here is built from the scene, the dispatcher, and the bus —
//! there is no separate window tree.

use std::any::Any;

use crate::bus::{Envelope, Payload, Signal};
use crate::event::input::{Event, PointerAction, PointerButton};
use crate::geometry::Point;
use crate::render::Surface;
use crate::scene::behavior::{Behavior, Cx};
use crate::scene::node::NodeId;
use crate::scene::tree::Scene;

/// Default distance, in surface units, within which edges snap.
pub const DEFAULT_SNAP_THRESHOLD: i32 = 10;

/// The `kind` tag windows carry; snapping only considers siblings with it.
pub const WINDOW_KIND: &str = "window";

/// Drag, snap, and lifecycle state for one window node.
pub struct Window {
    draggable: bool,
    closable: bool,
    snap_enabled: bool,
    dragging: bool,
    drag_offset: Point,
    /// Press-to-drag hit-box height from the window top; `None` makes the
    /// whole window a drag handle.
    header_height: Option<i32>,
    snap_threshold: i32,
}

impl Window {
    /// A movable, closable, snapping window with the whole rect as handle.
    pub fn new() -> Self {
        Self {
            draggable: true,
            closable: true,
            snap_enabled: true,
            dragging: false,
            drag_offset: Point::ORIGIN,
            header_height: None,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
        }
    }

    /// A window that cannot be moved (builder).
    pub fn fixed(mut self) -> Self {
        self.draggable = false;
        self
    }

    /// Set whether the window can be closed (builder).
    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = closable;
        self
    }

    /// Set whether edges snap to siblings while dragging (builder).
    pub fn snapping(mut self, enabled: bool) -> Self {
        self.snap_enabled = enabled;
        self
    }

    /// Restrict the drag handle to the top `height` units (builder).
    pub fn with_header_height(mut self, height: i32) -> Self {
        self.header_height = Some(height);
        self
    }

    /// Set the snap distance (builder).
    pub fn with_snap_threshold(mut self, threshold: i32) -> Self {
        self.snap_threshold = threshold;
        self
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether the window can currently be moved.
    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    /// Whether edge snapping is currently enabled.
    pub fn is_snapping(&self) -> bool {
        self.snap_enabled
    }

    // -----------------------------------------------------------------------
    // Host-facing operations
    // -----------------------------------------------------------------------

    /// Flip the lock state of the window at `id` and broadcast a `Lock`
    /// advertisement carrying its metadata. Geometry is untouched.
    pub fn toggle_lock(cx: &mut Cx<'_>, id: NodeId) {
        Self::with(cx, id, |window, cx| {
            window.draggable = !window.draggable;
            window.advertise(cx, id, Signal::Lock);
        });
    }

    /// Flip the snap state of the window at `id` and broadcast a `Snap`
    /// advertisement carrying its metadata.
    pub fn toggle_snap(cx: &mut Cx<'_>, id: NodeId) {
        Self::with(cx, id, |window, cx| {
            window.snap_enabled = !window.snap_enabled;
            window.advertise(cx, id, Signal::Snap);
        });
    }

    /// Close the window at `id`: broadcast `Bye` carrying the closing id
    /// *before* destroying, so listeners can react while it is still valid.
    /// No-op if the window is not closable.
    pub fn close(cx: &mut Cx<'_>, id: NodeId) {
        let Some(behavior) = cx.scene.take_behavior(id) else { return };
        let closable =
            behavior.as_any().downcast_ref::<Window>().is_some_and(|window| window.closable);
        if !closable {
            cx.scene.put_behavior(id, behavior);
            return;
        }
        tracing::debug!(?id, "closing window");
        if let Some(address) = cx.scene.get(id).and_then(|node| node.address()) {
            let _ = cx.bus.post(
                Envelope::broadcast(address, Signal::Bye).with_payload(Payload::Node(id)),
            );
        }
        cx.destroy(id);
    }

    /// Run `f` on the window behavior at `id`, taken out of the scene for
    /// the duration so it can post and mutate freely.
    fn with(cx: &mut Cx<'_>, id: NodeId, f: impl FnOnce(&mut Window, &mut Cx<'_>)) {
        let Some(mut behavior) = cx.scene.take_behavior(id) else { return };
        if let Some(window) = behavior.as_any_mut().downcast_mut::<Window>() {
            f(window, cx);
        }
        if cx.scene.get(id).is_some_and(|node| !node.terminated) {
            cx.scene.put_behavior(id, behavior);
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn advertise(&self, cx: &mut Cx<'_>, id: NodeId, signal: Signal) {
        let Some(address) = cx.scene.get(id).and_then(|node| node.address()) else { return };
        let metadata = cx.scene.metadata_of(id, cx.bus.now());
        let _ = cx
            .bus
            .post(Envelope::broadcast(address, signal).with_payload(Payload::Metadata(metadata)));
    }

    /// Whether `point` lands in the drag handle.
    fn header_hit(&self, scene: &Scene, id: NodeId, point: Point) -> bool {
        let abs = scene.absolute_rect(id);
        if !abs.contains(point) {
            return false;
        }
        match self.header_height {
            None => true,
            Some(height) => point.y - abs.top() < height,
        }
    }

    /// Align edges to nearby sibling windows, one nudge per axis.
    ///
    /// Horizontal and vertical snapping are evaluated independently against
    /// the rectangle as it was when the pass started, so a window can snap
    /// horizontally to one sibling and vertically to a different one.
    fn snap(&self, scene: &mut Scene, id: NodeId) {
        let Some(parent) = scene.parent(id) else { return };
        let mine = scene.absolute_rect(id);

        let mut dx: Option<i32> = None;
        let mut dy: Option<i32> = None;
        let siblings: Vec<NodeId> = scene.children(parent).to_vec();
        for sibling in siblings {
            if sibling == id {
                continue;
            }
            let eligible = scene
                .get(sibling)
                .is_some_and(|n| n.kind == WINDOW_KIND && n.visible && !n.terminated);
            if !eligible {
                continue;
            }
            let theirs = scene.absolute_rect(sibling);
            if dx.is_none() {
                if (mine.left() - theirs.left()).abs() <= self.snap_threshold {
                    dx = Some(theirs.left() - mine.left());
                } else if (mine.right() - theirs.right()).abs() <= self.snap_threshold {
                    dx = Some(theirs.right() - mine.right());
                }
            }
            if dy.is_none() {
                if (mine.top() - theirs.top()).abs() <= self.snap_threshold {
                    dy = Some(theirs.top() - mine.top());
                } else if (mine.bottom() - theirs.bottom()).abs() <= self.snap_threshold {
                    dy = Some(theirs.bottom() - mine.bottom());
                }
            }
            if dx.is_some() && dy.is_some() {
                break;
            }
        }

        if dx.is_some() || dy.is_some() {
            let local = scene.get(id).map(|node| node.rect()).unwrap_or_default();
            let nudged = Point::new(local.x + dx.unwrap_or(0), local.y + dy.unwrap_or(0));
            tracing::trace!(?id, dx, dy, "snapped window");
            scene.set_position(id, nudged);
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Window {
    fn kind(&self) -> &'static str {
        WINDOW_KIND
    }

    fn draw(&mut self, scene: &Scene, id: NodeId, surface: &mut dyn Surface) {
        let Some(node) = scene.get(id) else { return };
        let abs = scene.absolute_rect(id);
        surface.fill_rect(abs, node.palette.bg);
        surface.stroke_rect(abs, node.palette.fg);
    }

    fn process_event(&mut self, cx: &mut Cx<'_>, id: NodeId, event: &Event) -> bool {
        if !self.draggable {
            return false;
        }
        let Event::Pointer(pointer) = event else { return false };
        match pointer.action {
            PointerAction::Press(PointerButton::Primary) => {
                if !self.header_hit(cx.scene, id, pointer.position) {
                    return false;
                }
                self.dragging = true;
                self.drag_offset = pointer.position - cx.scene.absolute_rect(id).origin();
                cx.scene.bring_to_front(id);
                tracing::debug!(?id, "drag start");
                true
            }
            PointerAction::Release(PointerButton::Primary) => {
                if !self.dragging {
                    return false;
                }
                self.dragging = false;
                tracing::debug!(?id, "drag end");
                self.advertise(cx, id, Signal::Settled);
                true
            }
            PointerAction::Moved => {
                if !self.dragging {
                    return false;
                }
                cx.scene.set_position(id, pointer.position - self.drag_offset);
                if self.snap_enabled {
                    self.snap(cx.scene, id);
                }
                true
            }
            _ => false,
        }
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
