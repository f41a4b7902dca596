//! Event dispatch: hit-testing, sibling-scoped focus, handler lists.
//!
//! [`dispatch`] walks the tree front-to-back (reverse insertion order) and
//! short-circuits on the first consumer — the engine's only cancellation
//! primitive. Focus is exclusive among direct siblings only; two unrelated
//! branches may each hold one active node at the same time.

use super::input::{Event, PointerAction, PointerButton};
use crate::scene::behavior::Cx;
use crate::scene::node::NodeId;
use crate::scene::tree::Scene;

// ---------------------------------------------------------------------------
// Event kinds and handler storage
// ---------------------------------------------------------------------------

/// The callback kinds a node keeps ordered handler lists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Hover,
    Focus,
    Blur,
    KeyPress,
}

impl EventKind {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            EventKind::Click => 0,
            EventKind::Hover => 1,
            EventKind::Focus => 2,
            EventKind::Blur => 3,
            EventKind::KeyPress => 4,
        }
    }
}

/// A handler callback: receives the source node and the raw event.
pub type Callback = Box<dyn FnMut(NodeId, &Event)>;

/// Token returned by [`Scene::on`], used to unregister with [`Scene::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Per-node handler lists, one ordered list per [`EventKind`].
#[derive(Default)]
pub(crate) struct Handlers {
    slots: [Vec<(HandlerId, Callback)>; EventKind::COUNT],
    next: u64,
}

impl Handlers {
    fn register(&mut self, kind: EventKind, callback: Callback) -> HandlerId {
        let id = HandlerId(self.next);
        self.next += 1;
        self.slots[kind.index()].push((id, callback));
        id
    }

    fn remove(&mut self, kind: EventKind, handler: HandlerId) {
        self.slots[kind.index()].retain(|(id, _)| *id != handler);
    }

    fn len(&self, kind: EventKind) -> usize {
        self.slots[kind.index()].len()
    }
}

// ---------------------------------------------------------------------------
// Handler registration on Scene
// ---------------------------------------------------------------------------

impl Scene {
    /// Register `callback` for `kind` on `id`. Handlers fire synchronously
    /// in registration order.
    pub fn on(
        &mut self,
        id: NodeId,
        kind: EventKind,
        callback: impl FnMut(NodeId, &Event) + 'static,
    ) -> HandlerId {
        self.get_mut(id)
            .expect("handlers can only be registered on live nodes")
            .handlers
            .register(kind, Box::new(callback))
    }

    /// Unregister a handler previously returned by [`Scene::on`]. No-op for
    /// an unknown token.
    pub fn off(&mut self, id: NodeId, kind: EventKind, handler: HandlerId) {
        if let Some(node) = self.get_mut(id) {
            node.handlers.remove(kind, handler);
        }
    }

    /// Number of handlers registered for `kind` on `id`.
    pub fn handler_count(&self, id: NodeId, kind: EventKind) -> usize {
        self.get(id).map_or(0, |node| node.handlers.len(kind))
    }

    /// Invoke every handler of `kind` on `id`, in registration order.
    ///
    /// The list is detached while it runs, so callbacks may register new
    /// handlers (they take effect afterwards) but must not unregister
    /// handlers of the same kind re-entrantly. Panics propagate to the
    /// frame driver.
    pub fn trigger(&mut self, id: NodeId, kind: EventKind, event: &Event) {
        let Some(node) = self.get_mut(id) else { return };
        let mut list = std::mem::take(&mut node.handlers.slots[kind.index()]);
        for (_, callback) in &mut list {
            callback(id, event);
        }
        if let Some(node) = self.get_mut(id) {
            let added = std::mem::take(&mut node.handlers.slots[kind.index()]);
            list.extend(added);
            node.handlers.slots[kind.index()] = list;
        }
    }

    /// Deactivate every active direct child of `parent` except `keep`,
    /// firing `Blur` on each. This is the sibling-scoped exclusion step of
    /// the focus state machine.
    pub fn deactivate_children(&mut self, parent: NodeId, keep: Option<NodeId>, event: &Event) {
        let kids: Vec<NodeId> = self.children(parent).to_vec();
        for child in kids {
            if Some(child) == keep {
                continue;
            }
            if self.get(child).is_some_and(|n| n.active) {
                if let Some(node) = self.get_mut(child) {
                    node.active = false;
                }
                self.trigger(child, EventKind::Blur, event);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Dispatch one input event into the subtree rooted at `id`.
///
/// Returns `true` if some node consumed the event. Invisible or disabled
/// nodes exclude their whole subtree. Children are visited in reverse
/// insertion order (topmost in z-order first); the node itself is processed
/// only if no descendant consumed.
pub fn dispatch(cx: &mut Cx<'_>, id: NodeId, event: &Event) -> bool {
    match cx.scene.get(id) {
        Some(node) if node.visible && node.enabled => {}
        _ => return false,
    }
    let children: Vec<NodeId> = cx.scene.children(id).to_vec();
    for child in children.into_iter().rev() {
        if dispatch(cx, child, event) {
            return true;
        }
    }
    process(cx, id, event)
}

/// Process an event at a single node: widget layer first, then the base
/// classification.
fn process(cx: &mut Cx<'_>, id: NodeId, event: &Event) -> bool {
    // Widget layer first: releases and drags are widget territory, the base
    // dispatcher does not interpret them.
    if let Some(mut behavior) = cx.scene.take_behavior(id) {
        let consumed = behavior.process_event(cx, id, event);
        if cx.scene.get(id).is_some_and(|n| !n.terminated) {
            cx.scene.put_behavior(id, behavior);
        }
        if consumed {
            return true;
        }
    }

    let (passthrough, active) = match cx.scene.get(id) {
        Some(node) => (node.passthrough, node.active),
        None => return false,
    };
    if passthrough {
        return false;
    }

    match event {
        Event::Pointer(pointer) => match pointer.action {
            PointerAction::Press(PointerButton::Primary) => {
                if cx.scene.absolute_rect(id).contains(pointer.position) {
                    if !active {
                        if let Some(parent) = cx.scene.parent(id) {
                            cx.scene.deactivate_children(parent, Some(id), event);
                        }
                        if let Some(node) = cx.scene.get_mut(id) {
                            node.active = true;
                        }
                        cx.scene.trigger(id, EventKind::Focus, event);
                    }
                    cx.scene.trigger(id, EventKind::Click, event);
                    true
                } else if active {
                    // Press elsewhere: lose focus, let another branch try.
                    if let Some(node) = cx.scene.get_mut(id) {
                        node.active = false;
                    }
                    cx.scene.trigger(id, EventKind::Blur, event);
                    false
                } else {
                    false
                }
            }
            PointerAction::Moved => {
                if cx.scene.absolute_rect(id).contains(pointer.position) {
                    cx.scene.trigger(id, EventKind::Hover, event);
                    true
                } else {
                    false
                }
            }
            _ => false,
        },
        Event::Key(_) => {
            if active {
                cx.scene.trigger(id, EventKind::KeyPress, event);
                true
            } else {
                false
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::bus::AddressBus;
    use crate::event::input::Key;
    use crate::geometry::{Point, Rect};
    use crate::scene::node::Node;

    struct Fixture {
        scene: Scene,
        bus: AddressBus,
    }

    impl Fixture {
        fn new() -> Self {
            Self { scene: Scene::new(), bus: AddressBus::new() }
        }

        fn dispatch(&mut self, root: NodeId, event: &Event) -> bool {
            let mut cx = Cx { scene: &mut self.scene, bus: &mut self.bus };
            dispatch(&mut cx, root, event)
        }
    }

    /// Counter that records every firing of one event kind on one node.
    fn count(fx: &mut Fixture, id: NodeId, kind: EventKind) -> Rc<RefCell<u32>> {
        let counter = Rc::new(RefCell::new(0));
        let tap = Rc::clone(&counter);
        fx.scene.on(id, kind, move |_, _| *tap.borrow_mut() += 1);
        counter
    }

    /// Root at the origin with three fully overlapping children, added in
    /// order a, b, c — so c is topmost.
    fn overlapping_siblings() -> (Fixture, NodeId, NodeId, NodeId, NodeId) {
        let mut fx = Fixture::new();
        let root = fx.scene.insert(Node::new("root").with_rect(Rect::new(0, 0, 400, 300)));
        let rect = Rect::new(10, 10, 100, 100);
        let a = fx.scene.insert(Node::new("a").with_rect(rect));
        let b = fx.scene.insert(Node::new("b").with_rect(rect));
        let c = fx.scene.insert(Node::new("c").with_rect(rect));
        fx.scene.add(root, a);
        fx.scene.add(root, b);
        fx.scene.add(root, c);
        (fx, root, a, b, c)
    }

    // ── Hit-testing and z-order ──────────────────────────────────────

    #[test]
    fn topmost_sibling_consumes_click() {
        let (mut fx, root, a, b, c) = overlapping_siblings();
        let clicks_a = count(&mut fx, a, EventKind::Click);
        let clicks_b = count(&mut fx, b, EventKind::Click);
        let clicks_c = count(&mut fx, c, EventKind::Click);

        assert!(fx.dispatch(root, &Event::press(Point::new(50, 50))));
        assert_eq!(*clicks_a.borrow(), 0);
        assert_eq!(*clicks_b.borrow(), 0);
        assert_eq!(*clicks_c.borrow(), 1);
    }

    #[test]
    fn bring_to_front_changes_consumer() {
        let (mut fx, root, a, _b, c) = overlapping_siblings();
        let clicks_a = count(&mut fx, a, EventKind::Click);
        let clicks_c = count(&mut fx, c, EventKind::Click);

        fx.scene.bring_to_front(a);
        assert!(fx.dispatch(root, &Event::press(Point::new(50, 50))));
        assert_eq!(*clicks_a.borrow(), 1);
        assert_eq!(*clicks_c.borrow(), 0);
    }

    #[test]
    fn press_outside_everything_is_unconsumed() {
        let (mut fx, root, ..) = overlapping_siblings();
        // Outside the children but also outside the root rect? The root
        // itself is a hit-target, so aim past it.
        assert!(!fx.dispatch(root, &Event::press(Point::new(900, 900))));
    }

    #[test]
    fn invisible_subtree_excluded() {
        let (mut fx, root, _a, _b, c) = overlapping_siblings();
        let clicks_c = count(&mut fx, c, EventKind::Click);
        fx.scene.get_mut(c).unwrap().visible = false;
        assert!(fx.dispatch(root, &Event::press(Point::new(50, 50))));
        assert_eq!(*clicks_c.borrow(), 0);
    }

    #[test]
    fn disabled_subtree_excluded() {
        let (mut fx, root, _a, b, c) = overlapping_siblings();
        let clicks_b = count(&mut fx, b, EventKind::Click);
        fx.scene.get_mut(c).unwrap().enabled = false;
        assert!(fx.dispatch(root, &Event::press(Point::new(50, 50))));
        assert_eq!(*clicks_b.borrow(), 1);
    }

    #[test]
    fn passthrough_node_defers_to_sibling_below() {
        let (mut fx, root, _a, b, c) = overlapping_siblings();
        let clicks_b = count(&mut fx, b, EventKind::Click);
        let clicks_c = count(&mut fx, c, EventKind::Click);
        fx.scene.get_mut(c).unwrap().passthrough = true;
        assert!(fx.dispatch(root, &Event::press(Point::new(50, 50))));
        assert_eq!(*clicks_c.borrow(), 0);
        assert_eq!(*clicks_b.borrow(), 1);
    }

    #[test]
    fn passthrough_children_still_participate() {
        let mut fx = Fixture::new();
        let root = fx.scene.insert(Node::new("root").with_rect(Rect::new(0, 0, 400, 300)));
        let overlay =
            fx.scene.insert(Node::new("overlay").with_rect(Rect::new(0, 0, 400, 300)).passthrough(true));
        let button = fx.scene.insert(Node::new("button").with_rect(Rect::new(10, 10, 20, 20)));
        fx.scene.add(root, overlay);
        fx.scene.add(overlay, button);
        let clicks = count(&mut fx, button, EventKind::Click);

        assert!(fx.dispatch(root, &Event::press(Point::new(15, 15))));
        assert_eq!(*clicks.borrow(), 1);
    }

    // ── Focus state machine ──────────────────────────────────────────

    #[test]
    fn focus_fires_on_transition_then_click() {
        let (mut fx, root, _a, _b, c) = overlapping_siblings();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let tap = Rc::clone(&log);
        fx.scene.on(c, EventKind::Focus, move |_, _| tap.borrow_mut().push("focus"));
        let tap = Rc::clone(&log);
        fx.scene.on(c, EventKind::Click, move |_, _| tap.borrow_mut().push("click"));

        fx.dispatch(root, &Event::press(Point::new(50, 50)));
        assert_eq!(*log.borrow(), vec!["focus", "click"]);
        assert!(fx.scene.get(c).unwrap().active);

        // Second press: already active, no second focus.
        fx.dispatch(root, &Event::press(Point::new(50, 50)));
        assert_eq!(*log.borrow(), vec!["focus", "click", "click"]);
    }

    #[test]
    fn sibling_focus_is_exclusive() {
        let mut fx = Fixture::new();
        let root = fx.scene.insert(Node::new("root").with_rect(Rect::new(0, 0, 400, 300)));
        let a = fx.scene.insert(Node::new("a").with_rect(Rect::new(0, 0, 50, 50)));
        let b = fx.scene.insert(Node::new("b").with_rect(Rect::new(100, 0, 50, 50)));
        fx.scene.add(root, a);
        fx.scene.add(root, b);
        let blurs_a = count(&mut fx, a, EventKind::Blur);
        let focuses_b = count(&mut fx, b, EventKind::Focus);

        fx.dispatch(root, &Event::press(Point::new(10, 10)));
        assert!(fx.scene.get(a).unwrap().active);

        fx.dispatch(root, &Event::press(Point::new(110, 10)));
        assert!(!fx.scene.get(a).unwrap().active);
        assert!(fx.scene.get(b).unwrap().active);
        assert_eq!(*blurs_a.borrow(), 1);
        assert_eq!(*focuses_b.borrow(), 1);
    }

    #[test]
    fn unrelated_branch_keeps_focus() {
        // Two panels, each with one child; activating a child in one panel
        // must not blur the active child of the other.
        let mut fx = Fixture::new();
        let root = fx.scene.insert(Node::new("root").with_rect(Rect::new(0, 0, 400, 300)));
        let left = fx.scene.insert(Node::new("left").with_rect(Rect::new(0, 0, 100, 300)).passthrough(true));
        let right =
            fx.scene.insert(Node::new("right").with_rect(Rect::new(200, 0, 100, 300)).passthrough(true));
        let left_child = fx.scene.insert(Node::new("lc").with_rect(Rect::new(10, 10, 20, 20)));
        let right_child = fx.scene.insert(Node::new("rc").with_rect(Rect::new(10, 10, 20, 20)));
        fx.scene.add(root, left);
        fx.scene.add(root, right);
        fx.scene.add(left, left_child);
        fx.scene.add(right, right_child);
        let blurs_left = count(&mut fx, left_child, EventKind::Blur);

        fx.dispatch(root, &Event::press(Point::new(15, 15)));
        assert!(fx.scene.get(left_child).unwrap().active);

        fx.dispatch(root, &Event::press(Point::new(215, 15)));
        assert!(fx.scene.get(right_child).unwrap().active);
        // Sibling-scoped exclusion: both branches hold one active node.
        assert!(fx.scene.get(left_child).unwrap().active);
        assert_eq!(*blurs_left.borrow(), 0);
    }

    #[test]
    fn press_outside_active_node_blurs_it() {
        let mut fx = Fixture::new();
        let root = fx.scene.insert(Node::new("root").with_rect(Rect::new(0, 0, 400, 300)));
        let a = fx.scene.insert(Node::new("a").with_rect(Rect::new(0, 0, 50, 50)));
        fx.scene.add(root, a);
        let blurs = count(&mut fx, a, EventKind::Blur);

        fx.dispatch(root, &Event::press(Point::new(10, 10)));
        assert!(fx.scene.get(a).unwrap().active);

        // Lands on the root, not on a: a blurs, root consumes.
        fx.dispatch(root, &Event::press(Point::new(300, 200)));
        assert!(!fx.scene.get(a).unwrap().active);
        assert_eq!(*blurs.borrow(), 1);
    }

    // ── Hover and keys ───────────────────────────────────────────────

    #[test]
    fn motion_inside_fires_hover() {
        let (mut fx, root, _a, _b, c) = overlapping_siblings();
        let hovers = count(&mut fx, c, EventKind::Hover);
        assert!(fx.dispatch(root, &Event::motion(Point::new(50, 50))));
        assert_eq!(*hovers.borrow(), 1);
    }

    #[test]
    fn motion_outside_not_consumed() {
        let (mut fx, root, ..) = overlapping_siblings();
        assert!(!fx.dispatch(root, &Event::motion(Point::new(900, 900))));
    }

    #[test]
    fn keypress_only_reaches_focused_node() {
        let (mut fx, root, _a, b, c) = overlapping_siblings();
        let keys_b = count(&mut fx, b, EventKind::KeyPress);
        let keys_c = count(&mut fx, c, EventKind::KeyPress);

        // Nobody focused: the key event is unconsumed.
        assert!(!fx.dispatch(root, &Event::key(Key::Enter)));

        fx.dispatch(root, &Event::press(Point::new(50, 50))); // focuses c
        assert!(fx.dispatch(root, &Event::key(Key::Enter)));
        assert_eq!(*keys_c.borrow(), 1);
        assert_eq!(*keys_b.borrow(), 0);
    }

    // ── Handler registration ─────────────────────────────────────────

    #[test]
    fn handlers_fire_in_registration_order() {
        let (mut fx, root, _a, _b, c) = overlapping_siblings();
        let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let tap = Rc::clone(&log);
            fx.scene.on(c, EventKind::Click, move |_, _| tap.borrow_mut().push(i));
        }
        fx.dispatch(root, &Event::press(Point::new(50, 50)));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn off_removes_handler() {
        let (mut fx, root, _a, _b, c) = overlapping_siblings();
        let counter = Rc::new(RefCell::new(0));
        let tap = Rc::clone(&counter);
        let handler = fx.scene.on(c, EventKind::Click, move |_, _| *tap.borrow_mut() += 1);
        assert_eq!(fx.scene.handler_count(c, EventKind::Click), 1);

        fx.scene.off(c, EventKind::Click, handler);
        assert_eq!(fx.scene.handler_count(c, EventKind::Click), 0);
        fx.dispatch(root, &Event::press(Point::new(50, 50)));
        assert_eq!(*counter.borrow(), 0);
    }

    #[test]
    fn handler_receives_source_node() {
        let (mut fx, root, _a, _b, c) = overlapping_siblings();
        let seen = Rc::new(RefCell::new(None));
        let tap = Rc::clone(&seen);
        fx.scene.on(c, EventKind::Click, move |source, _| *tap.borrow_mut() = Some(source));
        fx.dispatch(root, &Event::press(Point::new(50, 50)));
        assert_eq!(*seen.borrow(), Some(c));
    }

    #[test]
    fn trigger_on_missing_node_is_noop() {
        let mut fx = Fixture::new();
        let id = fx.scene.insert(Node::new("x"));
        fx.scene.destroy(id);
        fx.scene.sweep();
        fx.scene.trigger(id, EventKind::Click, &Event::press(Point::ORIGIN));
    }

    #[test]
    fn release_is_not_interpreted_by_base_dispatch() {
        let (mut fx, root, ..) = overlapping_siblings();
        assert!(!fx.dispatch(root, &Event::release(Point::new(50, 50))));
    }
}
