//! Tree operations: attach, reparent, destroy, z-order, dirty propagation.

use slotmap::{SecondaryMap, SlotMap};

use super::node::{Node, NodeId};
use crate::bus::Metadata;
use crate::geometry::{Point, Rect};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// The scene graph, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`; parent/child relationships and
/// attached behaviors are stored in secondary maps. Child-list order IS the
/// z-order: later entries draw on top and are hit-tested first.
///
/// `destroy` detaches and marks nodes terminated but keeps their arena slots
/// so flags stay observable through stale ids; [`Scene::sweep`] reclaims the
/// slots once the host is done with them.
pub struct Scene {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    behaviors: SecondaryMap<NodeId, Box<dyn super::behavior::Behavior>>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            behaviors: SecondaryMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Insert a detached node (no parent, no address).
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        id
    }

    /// Attach `child` to `parent`, detaching it from any previous parent
    /// first (a node has at most one parent). The child is appended to the
    /// parent's list, becoming topmost in z-order. Marks the tree dirty from
    /// `parent` upward.
    ///
    /// No cycle check is performed in release builds; attaching a node into
    /// its own subtree is a programmer error.
    pub fn add(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes.contains_key(parent), "add: parent does not exist");
        debug_assert!(self.nodes.contains_key(child), "add: child does not exist");
        debug_assert!(
            !self.is_descendant(parent, child),
            "add: child is an ancestor of parent"
        );

        if let Some(old_parent) = self.parent.remove(child) {
            if let Some(siblings) = self.children.get_mut(old_parent) {
                siblings.retain(|&c| c != child);
            }
            self.invalidate(old_parent);
        }

        self.parent.insert(child, parent);
        self.children
            .get_mut(parent)
            .expect("parent must have a children list")
            .push(child);
        self.invalidate(parent);
    }

    /// Detach `child` from `parent`. No-op if `child` is not in the list.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) {
        let Some(siblings) = self.children.get_mut(parent) else { return };
        let before = siblings.len();
        siblings.retain(|&c| c != child);
        if siblings.len() == before {
            return;
        }
        self.parent.remove(child);
        self.invalidate(parent);
    }

    /// Destroy `id` and its whole subtree, post-order.
    ///
    /// Every destroyed node ends with an empty child list, no parent, no
    /// behavior, and `terminated = true`; arena slots are retained (see
    /// [`Scene::sweep`]). Returns the destroyed ids, post-order, so the
    /// caller can unregister their bus addresses.
    ///
    /// Calling destroy twice on the same node is a programmer error, caught
    /// in debug builds only.
    pub fn destroy(&mut self, id: NodeId) -> Vec<NodeId> {
        debug_assert!(self.nodes.contains_key(id), "destroy: node does not exist");
        debug_assert!(
            !self.nodes.get(id).is_some_and(|node| node.terminated),
            "destroy called twice on the same node"
        );

        if let Some(parent) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.retain(|&c| c != id);
            }
            self.invalidate(parent);
        }

        let mut destroyed = Vec::new();
        self.destroy_subtree(id, &mut destroyed);
        destroyed
    }

    fn destroy_subtree(&mut self, id: NodeId, out: &mut Vec<NodeId>) {
        let kids = self.children.get(id).cloned().unwrap_or_default();
        for child in kids {
            self.parent.remove(child);
            self.destroy_subtree(child, out);
        }
        if let Some(list) = self.children.get_mut(id) {
            list.clear();
        }
        self.behaviors.remove(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.terminated = true;
            node.active = false;
        }
        out.push(id);
    }

    /// Reclaim the arena slots of terminated nodes.
    pub fn sweep(&mut self) {
        let dead: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.terminated)
            .map(|(id, _)| id)
            .collect();
        for id in dead {
            self.nodes.remove(id);
            self.children.remove(id);
            self.parent.remove(id);
            self.behaviors.remove(id);
        }
    }

    // -----------------------------------------------------------------------
    // Z-order
    // -----------------------------------------------------------------------

    /// Move `id` to the end of its parent's list (drawn last, hit-tested
    /// first). No-op for a detached node.
    pub fn bring_to_front(&mut self, id: NodeId) {
        let Some(&parent) = self.parent.get(id) else { return };
        let siblings = self
            .children
            .get_mut(parent)
            .expect("parent must have a children list");
        siblings.retain(|&c| c != id);
        siblings.push(id);
        self.invalidate(parent);
    }

    /// Move `id` to the start of its parent's list (drawn first, hit-tested
    /// last). No-op for a detached node.
    pub fn send_to_back(&mut self, id: NodeId) {
        let Some(&parent) = self.parent.get(id) else { return };
        let siblings = self
            .children
            .get_mut(parent)
            .expect("parent must have a children list");
        siblings.retain(|&c| c != id);
        siblings.insert(0, id);
        self.invalidate(parent);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The parent of `id`, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// The children of `id`, in z-order (back to front). Empty slice if the
    /// node has no children or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(EMPTY_CHILDREN)
    }

    /// Ancestors of `id`, nearest first, ending at the root. Does not
    /// include `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(&p) = self.parent.get(current) {
            result.push(p);
            current = p;
        }
        result
    }

    /// The top-most ancestor of `id` (`id` itself when detached).
    ///
    /// Recomputed by walking `parent` links on every call; cheap enough that
    /// no cache (and no cache invalidation) is needed.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(&p) = self.parent.get(current) {
            current = p;
        }
        current
    }

    /// Whether `maybe_descendant` is inside the subtree of `id` (inclusive).
    pub fn is_descendant(&self, maybe_descendant: NodeId, id: NodeId) -> bool {
        let mut current = maybe_descendant;
        loop {
            if current == id {
                return true;
            }
            match self.parent.get(current) {
                Some(&p) => current = p,
                None => return false,
            }
        }
    }

    /// Immutable access to a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable access to a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Whether the arena still holds a slot for `id`.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the arena (including terminated, unswept slots).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order depth-first traversal from `start`, children in z-order.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the back-most child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Geometry and dirty state
    // -----------------------------------------------------------------------

    /// The absolute rectangle of `id`: its local rectangle translated by the
    /// sum of every ancestor's local origin.
    ///
    /// This is a pure function of the current tree; callers must not cache
    /// the result across mutations.
    pub fn absolute_rect(&self, id: NodeId) -> Rect {
        let Some(node) = self.nodes.get(id) else { return Rect::default() };
        let mut origin = node.rect.origin();
        for ancestor in self.ancestors(id) {
            if let Some(a) = self.nodes.get(ancestor) {
                origin = origin + a.rect.origin();
            }
        }
        node.rect.at(origin)
    }

    /// Mark `id` and every ancestor dirty, up to the root.
    ///
    /// The single invalidation primitive for all geometry, visual, and
    /// content mutations.
    pub fn invalidate(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.dirty = true;
        }
        for ancestor in self.ancestors(id) {
            if let Some(node) = self.nodes.get_mut(ancestor) {
                node.dirty = true;
            }
        }
    }

    /// Set the local position of `id` and invalidate.
    pub fn set_position(&mut self, id: NodeId, position: Point) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        node.rect.x = position.x;
        node.rect.y = position.y;
        self.invalidate(id);
    }

    /// Set the local size of `id` (clamped to 1x1) and invalidate.
    pub fn set_size(&mut self, id: NodeId, width: i32, height: i32) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        node.rect.width = width.max(1);
        node.rect.height = height.max(1);
        self.invalidate(id);
    }

    /// Replace the local rectangle of `id` (extent clamped) and invalidate.
    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        node.rect = Rect::new(rect.x, rect.y, rect.width, rect.height);
        self.invalidate(id);
    }

    // -----------------------------------------------------------------------
    // Behaviors
    // -----------------------------------------------------------------------

    /// Attach a behavior to `id`, replacing any existing one. The node's
    /// `kind` tag is taken from the behavior.
    pub fn set_behavior(&mut self, id: NodeId, behavior: Box<dyn super::behavior::Behavior>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.kind = behavior.kind();
        }
        self.behaviors.insert(id, behavior);
    }

    /// Detach the behavior of `id` for a re-entrant call. The caller must
    /// reinstall it with [`Scene::put_behavior`] if the node still exists.
    pub fn take_behavior(&mut self, id: NodeId) -> Option<Box<dyn super::behavior::Behavior>> {
        self.behaviors.remove(id)
    }

    /// Reinstall a behavior previously taken with [`Scene::take_behavior`].
    pub fn put_behavior(&mut self, id: NodeId, behavior: Box<dyn super::behavior::Behavior>) {
        self.behaviors.insert(id, behavior);
    }

    /// Whether `id` currently has a behavior attached.
    pub fn has_behavior(&self, id: NodeId) -> bool {
        self.behaviors.contains_key(id)
    }

    /// Borrow the behavior of `id`, for inspection.
    pub fn behavior(&self, id: NodeId) -> Option<&dyn super::behavior::Behavior> {
        self.behaviors.get(id).map(|b| b.as_ref())
    }

    /// Mutably borrow the behavior of `id`.
    ///
    /// Host-side configuration only; engine hooks use
    /// [`Scene::take_behavior`] so the behavior can receive the scene.
    pub fn behavior_mut(&mut self, id: NodeId) -> Option<&mut dyn super::behavior::Behavior> {
        self.behaviors.get_mut(id).map(|b| b.as_mut())
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Self-descriptive metadata for `id`, stamped with `ts`.
    pub fn metadata_of(&self, id: NodeId, ts: f64) -> Metadata {
        let (name, kind) = match self.nodes.get(id) {
            Some(node) => (node.name.clone(), node.kind.to_owned()),
            None => ("?".to_owned(), "?".to_owned()),
        };
        Metadata { name, kind, child_count: self.children(id).len(), ts }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
