//! Minimal document model: a node tree with layout rects, hit testing and a
//! document-level pointer listener registry.
//!
//! Listeners are keyed by [`ListenerId`]; removing an id removes exactly the
//! handler that was added under it. [`Subscription`] bundles a set of ids and
//! releases them when dropped.

use log::{debug, trace};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Wrapper,
    ImageContainer,
    Image,
    HandleBar,
    HandleHolder,
}

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the left and top edges are inside, the right
    /// and bottom edges are not.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > x && bottom > y {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    /// Layout rect relative to the parent's origin.
    rect: Rect,
    translate_x: f64,
    clips_children: bool,
    attached: bool,
}

/// Arena of nodes. Children are always appended after their parent, so
/// insertion order is also paint order.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, parent: Option<NodeId>, kind: NodeKind, rect: Rect) -> NodeId {
        let id = NodeId(self.nodes.len());
        let attached = parent.map_or(true, |p| self.is_attached(p));
        self.nodes.push(Node {
            kind,
            parent,
            rect,
            translate_x: 0.0,
            clips_children: false,
            attached,
        });
        trace!("Appended {:?} as {:?} under {:?}", kind, id, parent);
        id
    }

    /// Children of a clipping node are neither painted nor hit outside its rect.
    pub fn set_clips_children(&mut self, id: NodeId, clips: bool) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.clips_children = clips;
        }
    }

    pub fn set_translate_x(&mut self, id: NodeId, offset: f64) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.translate_x = offset;
        }
    }

    pub fn translate_x(&self, id: NodeId) -> f64 {
        self.nodes.get(id.0).map_or(0.0, |n| n.translate_x)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id.0).map(|n| n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).map_or(false, |n| n.attached)
    }

    /// Detaches `id` and its whole subtree. Detached nodes are never hit and
    /// never contain anything.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_attached(id) {
            return;
        }
        let doomed: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.is_descendant_or_self(id, NodeId(i)))
            .collect();
        for i in doomed {
            self.nodes[i].attached = false;
        }
        debug!("Removed subtree rooted at {:?}", id);
    }

    fn is_descendant_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    /// `Node.contains` semantics: true when `node` is `ancestor` itself or
    /// lies anywhere in its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.is_attached(ancestor)
            && self.is_attached(node)
            && self.is_descendant_or_self(ancestor, node)
    }

    /// Rect in document coordinates, including every ancestor's translation.
    pub fn absolute_rect(&self, id: NodeId) -> Rect {
        let Some(node) = self.nodes.get(id.0) else {
            return Rect::default();
        };
        let mut rect = node.rect.translated(node.translate_x, 0.0);
        let mut cursor = node.parent;
        while let Some(parent) = cursor.and_then(|id| self.nodes.get(id.0)) {
            rect = rect.translated(parent.rect.x + parent.translate_x, parent.rect.y);
            cursor = parent.parent;
        }
        rect
    }

    /// Intersection of every clipping ancestor's rect, or `None` if unclipped.
    pub fn clip_rect(&self, id: NodeId) -> Option<Rect> {
        let mut clip: Option<Rect> = None;
        let mut cursor = self.parent(id);
        while let Some(ancestor) = cursor {
            if self.nodes.get(ancestor.0).map_or(false, |n| n.clips_children) {
                let rect = self.absolute_rect(ancestor);
                clip = Some(match clip {
                    Some(c) => c.intersect(&rect).unwrap_or_default(),
                    None => rect,
                });
            }
            cursor = self.parent(ancestor);
        }
        clip
    }

    /// Topmost attached node under the point. Later nodes paint over earlier
    /// ones, so the search runs back to front.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<NodeId> {
        (0..self.nodes.len()).rev().map(NodeId).find(|&id| {
            self.is_attached(id)
                && self.absolute_rect(id).contains(x, y)
                && self.clip_rect(id).map_or(true, |clip| clip.contains(x, y))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
}

/// A pointer event as delivered to document-level listeners. `target` is
/// `None` when the pointer is over no node at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: f64,
    pub y: f64,
    pub target: Option<NodeId>,
}

pub type Listener = Rc<dyn Fn(&PointerEvent, &NodeTree)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(ListenerId, PointerEventKind, Listener)>,
}

impl ListenerRegistry {
    fn add(&mut self, kind: PointerEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, kind, listener));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn handlers_for(&self, kind: PointerEventKind) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| Rc::clone(l))
            .collect()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("next_id", &self.next_id)
            .field("listeners", &self.entries.len())
            .finish()
    }
}

/// Owns a set of registered listeners and removes them on drop.
pub struct Subscription {
    registry: Weak<RefCell<ListenerRegistry>>,
    ids: Vec<ListenerId>,
}

impl Subscription {
    pub fn ids(&self) -> &[ListenerId] {
        &self.ids
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.borrow_mut();
        for id in self.ids.drain(..) {
            registry.remove(id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("ids", &self.ids).finish()
    }
}

#[derive(Debug, Default)]
pub struct Document {
    tree: NodeTree,
    listeners: Rc<RefCell<ListenerRegistry>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn add_event_listener(&self, kind: PointerEventKind, listener: Listener) -> ListenerId {
        self.listeners.borrow_mut().add(kind, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// Registers every listener and returns a guard that removes them again.
    pub fn subscribe(
        &self,
        listeners: impl IntoIterator<Item = (PointerEventKind, Listener)>,
    ) -> Subscription {
        let ids = listeners
            .into_iter()
            .map(|(kind, listener)| self.add_event_listener(kind, listener))
            .collect();
        Subscription {
            registry: Rc::downgrade(&self.listeners),
            ids,
        }
    }

    /// Hit-tests the point, then runs every listener for `kind` in
    /// registration order.
    pub fn dispatch(&self, kind: PointerEventKind, x: f64, y: f64) -> PointerEvent {
        let event = PointerEvent {
            kind,
            x,
            y,
            target: self.tree.hit_test(x, y),
        };
        // Snapshot so handlers never run while the registry is borrowed.
        let handlers = self.listeners.borrow().handlers_for(kind);
        trace!("Dispatching {:?} to {} listener(s)", event, handlers.len());
        for handler in handlers {
            handler(&event, &self.tree);
        }
        event
    }
}
