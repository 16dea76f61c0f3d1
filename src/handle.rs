//! Drag tracking for one comparator handle.
//!
//! A drag session is a two-state machine driven by [`step`]. The session is
//! fed by document-level listeners that [`ImageComparatorHandle::sync`]
//! acquires once the handle's node is attached, and that are released again
//! whenever the drag state changes, on [`ImageComparatorHandle::unmount`], or
//! when the handle is dropped.

use crate::dom::{
    Document, Listener, NodeId, NodeTree, PointerEvent, PointerEventKind, Subscription,
};
use log::{debug, trace};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Open interval `(start, end)` of legal horizontal positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub start: f64,
    pub end: f64,
}

impl Bounds {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn admits(&self, x: f64) -> bool {
        x > self.start && x < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

impl DragState {
    pub fn is_dragging(self) -> bool {
        self == Self::Dragging
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// `inside` is the result of the containment test against the handle.
    Down { inside: bool },
    Move { x: f64 },
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: DragState,
    pub position: Option<f64>,
}

/// Pure transition function of a drag session.
///
/// A press only starts a drag when it lands inside the handle; a release ends
/// it wherever it happens. Moves update the position only while dragging and
/// only strictly inside `bounds`. Out of range moves leave it where it was.
pub fn step(state: DragState, input: PointerInput, bounds: Bounds) -> Transition {
    let (next, position) = match (state, input) {
        (_, PointerInput::Down { inside: true }) => (DragState::Dragging, None),
        (state, PointerInput::Down { inside: false }) => (state, None),
        (DragState::Dragging, PointerInput::Move { x }) if bounds.admits(x) => {
            (DragState::Dragging, Some(x))
        }
        (state, PointerInput::Move { .. }) => (state, None),
        (_, PointerInput::Up) => (DragState::Idle, None),
    };
    Transition { next, position }
}

#[derive(Debug)]
struct DragSession {
    state: DragState,
    position: f64,
    bounds: Bounds,
}

impl DragSession {
    fn apply(&mut self, input: PointerInput) {
        let transition = step(self.state, input, self.bounds);
        if transition.next.is_dragging() != self.state.is_dragging() {
            debug!("Handle drag state {:?} -> {:?}", self.state, transition.next);
        }
        self.state = transition.next;
        if let Some(x) = transition.position {
            trace!("Handle position {} -> {}", self.position, x);
            self.position = x;
        }
    }
}

/// Slot the handle bar writes its hit-test node into. Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct HandleRef(Rc<Cell<Option<NodeId>>>);

impl HandleRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    pub fn set(&self, node: NodeId) {
        self.0.set(Some(node));
    }

    pub fn clear(&self) {
        self.0.set(None);
    }
}

/// Listener set held by a handle, tagged with the drag state it was
/// acquired under.
#[derive(Debug)]
struct HeldListeners {
    _subscription: Subscription,
    acquired_in: DragState,
}

#[derive(Debug)]
pub struct ImageComparatorHandle {
    session: Rc<RefCell<DragSession>>,
    handle_ref: HandleRef,
    listeners: Option<HeldListeners>,
}

impl Default for ImageComparatorHandle {
    fn default() -> Self {
        Self::new(Bounds::default())
    }
}

impl ImageComparatorHandle {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            session: Rc::new(RefCell::new(DragSession {
                state: DragState::Idle,
                position: bounds.start,
                bounds,
            })),
            handle_ref: HandleRef::new(),
            listeners: None,
        }
    }

    /// Shared slot to hand to the handle bar.
    pub fn handle_ref(&self) -> HandleRef {
        self.handle_ref.clone()
    }

    pub fn position(&self) -> f64 {
        self.session.borrow().position
    }

    pub fn state(&self) -> DragState {
        self.session.borrow().state
    }

    pub fn bounds(&self) -> Bounds {
        self.session.borrow().bounds
    }

    pub fn is_listening(&self) -> bool {
        self.listeners.is_some()
    }

    /// Brings the document listeners in line with the current drag state.
    ///
    /// Listeners acquired under the current state are kept. Otherwise the old
    /// set is released first; a fresh set is only acquired while the handle
    /// ref is attached, so an unattached handle simply retries on the next
    /// call. Returns whether listeners are held afterwards.
    pub fn sync(&mut self, document: &Document) -> bool {
        let state = self.state();
        if let Some(held) = &self.listeners {
            if held.acquired_in == state {
                return true;
            }
        }
        self.listeners = None;

        if self.handle_ref.get().is_none() {
            debug!("Handle ref is not attached, skipping listener setup");
            return false;
        }

        let subscription = document.subscribe(self.listener_set());
        trace!("Acquired listeners {:?} in {:?}", subscription.ids(), state);
        self.listeners = Some(HeldListeners {
            _subscription: subscription,
            acquired_in: state,
        });
        true
    }

    /// Releases every document listener of this handle.
    pub fn unmount(&mut self) {
        if self.listeners.take().is_some() {
            debug!("Released handle listeners");
        }
    }

    fn listener_set(&self) -> [(PointerEventKind, Listener); 3] {
        let down = {
            let session = Rc::clone(&self.session);
            let handle_ref = self.handle_ref.clone();
            Rc::new(move |event: &PointerEvent, tree: &NodeTree| {
                let inside = match (handle_ref.get(), event.target) {
                    (Some(handle), Some(target)) => tree.contains(handle, target),
                    _ => false,
                };
                session.borrow_mut().apply(PointerInput::Down { inside });
            }) as Listener
        };
        let moved = {
            let session = Rc::clone(&self.session);
            Rc::new(move |event: &PointerEvent, _: &NodeTree| {
                session
                    .borrow_mut()
                    .apply(PointerInput::Move { x: event.x });
            }) as Listener
        };
        let up = {
            let session = Rc::clone(&self.session);
            Rc::new(move |_: &PointerEvent, _: &NodeTree| {
                session.borrow_mut().apply(PointerInput::Up);
            }) as Listener
        };
        [
            (PointerEventKind::Down, down),
            (PointerEventKind::Move, moved),
            (PointerEventKind::Up, up),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeKind, Rect};

    const BOUNDS: Bounds = Bounds::new(100.0, 500.0);

    #[test]
    fn press_inside_starts_drag() {
        let t = step(DragState::Idle, PointerInput::Down { inside: true }, BOUNDS);
        assert_eq!(t.next, DragState::Dragging);
        assert_eq!(t.position, None);
    }

    #[test]
    fn press_outside_keeps_state() {
        for state in [DragState::Idle, DragState::Dragging] {
            let t = step(state, PointerInput::Down { inside: false }, BOUNDS);
            assert_eq!(t.next, state);
        }
    }

    #[test]
    fn release_always_idles() {
        for state in [DragState::Idle, DragState::Dragging] {
            assert_eq!(step(state, PointerInput::Up, BOUNDS).next, DragState::Idle);
        }
    }

    fn moved(state: DragState, x: f64) -> Option<f64> {
        step(state, PointerInput::Move { x }, BOUNDS).position
    }

    #[test]
    fn move_only_tracks_inside_open_interval() {
        assert_eq!(moved(DragState::Dragging, 300.0), Some(300.0));
        assert_eq!(moved(DragState::Dragging, 100.0), None);
        assert_eq!(moved(DragState::Dragging, 500.0), None);
        assert_eq!(moved(DragState::Dragging, 50.0), None);
        assert_eq!(moved(DragState::Idle, 300.0), None);
    }

    #[test]
    fn default_bounds_admit_nothing() {
        let bounds = Bounds::default();
        assert!(!bounds.admits(0.0));
        assert!(!bounds.admits(-1.0));
        assert!(!bounds.admits(1.0));
    }

    #[test]
    fn new_handle_starts_idle_at_start() {
        let handle = ImageComparatorHandle::new(BOUNDS);
        assert_eq!(handle.position(), 100.0);
        assert_eq!(handle.state(), DragState::Idle);
        assert!(!handle.is_listening());
    }

    #[test]
    fn sync_skips_without_ref_and_retries_later() {
        let mut document = Document::new();
        let mut handle = ImageComparatorHandle::new(BOUNDS);
        assert!(!handle.sync(&document));
        assert_eq!(document.listener_count(), 0);

        let node = document.tree_mut().append(
            None,
            NodeKind::HandleHolder,
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        handle.handle_ref().set(node);
        assert!(handle.sync(&document));
        assert_eq!(document.listener_count(), 3);
    }

    #[test]
    fn state_change_reacquires_without_duplicates() {
        let mut document = Document::new();
        let node = document.tree_mut().append(
            None,
            NodeKind::HandleHolder,
            Rect::new(90.0, 0.0, 20.0, 20.0),
        );
        let mut handle = ImageComparatorHandle::new(BOUNDS);
        handle.handle_ref().set(node);
        handle.sync(&document);

        document.dispatch(PointerEventKind::Down, 95.0, 5.0);
        assert_eq!(handle.state(), DragState::Dragging);
        assert!(handle.sync(&document));
        assert_eq!(document.listener_count(), 3);

        handle.unmount();
        assert_eq!(document.listener_count(), 0);
    }

    #[test]
    fn dropping_handle_releases_listeners() {
        let mut document = Document::new();
        let node = document.tree_mut().append(
            None,
            NodeKind::HandleHolder,
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        let mut handle = ImageComparatorHandle::new(BOUNDS);
        handle.handle_ref().set(node);
        handle.sync(&document);
        drop(handle);
        assert_eq!(document.listener_count(), 0);
    }
}
