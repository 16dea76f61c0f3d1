//! Property tests for the drag-tracking unit.
//!
//! Each case mounts a single handle over a 20x20 node at the origin, so a
//! press at (5, 5) lands on the handle and a press at (100, 100) does not.

use image_comparator::dom::{Document, NodeKind, PointerEventKind, Rect};
use image_comparator::{Bounds, DragState, ImageComparatorHandle};
use proptest::prelude::*;

struct Rig {
    document: Document,
    handle: ImageComparatorHandle,
}

impl Rig {
    fn new(bounds: Bounds) -> Self {
        let mut document = Document::new();
        let node = document.tree_mut().append(
            None,
            NodeKind::HandleHolder,
            Rect::new(0.0, 0.0, 20.0, 20.0),
        );
        let mut handle = ImageComparatorHandle::new(bounds);
        handle.handle_ref().set(node);
        handle.sync(&document);
        Self { document, handle }
    }

    fn send(&mut self, kind: PointerEventKind, x: f64, y: f64) {
        self.document.dispatch(kind, x, y);
        self.handle.sync(&self.document);
    }

    fn grab(&mut self) {
        self.send(PointerEventKind::Down, 5.0, 5.0);
    }
}

fn arb_bounds() -> impl Strategy<Value = Bounds> {
    (-1000.0..1000.0_f64, 1.0..1000.0_f64)
        .prop_map(|(start, width)| Bounds::new(start, start + width))
}

/// Bounds together with a coordinate strictly inside them.
fn arb_bounds_and_inside() -> impl Strategy<Value = (Bounds, f64)> {
    (arb_bounds(), 0.001..0.999_f64)
        .prop_map(|(b, frac)| (b, b.start + frac * (b.end - b.start)))
}

/// Bounds together with a coordinate at or beyond one of the edges.
fn arb_bounds_and_outside() -> impl Strategy<Value = (Bounds, f64)> {
    (arb_bounds(), 0.0..500.0_f64, any::<bool>()).prop_map(|(b, past, below)| {
        let x = if below { b.start - past } else { b.end + past };
        (b, x)
    })
}

proptest! {
    /// A grab followed by an in-range move lands exactly on the move.
    #[test]
    fn move_inside_bounds_sets_position((bounds, x) in arb_bounds_and_inside()) {
        let mut rig = Rig::new(bounds);
        prop_assert_eq!(rig.handle.position(), bounds.start);
        rig.grab();
        rig.send(PointerEventKind::Move, x, 300.0);
        prop_assert_eq!(rig.handle.position(), x);
    }

    /// Out of range moves while dragging leave the last position alone.
    #[test]
    fn move_outside_bounds_is_ignored(
        (bounds, inside) in arb_bounds_and_inside(),
        outside in 0.0..500.0_f64,
        below in any::<bool>(),
    ) {
        let x = if below { bounds.start - outside } else { bounds.end + outside };
        let mut rig = Rig::new(bounds);
        rig.grab();
        rig.send(PointerEventKind::Move, inside, 0.0);
        rig.send(PointerEventKind::Move, x, 0.0);
        prop_assert_eq!(rig.handle.position(), inside);
        prop_assert_eq!(rig.handle.state(), DragState::Dragging);
    }

    /// The edges themselves are outside the open interval.
    #[test]
    fn moves_at_or_past_edges_are_excluded((bounds, x) in arb_bounds_and_outside()) {
        let mut rig = Rig::new(bounds);
        rig.grab();
        rig.send(PointerEventKind::Move, x, 0.0);
        prop_assert_eq!(rig.handle.position(), bounds.start);
    }

    /// A press away from the handle never starts a drag.
    #[test]
    fn press_elsewhere_does_not_drag((bounds, x) in arb_bounds_and_inside()) {
        let mut rig = Rig::new(bounds);
        rig.send(PointerEventKind::Down, 100.0, 100.0);
        rig.send(PointerEventKind::Move, x, 0.0);
        prop_assert_eq!(rig.handle.state(), DragState::Idle);
        prop_assert_eq!(rig.handle.position(), bounds.start);
    }

    /// After a release, moves are ignored until the next grab.
    #[test]
    fn release_stops_tracking(
        (bounds, first) in arb_bounds_and_inside(),
        second_frac in 0.001..0.999_f64,
        release_x in -2000.0..2000.0_f64,
    ) {
        let second = bounds.start + second_frac * (bounds.end - bounds.start);
        let mut rig = Rig::new(bounds);
        rig.grab();
        rig.send(PointerEventKind::Move, first, 0.0);
        rig.send(PointerEventKind::Up, release_x, 500.0);
        rig.send(PointerEventKind::Move, second, 0.0);
        prop_assert_eq!(rig.handle.position(), first);

        rig.grab();
        rig.send(PointerEventKind::Move, second, 0.0);
        prop_assert_eq!(rig.handle.position(), second);
    }

    /// Degenerate bounds admit nothing, whatever the pointer does.
    #[test]
    fn degenerate_bounds_never_move(xs in prop::collection::vec(-1000.0..1000.0_f64, 1..20)) {
        let mut rig = Rig::new(Bounds::default());
        rig.grab();
        for x in xs {
            rig.send(PointerEventKind::Move, x, 0.0);
        }
        prop_assert_eq!(rig.handle.position(), 0.0);
    }

    /// Dropping the handle leaves no listener behind.
    #[test]
    fn teardown_removes_listeners(grabbed in any::<bool>()) {
        let mut rig = Rig::new(Bounds::new(0.0, 100.0));
        if grabbed {
            rig.grab();
        }
        prop_assert_eq!(rig.document.listener_count(), 3);
        let Rig { document, handle } = rig;
        drop(handle);
        prop_assert_eq!(document.listener_count(), 0);
    }
}
