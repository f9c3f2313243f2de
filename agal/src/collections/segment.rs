use arc_swap::ArcSwap;

use std::sync::Arc;

/// A fixed-size run of atomically replaceable slots.
///
/// Segments are always full: every slot is built
/// holding an element, and elements are only ever
/// swapped in place, never taken out.
pub(super) struct Segment<T> {
    slots: Box<[ArcSwap<T>]>,
}

impl<T> Segment<T> {
    /// Builds a segment holding `elements`, in order.
    pub(super) fn new(elements: Vec<Arc<T>>) -> Segment<T> {
        Segment {
            slots: elements.into_iter().map(ArcSwap::new).collect(),
        }
    }

    /// Returns the element currently at `offset`.
    pub(super) fn get(&self, offset: usize) -> Arc<T> {
        self.slots[offset].load_full()
    }

    /// Places `element` at `offset`, returning the
    /// element it displaced.
    pub(super) fn swap(&self, offset: usize, element: Arc<T>) -> Arc<T> {
        self.slots[offset].swap(element)
    }

    /// Returns a snapshot of every element in slot order.
    pub(super) fn elements(&self) -> Vec<Arc<T>> {
        self.slots.iter().map(ArcSwap::load_full).collect()
    }
}
