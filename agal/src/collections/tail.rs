use arc_swap::ArcSwap;

use std::collections::VecDeque;
use std::sync::Arc;

type Queue<T> = VecDeque<Arc<T>>;

/// The overflow buffer of a [`SegmentedList`].
///
/// The _base_ end holds the elements next in line to
/// become a segment; the _tip_ end absorbs displaced
/// and appended elements.
///
/// The queue is copy-on-write: readers load a snapshot,
/// and every update builds a new queue and installs it
/// with a compare-and-swap, retrying if another thread
/// got there first. No operation ever blocks. Updates
/// copy the whole queue, which stays short because the
/// list keeps segmenting it.
///
/// [`SegmentedList`]: super::SegmentedList
pub(super) struct Tail<T> {
    queue: ArcSwap<Queue<T>>,
}

impl<T> Tail<T> {
    pub(super) fn new() -> Tail<T> {
        Tail {
            queue: ArcSwap::from_pointee(VecDeque::new()),
        }
    }

    /// Returns the length of the latest snapshot.
    pub(super) fn len(&self) -> usize {
        self.queue.load().len()
    }

    /// Applies `update` to a copy of the queue and installs
    /// the copy, retrying against concurrent updates. Returns
    /// what the successful application of `update` returned.
    fn update<R>(&self, mut update: impl FnMut(&mut Queue<T>) -> R) -> R {
        let mut current = self.queue.load_full();
        loop {
            let mut next = Queue::clone(&current);
            let result = update(&mut next);
            let previous = self.queue.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return result;
            }
            current = Arc::clone(&*previous);
        }
    }

    pub(super) fn push_tip(&self, element: Arc<T>) {
        self.update(|queue| queue.push_back(Arc::clone(&element)));
    }

    /// Inserts `element` `offset` places from the base,
    /// or at the tip if the tail is shorter than that.
    pub(super) fn insert(&self, offset: usize, element: Arc<T>) {
        self.update(|queue| {
            let element = Arc::clone(&element);
            if offset < queue.len() {
                queue.insert(offset, element);
            } else {
                queue.push_back(element);
            }
        });
    }

    pub(super) fn pop_tip(&self) -> Option<Arc<T>> {
        if self.queue.load().is_empty() {
            return None;
        }
        self.update(VecDeque::pop_back)
    }

    pub(super) fn pop_base(&self) -> Option<Arc<T>> {
        if self.queue.load().is_empty() {
            return None;
        }
        self.update(VecDeque::pop_front)
    }

    /// Removes the element `offset` places from the base.
    /// Falls back to the base element if the tail has
    /// shrunk past `offset` in the meantime.
    pub(super) fn remove(&self, offset: usize) -> Option<Arc<T>> {
        if self.queue.load().is_empty() {
            return None;
        }
        self.update(|queue| queue.remove(offset).or_else(|| queue.pop_front()))
    }

    /// Returns the element `offset` places from the base,
    /// falling back to the base element itself.
    pub(super) fn get(&self, offset: usize) -> Option<Arc<T>> {
        let queue = self.queue.load();
        queue.get(offset).or_else(|| queue.front()).cloned()
    }

    /// Removes exactly `count` elements from the base, in
    /// base-to-tip order. Takes nothing if fewer are queued.
    pub(super) fn take_base(&self, count: usize) -> Option<Vec<Arc<T>>> {
        if self.len() < count {
            return None;
        }
        self.update(|queue| {
            if queue.len() < count {
                None
            } else {
                Some(queue.drain(..count).collect())
            }
        })
    }

    /// Places `elements` before the base, keeping their order,
    /// so that the first of them becomes the new base.
    pub(super) fn extend_base(&self, elements: Vec<Arc<T>>) {
        self.update(|queue| {
            for element in elements.iter().rev() {
                queue.push_front(Arc::clone(element));
            }
        });
    }

    pub(super) fn clear(&self) {
        self.queue.store(Arc::new(VecDeque::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Barrier;
    use std::thread;

    fn tail_of(values: &[u32]) -> Tail<u32> {
        let tail = Tail::new();
        for v in values {
            tail.push_tip(Arc::new(*v));
        }
        tail
    }

    fn contents(tail: &Tail<u32>) -> Vec<u32> {
        tail.queue.load().iter().map(|e| **e).collect()
    }

    #[test]
    fn take_base_is_all_or_nothing() {
        let tail = tail_of(&[1, 2, 3]);

        assert!(tail.take_base(4).is_none());
        assert_eq!(tail.len(), 3);

        let taken = tail.take_base(2).unwrap();
        assert_eq!(taken.iter().map(|e| **e).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(contents(&tail), [3]);
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn extend_base_preserves_order() {
        let tail = tail_of(&[4, 5]);
        tail.extend_base(vec![Arc::new(1), Arc::new(2), Arc::new(3)]);

        assert_eq!(contents(&tail), [1, 2, 3, 4, 5]);
        assert_eq!(tail.len(), 5);
    }

    #[test]
    fn offsets_fall_back_to_base() {
        let tail = tail_of(&[7, 8, 9]);

        assert_eq!(tail.get(1).map(|e| *e), Some(8));
        assert_eq!(tail.get(10).map(|e| *e), Some(7));
        assert_eq!(tail.remove(10).map(|e| *e), Some(7));
        assert_eq!(contents(&tail), [8, 9]);
    }

    #[test]
    fn empty_tail_yields_nothing() {
        let tail = Tail::<u32>::new();

        assert!(tail.pop_tip().is_none());
        assert!(tail.pop_base().is_none());
        assert!(tail.remove(0).is_none());
        assert!(tail.get(0).is_none());
        assert_eq!(tail.len(), 0);
    }

    #[test]
    fn concurrent_updates_lose_nothing() {
        const THREADS: u32 = 4;
        const PER_THREAD: u32 = 500;
        let tail = Tail::new();
        let barrier = Barrier::new(THREADS as usize);

        thread::scope(|s| {
            for t in 0..THREADS {
                let tail = &tail;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..PER_THREAD {
                        tail.push_tip(Arc::new(t * PER_THREAD + i));
                    }
                });
            }
        });
        assert_eq!(tail.len(), (THREADS * PER_THREAD) as usize);

        let popped: Vec<Vec<u32>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let tail = &tail;
                    s.spawn(move || {
                        let mut popped = vec![];
                        loop {
                            let element = if t % 2 == 0 {
                                tail.pop_tip()
                            } else {
                                tail.pop_base()
                            };
                            match element {
                                Some(e) => popped.push(*e),
                                None => break popped,
                            }
                        }
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut popped: Vec<u32> = popped.into_iter().flatten().collect();
        popped.sort_unstable();
        assert_eq!(popped, (0..THREADS * PER_THREAD).collect::<Vec<_>>());
        assert_eq!(tail.len(), 0);
    }
}
