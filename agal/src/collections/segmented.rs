use super::{segment::Segment, tail::Tail};
use crate::errors::ConfigError;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Segment size used when none is specified.
pub const DEFAULT_SEGMENT_SIZE: usize = 19;

/// Tail length, in segments, past which the tail is segmented.
const SEGMENTATION_FACTOR: f64 = 3.5;
/// Tail length, in segments, at or below which a segment
/// is returned to the tail.
const DESEGMENTATION_FACTOR: f64 = 0.5;

/// Configuration data for a [`SegmentedList`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Whether out-of-bounds reads and removals
    /// _snap_ to the last element instead of
    /// returning nothing.
    pub snap: bool,
    /// Number of elements held by each segment.
    /// It is wise to choose a size that, for the
    /// expected length of the list, yields more
    /// segments than accessing threads.
    pub segment_size: usize,
}

impl Default for ListConfig {
    fn default() -> ListConfig {
        ListConfig {
            snap: false,
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }
}

/// A concurrent random-access list with constant
/// expected-time `get`, `insert` and `remove`.
///
/// Elements live in fixed-size, always-full _segments_
/// followed by a variable-length _tail_. Writes to a segment
/// are single atomic slot swaps, so threads touching
/// different slots never contend. Inserting into a segment
/// displaces the previous occupant onto the tail; removing
/// from one backfills the hole from the tail. The tail turns
/// itself into a new segment once it grows past 3.5 segments'
/// worth of elements, and reabsorbs the newest segment once it
/// shrinks to half a segment. Restructuring is guarded by a
/// try-lock: a thread that finds it taken carries on, leaving
/// the work to a later call.
///
/// The price is ordering. Any element may move to another
/// index at any time, and under contention `get` and `remove`
/// may spuriously come back empty. Applications that only
/// want random access, such as a randomly ordered population
/// pool, are unaffected.
///
/// # Soft indices
/// Since the length is in constant flux, indices past the end
/// are not errors. If the list [snaps], they resolve to the last
/// element; otherwise they yield `None`. Insertions past the end
/// always append.
///
/// [snaps]: ListConfig::snap
///
/// # Examples
/// ```
/// use agal::collections::{ListConfig, SegmentedList};
///
/// let list = SegmentedList::new(ListConfig {
///     snap: false,
///     segment_size: 4,
/// })
/// .unwrap();
///
/// for i in 0..8 {
///     list.insert(0, i);
/// }
/// assert_eq!(list.size(), 8);
/// assert!((0..8).all(|i| list.get(i).is_some()));
///
/// assert!(list.remove(3).is_some());
/// assert_eq!(list.size(), 7);
/// ```
pub struct SegmentedList<T> {
    segments: ArcSwap<Vec<Arc<Segment<T>>>>,
    tail: Tail<T>,
    len: AtomicUsize,
    restructuring: Mutex<()>,
    snap: bool,
    segment_size: usize,
    segmentation_threshold: usize,
    desegmentation_threshold: usize,
}

impl<T> SegmentedList<T> {
    /// Creates an empty list using the passed configuration.
    ///
    /// # Errors
    /// Returns an error if the segment size is zero.
    pub fn new(config: ListConfig) -> Result<SegmentedList<T>, ConfigError> {
        if config.segment_size == 0 {
            return Err(ConfigError::ZeroSegmentSize);
        }
        Ok(SegmentedList::build(config.snap, config.segment_size))
    }

    /// Creates an empty list with the [default segment size].
    ///
    /// [default segment size]: DEFAULT_SEGMENT_SIZE
    pub fn with_snap(snap: bool) -> SegmentedList<T> {
        SegmentedList::build(snap, DEFAULT_SEGMENT_SIZE)
    }

    fn build(snap: bool, segment_size: usize) -> SegmentedList<T> {
        SegmentedList {
            segments: ArcSwap::from_pointee(Vec::new()),
            tail: Tail::new(),
            len: AtomicUsize::new(0),
            restructuring: Mutex::new(()),
            snap,
            segment_size,
            segmentation_threshold: (segment_size as f64 * SEGMENTATION_FACTOR) as usize,
            desegmentation_threshold: (segment_size as f64 * DESEGMENTATION_FACTOR) as usize,
        }
    }

    /// Returns the element at `index`, or `None` if the list
    /// is empty or the index could not be resolved.
    ///
    /// # Examples
    /// ```
    /// use agal::collections::SegmentedList;
    ///
    /// let list = SegmentedList::with_snap(true);
    /// list.add("a");
    /// list.add("b");
    ///
    /// assert_eq!(list.get(0).as_deref(), Some(&"a"));
    /// // Snapping lists resolve stale indices to the last element.
    /// assert_eq!(list.get(10).as_deref(), Some(&"b"));
    /// ```
    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        let index = self.resolve(index)?;
        let segments = self.segments.load();
        match segments.get(index / self.segment_size) {
            Some(segment) => Some(segment.get(index % self.segment_size)),
            None => self
                .tail
                .get(index.saturating_sub(segments.len() * self.segment_size)),
        }
    }

    /// Inserts `element` at `index`. If the index lies in a
    /// segment, the element it replaces is moved to the tail.
    /// Indices past the end append to the list.
    pub fn insert(&self, index: usize, element: T) {
        let element = Arc::new(element);
        {
            let segments = self.segments.load();
            match segments.get(index / self.segment_size) {
                // A segment concurrently returned to the tail may
                // swallow this write; size accounting is best-effort
                // under that race.
                Some(segment) => {
                    let displaced = segment.swap(index % self.segment_size, element);
                    self.tail.push_tip(displaced);
                }
                None => self.tail.insert(
                    index.saturating_sub(segments.len() * self.segment_size),
                    element,
                ),
            }
        }
        self.len.fetch_add(1, Ordering::AcqRel);
        self.rebalance();
    }

    /// Appends `element` to the end of the list.
    pub fn add(&self, element: T) {
        self.tail.push_tip(Arc::new(element));
        self.len.fetch_add(1, Ordering::AcqRel);
        self.rebalance();
    }

    /// Removes and returns the element at `index`. The vacated
    /// slot is refilled from the tail, so the list stays dense.
    ///
    /// Returns `None` if the list is empty, the index could not
    /// be resolved, or no element was available to backfill.
    ///
    /// # Examples
    /// ```
    /// use agal::collections::SegmentedList;
    ///
    /// let list = SegmentedList::with_snap(false);
    /// list.add(1);
    ///
    /// assert_eq!(list.remove(0).as_deref(), Some(&1));
    /// assert!(list.remove(0).is_none());
    /// ```
    pub fn remove(&self, index: usize) -> Option<Arc<T>> {
        let index = self.resolve(index)?;
        let removed = {
            let segments = self.segments.load();
            match segments.get(index / self.segment_size) {
                Some(segment) => self
                    .tail
                    .pop_tip()
                    .or_else(|| self.tail.pop_base())
                    .map(|backfill| segment.swap(index % self.segment_size, backfill)),
                None => self
                    .tail
                    .remove(index.saturating_sub(segments.len() * self.segment_size)),
            }
        };
        if removed.is_some() {
            // Saturating: a concurrent `clear` may already have zeroed the count.
            let _ = self
                .len
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| len.checked_sub(1));
        }
        self.rebalance();
        removed
    }

    /// Returns the number of elements in the list.
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Removes all elements from the list.
    pub fn clear(&self) {
        let _guard = self.restructuring.lock();
        self.segments.store(Arc::new(Vec::new()));
        self.tail.clear();
        self.len.store(0, Ordering::Release);
    }

    /// Returns the number of full segments currently held.
    pub fn segment_count(&self) -> usize {
        self.segments.load().len()
    }

    /// Returns the configured segment size.
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Returns whether out-of-bounds indices snap to the last element.
    pub fn is_snapping(&self) -> bool {
        self.snap
    }

    /// Maps a requested index onto the current bounds.
    fn resolve(&self, index: usize) -> Option<usize> {
        let len = self.size();
        if len == 0 {
            None
        } else if index < len {
            Some(index)
        } else if self.snap {
            Some(len - 1)
        } else {
            None
        }
    }

    /// Segments or desegments the tail if its length
    /// has crossed either threshold.
    fn rebalance(&self) {
        let tail_len = self.tail.len();
        if tail_len > self.segmentation_threshold {
            self.segment();
        } else if tail_len <= self.desegmentation_threshold && self.segment_count() > 0 {
            self.desegment();
        }
    }

    /// Moves one segment's worth of elements from the
    /// tail's base into a new segment.
    fn segment(&self) {
        // Whoever holds the lock will notice the same
        // condition we did.
        let Some(_guard) = self.restructuring.try_lock() else {
            return;
        };
        if let Some(elements) = self.tail.take_base(self.segment_size) {
            let mut segments = Vec::clone(&self.segments.load());
            segments.push(Arc::new(Segment::new(elements)));
            let count = segments.len();
            self.segments.store(Arc::new(segments));
            tracing::trace!(segments = count, "segmented list tail");
        }
    }

    /// Returns the newest segment's elements to the tail's base.
    fn desegment(&self) {
        let Some(_guard) = self.restructuring.try_lock() else {
            return;
        };
        let segments = self.segments.load_full();
        if let Some((newest, rest)) = segments.split_last() {
            self.segments.store(Arc::new(rest.to_vec()));
            self.tail.extend_base(newest.elements());
            tracing::trace!(segments = rest.len(), "desegmented list tail");
        }
    }
}

impl<T> Default for SegmentedList<T> {
    fn default() -> SegmentedList<T> {
        SegmentedList::with_snap(false)
    }
}

impl<T> fmt::Debug for SegmentedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedList")
            .field("len", &self.size())
            .field("segments", &self.segment_count())
            .field("tail_len", &self.tail.len())
            .field("snap", &self.snap)
            .field("segment_size", &self.segment_size)
            .finish()
    }
}
