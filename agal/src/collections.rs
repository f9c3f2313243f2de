//! Concurrent containers for holding population members.
mod segment;
mod segmented;
mod tail;

pub use segmented::{ListConfig, SegmentedList, DEFAULT_SEGMENT_SIZE};
