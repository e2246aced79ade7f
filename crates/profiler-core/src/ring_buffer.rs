//! Fixed-capacity ring buffer holding the most recent captured rows.
//!
//! When the buffer is full, new rows overwrite the oldest. Logical index `i`
//! (0 = oldest) lives in physical slot `(head + i) % capacity`.
//!
//! Every accepted row is also numbered with an arrival sequence. The oldest
//! retained row always has sequence `total_pushed - len`, which lets derived
//! views refer to rows by sequence instead of holding copies of them.
//!
//! The buffer can be paused: while paused, `add` drops incoming rows and
//! leaves the held history untouched.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// RingBuffer
// =============================================================================

/// Outcome of a successful [`RingBuffer::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added<T> {
    /// Arrival sequence assigned to the added row.
    pub sequence: u64,
    /// Row overwritten to make room, if the buffer was full.
    pub evicted: Option<T>,
}

/// A fixed-capacity circular buffer of rows.
///
/// # Example
///
/// ```
/// use profiler_core::ring_buffer::RingBuffer;
///
/// let mut rb = RingBuffer::new(3).unwrap();
/// for i in 1..=5 {
///     rb.add(i);
/// }
/// assert_eq!(rb.get_all_rows(), vec![&3, &4, &5]);
/// ```
pub struct RingBuffer<T> {
    buf: Vec<Option<T>>,
    capacity: usize,
    head: usize, // physical slot of the oldest row
    len: usize,
    total: u64,   // rows ever accepted
    evicted: u64, // rows overwritten on overflow
    cleared: u64, // rows removed by clear/clear_range
    paused: bool,
    indexed_fields: Vec<String>,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the given capacity.
    ///
    /// Fails with [`Error::InvalidCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_indexed_fields(capacity, Vec::new())
    }

    /// Create a ring buffer that records which fields consumers intend to index.
    ///
    /// The field list is retained but not used for lookups yet.
    pub fn with_indexed_fields(capacity: usize, indexed_fields: Vec<String>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || None);
        Ok(Self {
            buf,
            capacity,
            head: 0,
            len: 0,
            total: 0,
            evicted: 0,
            cleared: 0,
            paused: false,
            indexed_fields,
        })
    }

    /// Append a row, overwriting the oldest one when full.
    ///
    /// Returns `None` when the buffer is paused; the row is dropped and the
    /// buffer is not modified.
    pub fn add(&mut self, row: T) -> Option<Added<T>> {
        if self.paused {
            return None;
        }
        let sequence = self.total;
        let evicted = if self.len < self.capacity {
            let slot = (self.head + self.len) % self.capacity;
            self.buf[slot] = Some(row);
            self.len += 1;
            None
        } else {
            let old = self.buf[self.head].replace(row);
            self.head = (self.head + 1) % self.capacity;
            self.evicted += 1;
            old
        };
        self.total += 1;
        Some(Added { sequence, evicted })
    }

    /// Get the row at logical index (0 = oldest).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.buf[(self.head + index) % self.capacity].as_ref()
    }

    /// Get up to `count` rows starting at logical index `start`.
    ///
    /// The range is clamped to the held rows; a `start` past the end yields
    /// an empty vector.
    #[must_use]
    pub fn get_range(&self, start: usize, count: usize) -> Vec<&T> {
        if start >= self.len {
            return Vec::new();
        }
        let end = start.saturating_add(count).min(self.len);
        (start..end).filter_map(|i| self.get(i)).collect()
    }

    /// All rows, oldest first.
    #[must_use]
    pub fn get_all_rows(&self) -> Vec<&T> {
        self.iter().collect()
    }

    /// The `n` most recent rows, newest first.
    #[must_use]
    pub fn get_recent(&self, n: usize) -> Vec<&T> {
        let n = n.min(self.len);
        (0..n).filter_map(|i| self.get(self.len - 1 - i)).collect()
    }

    /// Oldest held row.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Most recently added row.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> RingBufferIter<'_, T> {
        RingBufferIter {
            buf: &self.buf,
            capacity: self.capacity,
            pos: self.head,
            remaining: self.len,
        }
    }

    /// Arrival sequence of the oldest held row (equals `next_sequence` when empty).
    #[must_use]
    pub fn oldest_sequence(&self) -> u64 {
        self.total - self.len as u64
    }

    /// Sequence the next accepted row will receive.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.total
    }

    /// Look up a held row by its arrival sequence.
    #[must_use]
    pub fn get_by_sequence(&self, sequence: u64) -> Option<&T> {
        let oldest = self.oldest_sequence();
        if sequence < oldest || sequence >= self.total {
            return None;
        }
        self.get((sequence - oldest) as usize)
    }

    /// Remove every row. The next add writes to physical slot 0.
    pub fn clear(&mut self) {
        for slot in &mut self.buf {
            *slot = None;
        }
        self.cleared += self.len as u64;
        self.head = 0;
        self.len = 0;
        tracing::debug!(capacity = self.capacity, "ring buffer cleared");
    }

    /// Evict the oldest `count` rows and return how many were removed.
    ///
    /// Callers pass the number of rows they have already observed; rows
    /// appended after that observation sit past the evicted prefix and are
    /// kept. `count` is clamped to the current length.
    pub fn clear_range(&mut self, count: usize) -> usize {
        if count == 0 || self.len == 0 {
            return 0;
        }
        let n = count.min(self.len);
        for i in 0..n {
            self.buf[(self.head + i) % self.capacity] = None;
        }
        self.head = (self.head + n) % self.capacity;
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
        self.cleared += n as u64;
        tracing::debug!(
            requested = count,
            evicted = n,
            remaining = self.len,
            "ring buffer prefix cleared"
        );
        n
    }

    /// Gate ingestion. Held rows are kept while paused.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            tracing::debug!(paused, "ring buffer ingestion gate changed");
        }
        self.paused = paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Field names registered at construction.
    #[must_use]
    pub fn indexed_fields(&self) -> &[String] {
        &self.indexed_fields
    }

    /// Total rows ever accepted (paused drops are not counted).
    #[must_use]
    pub fn total_pushed(&self) -> u64 {
        self.total
    }

    /// Total rows overwritten because the buffer was full.
    #[must_use]
    pub fn total_evicted(&self) -> u64 {
        self.evicted
    }

    /// Get statistics.
    #[must_use]
    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            capacity: self.capacity,
            len: self.len,
            total_pushed: self.total,
            total_evicted: self.evicted,
            total_cleared: self.cleared,
            fill_ratio: self.len as f64 / self.capacity as f64,
            paused: self.paused,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("head", &self.head)
            .field("total_pushed", &self.total)
            .field("paused", &self.paused)
            .finish()
    }
}

// =============================================================================
// RingBufferIter
// =============================================================================

/// Iterator over ring buffer rows (oldest to newest).
pub struct RingBufferIter<'a, T> {
    buf: &'a [Option<T>],
    capacity: usize,
    pos: usize,
    remaining: usize,
}

impl<'a, T> Iterator for RingBufferIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.buf[self.pos].as_ref();
        self.pos = (self.pos + 1) % self.capacity;
        self.remaining -= 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for RingBufferIter<'_, T> {}

// =============================================================================
// RingBufferStats (serializable)
// =============================================================================

/// Serializable statistics about a ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingBufferStats {
    /// Maximum capacity.
    pub capacity: usize,
    /// Current number of rows.
    pub len: usize,
    /// Total rows ever accepted.
    pub total_pushed: u64,
    /// Total rows overwritten on overflow.
    pub total_evicted: u64,
    /// Total rows removed by `clear` or `clear_range`.
    pub total_cleared: u64,
    /// Fill ratio (len / capacity).
    pub fill_ratio: f64,
    /// Whether ingestion is paused.
    pub paused: bool,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, items: impl IntoIterator<Item = i32>) -> RingBuffer<i32> {
        let mut rb = RingBuffer::new(capacity).unwrap();
        for item in items {
            rb.add(item);
        }
        rb
    }

    // -- Construction -----------------------------------------------------------

    #[test]
    fn new_buffer_is_empty() {
        let rb: RingBuffer<i32> = RingBuffer::new(5).unwrap();
        assert!(rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.len(), 0);
        assert_eq!(rb.capacity(), 5);
        assert!(!rb.is_paused());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = RingBuffer::<i32>::new(0).unwrap_err();
        assert!(matches!(err, Error::InvalidCapacity { capacity: 0 }));
    }

    #[test]
    fn indexed_fields_are_retained() {
        let rb: RingBuffer<i32> =
            RingBuffer::with_indexed_fields(4, vec!["name".to_string()]).unwrap();
        assert_eq!(rb.indexed_fields(), ["name".to_string()]);
    }

    // -- Add --------------------------------------------------------------------

    #[test]
    fn add_assigns_sequences() {
        let mut rb = RingBuffer::new(3).unwrap();
        assert_eq!(rb.add(1).unwrap().sequence, 0);
        assert_eq!(rb.add(2).unwrap().sequence, 1);
        assert_eq!(rb.add(3).unwrap().sequence, 2);
        assert!(rb.is_full());
    }

    #[test]
    fn add_overwrites_oldest() {
        let mut rb = filled(3, 1..=3);
        let added = rb.add(4).unwrap();
        assert_eq!(added.evicted, Some(1));
        assert_eq!(added.sequence, 3);
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.total_evicted(), 1);
    }

    #[test]
    fn scenario_capacity_three_keeps_last_three() {
        let mut rb = RingBuffer::new(3).unwrap();
        for name in ["row1", "row2", "row3", "row4", "row5"] {
            rb.add(name.to_string());
        }
        let rows: Vec<&str> = rb.iter().map(String::as_str).collect();
        assert_eq!(rows, vec!["row3", "row4", "row5"]);
    }

    #[test]
    fn paused_add_is_dropped() {
        let mut rb = filled(3, 1..=2);
        rb.set_paused(true);
        assert!(rb.add(3).is_none());
        assert_eq!(rb.get_all_rows(), vec![&1, &2]);
        assert_eq!(rb.total_pushed(), 2);

        rb.set_paused(false);
        assert!(rb.add(3).is_some());
        assert_eq!(rb.get_all_rows(), vec![&1, &2, &3]);
    }

    // -- Access -----------------------------------------------------------------

    #[test]
    fn get_after_wrap() {
        let rb = filled(3, 1..=5);
        assert_eq!(rb.get(0), Some(&3));
        assert_eq!(rb.get(1), Some(&4));
        assert_eq!(rb.get(2), Some(&5));
        assert_eq!(rb.get(3), None);
    }

    #[test]
    fn front_and_back() {
        let mut rb = RingBuffer::new(2).unwrap();
        assert_eq!(rb.front(), None);
        assert_eq!(rb.back(), None);
        rb.add(1);
        rb.add(2);
        rb.add(3);
        assert_eq!(rb.front(), Some(&2));
        assert_eq!(rb.back(), Some(&3));
    }

    #[test]
    fn get_range_is_clamped() {
        let rb = filled(5, 1..=4);
        assert_eq!(rb.get_range(1, 2), vec![&2, &3]);
        assert_eq!(rb.get_range(2, 100), vec![&3, &4]);
        assert!(rb.get_range(4, 1).is_empty());
        assert!(rb.get_range(0, 0).is_empty());
        assert_eq!(rb.get_range(0, usize::MAX).len(), 4);
    }

    #[test]
    fn get_recent_is_newest_first() {
        let rb = filled(3, 1..=5);
        assert_eq!(rb.get_recent(2), vec![&5, &4]);
        assert_eq!(rb.get_recent(10), vec![&5, &4, &3]);
        assert!(rb.get_recent(0).is_empty());
    }

    #[test]
    fn sequences_track_wraparound() {
        let rb = filled(3, 1..=5);
        assert_eq!(rb.oldest_sequence(), 2);
        assert_eq!(rb.next_sequence(), 5);
        assert_eq!(rb.get_by_sequence(2), Some(&3));
        assert_eq!(rb.get_by_sequence(4), Some(&5));
        assert_eq!(rb.get_by_sequence(1), None);
        assert_eq!(rb.get_by_sequence(5), None);
    }

    #[test]
    fn iter_exact_size() {
        let rb = filled(5, 1..=2);
        assert_eq!(rb.iter().len(), 2);
    }

    // -- Clear ------------------------------------------------------------------

    #[test]
    fn clear_resets_to_slot_zero() {
        let mut rb = filled(3, 1..=5);
        rb.clear();
        assert!(rb.is_empty());
        rb.add(10);
        rb.add(20);
        assert_eq!(rb.get_all_rows(), vec![&10, &20]);
        assert_eq!(rb.head, 0);
    }

    #[test]
    fn clear_range_evicts_prefix() {
        let mut rb = filled(5, 1..=5);
        assert_eq!(rb.clear_range(2), 2);
        assert_eq!(rb.get_all_rows(), vec![&3, &4, &5]);
        assert_eq!(rb.oldest_sequence(), 2);
        assert_eq!(rb.get_by_sequence(2), Some(&3));
    }

    #[test]
    fn clear_range_zero_and_empty_are_noops() {
        let mut rb = filled(3, 1..=3);
        assert_eq!(rb.clear_range(0), 0);
        assert_eq!(rb.len(), 3);

        let mut empty: RingBuffer<i32> = RingBuffer::new(3).unwrap();
        assert_eq!(empty.clear_range(5), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn clear_range_all_resets_head() {
        let mut rb = filled(3, 1..=4);
        assert_ne!(rb.head, 0);
        assert_eq!(rb.clear_range(100), 3);
        assert!(rb.get_all_rows().is_empty());
        assert_eq!(rb.head, 0);
    }

    #[test]
    fn clear_range_keeps_rows_added_after_observation() {
        let mut rb = RingBuffer::new(20).unwrap();
        for i in 0..10 {
            rb.add(i);
        }
        let observed = rb.len();
        for i in 10..13 {
            rb.add(i);
        }
        rb.clear_range(observed);
        assert_eq!(rb.get_all_rows(), vec![&10, &11, &12]);
    }

    // -- Stats ------------------------------------------------------------------

    #[test]
    fn stats_track_evictions_and_clears() {
        let mut rb = filled(3, 1..=5);
        rb.clear_range(1);
        let s = rb.stats();
        assert_eq!(s.capacity, 3);
        assert_eq!(s.len, 2);
        assert_eq!(s.total_pushed, 5);
        assert_eq!(s.total_evicted, 2);
        assert_eq!(s.total_cleared, 1);
        assert!(!s.paused);
    }

    #[test]
    fn stats_serialize_to_json() {
        let rb = filled(4, 1..=2);
        let json = serde_json::to_value(rb.stats()).unwrap();
        assert_eq!(json["capacity"], 4);
        assert_eq!(json["len"], 2);
        assert!((json["fill_ratio"].as_f64().unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn debug_format() {
        let rb: RingBuffer<i32> = RingBuffer::new(5).unwrap();
        let s = format!("{rb:?}");
        assert!(s.contains("RingBuffer"));
        assert!(s.contains("capacity"));
    }

    #[test]
    fn capacity_one() {
        let mut rb = RingBuffer::new(1).unwrap();
        assert_eq!(rb.add(1).unwrap().evicted, None);
        assert_eq!(rb.add(2).unwrap().evicted, Some(1));
        assert_eq!(rb.front(), Some(&2));
        assert_eq!(rb.back(), Some(&2));
    }
}
