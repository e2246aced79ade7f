//! Filtered view over a [`RingBuffer`] of captured rows.
//!
//! The view keeps a cache of the rows that pass the current [`FilterState`].
//! The cache is a two-state machine:
//!
//! - `Valid(sequences)`: arrival sequences of matching rows, oldest first.
//! - `Invalid`: must be rebuilt by a full scan before the next read.
//!
//! Filter changes, `clear`, `clear_range` and converter changes move the
//! cache to `Invalid`. Streaming ingestion patches a valid cache in O(1):
//! the new row alone is evaluated and appended if it matches, and when the
//! append overwrote the oldest row, that row's sequence is popped from the
//! front if present. A valid cache always equals what a full scan over the
//! buffer would produce.
//!
//! Reads that may rebuild take `&mut self`; [`FilteredBuffer::matches`] only
//! evaluates and never touches the cache.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::config::CaptureConfig;
use crate::error::Result;
use crate::filter::{ColumnFilter, FilterClause, FilterRequest, FilterState};
use crate::predicate::evaluate_row;
use crate::ring_buffer::{Added, RingBuffer};
use crate::schema::{DisplayRow, FieldSource, Schema};

/// Maps a stored row to the display form filters are evaluated against.
pub type RowConverter<T> = Box<dyn Fn(&T) -> DisplayRow + Send + Sync>;

enum CacheState {
    Valid(VecDeque<u64>),
    Invalid,
}

struct DistinctEntry {
    generation: u64,
    values: Vec<String>,
}

/// Counters describing how the filtered cache has been maintained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Full scans performed.
    pub rebuilds: u64,
    /// Matching rows appended without a scan.
    pub incremental_appends: u64,
    /// Overwritten rows popped from the cache front.
    pub incremental_evictions: u64,
    /// Transitions from valid to invalid.
    pub invalidations: u64,
}

/// A ring buffer plus a lazily maintained filtered view over it.
pub struct FilteredBuffer<T> {
    buffer: RingBuffer<T>,
    schema: Arc<Schema<T>>,
    converter: Option<RowConverter<T>>,
    filter: FilterState,
    cache: CacheState,
    /// Bumped on every structural change to the buffer.
    generation: u64,
    /// Keyed by the candidate field list, in call order.
    distinct: HashMap<Vec<String>, DistinctEntry>,
    stats: CacheStats,
}

impl<T> FilteredBuffer<T> {
    /// Create a view over a new buffer of `capacity` rows.
    pub fn new(capacity: usize, schema: Arc<Schema<T>>) -> Result<Self> {
        Ok(Self::from_buffer(RingBuffer::new(capacity)?, schema))
    }

    /// Wrap an existing buffer.
    #[must_use]
    pub fn from_buffer(buffer: RingBuffer<T>, schema: Arc<Schema<T>>) -> Self {
        Self {
            buffer,
            schema,
            converter: None,
            filter: FilterState::default(),
            cache: CacheState::Invalid,
            generation: 0,
            distinct: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Build from validated capture settings.
    pub fn from_config(config: &CaptureConfig, schema: Arc<Schema<T>>) -> Result<Self> {
        config.validate()?;
        let mut buffer =
            RingBuffer::with_indexed_fields(config.capacity, config.indexed_fields.clone())?;
        buffer.set_paused(config.start_paused);
        tracing::debug!(
            capacity = config.capacity,
            paused = config.start_paused,
            "filtered buffer created"
        );
        Ok(Self::from_buffer(buffer, schema))
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Append a row and patch the cache if it is valid.
    ///
    /// Returns `None` when ingestion is paused.
    pub fn add(&mut self, row: T) -> Option<Added<T>> {
        if self.buffer.is_paused() {
            return None;
        }
        let evicting = self
            .buffer
            .is_full()
            .then(|| self.buffer.oldest_sequence());
        let matched = matches!(self.cache, CacheState::Valid(_)) && self.matches(&row);

        let added = self.buffer.add(row)?;
        self.generation += 1;

        if let CacheState::Valid(entries) = &mut self.cache {
            if let Some(evicted) = evicting {
                if entries.front() == Some(&evicted) {
                    entries.pop_front();
                    self.stats.incremental_evictions += 1;
                }
            }
            if matched {
                entries.push_back(added.sequence);
                self.stats.incremental_appends += 1;
            }
        }
        Some(added)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.buffer.set_paused(paused);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.buffer.is_paused()
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.generation += 1;
        self.invalidate("clear");
    }

    /// Remove the `count` oldest rows, keeping anything added after the
    /// caller observed `count`. Returns how many rows were removed.
    pub fn clear_range(&mut self, count: usize) -> usize {
        let removed = self.buffer.clear_range(count);
        if removed > 0 {
            self.generation += 1;
            self.invalidate("clear_range");
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Filter mutation
    // -------------------------------------------------------------------------

    /// Replace the clause list. An empty list turns clause filtering off.
    pub fn set_filter(&mut self, clauses: Vec<FilterClause>) {
        tracing::debug!(clauses = clauses.len(), "filter clauses replaced");
        self.filter.set_clauses(clauses);
        self.invalidate("set_filter");
    }

    /// Turn off clause filtering and the quick filter. Column filters stay.
    pub fn clear_filter(&mut self) {
        self.filter.clauses.clear();
        self.filter.clauses_enabled = false;
        self.filter.quick_filter = None;
        self.invalidate("clear_filter");
    }

    /// Set the free-text search term. A blank term clears it.
    pub fn set_quick_filter(&mut self, term: impl Into<String>) {
        self.filter.set_quick_filter(Some(term.into()));
        self.invalidate("set_quick_filter");
    }

    pub fn set_column_filter(&mut self, field: impl Into<String>, criteria: ColumnFilter) {
        let field = field.into();
        tracing::debug!(field = %field, "column filter set");
        self.filter.column_filters.insert(field, criteria);
        self.invalidate("set_column_filter");
    }

    pub fn clear_column_filter(&mut self, field: &str) {
        if self.filter.column_filters.remove(field).is_some() {
            self.invalidate("clear_column_filter");
        }
    }

    /// Clear the quick filter and every column filter. The clause list is kept.
    pub fn clear_all_filters(&mut self) {
        self.filter.quick_filter = None;
        self.filter.column_filters.clear();
        self.invalidate("clear_all_filters");
    }

    /// Drop all filter state; every row becomes visible.
    pub fn reset_filter(&mut self) {
        self.filter.clear();
        self.invalidate("reset_filter");
    }

    /// Replace the provided parts of the filter and rebuild the cache now.
    pub fn apply_filter(&mut self, request: FilterRequest) {
        if let Some(clauses) = request.clauses {
            self.filter.set_clauses(clauses);
        }
        if let Some(term) = request.quick_filter {
            self.filter.set_quick_filter(Some(term));
        }
        self.invalidate("apply_filter");
        self.rebuild_cache();
    }

    /// Evaluate filters against `converter(row)` instead of the schema.
    pub fn set_row_converter<F>(&mut self, converter: F)
    where
        F: Fn(&T) -> DisplayRow + Send + Sync + 'static,
    {
        self.converter = Some(Box::new(converter));
        self.distinct.clear();
        self.invalidate("set_row_converter");
    }

    pub fn clear_row_converter(&mut self) {
        if self.converter.take().is_some() {
            self.distinct.clear();
            self.invalidate("clear_row_converter");
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn is_filter_active(&self) -> bool {
        self.filter.is_active()
    }

    #[must_use]
    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    /// Whether the current filter state would let `row` through.
    #[must_use]
    pub fn matches(&self, row: &T) -> bool {
        match &self.converter {
            Some(convert) => evaluate_row(&convert(row), &self.filter),
            None => evaluate_row(&self.schema.view(row), &self.filter),
        }
    }

    /// Visible rows, oldest first.
    pub fn filtered_rows(&mut self) -> Vec<&T> {
        self.filtered_range(0, usize::MAX)
    }

    /// A page of visible rows, clamped to what exists.
    pub fn filtered_range(&mut self, start: usize, count: usize) -> Vec<&T> {
        if !self.filter.is_active() {
            return self.buffer.get_range(start, count);
        }
        self.ensure_cache();
        let CacheState::Valid(entries) = &self.cache else {
            return Vec::new();
        };
        if start >= entries.len() {
            return Vec::new();
        }
        let end = start.saturating_add(count).min(entries.len());
        entries
            .range(start..end)
            .filter_map(|&seq| self.buffer.get_by_sequence(seq))
            .collect()
    }

    /// Number of visible rows.
    pub fn filtered_count(&mut self) -> usize {
        if !self.filter.is_active() {
            return self.buffer.len();
        }
        self.ensure_cache();
        match &self.cache {
            CacheState::Valid(entries) => entries.len(),
            CacheState::Invalid => 0,
        }
    }

    /// Number of held rows, ignoring filters.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.buffer.len()
    }

    /// Distinct non-empty values across all held rows, sorted ignoring case.
    ///
    /// For each row the candidate names are tried in order and the first
    /// non-empty value is taken, so alternative spellings of one column can
    /// be merged. Results are cached until the buffer changes.
    pub fn distinct_values(&mut self, fields: &[&str]) -> Vec<String> {
        let key: Vec<String> = fields.iter().map(|f| (*f).to_string()).collect();
        if let Some(entry) = self.distinct.get(&key) {
            if entry.generation == self.generation {
                return entry.values.clone();
            }
        }

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for row in self.buffer.iter() {
            let found = match &self.converter {
                Some(convert) => first_non_empty(&convert(row), fields),
                None => first_non_empty(&self.schema.view(row), fields),
            };
            if let Some(value) = found {
                if seen.insert(value.clone()) {
                    values.push(value);
                }
            }
        }
        values.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });

        self.distinct.insert(
            key,
            DistinctEntry {
                generation: self.generation,
                values: values.clone(),
            },
        );
        values
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &RingBuffer<T> {
        &self.buffer
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema<T>> {
        &self.schema
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    /// Whether the filtered cache is currently valid.
    #[must_use]
    pub fn is_cache_valid(&self) -> bool {
        matches!(self.cache, CacheState::Valid(_))
    }

    // -------------------------------------------------------------------------
    // Cache maintenance
    // -------------------------------------------------------------------------

    fn invalidate(&mut self, reason: &'static str) {
        if matches!(self.cache, CacheState::Valid(_)) {
            self.stats.invalidations += 1;
            tracing::trace!(reason, "filtered cache invalidated");
        }
        self.cache = CacheState::Invalid;
    }

    fn ensure_cache(&mut self) {
        if matches!(self.cache, CacheState::Invalid) {
            self.rebuild_cache();
        }
    }

    fn rebuild_cache(&mut self) {
        let oldest = self.buffer.oldest_sequence();
        let entries: VecDeque<u64> = self
            .buffer
            .iter()
            .enumerate()
            .filter(|(_, row)| self.matches(row))
            .map(|(i, _)| oldest + i as u64)
            .collect();
        self.stats.rebuilds += 1;
        tracing::debug!(
            scanned = self.buffer.len(),
            matched = entries.len(),
            "filtered cache rebuilt"
        );
        self.cache = CacheState::Valid(entries);
    }
}

fn first_non_empty<S: FieldSource + ?Sized>(source: &S, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|name| {
        let value = source.field(name)?;
        let text = value.to_string();
        (!value.is_null() && !text.is_empty()).then_some(text)
    })
}

impl<T> fmt::Debug for FilteredBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredBuffer")
            .field("len", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .field("filter_active", &self.filter.is_active())
            .field("cache_valid", &self.is_cache_valid())
            .field("converter", &self.converter.is_some())
            .finish()
    }
}
