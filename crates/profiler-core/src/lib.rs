//! profiler-core: capture buffer and filter engine for live profiler sessions
//!
//! Events streamed from an Extended Events session land in a bounded
//! [`RingBuffer`]. A [`FilteredBuffer`] wraps it and answers "which of the
//! held rows are visible?" under three AND-combined filter layers:
//! structured clauses, a free-text quick filter, and per-column filters.
//!
//! ```text
//! XEvent stream → FilteredBuffer::add → RingBuffer (overwrite oldest)
//!                        ↓                  ↓
//!                 incremental patch   Schema / row converter
//!                        ↓                  ↓
//!                 filtered cache  ←  predicate engine
//!                        ↓
//!           filtered_range / filtered_count / distinct_values
//! ```
//!
//! # Modules
//!
//! - `ring_buffer`: fixed-capacity circular storage with pause gating
//! - `filtered_buffer`: filtered view with a lazily rebuilt, incrementally
//!   patched cache
//! - `filter`: operators, clauses, column filters and filter state
//! - `predicate`: evaluation of filter state against a row
//! - `schema`: named field access for row types
//! - `value`: dynamically typed field values and coercions
//! - `event`: the captured profiler event row
//! - `config`: capture settings loaded from TOML
//! - `logging`: `tracing` subscriber setup
//! - `error`: error types and remediation hints
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod filtered_buffer;
pub mod logging;
pub mod predicate;
pub mod ring_buffer;
pub mod schema;
pub mod value;

pub use config::CaptureConfig;
pub use error::{ConfigError, Error, Result};
pub use event::ProfilerEvent;
pub use filter::{ColumnFilter, FilterClause, FilterOperator, FilterRequest, FilterState, TypeHint};
pub use filtered_buffer::{CacheStats, FilteredBuffer};
pub use ring_buffer::RingBuffer;
pub use schema::{DisplayRow, FieldSource, Schema};
pub use value::Value;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
