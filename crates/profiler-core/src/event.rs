//! Captured Extended Events rows.
//!
//! [`ProfilerEvent`] is the row type the live profiler streams into a
//! [`FilteredBuffer`](crate::filtered_buffer::FilteredBuffer). Its
//! [`schema`](ProfilerEvent::schema) exposes camelCase field names and the
//! per-event `additional_data` map; [`display_row`](ProfilerEvent::display_row)
//! is the converter used when filters target grid column names instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{DisplayRow, Schema};
use crate::value::{FieldMap, Value};

/// One captured trace event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilerEvent {
    /// Unique identifier assigned by the ingestion source. Never reused.
    pub id: u64,
    /// Ordinal of the event within the session.
    pub event_number: u64,
    /// Event class, e.g. `sql_batch_completed`.
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_time_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_reads: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_data: Option<String>,
    /// Event fields and actions not promoted to a column.
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub additional_data: FieldMap,
}

fn additional_data(event: &ProfilerEvent) -> Option<&FieldMap> {
    Some(&event.additional_data)
}

impl ProfilerEvent {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            event_number: id,
            name: name.into(),
            timestamp,
            database_name: None,
            session_id: None,
            duration_us: None,
            cpu_time_us: None,
            logical_reads: None,
            writes: None,
            text_data: None,
            additional_data: FieldMap::new(),
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database_name = Some(database.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_data = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_duration_us(mut self, duration_us: i64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: i64) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn with_additional(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_data.insert(key.into(), value.into());
        self
    }

    /// Field accessors keyed by the serialized (camelCase) field names.
    #[must_use]
    pub fn schema() -> Schema<Self> {
        Schema::builder()
            .field("id", |e: &Self| Value::from(e.id))
            .field("eventNumber", |e: &Self| Value::from(e.event_number))
            .field("name", |e: &Self| Value::from(e.name.as_str()))
            .field("timestamp", |e: &Self| Value::from(e.timestamp))
            .field("databaseName", |e: &Self| Value::from(e.database_name.clone()))
            .field("sessionId", |e: &Self| Value::from(e.session_id))
            .field("durationUs", |e: &Self| Value::from(e.duration_us))
            .field("cpuTimeUs", |e: &Self| Value::from(e.cpu_time_us))
            .field("logicalReads", |e: &Self| Value::from(e.logical_reads))
            .field("writes", |e: &Self| Value::from(e.writes))
            .field("textData", |e: &Self| Value::from(e.text_data.clone()))
            .extension(additional_data)
            .build()
    }

    /// Grid-facing view: profiler column names, durations in milliseconds
    /// and a `startTime` string in `YYYY-MM-DD HH:MM:SS.fff` form.
    #[must_use]
    pub fn display_row(&self) -> DisplayRow {
        let mut row = DisplayRow::new()
            .with("eventNumber", self.event_number)
            .with("eventClass", self.name.as_str())
            .with(
                "startTime",
                self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            )
            .with("databaseName", self.database_name.clone())
            .with("spid", self.session_id)
            .with("durationMs", self.duration_us.map(|us| us as f64 / 1000.0))
            .with("cpuMs", self.cpu_time_us.map(|us| us as f64 / 1000.0))
            .with("reads", self.logical_reads)
            .with("writes", self.writes)
            .with("textData", self.text_data.clone());
        row.additional_data = self.additional_data.clone();
        row
    }
}
