//! Criterion benchmarks for filtered ingestion.
//!
//! Measures:
//! - steady-state `add` with a valid cache (incremental patch path)
//! - full cache rebuild after a filter change
//! - distinct-value extraction over a full buffer

use std::hint::black_box;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use profiler_core::{FilterClause, FilterOperator, FilterRequest, FilteredBuffer, ProfilerEvent};

const DATABASES: &[&str] = &["master", "tempdb", "sales", "inventory"];

fn events(n: usize) -> Vec<ProfilerEvent> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            ProfilerEvent::new(
                i as u64,
                if i % 3 == 0 { "rpc_completed" } else { "sql_batch_completed" },
                start + Duration::milliseconds(i as i64),
            )
            .with_database(DATABASES[i % DATABASES.len()])
            .with_duration_us((i % 5_000) as i64)
            .with_text(format!("SELECT * FROM t WHERE id = {i}"))
        })
        .collect()
}

fn slow_query_filter() -> FilterRequest {
    FilterRequest {
        clauses: Some(vec![FilterClause::new(
            "durationUs",
            FilterOperator::GreaterThan,
            2_500,
        )]),
        quick_filter: Some("select".to_string()),
    }
}

fn bench_incremental_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_ingest/add");
    const ROWS: usize = 50_000;
    let rows = events(ROWS);
    group.throughput(Throughput::Elements(ROWS as u64));

    for &capacity in &[1_000usize, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &cap| {
                b.iter(|| {
                    let mut fb =
                        FilteredBuffer::new(cap, Arc::new(ProfilerEvent::schema())).unwrap();
                    fb.apply_filter(slow_query_filter());
                    for row in &rows {
                        black_box(fb.add(row.clone()));
                    }
                    black_box(fb.filtered_count())
                });
            },
        );
    }

    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_ingest/rebuild");

    for &capacity in &[1_000usize, 10_000, 100_000] {
        let mut fb = FilteredBuffer::new(capacity, Arc::new(ProfilerEvent::schema())).unwrap();
        for row in events(capacity) {
            fb.add(row);
        }
        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_function(BenchmarkId::new("rows", capacity), |b| {
            b.iter(|| {
                fb.apply_filter(slow_query_filter());
                black_box(fb.filtered_count())
            });
        });
    }

    group.finish();
}

fn bench_distinct(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_ingest/distinct");
    const ROWS: usize = 10_000;
    let mut fb = FilteredBuffer::new(ROWS, Arc::new(ProfilerEvent::schema())).unwrap();
    for row in events(ROWS) {
        fb.add(row);
    }
    fb.set_row_converter(ProfilerEvent::display_row);

    group.throughput(Throughput::Elements(ROWS as u64));
    group.bench_function("databaseName", |b| {
        b.iter(|| {
            // Force recomputation by bumping the buffer.
            fb.add(events(1).remove(0));
            black_box(fb.distinct_values(&["databaseName"]))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_incremental_add, bench_rebuild, bench_distinct);
criterion_main!(benches);
