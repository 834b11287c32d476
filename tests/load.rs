//! Tests for the load executor.

use std::sync::Mutex;
use yearload::dataset::DatasetType;
use yearload::error::{IngestError, SinkResult};
use yearload::io::csv::{ChunkedReader, RawBatch, RowRecord};
use yearload::load::LoadExecutor;
use yearload::metrics::MetricsCollector;
use yearload::progress::{NoProgress, RecordingProgress};
use yearload::projection::{RawRow, ResolvedRow};
use yearload::provision::provision;
use yearload::router::YearSet;
use yearload::schema::ColumnSpec;
use yearload::sink::{DataSink, MemorySink};
use yearload::testing::CsvFixture;

/// Records every append call before delegating.
#[derive(Default)]
struct CallLog {
    inner: MemorySink,
    appends: Mutex<Vec<(String, usize)>>,
}

impl DataSink for CallLog {
    fn create_or_replace_table(&self, table: &str, columns: &[ColumnSpec]) -> SinkResult<()> {
        self.inner.create_or_replace_table(table, columns)
    }

    fn append_rows(&self, table: &str, columns: &[ColumnSpec], rows: &[ResolvedRow]) -> SinkResult<u64> {
        self.appends.lock().unwrap().push((table.to_string(), rows.len()));
        self.inner.append_rows(table, columns, rows)
    }

    fn count_rows(&self, table: &str) -> SinkResult<u64> {
        self.inner.count_rows(table)
    }
}

fn mixed_source() -> String {
    // batch size 2 => [2022, 2022] [2023, 2021] [2022]
    CsvFixture::new(DatasetType::Crashes)
        .row("01/10/2022")
        .row("02/11/2022")
        .row("2023-05-05")
        .row("2021-12-31")
        .row("2022-12-31")
        .to_csv_string()
        .unwrap()
}

#[test]
fn load_routes_and_counts() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2022, 2023])?;
    let schema = DatasetType::Crashes.schema();
    provision(DatasetType::Crashes, &years, schema, &sink)?;

    let source = mixed_source();
    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years);
    let mut progress = RecordingProgress::default();
    let summary = executor.load(ChunkedReader::new(source.as_bytes(), 2)?, &sink, &mut progress)?;

    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.rows_for(DatasetType::Crashes, 2022), 3);
    assert_eq!(summary.rows_for(DatasetType::Crashes, 2023), 1);
    assert_eq!(summary.out_of_range, 1);
    assert_eq!(summary.malformed, 0);
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.rows_seen(), 5);
    assert_eq!(sink.count_rows("MVC_C_2022")?, 3);
    assert_eq!(sink.count_rows("MVC_C_2023")?, 1);

    let totals: Vec<u64> = progress.events.iter().map(|e| e.total_loaded).collect();
    assert_eq!(totals, [2, 3, 4]);
    let indices: Vec<usize> = progress.events.iter().map(|e| e.batch_index).collect();
    assert_eq!(indices, [0, 1, 2]);
    assert_eq!(progress.events[1].out_of_range, 1);
    Ok(())
}

#[test]
fn one_bulk_append_per_partition_per_batch() -> anyhow::Result<()> {
    let sink = CallLog::default();
    let years = YearSet::new([2022, 2023])?;
    let schema = DatasetType::Crashes.schema();
    provision(DatasetType::Crashes, &years, schema, &sink)?;

    let source = CsvFixture::new(DatasetType::Crashes)
        .row("2023-01-01")
        .row("2022-01-01")
        .row("2023-01-02")
        .row("2022-01-02")
        .to_csv_string()?;
    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years);
    executor.load(ChunkedReader::new(source.as_bytes(), 10)?, &sink, &mut NoProgress)?;

    let appends = sink.appends.lock().unwrap().clone();
    assert_eq!(
        appends,
        [("MVC_C_2022".to_string(), 2), ("MVC_C_2023".to_string(), 2)]
    );
    Ok(())
}

#[test]
fn malformed_rows_are_counted_and_dropped() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2022])?;
    let schema = DatasetType::Crashes.schema();
    provision(DatasetType::Crashes, &years, schema, &sink)?;

    let source = CsvFixture::new(DatasetType::Crashes)
        .row("2022-03-01")
        .row("notadate")
        .raw_line("9,short")
        .row("")
        .row_at("2022-03-02", "not a time")
        .to_csv_string()?;
    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years).with_reject_capacity(2);
    let summary = executor.load(ChunkedReader::new(source.as_bytes(), 100)?, &sink, &mut NoProgress)?;

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.malformed, 3);
    assert_eq!(summary.out_of_range, 0);

    let rejects = executor.rejects();
    assert_eq!(rejects.count("unparseable_date"), 2);
    assert_eq!(rejects.count("field_count"), 1);
    assert_eq!(rejects.samples().len(), 2);
    assert_eq!(rejects.samples()[0].line, 3);
    Ok(())
}

#[test]
fn missing_column_makes_every_row_malformed() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2022])?;
    let schema = DatasetType::Vehicles.schema();
    provision(DatasetType::Vehicles, &years, schema, &sink)?;

    let source = "UNIQUE_ID,CRASH_DATE\n1,2022-01-01\n2,2022-01-02\n";
    let mut executor = LoadExecutor::new(DatasetType::Vehicles, schema, &years);
    let summary = executor.load(ChunkedReader::new(source.as_bytes(), 100)?, &sink, &mut NoProgress)?;
    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.malformed, 2);
    assert_eq!(executor.rejects().count("missing_field"), 2);
    Ok(())
}

#[test]
fn append_failure_stops_at_batch() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2022, 2023])?;
    let schema = DatasetType::Crashes.schema();
    provision(DatasetType::Crashes, &years, schema, &sink)?;
    sink.fail_appends_to("MVC_C_2023");

    let source = mixed_source();
    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years);
    let mut progress = RecordingProgress::default();
    let err = executor
        .load(ChunkedReader::new(source.as_bytes(), 2)?, &sink, &mut progress)
        .unwrap_err();

    match &err {
        IngestError::AppendFailed { dataset, year, batch, .. } => {
            assert_eq!(*dataset, DatasetType::Crashes);
            assert_eq!(*year, 2023);
            assert_eq!(*batch, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.batch(), Some(1));
    // Batch 0 is already in place; nothing after the failure is.
    assert_eq!(sink.count_rows("MVC_C_2022")?, 2);
    assert_eq!(sink.count_rows("MVC_C_2023")?, 0);
    assert_eq!(progress.events.len(), 1);
    Ok(())
}

#[test]
fn unprovisioned_partition_fails_append() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2022])?;
    let schema = DatasetType::Crashes.schema();
    let source = CsvFixture::new(DatasetType::Crashes).row("2022-01-01").to_csv_string()?;

    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years);
    let err = executor
        .load(ChunkedReader::new(source.as_bytes(), 10)?, &sink, &mut NoProgress)
        .unwrap_err();
    match err {
        IngestError::AppendFailed { source, .. } => assert!(source.is_not_found()),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn source_failure_mid_stream() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2022])?;
    let schema = DatasetType::Crashes.schema();
    provision(DatasetType::Crashes, &years, schema, &sink)?;

    let source = CsvFixture::new(DatasetType::Crashes).row("2022-01-01").to_csv_string()?;
    let mut reader = ChunkedReader::new(source.as_bytes(), 10)?;
    let first = reader.next().unwrap()?;
    let batches: Vec<anyhow::Result<RawBatch>> =
        vec![Ok(first), Err(anyhow::anyhow!("connection reset"))];

    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years);
    let err = executor.load(batches, &sink, &mut NoProgress).unwrap_err();
    assert!(matches!(err, IngestError::Source { batch: 1, .. }));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(sink.count_rows("MVC_C_2022")?, 1);
    Ok(())
}

#[test]
fn hand_built_batch() -> anyhow::Result<()> {
    let sink = MemorySink::new();
    let years = YearSet::new([2016])?;
    let schema = DatasetType::Crashes.schema();
    provision(DatasetType::Crashes, &years, schema, &sink)?;

    let pairs: Vec<(String, Option<String>)> = schema
        .keep_list()
        .map(|raw| {
            let value = match raw {
                "CRASH DATE" => Some("06/15/2016".to_string()),
                "COLLISION_ID" => Some("3.0".to_string()),
                "NUMBER OF PERSONS INJURED" => Some("n/a".to_string()),
                _ => None,
            };
            (raw.to_string(), value)
        })
        .collect();
    let batch = RawBatch {
        index: 0,
        rows: vec![RowRecord {
            line: 2,
            row: Ok(RawRow::from_pairs(pairs)),
        }],
    };

    let mut executor = LoadExecutor::new(DatasetType::Crashes, schema, &years);
    let summary = executor.load(vec![Ok(batch)], &sink, &mut NoProgress)?;
    assert_eq!(summary.rows_for(DatasetType::Crashes, 2016), 1);
    assert_eq!(summary.coerced_values, 1);

    let metrics = MetricsCollector::new();
    summary.record_into(&metrics);
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot["rows_loaded"], serde_json::json!(1));
    assert_eq!(snapshot["values_coerced"], serde_json::json!(1));
    assert_eq!(snapshot["rows_loaded.MVC_C_2016"], serde_json::json!(1));
    Ok(())
}
