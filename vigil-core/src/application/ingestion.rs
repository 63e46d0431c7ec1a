// vigil-core/src/application/ingestion.rs
//
// Chunked CSV ingestion. One chunk is the unit of both memory use and
// failure: a store error while loading a chunk marks that chunk failed and
// the run continues. Only a source that cannot be opened aborts the run.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::validator::{ChunkOutcome, RecordValidator, RowIssue};
use crate::error::VigilError;
use crate::infrastructure::csv_source::{ChunkReader, CsvSource, RawChunk};
use crate::ports::{IssueSink, TableStore, UploadLog};

#[derive(Debug, Clone, Default)]
pub struct IngestionOptions {
    /// Fixed chunk size in rows. When absent, derived from a memory sample.
    pub chunk_size: Option<usize>,
    /// Stop after this many chunks (partial loads for smoke testing).
    pub max_chunks: Option<usize>,
    pub target_chunk_mb: usize,
    pub sample_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    pub index: usize,
    pub rows: usize,
    pub successful: usize,
    pub failed: usize,
    pub issue_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestionReport {
    pub table: String,
    pub chunk_size: usize,
    pub chunks: Vec<ChunkReport>,
    pub total_rows: usize,
    pub successful_rows: usize,
    pub failed_rows: usize,
    pub issues: Vec<RowIssue>,
    pub elapsed_secs: f64,
}

impl IngestionReport {
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_rows as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    pub fn failed_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.error.is_some()).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Aggregated result of one `process_in_chunks` run, independent of where
/// the processed rows went.
#[derive(Debug)]
pub struct ChunkRun {
    pub headers: Vec<String>,
    pub chunk_size: usize,
    pub chunks: Vec<ChunkReport>,
    pub total_rows: usize,
    pub successful_rows: usize,
    pub failed_rows: usize,
    pub issues: Vec<RowIssue>,
    pub elapsed_secs: f64,
}

/// Drive `processor` over the source one chunk at a time. A processor error
/// marks that chunk fully failed and the run continues; a stream parse error
/// counts the rows buffered into the broken chunk as failed and ends the
/// run. Only a reader-open failure is fatal.
pub fn process_in_chunks<F>(
    source: &CsvSource,
    options: &IngestionOptions,
    mut processor: F,
) -> Result<ChunkRun, VigilError>
where
    F: FnMut(&[String], &RawChunk) -> Result<ChunkOutcome, VigilError>,
{
    let started = Instant::now();
    let chunk_size = options
        .chunk_size
        .unwrap_or_else(|| source.optimal_chunk_size(options.target_chunk_mb, options.sample_rows));

    let reader = ChunkReader::new(source, chunk_size, options.max_chunks)?;
    let headers = reader.headers.clone();
    info!(chunk_size, ?headers, "Starting chunked run");

    let mut chunks = Vec::new();
    let mut issues = Vec::new();
    let mut successful_rows = 0usize;
    let mut failed_rows = 0usize;
    let mut total_rows = 0usize;

    for chunk_result in reader {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                // The stream is unrecoverable past a parse error; the rows
                // buffered into the broken chunk count as failed.
                warn!(error = %e, "CSV stream failed mid-run");
                total_rows += e.rows_lost;
                failed_rows += e.rows_lost;
                chunks.push(ChunkReport {
                    index: chunks.len(),
                    rows: e.rows_lost,
                    successful: 0,
                    failed: e.rows_lost,
                    issue_count: 0,
                    error: Some(e.to_string()),
                });
                break;
            }
        };

        let rows = chunk.rows.len();
        total_rows += rows;
        match processor(&headers, &chunk) {
            Ok(outcome) => {
                successful_rows += outcome.successful;
                failed_rows += outcome.failed;
                let issue_count = outcome.issues.len();
                issues.extend(outcome.issues);
                chunks.push(ChunkReport {
                    index: chunk.index,
                    rows,
                    successful: outcome.successful,
                    failed: outcome.failed,
                    issue_count,
                    error: None,
                });
            }
            Err(e) => {
                // Failure isolation: the chunk is lost, the run is not.
                warn!(chunk = chunk.index, error = %e, "Chunk failed");
                failed_rows += rows;
                chunks.push(ChunkReport {
                    index: chunk.index,
                    rows,
                    successful: 0,
                    failed: rows,
                    issue_count: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(ChunkRun {
        headers,
        chunk_size,
        chunks,
        total_rows,
        successful_rows,
        failed_rows,
        issues,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}

pub struct IngestionPipeline<'a> {
    store: &'a dyn TableStore,
    issues: Option<&'a dyn IssueSink>,
    uploads: Option<&'a dyn UploadLog>,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self {
            store,
            issues: None,
            uploads: None,
        }
    }

    pub fn with_issue_sink(mut self, issues: &'a dyn IssueSink) -> Self {
        self.issues = Some(issues);
        self
    }

    pub fn with_upload_log(mut self, uploads: &'a dyn UploadLog) -> Self {
        self.uploads = Some(uploads);
        self
    }

    /// Load a CSV source into `table`, creating the table from the inferred
    /// schema when needed. A reader-open failure is the only fatal error.
    pub fn ingest(
        &self,
        source: &CsvSource,
        table: &str,
        options: &IngestionOptions,
    ) -> Result<IngestionReport, VigilError> {
        let store = self.store;
        let mut validator: Option<RecordValidator> = None;

        let run = process_in_chunks(source, options, |headers, chunk| {
            // Schema is inferred from the first chunk.
            if validator.is_none() {
                let v = RecordValidator::infer(headers, &chunk.rows);
                store.ensure_table(table, v.columns())?;
                validator = Some(v);
            }
            let validator = validator
                .as_ref()
                .ok_or_else(|| VigilError::InternalError("validator not initialized".into()))?;

            let mut outcome = validator.validate_chunk(chunk);
            store.append_rows(table, validator.columns(), &outcome.rows)?;
            // Rows are in the store now; only the counts travel back.
            outcome.rows.clear();
            Ok(outcome)
        })?;

        // An empty source still materializes its header schema.
        if validator.is_none() {
            let v = RecordValidator::infer(&run.headers, &[]);
            self.store.ensure_table(table, v.columns())?;
        }

        let report = IngestionReport {
            table: table.to_string(),
            chunk_size: run.chunk_size,
            chunks: run.chunks,
            total_rows: run.total_rows,
            successful_rows: run.successful_rows,
            failed_rows: run.failed_rows,
            issues: run.issues,
            elapsed_secs: run.elapsed_secs,
        };
        self.record_bookkeeping(source, &report);
        info!(
            table,
            total = report.total_rows,
            failed = report.failed_rows,
            issues = report.issues.len(),
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Bookkeeping is best-effort and never fails the run.
    fn record_bookkeeping(&self, source: &CsvSource, report: &IngestionReport) {
        if let Some(sink) = self.issues {
            let mut by_column: BTreeMap<(String, &'static str), u64> = BTreeMap::new();
            for issue in &report.issues {
                *by_column
                    .entry((issue.column.clone(), issue.kind.as_str()))
                    .or_default() += 1;
            }
            for ((column, kind), count) in by_column {
                sink.record_issue(&report.table, &column, kind, Some(count));
            }
        }
        if let Some(uploads) = self.uploads {
            let filename = source
                .path()
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.path().display().to_string());
            if let Err(e) = uploads.record_upload(
                &filename,
                &report.table,
                report.successful_rows as u64,
                report.failed_rows as u64,
            ) {
                warn!(error = %e, "Failed to record upload");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::rules::{thresholds, NegativeValuesRule, QualityRule, RuleContext};
    use crate::domain::snapshot::{CellValue, ColumnMeta};
    use crate::infrastructure::adapters::DuckDbStore;
    use anyhow::Result;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn options(chunk_size: usize) -> IngestionOptions {
        IngestionOptions {
            chunk_size: Some(chunk_size),
            max_chunks: None,
            target_chunk_mb: 100,
            sample_rows: 1000,
        }
    }

    /// 250 payment rows; rows 0,25,50..225 carry a negative cash_applied.
    fn write_payments_csv(dir: &Path) -> Result<CsvSource> {
        let path = dir.join("payments.csv");
        let mut f = File::create(&path)?;
        writeln!(f, "Claim ID,Cash Applied,Payer")?;
        for i in 0..250 {
            let cash = if i % 25 == 0 { -50.0 } else { 100.0 + i as f64 };
            writeln!(f, "C{i},{cash},Aetna")?;
        }
        Ok(CsvSource::new(path))
    }

    #[test]
    fn test_end_to_end_negative_payments() -> Result<()> {
        let dir = tempdir()?;
        let source = write_payments_csv(dir.path())?;
        let store = DuckDbStore::in_memory()?;

        let report = IngestionPipeline::new(&store)
            .with_issue_sink(&store)
            .with_upload_log(&store)
            .ingest(&source, "payments", &options(50))?;

        // 250 rows in 5 chunks; negatives are flagged, never rejected.
        assert_eq!(report.chunks.len(), 5);
        assert_eq!(report.total_rows, 250);
        assert_eq!(report.successful_rows, 250);
        assert_eq!(report.failed_rows, 0);
        let negatives: Vec<&RowIssue> = report
            .issues
            .iter()
            .filter(|i| i.kind.as_str() == "negative_payment")
            .collect();
        assert_eq!(negatives.len(), 10);
        assert_eq!(negatives[0].row, 0);
        assert_eq!(negatives[9].row, 225);

        // The stored table trips the negative-values rule: 10/250 = 4% > 1%.
        let snapshot = store.fetch_table("payments")?;
        assert_eq!(snapshot.row_count(), 250);
        let rule = NegativeValuesRule::new("cash_applied", Some(thresholds::NEGATIVE_VALUES));
        let outcome = rule.evaluate(&snapshot, &RuleContext::empty());
        assert!(outcome.violated);
        Ok(())
    }

    #[test]
    fn test_row_count_invariant() -> Result<()> {
        let dir = tempdir()?;
        let source = write_payments_csv(dir.path())?;
        let store = DuckDbStore::in_memory()?;

        let report = IngestionPipeline::new(&store).ingest(&source, "payments", &options(70))?;
        assert_eq!(
            report.chunks.iter().map(|c| c.rows).sum::<usize>(),
            report.total_rows
        );
        assert_eq!(
            report.successful_rows + report.failed_rows,
            report.total_rows
        );
        // 250 rows at chunk size 70: 70+70+70+40.
        assert_eq!(report.chunks.len(), 4);
        Ok(())
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let store = DuckDbStore::in_memory().unwrap();
        let source = CsvSource::new("/nonexistent/payments.csv");
        let result = IngestionPipeline::new(&store).ingest(&source, "payments", &options(50));
        assert!(result.is_err());
    }

    #[test]
    fn test_max_chunks_limits_the_load() -> Result<()> {
        let dir = tempdir()?;
        let source = write_payments_csv(dir.path())?;
        let store = DuckDbStore::in_memory()?;

        let mut opts = options(50);
        opts.max_chunks = Some(2);
        let report = IngestionPipeline::new(&store).ingest(&source, "payments", &opts)?;
        assert_eq!(report.total_rows, 100);
        assert_eq!(store.fetch_table("payments")?.row_count(), 100);
        Ok(())
    }

    #[test]
    fn test_process_in_chunks_with_custom_processor() -> Result<()> {
        let dir = tempdir()?;
        let source = write_payments_csv(dir.path())?;

        // A processor that only counts, failing on the second chunk.
        let run = process_in_chunks(&source, &options(50), |headers, chunk| {
            assert_eq!(headers[1], "Cash Applied");
            if chunk.index == 1 {
                return Err(VigilError::InternalError("disk full".into()));
            }
            Ok(ChunkOutcome {
                successful: chunk.rows.len(),
                failed: 0,
                issues: Vec::new(),
                rows: Vec::new(),
            })
        })?;

        assert_eq!(run.chunks.len(), 5);
        assert_eq!(run.total_rows, 250);
        assert_eq!(run.successful_rows, 200);
        assert_eq!(run.failed_rows, 50);
        assert_eq!(run.chunks[1].failed, 50);
        assert!(run.chunks[1].error.is_some());
        Ok(())
    }

    #[test]
    fn test_stream_error_rows_count_as_failed() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("payments.csv");
        let mut f = File::create(&path)?;
        writeln!(f, "Claim ID,Cash Applied,Payer")?;
        writeln!(f, "C0,10.00,Aetna")?;
        writeln!(f, "C1,20.00,Aetna")?;
        f.write_all(b"C2,30.00,\xff\xfe\n")?;
        drop(f);

        let store = DuckDbStore::in_memory()?;
        let report =
            IngestionPipeline::new(&store).ingest(&CsvSource::new(path), "payments", &options(50))?;

        // The two rows parsed before the break are reported, not dropped.
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.failed_rows, 2);
        assert_eq!(report.successful_rows, 0);
        assert!(report.chunks[0].error.is_some());
        assert_eq!(
            report.successful_rows + report.failed_rows,
            report.total_rows
        );
        Ok(())
    }

    #[test]
    fn test_report_serializes_to_json() -> Result<()> {
        let dir = tempdir()?;
        let source = write_payments_csv(dir.path())?;
        let store = DuckDbStore::in_memory()?;

        let report = IngestionPipeline::new(&store).ingest(&source, "payments", &options(50))?;
        let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        assert_eq!(json["table"], "payments");
        assert_eq!(json["total_rows"], 250);
        assert_eq!(json["chunks"].as_array().unwrap().len(), 5);
        assert_eq!(json["issues"][0]["kind"], "negative_payment");
        Ok(())
    }

    /// Store that rejects one chunk's append to exercise failure isolation.
    struct FlakyStore {
        inner: DuckDbStore,
        fail_on_call: usize,
        calls: Mutex<usize>,
    }

    impl TableStore for FlakyStore {
        fn list_tables(&self) -> Result<Vec<String>, VigilError> {
            self.inner.list_tables()
        }
        fn fetch_table(&self, table: &str) -> Result<crate::domain::snapshot::TableSnapshot, VigilError> {
            self.inner.fetch_table(table)
        }
        fn ensure_table(&self, table: &str, columns: &[ColumnMeta]) -> Result<(), VigilError> {
            self.inner.ensure_table(table, columns)
        }
        fn append_rows(
            &self,
            table: &str,
            columns: &[ColumnMeta],
            rows: &[Vec<CellValue>],
        ) -> Result<usize, VigilError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == self.fail_on_call {
                return Err(VigilError::InternalError("disk full".into()));
            }
            self.inner.append_rows(table, columns, rows)
        }
    }

    #[test]
    fn test_chunk_failure_does_not_abort_the_run() -> Result<()> {
        let dir = tempdir()?;
        let source = write_payments_csv(dir.path())?;
        let store = FlakyStore {
            inner: DuckDbStore::in_memory()?,
            fail_on_call: 2,
            calls: Mutex::new(0),
        };

        let report = IngestionPipeline::new(&store).ingest(&source, "payments", &options(50))?;
        assert_eq!(report.chunks.len(), 5);
        assert_eq!(report.failed_chunks(), 1);
        assert_eq!(report.failed_rows, 50);
        assert_eq!(report.successful_rows, 200);
        assert_eq!(store.inner.fetch_table("payments")?.row_count(), 200);
        Ok(())
    }
}
