// vigil-core/src/ports/store.rs

// What the application needs from a storage backend, without knowing how it's
// done. The DuckDB adapter in infrastructure is the one production
// implementation; tests substitute in-memory fakes.

use crate::domain::snapshot::{CellValue, ColumnMeta, TableSnapshot};
use crate::error::VigilError;

/// Tabular storage for ingested data.
pub trait TableStore {
    /// Names of the user data tables, excluding bookkeeping tables.
    fn list_tables(&self) -> Result<Vec<String>, VigilError>;

    /// Load the full table into memory for rule evaluation.
    fn fetch_table(&self, table: &str) -> Result<TableSnapshot, VigilError>;

    /// Create the table when absent. Idempotent.
    fn ensure_table(&self, table: &str, columns: &[ColumnMeta]) -> Result<(), VigilError>;

    /// Append one batch of rows. Each row is positional against `columns`.
    fn append_rows(
        &self,
        table: &str,
        columns: &[ColumnMeta],
        rows: &[Vec<CellValue>],
    ) -> Result<usize, VigilError>;
}

/// Structured record of data-quality findings, kept alongside the data.
pub trait IssueSink {
    /// Best-effort: implementations log and swallow their own failures so a
    /// bookkeeping error never aborts a check.
    fn record_issue(&self, table: &str, column: &str, issue: &str, count: Option<u64>);
}

/// Audit trail of file ingestions.
pub trait UploadLog {
    fn record_upload(
        &self,
        filename: &str,
        table: &str,
        rows_loaded: u64,
        rows_failed: u64,
    ) -> Result<(), VigilError>;
}
