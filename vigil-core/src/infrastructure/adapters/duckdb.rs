// vigil-core/src/infrastructure/adapters/duckdb.rs

use duckdb::types::ValueRef;
use duckdb::{params_from_iter, Config, Connection};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use crate::domain::rules::{foreign_key::canonical_value, ReferenceLookup};
use crate::domain::snapshot::{CellValue, Column, ColumnData, ColumnKind, ColumnMeta, TableSnapshot};
use crate::error::VigilError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::{IssueSink, TableStore, UploadLog};

/// Bookkeeping tables the store manages for itself. Hidden from `list_tables`.
const ISSUES_TABLE: &str = "data_quality_issues";
const UPLOADS_TABLE: &str = "data_uploads";

pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    pub fn open(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_bookkeeping()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::open(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Io(std::io::Error::other("DuckDB Mutex Poisoned")))
    }

    fn init_bookkeeping(&self) -> Result<(), InfrastructureError> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{ISSUES_TABLE}\" (
                logged_at TIMESTAMP DEFAULT current_timestamp,
                table_name VARCHAR NOT NULL,
                column_name VARCHAR,
                issue VARCHAR NOT NULL,
                row_count BIGINT
            );
            CREATE TABLE IF NOT EXISTS \"{UPLOADS_TABLE}\" (
                uploaded_at TIMESTAMP DEFAULT current_timestamp,
                filename VARCHAR NOT NULL,
                table_name VARCHAR NOT NULL,
                rows_loaded BIGINT NOT NULL,
                rows_failed BIGINT NOT NULL
            );"
        ))?;
        Ok(())
    }

    /// Declared schema of a table, in positional order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnMeta>, InfrastructureError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info('{table}')"))?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get("name")?;
            let declared: String = row.get("type")?;
            Ok(ColumnMeta {
                name,
                kind: ColumnKind::from_sql_type(&declared),
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }
}

/// Lossy numeric read: any SQL numeric becomes f64, anything else null.
fn numeric_cell(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::TinyInt(v) => Some(v as f64),
        ValueRef::SmallInt(v) => Some(v as f64),
        ValueRef::Int(v) => Some(v as f64),
        ValueRef::BigInt(v) => Some(v as f64),
        ValueRef::UTinyInt(v) => Some(v as f64),
        ValueRef::USmallInt(v) => Some(v as f64),
        ValueRef::UInt(v) => Some(v as f64),
        ValueRef::UBigInt(v) => Some(v as f64),
        ValueRef::Float(v) => Some(v as f64),
        ValueRef::Double(v) => Some(v),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).trim().parse().ok(),
        _ => None,
    }
}

fn text_cell(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::TinyInt(v) => Some(v.to_string()),
        ValueRef::SmallInt(v) => Some(v.to_string()),
        ValueRef::Int(v) => Some(v.to_string()),
        ValueRef::BigInt(v) => Some(v.to_string()),
        ValueRef::UTinyInt(v) => Some(v.to_string()),
        ValueRef::USmallInt(v) => Some(v.to_string()),
        ValueRef::UInt(v) => Some(v.to_string()),
        ValueRef::UBigInt(v) => Some(v.to_string()),
        ValueRef::Float(v) => Some(canonical_value(v as f64)),
        ValueRef::Double(v) => Some(canonical_value(v)),
        ValueRef::Boolean(v) => Some(v.to_string()),
        _ => None,
    }
}

enum ColumnBuilder {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl TableStore for DuckDbStore {
    fn list_tables(&self) -> Result<Vec<String>, VigilError> {
        let conn = self.lock().map_err(InfrastructureError::from)?;
        let mut stmt = conn
            .prepare(
                "SELECT table_name FROM duckdb_tables() \
                 WHERE NOT internal ORDER BY table_name",
            )
            .map_err(InfrastructureError::from)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(InfrastructureError::from)?;

        let mut tables = Vec::new();
        for row in rows {
            let name = row.map_err(InfrastructureError::from)?;
            if name != ISSUES_TABLE && name != UPLOADS_TABLE {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    fn fetch_table(&self, table: &str) -> Result<TableSnapshot, VigilError> {
        let metas = self.table_columns(table)?;

        let mut builders: Vec<ColumnBuilder> = metas
            .iter()
            .map(|m| match m.kind {
                ColumnKind::Numeric => ColumnBuilder::Numeric(Vec::new()),
                ColumnKind::Text | ColumnKind::Date => ColumnBuilder::Text(Vec::new()),
            })
            .collect();

        {
            let conn = self.lock().map_err(InfrastructureError::from)?;
            let mut stmt = conn
                .prepare(&format!("SELECT * FROM \"{table}\""))
                .map_err(InfrastructureError::from)?;
            let mut rows = stmt.query([]).map_err(InfrastructureError::from)?;

            while let Some(row) = rows.next().map_err(InfrastructureError::from)? {
                for (i, builder) in builders.iter_mut().enumerate() {
                    let value = row.get_ref(i).map_err(InfrastructureError::from)?;
                    match builder {
                        ColumnBuilder::Numeric(v) => v.push(numeric_cell(value)),
                        ColumnBuilder::Text(v) => v.push(text_cell(value)),
                    }
                }
            }
        }

        let columns = metas
            .into_iter()
            .zip(builders)
            .map(|(meta, builder)| {
                let data = match builder {
                    ColumnBuilder::Numeric(v) => ColumnData::Numeric(v),
                    ColumnBuilder::Text(v) => ColumnData::Text(v),
                };
                Column {
                    meta,
                    data,
                }
            })
            .collect();

        Ok(TableSnapshot::new(table, columns))
    }

    fn ensure_table(&self, table: &str, columns: &[ColumnMeta]) -> Result<(), VigilError> {
        let cols: Vec<String> = columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.kind.sql_type()))
            .collect();
        let conn = self.lock().map_err(InfrastructureError::from)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" ({})",
                cols.join(", ")
            ),
            [],
        )
        .map_err(InfrastructureError::from)?;
        Ok(())
    }

    fn append_rows(
        &self,
        table: &str,
        columns: &[ColumnMeta],
        rows: &[Vec<CellValue>],
    ) -> Result<usize, VigilError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let names: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );

        let conn = self.lock().map_err(InfrastructureError::from)?;
        conn.execute("BEGIN TRANSACTION", [])
            .map_err(InfrastructureError::from)?;
        let mut stmt = conn.prepare(&sql).map_err(InfrastructureError::from)?;
        for row in rows {
            let params = row.iter().map(|cell| match cell {
                CellValue::Null => duckdb::types::Value::Null,
                CellValue::Number(v) => duckdb::types::Value::Double(*v),
                CellValue::Text(s) => duckdb::types::Value::Text(s.clone()),
            });
            if let Err(e) = stmt.execute(params_from_iter(params)) {
                let _ = conn.execute("ROLLBACK", []);
                return Err(InfrastructureError::from(e).into());
            }
        }
        conn.execute("COMMIT", [])
            .map_err(InfrastructureError::from)?;

        Ok(rows.len())
    }
}

impl ReferenceLookup for DuckDbStore {
    fn distinct_values(&self, table: &str, column: &str) -> anyhow::Result<HashSet<String>> {
        let conn = self
            .lock()
            .map_err(|e| anyhow::anyhow!("store unavailable: {e}"))?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT \"{column}\" FROM \"{table}\" WHERE \"{column}\" IS NOT NULL"
        ))?;
        let mut rows = stmt.query([])?;

        let mut values = HashSet::new();
        while let Some(row) = rows.next()? {
            if let Some(text) = text_cell(row.get_ref(0)?) {
                values.insert(text);
            }
        }
        Ok(values)
    }
}

impl IssueSink for DuckDbStore {
    fn record_issue(&self, table: &str, column: &str, issue: &str, count: Option<u64>) {
        let result = self.lock().map_err(VigilError::from).and_then(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO \"{ISSUES_TABLE}\" \
                     (table_name, column_name, issue, row_count) VALUES (?, ?, ?, ?)"
                ),
                duckdb::params![table, column, issue, count.map(|c| c as i64)],
            )
            .map_err(InfrastructureError::from)?;
            Ok(())
        });
        if let Err(e) = result {
            // Bookkeeping failures must never abort a check.
            warn!(table, column, error = %e, "Failed to record quality issue");
        }
    }
}

impl UploadLog for DuckDbStore {
    fn record_upload(
        &self,
        filename: &str,
        table: &str,
        rows_loaded: u64,
        rows_failed: u64,
    ) -> Result<(), VigilError> {
        let conn = self.lock().map_err(InfrastructureError::from)?;
        conn.execute(
            &format!(
                "INSERT INTO \"{UPLOADS_TABLE}\" \
                 (filename, table_name, rows_loaded, rows_failed) VALUES (?, ?, ?, ?)"
            ),
            duckdb::params![filename, table, rows_loaded as i64, rows_failed as i64],
        )
        .map_err(InfrastructureError::from)?;
        Ok(())
    }
}
