// vigil-core/src/domain/snapshot.rs
//
// In-memory snapshot of one table, with an explicit schema tag per column.
// Rules dispatch on the tag, never on runtime reflection of the values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Date,
}

impl ColumnKind {
    /// Maps a declared SQL type (as reported by `PRAGMA table_info`) to a semantic tag.
    pub fn from_sql_type(declared: &str) -> Self {
        let t = declared.to_uppercase();
        if t.contains("INT")
            || t.contains("DOUBLE")
            || t.contains("FLOAT")
            || t.contains("REAL")
            || t.contains("DECIMAL")
            || t.contains("NUMERIC")
        {
            ColumnKind::Numeric
        } else if t.contains("DATE") || t.contains("TIME") {
            ColumnKind::Date
        } else {
            ColumnKind::Text
        }
    }
}

impl ColumnKind {
    /// SQL type used when materializing a column of this kind.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "DOUBLE",
            ColumnKind::Text => "VARCHAR",
            ColumnKind::Date => "VARCHAR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
}

/// One cell of an ingested row, typed at coercion time.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Column values, typed by kind. Date columns carry their rendered text form.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub meta: ColumnMeta,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, data: ColumnData) -> Self {
        Self {
            meta: ColumnMeta {
                name: name.into(),
                kind,
            },
            data,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnKind::Numeric, ColumnData::Numeric(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnKind::Text, ColumnData::Text(values))
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.meta.kind
    }

    /// Non-null numeric values, in row order. Empty for text/date columns.
    pub fn numeric_values(&self) -> Vec<f64> {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter_map(|x| *x).collect(),
            ColumnData::Text(_) => Vec::new(),
        }
    }

    /// Non-null text values, in row order. Empty for numeric columns.
    pub fn text_values(&self) -> Vec<&str> {
        match &self.data {
            ColumnData::Text(v) => v.iter().filter_map(|x| x.as_deref()).collect(),
            ColumnData::Numeric(_) => Vec::new(),
        }
    }
}

/// A full table loaded in memory. Columns share one row count.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub table: String,
    row_count: usize,
    columns: Vec<Column>,
}

impl TableSnapshot {
    pub fn new(table: impl Into<String>, columns: Vec<Column>) -> Self {
        let row_count = columns.first().map(|c| c.data.len()).unwrap_or(0);
        Self {
            table: table.into(),
            row_count,
            columns,
        }
    }

    pub fn empty(table: impl Into<String>) -> Self {
        Self::new(table, Vec::new())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.meta.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.meta.name.clone()).collect()
    }
}
