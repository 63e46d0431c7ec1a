// vigil-core/src/application/validator.rs
//
// Row-level coercion for ingested chunks. The contract is degrade, don't
// drop: a malformed value becomes NULL plus a recorded issue, and the row is
// still loaded. Rows are never rejected for value-level problems.

use csv::StringRecord;
use serde::Serialize;

use crate::domain::snapshot::{CellValue, ColumnKind, ColumnMeta};
use crate::infrastructure::csv_source::RawChunk;

/// Column-name keywords that mark a monetary field. Negative values in these
/// columns are kept but flagged.
const MONETARY_KEYWORDS: [&str; 5] = ["amount", "payment", "cash", "revenue", "price"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingValue,
    InvalidNumeric,
    NegativePayment,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingValue => "missing_value",
            IssueKind::InvalidNumeric => "invalid_numeric",
            IssueKind::NegativePayment => "negative_payment",
        }
    }
}

/// One flagged value. `row` is the global data-row index in the source.
#[derive(Debug, Clone, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub column: String,
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Result of validating one chunk.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub successful: usize,
    pub failed: usize,
    pub issues: Vec<RowIssue>,
    /// Coerced rows, positional against the validator's columns.
    pub rows: Vec<Vec<CellValue>>,
}

/// `"Cash Applied"` becomes `cash_applied`: lowercase, runs of
/// non-alphanumerics collapse to one underscore, edges trimmed.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

pub fn is_monetary_column(name: &str) -> bool {
    MONETARY_KEYWORDS.iter().any(|kw| name.contains(kw))
}

/// `" $1,250.50 "` parses; blank does not.
fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

pub struct RecordValidator {
    columns: Vec<ColumnMeta>,
}

impl RecordValidator {
    /// Infer the schema from the headers and a sample of rows (the first
    /// chunk). A column is numeric when it has at least one non-blank value
    /// and every non-blank sampled value parses as a number.
    pub fn infer(headers: &[String], sample: &[StringRecord]) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut non_blank = 0usize;
                let mut numeric = 0usize;
                for record in sample {
                    let field = record.get(i).unwrap_or("").trim();
                    if field.is_empty() {
                        continue;
                    }
                    non_blank += 1;
                    if parse_numeric(field).is_some() {
                        numeric += 1;
                    }
                }
                let kind = if non_blank > 0 && numeric == non_blank {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                };
                ColumnMeta {
                    name: normalize_header(raw),
                    kind,
                }
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Coerce every row of a chunk. Missing trailing fields count as blanks.
    pub fn validate_chunk(&self, chunk: &RawChunk) -> ChunkOutcome {
        let mut issues = Vec::new();
        let mut rows = Vec::with_capacity(chunk.rows.len());

        for (i, record) in chunk.rows.iter().enumerate() {
            let row_index = chunk.row_offset + i;
            let mut cells = Vec::with_capacity(self.columns.len());

            for (col_index, column) in self.columns.iter().enumerate() {
                let raw = record.get(col_index).unwrap_or("");
                cells.push(self.coerce(raw, column, row_index, &mut issues));
            }
            rows.push(cells);
        }

        ChunkOutcome {
            successful: rows.len(),
            failed: 0,
            issues,
            rows,
        }
    }

    fn coerce(
        &self,
        raw: &str,
        column: &ColumnMeta,
        row_index: usize,
        issues: &mut Vec<RowIssue>,
    ) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            issues.push(RowIssue {
                row: row_index,
                column: column.name.clone(),
                kind: IssueKind::MissingValue,
                value: None,
            });
            return CellValue::Null;
        }

        match column.kind {
            ColumnKind::Numeric => match parse_numeric(trimmed) {
                Some(v) => {
                    if v < 0.0 && is_monetary_column(&column.name) {
                        issues.push(RowIssue {
                            row: row_index,
                            column: column.name.clone(),
                            kind: IssueKind::NegativePayment,
                            value: Some(trimmed.to_string()),
                        });
                    }
                    CellValue::Number(v)
                }
                None => {
                    issues.push(RowIssue {
                        row: row_index,
                        column: column.name.clone(),
                        kind: IssueKind::InvalidNumeric,
                        value: Some(trimmed.to_string()),
                    });
                    CellValue::Null
                }
            },
            ColumnKind::Text | ColumnKind::Date => CellValue::Text(trimmed.to_string()),
        }
    }
}
