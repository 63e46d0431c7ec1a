// vigil-core/src/infrastructure/csv_source.rs
//
// Streaming access to a headered CSV file, plus the adaptive chunk sizing
// that bounds how much of it is resident at once. Sizing samples the head of
// the file, extrapolates a per-row memory cost, and converts the configured
// memory budget into a row count.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use thiserror::Error;
use tracing::{debug, warn};

use crate::infrastructure::error::InfrastructureError;

/// Chunk size bounds, in rows. Estimation failures fall back to the default
/// rather than aborting ingestion.
pub const MIN_CHUNK_ROWS: usize = 1_000;
pub const MAX_CHUNK_ROWS: usize = 100_000;
pub const DEFAULT_CHUNK_ROWS: usize = 10_000;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
/// Per-field overhead added on top of raw byte length when estimating the
/// in-memory cost of a parsed row.
const FIELD_OVERHEAD_BYTES: usize = 8;

#[derive(Debug, Clone)]
pub struct MemoryEstimate {
    pub sampled_rows: usize,
    pub sampled_bytes: usize,
    pub total_rows: usize,
    pub estimated_total_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows, by a cheap line count. Quoted embedded newlines
    /// are not accounted for; sizing only needs an order of magnitude.
    pub fn count_rows(&self) -> Result<usize, InfrastructureError> {
        let file = File::open(&self.path)?;
        let lines = BufReader::new(file).lines().count();
        Ok(lines.saturating_sub(1))
    }

    pub fn open_reader(&self) -> Result<csv::Reader<File>, InfrastructureError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        Ok(reader)
    }

    /// Extrapolate total memory cost from the first `sample_rows` rows.
    pub fn estimate_memory(&self, sample_rows: usize) -> Result<MemoryEstimate, InfrastructureError> {
        let total_rows = self.count_rows()?;
        let mut reader = self.open_reader()?;

        let mut sampled_rows = 0;
        let mut sampled_bytes = 0;
        for record in reader.records().take(sample_rows) {
            let record = record?;
            sampled_bytes += record
                .iter()
                .map(|field| field.len() + FIELD_OVERHEAD_BYTES)
                .sum::<usize>();
            sampled_rows += 1;
        }

        let per_row = if sampled_rows > 0 {
            sampled_bytes as f64 / sampled_rows as f64
        } else {
            0.0
        };

        Ok(MemoryEstimate {
            sampled_rows,
            sampled_bytes,
            total_rows,
            estimated_total_bytes: (per_row * total_rows as f64) as usize,
        })
    }

    /// Rows per chunk so one chunk stays near `target_chunk_mb`. Clamped to
    /// `[MIN_CHUNK_ROWS, MAX_CHUNK_ROWS]`; any estimation failure yields
    /// `DEFAULT_CHUNK_ROWS` so sizing can never abort an ingestion run.
    pub fn optimal_chunk_size(&self, target_chunk_mb: usize, sample_rows: usize) -> usize {
        match self.estimate_memory(sample_rows) {
            Ok(estimate) if estimate.sampled_rows > 0 && estimate.sampled_bytes > 0 => {
                let sample_mb = estimate.sampled_bytes as f64 / BYTES_PER_MB;
                let rows_per_mb = estimate.sampled_rows as f64 / sample_mb;
                let chunk = (rows_per_mb * target_chunk_mb as f64) as usize;
                let clamped = chunk.clamp(MIN_CHUNK_ROWS, MAX_CHUNK_ROWS);
                debug!(
                    rows_per_mb = rows_per_mb as u64,
                    chunk, clamped, "Derived chunk size"
                );
                clamped
            }
            Ok(_) => DEFAULT_CHUNK_ROWS,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Chunk size estimation failed, using default");
                DEFAULT_CHUNK_ROWS
            }
        }
    }
}

/// One slice of the source. `row_offset` is the global index of the chunk's
/// first data row, so per-row issues can reference true source positions.
#[derive(Debug)]
pub struct RawChunk {
    pub index: usize,
    pub row_offset: usize,
    pub rows: Vec<StringRecord>,
}

/// A CSV parse failure mid-stream. Rows already buffered into the broken
/// chunk cannot be trusted to align with the rest of the file, so they are
/// dropped, but their count travels with the error so callers can account
/// for them instead of losing them silently.
#[derive(Debug, Error)]
#[error("CSV stream failed after buffering {rows_lost} rows: {source}")]
pub struct ChunkStreamError {
    pub rows_lost: usize,
    #[source]
    pub source: InfrastructureError,
}

/// Pull-based chunk iterator over an open CSV reader.
pub struct ChunkReader {
    reader: csv::Reader<File>,
    pub headers: Vec<String>,
    chunk_size: usize,
    max_chunks: Option<usize>,
    next_index: usize,
    done: bool,
}

impl ChunkReader {
    pub fn new(
        source: &CsvSource,
        chunk_size: usize,
        max_chunks: Option<usize>,
    ) -> Result<Self, InfrastructureError> {
        let mut reader = source.open_reader()?;
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        Ok(Self {
            reader,
            headers,
            chunk_size,
            max_chunks,
            next_index: 0,
            done: false,
        })
    }
}

impl Iterator for ChunkReader {
    type Item = Result<RawChunk, ChunkStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(max) = self.max_chunks {
            if self.next_index >= max {
                return None;
            }
        }

        let mut rows = Vec::with_capacity(self.chunk_size);
        for record in self.reader.records() {
            match record {
                Ok(record) => rows.push(record),
                Err(e) => {
                    self.done = true;
                    return Some(Err(ChunkStreamError {
                        rows_lost: rows.len(),
                        source: e.into(),
                    }));
                }
            }
            if rows.len() == self.chunk_size {
                break;
            }
        }

        if rows.is_empty() {
            return None;
        }
        if rows.len() < self.chunk_size {
            self.done = true;
        }

        let index = self.next_index;
        self.next_index += 1;
        Some(Ok(RawChunk {
            index,
            row_offset: self.chunk_size * index,
            rows,
        }))
    }
}
