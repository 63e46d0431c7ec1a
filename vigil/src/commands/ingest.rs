// vigil/src/commands/ingest.rs
//
// USE CASE: Load a CSV file into the store in bounded chunks.

use std::path::PathBuf;

use anyhow::Context;
use vigil_core::application::validator::normalize_header;
use vigil_core::application::{IngestionOptions, IngestionPipeline};
use vigil_core::infrastructure::csv_source::CsvSource;
use vigil_core::infrastructure::fs::atomic_write;

use super::open_project;

pub fn execute(
    file: PathBuf,
    table: Option<String>,
    project_dir: PathBuf,
    chunk_size: Option<usize>,
    max_chunks: Option<usize>,
    report_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (config, store) = open_project(&project_dir)?;

    let table = match table {
        Some(table) => table,
        None => file
            .file_stem()
            .map(|s| normalize_header(&s.to_string_lossy()))
            .filter(|s| !s.is_empty())
            .context("Cannot derive a table name from the file path, pass --table")?,
    };

    println!("📥 Ingesting '{}' into table '{table}'...", file.display());
    let source = CsvSource::new(&file);
    let options = IngestionOptions {
        chunk_size,
        max_chunks,
        target_chunk_mb: config.ingestion.target_chunk_mb,
        sample_rows: config.ingestion.sample_rows,
    };

    let report = IngestionPipeline::new(&store)
        .with_issue_sink(&store)
        .with_upload_log(&store)
        .ingest(&source, &table, &options)
        .with_context(|| format!("Ingestion of {:?} failed", file))?;

    println!(
        "   {} rows in {} chunks (chunk size {}) in {:.2}s ({:.0} rows/s)",
        report.total_rows,
        report.chunks.len(),
        report.chunk_size,
        report.elapsed_secs,
        report.rows_per_second()
    );
    println!(
        "   loaded: {}  failed: {}  flagged values: {}",
        report.successful_rows,
        report.failed_rows,
        report.issues.len()
    );

    if let Some(path) = report_out {
        let path = if path.is_absolute() {
            path
        } else {
            project_dir.join(path)
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create report directory {:?}", parent))?;
        }
        let json = report
            .to_json()
            .context("Serializing the ingestion report failed")?;
        atomic_write(&path, json)
            .with_context(|| format!("Writing the ingestion report to {:?} failed", path))?;
        println!("   report written to '{}'", path.display());
    }

    if report.failed_chunks() > 0 {
        eprintln!("❌ {} chunk(s) failed to load:", report.failed_chunks());
        for chunk in report.chunks.iter().filter(|c| c.error.is_some()) {
            eprintln!(
                "   chunk {}: {}",
                chunk.index,
                chunk.error.as_deref().unwrap_or("unknown error")
            );
        }
        std::process::exit(1);
    }

    println!("✨ Ingestion complete");
    Ok(())
}
