// vigil-core/src/application/mod.rs

pub mod ingestion;
pub mod monitor;
pub mod report;
pub mod trend;
pub mod validator;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI do
// `use vigil_core::application::{IngestionPipeline, QualityMonitor};`
// without knowing the internal file layout.

pub use ingestion::{
    process_in_chunks, ChunkRun, IngestionOptions, IngestionPipeline, IngestionReport,
};
pub use monitor::QualityMonitor;
pub use report::{generate_quality_report, write_quality_report, ReportOptions};
pub use trend::{generate_trend_chart, trend_series};
pub use validator::RecordValidator;
