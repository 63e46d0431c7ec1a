// vigil/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Chunked ingestion and data-quality monitoring for billing data", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 📥 Ingests a CSV file into a table, in memory-bounded chunks
    Ingest {
        /// CSV file to load
        file: PathBuf,

        /// Target table (defaults to the file stem)
        #[arg(long, short)]
        table: Option<String>,

        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Fixed chunk size in rows (adaptive when omitted)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Stop after this many chunks (partial smoke loads)
        #[arg(long)]
        max_chunks: Option<usize>,

        /// Write the ingestion report as JSON to this path
        #[arg(long)]
        report_out: Option<PathBuf>,
    },

    /// 📋 Lists the data tables in the store
    List {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🔍 Runs the standard quality rules against one table
    Check {
        table: String,

        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🔍 Checks every table, then refreshes drift baselines
    CheckAll {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Restrict to these tables
        #[arg(long)]
        tables: Vec<String>,
    },

    /// 📄 Renders a Markdown quality report from the check history
    Report {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Lookback window in days
        #[arg(long)]
        days: Option<i64>,

        /// Output path (defaults to <reports_dir>/quality_report.md)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Restrict to these tables
        #[arg(long)]
        tables: Vec<String>,
    },

    /// 📈 Renders a PNG trend chart for one column statistic
    Trend {
        table: String,
        column: String,

        /// Statistic to plot (mean, median, std, min, max, count, ...)
        #[arg(long, short, default_value = "mean")]
        statistic: String,

        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Lookback window in days
        #[arg(long)]
        days: Option<i64>,
    },
}
