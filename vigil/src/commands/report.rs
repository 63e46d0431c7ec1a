// vigil/src/commands/report.rs
//
// USE CASE: Render the Markdown quality report.

use std::path::PathBuf;

use vigil_core::application::{write_quality_report, ReportOptions};
use vigil_core::infrastructure::config::load_config;

use super::check_history;

pub fn execute(
    project_dir: PathBuf,
    days: Option<i64>,
    output: Option<PathBuf>,
    tables: Vec<String>,
) -> anyhow::Result<()> {
    let config = load_config(&project_dir)?;
    let history = check_history(&config, &project_dir);

    let options = ReportOptions {
        tables: if tables.is_empty() { None } else { Some(tables) },
        days: days.unwrap_or(config.report.default_days),
    };
    let path = output.unwrap_or_else(|| config.reports_dir(&project_dir).join("quality_report.md"));

    let written = write_quality_report(
        &history,
        &config.charts_dir(&project_dir),
        &options,
        &path,
    )?;
    println!("📄 Quality report written to {}", written.display());
    Ok(())
}
