// vigil/src/commands/trend.rs
//
// USE CASE: Render a trend chart for one column statistic.

use std::path::PathBuf;

use vigil_core::application::generate_trend_chart;
use vigil_core::infrastructure::config::load_config;

use super::check_history;

pub fn execute(
    table: String,
    column: String,
    statistic: String,
    project_dir: PathBuf,
    days: Option<i64>,
) -> anyhow::Result<()> {
    let config = load_config(&project_dir)?;
    let history = check_history(&config, &project_dir);

    let path = generate_trend_chart(
        &history,
        &config.charts_dir(&project_dir),
        &table,
        &column,
        &statistic,
        days.unwrap_or(config.report.default_days),
    )?;
    println!("📈 Trend chart written to {}", path.display());
    Ok(())
}
