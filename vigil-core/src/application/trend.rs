// vigil-core/src/application/trend.rs
//
// Trend charts are rebuilt from the statistics embedded in persisted checks,
// so the baseline file can stay a single-value drift reference.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use tracing::info;

use crate::error::VigilError;
use crate::infrastructure::chart::{render_trend_chart, TrendPoint};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::history::CheckHistory;

/// Time series of one statistic for `table.column` within the lookback
/// window, oldest first. Checks that predate statistic embedding simply
/// contribute no point.
pub fn trend_series(
    history: &CheckHistory,
    table: &str,
    column: &str,
    statistic: &str,
    days: i64,
) -> Result<Vec<TrendPoint>, VigilError> {
    let cutoff = Utc::now() - Duration::days(days);
    let checks = history.load_since(cutoff, Some(&[table.to_string()]))?;

    Ok(checks
        .iter()
        .filter_map(|check| {
            let value = check
                .statistics
                .get(column)?
                .get(statistic)?
                .as_f64()?;
            Some(TrendPoint {
                timestamp: check.timestamp,
                value,
            })
        })
        .collect())
}

/// Render `{table}_{column}_{statistic}.png` under `charts_dir`. An empty
/// series is an error: there is nothing honest to draw.
pub fn generate_trend_chart(
    history: &CheckHistory,
    charts_dir: &Path,
    table: &str,
    column: &str,
    statistic: &str,
    days: i64,
) -> Result<PathBuf, VigilError> {
    let points = trend_series(history, table, column, statistic, days)?;
    if points.is_empty() {
        return Err(InfrastructureError::ChartError(format!(
            "no recorded checks carry {statistic} for {table}.{column} in the last {days} days"
        ))
        .into());
    }

    let path = charts_dir.join(format!("{table}_{column}_{statistic}.png"));
    render_trend_chart(
        &path,
        &format!("{table}.{column} {statistic} over time"),
        statistic,
        &points,
    )?;
    info!(path = ?path, points = points.len(), "Trend chart rendered");
    Ok(path)
}
