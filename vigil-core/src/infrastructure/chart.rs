// vigil-core/src/infrastructure/chart.rs
//
// PNG trend charts. The x axis is days since the first point in the series,
// which keeps the axis readable for both hourly and monthly check cadences.

use std::path::Path;

use chrono::{DateTime, Utc};
use plotters::prelude::*;

use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

const WIDTH: u32 = 900;
const HEIGHT: u32 = 500;

fn chart_err(e: impl std::fmt::Display) -> InfrastructureError {
    InfrastructureError::ChartError(e.to_string())
}

/// Render one statistic's time series as a line chart with point markers.
pub fn render_trend_chart(
    path: &Path,
    title: &str,
    y_label: &str,
    points: &[TrendPoint],
) -> Result<(), InfrastructureError> {
    if points.is_empty() {
        return Err(InfrastructureError::ChartError(format!(
            "no data points for '{title}'"
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let t0 = points[0].timestamp;
    let xs: Vec<f64> = points
        .iter()
        .map(|p| (p.timestamp - t0).num_seconds() as f64 / 86_400.0)
        .collect();

    let x_max = xs.last().copied().unwrap_or(0.0).max(1.0);
    let (mut y_min, mut y_max) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.value), hi.max(p.value))
    });
    // Flat series still need a visible band.
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = (y_max - y_min) * 0.1;

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(0.0..x_max, (y_min - pad)..(y_max + pad))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Days since first check")
        .y_desc(y_label)
        .draw()
        .map_err(chart_err)?;

    let series: Vec<(f64, f64)> = xs
        .iter()
        .zip(points)
        .map(|(x, p)| (*x, p.value))
        .collect();

    chart
        .draw_series(LineSeries::new(series.iter().copied(), &BLUE))
        .map_err(chart_err)?;
    chart
        .draw_series(
            series
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 3, BLUE.filled())),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Duration;
    use tempfile::tempdir;

    fn series(n: usize) -> Vec<TrendPoint> {
        let start = Utc::now() - Duration::days(n as i64);
        (0..n)
            .map(|i| TrendPoint {
                timestamp: start + Duration::days(i as i64),
                value: 100.0 + i as f64 * 2.5,
            })
            .collect()
    }

    #[test]
    fn test_renders_png_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("charts").join("payments_mean.png");
        render_trend_chart(&path, "payments.cash_applied mean", "mean", &series(10))?;

        let bytes = std::fs::read(&path)?;
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        Ok(())
    }

    #[test]
    fn test_single_point_and_flat_series_render() -> Result<()> {
        let dir = tempdir()?;
        render_trend_chart(
            &dir.path().join("single.png"),
            "t",
            "count",
            &series(1),
        )?;

        let flat: Vec<TrendPoint> = series(5)
            .into_iter()
            .map(|p| TrendPoint { value: 42.0, ..p })
            .collect();
        render_trend_chart(&dir.path().join("flat.png"), "t", "count", &flat)?;
        Ok(())
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let result = render_trend_chart(Path::new("/tmp/none.png"), "t", "mean", &[]);
        assert!(matches!(
            result,
            Err(InfrastructureError::ChartError(_))
        ));
    }
}
