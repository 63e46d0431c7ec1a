// vigil-core/src/domain/stats.rs
//
// Column statistics. Quantiles use linear interpolation so that profile and
// outlier bounds line up with the historical baselines produced by the
// previous system.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde_json::{json, Value};

use crate::domain::snapshot::{Column, ColumnData};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (ddof = 1). Returns 0.0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    // mean() is Some here since n >= 2
    let m = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Linear-interpolation quantile over an ascending-sorted slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

pub fn median(sorted: &[f64]) -> Option<f64> {
    quantile(sorted, 0.5)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Full numeric profile: the statistic map persisted in baselines and checks.
pub fn numeric_profile(values: &[f64], missing: usize) -> BTreeMap<String, Value> {
    let mut stats = BTreeMap::new();
    stats.insert("count".into(), json!(values.len()));
    stats.insert("missing".into(), json!(missing));

    if values.is_empty() {
        return stats;
    }

    let sorted = sorted_copy(values);
    let m = values.iter().sum::<f64>() / values.len() as f64;

    stats.insert("mean".into(), json!(m));
    if let Some(med) = median(&sorted) {
        stats.insert("median".into(), json!(med));
    }
    stats.insert("std".into(), json!(sample_std(values)));
    stats.insert("min".into(), json!(sorted[0]));
    stats.insert("max".into(), json!(sorted[sorted.len() - 1]));
    stats.insert(
        "negative_count".into(),
        json!(values.iter().filter(|v| **v < 0.0).count()),
    );
    stats.insert(
        "zero_count".into(),
        json!(values.iter().filter(|v| **v == 0.0).count()),
    );

    for (label, q) in [
        ("p01", 0.01),
        ("p05", 0.05),
        ("p25", 0.25),
        ("p75", 0.75),
        ("p95", 0.95),
        ("p99", 0.99),
    ] {
        if let Some(v) = quantile(&sorted, q) {
            stats.insert(label.into(), json!(v));
        }
    }

    if let (Some(Value::Number(p25)), Some(Value::Number(p75))) =
        (stats.get("p25").cloned(), stats.get("p75").cloned())
    {
        let iqr = p75.as_f64().unwrap_or(0.0) - p25.as_f64().unwrap_or(0.0);
        stats.insert("iqr".into(), json!(iqr));
    }

    stats
}

/// Profile for text/date columns: count, missing, unique, top-5 frequency map.
pub fn text_profile(values: &[&str], missing: usize) -> BTreeMap<String, Value> {
    let mut stats = BTreeMap::new();
    stats.insert("count".into(), json!(values.len()));
    stats.insert("missing".into(), json!(missing));

    let mut freq: HashMap<&str, u64> = HashMap::new();
    for v in values {
        *freq.entry(v).or_insert(0) += 1;
    }
    stats.insert("unique".into(), json!(freq.len()));

    let mut entries: Vec<(&str, u64)> = freq.into_iter().collect();
    // Deterministic top-5: by count desc, then value asc
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let most_common: BTreeMap<String, u64> = entries
        .into_iter()
        .take(5)
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    stats.insert("most_common".into(), json!(most_common));

    stats
}

/// Profile any column according to its kind tag.
pub fn profile_column(column: &Column) -> BTreeMap<String, Value> {
    let missing = column.data.null_count();
    match &column.data {
        ColumnData::Numeric(_) => numeric_profile(&column.numeric_values(), missing),
        ColumnData::Text(_) => text_profile(&column.text_values(), missing),
    }
}
