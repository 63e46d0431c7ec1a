// vigil-core/src/domain/baseline.rs
//
// Last recorded statistics per table/column. A single-point store: drift is
// always measured against the most recent value, never a history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type StatisticMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineStatistics {
    tables: BTreeMap<String, BTreeMap<String, StatisticMap>>,
}

impl BaselineStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&StatisticMap> {
        self.tables.get(table)?.get(column)
    }

    /// A statistic as a float, if recorded and numeric.
    pub fn statistic(&self, table: &str, column: &str, statistic: &str) -> Option<f64> {
        self.column(table, column)?.get(statistic)?.as_f64()
    }

    pub fn has_statistic(&self, table: &str, column: &str, statistic: &str) -> bool {
        self.statistic(table, column, statistic).is_some()
    }

    /// Merge freshly computed statistics into the table/column slot.
    pub fn update(&mut self, table: &str, column: &str, stats: StatisticMap) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .extend(stats);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_and_lookup() {
        let mut baseline = BaselineStatistics::new();
        assert!(baseline.is_empty());

        let mut stats = StatisticMap::new();
        stats.insert("mean".into(), json!(42.5));
        stats.insert("count".into(), json!(10));
        baseline.update("payments", "cash_applied", stats);

        assert_eq!(baseline.statistic("payments", "cash_applied", "mean"), Some(42.5));
        assert!(baseline.has_statistic("payments", "cash_applied", "count"));
        assert!(!baseline.has_statistic("payments", "cash_applied", "median"));
        assert!(baseline.statistic("other", "cash_applied", "mean").is_none());
    }

    #[test]
    fn test_update_merges_in_place() {
        let mut baseline = BaselineStatistics::new();
        let mut first = StatisticMap::new();
        first.insert("mean".into(), json!(1.0));
        baseline.update("t", "c", first);

        let mut second = StatisticMap::new();
        second.insert("mean".into(), json!(2.0));
        second.insert("std".into(), json!(0.5));
        baseline.update("t", "c", second);

        assert_eq!(baseline.statistic("t", "c", "mean"), Some(2.0));
        assert_eq!(baseline.statistic("t", "c", "std"), Some(0.5));
    }

    #[test]
    fn test_json_round_trip() {
        let mut baseline = BaselineStatistics::new();
        let mut stats = StatisticMap::new();
        stats.insert("median".into(), json!(7.0));
        baseline.update("t", "c", stats);

        let text = serde_json::to_string(&baseline).unwrap();
        // Transparent: plain nested map on disk
        assert!(text.starts_with("{\"t\""));
        let reloaded: BaselineStatistics = serde_json::from_str(&text).unwrap();
        assert_eq!(reloaded.statistic("t", "c", "median"), Some(7.0));
    }
}
