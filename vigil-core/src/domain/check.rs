// vigil-core/src/domain/check.rs
//
// One execution of a rule set against a table snapshot. Persisted as JSON
// immediately after it runs; the embedded statistics feed trend charts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::baseline::StatisticMap;
use crate::domain::rules::RuleReport;
use crate::ports::IssueSink;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheck {
    pub check_id: String,
    pub table: String,
    pub timestamp: DateTime<Utc>,
    /// Every rule evaluated, in evaluation order.
    pub rules: Vec<RuleReport>,
    /// The violated subset, duplicated for direct consumption by reports.
    pub violations: Vec<RuleReport>,
    pub violation_count: usize,
    pub total_rules: usize,
    /// Per-column statistics at check time, keyed by column name.
    #[serde(default)]
    pub statistics: BTreeMap<String, StatisticMap>,
}

impl QualityCheck {
    pub fn new(
        table: impl Into<String>,
        rules: Vec<RuleReport>,
        statistics: BTreeMap<String, StatisticMap>,
    ) -> Self {
        Self::at(table, rules, statistics, Utc::now())
    }

    pub fn at(
        table: impl Into<String>,
        rules: Vec<RuleReport>,
        statistics: BTreeMap<String, StatisticMap>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let table = table.into();
        let violations: Vec<RuleReport> = rules.iter().filter(|r| r.violated).cloned().collect();
        // Millisecond component keeps rapid successive checks on one table
        // from colliding.
        let check_id = format!("{}_{}", table, timestamp.format("%Y%m%d%H%M%S%3f"));
        Self {
            check_id,
            table,
            timestamp,
            violation_count: violations.len(),
            total_rules: rules.len(),
            rules,
            violations,
            statistics,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable digest of the violations.
    pub fn summary(&self) -> String {
        if self.violations.is_empty() {
            return format!("No data quality issues found in {}", self.table);
        }

        let mut summary = format!(
            "Found {} data quality issues in {}:\n",
            self.violations.len(),
            self.table
        );
        for rule in &self.violations {
            summary.push_str(&format!("- {}: {}\n", rule.name, rule.description));
            if let Some(column) = &rule.column {
                summary.push_str(&format!("  Column: {column}\n"));
            }
            summary.push_str(&format!("  Severity: {}\n", rule.severity.as_str()));
            summary.push_str(&format!(
                "  Details: {}\n",
                serde_json::Value::Object(rule.details.clone())
            ));
            if let Some(remediation) = &rule.remediation {
                summary.push_str(&format!("  Remediation: {remediation}\n"));
            }
            summary.push('\n');
        }
        summary
    }

    /// Forward each violation to the structured issue sink.
    pub fn log_violations(&self, sink: &dyn IssueSink) {
        for rule in &self.violations {
            let count = rule
                .details
                .get("total_count")
                .and_then(|v| v.as_u64());
            sink.record_issue(
                &self.table,
                rule.column.as_deref().unwrap_or(""),
                &format!("{}: {}", rule.name, rule.description),
                count,
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::rules::{Details, RuleReport, Severity};
    use std::sync::Mutex;

    fn report(name: &str, violated: bool) -> RuleReport {
        RuleReport {
            name: name.into(),
            description: format!("desc of {name}"),
            severity: Severity::Medium,
            column: Some("amount".into()),
            violated,
            details: Details::new(),
            remediation: violated.then(|| "fix it".into()),
        }
    }

    #[test]
    fn test_violations_subset_and_counts() {
        let check = QualityCheck::new(
            "payments",
            vec![report("a", false), report("b", true), report("c", true)],
            BTreeMap::new(),
        );
        assert_eq!(check.total_rules, 3);
        assert_eq!(check.violation_count, 2);
        assert!(check.check_id.starts_with("payments_"));
        assert!(check.summary().contains("Found 2 data quality issues"));
    }

    #[test]
    fn test_json_round_trip() {
        let check = QualityCheck::new(
            "payments",
            vec![report("a", true), report("b", false)],
            BTreeMap::new(),
        );
        let json = check.to_json().unwrap();
        let reloaded: QualityCheck = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.violation_count, check.violation_count);
        assert_eq!(
            reloaded.rules.iter().map(|r| &r.name).collect::<Vec<_>>(),
            check.rules.iter().map(|r| &r.name).collect::<Vec<_>>()
        );
        assert_eq!(reloaded.check_id, check.check_id);
    }

    #[test]
    fn test_check_ids_do_not_collide_across_timestamps() {
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::milliseconds(1);
        let c1 = QualityCheck::at("t", vec![], BTreeMap::new(), t1);
        let c2 = QualityCheck::at("t", vec![], BTreeMap::new(), t2);
        assert_ne!(c1.check_id, c2.check_id);
    }

    struct RecordingSink(Mutex<Vec<(String, String, String, Option<u64>)>>);

    impl crate::ports::IssueSink for RecordingSink {
        fn record_issue(&self, table: &str, column: &str, issue: &str, count: Option<u64>) {
            self.0.lock().unwrap().push((
                table.to_string(),
                column.to_string(),
                issue.to_string(),
                count,
            ));
        }
    }

    #[test]
    fn test_log_violations_forwards_only_violations() {
        let check = QualityCheck::new(
            "payments",
            vec![report("ok_rule", false), report("bad_rule", true)],
            BTreeMap::new(),
        );
        let sink = RecordingSink(Mutex::new(Vec::new()));
        check.log_violations(&sink);
        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "payments");
        assert_eq!(seen[0].1, "amount");
        assert!(seen[0].2.contains("bad_rule"));
    }
}
