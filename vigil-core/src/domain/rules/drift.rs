// vigil-core/src/domain/rules/drift.rs

use std::str::FromStr;

use serde_json::json;

use crate::domain::error::DomainError;
use crate::domain::rules::{
    percent, thresholds, Details, QualityRule, RuleContext, RuleMeta, RuleOutcome, Severity,
};
use crate::domain::snapshot::{ColumnKind, TableSnapshot};
use crate::domain::stats;

/// Which statistic of the column the drift check tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftStatistic {
    Mean,
    Median,
    Std,
    Min,
    Max,
    Count,
    Sum,
}

impl DriftStatistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatistic::Mean => "mean",
            DriftStatistic::Median => "median",
            DriftStatistic::Std => "std",
            DriftStatistic::Min => "min",
            DriftStatistic::Max => "max",
            DriftStatistic::Count => "count",
            DriftStatistic::Sum => "sum",
        }
    }

    /// Compute the statistic over non-null values.
    pub fn compute(&self, values: &[f64]) -> Option<f64> {
        match self {
            DriftStatistic::Count => Some(values.len() as f64),
            DriftStatistic::Sum => Some(values.iter().sum()),
            DriftStatistic::Mean => stats::mean(values),
            DriftStatistic::Std => {
                if values.is_empty() {
                    None
                } else {
                    Some(stats::sample_std(values))
                }
            }
            DriftStatistic::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                stats::median(&sorted)
            }
            DriftStatistic::Min => values.iter().copied().reduce(f64::min),
            DriftStatistic::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

impl FromStr for DriftStatistic {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(DriftStatistic::Mean),
            "median" => Ok(DriftStatistic::Median),
            "std" => Ok(DriftStatistic::Std),
            "min" => Ok(DriftStatistic::Min),
            "max" => Ok(DriftStatistic::Max),
            "count" => Ok(DriftStatistic::Count),
            "sum" => Ok(DriftStatistic::Sum),
            other => Err(DomainError::Computation(format!(
                "Invalid statistic: {other}"
            ))),
        }
    }
}

/// Compares the current value of a statistic against the baseline recorded by
/// the previous run. Never violates before a baseline exists.
pub struct StatisticalChangeRule {
    meta: RuleMeta,
    column: String,
    statistic: DriftStatistic,
    threshold: f64,
}

impl StatisticalChangeRule {
    pub fn new(
        column: impl Into<String>,
        statistic: DriftStatistic,
        threshold: Option<f64>,
    ) -> Self {
        let column = column.into();
        Self {
            meta: RuleMeta {
                name: format!("statistical_change_{}_{column}", statistic.as_str()),
                description: format!(
                    "Check for significant changes in {} of {column}",
                    statistic.as_str()
                ),
                severity: Severity::Medium,
                column: Some(column.clone()),
            },
            column,
            statistic,
            threshold: threshold.unwrap_or(thresholds::STATISTICAL_CHANGE),
        }
    }
}

impl QualityRule for StatisticalChangeRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &TableSnapshot, ctx: &RuleContext) -> RuleOutcome {
        // A rule aimed at a column that no longer exists is a configuration
        // fault, not a degenerate input: surface it in audits.
        let Some(column) = snapshot.column(&self.column) else {
            return RuleOutcome::misconfigured(
                format!("Column {} not found in data", self.column),
                format!(
                    "Column {} not found in data.\n\
                     Remediation steps:\n\
                     1. Verify the rule configuration names an existing column\n\
                     2. Check whether the column was renamed or dropped upstream",
                    self.column
                ),
            );
        };
        if column.kind() != ColumnKind::Numeric {
            return RuleOutcome::skipped(format!("Column {} is not numeric", self.column));
        }

        let values = column.numeric_values();
        let Some(current) = self.statistic.compute(&values) else {
            return RuleOutcome::skipped(format!(
                "Column {} has no values to compute {}",
                self.column,
                self.statistic.as_str()
            ));
        };

        let baseline_value = ctx.baseline.and_then(|b| {
            b.statistic(&snapshot.table, &self.column, self.statistic.as_str())
        });

        let mut details = Details::new();
        details.insert("current_value".into(), json!(current));
        details.insert("threshold".into(), json!(self.threshold));

        // First observation: record, never violate. The monitor seeds the
        // baseline on its next refresh.
        let Some(baseline_value) = baseline_value else {
            details.insert("baseline_value".into(), json!(null));
            details.insert("change_percentage".into(), json!(0.0));
            return RuleOutcome::passed(details);
        };

        let change_pct = if baseline_value == 0.0 {
            if current != 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            (current - baseline_value).abs() / baseline_value.abs()
        };

        details.insert("baseline_value".into(), json!(baseline_value));
        details.insert("change_percentage".into(), json!(change_pct));

        if change_pct > self.threshold {
            let direction = if current > baseline_value {
                "increased"
            } else {
                "decreased"
            };
            let remediation = format!(
                "Column {} {} has {} by {:.1}% (threshold: {:.1}%).\n\
                 Previous value: {:.2}, Current value: {:.2}\n\
                 Remediation steps:\n\
                 1. Verify if this change is expected due to business conditions\n\
                 2. Check for any process changes that might affect this metric\n\
                 3. Investigate data collection or processing changes\n\
                 4. Consider adjusting thresholds if this change is the new normal",
                self.column,
                self.statistic.as_str(),
                direction,
                percent(change_pct),
                percent(self.threshold),
                baseline_value,
                current
            );
            RuleOutcome::violated(details, remediation)
        } else {
            RuleOutcome::passed(details)
        }
    }
}
