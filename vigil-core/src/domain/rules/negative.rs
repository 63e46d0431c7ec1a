// vigil-core/src/domain/rules/negative.rs

use serde_json::json;

use crate::domain::rules::{
    fraction, percent, thresholds, Details, QualityRule, RuleContext, RuleMeta, RuleOutcome,
    Severity,
};
use crate::domain::snapshot::{ColumnKind, TableSnapshot};

/// Violated when the fraction of negative values among non-null entries of a
/// numeric column exceeds the threshold.
pub struct NegativeValuesRule {
    meta: RuleMeta,
    column: String,
    threshold: f64,
}

impl NegativeValuesRule {
    pub fn new(column: impl Into<String>, threshold: Option<f64>) -> Self {
        let column = column.into();
        Self {
            meta: RuleMeta {
                name: format!("negative_values_{column}"),
                description: format!("Check for negative values in {column}"),
                severity: Severity::High,
                column: Some(column.clone()),
            },
            column,
            threshold: threshold.unwrap_or(thresholds::NEGATIVE_VALUES),
        }
    }
}

impl QualityRule for NegativeValuesRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &TableSnapshot, _ctx: &RuleContext) -> RuleOutcome {
        let Some(column) = snapshot.column(&self.column) else {
            return RuleOutcome::skipped(format!("Column {} not found in data", self.column));
        };
        if column.kind() != ColumnKind::Numeric {
            return RuleOutcome::skipped(format!("Column {} is not numeric", self.column));
        }

        let values = column.numeric_values();
        let negatives: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
        let negative_pct = fraction(negatives.len(), values.len());

        let mut details = Details::new();
        details.insert("negative_count".into(), json!(negatives.len()));
        details.insert("total_count".into(), json!(values.len()));
        details.insert("negative_percentage".into(), json!(negative_pct));
        details.insert("threshold".into(), json!(self.threshold));
        details.insert(
            "example_negative_values".into(),
            json!(negatives.iter().take(5).collect::<Vec<_>>()),
        );

        if negative_pct > self.threshold {
            let examples = negatives
                .iter()
                .take(3)
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let remediation = format!(
                "Column {} has {:.1}% negative values (threshold: {:.1}%).\n\
                 Examples: {}\n\
                 Remediation steps:\n\
                 1. Verify if negative values are valid for this column\n\
                 2. If invalid, identify the source of negative values\n\
                 3. Implement data validation to prevent negative values\n\
                 4. Consider data correction for existing records",
                self.column,
                percent(negative_pct),
                percent(self.threshold),
                examples
            );
            RuleOutcome::violated(details, remediation)
        } else {
            RuleOutcome::passed(details)
        }
    }
}
