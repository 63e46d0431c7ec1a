// vigil-core/src/domain/rules/missing.rs

use serde_json::json;

use crate::domain::rules::{
    fraction, percent, thresholds, Details, QualityRule, RuleContext, RuleMeta, RuleOutcome,
    Severity,
};
use crate::domain::snapshot::TableSnapshot;

/// Violated when the fraction of nulls in a column exceeds the threshold
/// (strict comparison: exactly at the threshold is acceptable).
pub struct MissingValuesRule {
    meta: RuleMeta,
    column: String,
    threshold: f64,
}

impl MissingValuesRule {
    pub fn new(column: impl Into<String>, threshold: Option<f64>) -> Self {
        let column = column.into();
        Self {
            meta: RuleMeta {
                name: format!("missing_values_{column}"),
                description: format!("Check for missing values in {column}"),
                severity: Severity::Medium,
                column: Some(column.clone()),
            },
            column,
            threshold: threshold.unwrap_or(thresholds::MISSING_VALUES),
        }
    }
}

impl QualityRule for MissingValuesRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &TableSnapshot, _ctx: &RuleContext) -> RuleOutcome {
        let Some(column) = snapshot.column(&self.column) else {
            return RuleOutcome::skipped(format!("Column {} not found in data", self.column));
        };

        let total = snapshot.row_count();
        let missing = column.data.null_count();
        let missing_pct = fraction(missing, total);

        let mut details = Details::new();
        details.insert("missing_count".into(), json!(missing));
        details.insert("total_count".into(), json!(total));
        details.insert("missing_percentage".into(), json!(missing_pct));
        details.insert("threshold".into(), json!(self.threshold));

        if missing_pct > self.threshold {
            let remediation = format!(
                "Column {} has {:.1}% missing values (threshold: {:.1}%).\n\
                 Remediation steps:\n\
                 1. Identify the source of missing data\n\
                 2. Update data collection process to ensure completeness\n\
                 3. Consider implementing data validation at entry points\n\
                 4. For existing data, evaluate imputation strategies if appropriate",
                self.column,
                percent(missing_pct),
                percent(self.threshold)
            );
            RuleOutcome::violated(details, remediation)
        } else {
            RuleOutcome::passed(details)
        }
    }
}
