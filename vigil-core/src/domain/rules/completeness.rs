// vigil-core/src/domain/rules/completeness.rs

use serde_json::json;

use crate::domain::rules::{
    Details, QualityRule, RuleContext, RuleMeta, RuleOutcome, Severity,
};
use crate::domain::snapshot::TableSnapshot;

/// Violated when any required column is absent from the snapshot schema.
pub struct CompletenessRule {
    meta: RuleMeta,
    required_columns: Vec<String>,
}

impl CompletenessRule {
    pub fn new(required_columns: Vec<String>) -> Self {
        Self {
            meta: RuleMeta {
                name: "completeness".into(),
                description: "Check if all required columns are present".into(),
                severity: Severity::High,
                column: None,
            },
            required_columns,
        }
    }
}

impl QualityRule for CompletenessRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &TableSnapshot, _ctx: &RuleContext) -> RuleOutcome {
        let missing: Vec<&String> = self
            .required_columns
            .iter()
            .filter(|c| !snapshot.has_column(c))
            .collect();

        let mut details = Details::new();
        details.insert("required_columns".into(), json!(self.required_columns));
        details.insert("missing_columns".into(), json!(missing));
        details.insert("missing_count".into(), json!(missing.len()));
        details.insert("total_required".into(), json!(self.required_columns.len()));

        if missing.is_empty() {
            RuleOutcome::passed(details)
        } else {
            let missing_str = missing
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let remediation = format!(
                "Missing required columns: {missing_str}\n\
                 Remediation steps:\n\
                 1. Add missing columns to the dataset\n\
                 2. Verify data collection process includes all required fields\n\
                 3. Check if column names have changed or are inconsistent\n\
                 4. Update data import/export processes to include all required columns"
            );
            RuleOutcome::violated(details, remediation)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::snapshot::Column;

    #[test]
    fn test_all_present_passes() {
        let snap = TableSnapshot::new(
            "t",
            vec![
                Column::numeric("a", vec![Some(1.0)]),
                Column::text("b", vec![Some("x".into())]),
            ],
        );
        let rule = CompletenessRule::new(vec!["a".into(), "b".into()]);
        assert!(!rule.evaluate(&snap, &RuleContext::empty()).violated);
    }

    #[test]
    fn test_absent_column_violates() {
        let snap = TableSnapshot::new("t", vec![Column::numeric("a", vec![Some(1.0)])]);
        let rule = CompletenessRule::new(vec!["a".into(), "b".into(), "c".into()]);
        let outcome = rule.evaluate(&snap, &RuleContext::empty());
        assert!(outcome.violated);
        assert_eq!(outcome.details["missing_columns"], json!(["b", "c"]));
        assert!(outcome.remediation.unwrap().contains("b, c"));
    }
}
