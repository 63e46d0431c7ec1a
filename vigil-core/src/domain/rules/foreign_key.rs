// vigil-core/src/domain/rules/foreign_key.rs

use serde_json::json;

use crate::domain::rules::{
    fraction, percent, thresholds, Details, QualityRule, RuleContext, RuleMeta, RuleOutcome,
    Severity,
};
use crate::domain::snapshot::{ColumnData, TableSnapshot};

/// Canonical string form shared with the store adapter, so "1" and "1.0"
/// compare equal across numeric and text columns.
pub fn canonical_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// Violated when the fraction of values absent from the reference column
/// exceeds the threshold. A failing reference query is surfaced as a
/// violation so misconfiguration stays visible in audits; a missing store
/// connection only degrades.
pub struct ForeignKeyRule {
    meta: RuleMeta,
    column: String,
    reference_table: String,
    reference_column: String,
    threshold: f64,
}

impl ForeignKeyRule {
    pub fn new(
        column: impl Into<String>,
        reference_table: impl Into<String>,
        reference_column: impl Into<String>,
        threshold: Option<f64>,
    ) -> Self {
        let column = column.into();
        let reference_table = reference_table.into();
        let reference_column = reference_column.into();
        Self {
            meta: RuleMeta {
                name: format!("foreign_key_{column}"),
                description: format!(
                    "Check foreign key integrity for {column} referencing {reference_table}.{reference_column}"
                ),
                severity: Severity::High,
                column: Some(column.clone()),
            },
            column,
            reference_table,
            reference_column,
            threshold: threshold.unwrap_or(thresholds::FOREIGN_KEY),
        }
    }
}

impl QualityRule for ForeignKeyRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &TableSnapshot, ctx: &RuleContext) -> RuleOutcome {
        // Like a failing reference query, a missing source column is a
        // configuration fault and must stay visible in audits.
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

        let Some(reference) = ctx.reference else {
            return RuleOutcome::skipped("No store connection provided");
        };

        let reference_values =
            match reference.distinct_values(&self.reference_table, &self.reference_column) {
                Ok(values) => values,
                Err(e) => {
                    return RuleOutcome::misconfigured(
                        format!("Error checking foreign key: {e}"),
                        format!("Fix store error for {}.{}: {e}", self.reference_table, self.reference_column),
                    );
                }
            };

        let values: Vec<String> = match &column.data {
            ColumnData::Numeric(v) => v.iter().flatten().map(|x| canonical_value(*x)).collect(),
            ColumnData::Text(v) => v.iter().flatten().cloned().collect(),
        };

        let violations: Vec<&String> = values
            .iter()
            .filter(|v| !reference_values.contains(*v))
            .collect();
        let violation_pct = fraction(violations.len(), values.len());

        let mut details = Details::new();
        details.insert("violation_count".into(), json!(violations.len()));
        details.insert("total_count".into(), json!(values.len()));
        details.insert("violation_percentage".into(), json!(violation_pct));
        details.insert("threshold".into(), json!(self.threshold));
        details.insert(
            "example_violations".into(),
            json!(violations.iter().take(5).collect::<Vec<_>>()),
        );

        if violation_pct > self.threshold {
            let examples = violations
                .iter()
                .take(3)
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let remediation = format!(
                "Column {} has {:.1}% values not found in {}.{} (threshold: {:.1}%).\n\
                 Examples of violations: {}\n\
                 Remediation steps:\n\
                 1. Add missing values to the reference table\n\
                 2. Fix incorrect values in this column\n\
                 3. Implement referential integrity constraints\n\
                 4. Improve data entry validation to ensure valid references",
                self.column,
                percent(violation_pct),
                self.reference_table,
                self.reference_column,
                percent(self.threshold),
                examples
            );
            RuleOutcome::violated(details, remediation)
        } else {
            RuleOutcome::passed(details)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::rules::ReferenceLookup;
    use crate::domain::snapshot::Column;
    use std::collections::HashSet;

    struct FixedLookup(HashSet<String>);

    impl ReferenceLookup for FixedLookup {
        fn distinct_values(&self, _table: &str, _column: &str) -> anyhow::Result<HashSet<String>> {
            Ok(self.0.clone())
        }
    }

    struct FailingLookup;

    impl ReferenceLookup for FailingLookup {
        fn distinct_values(&self, table: &str, _column: &str) -> anyhow::Result<HashSet<String>> {
            anyhow::bail!("no such table: {table}")
        }
    }

    fn snap() -> TableSnapshot {
        TableSnapshot::new(
            "payments",
            vec![Column::numeric(
                "provider_id",
                vec![Some(1.0), Some(2.0), Some(99.0), None],
            )],
        )
    }

    #[test]
    fn test_orphan_values_violate() {
        let lookup = FixedLookup(["1".to_string(), "2".to_string()].into_iter().collect());
        let rule = ForeignKeyRule::new("provider_id", "providers", "provider_id", Some(0.01));
        let ctx = RuleContext {
            baseline: None,
            reference: Some(&lookup),
        };
        let outcome = rule.evaluate(&snap(), &ctx);
        assert!(outcome.violated);
        assert_eq!(outcome.details["violation_count"], json!(1));
        // Canonical form: integral floats compare as "99"
        assert_eq!(outcome.details["example_violations"], json!(["99"]));
    }

    #[test]
    fn test_no_connection_degrades() {
        let rule = ForeignKeyRule::new("provider_id", "providers", "provider_id", None);
        let outcome = rule.evaluate(&snap(), &RuleContext::empty());
        assert!(!outcome.violated);
        assert!(outcome.details["error"]
            .as_str()
            .unwrap()
            .contains("No store connection"));
    }

    #[test]
    fn test_reference_error_is_a_visible_violation() {
        let lookup = FailingLookup;
        let rule = ForeignKeyRule::new("provider_id", "nope", "provider_id", None);
        let ctx = RuleContext {
            baseline: None,
            reference: Some(&lookup),
        };
        let outcome = rule.evaluate(&snap(), &ctx);
        assert!(outcome.violated);
        assert!(outcome.details["error"]
            .as_str()
            .unwrap()
            .contains("no such table"));
    }

    #[test]
    fn test_missing_column_is_a_visible_violation() {
        let lookup = FixedLookup(["1".to_string()].into_iter().collect());
        let rule = ForeignKeyRule::new("provider_id", "providers", "provider_id", None);
        let ctx = RuleContext {
            baseline: None,
            reference: Some(&lookup),
        };
        let snapshot = TableSnapshot::new(
            "payments",
            vec![Column::numeric("billed_amount", vec![Some(1.0)])],
        );
        let outcome = rule.evaluate(&snapshot, &ctx);
        assert!(outcome.violated);
        assert!(outcome.details["error"]
            .as_str()
            .unwrap()
            .contains("not found"));
    }

    #[test]
    fn test_canonical_value() {
        assert_eq!(canonical_value(99.0), "99");
        assert_eq!(canonical_value(-5.0), "-5");
        assert_eq!(canonical_value(1.5), "1.5");
    }
}
