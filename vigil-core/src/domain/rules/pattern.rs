// vigil-core/src/domain/rules/pattern.rs

use regex::Regex;
use serde_json::json;

use crate::domain::error::DomainError;
use crate::domain::rules::{
    fraction, percent, thresholds, Details, QualityRule, RuleContext, RuleMeta, RuleOutcome,
    Severity,
};
use crate::domain::snapshot::{ColumnKind, TableSnapshot};

/// Violated when the fraction of values not matching the (start-anchored)
/// pattern exceeds the threshold.
pub struct PatternMatchRule {
    meta: RuleMeta,
    column: String,
    pattern: String,
    regex: Regex,
    threshold: f64,
}

impl PatternMatchRule {
    pub fn new(
        column: impl Into<String>,
        pattern: &str,
        name: Option<String>,
        threshold: Option<f64>,
    ) -> Result<Self, DomainError> {
        let column = column.into();
        // Anchor at the start so partial matches mid-string don't count
        let regex =
            Regex::new(&format!("^(?:{pattern})")).map_err(|source| DomainError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            meta: RuleMeta {
                name: name.unwrap_or_else(|| format!("pattern_{column}")),
                description: format!("Check if values in {column} match pattern {pattern}"),
                severity: Severity::Medium,
                column: Some(column.clone()),
            },
            column,
            pattern: pattern.to_string(),
            regex,
            threshold: threshold.unwrap_or(thresholds::PATTERN_MATCH),
        })
    }
}

impl QualityRule for PatternMatchRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &TableSnapshot, _ctx: &RuleContext) -> RuleOutcome {
        let Some(column) = snapshot.column(&self.column) else {
            return RuleOutcome::skipped(format!("Column {} not found in data", self.column));
        };
        if column.kind() == ColumnKind::Numeric {
            return RuleOutcome::skipped(format!("Column {} is not string type", self.column));
        }

        let values = column.text_values();
        let non_matching: Vec<&str> = values
            .iter()
            .copied()
            .filter(|v| !self.regex.is_match(v))
            .collect();
        let match_count = values.len() - non_matching.len();
        let match_pct = if values.is_empty() {
            1.0
        } else {
            fraction(match_count, values.len())
        };
        let non_match_pct = 1.0 - match_pct;

        let mut details = Details::new();
        details.insert("match_count".into(), json!(match_count));
        details.insert("total_count".into(), json!(values.len()));
        details.insert("match_percentage".into(), json!(match_pct));
        details.insert("non_match_percentage".into(), json!(non_match_pct));
        details.insert("threshold".into(), json!(self.threshold));
        details.insert(
            "example_non_matching".into(),
            json!(non_matching.iter().take(5).collect::<Vec<_>>()),
        );

        if non_match_pct > self.threshold {
            let examples = non_matching
                .iter()
                .take(3)
                .map(|v| format!("'{v}'"))
                .collect::<Vec<_>>()
                .join(", ");
            let remediation = format!(
                "Column {} has {:.1}% values not matching pattern '{}' (threshold: {:.1}%).\n\
                 Examples of non-matching values: {}\n\
                 Remediation steps:\n\
                 1. Verify if the pattern is correct for this column\n\
                 2. Implement data validation to ensure pattern compliance\n\
                 3. Standardize data entry processes\n\
                 4. Consider data cleansing for existing records",
                self.column,
                percent(non_match_pct),
                self.pattern,
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
    use crate::domain::snapshot::Column;

    fn email_snapshot(values: Vec<Option<String>>) -> TableSnapshot {
        TableSnapshot::new("t", vec![Column::text("email", values)])
    }

    #[test]
    fn test_non_matching_fraction_violates() {
        let snap = email_snapshot(vec![
            Some("a@b.com".into()),
            Some("not-an-email".into()),
            Some("c@d.org".into()),
            None,
        ]);
        let rule = PatternMatchRule::new(
            "email",
            r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
            Some("email_pattern_email".into()),
            Some(0.05),
        )
        .unwrap();
        let outcome = rule.evaluate(&snap, &RuleContext::empty());
        // 1 of 3 non-null values fails: 33% > 5%
        assert!(outcome.violated);
        assert_eq!(outcome.details["total_count"], json!(3));
        assert_eq!(outcome.details["example_non_matching"], json!(["not-an-email"]));
    }

    #[test]
    fn test_all_matching_passes() {
        let snap = email_snapshot(vec![Some("a@b.com".into()), Some("x@y.io".into())]);
        let rule = PatternMatchRule::new(
            "email",
            r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
            None,
            None,
        )
        .unwrap();
        assert!(!rule.evaluate(&snap, &RuleContext::empty()).violated);
    }

    #[test]
    fn test_anchored_at_start() {
        // "xx12345" must not count as a zip match
        let snap = TableSnapshot::new(
            "t",
            vec![Column::text("zip", vec![Some("xx12345".into())])],
        );
        let rule = PatternMatchRule::new("zip", r"\d{5}(-\d{4})?$", None, Some(0.0)).unwrap();
        assert!(rule.evaluate(&snap, &RuleContext::empty()).violated);
    }

    #[test]
    fn test_numeric_column_degrades() {
        let snap = TableSnapshot::new("t", vec![Column::numeric("zip", vec![Some(1.0)])]);
        let rule = PatternMatchRule::new("zip", r"\d{5}", None, None).unwrap();
        let outcome = rule.evaluate(&snap, &RuleContext::empty());
        assert!(!outcome.violated);
        assert!(outcome.details["error"]
            .as_str()
            .unwrap()
            .contains("not string type"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(PatternMatchRule::new("c", "([unclosed", None, None).is_err());
    }
}
