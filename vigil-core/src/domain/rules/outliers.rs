// vigil-core/src/domain/rules/outliers.rs

use std::str::FromStr;

use serde_json::json;

use crate::domain::error::DomainError;
use crate::domain::rules::{
    fraction, percent, thresholds, Details, QualityRule, RuleContext, RuleMeta, RuleOutcome,
    Severity,
};
use crate::domain::snapshot::{ColumnKind, TableSnapshot};
use crate::domain::stats;

/// Outlier bound strategy. Parsed at the configuration boundary so an invalid
/// method name is rejected before a rule ever exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMethod {
    /// Bounds `[Q1 - k*IQR, Q3 + k*IQR]`.
    Iqr,
    /// Bounds `[mean - k*std, mean + k*std]`.
    Std,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Std => "std",
        }
    }

    /// Conventional multiplier for the method (1.5 for IQR, 3 for std).
    pub fn default_factor(&self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::Std => 3.0,
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "std" => Ok(OutlierMethod::Std),
            other => Err(DomainError::Computation(format!(
                "Invalid outlier method: {other}"
            ))),
        }
    }
}

/// Violated when the fraction of values outside the method's bounds exceeds
/// the threshold.
pub struct OutlierRule {
    meta: RuleMeta,
    column: String,
    method: OutlierMethod,
    factor: f64,
    threshold: f64,
}

impl OutlierRule {
    pub fn new(
        column: impl Into<String>,
        method: OutlierMethod,
        factor: Option<f64>,
        threshold: Option<f64>,
    ) -> Self {
        let column = column.into();
        Self {
            meta: RuleMeta {
                name: format!("outliers_{column}"),
                description: format!("Check for outliers in {column}"),
                severity: Severity::Medium,
                column: Some(column.clone()),
            },
            column,
            factor: factor.unwrap_or_else(|| method.default_factor()),
            method,
            threshold: threshold.unwrap_or(thresholds::OUTLIERS),
        }
    }

    fn bounds(&self, values: &[f64]) -> Option<(f64, f64)> {
        match self.method {
            OutlierMethod::Iqr => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let q1 = stats::quantile(&sorted, 0.25)?;
                let q3 = stats::quantile(&sorted, 0.75)?;
                let iqr = q3 - q1;
                Some((q1 - self.factor * iqr, q3 + self.factor * iqr))
            }
            OutlierMethod::Std => {
                let mean = stats::mean(values)?;
                let std = stats::sample_std(values);
                Some((mean - self.factor * std, mean + self.factor * std))
            }
        }
    }
}

impl QualityRule for OutlierRule {
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
        let Some((lower, upper)) = self.bounds(&values) else {
            return RuleOutcome::skipped(format!("Column {} has no values to bound", self.column));
        };

        let outliers: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| *v < lower || *v > upper)
            .collect();
        let outlier_pct = fraction(outliers.len(), values.len());

        let mut details = Details::new();
        details.insert("lower_bound".into(), json!(lower));
        details.insert("upper_bound".into(), json!(upper));
        details.insert("outlier_count".into(), json!(outliers.len()));
        details.insert("total_count".into(), json!(values.len()));
        details.insert("outlier_percentage".into(), json!(outlier_pct));
        details.insert("threshold".into(), json!(self.threshold));
        details.insert("outlier_method".into(), json!(self.method.as_str()));
        details.insert(
            "example_outliers".into(),
            json!(outliers.iter().take(5).collect::<Vec<_>>()),
        );

        if outlier_pct > self.threshold {
            let examples = outliers
                .iter()
                .take(3)
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let remediation = format!(
                "Column {} has {:.1}% outliers (threshold: {:.1}%).\n\
                 Outlier definition: values outside [{:.2}, {:.2}]\n\
                 Examples: {}\n\
                 Remediation steps:\n\
                 1. Verify if these values are valid or errors\n\
                 2. Implement data validation to flag potential outliers\n\
                 3. Investigate business processes that might be causing extreme values\n\
                 4. Consider data transformation or normalization techniques",
                self.column,
                percent(outlier_pct),
                percent(self.threshold),
                lower,
                upper,
                examples
            );
            RuleOutcome::violated(details, remediation)
        } else {
            RuleOutcome::passed(details)
        }
    }
}
