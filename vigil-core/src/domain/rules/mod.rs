// vigil-core/src/domain/rules/mod.rs
//
// The quality-rule contract. The monitor holds a homogeneous collection of
// `Box<dyn QualityRule>` and never downcasts: each variant folds every
// degenerate input into its outcome instead of raising, so one bad rule can
// never abort evaluation of the rest of a table.

pub mod completeness;
pub mod drift;
pub mod foreign_key;
pub mod missing;
pub mod negative;
pub mod outliers;
pub mod pattern;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::baseline::BaselineStatistics;
use crate::domain::snapshot::TableSnapshot;

pub use completeness::CompletenessRule;
pub use drift::{DriftStatistic, StatisticalChangeRule};
pub use foreign_key::ForeignKeyRule;
pub use missing::MissingValuesRule;
pub use negative::NegativeValuesRule;
pub use outliers::{OutlierMethod, OutlierRule};
pub use pattern::PatternMatchRule;

pub type Details = serde_json::Map<String, Value>;

/// Default violation thresholds (fractions), matching the monitor defaults.
pub mod thresholds {
    pub const MISSING_VALUES: f64 = 0.05;
    pub const NEGATIVE_VALUES: f64 = 0.01;
    pub const OUTLIERS: f64 = 0.05;
    pub const STATISTICAL_CHANGE: f64 = 0.20;
    pub const PATTERN_MATCH: f64 = 0.05;
    pub const FOREIGN_KEY: f64 = 0.01;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Sort key: high first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Static identity of a rule, fixed at construction.
#[derive(Debug, Clone)]
pub struct RuleMeta {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Column the rule targets, when it targets one.
    pub column: Option<String>,
}

/// Result of one `evaluate` call. Recomputed from scratch every time.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub violated: bool,
    pub details: Details,
    pub remediation: Option<String>,
}

impl RuleOutcome {
    pub fn passed(details: Details) -> Self {
        Self {
            violated: false,
            details,
            remediation: None,
        }
    }

    pub fn violated(details: Details, remediation: String) -> Self {
        Self {
            violated: true,
            details,
            remediation: Some(remediation),
        }
    }

    /// Graceful degrade: the rule could not apply (schema/type problem).
    /// Not a violation, but the error is kept visible in the details.
    pub fn skipped(error: impl Into<String>) -> Self {
        let mut details = Details::new();
        details.insert("error".into(), Value::String(error.into()));
        Self {
            violated: false,
            details,
            remediation: None,
        }
    }

    /// Misconfiguration that must be visible in audits: violated with the
    /// error surfaced (missing target columns, foreign-key reference
    /// failures).
    pub fn misconfigured(error: impl Into<String>, remediation: String) -> Self {
        let error = error.into();
        let mut details = Details::new();
        details.insert("error".into(), Value::String(error));
        Self {
            violated: true,
            details,
            remediation: Some(remediation),
        }
    }
}

/// Shared evaluation context, injected by the monitor.
pub struct RuleContext<'a> {
    /// Last recorded statistics per table/column, for drift detection.
    pub baseline: Option<&'a BaselineStatistics>,
    /// Distinct-value lookup against the store, for referential checks.
    pub reference: Option<&'a dyn ReferenceLookup>,
}

impl<'a> RuleContext<'a> {
    pub fn empty() -> Self {
        Self {
            baseline: None,
            reference: None,
        }
    }

    pub fn with_baseline(baseline: &'a BaselineStatistics) -> Self {
        Self {
            baseline: Some(baseline),
            reference: None,
        }
    }
}

/// Distinct values of `reference_table.reference_column`, as canonical strings.
pub trait ReferenceLookup {
    fn distinct_values(&self, table: &str, column: &str) -> anyhow::Result<HashSet<String>>;
}

pub trait QualityRule {
    fn meta(&self) -> &RuleMeta;

    /// Idempotent: recomputes the full outcome from the snapshot each call.
    fn evaluate(&self, snapshot: &TableSnapshot, ctx: &RuleContext) -> RuleOutcome;

    /// Evaluate and bundle with the rule identity into a serializable report.
    fn report(&self, snapshot: &TableSnapshot, ctx: &RuleContext) -> RuleReport {
        let meta = self.meta();
        let outcome = self.evaluate(snapshot, ctx);
        RuleReport {
            name: meta.name.clone(),
            description: meta.description.clone(),
            severity: meta.severity,
            column: meta.column.clone(),
            violated: outcome.violated,
            details: outcome.details,
            remediation: outcome.remediation,
        }
    }
}

/// Serializable record of one rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleReport {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub violated: bool,
    pub details: Details,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

pub(crate) fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

pub(crate) fn percent(fraction: f64) -> f64 {
    fraction * 100.0
}
