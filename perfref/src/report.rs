//! Evaluation results and run verdicts
//!
//! A [`RunVerdict`] is the terminal output of one evaluation: the overall
//! status, every per-metric result, an itemised list of failures carrying
//! enough detail to reproduce the check without the benchmark output, and
//! the non-fatal warnings raised on the way.

use crate::bound::ReferenceBound;
use crate::context::ExecutionContext;
use crate::scope::ScopeKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Verdict for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Value inside the tolerance window
    Pass,
    /// Value outside the tolerance window
    Fail,
    /// Bound has no thresholds; recorded, not judged
    Info,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pass,
    Fail,
    /// Nothing was evaluated; never to be read as success
    Invalid,
}

impl RunStatus {
    /// Process exit code: PASS 0, FAIL 1, INVALID 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
            Self::Invalid => 2,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Outcome of checking one value against one bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub metric: String,
    pub value: f64,
    pub bound: ReferenceBound,
    pub verdict: Verdict,
    /// Effective lower limit; `None` when unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Effective upper limit; `None` when unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    /// Scope key that supplied the bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeKey>,
    /// Node that produced the value, for per-node evaluations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl EvaluationResult {
    pub fn with_scope(mut self, scope: ScopeKey) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// `node/metric` for per-node results, otherwise the metric name.
    pub fn label(&self) -> String {
        match &self.node {
            Some(node) => format!("{}/{}", node, self.metric),
            None => self.metric.clone(),
        }
    }

    fn failure(&self) -> Option<FailureDetail> {
        (self.verdict == Verdict::Fail).then(|| FailureDetail {
            metric: self.metric.clone(),
            node: self.node.clone(),
            value: self.value,
            target: self.bound.target,
            low: self.low,
            high: self.high,
            unit: self.bound.unit.clone(),
        })
    }
}

/// Everything needed to explain one failing check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub value: f64,
    pub target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    pub unit: String,
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "[{}] ", node)?;
        }
        write!(
            f,
            "{}: {} {} outside [{}, {}] (target {})",
            self.metric,
            self.value,
            self.unit,
            fmt_limit(self.low, "-inf"),
            fmt_limit(self.high, "+inf"),
            self.target
        )
    }
}

fn fmt_limit(limit: Option<f64>, open: &str) -> String {
    limit.map_or_else(|| open.to_string(), |v| format!("{:.2}", v))
}

/// Non-fatal conditions noticed during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationWarning {
    /// Target is 0 with thresholds; only the sign of the value was checked
    DegenerateTarget {
        metric: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<ScopeKey>,
    },
    /// Sample and reference units differ
    UnitMismatch {
        metric: String,
        sample_unit: String,
        reference_unit: String,
    },
}

impl std::fmt::Display for EvaluationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateTarget { metric, node, .. } => {
                write!(f, "degenerate target 0 for '{}'", metric)?;
                if let Some(node) = node {
                    write!(f, " on {}", node)?;
                }
                Ok(())
            }
            Self::UnitMismatch {
                metric,
                sample_unit,
                reference_unit,
            } => write!(
                f,
                "unit mismatch for '{}': sample '{}', reference '{}'",
                metric, sample_unit, reference_unit
            ),
        }
    }
}

/// Aggregate verdict for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunVerdict {
    pub overall: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ExecutionContext>,
    pub results: Vec<EvaluationResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EvaluationWarning>,
    pub evaluated_at: DateTime<Utc>,
}

impl RunVerdict {
    /// Aggregate results: FAIL dominates, no results is INVALID.
    pub fn from_results(results: Vec<EvaluationResult>, warnings: Vec<EvaluationWarning>) -> Self {
        let overall = if results.is_empty() {
            RunStatus::Invalid
        } else if results.iter().any(|r| r.verdict == Verdict::Fail) {
            RunStatus::Fail
        } else {
            RunStatus::Pass
        };
        let failures = results.iter().filter_map(EvaluationResult::failure).collect();
        Self {
            overall,
            context: None,
            results,
            failures,
            warnings,
            evaluated_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_pass(&self) -> bool {
        self.overall == RunStatus::Pass
    }

    pub fn exit_code(&self) -> i32 {
        self.overall.exit_code()
    }

    /// Nodes with at least one failing metric.
    pub fn failing_nodes(&self) -> BTreeSet<&str> {
        self.failures
            .iter()
            .filter_map(|f| f.node.as_deref())
            .collect()
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.results.iter().filter(|r| r.verdict == verdict).count()
    }

    /// Format as a human-readable summary.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let header = match &self.context {
            Some(ctx) => format!("Performance check {}", ctx),
            None => "Performance check".to_string(),
        };
        lines.push(format!(
            "{}: {} pass, {} fail, {} info [{}]",
            header,
            self.count(Verdict::Pass),
            self.count(Verdict::Fail),
            self.count(Verdict::Info),
            self.overall,
        ));

        for r in &self.results {
            let window = match r.verdict {
                Verdict::Info => "informational".to_string(),
                _ => format!(
                    "[{}, {}]",
                    fmt_limit(r.low, "-inf"),
                    fmt_limit(r.high, "+inf")
                ),
            };
            let scope = r
                .scope
                .as_ref()
                .map(|s| format!(" via {}", s))
                .unwrap_or_default();
            lines.push(format!(
                "  [{}] {}: {} {} {}{}",
                r.verdict,
                r.label(),
                r.value,
                r.bound.unit,
                window,
                scope
            ));
        }

        let nodes = self.failing_nodes();
        if !nodes.is_empty() {
            lines.push(format!(
                "  Failing nodes: {}",
                nodes.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
        for w in &self.warnings {
            lines.push(format!("  warning: {}", w));
        }
        if self.overall == RunStatus::Invalid {
            lines.push("  No samples were evaluated".to_string());
        }

        lines.join("\n")
    }

    /// Emit one structured event per result.
    pub fn log(&self) {
        let context = self
            .context
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        for r in &self.results {
            match r.verdict {
                Verdict::Fail => warn!(
                    context = %context,
                    metric = %r.metric,
                    node = r.node.as_deref().unwrap_or(""),
                    value = r.value,
                    target = r.bound.target,
                    low = r.low,
                    high = r.high,
                    unit = %r.bound.unit,
                    "Performance reference not met"
                ),
                verdict => info!(
                    context = %context,
                    metric = %r.metric,
                    node = r.node.as_deref().unwrap_or(""),
                    value = r.value,
                    unit = %r.bound.unit,
                    verdict = %verdict,
                    "Performance value"
                ),
            }
        }
        info!(
            context = %context,
            overall = %self.overall,
            failures = self.failures.len(),
            "Performance check finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(metric: &str, value: f64, verdict: Verdict) -> EvaluationResult {
        EvaluationResult {
            metric: metric.to_string(),
            value,
            bound: ReferenceBound::within(100.0, 0.1, "GB/s"),
            verdict,
            low: Some(90.0),
            high: Some(110.0),
            scope: None,
            node: None,
        }
    }

    #[test]
    fn test_fail_dominates() {
        let verdict = RunVerdict::from_results(
            vec![
                result("a", 100.0, Verdict::Pass),
                result("b", 100.0, Verdict::Pass),
                result("c", 50.0, Verdict::Fail),
            ],
            Vec::new(),
        );
        assert_eq!(verdict.overall, RunStatus::Fail);
        assert_eq!(verdict.failures.len(), 1);
        assert_eq!(verdict.failures[0].metric, "c");
        assert_eq!(verdict.exit_code(), 1);
    }

    #[test]
    fn test_info_does_not_fail() {
        let verdict = RunVerdict::from_results(
            vec![
                result("a", 100.0, Verdict::Pass),
                result("t", 70.0, Verdict::Info),
                result("b", 100.0, Verdict::Pass),
            ],
            Vec::new(),
        );
        assert!(verdict.is_pass());
        assert!(verdict.failures.is_empty());
    }

    #[test]
    fn test_empty_is_invalid() {
        let verdict = RunVerdict::from_results(Vec::new(), Vec::new());
        assert_eq!(verdict.overall, RunStatus::Invalid);
        assert_ne!(verdict.overall, RunStatus::Pass);
        assert_eq!(verdict.exit_code(), 2);
        assert!(verdict.summary().contains("No samples were evaluated"));
    }

    #[test]
    fn test_summary_lists_failing_nodes() {
        let verdict = RunVerdict::from_results(
            vec![
                result("gpu_perf_min", 50.0, Verdict::Fail).with_node("b-cn1201"),
                result("gpu_perf_min", 100.0, Verdict::Pass).with_node("b-cn1202"),
            ],
            Vec::new(),
        )
        .with_context(ExecutionContext::new("kebnekaise", "2xV100"));
        let summary = verdict.summary();
        assert!(summary.starts_with("Performance check kebnekaise:2xV100: 1 pass, 1 fail"));
        assert!(summary.contains("[FAIL] b-cn1201/gpu_perf_min"));
        assert!(summary.contains("Failing nodes: b-cn1201"));
        assert!(!summary.contains("Failing nodes: b-cn1201, b-cn1202"));
    }

    #[test]
    fn test_failure_detail_display() {
        let detail = result("triad", 85000.0, Verdict::Fail).failure().unwrap();
        assert_eq!(
            detail.to_string(),
            "triad: 85000 GB/s outside [90.00, 110.00] (target 100)"
        );
    }

    #[test]
    fn test_run_verdict_json_roundtrip() {
        let verdict = RunVerdict::from_results(
            vec![result("a", 50.0, Verdict::Fail)],
            vec![EvaluationWarning::UnitMismatch {
                metric: "a".to_string(),
                sample_unit: "MB/s".to_string(),
                reference_unit: "GB/s".to_string(),
            }],
        );
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"overall\":\"FAIL\""));
        assert!(json.contains("\"kind\":\"unit_mismatch\""));
        let restored: RunVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, verdict);
    }

    #[test]
    fn test_status_ordering() {
        assert!(RunStatus::Pass < RunStatus::Fail);
        assert!(RunStatus::Fail < RunStatus::Invalid);
    }
}
