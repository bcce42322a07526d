//! Reference resolution and evaluation
//!
//! Resolution walks a fallback chain from the most specific scope to the
//! least specific one and stops at the first scope that has a bound for the
//! metric. Running off the end of the chain is an error; there is no implicit
//! "always pass" default.
//!
//! ```text
//! system:partition -> system:hardware_class -> system -> *
//!         |                                               |
//!         +----------- first bound found wins ------------+
//!                               |
//!                      evaluate(value, bound)
//!                               |
//!                  PASS / FAIL / INFO per metric
//!                               |
//!                RunVerdict (FAIL dominates, [] = INVALID)
//! ```

use crate::bound::ReferenceBound;
use crate::catalog::ReferenceCatalog;
use crate::config::{ResolverConfig, UnitPolicy};
use crate::context::ExecutionContext;
use crate::error::{ReferenceError, ReferenceResult};
use crate::report::{EvaluationResult, EvaluationWarning, RunVerdict, Verdict};
use crate::sample::MetricSample;
use crate::scope::ScopeKey;
use crate::table::ReferenceTable;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A bound together with the scope key that supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'t> {
    pub scope: &'t ScopeKey,
    pub bound: &'t ReferenceBound,
}

/// Find the bound for `metric`, trying `exact_key` and then each fallback key.
pub fn resolve_scoped<'t>(
    table: &'t ReferenceTable,
    exact_key: &ScopeKey,
    fallback_keys: &[ScopeKey],
    metric: &str,
) -> ReferenceResult<Resolved<'t>> {
    for key in std::iter::once(exact_key).chain(fallback_keys) {
        if let Some((scope, metrics)) = table.scope_entry(key) {
            if let Some(bound) = metrics.get(metric) {
                debug!(metric, scope = %scope, "Resolved reference");
                return Ok(Resolved { scope, bound });
            }
        }
    }
    let attempted = std::iter::once(exact_key)
        .chain(fallback_keys)
        .cloned()
        .collect();
    Err(ReferenceError::unresolved(metric, attempted))
}

/// Find the bound for `metric` along the fallback chain.
pub fn resolve<'t>(
    table: &'t ReferenceTable,
    exact_key: &ScopeKey,
    fallback_keys: &[ScopeKey],
    metric: &str,
) -> ReferenceResult<&'t ReferenceBound> {
    resolve_scoped(table, exact_key, fallback_keys, metric).map(|r| r.bound)
}

/// Classify `value` against `bound`.
///
/// - No thresholds: `INFO`, whatever the value.
/// - Zero target with thresholds: `PASS` iff `value >= 0`.
/// - Otherwise `PASS` iff `target*(1+lower) <= value <= target*(1+upper)`,
///   a missing threshold leaving that side open. `NaN` never passes.
pub fn evaluate(value: f64, bound: &ReferenceBound) -> Verdict {
    if bound.is_informational() {
        return Verdict::Info;
    }
    let (low, high) = bound.window();
    if low <= value && value <= high {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Build the full [`EvaluationResult`] for one metric value.
pub fn evaluate_metric(metric: &str, value: f64, bound: &ReferenceBound) -> EvaluationResult {
    let verdict = evaluate(value, bound);
    let (low, high) = bound.window();
    EvaluationResult {
        metric: metric.to_string(),
        value,
        bound: bound.clone(),
        verdict,
        low: low.is_finite().then_some(low),
        high: high.is_finite().then_some(high),
        scope: None,
        node: None,
    }
}

/// Evaluates runs against reference tables under a [`ResolverConfig`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    config: ResolverConfig,
}

impl ReferenceResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// See [`resolve`].
    pub fn resolve<'t>(
        &self,
        table: &'t ReferenceTable,
        exact_key: &ScopeKey,
        fallback_keys: &[ScopeKey],
        metric: &str,
    ) -> ReferenceResult<&'t ReferenceBound> {
        resolve(table, exact_key, fallback_keys, metric)
    }

    /// Resolve using the chain derived from `context`.
    pub fn resolve_in<'t>(
        &self,
        context: &ExecutionContext,
        table: &'t ReferenceTable,
        metric: &str,
    ) -> ReferenceResult<Resolved<'t>> {
        resolve_scoped(table, &context.exact_key(), &context.fallback_keys(), metric)
    }

    /// Evaluate all samples of a run; any FAIL fails the run, no samples is INVALID.
    pub fn evaluate_run(
        &self,
        samples: &[MetricSample],
        table: &ReferenceTable,
        exact_key: &ScopeKey,
        fallback_keys: &[ScopeKey],
    ) -> ReferenceResult<RunVerdict> {
        let mut results = Vec::with_capacity(samples.len());
        let mut warnings = Vec::new();
        for sample in samples {
            let result =
                self.evaluate_sample(sample, None, table, exact_key, fallback_keys, &mut warnings)?;
            results.push(result);
        }
        Ok(RunVerdict::from_results(results, warnings))
    }

    /// Evaluate per-node samples; every node's result keeps its node id.
    ///
    /// The overall status is the worst across nodes, and the failure list
    /// names exactly the failing (node, metric) pairs.
    pub fn evaluate_run_multi(
        &self,
        samples_by_node: &BTreeMap<String, Vec<MetricSample>>,
        table: &ReferenceTable,
        exact_key: &ScopeKey,
        fallback_keys: &[ScopeKey],
    ) -> ReferenceResult<RunVerdict> {
        let mut results = Vec::new();
        let mut warnings = Vec::new();
        for (node, samples) in samples_by_node {
            for sample in samples {
                let result = self.evaluate_sample(
                    sample,
                    Some(node.as_str()),
                    table,
                    exact_key,
                    fallback_keys,
                    &mut warnings,
                )?;
                results.push(result);
            }
        }
        let verdict = RunVerdict::from_results(results, warnings);
        if !verdict.failures.is_empty() {
            debug!(
                nodes = samples_by_node.len(),
                failing = verdict.failing_nodes().len(),
                "Per-node evaluation found underperforming nodes"
            );
        }
        Ok(verdict)
    }

    /// Select the table for the context's variant and evaluate along its chain.
    pub fn evaluate_context(
        &self,
        context: &ExecutionContext,
        catalog: &ReferenceCatalog,
        samples: &[MetricSample],
    ) -> ReferenceResult<RunVerdict> {
        let table = catalog.select(context.variant.as_deref())?;
        let verdict =
            self.evaluate_run(samples, table, &context.exact_key(), &context.fallback_keys())?;
        Ok(verdict.with_context(context.clone()))
    }

    /// Per-node form of [`evaluate_context`](Self::evaluate_context).
    pub fn evaluate_context_multi(
        &self,
        context: &ExecutionContext,
        catalog: &ReferenceCatalog,
        samples_by_node: &BTreeMap<String, Vec<MetricSample>>,
    ) -> ReferenceResult<RunVerdict> {
        let table = catalog.select(context.variant.as_deref())?;
        let verdict = self.evaluate_run_multi(
            samples_by_node,
            table,
            &context.exact_key(),
            &context.fallback_keys(),
        )?;
        Ok(verdict.with_context(context.clone()))
    }

    fn evaluate_sample(
        &self,
        sample: &MetricSample,
        node: Option<&str>,
        table: &ReferenceTable,
        exact_key: &ScopeKey,
        fallback_keys: &[ScopeKey],
        warnings: &mut Vec<EvaluationWarning>,
    ) -> ReferenceResult<EvaluationResult> {
        let Resolved { scope, bound } =
            resolve_scoped(table, exact_key, fallback_keys, &sample.name)?;

        if let Some(w) = self.check_unit(sample, bound)? {
            warnings.push(w);
        }
        if bound.is_degenerate() {
            warn!(
                metric = %sample.name,
                node = node.unwrap_or(""),
                scope = %scope,
                value = sample.value,
                "Reference target is 0; checking only that the value is non-negative"
            );
            warnings.push(EvaluationWarning::DegenerateTarget {
                metric: sample.name.clone(),
                node: node.map(str::to_string),
                scope: Some(scope.clone()),
            });
        }

        let mut result = evaluate_metric(&sample.name, sample.value, bound).with_scope(scope.clone());
        if let Some(node) = node {
            result = result.with_node(node);
        }
        Ok(result)
    }

    fn check_unit(
        &self,
        sample: &MetricSample,
        bound: &ReferenceBound,
    ) -> ReferenceResult<Option<EvaluationWarning>> {
        if sample.unit.is_empty() || sample.unit == bound.unit {
            return Ok(None);
        }
        match self.config.unit_policy {
            UnitPolicy::Ignore => Ok(None),
            UnitPolicy::Warn => {
                warn!(
                    metric = %sample.name,
                    sample_unit = %sample.unit,
                    reference_unit = %bound.unit,
                    "Sample unit differs from reference unit"
                );
                Ok(Some(EvaluationWarning::UnitMismatch {
                    metric: sample.name.clone(),
                    sample_unit: sample.unit.clone(),
                    reference_unit: bound.unit.clone(),
                }))
            }
            UnitPolicy::Reject => Err(ReferenceError::UnitMismatch {
                metric: sample.name.clone(),
                sample_unit: sample.unit.clone(),
                reference_unit: bound.unit.clone(),
            }),
        }
    }
}
