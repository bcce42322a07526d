//! Reference tables
//!
//! Immutable `scope -> metric -> bound` mapping, validated once when built.
//! Tables hold no interior mutability and can be shared freely between
//! concurrent evaluations.

use crate::bound::{RawBound, ReferenceBound};
use crate::error::{ReferenceError, ReferenceResult};
use crate::scope::ScopeKey;
use std::collections::BTreeMap;
use tracing::warn;

/// Bounds for each metric within one scope.
pub type MetricBounds = BTreeMap<String, ReferenceBound>;

/// Validated reference table for one test variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceTable {
    entries: BTreeMap<ScopeKey, MetricBounds>,
}

impl ReferenceTable {
    pub fn builder() -> ReferenceTableBuilder {
        ReferenceTableBuilder::default()
    }

    /// Build from string-keyed raw data, as read from a catalog file.
    pub fn from_raw(raw: &BTreeMap<String, BTreeMap<String, RawBound>>) -> ReferenceResult<Self> {
        let mut builder = Self::builder();
        for (scope, metrics) in raw {
            let key: ScopeKey = scope.parse()?;
            for (metric, bound) in metrics {
                builder = builder.bound(key.clone(), metric, bound.clone().into());
            }
        }
        builder.build()
    }

    /// Bound for `metric` under exactly `scope`, no fallback.
    pub fn get(&self, scope: &ScopeKey, metric: &str) -> Option<&ReferenceBound> {
        self.entries.get(scope).and_then(|m| m.get(metric))
    }

    pub fn scope(&self, scope: &ScopeKey) -> Option<&MetricBounds> {
        self.entries.get(scope)
    }

    /// Stored key and bounds for `scope`.
    pub fn scope_entry(&self, scope: &ScopeKey) -> Option<(&ScopeKey, &MetricBounds)> {
        self.entries.get_key_value(scope)
    }

    pub fn contains_scope(&self, scope: &ScopeKey) -> bool {
        self.entries.contains_key(scope)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScopeKey, &MetricBounds)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (scope, metric) bounds.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Convert back to the string-keyed file form.
    pub fn to_raw(&self) -> BTreeMap<String, BTreeMap<String, RawBound>> {
        self.entries
            .iter()
            .map(|(scope, metrics)| {
                let metrics = metrics
                    .iter()
                    .map(|(name, bound)| (name.clone(), RawBound::from(bound)))
                    .collect();
                (scope.to_string(), metrics)
            })
            .collect()
    }
}

/// Collects bounds, then validates them all in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ReferenceTableBuilder {
    entries: BTreeMap<ScopeKey, MetricBounds>,
}

impl ReferenceTableBuilder {
    /// Add one bound; a later bound for the same scope and metric replaces it.
    pub fn bound(
        mut self,
        scope: ScopeKey,
        metric: impl Into<String>,
        bound: ReferenceBound,
    ) -> Self {
        self.entries
            .entry(scope)
            .or_default()
            .insert(metric.into(), bound);
        self
    }

    /// Add several metrics under one scope.
    pub fn scope<I, S>(mut self, scope: ScopeKey, metrics: I) -> Self
    where
        I: IntoIterator<Item = (S, ReferenceBound)>,
        S: Into<String>,
    {
        let slot = self.entries.entry(scope).or_default();
        for (metric, bound) in metrics {
            slot.insert(metric.into(), bound);
        }
        self
    }

    /// Parse `scope` and add several metrics under it.
    pub fn scope_str<I, S>(self, scope: &str, metrics: I) -> ReferenceResult<Self>
    where
        I: IntoIterator<Item = (S, ReferenceBound)>,
        S: Into<String>,
    {
        let key: ScopeKey = scope.parse()?;
        Ok(self.scope(key, metrics))
    }

    pub fn build(self) -> ReferenceResult<ReferenceTable> {
        for (scope, metrics) in &self.entries {
            for (metric, bound) in metrics {
                if metric.trim().is_empty() {
                    return Err(ReferenceError::malformed(
                        scope.clone(),
                        metric.as_str(),
                        "empty metric name",
                    ));
                }
                bound.validate(scope, metric)?;
                if bound.is_degenerate() {
                    warn!(
                        scope = %scope,
                        metric = %metric,
                        "Reference target is 0 with thresholds; only non-negative values will be checked"
                    );
                }
            }
        }
        Ok(ReferenceTable {
            entries: self.entries,
        })
    }
}
