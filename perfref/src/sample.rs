//! Measured samples and run records
//!
//! Samples are produced by output parsing outside this crate. A run record
//! bundles them with the execution context, which is what front ends read.

use crate::context::ExecutionContext;
use crate::error::{ReferenceError, ReferenceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One measured value of one named metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    /// Unit as reported by the benchmark; empty when unknown
    #[serde(default)]
    pub unit: String,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// A sample attributed to the node (or rank) that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub node: String,
    #[serde(flatten)]
    pub sample: MetricSample,
}

impl NodeSample {
    pub fn new(node: impl Into<String>, sample: MetricSample) -> Self {
        Self {
            node: node.into(),
            sample,
        }
    }
}

/// Group node samples by node id, keeping per-node sample order.
pub fn group_by_node(samples: &[NodeSample]) -> BTreeMap<String, Vec<MetricSample>> {
    let mut grouped: BTreeMap<String, Vec<MetricSample>> = BTreeMap::new();
    for s in samples {
        grouped
            .entry(s.node.clone())
            .or_default()
            .push(s.sample.clone());
    }
    grouped
}

/// Sample entry of a run record; `node` is set for per-node accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(flatten)]
    pub sample: MetricSample,
}

/// Samples split by how they must be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSamples {
    /// One sample per metric for the whole run
    Aggregate(Vec<MetricSample>),
    /// Samples per node id
    PerNode(BTreeMap<String, Vec<MetricSample>>),
}

/// Everything the resolver needs about one completed benchmark run.
///
/// ```json
/// {
///   "context": { "system": "alvis", "partition": "4xA100_MEM512", "variant": "double" },
///   "samples": [
///     { "node": "alvis4-01", "name": "gpu_perf_min", "value": 18400, "unit": "Gflop/s" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub context: ExecutionContext,
    #[serde(default)]
    pub samples: Vec<RecordedSample>,
}

impl RunRecord {
    /// Split samples into aggregate or per-node form.
    ///
    /// A record must be consistently attributed: either every sample names a
    /// node or none does.
    pub fn split(&self) -> ReferenceResult<RunSamples> {
        let with_node = self.samples.iter().filter(|s| s.node.is_some()).count();
        if with_node == 0 {
            return Ok(RunSamples::Aggregate(
                self.samples.iter().map(|s| s.sample.clone()).collect(),
            ));
        }
        if with_node != self.samples.len() {
            return Err(ReferenceError::InvalidRunRecord {
                reason: format!(
                    "{} of {} samples carry a node id; attribute all samples or none",
                    with_node,
                    self.samples.len()
                ),
            });
        }
        let node_samples: Vec<NodeSample> = self
            .samples
            .iter()
            .filter_map(|s| {
                s.node
                    .as_ref()
                    .map(|node| NodeSample::new(node.clone(), s.sample.clone()))
            })
            .collect();
        Ok(RunSamples::PerNode(group_by_node(&node_samples)))
    }
}
