//! Performance-reference resolution and validation for HPC regression checks
//!
//! Benchmarks (STREAM, HPL, GPU burn, IOR, ...) produce named metric values.
//! This crate decides which reference applies to a run and whether the
//! measured values meet it.
//!
//! # Architecture
//!
//! ```text
//! catalog file / built-in sites
//!            ↓
//!   ReferenceCatalog ──variant──→ ReferenceTable
//!                                      ↓
//! ExecutionContext ──chain──→ ReferenceResolver ←── MetricSample / NodeSample
//!                                      ↓
//!                                 RunVerdict
//!                         (PASS / FAIL / INVALID)
//! ```
//!
//! # Fallback chain
//!
//! `system:partition` → `system:hardware_class` → `system` → `*`. The first
//! scope with a bound for the metric wins; no bound anywhere is an
//! [`ReferenceError::Unresolved`] error, never a silent pass.
//!
//! # Usage
//!
//! ```no_run
//! use perfref::{sites, ExecutionContext, MetricSample, ReferenceResolver};
//!
//! let catalog = sites::stream()?;
//! let context = ExecutionContext::new("kebnekaise", "bdw").with_variant("foss");
//! let samples = [
//!     MetricSample::new("copy", 90000.0, "MB/s"),
//!     MetricSample::new("triad", 85000.0, "MB/s"),
//! ];
//! let verdict = ReferenceResolver::default().evaluate_context(&context, &catalog, &samples)?;
//! println!("{}", verdict.summary());
//! # Ok::<(), perfref::ReferenceError>(())
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod bound;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod report;
pub mod resolver;
pub mod sample;
pub mod scope;
pub mod sites;
pub mod table;

// Re-export the data model
pub use bound::{RawBound, ReferenceBound};
pub use context::{hardware_class_from_partition, ExecutionContext};
pub use sample::{group_by_node, MetricSample, NodeSample, RecordedSample, RunRecord, RunSamples};
pub use scope::ScopeKey;

// Re-export table and catalog types
pub use catalog::{catalog_schema, CatalogFile, ReferenceCatalog, DEFAULT_VARIANT};
pub use loader::{load_catalog, parse_catalog, CatalogFormat};
pub use table::{MetricBounds, ReferenceTable, ReferenceTableBuilder};

// Re-export resolver and report types
pub use config::{ResolverConfig, UnitPolicy};
pub use error::{ReferenceError, ReferenceResult};
pub use report::{
    EvaluationResult, EvaluationWarning, FailureDetail, RunStatus, RunVerdict, Verdict,
};
pub use resolver::{evaluate, evaluate_metric, resolve, resolve_scoped, ReferenceResolver, Resolved};
