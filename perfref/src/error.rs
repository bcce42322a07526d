//! Reference error types
//!
//! Every failure the resolver can raise is a configuration or input defect.
//! None of them are retryable and none may be turned into a passing verdict.

use crate::scope::ScopeKey;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reference operations
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Errors raised while building, loading or resolving performance references
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// No scope in the fallback chain carries a bound for the metric
    #[error("No reference for metric '{metric}' (tried {})", format_chain(.attempted))]
    Unresolved {
        metric: String,
        attempted: Vec<ScopeKey>,
    },

    /// A bound violates its invariants; detected when the table is built
    #[error("Malformed reference for '{metric}' in scope '{scope}': {reason}")]
    MalformedBound {
        scope: ScopeKey,
        metric: String,
        reason: String,
    },

    /// Sample unit differs from the reference unit under the `reject` policy
    #[error("Unit mismatch for '{metric}': sample is '{sample_unit}', reference is '{reference_unit}'")]
    UnitMismatch {
        metric: String,
        sample_unit: String,
        reference_unit: String,
    },

    /// Variant discriminator not present in the catalog
    #[error("Unknown reference variant '{variant}' (known: {})", .known.join(", "))]
    UnknownVariant { variant: String, known: Vec<String> },

    /// A catalog with several variants was queried without a variant
    #[error("A variant is required (known: {})", .known.join(", "))]
    VariantRequired { known: Vec<String> },

    /// Run record cannot be evaluated as given
    #[error("Invalid run record: {reason}")]
    InvalidRunRecord { reason: String },

    /// Scope key string could not be parsed
    #[error("Invalid scope key '{key}': {reason}")]
    InvalidScopeKey { key: String, reason: String },

    /// Failed to read a reference file from disk
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File extension does not map to a known catalog format
    #[error("Unsupported reference file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("TOML error in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ReferenceError {
    /// Create an unresolved-reference error for the full chain that was tried
    pub fn unresolved(metric: impl Into<String>, attempted: Vec<ScopeKey>) -> Self {
        Self::Unresolved {
            metric: metric.into(),
            attempted,
        }
    }

    /// Create a malformed-bound error
    pub fn malformed(scope: ScopeKey, metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedBound {
            scope,
            metric: metric.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid scope key error
    pub fn invalid_scope(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidScopeKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Machine-readable error code for structured reports
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unresolved { .. } => "UNRESOLVED_REFERENCE",
            Self::MalformedBound { .. } => "MALFORMED_BOUND",
            Self::UnitMismatch { .. } => "UNIT_MISMATCH",
            Self::UnknownVariant { .. } => "UNKNOWN_VARIANT",
            Self::VariantRequired { .. } => "VARIANT_REQUIRED",
            Self::InvalidRunRecord { .. } => "INVALID_RUN_RECORD",
            Self::InvalidScopeKey { .. } => "INVALID_SCOPE_KEY",
            Self::FileRead { .. } => "FILE_READ",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::Toml { .. } | Self::Yaml { .. } | Self::Json { .. } => "PARSE_ERROR",
        }
    }
}

fn format_chain(keys: &[ScopeKey]) -> String {
    keys.iter()
        .map(|k| format!("'{}'", k))
        .collect::<Vec<_>>()
        .join(" -> ")
}
