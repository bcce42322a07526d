//! Resolver configuration
//!
//! Defaults come from the environment so site wrappers can tune behaviour
//! without code changes:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `PERFREF_UNIT_POLICY` | `ignore`, `warn` or `reject` on unit mismatch | `warn` |
//! | `PERFREF_REFERENCES` | Default reference catalog file | unset |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// What to do when a sample's unit differs from its reference unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPolicy {
    /// Compare numbers regardless of unit
    Ignore,
    /// Compare, log and record a warning
    #[default]
    Warn,
    /// Fail the evaluation with a unit-mismatch error
    Reject,
}

impl FromStr for UnitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown unit policy '{}' (expected ignore, warn or reject)",
                other
            )),
        }
    }
}

impl std::fmt::Display for UnitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Warn => write!(f, "warn"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Configuration for [`ReferenceResolver`](crate::resolver::ReferenceResolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Unit mismatch handling
    pub unit_policy: UnitPolicy,
    /// Default catalog file used by front ends when none is given
    pub references_path: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from_env_values(
            std::env::var("PERFREF_UNIT_POLICY").ok(),
            std::env::var("PERFREF_REFERENCES").ok(),
        )
    }
}

impl ResolverConfig {
    /// Build from raw `PERFREF_UNIT_POLICY` / `PERFREF_REFERENCES` values.
    pub fn from_env_values(unit_policy: Option<String>, references: Option<String>) -> Self {
        Self {
            // unparsable values fall back to `warn`
            unit_policy: unit_policy
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            // empty means unset
            references_path: references
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Configuration that ignores the environment.
    pub fn fixed(unit_policy: UnitPolicy) -> Self {
        Self {
            unit_policy,
            references_path: None,
        }
    }

    pub fn with_unit_policy(mut self, unit_policy: UnitPolicy) -> Self {
        self.unit_policy = unit_policy;
        self
    }
}
