//! Scope keys
//!
//! A scope key selects which block of a reference table applies to a run:
//! `system:qualifier` (a partition or a hardware class), `system` alone, or
//! the wildcard `*`. More specific keys win during resolution.

use crate::error::{ReferenceError, ReferenceResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Hierarchical lookup key into a [`ReferenceTable`](crate::table::ReferenceTable).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKey {
    /// `system:qualifier`, e.g. `kebnekaise:bdw` or `alvis:A100`
    Qualified { system: String, qualifier: String },
    /// Whole system, e.g. `alvis`
    System(String),
    /// `*`, matches any system
    Wildcard,
}

impl ScopeKey {
    pub fn qualified(system: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self::Qualified {
            system: system.into(),
            qualifier: qualifier.into(),
        }
    }

    pub fn system(system: impl Into<String>) -> Self {
        Self::System(system.into())
    }

    /// Specificity rank: qualified (2) > system (1) > wildcard (0).
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Qualified { .. } => 2,
            Self::System(_) => 1,
            Self::Wildcard => 0,
        }
    }

    /// System component, if any.
    pub fn system_name(&self) -> Option<&str> {
        match self {
            Self::Qualified { system, .. } | Self::System(system) => Some(system),
            Self::Wildcard => None,
        }
    }

    /// Key one level less specific than this one (`a:b` -> `a` -> `*`).
    pub fn parent(&self) -> Option<ScopeKey> {
        match self {
            Self::Qualified { system, .. } => Some(Self::System(system.clone())),
            Self::System(_) => Some(Self::Wildcard),
            Self::Wildcard => None,
        }
    }

    /// The key followed by all of its ancestors, most specific first.
    pub fn ancestry(&self) -> Vec<ScopeKey> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(key) = current {
            current = key.parent();
            chain.push(key);
        }
        chain
    }
}

fn check_component(raw: &str, part: &str, what: &str) -> ReferenceResult<()> {
    if part.is_empty() {
        return Err(ReferenceError::invalid_scope(raw, format!("empty {what}")));
    }
    if part.chars().any(char::is_whitespace) {
        return Err(ReferenceError::invalid_scope(
            raw,
            format!("{what} contains whitespace"),
        ));
    }
    if part == "*" {
        return Err(ReferenceError::invalid_scope(
            raw,
            format!("wildcard is only allowed as the whole key, not as {what}"),
        ));
    }
    Ok(())
}

impl FromStr for ScopeKey {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "*" {
            return Ok(Self::Wildcard);
        }
        let mut parts = trimmed.split(':');
        let system = parts.next().unwrap_or_default();
        let qualifier = parts.next();
        if parts.next().is_some() {
            return Err(ReferenceError::invalid_scope(s, "more than one ':'"));
        }
        check_component(s, system, "system")?;
        match qualifier {
            Some(q) => {
                check_component(s, q, "qualifier")?;
                Ok(Self::qualified(system, q))
            }
            None => Ok(Self::system(system)),
        }
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qualified { system, qualifier } => write!(f, "{}:{}", system, qualifier),
            Self::System(system) => write!(f, "{}", system),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

impl Serialize for ScopeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
