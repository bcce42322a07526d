//! Execution context
//!
//! Immutable description of where a benchmark ran. The context owns the
//! fallback chain: exact partition, then hardware class, then system, then
//! wildcard.

use crate::scope::ScopeKey;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Known accelerator models for substring matching, longest first so a
/// shorter model name never shadows a longer one that contains it.
const KNOWN_ACCELERATORS: &[&str] = &[
    "A6000", "A100", "H100", "V100", "P100", "K80", "A40", "L40", "T4",
];

/// `4xA100_MEM512`, `gpu_2xK80`, `NxT4`, `4xA100fat`
static ACCELERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|_)(?:\d+|N)x([A-Z][A-Z0-9]*\d)").expect("ACCELERATOR_RE regex should compile")
});

/// Derive a hardware class tag from a partition name.
///
/// Returns the accelerator model for GPU partitions named `<count>x<model>`
/// (with optional suffixes), or a known model appearing anywhere in the name.
/// CPU partitions such as `bdw` or `sky` have no derivable class.
pub fn hardware_class_from_partition(partition: &str) -> Option<String> {
    if let Some(caps) = ACCELERATOR_RE.captures(partition) {
        return Some(caps[1].to_string());
    }
    KNOWN_ACCELERATORS
        .iter()
        .find(|model| partition.contains(*model))
        .map(|model| model.to_string())
}

/// Qualifying context of one benchmark execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Cluster name (e.g. `kebnekaise`, `alvis`)
    pub system: String,
    /// Partition name within the system (e.g. `bdw`, `4xA100_MEM512`)
    pub partition: String,
    /// Hardware class; derived from the partition name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_class: Option<String>,
    /// Toolchain / programming environment (e.g. `foss_2021a`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Variant discriminator selecting the reference table (e.g. `double`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ExecutionContext {
    pub fn new(system: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            partition: partition.into(),
            hardware_class: None,
            environment: None,
            variant: None,
        }
    }

    pub fn with_hardware_class(mut self, class: impl Into<String>) -> Self {
        self.hardware_class = Some(class.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// `system:partition`
    pub fn exact_key(&self) -> ScopeKey {
        ScopeKey::qualified(&self.system, &self.partition)
    }

    /// Explicit hardware class, or the one derived from the partition name.
    pub fn effective_hardware_class(&self) -> Option<String> {
        self.hardware_class
            .clone()
            .or_else(|| hardware_class_from_partition(&self.partition))
    }

    /// Less specific keys to try after [`exact_key`](Self::exact_key), in order.
    pub fn fallback_keys(&self) -> Vec<ScopeKey> {
        let mut keys = Vec::with_capacity(3);
        if let Some(class) = self.effective_hardware_class() {
            if class != self.partition {
                keys.push(ScopeKey::qualified(&self.system, class));
            }
        }
        keys.push(ScopeKey::system(&self.system));
        keys.push(ScopeKey::Wildcard);
        keys
    }

    /// Full chain: exact key followed by the fallbacks.
    pub fn chain(&self) -> Vec<ScopeKey> {
        let mut chain = vec![self.exact_key()];
        chain.extend(self.fallback_keys());
        chain
    }
}

impl std::fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.system, self.partition)?;
        if let Some(env) = &self.environment {
            write!(f, " [{}]", env)?;
        }
        if let Some(variant) = &self.variant {
            write!(f, " ({})", variant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_class_from_gpu_partitions() {
        let cases = [
            ("4xA100_MEM512", Some("A100")),
            ("4xA100fat", Some("A100")),
            ("gpu_2xK80", Some("K80")),
            ("NxT4", Some("T4")),
            ("2xA6000", Some("A6000")),
            ("8xT4", Some("T4")),
            ("4xA40", Some("A40")),
        ];
        for (partition, expected) in cases {
            assert_eq!(
                hardware_class_from_partition(partition).as_deref(),
                expected,
                "partition {}",
                partition
            );
        }
    }

    #[test]
    fn test_known_accelerators_longest_first() {
        for pair in KNOWN_ACCELERATORS.windows(2) {
            assert!(pair[0].len() >= pair[1].len(), "{} before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_hardware_class_by_substring() {
        assert_eq!(hardware_class_from_partition("gpu-A6000").as_deref(), Some("A6000"));
        assert_eq!(hardware_class_from_partition("amdA100").as_deref(), Some("A100"));
    }

    #[test]
    fn test_hardware_class_absent_for_cpu_partitions() {
        for partition in ["bdw", "sky", "knl", "lm", "default", "CPUonly", "skylake"] {
            assert_eq!(hardware_class_from_partition(partition), None, "{}", partition);
        }
    }

    #[test]
    fn test_chain_with_derived_class() {
        let ctx = ExecutionContext::new("alvis", "4xA100_MEM512");
        assert_eq!(
            ctx.chain(),
            vec![
                ScopeKey::qualified("alvis", "4xA100_MEM512"),
                ScopeKey::qualified("alvis", "A100"),
                ScopeKey::system("alvis"),
                ScopeKey::Wildcard,
            ]
        );
    }

    #[test]
    fn test_chain_without_class() {
        let ctx = ExecutionContext::new("kebnekaise", "bdw");
        assert_eq!(
            ctx.fallback_keys(),
            vec![ScopeKey::system("kebnekaise"), ScopeKey::Wildcard]
        );
    }

    #[test]
    fn test_explicit_class_overrides_derivation() {
        let ctx = ExecutionContext::new("alvis", "4xA100fat").with_hardware_class("sm_80");
        assert_eq!(ctx.fallback_keys()[0], ScopeKey::qualified("alvis", "sm_80"));
    }

    #[test]
    fn test_class_equal_to_partition_not_duplicated() {
        let ctx = ExecutionContext::new("kebnekaise", "knl").with_hardware_class("knl");
        assert_eq!(ctx.chain().len(), 3);
    }

    #[test]
    fn test_context_json_defaults() {
        let ctx: ExecutionContext =
            serde_json::from_str(r#"{"system":"vera","partition":"skylake"}"#).unwrap();
        assert_eq!(ctx, ExecutionContext::new("vera", "skylake"));
        assert_eq!(ctx.to_string(), "vera:skylake");
    }
}
