//! Reference bounds
//!
//! A bound is a target value with an asymmetric tolerance window expressed as
//! fractional offsets of the target: a lower threshold of `-0.05` on a target
//! of `1000` puts the floor at `950`, whatever the unit.

use crate::error::{ReferenceError, ReferenceResult};
use crate::scope::ScopeKey;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tolerance window for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBound")]
pub struct ReferenceBound {
    pub target: f64,
    /// Fractional offset below target, `<= 0`; `None` means unbounded below
    pub lower_thres: Option<f64>,
    /// Fractional offset above target, `>= 0`; `None` means unbounded above
    pub upper_thres: Option<f64>,
    pub unit: String,
}

impl ReferenceBound {
    pub fn new(
        target: f64,
        lower_thres: Option<f64>,
        upper_thres: Option<f64>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            target,
            lower_thres,
            upper_thres,
            unit: unit.into(),
        }
    }

    /// Bound used for reporting only (e.g. temperatures); never judged.
    pub fn informational(unit: impl Into<String>) -> Self {
        Self::new(0.0, None, None, unit)
    }

    /// Symmetric window, e.g. `within(86000.0, 0.05, "MB/s")` for ±5%.
    pub fn within(target: f64, fraction: f64, unit: impl Into<String>) -> Self {
        Self::new(target, Some(-fraction.abs()), Some(fraction.abs()), unit)
    }

    /// Floor only, e.g. `at_least(1000.0, 0.10, "Gflop/s")` for "no more than 10% below".
    pub fn at_least(target: f64, fraction: f64, unit: impl Into<String>) -> Self {
        Self::new(target, Some(-fraction.abs()), None, unit)
    }

    pub fn is_informational(&self) -> bool {
        self.lower_thres.is_none() && self.upper_thres.is_none()
    }

    /// Zero target with thresholds: fractional offsets cannot discriminate.
    pub fn is_degenerate(&self) -> bool {
        !self.is_informational() && self.target == 0.0
    }

    /// Effective `(low, high)` acceptance window.
    ///
    /// Informational bounds and degenerate bounds with a zero target have
    /// no fractional window; the former accept everything, the latter accept
    /// any non-negative value.
    pub fn window(&self) -> (f64, f64) {
        if self.is_informational() {
            return (f64::NEG_INFINITY, f64::INFINITY);
        }
        if self.is_degenerate() {
            return (0.0, f64::INFINITY);
        }
        let low = self
            .lower_thres
            .map_or(f64::NEG_INFINITY, |t| self.target * (1.0 + t));
        let high = self
            .upper_thres
            .map_or(f64::INFINITY, |t| self.target * (1.0 + t));
        (low, high)
    }

    /// Check the bound invariants; `scope` and `metric` only label the error.
    pub fn validate(&self, scope: &ScopeKey, metric: &str) -> ReferenceResult<()> {
        if !self.target.is_finite() {
            return Err(ReferenceError::malformed(
                scope.clone(),
                metric,
                format!("target {} is not finite", self.target),
            ));
        }
        if let Some(lower) = self.lower_thres {
            if !lower.is_finite() || lower > 0.0 {
                return Err(ReferenceError::malformed(
                    scope.clone(),
                    metric,
                    format!("lower threshold {} must be a finite value <= 0", lower),
                ));
            }
        }
        if let Some(upper) = self.upper_thres {
            if !upper.is_finite() || upper < 0.0 {
                return Err(ReferenceError::malformed(
                    scope.clone(),
                    metric,
                    format!("upper threshold {} must be a finite value >= 0", upper),
                ));
            }
        }
        if self.target < 0.0 && !self.is_informational() {
            return Err(ReferenceError::malformed(
                scope.clone(),
                metric,
                format!(
                    "negative target {} with thresholds inverts the window",
                    self.target
                ),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for ReferenceBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_thres = |t: Option<f64>| t.map_or("none".to_string(), |v| format!("{:+}", v));
        write!(
            f,
            "{} {} (lower {}, upper {})",
            self.target,
            self.unit,
            fmt_thres(self.lower_thres),
            fmt_thres(self.upper_thres)
        )
    }
}

/// On-disk form of a bound.
///
/// Accepts the `[target, lower, upper, unit]` tuple (with `null` for a missing
/// threshold) as well as a table, which TOML needs since it has no null.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawBound {
    Tuple(f64, Option<f64>, Option<f64>, String),
    Table {
        target: f64,
        #[serde(default, alias = "lower", skip_serializing_if = "Option::is_none")]
        lower_thres: Option<f64>,
        #[serde(default, alias = "upper", skip_serializing_if = "Option::is_none")]
        upper_thres: Option<f64>,
        #[serde(default)]
        unit: String,
    },
}

impl From<RawBound> for ReferenceBound {
    fn from(raw: RawBound) -> Self {
        match raw {
            RawBound::Tuple(target, lower_thres, upper_thres, unit)
            | RawBound::Table {
                target,
                lower_thres,
                upper_thres,
                unit,
            } => Self {
                target,
                lower_thres,
                upper_thres,
                unit,
            },
        }
    }
}

impl From<&ReferenceBound> for RawBound {
    fn from(bound: &ReferenceBound) -> Self {
        Self::Table {
            target: bound.target,
            lower_thres: bound.lower_thres,
            upper_thres: bound.upper_thres,
            unit: bound.unit.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ScopeKey {
        ScopeKey::qualified("kebnekaise", "bdw")
    }

    #[test]
    fn test_window_is_fraction_of_target() {
        let bound = ReferenceBound::within(86000.0, 0.05, "MB/s");
        let (low, high) = bound.window();
        assert!((low - 81700.0).abs() < 1e-6);
        assert!((high - 90300.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_open_sides() {
        let bound = ReferenceBound::at_least(1000.0, 0.05, "Gflop/s");
        let (low, high) = bound.window();
        assert!((low - 950.0).abs() < 1e-9);
        assert_eq!(high, f64::INFINITY);

        let ceiling = ReferenceBound::new(80.0, None, Some(0.1), "degC");
        assert_eq!(ceiling.window().0, f64::NEG_INFINITY);
    }

    #[test]
    fn test_informational_and_degenerate() {
        let info = ReferenceBound::informational("degC");
        assert!(info.is_informational());
        assert!(!info.is_degenerate());

        let degenerate = ReferenceBound::new(0.0, Some(-0.1), None, "MiB/s");
        assert!(degenerate.is_degenerate());
        assert_eq!(degenerate.window(), (0.0, f64::INFINITY));
    }

    #[test]
    fn test_validate_rejects_positive_lower() {
        let bound = ReferenceBound::new(100.0, Some(0.1), None, "GB/s");
        let err = bound.validate(&scope(), "copy").unwrap_err();
        assert_eq!(err.code(), "MALFORMED_BOUND");
        assert!(err.to_string().contains("kebnekaise:bdw"));
    }

    #[test]
    fn test_validate_rejects_negative_upper_and_target() {
        assert!(ReferenceBound::new(100.0, None, Some(-0.1), "x")
            .validate(&scope(), "m")
            .is_err());
        assert!(ReferenceBound::new(-5.0, Some(-0.1), None, "x")
            .validate(&scope(), "m")
            .is_err());
        assert!(ReferenceBound::new(f64::NAN, Some(-0.1), None, "x")
            .validate(&scope(), "m")
            .is_err());
        // Informational bounds may carry any finite target.
        assert!(ReferenceBound::new(-5.0, None, None, "x")
            .validate(&scope(), "m")
            .is_ok());
    }

    #[test]
    fn test_deserialize_tuple_form() {
        let bound: ReferenceBound = serde_json::from_str(r#"[6300, -0.10, null, "Gflop/s"]"#).unwrap();
        assert_eq!(bound, ReferenceBound::at_least(6300.0, 0.10, "Gflop/s"));
    }

    #[test]
    fn test_deserialize_table_form_with_aliases() {
        let bound: ReferenceBound =
            toml::from_str("target = 871.0\nlower = -0.05\nupper = 0.05\nunit = \"GFlops/s\"")
                .unwrap();
        assert_eq!(bound, ReferenceBound::within(871.0, 0.05, "GFlops/s"));
    }

    #[test]
    fn test_display() {
        let bound = ReferenceBound::at_least(1000.0, 0.1, "Gflop/s");
        assert_eq!(bound.to_string(), "1000 Gflop/s (lower -0.1, upper none)");
    }
}
