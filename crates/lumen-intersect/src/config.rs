//! Numeric policy shared by every primitive and by the scene intersector.
//!
//! All thresholds live here so that spheres, quadrics and triangles reject
//! self-intersections with the same rule.

use std::path::Path;

use log::warn;
use lumen_math::Tolerance;
use serde::{Deserialize, Serialize};

use crate::error::{IntersectError, Result};

/// Intersection configuration.
///
/// Loaded by the driver (usually from its TOML config) and handed to every
/// primitive constructor and to the [`SceneIntersector`](crate::SceneIntersector).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectConfig {
    /// Minimum accepted ray parameter. Hits with `t <= epsilon` are discarded,
    /// which suppresses self-intersection of secondary rays.
    pub epsilon: f64,
    /// Two hits whose `t` differ by at most this much are considered tied;
    /// the lower primitive index wins.
    pub tie_tolerance: f64,
    /// Denominators below this magnitude are treated as zero (ray parallel to
    /// a plane, quadratic degenerating to linear).
    pub parallel_threshold: f64,
    /// Tolerances for rejecting degenerate primitives at construction.
    pub tolerance: Tolerance,
}

impl Default for IntersectConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            tie_tolerance: 1e-9,
            parallel_threshold: 1e-12,
            tolerance: Tolerance::DEFAULT,
        }
    }
}

impl IntersectConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(IntersectError::InvalidConfig(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if !self.tie_tolerance.is_finite() || self.tie_tolerance < 0.0 {
            return Err(IntersectError::InvalidConfig(format!(
                "tie_tolerance must be non-negative and finite, got {}",
                self.tie_tolerance
            )));
        }
        if !self.parallel_threshold.is_finite() || self.parallel_threshold < 0.0 {
            return Err(IntersectError::InvalidConfig(format!(
                "parallel_threshold must be non-negative and finite, got {}",
                self.parallel_threshold
            )));
        }
        if !self.tolerance.linear.is_finite() || self.tolerance.linear <= 0.0 {
            return Err(IntersectError::InvalidConfig(format!(
                "tolerance.linear must be positive and finite, got {}",
                self.tolerance.linear
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        if let Err(e) = config.validate() {
            warn!("rejected intersection config: {e}");
            return Err(e);
        }
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The per-primitive slice of this configuration.
    pub fn policy(&self) -> EpsilonPolicy {
        EpsilonPolicy {
            epsilon: self.epsilon,
            parallel_threshold: self.parallel_threshold,
        }
    }
}

/// Epsilon policy copied into each primitive at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonPolicy {
    /// Minimum accepted ray parameter.
    pub epsilon: f64,
    /// Magnitude below which a denominator counts as zero.
    pub parallel_threshold: f64,
}

impl EpsilonPolicy {
    /// True if `t` is a valid hit parameter.
    #[inline]
    pub fn accepts(&self, t: f64) -> bool {
        t > self.epsilon && t.is_finite()
    }

    /// True if `denom` is too small to divide by.
    #[inline]
    pub fn is_parallel(&self, denom: f64) -> bool {
        denom.abs() < self.parallel_threshold
    }
}

impl Default for EpsilonPolicy {
    fn default() -> Self {
        IntersectConfig::default().policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(IntersectConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = IntersectConfig::from_toml_str("epsilon = 1e-4\n").unwrap();
        assert_eq!(config.epsilon, 1e-4);
        assert_eq!(config.tie_tolerance, 1e-9);
        assert_eq!(config.tolerance, Tolerance::DEFAULT);
    }

    #[test]
    fn test_from_toml_nested_tolerance() {
        let text = "tie_tolerance = 0.0\n\n[tolerance]\nlinear = 1e-6\n";
        let config = IntersectConfig::from_toml_str(text).unwrap();
        assert_eq!(config.tie_tolerance, 0.0);
        assert_eq!(config.tolerance.linear, 1e-6);
    }

    #[test]
    fn test_rejects_unknown_tolerance_key() {
        let text = "[tolerance]\nlinear = 1e-6\nangular = 1e-3\n";
        let err = IntersectConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, IntersectError::ConfigParse(_)));
    }

    #[test]
    fn test_rejects_non_positive_epsilon() {
        let err = IntersectConfig::from_toml_str("epsilon = 0.0").unwrap_err();
        assert!(matches!(err, IntersectError::InvalidConfig(_)));
        let err = IntersectConfig::from_toml_str("epsilon = -1.0").unwrap_err();
        assert!(matches!(err, IntersectError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_negative_tie_tolerance() {
        let config = IntersectConfig {
            tie_tolerance: -1.0,
            ..IntersectConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let err = IntersectConfig::from_toml_str("epsilon = \"small\"").unwrap_err();
        assert!(matches!(err, IntersectError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = IntersectConfig::from_toml_file("/nonexistent/lumen.toml").unwrap_err();
        assert!(matches!(err, IntersectError::Io(_)));
    }

    #[test]
    fn test_policy_accepts() {
        let policy = IntersectConfig::default().policy();
        assert!(!policy.accepts(0.0));
        assert!(!policy.accepts(1e-7));
        assert!(policy.accepts(1e-3));
        assert!(!policy.accepts(f64::INFINITY));
        assert!(!policy.accepts(f64::NAN));
        assert!(policy.is_parallel(1e-13));
        assert!(!policy.is_parallel(1e-3));
    }
}
