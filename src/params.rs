//! Parameter metadata for classifier thresholds and pattern detectors
//!
//! Every tunable number carries a [`ParamMeta`] describing its type, default and
//! accepted range, so configuration can be validated in one place and
//! detectors can be rebuilt from a plain `name -> value` map.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use mtf_resonance::params::ParameterizedDetector;
//! use mtf_resonance::prelude::*;
//!
//! for param in HammerDetector::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("shadow_factor", 3.0);
//! let hammer = HammerDetector::with_params(&overrides).unwrap();
//! assert_eq!(hammer.shadow_factor.get(), 3.0);
//! ```

use std::collections::HashMap;

use crate::{Multiplier, Period, Ratio, ResonanceError, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Non-negative scale factor
  Multiplier,
  /// Percent move (non-negative)
  Percent,
  /// Period or count (positive integer)
  Period,
}

/// Metadata for a single tunable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "doji_max_body_ratio")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn multiplier(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Multiplier, default, range, description }
  }

  pub const fn percent(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Percent, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(ResonanceError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Multiplier | ParamType::Percent => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(ResonanceError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

/// Find a parameter by name in a metadata table
pub fn find_meta<'a>(metas: &'a [ParamMeta], name: &str) -> Option<&'a ParamMeta> {
  metas.iter().find(|m| m.name == name)
}

/// Reject unknown names and out-of-range values in an override map
pub fn check_params(metas: &[ParamMeta], params: &HashMap<&str, f64>) -> Result<()> {
  for (name, value) in params {
    let meta = find_meta(metas, name)
      .ok_or_else(|| ResonanceError::InvalidConfig(format!("unknown parameter '{name}'")))?;
    meta.validate(*value)?;
  }
  Ok(())
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Trait for detectors that support parameterization
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector with parameters from a HashMap
  ///
  /// Missing parameters use their default values; present ones are checked
  /// against [`param_meta`](Self::param_meta).
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Returns the pattern ID string
  fn pattern_id_str() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

fn lookup(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  Ratio::new(lookup(params, key, default))
}

/// Helper to get a Multiplier from params with default fallback
pub fn get_multiplier(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Multiplier> {
  Multiplier::new(lookup(params, key, default))
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = lookup(params, key, default as f64);
  if value.fract() != 0.0 || value < 1.0 {
    return Err(ResonanceError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_constructors() {
    let meta = ParamMeta::ratio("test_ratio", 0.15, (0.01, 0.5, 0.01), "Test ratio");
    assert_eq!(meta.name, "test_ratio");
    assert_eq!(meta.param_type, ParamType::Ratio);
    assert_eq!(meta.default, 0.15);

    let meta = ParamMeta::period("test_period", 10.0, (2.0, 50.0, 1.0), "Test period");
    assert_eq!(meta.param_type, ParamType::Period);

    let meta = ParamMeta::percent("pc", 0.8, (0.0, 20.0, 0.1), "Test percent");
    assert_eq!(meta.param_type, ParamType::Percent);
  }

  #[test]
  fn test_validate_range() {
    let meta = ParamMeta::multiplier("test", 2.2, (0.5, 5.0, 0.1), "Test");

    assert!(meta.validate(2.2).is_ok());
    assert!(meta.validate(0.5).is_ok());
    assert!(meta.validate(5.0).is_ok());
    assert!(meta.validate(0.4).is_err());
    assert!(meta.validate(5.1).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 10.0, (2.0, 50.0, 1.0), "Test");

    assert!(meta.validate(10.0).is_ok());
    assert!(meta.validate(10.5).is_err());
    assert!(meta.validate(1.0).is_err());
  }

  #[test]
  fn test_find_meta() {
    let metas = [
      ParamMeta::ratio("a", 0.1, (0.0, 1.0, 0.1), "A"),
      ParamMeta::period("b", 3.0, (1.0, 9.0, 1.0), "B"),
    ];
    assert_eq!(find_meta(&metas, "b").map(|m| m.default), Some(3.0));
    assert!(find_meta(&metas, "c").is_none());
  }

  #[test]
  fn test_check_params() {
    let metas = [ParamMeta::ratio("a", 0.1, (0.0, 0.5, 0.1), "A")];
    let mut params = HashMap::new();
    params.insert("a", 0.3);
    assert!(check_params(&metas, &params).is_ok());

    params.insert("a", 0.9);
    assert!(matches!(check_params(&metas, &params), Err(ResonanceError::OutOfRange { .. })));

    params.clear();
    params.insert("z", 0.1);
    assert!(matches!(check_params(&metas, &params), Err(ResonanceError::InvalidConfig(_))));
  }

  #[test]
  fn test_get_helpers() {
    let mut params = HashMap::new();
    params.insert("ratio", 0.2);
    params.insert("mult", 3.0);
    params.insert("period", 12.0);
    params.insert("fractional", 2.5);

    assert!((get_ratio(&params, "ratio", 0.5).unwrap().get() - 0.2).abs() < f64::EPSILON);
    assert!((get_ratio(&params, "missing", 0.5).unwrap().get() - 0.5).abs() < f64::EPSILON);
    assert_eq!(get_multiplier(&params, "mult", 2.2).unwrap().get(), 3.0);
    assert_eq!(get_period(&params, "period", 10).unwrap().get(), 12);
    assert_eq!(get_period(&params, "missing", 10).unwrap().get(), 10);
    assert!(get_period(&params, "fractional", 10).is_err());
  }
}
