//! Configuration Sweep Generator
//!
//! Produces the ordered configuration sequence from sweep bounds:
//! - linear: `from, from + step, ..., <= to`
//! - exponential: `10^from, 10^(from + step), ...`
//!
//! Generation is pure, so the same bounds always yield the same sequence.

use crate::Configuration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed sweep bounds, reported before any trial runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    /// Bounds do not describe a non-empty increasing range
    #[error("invalid sweep range from={from} to={to} step={step}: {reason}")]
    InvalidRange {
        /// Start bound
        from: i64,
        /// End bound (inclusive)
        to: i64,
        /// Increment
        step: i64,
        /// What is wrong with the bounds
        reason: &'static str,
    },
}

/// Sweep bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSpec {
    /// First value (exponent when `exponential`)
    pub from: i64,
    /// Last value, inclusive
    pub to: i64,
    /// Increment between values
    #[serde(default = "default_step")]
    pub step: i64,
    /// Use `10^value` instead of `value`
    #[serde(default)]
    pub exponential: bool,
}

fn default_step() -> i64 {
    1
}

impl Default for SweepSpec {
    fn default() -> Self {
        Self {
            from: 1,
            to: 1,
            step: default_step(),
            exponential: false,
        }
    }
}

impl SweepSpec {
    /// Linear sweep
    pub fn linear(from: i64, to: i64, step: i64) -> Self {
        Self {
            from,
            to,
            step,
            exponential: false,
        }
    }

    /// Exponential (powers of ten) sweep
    pub fn exponential(from: i64, to: i64, step: i64) -> Self {
        Self {
            from,
            to,
            step,
            exponential: true,
        }
    }

    fn invalid(&self, reason: &'static str) -> SweepError {
        SweepError::InvalidRange {
            from: self.from,
            to: self.to,
            step: self.step,
            reason,
        }
    }

    /// Validate the bounds without generating anything
    pub fn validate(&self) -> Result<(), SweepError> {
        self.configurations().map(|_| ())
    }

    /// Generate the ordered, duplicate-free configuration sequence
    ///
    /// # Examples
    ///
    /// ```
    /// # use sweepbench_core::{Configuration, SweepSpec};
    /// let linear = SweepSpec::linear(1, 5, 2).configurations().unwrap();
    /// assert_eq!(linear, vec![Configuration(1), Configuration(3), Configuration(5)]);
    ///
    /// let exp = SweepSpec::exponential(1, 5, 2).configurations().unwrap();
    /// assert_eq!(exp, vec![Configuration(10), Configuration(1000), Configuration(100_000)]);
    /// ```
    pub fn configurations(&self) -> Result<Vec<Configuration>, SweepError> {
        if self.step <= 0 {
            return Err(self.invalid("step must be positive"));
        }
        if self.from > self.to {
            return Err(self.invalid("from must not exceed to"));
        }
        if self.exponential && self.from < 0 {
            return Err(self.invalid("exponents must be non-negative"));
        }

        let mut values = Vec::new();
        let mut current = self.from;
        loop {
            let value = if self.exponential {
                let exp = u32::try_from(current).map_err(|_| self.invalid("exponent too large"))?;
                10i64
                    .checked_pow(exp)
                    .ok_or_else(|| self.invalid("10^exponent overflows"))?
            } else {
                current
            };
            values.push(Configuration(value));

            match current.checked_add(self.step) {
                Some(next) if next <= self.to => current = next,
                _ => break,
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(spec: SweepSpec) -> Vec<i64> {
        spec.configurations()
            .unwrap()
            .into_iter()
            .map(Configuration::value)
            .collect()
    }

    #[test]
    fn test_linear() {
        assert_eq!(values(SweepSpec::linear(1, 5, 2)), vec![1, 3, 5]);
        assert_eq!(values(SweepSpec::linear(1, 6, 2)), vec![1, 3, 5]);
        assert_eq!(values(SweepSpec::linear(1000, 3000, 1000)), vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_exponential() {
        assert_eq!(
            values(SweepSpec::exponential(1, 5, 2)),
            vec![10, 1000, 100_000]
        );
        assert_eq!(values(SweepSpec::exponential(0, 0, 1)), vec![1]);
    }

    #[test]
    fn test_single_point() {
        assert_eq!(values(SweepSpec::linear(7, 7, 3)), vec![7]);
    }

    #[test]
    fn test_restartable() {
        let spec = SweepSpec::linear(3, 40, 7);
        assert_eq!(spec.configurations(), spec.configurations());
    }

    #[test]
    fn test_invalid_step() {
        for step in [0, -1] {
            let err = SweepSpec::linear(1, 5, step).configurations().unwrap_err();
            assert!(matches!(err, SweepError::InvalidRange { .. }));
        }
    }

    #[test]
    fn test_from_after_to() {
        assert!(SweepSpec::linear(6, 5, 1).configurations().is_err());
    }

    #[test]
    fn test_exponential_overflow() {
        assert!(SweepSpec::exponential(18, 18, 1).configurations().is_ok());
        assert!(SweepSpec::exponential(18, 19, 1).configurations().is_err());
        assert!(SweepSpec::exponential(-1, 2, 1).configurations().is_err());
    }

    #[test]
    fn test_step_overflow_terminates() {
        assert_eq!(values(SweepSpec::linear(i64::MAX - 1, i64::MAX, 5)), vec![i64::MAX - 1]);
    }

    #[test]
    fn test_deserialize_defaults() {
        let spec: SweepSpec = serde_json::from_str(r#"{"from": 1, "to": 3}"#).unwrap();
        assert_eq!(spec, SweepSpec::linear(1, 3, 1));
    }
}
