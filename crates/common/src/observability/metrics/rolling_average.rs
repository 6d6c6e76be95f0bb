//! Exponential moving average accumulator
//!
//! A single smoothed value with O(1) update and read and no allocation.
//! The first sample seeds the average; every later sample blends in as
//! `current = α·sample + (1 - α)·current`.
//!
//! `RollingAverage` is not internally synchronized. Owners that share one
//! across threads wrap it in a mutex, one per average.

use crate::observability::{MetricsError, MetricsResult};

/// Exponentially weighted moving average
///
/// # Example
/// ```
/// use oplink_common::observability::RollingAverage;
///
/// let mut avg = RollingAverage::new(0.5)?;
/// avg.add_sample(10.0);
/// avg.add_sample(20.0);
/// assert_eq!(avg.read(), 15.0);
/// # Ok::<(), oplink_common::MetricsError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollingAverage {
    smoothing_factor: f64,
    current: f64,
    samples: u64,
}

impl RollingAverage {
    /// Create an unseeded average
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidSmoothingFactor`] unless
    /// `0 < smoothing_factor <= 1`.
    pub fn new(smoothing_factor: f64) -> MetricsResult<Self> {
        if !(smoothing_factor > 0.0 && smoothing_factor <= 1.0) {
            return Err(MetricsError::InvalidSmoothingFactor { factor: smoothing_factor });
        }
        Ok(Self { smoothing_factor, current: 0.0, samples: 0 })
    }

    /// Fold one sample into the average
    ///
    /// Non-finite samples are skipped so one bad measurement cannot turn the
    /// average into NaN for the rest of its life.
    // Unfused on purpose: `mul_add` can differ from `α·x + (1-α)·current`
    // in the last bit.
    #[allow(clippy::suboptimal_flops)]
    pub fn add_sample(&mut self, sample: f64) {
        if !sample.is_finite() {
            #[cfg(feature = "observability")]
            tracing::warn!(sample, "Ignoring non-finite rolling average sample");
            return;
        }

        if self.samples == 0 {
            self.current = sample;
        } else {
            self.current =
                self.smoothing_factor * sample + (1.0 - self.smoothing_factor) * self.current;
        }
        self.samples = self.samples.saturating_add(1);
    }

    /// Current value, `0.0` before the first sample
    pub const fn read(&self) -> f64 {
        self.current
    }

    /// Current value, `None` before the first sample
    pub const fn value(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.current)
        }
    }

    /// Like [`value`](Self::value), but an unseeded average is an error
    ///
    /// # Errors
    /// Returns [`MetricsError::EmptyData`] before the first sample.
    pub fn try_read(&self) -> MetricsResult<f64> {
        self.value().ok_or(MetricsError::EmptyData { metric: "average" })
    }

    /// Whether at least one sample has been folded in
    pub const fn has_sample(&self) -> bool {
        self.samples > 0
    }

    /// Number of samples folded in so far
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    pub const fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    /// Forget all samples, keeping the smoothing factor
    pub fn reset(&mut self) {
        self.current = 0.0;
        self.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Validates the seeding and blending law for the default factor.
    ///
    /// Assertions:
    /// - Samples `[10, 20, 30]` produce `[10, 15, 22.5]`.
    #[test]
    fn test_seed_then_blend() {
        let mut avg = RollingAverage::new(0.5).unwrap();
        let mut observed = Vec::new();
        for sample in [10.0, 20.0, 30.0] {
            avg.add_sample(sample);
            observed.push(avg.read());
        }
        assert_eq!(observed, vec![10.0, 15.0, 22.5]);
        assert_eq!(avg.samples(), 3);
    }

    /// Validates `read` before any sample.
    ///
    /// Assertions:
    /// - `read()` is `0.0`, `value()` is `None`, `try_read()` fails.
    #[test]
    fn test_unseeded_reads() {
        let avg = RollingAverage::new(0.3).unwrap();
        assert_eq!(avg.read(), 0.0);
        assert_eq!(avg.value(), None);
        assert!(!avg.has_sample());
        assert_eq!(avg.try_read(), Err(MetricsError::EmptyData { metric: "average" }));
    }

    /// Validates that the first sample seeds rather than blends with zero.
    ///
    /// Assertions:
    /// - With α = 0.1 the first sample of 100 reads back as exactly 100.
    #[test]
    fn test_first_sample_seeds_for_any_factor() {
        let mut avg = RollingAverage::new(0.1).unwrap();
        avg.add_sample(100.0);
        assert_eq!(avg.read(), 100.0);

        avg.add_sample(0.0);
        assert!(approx_eq(avg.read(), 90.0));
    }

    /// Validates the blend bit for bit on values that are inexact in binary.
    ///
    /// Assertions:
    /// - Each step equals `α·x + (1-α)·current` evaluated unfused.
    #[test]
    fn test_blend_matches_literal_expression_exactly() {
        let alpha = 0.1;
        let mut avg = RollingAverage::new(alpha).unwrap();
        let mut expected = 0.3;
        avg.add_sample(0.3);
        for sample in [0.7, 1.1, 0.2, 3.3] {
            avg.add_sample(sample);
            expected = alpha * sample + (1.0 - alpha) * expected;
            assert_eq!(avg.read().to_bits(), expected.to_bits(), "after sample {sample}");
        }
    }

    #[test]
    fn test_factor_one_tracks_last_sample() {
        let mut avg = RollingAverage::new(1.0).unwrap();
        for sample in [3.0, 8.0, -2.0] {
            avg.add_sample(sample);
            assert_eq!(avg.read(), sample);
        }
    }

    #[test]
    fn test_invalid_factors_rejected() {
        for factor in [0.0, -0.5, 1.0001, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    RollingAverage::new(factor),
                    Err(MetricsError::InvalidSmoothingFactor { .. })
                ),
                "factor {factor} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_finite_samples_skipped() {
        let mut avg = RollingAverage::new(0.5).unwrap();
        avg.add_sample(f64::NAN);
        assert!(!avg.has_sample());

        avg.add_sample(4.0);
        avg.add_sample(f64::INFINITY);
        assert_eq!(avg.read(), 4.0);
        assert_eq!(avg.samples(), 1);
    }

    #[test]
    fn test_reset_unseeds() {
        let mut avg = RollingAverage::new(0.5).unwrap();
        avg.add_sample(12.0);
        avg.reset();
        assert_eq!(avg.value(), None);

        avg.add_sample(7.0);
        assert_eq!(avg.read(), 7.0);
        assert!(approx_eq(avg.smoothing_factor(), 0.5));
    }
}
