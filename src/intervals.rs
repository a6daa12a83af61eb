use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{Result, StatsError};

pub const CONFIDENCE_LEVEL: f64 = 0.95;
pub const DEFAULT_Z: f64 = 1.96;
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_ITERATIONS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalEstimate {
    pub point_estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
}

impl IntervalEstimate {
    pub fn degenerate(value: f64, confidence_level: f64) -> Self {
        Self {
            point_estimate: value,
            lower: value,
            upper: value,
            confidence_level,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Percentile bootstrap bounds can, rarely, fail to bracket the point
    /// estimate. Callers surface that instead of trusting the interval blindly.
    pub fn is_ordered(&self) -> bool {
        self.lower <= self.point_estimate && self.point_estimate <= self.upper
    }
}

/// Bootstrap interval plus the mean of the bootstrap distribution itself.
/// The interval's point estimate is always the mean of the original sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub estimate: IntervalEstimate,
    pub bootstrap_mean: f64,
    pub iterations: usize,
}

/// Wilson score interval for a binomial proportion.
///
/// The point estimate is the raw proportion `successes / n`, not the Wilson
/// center. `n = 0` yields an all-zero estimate.
pub fn wilson_interval(successes: u64, n: u64, z: f64) -> Result<IntervalEstimate> {
    if successes > n {
        return Err(StatsError::invalid(format!(
            "wilson interval: successes ({successes}) exceed trials ({n})"
        )));
    }
    if !z.is_finite() || z <= 0.0 {
        return Err(StatsError::invalid(format!(
            "wilson interval: z must be positive, got {z}"
        )));
    }
    let confidence_level = confidence_level_for_z(z);
    if n == 0 {
        return Ok(IntervalEstimate::degenerate(0.0, confidence_level));
    }

    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half_width = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;

    // Clamping both ends keeps lower <= p <= upper even at p = 0 or 1.
    Ok(IntervalEstimate {
        point_estimate: p,
        lower: (center - half_width).max(0.0).min(p),
        upper: (center + half_width).min(1.0).max(p),
        confidence_level,
    })
}

pub fn bootstrap_mean_interval<R: Rng + ?Sized>(
    sample: &[f64],
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> Result<IntervalEstimate> {
    bootstrap_mean_summary(sample, iterations, alpha, rng).map(|s| s.estimate)
}

/// Percentile bootstrap of the sample mean. Draws `iterations` resamples of
/// `sample.len()` values with replacement from `rng`.
pub fn bootstrap_mean_summary<R: Rng + ?Sized>(
    sample: &[f64],
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> Result<BootstrapSummary> {
    if sample.is_empty() {
        return Err(StatsError::invalid("bootstrap mean: empty sample"));
    }
    if sample.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::invalid("bootstrap mean: sample contains non-finite values"));
    }
    validate_iterations(iterations)?;
    validate_alpha(alpha)?;

    let n = sample.len();
    let (lo, hi) = sample_range(sample);
    let mut means = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut sum = 0.0_f64;
        for _ in 0..n {
            sum += sample[rng.gen_range(0..n)];
        }
        // Rounding in the sum can push a mean just outside the sample range.
        means.push((sum / n as f64).clamp(lo, hi));
    }
    means.sort_by(|a, b| a.total_cmp(b));

    let (lower, upper) = percentile_bounds(&means, alpha);
    Ok(BootstrapSummary {
        estimate: IntervalEstimate {
            point_estimate: mean(sample).clamp(lo, hi),
            lower,
            upper,
            confidence_level: 1.0 - alpha,
        },
        bootstrap_mean: mean(&means).clamp(lo, hi),
        iterations,
    })
}

/// Lower/upper percentile picks from an ascending sequence:
/// `sorted[floor(alpha/2 * len)]` and `sorted[floor((1 - alpha/2) * len)]`.
pub(crate) fn percentile_bounds(sorted: &[f64], alpha: f64) -> (f64, f64) {
    let len = sorted.len();
    let last = len.saturating_sub(1);
    let lo_idx = (((alpha / 2.0) * len as f64).floor() as usize).min(last);
    let hi_idx = (((1.0 - alpha / 2.0) * len as f64).floor() as usize).min(last);
    (sorted[lo_idx], sorted[hi_idx])
}

pub(crate) fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(StatsError::invalid("bootstrap iterations must be at least 1"));
    }
    Ok(())
}

pub(crate) fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::invalid(format!(
            "alpha must lie strictly between 0 and 1, got {alpha}"
        )));
    }
    Ok(())
}

fn sample_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Two-sided coverage of a standard normal quantile, to four decimals
/// (1.96 -> 0.95).
fn confidence_level_for_z(z: f64) -> f64 {
    if z == DEFAULT_Z {
        return CONFIDENCE_LEVEL;
    }
    match Normal::new(0.0, 1.0) {
        Ok(std_normal) => ((2.0 * std_normal.cdf(z) - 1.0) * 1e4).round() / 1e4,
        Err(_) => f64::NAN,
    }
}
