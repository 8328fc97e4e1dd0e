//! Order statistics over trial sets
//!
//! Contains:
//! - Minimum / median selection for timer reduction
//! - `TrialSummary`: mean, spread and nearest-rank percentiles
//! - Outlier detection (MAD-based)

use serde::{Deserialize, Serialize};

/// Smallest sample
#[must_use]
pub fn min(samples: &[u64]) -> Option<u64> {
    samples.iter().copied().min()
}

/// Middle sample by rank; for an even count, the upper of the two central values
///
/// Input order does not matter.
#[must_use]
pub fn median(samples: &[u64]) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut work = samples.to_vec();
    let mid = work.len() / 2;
    let (_, m, _) = work.select_nth_unstable(mid);
    Some(*m)
}

/// Median of floating-point values, averaging the central pair for even counts
///
/// NaN values are ignored.
#[must_use]
pub fn median_f64(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    Some(if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    })
}

/// Arithmetic mean
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator); zero for a single value
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Descriptive statistics of one trial set, in ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    /// Number of samples
    pub count: usize,
    /// Smallest sample
    pub min: u64,
    /// Largest sample
    pub max: u64,
    /// Mean
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    /// 50th percentile
    pub p50: u64,
    /// 95th percentile
    pub p95: u64,
    /// 99th percentile
    pub p99: u64,
    /// 99.9th percentile
    pub p999: u64,
}

impl TrialSummary {
    /// Summarise `samples`; `None` when empty
    #[must_use]
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();

        let as_f64: Vec<f64> = sorted.iter().map(|&s| s as f64).collect();
        let mean = mean(&as_f64)?;
        let std_dev = std_dev(&as_f64)?;

        // Nearest-rank method
        let percentile = |p: f64| -> u64 {
            let idx = ((p / 100.0) * n as f64).ceil() as usize;
            sorted[idx.saturating_sub(1).min(n - 1)]
        };

        Some(Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            std_dev,
            p50: percentile(50.0),
            p95: percentile(95.0),
            p99: percentile(99.0),
            p999: percentile(99.9),
        })
    }

    /// Coefficient of variation (std_dev / mean)
    #[must_use]
    pub fn cv(&self) -> f64 {
        if self.mean.abs() < f64::EPSILON {
            f64::INFINITY
        } else {
            self.std_dev / self.mean
        }
    }
}

/// Indices of outliers by modified z-score over the median absolute deviation
///
/// `threshold` is typically 3.5. Fewer than three samples, or a zero MAD,
/// yields no outliers.
#[must_use]
pub fn detect_outliers(samples: &[f64], threshold: f64) -> Vec<usize> {
    if samples.len() < 3 {
        return Vec::new();
    }
    let Some(median) = median_f64(samples) else {
        return Vec::new();
    };
    let deviations: Vec<f64> = samples.iter().map(|x| (x - median).abs()).collect();
    let Some(mad) = median_f64(&deviations) else {
        return Vec::new();
    };
    if mad < f64::EPSILON {
        return Vec::new();
    }

    // Scale factor relating MAD to sigma for normal data
    let k = 1.4826;
    samples
        .iter()
        .enumerate()
        .filter(|(_, &x)| ((x - median) / (k * mad)).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}
