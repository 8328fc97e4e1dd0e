//! Throughput, bandwidth and per-element cycle derivations

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::ReferenceClock;

/// Bytes per GiB
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// A derived value that may be unmeasurable on this run
///
/// Text output renders the missing case as `NA`, never as `0` or a guess.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metric(pub Option<f64>);

impl Metric {
    /// Not available
    pub const NA: Metric = Metric(None);

    /// Inner value
    #[must_use]
    pub fn value(self) -> Option<f64> {
        self.0
    }

    /// Whether a value is present
    #[must_use]
    pub fn is_available(self) -> bool {
        self.0.is_some()
    }

    /// Render with `decimals` fractional digits or `NA`
    #[must_use]
    pub fn display(self, decimals: usize) -> String {
        match self.0 {
            Some(v) => format!("{v:.decimals$}"),
            None => "NA".to_string(),
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(v: Option<f64>) -> Self {
        Self(v)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0, f.precision()) {
            (Some(v), Some(p)) => write!(f, "{v:.p$}"),
            (Some(v), None) => write!(f, "{v}"),
            (None, _) => f.write_str("NA"),
        }
    }
}

/// GFLOP/s for `elements * flops_per_element` in `seconds`
#[must_use]
pub fn gflops(elements: usize, flops_per_element: f64, seconds: f64) -> f64 {
    (elements as f64 * flops_per_element) / seconds / 1e9
}

/// GiB/s for `bytes` moved in `seconds`
#[must_use]
pub fn gib_per_s(bytes: f64, seconds: f64) -> f64 {
    bytes / seconds / GIB
}

/// Cycles per element at the reference frequency
///
/// `NA` without a frequency, and for zero elements where no per-element
/// cost was measured.
#[must_use]
pub fn cycles_per_element(seconds: f64, elements: usize, clock: &ReferenceClock) -> Metric {
    if elements == 0 {
        return Metric::NA;
    }
    Metric(clock.ghz().map(|ghz| seconds * ghz * 1e9 / elements as f64))
}
