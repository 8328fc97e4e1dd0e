//! Warm-up, timed trials and reduction
//!
//! A [`TrialTimer`] moves through `Idle -> WarmingUp -> Trialing -> Reduced`.
//! Warm-up runs are never recorded. Each trial brackets exactly one kernel
//! invocation with two tick reads. The trial set is then reduced to a single
//! representative value:
//!
//! - [`Reduction::Min`] for throughput kernels: noise only ever adds time,
//!   so the fastest run is the best estimate of achievable throughput.
//! - [`Reduction::Median`] for dependent-load latency chains, where noise can
//!   push a trial either way.

use std::{fmt, hint::black_box};

use serde::{Deserialize, Serialize};

use crate::{
    clock::{ReferenceClock, TickSource, TickUnit},
    error::{HwprobeError, Result},
    stats::{self, TrialSummary},
};

/// Outlier threshold for the debug report (modified z-score)
const OUTLIER_Z: f64 = 3.5;

/// How a trial set collapses to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Fastest trial
    Min,
    /// Middle trial by rank
    Median,
}

impl Reduction {
    /// Apply to raw samples; `None` when empty
    #[must_use]
    pub fn apply(self, samples: &[u64]) -> Option<u64> {
        match self {
            Self::Min => stats::min(samples),
            Self::Median => stats::median(samples),
        }
    }
}

/// Lifecycle phase of a [`TrialTimer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerPhase {
    /// Nothing run yet
    Idle,
    /// Warm-up runs done, no trials yet
    WarmingUp,
    /// Trials recorded
    Trialing,
    /// Reduced; terminal
    Reduced,
}

impl TimerPhase {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WarmingUp => "warming up",
            Self::Trialing => "trialing",
            Self::Reduced => "reduced",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one timed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Reduced tick value
    pub representative: u64,
    /// Unit of every tick value here
    pub unit: TickUnit,
    /// Reduction used
    pub reduction: Reduction,
    /// Raw trial samples in recording order, warm-up excluded
    pub samples: Vec<u64>,
}

impl Measurement {
    /// Representative value in seconds, if convertible
    #[must_use]
    pub fn seconds(&self, clock: &ReferenceClock) -> Option<f64> {
        clock.ticks_to_seconds(self.representative as f64, self.unit)
    }

    /// Sum of all trial samples
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.samples.iter().fold(0_u64, |acc, &s| acc.saturating_add(s))
    }

    /// Descriptive statistics of the trial set
    #[must_use]
    pub fn summary(&self) -> Option<TrialSummary> {
        TrialSummary::from_samples(&self.samples)
    }
}

/// Runs a kernel through warm-up and timed trials
pub struct TrialTimer<S: TickSource> {
    source: S,
    warmup: usize,
    reps: usize,
    reduction: Reduction,
    phase: TimerPhase,
    samples: Vec<u64>,
}

impl<S: TickSource> TrialTimer<S> {
    /// New idle timer
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] when `reps` is zero.
    pub fn new(source: S, warmup: usize, reps: usize, reduction: Reduction) -> Result<Self> {
        if reps == 0 {
            return Err(HwprobeError::config("reps", "at least one trial is required"));
        }
        Ok(Self {
            source,
            warmup,
            reps,
            reduction,
            phase: TimerPhase::Idle,
            samples: Vec::with_capacity(reps),
        })
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Recorded samples so far
    #[must_use]
    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    fn expect_phase(&self, expected: TimerPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(HwprobeError::InvalidState {
                expected: expected.as_str(),
                actual: self.phase.as_str(),
            })
        }
    }

    /// `Idle -> WarmingUp`: run `f` the configured number of times, untimed
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidState`] unless idle.
    pub fn warm_up<R>(&mut self, mut f: impl FnMut() -> R) -> Result<()> {
        self.expect_phase(TimerPhase::Idle)?;
        for _ in 0..self.warmup {
            black_box(f());
        }
        self.phase = TimerPhase::WarmingUp;
        log::debug!("warm-up done ({} runs)", self.warmup);
        Ok(())
    }

    /// `WarmingUp -> Trialing`: time `reps` invocations of `f`
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidState`] unless warm-up has run.
    pub fn run_trials<R>(&mut self, mut f: impl FnMut() -> R) -> Result<()> {
        self.expect_phase(TimerPhase::WarmingUp)?;
        for _ in 0..self.reps {
            let t0 = self.source.read();
            let out = f();
            let t1 = self.source.read();
            black_box(out);
            self.samples.push(t1.saturating_sub(t0));
        }
        self.phase = TimerPhase::Trialing;
        Ok(())
    }

    /// `Trialing -> Reduced`: collapse the trial set
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidState`] unless trials have run.
    pub fn reduce(&mut self) -> Result<Measurement> {
        self.expect_phase(TimerPhase::Trialing)?;
        let representative = self.reduction.apply(&self.samples).ok_or(
            HwprobeError::InvalidState {
                expected: TimerPhase::Trialing.as_str(),
                actual: "empty",
            },
        )?;
        self.phase = TimerPhase::Reduced;

        let unit = self.source.unit();
        log::debug!(
            "{} trials via {} ({}): {:?} -> {:?} {}",
            self.samples.len(),
            self.source.name(),
            unit.label(),
            self.samples,
            self.reduction,
            representative,
        );
        let as_f64: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();
        let outliers = stats::detect_outliers(&as_f64, OUTLIER_Z);
        if !outliers.is_empty() {
            log::debug!("{} noisy trial(s) at {:?}", outliers.len(), outliers);
        }

        Ok(Measurement {
            representative,
            unit,
            reduction: self.reduction,
            samples: std::mem::take(&mut self.samples),
        })
    }

    /// Warm up with `f`, run the trials with `f` and reduce
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidState`] unless idle.
    pub fn measure<R>(mut self, mut f: impl FnMut() -> R) -> Result<Measurement> {
        self.warm_up(&mut f)?;
        self.run_trials(&mut f)?;
        self.reduce()
    }
}
