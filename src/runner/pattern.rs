//! SAXPY under sequential, strided-wraparound and random offsets

use serde::{Deserialize, Serialize};

use crate::{
    buffer::{AlignedBuffer, DEFAULT_ALIGN},
    clock::{platform_counter, ReferenceClock, TickUnit},
    config::PatternConfig,
    error::Result,
    kernels::{saxpy_indexed, AccessPattern, IndexPlan},
    metrics::{self, Metric},
    permutation::shuffled_order,
    runner::TextReport,
    sink::PatternRow,
    timer::{Reduction, TrialTimer},
};

/// Multiplier of the pattern kernel
pub const PATTERN_A: f32 = 1.1;

/// Bytes moved per element: `x` and `y` read, `y` written
pub const BYTES_PER_ELEMENT: f64 = 12.0;

/// Outcome of one access-pattern run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    /// Working-set size per buffer in KiB
    pub ws_kib: usize,
    /// Stride used by the strided pattern
    pub stride: usize,
    /// Pattern run
    pub pattern: AccessPattern,
    /// Timed repetitions
    pub repeats: usize,
    /// Ticks summed over all timed repetitions
    pub ticks: u64,
    /// Unit of `ticks`
    pub unit: TickUnit,
    /// Bytes moved over all timed repetitions
    pub bytes: f64,
    /// Seconds over all timed repetitions, when ticks convert to time
    pub seconds: Metric,
    /// Aggregate GiB/s, when ticks convert to time
    pub gib_per_s: Metric,
    /// Nanoseconds per byte moved, when ticks convert to time
    pub ns_per_byte: Metric,
}

impl PatternResult {
    /// CSV row stamped with `timestamp`
    #[must_use]
    pub fn to_row(&self, timestamp: String) -> PatternRow {
        PatternRow {
            timestamp,
            ws_kib: self.ws_kib,
            stride: self.stride,
            pattern: self.pattern.name().to_string(),
            repeats: self.repeats,
            ticks: self.ticks,
            unit: self.unit.label().to_string(),
            bytes: self.bytes,
            time_s: self.seconds.value(),
            gib_per_s: self.gib_per_s.value(),
            ns_per_byte: self.ns_per_byte.value(),
        }
    }
}

impl TextReport for PatternResult {
    fn render_text(&self) -> String {
        format!(
            "ws_KiB={},stride={},pattern={},repeats={},{}={},bytes={:.0}",
            self.ws_kib,
            self.stride,
            self.pattern.code(),
            self.repeats,
            self.unit.label(),
            self.ticks,
            self.bytes,
        )
    }
}

/// Offset plan for `cfg` over `n` elements
#[must_use]
pub fn plan_for(cfg: &PatternConfig, n: usize) -> IndexPlan {
    match cfg.pattern {
        AccessPattern::Sequential => IndexPlan::Sequential,
        AccessPattern::Strided => IndexPlan::Strided(cfg.stride),
        AccessPattern::Random => IndexPlan::Random(shuffled_order(n, cfg.seed)),
    }
}

/// Run the access-pattern benchmark described by `cfg`
///
/// The random permutation is built before timing starts.
///
/// # Errors
///
/// Configuration errors and allocation failures.
pub fn run_pattern(cfg: &PatternConfig, clock: &ReferenceClock) -> Result<PatternResult> {
    cfg.validate()?;
    let n = cfg.elements();
    let x = AlignedBuffer::<f32>::filled(n, DEFAULT_ALIGN, 0, 1.0)?;
    let mut y = AlignedBuffer::<f32>::filled(n, DEFAULT_ALIGN, 0, 2.0)?;
    let plan = plan_for(cfg, n);
    log::info!("pattern {}: {n} elements, stride {}", plan.pattern(), cfg.stride);

    let timer = TrialTimer::new(platform_counter(), cfg.warmup, cfg.repeats, Reduction::Min)?;
    let m = timer.measure(|| {
        saxpy_indexed(PATTERN_A, &x, &mut y, &plan);
        y.first().copied()
    })?;

    let ticks = m.total_ticks();
    let bytes = n as f64 * BYTES_PER_ELEMENT * cfg.repeats as f64;
    let seconds = clock
        .ticks_to_seconds(ticks as f64, m.unit)
        .filter(|s| *s > 0.0);
    let gib_per_s = seconds.map(|s| metrics::gib_per_s(bytes, s));
    let ns_per_byte = seconds.filter(|_| bytes > 0.0).map(|s| s / bytes * 1e9);

    Ok(PatternResult {
        ws_kib: cfg.ws_kib,
        stride: cfg.stride,
        pattern: cfg.pattern,
        repeats: cfg.repeats,
        ticks,
        unit: m.unit,
        bytes,
        seconds: seconds.into(),
        gib_per_s: gib_per_s.into(),
        ns_per_byte: ns_per_byte.into(),
    })
}
