//! Pointer-chase load latency across working-set sizes

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{
    clock::{platform_counter, ReferenceClock, TickSource},
    config::ChaseConfig,
    error::Result,
    kernels::chase,
    metrics::Metric,
    permutation::random_cycle,
    runner::TextReport,
    stats::TrialSummary,
    timer::{Reduction, TrialTimer},
};

/// Latency at one working-set size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChasePoint {
    /// Working-set size in bytes
    pub bytes: usize,
    /// `u32` entries in the cycle
    pub entries: usize,
    /// Median cycles per dependent load
    pub cycles_per_load: Metric,
    /// Median nanoseconds per dependent load
    pub ns_per_load: Metric,
    /// Trial statistics in raw ticks per trial
    pub summary: Option<TrialSummary>,
    /// Index the chain ended on
    pub final_index: u32,
}

/// Full latency sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaseReport {
    /// Reference frequency used for conversions
    pub freq_ghz: Metric,
    /// Name of the tick source
    pub counter: String,
    /// One point per configured size, in order
    pub points: Vec<ChasePoint>,
}

impl TextReport for ChaseReport {
    fn render_text(&self) -> String {
        let mut out = format!(
            "freq_GHz={}\nbytes,entries,cycles/load,ns/load",
            self.freq_ghz.display(2)
        );
        for p in &self.points {
            let _ = write!(
                out,
                "\n{},{},{},{}",
                p.bytes,
                p.entries,
                p.cycles_per_load.display(2),
                p.ns_per_load.display(2)
            );
        }
        out
    }
}

fn measure_size<S: TickSource>(
    source: S,
    bytes: usize,
    cfg: &ChaseConfig,
    clock: &ReferenceClock,
) -> Result<ChasePoint> {
    let entries = bytes / std::mem::size_of::<u32>();
    let next = random_cycle(entries, cfg.seed)?;
    log::info!("chase: {bytes} bytes, {entries} entries, {} hops x {} trials", cfg.hops, cfg.trials);

    let warmup_runs = usize::from(cfg.warmup_hops > 0);
    let mut timer = TrialTimer::new(source, warmup_runs, cfg.trials, Reduction::Median)?;
    let mut cur = 0_u32;
    timer.warm_up(|| {
        cur = chase(&next, cur, cfg.warmup_hops);
        cur
    })?;
    timer.run_trials(|| {
        cur = chase(&next, cur, cfg.hops);
        cur
    })?;
    let m = timer.reduce()?;

    let per_hop = m.representative as f64 / cfg.hops as f64;
    Ok(ChasePoint {
        bytes,
        entries,
        cycles_per_load: clock.ticks_to_cycles(per_hop, m.unit).into(),
        ns_per_load: clock.ticks_to_nanos(per_hop, m.unit).into(),
        summary: m.summary(),
        final_index: cur,
    })
}

/// Measure median load latency for every size in `cfg`
///
/// Uses the platform's cycle counter when there is one. Per-load values that
/// need the reference frequency are `NA` without it.
///
/// # Errors
///
/// Configuration errors, and sizes whose entry count does not fit `u32`.
pub fn run_chase(cfg: &ChaseConfig, clock: &ReferenceClock) -> Result<ChaseReport> {
    cfg.validate()?;
    let counter = platform_counter();
    if clock.ghz().is_none() {
        log::warn!("no reference clock (--cpu-ghz / CPU_GHZ); some latency columns will be NA");
    }

    let points = cfg
        .sizes
        .iter()
        .map(|&bytes| measure_size(&*counter, bytes, cfg, clock))
        .collect::<Result<Vec<_>>>()?;

    Ok(ChaseReport {
        freq_ghz: clock.ghz().into(),
        counter: counter.name().to_string(),
        points,
    })
}
