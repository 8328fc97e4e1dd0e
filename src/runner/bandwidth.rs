//! Mixed read/write bandwidth benchmark
//!
//! Two `f32` buffers (`x` all ones, `y` all twos) are swept at a fixed
//! stride by a rayon pool. The index space is split into contiguous static
//! chunks, one per worker, and every chunk starts on a stride boundary so
//! the union of chunks visits exactly the indices a single thread would.
//! Each worker owns a `SmallRng` seeded with `seed + worker`.

use rand::{rngs::SmallRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    buffer::{AlignedBuffer, DEFAULT_ALIGN},
    clock::{MonotonicClock, ReferenceClock},
    config::BandwidthConfig,
    error::{HwprobeError, Result},
    kernels::rw_sweep,
    metrics,
    runner::{kernel::MIN_SECONDS, TextReport},
    sink::BandwidthRow,
    timer::{Reduction, TrialTimer},
};

const X_INIT: f32 = 1.0;
const Y_INIT: f32 = 2.0;

/// Outcome of one bandwidth run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthResult {
    /// Working-set size per buffer
    pub bytes: usize,
    /// Element stride
    pub stride: usize,
    /// Timed sweeps
    pub repeats: usize,
    /// Read percentage
    pub read_percent: u32,
    /// Worker threads
    pub threads: usize,
    /// Wall time of all timed sweeps, seconds
    pub total_seconds: f64,
    /// Bytes touched across all timed sweeps
    pub bytes_accessed: f64,
    /// Aggregate GiB/s over all timed sweeps
    pub gib_per_s: f64,
    /// Fastest single sweep, seconds
    pub best_seconds: f64,
    /// GiB/s of the fastest sweep
    pub best_gib_per_s: f64,
    /// Write accesses performed, warm-up included
    pub writes: usize,
    /// Elements of `y` that no longer hold their initial value
    pub modified_elements: usize,
}

impl TextReport for BandwidthResult {
    fn render_text(&self) -> String {
        format!(
            "N_bytes={},stride={},repeats={},read%={},threads={},time={:.6},GiB/s={:.3}",
            self.bytes,
            self.stride,
            self.repeats,
            self.read_percent,
            self.threads,
            self.total_seconds,
            self.gib_per_s,
        )
    }
}

impl BandwidthResult {
    /// CSV row stamped with `timestamp`, carrying the summary-line values
    #[must_use]
    pub fn to_row(&self, timestamp: String) -> BandwidthRow {
        BandwidthRow {
            timestamp,
            n_bytes: self.bytes,
            stride: self.stride,
            repeats: self.repeats,
            read_pct: self.read_percent,
            threads: self.threads,
            time: self.total_seconds,
            gib_per_s: self.gib_per_s,
        }
    }
}

/// Elements per worker chunk, rounded to whole strides
fn chunk_len(accesses: usize, threads: usize, stride: usize) -> usize {
    accesses.div_ceil(threads.max(1)).max(1) * stride
}

/// Run the bandwidth benchmark described by `cfg`
///
/// # Errors
///
/// Configuration errors, allocation failures, and thread-pool construction
/// failures (reported as an invalid `threads` value).
pub fn run_bandwidth(cfg: &BandwidthConfig) -> Result<BandwidthResult> {
    cfg.validate()?;
    let n = cfg.elements();
    let x = AlignedBuffer::<f32>::filled(n, DEFAULT_ALIGN, 0, X_INIT)?;
    let mut y = AlignedBuffer::<f32>::filled(n, DEFAULT_ALIGN, 0, Y_INIT)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.threads)
        .build()
        .map_err(|e| HwprobeError::config("threads", e.to_string()))?;

    let accesses = cfg.accesses_per_sweep();
    let chunk = chunk_len(accesses, cfg.threads, cfg.stride);
    let mut rngs: Vec<SmallRng> = (0..cfg.threads as u64)
        .map(|t| SmallRng::seed_from_u64(cfg.seed.wrapping_add(t)))
        .collect();
    log::info!(
        "bandwidth: {n} elements, {accesses} accesses/sweep, {} worker(s), chunk {chunk}",
        cfg.threads
    );

    let (stride, read_percent) = (cfg.stride, cfg.read_percent);
    let mut writes = 0_usize;
    let timer = TrialTimer::new(MonotonicClock::new(), cfg.warmup, cfg.repeats, Reduction::Min)?;
    let measurement = timer.measure(|| {
        let w: usize = pool.install(|| {
            x.par_chunks(chunk)
                .zip(y.par_chunks_mut(chunk))
                .zip(rngs.par_iter_mut())
                .map(|((xc, yc), rng)| rw_sweep(xc, yc, stride, read_percent, rng))
                .sum()
        });
        writes += w;
        w
    })?;

    let clock = ReferenceClock::unknown();
    let to_secs = |ticks: u64| {
        clock
            .ticks_to_seconds(ticks as f64, measurement.unit)
            .unwrap_or(0.0)
            .max(MIN_SECONDS)
    };
    let total_seconds = to_secs(measurement.total_ticks());
    let best_seconds = to_secs(measurement.representative);
    let sweep_bytes = (accesses * std::mem::size_of::<f32>()) as f64;
    let bytes_accessed = sweep_bytes * cfg.repeats as f64;
    let modified_elements = y.iter().filter(|&&v| v != Y_INIT).count();

    Ok(BandwidthResult {
        bytes: cfg.bytes,
        stride: cfg.stride,
        repeats: cfg.repeats,
        read_percent: cfg.read_percent,
        threads: cfg.threads,
        total_seconds,
        bytes_accessed,
        gib_per_s: metrics::gib_per_s(bytes_accessed, total_seconds),
        best_seconds,
        best_gib_per_s: metrics::gib_per_s(sweep_bytes, best_seconds),
        writes,
        modified_elements,
    })
}
