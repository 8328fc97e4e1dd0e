//! Kernel throughput benchmark

use std::hint::black_box;

use serde::{Deserialize, Serialize};

use crate::{
    buffer::BufferSet,
    clock::{MonotonicClock, ReferenceClock},
    config::{KernelBenchConfig, Variant},
    element::{Dtype, Element},
    error::Result,
    fpmode::FloatEnv,
    kernels::{self, Kernel, StencilCoeffs, SAXPY_A},
    metrics::{self, Metric},
    runner::TextReport,
    sink::KernelRow,
    stats::TrialSummary,
    timer::{Reduction, TrialTimer},
};

/// Timings below this are clamped so derived rates stay finite
pub const MIN_SECONDS: f64 = 1e-9;

/// Outcome of one kernel benchmark invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelResult {
    /// Kernel run
    pub kernel: Kernel,
    /// Element type
    pub dtype: Dtype,
    /// Element count
    pub n: usize,
    /// Stride in elements
    pub stride: usize,
    /// Byte misalignment of every buffer
    pub misalign: usize,
    /// Variant label
    pub variant: Variant,
    /// Best trial in seconds
    pub seconds: f64,
    /// Achieved GFLOP/s
    pub gflops: f64,
    /// Cycles per element at the reference frequency
    pub cpe: Metric,
    /// Whether FTZ/DAZ was in effect
    pub flush_to_zero: bool,
    /// Trial-set statistics in nanoseconds
    pub summary: Option<TrialSummary>,
    /// Last kernel output, kept so the work stays observable
    pub checksum: f64,
}

impl KernelResult {
    /// Best trial in milliseconds
    #[must_use]
    pub fn time_ms(&self) -> f64 {
        self.seconds * 1e3
    }

    /// CSV row stamped with `timestamp`
    #[must_use]
    pub fn to_row(&self, timestamp: String) -> KernelRow {
        KernelRow {
            timestamp,
            kernel: self.kernel.name().to_string(),
            dtype: self.dtype.name().to_string(),
            n: self.n,
            stride: self.stride,
            misalign: self.misalign,
            variant: self.variant.name().to_string(),
            time_ms: self.time_ms(),
            gflops: self.gflops,
            cpe: self.cpe.value(),
        }
    }
}

impl TextReport for KernelResult {
    fn render_text(&self) -> String {
        format!(
            "kernel={},dtype={},N={},stride={},misalign={},variant={},time_ms={:.6},gflops={:.6},cpe={}",
            self.kernel,
            self.dtype,
            self.n,
            self.stride,
            self.misalign,
            self.variant,
            self.time_ms(),
            self.gflops,
            self.cpe.display(6),
        )
    }
}

/// One invocation of `kernel` over `bufs`; returns a value derived from the output
fn invoke<T: Element>(kernel: Kernel, n: usize, stride: usize, bufs: &mut BufferSet<T>) -> T {
    match kernel {
        Kernel::Saxpy => {
            let a = T::from_f64(SAXPY_A).unwrap_or_else(T::nan);
            kernels::saxpy(n, a, &bufs.x, &mut bufs.y, stride);
            bufs.y.first().copied().unwrap_or_else(T::zero)
        },
        Kernel::Dot => kernels::dot(n, &bufs.x, &bufs.y, stride),
        Kernel::Mul => {
            kernels::mul(n, &bufs.x, &bufs.y, &mut bufs.z, stride);
            bufs.z.first().copied().unwrap_or_else(T::zero)
        },
        Kernel::Stencil3 => {
            kernels::stencil3(n, StencilCoeffs::default(), &bufs.x, &mut bufs.y, stride);
            bufs.y.first().copied().unwrap_or_else(T::zero)
        },
        // rejected by validate()
        Kernel::RwMix | Kernel::Chase => T::zero(),
    }
}

fn run_typed<T: Element>(cfg: &KernelBenchConfig, clock: &ReferenceClock) -> Result<KernelResult> {
    let mut bufs = BufferSet::<T>::provision(cfg.buffer_len(), cfg.align, cfg.misalign)?;
    bufs.init_random(cfg.seed);
    log::info!(
        "provisioned 3 x {} {} elements (align {}, misalign {})",
        bufs.len(),
        T::DTYPE,
        bufs.x.alignment(),
        bufs.x.misalignment()
    );

    let (kernel, n, stride) = (cfg.kernel, cfg.n, cfg.stride);
    let timer = TrialTimer::new(MonotonicClock::new(), cfg.warmup, cfg.reps, Reduction::Min)?;
    let mut last = T::zero();
    let measurement = timer.measure(|| {
        last = invoke(kernel, n, stride, &mut bufs);
        last
    })?;

    let seconds = measurement
        .seconds(clock)
        .unwrap_or(MIN_SECONDS)
        .max(MIN_SECONDS);
    let cpe = metrics::cycles_per_element(seconds, n, clock);
    if clock.ghz().is_none() {
        log::warn!("no reference clock (--cpu-ghz / CPU_GHZ); cpe reported as NA");
    }
    let summary = measurement.summary();
    if let Some(s) = &summary {
        log::debug!("{} trials, cv {:.3}, p95 {} ns", s.count, s.cv(), s.p95);
    }

    Ok(KernelResult {
        kernel,
        dtype: T::DTYPE,
        n,
        stride,
        misalign: cfg.misalign,
        variant: cfg.variant,
        seconds,
        gflops: metrics::gflops(n, kernel.flops_per_element(), seconds),
        cpe,
        flush_to_zero: false,
        summary,
        checksum: black_box(last).as_(),
    })
}

/// Run the kernel benchmark described by `cfg`
///
/// # Errors
///
/// Configuration errors from [`KernelBenchConfig::validate`] and allocation
/// failures from buffer provisioning.
pub fn run_kernel_bench(cfg: &KernelBenchConfig, clock: &ReferenceClock) -> Result<KernelResult> {
    cfg.validate()?;
    let fp = FloatEnv::configure(cfg.flush_to_zero);

    let mut result = match cfg.dtype {
        Dtype::F32 => run_typed::<f32>(cfg, clock),
        Dtype::F64 => run_typed::<f64>(cfg, clock),
    }?;
    result.flush_to_zero = fp.is_active();
    drop(fp);

    log::info!(
        "{} {} N={}: {:.6} ms, {:.3} GFLOP/s",
        result.kernel,
        result.dtype,
        result.n,
        result.time_ms(),
        result.gflops
    );
    Ok(result)
}
