//! Per-tool run configuration
//!
//! Every value a run depends on lives here, including the seed and the
//! reference clock; nothing is read from process-wide state after startup.

use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    buffer::{check_placement, DEFAULT_ALIGN},
    element::Dtype,
    error::{HwprobeError, Result},
    kernels::{AccessPattern, Kernel},
    sink::DEFAULT_CSV_PATH,
};

/// Build variant label recorded with each result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Binary built without auto-vectorisation
    Scalar,
    /// Binary built with auto-vectorisation
    #[default]
    Simd,
}

impl Variant {
    /// Lowercase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Simd => "simd",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = HwprobeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scalar" => Ok(Self::Scalar),
            "simd" => Ok(Self::Simd),
            other => Err(HwprobeError::config(
                "variant",
                format!("'{other}' (expected scalar or simd)"),
            )),
        }
    }
}

/// How a stdout tool prints its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single `key=value,...` text line
    #[default]
    Line,
    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = HwprobeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "line" | "text" => Ok(Self::Line),
            "json" => Ok(Self::Json),
            other => Err(HwprobeError::config(
                "format",
                format!("'{other}' (expected line or json)"),
            )),
        }
    }
}

fn at_least_one(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        Err(HwprobeError::config(field, "must be >= 1"))
    } else {
        Ok(())
    }
}

// ============================================================================
// Kernel throughput tool
// ============================================================================

/// Configuration of the kernel throughput benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelBenchConfig {
    /// Kernel to run; must be a throughput kernel
    pub kernel: Kernel,
    /// Element type
    pub dtype: Dtype,
    /// Logical element count
    pub n: usize,
    /// Timed repetitions
    pub reps: usize,
    /// Untimed warm-up runs
    pub warmup: usize,
    /// Element stride
    pub stride: usize,
    /// Buffer alignment in bytes
    pub align: usize,
    /// Extra byte offset after alignment
    pub misalign: usize,
    /// Enable FTZ/DAZ during the run
    pub flush_to_zero: bool,
    /// Input generator seed
    pub seed: u64,
    /// Result log destination
    pub csv_path: PathBuf,
    /// Variant label
    pub variant: Variant,
}

impl Default for KernelBenchConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Saxpy,
            dtype: Dtype::F32,
            n: 1 << 20,
            reps: 3,
            warmup: 1,
            stride: 1,
            align: DEFAULT_ALIGN,
            misalign: 0,
            flush_to_zero: false,
            seed: 12345,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            variant: Variant::Simd,
        }
    }
}

impl KernelBenchConfig {
    /// Padding elements past the strided span, as in the historical layout
    pub const PAD_ELEMENTS: usize = 8;

    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the kernel
    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set the element type
    #[must_use]
    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = dtype;
        self
    }

    /// Set the element count
    #[must_use]
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Set timed repetitions
    #[must_use]
    pub fn with_reps(mut self, reps: usize) -> Self {
        self.reps = reps;
        self
    }

    /// Set warm-up runs
    #[must_use]
    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    /// Set the stride
    #[must_use]
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Set alignment and misalignment in bytes
    #[must_use]
    pub fn with_placement(mut self, align: usize, misalign: usize) -> Self {
        self.align = align;
        self.misalign = misalign;
        self
    }

    /// Enable or disable FTZ/DAZ
    #[must_use]
    pub fn with_flush_to_zero(mut self, enable: bool) -> Self {
        self.flush_to_zero = enable;
        self
    }

    /// Set the input seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the result log path
    #[must_use]
    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = path.into();
        self
    }

    /// Set the variant label
    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Elements allocated per buffer: strided span plus padding
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.n
            .saturating_mul(self.stride)
            .saturating_add(Self::PAD_ELEMENTS)
    }

    /// Check ranges and combinations
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] for the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.kernel.is_throughput() {
            return Err(HwprobeError::config(
                "kernel",
                format!("'{}' has its own subcommand", self.kernel),
            ));
        }
        at_least_one("reps", self.reps)?;
        at_least_one("stride", self.stride)?;
        if self.n.checked_mul(self.stride).is_none() {
            return Err(HwprobeError::config("N", "N * stride overflows"));
        }
        match self.dtype {
            Dtype::F32 => check_placement::<f32>(self.align, self.misalign),
            Dtype::F64 => check_placement::<f64>(self.align, self.misalign),
        }
    }
}

// ============================================================================
// Bandwidth tool
// ============================================================================

/// Configuration of the mixed read/write bandwidth benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthConfig {
    /// Working-set size per buffer in bytes
    pub bytes: usize,
    /// Element stride
    pub stride: usize,
    /// Timed repetitions
    pub repeats: usize,
    /// Percentage of accesses that only read (0..=100)
    pub read_percent: u32,
    /// Worker threads
    pub threads: usize,
    /// Untimed warm-up sweeps
    pub warmup: usize,
    /// Base seed; thread `t` uses `seed + t`
    pub seed: u64,
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            bytes: 1 << 20,
            stride: 1,
            repeats: 1,
            read_percent: 100,
            threads: 1,
            warmup: 0,
            seed: 1234,
        }
    }
}

impl BandwidthConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working-set size in bytes
    #[must_use]
    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = bytes;
        self
    }

    /// Set the stride
    #[must_use]
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Set timed repetitions
    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Set the read percentage
    #[must_use]
    pub fn with_read_percent(mut self, pct: u32) -> Self {
        self.read_percent = pct;
        self
    }

    /// Set the thread count
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set warm-up sweeps
    #[must_use]
    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    /// Set the base seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `f32` elements per buffer
    #[must_use]
    pub fn elements(&self) -> usize {
        self.bytes / std::mem::size_of::<f32>()
    }

    /// Indices visited per sweep
    #[must_use]
    pub fn accesses_per_sweep(&self) -> usize {
        self.elements().div_ceil(self.stride.max(1))
    }

    /// Check ranges
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] for the first offending field.
    pub fn validate(&self) -> Result<()> {
        at_least_one("stride", self.stride)?;
        at_least_one("repeats", self.repeats)?;
        at_least_one("threads", self.threads)?;
        if self.read_percent > 100 {
            return Err(HwprobeError::config(
                "read_percent",
                format!("{} is outside 0..=100", self.read_percent),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Pointer-chase tool
// ============================================================================

/// Configuration of the pointer-chase latency sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaseConfig {
    /// Working-set sizes in bytes, one measurement each
    pub sizes: Vec<usize>,
    /// Dependent loads per trial
    pub hops: usize,
    /// Trials per size
    pub trials: usize,
    /// Untimed hops before the first trial
    pub warmup_hops: usize,
    /// Cycle construction seed
    pub seed: u64,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            sizes: vec![16 << 10, 256 << 10, 16 << 20, 256 << 20],
            hops: 5_000_000,
            trials: 9,
            warmup_hops: 100_000,
            seed: 123_456_789,
        }
    }
}

impl ChaseConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set working-set sizes
    #[must_use]
    pub fn with_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Set hops per trial
    #[must_use]
    pub fn with_hops(mut self, hops: usize) -> Self {
        self.hops = hops;
        self
    }

    /// Set trials per size
    #[must_use]
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Set warm-up hops
    #[must_use]
    pub fn with_warmup_hops(mut self, hops: usize) -> Self {
        self.warmup_hops = hops;
        self
    }

    /// Check ranges
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] for the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(HwprobeError::config("sizes", "at least one size is required"));
        }
        if let Some(&bad) = self.sizes.iter().find(|&&s| s < std::mem::size_of::<u32>()) {
            return Err(HwprobeError::config(
                "sizes",
                format!("{bad} bytes holds no u32 entry"),
            ));
        }
        at_least_one("hops", self.hops)?;
        at_least_one("trials", self.trials)
    }
}

// ============================================================================
// Access-pattern tool
// ============================================================================

/// Configuration of the access-pattern SAXPY benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Working-set size per buffer in KiB
    pub ws_kib: usize,
    /// Stride for the strided pattern
    pub stride: usize,
    /// Offset pattern
    pub pattern: AccessPattern,
    /// Timed repetitions
    pub repeats: usize,
    /// Untimed warm-up runs
    pub warmup: usize,
    /// Seed of the random pattern's permutation
    pub seed: u64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            ws_kib: 1024,
            stride: 1,
            pattern: AccessPattern::Sequential,
            repeats: 1,
            warmup: 1,
            seed: 12345,
        }
    }
}

impl PatternConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working-set size in KiB
    #[must_use]
    pub fn with_ws_kib(mut self, kib: usize) -> Self {
        self.ws_kib = kib;
        self
    }

    /// Set the stride
    #[must_use]
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Set the pattern
    #[must_use]
    pub fn with_pattern(mut self, pattern: AccessPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set timed repetitions
    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// `f32` elements per buffer
    #[must_use]
    pub fn elements(&self) -> usize {
        self.ws_kib.saturating_mul(1024) / std::mem::size_of::<f32>()
    }

    /// Check ranges
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] for the first offending field.
    pub fn validate(&self) -> Result<()> {
        at_least_one("stride", self.stride)?;
        at_least_one("repeats", self.repeats)?;
        if self.ws_kib.checked_mul(1024).is_none() {
            return Err(HwprobeError::config("ws_kib", "size overflows"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_defaults_and_builder() {
        let def = KernelBenchConfig::default();
        assert_eq!(def.kernel, Kernel::Saxpy);
        assert_eq!(def.n, 1 << 20);
        assert_eq!(def.reps, 3);
        assert_eq!(def.align, 64);
        assert_eq!(def.seed, 12345);
        assert_eq!(def.csv_path, PathBuf::from("results/default_results.csv"));
        def.validate().unwrap();

        let built = KernelBenchConfig::new()
            .with_kernel(Kernel::Stencil3)
            .with_dtype(Dtype::F64)
            .with_n(100)
            .with_stride(3)
            .with_placement(128, 16)
            .with_variant(Variant::Scalar);
        assert_eq!(built.buffer_len(), 308);
        built.validate().unwrap();
    }

    #[test]
    fn test_kernel_validation() {
        let bad = [
            KernelBenchConfig::new().with_reps(0),
            KernelBenchConfig::new().with_stride(0),
            KernelBenchConfig::new().with_kernel(Kernel::Chase),
            KernelBenchConfig::new().with_placement(24, 0),
            KernelBenchConfig::new().with_dtype(Dtype::F64).with_placement(64, 4),
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(HwprobeError::InvalidConfig { .. })),
                "{cfg:?}"
            );
        }
        KernelBenchConfig::new().with_placement(64, 4).validate().unwrap();
    }

    #[test]
    fn test_bandwidth_config() {
        let cfg = BandwidthConfig::new().with_bytes(1 << 20).with_stride(3);
        assert_eq!(cfg.elements(), 262_144);
        assert_eq!(cfg.accesses_per_sweep(), 87_382);
        cfg.validate().unwrap();
        assert!(BandwidthConfig::new().with_read_percent(101).validate().is_err());
        assert!(BandwidthConfig::new().with_threads(0).validate().is_err());
    }

    #[test]
    fn test_chase_config() {
        let def = ChaseConfig::default();
        assert_eq!(def.sizes, vec![16_384, 262_144, 16_777_216, 268_435_456]);
        assert_eq!(def.trials, 9);
        def.validate().unwrap();
        assert!(ChaseConfig::new().with_sizes(vec![]).validate().is_err());
        assert!(ChaseConfig::new().with_sizes(vec![2]).validate().is_err());
        assert!(ChaseConfig::new().with_trials(0).validate().is_err());
    }

    #[test]
    fn test_pattern_config() {
        let cfg = PatternConfig::new().with_ws_kib(4);
        assert_eq!(cfg.elements(), 1024);
        cfg.validate().unwrap();
        assert!(PatternConfig::new().with_repeats(0).validate().is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("scalar".parse::<Variant>().unwrap(), Variant::Scalar);
        assert!("avx".parse::<Variant>().is_err());
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    }

    #[test]
    fn test_config_serde() {
        let cfg = KernelBenchConfig::new().with_kernel(Kernel::Dot);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"kernel\":\"dot\""));
        let back: KernelBenchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
