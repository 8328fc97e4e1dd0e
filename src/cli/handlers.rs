//! Command-line surface
//!
//! Argument structs convert into the library's configuration types; every
//! range check lives in those types' `validate()`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::{
    config::{BandwidthConfig, ChaseConfig, KernelBenchConfig, OutputFormat, PatternConfig, Variant},
    element::Dtype,
    history::SummaryKind,
    kernels::{AccessPattern, Kernel},
    sink::DEFAULT_CSV_PATH,
};

/// hwprobe - floating-point throughput, bandwidth and latency microbenchmarks
#[derive(Parser, Debug)]
#[command(name = "hwprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Reference core frequency in GHz for cycle-based metrics
    ///
    /// Unparseable values are ignored with a warning.
    #[arg(long, global = true, env = "CPU_GHZ", value_name = "GHZ")]
    pub cpu_ghz: Option<String>,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format for results printed to stdout
    #[arg(long, global = true, value_enum, default_value_t = FormatArg::Line)]
    pub format: FormatArg,

    /// Tool to run
    #[command(subcommand)]
    pub command: Commands,
}

/// `--format` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// `key=value` text
    Line,
    /// One JSON object per line
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Line => Self::Line,
            FormatArg::Json => Self::Json,
        }
    }
}

/// `--variant` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    /// Built without auto-vectorisation
    Scalar,
    /// Built with auto-vectorisation
    Simd,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Scalar => Self::Scalar,
            VariantArg::Simd => Self::Simd,
        }
    }
}

/// One subcommand per tool
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Time one throughput kernel and append the result to a CSV log
    ///
    /// Examples:
    ///   hwprobe kernel --kernel saxpy --dtype f32 --N 1048576
    ///   hwprobe kernel --kernel stencil3 --stride 4 --misalign 8 --ftz
    Kernel(KernelArgs),

    /// Mixed read/write memory bandwidth over a fixed working set
    ///
    /// Example:
    ///   hwprobe bandwidth 1048576 1 10 70 4
    Bandwidth(BandwidthArgs),

    /// Dependent-load latency across cache and memory sizes
    Chase(ChaseArgs),

    /// SAXPY under sequential, strided or random offsets
    ///
    /// Example:
    ///   hwprobe pattern 1024 16 strided 10
    Pattern(PatternArgs),

    /// Aggregate repeated runs in a kernel CSV log
    Summarize(SummarizeArgs),

    /// Place measured kernel throughput on a roofline
    Roofline(RooflineArgs),
}

/// Arguments of `kernel`
#[derive(Args, Debug)]
pub struct KernelArgs {
    /// saxpy, dot, mul or stencil3
    #[arg(long, default_value = "saxpy")]
    pub kernel: Kernel,

    /// f32 or f64
    #[arg(long, default_value = "f32")]
    pub dtype: Dtype,

    /// Element count
    #[arg(short = 'n', long = "N", default_value_t = 1 << 20)]
    pub n: usize,

    /// Timed repetitions (best is reported)
    #[arg(long, default_value_t = 3)]
    pub reps: usize,

    /// Untimed warm-up runs
    #[arg(long, default_value_t = 1)]
    pub warmup: usize,

    /// Element stride
    #[arg(long, default_value_t = 1)]
    pub stride: usize,

    /// Buffer alignment in bytes (power of two)
    #[arg(long, default_value_t = 64)]
    pub align: usize,

    /// Extra byte offset past the alignment (multiple of the element size)
    #[arg(long, default_value_t = 0)]
    pub misalign: usize,

    /// Input generator seed
    #[arg(long, default_value_t = 12345)]
    pub seed: u64,

    /// Flush subnormals to zero (FTZ/DAZ) while running
    #[arg(long)]
    pub ftz: bool,

    /// CSV log to append to
    #[arg(long, default_value = DEFAULT_CSV_PATH)]
    pub csv: PathBuf,

    /// Variant label recorded with the result
    #[arg(long, value_enum, default_value_t = VariantArg::Simd)]
    pub variant: VariantArg,
}

impl KernelArgs {
    /// Equivalent run configuration
    #[must_use]
    pub fn into_config(self) -> KernelBenchConfig {
        KernelBenchConfig::new()
            .with_kernel(self.kernel)
            .with_dtype(self.dtype)
            .with_n(self.n)
            .with_reps(self.reps)
            .with_warmup(self.warmup)
            .with_stride(self.stride)
            .with_placement(self.align, self.misalign)
            .with_seed(self.seed)
            .with_flush_to_zero(self.ftz)
            .with_csv_path(self.csv)
            .with_variant(self.variant.into())
    }
}

/// Arguments of `bandwidth`
#[derive(Args, Debug)]
pub struct BandwidthArgs {
    /// Working-set size per buffer in bytes
    pub n_bytes: usize,

    /// Stride in elements
    pub stride: usize,

    /// Timed sweeps
    pub repeats: usize,

    /// Percentage of read-only accesses (0-100)
    pub read_percent: u32,

    /// Worker threads
    pub threads: usize,

    /// Untimed warm-up sweeps
    #[arg(long, default_value_t = 0)]
    pub warmup: usize,

    /// Base seed; worker t uses seed + t
    #[arg(long, default_value_t = 1234)]
    pub seed: u64,

    /// Also append the result to this CSV log
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

impl BandwidthArgs {
    /// Equivalent run configuration
    #[must_use]
    pub fn into_config(self) -> BandwidthConfig {
        BandwidthConfig::new()
            .with_bytes(self.n_bytes)
            .with_stride(self.stride)
            .with_repeats(self.repeats)
            .with_read_percent(self.read_percent)
            .with_threads(self.threads)
            .with_warmup(self.warmup)
            .with_seed(self.seed)
    }
}

/// Arguments of `chase`
#[derive(Args, Debug)]
pub struct ChaseArgs {
    /// Working-set sizes in bytes (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<usize>>,

    /// Dependent loads per trial
    #[arg(long)]
    pub hops: Option<usize>,

    /// Trials per size (median is reported)
    #[arg(long)]
    pub trials: Option<usize>,

    /// Untimed hops before the first trial
    #[arg(long)]
    pub warmup_hops: Option<usize>,
}

impl ChaseArgs {
    /// Defaults overridden by whatever was given
    #[must_use]
    pub fn into_config(self) -> ChaseConfig {
        let mut cfg = ChaseConfig::default();
        if let Some(sizes) = self.sizes {
            cfg = cfg.with_sizes(sizes);
        }
        if let Some(hops) = self.hops {
            cfg = cfg.with_hops(hops);
        }
        if let Some(trials) = self.trials {
            cfg = cfg.with_trials(trials);
        }
        if let Some(warm) = self.warmup_hops {
            cfg = cfg.with_warmup_hops(warm);
        }
        cfg
    }
}

/// Arguments of `pattern`
#[derive(Args, Debug)]
pub struct PatternArgs {
    /// Working-set size per buffer in KiB
    pub ws_kib: usize,

    /// Stride used by the strided pattern
    pub stride: usize,

    /// 0|sequential, 1|strided, 2|random
    pub pattern: AccessPattern,

    /// Timed repetitions
    pub repeats: usize,

    /// Also append the result to this CSV log
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

impl PatternArgs {
    /// Equivalent run configuration
    #[must_use]
    pub fn into_config(self) -> PatternConfig {
        PatternConfig::new()
            .with_ws_kib(self.ws_kib)
            .with_stride(self.stride)
            .with_pattern(self.pattern)
            .with_repeats(self.repeats)
    }
}

/// `--kind` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Kernel log grouped by configuration
    Kernel,
    /// Kernel log, scalar over simd median time
    Speedup,
    /// Bandwidth log grouped by configuration
    Bandwidth,
    /// Pattern log grouped by size, stride and pattern
    Pattern,
}

impl From<KindArg> for SummaryKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Kernel => Self::Kernel,
            KindArg::Speedup => Self::Speedup,
            KindArg::Bandwidth => Self::Bandwidth,
            KindArg::Pattern => Self::Pattern,
        }
    }
}

/// Arguments of `summarize`
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Which log to summarise and how to group it
    #[arg(long, value_enum, default_value_t = KindArg::Kernel)]
    pub kind: KindArg,

    /// CSV log to read; defaults to the log of the chosen kind
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Append the summary to this CSV instead of printing it
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl SummarizeArgs {
    /// Log path to read
    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        self.csv
            .clone()
            .unwrap_or_else(|| PathBuf::from(SummaryKind::from(self.kind).default_csv()))
    }
}

/// Arguments of `roofline`
#[derive(Args, Debug)]
pub struct RooflineArgs {
    /// saxpy, dot, mul or stencil3
    #[arg(long)]
    pub kernel: Kernel,

    /// f32 or f64
    #[arg(long, default_value = "f32")]
    pub dtype: Dtype,

    /// Kernel CSV log to read
    #[arg(long)]
    pub csv: PathBuf,

    /// Measured memory bandwidth in GB/s
    #[arg(long)]
    pub gbytes_per_s: f64,

    /// Peak compute for the dtype and ISA in GFLOP/s
    #[arg(long)]
    pub gflops_peak: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ReferenceClock;

    #[test]
    fn test_kernel_defaults() {
        let cli = Cli::try_parse_from(["hwprobe", "kernel"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.format, FormatArg::Line);
        match cli.command {
            Commands::Kernel(args) => {
                assert_eq!(args.into_config(), KernelBenchConfig::default());
            },
            other => panic!("expected kernel, got {other:?}"),
        }
    }

    #[test]
    fn test_kernel_flags() {
        let cli = Cli::try_parse_from([
            "hwprobe", "kernel", "--kernel", "stencil3", "--dtype", "f64", "--N", "4096", "--ftz",
            "--misalign", "8", "--variant", "scalar", "--cpu-ghz", "3.5", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.cpu_ghz.as_deref(), Some("3.5"));
        assert_eq!(cli.verbose, 2);
        let Commands::Kernel(args) = cli.command else {
            panic!("expected kernel");
        };
        let cfg = args.into_config();
        assert_eq!(cfg.kernel, Kernel::Stencil3);
        assert_eq!(cfg.dtype, Dtype::F64);
        assert_eq!(cfg.n, 4096);
        assert!(cfg.flush_to_zero);
        assert_eq!(cfg.misalign, 8);
        assert_eq!(cfg.variant, Variant::Scalar);
    }

    #[test]
    fn test_unknown_kernel_is_a_parse_error() {
        assert!(Cli::try_parse_from(["hwprobe", "kernel", "--kernel", "fft"]).is_err());
    }

    #[test]
    fn test_bandwidth_positionals() {
        let cli = Cli::try_parse_from(["hwprobe", "bandwidth", "1048576", "2", "5", "70", "4"]).unwrap();
        let Commands::Bandwidth(args) = cli.command else {
            panic!("expected bandwidth");
        };
        let cfg = args.into_config();
        assert_eq!(cfg.bytes, 1 << 20);
        assert_eq!(cfg.stride, 2);
        assert_eq!(cfg.repeats, 5);
        assert_eq!(cfg.read_percent, 70);
        assert_eq!(cfg.threads, 4);
        assert_eq!(cfg.seed, 1234);

        assert!(Cli::try_parse_from(["hwprobe", "bandwidth", "1024", "1"]).is_err());
    }

    #[test]
    fn test_malformed_cpu_ghz_still_parses() {
        let cli = Cli::try_parse_from([
            "hwprobe", "--cpu-ghz", "3.8GHz", "bandwidth", "1024", "1", "1", "100", "1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Bandwidth(_)));
        assert_eq!(
            ReferenceClock::from_setting(cli.cpu_ghz.as_deref()),
            ReferenceClock::unknown()
        );
    }

    #[test]
    fn test_pattern_and_chase() {
        let cli = Cli::try_parse_from(["hwprobe", "pattern", "64", "8", "2", "3"]).unwrap();
        let Commands::Pattern(args) = cli.command else {
            panic!("expected pattern");
        };
        assert_eq!(args.into_config().pattern, AccessPattern::Random);

        let cli =
            Cli::try_parse_from(["hwprobe", "chase", "--sizes", "1024,4096", "--trials", "5"]).unwrap();
        let Commands::Chase(args) = cli.command else {
            panic!("expected chase");
        };
        let cfg = args.into_config();
        assert_eq!(cfg.sizes, vec![1024, 4096]);
        assert_eq!(cfg.trials, 5);
        assert_eq!(cfg.hops, ChaseConfig::default().hops);
    }

    #[test]
    fn test_roofline_requires_ceilings() {
        assert!(Cli::try_parse_from(["hwprobe", "roofline", "--kernel", "dot", "--csv", "x.csv"]).is_err());
        let cli = Cli::try_parse_from([
            "hwprobe", "--format", "json", "roofline", "--kernel", "dot", "--csv", "x.csv",
            "--gbytes-per-s", "40", "--gflops-peak", "200",
        ])
        .unwrap();
        assert_eq!(cli.format, FormatArg::Json);
    }

    #[test]
    fn test_summarize_kind_picks_default_log() {
        let cli = Cli::try_parse_from(["hwprobe", "summarize"]).unwrap();
        let Commands::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.kind, KindArg::Kernel);
        assert_eq!(args.csv_path(), PathBuf::from(DEFAULT_CSV_PATH));

        let cli = Cli::try_parse_from(["hwprobe", "summarize", "--kind", "bandwidth"]).unwrap();
        let Commands::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.csv_path(), PathBuf::from("results/bandwidth_results.csv"));

        let cli =
            Cli::try_parse_from(["hwprobe", "summarize", "--kind", "speedup", "--csv", "k.csv"]).unwrap();
        let Commands::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(SummaryKind::from(args.kind), SummaryKind::Speedup);
        assert_eq!(args.csv_path(), PathBuf::from("k.csv"));

        assert!(Cli::try_parse_from(["hwprobe", "summarize", "--kind", "chase"]).is_err());
    }

    #[test]
    fn test_optional_result_logs() {
        let cli = Cli::try_parse_from(["hwprobe", "bandwidth", "1024", "1", "1", "100", "1"]).unwrap();
        let Commands::Bandwidth(args) = cli.command else {
            panic!("expected bandwidth");
        };
        assert_eq!(args.csv, None);

        let cli =
            Cli::try_parse_from(["hwprobe", "pattern", "64", "8", "random", "3", "--csv", "p.csv"])
                .unwrap();
        let Commands::Pattern(args) = cli.command else {
            panic!("expected pattern");
        };
        assert_eq!(args.csv.as_deref(), Some(std::path::Path::new("p.csv")));
    }
}
