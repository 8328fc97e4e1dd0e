//! Summaries over accumulated CSV result logs
//!
//! Kernel rows are grouped by their full configuration
//! (kernel, dtype, N, stride, misalign, variant) so repeated invocations of the
//! same experiment collapse into one line with spread statistics. The same
//! log also yields scalar/simd speedups. Bandwidth and access-pattern logs
//! get their own groupings.

use std::{collections::BTreeMap, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{HwprobeError, Result},
    metrics::Metric,
    sink::{
        BandwidthRow, CsvRecord, KernelRow, PatternRow, DEFAULT_BANDWIDTH_CSV_PATH,
        DEFAULT_CSV_PATH, DEFAULT_PATTERN_CSV_PATH,
    },
    stats,
};

/// Which log a summary reads and how it groups it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    /// Kernel log, one line per configuration
    Kernel,
    /// Kernel log, scalar/simd median-time ratio per kernel, dtype and N
    Speedup,
    /// Bandwidth log, per (N_bytes, stride, repeats, read_pct, threads)
    Bandwidth,
    /// Pattern log, per (ws_KiB, stride, pattern)
    Pattern,
}

impl SummaryKind {
    /// Log the matching tool appends to by default
    #[must_use]
    pub const fn default_csv(self) -> &'static str {
        match self {
            Self::Kernel | Self::Speedup => DEFAULT_CSV_PATH,
            Self::Bandwidth => DEFAULT_BANDWIDTH_CSV_PATH,
            Self::Pattern => DEFAULT_PATTERN_CSV_PATH,
        }
    }
}

/// Load every row of type `R` from `path`
///
/// # Errors
///
/// CSV/IO errors, and [`HwprobeError::EmptyHistory`] when the file holds
/// no data rows.
pub fn load_csv<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize::<R>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(HwprobeError::EmptyHistory(path.to_path_buf()));
    }
    log::debug!("loaded {} row(s) from {}", rows.len(), path.display());
    Ok(rows)
}

/// Load every kernel row from `path`
///
/// # Errors
///
/// Same as [`load_csv`].
pub fn load_rows(path: &Path) -> Result<Vec<KernelRow>> {
    load_csv(path)
}

fn group_by<'a, K: Ord, R>(rows: &'a [R], key: impl Fn(&R) -> K) -> BTreeMap<K, Vec<&'a R>> {
    let mut groups: BTreeMap<K, Vec<&R>> = BTreeMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(row);
    }
    groups
}

fn mean_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    (stats::mean(values), stats::std_dev(values))
}

/// Configuration columns identifying one experiment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Kernel name
    pub kernel: String,
    /// Element type
    pub dtype: String,
    /// Element count
    pub n: usize,
    /// Stride
    pub stride: usize,
    /// Misalignment
    pub misalign: usize,
    /// Variant label
    pub variant: String,
}

impl From<&KernelRow> for GroupKey {
    fn from(row: &KernelRow) -> Self {
        Self {
            kernel: row.kernel.clone(),
            dtype: row.dtype.clone(),
            n: row.n,
            stride: row.stride,
            misalign: row.misalign,
            variant: row.variant.clone(),
        }
    }
}

/// Aggregate of every run of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Kernel name
    pub kernel: String,
    /// Element type
    pub dtype: String,
    /// Element count
    #[serde(rename = "N")]
    pub n: usize,
    /// Stride
    pub stride: usize,
    /// Misalignment
    pub misalign: usize,
    /// Variant label
    pub variant: String,
    /// Rows in the group
    pub runs: usize,
    /// Median GFLOP/s
    pub median_gflops: f64,
    /// Mean GFLOP/s
    pub mean_gflops: f64,
    /// Mean time in milliseconds
    pub mean_time_ms: f64,
    /// Sample standard deviation of time in milliseconds
    pub std_time_ms: f64,
    /// Median cycles per element over rows that have it
    pub median_cpe: Option<f64>,
}

impl CsvRecord for SummaryRow {
    const HEADER: &'static [&'static str] = &[
        "kernel",
        "dtype",
        "N",
        "stride",
        "misalign",
        "variant",
        "runs",
        "median_gflops",
        "mean_gflops",
        "mean_time_ms",
        "std_time_ms",
        "median_cpe",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.kernel.clone(),
            self.dtype.clone(),
            self.n.to_string(),
            self.stride.to_string(),
            self.misalign.to_string(),
            self.variant.clone(),
            self.runs.to_string(),
            format!("{:.6}", self.median_gflops),
            format!("{:.6}", self.mean_gflops),
            format!("{:.6}", self.mean_time_ms),
            format!("{:.6}", self.std_time_ms),
            Metric(self.median_cpe).display(6),
        ]
    }
}

fn summarize_group(key: GroupKey, rows: &[&KernelRow]) -> SummaryRow {
    let gflops: Vec<f64> = rows.iter().map(|r| r.gflops).collect();
    let times: Vec<f64> = rows.iter().map(|r| r.time_ms).collect();
    let cpes: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.cpe)
        .filter(|c| c.is_finite())
        .collect();

    SummaryRow {
        kernel: key.kernel,
        dtype: key.dtype,
        n: key.n,
        stride: key.stride,
        misalign: key.misalign,
        variant: key.variant,
        runs: rows.len(),
        median_gflops: stats::median_f64(&gflops).unwrap_or(0.0),
        mean_gflops: stats::mean(&gflops).unwrap_or(0.0),
        mean_time_ms: stats::mean(&times).unwrap_or(0.0),
        std_time_ms: stats::std_dev(&times).unwrap_or(0.0),
        median_cpe: stats::median_f64(&cpes),
    }
}

/// Group `rows` by configuration and summarise each group, in key order
#[must_use]
pub fn summarize(rows: &[KernelRow]) -> Vec<SummaryRow> {
    group_by(rows, |r| GroupKey::from(r))
        .into_iter()
        .map(|(key, members)| summarize_group(key, &members))
        .collect()
}

/// Load `path` and summarise it
///
/// # Errors
///
/// Same as [`load_rows`].
pub fn summarize_file(path: &Path) -> Result<Vec<SummaryRow>> {
    load_rows(path).map(|rows| summarize(&rows))
}

// ============================================================================
// Scalar/simd speedup
// ============================================================================

/// Scalar over simd median time for one kernel, dtype and N
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedupRow {
    /// Kernel name
    pub kernel: String,
    /// Element type
    pub dtype: String,
    /// Element count
    #[serde(rename = "N")]
    pub n: usize,
    /// Median time of `scalar` rows in milliseconds
    pub scalar_time_ms: f64,
    /// Median time of `simd` rows in milliseconds
    pub simd_time_ms: f64,
    /// `scalar_time_ms / simd_time_ms`
    pub speedup: f64,
}

impl CsvRecord for SpeedupRow {
    const HEADER: &'static [&'static str] =
        &["kernel", "dtype", "N", "scalar_time_ms", "simd_time_ms", "speedup"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.kernel.clone(),
            self.dtype.clone(),
            self.n.to_string(),
            format!("{:.6}", self.scalar_time_ms),
            format!("{:.6}", self.simd_time_ms),
            format!("{:.3}", self.speedup),
        ]
    }
}

/// Median-time speedup of `simd` over `scalar` rows
///
/// Only (kernel, dtype, N) groups with both variants produce a row. Other
/// variant labels are ignored.
#[must_use]
pub fn speedups(rows: &[KernelRow]) -> Vec<SpeedupRow> {
    let groups = group_by(rows, |r| (r.kernel.clone(), r.dtype.clone(), r.n));
    let mut out = Vec::new();
    for ((kernel, dtype, n), members) in groups {
        let median_of = |variant: &str| {
            let times: Vec<f64> = members
                .iter()
                .filter(|r| r.variant == variant)
                .map(|r| r.time_ms)
                .collect();
            stats::median_f64(&times)
        };
        let (Some(scalar), Some(simd)) = (median_of("scalar"), median_of("simd")) else {
            continue;
        };
        if simd <= 0.0 {
            continue;
        }
        out.push(SpeedupRow {
            kernel,
            dtype,
            n,
            scalar_time_ms: scalar,
            simd_time_ms: simd,
            speedup: scalar / simd,
        });
    }
    if out.is_empty() {
        log::warn!("no kernel/dtype/N has both scalar and simd runs");
    }
    out
}

// ============================================================================
// Bandwidth runs
// ============================================================================

/// Mean and spread of repeated bandwidth runs with one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSummaryRow {
    /// Working-set size per buffer
    #[serde(rename = "N_bytes")]
    pub n_bytes: usize,
    /// Element stride
    pub stride: usize,
    /// Timed sweeps per run
    pub repeats: usize,
    /// Read percentage
    pub read_pct: u32,
    /// Worker threads
    pub threads: usize,
    /// Mean seconds
    pub mean_time: f64,
    /// Sample standard deviation of seconds
    pub std_time: f64,
    /// Mean GiB/s
    pub mean_bw: f64,
    /// Sample standard deviation of GiB/s
    pub std_bw: f64,
    /// Rows in the group
    pub count: usize,
}

impl CsvRecord for BandwidthSummaryRow {
    const HEADER: &'static [&'static str] = &[
        "N_bytes", "stride", "repeats", "read_pct", "threads", "mean_time", "std_time", "mean_bw",
        "std_bw", "count",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.n_bytes.to_string(),
            self.stride.to_string(),
            self.repeats.to_string(),
            self.read_pct.to_string(),
            self.threads.to_string(),
            format!("{:.6}", self.mean_time),
            format!("{:.6}", self.std_time),
            format!("{:.6}", self.mean_bw),
            format!("{:.6}", self.std_bw),
            self.count.to_string(),
        ]
    }
}

/// Group bandwidth runs by configuration, in key order
#[must_use]
pub fn summarize_bandwidth(rows: &[BandwidthRow]) -> Vec<BandwidthSummaryRow> {
    group_by(rows, |r| (r.n_bytes, r.stride, r.repeats, r.read_pct, r.threads))
        .into_iter()
        .map(|((n_bytes, stride, repeats, read_pct, threads), members)| {
            let times: Vec<f64> = members.iter().map(|r| r.time).collect();
            let bws: Vec<f64> = members.iter().map(|r| r.gib_per_s).collect();
            let (mean_time, std_time) = mean_std(&times);
            let (mean_bw, std_bw) = mean_std(&bws);
            BandwidthSummaryRow {
                n_bytes,
                stride,
                repeats,
                read_pct,
                threads,
                mean_time: mean_time.unwrap_or(0.0),
                std_time: std_time.unwrap_or(0.0),
                mean_bw: mean_bw.unwrap_or(0.0),
                std_bw: std_bw.unwrap_or(0.0),
                count: members.len(),
            }
        })
        .collect()
}

// ============================================================================
// Access-pattern runs
// ============================================================================

/// Throughput and per-byte latency of repeated pattern runs
///
/// Means and deviations cover the rows whose time was measurable; they are
/// `NA` when no row in the group had a reference clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummaryRow {
    /// Working-set size per buffer in KiB
    #[serde(rename = "ws_KiB")]
    pub ws_kib: usize,
    /// Stride of the strided pattern
    pub stride: usize,
    /// Pattern name
    pub pattern: String,
    /// Rows in the group
    pub runs: usize,
    /// Mean GiB/s
    pub mean_gib_per_s: Option<f64>,
    /// Sample standard deviation of GiB/s
    pub std_gib_per_s: Option<f64>,
    /// Mean nanoseconds per byte
    pub mean_ns_per_byte: Option<f64>,
    /// Sample standard deviation of nanoseconds per byte
    pub std_ns_per_byte: Option<f64>,
}

impl CsvRecord for PatternSummaryRow {
    const HEADER: &'static [&'static str] = &[
        "ws_KiB",
        "stride",
        "pattern",
        "runs",
        "mean_GiB/s",
        "std_GiB/s",
        "mean_ns_per_byte",
        "std_ns_per_byte",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.ws_kib.to_string(),
            self.stride.to_string(),
            self.pattern.clone(),
            self.runs.to_string(),
            Metric(self.mean_gib_per_s).display(6),
            Metric(self.std_gib_per_s).display(6),
            Metric(self.mean_ns_per_byte).display(6),
            Metric(self.std_ns_per_byte).display(6),
        ]
    }
}

/// Group pattern runs by (ws_KiB, stride, pattern), in key order
#[must_use]
pub fn summarize_patterns(rows: &[PatternRow]) -> Vec<PatternSummaryRow> {
    group_by(rows, |r| (r.ws_kib, r.stride, r.pattern.clone()))
        .into_iter()
        .map(|((ws_kib, stride, pattern), members)| {
            let measured = |f: fn(&PatternRow) -> Option<f64>| -> Vec<f64> {
                members.iter().filter_map(|r| f(r)).filter(|v| v.is_finite()).collect()
            };
            let (mean_gib_per_s, std_gib_per_s) = mean_std(&measured(|r| r.gib_per_s));
            let (mean_ns_per_byte, std_ns_per_byte) = mean_std(&measured(|r| r.ns_per_byte));
            PatternSummaryRow {
                ws_kib,
                stride,
                pattern,
                runs: members.len(),
                mean_gib_per_s,
                std_gib_per_s,
                mean_ns_per_byte,
                std_ns_per_byte,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kernel: &str, n: usize, time_ms: f64, gflops: f64, cpe: Option<f64>) -> KernelRow {
        KernelRow {
            timestamp: "2026-03-04 05:06:07".into(),
            kernel: kernel.into(),
            dtype: "f32".into(),
            n,
            stride: 1,
            misalign: 0,
            variant: "simd".into(),
            time_ms,
            gflops,
            cpe,
        }
    }

    #[test]
    fn test_grouping_and_stats() {
        let rows = vec![
            row("saxpy", 1024, 1.0, 10.0, Some(2.0)),
            row("saxpy", 1024, 3.0, 30.0, None),
            row("saxpy", 1024, 2.0, 20.0, Some(4.0)),
            row("dot", 1024, 5.0, 1.0, None),
        ];
        let out = summarize(&rows);
        assert_eq!(out.len(), 2);

        // BTreeMap order: "dot" < "saxpy"
        assert_eq!(out[0].kernel, "dot");
        assert_eq!(out[0].runs, 1);
        assert_eq!(out[0].std_time_ms, 0.0);
        assert_eq!(out[0].median_cpe, None);

        let s = &out[1];
        assert_eq!(s.runs, 3);
        assert_eq!(s.median_gflops, 20.0);
        assert!((s.mean_gflops - 20.0).abs() < 1e-12);
        assert!((s.mean_time_ms - 2.0).abs() < 1e-12);
        assert!((s.std_time_ms - 1.0).abs() < 1e-12);
        assert_eq!(s.median_cpe, Some(3.0));
    }

    #[test]
    fn test_different_n_are_separate_groups() {
        let rows = vec![row("mul", 8, 1.0, 1.0, None), row("mul", 16, 1.0, 1.0, None)];
        assert_eq!(summarize(&rows).len(), 2);
    }

    #[test]
    fn test_fields_render_na() {
        let s = summarize(&[row("dot", 4, 1.0, 1.0, None)]).remove(0);
        let fields = s.fields();
        assert_eq!(fields.len(), SummaryRow::HEADER.len());
        assert_eq!(fields[11], "NA");
        assert_eq!(fields[7], "1.000000");
    }

    fn variant_row(kernel: &str, n: usize, variant: &str, time_ms: f64) -> KernelRow {
        KernelRow {
            variant: variant.into(),
            ..row(kernel, n, time_ms, 1.0, None)
        }
    }

    #[test]
    fn test_speedup_uses_median_times() {
        let rows = vec![
            variant_row("saxpy", 1024, "scalar", 4.0),
            variant_row("saxpy", 1024, "scalar", 100.0),
            variant_row("saxpy", 1024, "scalar", 6.0),
            variant_row("saxpy", 1024, "simd", 1.0),
            variant_row("saxpy", 1024, "simd", 3.0),
            // no scalar partner
            variant_row("dot", 1024, "simd", 1.0),
        ];
        let out = speedups(&rows);
        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!((s.kernel.as_str(), s.dtype.as_str(), s.n), ("saxpy", "f32", 1024));
        assert_eq!(s.scalar_time_ms, 6.0);
        assert_eq!(s.simd_time_ms, 2.0);
        assert!((s.speedup - 3.0).abs() < 1e-12);
        assert_eq!(s.fields()[5], "3.000");
        assert_eq!(s.fields().len(), SpeedupRow::HEADER.len());
    }

    #[test]
    fn test_speedup_without_pairs_is_empty() {
        let rows = vec![variant_row("mul", 8, "simd", 1.0), variant_row("mul", 16, "scalar", 1.0)];
        assert!(speedups(&rows).is_empty());
    }

    fn bw_row(read_pct: u32, time: f64, gib_per_s: f64) -> BandwidthRow {
        BandwidthRow {
            timestamp: "2026-03-04 05:06:07".into(),
            n_bytes: 1 << 20,
            stride: 1,
            repeats: 10,
            read_pct,
            threads: 2,
            time,
            gib_per_s,
        }
    }

    #[test]
    fn test_bandwidth_grouping() {
        let rows = vec![
            bw_row(70, 1.0, 10.0),
            bw_row(70, 3.0, 14.0),
            bw_row(100, 2.0, 5.0),
        ];
        let out = summarize_bandwidth(&rows);
        assert_eq!(out.len(), 2);

        let mixed = &out[0];
        assert_eq!(mixed.read_pct, 70);
        assert_eq!(mixed.count, 2);
        assert!((mixed.mean_time - 2.0).abs() < 1e-12);
        assert!((mixed.std_time - 2f64.sqrt()).abs() < 1e-12);
        assert!((mixed.mean_bw - 12.0).abs() < 1e-12);
        assert!((mixed.std_bw - 8f64.sqrt()).abs() < 1e-12);

        let reads = &out[1];
        assert_eq!((reads.read_pct, reads.count), (100, 1));
        assert_eq!(reads.std_bw, 0.0);
        assert_eq!(reads.fields().len(), BandwidthSummaryRow::HEADER.len());
    }

    fn pat_row(pattern: &str, gib_per_s: Option<f64>, ns_per_byte: Option<f64>) -> PatternRow {
        PatternRow {
            timestamp: "2026-03-04 05:06:07".into(),
            ws_kib: 64,
            stride: 16,
            pattern: pattern.into(),
            repeats: 4,
            ticks: 1000,
            unit: "cycles".into(),
            bytes: 1024.0,
            time_s: gib_per_s.map(|_| 1e-6),
            gib_per_s,
            ns_per_byte,
        }
    }

    #[test]
    fn test_pattern_grouping_skips_unmeasured() {
        let rows = vec![
            pat_row("random", Some(2.0), Some(0.5)),
            pat_row("random", None, None),
            pat_row("random", Some(4.0), Some(0.25)),
            pat_row("seq", None, None),
        ];
        let out = summarize_patterns(&rows);
        assert_eq!(out.len(), 2);

        let random = &out[0];
        assert_eq!((random.pattern.as_str(), random.runs), ("random", 3));
        assert_eq!(random.mean_gib_per_s, Some(3.0));
        assert_eq!(random.mean_ns_per_byte, Some(0.375));
        assert!(random.std_gib_per_s.is_some_and(|s| (s - 2f64.sqrt()).abs() < 1e-12));

        let seq = &out[1];
        assert_eq!(seq.runs, 1);
        assert_eq!(seq.mean_gib_per_s, None);
        let fields = seq.fields();
        assert_eq!(fields.len(), PatternSummaryRow::HEADER.len());
        assert!(fields[4..].iter().all(|f| f == "NA"));
    }

    #[test]
    fn test_default_logs_per_kind() {
        assert_eq!(SummaryKind::Speedup.default_csv(), SummaryKind::Kernel.default_csv());
        assert_eq!(SummaryKind::Bandwidth.default_csv(), "results/bandwidth_results.csv");
        assert_eq!(SummaryKind::Pattern.default_csv(), "results/pattern_results.csv");
    }

    #[test]
    fn test_load_csv_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bw.csv");
        std::fs::write(&path, BandwidthRow::HEADER.join(",") + "\n").unwrap();
        let err = load_csv::<BandwidthRow>(&path).unwrap_err();
        assert!(matches!(err, HwprobeError::EmptyHistory(ref p) if p == &path));
    }
}
