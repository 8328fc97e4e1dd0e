//! Append-only CSV result logs
//!
//! A sink never rewrites existing rows. The header goes in only when the
//! file is new (or empty), so repeated invocations build up a history that
//! later runs can be compared against.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::Result, metrics::Metric};

/// Default destination of the kernel benchmark
pub const DEFAULT_CSV_PATH: &str = "results/default_results.csv";

/// Default destination of bandwidth runs logged with `--csv`
pub const DEFAULT_BANDWIDTH_CSV_PATH: &str = "results/bandwidth_results.csv";

/// Default destination of pattern runs logged with `--csv`
pub const DEFAULT_PATTERN_CSV_PATH: &str = "results/pattern_results.csv";

/// Timestamp format of result rows
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`]
#[must_use]
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A row type with a fixed column layout
pub trait CsvRecord {
    /// Column names, in order
    const HEADER: &'static [&'static str];

    /// Field values, in header order
    fn fields(&self) -> Vec<String>;
}

/// One kernel-benchmark result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelRow {
    /// Local wall-clock time of the run
    pub timestamp: String,
    /// Kernel name
    pub kernel: String,
    /// Element type
    pub dtype: String,
    /// Element count
    #[serde(rename = "N")]
    pub n: usize,
    /// Stride in elements
    pub stride: usize,
    /// Extra byte offset
    pub misalign: usize,
    /// Build/variant label
    pub variant: String,
    /// Representative time in milliseconds
    pub time_ms: f64,
    /// Achieved GFLOP/s
    pub gflops: f64,
    /// Cycles per element; `NA` when no reference clock was given
    #[serde(deserialize_with = "csv::invalid_option")]
    pub cpe: Option<f64>,
}

impl CsvRecord for KernelRow {
    const HEADER: &'static [&'static str] = &[
        "timestamp", "kernel", "dtype", "N", "stride", "misalign", "variant", "time_ms", "gflops",
        "cpe",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.kernel.clone(),
            self.dtype.clone(),
            self.n.to_string(),
            self.stride.to_string(),
            self.misalign.to_string(),
            self.variant.clone(),
            format!("{:.6}", self.time_ms),
            format!("{:.6}", self.gflops),
            Metric(self.cpe).display(6),
        ]
    }
}

/// One bandwidth run, in the columns of the tool's summary line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthRow {
    /// Local wall-clock time of the run
    pub timestamp: String,
    /// Working-set size per buffer
    #[serde(rename = "N_bytes")]
    pub n_bytes: usize,
    /// Element stride
    pub stride: usize,
    /// Timed sweeps
    pub repeats: usize,
    /// Read percentage
    pub read_pct: u32,
    /// Worker threads
    pub threads: usize,
    /// Seconds over all timed sweeps
    pub time: f64,
    /// Aggregate GiB/s over all timed sweeps
    #[serde(rename = "GiB/s")]
    pub gib_per_s: f64,
}

impl CsvRecord for BandwidthRow {
    const HEADER: &'static [&'static str] = &[
        "timestamp", "N_bytes", "stride", "repeats", "read_pct", "threads", "time", "GiB/s",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.n_bytes.to_string(),
            self.stride.to_string(),
            self.repeats.to_string(),
            self.read_pct.to_string(),
            self.threads.to_string(),
            format!("{:.6}", self.time),
            format!("{:.6}", self.gib_per_s),
        ]
    }
}

/// One access-pattern run
///
/// Raw ticks are always present; the time-derived columns are `NA` when the
/// ticks are cycles and no reference clock was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRow {
    /// Local wall-clock time of the run
    pub timestamp: String,
    /// Working-set size per buffer in KiB
    #[serde(rename = "ws_KiB")]
    pub ws_kib: usize,
    /// Stride of the strided pattern
    pub stride: usize,
    /// Pattern name
    pub pattern: String,
    /// Timed repetitions
    pub repeats: usize,
    /// Ticks over all timed repetitions
    pub ticks: u64,
    /// `cycles` or `ns`
    pub unit: String,
    /// Bytes moved over all timed repetitions
    pub bytes: f64,
    /// Seconds over all timed repetitions
    #[serde(deserialize_with = "csv::invalid_option")]
    pub time_s: Option<f64>,
    /// Aggregate GiB/s
    #[serde(rename = "GiB/s", deserialize_with = "csv::invalid_option")]
    pub gib_per_s: Option<f64>,
    /// Nanoseconds per byte moved
    #[serde(deserialize_with = "csv::invalid_option")]
    pub ns_per_byte: Option<f64>,
}

impl CsvRecord for PatternRow {
    const HEADER: &'static [&'static str] = &[
        "timestamp", "ws_KiB", "stride", "pattern", "repeats", "ticks", "unit", "bytes", "time_s",
        "GiB/s", "ns_per_byte",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.ws_kib.to_string(),
            self.stride.to_string(),
            self.pattern.clone(),
            self.repeats.to_string(),
            self.ticks.to_string(),
            self.unit.clone(),
            format!("{:.0}", self.bytes),
            Metric(self.time_s).display(9),
            Metric(self.gib_per_s).display(6),
            Metric(self.ns_per_byte).display(6),
        ]
    }
}

/// Write a header and `rows` to `out` as one self-contained CSV table
///
/// # Errors
///
/// Propagates CSV encoding and write errors.
pub fn write_table<'a, R, W>(out: W, rows: impl IntoIterator<Item = &'a R>) -> Result<usize>
where
    R: CsvRecord + 'a,
    W: Write,
{
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(R::HEADER)?;
    let mut written = 0;
    for row in rows {
        writer.write_record(row.fields())?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Appends rows of type `R` to one CSV file
#[derive(Debug, Clone)]
pub struct CsvSink<R: CsvRecord> {
    path: PathBuf,
    _row: PhantomData<fn(&R)>,
}

impl<R: CsvRecord> CsvSink<R> {
    /// Sink writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _row: PhantomData,
        }
    }

    /// Destination path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, creating parent directories and the header as needed
    ///
    /// # Errors
    ///
    /// Propagates filesystem and CSV encoding errors.
    pub fn append<'a>(&self, rows: impl IntoIterator<Item = &'a R>) -> Result<usize>
    where
        R: 'a,
    {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(R::HEADER)?;
        }
        let mut written = 0;
        for row in rows {
            writer.write_record(row.fields())?;
            written += 1;
        }
        writer.flush()?;
        log::info!(
            "appended {written} row(s) to {}{}",
            self.path.display(),
            if is_new { " (new file)" } else { "" }
        );
        Ok(written)
    }

    /// Append a single row
    ///
    /// # Errors
    ///
    /// Same as [`CsvSink::append`].
    pub fn append_one(&self, row: &R) -> Result<()> {
        self.append(std::iter::once(row)).map(|_| ())
    }
}
