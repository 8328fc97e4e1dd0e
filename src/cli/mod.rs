//! CLI command implementations
//!
//! Business logic for each subcommand, kept out of `main.rs` so it can be
//! driven from tests with an in-memory writer.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

use std::{io::Write, path::Path};

use serde::Serialize;

use crate::{
    clock::ReferenceClock,
    config::{BandwidthConfig, ChaseConfig, KernelBenchConfig, OutputFormat, PatternConfig},
    error::Result,
    history::{self, SummaryKind},
    roofline::{self, Roofline},
    runner::{self, write_report},
    sink::{self, BandwidthRow, CsvRecord, CsvSink, KernelRow, PatternRow},
};

pub mod handlers;
pub use handlers::{Cli, Commands};

/// Dispatch a parsed command line, printing results to stdout
pub fn entrypoint(cli: Cli) -> Result<()> {
    let clock = ReferenceClock::from_setting(cli.cpu_ghz.as_deref());
    if let Some(ghz) = clock.ghz() {
        log::info!("reference clock {ghz} GHz");
    }
    let format = OutputFormat::from(cli.format);
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Kernel(args) => run_kernel_command(&args.into_config(), &clock, format, &mut out),
        Commands::Bandwidth(args) => {
            let csv = args.csv.clone();
            run_bandwidth_command(&args.into_config(), csv.as_deref(), format, &mut out)
        },
        Commands::Chase(args) => run_chase_command(&args.into_config(), &clock, format, &mut out),
        Commands::Pattern(args) => {
            let csv = args.csv.clone();
            run_pattern_command(&args.into_config(), &clock, csv.as_deref(), format, &mut out)
        },
        Commands::Summarize(args) => {
            let csv = args.csv_path();
            run_summarize_command(args.kind.into(), &csv, args.out.as_deref(), format, &mut out)
        },
        Commands::Roofline(args) => {
            let roof = Roofline::new(args.gbytes_per_s, args.gflops_peak)?;
            let points = roofline::analyze_file(&args.csv, args.kernel, args.dtype, &roof)?;
            write_rows(&points, format, &mut out)
        },
    }
}

/// Run one kernel benchmark, append it to the CSV log and print it
pub fn run_kernel_command(
    cfg: &KernelBenchConfig,
    clock: &ReferenceClock,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let result = runner::run_kernel_bench(cfg, clock)?;
    let row = result.to_row(sink::now_timestamp());
    CsvSink::<KernelRow>::new(&cfg.csv_path).append_one(&row)?;
    write_report(&result, format, out)
}

/// Run the bandwidth sweep, print its summary line and optionally log it
pub fn run_bandwidth_command(
    cfg: &BandwidthConfig,
    csv: Option<&Path>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let result = runner::run_bandwidth(cfg)?;
    if let Some(path) = csv {
        let sink = CsvSink::<BandwidthRow>::new(path);
        sink.append_one(&result.to_row(sink::now_timestamp()))?;
        log::info!("logged bandwidth run to {}", sink.path().display());
    }
    write_report(&result, format, out)
}

/// Run the latency sweep and print one row per size
pub fn run_chase_command(
    cfg: &ChaseConfig,
    clock: &ReferenceClock,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let report = runner::run_chase(cfg, clock)?;
    write_report(&report, format, out)
}

/// Run the access-pattern benchmark, print its line and optionally log it
pub fn run_pattern_command(
    cfg: &PatternConfig,
    clock: &ReferenceClock,
    csv: Option<&Path>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let result = runner::run_pattern(cfg, clock)?;
    if let Some(path) = csv {
        let sink = CsvSink::<PatternRow>::new(path);
        sink.append_one(&result.to_row(sink::now_timestamp()))?;
        log::info!("logged pattern run to {}", sink.path().display());
    }
    write_report(&result, format, out)
}

/// Summarise the log at `csv` to `out`, or append the summary to `dest`
pub fn run_summarize_command(
    kind: SummaryKind,
    csv: &Path,
    dest: Option<&Path>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match kind {
        SummaryKind::Kernel => emit(&history::summarize_file(csv)?, dest, format, out),
        SummaryKind::Speedup => {
            let rows = history::load_rows(csv)?;
            emit(&history::speedups(&rows), dest, format, out)
        },
        SummaryKind::Bandwidth => {
            let rows: Vec<BandwidthRow> = history::load_csv(csv)?;
            emit(&history::summarize_bandwidth(&rows), dest, format, out)
        },
        SummaryKind::Pattern => {
            let rows: Vec<PatternRow> = history::load_csv(csv)?;
            emit(&history::summarize_patterns(&rows), dest, format, out)
        },
    }
}

fn emit<R: CsvRecord + Serialize>(
    rows: &[R],
    dest: Option<&Path>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match dest {
        Some(path) => {
            let sink = CsvSink::new(path);
            let written = sink.append(rows.iter())?;
            log::info!("appended {written} summary row(s) to {}", sink.path().display());
            Ok(())
        },
        None => write_rows(rows, format, out),
    }
}

/// Print rows as one CSV table or as JSON lines
fn write_rows<R: CsvRecord + Serialize>(
    rows: &[R],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Line => {
            sink::write_table(&mut *out, rows.iter())?;
        },
        OutputFormat::Json => {
            for row in rows {
                serde_json::to_writer(&mut *out, row)?;
                writeln!(out)?;
            }
        },
    }
    Ok(())
}
