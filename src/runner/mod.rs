//! Measurement drivers, one per tool
//!
//! Each runner validates its configuration, provisions buffers, hands the
//! kernel to a [`TrialTimer`](crate::timer::TrialTimer) and derives metrics
//! from the reduced value. Nothing is printed here; callers pick the output
//! form through [`write_report`].

use std::io::Write;

use serde::Serialize;

use crate::{config::OutputFormat, error::Result};

pub mod bandwidth;
pub mod chase;
pub mod kernel;
pub mod pattern;

pub use bandwidth::{run_bandwidth, BandwidthResult};
pub use chase::{run_chase, ChasePoint, ChaseReport};
pub use kernel::{run_kernel_bench, KernelResult};
pub use pattern::{run_pattern, PatternResult};

/// A result with a human-readable text form
pub trait TextReport: Serialize {
    /// Text form, without trailing newline
    fn render_text(&self) -> String;
}

/// Write `report` to `out` as text or as one JSON line
///
/// # Errors
///
/// Propagates write and JSON encoding errors.
pub fn write_report<R: TextReport>(
    report: &R,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Line => writeln!(out, "{}", report.render_text())?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, report)?;
            writeln!(out)?;
        },
    }
    Ok(())
}
