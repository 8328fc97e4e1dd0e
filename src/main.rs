//! hwprobe CLI - hardware microbenchmarks
//!
//! # Commands
//!
//! - `kernel` - Time saxpy/dot/mul/stencil3 and append to a CSV log
//! - `bandwidth` - Mixed read/write memory bandwidth
//! - `chase` - Pointer-chase load latency across working-set sizes
//! - `pattern` - SAXPY under sequential, strided or random offsets
//! - `summarize` - Aggregate repeated runs of a CSV log
//! - `roofline` - Compare measured throughput with a roofline model
//!
//! Exit codes: `0` success, `1` bad arguments or runtime error, `2` allocation
//! failure.

use std::process::ExitCode;

use clap::{error::ErrorKind, Parser};
use hwprobe::cli::{entrypoint, Cli};

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // stderr keeps stdout machine-readable
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        },
    };
    init_logging(cli.verbose);

    match entrypoint(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        },
    }
}
