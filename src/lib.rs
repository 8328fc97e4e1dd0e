//! # hwprobe
//!
//! Microbenchmarks for low-level hardware performance: floating-point kernel
//! throughput under varying stride and alignment, memory bandwidth under mixed
//! read/write traffic, and dependent-load latency across the cache hierarchy.
//!
//! Every tool follows the same timed-trial sequence: provision buffers, warm
//! up, run timed trials, reduce them to one value, derive metrics and emit a
//! result.
//!
//! ## Example
//!
//! ```rust
//! use hwprobe::{clock::ReferenceClock, metrics};
//!
//! // 10^6 elements at 2 FLOPs each in one millisecond
//! let g = metrics::gflops(1_000_000, 2.0, 0.001);
//! assert!((g - 2.0).abs() < 1e-12);
//!
//! // Cycles per element need a reference frequency
//! let cpe = metrics::cycles_per_element(0.001, 1_000_000, &ReferenceClock::unknown());
//! assert_eq!(cpe.to_string(), "NA");
//! ```
//!
//! ## Layout
//!
//! - [`buffer`], [`element`]: aligned, deliberately misaligned operand storage
//! - [`kernels`], [`permutation`]: the numeric kernels and their index plans
//! - [`clock`], [`fpmode`]: platform capability ports with portable fallbacks
//! - [`timer`], [`stats`], [`metrics`]: trials, reduction and derived rates
//! - [`sink`], [`history`], [`roofline`]: CSV logs and their analysis
//! - [`runner`], [`cli`]: per-tool drivers and the command-line front end

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // counts and ticks -> f64 for rates
#![allow(clippy::cast_possible_truncation)] // u128 nanos -> u64
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)] // exact comparisons are intended in tests

pub mod buffer;
pub mod cli;
pub mod clock;
pub mod config;
pub mod element;
pub mod error;
pub mod fpmode;
pub mod history;
pub mod kernels;
pub mod metrics;
pub mod permutation;
pub mod roofline;
pub mod runner;
pub mod sink;
pub mod stats;
pub mod timer;

pub use error::{HwprobeError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
