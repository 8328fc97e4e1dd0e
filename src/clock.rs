//! Tick sources and reference-clock conversions
//!
//! The timer only needs "a monotonically increasing integer and its unit".
//! [`MonotonicClock`] works everywhere; [`TscClock`] reads the x86-64
//! timestamp counter between `lfence` barriers so out-of-order execution
//! cannot move kernel work across the read.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Unit of a tick delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickUnit {
    /// Core or reference cycles
    Cycles,
    /// Nanoseconds
    Nanoseconds,
}

impl TickUnit {
    /// Short label for text output
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cycles => "cycles",
            Self::Nanoseconds => "ns",
        }
    }
}

/// Source of monotonically increasing ticks
pub trait TickSource {
    /// Read the current tick value
    fn read(&self) -> u64;

    /// Unit of differences between two reads
    fn unit(&self) -> TickUnit;

    /// Short description for logs
    fn name(&self) -> &'static str;
}

/// Portable nanosecond clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    #[inline]
    fn read(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn unit(&self) -> TickUnit {
        TickUnit::Nanoseconds
    }

    fn name(&self) -> &'static str {
        "monotonic"
    }
}

/// Fenced timestamp-counter reads (x86-64 only)
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TscClock;

#[cfg(target_arch = "x86_64")]
impl TickSource for TscClock {
    #[inline]
    fn read(&self) -> u64 {
        let lo: u32;
        let hi: u32;
        // SAFETY: lfence and rdtsc exist on every x86-64 CPU and only write eax/edx.
        unsafe {
            core::arch::asm!(
                "lfence",
                "rdtsc",
                "lfence",
                out("eax") lo,
                out("edx") hi,
                options(nostack, preserves_flags),
            );
        }
        (u64::from(hi) << 32) | u64::from(lo)
    }

    fn unit(&self) -> TickUnit {
        TickUnit::Cycles
    }

    fn name(&self) -> &'static str {
        "tsc"
    }
}

/// Best cycle-level counter for this target
#[must_use]
pub fn platform_counter() -> Box<dyn TickSource> {
    #[cfg(target_arch = "x86_64")]
    {
        Box::new(TscClock)
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        Box::new(MonotonicClock::new())
    }
}

impl<S: TickSource + ?Sized> TickSource for Box<S> {
    fn read(&self) -> u64 {
        (**self).read()
    }

    fn unit(&self) -> TickUnit {
        (**self).unit()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<S: TickSource + ?Sized> TickSource for &S {
    fn read(&self) -> u64 {
        (**self).read()
    }

    fn unit(&self) -> TickUnit {
        (**self).unit()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Externally supplied core frequency used for cycle/time conversions
///
/// Built once from configuration and passed to whoever needs it. A missing
/// frequency makes the dependent metrics unavailable instead of guessed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceClock {
    ghz: Option<f64>,
}

impl ReferenceClock {
    /// Reference clock at `ghz`; non-positive or non-finite values mean unknown
    #[must_use]
    pub fn from_ghz(ghz: Option<f64>) -> Self {
        Self {
            ghz: ghz.filter(|g| g.is_finite() && *g > 0.0),
        }
    }

    /// Reference clock from a raw setting such as `CPU_GHZ`
    ///
    /// Surrounding whitespace is ignored. Text that is not a number leaves
    /// the frequency unknown with a warning instead of failing the run.
    #[must_use]
    pub fn from_setting(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::unknown();
        };
        match raw.parse::<f64>() {
            Ok(ghz) => Self::from_ghz(Some(ghz)),
            Err(e) => {
                log::warn!("ignoring reference clock {raw:?} ({e}); cycle metrics will be NA");
                Self::unknown()
            },
        }
    }

    /// No frequency known
    #[must_use]
    pub fn unknown() -> Self {
        Self { ghz: None }
    }

    /// Frequency in GHz, if known
    #[must_use]
    pub fn ghz(&self) -> Option<f64> {
        self.ghz
    }

    /// Convert a tick count to seconds
    #[must_use]
    pub fn ticks_to_seconds(&self, ticks: f64, unit: TickUnit) -> Option<f64> {
        match unit {
            TickUnit::Nanoseconds => Some(ticks / 1e9),
            TickUnit::Cycles => self.ghz.map(|g| ticks / (g * 1e9)),
        }
    }

    /// Convert a tick count to cycles
    #[must_use]
    pub fn ticks_to_cycles(&self, ticks: f64, unit: TickUnit) -> Option<f64> {
        match unit {
            TickUnit::Cycles => Some(ticks),
            TickUnit::Nanoseconds => self.ghz.map(|g| ticks * g),
        }
    }

    /// Convert a tick count to nanoseconds
    #[must_use]
    pub fn ticks_to_nanos(&self, ticks: f64, unit: TickUnit) -> Option<f64> {
        match unit {
            TickUnit::Nanoseconds => Some(ticks),
            TickUnit::Cycles => self.ghz.map(|g| ticks / g),
        }
    }
}
