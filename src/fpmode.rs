//! Flush-to-zero / denormals-are-zero control
//!
//! On x86-64 [`FloatEnv::enable_ftz_daz`] sets the FTZ (bit 15) and DAZ
//! (bit 6) bits of MXCSR for the current thread and the guard restores the
//! previous value when dropped. Other targets get a no-op guard.

/// MXCSR flush-to-zero bit
pub const MXCSR_FTZ: u32 = 1 << 15;

/// MXCSR denormals-are-zero bit
pub const MXCSR_DAZ: u32 = 1 << 6;

/// Scoped floating-point environment change
#[derive(Debug)]
#[must_use = "the previous floating-point mode is restored when the guard drops"]
pub struct FloatEnv {
    saved: Option<u32>,
}

impl FloatEnv {
    /// Guard that changes nothing
    pub fn unchanged() -> Self {
        Self { saved: None }
    }

    /// Enable FTZ/DAZ when `enable` is set
    pub fn configure(enable: bool) -> Self {
        if enable {
            Self::enable_ftz_daz()
        } else {
            Self::unchanged()
        }
    }

    /// Turn on FTZ and DAZ for the current thread
    #[cfg(target_arch = "x86_64")]
    pub fn enable_ftz_daz() -> Self {
        let saved = read_mxcsr();
        write_mxcsr(saved | MXCSR_FTZ | MXCSR_DAZ);
        log::info!("FTZ/DAZ enabled (mxcsr {saved:#06x} -> {:#06x})", read_mxcsr());
        Self { saved: Some(saved) }
    }

    /// Turn on FTZ and DAZ for the current thread
    #[cfg(not(target_arch = "x86_64"))]
    pub fn enable_ftz_daz() -> Self {
        log::warn!("FTZ/DAZ requested but not supported on this target; continuing without it");
        Self::unchanged()
    }

    /// Whether this guard changed the floating-point mode
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }
}

impl Drop for FloatEnv {
    fn drop(&mut self) {
        #[cfg(target_arch = "x86_64")]
        if let Some(saved) = self.saved.take() {
            write_mxcsr(saved);
        }
    }
}

/// Current MXCSR value
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn read_mxcsr() -> u32 {
    let mut value: u32 = 0;
    // SAFETY: stmxcsr stores 4 bytes to a valid, aligned stack slot.
    unsafe {
        core::arch::asm!(
            "stmxcsr [{}]",
            in(reg) &mut value,
            options(nostack, preserves_flags),
        );
    }
    value
}

#[cfg(target_arch = "x86_64")]
fn write_mxcsr(value: u32) {
    // SAFETY: ldmxcsr loads 4 bytes from a valid, aligned location; only
    // rounding/exception control bits are changed by callers.
    unsafe {
        core::arch::asm!(
            "ldmxcsr [{}]",
            in(reg) &value,
            options(nostack, preserves_flags, readonly),
        );
    }
}
