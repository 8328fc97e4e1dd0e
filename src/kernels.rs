//! Numeric kernels and their work descriptors
//!
//! Every throughput kernel takes a `stride >= 1`: logical element `i` lives at
//! linear offset `i * stride`. Slices shorter than the strided span are a
//! caller bug and panic on the range check at entry. An element count of
//! zero never touches memory.
//!
//! Loops use plain `a * x + y` (multiply, then add) rather than `mul_add`
//! so results match one rounding per operation.

use std::{fmt, hint::black_box, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    element::{Dtype, Element},
    error::HwprobeError,
};

/// SAXPY scale factor
pub const SAXPY_A: f64 = 1.111;

// ============================================================================
// Kernel catalogue
// ============================================================================

/// Named benchmark kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// `y[k] = a*x[k] + y[k]`
    Saxpy,
    /// `s += x[k]*y[k]`
    Dot,
    /// `z[k] = x[k]*y[k]`
    Mul,
    /// `y[i] = a*x[i-1] + b*x[i] + c*x[i+1]`
    Stencil3,
    /// Mixed read/write sweep over two buffers
    RwMix,
    /// Dependent pointer-chase hop
    Chase,
}

/// Static description of a kernel's work and access shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KernelDescriptor {
    /// Symbolic name
    pub name: &'static str,
    /// Floating-point operations per element, if FLOP-oriented
    pub flops_per_element: Option<f64>,
    /// Element-sized values moved per element at unit stride (reads + writes)
    pub values_moved_per_element: usize,
    /// Number of buffers touched
    pub arity: usize,
    /// Whether a stride parameter is honoured
    pub supports_stride: bool,
    /// Whether sequential/strided/random patterns are supported
    pub supports_patterns: bool,
}

impl Kernel {
    /// All kernels, in catalogue order
    pub const ALL: [Kernel; 6] = [
        Kernel::Saxpy,
        Kernel::Dot,
        Kernel::Mul,
        Kernel::Stencil3,
        Kernel::RwMix,
        Kernel::Chase,
    ];

    /// Kernels measured by FLOP throughput
    pub const THROUGHPUT: [Kernel; 4] = [Kernel::Saxpy, Kernel::Dot, Kernel::Mul, Kernel::Stencil3];

    /// Name used on the command line and in result files
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Saxpy => "saxpy",
            Self::Dot => "dot",
            Self::Mul => "mul",
            Self::Stencil3 => "stencil3",
            Self::RwMix => "rwmix",
            Self::Chase => "chase",
        }
    }

    /// Work descriptor
    #[must_use]
    pub const fn descriptor(self) -> KernelDescriptor {
        let (flops, moved, arity, stride, patterns) = match self {
            // x, y read; y written
            Self::Saxpy => (Some(2.0), 3, 2, true, true),
            // x, y read; the scalar write is amortised away
            Self::Dot => (Some(2.0), 2, 2, true, false),
            // x, y read; z written
            Self::Mul => (Some(1.0), 3, 3, true, false),
            // three neighbours read; y written
            Self::Stencil3 => (Some(5.0), 4, 2, true, false),
            // one value touched per access
            Self::RwMix => (None, 1, 2, true, false),
            Self::Chase => (None, 1, 1, false, false),
        };
        KernelDescriptor {
            name: self.name(),
            flops_per_element: flops,
            values_moved_per_element: moved,
            arity,
            supports_stride: stride,
            supports_patterns: patterns,
        }
    }

    /// FLOPs per element; zero for bandwidth/latency kernels
    #[must_use]
    pub fn flops_per_element(self) -> f64 {
        self.descriptor().flops_per_element.unwrap_or(0.0)
    }

    /// Bytes moved per element at unit stride for `dtype`
    #[must_use]
    pub fn bytes_per_element(self, dtype: Dtype) -> usize {
        self.descriptor().values_moved_per_element * dtype.size_bytes()
    }

    /// Whether the kernel is reported as GFLOP/s
    #[must_use]
    pub fn is_throughput(self) -> bool {
        self.descriptor().flops_per_element.is_some()
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = HwprobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| HwprobeError::UnknownKernel(s.to_string()))
    }
}

/// Coefficients of the 3-point stencil
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StencilCoeffs {
    /// Weight of `x[i-1]`
    pub a: f64,
    /// Weight of `x[i]`; also the boundary copy factor
    pub b: f64,
    /// Weight of `x[i+1]`
    pub c: f64,
}

impl Default for StencilCoeffs {
    fn default() -> Self {
        Self {
            a: 1.111,
            b: 2.222,
            c: 0.333,
        }
    }
}

/// Slice length needed to reach logical element `n - 1` at `stride`
#[inline]
#[must_use]
pub fn strided_span(n: usize, stride: usize) -> usize {
    if n == 0 {
        0
    } else {
        (n - 1) * stride + 1
    }
}

// ============================================================================
// Throughput kernels
// ============================================================================

/// `y[k] = a*x[k] + y[k]` for `k = i*stride`, `i < n`
pub fn saxpy<T: Element>(n: usize, a: T, x: &[T], y: &mut [T], stride: usize) {
    let span = strided_span(n, stride);
    let (x, y) = (&x[..span], &mut y[..span]);
    for (yi, &xi) in y.iter_mut().step_by(stride).zip(x.iter().step_by(stride)) {
        *yi = a * xi + *yi;
    }
}

/// Strictly ordered `sum(x[k]*y[k])` for `k = i*stride`, `i < n`
#[must_use]
pub fn dot<T: Element>(n: usize, x: &[T], y: &[T], stride: usize) -> T {
    let span = strided_span(n, stride);
    x[..span]
        .iter()
        .step_by(stride)
        .zip(y[..span].iter().step_by(stride))
        .fold(T::zero(), |s, (&xi, &yi)| s + xi * yi)
}

/// `z[k] = x[k]*y[k]` for `k = i*stride`, `i < n`
pub fn mul<T: Element>(n: usize, x: &[T], y: &[T], z: &mut [T], stride: usize) {
    let span = strided_span(n, stride);
    let (x, y, z) = (&x[..span], &y[..span], &mut z[..span]);
    for ((zi, &xi), &yi) in z
        .iter_mut()
        .step_by(stride)
        .zip(x.iter().step_by(stride))
        .zip(y.iter().step_by(stride))
    {
        *zi = xi * yi;
    }
}

/// 3-point stencil with copy-style boundaries
///
/// Interior points get `a*x[i-1] + b*x[i] + c*x[i+1]`; the first and last
/// logical elements get `b*x[i]`. `n == 0` does nothing and `n == 1` only
/// writes the boundary value.
pub fn stencil3<T: Element>(n: usize, coeffs: StencilCoeffs, x: &[T], y: &mut [T], stride: usize) {
    if n == 0 {
        return;
    }
    let [a, b, c] =
        [coeffs.a, coeffs.b, coeffs.c].map(|v| T::from_f64(v).unwrap_or_else(T::nan));
    let span = strided_span(n, stride);
    let (x, y) = (&x[..span], &mut y[..span]);

    for i in 1..n.saturating_sub(1) {
        let xim1 = x[(i - 1) * stride];
        let xi = x[i * stride];
        let xip1 = x[(i + 1) * stride];
        y[i * stride] = a * xim1 + b * xi + c * xip1;
    }

    y[0] = b * x[0];
    let last = (n - 1) * stride;
    y[last] = b * x[last];
}

// ============================================================================
// Access-pattern SAXPY
// ============================================================================

/// How the pattern kernel maps logical index `i` to a buffer offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPattern {
    /// `offset = i`
    Sequential,
    /// `offset = (i * stride) mod n`
    Strided,
    /// `offset = permutation[i]`
    Random,
}

impl AccessPattern {
    /// Numeric selector accepted on the command line (0, 1, 2)
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Sequential => 0,
            Self::Strided => 1,
            Self::Random => 2,
        }
    }

    /// Lowercase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Strided => "strided",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccessPattern {
    type Err = HwprobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" | "sequential" | "seq" => Ok(Self::Sequential),
            "1" | "strided" => Ok(Self::Strided),
            "2" | "random" => Ok(Self::Random),
            other => Err(HwprobeError::UnknownPattern(other.to_string())),
        }
    }
}

/// Resolved offset generator for one pattern run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexPlan {
    /// `offset = i`
    Sequential,
    /// `offset = (i * stride) mod n`
    Strided(usize),
    /// `offset = table[i]`; the table must hold every index in `0..n`
    Random(Vec<usize>),
}

impl IndexPlan {
    /// Pattern this plan implements
    #[must_use]
    pub fn pattern(&self) -> AccessPattern {
        match self {
            Self::Sequential => AccessPattern::Sequential,
            Self::Strided(_) => AccessPattern::Strided,
            Self::Random(_) => AccessPattern::Random,
        }
    }
}

/// SAXPY over every offset produced by `plan` for `i < x.len()`
///
/// # Panics
///
/// Panics if `x` and `y` differ in length or a random table is shorter
/// than the buffers.
pub fn saxpy_indexed<T: Element>(a: T, x: &[T], y: &mut [T], plan: &IndexPlan) {
    assert_eq!(x.len(), y.len(), "pattern buffers must have equal length");
    let n = x.len();
    match plan {
        IndexPlan::Sequential => saxpy(n, a, x, y, 1),
        IndexPlan::Strided(stride) => {
            for i in 0..n {
                let k = i.wrapping_mul(*stride) % n;
                y[k] = a * x[k] + y[k];
            }
        },
        IndexPlan::Random(table) => {
            for &k in &table[..n] {
                y[k] = a * x[k] + y[k];
            }
        },
    }
}

// ============================================================================
// Bandwidth and latency kernels
// ============================================================================

/// Mixed read/write sweep over `x`/`y` at `stride`
///
/// For each visited index a roll in `0..100` below `read_percent` reads
/// `x[i]`; otherwise `y[i] += 1`. Returns the number of writes.
pub fn rw_sweep<T: Element, R: Rng>(
    x: &[T],
    y: &mut [T],
    stride: usize,
    read_percent: u32,
    rng: &mut R,
) -> usize {
    let inc = T::one();
    let mut writes = 0;
    for i in (0..x.len().min(y.len())).step_by(stride) {
        if rng.gen_range(0..100) < read_percent {
            black_box(x[i]);
        } else {
            y[i] += inc;
            writes += 1;
        }
    }
    writes
}

/// Follow `next` from `start` for `hops` dependent loads; returns the final index
#[inline(never)]
#[must_use]
pub fn chase(next: &[u32], start: u32, hops: usize) -> u32 {
    let mut cur = start;
    for _ in 0..hops {
        cur = next[cur as usize];
    }
    cur
}
