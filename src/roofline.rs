//! Roofline placement of measured kernels
//!
//! Each throughput kernel has a fixed arithmetic intensity (FLOPs per byte
//! moved at unit stride). Against a machine described by its memory
//! bandwidth and peak compute rate, the attainable rate at intensity `I` is
//! `min(peak, bandwidth * I)`.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    element::Dtype,
    error::{HwprobeError, Result},
    history::load_rows,
    kernels::Kernel,
    sink::{CsvRecord, KernelRow},
    stats,
};

/// Which roof limits a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    /// Below the ridge point: bandwidth limited
    Memory,
    /// At or past the ridge point: compute limited
    Compute,
}

impl Bound {
    /// Lowercase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Compute => "compute",
        }
    }
}

/// FLOPs per byte of `kernel` on `dtype`; `None` for non-FLOP kernels
#[must_use]
pub fn arithmetic_intensity(kernel: Kernel, dtype: Dtype) -> Option<f64> {
    let flops = kernel.descriptor().flops_per_element?;
    let bytes = kernel.bytes_per_element(dtype);
    (bytes > 0).then(|| flops / bytes as f64)
}

/// Machine ceilings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roofline {
    /// Sustained memory bandwidth, GB/s
    pub gbytes_per_s: f64,
    /// Peak compute, GFLOP/s
    pub gflops_peak: f64,
}

impl Roofline {
    /// Roofline with both ceilings positive and finite
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] for a non-positive or non-finite ceiling.
    pub fn new(gbytes_per_s: f64, gflops_peak: f64) -> Result<Self> {
        for (field, v) in [("gbytes_per_s", gbytes_per_s), ("gflops_peak", gflops_peak)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(HwprobeError::config(field, format!("{v} must be positive")));
            }
        }
        Ok(Self {
            gbytes_per_s,
            gflops_peak,
        })
    }

    /// Intensity where the two roofs meet
    #[must_use]
    pub fn ridge_point(&self) -> f64 {
        self.gflops_peak / self.gbytes_per_s
    }

    /// Attainable GFLOP/s at `intensity`
    #[must_use]
    pub fn attainable(&self, intensity: f64) -> f64 {
        self.gflops_peak.min(self.gbytes_per_s * intensity)
    }

    /// Limiting roof at `intensity`
    #[must_use]
    pub fn bound(&self, intensity: f64) -> Bound {
        if self.gbytes_per_s * intensity < self.gflops_peak {
            Bound::Memory
        } else {
            Bound::Compute
        }
    }
}

/// One kernel size placed on the roofline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RooflinePoint {
    /// Element count
    #[serde(rename = "N")]
    pub n: usize,
    /// FLOPs per byte
    pub intensity: f64,
    /// Median achieved GFLOP/s across runs at this size
    pub achieved_gflops: f64,
    /// Roofline limit at this intensity
    pub attainable_gflops: f64,
    /// `achieved / attainable`
    pub fraction: f64,
    /// Limiting roof
    pub bound: Bound,
}

impl CsvRecord for RooflinePoint {
    const HEADER: &'static [&'static str] = &[
        "N",
        "intensity",
        "achieved_gflops",
        "attainable_gflops",
        "fraction",
        "bound",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.n.to_string(),
            format!("{:.6}", self.intensity),
            format!("{:.6}", self.achieved_gflops),
            format!("{:.6}", self.attainable_gflops),
            format!("{:.6}", self.fraction),
            self.bound.name().to_string(),
        ]
    }
}

/// Rows considered for the roofline: matching kernel and dtype, `simd` variant
fn matches(row: &KernelRow, kernel: Kernel, dtype: Dtype) -> bool {
    row.kernel == kernel.name() && row.dtype == dtype.name() && row.variant == "simd"
}

/// Place every measured size of `kernel`/`dtype` on `roof`, ordered by N
///
/// # Errors
///
/// [`HwprobeError::InvalidConfig`] when `kernel` has no FLOP count.
pub fn analyze(
    rows: &[KernelRow],
    kernel: Kernel,
    dtype: Dtype,
    roof: &Roofline,
) -> Result<Vec<RooflinePoint>> {
    let intensity = arithmetic_intensity(kernel, dtype).ok_or_else(|| {
        HwprobeError::config("kernel", format!("'{kernel}' has no arithmetic intensity"))
    })?;

    let mut by_n: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for row in rows.iter().filter(|r| matches(r, kernel, dtype)) {
        by_n.entry(row.n).or_default().push(row.gflops);
    }

    let attainable = roof.attainable(intensity);
    let bound = roof.bound(intensity);
    Ok(by_n
        .into_iter()
        .filter_map(|(n, gflops)| {
            let achieved = stats::median_f64(&gflops)?;
            Some(RooflinePoint {
                n,
                intensity,
                achieved_gflops: achieved,
                attainable_gflops: attainable,
                fraction: achieved / attainable,
                bound,
            })
        })
        .collect())
}

/// [`analyze`] over the rows of a history file
///
/// # Errors
///
/// History loading errors, and [`HwprobeError::EmptyHistory`] when no row
/// matches.
pub fn analyze_file(
    path: &Path,
    kernel: Kernel,
    dtype: Dtype,
    roof: &Roofline,
) -> Result<Vec<RooflinePoint>> {
    let points = analyze(&load_rows(path)?, kernel, dtype, roof)?;
    if points.is_empty() {
        return Err(HwprobeError::EmptyHistory(path.to_path_buf()));
    }
    log::info!(
        "{kernel} {dtype}: intensity {:.4} FLOP/B, ridge at {:.4}",
        points[0].intensity,
        roof.ridge_point()
    );
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kernel: &str, dtype: &str, n: usize, gflops: f64, variant: &str) -> KernelRow {
        KernelRow {
            timestamp: "2026-05-06 07:08:09".into(),
            kernel: kernel.into(),
            dtype: dtype.into(),
            n,
            stride: 1,
            misalign: 0,
            variant: variant.into(),
            time_ms: 1.0,
            gflops,
            cpe: None,
        }
    }

    #[test]
    fn test_intensities() {
        let close = |a: Option<f64>, b: f64| (a.unwrap() - b).abs() < 1e-12;
        assert!(close(arithmetic_intensity(Kernel::Saxpy, Dtype::F32), 2.0 / 12.0));
        assert!(close(arithmetic_intensity(Kernel::Dot, Dtype::F32), 0.25));
        assert!(close(arithmetic_intensity(Kernel::Mul, Dtype::F64), 1.0 / 24.0));
        assert!(close(arithmetic_intensity(Kernel::Stencil3, Dtype::F32), 5.0 / 16.0));
        assert_eq!(arithmetic_intensity(Kernel::Chase, Dtype::F32), None);
    }

    #[test]
    fn test_roofs() {
        let roof = Roofline::new(40.0, 200.0).unwrap();
        assert_eq!(roof.ridge_point(), 5.0);
        assert_eq!(roof.attainable(0.25), 10.0);
        assert_eq!(roof.bound(0.25), Bound::Memory);
        assert_eq!(roof.attainable(10.0), 200.0);
        assert_eq!(roof.bound(10.0), Bound::Compute);
        assert!(Roofline::new(0.0, 1.0).is_err());
        assert!(Roofline::new(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_analyze_filters_and_takes_median() {
        let rows = vec![
            row("dot", "f32", 2048, 4.0, "simd"),
            row("dot", "f32", 1024, 2.0, "simd"),
            row("dot", "f32", 1024, 6.0, "simd"),
            row("dot", "f32", 1024, 4.0, "simd"),
            row("dot", "f32", 1024, 100.0, "scalar"),
            row("dot", "f64", 1024, 100.0, "simd"),
            row("saxpy", "f32", 1024, 100.0, "simd"),
        ];
        let roof = Roofline::new(40.0, 200.0).unwrap();
        let points = analyze(&rows, Kernel::Dot, Dtype::F32, &roof).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].n, 1024);
        assert_eq!(points[0].achieved_gflops, 4.0);
        assert_eq!(points[0].attainable_gflops, 10.0);
        assert!((points[0].fraction - 0.4).abs() < 1e-12);
        assert_eq!(points[0].bound, Bound::Memory);
        assert_eq!(points[1].n, 2048);
        assert_eq!(points[1].fields()[5], "memory");
    }

    #[test]
    fn test_non_flop_kernel_rejected() {
        let roof = Roofline::new(1.0, 1.0).unwrap();
        assert!(analyze(&[], Kernel::RwMix, Dtype::F32, &roof).is_err());
    }
}
