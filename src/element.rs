//! Floating-point element types the kernels are generic over

use std::{fmt, ops::AddAssign, str::FromStr};

use num_traits::{AsPrimitive, Float, FromPrimitive};
use rand::distributions::uniform::SampleUniform;
use serde::{Deserialize, Serialize};

use crate::error::HwprobeError;

/// Element data type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// 32-bit IEEE-754 float
    F32,
    /// 64-bit IEEE-754 float
    F64,
}

impl Dtype {
    /// Short name used on the command line and in result files
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Size of one element in bytes
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dtype {
    type Err = HwprobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f32" | "float" => Ok(Self::F32),
            "f64" | "double" => Ok(Self::F64),
            other => Err(HwprobeError::UnknownDtype(other.to_string())),
        }
    }
}

/// Floating-point element a kernel can operate on
///
/// Arithmetic and constants come from [`num_traits::Float`]; `f64` constants
/// are narrowed with [`FromPrimitive`] and results widened with
/// [`AsPrimitive<f64>`]. Fills are drawn directly in `Self` through rand's
/// [`SampleUniform`].
pub trait Element:
    Float
    + FromPrimitive
    + AsPrimitive<f64>
    + SampleUniform
    + AddAssign
    + Default
    + fmt::Debug
    + Send
    + Sync
{
    /// Runtime tag for this type
    const DTYPE: Dtype;
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;
}

impl Element for f64 {
    const DTYPE: Dtype = Dtype::F64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_parse() {
        assert_eq!("f32".parse::<Dtype>().unwrap(), Dtype::F32);
        assert_eq!("double".parse::<Dtype>().unwrap(), Dtype::F64);
        assert!(matches!(
            "bf16".parse::<Dtype>(),
            Err(HwprobeError::UnknownDtype(s)) if s == "bf16"
        ));
    }

    #[test]
    fn test_dtype_matches_element() {
        assert_eq!(<f32 as Element>::DTYPE.size_bytes(), std::mem::size_of::<f32>());
        assert_eq!(<f64 as Element>::DTYPE.size_bytes(), std::mem::size_of::<f64>());
        assert_eq!(Dtype::F64.to_string(), "f64");
    }

    fn narrow_then_widen<T: Element>(v: f64) -> f64 {
        T::from_f64(v).unwrap_or_else(T::nan).as_()
    }

    #[test]
    fn test_conversions() {
        assert_eq!(narrow_then_widen::<f32>(1.5), 1.5);
        assert_eq!(narrow_then_widen::<f64>(1.111), 1.111);
        assert_eq!(narrow_then_widen::<f32>(1.111), f64::from(1.111_f32));
        assert_eq!(<f32 as num_traits::Zero>::zero(), 0.0);
    }
}
