use std::fmt::Debug;

use num_complex::Complex;
use num_traits::{Float, FloatConst, NumAssign};
use serde::{Deserialize, Serialize};

use crate::tensor::{DenseArray, Tensor};

/// Working precision of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    /// Largest transform length whose indices are exactly representable.
    #[must_use]
    pub const fn max_exact_len(self) -> u64 {
        match self {
            Self::Single => 1 << 24,
            Self::Double => 1 << 53,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Real scalar type the engine computes in.
///
/// Implemented for `f32` and `f64` only. Twiddle factors and chirps are
/// always generated in `f64` and rounded once into `Self`.
pub trait FftFloat:
    Float + FloatConst + NumAssign + Default + Debug + Send + Sync + 'static + sealed::Sealed
{
    const PRECISION: Precision;
    const MAX_EXACT_LEN: u64 = Self::PRECISION.max_exact_len();

    fn cast_f64(value: f64) -> Self;

    fn wrap_real(array: DenseArray<Self>) -> Tensor;
    fn wrap_complex(array: DenseArray<Complex<Self>>) -> Tensor;
}

impl FftFloat for f32 {
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn cast_f64(value: f64) -> Self {
        value as f32
    }

    fn wrap_real(array: DenseArray<Self>) -> Tensor {
        Tensor::F32(array)
    }

    fn wrap_complex(array: DenseArray<Complex<Self>>) -> Tensor {
        Tensor::C64(array)
    }
}

impl FftFloat for f64 {
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn cast_f64(value: f64) -> Self {
        value
    }

    fn wrap_real(array: DenseArray<Self>) -> Tensor {
        Tensor::F64(array)
    }

    fn wrap_complex(array: DenseArray<Complex<Self>>) -> Tensor {
        Tensor::C128(array)
    }
}

/// `exp(sign * 2πi * k / n)` evaluated in `f64`.
pub(crate) fn unit_root<T: FftFloat>(k: usize, n: usize, sign: f64) -> Complex<T> {
    let angle = sign * 2.0 * std::f64::consts::PI * (k as f64) / (n as f64);
    Complex::new(T::cast_f64(angle.cos()), T::cast_f64(angle.sin()))
}
