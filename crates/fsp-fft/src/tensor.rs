//! Dense row-major tensors tagged with one of four element types.

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{FftError, FftResult};
use crate::scalar::{FftFloat, Precision};

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl DType {
    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    #[must_use]
    pub const fn precision(self) -> Precision {
        match self {
            Self::Float32 | Self::Complex64 => Precision::Single,
            Self::Float64 | Self::Complex128 => Precision::Double,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
        }
    }
}

/// Row-major strides in element units.
#[must_use]
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Element count of `shape`, rejecting `usize` overflow.
pub fn checked_numel(shape: &[usize]) -> FftResult<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        acc.checked_mul(dim)
            .ok_or_else(|| FftError::overflow(format!("shape {shape:?} overflows usize")))
    })
}

/// Contiguous array with explicit shape and strides.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseArray<E> {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<E>,
}

impl<E> DenseArray<E> {
    /// Wrap `data` as an array of `shape`. Every dimension must be at least 1.
    pub fn from_vec(shape: Vec<usize>, data: Vec<E>) -> FftResult<Self> {
        if shape.is_empty() {
            return Err(FftError::invalid("tensors must have rank >= 1"));
        }
        if let Some(axis) = shape.iter().position(|&dim| dim == 0) {
            return Err(FftError::invalid(format!(
                "dimension {axis} of shape {shape:?} is zero"
            )));
        }
        let expected = checked_numel(&shape)?;
        if data.len() != expected {
            return Err(FftError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_parts(shape, data))
    }

    /// Rank-0 array holding one value.
    #[must_use]
    pub fn scalar(value: E) -> Self {
        Self::from_parts(Vec::new(), vec![value])
    }

    /// Caller guarantees `data.len()` equals the product of `shape`.
    pub(crate) fn from_parts(shape: Vec<usize>, data: Vec<E>) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        let strides = row_major_strides(&shape);
        Self {
            shape,
            strides,
            data,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[E] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<E> {
        self.data
    }

    /// Element at a multi-index, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&E> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, d)| i >= d) {
            return None;
        }
        let offset: usize = index.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
        self.data.get(offset)
    }

    #[must_use]
    pub fn map<U>(&self, f: impl FnMut(&E) -> U) -> DenseArray<U> {
        DenseArray::from_parts(self.shape.clone(), self.data.iter().map(f).collect())
    }
}

impl<E: Copy> DenseArray<E> {
    /// Multiply every element by `factor`; a factor of one is skipped.
    pub(crate) fn scale_by<F>(&mut self, factor: F)
    where
        F: Copy + PartialEq + num_traits::One,
        E: std::ops::MulAssign<F>,
    {
        if factor.is_one() {
            return;
        }
        for value in &mut self.data {
            *value *= factor;
        }
    }
}

impl<E: Clone> DenseArray<E> {
    #[must_use]
    pub fn filled(shape: &[usize], value: E) -> Self {
        let len = shape.iter().product();
        Self::from_parts(shape.to_vec(), vec![value; len])
    }
}

/// Real- or complex-valued array at one working precision.
pub(crate) enum Signal<T> {
    Real(DenseArray<T>),
    Complex(DenseArray<Complex<T>>),
}

impl<T: FftFloat> Signal<T> {
    pub(crate) fn into_complex(self) -> DenseArray<Complex<T>> {
        match self {
            Self::Real(array) => array.map(|&re| Complex::new(re, T::zero())),
            Self::Complex(array) => array,
        }
    }

    /// Complex parts are dropped.
    pub(crate) fn into_real(self) -> DenseArray<T> {
        match self {
            Self::Real(array) => array,
            Self::Complex(array) => array.map(|c| c.re),
        }
    }
}

/// Dense tensor tagged with its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    F32(DenseArray<f32>),
    F64(DenseArray<f64>),
    C64(DenseArray<Complex<f32>>),
    C128(DenseArray<Complex<f64>>),
}

macro_rules! each_array {
    ($tensor:expr, $array:ident => $body:expr) => {
        match $tensor {
            Tensor::F32($array) => $body,
            Tensor::F64($array) => $body,
            Tensor::C64($array) => $body,
            Tensor::C128($array) => $body,
        }
    };
}

impl Tensor {
    pub fn from_f32(shape: Vec<usize>, data: Vec<f32>) -> FftResult<Self> {
        DenseArray::from_vec(shape, data).map(Self::F32)
    }

    pub fn from_f64(shape: Vec<usize>, data: Vec<f64>) -> FftResult<Self> {
        DenseArray::from_vec(shape, data).map(Self::F64)
    }

    pub fn from_complex64(shape: Vec<usize>, data: Vec<Complex<f32>>) -> FftResult<Self> {
        DenseArray::from_vec(shape, data).map(Self::C64)
    }

    pub fn from_complex128(shape: Vec<usize>, data: Vec<Complex<f64>>) -> FftResult<Self> {
        DenseArray::from_vec(shape, data).map(Self::C128)
    }

    /// Tensor of `shape` and `dtype` with every element equal to `value`.
    /// The imaginary part is ignored for real dtypes.
    #[must_use]
    pub fn full(shape: &[usize], dtype: DType, value: Complex<f64>) -> Self {
        match dtype {
            DType::Float32 => Self::F32(DenseArray::filled(shape, value.re as f32)),
            DType::Float64 => Self::F64(DenseArray::filled(shape, value.re)),
            DType::Complex64 => Self::C64(DenseArray::filled(
                shape,
                Complex::new(value.re as f32, value.im as f32),
            )),
            DType::Complex128 => Self::C128(DenseArray::filled(shape, value)),
        }
    }

    #[must_use]
    pub fn zeros_like(&self) -> Self {
        Self::full(self.shape(), self.dtype(), Complex::new(0.0, 0.0))
    }

    #[must_use]
    pub fn ones_like(&self) -> Self {
        Self::full(self.shape(), self.dtype(), Complex::new(1.0, 0.0))
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::Float32,
            Self::F64(_) => DType::Float64,
            Self::C64(_) => DType::Complex64,
            Self::C128(_) => DType::Complex128,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        each_array!(self, array => array.shape())
    }

    #[must_use]
    pub fn strides(&self) -> &[usize] {
        each_array!(self, array => array.strides())
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    #[must_use]
    pub fn numel(&self) -> usize {
        each_array!(self, array => array.len())
    }

    #[must_use]
    pub fn is_complex(&self) -> bool {
        self.dtype().is_complex()
    }

    /// Every element widened to `Complex<f64>`.
    #[must_use]
    pub fn to_complex128_vec(&self) -> Vec<Complex<f64>> {
        match self {
            Self::F32(array) => array
                .data()
                .iter()
                .map(|&re| Complex::new(f64::from(re), 0.0))
                .collect(),
            Self::F64(array) => array.data().iter().map(|&re| Complex::new(re, 0.0)).collect(),
            Self::C64(array) => array
                .data()
                .iter()
                .map(|c| Complex::new(f64::from(c.re), f64::from(c.im)))
                .collect(),
            Self::C128(array) => array.data().to_vec(),
        }
    }

    /// Real parts widened to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.to_complex128_vec().into_iter().map(|c| c.re).collect()
    }

    #[must_use]
    pub fn all_finite(&self) -> bool {
        match self {
            Self::F32(array) => array.data().iter().all(|v| v.is_finite()),
            Self::F64(array) => array.data().iter().all(|v| v.is_finite()),
            Self::C64(array) => array.data().iter().all(|v| v.is_finite()),
            Self::C128(array) => array.data().iter().all(|v| v.is_finite()),
        }
    }

    /// Rank-0 tensor holding the sum of every element.
    #[must_use]
    pub fn sum(&self) -> Self {
        match self {
            Self::F32(array) => Self::F32(DenseArray::scalar(array.data().iter().sum())),
            Self::F64(array) => Self::F64(DenseArray::scalar(array.data().iter().sum())),
            Self::C64(array) => Self::C64(DenseArray::scalar(array.data().iter().sum())),
            Self::C128(array) => Self::C128(DenseArray::scalar(array.data().iter().sum())),
        }
    }

    /// Element-wise `self += other`; shapes and dtypes must agree.
    pub fn add_assign(&mut self, other: &Self) -> FftResult<()> {
        if self.shape() != other.shape() {
            return Err(FftError::shape(format!(
                "cannot accumulate {:?} into {:?}",
                other.shape(),
                self.shape()
            )));
        }
        match (self, other) {
            (Self::F32(lhs), Self::F32(rhs)) => accumulate(lhs, rhs),
            (Self::F64(lhs), Self::F64(rhs)) => accumulate(lhs, rhs),
            (Self::C64(lhs), Self::C64(rhs)) => accumulate(lhs, rhs),
            (Self::C128(lhs), Self::C128(rhs)) => accumulate(lhs, rhs),
            (lhs, rhs) => {
                return Err(FftError::invalid(format!(
                    "cannot accumulate {} into {}",
                    rhs.dtype().label(),
                    lhs.dtype().label()
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<&DenseArray<f64>> {
        match self {
            Self::F64(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_complex128(&self) -> Option<&DenseArray<Complex<f64>>> {
        match self {
            Self::C128(array) => Some(array),
            _ => None,
        }
    }
}

fn accumulate<E: Copy + std::ops::AddAssign>(lhs: &mut DenseArray<E>, rhs: &DenseArray<E>) {
    for (l, &r) in lhs.data_mut().iter_mut().zip(rhs.data()) {
        *l += r;
    }
}
