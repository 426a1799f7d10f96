use crate::error::{FftError, FftResult};
use crate::nd::{normalize_axes, roll_axis};
use crate::tensor::Tensor;

/// Sample frequencies for the length-`n` complex FFT.
pub fn fftfreq(n: usize, sample_spacing: f64) -> FftResult<Vec<f64>> {
    validate_frequency_args(n, sample_spacing)?;
    let scale = 1.0 / (n as f64 * sample_spacing);
    let split = n.div_ceil(2);
    Ok((0..n)
        .map(|idx| {
            if idx < split {
                idx as f64 * scale
            } else {
                -((n - idx) as f64) * scale
            }
        })
        .collect())
}

/// Sample frequencies for the length-`n` real FFT.
pub fn rfftfreq(n: usize, sample_spacing: f64) -> FftResult<Vec<f64>> {
    validate_frequency_args(n, sample_spacing)?;
    let scale = 1.0 / (n as f64 * sample_spacing);
    Ok((0..=n / 2).map(|idx| idx as f64 * scale).collect())
}

/// Move the zero-frequency bin to the center of 1D input.
#[must_use]
pub fn fftshift_1d<T: Clone>(input: &[T]) -> Vec<T> {
    rotate_left_owned(input, input.len().div_ceil(2))
}

/// Inverse of [`fftshift_1d`].
#[must_use]
pub fn ifftshift_1d<T: Clone>(input: &[T]) -> Vec<T> {
    rotate_left_owned(input, input.len() / 2)
}

/// [`fftshift_1d`] applied along `axes` (every axis when `None`).
pub fn fftshift(x: &Tensor, axes: Option<&[i64]>) -> FftResult<Tensor> {
    shift_axes(x, axes, |len| len / 2)
}

/// [`ifftshift_1d`] applied along `axes` (every axis when `None`).
pub fn ifftshift(x: &Tensor, axes: Option<&[i64]>) -> FftResult<Tensor> {
    shift_axes(x, axes, |len| len.div_ceil(2))
}

fn shift_axes(x: &Tensor, axes: Option<&[i64]>, shift: impl Fn(usize) -> usize) -> FftResult<Tensor> {
    let rank = x.rank();
    let axes = match axes {
        Some(dims) => normalize_axes(dims, rank)?,
        None => (0..rank).collect(),
    };
    let mut out = x.clone();
    for axis in axes {
        let by = shift(x.shape()[axis]);
        out = match &out {
            Tensor::F32(array) => Tensor::F32(roll_axis(array, axis, by)),
            Tensor::F64(array) => Tensor::F64(roll_axis(array, axis, by)),
            Tensor::C64(array) => Tensor::C64(roll_axis(array, axis, by)),
            Tensor::C128(array) => Tensor::C128(roll_axis(array, axis, by)),
        };
    }
    Ok(out)
}

fn validate_frequency_args(n: usize, sample_spacing: f64) -> FftResult<()> {
    if n == 0 {
        return Err(FftError::invalid("n must be greater than zero"));
    }
    if !(sample_spacing.is_finite() && sample_spacing > 0.0) {
        return Err(FftError::invalid(
            "sample spacing must be finite and greater than zero",
        ));
    }
    Ok(())
}

fn rotate_left_owned<T: Clone>(input: &[T], shift: usize) -> Vec<T> {
    if input.is_empty() {
        return Vec::new();
    }
    let split = shift % input.len();
    input[split..]
        .iter()
        .cloned()
        .chain(input[..split].iter().cloned())
        .collect()
}
