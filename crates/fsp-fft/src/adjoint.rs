//! Gradient rules for the transform variants.
//!
//! Gradients follow the conjugate Wirtinger convention: for a real loss `L`
//! the gradient of a complex tensor `z` is `∂L/∂Re(z) + i·∂L/∂Im(z)`, and
//! for a linear operator `A` the input gradient is `A^H g`. Every variant is
//! real-linear, so `A^H` is the opposite-direction transform with the same
//! scale, with resizes reversed and onesided axes expanded or folded.

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::TransformFamily;
use crate::error::{FftError, FftResult};
use crate::nd::{Execution, c2c_axes, r2c_axis, resize_axis};
use crate::scalar::FftFloat;
use crate::tensor::{DType, DenseArray, Signal, Tensor};
use crate::transforms::{TransformSpec, WorkerPolicy};

/// Backward rule captured by a forward transform call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FftBackward {
    spec: TransformSpec,
    input_shape: Vec<usize>,
    input_dtype: DType,
    workers: WorkerPolicy,
}

impl FftBackward {
    pub(crate) fn new(
        spec: TransformSpec,
        input_shape: Vec<usize>,
        input_dtype: DType,
        workers: WorkerPolicy,
    ) -> Self {
        Self {
            spec,
            input_shape,
            input_dtype,
            workers,
        }
    }

    #[must_use]
    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    #[must_use]
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    #[must_use]
    pub fn input_dtype(&self) -> DType {
        self.input_dtype
    }

    /// Shape the upstream gradient must have.
    #[must_use]
    pub fn output_shape(&self) -> Vec<usize> {
        self.spec.output_shape(&self.input_shape)
    }

    /// Map the gradient of the forward output to the gradient of its input.
    ///
    /// A real `grad` for a complex output is treated as having zero
    /// imaginary part; a complex `grad` for a real output keeps its real part.
    pub fn apply(&self, grad: &Tensor) -> FftResult<Tensor> {
        let expected = self.output_shape();
        if grad.shape() != expected.as_slice() {
            return Err(FftError::shape(format!(
                "{} gradient has shape {:?}, expected {expected:?}",
                self.spec.kind.name(),
                grad.shape()
            )));
        }
        if grad.dtype().precision() != self.input_dtype.precision() {
            return Err(FftError::invalid(format!(
                "{} gradient for a {} input",
                grad.dtype().label(),
                self.input_dtype.label()
            )));
        }
        let work = grad.numel().max(self.input_shape.iter().product());
        let exec = Execution::resolve(self.workers, work)?;
        match grad.clone() {
            Tensor::F32(array) => self.apply_typed::<f32>(Signal::Real(array), &exec),
            Tensor::F64(array) => self.apply_typed::<f64>(Signal::Real(array), &exec),
            Tensor::C64(array) => self.apply_typed::<f32>(Signal::Complex(array), &exec),
            Tensor::C128(array) => self.apply_typed::<f64>(Signal::Complex(array), &exec),
        }
    }

    fn apply_typed<T: FftFloat>(&self, grad: Signal<T>, exec: &Execution) -> FftResult<Tensor> {
        let spec = &self.spec;
        let direction = spec.direction().opposite();
        let zero = Complex::new(T::zero(), T::zero());
        let family = spec.kind.family();

        let transformed = match family {
            TransformFamily::ComplexToComplex => c2c_axes(
                grad.into_complex(),
                &spec.axes,
                &spec.signal_sizes,
                direction,
                exec,
            )?,
            TransformFamily::RealToComplex => {
                let (_, _, last_axis, last_len) = spec.split_last();
                let embedded = resize_axis(grad.into_complex(), last_axis, last_len, zero);
                c2c_axes(embedded, &spec.axes, &spec.signal_sizes, direction, exec)?
            }
            TransformFamily::ComplexToReal => {
                let (axes, sizes, last_axis, last_len) = spec.split_last();
                let mut folded = r2c_axis(&grad.into_real(), last_axis, last_len, direction, exec)?;
                double_interior_bins(&mut folded, last_axis, last_len);
                c2c_axes(folded, axes, sizes, direction, exec)?
            }
        };

        let mut input_grad = spec
            .axes
            .iter()
            .zip(&spec.input_sizes)
            .fold(transformed, |acc, (&axis, &len)| resize_axis(acc, axis, len, zero));
        input_grad.scale_by(T::cast_f64(spec.scale()));

        if family == TransformFamily::RealToComplex || !self.input_dtype.is_complex() {
            Ok(T::wrap_real(input_grad.map(|c| c.re)))
        } else {
            Ok(T::wrap_complex(input_grad))
        }
    }
}

/// Double every bin of a onesided axis except DC and, for even `n`, Nyquist.
fn double_interior_bins<T: FftFloat>(array: &mut DenseArray<Complex<T>>, axis: usize, n: usize) {
    let half = array.shape()[axis];
    let inner: usize = array.shape()[axis + 1..].iter().product();
    let two = T::cast_f64(2.0);
    for (idx, value) in array.data_mut().iter_mut().enumerate() {
        let k = (idx / inner) % half;
        if k != 0 && 2 * k != n {
            *value = *value * two;
        }
    }
}

#[cfg(test)]
mod tests {
    use num_complex::Complex;

    use crate::error::FftError;
    use crate::tensor::{DType, Tensor};
    use crate::transforms::{FftArgs, FftOptions, forward_with_rule};
    use crate::{Normalization, TransformKind};

    fn sample(len: usize, seed: f64) -> Vec<Complex<f64>> {
        (0..len)
            .map(|i| {
                let t = i as f64 + seed;
                Complex::new((t * 0.73).sin(), (t * 1.37).cos() * 0.5)
            })
            .collect()
    }

    fn tensor_like(shape: &[usize], dtype: DType, seed: f64) -> Tensor {
        let len = shape.iter().product();
        let values = sample(len, seed);
        let tensor = match dtype {
            DType::Float64 => {
                Tensor::from_f64(shape.to_vec(), values.iter().map(|c| c.re).collect())
            }
            DType::Complex128 => Tensor::from_complex128(shape.to_vec(), values),
            _ => unreachable!("double precision only"),
        };
        tensor.expect("tensor")
    }

    /// `Re⟨a, b⟩` with `a` conjugated.
    fn real_inner(a: &Tensor, b: &Tensor) -> f64 {
        a.to_complex128_vec()
            .iter()
            .zip(b.to_complex128_vec())
            .map(|(x, y)| (x.conj() * y).re)
            .sum()
    }

    fn assert_adjoint(kind: TransformKind, dtype: DType, shape: &[usize], args: FftArgs) {
        let x = tensor_like(shape, dtype, 0.3);
        let (y, rule) = forward_with_rule(kind, &x, &args, &FftOptions::default())
            .unwrap_or_else(|err| panic!("{kind:?} {args:?}: {err}"));
        let g = tensor_like(y.shape(), y.dtype(), 1.9);
        let grad = rule.apply(&g).expect("backward");
        assert_eq!(grad.shape(), x.shape());
        assert_eq!(grad.dtype(), x.dtype());
        let lhs = real_inner(&g, &y);
        let rhs = real_inner(&grad, &x);
        assert!(
            (lhs - rhs).abs() <= 1e-9 * lhs.abs().max(1.0),
            "{kind:?} {args:?}: {lhs} vs {rhs}"
        );
    }

    #[test]
    fn complex_rules_are_adjoint() {
        for norm in [Normalization::Backward, Normalization::Forward, Normalization::Ortho] {
            for dtype in [DType::Float64, DType::Complex128] {
                let args = FftArgs::new().with_s([6, -1]).with_dim([0, 2]).with_norm(norm);
                assert_adjoint(TransformKind::Fftn, dtype, &[4, 3, 5], args.clone());
                assert_adjoint(TransformKind::Ifftn, dtype, &[4, 3, 5], args);
            }
        }
    }

    #[test]
    fn real_to_complex_rules_are_adjoint() {
        for n_last in [8, 9, 3] {
            let args = FftArgs::new()
                .with_s([3, n_last])
                .with_dim([0, 1])
                .with_norm(Normalization::Ortho);
            assert_adjoint(TransformKind::Rfftn, DType::Float64, &[4, 6], args.clone());
            assert_adjoint(TransformKind::Ihfftn, DType::Float64, &[4, 6], args);
        }
    }

    #[test]
    fn complex_to_real_rules_are_adjoint() {
        for n_last in [8, 9, 2] {
            for dtype in [DType::Float64, DType::Complex128] {
                let args = FftArgs::new().with_s([2, n_last]).with_dim([1, 0]);
                assert_adjoint(TransformKind::Irfftn, dtype, &[4, 3], args.clone());
                assert_adjoint(TransformKind::Hfftn, dtype, &[4, 3], args);
            }
        }
    }

    #[test]
    fn mismatched_gradient_shape_is_rejected() {
        let x = tensor_like(&[4], DType::Complex128, 0.0);
        let (_, rule) =
            forward_with_rule(TransformKind::Fftn, &x, &FftArgs::new(), &FftOptions::default())
                .expect("forward");
        let wrong = tensor_like(&[5], DType::Complex128, 0.0);
        assert!(matches!(
            rule.apply(&wrong),
            Err(FftError::ShapeMismatch { .. })
        ));
        let single = Tensor::from_complex64(vec![4], vec![Complex::new(1.0, 0.0); 4])
            .expect("single");
        assert!(matches!(
            rule.apply(&single),
            Err(FftError::InvalidArgument { .. })
        ));
    }
}
