#![no_main]

use arbitrary::Arbitrary;
use fsp_fft::{FftArgs, FftOptions, Normalization, Tensor, TransformKind, forward_with_rule};
use fsp_runtime::RuntimeMode;
use libfuzzer_sys::fuzz_target;
use num_complex::Complex;

const KINDS: [TransformKind; 16] = [
    TransformKind::Fft,
    TransformKind::Ifft,
    TransformKind::Rfft,
    TransformKind::Irfft,
    TransformKind::Hfft,
    TransformKind::Ihfft,
    TransformKind::Fft2,
    TransformKind::Ifft2,
    TransformKind::Rfft2,
    TransformKind::Irfft2,
    TransformKind::Fftn,
    TransformKind::Ifftn,
    TransformKind::Rfftn,
    TransformKind::Irfftn,
    TransformKind::Hfftn,
    TransformKind::Ihfftn,
];

#[derive(Debug, Arbitrary)]
struct ArgsInput {
    kind: u8,
    dims: Vec<u8>,
    s: Option<Vec<i8>>,
    dim: Option<Vec<i8>>,
    norm: Option<u8>,
    complex: bool,
    hardened: bool,
    check_finite: bool,
    values: Vec<f64>,
}

fn build_tensor(shape: Vec<usize>, complex: bool, values: &[f64]) -> Option<Tensor> {
    let len = shape.iter().product::<usize>();
    let mut data = vec![0.0; 2 * len];
    for (slot, value) in data.iter_mut().zip(values.iter().copied()) {
        *slot = value;
    }
    if complex {
        let data = data.chunks_exact(2).map(|c| Complex::new(c[0], c[1])).collect();
        Tensor::from_complex128(shape, data).ok()
    } else {
        data.truncate(len);
        Tensor::from_f64(shape, data).ok()
    }
}

fuzz_target!(|input: ArgsInput| {
    let shape: Vec<usize> = input
        .dims
        .iter()
        .take(4)
        .map(|&d| usize::from(d % 6) + 1)
        .collect();
    if shape.is_empty() {
        return;
    }
    let Some(x) = build_tensor(shape, input.complex, &input.values) else {
        return;
    };
    let kind = KINDS[usize::from(input.kind) % KINDS.len()];
    let args = FftArgs {
        s: input.s.map(|s| s.into_iter().take(4).map(|n| i64::from(n % 12)).collect()),
        dim: input.dim.map(|d| d.into_iter().take(4).map(i64::from).collect()),
        norm: input.norm.map(|n| match n % 3 {
            0 => Normalization::Backward,
            1 => Normalization::Forward,
            _ => Normalization::Ortho,
        }),
    };
    let mode = if input.hardened {
        RuntimeMode::Hardened
    } else {
        RuntimeMode::Strict
    };
    let options = FftOptions::default()
        .with_mode(mode)
        .with_check_finite(input.check_finite);

    if let Ok((y, rule)) = forward_with_rule(kind, &x, &args, &options) {
        assert_eq!(y.shape(), rule.output_shape().as_slice());
        let grad = Tensor::full(y.shape(), y.dtype(), Complex::new(1.0, 0.0));
        let back = rule.apply(&grad).expect("backward of a valid forward");
        assert_eq!(back.shape(), x.shape());
    }
});
