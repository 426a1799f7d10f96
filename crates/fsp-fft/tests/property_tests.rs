//! Property tests for the fsp-fft variant layer.
//!
//! Convention: test_{variant}_{property}
//!
//! Axes are drawn as a random non-empty subset of `0..rank` in random order,
//! each written either as `axis` or `axis - rank`, so every value in
//! `[-rank, rank)` is reachable.
//!
//! Seed replay: `PROPTEST_CASES=1000 cargo test -p fsp-fft --test property_tests`
//! Reproduce: `PROPTEST_SEED=<seed> cargo test -p fsp-fft --test property_tests`

use fsp_fft::{
    FftArgs, FftOptions, Normalization, Tensor, TransformKind, fft, fftn, forward_with_rule,
    ifftn, irfftn, rfftn,
};
use fsp_runtime::{RuntimeMode, TestLogEntry, TestResult, max_relative_error};
use num_complex::Complex;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Case {
    shape: Vec<usize>,
    dims: Vec<i64>,
    s: Vec<i64>,
    norm: Option<Normalization>,
    seed: u64,
}

impl Case {
    fn args(&self) -> FftArgs {
        FftArgs {
            s: None,
            dim: Some(self.dims.clone()),
            norm: self.norm,
        }
    }

    fn args_with_s(&self) -> FftArgs {
        FftArgs {
            s: Some(self.s.clone()),
            ..self.args()
        }
    }

    fn axis(&self, dim: i64) -> usize {
        dim.rem_euclid(self.shape.len() as i64) as usize
    }
}

fn case_strategy() -> impl Strategy<Value = Case> {
    (1usize..=4).prop_flat_map(|rank| {
        (
            prop::collection::vec(prop::sample::select(vec![2usize, 4, 6, 8]), rank),
            prop::sample::subsequence((0..rank).collect::<Vec<_>>(), 1..=rank).prop_shuffle(),
            prop::collection::vec(any::<bool>(), rank),
            prop::collection::vec(prop::sample::select(vec![-1i64, 2, 3, 4, 6, 8, 10, 16]), rank),
            prop::sample::select(vec![
                None,
                Some(Normalization::Backward),
                Some(Normalization::Forward),
                Some(Normalization::Ortho),
            ]),
            any::<u64>(),
        )
            .prop_map(move |(shape, axes, negative, s, norm, seed)| {
                let dims = axes
                    .iter()
                    .zip(&negative)
                    .map(|(&axis, &neg)| if neg { axis as i64 - rank as i64 } else { axis as i64 })
                    .collect::<Vec<_>>();
                let s = s[..dims.len()].to_vec();
                Case {
                    shape,
                    dims,
                    s,
                    norm,
                    seed,
                }
            })
    })
}

fn values(len: usize, seed: u64) -> Vec<Complex<f64>> {
    let phase = (seed % 1000) as f64 * 0.01;
    (0..len)
        .map(|i| {
            let t = i as f64 + phase;
            Complex::new((t * 0.57).sin(), (t * 1.21).cos() * 0.75)
        })
        .collect()
}

fn complex_input(case: &Case) -> Tensor {
    let len = case.shape.iter().product();
    Tensor::from_complex128(case.shape.clone(), values(len, case.seed)).expect("complex input")
}

fn real_input(case: &Case) -> Tensor {
    let len = case.shape.iter().product();
    let data = values(len, case.seed).into_iter().map(|c| c.re).collect();
    Tensor::from_f64(case.shape.clone(), data).expect("real input")
}

fn interleave(tensor: &Tensor) -> Vec<f64> {
    tensor
        .to_complex128_vec()
        .iter()
        .flat_map(|c| [c.re, c.im])
        .collect()
}

fn real_inner(a: &Tensor, b: &Tensor) -> f64 {
    a.to_complex128_vec()
        .iter()
        .zip(b.to_complex128_vec())
        .map(|(x, y)| (x.conj() * y).re)
        .sum()
}

fn inner_scale(a: &Tensor, b: &Tensor) -> f64 {
    a.to_complex128_vec()
        .iter()
        .zip(b.to_complex128_vec())
        .map(|(x, y)| x.norm() * y.norm())
        .sum()
}

// ═══════════════════════════════════════════════════════════════
// Property 1: ifftn inverts fftn for any axis subset and norm
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_fftn_ifftn_round_trip(case in case_strategy()) {
        let x = complex_input(&case);
        let y = fftn(&x, &case.args()).expect("fftn");
        let back = ifftn(&y, &case.args()).expect("ifftn");
        let err = max_relative_error(&interleave(&back), &interleave(&x));
        prop_assert!(err < 1e-9, "{case:?}: {err}");
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 2: output shape follows s along the chosen axes
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_fftn_output_shape_follows_s(case in case_strategy()) {
        let y = fftn(&complex_input(&case), &case.args_with_s()).expect("fftn");
        let mut expected = case.shape.clone();
        for (&dim, &n) in case.dims.iter().zip(&case.s) {
            if n > 0 {
                expected[case.axis(dim)] = n as usize;
            }
        }
        prop_assert_eq!(y.shape(), expected.as_slice());
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 3: irfftn inverts rfftn for even sizes
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_rfftn_irfftn_round_trip(case in case_strategy()) {
        let x = real_input(&case);
        let spectrum = rfftn(&x, &case.args()).expect("rfftn");
        let last = case.axis(case.dims[case.dims.len() - 1]);
        prop_assert_eq!(spectrum.shape()[last], case.shape[last] / 2 + 1);

        let sizes: Vec<i64> = case.dims.iter().map(|&d| case.shape[case.axis(d)] as i64).collect();
        let back = irfftn(&spectrum, &case.args().with_s(sizes)).expect("irfftn");
        let err = max_relative_error(&back.to_f64_vec(), &x.to_f64_vec());
        prop_assert!(err < 1e-9, "{case:?}: {err}");
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 4: fftn equals 1-D transforms applied axis by axis
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_fftn_separates_into_1d_passes(case in case_strategy()) {
        let x = complex_input(&case);
        let joint = fftn(&x, &case.args_with_s()).expect("fftn");
        let mut staged = x;
        for (&dim, &n) in case.dims.iter().zip(&case.s) {
            staged = fft(&staged, Some(n), dim, None).expect("fft");
        }
        let norm = case.norm.unwrap_or_default();
        let count: usize = case
            .dims
            .iter()
            .zip(&case.s)
            .map(|(&d, &n)| if n > 0 { n as usize } else { case.shape[case.axis(d)] })
            .product();
        let scale = norm.scale(count, fsp_fft::Direction::Forward);
        let expected: Vec<f64> = interleave(&staged).into_iter().map(|v| v * scale).collect();
        let err = max_relative_error(&interleave(&joint), &expected);
        prop_assert!(err < 1e-10, "{case:?}: {err}");
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 5: every variant's gradient rule is the adjoint of its forward map
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_variant_rules_are_adjoint(case in case_strategy()) {
        let kinds = [
            (TransformKind::Fftn, false),
            (TransformKind::Ifftn, false),
            (TransformKind::Rfftn, true),
            (TransformKind::Ihfftn, true),
            (TransformKind::Irfftn, false),
            (TransformKind::Hfftn, false),
        ];
        for (kind, real) in kinds {
            let x = if real { real_input(&case) } else { complex_input(&case) };
            let (y, rule) = forward_with_rule(kind, &x, &case.args_with_s(), &FftOptions::default())
                .expect("forward");
            let g_case = Case { shape: y.shape().to_vec(), seed: case.seed ^ 0x5a5a, ..case.clone() };
            let g = if y.is_complex() { complex_input(&g_case) } else { real_input(&g_case) };
            let grad = rule.apply(&g).expect("backward");
            prop_assert_eq!(grad.shape(), x.shape());
            let lhs = real_inner(&g, &y);
            let rhs = real_inner(&grad, &x);
            let tol = 1e-10 * inner_scale(&g, &y).max(inner_scale(&grad, &x)).max(1.0);
            prop_assert!(
                (lhs - rhs).abs() <= tol,
                "{kind:?} {case:?}: {lhs} vs {rhs}"
            );
        }
        let entry = TestLogEntry::new("test_variant_rules_are_adjoint", "fsp_fft", "adjoint holds")
            .with_seed(case.seed)
            .with_mode(RuntimeMode::Strict)
            .with_result(TestResult::Pass);
        prop_assert!(entry.to_json_line().contains("adjoint holds"));
    }
}
