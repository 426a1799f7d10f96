use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use fsp_runtime::{RuntimeMode, TraceLedger};
use serde::{Deserialize, Serialize};

use crate::adjoint::FftBackward;
use crate::error::{FftError, FftResult};
use crate::nd::{Execution, c2c_axes, c2r_axis, normalize_axes, r2c_axis};
use crate::plan::{
    PlanKey, PlanMetadata, PlanStrategy, PlanningStrategy, estimate_fingerprint,
    lookup_shared_plan, store_shared_plan,
};
use crate::scalar::{FftFloat, Precision};
use crate::tensor::{DType, Signal, Tensor, checked_numel};
use crate::{Direction, Normalization, TransformFamily, TransformKind};

/// Worker control policy for transform execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkerPolicy {
    /// Parallel over lanes on the global rayon pool once the tensor is large enough.
    #[default]
    Auto,
    /// Require an exact worker count.
    Exact(usize),
    /// Upper-bound worker count.
    Max(usize),
}

/// Common options shared by FFT transform entrypoints.
///
/// `normalization` applies when the call itself passes no `norm`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FftOptions {
    pub mode: RuntimeMode,
    pub normalization: Normalization,
    pub workers: WorkerPolicy,
    pub check_finite: bool,
}

impl FftOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: WorkerPolicy) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_check_finite(mut self, check_finite: bool) -> Self {
        self.check_finite = check_finite;
        self
    }

    fn rejects_non_finite(&self) -> bool {
        self.check_finite || self.mode.checks_finite()
    }
}

/// Per-call transform arguments: target lengths, axes and normalization.
///
/// `s` entries of `-1` keep the input length. Without `dim`, `s` applies to
/// the last `s.len()` axes; without either, every axis is transformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FftArgs {
    pub s: Option<Vec<i64>>,
    pub dim: Option<Vec<i64>>,
    pub norm: Option<Normalization>,
}

impl FftArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_s(mut self, s: impl Into<Vec<i64>>) -> Self {
        self.s = Some(s.into());
        self
    }

    #[must_use]
    pub fn with_dim(mut self, dim: impl Into<Vec<i64>>) -> Self {
        self.dim = Some(dim.into());
        self
    }

    #[must_use]
    pub fn with_norm(mut self, norm: Normalization) -> Self {
        self.norm = Some(norm);
        self
    }

    fn one_dim(n: Option<i64>, dim: i64, norm: Option<Normalization>) -> Self {
        Self {
            s: n.map(|n| vec![n]),
            dim: Some(vec![dim]),
            norm,
        }
    }
}

/// Fully resolved transform request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub kind: TransformKind,
    /// Non-negative, unique axes in application order.
    pub axes: Vec<usize>,
    /// Input length along each axis.
    pub input_sizes: Vec<usize>,
    /// Logical signal length along each axis; their product is the
    /// normalization count.
    pub signal_sizes: Vec<usize>,
    /// Output length along each axis.
    pub output_sizes: Vec<usize>,
    pub norm: Normalization,
}

impl TransformSpec {
    /// Validate `args` against an input of `shape` at `precision`.
    pub fn resolve(
        kind: TransformKind,
        shape: &[usize],
        args: &FftArgs,
        default_norm: Normalization,
        precision: Precision,
    ) -> FftResult<Self> {
        let rank = shape.len();
        if rank == 0 {
            return Err(FftError::invalid(format!(
                "{} needs a tensor of rank >= 1",
                kind.name()
            )));
        }

        let fallback = default_dims(kind);
        let dims: Vec<i64> = match (&args.s, args.dim.as_ref().or(fallback.as_ref())) {
            (Some(s), Some(dim)) if s.len() != dim.len() => {
                return Err(FftError::invalid(format!(
                    "s has {} entries but dim has {}",
                    s.len(),
                    dim.len()
                )));
            }
            (_, Some(dim)) => dim.clone(),
            (Some(s), None) => {
                if s.len() > rank {
                    return Err(FftError::invalid(format!(
                        "s has {} entries for a rank-{rank} tensor",
                        s.len()
                    )));
                }
                (rank - s.len()..rank).map(|axis| axis as i64).collect()
            }
            (None, None) => (0..rank).map(|axis| axis as i64).collect(),
        };
        let axes = normalize_axes(&dims, rank)?;

        let family = kind.family();
        if family != TransformFamily::ComplexToComplex && axes.is_empty() {
            return Err(FftError::invalid(format!(
                "{} needs at least one axis",
                kind.name()
            )));
        }

        let requested = match &args.s {
            Some(s) => s.iter().map(|&n| parse_length(n)).collect::<FftResult<Vec<_>>>()?,
            None => vec![None; axes.len()],
        };

        let input_sizes: Vec<usize> = axes.iter().map(|&axis| shape[axis]).collect();
        let last = axes.len().saturating_sub(1);
        let mut signal_sizes = Vec::with_capacity(axes.len());
        let mut output_sizes = Vec::with_capacity(axes.len());
        for (idx, (&input_len, &requested_len)) in input_sizes.iter().zip(&requested).enumerate() {
            let is_last = idx == last;
            let signal = match (family, requested_len) {
                (_, Some(n)) => n,
                (TransformFamily::ComplexToReal, None) if is_last => {
                    let n = 2 * (input_len - 1);
                    if n == 0 {
                        return Err(FftError::shape(format!(
                            "{} of a length-1 half spectrum has no default output length",
                            kind.name()
                        )));
                    }
                    n
                }
                (_, None) => input_len,
            };
            if signal as u64 > precision.max_exact_len() {
                return Err(FftError::overflow(format!(
                    "length {signal} exceeds {} for {precision:?} precision",
                    precision.max_exact_len()
                )));
            }
            let output = match family {
                TransformFamily::RealToComplex if is_last => signal / 2 + 1,
                _ => signal,
            };
            signal_sizes.push(signal);
            output_sizes.push(output);
        }

        let spec = Self {
            kind,
            axes,
            input_sizes,
            signal_sizes,
            output_sizes,
            norm: args.norm.unwrap_or(default_norm),
        };
        checked_numel(&spec.signal_sizes)?;
        checked_numel(&spec.output_shape(shape))?;
        Ok(spec)
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    /// Number of samples the normalization divides by.
    #[must_use]
    pub fn signal_numel(&self) -> usize {
        self.signal_sizes.iter().product()
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.norm.scale(self.signal_numel(), self.direction())
    }

    #[must_use]
    pub fn output_shape(&self, input_shape: &[usize]) -> Vec<usize> {
        let mut shape = input_shape.to_vec();
        for (&axis, &len) in self.axes.iter().zip(&self.output_sizes) {
            shape[axis] = len;
        }
        shape
    }

    /// Output dtype for an input of `dtype`.
    #[must_use]
    pub fn output_dtype(&self, dtype: DType) -> DType {
        let single = dtype.precision() == Precision::Single;
        match (self.kind.family(), single) {
            (TransformFamily::ComplexToReal, true) => DType::Float32,
            (TransformFamily::ComplexToReal, false) => DType::Float64,
            (_, true) => DType::Complex64,
            (_, false) => DType::Complex128,
        }
    }

    /// Split into (leading axes, leading lengths, last axis, last length).
    pub(crate) fn split_last(&self) -> (&[usize], &[usize], usize, usize) {
        let k = self.axes.len() - 1;
        (
            &self.axes[..k],
            &self.signal_sizes[..k],
            self.axes[k],
            self.signal_sizes[k],
        )
    }
}

fn default_dims(kind: TransformKind) -> Option<Vec<i64>> {
    match kind {
        TransformKind::Fft
        | TransformKind::Ifft
        | TransformKind::Rfft
        | TransformKind::Irfft
        | TransformKind::Hfft
        | TransformKind::Ihfft => Some(vec![-1]),
        TransformKind::Fft2
        | TransformKind::Ifft2
        | TransformKind::Rfft2
        | TransformKind::Irfft2 => Some(vec![-2, -1]),
        _ => None,
    }
}

fn parse_length(n: i64) -> FftResult<Option<usize>> {
    match n {
        -1 => Ok(None),
        n if n >= 1 => usize::try_from(n)
            .map(Some)
            .map_err(|_| FftError::overflow(format!("length {n} does not fit in usize"))),
        n => Err(FftError::invalid(format!(
            "signal length {n} must be -1 or at least 1"
        ))),
    }
}

/// Structured record of one public transform call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformTrace {
    pub operation_id: String,
    pub kind: TransformKind,
    pub direction: Direction,
    pub dtype: DType,
    pub input_shape: Vec<usize>,
    pub signal_sizes: Vec<usize>,
    pub n: usize,
    pub norm: Normalization,
    pub strategy: PlanStrategy,
    pub plan_cache_hit: bool,
    pub mode: RuntimeMode,
    pub workers: usize,
    pub timing_ns: u64,
}

impl TransformTrace {
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

const TRACE_CAPACITY: usize = 1024;

static TRACE_LOG: OnceLock<Mutex<TraceLedger<TransformTrace>>> = OnceLock::new();
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn trace_log() -> &'static Mutex<TraceLedger<TransformTrace>> {
    TRACE_LOG.get_or_init(|| Mutex::new(TraceLedger::new(TRACE_CAPACITY)))
}

fn next_operation_id() -> String {
    let next = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("fft-op-{next:016x}")
}

fn record_trace(trace: TransformTrace) {
    if let Ok(mut log) = trace_log().lock() {
        log.record(trace);
    }
}

/// Drain every recorded trace, oldest first.
#[must_use]
pub fn take_transform_traces() -> Vec<TransformTrace> {
    trace_log()
        .lock()
        .map(|mut log| log.drain())
        .unwrap_or_default()
}

/// Look up or record the plan metadata for every axis length. Returns
/// whether every length hit and the most expensive strategy involved.
fn touch_plan_cache(spec: &TransformSpec, precision: Precision) -> (bool, PlanStrategy) {
    let mut all_hit = true;
    let mut strategy = PlanStrategy::Identity;
    for &len in &spec.signal_sizes {
        let key = PlanKey::new(len, precision, spec.direction());
        let fingerprint = match lookup_shared_plan(&key) {
            Some(metadata) => metadata.fingerprint,
            None => {
                all_hit = false;
                let fingerprint = estimate_fingerprint(len, precision);
                store_shared_plan(PlanMetadata {
                    key,
                    fingerprint: fingerprint.clone(),
                    generated_by: PlanningStrategy::EstimateOnly,
                });
                fingerprint
            }
        };
        strategy = match (strategy, fingerprint.strategy) {
            (PlanStrategy::Bluestein, _) | (_, PlanStrategy::Bluestein) => PlanStrategy::Bluestein,
            (PlanStrategy::MixedRadix, _) | (_, PlanStrategy::MixedRadix) => {
                PlanStrategy::MixedRadix
            }
            _ => PlanStrategy::Identity,
        };
    }
    (all_hit, strategy)
}

fn compute<T: FftFloat>(
    input: Signal<T>,
    spec: &TransformSpec,
    exec: &Execution,
) -> FftResult<Tensor> {
    let direction = spec.direction();
    let scale = T::cast_f64(spec.scale());
    match spec.kind.family() {
        TransformFamily::ComplexToComplex => {
            let mut out = c2c_axes(
                input.into_complex(),
                &spec.axes,
                &spec.signal_sizes,
                direction,
                exec,
            )?;
            out.scale_by(scale);
            Ok(T::wrap_complex(out))
        }
        TransformFamily::RealToComplex => {
            let (axes, sizes, last_axis, last_len) = spec.split_last();
            let half = r2c_axis(&input.into_real(), last_axis, last_len, direction, exec)?;
            let mut out = c2c_axes(half, axes, sizes, direction, exec)?;
            out.scale_by(scale);
            Ok(T::wrap_complex(out))
        }
        TransformFamily::ComplexToReal => {
            let (axes, sizes, last_axis, last_len) = spec.split_last();
            let mixed = c2c_axes(input.into_complex(), axes, sizes, direction, exec)?;
            let mut out = c2r_axis(&mixed, last_axis, last_len, direction, exec)?;
            out.scale_by(scale);
            Ok(T::wrap_real(out))
        }
    }
}

fn execute(
    kind: TransformKind,
    x: &Tensor,
    args: &FftArgs,
    options: &FftOptions,
) -> FftResult<(Tensor, TransformSpec)> {
    if kind.family() == TransformFamily::RealToComplex && x.is_complex() {
        return Err(FftError::invalid(format!(
            "{} does not support dtype {}",
            kind.name(),
            x.dtype().label()
        )));
    }
    let precision = x.dtype().precision();
    let spec = TransformSpec::resolve(kind, x.shape(), args, options.normalization, precision)?;
    if options.rejects_non_finite() && !x.all_finite() {
        return Err(FftError::NonFiniteInput);
    }
    let work = x.numel().max(spec.output_shape(x.shape()).iter().product());
    let exec = Execution::resolve(options.workers, work)?;
    let (plan_cache_hit, strategy) = touch_plan_cache(&spec, precision);

    let started = Instant::now();
    let output = match x.clone() {
        Tensor::F32(array) => compute::<f32>(Signal::Real(array), &spec, &exec)?,
        Tensor::F64(array) => compute::<f64>(Signal::Real(array), &spec, &exec)?,
        Tensor::C64(array) => compute::<f32>(Signal::Complex(array), &spec, &exec)?,
        Tensor::C128(array) => compute::<f64>(Signal::Complex(array), &spec, &exec)?,
    };

    record_trace(TransformTrace {
        operation_id: next_operation_id(),
        kind,
        direction: spec.direction(),
        dtype: x.dtype(),
        input_shape: x.shape().to_vec(),
        signal_sizes: spec.signal_sizes.clone(),
        n: spec.signal_numel(),
        norm: spec.norm,
        strategy,
        plan_cache_hit,
        mode: options.mode,
        workers: exec.width(),
        timing_ns: u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX),
    });

    Ok((output, spec))
}

fn run(
    kind: TransformKind,
    x: &Tensor,
    args: &FftArgs,
    options: &FftOptions,
) -> FftResult<Tensor> {
    execute(kind, x, args, options).map(|(output, _)| output)
}

/// Run `kind` and return its output together with the matching gradient rule.
pub fn forward_with_rule(
    kind: TransformKind,
    x: &Tensor,
    args: &FftArgs,
    options: &FftOptions,
) -> FftResult<(Tensor, FftBackward)> {
    let (output, spec) = execute(kind, x, args, options)?;
    let rule = FftBackward::new(spec, x.shape().to_vec(), x.dtype(), options.workers);
    Ok((output, rule))
}

// ── 1-D entrypoints ─────────────────────────────────────────────────

/// 1D forward complex FFT along `dim`; real input is promoted.
pub fn fft(x: &Tensor, n: Option<i64>, dim: i64, norm: Option<Normalization>) -> FftResult<Tensor> {
    fft_with_options(x, n, dim, norm, &FftOptions::default())
}

pub fn fft_with_options(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Fft, x, &FftArgs::one_dim(n, dim, norm), options)
}

/// 1D inverse complex FFT.
pub fn ifft(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
) -> FftResult<Tensor> {
    ifft_with_options(x, n, dim, norm, &FftOptions::default())
}

pub fn ifft_with_options(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Ifft, x, &FftArgs::one_dim(n, dim, norm), options)
}

/// 1D real-input FFT returning the onesided spectrum.
pub fn rfft(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
) -> FftResult<Tensor> {
    rfft_with_options(x, n, dim, norm, &FftOptions::default())
}

pub fn rfft_with_options(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Rfft, x, &FftArgs::one_dim(n, dim, norm), options)
}

/// 1D inverse of [`rfft`]; `n` defaults to `2 * (len - 1)`.
pub fn irfft(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
) -> FftResult<Tensor> {
    irfft_with_options(x, n, dim, norm, &FftOptions::default())
}

pub fn irfft_with_options(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Irfft, x, &FftArgs::one_dim(n, dim, norm), options)
}

/// 1D FFT of a Hermitian-symmetric signal given by its first half.
pub fn hfft(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
) -> FftResult<Tensor> {
    hfft_with_options(x, n, dim, norm, &FftOptions::default())
}

pub fn hfft_with_options(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Hfft, x, &FftArgs::one_dim(n, dim, norm), options)
}

/// 1D inverse of [`hfft`] for real input.
pub fn ihfft(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
) -> FftResult<Tensor> {
    ihfft_with_options(x, n, dim, norm, &FftOptions::default())
}

pub fn ihfft_with_options(
    x: &Tensor,
    n: Option<i64>,
    dim: i64,
    norm: Option<Normalization>,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Ihfft, x, &FftArgs::one_dim(n, dim, norm), options)
}

// ── 2-D entrypoints (dim defaults to [-2, -1]) ──────────────────────

pub fn fft2(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    fft2_with_options(x, args, &FftOptions::default())
}

pub fn fft2_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Fft2, x, args, options)
}

pub fn ifft2(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    ifft2_with_options(x, args, &FftOptions::default())
}

pub fn ifft2_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Ifft2, x, args, options)
}

pub fn rfft2(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    rfft2_with_options(x, args, &FftOptions::default())
}

pub fn rfft2_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Rfft2, x, args, options)
}

pub fn irfft2(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    irfft2_with_options(x, args, &FftOptions::default())
}

pub fn irfft2_with_options(
    x: &Tensor,
    args: &FftArgs,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Irfft2, x, args, options)
}

// ── N-D entrypoints ─────────────────────────────────────────────────

/// N-dimensional forward complex FFT; real input is promoted.
pub fn fftn(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    fftn_with_options(x, args, &FftOptions::default())
}

pub fn fftn_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Fftn, x, args, options)
}

/// N-dimensional inverse complex FFT.
pub fn ifftn(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    ifftn_with_options(x, args, &FftOptions::default())
}

pub fn ifftn_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Ifftn, x, args, options)
}

/// N-dimensional real-input FFT; the last transformed axis is onesided.
pub fn rfftn(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    rfftn_with_options(x, args, &FftOptions::default())
}

pub fn rfftn_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Rfftn, x, args, options)
}

/// N-dimensional inverse of [`rfftn`] producing real output.
pub fn irfftn(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    irfftn_with_options(x, args, &FftOptions::default())
}

pub fn irfftn_with_options(
    x: &Tensor,
    args: &FftArgs,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Irfftn, x, args, options)
}

/// N-dimensional FFT of a Hermitian-symmetric signal, producing real output.
pub fn hfftn(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    hfftn_with_options(x, args, &FftOptions::default())
}

pub fn hfftn_with_options(x: &Tensor, args: &FftArgs, options: &FftOptions) -> FftResult<Tensor> {
    run(TransformKind::Hfftn, x, args, options)
}

/// N-dimensional inverse of [`hfftn`] for real input.
pub fn ihfftn(x: &Tensor, args: &FftArgs) -> FftResult<Tensor> {
    ihfftn_with_options(x, args, &FftOptions::default())
}

pub fn ihfftn_with_options(
    x: &Tensor,
    args: &FftArgs,
    options: &FftOptions,
) -> FftResult<Tensor> {
    run(TransformKind::Ihfftn, x, args, options)
}
