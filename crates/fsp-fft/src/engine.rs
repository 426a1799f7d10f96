//! 1-D FFT engine: mixed-radix Cooley-Tukey with a Bluestein fallback.

use num_complex::Complex;

use crate::Direction;
use crate::error::{FftError, FftResult};
use crate::kernel::{butterfly_generic, butterfly2, butterfly3, butterfly4, butterfly5};
use crate::plan::{
    PlanFingerprint, PlanStrategy, estimate_fingerprint, radix_path, select_strategy,
};
use crate::scalar::{FftFloat, unit_root};

#[derive(Debug, Clone)]
struct MixedRadix<T> {
    len: usize,
    inverse: bool,
    factors: Vec<usize>,
    twiddles: Vec<Complex<T>>,
}

impl<T: FftFloat> MixedRadix<T> {
    fn new(len: usize, direction: Direction) -> Self {
        let sign = direction.sign();
        Self {
            len,
            inverse: direction == Direction::Inverse,
            factors: radix_path(len),
            twiddles: (0..len).map(|k| unit_root(k, len, sign)).collect(),
        }
    }

    fn process(&self, data: &mut [Complex<T>], scratch: &mut Vec<Complex<T>>) {
        scratch.clear();
        scratch.extend_from_slice(data);
        let mut radix_scratch = Vec::new();
        self.recurse(data, scratch, 0, 1, &self.factors, 1, &mut radix_scratch);
    }

    #[allow(clippy::too_many_arguments)]
    fn recurse(
        &self,
        out: &mut [Complex<T>],
        input: &[Complex<T>],
        offset: usize,
        stride: usize,
        factors: &[usize],
        fstride: usize,
        radix_scratch: &mut Vec<Complex<T>>,
    ) {
        let p = factors[0];
        let m = out.len() / p;
        if m == 1 {
            for (q, slot) in out.iter_mut().enumerate() {
                *slot = input[offset + q * stride];
            }
        } else {
            for (q, chunk) in out.chunks_mut(m).enumerate() {
                self.recurse(
                    chunk,
                    input,
                    offset + q * stride,
                    stride * p,
                    &factors[1..],
                    fstride * p,
                    radix_scratch,
                );
            }
        }

        match p {
            2 => butterfly2(out, m, fstride, &self.twiddles),
            3 => butterfly3(out, m, fstride, &self.twiddles),
            4 => butterfly4(out, m, fstride, &self.twiddles, self.inverse),
            5 => butterfly5(out, m, fstride, &self.twiddles),
            _ => butterfly_generic(out, p, m, fstride, &self.twiddles, radix_scratch),
        }
    }
}

#[derive(Debug, Clone)]
struct Bluestein<T> {
    len: usize,
    chirp: Vec<Complex<T>>,
    /// FFT of the conjugate chirp kernel, pre-scaled by `1 / conv_len`.
    kernel_spectrum: Vec<Complex<T>>,
    forward: MixedRadix<T>,
    inverse: MixedRadix<T>,
}

impl<T: FftFloat> Bluestein<T> {
    fn new(len: usize, direction: Direction) -> FftResult<Self> {
        let conv_len = len
            .checked_mul(2)
            .and_then(|twice| (twice - 1).checked_next_power_of_two())
            .ok_or_else(|| FftError::overflow(format!("bluestein size for length {len}")))?;

        let sign = direction.sign();
        let modulus = 2 * len as u128;
        let chirp: Vec<Complex<T>> = (0..len)
            .map(|k| {
                // k^2 mod 2N keeps the chirp angle small and exact.
                let phase = ((k as u128 * k as u128) % modulus) as f64;
                let angle = sign * std::f64::consts::PI * phase / len as f64;
                Complex::new(T::cast_f64(angle.cos()), T::cast_f64(angle.sin()))
            })
            .collect();

        let zero = Complex::new(T::zero(), T::zero());
        let mut kernel = vec![zero; conv_len];
        kernel[0] = chirp[0].conj();
        for k in 1..len {
            kernel[k] = chirp[k].conj();
            kernel[conv_len - k] = chirp[k].conj();
        }

        let forward = MixedRadix::new(conv_len, Direction::Forward);
        let inverse = MixedRadix::new(conv_len, Direction::Inverse);
        let mut scratch = Vec::with_capacity(conv_len);
        forward.process(&mut kernel, &mut scratch);
        let scale = T::cast_f64(1.0 / conv_len as f64);
        for value in &mut kernel {
            *value = *value * scale;
        }

        Ok(Self {
            len,
            chirp,
            kernel_spectrum: kernel,
            forward,
            inverse,
        })
    }

    fn conv_len(&self) -> usize {
        self.kernel_spectrum.len()
    }

    fn process(&self, data: &mut [Complex<T>], scratch: &mut Vec<Complex<T>>) {
        let zero = Complex::new(T::zero(), T::zero());
        let mut work = vec![zero; self.conv_len()];
        for ((slot, &x), &w) in work.iter_mut().zip(data.iter()).zip(&self.chirp) {
            *slot = x * w;
        }
        self.forward.process(&mut work, scratch);
        for (slot, &k) in work.iter_mut().zip(&self.kernel_spectrum) {
            *slot = *slot * k;
        }
        self.inverse.process(&mut work, scratch);
        for ((out, &conv), &w) in data.iter_mut().zip(&work).zip(&self.chirp) {
            *out = conv * w;
        }
        debug_assert_eq!(data.len(), self.len);
    }
}

#[derive(Debug, Clone)]
enum Algorithm<T> {
    Identity,
    MixedRadix(MixedRadix<T>),
    Bluestein(Box<Bluestein<T>>),
}

/// Reusable unnormalized 1-D transform of one fixed length and direction.
#[derive(Debug, Clone)]
pub struct Fft1dPlan<T> {
    len: usize,
    direction: Direction,
    algorithm: Algorithm<T>,
}

impl<T: FftFloat> Fft1dPlan<T> {
    pub fn new(len: usize, direction: Direction) -> FftResult<Self> {
        if len == 0 {
            return Err(FftError::invalid("transform length must be at least 1"));
        }
        if len as u64 > T::MAX_EXACT_LEN {
            return Err(FftError::overflow(format!(
                "length {len} exceeds {} for {:?} precision",
                T::MAX_EXACT_LEN,
                T::PRECISION
            )));
        }

        let algorithm = match select_strategy(len) {
            PlanStrategy::Identity => Algorithm::Identity,
            PlanStrategy::MixedRadix => Algorithm::MixedRadix(MixedRadix::new(len, direction)),
            PlanStrategy::Bluestein => {
                Algorithm::Bluestein(Box::new(Bluestein::new(len, direction)?))
            }
        };
        Ok(Self {
            len,
            direction,
            algorithm,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn strategy(&self) -> PlanStrategy {
        match self.algorithm {
            Algorithm::Identity => PlanStrategy::Identity,
            Algorithm::MixedRadix(_) => PlanStrategy::MixedRadix,
            Algorithm::Bluestein(_) => PlanStrategy::Bluestein,
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> PlanFingerprint {
        estimate_fingerprint(self.len, T::PRECISION)
    }

    /// Transform `data` in place. `data.len()` must equal the plan length.
    pub fn process(&self, data: &mut [Complex<T>]) {
        let mut scratch = Vec::new();
        self.process_with_scratch(data, &mut scratch);
    }

    pub fn process_with_scratch(&self, data: &mut [Complex<T>], scratch: &mut Vec<Complex<T>>) {
        debug_assert_eq!(data.len(), self.len, "plan length mismatch");
        match &self.algorithm {
            Algorithm::Identity => {}
            Algorithm::MixedRadix(plan) => plan.process(data, scratch),
            Algorithm::Bluestein(plan) => plan.process(data, scratch),
        }
    }
}

/// Resize `input` to `len` by zero-padding or truncating the tail.
pub fn resize_tail<T: FftFloat>(input: &[Complex<T>], len: usize) -> Vec<Complex<T>> {
    let mut out = Vec::with_capacity(len);
    out.extend(input.iter().take(len).copied());
    out.resize(len, Complex::new(T::zero(), T::zero()));
    out
}

/// Unnormalized DFT of `x` resized to `n_out`.
pub fn transform1d<T: FftFloat>(
    x: &[Complex<T>],
    n_out: usize,
    direction: Direction,
) -> FftResult<Vec<Complex<T>>> {
    let plan = Fft1dPlan::new(n_out, direction)?;
    let mut data = resize_tail(x, n_out);
    plan.process(&mut data);
    Ok(data)
}
