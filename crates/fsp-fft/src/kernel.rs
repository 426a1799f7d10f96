//! Radix butterflies for the decimation-in-time mixed-radix recursion.
//!
//! Every butterfly works on `out[u + q * m]` for `q < p`, `u < m`, where
//! `out` holds the `p` already-transformed sub-sequences of length `m`
//! back to back. `twiddles[k] = exp(sign * 2πi * k / N)` for the full
//! length `N` of the plan, and `fstride = N / (p * m)`.
//!
//! ```text
//! s_q          = Y_q[u] * W_N^(q * u * fstride)
//! X[u + r * m] = Σ_q s_q * W_p^(q * r)          W_p = W_N^(m * fstride)
//! ```

use num_complex::Complex;

use crate::scalar::FftFloat;

#[inline]
fn rotate_quarter<T: FftFloat>(value: Complex<T>, inverse: bool) -> Complex<T> {
    // Multiply by -i (forward) or +i (inverse) without touching the twiddle table.
    if inverse {
        Complex::new(-value.im, value.re)
    } else {
        Complex::new(value.im, -value.re)
    }
}

#[inline]
fn times_i<T: FftFloat>(value: Complex<T>) -> Complex<T> {
    Complex::new(-value.im, value.re)
}

pub(crate) fn butterfly2<T: FftFloat>(
    out: &mut [Complex<T>],
    m: usize,
    fstride: usize,
    twiddles: &[Complex<T>],
) {
    for u in 0..m {
        let t = out[u + m] * twiddles[u * fstride];
        let a = out[u];
        out[u] = a + t;
        out[u + m] = a - t;
    }
}

pub(crate) fn butterfly3<T: FftFloat>(
    out: &mut [Complex<T>],
    m: usize,
    fstride: usize,
    twiddles: &[Complex<T>],
) {
    let root = twiddles[m * fstride];
    let half = T::cast_f64(0.5);
    for u in 0..m {
        let s0 = out[u];
        let s1 = out[u + m] * twiddles[u * fstride];
        let s2 = out[u + 2 * m] * twiddles[2 * u * fstride];

        let sum = s1 + s2;
        let diff = times_i(s1 - s2) * root.im;
        let base = s0 - sum * half;

        out[u] = s0 + sum;
        out[u + m] = base + diff;
        out[u + 2 * m] = base - diff;
    }
}

pub(crate) fn butterfly4<T: FftFloat>(
    out: &mut [Complex<T>],
    m: usize,
    fstride: usize,
    twiddles: &[Complex<T>],
    inverse: bool,
) {
    for u in 0..m {
        let s0 = out[u];
        let s1 = out[u + m] * twiddles[u * fstride];
        let s2 = out[u + 2 * m] * twiddles[2 * u * fstride];
        let s3 = out[u + 3 * m] * twiddles[3 * u * fstride];

        let a = s0 + s2;
        let b = s0 - s2;
        let c = s1 + s3;
        let d = rotate_quarter(s1 - s3, inverse);

        out[u] = a + c;
        out[u + m] = b + d;
        out[u + 2 * m] = a - c;
        out[u + 3 * m] = b - d;
    }
}

pub(crate) fn butterfly5<T: FftFloat>(
    out: &mut [Complex<T>],
    m: usize,
    fstride: usize,
    twiddles: &[Complex<T>],
) {
    let w1 = twiddles[m * fstride];
    let w2 = twiddles[2 * m * fstride];
    for u in 0..m {
        let s0 = out[u];
        let s1 = out[u + m] * twiddles[u * fstride];
        let s2 = out[u + 2 * m] * twiddles[2 * u * fstride];
        let s3 = out[u + 3 * m] * twiddles[3 * u * fstride];
        let s4 = out[u + 4 * m] * twiddles[4 * u * fstride];

        let b1 = s1 + s4;
        let b2 = s2 + s3;
        let d1 = s1 - s4;
        let d2 = s2 - s3;

        let outer = s0 + b1 * w1.re + b2 * w2.re;
        let outer_rot = times_i(d1 * w1.im + d2 * w2.im);
        let inner = s0 + b1 * w2.re + b2 * w1.re;
        let inner_rot = times_i(d1 * w2.im - d2 * w1.im);

        out[u] = s0 + b1 + b2;
        out[u + m] = outer + outer_rot;
        out[u + 2 * m] = inner + inner_rot;
        out[u + 3 * m] = inner - inner_rot;
        out[u + 4 * m] = outer - outer_rot;
    }
}

/// Direct radix-`p` butterfly for the remaining small odd primes.
pub(crate) fn butterfly_generic<T: FftFloat>(
    out: &mut [Complex<T>],
    p: usize,
    m: usize,
    fstride: usize,
    twiddles: &[Complex<T>],
    scratch: &mut Vec<Complex<T>>,
) {
    let root_step = m * fstride;
    scratch.clear();
    scratch.resize(p, Complex::new(T::zero(), T::zero()));
    for u in 0..m {
        for (q, slot) in scratch.iter_mut().enumerate() {
            *slot = out[u + q * m] * twiddles[q * u * fstride];
        }
        for r in 0..p {
            let mut acc = scratch[0];
            for (q, &value) in scratch.iter().enumerate().skip(1) {
                acc += value * twiddles[((q * r) % p) * root_step];
            }
            out[u + r * m] = acc;
        }
    }
}
