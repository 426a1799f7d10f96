//! Axis passes over dense arrays.
//!
//! Every pass gathers the lanes of one axis into a contiguous buffer
//! (resized to the pass length), transforms each lane and scatters the
//! result back into row-major order. When the axis is innermost and needs
//! no resize the array's own storage is the lane buffer.

use num_complex::Complex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::Direction;
use crate::engine::Fft1dPlan;
use crate::error::{FftError, FftResult};
use crate::scalar::FftFloat;
use crate::tensor::DenseArray;
use crate::transforms::WorkerPolicy;

/// Arrays smaller than this stay on the calling thread under [`WorkerPolicy::Auto`].
pub(crate) const PARALLEL_MIN_ELEMENTS: usize = 1 << 15;

/// Where lane work runs for one call.
#[derive(Debug)]
pub(crate) enum Execution {
    Sequential,
    Global,
    Pool(ThreadPool),
}

impl Execution {
    pub(crate) fn resolve(policy: WorkerPolicy, numel: usize) -> FftResult<Self> {
        let available = rayon::current_num_threads();
        match policy {
            WorkerPolicy::Exact(0) | WorkerPolicy::Max(0) => {
                Err(FftError::invalid("worker count must be at least 1"))
            }
            WorkerPolicy::Auto if numel < PARALLEL_MIN_ELEMENTS || available == 1 => {
                Ok(Self::Sequential)
            }
            WorkerPolicy::Auto => Ok(Self::Global),
            WorkerPolicy::Exact(1) | WorkerPolicy::Max(1) => Ok(Self::Sequential),
            WorkerPolicy::Exact(threads) => Self::pool(threads),
            WorkerPolicy::Max(limit) => match limit.min(available) {
                0 | 1 => Ok(Self::Sequential),
                threads => Self::pool(threads),
            },
        }
    }

    fn pool(threads: usize) -> FftResult<Self> {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map(Self::Pool)
            .map_err(|err| FftError::invalid(format!("cannot start {threads} workers: {err}")))
    }

    /// Worker threads lane work may occupy.
    pub(crate) fn width(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Global => rayon::current_num_threads(),
            Self::Pool(pool) => pool.current_num_threads(),
        }
    }
}

fn for_each_lane<E, S, I, F>(exec: &Execution, buffer: &mut [E], lane_len: usize, init: I, op: F)
where
    E: Send,
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, &mut [E]) + Sync + Send,
{
    match exec {
        Execution::Sequential => {
            let mut state = init();
            for lane in buffer.chunks_mut(lane_len) {
                op(&mut state, lane);
            }
        }
        Execution::Global => buffer
            .par_chunks_mut(lane_len)
            .for_each_init(&init, |state, lane| op(state, lane)),
        Execution::Pool(pool) => pool.install(|| {
            buffer
                .par_chunks_mut(lane_len)
                .for_each_init(&init, |state, lane| op(state, lane));
        }),
    }
}

fn for_each_zipped<A, B, S, I, F>(
    exec: &Execution,
    src: &[A],
    src_chunk: usize,
    dst: &mut [B],
    dst_chunk: usize,
    init: I,
    op: F,
) where
    A: Sync,
    B: Send,
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, &[A], &mut [B]) + Sync + Send,
{
    match exec {
        Execution::Sequential => {
            let mut state = init();
            for (input, output) in src.chunks(src_chunk).zip(dst.chunks_mut(dst_chunk)) {
                op(&mut state, input, output);
            }
        }
        Execution::Global => src
            .par_chunks(src_chunk)
            .zip(dst.par_chunks_mut(dst_chunk))
            .for_each_init(&init, |state, (input, output)| op(state, input, output)),
        Execution::Pool(pool) => pool.install(|| {
            src.par_chunks(src_chunk)
                .zip(dst.par_chunks_mut(dst_chunk))
                .for_each_init(&init, |state, (input, output)| op(state, input, output));
        }),
    }
}

/// Lanes of one axis: `outer` blocks of `len` rows, each row `inner` wide.
#[derive(Debug, Clone, Copy)]
struct LaneLayout {
    outer: usize,
    len: usize,
    inner: usize,
}

impl LaneLayout {
    fn new(shape: &[usize], axis: usize) -> Self {
        Self {
            outer: shape[..axis].iter().product(),
            len: shape[axis],
            inner: shape[axis + 1..].iter().product(),
        }
    }

    fn lanes(self) -> usize {
        self.outer * self.inner
    }

    fn with_len(self, len: usize) -> Self {
        Self { len, ..self }
    }
}

/// Copy every lane into a contiguous buffer of `lane_len` slots, truncating
/// or padding with `fill` at the tail.
fn gather<E: Copy>(data: &[E], layout: LaneLayout, lane_len: usize, fill: E) -> Vec<E> {
    let LaneLayout { outer, len, inner } = layout;
    let copy = len.min(lane_len);
    let mut lanes = vec![fill; layout.lanes() * lane_len];
    if inner == 1 {
        for (lane, dst) in lanes.chunks_mut(lane_len).enumerate() {
            let start = lane * len;
            dst[..copy].copy_from_slice(&data[start..start + copy]);
        }
        return lanes;
    }
    for o in 0..outer {
        let base = o * len * inner;
        for j in 0..copy {
            let row = &data[base + j * inner..base + (j + 1) * inner];
            for (i, &value) in row.iter().enumerate() {
                lanes[(o * inner + i) * lane_len + j] = value;
            }
        }
    }
    lanes
}

/// Inverse of [`gather`]: keep the first `layout.len` slots of every lane.
fn scatter<E: Copy>(lanes: Vec<E>, lane_len: usize, layout: LaneLayout) -> Vec<E> {
    let LaneLayout { outer, len, inner } = layout;
    if inner == 1 && len == lane_len {
        return lanes;
    }
    let mut data = Vec::with_capacity(outer * len * inner);
    if inner == 1 {
        for lane in lanes.chunks(lane_len) {
            data.extend_from_slice(&lane[..len]);
        }
        return data;
    }
    for o in 0..outer {
        for j in 0..len {
            data.extend((0..inner).map(|i| lanes[(o * inner + i) * lane_len + j]));
        }
    }
    data
}

/// Resize `axis` to `new_len`, truncating or padding with `fill` at the tail.
pub(crate) fn resize_axis<E: Copy>(
    array: DenseArray<E>,
    axis: usize,
    new_len: usize,
    fill: E,
) -> DenseArray<E> {
    let mut shape = array.shape().to_vec();
    let LaneLayout { outer, len, inner } = LaneLayout::new(&shape, axis);
    if len == new_len {
        return array;
    }
    let copy = len.min(new_len);
    let data = array.data();
    let mut out = Vec::with_capacity(outer * new_len * inner);
    for o in 0..outer {
        let base = o * len * inner;
        out.extend_from_slice(&data[base..base + copy * inner]);
        out.resize(out.len() + (new_len - copy) * inner, fill);
    }
    shape[axis] = new_len;
    DenseArray::from_parts(shape, out)
}

/// Circularly shift `axis` so that element `j` moves to `(j + shift) % len`.
pub(crate) fn roll_axis<E: Copy>(array: &DenseArray<E>, axis: usize, shift: usize) -> DenseArray<E> {
    let LaneLayout { outer, len, inner } = LaneLayout::new(array.shape(), axis);
    let shift = shift % len;
    let data = array.data();
    let mut out = Vec::with_capacity(data.len());
    for o in 0..outer {
        let base = o * len * inner;
        for j in 0..len {
            let src = (j + len - shift) % len;
            out.extend_from_slice(&data[base + src * inner..base + (src + 1) * inner]);
        }
    }
    DenseArray::from_parts(array.shape().to_vec(), out)
}

/// Resolve possibly negative axes against `rank`, rejecting duplicates.
pub(crate) fn normalize_axes(dims: &[i64], rank: usize) -> FftResult<Vec<usize>> {
    let signed_rank = rank as i64;
    let mut axes = Vec::with_capacity(dims.len());
    for &dim in dims {
        if dim < -signed_rank || dim >= signed_rank {
            return Err(FftError::invalid(format!(
                "axis {dim} is out of range for a rank-{rank} tensor"
            )));
        }
        let axis = dim.rem_euclid(signed_rank) as usize;
        if axes.contains(&axis) {
            return Err(FftError::invalid(format!("axis {dim} appears more than once")));
        }
        axes.push(axis);
    }
    Ok(axes)
}

/// Unnormalized complex transform of `axis`, resized to `n`.
pub(crate) fn c2c_axis<T: FftFloat>(
    array: DenseArray<Complex<T>>,
    axis: usize,
    n: usize,
    direction: Direction,
    exec: &Execution,
) -> FftResult<DenseArray<Complex<T>>> {
    let plan = Fft1dPlan::<T>::new(n, direction)?;
    let mut shape = array.shape().to_vec();
    let layout = LaneLayout::new(&shape, axis);
    let mut lanes = if layout.inner == 1 && layout.len == n {
        array.into_data()
    } else {
        gather(array.data(), layout, n, Complex::new(T::zero(), T::zero()))
    };
    for_each_lane(exec, &mut lanes, n, Vec::new, |scratch, lane| {
        plan.process_with_scratch(lane, scratch);
    });
    shape[axis] = n;
    Ok(DenseArray::from_parts(shape, scatter(lanes, n, layout.with_len(n))))
}

pub(crate) fn c2c_axes<T: FftFloat>(
    array: DenseArray<Complex<T>>,
    axes: &[usize],
    lengths: &[usize],
    direction: Direction,
    exec: &Execution,
) -> FftResult<DenseArray<Complex<T>>> {
    axes.iter()
        .zip(lengths)
        .try_fold(array, |acc, (&axis, &n)| c2c_axis(acc, axis, n, direction, exec))
}

/// Split `z = DFT(a + ib)` of two real lanes into their onesided spectra.
fn unpack_real_pair<T: FftFloat>(z: &[Complex<T>], output: &mut [Complex<T>], half: usize) {
    let n = z.len();
    let one_half = T::cast_f64(0.5);
    let (first, second) = output.split_at_mut(half);
    for k in 0..half {
        let zk = z[k];
        let mirror = z[(n - k) % n].conj();
        first[k] = (zk + mirror) * one_half;
        if let Some(slot) = second.get_mut(k) {
            let diff = zk - mirror;
            *slot = Complex::new(diff.im, -diff.re) * one_half;
        }
    }
}

/// Unnormalized onesided transform of real `axis`, resized to `n`; the
/// axis comes out `n / 2 + 1` long. Lanes are transformed in pairs packed
/// as the real and imaginary parts of one complex lane.
pub(crate) fn r2c_axis<T: FftFloat>(
    array: &DenseArray<T>,
    axis: usize,
    n: usize,
    direction: Direction,
    exec: &Execution,
) -> FftResult<DenseArray<Complex<T>>> {
    let plan = Fft1dPlan::<T>::new(n, direction)?;
    let half = n / 2 + 1;
    let mut shape = array.shape().to_vec();
    let layout = LaneLayout::new(&shape, axis);
    let real = gather(array.data(), layout, n, T::zero());
    let zero = Complex::new(T::zero(), T::zero());
    let mut spectra = vec![zero; layout.lanes() * half];

    for_each_zipped(
        exec,
        &real,
        2 * n,
        &mut spectra,
        2 * half,
        || (Vec::with_capacity(n), Vec::new()),
        |(packed, scratch), input, output| {
            let (a, b) = input.split_at(n);
            packed.clear();
            if b.is_empty() {
                packed.extend(a.iter().map(|&re| Complex::new(re, T::zero())));
            } else {
                packed.extend(a.iter().zip(b).map(|(&re, &im)| Complex::new(re, im)));
            }
            plan.process_with_scratch(packed, scratch);
            unpack_real_pair(packed, output, half);
        },
    );

    shape[axis] = half;
    Ok(DenseArray::from_parts(shape, scatter(spectra, half, layout.with_len(half))))
}

/// Add `factor * H(half)` to `full`, where `H` rebuilds the Hermitian
/// spectrum of a real lane. Self-conjugate bins keep only their real part.
fn add_hermitian<T: FftFloat>(full: &mut [Complex<T>], half: &[Complex<T>], factor: Complex<T>) {
    let n = full.len();
    for (k, &value) in half.iter().enumerate() {
        if k == 0 || 2 * k == n {
            full[k] += Complex::new(value.re, T::zero()) * factor;
        } else {
            full[k] += value * factor;
            full[n - k] += value.conj() * factor;
        }
    }
}

/// Unnormalized transform of a onesided spectrum along `axis` to a real
/// lane of length `n`. Input lanes are resized to `n / 2 + 1` first.
pub(crate) fn c2r_axis<T: FftFloat>(
    array: &DenseArray<Complex<T>>,
    axis: usize,
    n: usize,
    direction: Direction,
    exec: &Execution,
) -> FftResult<DenseArray<T>> {
    let plan = Fft1dPlan::<T>::new(n, direction)?;
    let half = n / 2 + 1;
    let mut shape = array.shape().to_vec();
    let layout = LaneLayout::new(&shape, axis);
    let zero = Complex::new(T::zero(), T::zero());
    let spectra = gather(array.data(), layout, half, zero);
    let mut real = vec![T::zero(); layout.lanes() * n];

    for_each_zipped(
        exec,
        &spectra,
        2 * half,
        &mut real,
        2 * n,
        || (Vec::with_capacity(n), Vec::new()),
        |(full, scratch), input, output| {
            let (a, b) = input.split_at(half);
            full.clear();
            full.resize(n, zero);
            add_hermitian(full, a, Complex::new(T::one(), T::zero()));
            if !b.is_empty() {
                add_hermitian(full, b, Complex::new(T::zero(), T::one()));
            }
            plan.process_with_scratch(full, scratch);
            let (out_a, out_b) = output.split_at_mut(n);
            for (slot, value) in out_a.iter_mut().zip(full.iter()) {
                *slot = value.re;
            }
            for (slot, value) in out_b.iter_mut().zip(full.iter()) {
                *slot = value.im;
            }
        },
    );

    shape[axis] = n;
    Ok(DenseArray::from_parts(shape, scatter(real, n, layout.with_len(n))))
}

/// Unnormalized complex transform over `axes`, each resized to its entry
/// in `out_lengths` (`None` keeps the input length). Empty `axes` copies
/// the input unchanged.
pub fn transform_nd<T: FftFloat>(
    x: &DenseArray<Complex<T>>,
    axes: &[i64],
    out_lengths: &[Option<usize>],
    direction: Direction,
) -> FftResult<DenseArray<Complex<T>>> {
    let axes = normalize_axes(axes, x.rank())?;
    if out_lengths.len() != axes.len() {
        return Err(FftError::invalid(format!(
            "{} output lengths given for {} axes",
            out_lengths.len(),
            axes.len()
        )));
    }
    let lengths = axes
        .iter()
        .zip(out_lengths)
        .map(|(&axis, len)| match *len {
            Some(0) => Err(FftError::invalid("output length must be at least 1")),
            Some(n) => Ok(n),
            None => Ok(x.shape()[axis]),
        })
        .collect::<FftResult<Vec<_>>>()?;
    let exec = Execution::resolve(WorkerPolicy::Auto, x.len())?;
    c2c_axes(x.clone(), &axes, &lengths, direction, &exec)
}

#[cfg(test)]
mod tests {
    use num_complex::Complex;

    use super::{
        Execution, c2c_axis, c2r_axis, normalize_axes, r2c_axis, resize_axis, roll_axis,
        transform_nd,
    };
    use crate::Direction;
    use crate::engine::transform1d;
    use crate::error::FftError;
    use crate::tensor::DenseArray;
    use crate::transforms::WorkerPolicy;

    fn complex_grid(shape: &[usize]) -> DenseArray<Complex<f64>> {
        let len = shape.iter().product::<usize>();
        let data = (0..len)
            .map(|i| Complex::new((i as f64 * 0.61).sin(), (i as f64 * 0.23).cos() - 0.4))
            .collect();
        DenseArray::from_vec(shape.to_vec(), data).expect("grid")
    }

    fn real_grid(shape: &[usize]) -> DenseArray<f64> {
        complex_grid(shape).map(|c| c.re + c.im)
    }

    fn assert_close(actual: &[Complex<f64>], expected: &[Complex<f64>]) {
        assert_eq!(actual.len(), expected.len());
        for (idx, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).norm() < 1e-10, "element {idx}: {a} vs {e}");
        }
    }

    #[test]
    fn middle_axis_pass_matches_per_lane_transform() {
        let x = complex_grid(&[2, 5, 3]);
        let y = c2c_axis(x.clone(), 1, 6, Direction::Forward, &Execution::Sequential)
            .expect("pass");
        assert_eq!(y.shape(), &[2, 6, 3]);
        for o in 0..2 {
            for i in 0..3 {
                let lane: Vec<_> = (0..5).map(|j| *x.get(&[o, j, i]).expect("in")).collect();
                let expected = transform1d(&lane, 6, Direction::Forward).expect("1d");
                let actual: Vec<_> = (0..6).map(|k| *y.get(&[o, k, i]).expect("out")).collect();
                assert_close(&actual, &expected);
            }
        }
    }

    #[test]
    fn real_pass_matches_complex_pass_for_odd_lane_counts() {
        let x = real_grid(&[3, 10]);
        let half = r2c_axis(&x, 1, 10, Direction::Forward, &Execution::Sequential).expect("r2c");
        let full = c2c_axis(
            x.map(|&re| Complex::new(re, 0.0)),
            1,
            10,
            Direction::Forward,
            &Execution::Sequential,
        )
        .expect("c2c");
        assert_eq!(half.shape(), &[3, 6]);
        for lane in 0..3 {
            for k in 0..6 {
                let a = half.get(&[lane, k]).expect("half");
                let b = full.get(&[lane, k]).expect("full");
                assert!((a - b).norm() < 1e-12, "lane {lane} bin {k}");
            }
        }
    }

    #[test]
    fn complex_to_real_inverts_real_to_complex() {
        for n in [7, 8] {
            let x = real_grid(&[4, n]);
            let half =
                r2c_axis(&x, 0, 4, Direction::Forward, &Execution::Sequential).expect("r2c");
            let back =
                c2r_axis(&half, 0, 4, Direction::Inverse, &Execution::Sequential).expect("c2r");
            for (a, b) in back.data().iter().zip(x.data()) {
                assert!((a / 4.0 - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn pooled_execution_is_bit_identical() {
        let x = complex_grid(&[16, 24]);
        let sequential =
            c2c_axis(x.clone(), 0, 16, Direction::Inverse, &Execution::Sequential).expect("seq");
        let pool = Execution::resolve(WorkerPolicy::Exact(3), x.len()).expect("pool");
        let pooled = c2c_axis(x, 0, 16, Direction::Inverse, &pool).expect("pooled");
        assert_eq!(sequential, pooled);
    }

    #[test]
    fn zero_workers_are_rejected() {
        for policy in [WorkerPolicy::Exact(0), WorkerPolicy::Max(0)] {
            let err = Execution::resolve(policy, 8).expect_err("zero workers");
            assert!(matches!(err, FftError::InvalidArgument { .. }));
        }
    }

    #[test]
    fn empty_axes_copy_the_input() {
        let x = complex_grid(&[3, 4]);
        let y = transform_nd(&x, &[], &[], Direction::Forward).expect("identity");
        assert_eq!(x, y);
    }

    #[test]
    fn axis_validation() {
        assert_eq!(normalize_axes(&[-1, 0], 3).expect("valid"), vec![2, 0]);
        assert!(matches!(
            normalize_axes(&[3], 3),
            Err(FftError::InvalidArgument { .. })
        ));
        assert!(matches!(
            normalize_axes(&[1, -2], 3),
            Err(FftError::InvalidArgument { .. })
        ));
        let x = complex_grid(&[2, 2]);
        assert!(transform_nd(&x, &[0], &[Some(0)], Direction::Forward).is_err());
        assert!(transform_nd(&x, &[0, 1], &[None], Direction::Forward).is_err());
    }

    #[test]
    fn resize_and_roll_work_on_inner_blocks() {
        let x = DenseArray::from_vec(vec![2, 3], vec![1, 2, 3, 4, 5, 6]).expect("grid");
        let padded = resize_axis(x.clone(), 0, 3, 0);
        assert_eq!(padded.data(), &[1, 2, 3, 4, 5, 6, 0, 0, 0]);
        let truncated = resize_axis(x.clone(), 1, 2, 0);
        assert_eq!(truncated.data(), &[1, 2, 4, 5]);
        let rolled = roll_axis(&x, 1, 1);
        assert_eq!(rolled.data(), &[3, 1, 2, 6, 4, 5]);
    }
}
