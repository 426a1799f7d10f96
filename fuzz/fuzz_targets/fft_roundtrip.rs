#![no_main]

use arbitrary::Arbitrary;
use fsp_fft::{Direction, transform1d};
use fsp_runtime::max_relative_error;
use libfuzzer_sys::fuzz_target;
use num_complex::Complex;

#[derive(Debug, Arbitrary)]
struct RoundTripInput {
    len: u16,
    values: Vec<(i16, i16)>,
}

fuzz_target!(|input: RoundTripInput| {
    let len = usize::from(input.len % 512) + 1;
    let mut x = vec![Complex::new(0.0, 0.0); len];
    for (slot, &(re, im)) in x.iter_mut().zip(&input.values) {
        *slot = Complex::new(f64::from(re), f64::from(im));
    }
    let spectrum = transform1d(&x, len, Direction::Forward).expect("forward");
    let back = transform1d(&spectrum, len, Direction::Inverse).expect("inverse");
    let scale = 1.0 / len as f64;
    let actual: Vec<f64> = back.iter().flat_map(|c| [c.re * scale, c.im * scale]).collect();
    let expected: Vec<f64> = x.iter().flat_map(|c| [c.re, c.im]).collect();
    assert!(max_relative_error(&actual, &expected) < 1e-9);
});
