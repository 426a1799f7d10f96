#![forbid(unsafe_code)]

//! N-dimensional FFT engine for FrankenSpectral.
//!
//! Layers, leaves first:
//! - `kernel`: radix butterflies over `num_complex::Complex<T>`
//! - `engine`: 1-D mixed-radix / Bluestein plans
//! - `nd`: axis passes (c2c, r2c, c2r) over dense tensors
//! - `transforms`: argument resolution, normalization and the public variants
//! - `adjoint`: gradient rules for every variant
//! - `plan`, `helpers`: plan-metadata cache and frequency utilities

pub mod adjoint;
pub mod engine;
pub mod error;
pub mod helpers;
mod kernel;
pub mod nd;
pub mod plan;
pub mod scalar;
pub mod tensor;
pub mod transforms;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use adjoint::FftBackward;
pub use engine::{Fft1dPlan, transform1d};
pub use error::{FftError, FftResult};
pub use helpers::{fftfreq, fftshift, fftshift_1d, ifftshift, ifftshift_1d, rfftfreq};
pub use nd::transform_nd;
pub use plan::{
    CacheAdmissionPolicy, PlanCacheBackend, PlanCacheConfig, PlanFingerprint, PlanKey,
    PlanMetadata, PlanStrategy, PlanningStrategy,
};
pub use scalar::{FftFloat, Precision};
pub use tensor::{DType, DenseArray, Tensor};
pub use transforms::{
    FftArgs, FftOptions, TransformSpec, TransformTrace, WorkerPolicy, fft, fft_with_options,
    fft2, fft2_with_options, fftn, fftn_with_options, forward_with_rule, hfft, hfft_with_options,
    hfftn, hfftn_with_options, ifft, ifft_with_options, ifft2, ifft2_with_options, ifftn,
    ifftn_with_options, ihfft, ihfft_with_options, ihfftn, ihfftn_with_options, irfft,
    irfft_with_options, irfft2, irfft2_with_options, irfftn, irfftn_with_options, rfft,
    rfft_with_options, rfft2, rfft2_with_options, rfftn, rfftn_with_options,
    take_transform_traces,
};

/// Sign of the exponent in `exp(∓2πi·kn/N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Negative exponent.
    Forward,
    /// Positive exponent.
    Inverse,
}

impl Direction {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }

    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Forward => -1.0,
            Self::Inverse => 1.0,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Inverse => "inverse",
        }
    }
}

/// FFT normalization modes.
///
/// The mode names which direction carries the `1/N` factor: `Backward`
/// scales the inverse, `Forward` scales the forward transform and `Ortho`
/// splits it as `1/√N` on both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    Forward,
    #[default]
    Backward,
    Ortho,
}

impl Normalization {
    /// Scale applied to an unnormalized transform of `direction` whose
    /// signal holds `n` samples in total.
    #[must_use]
    pub fn scale(self, n: usize, direction: Direction) -> f64 {
        let n = n as f64;
        match (self, direction) {
            (Self::Ortho, _) => 1.0 / n.sqrt(),
            (Self::Backward, Direction::Forward) | (Self::Forward, Direction::Inverse) => 1.0,
            (Self::Backward, Direction::Inverse) | (Self::Forward, Direction::Forward) => 1.0 / n,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Ortho => "ortho",
        }
    }
}

impl FromStr for Normalization {
    type Err = FftError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "backward" => Ok(Self::Backward),
            "forward" => Ok(Self::Forward),
            "ortho" => Ok(Self::Ortho),
            other => Err(FftError::invalid(format!(
                "unknown normalization {other:?}; expected backward, forward or ortho"
            ))),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Data flow of a variant across its last transformed axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformFamily {
    /// Complex in, complex out.
    ComplexToComplex,
    /// Real in, onesided half spectrum out.
    RealToComplex,
    /// Half spectrum in, real out.
    ComplexToReal,
}

/// Public transform entrypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformKind {
    Fft,
    Ifft,
    Rfft,
    Irfft,
    Hfft,
    Ihfft,
    Fft2,
    Ifft2,
    Rfft2,
    Irfft2,
    Fftn,
    Ifftn,
    Rfftn,
    Irfftn,
    Hfftn,
    Ihfftn,
}

impl TransformKind {
    #[must_use]
    pub const fn family(self) -> TransformFamily {
        match self {
            Self::Fft | Self::Ifft | Self::Fft2 | Self::Ifft2 | Self::Fftn | Self::Ifftn => {
                TransformFamily::ComplexToComplex
            }
            Self::Rfft | Self::Rfft2 | Self::Rfftn | Self::Ihfft | Self::Ihfftn => {
                TransformFamily::RealToComplex
            }
            Self::Irfft | Self::Irfft2 | Self::Irfftn | Self::Hfft | Self::Hfftn => {
                TransformFamily::ComplexToReal
            }
        }
    }

    /// Exponent sign of every 1-D pass the variant runs.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Fft | Self::Fft2 | Self::Fftn | Self::Rfft | Self::Rfft2 | Self::Rfftn => {
                Direction::Forward
            }
            Self::Hfft | Self::Hfftn => Direction::Forward,
            _ => Direction::Inverse,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fft => "fft",
            Self::Ifft => "ifft",
            Self::Rfft => "rfft",
            Self::Irfft => "irfft",
            Self::Hfft => "hfft",
            Self::Ihfft => "ihfft",
            Self::Fft2 => "fft2",
            Self::Ifft2 => "ifft2",
            Self::Rfft2 => "rfft2",
            Self::Irfft2 => "irfft2",
            Self::Fftn => "fftn",
            Self::Ifftn => "ifftn",
            Self::Rfftn => "rfftn",
            Self::Irfftn => "irfftn",
            Self::Hfftn => "hfftn",
            Self::Ihfftn => "ihfftn",
        }
    }
}
