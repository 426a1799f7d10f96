use thiserror::Error;

pub type FftResult<T> = Result<T, FftError>;

/// Failures raised synchronously before any output is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FftError {
    #[error("invalid argument: {detail}")]
    InvalidArgument { detail: String },
    #[error("shape mismatch: {detail}")]
    ShapeMismatch { detail: String },
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("numeric overflow: {detail}")]
    NumericOverflow { detail: String },
    #[error("non-finite input rejected by policy")]
    NonFiniteInput,
}

impl FftError {
    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            detail: detail.into(),
        }
    }

    pub(crate) fn shape(detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            detail: detail.into(),
        }
    }

    pub(crate) fn overflow(detail: impl Into<String>) -> Self {
        Self::NumericOverflow {
            detail: detail.into(),
        }
    }
}
