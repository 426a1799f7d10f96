#![forbid(unsafe_code)]

//! Runtime mode definitions for Strict (reference-compatible) and Hardened operation.

use serde::{Deserialize, Serialize};

/// Operational mode governing compatibility/safety trade-offs.
///
/// - **Strict**: Match the reference FFT operators as closely as possible;
///   non-finite samples flow through the transform untouched.
/// - **Hardened**: Rejects non-finite input before any transform work and
///   tightens argument validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuntimeMode {
    #[default]
    Strict,
    Hardened,
}

impl RuntimeMode {
    /// Whether inputs must be checked for NaN/inf before transforming.
    #[must_use]
    pub const fn checks_finite(self) -> bool {
        matches!(self, Self::Hardened)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Hardened => "Hardened",
        }
    }
}
