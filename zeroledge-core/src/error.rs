//! Error type shared by the proof engine.

use std::io;

/// Errors raised while loading parameters or streaming proof data.
///
/// Cryptographic check failures are *not* errors: the verifier runs every
/// check and reports a verdict per category instead of aborting.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An underlying read or write failed.
    #[error("i/o failure")]
    Io(#[from] io::Error),

    /// A token in one of the textual streams could not be interpreted.
    #[error("malformed {what}: {token:?}")]
    Malformed {
        /// What the token was being read as.
        what: &'static str,
        /// The offending token.
        token: String,
    },

    /// A stream ended in the middle of a record.
    #[error("unexpected end of input while reading {0}")]
    Truncated(&'static str),

    /// The curve parameter file does not describe the built-in curve.
    #[error("curve parameters do not match the built-in curve ({0})")]
    CurveMismatch(&'static str),
}

impl EngineError {
    /// Shorthand for [`EngineError::Malformed`].
    pub fn malformed(what: &'static str, token: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            token: token.into(),
        }
    }
}
