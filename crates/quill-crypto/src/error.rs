//! Error types for the symmetric primitives

use thiserror::Error;

/// Errors from primitive construction and parameter validation.
///
/// Authentication failure is deliberately absent: `open` reports a forged or
/// corrupted message as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key material has the wrong size
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required key length in bytes
        expected: usize,
        /// Supplied key length in bytes
        actual: usize,
    },

    /// Nonce or counter block has an unsupported size
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Human-readable description of the accepted sizes
        expected: &'static str,
        /// Supplied nonce length in bytes
        actual: usize,
    },

    /// Caller-supplied output buffer has the wrong size
    #[error("destination length mismatch: expected {expected}, got {actual}")]
    DestinationLengthMismatch {
        /// Required output length in bytes
        expected: usize,
        /// Supplied output length in bytes
        actual: usize,
    },

    /// HKDF was asked for more output than its 255-block ceiling allows
    #[error("hkdf: cannot expand more: requested {requested}, {available} remaining")]
    ExpansionLimitExceeded {
        /// Bytes requested by this call
        requested: usize,
        /// Bytes still available from this instance
        available: usize,
    },

    /// No cryptographically secure random source could be used
    #[error("random source unavailable: {reason}")]
    RandomSourceUnavailable {
        /// Underlying failure reported by the source
        reason: String,
    },

    /// The hash does not implement the required capability
    #[error("{operation} requires a hash with serializable state")]
    CapabilityUnsupported {
        /// Operation that was refused
        operation: &'static str,
    },

    /// Random-string charset outside the supported size range
    #[error("invalid charset: length {length} is outside 2..=256")]
    InvalidCharset {
        /// Number of characters in the supplied charset
        length: usize,
    },

    /// A saved hash state cannot be produced or applied
    #[error("invalid saved hash state: {reason}")]
    InvalidSavedState {
        /// Why the state was rejected
        reason: &'static str,
    },
}

impl CryptoError {
    /// Returns true if the error stems from a caller mistake.
    ///
    /// Caller errors are raised before any cryptographic work starts and are
    /// fixed by changing the arguments. The remaining errors come from the
    /// environment (an unusable OS random source).
    pub fn is_caller_error(&self) -> bool {
        match self {
            Self::InvalidKeyLength { .. }
            | Self::InvalidNonceLength { .. }
            | Self::DestinationLengthMismatch { .. }
            | Self::ExpansionLimitExceeded { .. }
            | Self::CapabilityUnsupported { .. }
            | Self::InvalidCharset { .. }
            | Self::InvalidSavedState { .. } => true,

            Self::RandomSourceUnavailable { .. } => false,
        }
    }
}
