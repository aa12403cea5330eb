//! Error types for SCP03 operations

use scp03_apdu_core::StatusWord;
use thiserror::Error;

use crate::session::SessionState;

/// Result type for SCP03 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`]
///
/// Lets callers tell a caller bug from an active attack without matching on
/// every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input supplied by the caller or the card
    ArgumentInvalid,
    /// Operation called from the wrong session state
    ProtocolOrder,
    /// Cryptographic check failed
    AuthenticationFailed,
    /// Card answered with an unexpected status word
    Card,
    /// Transport failure
    Transport,
}

/// Error type for SCP03 operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Key is not an AES-128 key
    #[error("Invalid key length: expected 16, got {0}")]
    InvalidKeyLength(usize),

    /// Challenge is not 8 bytes
    #[error("Invalid challenge length: expected 8, got {0}")]
    InvalidChallengeLength(usize),

    /// KDF output length out of range
    #[error("Invalid KDF output length: {0} bits")]
    InvalidOutputLength(u16),

    /// Encryption counter is zero
    #[error("Encryption counter must be positive")]
    InvalidCounter,

    /// Security level is not a valid SCP03 combination
    #[error("Invalid security level: {0:#04x}")]
    InvalidSecurityLevel(u8),

    /// Command APDU does not match the expected layout
    #[error("Invalid command: {0}")]
    InvalidCommand(&'static str),

    /// Malformed card response
    #[error("Invalid response: {0}")]
    InvalidResponse(&'static str),

    /// Card does not speak SCP03
    #[error("Unsupported SCP version: {0:#04x}")]
    UnsupportedScpVersion(u8),

    /// Wrapped command no longer fits a short APDU
    #[error("Command data too long: {0} bytes")]
    DataTooLong(usize),

    /// Operation called from the wrong state
    #[error("{operation} is not valid in state {state}")]
    ProtocolOrder {
        /// Operation that was attempted
        operation: &'static str,
        /// State the session was in
        state: SessionState,
    },

    /// Cryptogram or MAC check failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// Decrypted data carries malformed padding
    #[error("Bad padding in decrypted data")]
    BadPadding,

    /// Card answered with an unexpected status word
    #[error("Card returned error status: {0}")]
    CardStatus(StatusWord),

    /// Transport-related errors
    #[error(transparent)]
    Transport(#[from] scp03_apdu_core::Error),
}

impl Error {
    /// Classify this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyLength(_)
            | Self::InvalidChallengeLength(_)
            | Self::InvalidOutputLength(_)
            | Self::InvalidCounter
            | Self::InvalidSecurityLevel(_)
            | Self::InvalidCommand(_)
            | Self::InvalidResponse(_)
            | Self::UnsupportedScpVersion(_)
            | Self::DataTooLong(_) => ErrorKind::ArgumentInvalid,
            Self::ProtocolOrder { .. } => ErrorKind::ProtocolOrder,
            Self::AuthenticationFailed(_) | Self::BadPadding => ErrorKind::AuthenticationFailed,
            Self::CardStatus(_) => ErrorKind::Card,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// True for failures that indicate tampering or a wrong key
    pub const fn is_security_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::AuthenticationFailed)
    }
}
