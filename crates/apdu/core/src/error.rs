//! Error type for APDU framing and transport operations

use crate::response::status::StatusWord;

/// Result type for APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while framing, parsing or transmitting APDUs
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// Raw command bytes do not form a valid short APDU
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Command data does not fit a short APDU
    #[error("Command data too long: {0} bytes")]
    DataTooLong(usize),

    /// Raw response bytes could not be parsed
    #[error("Parse error: {0}")]
    Parse(&'static str),

    /// Card returned an unexpected status word
    #[error("Card returned status {0}")]
    Status(StatusWord),

    /// Transport could not reach the card
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport failed while exchanging bytes
    #[error("Transmission error: {0}")]
    Transmission(String),
}

impl Error {
    /// Create a transmission error from any displayable cause
    pub fn transmission(cause: impl std::fmt::Display) -> Self {
        Self::Transmission(cause.to_string())
    }
}
