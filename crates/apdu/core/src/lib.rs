//! APDU framing for the SCP03 secure channel
//!
//! This crate provides the small set of ISO/IEC 7816-4 types the secure
//! channel wraps and unwraps:
//!
//! - [`Command`]: a short-form command APDU (`CLA INS P1 P2 [Lc data] [Le]`)
//! - [`Response`]: a response body followed by a [`StatusWord`]
//! - [`CardTransport`]: the boundary to whatever moves bytes to the card
//!
//! Device discovery and the transports themselves live outside this crate.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod transport;

pub use command::{Command, MAX_SHORT_DATA_LENGTH};
pub use error::{Error, Result};
pub use response::Response;
pub use response::status::StatusWord;
pub use transport::CardTransport;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::response::status::{StatusWord, common as status};
    pub use crate::{Bytes, BytesMut, CardTransport, Command, Error, Response, Result};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x80, 0x50, 0x00, 0x00);
        assert_eq!(cmd.class(), 0x80);
        assert_eq!(cmd.instruction(), 0x50);

        let resp = Response::success(Bytes::from_static(&[0x01, 0x02]));
        assert!(resp.is_success());
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
