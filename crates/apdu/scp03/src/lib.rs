//! GlobalPlatform SCP03 secure channel
//!
//! This crate implements the host side of Secure Channel Protocol '03':
//!
//! - the SP 800-108 counter-mode KDF with AES-CMAC ([`kdf`])
//! - static and session key sets ([`StaticKeys`], [`SessionKeys`])
//! - counter-driven AES-CBC data encryption ([`encryption`])
//! - C-MAC and R-MAC chaining ([`mac`])
//! - the handshake and secure messaging state machine ([`Session`])
//! - a channel bound to a [`CardTransport`](scp03_apdu_core::CardTransport)
//!   ([`Scp03Channel`])
//!
//! The [`Session`] does no I/O and can be driven by any transport:
//!
//! ```
//! use scp03::{Session, StaticKeys};
//!
//! let mut session = Session::new();
//! let command = session
//!     .build_initialize_update(0x00, &[0x36, 0x0C, 0xB4, 0x3F, 0x43, 0x01, 0xB8, 0x94])
//!     .unwrap();
//! assert_eq!(
//!     hex::encode(command.to_command().to_bytes()),
//!     "8050000008360cb43f4301b894"
//! );
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Used by the scp03-tool binary only
use clap as _;
use tracing_subscriber as _;

pub mod commands;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod encryption;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod mac;
pub mod secure_channel;
pub mod session;

pub use commands::{
    ExternalAuthenticateCommand, InitializeUpdateCommand, InitializeUpdateResponse, PutKeyCommand,
    PutKeyResponse, ScpCommand,
};
pub use config::{ChannelConfig, SecurityLevel};
pub use encryption::Direction;
pub use error::{Error, ErrorKind, Result};
pub use keys::{SessionKeys, StaticKeys};
pub use mac::MacChain;
pub use secure_channel::Scp03Channel;
pub use session::{Session, SessionState};

// Re-export the APDU types used in the public API
pub use scp03_apdu_core::{CardTransport, Command, Response, StatusWord};
