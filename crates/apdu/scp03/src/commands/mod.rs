//! SCP03 command definitions
//!
//! The command set is closed: [`ScpCommand`] tags each kind, and
//! [`encode`]/[`decode`] convert between it and raw APDU bytes.

pub mod external_authenticate;
pub mod initialize_update;
pub mod put_key;

pub use external_authenticate::ExternalAuthenticateCommand;
pub use initialize_update::{InitializeUpdateCommand, InitializeUpdateResponse};
pub use put_key::{KeyComponent, PutKeyCommand, PutKeyResponse};

use derive_more::From;
use scp03_apdu_core::{Bytes, Command};

use crate::{Error, Result, constants::ins};

/// Any command this crate knows how to build
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum ScpCommand {
    /// INITIALIZE UPDATE
    InitializeUpdate(InitializeUpdateCommand),
    /// EXTERNAL AUTHENTICATE
    ExternalAuthenticate(ExternalAuthenticateCommand),
    /// PUT KEY
    PutKey(PutKeyCommand),
}

impl ScpCommand {
    /// Command name, for logging
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InitializeUpdate(_) => "INITIALIZE UPDATE",
            Self::ExternalAuthenticate(_) => "EXTERNAL AUTHENTICATE",
            Self::PutKey(_) => "PUT KEY",
        }
    }

    /// Build the APDU
    pub fn to_command(&self) -> Command {
        match self {
            Self::InitializeUpdate(cmd) => cmd.to_command(),
            Self::ExternalAuthenticate(cmd) => cmd.to_command(),
            Self::PutKey(cmd) => cmd.to_command(),
        }
    }
}

/// Serialize a command to APDU bytes
pub fn encode(command: &ScpCommand) -> Bytes {
    command.to_command().to_bytes()
}

/// Parse APDU bytes back into a command, dispatching on INS
pub fn decode(raw: &[u8]) -> Result<ScpCommand> {
    let command = Command::from_bytes(raw)?;
    match command.instruction() {
        ins::INITIALIZE_UPDATE => InitializeUpdateCommand::from_command(&command).map(Into::into),
        ins::EXTERNAL_AUTHENTICATE => {
            ExternalAuthenticateCommand::from_command(&command).map(Into::into)
        }
        ins::PUT_KEY => PutKeyCommand::from_command(&command).map(Into::into),
        _ => Err(Error::InvalidCommand("unknown instruction")),
    }
}
