//! EXTERNAL AUTHENTICATE command
//!
//! Authenticates the host to the card and fixes the security level for the
//! rest of the session. Always sent with a C-MAC.

use bytes::{BufMut, BytesMut};
use scp03_apdu_core::Command;

use crate::{
    Error, Result,
    config::SecurityLevel,
    constants::{CRYPTOGRAM_LENGTH, MAC_LENGTH, cla, ins},
};

/// Length of the protected data field: host cryptogram plus C-MAC
const DATA_LENGTH: usize = CRYPTOGRAM_LENGTH + MAC_LENGTH;

/// EXTERNAL AUTHENTICATE command with its C-MAC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalAuthenticateCommand {
    /// Requested security level, sent in P1
    pub security_level: SecurityLevel,
    /// Host cryptogram
    pub host_cryptogram: [u8; CRYPTOGRAM_LENGTH],
    /// Truncated C-MAC
    pub mac: [u8; MAC_LENGTH],
}

impl ExternalAuthenticateCommand {
    /// Bytes covered by the C-MAC: `84 82 <level> 00 10 <host cryptogram>`
    pub fn mac_input(
        security_level: SecurityLevel,
        host_cryptogram: &[u8; CRYPTOGRAM_LENGTH],
    ) -> BytesMut {
        let mut buf = BytesMut::with_capacity(5 + CRYPTOGRAM_LENGTH);
        buf.put_u8(cla::MAC);
        buf.put_u8(ins::EXTERNAL_AUTHENTICATE);
        buf.put_u8(security_level.bits());
        buf.put_u8(0x00);
        buf.put_u8(DATA_LENGTH as u8);
        buf.put_slice(host_cryptogram);
        buf
    }

    /// Build the APDU: `84 82 <level> 00 10 <host cryptogram> <mac>`
    pub fn to_command(&self) -> Command {
        let mut data = BytesMut::with_capacity(DATA_LENGTH);
        data.put_slice(&self.host_cryptogram);
        data.put_slice(&self.mac);

        Command::new(
            cla::MAC,
            ins::EXTERNAL_AUTHENTICATE,
            self.security_level.bits(),
            0x00,
        )
        .with_data(data.freeze())
    }

    /// Recover the command from an APDU
    pub fn from_command(command: &Command) -> Result<Self> {
        if command.class() != cla::MAC || command.instruction() != ins::EXTERNAL_AUTHENTICATE {
            return Err(Error::InvalidCommand("not an EXTERNAL AUTHENTICATE command"));
        }
        let (host_cryptogram, mac) = command
            .data()
            .split_first_chunk::<CRYPTOGRAM_LENGTH>()
            .ok_or(Error::InvalidCommand("EXTERNAL AUTHENTICATE data too short"))?;
        let mac = mac
            .try_into()
            .map_err(|_| Error::InvalidCommand("EXTERNAL AUTHENTICATE data must be 16 bytes"))?;

        Ok(Self {
            security_level: SecurityLevel::new(command.p1())?,
            host_cryptogram: *host_cryptogram,
            mac,
        })
    }
}
