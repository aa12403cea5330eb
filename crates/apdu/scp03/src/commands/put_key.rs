//! PUT KEY command
//!
//! Replaces or adds a full SCP03 key set (ENC, MAC, DEK). Each key is
//! encrypted under the current data encryption key and accompanied by its
//! key check value so the card can confirm what it stored.

use bytes::{BufMut, BytesMut};
use scp03_apdu_core::Command;

use crate::{
    Error, Result,
    constants::{KEY_LENGTH, cla, ins, put_key},
    crypto::{AesKey, KeyCheckValue, encrypt_block, key_check_value},
    keys::StaticKeys,
};

/// Encoded length of one key component in the data field
const COMPONENT_LENGTH: usize = 1 + 1 + 1 + KEY_LENGTH + 1 + put_key::KCV_LENGTH as usize;

/// Length of the PUT KEY response body: key version plus three check values
const RESPONSE_LENGTH: usize = 1 + 3 * put_key::KCV_LENGTH as usize;

/// One key of the set, as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyComponent {
    /// Key encrypted under the data encryption key
    pub encrypted_key: AesKey,
    /// Check value of the clear key
    pub check_value: KeyCheckValue,
}

impl KeyComponent {
    /// Encrypt `key` under `dek`
    ///
    /// AES-CBC with a zero ICV over a single block, which is one ECB block.
    pub fn new(key: &AesKey, dek: &AesKey) -> Self {
        Self {
            encrypted_key: encrypt_block(dek, key),
            check_value: key_check_value(key),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(put_key::KEY_TYPE_AES);
        buf.put_u8(put_key::AES_COMPONENT_LENGTH);
        buf.put_u8(KEY_LENGTH as u8);
        buf.put_slice(&self.encrypted_key);
        buf.put_u8(put_key::KCV_LENGTH);
        buf.put_slice(&self.check_value);
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let [
            put_key::KEY_TYPE_AES,
            put_key::AES_COMPONENT_LENGTH,
            length,
            rest @ ..,
        ] = data
        else {
            return Err(Error::InvalidCommand("PUT KEY component is not an AES key"));
        };
        if usize::from(*length) != KEY_LENGTH {
            return Err(Error::InvalidCommand("PUT KEY component has wrong key length"));
        }
        let (encrypted_key, rest) = rest
            .split_first_chunk::<KEY_LENGTH>()
            .ok_or(Error::InvalidCommand("PUT KEY component truncated"))?;
        let [put_key::KCV_LENGTH, a, b, c] = rest else {
            return Err(Error::InvalidCommand("PUT KEY check value malformed"));
        };

        Ok(Self {
            encrypted_key: *encrypted_key,
            check_value: [*a, *b, *c],
        })
    }
}

/// PUT KEY command carrying a complete key set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutKeyCommand {
    /// Version of the key set being replaced, `0` to add a new set
    pub current_key_version: u8,
    /// Version of the new key set
    pub new_key_version: u8,
    /// ENC, MAC and DEK components, in that order
    pub components: [KeyComponent; 3],
}

impl PutKeyCommand {
    /// Protect `new_keys` with `dek` for loading under `current_key_version`
    pub fn new(current_key_version: u8, new_keys: &StaticKeys, dek: &AesKey) -> Self {
        Self {
            current_key_version,
            new_key_version: new_keys.key_version_number(),
            components: [
                KeyComponent::new(new_keys.channel_encryption_key(), dek),
                KeyComponent::new(new_keys.channel_mac_key(), dek),
                KeyComponent::new(new_keys.data_encryption_key(), dek),
            ],
        }
    }

    /// Check values the card is expected to echo back
    pub fn check_values(&self) -> [KeyCheckValue; 3] {
        self.components.map(|component| component.check_value)
    }

    /// Build the APDU
    pub fn to_command(&self) -> Command {
        let mut data = BytesMut::with_capacity(1 + 3 * COMPONENT_LENGTH);
        data.put_u8(self.new_key_version);
        for component in &self.components {
            component.encode(&mut data);
        }

        Command::new(
            cla::GP,
            ins::PUT_KEY,
            self.current_key_version,
            put_key::P2_KEY_SET,
        )
        .with_data(data.freeze())
        .with_le(0x00)
    }

    /// Recover the command from an APDU
    pub fn from_command(command: &Command) -> Result<Self> {
        if command.class() & !cla::SECURE_MESSAGING != cla::GP
            || command.instruction() != ins::PUT_KEY
        {
            return Err(Error::InvalidCommand("not a PUT KEY command"));
        }
        if command.p2() != put_key::P2_KEY_SET {
            return Err(Error::InvalidCommand("PUT KEY must load a full key set"));
        }

        let data = command.data();
        if data.len() != 1 + 3 * COMPONENT_LENGTH {
            return Err(Error::InvalidCommand("PUT KEY data has wrong length"));
        }
        let mut chunks = data[1..].chunks_exact(COMPONENT_LENGTH);
        let mut next = || {
            chunks
                .next()
                .ok_or(Error::InvalidCommand("PUT KEY component missing"))
                .and_then(KeyComponent::decode)
        };

        Ok(Self {
            current_key_version: command.p1(),
            new_key_version: data[0],
            components: [next()?, next()?, next()?],
        })
    }
}

/// Body of a successful PUT KEY response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutKeyResponse {
    /// Version of the key set the card stored
    pub key_version_number: u8,
    /// Check values computed by the card for ENC, MAC and DEK
    pub check_values: [KeyCheckValue; 3],
}

impl PutKeyResponse {
    /// Parse the response body (without status word)
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let [key_version_number, kcvs @ ..] = payload else {
            return Err(Error::InvalidResponse("PUT KEY response is empty"));
        };
        if payload.len() != RESPONSE_LENGTH {
            return Err(Error::InvalidResponse("PUT KEY response has wrong length"));
        }

        let mut check_values = [[0u8; 3]; 3];
        for (value, chunk) in check_values.iter_mut().zip(kcvs.chunks_exact(3)) {
            value.copy_from_slice(chunk);
        }

        Ok(Self {
            key_version_number: *key_version_number,
            check_values,
        })
    }

    /// Confirm the card stored the keys that were sent
    pub fn verify(&self, command: &PutKeyCommand) -> Result<()> {
        if self.key_version_number != command.new_key_version {
            return Err(Error::InvalidResponse("PUT KEY response key version mismatch"));
        }
        if self.check_values != command.check_values() {
            return Err(Error::InvalidResponse("PUT KEY key check value mismatch"));
        }
        Ok(())
    }
}
