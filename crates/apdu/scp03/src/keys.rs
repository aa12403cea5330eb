//! Static and session key sets
//!
//! Both key sets are immutable once built and wipe their contents on drop.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Result,
    constants::{DEFAULT_KEY, DEFAULT_KEY_VERSION, KEY_LENGTH, derivation},
    crypto::{AesKey, check_key},
    kdf,
};

/// Long-term SCP03 keys shared with the card
///
/// The well-known default key set is only available through
/// [`StaticKeys::default_keys`]; nothing falls back to it implicitly.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StaticKeys {
    /// Channel encryption key (key-ENC)
    enc: AesKey,
    /// Channel MAC key (key-MAC)
    mac: AesKey,
    /// Data encryption key (key-DEK)
    dek: AesKey,
    /// Key version number on the card
    key_version_number: u8,
}

impl StaticKeys {
    /// Build a key set from byte slices, each of which must be 16 bytes
    pub fn new(enc: &[u8], mac: &[u8], dek: &[u8], key_version_number: u8) -> Result<Self> {
        Ok(Self::from_keys(
            *check_key(enc)?,
            *check_key(mac)?,
            *check_key(dek)?,
            key_version_number,
        ))
    }

    /// Build a key set from fixed-size keys
    pub const fn from_keys(
        enc: AesKey,
        mac: AesKey,
        dek: AesKey,
        key_version_number: u8,
    ) -> Self {
        Self {
            enc,
            mac,
            dek,
            key_version_number,
        }
    }

    /// The publicly known default key set (`40 41 … 4F`, version `FF`)
    ///
    /// Cards leave the factory with these keys. Use only to talk to a card
    /// that has not been personalized yet.
    pub const fn default_keys() -> Self {
        Self::from_keys(DEFAULT_KEY, DEFAULT_KEY, DEFAULT_KEY, DEFAULT_KEY_VERSION)
    }

    /// Channel encryption key, the source of S-ENC
    pub const fn channel_encryption_key(&self) -> &AesKey {
        &self.enc
    }

    /// Channel MAC key, the source of S-MAC and S-RMAC
    pub const fn channel_mac_key(&self) -> &AesKey {
        &self.mac
    }

    /// Data encryption key, used to protect key material in PUT KEY
    pub const fn data_encryption_key(&self) -> &AesKey {
        &self.dek
    }

    /// Key version number of this set
    pub const fn key_version_number(&self) -> u8 {
        self.key_version_number
    }
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeys")
            .field("key_version_number", &self.key_version_number)
            .finish_non_exhaustive()
    }
}

/// Per-session keys derived from [`StaticKeys`] and both challenges
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    s_enc: AesKey,
    s_mac: AesKey,
    s_rmac: AesKey,
}

impl SessionKeys {
    /// Derive S-ENC, S-MAC and S-RMAC
    pub fn derive(
        static_keys: &StaticKeys,
        host_challenge: &[u8],
        card_challenge: &[u8],
    ) -> Result<Self> {
        let derive_key = |constant, key: &AesKey| -> Result<AesKey> {
            let derived = kdf::derive(
                constant,
                (KEY_LENGTH * 8) as u16,
                key,
                host_challenge,
                card_challenge,
            )?;
            let mut out = [0u8; KEY_LENGTH];
            out.copy_from_slice(&derived);
            Ok(out)
        };

        Ok(Self {
            s_enc: derive_key(derivation::S_ENC, &static_keys.enc)?,
            s_mac: derive_key(derivation::S_MAC, &static_keys.mac)?,
            s_rmac: derive_key(derivation::S_RMAC, &static_keys.mac)?,
        })
    }

    /// Session encryption key
    pub const fn s_enc(&self) -> &AesKey {
        &self.s_enc
    }

    /// Session command MAC key
    pub const fn s_mac(&self) -> &AesKey {
        &self.s_mac
    }

    /// Session response MAC key
    pub const fn s_rmac(&self) -> &AesKey {
        &self.s_rmac
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys { .. }")
    }
}
