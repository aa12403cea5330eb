//! Channel configuration

use derive_more::Display;

use crate::{
    Error, Result,
    constants::security_level::{C_DECRYPTION, C_MAC, R_ENCRYPTION, R_MAC},
};

/// Protection applied to commands and responses once the channel is open
///
/// Only the combinations GlobalPlatform allows for SCP03 can be built:
/// `01`, `03`, `11`, `13` and `33`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{:#04x}", _0)]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// C-MAC only
    pub const C_MAC: Self = Self(C_MAC);
    /// C-MAC and command encryption
    pub const C_MAC_C_DEC: Self = Self(C_MAC | C_DECRYPTION);
    /// C-MAC and R-MAC
    pub const C_MAC_R_MAC: Self = Self(C_MAC | R_MAC);
    /// C-MAC, command encryption and R-MAC
    pub const C_MAC_C_DEC_R_MAC: Self = Self(C_MAC | C_DECRYPTION | R_MAC);
    /// Full protection in both directions
    pub const FULL: Self = Self(C_MAC | C_DECRYPTION | R_MAC | R_ENCRYPTION);

    /// Validate a raw security level byte
    pub const fn new(level: u8) -> Result<Self> {
        match level {
            0x01 | 0x03 | 0x11 | 0x13 | 0x33 => Ok(Self(level)),
            _ => Err(Error::InvalidSecurityLevel(level)),
        }
    }

    /// Raw value, as sent in P1 of EXTERNAL AUTHENTICATE
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Command data is encrypted
    pub const fn has_command_encryption(&self) -> bool {
        self.0 & C_DECRYPTION != 0
    }

    /// Responses carry an R-MAC
    pub const fn has_response_mac(&self) -> bool {
        self.0 & R_MAC != 0
    }

    /// Response data is encrypted
    pub const fn has_response_encryption(&self) -> bool {
        self.0 & R_ENCRYPTION != 0
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level.bits()
    }
}

/// Parameters for opening a secure channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Key version number sent in INITIALIZE UPDATE; `0` lets the card choose
    ///
    /// Read by [`Scp03Channel::open`](crate::Scp03Channel::open). A bare
    /// [`Session`](crate::Session) only reports it until
    /// `build_initialize_update` is called with an explicit version.
    pub key_version_number: u8,

    /// Security level requested in EXTERNAL AUTHENTICATE
    pub security_level: SecurityLevel,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            key_version_number: 0x00,
            security_level: SecurityLevel::default(),
        }
    }
}

impl ChannelConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key version number
    pub const fn with_key_version_number(mut self, key_version_number: u8) -> Self {
        self.key_version_number = key_version_number;
        self
    }

    /// Set the security level
    pub const fn with_security_level(mut self, security_level: SecurityLevel) -> Self {
        self.security_level = security_level;
        self
    }
}
