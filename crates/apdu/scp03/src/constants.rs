//! Constants defined by GlobalPlatform for SCP03
//!
//! Command classes, instruction codes, KDF derivation constants, security
//! level bits and the fixed field lengths of the handshake.

/// Command classes
pub mod cla {
    /// GlobalPlatform command class
    pub const GP: u8 = 0x80;
    /// Secure messaging indicator bit
    pub const SECURE_MESSAGING: u8 = 0x04;
    /// GlobalPlatform command class with secure messaging
    pub const MAC: u8 = GP | SECURE_MESSAGING;
}

/// Instruction codes
pub mod ins {
    /// INITIALIZE UPDATE command
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE command
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// PUT KEY command
    pub const PUT_KEY: u8 = 0xD8;
}

/// Derivation constants for the SCP03 KDF
pub mod derivation {
    /// Card cryptogram
    pub const CARD_CRYPTOGRAM: u8 = 0x00;
    /// Host cryptogram
    pub const HOST_CRYPTOGRAM: u8 = 0x01;
    /// Session encryption key (S-ENC)
    pub const S_ENC: u8 = 0x04;
    /// Session command MAC key (S-MAC)
    pub const S_MAC: u8 = 0x06;
    /// Session response MAC key (S-RMAC)
    pub const S_RMAC: u8 = 0x07;
}

/// Security level bits carried in P1 of EXTERNAL AUTHENTICATE
pub mod security_level {
    /// Command MAC
    pub const C_MAC: u8 = 0x01;
    /// Command data encryption
    pub const C_DECRYPTION: u8 = 0x02;
    /// Response MAC
    pub const R_MAC: u8 = 0x10;
    /// Response data encryption
    pub const R_ENCRYPTION: u8 = 0x20;
}

/// Parameter values for PUT KEY
pub mod put_key {
    /// P2: multiple keys, first key identifier 1
    pub const P2_KEY_SET: u8 = 0x81;
    /// AES key type
    pub const KEY_TYPE_AES: u8 = 0x88;
    /// Length of an AES key component: length byte plus 16 key bytes
    pub const AES_COMPONENT_LENGTH: u8 = 0x11;
    /// Length of a key check value
    pub const KCV_LENGTH: u8 = 0x03;
}

/// SCP identifier for SCP03 in the INITIALIZE UPDATE key information
pub const SCP03: u8 = 0x03;

/// AES-128 key length in bytes
pub const KEY_LENGTH: usize = 16;

/// AES block length in bytes
pub const BLOCK_LENGTH: usize = 16;

/// Host and card challenge length in bytes
pub const CHALLENGE_LENGTH: usize = 8;

/// Host and card cryptogram length in bytes
pub const CRYPTOGRAM_LENGTH: usize = 8;

/// Truncated C-MAC and R-MAC length in bytes
pub const MAC_LENGTH: usize = 8;

/// Key diversification data length in the INITIALIZE UPDATE response
pub const DIVERSIFICATION_DATA_LENGTH: usize = 10;

/// Key information length in the INITIALIZE UPDATE response
pub const KEY_INFO_LENGTH: usize = 3;

/// Sequence counter length, present only in pseudo-random challenge mode
pub const SEQUENCE_COUNTER_LENGTH: usize = 3;

/// Key version number of the well-known default key set
pub const DEFAULT_KEY_VERSION: u8 = 0xFF;

/// Well-known default key (`40 41 … 4F`) shipped on unpersonalized cards
pub const DEFAULT_KEY: [u8; KEY_LENGTH] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E,
    0x4F,
];
