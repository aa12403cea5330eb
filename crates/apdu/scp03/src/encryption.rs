//! Counter-driven channel encryption
//!
//! Command and response data fields are encrypted with AES-128-CBC and
//! ISO/IEC 7816-4 padding. The ICV is derived from the encryption counter:
//!
//! ```text
//! command ICV  = AES(S-ENC, 00 .. 00 || counter)
//! response ICV = AES(S-ENC, 80 00 .. 00 || counter)
//! ```
//!
//! with `counter` right-aligned big-endian in the 16-byte block.

use aes::Aes128;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Iso7816};
use zeroize::Zeroizing;

use crate::{
    Error, Result,
    constants::BLOCK_LENGTH,
    crypto::{AesKey, Block, check_key, encrypt_block},
};

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

/// Marker placed in the first byte of the ICV block for responses
const RESPONSE_ICV_MARKER: u8 = 0x80;

/// Which side of an exchange is being protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Off-card to card
    #[default]
    Command,
    /// Card to off-card
    Response,
}

/// Encrypt a command data field
pub fn encrypt(plaintext: &[u8], s_enc: &[u8], counter: u32) -> Result<Vec<u8>> {
    encrypt_for(Direction::Command, plaintext, s_enc, counter)
}

/// Decrypt a command data field
pub fn decrypt(ciphertext: &[u8], s_enc: &[u8], counter: u32) -> Result<Zeroizing<Vec<u8>>> {
    decrypt_for(Direction::Command, ciphertext, s_enc, counter)
}

/// Encrypt data for the given direction
///
/// The output is always at least one block long: data that is already block
/// aligned gets a full block of padding.
pub fn encrypt_for(
    direction: Direction,
    plaintext: &[u8],
    s_enc: &[u8],
    counter: u32,
) -> Result<Vec<u8>> {
    let key = check_key(s_enc)?;
    let iv = icv(direction, key, counter)?;

    let mut buffer = Zeroizing::new(plaintext.to_vec());
    let msg_len = prepare_padding(&mut buffer);
    let ciphertext = Encryptor::new(key.into(), (&iv).into())
        .encrypt_padded_mut::<Iso7816>(&mut buffer, msg_len)
        .map_err(|_| Error::DataTooLong(msg_len))?;

    Ok(ciphertext.to_vec())
}

/// Decrypt data for the given direction and strip the padding
///
/// Any padding failure is reported as [`Error::BadPadding`]; the decrypted
/// buffer is wiped before returning.
pub fn decrypt_for(
    direction: Direction,
    ciphertext: &[u8],
    s_enc: &[u8],
    counter: u32,
) -> Result<Zeroizing<Vec<u8>>> {
    let key = check_key(s_enc)?;
    let iv = icv(direction, key, counter)?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LENGTH != 0 {
        return Err(Error::BadPadding);
    }

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    let plaintext = Decryptor::new(key.into(), (&iv).into())
        .decrypt_padded_mut::<Iso7816>(&mut buffer)
        .map_err(|_| Error::BadPadding)?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}

/// Compute the ICV for `counter`
pub fn icv(direction: Direction, s_enc: &AesKey, counter: u32) -> Result<Block> {
    if counter == 0 {
        return Err(Error::InvalidCounter);
    }

    let mut block = [0u8; BLOCK_LENGTH];
    block[BLOCK_LENGTH - 4..].copy_from_slice(&counter.to_be_bytes());
    if direction == Direction::Response {
        block[0] = RESPONSE_ICV_MARKER;
    }

    Ok(encrypt_block(s_enc, &block))
}

// Grow the buffer to the next block boundary, returning the message length
fn prepare_padding(data: &mut Vec<u8>) -> usize {
    let len = data.len();
    data.resize(len + BLOCK_LENGTH - len % BLOCK_LENGTH, 0);
    len
}
