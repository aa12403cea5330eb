//! AES-128 building blocks for SCP03
//!
//! Thin wrappers over the RustCrypto primitives: AES-CMAC, single-block
//! AES-ECB and key check values. Everything above this module works on
//! fixed-size arrays and never touches the cipher traits directly.

use aes::Aes128;
use cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use cmac::{Cmac, Mac};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    Error, Result,
    constants::{BLOCK_LENGTH, KEY_LENGTH},
};

/// AES-128 key
pub type AesKey = [u8; KEY_LENGTH];

/// One AES block
pub type Block = [u8; BLOCK_LENGTH];

/// Key check value (first three bytes of the encrypted check block)
pub type KeyCheckValue = [u8; 3];

/// Borrow a slice as an AES-128 key, rejecting any other length
pub fn check_key(key: &[u8]) -> Result<&AesKey> {
    key.try_into()
        .map_err(|_| Error::InvalidKeyLength(key.len()))
}

/// AES-CMAC over the concatenation of `parts`
pub fn cmac(key: &AesKey, parts: &[&[u8]]) -> Zeroizing<Block> {
    let mut mac = <Cmac<Aes128> as Mac>::new(key.into());
    for part in parts {
        mac.update(part);
    }
    Zeroizing::new(mac.finalize().into_bytes().into())
}

/// Encrypt a single block with AES-128 in ECB mode
pub fn encrypt_block(key: &AesKey, input: &Block) -> Block {
    let cipher = Aes128::new(key.into());
    let mut block = GenericArray::clone_from_slice(input);
    cipher.encrypt_block(&mut block);
    block.into()
}

/// Key check value as defined for AES keys: `AES(key, 01…01)[..3]`
pub fn key_check_value(key: &AesKey) -> KeyCheckValue {
    let check = encrypt_block(key, &[0x01; BLOCK_LENGTH]);
    [check[0], check[1], check[2]]
}

/// Constant-time equality for MACs and cryptograms
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
