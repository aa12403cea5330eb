//! SCP03 key derivation function
//!
//! NIST SP 800-108 KDF in counter mode with AES-CMAC as the PRF, using the
//! fixed-input layout GlobalPlatform mandates for SCP03:
//!
//! ```text
//! label (11 x 00) || constant || 00 || L (2 bytes BE) || i (1 byte) || context
//! ```
//!
//! where `context` is `host_challenge || card_challenge` and `i` counts output
//! blocks from 1. The same function produces session keys (128 bits) and
//! cryptograms (64 bits).

use zeroize::Zeroizing;

use crate::{
    Error, Result,
    constants::{BLOCK_LENGTH, CHALLENGE_LENGTH},
    crypto::{check_key, cmac},
};

/// Length of the all-zero label preceding the derivation constant
const LABEL_LENGTH: usize = 11;

/// Largest output the 1-byte block counter can address, in bits
pub const MAX_OUTPUT_BITS: u16 = 255 * (BLOCK_LENGTH as u16) * 8;

/// Derive `output_length_bits` of key material from `kdf_key`
///
/// # Arguments
///
/// * `derivation_constant` - Purpose of the output, see [`crate::constants::derivation`]
/// * `output_length_bits` - Requested length; a non-zero multiple of 8
/// * `kdf_key` - AES-128 key (16 bytes)
/// * `host_challenge` - Host challenge (8 bytes)
/// * `card_challenge` - Card challenge (8 bytes)
pub fn derive(
    derivation_constant: u8,
    output_length_bits: u16,
    kdf_key: &[u8],
    host_challenge: &[u8],
    card_challenge: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let key = check_key(kdf_key)?;
    check_challenge(host_challenge)?;
    check_challenge(card_challenge)?;

    if output_length_bits == 0
        || output_length_bits % 8 != 0
        || output_length_bits > MAX_OUTPUT_BITS
    {
        return Err(Error::InvalidOutputLength(output_length_bits));
    }

    let output_len = usize::from(output_length_bits / 8);
    let blocks = output_len.div_ceil(BLOCK_LENGTH);

    let mut fixed_input = [0u8; LABEL_LENGTH + 5];
    fixed_input[LABEL_LENGTH] = derivation_constant;
    fixed_input[LABEL_LENGTH + 2..LABEL_LENGTH + 4]
        .copy_from_slice(&output_length_bits.to_be_bytes());

    let mut output = Zeroizing::new(Vec::with_capacity(blocks * BLOCK_LENGTH));
    for counter in 1..=blocks {
        // Bounded by MAX_OUTPUT_BITS above
        fixed_input[LABEL_LENGTH + 4] = counter as u8;
        let block = cmac(key, &[&fixed_input, host_challenge, card_challenge]);
        output.extend_from_slice(block.as_slice());
    }
    output.truncate(output_len);

    Ok(output)
}

/// Reject challenges that are not exactly 8 bytes
pub fn check_challenge(challenge: &[u8]) -> Result<&[u8; CHALLENGE_LENGTH]> {
    challenge
        .try_into()
        .map_err(|_| Error::InvalidChallengeLength(challenge.len()))
}
