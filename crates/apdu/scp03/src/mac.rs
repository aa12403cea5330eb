//! C-MAC and R-MAC chaining
//!
//! Every command MAC is computed over the previous full 16-byte MAC followed
//! by the command header and data. Response MACs use the same chaining value
//! but do not advance it.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Error, Result,
    constants::{BLOCK_LENGTH, MAC_LENGTH},
    crypto::{AesKey, Block, cmac, constant_time_eq},
};

/// Truncated MAC as carried on the wire
pub type TruncatedMac = [u8; MAC_LENGTH];

/// MAC chaining value shared by the command and response MACs
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct MacChain {
    chaining_value: Block,
}

impl MacChain {
    /// Start a chain from the all-zero value used for EXTERNAL AUTHENTICATE
    pub const fn new() -> Self {
        Self {
            chaining_value: [0; BLOCK_LENGTH],
        }
    }

    /// Current chaining value
    pub const fn value(&self) -> &Block {
        &self.chaining_value
    }

    /// MAC a command and advance the chain
    ///
    /// `command` is the header with the final Lc followed by the data field.
    pub fn mac_command(&mut self, s_mac: &AesKey, command: &[u8]) -> TruncatedMac {
        let full = cmac(s_mac, &[&self.chaining_value, command]);
        self.chaining_value.copy_from_slice(full.as_slice());
        truncate(&full)
    }

    /// Compute the expected R-MAC for a response body and status word
    pub fn response_mac(&self, s_rmac: &AesKey, response: &[u8]) -> TruncatedMac {
        truncate(&cmac(s_rmac, &[&self.chaining_value, response]))
    }

    /// Check a received R-MAC in constant time
    ///
    /// `response` is the data field (without the R-MAC) followed by SW1 SW2.
    pub fn verify_response(
        &self,
        s_rmac: &AesKey,
        response: &[u8],
        received: &[u8],
    ) -> Result<()> {
        let expected = self.response_mac(s_rmac, response);
        if constant_time_eq(&expected, received) {
            Ok(())
        } else {
            Err(Error::AuthenticationFailed("response MAC mismatch"))
        }
    }
}

impl fmt::Debug for MacChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MacChain { .. }")
    }
}

fn truncate(full: &[u8; BLOCK_LENGTH]) -> TruncatedMac {
    let mut mac = [0u8; MAC_LENGTH];
    mac.copy_from_slice(&full[..MAC_LENGTH]);
    mac
}
