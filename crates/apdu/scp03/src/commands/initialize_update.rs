//! INITIALIZE UPDATE command
//!
//! Starts the handshake: the host sends its challenge and the card answers
//! with its own challenge and a cryptogram proving it holds the static keys.

use rand::RngCore;
use scp03_apdu_core::{Command, Response};
use zeroize::Zeroize;

use crate::{
    Error, Result,
    constants::{
        CHALLENGE_LENGTH, CRYPTOGRAM_LENGTH, DIVERSIFICATION_DATA_LENGTH, KEY_INFO_LENGTH, SCP03,
        SEQUENCE_COUNTER_LENGTH, cla, ins,
    },
    kdf::check_challenge,
};

/// Response body length without a sequence counter
const RESPONSE_LENGTH: usize =
    DIVERSIFICATION_DATA_LENGTH + KEY_INFO_LENGTH + CHALLENGE_LENGTH + CRYPTOGRAM_LENGTH;

/// INITIALIZE UPDATE command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeUpdateCommand {
    /// Key version number to use; `0` selects the card's default
    pub key_version_number: u8,
    /// Host challenge
    pub host_challenge: [u8; CHALLENGE_LENGTH],
}

impl InitializeUpdateCommand {
    /// Create the command for a given host challenge
    pub fn new(key_version_number: u8, host_challenge: &[u8]) -> Result<Self> {
        Ok(Self {
            key_version_number,
            host_challenge: *check_challenge(host_challenge)?,
        })
    }

    /// Create the command with a freshly generated host challenge
    pub fn with_random_challenge(key_version_number: u8) -> Self {
        let mut host_challenge = [0u8; CHALLENGE_LENGTH];
        rand::rng().fill_bytes(&mut host_challenge);
        Self {
            key_version_number,
            host_challenge,
        }
    }

    /// Build the APDU: `80 50 <kvn> 00 08 <challenge>`
    pub fn to_command(&self) -> Command {
        Command::new(cla::GP, ins::INITIALIZE_UPDATE, self.key_version_number, 0x00)
            .with_data(self.host_challenge.to_vec())
    }

    /// Recover the command from an APDU
    pub fn from_command(command: &Command) -> Result<Self> {
        if command.class() != cla::GP || command.instruction() != ins::INITIALIZE_UPDATE {
            return Err(Error::InvalidCommand("not an INITIALIZE UPDATE command"));
        }
        let host_challenge = command
            .data()
            .try_into()
            .map_err(|_| Error::InvalidCommand("host challenge must be 8 bytes"))?;

        Ok(Self {
            key_version_number: command.p1(),
            host_challenge,
        })
    }
}

/// Successful INITIALIZE UPDATE response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroize)]
pub struct InitializeUpdateResponse {
    /// Key diversification data
    pub diversification_data: [u8; DIVERSIFICATION_DATA_LENGTH],
    /// Key information: key version number, SCP identifier, `i` parameter
    pub key_info: [u8; KEY_INFO_LENGTH],
    /// Card challenge
    pub card_challenge: [u8; CHALLENGE_LENGTH],
    /// Card cryptogram
    pub card_cryptogram: [u8; CRYPTOGRAM_LENGTH],
    /// Sequence counter, only sent in pseudo-random challenge mode
    pub sequence_counter: Option<[u8; SEQUENCE_COUNTER_LENGTH]>,
}

impl InitializeUpdateResponse {
    /// Parse a raw response including the status word
    ///
    /// Fails with [`Error::CardStatus`] unless the status is `9000`, and with
    /// [`Error::UnsupportedScpVersion`] if the card is not using SCP03.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let response = Response::from_bytes(raw)
            .map_err(|_| Error::InvalidResponse("INITIALIZE UPDATE response too short"))?;
        if !response.is_success() {
            return Err(Error::CardStatus(response.status()));
        }
        Self::from_payload(response.payload())
    }

    /// Parse the response body without the status word
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let sequence_counter = match payload.len() {
            RESPONSE_LENGTH => None,
            len if len == RESPONSE_LENGTH + SEQUENCE_COUNTER_LENGTH => {
                payload[RESPONSE_LENGTH..].try_into().ok()
            }
            _ => {
                return Err(Error::InvalidResponse(
                    "INITIALIZE UPDATE response has wrong length",
                ));
            }
        };

        let (diversification_data, rest) =
            split::<DIVERSIFICATION_DATA_LENGTH>(payload)?;
        let (key_info, rest) = split::<KEY_INFO_LENGTH>(rest)?;
        let (card_challenge, rest) = split::<CHALLENGE_LENGTH>(rest)?;
        let (card_cryptogram, _) = split::<CRYPTOGRAM_LENGTH>(rest)?;

        let response = Self {
            diversification_data,
            key_info,
            card_challenge,
            card_cryptogram,
            sequence_counter,
        };

        if response.scp_identifier() != SCP03 {
            return Err(Error::UnsupportedScpVersion(response.scp_identifier()));
        }

        Ok(response)
    }

    /// Key version number the card used
    pub const fn key_version_number(&self) -> u8 {
        self.key_info[0]
    }

    /// SCP identifier, `03` for SCP03
    pub const fn scp_identifier(&self) -> u8 {
        self.key_info[1]
    }

    /// SCP03 `i` parameter
    pub const fn scp_parameter(&self) -> u8 {
        self.key_info[2]
    }
}

fn split<const N: usize>(data: &[u8]) -> Result<([u8; N], &[u8])> {
    let (head, rest) = data
        .split_first_chunk::<N>()
        .ok_or(Error::InvalidResponse("INITIALIZE UPDATE response truncated"))?;
    Ok((*head, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use scp03_apdu_core::StatusWord;

    const RESPONSE: [u8; 31] =
        hex!("010B001F002500000000FF0360CAAFA4DAC615236ADD5607216F3E115C9000");

    #[test]
    fn test_initialize_update_command() {
        let cmd = InitializeUpdateCommand::new(0x00, &hex!("360CB43F4301B894")).unwrap();
        let command = cmd.to_command();

        assert_eq!(command.class(), cla::GP);
        assert_eq!(command.instruction(), ins::INITIALIZE_UPDATE);
        assert_eq!(command.expected_length(), None);
        assert_eq!(
            command.to_bytes().as_ref(),
            hex!("8050000008360CB43F4301B894")
        );

        assert_eq!(InitializeUpdateCommand::from_command(&command).unwrap(), cmd);
    }

    #[test]
    fn test_bad_challenge() {
        assert_eq!(
            InitializeUpdateCommand::new(0x00, &hex!("360CB43F4301B8")),
            Err(Error::InvalidChallengeLength(7))
        );
        assert_eq!(
            InitializeUpdateCommand::new(0x00, &[0u8; 9]),
            Err(Error::InvalidChallengeLength(9))
        );
    }

    #[test]
    fn test_random_challenge() {
        let a = InitializeUpdateCommand::with_random_challenge(0x30);
        let b = InitializeUpdateCommand::with_random_challenge(0x30);
        assert_eq!(a.key_version_number, 0x30);
        assert_ne!(a.host_challenge, b.host_challenge);
    }

    #[test]
    fn test_parse_response() {
        let response = InitializeUpdateResponse::parse(&RESPONSE).unwrap();

        assert_eq!(response.diversification_data, hex!("010B001F002500000000"));
        assert_eq!(response.key_info, hex!("FF0360"));
        assert_eq!(response.key_version_number(), 0xFF);
        assert_eq!(response.scp_identifier(), SCP03);
        assert_eq!(response.scp_parameter(), 0x60);
        assert_eq!(response.card_challenge, hex!("CAAFA4DAC615236A"));
        assert_eq!(response.card_cryptogram, hex!("DD5607216F3E115C"));
        assert_eq!(response.sequence_counter, None);
    }

    #[test]
    fn test_parse_response_with_sequence_counter() {
        let raw = hex!("010B001F002500000000FF0370CAAFA4DAC615236ADD5607216F3E115C00002A9000");
        let response = InitializeUpdateResponse::parse(&raw).unwrap();
        assert_eq!(response.sequence_counter, Some(hex!("00002A")));
        assert_eq!(response.card_cryptogram, hex!("DD5607216F3E115C"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            InitializeUpdateResponse::parse(&hex!("6982")),
            Err(Error::CardStatus(StatusWord::new(0x69, 0x82)))
        );
        assert!(matches!(
            InitializeUpdateResponse::parse(&hex!("90")),
            Err(Error::InvalidResponse(_))
        ));
        assert!(matches!(
            InitializeUpdateResponse::parse(&RESPONSE[1..]),
            Err(Error::InvalidResponse(_))
        ));

        // SCP02 key information
        let mut raw = RESPONSE;
        raw[11] = 0x02;
        assert_eq!(
            InitializeUpdateResponse::parse(&raw),
            Err(Error::UnsupportedScpVersion(0x02))
        );
    }
}
