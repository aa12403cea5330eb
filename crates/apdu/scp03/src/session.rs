//! SCP03 session state machine
//!
//! A [`Session`] walks through the handshake one step at a time and then
//! protects every command and response exchanged over the channel:
//!
//! ```text
//! New --build_initialize_update--> ChallengeBuilt
//!     --load_initialize_update_response--> Authenticated
//!     --build_external_authenticate--> SecureChannelActive
//! ```
//!
//! Any security failure moves the session to [`SessionState::Failed`], from
//! which nothing is allowed. The session performs no I/O; see
//! [`crate::Scp03Channel`] for a transport-bound wrapper.

use std::fmt;

use bytes::{BufMut, BytesMut};
use derive_more::Display;
use scp03_apdu_core::{Command, MAX_SHORT_DATA_LENGTH, Response};
use tracing::{debug, trace, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    Error, Result,
    commands::{ExternalAuthenticateCommand, InitializeUpdateCommand, InitializeUpdateResponse},
    config::{ChannelConfig, SecurityLevel},
    constants::{CHALLENGE_LENGTH, CRYPTOGRAM_LENGTH, MAC_LENGTH, cla, derivation},
    crypto::constant_time_eq,
    encryption::{Direction, decrypt_for, encrypt},
    kdf,
    keys::{SessionKeys, StaticKeys},
    mac::MacChain,
};

/// Position of a [`Session`] in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SessionState {
    /// Nothing sent yet
    New,
    /// INITIALIZE UPDATE built, waiting for the card's answer
    ChallengeBuilt,
    /// Card authenticated, EXTERNAL AUTHENTICATE not built yet
    Authenticated,
    /// Secure messaging in effect
    SecureChannelActive,
    /// A security check failed; the session cannot be used again
    Failed,
}

/// One SCP03 conversation with a card
pub struct Session {
    config: ChannelConfig,
    state: SessionState,
    key_version_number: u8,
    host_challenge: Option<[u8; CHALLENGE_LENGTH]>,
    card_response: Option<InitializeUpdateResponse>,
    session_keys: Option<SessionKeys>,
    mac_chain: MacChain,
    /// Counter for the next wrapped command, starting at 1
    encryption_counter: u32,
    /// Counter used by the last wrapped command, consumed by its response
    response_counter: Option<u32>,
}

impl Session {
    /// Start a session with the default configuration
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Start a session with the given configuration
    ///
    /// The security level applies to the whole session. The key version
    /// number is only a starting value: the one passed to
    /// [`build_initialize_update`](Self::build_initialize_update) wins.
    pub const fn with_config(config: ChannelConfig) -> Self {
        Self {
            config,
            state: SessionState::New,
            key_version_number: config.key_version_number,
            host_challenge: None,
            card_response: None,
            session_keys: None,
            mac_chain: MacChain::new(),
            encryption_counter: 1,
            response_counter: None,
        }
    }

    /// Build INITIALIZE UPDATE for `host_challenge`
    ///
    /// A challenge of the wrong length is rejected without changing state.
    pub fn build_initialize_update(
        &mut self,
        key_version_number: u8,
        host_challenge: &[u8],
    ) -> Result<InitializeUpdateCommand> {
        self.ensure_state(SessionState::New, "build_initialize_update")?;
        let command = InitializeUpdateCommand::new(key_version_number, host_challenge)?;
        self.start(command);
        Ok(command)
    }

    /// Build INITIALIZE UPDATE with a random host challenge
    pub fn build_initialize_update_random(
        &mut self,
        key_version_number: u8,
    ) -> Result<InitializeUpdateCommand> {
        self.ensure_state(SessionState::New, "build_initialize_update")?;
        let command = InitializeUpdateCommand::with_random_challenge(key_version_number);
        self.start(command);
        Ok(command)
    }

    fn start(&mut self, command: InitializeUpdateCommand) {
        self.key_version_number = command.key_version_number;
        self.host_challenge = Some(command.host_challenge);
        self.transition(SessionState::ChallengeBuilt);
    }

    /// Authenticate the card from its INITIALIZE UPDATE response
    ///
    /// `response` is the raw response including the status word. Derives the
    /// session keys and checks the card cryptogram. Any failure, including a
    /// malformed response or an error status, leaves the session
    /// [`Failed`](SessionState::Failed).
    pub fn load_initialize_update_response(
        &mut self,
        response: &[u8],
        static_keys: &StaticKeys,
    ) -> Result<()> {
        self.ensure_state(SessionState::ChallengeBuilt, "load_initialize_update_response")?;

        match self.authenticate_card(response, static_keys) {
            Ok(()) => {
                self.transition(SessionState::Authenticated);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn authenticate_card(&mut self, response: &[u8], static_keys: &StaticKeys) -> Result<()> {
        let mut card_response = InitializeUpdateResponse::parse(response)?;
        let host_challenge = self.host_challenge()?;

        debug!(
            key_version = card_response.key_version_number(),
            scp_parameter = format_args!("{:#04x}", card_response.scp_parameter()),
            "Received INITIALIZE UPDATE response"
        );

        let session_keys =
            SessionKeys::derive(static_keys, host_challenge, &card_response.card_challenge)?;
        let expected = kdf::derive(
            derivation::CARD_CRYPTOGRAM,
            (CRYPTOGRAM_LENGTH * 8) as u16,
            session_keys.s_mac(),
            host_challenge,
            &card_response.card_challenge,
        )?;

        if !constant_time_eq(&expected, &card_response.card_cryptogram) {
            card_response.zeroize();
            return Err(Error::AuthenticationFailed("card cryptogram mismatch"));
        }

        self.card_response = Some(card_response);
        self.session_keys = Some(session_keys);
        Ok(())
    }

    /// Build EXTERNAL AUTHENTICATE with the host cryptogram and its C-MAC
    pub fn build_external_authenticate(&mut self) -> Result<ExternalAuthenticateCommand> {
        self.ensure_state(SessionState::Authenticated, "build_external_authenticate")?;
        let host_challenge = Zeroizing::new(*self.host_challenge()?);
        let card_challenge = Zeroizing::new(self.card_response()?.card_challenge);
        let security_level = self.config.security_level;

        let keys = self.keys("build_external_authenticate")?;
        let derived = kdf::derive(
            derivation::HOST_CRYPTOGRAM,
            (CRYPTOGRAM_LENGTH * 8) as u16,
            keys.s_mac(),
            host_challenge.as_slice(),
            card_challenge.as_slice(),
        )?;
        let mut host_cryptogram = Zeroizing::new([0u8; CRYPTOGRAM_LENGTH]);
        host_cryptogram.copy_from_slice(&derived);

        let s_mac = Zeroizing::new(*keys.s_mac());
        let mac = self.mac_chain.mac_command(
            &s_mac,
            &ExternalAuthenticateCommand::mac_input(security_level, &host_cryptogram),
        );

        self.transition(SessionState::SecureChannelActive);
        Ok(ExternalAuthenticateCommand {
            security_level,
            host_cryptogram: *host_cryptogram,
            mac,
        })
    }

    /// Protect an outgoing command
    ///
    /// Encrypts the data field when the security level asks for it and the
    /// field is not empty, sets the secure messaging bit in CLA and appends
    /// the C-MAC. The encryption counter advances for every wrapped command.
    pub fn wrap_command(&mut self, command: &Command) -> Result<Command> {
        self.ensure_state(SessionState::SecureChannelActive, "wrap_command")?;
        let counter = self.encryption_counter;
        let next_counter = counter.checked_add(1).ok_or(Error::InvalidCounter)?;
        let keys = self.keys("wrap_command")?;

        let mut data = if self.config.security_level.has_command_encryption()
            && !command.data().is_empty()
        {
            encrypt(command.data(), keys.s_enc(), counter)?
        } else {
            command.data().to_vec()
        };

        let lc = data.len() + MAC_LENGTH;
        if lc > MAX_SHORT_DATA_LENGTH {
            return Err(Error::DataTooLong(lc));
        }

        let cla = command.class() | cla::SECURE_MESSAGING;
        let mut mac_input = BytesMut::with_capacity(5 + data.len());
        mac_input.put_u8(cla);
        mac_input.put_u8(command.instruction());
        mac_input.put_u8(command.p1());
        mac_input.put_u8(command.p2());
        mac_input.put_u8(lc as u8);
        mac_input.put_slice(&data);

        let s_mac = Zeroizing::new(*keys.s_mac());
        let mac = self.mac_chain.mac_command(&s_mac, &mac_input);
        data.extend_from_slice(&mac);

        let mut wrapped = Command::new(cla, command.instruction(), command.p1(), command.p2())
            .with_data(data);
        if let Some(le) = command.expected_length() {
            wrapped = wrapped.with_le(le);
        }

        trace!(
            counter,
            command = %hex::encode(wrapped.to_bytes()),
            "Wrapped command"
        );

        self.response_counter = Some(counter);
        self.encryption_counter = next_counter;
        Ok(wrapped)
    }

    /// Verify and decrypt the response to the last wrapped command
    ///
    /// The R-MAC is checked before anything is decrypted. A bare error status
    /// word is returned as is, since cards do not protect error responses.
    /// Any verification failure leaves the session
    /// [`Failed`](SessionState::Failed).
    pub fn unwrap_response(&mut self, raw: &[u8]) -> Result<Response> {
        self.ensure_state(SessionState::SecureChannelActive, "unwrap_response")?;
        let Some(counter) = self.response_counter else {
            return Err(self.order_error("unwrap_response"));
        };

        match self.verify_and_decrypt(raw, counter) {
            Ok(response) => {
                self.response_counter = None;
                Ok(response)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn verify_and_decrypt(&self, raw: &[u8], counter: u32) -> Result<Response> {
        let response = Response::from_bytes(raw)
            .map_err(|_| Error::InvalidResponse("response shorter than a status word"))?;
        let status = response.status();

        if response.payload().is_empty() && !status.is_completed() {
            debug!(%status, "Card returned unprotected error status");
            return Ok(response);
        }

        let keys = self.keys("unwrap_response")?;
        let level = self.config.security_level;
        let mut data = response.payload();

        if level.has_response_mac() {
            let (body, rmac) = data
                .split_last_chunk::<MAC_LENGTH>()
                .ok_or(Error::AuthenticationFailed("response too short for R-MAC"))?;

            let mut mac_input = BytesMut::with_capacity(body.len() + 2);
            mac_input.put_slice(body);
            mac_input.put_slice(&status.to_bytes());
            self.mac_chain
                .verify_response(keys.s_rmac(), &mac_input, rmac)?;
            data = body;
        }

        if level.has_response_encryption() && !data.is_empty() {
            let plaintext = decrypt_for(Direction::Response, data, keys.s_enc(), counter)?;
            return Ok(Response::new(plaintext.to_vec(), status));
        }

        Ok(Response::new(data.to_vec(), status))
    }

    /// Current state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration the session was created with
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Security level requested for the channel
    pub const fn security_level(&self) -> SecurityLevel {
        self.config.security_level
    }

    /// Counter the next wrapped command will use
    pub const fn encryption_counter(&self) -> u32 {
        self.encryption_counter
    }

    /// Key version number sent in INITIALIZE UPDATE
    pub const fn key_version_number(&self) -> u8 {
        self.key_version_number
    }

    /// Host challenge, once INITIALIZE UPDATE has been built
    pub const fn host_challenge_bytes(&self) -> Option<&[u8; CHALLENGE_LENGTH]> {
        self.host_challenge.as_ref()
    }

    /// Card challenge, once the card has been authenticated
    pub fn card_challenge(&self) -> Option<&[u8; CHALLENGE_LENGTH]> {
        self.card_response.as_ref().map(|r| &r.card_challenge)
    }

    /// Card cryptogram, once the card has been authenticated
    pub fn card_cryptogram(&self) -> Option<&[u8; CRYPTOGRAM_LENGTH]> {
        self.card_response.as_ref().map(|r| &r.card_cryptogram)
    }

    /// Key diversification data reported by the card
    pub fn diversification_data(&self) -> Option<&[u8]> {
        self.card_response
            .as_ref()
            .map(|r| r.diversification_data.as_slice())
    }

    /// Key information reported by the card
    pub fn key_info(&self) -> Option<&[u8]> {
        self.card_response.as_ref().map(|r| r.key_info.as_slice())
    }

    /// Session keys, once the card has been authenticated
    pub const fn session_keys(&self) -> Option<&SessionKeys> {
        self.session_keys.as_ref()
    }

    fn ensure_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.order_error(operation))
        }
    }

    const fn order_error(&self, operation: &'static str) -> Error {
        Error::ProtocolOrder {
            operation,
            state: self.state,
        }
    }

    fn host_challenge(&self) -> Result<&[u8; CHALLENGE_LENGTH]> {
        self.host_challenge
            .as_ref()
            .ok_or_else(|| self.order_error("load_initialize_update_response"))
    }

    fn card_response(&self) -> Result<&InitializeUpdateResponse> {
        self.card_response
            .as_ref()
            .ok_or_else(|| self.order_error("build_external_authenticate"))
    }

    fn keys(&self, operation: &'static str) -> Result<&SessionKeys> {
        self.session_keys
            .as_ref()
            .ok_or_else(|| self.order_error(operation))
    }

    fn transition(&mut self, state: SessionState) {
        debug!(from = %self.state, to = %state, "Session state change");
        self.state = state;
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(state = %self.state, error = %err, "Secure channel session failed");
        self.state = SessionState::Failed;
        self.session_keys = None;
        self.card_response.zeroize();
        self.response_counter = None;
        self.mac_chain.zeroize();
        err
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.host_challenge.zeroize();
        self.card_response.zeroize();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("security_level", &self.config.security_level)
            .field("encryption_counter", &self.encryption_counter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use hex_literal::hex;
    use scp03_apdu_core::StatusWord;

    const HOST_CHALLENGE: [u8; 8] = hex!("360CB43F4301B894");
    const INITIALIZE_UPDATE_RESPONSE: [u8; 31] =
        hex!("010B001F002500000000FF0360CAAFA4DAC615236ADD5607216F3E115C9000");
    /// Offset of the card cryptogram in the raw INITIALIZE UPDATE response
    const CRYPTOGRAM_OFFSET: usize = 21;

    fn active_session() -> Session {
        let mut session = Session::new();
        session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
        session
            .load_initialize_update_response(
                &INITIALIZE_UPDATE_RESPONSE,
                &StaticKeys::default_keys(),
            )
            .unwrap();
        session.build_external_authenticate().unwrap();
        session
    }

    #[test]
    fn test_handshake() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::New);

        let initialize_update = session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
        assert_eq!(
            initialize_update.to_command().to_bytes().as_ref(),
            hex!("8050000008360CB43F4301B894")
        );
        assert_eq!(session.state(), SessionState::ChallengeBuilt);
        assert_eq!(session.host_challenge_bytes(), Some(&HOST_CHALLENGE));

        session
            .load_initialize_update_response(
                &INITIALIZE_UPDATE_RESPONSE,
                &StaticKeys::default_keys(),
            )
            .unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.card_challenge(), Some(&hex!("CAAFA4DAC615236A")));
        assert_eq!(session.card_cryptogram(), Some(&hex!("DD5607216F3E115C")));
        assert_eq!(
            session.diversification_data(),
            Some(hex!("010B001F002500000000").as_slice())
        );
        assert_eq!(session.key_info(), Some(hex!("FF0360").as_slice()));

        let keys = session.session_keys().unwrap();
        assert_eq!(keys.s_enc(), &hex!("7A3F4BB6F7081D7E25437674CCA306CB"));
        assert_eq!(keys.s_mac(), &hex!("FC90AA67CDC5DABFD5051663045DFA23"));
        assert_eq!(keys.s_rmac(), &hex!("38C0C6E3D0B6AED40FBB420B51399081"));

        let external_authenticate = session.build_external_authenticate().unwrap();
        assert_eq!(
            external_authenticate.to_command().to_bytes().as_ref(),
            hex!("848233001045330AB30BB1A079A8E7F77376DB9F2C")
        );
        assert_eq!(session.state(), SessionState::SecureChannelActive);
        assert_eq!(session.encryption_counter(), 1);
    }

    #[test]
    fn test_protocol_order() {
        let keys = StaticKeys::default_keys();

        let mut session = Session::new();
        let err = session
            .load_initialize_update_response(&INITIALIZE_UPDATE_RESPONSE, &keys)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        assert_eq!(session.state(), SessionState::New);

        let err = session.build_external_authenticate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        assert!(session.wrap_command(&Command::new(0x80, 0xCA, 0, 0)).is_err());
        assert!(session.unwrap_response(&hex!("9000")).is_err());
        assert_eq!(session.state(), SessionState::New);

        session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
        let err = session.build_external_authenticate().unwrap_err();
        assert_eq!(
            err,
            Error::ProtocolOrder {
                operation: "build_external_authenticate",
                state: SessionState::ChallengeBuilt,
            }
        );
        let err = session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        assert_eq!(session.state(), SessionState::ChallengeBuilt);

        session
            .load_initialize_update_response(&INITIALIZE_UPDATE_RESPONSE, &keys)
            .unwrap();
        let err = session
            .load_initialize_update_response(&INITIALIZE_UPDATE_RESPONSE, &keys)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_bad_host_challenge_keeps_state() {
        let mut session = Session::new();
        let err = session
            .build_initialize_update(0x00, &HOST_CHALLENGE[..7])
            .unwrap_err();
        assert_eq!(err, Error::InvalidChallengeLength(7));
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
        assert_eq!(session.state(), SessionState::New);
        assert!(session.host_challenge_bytes().is_none());

        session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
    }

    #[test]
    fn test_random_challenge() {
        let mut session = Session::new();
        let command = session.build_initialize_update_random(0x30).unwrap();
        assert_eq!(session.key_version_number(), 0x30);
        assert_eq!(session.host_challenge_bytes(), Some(&command.host_challenge));
        assert_eq!(session.state(), SessionState::ChallengeBuilt);
    }

    #[test]
    fn test_cryptogram_tampering() {
        for bit in 0..CRYPTOGRAM_LENGTH * 8 {
            let mut response = INITIALIZE_UPDATE_RESPONSE;
            response[CRYPTOGRAM_OFFSET + bit / 8] ^= 1 << (bit % 8);

            let mut session = Session::new();
            session
                .build_initialize_update(0x00, &HOST_CHALLENGE)
                .unwrap();
            let err = session
                .load_initialize_update_response(&response, &StaticKeys::default_keys())
                .unwrap_err();

            assert_eq!(err, Error::AuthenticationFailed("card cryptogram mismatch"));
            assert!(err.is_security_failure());
            assert_eq!(session.state(), SessionState::Failed);
            assert!(session.session_keys().is_none());

            let err = session.build_external_authenticate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        }
    }

    #[test]
    fn test_wrong_static_keys() {
        let keys = StaticKeys::from_keys([0x11; 16], [0x22; 16], [0x33; 16], 0xFF);
        let mut session = Session::new();
        session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
        let err = session
            .load_initialize_update_response(&INITIALIZE_UPDATE_RESPONSE, &keys)
            .unwrap_err();
        assert!(err.is_security_failure());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_error_status_fails_session() {
        let mut session = Session::new();
        session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
        let err = session
            .load_initialize_update_response(&hex!("6A88"), &StaticKeys::default_keys())
            .unwrap_err();
        assert_eq!(err, Error::CardStatus(StatusWord::new(0x6A, 0x88)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_wrap_unwrap() {
        let mut session = active_session();

        // GET STATUS, encrypted data with Le
        let command = Command::new(0x80, 0xF2, 0x80, 0x02)
            .with_data(hex!("4F00").to_vec())
            .with_le(0x00);
        let wrapped = session.wrap_command(&command).unwrap();
        assert_eq!(
            wrapped.to_bytes().as_ref(),
            hex!("84f2800218b066f426ba7a5a8046150048caacc06b48fbf5707b479e1500")
        );
        assert_eq!(session.encryption_counter(), 2);

        let response = session
            .unwrap_response(&hex!(
                "63bad972be4752aa8fb5cc7acaccec84d2e10b74fabed336a4964ca94f16be30"
                "34ba5fc3035114dd9000"
            ))
            .unwrap();
        assert!(response.is_success());
        assert_eq!(
            response.payload(),
            hex!("E3104F08A000000151000000C5039E0000")
        );

        // GET DATA, no data field
        let command = Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00);
        let wrapped = session.wrap_command(&command).unwrap();
        assert_eq!(
            wrapped.to_bytes().as_ref(),
            hex!("84ca006608c1c15ddf812e700c00")
        );
        assert_eq!(session.encryption_counter(), 3);

        let response = session
            .unwrap_response(&hex!("0aa1b2599b3c81a89000"))
            .unwrap();
        assert!(response.is_success());
        assert!(response.payload().is_empty());

        // DELETE-like command, data without Le
        let command = Command::new(0x80, 0xE2, 0x90, 0x00).with_data(hex!("0102030405").to_vec());
        let wrapped = session.wrap_command(&command).unwrap();
        assert_eq!(
            wrapped.to_bytes().as_ref(),
            hex!("84e290001815e41b707f615a719a0faef2f27a17e72f5c91f1d22fd801")
        );

        let response = session
            .unwrap_response(&hex!(
                "3dc5d268b93678bc24e7ab44ed6af83d5bd8828fe71cdc6e9000"
            ))
            .unwrap();
        assert_eq!(response.payload(), hex!("AABBCC"));
        assert_eq!(session.state(), SessionState::SecureChannelActive);
    }

    #[test]
    fn test_response_mac_tampering() {
        let raw = hex!("0aa1b2599b3c81a89000");

        for index in 0..raw.len() - 2 {
            let mut session = active_session();
            session
                .wrap_command(
                    &Command::new(0x80, 0xF2, 0x80, 0x02)
                        .with_data(hex!("4F00").to_vec())
                        .with_le(0x00),
                )
                .unwrap();
            session
                .wrap_command(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
                .unwrap();

            let mut tampered = raw;
            tampered[index] ^= 0x01;
            let err = session.unwrap_response(&tampered).unwrap_err();
            assert_eq!(err, Error::AuthenticationFailed("response MAC mismatch"));
            assert_eq!(session.state(), SessionState::Failed);
            assert!(session.card_challenge().is_none());
            assert!(session.card_cryptogram().is_none());

            let err = session
                .wrap_command(&Command::new(0x80, 0xCA, 0x00, 0x66))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        }
    }

    #[test]
    fn test_short_protected_response() {
        let mut session = active_session();
        session
            .wrap_command(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
            .unwrap();

        let err = session.unwrap_response(&hex!("01029000")).unwrap_err();
        assert!(err.is_security_failure());
        assert_eq!(session.state(), SessionState::Failed);
    }

    // Response with a valid R-MAC over `body`, for the last wrapped command
    fn mac_response(session: &Session, body: &[u8]) -> Vec<u8> {
        let s_rmac = session.session_keys().unwrap().s_rmac();
        let mut mac_input = body.to_vec();
        mac_input.extend_from_slice(&hex!("9000"));
        let rmac = session.mac_chain.response_mac(s_rmac, &mac_input);

        let mut raw = body.to_vec();
        raw.extend_from_slice(&rmac);
        raw.extend_from_slice(&hex!("9000"));
        raw
    }

    #[test]
    fn test_authentic_response_with_bad_padding() {
        let mut session = active_session();
        session
            .wrap_command(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
            .unwrap();

        let raw = mac_response(&session, &[0x11; 16]);
        let err = session.unwrap_response(&raw).unwrap_err();

        assert_eq!(err, Error::BadPadding);
        assert!(err.is_security_failure());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.session_keys().is_none());
        assert!(session.card_challenge().is_none());
    }

    #[test]
    fn test_authentic_response_with_partial_block() {
        let mut session = active_session();
        session
            .wrap_command(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
            .unwrap();

        let raw = mac_response(&session, &[0x11; 15]);
        let err = session.unwrap_response(&raw).unwrap_err();

        assert_eq!(err, Error::BadPadding);
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.session_keys().is_none());
    }

    #[test]
    fn test_unprotected_error_status() {
        let mut session = active_session();
        session
            .wrap_command(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
            .unwrap();

        let response = session.unwrap_response(&hex!("6A88")).unwrap();
        assert_eq!(response.status(), StatusWord::new(0x6A, 0x88));
        assert!(response.payload().is_empty());
        assert_eq!(session.state(), SessionState::SecureChannelActive);
    }

    #[test]
    fn test_unwrap_needs_wrapped_command() {
        let mut session = active_session();
        let err = session.unwrap_response(&hex!("9000")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
        assert_eq!(session.state(), SessionState::SecureChannelActive);
    }

    #[test]
    fn test_mac_only_level() {
        let config = ChannelConfig::new().with_security_level(SecurityLevel::C_MAC);
        let mut session = Session::with_config(config);
        session
            .build_initialize_update(0x00, &HOST_CHALLENGE)
            .unwrap();
        session
            .load_initialize_update_response(
                &INITIALIZE_UPDATE_RESPONSE,
                &StaticKeys::default_keys(),
            )
            .unwrap();
        let external_authenticate = session.build_external_authenticate().unwrap();
        assert_eq!(external_authenticate.to_command().p1(), 0x01);

        let data = hex!("0102030405");
        let wrapped = session
            .wrap_command(&Command::new(0x80, 0xE2, 0x90, 0x00).with_data(data.to_vec()))
            .unwrap();
        assert_eq!(wrapped.class(), 0x84);
        assert_eq!(wrapped.data().len(), data.len() + MAC_LENGTH);
        assert_eq!(&wrapped.data()[..data.len()], data);

        // No R-MAC expected: the body is returned untouched
        let response = session.unwrap_response(&hex!("AABBCC9000")).unwrap();
        assert_eq!(response.payload(), hex!("AABBCC"));
    }

    #[test]
    fn test_data_too_long() {
        let mut session = active_session();
        let command = Command::new(0x80, 0xE2, 0x00, 0x00).with_data(vec![0u8; 240]);

        let err = session.wrap_command(&command).unwrap_err();
        assert_eq!(err, Error::DataTooLong(264));
        assert_eq!(session.state(), SessionState::SecureChannelActive);
        assert_eq!(session.encryption_counter(), 1);

        let command = Command::new(0x80, 0xE2, 0x00, 0x00).with_data(vec![0u8; 231]);
        let wrapped = session.wrap_command(&command).unwrap();
        assert_eq!(wrapped.data().len(), 240 + MAC_LENGTH);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let session = active_session();
        let debug = format!("{session:?}");
        assert!(debug.contains("SecureChannelActive"));
        assert!(!debug.contains("host_challenge"));
    }
}
