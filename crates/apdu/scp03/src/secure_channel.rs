//! Secure channel bound to a card transport
//!
//! [`Scp03Channel`] runs the handshake over a [`CardTransport`] and then
//! protects every command sent through it.

use scp03_apdu_core::{CardTransport, Command, Response};
use tracing::{debug, trace, warn};

use crate::{
    Error, Result,
    commands::{InitializeUpdateCommand, PutKeyCommand, PutKeyResponse},
    config::ChannelConfig,
    keys::StaticKeys,
    session::Session,
};

/// An open SCP03 secure channel
#[derive(Debug)]
pub struct Scp03Channel<T: CardTransport> {
    transport: T,
    session: Session,
    static_keys: StaticKeys,
}

impl<T: CardTransport> Scp03Channel<T> {
    /// Open a channel with a random host challenge
    pub fn open(transport: T, static_keys: &StaticKeys, config: ChannelConfig) -> Result<Self> {
        let mut session = Session::with_config(config);
        let initialize_update =
            session.build_initialize_update_random(config.key_version_number)?;
        Self::authenticate(transport, session, &initialize_update, static_keys)
    }

    /// Open a channel with a caller-supplied host challenge
    pub fn open_with_challenge(
        transport: T,
        static_keys: &StaticKeys,
        config: ChannelConfig,
        host_challenge: &[u8],
    ) -> Result<Self> {
        let mut session = Session::with_config(config);
        let initialize_update =
            session.build_initialize_update(config.key_version_number, host_challenge)?;
        Self::authenticate(transport, session, &initialize_update, static_keys)
    }

    fn authenticate(
        mut transport: T,
        mut session: Session,
        initialize_update: &InitializeUpdateCommand,
        static_keys: &StaticKeys,
    ) -> Result<Self> {
        debug!(
            key_version = session.key_version_number(),
            security_level = %session.security_level(),
            "Opening SCP03 secure channel"
        );

        let response = transport.transmit_raw(&initialize_update.to_command().to_bytes())?;
        session.load_initialize_update_response(&response, static_keys)?;

        let external_authenticate = session.build_external_authenticate()?;
        let response = transport.transmit(&external_authenticate.to_command())?;
        if !response.is_success() {
            warn!(status = %response.status(), "EXTERNAL AUTHENTICATE rejected");
            return Err(Error::CardStatus(response.status()));
        }

        debug!("SCP03 secure channel established");
        Ok(Self {
            transport,
            session,
            static_keys: static_keys.clone(),
        })
    }

    /// Send a command through the channel and return the unprotected response
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        trace!(command = %hex::encode(command.to_bytes()), "Sending command over secure channel");

        let wrapped = self.session.wrap_command(command)?;
        let raw = self.transport.transmit_raw(&wrapped.to_bytes())?;
        let response = self.session.unwrap_response(&raw)?;

        trace!(
            status = %response.status(),
            payload_len = response.payload().len(),
            "Received response over secure channel"
        );
        Ok(response)
    }

    /// Load a new key set, protected with the current data encryption key
    ///
    /// `current_key_version` is the version being replaced, or `0` to add a
    /// new key set. The check values the card returns are verified. When the
    /// set this channel was opened with is replaced, later PUT KEY commands
    /// are protected with the new DEK.
    pub fn put_key(
        &mut self,
        current_key_version: u8,
        new_keys: &StaticKeys,
    ) -> Result<PutKeyResponse> {
        let command = PutKeyCommand::new(
            current_key_version,
            new_keys,
            self.static_keys.data_encryption_key(),
        );
        debug!(
            current_key_version,
            new_key_version = command.new_key_version,
            "Sending PUT KEY"
        );

        let response = self.transmit(&command.to_command())?;
        if !response.is_success() {
            return Err(Error::CardStatus(response.status()));
        }

        let put_key = PutKeyResponse::parse(response.payload())?;
        put_key.verify(&command)?;

        if current_key_version == self.static_keys.key_version_number() {
            debug!(
                key_version = new_keys.key_version_number(),
                "Replaced the key set in use"
            );
            self.static_keys = new_keys.clone();
        }
        Ok(put_key)
    }

    /// Underlying session
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Close the channel, wiping the session, and hand back the transport
    pub fn close(self) -> T {
        debug!("Closing SCP03 secure channel");
        self.transport
    }
}
