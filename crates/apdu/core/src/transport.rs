//! Transport boundary for card communication
//!
//! A transport moves raw APDU bytes to the card and back. It knows nothing
//! about command structure or secure messaging.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::{Command, Response, Result};

/// Trait for card transports
pub trait CardTransport: fmt::Debug {
    /// Send raw APDU bytes to the card and return the response bytes
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => trace!(response = %hex::encode(response), "Received raw response"),
            Err(e) => debug!(error = ?e, "Transport error during transmission"),
        }
        result
    }

    /// Internal implementation of [`transmit_raw`](Self::transmit_raw)
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Serialize a command, send it and parse the response
    fn transmit(&mut self, command: &Command) -> Result<Response> {
        command.validate()?;
        let raw = self.transmit_raw(&command.to_bytes())?;
        Response::from_bytes(&raw)
    }

    /// Reset the transport connection
    fn reset(&mut self) -> Result<()>;
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        (**self).do_transmit_raw(command)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}
