//! Command APDU definition
//!
//! Only short-form APDUs are supported: `Lc` and `Le` are single bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Largest data field a short APDU can carry
pub const MAX_SHORT_DATA_LENGTH: usize = 255;

/// Short-form command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected response length (optional)
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1)
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2)
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command payload, empty when absent
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Expected response length
    pub const fn expected_length(&self) -> Option<u8> {
        self.le
    }

    /// Check that the data field fits a short APDU
    pub fn validate(&self) -> Result<()> {
        let len = self.data().len();
        if len > MAX_SHORT_DATA_LENGTH {
            return Err(Error::DataTooLong(len));
        }
        Ok(())
    }

    /// Serialize to raw APDU bytes
    ///
    /// An empty data field is encoded without `Lc`. Callers that accept
    /// arbitrary payloads should [`validate`](Self::validate) first.
    pub fn to_bytes(&self) -> Bytes {
        let data = self.data();
        let mut buffer = BytesMut::with_capacity(6 + data.len());

        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if !data.is_empty() {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let (header, body) = raw
            .split_first_chunk::<4>()
            .ok_or(Error::InvalidCommandLength(raw.len()))?;
        let [cla, ins, p1, p2] = *header;
        let mut command = Self::new(cla, ins, p1, p2);

        match body {
            [] => {}
            [le] => command.le = Some(*le),
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                match rest.len().checked_sub(lc) {
                    Some(0) => {}
                    Some(1) => command.le = Some(rest[lc]),
                    _ => return Err(Error::InvalidCommandLength(raw.len())),
                }
                command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
            }
        }

        Ok(command)
    }
}
