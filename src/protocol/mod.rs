//! Register protocol for the ospad peripheral
//!
//! The pad is a plain I2C register device. Two control registers drive the
//! discovery handshake:
//!
//! ```text
//! host ── write STATUS ← command ──► pad   (pad prepares the answer)
//! host ◄── read  REQ_DATA (BE word) ── pad
//! ```
//!
//! Everything else (joystick words, button bitmaps) lives in a data region
//! whose offsets the pad reports during discovery. Multi-byte values are
//! big-endian on the wire.

pub mod rppal_transport;

use std::fmt;
use tracing::trace;

pub use rppal_transport::RppalTransport;

/// Control register receiving [`StatusCommand`] bytes
pub const REG_STATUS: u8 = 1;

/// Control register holding the answer to the last STATUS request
pub const REG_REQ_DATA: u8 = 2;

/// Commands understood by the STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCommand {
    Ok = 0,
    Reserved = 1,
    ReqJoysCount = 2,
    ReqBtnCount = 3,
    ReqJoysStart = 4,
    ReqBtnStart = 5,
    ReqCalibrate = 6,
    Calibrating = 7,
}

impl StatusCommand {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for StatusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// A single register access failed on the bus
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("bus error on register {register:#04x}: {message}")]
    Bus { register: u8, message: String },
}

impl TransportError {
    pub fn bus(register: u8, message: impl Into<String>) -> Self {
        TransportError::Bus {
            register,
            message: message.into(),
        }
    }

    pub fn register(&self) -> u8 {
        match self {
            TransportError::Bus { register, .. } => *register,
        }
    }
}

/// Byte-level access to the pad's registers
///
/// Implementations are blocking and perform no retries.
pub trait RegisterTransport: Send + fmt::Debug {
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), TransportError>;

    fn read_byte(&mut self, register: u8) -> Result<u8, TransportError>;

    /// Reads two bytes starting at `register`, returned in wire order.
    ///
    /// The default issues two byte reads; transports with a native word
    /// transfer should override it.
    fn read_word(&mut self, register: u8) -> Result<[u8; 2], TransportError> {
        let first = self.read_byte(register)?;
        let second = self.read_byte(register.wrapping_add(1))?;
        Ok([first, second])
    }
}

/// Thin synchronous translation layer between register semantics and the
/// transport. Byte order conversion happens here and nowhere else.
#[derive(Debug)]
pub struct RegisterClient {
    transport: Box<dyn RegisterTransport>,
}

impl RegisterClient {
    pub fn new(transport: Box<dyn RegisterTransport>) -> Self {
        Self { transport }
    }

    /// Writes a command into STATUS. The pad prepares the answer on its own.
    pub fn write_status(&mut self, command: StatusCommand) -> Result<(), TransportError> {
        trace!("STATUS <- {}", command);
        self.transport.write_byte(REG_STATUS, command.code())
    }

    /// Writes an arbitrary byte into STATUS, bypassing the command table.
    pub fn inject_status(&mut self, raw: u8) -> Result<(), TransportError> {
        trace!("STATUS <- raw {:#04x}", raw);
        self.transport.write_byte(REG_STATUS, raw)
    }

    pub fn read_request_data(&mut self) -> Result<u16, TransportError> {
        self.read_word(REG_REQ_DATA)
    }

    pub fn read_byte(&mut self, register: u8) -> Result<u8, TransportError> {
        let value = self.transport.read_byte(register)?;
        trace!("read byte {:#04x} = {:#04x}", register, value);
        Ok(value)
    }

    pub fn read_word(&mut self, register: u8) -> Result<u16, TransportError> {
        let bytes = self.transport.read_word(register)?;
        let value = u16::from_be_bytes(bytes);
        trace!("read word {:#04x} = {:#06x}", register, value);
        Ok(value)
    }
}
