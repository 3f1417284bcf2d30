//! Linux I2C transport backed by `rppal`
//!
//! Uses the SMBus byte and word primitives of `/dev/i2c-N`. SMBus transfers a
//! word low byte first, so the first byte on the wire is the low byte of the
//! value rppal hands back.

use rppal::i2c::I2c;
use std::fmt;
use tracing::{debug, info};

use super::{RegisterTransport, TransportError};

pub struct RppalTransport {
    i2c: I2c,
    bus: u8,
    address: u16,
}

impl RppalTransport {
    /// Opens the given bus and binds it to the pad's slave address.
    pub fn open(bus: u8, address: u16) -> Result<Self, rppal::i2c::Error> {
        info!("Opening I2C bus {} for slave {:#04x}", bus, address);
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        debug!("I2C bus {} ready", bus);
        Ok(Self { i2c, bus, address })
    }
}

impl fmt::Debug for RppalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RppalTransport")
            .field("bus", &self.bus)
            .field("address", &format_args!("{:#04x}", self.address))
            .finish()
    }
}

fn bus_error(register: u8, err: rppal::i2c::Error) -> TransportError {
    TransportError::bus(register, err.to_string())
}

impl RegisterTransport for RppalTransport {
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.i2c
            .smbus_write_byte(register, value)
            .map_err(|e| bus_error(register, e))
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, TransportError> {
        self.i2c
            .smbus_read_byte(register)
            .map_err(|e| bus_error(register, e))
    }

    fn read_word(&mut self, register: u8) -> Result<[u8; 2], TransportError> {
        self.i2c
            .smbus_read_word(register)
            .map(u16::to_le_bytes)
            .map_err(|e| bus_error(register, e))
    }
}
