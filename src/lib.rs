//! Discovery and polling core for the ospad I2C game pad
//!
//! The pad reports how many joysticks and buttons it has and where their
//! registers start; this crate negotiates that layout once per attach and
//! then polls it on a timer, pushing axis and button reports into an
//! [`sink::EventSink`].
//!
//! ```rust,no_run
//! use ospad::device::{attach, DeviceSettings};
//! use ospad::protocol::RppalTransport;
//! use ospad::sink::LoggingSink;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = RppalTransport::open(3, 0x67)?;
//! let handle = attach(
//!     Box::new(transport),
//!     Box::new(LoggingSink::new()),
//!     DeviceSettings::default(),
//! )
//! .await?;
//! println!("{}", handle.debug_dump().await);
//! handle.detach().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod protocol;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;
