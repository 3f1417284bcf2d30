//! Device subsystem for one attached pad
//!
//! Implements a discover-then-poll pipeline:
//!
//! 1. [`discovery`] - Four-step handshake producing a [`DeviceTopology`]
//! 2. [`poll`] - Register decode into [`PollSample`]s, one per tick
//! 3. [`link`] - State machine and poll worker tying both to a sink
//! 4. [`handle`] - `attach`/`detach` and the control surface
//!
//! # Architecture
//!
//! ```text
//! Transport ──► RegisterClient ──► Discovery ──► TopologySlot
//!                      │                              │ (read per tick)
//!                      └──────────► PollDecoder ◄─────┘
//!                                        │
//!                                        ▼
//!                                    EventSink
//! ```

pub mod discovery;
pub mod error;
pub mod handle;
pub mod link;
pub mod poll;
pub mod topology;

use crate::sink::{AxisParams, PollInterval};

pub use error::{ConfigurationError, DiscoveryCause, DiscoveryFailed, DiscoveryStep, LinkError};
pub use handle::{attach, DeviceHandle};
pub use link::{DeviceLink, TopologySlot};
pub use poll::{JoystickSample, PollDecoder, PollSample};
pub use topology::DeviceTopology;

/// Per-device settings handed to [`attach`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSettings {
    pub poll_interval: PollInterval,
    pub axis: AxisParams,
}
