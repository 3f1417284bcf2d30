//! Event sink boundary
//!
//! The poll decoder pushes every tick's values into an [`EventSink`] and
//! closes the tick with [`EventSink::end_batch`], so consumers see whole
//! snapshots instead of a trickle of partial updates.
//!
//! ```text
//! PollDecoder ──report_axis/report_button──► EventSink ──end_batch──► consumer
//! ```
//!
//! Filtering (fuzz, flat, change suppression) is a consumer concern; the
//! [`filter::InputFilter`] provides it for the sinks in this crate.

pub mod channel;
pub mod filter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::device::error::ConfigurationError;

pub use channel::{ChannelSink, InputBatch, InputChange, LoggingSink};
pub use filter::InputFilter;

/// One of the two axes of a joystick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// Identifies a single analog axis on the pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AxisId {
    pub joystick: u8,
    pub axis: Axis,
}

impl AxisId {
    pub fn x(joystick: u8) -> Self {
        Self {
            joystick,
            axis: Axis::X,
        }
    }

    pub fn y(joystick: u8) -> Self {
        Self {
            joystick,
            axis: Axis::Y,
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joystick{}.{:?}", self.joystick, self.axis)
    }
}

/// Range and filtering parameters handed to the sink once per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisParams {
    pub min: u16,
    pub max: u16,
    /// Changes smaller than this are treated as jitter
    pub fuzz: u16,
    /// Deadzone radius around the center
    pub flat: u16,
}

impl AxisParams {
    pub const JOYSTICK_MAX: u16 = 1023;
    pub const JOYSTICK_FUZZ: u16 = 8;
    pub const JOYSTICK_FLAT: u16 = 32;

    pub fn center(&self) -> u16 {
        self.min + (self.max.saturating_sub(self.min)) / 2
    }
}

impl Default for AxisParams {
    fn default() -> Self {
        Self {
            min: 0,
            max: Self::JOYSTICK_MAX,
            fuzz: Self::JOYSTICK_FUZZ,
            flat: Self::JOYSTICK_FLAT,
        }
    }
}

/// Downstream consumer of decoded pad input
///
/// Calls are fire-and-forget; the decoder never inspects a result.
pub trait EventSink: Send + fmt::Debug {
    /// Announces an axis and its range. Called once per axis after discovery.
    fn configure_axis(&mut self, axis: AxisId, params: AxisParams);

    fn report_axis(&mut self, axis: AxisId, value: u16);

    fn report_button(&mut self, button: u16, pressed: bool);

    /// Commits everything reported since the previous call.
    fn end_batch(&mut self);
}

/// Poll cadence in milliseconds, bounded to `[MIN_MS, MAX_MS]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PollInterval(u64);

impl PollInterval {
    pub const DEFAULT_MS: u64 = 16;
    pub const MIN_MS: u64 = 8;
    pub const MAX_MS: u64 = 32;

    /// Rejects values outside the supported range.
    pub fn new(ms: u64) -> Result<Self, ConfigurationError> {
        if (Self::MIN_MS..=Self::MAX_MS).contains(&ms) {
            Ok(Self(ms))
        } else {
            Err(ConfigurationError::PollIntervalOutOfRange {
                requested: ms,
                min: Self::MIN_MS,
                max: Self::MAX_MS,
            })
        }
    }

    pub fn clamped(ms: u64) -> Self {
        Self(ms.clamp(Self::MIN_MS, Self::MAX_MS))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_MS)
    }
}
