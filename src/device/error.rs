//! Error types for discovery and device control

use std::fmt;
use thiserror::Error;

use crate::protocol::{StatusCommand, TransportError};

/// A value does not fit the field it is destined for
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{field} value {value} exceeds maximum {max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("poll interval {requested}ms outside {min}..={max}ms")]
    PollIntervalOutOfRange { requested: u64, min: u64, max: u64 },
}

/// The four handshake steps, in protocol order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryStep {
    JoystickCount,
    ButtonCount,
    JoystickStart,
    ButtonStart,
}

impl DiscoveryStep {
    pub const SEQUENCE: [DiscoveryStep; 4] = [
        DiscoveryStep::JoystickCount,
        DiscoveryStep::ButtonCount,
        DiscoveryStep::JoystickStart,
        DiscoveryStep::ButtonStart,
    ];

    pub fn command(self) -> StatusCommand {
        match self {
            DiscoveryStep::JoystickCount => StatusCommand::ReqJoysCount,
            DiscoveryStep::ButtonCount => StatusCommand::ReqBtnCount,
            DiscoveryStep::JoystickStart => StatusCommand::ReqJoysStart,
            DiscoveryStep::ButtonStart => StatusCommand::ReqBtnStart,
        }
    }
}

impl fmt::Display for DiscoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscoveryStep::JoystickCount => "joystick count",
            DiscoveryStep::ButtonCount => "button count",
            DiscoveryStep::JoystickStart => "joystick register start",
            DiscoveryStep::ButtonStart => "button register start",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryCause {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// The handshake aborted; no topology was published
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("discovery of {step} failed: {cause}")]
pub struct DiscoveryFailed {
    pub step: DiscoveryStep,
    #[source]
    pub cause: DiscoveryCause,
}

impl DiscoveryFailed {
    pub fn new(step: DiscoveryStep, cause: impl Into<DiscoveryCause>) -> Self {
        Self {
            step,
            cause: cause.into(),
        }
    }
}

/// Errors returned by [`super::DeviceHandle`] commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("device is detached")]
    Detached,

    #[error(transparent)]
    Discovery(#[from] DiscoveryFailed),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
