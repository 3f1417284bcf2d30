//! Discovery handshake
//!
//! Four write-then-read exchanges over STATUS/REQ_DATA build one
//! [`DeviceTopology`]. Each command advances state inside the pad, so the
//! sequence runs exactly once per attach and never alongside polling.

use tracing::{debug, error, info, warn};

use super::error::{ConfigurationError, DiscoveryFailed, DiscoveryStep};
use super::topology::DeviceTopology;
use crate::protocol::RegisterClient;

/// Runs the full handshake. Nothing is returned unless every step succeeded.
pub fn negotiate(client: &mut RegisterClient) -> Result<DeviceTopology, DiscoveryFailed> {
    info!("Starting discovery handshake");

    let raw = exchange(client, DiscoveryStep::JoystickCount)?;
    let joystick_count = u8::try_from(raw).map_err(|_| {
        let err = DiscoveryFailed::new(
            DiscoveryStep::JoystickCount,
            ConfigurationError::OutOfRange {
                field: "joystick_count",
                value: u32::from(raw),
                max: u32::from(u8::MAX),
            },
        );
        error!("{}", err);
        err
    })?;

    let button_count = exchange(client, DiscoveryStep::ButtonCount)?;

    let raw = exchange(client, DiscoveryStep::JoystickStart)?;
    let joystick_start = low_byte(DiscoveryStep::JoystickStart, raw);

    let raw = exchange(client, DiscoveryStep::ButtonStart)?;
    let button_start = low_byte(DiscoveryStep::ButtonStart, raw);

    let topology = DeviceTopology::new(joystick_count, joystick_start, button_count, button_start);
    info!(
        "Discovered {} joysticks at {:#04x}, {} buttons at {:#04x}",
        topology.joystick_count(),
        topology.joystick_register_start(),
        topology.button_count(),
        topology.button_register_start()
    );
    Ok(topology)
}

fn exchange(client: &mut RegisterClient, step: DiscoveryStep) -> Result<u16, DiscoveryFailed> {
    let answer = client
        .write_status(step.command())
        .and_then(|_| client.read_request_data())
        .map_err(|e| DiscoveryFailed::new(step, e))
        .inspect_err(|e| error!("{}", e))?;
    debug!("Step '{}' answered {:#06x}", step, answer);
    Ok(answer)
}

fn low_byte(step: DiscoveryStep, raw: u16) -> u8 {
    let [high, low] = raw.to_be_bytes();
    if high != 0 {
        warn!(
            "Step '{}' answered {:#06x}, using low byte {:#04x}",
            step, raw, low
        );
    }
    low
}
