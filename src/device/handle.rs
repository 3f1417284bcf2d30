//! Device Handle - public lifecycle API for one attached pad
//!
//! [`attach`] runs discovery and, only if it succeeds, spawns the poll worker.
//! The returned [`DeviceHandle`] is the single way to reach that worker:
//! cadence changes, rediscovery, the debug surface and [`DeviceHandle::detach`]
//! all go through it. Handles share nothing with each other, so several pads
//! can be attached side by side.
//!
//! ```text
//! DeviceHandle ─[LinkCommand]──────► poll worker ─[PollSample]─► watch
//!              ─[PollInterval]─────►   (owns client + sink)
//!              ─CancellationToken──►
//! ```

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::error::{ConfigurationError, DiscoveryFailed, LinkError};
use super::link::{DeviceLink, LinkCommand, TopologySlot};
use super::poll::PollSample;
use super::topology::DeviceTopology;
use super::DeviceSettings;
use crate::protocol::{RegisterTransport, TransportError};
use crate::sink::{EventSink, PollInterval};

/// Attaches a pad: discovers its layout, configures the sink's axes and
/// starts polling. Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns [`DiscoveryFailed`] if any handshake step fails. Nothing is
/// spawned in that case.
pub async fn attach(
    transport: Box<dyn RegisterTransport>,
    sink: Box<dyn EventSink>,
    settings: DeviceSettings,
) -> Result<DeviceHandle, DiscoveryFailed> {
    info!("Attaching device over {:?}", transport);

    let link = DeviceLink::create(transport, sink, settings)
        .negotiate()
        .await?;
    let topology = link.topology_slot();
    let samples = link.subscribe();

    let (interval_tx, interval_rx) = watch::channel(settings.poll_interval);
    let (command_tx, command_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let worker = tokio::spawn(link.run(command_rx, interval_rx, cancel.clone()));
    debug!("Poll worker spawned");

    info!("Device attached");
    Ok(DeviceHandle {
        topology,
        samples,
        interval: interval_tx,
        commands: command_tx,
        cancel,
        worker: Some(worker),
    })
}

/// Handle for one attached pad. Dropping it stops polling.
#[derive(Debug)]
pub struct DeviceHandle {
    topology: TopologySlot,
    samples: watch::Receiver<Option<PollSample>>,
    interval: watch::Sender<PollInterval>,
    commands: mpsc::Sender<LinkCommand>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl DeviceHandle {
    /// Current topology; `None` after a failed rediscovery.
    pub async fn topology(&self) -> Option<DeviceTopology> {
        self.topology.get().await
    }

    pub fn latest_sample(&self) -> Option<PollSample> {
        self.samples.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PollSample>> {
        self.samples.clone()
    }

    pub fn poll_interval(&self) -> PollInterval {
        *self.interval.borrow()
    }

    /// Changes the poll cadence. Values outside 8..=32ms are rejected.
    pub fn set_poll_interval(&self, ms: u64) -> Result<(), ConfigurationError> {
        let interval = PollInterval::new(ms)?;
        self.interval.send_replace(interval);
        Ok(())
    }

    /// Runs the handshake again between two ticks and swaps in the result.
    pub async fn rediscover(&self) -> Result<DeviceTopology, LinkError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LinkCommand::Rediscover { response_tx }).await?;
        Ok(response_rx.await.map_err(|_| LinkError::Detached)??)
    }

    /// Writes a raw byte into STATUS, serialized with polling.
    pub async fn inject_status(&self, raw: u8) -> Result<(), LinkError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LinkCommand::InjectStatus { raw, response_tx })
            .await?;
        Ok(response_rx.await.map_err(|_| LinkError::Detached)??)
    }

    pub async fn request_calibration(&self) -> Result<(), LinkError> {
        let (response_tx, response_rx) = oneshot::channel::<Result<(), TransportError>>();
        self.send(LinkCommand::Calibrate { response_tx }).await?;
        Ok(response_rx.await.map_err(|_| LinkError::Detached)??)
    }

    /// Text dump of the topology and the most recent sample.
    pub async fn debug_dump(&self) -> String {
        let topology = self.topology().await;
        match self.latest_sample() {
            Some(sample) => sample.render(topology.as_ref()),
            None => match topology {
                Some(t) => format!(
                    "topology: {} joysticks @ {:#04x}, {} buttons @ {:#04x}\nno sample yet\n",
                    t.joystick_count(),
                    t.joystick_register_start(),
                    t.button_count(),
                    t.button_register_start()
                ),
                None => "topology: none\nno sample yet\n".to_string(),
            },
        }
    }

    /// Stops the poll worker and waits for it to finish.
    pub async fn detach(mut self) {
        info!("Detaching device");
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("Poll worker ended abnormally: {}", e);
            }
        }
        info!("Device detached");
    }

    async fn send(&self, command: LinkCommand) -> Result<(), LinkError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LinkError::Detached)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
