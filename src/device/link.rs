//! Per-device lifecycle
//!
//! A [`DeviceLink`] owns the register client and the sink of one attached pad
//! and moves through two states:
//!
//! ```text
//! Negotiating ──negotiate()──► Polling ──run()──► (cancelled)
//!                                 │  ▲
//!                                 └──┘ rediscover()
//! ```
//!
//! The discovered topology lives in a [`TopologySlot`]. Discovery holds the
//! slot's write lock for the whole handshake; every poll tick holds a read
//! lock, so a tick never sees a topology that is being replaced.

use chrono::Local;
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::discovery;
use super::error::DiscoveryFailed;
use super::poll::{PollDecoder, PollSample};
use super::topology::DeviceTopology;
use super::DeviceSettings;
use crate::protocol::{RegisterClient, RegisterTransport, StatusCommand, TransportError};
use crate::sink::{AxisId, EventSink, PollInterval};

/// Shared home of the current topology; empty until discovery succeeds
#[derive(Debug, Clone, Default)]
pub struct TopologySlot(Arc<RwLock<Option<DeviceTopology>>>);

impl TopologySlot {
    pub async fn get(&self) -> Option<DeviceTopology> {
        *self.0.read().await
    }
}

/// Requests the handle sends to the poll worker
#[derive(Debug)]
pub enum LinkCommand {
    Rediscover {
        response_tx: oneshot::Sender<Result<DeviceTopology, DiscoveryFailed>>,
    },
    InjectStatus {
        raw: u8,
        response_tx: oneshot::Sender<Result<(), TransportError>>,
    },
    Calibrate {
        response_tx: oneshot::Sender<Result<(), TransportError>>,
    },
}

#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Negotiating,
    Polling,
}

#[machine]
pub struct DeviceLink<S: LinkState> {
    client: RegisterClient,
    sink: Box<dyn EventSink>,
    settings: DeviceSettings,
    decoder: PollDecoder,
    topology: TopologySlot,
    samples: watch::Sender<Option<PollSample>>,
}

impl<S: LinkState> DeviceLink<S> {
    pub fn topology_slot(&self) -> TopologySlot {
        self.topology.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PollSample>> {
        self.samples.subscribe()
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Runs the handshake under the slot's write lock and, on success,
    /// announces every axis to the sink before publishing the topology.
    async fn discover(&mut self) -> Result<DeviceTopology, DiscoveryFailed> {
        let mut slot = self.topology.0.write().await;
        if slot.take().is_some() {
            debug!("Cleared previous topology");
        }
        self.samples.send_replace(None);

        let topology = discovery::negotiate(&mut self.client)?;
        for joystick in 0..topology.joystick_count() {
            self.sink
                .configure_axis(AxisId::x(joystick), self.settings.axis);
            self.sink
                .configure_axis(AxisId::y(joystick), self.settings.axis);
        }
        debug!("Each tick issues {} register reads", topology.reads_per_tick());
        *slot = Some(topology);
        Ok(topology)
    }
}

impl DeviceLink<Negotiating> {
    pub fn create(
        transport: Box<dyn RegisterTransport>,
        sink: Box<dyn EventSink>,
        settings: DeviceSettings,
    ) -> Self {
        debug!("Creating device link with settings: {:?}", settings);
        let (samples, _) = watch::channel(None);
        Self::new(
            RegisterClient::new(transport),
            sink,
            settings,
            PollDecoder::new(),
            TopologySlot::default(),
            samples,
        )
    }

    /// Discovers the pad and transitions to Polling. On failure the link is
    /// dropped and the slot was never filled.
    pub async fn negotiate(mut self) -> Result<DeviceLink<Polling>, DiscoveryFailed> {
        self.discover().await?;
        info!("Device link negotiated, transitioning to Polling state");
        Ok(self.transition())
    }
}

impl DeviceLink<Polling> {
    /// Decodes and emits one tick. Returns `None` while no topology is
    /// published (after a failed rediscovery).
    pub async fn poll_once(&mut self) -> Option<PollSample> {
        let slot = self.topology.0.read().await;
        let topology = (*slot)?;
        let sample = self.decoder.decode(&mut self.client, &topology);
        sample.emit(self.sink.as_mut());
        drop(slot);

        self.samples.send_replace(Some(sample.clone()));
        Some(sample)
    }

    /// Replaces the topology. Polling is quiesced for the duration because
    /// the write lock excludes every tick.
    pub async fn rediscover(&mut self) -> Result<DeviceTopology, DiscoveryFailed> {
        info!("Rediscovering device topology");
        self.discover().await.inspect_err(|e| {
            warn!("Rediscovery failed, polling suspended: {}", e);
        })
    }

    pub fn inject_status(&mut self, raw: u8) -> Result<(), TransportError> {
        info!("Injecting raw STATUS command {:#04x}", raw);
        self.client.inject_status(raw)
    }

    pub fn request_calibration(&mut self) -> Result<(), TransportError> {
        info!("Requesting calibration");
        self.client.write_status(StatusCommand::ReqCalibrate)
    }

    async fn handle_command(&mut self, command: LinkCommand) {
        match command {
            LinkCommand::Rediscover { response_tx } => {
                let result = self.rediscover().await;
                if response_tx.send(result).is_err() {
                    error!("Failed to send rediscovery response");
                }
            }
            LinkCommand::InjectStatus { raw, response_tx } => {
                if response_tx.send(self.inject_status(raw)).is_err() {
                    error!("Failed to send inject response");
                }
            }
            LinkCommand::Calibrate { response_tx } => {
                if response_tx.send(self.request_calibration()).is_err() {
                    error!("Failed to send calibration response");
                }
            }
        }
    }

    /// Poll loop. Runs until cancelled or until the handle goes away.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<LinkCommand>,
        mut interval_rx: watch::Receiver<PollInterval>,
        cancel: CancellationToken,
    ) {
        let mut period = *interval_rx.borrow_and_update();
        let mut ticker = make_ticker(period);
        info!("Starting poll loop every {}ms", period.as_millis());

        let mut ticks: u64 = 0;
        let mut degraded: u64 = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Poll loop cancelled");
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("Command channel closed, stopping poll loop");
                        break;
                    }
                },
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        debug!("Interval channel closed, stopping poll loop");
                        break;
                    }
                    let requested = *interval_rx.borrow_and_update();
                    if requested != period {
                        info!("Poll interval {}ms -> {}ms", period.as_millis(), requested.as_millis());
                        period = requested;
                        ticker = make_ticker(period);
                    }
                }
                _ = ticker.tick() => {
                    if let Some(sample) = self.poll_once().await {
                        ticks += 1;
                        if sample.unavailable_fields() > 0 {
                            degraded += 1;
                        }
                    }
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Poll stats: {} ticks in last {} seconds, {} with unavailable fields",
                    ticks,
                    log_interval.num_seconds(),
                    degraded
                );
                ticks = 0;
                degraded = 0;
                last_log_time = now;
            }
        }
    }
}

fn make_ticker(period: PollInterval) -> Interval {
    let mut ticker = interval(period.as_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
