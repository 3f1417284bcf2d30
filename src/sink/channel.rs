//! Ready-made sinks: a channel forwarder and a tracing logger
//!
//! Both run reports through an [`InputFilter`] so only meaningful changes
//! leave the sink.

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{AxisId, AxisParams, EventSink, InputFilter};

/// A filtered change leaving a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChange {
    Axis { axis: AxisId, value: u16 },
    Button { button: u16, pressed: bool },
}

impl InputChange {
    /// True when both changes describe the same axis or the same button.
    pub fn same_input(&self, other: &InputChange) -> bool {
        match (self, other) {
            (InputChange::Axis { axis: a, .. }, InputChange::Axis { axis: b, .. }) => a == b,
            (InputChange::Button { button: a, .. }, InputChange::Button { button: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

/// Everything that changed during one poll tick
#[derive(Debug, Clone)]
pub struct InputBatch {
    pub changes: Vec<InputChange>,
    pub timestamp: DateTime<Local>,
}

/// Forwards one [`InputBatch`] per tick over an mpsc channel.
///
/// Ticks without changes are not sent. When the channel is full the changes
/// stay pending and go out with the next tick, newer values replacing older
/// ones for the same input.
#[derive(Debug)]
pub struct ChannelSink {
    filter: InputFilter,
    pending: Vec<InputChange>,
    sender: mpsc::Sender<InputBatch>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<InputBatch>) -> Self {
        Self {
            filter: InputFilter::new(),
            pending: Vec::new(),
            sender,
        }
    }

    fn push(&mut self, change: InputChange) {
        let Some(change) = self.filter.filter(change) else {
            return;
        };
        match self.pending.iter_mut().find(|p| p.same_input(&change)) {
            Some(pending) => *pending = change,
            None => self.pending.push(change),
        }
    }
}

impl EventSink for ChannelSink {
    fn configure_axis(&mut self, axis: AxisId, params: AxisParams) {
        self.filter.configure(axis, params);
    }

    fn report_axis(&mut self, axis: AxisId, value: u16) {
        self.push(InputChange::Axis { axis, value });
    }

    fn report_button(&mut self, button: u16, pressed: bool) {
        self.push(InputChange::Button { button, pressed });
    }

    fn end_batch(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = InputBatch {
            changes: std::mem::take(&mut self.pending),
            timestamp: Local::now(),
        };
        match self.sender.try_send(batch) {
            Ok(_) => debug!("Input batch forwarded"),
            Err(mpsc::error::TrySendError::Full(batch)) => {
                warn!(
                    "Input channel full, holding {} changes for the next tick",
                    batch.changes.len()
                );
                self.pending = batch.changes;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Input channel closed, batch discarded");
            }
        }
    }
}

/// Logs filtered changes through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingSink {
    filter: InputFilter,
    changes: usize,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for LoggingSink {
    fn configure_axis(&mut self, axis: AxisId, params: AxisParams) {
        info!(
            "Axis {} range {}..={} fuzz {} flat {}",
            axis, params.min, params.max, params.fuzz, params.flat
        );
        self.filter.configure(axis, params);
    }

    fn report_axis(&mut self, axis: AxisId, value: u16) {
        if let Some(value) = self.filter.filter_axis(axis, value) {
            debug!("{} = {}", axis, value);
            self.changes += 1;
        }
    }

    fn report_button(&mut self, button: u16, pressed: bool) {
        if let Some(pressed) = self.filter.filter_button(button, pressed) {
            info!(
                "Button {} {}",
                button,
                if pressed { "pressed" } else { "released" }
            );
            self.changes += 1;
        }
    }

    fn end_batch(&mut self) {
        if self.changes > 0 {
            debug!("Batch committed with {} changes", self.changes);
            self.changes = 0;
        }
    }
}
