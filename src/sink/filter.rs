//! Consumer-side input filtering
//!
//! Mirrors what an input subsystem does with the axis parameters it was
//! given: values inside the flat zone snap to center, small changes are
//! defuzzed against the previous value, and anything that did not change is
//! not forwarded at all. Buttons only produce a change when their state flips.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::{AxisId, AxisParams, InputChange};

#[derive(Debug, Clone, Copy)]
struct AxisState {
    params: AxisParams,
    value: Option<u16>,
}

#[derive(Debug, Default)]
pub struct InputFilter {
    axes: HashMap<AxisId, AxisState>,
    buttons: HashMap<u16, bool>,
}

impl InputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an axis, forgetting any previous value for it.
    pub fn configure(&mut self, axis: AxisId, params: AxisParams) {
        debug!("Configuring {} with {:?}", axis, params);
        self.axes.insert(
            axis,
            AxisState {
                params,
                value: None,
            },
        );
    }

    /// Returns the value to forward, or `None` when nothing changed.
    pub fn filter_axis(&mut self, axis: AxisId, raw: u16) -> Option<u16> {
        let state = self.axes.entry(axis).or_insert_with(|| {
            warn!("Report for unconfigured axis {}, using default parameters", axis);
            AxisState {
                params: AxisParams::default(),
                value: None,
            }
        });

        let value = apply_flat(raw.max(state.params.min).min(state.params.max), &state.params);
        let value = match state.value {
            Some(old) => defuzz(old, value, state.params.fuzz),
            None => value,
        };

        if state.value == Some(value) {
            return None;
        }
        state.value = Some(value);
        Some(value)
    }

    /// Returns the state to forward, or `None` when it repeats the last one.
    pub fn filter_button(&mut self, button: u16, pressed: bool) -> Option<bool> {
        match self.buttons.insert(button, pressed) {
            Some(previous) if previous == pressed => None,
            _ => Some(pressed),
        }
    }

    /// Runs a change through the matching filter.
    pub fn filter(&mut self, change: InputChange) -> Option<InputChange> {
        match change {
            InputChange::Axis { axis, value } => self
                .filter_axis(axis, value)
                .map(|value| InputChange::Axis { axis, value }),
            InputChange::Button { button, pressed } => self
                .filter_button(button, pressed)
                .map(|pressed| InputChange::Button { button, pressed }),
        }
    }
}

fn apply_flat(value: u16, params: &AxisParams) -> u16 {
    let center = params.center();
    if value.abs_diff(center) <= params.flat {
        center
    } else {
        value
    }
}

fn defuzz(old: u16, value: u16, fuzz: u16) -> u16 {
    if fuzz == 0 {
        return value;
    }
    let (old_i, value_i, fuzz_i) = (i32::from(old), i32::from(value), i32::from(fuzz));
    let delta = (value_i - old_i).abs();

    if delta < fuzz_i / 2 {
        old
    } else if delta < fuzz_i {
        ((old_i * 3 + value_i) / 4) as u16
    } else if delta < fuzz_i * 2 {
        ((old_i + value_i) / 2) as u16
    } else {
        value
    }
}
