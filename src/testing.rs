//! In-memory fakes shared by the unit tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::{RegisterTransport, StatusCommand, TransportError, REG_REQ_DATA, REG_STATUS};
use crate::sink::{AxisId, AxisParams, EventSink};

#[derive(Debug, Default)]
struct BusState {
    registers: HashMap<u8, u8>,
    failing: HashSet<u8>,
    answers: HashMap<u8, u16>,
    failing_answers: HashSet<u8>,
    failing_writes: bool,
    status: Option<u8>,
    byte_reads: Vec<u8>,
    word_reads: Vec<u8>,
    writes: Vec<(u8, u8)>,
}

/// Fake pad: a register file plus a scripted STATUS/REQ_DATA responder.
///
/// Clones share state, so a test can keep one clone for inspection after the
/// other one was boxed into a client.
#[derive(Debug, Clone, Default)]
pub struct FakeBus {
    state: Arc<Mutex<BusState>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus answering the handshake with the given layout.
    pub fn with_layout(
        joystick_count: u16,
        button_count: u16,
        joystick_start: u16,
        button_start: u16,
    ) -> Self {
        let bus = Self::new();
        bus.answer(StatusCommand::ReqJoysCount, joystick_count);
        bus.answer(StatusCommand::ReqBtnCount, button_count);
        bus.answer(StatusCommand::ReqJoysStart, joystick_start);
        bus.answer(StatusCommand::ReqBtnStart, button_start);
        bus
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn answer(&self, command: StatusCommand, value: u16) {
        self.state().answers.insert(command.code(), value);
    }

    /// Makes REQ_DATA unreadable while `command` is the pending request.
    pub fn fail_answer(&self, command: StatusCommand) {
        self.state().failing_answers.insert(command.code());
    }

    pub fn fail_writes(&self) {
        self.state().failing_writes = true;
    }

    pub fn set_register(&self, register: u8, value: u8) {
        self.state().registers.insert(register, value);
    }

    pub fn set_word(&self, register: u8, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        let mut state = self.state();
        state.registers.insert(register, hi);
        state.registers.insert(register.wrapping_add(1), lo);
    }

    pub fn fail_register(&self, register: u8) {
        self.state().failing.insert(register);
    }

    pub fn heal_register(&self, register: u8) {
        self.state().failing.remove(&register);
    }

    pub fn byte_reads(&self) -> Vec<u8> {
        self.state().byte_reads.clone()
    }

    pub fn word_reads(&self) -> Vec<u8> {
        self.state().word_reads.clone()
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state().writes.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state();
        state.byte_reads.clear();
        state.word_reads.clear();
        state.writes.clear();
    }
}

impl BusState {
    fn check(&self, register: u8) -> Result<(), TransportError> {
        if self.failing.contains(&register) {
            return Err(TransportError::bus(register, "injected failure"));
        }
        if register == REG_REQ_DATA {
            if let Some(status) = self.status {
                if self.failing_answers.contains(&status) {
                    return Err(TransportError::bus(register, "injected answer failure"));
                }
            }
        }
        Ok(())
    }
}

impl RegisterTransport for FakeBus {
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.failing_writes {
            return Err(TransportError::bus(register, "injected write failure"));
        }
        state.writes.push((register, value));
        if register == REG_STATUS {
            state.status = Some(value);
            if let Some(answer) = state.answers.get(&value).copied() {
                let [hi, lo] = answer.to_be_bytes();
                state.registers.insert(REG_REQ_DATA, hi);
                state.registers.insert(REG_REQ_DATA + 1, lo);
            }
        }
        Ok(())
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, TransportError> {
        let mut state = self.state();
        state.byte_reads.push(register);
        state.check(register)?;
        Ok(state.registers.get(&register).copied().unwrap_or(0))
    }

    fn read_word(&mut self, register: u8) -> Result<[u8; 2], TransportError> {
        let mut state = self.state();
        state.word_reads.push(register);
        state.check(register)?;
        let hi = state.registers.get(&register).copied().unwrap_or(0);
        let lo = state
            .registers
            .get(&register.wrapping_add(1))
            .copied()
            .unwrap_or(0);
        Ok([hi, lo])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Configure(AxisId, AxisParams),
    Axis(AxisId, u16),
    Button(u16, bool),
    EndBatch,
}

/// Sink recording every call in order
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn batches(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::EndBatch))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn push(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl EventSink for RecordingSink {
    fn configure_axis(&mut self, axis: AxisId, params: AxisParams) {
        self.push(SinkEvent::Configure(axis, params));
    }

    fn report_axis(&mut self, axis: AxisId, value: u16) {
        self.push(SinkEvent::Axis(axis, value));
    }

    fn report_button(&mut self, button: u16, pressed: bool) {
        self.push(SinkEvent::Button(button, pressed));
    }

    fn end_batch(&mut self) {
        self.push(SinkEvent::EndBatch);
    }
}
