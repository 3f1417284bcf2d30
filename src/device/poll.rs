//! Poll decoder
//!
//! One tick reads every joystick word and every button byte the topology
//! implies, in that order, and turns them into a [`PollSample`]. A failed read
//! only blanks the fields that depend on that register.

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use tracing::debug;

use super::topology::DeviceTopology;
use crate::protocol::RegisterClient;
use crate::sink::{AxisId, EventSink};

/// Both axes of one joystick; `None` marks a failed read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoystickSample {
    pub x: Option<u16>,
    pub y: Option<u16>,
}

/// Result of one poll tick
#[derive(Debug, Clone, PartialEq)]
pub struct PollSample {
    pub joysticks: Vec<JoystickSample>,
    /// Pressed state per logical button; `None` when its byte failed to read
    pub buttons: Vec<Option<bool>>,
    pub timestamp: DateTime<Local>,
}

impl PollSample {
    pub fn unavailable_fields(&self) -> usize {
        let axes = self
            .joysticks
            .iter()
            .map(|j| usize::from(j.x.is_none()) + usize::from(j.y.is_none()))
            .sum::<usize>();
        axes + self.buttons.iter().filter(|b| b.is_none()).count()
    }

    /// Pushes the sample into a sink and commits it as one batch.
    ///
    /// Entries beyond the id space (256 joysticks, 65536 buttons) cannot be
    /// addressed and are skipped.
    pub fn emit<S: EventSink + ?Sized>(&self, sink: &mut S) {
        for (index, joystick) in (0..=u8::MAX).zip(&self.joysticks) {
            if let Some(x) = joystick.x {
                sink.report_axis(AxisId::x(index), x);
            }
            if let Some(y) = joystick.y {
                sink.report_axis(AxisId::y(index), y);
            }
        }
        for (button, pressed) in (0..=u16::MAX).zip(&self.buttons) {
            if let Some(pressed) = pressed {
                sink.report_button(button, *pressed);
            }
        }
        sink.end_batch();
    }

    /// Human readable dump used by the debug surface. `-` marks unavailable.
    pub fn render(&self, topology: Option<&DeviceTopology>) -> String {
        let mut out = String::new();
        match topology {
            Some(t) => {
                let _ = writeln!(
                    out,
                    "topology: {} joysticks @ {:#04x}, {} buttons @ {:#04x}",
                    t.joystick_count(),
                    t.joystick_register_start(),
                    t.button_count(),
                    t.button_register_start()
                );
            }
            None => out.push_str("topology: none\n"),
        }
        let _ = writeln!(out, "sampled: {}", self.timestamp.format("%H:%M:%S.%3f"));
        for (index, joystick) in self.joysticks.iter().enumerate() {
            let _ = writeln!(
                out,
                "joystick{}: x={} y={}",
                index,
                show(joystick.x),
                show(joystick.y)
            );
        }
        if !self.buttons.is_empty() {
            let states: String = self
                .buttons
                .iter()
                .map(|b| match b {
                    Some(true) => '1',
                    Some(false) => '0',
                    None => '-',
                })
                .collect();
            let _ = writeln!(out, "buttons: {}", states);
        }
        out
    }
}

fn show(value: Option<u16>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Decodes pad registers into samples for a fixed topology
///
/// Axis words are reported exactly as read; range handling belongs to the
/// sink, which received the axis parameters at discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollDecoder;

impl PollDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Reads and decodes one tick. Never fails as a whole.
    pub fn decode(&self, client: &mut RegisterClient, topology: &DeviceTopology) -> PollSample {
        let joysticks = (0..topology.joystick_count())
            .map(|i| JoystickSample {
                x: read_axis(client, topology.joystick_x_register(i)),
                y: read_axis(client, topology.joystick_y_register(i)),
            })
            .collect();

        let button_count = usize::from(topology.button_count());
        let mut buttons = Vec::with_capacity(button_count);
        for r in 0..topology.button_register_count() {
            let register = topology.button_register(r);
            let byte = match client.read_byte(register) {
                Ok(byte) => Some(byte),
                Err(e) => {
                    debug!("Button register {:#04x} unavailable: {}", register, e);
                    None
                }
            };
            let bits = (button_count - buttons.len()).min(8);
            // a clear bit means pressed
            buttons.extend((0..bits).map(|b| byte.map(|v| v & (1 << b) == 0)));
        }

        PollSample {
            joysticks,
            buttons,
            timestamp: Local::now(),
        }
    }
}

fn read_axis(client: &mut RegisterClient, register: u8) -> Option<u16> {
    client
        .read_word(register)
        .inspect_err(|e| debug!("Axis register {:#04x} unavailable: {}", register, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBus, RecordingSink, SinkEvent};

    fn decode(bus: &FakeBus, topology: &DeviceTopology) -> PollSample {
        let mut client = RegisterClient::new(Box::new(bus.clone()));
        PollDecoder::new().decode(&mut client, topology)
    }

    #[test]
    fn test_read_counts_and_addresses() {
        for (joysticks, buttons) in [(0u8, 0u16), (1, 1), (3, 8), (2, 9), (4, 17), (255, 300)] {
            let bus = FakeBus::new();
            let topology = DeviceTopology::new(joysticks, 0x10, buttons, 0x80);
            decode(&bus, &topology);

            let expected_words: Vec<u8> = (0..joysticks)
                .flat_map(|i| [topology.joystick_x_register(i), topology.joystick_y_register(i)])
                .collect();
            let expected_bytes: Vec<u8> = (0..buttons.div_ceil(8))
                .map(|r| topology.button_register(r))
                .collect();

            assert_eq!(bus.word_reads(), expected_words);
            assert_eq!(bus.byte_reads(), expected_bytes);
            assert_eq!(bus.word_reads().len(), usize::from(joysticks) * 2);
            assert_eq!(bus.byte_reads().len(), usize::from(buttons.div_ceil(8)));
        }
    }

    #[test]
    fn test_axis_values_are_reported_unscaled() {
        let bus = FakeBus::new();
        bus.set_word(0x10, 0);
        bus.set_word(0x12, 1023);
        bus.set_word(0x14, 512);
        bus.set_word(0x16, 7);
        let sample = decode(&bus, &DeviceTopology::new(2, 0x10, 0, 0));

        assert_eq!(
            sample.joysticks,
            vec![
                JoystickSample {
                    x: Some(0),
                    y: Some(1023)
                },
                JoystickSample {
                    x: Some(512),
                    y: Some(7)
                },
            ]
        );
    }

    #[test]
    fn test_axis_words_above_range_pass_through() {
        let bus = FakeBus::new();
        bus.set_word(0x10, 0x0800);
        bus.set_word(0x12, 0xFFFF);
        let sample = decode(&bus, &DeviceTopology::new(1, 0x10, 0, 0));
        assert_eq!(
            sample.joysticks[0],
            JoystickSample {
                x: Some(2048),
                y: Some(0xFFFF)
            }
        );
    }

    #[test]
    fn test_button_polarity() {
        let bus = FakeBus::new();
        bus.set_register(0x20, 0b1111_1110);
        let sample = decode(&bus, &DeviceTopology::new(0, 0, 8, 0x20));

        assert_eq!(sample.buttons[0], Some(true));
        assert!(sample.buttons[1..].iter().all(|b| *b == Some(false)));
    }

    #[test]
    fn test_partial_last_byte_ignores_extra_bits() {
        let bus = FakeBus::new();
        bus.set_register(0x20, 0xFF);
        // bit 0 clear: button 8 pressed; bits 1..7 clear too but out of range
        bus.set_register(0x21, 0x00);
        let sample = decode(&bus, &DeviceTopology::new(0, 0, 9, 0x20));

        assert_eq!(bus.byte_reads(), vec![0x20, 0x21]);
        assert_eq!(sample.buttons.len(), 9);
        assert_eq!(sample.buttons[8], Some(true));

        let mut sink = RecordingSink::new();
        sample.emit(&mut sink);
        let buttons: Vec<u16> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Button(id, _) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(buttons, (0..9).collect::<Vec<u16>>());
    }

    #[test]
    fn test_failed_x_read_leaves_everything_else_intact() {
        let bus = FakeBus::new();
        let topology = DeviceTopology::new(2, 0x10, 10, 0x20);
        bus.set_word(0x10, 100);
        bus.set_word(0x12, 200);
        bus.set_word(0x14, 300);
        bus.set_word(0x16, 400);
        bus.set_register(0x20, 0b1111_1101);
        bus.set_register(0x21, 0b0000_0010);
        bus.fail_register(0x10);

        let sample = decode(&bus, &topology);
        assert_eq!(sample.joysticks[0], JoystickSample { x: None, y: Some(200) });
        assert_eq!(
            sample.joysticks[1],
            JoystickSample {
                x: Some(300),
                y: Some(400)
            }
        );
        assert_eq!(sample.buttons[1], Some(true));
        assert_eq!(sample.buttons[8], Some(true));
        assert_eq!(sample.buttons[9], Some(false));
        assert_eq!(sample.unavailable_fields(), 1);

        let mut sink = RecordingSink::new();
        sample.emit(&mut sink);
        let events = sink.events();
        assert!(!events.contains(&SinkEvent::Axis(AxisId::x(0), 0)));
        assert!(events.contains(&SinkEvent::Axis(AxisId::y(0), 200)));
        assert!(events.contains(&SinkEvent::Axis(AxisId::x(1), 300)));
        assert_eq!(events.iter().filter(|e| matches!(e, SinkEvent::Button(..))).count(), 10);
        assert_eq!(events.last(), Some(&SinkEvent::EndBatch));
    }

    #[test]
    fn test_failed_button_byte_only_blanks_its_buttons() {
        let bus = FakeBus::new();
        bus.set_register(0x20, 0xFF);
        bus.set_register(0x22, 0xFE);
        bus.fail_register(0x21);
        let sample = decode(&bus, &DeviceTopology::new(0, 0, 20, 0x20));

        assert!(sample.buttons[0..8].iter().all(|b| *b == Some(false)));
        assert!(sample.buttons[8..16].iter().all(|b| b.is_none()));
        assert_eq!(sample.buttons[16], Some(true));
        assert_eq!(sample.unavailable_fields(), 8);

        let mut sink = RecordingSink::new();
        sample.emit(&mut sink);
        assert_eq!(
            sink.events()
                .iter()
                .filter(|e| matches!(e, SinkEvent::Button(..)))
                .count(),
            12
        );
    }

    #[test]
    fn test_empty_topology_still_ends_batch() {
        let bus = FakeBus::new();
        let sample = decode(&bus, &DeviceTopology::new(0, 0x10, 0, 0x20));
        let mut sink = RecordingSink::new();
        sample.emit(&mut sink);

        assert!(bus.word_reads().is_empty());
        assert!(bus.byte_reads().is_empty());
        assert_eq!(sink.events(), vec![SinkEvent::EndBatch]);
    }

    #[test]
    fn test_emit_never_aliases_ids() {
        let sample = PollSample {
            joysticks: vec![
                JoystickSample {
                    x: Some(1),
                    y: None
                };
                300
            ],
            buttons: Vec::new(),
            timestamp: Local::now(),
        };
        let mut sink = RecordingSink::new();
        sample.emit(&mut sink);

        let events = sink.events();
        let axes: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Axis(id, _) => Some(id.joystick),
                _ => None,
            })
            .collect();
        assert_eq!(axes, (0..=u8::MAX).collect::<Vec<u8>>());
        assert_eq!(events.last(), Some(&SinkEvent::EndBatch));
    }

    #[test]
    fn test_render_marks_unavailable_fields() {
        let bus = FakeBus::new();
        bus.set_word(0x12, 700);
        bus.set_register(0x20, 0b1111_1110);
        bus.fail_register(0x10);
        let topology = DeviceTopology::new(1, 0x10, 3, 0x20);
        let text = decode(&bus, &topology).render(Some(&topology));

        assert!(text.contains("topology: 1 joysticks @ 0x10, 3 buttons @ 0x20"));
        assert!(text.contains("joystick0: x=- y=700"));
        assert!(text.contains("buttons: 100"));
    }
}
