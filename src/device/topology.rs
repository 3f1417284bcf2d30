//! Discovered register layout of one pad
//!
//! ```text
//! joystick_register_start
//! │  X0 X0 Y0 Y0 X1 X1 Y1 Y1 ...        (width 2 per axis, big-endian)
//! button_register_start
//! │  b7..b0  b15..b8 ...                (8 buttons per byte, bit 0 first)
//! ```
//!
//! Register numbers are 8 bits wide; offsets past `0xFF` wrap around.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTopology {
    joystick_register_width: u8,
    joystick_count: u8,
    joystick_register_start: u8,
    button_count: u16,
    button_register_start: u8,
}

impl DeviceTopology {
    /// Bytes per axis register for this protocol generation
    pub const JOYSTICK_REGISTER_WIDTH: u8 = 2;

    /// Only the negotiator builds topologies; all fields arrive together.
    pub(crate) fn new(
        joystick_count: u8,
        joystick_register_start: u8,
        button_count: u16,
        button_register_start: u8,
    ) -> Self {
        Self {
            joystick_register_width: Self::JOYSTICK_REGISTER_WIDTH,
            joystick_count,
            joystick_register_start,
            button_count,
            button_register_start,
        }
    }

    pub fn joystick_register_width(&self) -> u8 {
        self.joystick_register_width
    }

    pub fn joystick_count(&self) -> u8 {
        self.joystick_count
    }

    pub fn joystick_register_start(&self) -> u8 {
        self.joystick_register_start
    }

    pub fn button_count(&self) -> u16 {
        self.button_count
    }

    pub fn button_register_start(&self) -> u8 {
        self.button_register_start
    }

    pub fn joystick_x_register(&self, joystick: u8) -> u8 {
        let offset = usize::from(joystick) * usize::from(self.joystick_register_width) * 2;
        wrap_register(self.joystick_register_start, offset)
    }

    pub fn joystick_y_register(&self, joystick: u8) -> u8 {
        self.joystick_x_register(joystick)
            .wrapping_add(self.joystick_register_width)
    }

    /// Number of bitmap bytes holding the buttons
    pub fn button_register_count(&self) -> u16 {
        self.button_count.div_ceil(8)
    }

    pub fn button_register(&self, index: u16) -> u8 {
        wrap_register(self.button_register_start, usize::from(index))
    }

    /// Transport round-trips needed for one poll tick
    pub fn reads_per_tick(&self) -> usize {
        usize::from(self.joystick_count) * 2 + usize::from(self.button_register_count())
    }
}

fn wrap_register(start: u8, offset: usize) -> u8 {
    ((usize::from(start) + offset) % 256) as u8
}
