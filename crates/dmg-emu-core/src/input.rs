use crate::interrupts::{Interrupt, InterruptController};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
}

impl Button {
    /// Snapshot order of the button booleans.
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Bit within its row (active-low in JOYP).
    fn line(self) -> u8 {
        1 << (self.index() % 4)
    }

    fn is_direction(self) -> bool {
        self.index() >= 4
    }
}

/// JOYP (0xFF00) and the eight button lines behind it.
pub struct Input {
    /// Row select bits 4-5 as last written
    select: u8,
    pressed: [bool; 8],
}

impl Input {
    pub fn new() -> Self {
        Self {
            select: 0x30,
            pressed: [false; 8],
        }
    }

    fn row_bits(&self, directions: bool) -> u8 {
        Button::ALL
            .iter()
            .filter(|b| b.is_direction() == directions && self.pressed[b.index()])
            .fold(0, |acc, b| acc | b.line())
    }

    pub fn read(&self) -> u8 {
        let mut low = 0u8;
        if self.select & 0x10 == 0 {
            low |= self.row_bits(true);
        }
        if self.select & 0x20 == 0 {
            low |= self.row_bits(false);
        }
        0xC0 | self.select | (!low & 0x0F)
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & 0x30;
    }

    /// Press a button. Pressing a held button does nothing; a new press
    /// requests the joypad interrupt.
    pub fn press(&mut self, button: Button, interrupts: &mut InterruptController) {
        let slot = &mut self.pressed[button.index()];
        if !*slot {
            *slot = true;
            interrupts.request(Interrupt::Joypad);
        }
    }

    pub fn release(&mut self, button: Button) {
        self.pressed[button.index()] = false;
    }

    /// Button states in [`Button::ALL`] order.
    pub fn buttons(&self) -> [bool; 8] {
        self.pressed
    }

    pub fn restore(&mut self, joyp: u8, pressed: [bool; 8]) {
        self.select = joyp & 0x30;
        self.pressed = pressed;
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
