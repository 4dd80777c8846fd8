//! Sound register file.
//!
//! Channel synthesis is not emulated. The unit keeps the NRxx registers with
//! their hardware read masks, wave RAM and the NR52 power switch, and emits
//! silence at the configured sample rate while powered so audio consumers
//! receive a steady stream.

use std::collections::VecDeque;

/// DMG master clock in Hz.
pub const CPU_CLOCK_HZ: u64 = 4_194_304;

/// Wave pattern RAM, 0xFF30-0xFF3F.
pub const WAVE_RAM_SIZE: usize = 0x10;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

// Registers 0xFF10-0xFF23; NR50-NR52 are kept separately.
const CHANNEL_REG_COUNT: usize = 0x14;

const POWER_ON_REGS: [u8; CHANNEL_REG_COUNT] = [
    0x80, 0xBF, 0xF3, 0xFF, 0xBF, 0xFF, 0x3F, 0x00, 0xFF, 0xBF, 0x7F, 0xFF, 0x9F, 0xFF, 0xBF, 0xFF,
    0xFF, 0x00, 0x00, 0xBF,
];

pub struct Sound {
    regs: [u8; CHANNEL_REG_COUNT],
    pub nr50: u8,
    pub nr51: u8,
    nr52: u8,
    pub wave_ram: [u8; WAVE_RAM_SIZE],
    sample_rate: u32,
    sample_timer: u64,
    samples: VecDeque<i16>,
}

impl Sound {
    /// Samples kept before the oldest are dropped (a little over 0.18 s at
    /// 44.1 kHz).
    const MAX_SAMPLES: usize = 8192;

    pub fn new(sample_rate: u32) -> Self {
        Self {
            regs: POWER_ON_REGS,
            nr50: 0x77,
            nr51: 0xF3,
            nr52: 0xF1,
            wave_ram: [0; WAVE_RAM_SIZE],
            sample_rate,
            sample_timer: 0,
            samples: VecDeque::with_capacity(Self::MAX_SAMPLES),
        }
    }

    pub fn powered(&self) -> bool {
        self.nr52 & 0x80 != 0
    }

    pub fn nr52(&self) -> u8 {
        self.nr52
    }

    fn read_mask(addr: u16) -> u8 {
        match addr {
            0xFF10 => 0x80,
            0xFF11 => 0x3F,
            0xFF12 => 0x00,
            0xFF13 => 0xFF,
            0xFF14 => 0xBF,
            0xFF16 => 0x3F,
            0xFF17 => 0x00,
            0xFF18 => 0xFF,
            0xFF19 => 0xBF,
            0xFF1A => 0x7F,
            0xFF1B => 0xFF,
            0xFF1C => 0x9F,
            0xFF1D => 0xFF,
            0xFF1E => 0xBF,
            0xFF20 => 0xFF,
            0xFF21 => 0x00,
            0xFF22 => 0x00,
            0xFF23 => 0xBF,
            0xFF15 | 0xFF1F => 0xFF,
            _ => 0xFF,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF10..=0xFF23 => self.regs[(addr - 0xFF10) as usize] | Self::read_mask(addr),
            0xFF24 => self.nr50,
            0xFF25 => self.nr51,
            // No channel ever reports active.
            0xFF26 => (self.nr52 & 0x80) | 0x70,
            0xFF30..=0xFF3F => self.wave_ram[(addr - 0xFF30) as usize],
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF26 => {
                let was_on = self.powered();
                self.nr52 = (self.nr52 & 0x7F) | (val & 0x80);
                if was_on && !self.powered() {
                    self.power_off();
                }
            }
            0xFF30..=0xFF3F => self.wave_ram[(addr - 0xFF30) as usize] = val,
            // Registers are frozen while the unit is off.
            _ if !self.powered() => {}
            0xFF10..=0xFF23 => self.regs[(addr - 0xFF10) as usize] = val,
            0xFF24 => self.nr50 = val,
            0xFF25 => self.nr51 = val,
            _ => {}
        }
    }

    fn power_off(&mut self) {
        self.regs.fill(0);
        self.nr50 = 0;
        self.nr51 = 0;
        self.samples.clear();
        self.sample_timer = 0;
    }

    /// Restore the global registers and wave RAM from a snapshot.
    pub fn restore(&mut self, nr50: u8, nr51: u8, nr52: u8, wave_ram: [u8; WAVE_RAM_SIZE]) {
        self.nr52 = nr52 & 0x80;
        if !self.powered() {
            self.power_off();
        }
        self.nr50 = nr50;
        self.nr51 = nr51;
        self.wave_ram = wave_ram;
    }

    pub fn push_sample(&mut self, s: i16) {
        if self.samples.len() >= Self::MAX_SAMPLES {
            let excess = self.samples.len() + 1 - Self::MAX_SAMPLES;
            self.samples.drain(..excess);
        }
        self.samples.push_back(s);
    }

    pub fn step(&mut self, cycles: u32) {
        if !self.powered() {
            return;
        }
        self.sample_timer += cycles as u64 * self.sample_rate as u64;
        while self.sample_timer >= CPU_CLOCK_HZ {
            self.sample_timer -= CPU_CLOCK_HZ;
            self.push_sample(0);
        }
    }

    /// Drain every queued sample.
    pub fn take_samples(&mut self) -> Vec<i16> {
        self.samples.drain(..).collect()
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}
