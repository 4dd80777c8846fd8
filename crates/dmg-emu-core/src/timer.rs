use crate::interrupts::{Interrupt, InterruptController};

/// CPU cycles per DIV increment (16384 Hz).
pub const DIV_PERIOD: u32 = 256;

/// TIMA periods indexed by TAC bits 0-1.
const TIMA_PERIODS: [u32; 4] = [1024, 16, 64, 256];

pub struct Timer {
    /// Divider, incremented every 256 cycles
    pub div: u8,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control (enable + clock select)
    pub tac: u8,
    div_counter: u32,
    tima_counter: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            div_counter: 0,
            tima_counter: 0,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            // Any write clears the divider.
            0xFF04 => {
                self.div = 0;
                self.div_counter = 0;
            }
            0xFF05 => self.tima = val,
            0xFF06 => self.tma = val,
            0xFF07 => {
                let was_enabled = self.enabled();
                let old_select = self.tac & 0x03;
                self.tac = val & 0x07;
                if (was_enabled && !self.enabled()) || old_select != self.tac & 0x03 {
                    self.tima_counter = 0;
                }
            }
            _ => {}
        }
    }

    pub fn enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    fn period(&self) -> u32 {
        TIMA_PERIODS[(self.tac & 0x03) as usize]
    }

    pub fn step(&mut self, cycles: u32, interrupts: &mut InterruptController) {
        self.div_counter += cycles;
        while self.div_counter >= DIV_PERIOD {
            self.div_counter -= DIV_PERIOD;
            self.div = self.div.wrapping_add(1);
        }

        if !self.enabled() {
            return;
        }

        let period = self.period();
        self.tima_counter += cycles;
        while self.tima_counter >= period {
            self.tima_counter -= period;
            let (next, overflow) = self.tima.overflowing_add(1);
            if overflow {
                self.tima = self.tma;
                interrupts.request(Interrupt::Timer);
            } else {
                self.tima = next;
            }
        }
    }

    /// Restore register values from a snapshot. Sub-cycle counters restart.
    pub fn restore(&mut self, div: u8, tima: u8, tma: u8, tac: u8) {
        self.div = div;
        self.tima = tima;
        self.tma = tma;
        self.tac = tac & 0x07;
        self.div_counter = 0;
        self.tima_counter = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_ticks_every_256_cycles() {
        let mut t = Timer::new();
        let mut ic = InterruptController::new();
        t.step(255, &mut ic);
        assert_eq!(t.read(0xFF04), 0);
        t.step(1, &mut ic);
        assert_eq!(t.read(0xFF04), 1);
        t.step(256 * 3, &mut ic);
        assert_eq!(t.read(0xFF04), 4);
    }

    #[test]
    fn div_write_resets_regardless_of_value() {
        let mut t = Timer::new();
        let mut ic = InterruptController::new();
        t.step(256 * 10 + 100, &mut ic);
        t.write(0xFF04, 0x77);
        assert_eq!(t.read(0xFF04), 0);
        t.step(200, &mut ic);
        assert_eq!(t.read(0xFF04), 0);
    }

    #[test]
    fn disabling_resets_subcounter_but_keeps_tima() {
        let mut t = Timer::new();
        let mut ic = InterruptController::new();
        t.write(0xFF07, 0x05); // enabled, 16 cycles
        t.step(40, &mut ic);
        assert_eq!(t.tima, 2);
        t.write(0xFF07, 0x01);
        t.write(0xFF07, 0x05);
        t.step(15, &mut ic);
        assert_eq!(t.tima, 2);
        t.step(1, &mut ic);
        assert_eq!(t.tima, 3);
    }

    #[test]
    fn tac_upper_bits_read_high() {
        let mut t = Timer::new();
        t.write(0xFF07, 0xFF);
        assert_eq!(t.read(0xFF07), 0xFF);
        t.write(0xFF07, 0x00);
        assert_eq!(t.read(0xFF07), 0xF8);
    }
}
