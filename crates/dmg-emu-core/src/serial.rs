use crate::interrupts::{Interrupt, InterruptController};

/// SB/SC registers. Internal-clock transfers complete as soon as they are
/// started; every byte shifted out is also captured for test-ROM output.
/// No partner is ever attached, so the line floats high and each transfer
/// shifts in 0xFF.
pub struct Serial {
    sb: u8,
    sc: u8,
    out_buf: Vec<u8>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0x7E,
            out_buf: Vec::new(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, interrupts: &mut InterruptController) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val & 0x81;
                // External-clock transfers wait for a partner that never
                // clocks, so only internal-clock starts complete.
                if val & 0x81 == 0x81 {
                    self.out_buf.push(self.sb);
                    self.sb = 0xFF;
                    self.sc &= 0x7F;
                    interrupts.request(Interrupt::Serial);
                }
            }
            _ => {}
        }
    }

    /// Drain the bytes sent since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}
