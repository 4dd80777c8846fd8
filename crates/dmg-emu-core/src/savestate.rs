//! Versioned save-state record.
//!
//! The encoding is fixed-width little-endian, written field by field in the
//! order of the struct definitions below:
//!
//! | field            | bytes |
//! |------------------|-------|
//! | magic `GBSS`     | 4     |
//! | version          | 4     |
//! | Unix timestamp   | 8     |
//! | ROM title        | 16    |
//! | CPU              | 25    |
//! | PPU              | 17    |
//! | timer            | 4     |
//! | input            | 9     |
//! | sound            | 19    |
//! | interrupts       | 3     |
//!
//! Cartridge RAM and bank registers are not part of the record.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::cpu::{Cpu, FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg8, Reg16};
use crate::error::{SaveStateError, SaveStateResult};
use crate::mmu::Mmu;
use crate::ppu::{LAST_LINE, LcdMode, PPU_REGISTER_COUNT, SCREEN_HEIGHT};
use crate::sound::WAVE_RAM_SIZE;

pub const MAGIC: [u8; 4] = *b"GBSS";
pub const VERSION: u32 = 2;
pub const TITLE_LEN: usize = 16;

const HEADER_LEN: usize = 4 + 4 + 8 + TITLE_LEN;
const CPU_LEN: usize = 7 + 2 + 2 + 4 + 2 + 8;
const PPU_LEN: usize = PPU_REGISTER_COUNT + 1 + 4;
const TIMER_LEN: usize = 4;
const INPUT_LEN: usize = 1 + 8;
const SOUND_LEN: usize = 3 + WAVE_RAM_SIZE;
const INTERRUPTS_LEN: usize = 3;

/// Size of an encoded save state.
pub const ENCODED_LEN: usize =
    HEADER_LEN + CPU_LEN + PPU_LEN + TIMER_LEN + INPUT_LEN + SOUND_LEN + INTERRUPTS_LEN;

// Offset of the PPU LY byte within the PPU register block.
const LY_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSnapshot {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    pub zero: bool,
    pub subtract: bool,
    pub half_carry: bool,
    pub carry: bool,
    pub halted: bool,
    pub stopped: bool,
    pub cycles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PpuSnapshot {
    /// LCDC, STAT, SCY, SCX, LY, LYC, BGP, OBP0, OBP1, WY, WX, DMA
    pub registers: [u8; PPU_REGISTER_COUNT],
    pub mode: u8,
    pub mode_clock: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerSnapshot {
    pub div: u8,
    pub tima: u8,
    pub tma: u8,
    pub tac: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSnapshot {
    pub joyp: u8,
    /// In [`crate::input::Button::ALL`] order
    pub buttons: [bool; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoundSnapshot {
    pub nr50: u8,
    pub nr51: u8,
    pub nr52: u8,
    pub wave_ram: [u8; WAVE_RAM_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptSnapshot {
    pub flags: u8,
    pub enable: u8,
    pub ime: bool,
}

/// A flat snapshot of the machine. Built from live state with
/// [`SaveState::capture`] and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveState {
    pub timestamp: u64,
    pub title: [u8; TITLE_LEN],
    pub cpu: CpuSnapshot,
    pub ppu: PpuSnapshot,
    pub timer: TimerSnapshot,
    pub input: InputSnapshot,
    pub sound: SoundSnapshot,
    pub interrupts: InterruptSnapshot,
}

impl SaveState {
    pub fn capture(cpu: &Cpu, mmu: &Mmu) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        let mut title = [0u8; TITLE_LEN];
        if let Some(cart) = mmu.cart.as_ref() {
            let bytes = cart.title.as_bytes();
            let n = bytes.len().min(TITLE_LEN);
            title[..n].copy_from_slice(&bytes[..n]);
        }

        Self {
            timestamp,
            title,
            cpu: CpuSnapshot {
                a: cpu.register(Reg8::A),
                b: cpu.register(Reg8::B),
                c: cpu.register(Reg8::C),
                d: cpu.register(Reg8::D),
                e: cpu.register(Reg8::E),
                h: cpu.register(Reg8::H),
                l: cpu.register(Reg8::L),
                sp: cpu.sp(),
                pc: cpu.pc(),
                zero: cpu.flag(FLAG_Z),
                subtract: cpu.flag(FLAG_N),
                half_carry: cpu.flag(FLAG_H),
                carry: cpu.flag(FLAG_C),
                halted: cpu.halted(),
                stopped: cpu.stopped(),
                cycles: cpu.cycles(),
            },
            ppu: PpuSnapshot {
                registers: mmu.ppu.registers(),
                mode: mmu.ppu.mode() as u8,
                mode_clock: mmu.ppu.mode_clock(),
            },
            timer: TimerSnapshot {
                div: mmu.timer.div,
                tima: mmu.timer.tima,
                tma: mmu.timer.tma,
                tac: mmu.timer.tac,
            },
            input: InputSnapshot {
                joyp: mmu.input.read(),
                buttons: mmu.input.buttons(),
            },
            sound: SoundSnapshot {
                nr50: mmu.sound.nr50,
                nr51: mmu.sound.nr51,
                // Only the power bit is state; the rest reads back fixed.
                nr52: mmu.sound.nr52() & 0x80,
                wave_ram: mmu.sound.wave_ram,
            },
            interrupts: InterruptSnapshot {
                flags: mmu.interrupts.read_if() & 0x1F,
                enable: mmu.interrupts.read_ie(),
                ime: cpu.ime(),
            },
        }
    }

    /// ROM title with the NUL padding stripped.
    pub fn title(&self) -> String {
        let end = self
            .title
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TITLE_LEN);
        String::from_utf8_lossy(&self.title[..end]).into_owned()
    }

    /// Range checks that the encoding alone cannot express.
    pub fn validate(&self) -> SaveStateResult<()> {
        let Some(mode) = LcdMode::from_bits(self.ppu.mode) else {
            return Err(SaveStateError::FieldOutOfRange {
                field: "ppu.mode",
                value: self.ppu.mode as u64,
            });
        };
        let ly = self.ppu.registers[LY_INDEX];
        if ly > LAST_LINE {
            return Err(SaveStateError::FieldOutOfRange {
                field: "ppu.ly",
                value: ly as u64,
            });
        }
        // VBlank covers exactly the lines below the visible area.
        if (mode == LcdMode::VBlank) != (ly as usize >= SCREEN_HEIGHT) {
            return Err(SaveStateError::FieldOutOfRange {
                field: "ppu.mode",
                value: self.ppu.mode as u64,
            });
        }
        if self.ppu.mode_clock >= mode.cycles() {
            return Err(SaveStateError::FieldOutOfRange {
                field: "ppu.mode_clock",
                value: self.ppu.mode_clock as u64,
            });
        }
        Ok(())
    }

    /// Overwrite the live machine with this snapshot. Validation runs first,
    /// so an invalid state leaves the machine untouched.
    pub fn apply(&self, cpu: &mut Cpu, mmu: &mut Mmu) -> SaveStateResult<()> {
        self.validate()?;
        let Some(mode) = LcdMode::from_bits(self.ppu.mode) else {
            return Err(SaveStateError::FieldOutOfRange {
                field: "ppu.mode",
                value: self.ppu.mode as u64,
            });
        };

        if let Some(cart) = mmu.cart.as_ref() {
            let title = self.title();
            if !title.is_empty() && title != cart.title {
                warn!(
                    "Save state was taken with \"{title}\", loaded into \"{}\"",
                    cart.title
                );
            }
        }

        let c = &self.cpu;
        cpu.set_register(Reg8::A, c.a);
        cpu.set_register(Reg8::B, c.b);
        cpu.set_register(Reg8::C, c.c);
        cpu.set_register(Reg8::D, c.d);
        cpu.set_register(Reg8::E, c.e);
        cpu.set_register(Reg8::H, c.h);
        cpu.set_register(Reg8::L, c.l);
        cpu.set_register(Reg8::F, 0);
        cpu.set_flag(FLAG_Z, c.zero);
        cpu.set_flag(FLAG_N, c.subtract);
        cpu.set_flag(FLAG_H, c.half_carry);
        cpu.set_flag(FLAG_C, c.carry);
        cpu.set_register16(Reg16::SP, c.sp);
        cpu.set_register16(Reg16::PC, c.pc);
        cpu.set_halted(c.halted);
        cpu.set_stopped(c.stopped);
        cpu.set_cycles(c.cycles);
        cpu.set_ime(self.interrupts.ime);

        mmu.ppu.restore(self.ppu.registers, mode, self.ppu.mode_clock);
        mmu.timer.restore(
            self.timer.div,
            self.timer.tima,
            self.timer.tma,
            self.timer.tac,
        );
        mmu.input.restore(self.input.joyp, self.input.buttons);
        mmu.sound.restore(
            self.sound.nr50,
            self.sound.nr51,
            self.sound.nr52,
            self.sound.wave_ram,
        );
        mmu.interrupts.restore(self.interrupts.flags, self.interrupts.enable);
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.title);

        let c = &self.cpu;
        out.extend_from_slice(&[c.a, c.b, c.c, c.d, c.e, c.h, c.l]);
        out.extend_from_slice(&c.sp.to_le_bytes());
        out.extend_from_slice(&c.pc.to_le_bytes());
        for flag in [
            c.zero,
            c.subtract,
            c.half_carry,
            c.carry,
            c.halted,
            c.stopped,
        ] {
            out.push(flag as u8);
        }
        out.extend_from_slice(&c.cycles.to_le_bytes());

        out.extend_from_slice(&self.ppu.registers);
        out.push(self.ppu.mode);
        out.extend_from_slice(&self.ppu.mode_clock.to_le_bytes());

        let t = &self.timer;
        out.extend_from_slice(&[t.div, t.tima, t.tma, t.tac]);

        out.push(self.input.joyp);
        out.extend(self.input.buttons.iter().map(|&b| b as u8));

        let s = &self.sound;
        out.extend_from_slice(&[s.nr50, s.nr51, s.nr52]);
        out.extend_from_slice(&s.wave_ram);

        let i = &self.interrupts;
        out.extend_from_slice(&[i.flags, i.enable, i.ime as u8]);
        out
    }

    pub fn from_bytes(data: &[u8]) -> SaveStateResult<Self> {
        let mut r = Reader::new(data);

        if r.array::<4>()? != MAGIC {
            return Err(SaveStateError::BadMagic);
        }
        let version = r.u32()?;
        if version != VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }
        if data.len() < ENCODED_LEN {
            return Err(SaveStateError::Truncated {
                needed: ENCODED_LEN,
                len: data.len(),
            });
        }

        let timestamp = r.u64()?;
        let title = r.array::<TITLE_LEN>()?;

        let [a, b, c, d, e, h, l] = r.array::<7>()?;
        let sp = r.u16()?;
        let pc = r.u16()?;
        let cpu = CpuSnapshot {
            a,
            b,
            c,
            d,
            e,
            h,
            l,
            sp,
            pc,
            zero: r.bool("cpu.zero")?,
            subtract: r.bool("cpu.subtract")?,
            half_carry: r.bool("cpu.half_carry")?,
            carry: r.bool("cpu.carry")?,
            halted: r.bool("cpu.halted")?,
            stopped: r.bool("cpu.stopped")?,
            cycles: r.u64()?,
        };

        let ppu = PpuSnapshot {
            registers: r.array()?,
            mode: r.u8()?,
            mode_clock: r.u32()?,
        };

        let [div, tima, tma, tac] = r.array::<4>()?;
        let timer = TimerSnapshot {
            div,
            tima,
            tma,
            tac,
        };

        let joyp = r.u8()?;
        let mut buttons = [false; 8];
        for slot in buttons.iter_mut() {
            *slot = r.bool("input.buttons")?;
        }
        let input = InputSnapshot { joyp, buttons };

        let [nr50, nr51, nr52] = r.array::<3>()?;
        let sound = SoundSnapshot {
            nr50,
            nr51,
            nr52,
            wave_ram: r.array()?,
        };

        let interrupts = InterruptSnapshot {
            flags: r.u8()?,
            enable: r.u8()?,
            ime: r.bool("interrupts.ime")?,
        };

        if r.remaining() != 0 {
            return Err(SaveStateError::TrailingBytes(r.remaining()));
        }

        let state = Self {
            timestamp,
            title,
            cpu,
            ppu,
            timer,
            input,
            sound,
            interrupts,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> SaveStateResult<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> SaveStateResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let state = Self::from_bytes(&bytes)?;
        info!(
            "Read save state for \"{}\" from {}",
            state.title(),
            path.display()
        );
        Ok(state)
    }
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn array<const N: usize>(&mut self) -> SaveStateResult<[u8; N]> {
        let end = self.pos + N;
        let Some(slice) = self.data.get(self.pos..end) else {
            return Err(SaveStateError::Truncated {
                needed: end.max(ENCODED_LEN),
                len: self.data.len(),
            });
        };
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos = end;
        Ok(buf)
    }

    fn u8(&mut self) -> SaveStateResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> SaveStateResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> SaveStateResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> SaveStateResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn bool(&mut self, field: &'static str) -> SaveStateResult<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(SaveStateError::FieldOutOfRange {
                field,
                value: v as u64,
            }),
        }
    }
}
