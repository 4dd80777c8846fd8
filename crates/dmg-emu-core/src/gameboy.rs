use std::path::Path;

use log::{debug, info};

use crate::{
    cartridge::Cartridge,
    config::EmulatorConfig,
    cpu::Cpu,
    error::{LoadResult, SaveStateResult},
    input::Button,
    interrupts,
    mmu::Mmu,
    ppu::{FRAME_CYCLES, FrameBuffer},
    savestate::SaveState,
};

/// Cycles one [`GameBoy::step`] may run before giving up on the frame.
pub const FRAME_BUDGET: u32 = FRAME_CYCLES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The PPU entered VBlank and the frame went to the frame sink.
    FrameCompleted,
    /// The cycle budget ran out without a finished frame (LCD off, for
    /// example). No frame is delivered.
    BudgetExceeded,
    /// Nothing ran.
    Paused,
}

/// Receives each finished frame as 2-bit shades (0 = lightest).
pub trait FrameSink {
    fn frame(&mut self, frame: &FrameBuffer);
}

/// Receives the samples queued while a frame was emulated.
pub trait AudioSink {
    fn samples(&mut self, samples: &[i16]);
}

impl<F: FnMut(&FrameBuffer)> FrameSink for F {
    fn frame(&mut self, frame: &FrameBuffer) {
        self(frame)
    }
}

impl<F: FnMut(&[i16])> AudioSink for F {
    fn samples(&mut self, samples: &[i16]) {
        self(samples)
    }
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    config: EmulatorConfig,
    state: RunState,
    frame_sink: Option<Box<dyn FrameSink>>,
    audio_sink: Option<Box<dyn AudioSink>>,
}

impl GameBoy {
    /// A machine in the post-boot state with no cartridge inserted.
    pub fn new(config: EmulatorConfig) -> Self {
        let mut mmu = Mmu::with_sample_rate(config.sample_rate);
        mmu.apply_post_boot_io();
        Self {
            cpu: Cpu::post_boot(),
            mmu,
            config,
            state: RunState::Stopped,
            frame_sink: None,
            audio_sink: None,
        }
    }

    pub fn with_sinks(
        config: EmulatorConfig,
        frame_sink: Option<Box<dyn FrameSink>>,
        audio_sink: Option<Box<dyn AudioSink>>,
    ) -> Self {
        let mut gb = Self::new(config);
        gb.set_sinks(frame_sink, audio_sink);
        gb
    }

    /// Replace both sinks at once. Takes effect from the next frame.
    pub fn set_sinks(
        &mut self,
        frame_sink: Option<Box<dyn FrameSink>>,
        audio_sink: Option<Box<dyn AudioSink>>,
    ) {
        self.frame_sink = frame_sink;
        self.audio_sink = audio_sink;
    }

    pub fn config(&self) -> EmulatorConfig {
        self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Insert a ROM image and reset. A rejected image leaves the machine as
    /// it was.
    pub fn load_rom(&mut self, data: Vec<u8>) -> LoadResult<()> {
        let cart = Cartridge::load(data)?;
        self.insert(cart);
        Ok(())
    }

    /// Like [`GameBoy::load_rom`], reading the image and any battery save
    /// from disk.
    pub fn load_rom_file<P: AsRef<Path>>(&mut self, path: P) -> LoadResult<()> {
        let cart = Cartridge::from_file(path)?;
        self.insert(cart);
        Ok(())
    }

    fn insert(&mut self, cart: Cartridge) {
        self.mmu.save_cart_ram();
        self.mmu.load_cart(cart);
        self.reset();
    }

    /// Back to the post-boot register and I/O state, keeping the cartridge.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::post_boot();
        self.mmu = Mmu::with_sample_rate(self.config.sample_rate);
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
        self.mmu.apply_post_boot_io();
    }

    pub fn start(&mut self) {
        self.state = RunState::Running;
    }

    pub fn stop(&mut self) {
        self.state = RunState::Stopped;
    }

    /// Toggle between paused and running.
    pub fn pause(&mut self) {
        self.state = match self.state {
            RunState::Paused => RunState::Running,
            _ => RunState::Paused,
        };
    }

    /// Emulate one video frame, or until [`FRAME_BUDGET`] cycles have run.
    pub fn step(&mut self) -> StepOutcome {
        if self.state == RunState::Paused {
            return StepOutcome::Paused;
        }

        let mut elapsed = 0u32;
        loop {
            let cycles = self.cpu.step(&mut self.mmu);
            self.mmu.step(cycles);
            let dispatch = interrupts::service(&mut self.cpu, &mut self.mmu);
            if dispatch > 0 {
                self.mmu.step(dispatch);
            }
            elapsed += cycles + dispatch;

            if self.mmu.ppu.take_frame_ready() {
                self.deliver_frame();
                return StepOutcome::FrameCompleted;
            }
            if elapsed >= FRAME_BUDGET {
                debug!("Frame budget exhausted after {elapsed} cycles");
                return StepOutcome::BudgetExceeded;
            }
        }
    }

    fn deliver_frame(&mut self) {
        if let Some(sink) = self.frame_sink.as_mut() {
            sink.frame(self.mmu.ppu.framebuffer());
        }
        let samples = self.mmu.sound.take_samples();
        if self.config.sound_enabled
            && let Some(sink) = self.audio_sink.as_mut()
        {
            sink.samples(&samples);
        }
    }

    /// Step frames while the machine is running. Stops after `max_frames`
    /// frames when given; returns how many frames completed.
    pub fn run(&mut self, max_frames: Option<u64>) -> u64 {
        let mut frames = 0;
        while self.state == RunState::Running {
            if max_frames.is_some_and(|max| frames >= max) {
                break;
            }
            if self.step() == StepOutcome::FrameCompleted {
                frames += 1;
            }
        }
        frames
    }

    pub fn frame(&self) -> &FrameBuffer {
        self.mmu.ppu.framebuffer()
    }

    pub fn press(&mut self, button: Button) {
        self.mmu.input.press(button, &mut self.mmu.interrupts);
    }

    pub fn release(&mut self, button: Button) {
        self.mmu.input.release(button);
    }

    /// Bytes shifted out of the serial port since the last call.
    pub fn take_serial(&mut self) -> Vec<u8> {
        self.mmu.take_serial()
    }

    pub fn save_state(&self) -> SaveState {
        SaveState::capture(&self.cpu, &self.mmu)
    }

    /// Replace the live state with `state`. An invalid state is rejected
    /// before anything changes.
    pub fn load_state(&mut self, state: &SaveState) -> SaveStateResult<()> {
        state.apply(&mut self.cpu, &mut self.mmu)?;
        info!(
            "Loaded save state for \"{}\" at cycle {}",
            state.title(),
            self.cpu.cycles()
        );
        Ok(())
    }

    /// Write battery-backed cartridge RAM to its `.sav` file, if any.
    pub fn save_cart_ram(&mut self) {
        self.mmu.save_cart_ram();
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new(EmulatorConfig::default())
    }
}
