//! Original Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU/timer
//! and friends). Front-ends live in separate crates and drive the core through
//! the [`gameboy`] facade, receiving frames and samples via the sink traits.

/// Cartridge mappers (MBC) and ROM/RAM handling.
pub mod cartridge;

/// Construction-time emulator options.
pub mod config;

/// LR35902 CPU core.
pub mod cpu;

/// Load and save-state error types.
pub mod error;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Joypad input register.
pub mod input;

/// IF/IE registers, priority and dispatch.
pub mod interrupts;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Versioned machine snapshots.
pub mod savestate;

/// Serial port and test-ROM output capture.
pub mod serial;

/// Sound register file and sample queue.
pub mod sound;

/// Divider/timer unit.
pub mod timer;

pub use config::EmulatorConfig;
pub use error::{LoadError, SaveStateError};
pub use gameboy::{GameBoy, RunState, StepOutcome};
