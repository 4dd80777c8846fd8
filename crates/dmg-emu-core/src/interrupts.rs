//! Interrupt controller (IF/IE) and the dispatch protocol.
//!
//! Components raise interrupts by calling [`InterruptController::request`].
//! The scheduler calls [`service`] after every CPU step; it wakes a halted
//! CPU and, when IME allows it, vectors to the highest-priority pending
//! interrupt. The controller never touches CPU state directly, only through
//! [`InterruptTarget`].

use crate::mmu::Mmu;

/// Bits of IF/IE that correspond to real interrupt lines.
pub const INTERRUPT_MASK: u8 = 0x1F;

/// Machine cycles spent pushing PC and jumping to a vector.
pub const DISPATCH_CYCLES: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    /// All sources in priority order.
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    pub const fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::LcdStat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }

    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::LcdStat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }

    /// Lowest-numbered source set in `pending`, if any.
    pub fn highest_priority(pending: u8) -> Option<Interrupt> {
        Self::ALL
            .into_iter()
            .find(|irq| pending & irq.bit() != 0)
    }
}

/// The narrow view of the CPU the interrupt controller is allowed to use.
pub trait InterruptTarget {
    fn is_halted(&self) -> bool;
    fn clear_halt(&mut self);
    fn is_stopped(&self) -> bool;
    fn clear_stop(&mut self);
    fn interrupts_enabled(&self) -> bool;
    /// Enter the handler at `vector`: clears IME and HALT, pushes PC and
    /// jumps. Returns `false` without doing anything when IME is clear.
    fn interrupt(&mut self, mmu: &mut Mmu, vector: u16) -> bool;
}

#[derive(Debug, Clone)]
pub struct InterruptController {
    flags: u8,
    enable: u8,
    /// Set by every request; consumed by [`service`] to end HALT even when the
    /// source is masked in IE.
    wake: bool,
}

impl InterruptController {
    pub fn new() -> Self {
        Self {
            flags: 0,
            enable: 0,
            wake: false,
        }
    }

    pub fn request(&mut self, irq: Interrupt) {
        self.flags |= irq.bit();
        self.wake = true;
    }

    /// Clear a pending request once it has been dispatched.
    pub fn acknowledge(&mut self, irq: Interrupt) {
        self.flags &= !irq.bit();
    }

    /// IF as seen on the bus: unused high bits read back as 1.
    pub fn read_if(&self) -> u8 {
        self.flags | !INTERRUPT_MASK
    }

    pub fn write_if(&mut self, val: u8) {
        self.flags = val & INTERRUPT_MASK;
    }

    pub fn read_ie(&self) -> u8 {
        self.enable
    }

    /// IE keeps all eight written bits; only the low five ever matter.
    pub fn write_ie(&mut self, val: u8) {
        self.enable = val;
    }

    /// Requests that are both flagged and enabled.
    pub fn pending(&self) -> u8 {
        self.flags & self.enable & INTERRUPT_MASK
    }

    pub fn is_requested(&self, irq: Interrupt) -> bool {
        self.flags & irq.bit() != 0
    }

    /// Load IF and IE from a snapshot. A wake left over from the replaced
    /// state is dropped.
    pub fn restore(&mut self, flags: u8, enable: u8) {
        self.write_if(flags);
        self.write_ie(enable);
        self.wake = false;
    }

    fn take_wake(&mut self) -> bool {
        std::mem::take(&mut self.wake)
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one dispatch check. Returns the cycles consumed by the dispatch (0 when
/// nothing was taken).
pub fn service<T: InterruptTarget>(cpu: &mut T, mmu: &mut Mmu) -> u32 {
    let woke = mmu.interrupts.take_wake();
    let pending = mmu.interrupts.pending();

    if cpu.is_halted() && (woke || pending != 0) {
        cpu.clear_halt();
    }
    if cpu.is_stopped() && mmu.interrupts.is_requested(Interrupt::Joypad) {
        cpu.clear_stop();
    }

    if pending == 0 || !cpu.interrupts_enabled() {
        return 0;
    }
    let Some(irq) = Interrupt::highest_priority(pending) else {
        return 0;
    };

    if cpu.interrupt(mmu, irq.vector()) {
        mmu.interrupts.acknowledge(irq);
        DISPATCH_CYCLES
    } else {
        0
    }
}
