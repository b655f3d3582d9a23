mod alu;
mod cb;
pub mod instruction;
mod ops;
pub mod registers;
mod table;

use log::trace;

use crate::bus::{Bus, CYCLES_PER_STEP};
use crate::error::{EmuError, Result};
use crate::hardware::Model;
use crate::interrupts::Interrupt;
use crate::trace::InstructionTracer;

pub use instruction::Instruction;
pub use registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, R8, R16, Registers};
pub use table::Handler;

/// What a handler reports back: the documented cycle cost and whether it
/// already wrote PC itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executed {
    pub cycles: u32,
    pub jumped: bool,
}

impl Executed {
    pub const fn next(cycles: u32) -> Self {
        Self {
            cycles,
            jumped: false,
        }
    }

    pub const fn jump(cycles: u32) -> Self {
        Self {
            cycles,
            jumped: true,
        }
    }
}

pub struct Cpu {
    pub regs: Registers,
    halted: bool,
    stopped: bool,
    halt_bug: bool,
    /// EI was executed; IME goes high once the following instruction ends.
    ime_pending: bool,
    /// `ime_pending` was already set when the current instruction was fetched.
    ime_armed: bool,
    /// Next byte of the instruction stream to read.
    cursor: u16,
    /// PC of the instruction after the current one.
    fallthrough: u16,
    started_at: u64,
    tracer: Option<Box<dyn InstructionTracer>>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Registers::power_on())
    }
}

impl Cpu {
    pub fn new(regs: Registers) -> Self {
        Self {
            regs,
            halted: false,
            stopped: false,
            halt_bug: false,
            ime_pending: false,
            ime_armed: false,
            cursor: regs.pc,
            fallthrough: regs.pc,
            started_at: 0,
            tracer: None,
        }
    }

    /// CPU as left by the boot ROM, for starting directly at 0x0100.
    pub fn post_boot(model: Model) -> Self {
        Self::new(Registers::post_boot(model))
    }

    pub fn set_tracer(&mut self, tracer: Option<Box<dyn InstructionTracer>>) {
        self.tracer = tracer;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn ime_pending(&self) -> bool {
        self.ime_pending
    }

    pub fn debug_state(&self) -> String {
        format!(
            "{} HALT:{} STOP:{} EI:{}",
            self.regs, self.halted as u8, self.stopped as u8, self.ime_pending as u8
        )
    }

    /// Run one instruction, plus any interrupt dispatch and VRAM DMA stall
    /// it triggers. Returns the T-cycles that elapsed on the bus.
    pub fn step(&mut self, bus: &mut Bus) -> Result<u32> {
        let start = bus.cycles();
        bus.update_joypad();

        if self.stopped {
            if !bus.joypad().any_pressed() {
                bus.step()?;
                return Ok(CYCLES_PER_STEP);
            }
            self.stopped = false;
        }

        let pc = self.regs.pc;
        let instruction = self.fetch(bus)?;
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.trace(pc, &instruction, &self.regs);
        }
        let handler = self.decode(instruction)?;
        self.execute(bus, handler, instruction)?;
        self.check_pending_interrupts(bus)?;

        for _ in 0..bus.take_stall_steps() {
            bus.step()?;
        }
        Ok((bus.cycles() - start) as u32)
    }

    /// Read the next instruction at PC. While halted nothing is read and a
    /// synthetic [`Instruction::HALTED`] comes back instead.
    pub fn fetch(&mut self, bus: &mut Bus) -> Result<Instruction> {
        self.started_at = bus.cycles();
        self.ime_armed = self.ime_pending;
        let pc = self.regs.pc;

        if self.halted {
            self.cursor = pc;
            self.fallthrough = pc;
            return Ok(Instruction::HALTED);
        }

        // After the HALT bug the opcode byte is read but PC does not move,
        // so the same byte is seen again as the next one.
        let repeat = std::mem::take(&mut self.halt_bug);
        let mut opcode = bus.load(pc, true, false)?;
        self.cursor = if repeat { pc } else { pc.wrapping_add(1) };

        let prefixed = opcode == instruction::PREFIX;
        if prefixed {
            opcode = self.read_imm8(bus)?;
        }

        let instruction = Instruction::new(opcode, prefixed);
        self.fallthrough = pc
            .wrapping_add(instruction.length())
            .wrapping_sub(repeat as u16);
        Ok(instruction)
    }

    pub fn decode(&self, instruction: Instruction) -> Result<Handler> {
        if instruction.halted {
            return Ok(ops::halted as Handler);
        }
        let table = if instruction.prefixed {
            &table::PREFIXED
        } else {
            &table::UNPREFIXED
        };
        table[instruction.opcode as usize].ok_or(EmuError::UnimplementedOpcode {
            opcode: instruction.opcode,
            prefixed: instruction.prefixed,
            pc: self.regs.pc,
        })
    }

    /// Run `handler`, advance PC unless it jumped, then idle the bus until
    /// the instruction's full cycle cost has elapsed.
    pub fn execute(
        &mut self,
        bus: &mut Bus,
        handler: Handler,
        instruction: Instruction,
    ) -> Result<u32> {
        let executed = handler(self, bus, instruction)?;
        if !executed.jumped {
            self.regs.pc = self.fallthrough;
        }

        let target = self.started_at + executed.cycles as u64;
        debug_assert!(
            bus.cycles() <= target,
            "{instruction:?} used more bus time than its cost of {}",
            executed.cycles
        );
        while bus.cycles() < target {
            bus.step()?;
        }
        Ok(executed.cycles)
    }

    /// Commit an EI that was pending before the instruction just executed,
    /// wake from HALT on any pending interrupt, and dispatch the
    /// highest-priority one if IME allows.
    pub fn check_pending_interrupts(&mut self, bus: &mut Bus) -> Result<()> {
        if std::mem::take(&mut self.ime_armed) && self.ime_pending {
            bus.interrupts_mut().set_ime(true);
            self.ime_pending = false;
        }

        if !bus.interrupts().has_pending() {
            return Ok(());
        }
        self.halted = false;

        if let Some(interrupt) = bus.interrupts_mut().serve() {
            self.execute_interrupt(bus, interrupt)?;
        }
        Ok(())
    }

    /// Push PC and jump to the vector. The IF bit and IME were already
    /// cleared by [`InterruptController::serve`](crate::interrupts::InterruptController::serve).
    /// Costs five bus steps.
    pub fn execute_interrupt(&mut self, bus: &mut Bus, interrupt: Interrupt) -> Result<()> {
        self.halted = false;
        let mut ret = self.regs.pc;
        // EI; HALT with an interrupt already pending returns to the HALT.
        if std::mem::take(&mut self.halt_bug) {
            ret = ret.wrapping_sub(1);
        }

        self.idle(bus)?;
        self.idle(bus)?;
        self.push16(bus, ret)?;
        self.regs.pc = interrupt.vector();
        self.idle(bus)?;

        trace!("dispatched {interrupt:?}, return to {ret:04X}");
        Ok(())
    }

    #[inline]
    fn idle(&mut self, bus: &mut Bus) -> Result<()> {
        bus.step()
    }

    fn read_mem(&mut self, bus: &mut Bus, addr: u16) -> Result<u8> {
        bus.load(addr, true, false)
    }

    fn write_mem(&mut self, bus: &mut Bus, addr: u16, val: u8) -> Result<()> {
        bus.store(addr, val, true, false)
    }

    fn read_imm8(&mut self, bus: &mut Bus) -> Result<u8> {
        let val = self.read_mem(bus, self.cursor)?;
        self.cursor = self.cursor.wrapping_add(1);
        Ok(val)
    }

    fn read_imm16(&mut self, bus: &mut Bus) -> Result<u16> {
        let lo = self.read_imm8(bus)?;
        let hi = self.read_imm8(bus)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read8(&mut self, bus: &mut Bus, r: R8) -> Result<u8> {
        match self.regs.get8(r) {
            Some(val) => Ok(val),
            None => self.read_mem(bus, self.regs.hl()),
        }
    }

    fn write8(&mut self, bus: &mut Bus, r: R8, val: u8) -> Result<()> {
        if self.regs.set8(r, val) {
            Ok(())
        } else {
            self.write_mem(bus, self.regs.hl(), val)
        }
    }

    fn push16(&mut self, bus: &mut Bus, val: u16) -> Result<()> {
        let [lo, hi] = val.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_mem(bus, self.regs.sp, hi)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_mem(bus, self.regs.sp, lo)
    }

    fn pop16(&mut self, bus: &mut Bus) -> Result<u16> {
        let lo = self.read_mem(bus, self.regs.sp)?;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read_mem(bus, self.regs.sp)?;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        Ok(u16::from_le_bytes([lo, hi]))
    }
}
