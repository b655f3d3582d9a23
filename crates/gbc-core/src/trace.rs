use log::{Level, log_enabled, trace};

use crate::cpu::{Instruction, Registers};

/// Hook called with every decoded instruction before it runs.
pub trait InstructionTracer: Send {
    fn trace(&mut self, pc: u16, instruction: &Instruction, regs: &Registers);
}

/// Writes one `trace!` line per instruction.
#[derive(Debug, Default)]
pub struct LogTracer;

impl InstructionTracer for LogTracer {
    fn trace(&mut self, pc: u16, instruction: &Instruction, regs: &Registers) {
        if !log_enabled!(Level::Trace) {
            return;
        }
        if instruction.halted {
            trace!("{pc:04X}: <halted> {regs}");
        } else if instruction.prefixed {
            trace!("{pc:04X}: CB {:02X} {regs}", instruction.opcode);
        } else {
            trace!(
                "{pc:04X}: {:02X} ({} bytes) {regs}",
                instruction.opcode,
                instruction.length()
            );
        }
    }
}
