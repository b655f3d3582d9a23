//! Unprefixed instruction handlers, one per opcode family.
//!
//! Cycle counts are the documented totals including the opcode fetch;
//! [`Cpu::execute`] pads whatever the handler did not spend on the bus.

use super::alu::{self, AluOp, RotOp};
use super::registers::{Condition, FLAG_C, FLAG_H, FLAG_N, FLAG_Z, R8, R16};
use super::{Cpu, Executed, Instruction};
use crate::bus::Bus;
use crate::error::Result;

const IO_PAGE: u16 = 0xFF00;

/// Memory operand costs one extra read (and write, for read-modify-write).
fn cost(r: R8, reg: u32, mem: u32) -> u32 {
    if r == R8::HlIndirect { mem } else { reg }
}

fn apply_alu(cpu: &mut Cpu, op: AluOp, val: u8) {
    let (res, flags) = alu::alu(op, cpu.regs.a, val, cpu.regs.f());
    cpu.regs.a = res;
    cpu.regs.set_f(flags);
}

/// (BC), (DE), (HL+), (HL-) for the `LD (rr),A` / `LD A,(rr)` group.
fn indirect_address(cpu: &mut Cpu, p: u8) -> u16 {
    match p {
        0 => cpu.regs.get16(R16::BC),
        1 => cpu.regs.get16(R16::DE),
        2 => {
            let hl = cpu.regs.hl();
            cpu.regs.set_hl(hl.wrapping_add(1));
            hl
        }
        _ => {
            let hl = cpu.regs.hl();
            cpu.regs.set_hl(hl.wrapping_sub(1));
            hl
        }
    }
}

pub(super) fn halted(_: &mut Cpu, _: &mut Bus, _: Instruction) -> Result<Executed> {
    Ok(Executed::next(4))
}

pub(super) fn nop(_: &mut Cpu, _: &mut Bus, _: Instruction) -> Result<Executed> {
    Ok(Executed::next(4))
}

pub(super) fn ld_nn_sp(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let addr = cpu.read_imm16(bus)?;
    let [lo, hi] = cpu.regs.sp.to_le_bytes();
    cpu.write_mem(bus, addr, lo)?;
    cpu.write_mem(bus, addr.wrapping_add(1), hi)?;
    Ok(Executed::next(20))
}

pub(super) fn stop(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    if !bus.try_speed_switch() {
        bus.reset_divider();
        cpu.stopped = true;
    }
    Ok(Executed::next(4))
}

pub(super) fn jr(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let offset = cpu.read_imm8(bus)?;
    cpu.regs.pc = cpu.fallthrough.wrapping_add(offset as i8 as u16);
    Ok(Executed::jump(12))
}

pub(super) fn jr_cc(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let offset = cpu.read_imm8(bus)?;
    if !cpu.regs.condition(Condition::from_field(ins.y() - 4)) {
        return Ok(Executed::next(8));
    }
    cpu.regs.pc = cpu.fallthrough.wrapping_add(offset as i8 as u16);
    Ok(Executed::jump(12))
}

pub(super) fn ld_rp_nn(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let val = cpu.read_imm16(bus)?;
    cpu.regs.set16(R16::rp(ins.p()), val);
    Ok(Executed::next(12))
}

pub(super) fn add_hl_rp(cpu: &mut Cpu, _: &mut Bus, ins: Instruction) -> Result<Executed> {
    let rhs = cpu.regs.get16(R16::rp(ins.p()));
    let (res, flags) = alu::add16(cpu.regs.hl(), rhs, cpu.regs.f());
    cpu.regs.set_hl(res);
    cpu.regs.set_f(flags);
    Ok(Executed::next(8))
}

pub(super) fn ld_indirect_a(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let addr = indirect_address(cpu, ins.p());
    cpu.write_mem(bus, addr, cpu.regs.a)?;
    Ok(Executed::next(8))
}

pub(super) fn ld_a_indirect(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let addr = indirect_address(cpu, ins.p());
    cpu.regs.a = cpu.read_mem(bus, addr)?;
    Ok(Executed::next(8))
}

pub(super) fn inc_rp(cpu: &mut Cpu, _: &mut Bus, ins: Instruction) -> Result<Executed> {
    let rp = R16::rp(ins.p());
    cpu.regs.set16(rp, cpu.regs.get16(rp).wrapping_add(1));
    Ok(Executed::next(8))
}

pub(super) fn dec_rp(cpu: &mut Cpu, _: &mut Bus, ins: Instruction) -> Result<Executed> {
    let rp = R16::rp(ins.p());
    cpu.regs.set16(rp, cpu.regs.get16(rp).wrapping_sub(1));
    Ok(Executed::next(8))
}

pub(super) fn inc_r(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.y());
    let val = cpu.read8(bus, r)?;
    let (res, flags) = alu::inc8(val, cpu.regs.f());
    cpu.write8(bus, r, res)?;
    cpu.regs.set_f(flags);
    Ok(Executed::next(cost(r, 4, 12)))
}

pub(super) fn dec_r(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.y());
    let val = cpu.read8(bus, r)?;
    let (res, flags) = alu::dec8(val, cpu.regs.f());
    cpu.write8(bus, r, res)?;
    cpu.regs.set_f(flags);
    Ok(Executed::next(cost(r, 4, 12)))
}

pub(super) fn ld_r_n(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.y());
    let val = cpu.read_imm8(bus)?;
    cpu.write8(bus, r, val)?;
    Ok(Executed::next(cost(r, 8, 12)))
}

/// RLCA RRCA RLA RRA DAA CPL SCF CCF
pub(super) fn accumulator(cpu: &mut Cpu, _: &mut Bus, ins: Instruction) -> Result<Executed> {
    let regs = &mut cpu.regs;
    match ins.y() {
        y @ 0..=3 => {
            let (res, flags) = alu::rotate(RotOp::from_field(y), regs.a, regs.f());
            regs.a = res;
            regs.set_f(flags & !FLAG_Z);
        }
        4 => {
            let (res, flags) = alu::daa(regs.a, regs.f());
            regs.a = res;
            regs.set_f(flags);
        }
        5 => {
            regs.a = !regs.a;
            regs.set_flag(FLAG_N | FLAG_H, true);
        }
        6 => {
            regs.set_flag(FLAG_N | FLAG_H, false);
            regs.set_flag(FLAG_C, true);
        }
        _ => {
            let carry = regs.flag(FLAG_C);
            regs.set_flag(FLAG_N | FLAG_H, false);
            regs.set_flag(FLAG_C, !carry);
        }
    }
    Ok(Executed::next(4))
}

pub(super) fn halt(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let interrupts = bus.interrupts();
    if !interrupts.ime() && interrupts.has_pending() {
        cpu.halt_bug = true;
    } else {
        cpu.halted = true;
    }
    Ok(Executed::next(4))
}

pub(super) fn ld_r_r(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let (dst, src) = (R8::from_field(ins.y()), R8::from_field(ins.z()));
    let val = cpu.read8(bus, src)?;
    cpu.write8(bus, dst, val)?;
    let mem = dst == R8::HlIndirect || src == R8::HlIndirect;
    Ok(Executed::next(if mem { 8 } else { 4 }))
}

pub(super) fn alu_r(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.z());
    let val = cpu.read8(bus, r)?;
    apply_alu(cpu, AluOp::from_field(ins.y()), val);
    Ok(Executed::next(cost(r, 4, 8)))
}

pub(super) fn alu_n(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let val = cpu.read_imm8(bus)?;
    apply_alu(cpu, AluOp::from_field(ins.y()), val);
    Ok(Executed::next(8))
}

pub(super) fn ret_cc(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    cpu.idle(bus)?;
    if !cpu.regs.condition(Condition::from_field(ins.y())) {
        return Ok(Executed::next(8));
    }
    cpu.regs.pc = cpu.pop16(bus)?;
    cpu.idle(bus)?;
    Ok(Executed::jump(20))
}

pub(super) fn ldh_n_a(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let offset = cpu.read_imm8(bus)?;
    cpu.write_mem(bus, IO_PAGE | offset as u16, cpu.regs.a)?;
    Ok(Executed::next(12))
}

pub(super) fn ldh_a_n(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let offset = cpu.read_imm8(bus)?;
    cpu.regs.a = cpu.read_mem(bus, IO_PAGE | offset as u16)?;
    Ok(Executed::next(12))
}

pub(super) fn add_sp_e(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let offset = cpu.read_imm8(bus)?;
    let (res, flags) = alu::add_sp(cpu.regs.sp, offset);
    cpu.regs.sp = res;
    cpu.regs.set_f(flags);
    Ok(Executed::next(16))
}

pub(super) fn ld_hl_sp_e(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let offset = cpu.read_imm8(bus)?;
    let (res, flags) = alu::add_sp(cpu.regs.sp, offset);
    cpu.regs.set_hl(res);
    cpu.regs.set_f(flags);
    Ok(Executed::next(12))
}

pub(super) fn pop(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let val = cpu.pop16(bus)?;
    cpu.regs.set16(R16::rp2(ins.p()), val);
    Ok(Executed::next(12))
}

pub(super) fn push(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    cpu.idle(bus)?;
    let val = cpu.regs.get16(R16::rp2(ins.p()));
    cpu.push16(bus, val)?;
    Ok(Executed::next(16))
}

pub(super) fn ret(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.regs.pc = cpu.pop16(bus)?;
    cpu.idle(bus)?;
    Ok(Executed::jump(16))
}

/// RETI enables IME right away, unlike EI.
pub(super) fn reti(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.regs.pc = cpu.pop16(bus)?;
    bus.interrupts_mut().set_ime(true);
    cpu.idle(bus)?;
    Ok(Executed::jump(16))
}

pub(super) fn jp_hl(cpu: &mut Cpu, _: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.regs.pc = cpu.regs.hl();
    Ok(Executed::jump(4))
}

pub(super) fn ld_sp_hl(cpu: &mut Cpu, _: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.regs.sp = cpu.regs.hl();
    Ok(Executed::next(8))
}

pub(super) fn jp(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.regs.pc = cpu.read_imm16(bus)?;
    Ok(Executed::jump(16))
}

pub(super) fn jp_cc(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let addr = cpu.read_imm16(bus)?;
    if !cpu.regs.condition(Condition::from_field(ins.y())) {
        return Ok(Executed::next(12));
    }
    cpu.regs.pc = addr;
    Ok(Executed::jump(16))
}

pub(super) fn ld_c_a(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.write_mem(bus, IO_PAGE | cpu.regs.c as u16, cpu.regs.a)?;
    Ok(Executed::next(8))
}

pub(super) fn ld_a_c(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.regs.a = cpu.read_mem(bus, IO_PAGE | cpu.regs.c as u16)?;
    Ok(Executed::next(8))
}

pub(super) fn ld_nn_a(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let addr = cpu.read_imm16(bus)?;
    cpu.write_mem(bus, addr, cpu.regs.a)?;
    Ok(Executed::next(16))
}

pub(super) fn ld_a_nn(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let addr = cpu.read_imm16(bus)?;
    cpu.regs.a = cpu.read_mem(bus, addr)?;
    Ok(Executed::next(16))
}

/// DI is immediate and also drops an EI that has not taken effect yet.
pub(super) fn di(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    bus.interrupts_mut().set_ime(false);
    cpu.ime_pending = false;
    Ok(Executed::next(4))
}

pub(super) fn ei(cpu: &mut Cpu, _: &mut Bus, _: Instruction) -> Result<Executed> {
    cpu.ime_pending = true;
    Ok(Executed::next(4))
}

pub(super) fn call(cpu: &mut Cpu, bus: &mut Bus, _: Instruction) -> Result<Executed> {
    let addr = cpu.read_imm16(bus)?;
    cpu.idle(bus)?;
    cpu.push16(bus, cpu.fallthrough)?;
    cpu.regs.pc = addr;
    Ok(Executed::jump(24))
}

pub(super) fn call_cc(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let addr = cpu.read_imm16(bus)?;
    if !cpu.regs.condition(Condition::from_field(ins.y())) {
        return Ok(Executed::next(12));
    }
    cpu.idle(bus)?;
    cpu.push16(bus, cpu.fallthrough)?;
    cpu.regs.pc = addr;
    Ok(Executed::jump(24))
}

pub(super) fn rst(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    cpu.idle(bus)?;
    cpu.push16(bus, cpu.fallthrough)?;
    cpu.regs.pc = ins.y() as u16 * 8;
    Ok(Executed::jump(16))
}
