//! 0xCB-prefixed handlers: shifts/rotates, BIT, RES and SET on r[z].

use super::alu::{self, RotOp};
use super::registers::R8;
use super::{Cpu, Executed, Instruction};
use crate::bus::Bus;
use crate::error::Result;

fn cost(r: R8, reg: u32, mem: u32) -> u32 {
    if r == R8::HlIndirect { mem } else { reg }
}

pub(super) fn rot(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.z());
    let val = cpu.read8(bus, r)?;
    let (res, flags) = alu::rotate(RotOp::from_field(ins.y()), val, cpu.regs.f());
    cpu.write8(bus, r, res)?;
    cpu.regs.set_f(flags);
    Ok(Executed::next(cost(r, 8, 16)))
}

pub(super) fn bit(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.z());
    let val = cpu.read8(bus, r)?;
    let flags = alu::bit(ins.y(), val, cpu.regs.f());
    cpu.regs.set_f(flags);
    Ok(Executed::next(cost(r, 8, 12)))
}

pub(super) fn res(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.z());
    let val = cpu.read8(bus, r)?;
    cpu.write8(bus, r, val & !(1 << ins.y()))?;
    Ok(Executed::next(cost(r, 8, 16)))
}

pub(super) fn set(cpu: &mut Cpu, bus: &mut Bus, ins: Instruction) -> Result<Executed> {
    let r = R8::from_field(ins.z());
    let val = cpu.read8(bus, r)?;
    cpu.write8(bus, r, val | (1 << ins.y()))?;
    Ok(Executed::next(cost(r, 8, 16)))
}
