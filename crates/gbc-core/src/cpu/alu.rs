//! Flag-producing arithmetic. Every function takes the incoming F value and
//! returns `(result, new_flags)`; nothing here touches CPU state.

use super::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub fn from_field(field: u8) -> AluOp {
        [
            AluOp::Add,
            AluOp::Adc,
            AluOp::Sub,
            AluOp::Sbc,
            AluOp::And,
            AluOp::Xor,
            AluOp::Or,
            AluOp::Cp,
        ][(field & 7) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
}

impl RotOp {
    pub fn from_field(field: u8) -> RotOp {
        [
            RotOp::Rlc,
            RotOp::Rrc,
            RotOp::Rl,
            RotOp::Rr,
            RotOp::Sla,
            RotOp::Sra,
            RotOp::Swap,
            RotOp::Srl,
        ][(field & 7) as usize]
    }
}

#[inline]
fn z(val: u8) -> u8 {
    if val == 0 { FLAG_Z } else { 0 }
}

#[inline]
fn set(cond: bool, mask: u8) -> u8 {
    if cond { mask } else { 0 }
}

pub fn add8(a: u8, b: u8, carry_in: bool) -> (u8, u8) {
    let c = carry_in as u16;
    let wide = a as u16 + b as u16 + c;
    let res = wide as u8;
    let half = (a & 0x0F) as u16 + (b & 0x0F) as u16 + c > 0x0F;
    (res, z(res) | set(half, FLAG_H) | set(wide > 0xFF, FLAG_C))
}

pub fn sub8(a: u8, b: u8, carry_in: bool) -> (u8, u8) {
    let c = carry_in as u16;
    let res = a.wrapping_sub(b).wrapping_sub(c as u8);
    let half = ((a & 0x0F) as u16) < (b & 0x0F) as u16 + c;
    let borrow = (a as u16) < b as u16 + c;
    (
        res,
        z(res) | FLAG_N | set(half, FLAG_H) | set(borrow, FLAG_C),
    )
}

/// The eight accumulator operations. CP leaves `a` unchanged.
pub fn alu(op: AluOp, a: u8, b: u8, flags: u8) -> (u8, u8) {
    let carry = flags & FLAG_C != 0;
    match op {
        AluOp::Add => add8(a, b, false),
        AluOp::Adc => add8(a, b, carry),
        AluOp::Sub => sub8(a, b, false),
        AluOp::Sbc => sub8(a, b, carry),
        AluOp::And => {
            let res = a & b;
            (res, z(res) | FLAG_H)
        }
        AluOp::Xor => {
            let res = a ^ b;
            (res, z(res))
        }
        AluOp::Or => {
            let res = a | b;
            (res, z(res))
        }
        AluOp::Cp => (a, sub8(a, b, false).1),
    }
}

pub fn inc8(val: u8, flags: u8) -> (u8, u8) {
    let res = val.wrapping_add(1);
    (
        res,
        z(res) | set(val & 0x0F == 0x0F, FLAG_H) | (flags & FLAG_C),
    )
}

pub fn dec8(val: u8, flags: u8) -> (u8, u8) {
    let res = val.wrapping_sub(1);
    (
        res,
        z(res) | FLAG_N | set(val & 0x0F == 0, FLAG_H) | (flags & FLAG_C),
    )
}

/// ADD HL,rr. Z is preserved; H and C come from bits 11 and 15.
pub fn add16(hl: u16, rr: u16, flags: u8) -> (u16, u8) {
    let (res, carry) = hl.overflowing_add(rr);
    let half = (hl & 0x0FFF) + (rr & 0x0FFF) > 0x0FFF;
    (
        res,
        (flags & FLAG_Z) | set(half, FLAG_H) | set(carry, FLAG_C),
    )
}

/// SP plus a signed byte, as used by ADD SP,e and LD HL,SP+e. Flags come
/// from the unsigned low-byte addition.
pub fn add_sp(sp: u16, offset: u8) -> (u16, u8) {
    let res = sp.wrapping_add(offset as i8 as u16);
    let half = (sp & 0x0F) + (offset as u16 & 0x0F) > 0x0F;
    let carry = (sp & 0xFF) + offset as u16 > 0xFF;
    (res, set(half, FLAG_H) | set(carry, FLAG_C))
}

pub fn daa(a: u8, flags: u8) -> (u8, u8) {
    let subtract = flags & FLAG_N != 0;
    let mut carry = flags & FLAG_C != 0;
    let half = flags & FLAG_H != 0;
    let mut adjust = 0u8;

    let res = if subtract {
        if carry {
            adjust |= 0x60;
        }
        if half {
            adjust |= 0x06;
        }
        a.wrapping_sub(adjust)
    } else {
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        if half || a & 0x0F > 0x09 {
            adjust |= 0x06;
        }
        a.wrapping_add(adjust)
    };

    (res, z(res) | (flags & FLAG_N) | set(carry, FLAG_C))
}

/// CB-prefixed shifts and rotates. Z reflects the result; the unprefixed
/// accumulator forms clear it afterwards.
pub fn rotate(op: RotOp, val: u8, flags: u8) -> (u8, u8) {
    let carry_in = flags & FLAG_C != 0;
    let (res, carry_out) = match op {
        RotOp::Rlc => (val.rotate_left(1), val & 0x80 != 0),
        RotOp::Rrc => (val.rotate_right(1), val & 0x01 != 0),
        RotOp::Rl => ((val << 1) | carry_in as u8, val & 0x80 != 0),
        RotOp::Rr => ((val >> 1) | ((carry_in as u8) << 7), val & 0x01 != 0),
        RotOp::Sla => (val << 1, val & 0x80 != 0),
        RotOp::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
        RotOp::Swap => (val.rotate_left(4), false),
        RotOp::Srl => (val >> 1, val & 0x01 != 0),
    };
    (res, z(res) | set(carry_out, FLAG_C))
}

pub fn bit(index: u8, val: u8, flags: u8) -> u8 {
    let zero = val & (1 << (index & 7)) == 0;
    set(zero, FLAG_Z) | FLAG_H | (flags & FLAG_C)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_sub_flags_exhaustive() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                let (res, f) = add8(a, b, false);
                assert_eq!(res, a.wrapping_add(b));
                assert_eq!(f & FLAG_Z != 0, res == 0);
                assert_eq!(f & FLAG_N, 0);
                assert_eq!(f & FLAG_H != 0, (a & 0xF) + (b & 0xF) > 0xF);
                assert_eq!(f & FLAG_C != 0, a as u16 + b as u16 > 0xFF);

                let (res, f) = sub8(a, b, false);
                assert_eq!(res, a.wrapping_sub(b));
                assert_eq!(f & FLAG_Z != 0, res == 0);
                assert_ne!(f & FLAG_N, 0);
                assert_eq!(f & FLAG_H != 0, (a & 0xF) < (b & 0xF));
                assert_eq!(f & FLAG_C != 0, a < b);
            }
        }
    }

    #[test]
    fn adc_and_sbc_use_carry() {
        assert_eq!(alu(AluOp::Adc, 0x0F, 0x00, FLAG_C), (0x10, FLAG_H));
        assert_eq!(alu(AluOp::Adc, 0xFF, 0x00, FLAG_C), (0x00, FLAG_Z | FLAG_H | FLAG_C));
        assert_eq!(
            alu(AluOp::Sbc, 0x00, 0x00, FLAG_C),
            (0xFF, FLAG_N | FLAG_H | FLAG_C)
        );
    }

    #[test]
    fn cp_keeps_accumulator() {
        assert_eq!(alu(AluOp::Cp, 0x42, 0x42, 0), (0x42, FLAG_Z | FLAG_N));
    }

    #[test]
    fn logic_ops() {
        assert_eq!(alu(AluOp::And, 0xF0, 0x0F, FLAG_C), (0x00, FLAG_Z | FLAG_H));
        assert_eq!(alu(AluOp::Xor, 0xFF, 0xFF, FLAG_C), (0x00, FLAG_Z));
        assert_eq!(alu(AluOp::Or, 0x10, 0x01, 0), (0x11, 0));
    }

    #[test]
    fn inc_dec_preserve_carry() {
        assert_eq!(inc8(0x0F, FLAG_C), (0x10, FLAG_H | FLAG_C));
        assert_eq!(inc8(0xFF, 0), (0x00, FLAG_Z | FLAG_H));
        assert_eq!(dec8(0x10, FLAG_C), (0x0F, FLAG_N | FLAG_H | FLAG_C));
        assert_eq!(dec8(0x01, 0), (0x00, FLAG_Z | FLAG_N));
    }

    #[test]
    fn add16_flags() {
        assert_eq!(add16(0x0FFF, 0x0001, FLAG_Z), (0x1000, FLAG_Z | FLAG_H));
        assert_eq!(add16(0xFFFF, 0x0001, 0), (0x0000, FLAG_H | FLAG_C));
    }

    #[test]
    fn add_sp_signed_offset() {
        assert_eq!(add_sp(0xFFF8, 0x08), (0x0000, FLAG_H | FLAG_C));
        assert_eq!(add_sp(0x0000, 0xFF), (0xFFFF, 0));
        assert_eq!(add_sp(0x00FF, 0x01), (0x0100, FLAG_H | FLAG_C));
    }

    #[test]
    fn daa_after_bcd_add_and_sub() {
        // 0x15 + 0x27 = 0x3C -> 0x42
        let (sum, f) = add8(0x15, 0x27, false);
        assert_eq!(daa(sum, f).0, 0x42);
        // 0x99 + 0x01 = 0x9A -> 0x00 with carry
        let (sum, f) = add8(0x99, 0x01, false);
        assert_eq!(daa(sum, f), (0x00, FLAG_Z | FLAG_C));
        // 0x42 - 0x15 = 0x2D -> 0x27
        let (diff, f) = sub8(0x42, 0x15, false);
        assert_eq!(daa(diff, f).0, 0x27);
    }

    #[test]
    fn rotates() {
        assert_eq!(rotate(RotOp::Rlc, 0x80, 0), (0x01, FLAG_C));
        assert_eq!(rotate(RotOp::Rl, 0x80, 0), (0x00, FLAG_Z | FLAG_C));
        assert_eq!(rotate(RotOp::Rr, 0x01, FLAG_C), (0x80, FLAG_C));
        assert_eq!(rotate(RotOp::Sra, 0x81, 0), (0xC0, FLAG_C));
        assert_eq!(rotate(RotOp::Swap, 0xAB, FLAG_C), (0xBA, 0));
        assert_eq!(rotate(RotOp::Srl, 0x01, 0), (0x00, FLAG_Z | FLAG_C));
    }

    #[test]
    fn bit_test() {
        assert_eq!(bit(7, 0x80, FLAG_C), FLAG_H | FLAG_C);
        assert_eq!(bit(0, 0x80, 0), FLAG_Z | FLAG_H);
    }
}
