use std::fmt;

use crate::hardware::Model;

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

/// 8-bit operand selector decoded from a 3-bit opcode field.
///
/// `HlIndirect` is the "operand is memory at HL" sentinel; it never names a
/// register and the CPU resolves it through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum R8 {
    B,
    C,
    D,
    E,
    H,
    L,
    HlIndirect,
    A,
}

impl R8 {
    pub const TABLE: [R8; 8] = [
        R8::B,
        R8::C,
        R8::D,
        R8::E,
        R8::H,
        R8::L,
        R8::HlIndirect,
        R8::A,
    ];

    pub fn from_field(field: u8) -> R8 {
        R8::TABLE[(field & 7) as usize]
    }
}

/// 16-bit register pair selector. `rp` uses SP in slot 3, `rp2` uses AF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum R16 {
    BC,
    DE,
    HL,
    SP,
    AF,
}

impl R16 {
    pub fn rp(field: u8) -> R16 {
        [R16::BC, R16::DE, R16::HL, R16::SP][(field & 3) as usize]
    }

    pub fn rp2(field: u8) -> R16 {
        [R16::BC, R16::DE, R16::HL, R16::AF][(field & 3) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NotZero,
    Zero,
    NotCarry,
    Carry,
}

impl Condition {
    pub fn from_field(field: u8) -> Condition {
        [
            Condition::NotZero,
            Condition::Zero,
            Condition::NotCarry,
            Condition::Carry,
        ][(field & 3) as usize]
    }
}

/// The LR35902 register file.
///
/// The low nibble of F always reads as zero; every write path goes
/// through [`Registers::set_f`] to keep it that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub a: u8,
    f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// Register state at power-on, before any boot ROM runs.
    pub fn power_on() -> Self {
        Self::default()
    }

    /// Register state the boot ROM leaves behind on `model`.
    pub fn post_boot(model: Model) -> Self {
        let [a, f, b, c, d, e, h, l] = model.post_boot_registers();
        let mut regs = Self {
            a,
            f: 0,
            b,
            c,
            d,
            e,
            h,
            l,
            sp: BOOT_SP,
            pc: BOOT_PC,
        };
        regs.set_f(f);
        regs
    }

    pub fn f(&self) -> u8 {
        self.f
    }

    pub fn set_f(&mut self, val: u8) {
        self.f = val & 0xF0;
    }

    pub fn flag(&self, mask: u8) -> bool {
        self.f & mask != 0
    }

    pub fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.set_f(self.f | mask);
        } else {
            self.set_f(self.f & !mask);
        }
    }

    pub fn condition(&self, cond: Condition) -> bool {
        match cond {
            Condition::NotZero => !self.flag(FLAG_Z),
            Condition::Zero => self.flag(FLAG_Z),
            Condition::NotCarry => !self.flag(FLAG_C),
            Condition::Carry => self.flag(FLAG_C),
        }
    }

    /// Plain register read. `HlIndirect` has no register backing and yields
    /// `None`.
    pub fn get8(&self, r: R8) -> Option<u8> {
        Some(match r {
            R8::B => self.b,
            R8::C => self.c,
            R8::D => self.d,
            R8::E => self.e,
            R8::H => self.h,
            R8::L => self.l,
            R8::A => self.a,
            R8::HlIndirect => return None,
        })
    }

    /// Returns false for `HlIndirect`, which the caller must route to memory.
    pub fn set8(&mut self, r: R8, val: u8) -> bool {
        match r {
            R8::B => self.b = val,
            R8::C => self.c = val,
            R8::D => self.d = val,
            R8::E => self.e = val,
            R8::H => self.h = val,
            R8::L => self.l = val,
            R8::A => self.a = val,
            R8::HlIndirect => return false,
        }
        true
    }

    pub fn get16(&self, r: R16) -> u16 {
        match r {
            R16::BC => u16::from_be_bytes([self.b, self.c]),
            R16::DE => u16::from_be_bytes([self.d, self.e]),
            R16::HL => u16::from_be_bytes([self.h, self.l]),
            R16::AF => u16::from_be_bytes([self.a, self.f]),
            R16::SP => self.sp,
        }
    }

    pub fn set16(&mut self, r: R16, val: u16) {
        let [hi, lo] = val.to_be_bytes();
        match r {
            R16::BC => (self.b, self.c) = (hi, lo),
            R16::DE => (self.d, self.e) = (hi, lo),
            R16::HL => (self.h, self.l) = (hi, lo),
            R16::AF => {
                self.a = hi;
                self.set_f(lo);
            }
            R16::SP => self.sp = val,
        }
    }

    pub fn hl(&self) -> u16 {
        self.get16(R16::HL)
    }

    pub fn set_hl(&mut self, val: u16) {
        self.set16(R16::HL, val);
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X}",
            self.get16(R16::AF),
            self.get16(R16::BC),
            self.get16(R16::DE),
            self.hl(),
            self.pc,
            self.sp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_nibble_of_f_is_always_zero() {
        let mut regs = Registers::power_on();
        regs.set16(R16::AF, 0x12FF);
        assert_eq!(regs.a, 0x12);
        assert_eq!(regs.f(), 0xF0);
        assert_eq!(regs.get16(R16::AF), 0x12F0);
    }

    #[test]
    fn post_boot_values() {
        let dmg = Registers::post_boot(Model::Dmg);
        assert_eq!(dmg.get16(R16::AF), 0x01B0);
        assert_eq!(dmg.get16(R16::BC), 0x0013);
        assert_eq!(dmg.get16(R16::DE), 0x00D8);
        assert_eq!(dmg.hl(), 0x014D);
        assert_eq!(dmg.sp, 0xFFFE);
        assert_eq!(dmg.pc, 0x0100);

        let cgb = Registers::post_boot(Model::Cgb);
        assert_eq!(cgb.a, 0x11);
        assert_eq!(cgb.hl(), 0x000D);
    }

    #[test]
    fn hl_indirect_has_no_register() {
        let mut regs = Registers::power_on();
        assert_eq!(regs.get8(R8::HlIndirect), None);
        assert!(!regs.set8(R8::HlIndirect, 1));
        assert!(regs.set8(R8::A, 1));
        assert_eq!(regs.get8(R8::from_field(7)), Some(1));
    }
}
