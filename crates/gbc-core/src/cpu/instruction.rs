pub const PREFIX: u8 = 0xCB;

/// Byte length of every unprefixed opcode. Prefixed opcodes are always 2.
/// Illegal opcodes are listed as 1.
#[rustfmt::skip]
const LENGTHS: [u8; 256] = [
//  0  1  2  3  4  5  6  7  8  9  A  B  C  D  E  F
    1, 3, 1, 1, 1, 1, 2, 1, 3, 1, 1, 1, 1, 1, 2, 1, // 0x
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1, // 1x
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1, // 2x
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1, // 3x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 4x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 5x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 6x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 7x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 8x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 9x
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // Ax
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // Bx
    1, 1, 3, 3, 3, 1, 2, 1, 1, 1, 3, 2, 3, 3, 2, 1, // Cx
    1, 1, 3, 1, 3, 1, 2, 1, 1, 1, 3, 1, 3, 1, 2, 1, // Dx
    2, 1, 1, 1, 1, 1, 2, 1, 2, 1, 3, 1, 1, 1, 2, 1, // Ex
    2, 1, 1, 1, 1, 1, 2, 1, 2, 1, 3, 1, 1, 1, 2, 1, // Fx
];

/// A fetched opcode split into the x/y/z and p/q fields used for decoding.
///
/// ```text
///   7 6 5 4 3 2 1 0
///  [ x ][  y  ][ z ]
///       [p ][q]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub prefixed: bool,
    /// Synthesized while the CPU is halted; never read from memory.
    pub halted: bool,
}

impl Instruction {
    pub const HALTED: Instruction = Instruction {
        opcode: 0x00,
        prefixed: false,
        halted: true,
    };

    pub const fn new(opcode: u8, prefixed: bool) -> Self {
        Self {
            opcode,
            prefixed,
            halted: false,
        }
    }

    #[inline]
    pub const fn x(self) -> u8 {
        self.opcode >> 6
    }

    #[inline]
    pub const fn y(self) -> u8 {
        (self.opcode >> 3) & 7
    }

    #[inline]
    pub const fn z(self) -> u8 {
        self.opcode & 7
    }

    #[inline]
    pub const fn p(self) -> u8 {
        (self.opcode >> 4) & 3
    }

    #[inline]
    pub const fn q(self) -> u8 {
        (self.opcode >> 3) & 1
    }

    /// Bytes consumed from the instruction stream, prefix included.
    pub const fn length(self) -> u16 {
        if self.halted {
            0
        } else if self.prefixed {
            2
        } else {
            LENGTHS[self.opcode as usize] as u16
        }
    }
}
