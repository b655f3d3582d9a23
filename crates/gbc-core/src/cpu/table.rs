//! The two 256-entry decode tables. A `None` entry is an illegal opcode.

use super::{Cpu, Executed, Instruction, cb, ops};
use crate::bus::Bus;
use crate::error::Result;

pub type Handler = fn(&mut Cpu, &mut Bus, Instruction) -> Result<Executed>;

pub static UNPREFIXED: [Option<Handler>; 256] = build(false);
pub static PREFIXED: [Option<Handler>; 256] = build(true);

const fn h(handler: Handler) -> Option<Handler> {
    Some(handler)
}

const fn build(prefixed: bool) -> [Option<Handler>; 256] {
    let mut table: [Option<Handler>; 256] = [None; 256];
    let mut i = 0;
    while i < 256 {
        let ins = Instruction::new(i as u8, prefixed);
        table[i] = if prefixed {
            prefixed_entry(ins)
        } else {
            unprefixed_entry(ins)
        };
        i += 1;
    }
    table
}

const fn prefixed_entry(ins: Instruction) -> Option<Handler> {
    match ins.x() {
        0 => h(cb::rot),
        1 => h(cb::bit),
        2 => h(cb::res),
        _ => h(cb::set),
    }
}

const fn unprefixed_entry(ins: Instruction) -> Option<Handler> {
    let (y, z, q, p) = (ins.y(), ins.z(), ins.q(), ins.p());
    match ins.x() {
        0 => match z {
            0 => match y {
                0 => h(ops::nop),
                1 => h(ops::ld_nn_sp),
                2 => h(ops::stop),
                3 => h(ops::jr),
                _ => h(ops::jr_cc),
            },
            1 if q == 0 => h(ops::ld_rp_nn),
            1 => h(ops::add_hl_rp),
            2 if q == 0 => h(ops::ld_indirect_a),
            2 => h(ops::ld_a_indirect),
            3 if q == 0 => h(ops::inc_rp),
            3 => h(ops::dec_rp),
            4 => h(ops::inc_r),
            5 => h(ops::dec_r),
            6 => h(ops::ld_r_n),
            _ => h(ops::accumulator),
        },
        // LD (HL),(HL) is HALT
        1 if y == 6 && z == 6 => h(ops::halt),
        1 => h(ops::ld_r_r),
        2 => h(ops::alu_r),
        _ => match z {
            0 => match y {
                0..=3 => h(ops::ret_cc),
                4 => h(ops::ldh_n_a),
                5 => h(ops::add_sp_e),
                6 => h(ops::ldh_a_n),
                _ => h(ops::ld_hl_sp_e),
            },
            1 if q == 0 => h(ops::pop),
            1 => match p {
                0 => h(ops::ret),
                1 => h(ops::reti),
                2 => h(ops::jp_hl),
                _ => h(ops::ld_sp_hl),
            },
            2 => match y {
                0..=3 => h(ops::jp_cc),
                4 => h(ops::ld_c_a),
                5 => h(ops::ld_nn_a),
                6 => h(ops::ld_a_c),
                _ => h(ops::ld_a_nn),
            },
            // y == 1 is the CB prefix, consumed by fetch.
            3 => match y {
                0 => h(ops::jp),
                6 => h(ops::di),
                7 => h(ops::ei),
                _ => None,
            },
            4 => match y {
                0..=3 => h(ops::call_cc),
                _ => None,
            },
            5 if q == 0 => h(ops::push),
            5 if p == 0 => h(ops::call),
            5 => None,
            6 => h(ops::alu_n),
            _ => h(ops::rst),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ILLEGAL: [u8; 11] = [
        0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
    ];

    #[test]
    fn only_illegal_opcodes_and_prefix_are_missing() {
        for op in 0..=255u8 {
            let expected_missing = ILLEGAL.contains(&op) || op == 0xCB;
            assert_eq!(
                UNPREFIXED[op as usize].is_none(),
                expected_missing,
                "opcode {op:02X}"
            );
        }
    }

    #[test]
    fn every_prefixed_opcode_is_decoded() {
        assert!(PREFIXED.iter().all(Option::is_some));
    }
}
