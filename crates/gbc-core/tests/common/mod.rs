#![allow(dead_code)]

use gbc_core::{EmuConfig, EmulationMode, GameBoy, cartridge::Cartridge};

pub const PROGRAM_START: u16 = 0x0150;

/// Offset inside every ROM bank that holds the bank's own number.
pub const BANK_MARKER: usize = 0x1000;

/// A blank ROM image with a header for `kind`. Each 16 KiB bank carries its
/// index at [`BANK_MARKER`].
pub fn rom(kind: u8, rom_size_code: u8, ram_size_code: u8) -> Vec<u8> {
    let len = 0x8000usize << rom_size_code;
    let mut rom = vec![0u8; len];
    for bank in 0..len / 0x4000 {
        rom[bank * 0x4000 + BANK_MARKER] = bank as u8;
    }
    rom[0x0147] = kind;
    rom[0x0148] = rom_size_code;
    rom[0x0149] = ram_size_code;
    rom
}

/// A machine in post-boot state with `program` at 0x0150, PC pointing at it
/// and every interrupt source disabled in IE.
pub fn machine(program: &[u8], mode: EmulationMode) -> GameBoy {
    let mut image = rom(0x00, 0, 0);
    let start = PROGRAM_START as usize;
    image[start..start + program.len()].copy_from_slice(program);

    let mut gb = GameBoy::new(EmuConfig {
        mode,
        ..EmuConfig::default()
    });
    gb.load_cartridge(Cartridge::from_bytes(image).unwrap());
    gb.cpu.regs.pc = PROGRAM_START;
    gb.bus.write_byte(0xFFFF, 0x00).unwrap();
    gb
}

pub fn dmg(program: &[u8]) -> GameBoy {
    machine(program, EmulationMode::ForceDmg)
}

pub fn cgb(program: &[u8]) -> GameBoy {
    machine(program, EmulationMode::ForceCgb)
}
