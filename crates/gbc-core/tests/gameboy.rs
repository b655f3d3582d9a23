mod common;

use std::fs;

use common::rom;
use gbc_core::cartridge::Cartridge;
use gbc_core::hardware::Model;
use gbc_core::{EmuConfig, EmuError, EmulationMode, GameBoy};
use tempfile::tempdir;

fn cgb_cart() -> Cartridge {
    let mut image = rom(0x00, 0, 0);
    image[0x0143] = 0x80;
    Cartridge::from_bytes(image).unwrap()
}

#[test]
fn stepping_without_cartridge_fails() {
    let mut gb = GameBoy::new(EmuConfig::default());
    assert!(matches!(gb.step(), Err(EmuError::MissingCartridge)));
}

#[test]
fn auto_mode_follows_cartridge_header() {
    let mut gb = GameBoy::new(EmuConfig::default());
    gb.load_cartridge(cgb_cart());
    assert_eq!(gb.model(), Model::Cgb);
    assert_eq!(gb.cpu.regs.a, 0x11);

    let mut gb = GameBoy::new(EmuConfig {
        mode: EmulationMode::ForceDmg,
        ..EmuConfig::default()
    });
    gb.load_cartridge(cgb_cart());
    assert_eq!(gb.model(), Model::Dmg);
    assert_eq!(gb.cpu.regs.pc, 0x0100);
}

#[test]
fn cgb_without_boot_rom_is_an_error() {
    let mut gb = GameBoy::new(EmuConfig::default());
    let err = gb.insert_from_config(cgb_cart()).unwrap_err();
    assert!(matches!(err, EmuError::MissingBootRom { model: "CGB" }));
}

#[test]
fn dmg_without_boot_rom_starts_at_entry_point() {
    let mut gb = GameBoy::new(EmuConfig::default());
    gb.insert_from_config(Cartridge::from_bytes(rom(0x00, 0, 0)).unwrap())
        .unwrap();
    assert_eq!(gb.model(), Model::Dmg);
    assert_eq!(gb.cpu.regs.pc, 0x0100);
    assert!(!gb.bus.boot_rom_mapped());
}

#[test]
fn boot_rom_from_config_is_mapped() {
    let dir = tempdir().unwrap();
    let boot_path = dir.path().join("dmg_boot.bin");
    fs::write(&boot_path, [0x31; 0x100]).unwrap();

    let mut gb = GameBoy::new(EmuConfig {
        dmg_boot_rom: Some(boot_path),
        require_boot_rom: true,
        ..EmuConfig::default()
    });
    gb.insert_from_config(Cartridge::from_bytes(rom(0x00, 0, 0)).unwrap())
        .unwrap();
    assert_eq!(gb.cpu.regs.pc, 0x0000);
    assert!(gb.bus.boot_rom_mapped());
    assert_eq!(gb.bus.read_byte(0x0000).unwrap(), 0x31);
}

#[test]
fn unreadable_boot_rom_is_an_io_error() {
    let dir = tempdir().unwrap();
    let mut gb = GameBoy::new(EmuConfig {
        dmg_boot_rom: Some(dir.path().join("missing.bin")),
        ..EmuConfig::default()
    });
    let err = gb
        .insert_from_config(Cartridge::from_bytes(rom(0x00, 0, 0)).unwrap())
        .unwrap_err();
    assert!(matches!(err, EmuError::Io { .. }));
}

#[test]
fn short_boot_rom_is_rejected() {
    let mut gb = GameBoy::new(EmuConfig::default());
    let err = gb.load_boot_rom(vec![0; 0x80]).unwrap_err();
    assert!(matches!(err, EmuError::InvalidRom { .. }));
    assert!(!gb.bus.boot_rom_mapped());
}

#[test]
fn model_change_drops_the_loaded_boot_rom() {
    let mut gb = GameBoy::new(EmuConfig::default());
    gb.load_boot_rom(vec![0x31; 0x100]).unwrap();
    assert!(gb.bus.boot_rom_mapped());

    gb.load_cartridge(cgb_cart());
    assert_eq!(gb.model(), Model::Cgb);
    assert!(!gb.bus.boot_rom_mapped());
    assert_eq!(gb.cpu.regs.pc, 0x0100);
}

#[test]
fn same_model_keeps_the_loaded_boot_rom() {
    let mut gb = GameBoy::new(EmuConfig::default());
    gb.load_boot_rom(vec![0x31; 0x100]).unwrap();

    gb.load_cartridge(Cartridge::from_bytes(rom(0x00, 0, 0)).unwrap());
    assert_eq!(gb.model(), Model::Dmg);
    assert!(gb.bus.boot_rom_mapped());
    assert_eq!(gb.cpu.regs.pc, 0x0000);
}

#[test]
fn reset_keeps_cartridge_and_returns_to_entry_point() {
    let mut gb = common::dmg(&[0x00, 0x00, 0x00]);
    gb.step().unwrap();
    gb.step().unwrap();
    assert_eq!(gb.cpu.regs.pc, 0x0152);

    gb.reset();
    assert_eq!(gb.cpu.regs.pc, 0x0100);
    assert!(gb.bus.cartridge().is_some());
}

#[test]
fn emulate_runs_one_frame_at_a_time() {
    // JR -2
    let mut gb = common::dmg(&[0x18, 0xFE]);
    gb.emulate().unwrap();
    let start = gb.bus.cycles();
    gb.emulate().unwrap();
    let frame = gb.bus.cycles() - start;
    assert!((70224 - 12..=70224 + 12).contains(&frame), "frame took {frame}");
}

#[test]
fn emulate_with_lcd_off_still_returns() {
    // LDH (FF40),A with A=0 turns the LCD off, then JR -2.
    let mut gb = common::dmg(&[0xAF, 0xE0, 0x40, 0x18, 0xFE]);
    gb.emulate().unwrap();
    gb.emulate().unwrap();
    assert_eq!(gb.bus.read_byte(0xFF40).unwrap(), 0x00);
}

#[test]
fn serial_output_is_collected() {
    // LD A,'H'; LDH (01),A; LD A,81; LDH (02),A; JR -2
    let mut gb = common::dmg(&[0x3E, b'H', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, 0x18, 0xFE]);
    gb.emulate().unwrap();
    assert_eq!(gb.take_serial_output(), b"H");
    assert!(gb.take_serial_output().is_empty());
    assert_eq!(gb.bus.read_byte(0xFF02).unwrap() & 0x80, 0);
}

#[test]
fn dropping_the_machine_saves_battery_ram() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("save.gb");
    fs::write(&rom_path, rom(0x03, 0, 2)).unwrap();

    {
        let mut gb = GameBoy::new(EmuConfig {
            save_on_exit: true,
            ..EmuConfig::default()
        });
        gb.load_cartridge(Cartridge::from_file(&rom_path).unwrap());
        gb.bus.write_byte(0x0000, 0x0A).unwrap();
        gb.bus.write_byte(0xA010, 0x66).unwrap();
    }

    let data = fs::read(rom_path.with_extension("sav")).unwrap();
    assert_eq!(data[0x10], 0x66);
}
