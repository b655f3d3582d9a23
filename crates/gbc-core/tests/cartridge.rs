mod common;

use std::fs;
use std::time::{Duration, SystemTime};

use common::{BANK_MARKER, rom};
use gbc_core::EmuError;
use gbc_core::cartridge::{BankController, Cartridge, CartridgeKind, ManualClock, RTC_SAVE_LEN};
use tempfile::tempdir;

const MARKER_N: u16 = 0x4000 + BANK_MARKER as u16;

fn clock() -> ManualClock {
    ManualClock::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
}

#[test]
fn plain_rom_maps_both_banks() {
    let cart = Cartridge::from_bytes(rom(0x00, 0, 0)).unwrap();
    assert!(matches!(cart.controller(), BankController::PlainRom));
    assert_eq!(cart.load(BANK_MARKER as u16), 0);
    assert_eq!(cart.load(MARKER_N), 1);
    assert_eq!(cart.load(0xA000), 0xFF);
}

#[test]
fn mbc1_rom_banking() {
    let mut image = rom(0x01, 5, 0);
    image[0x14000] = 0xAB;
    let mut cart = Cartridge::from_bytes(image).unwrap();
    assert!(matches!(cart.controller(), BankController::Mbc1(_)));
    assert_eq!(cart.load(MARKER_N), 1);

    cart.store(0x2100, 0x05);
    assert_eq!(cart.load(0x4000), 0xAB);

    // Bank 0 is coerced to 1, also when only the masked bits are zero.
    cart.store(0x2000, 0x00);
    assert_eq!(cart.load(MARKER_N), 1);
    cart.store(0x2000, 0x20);
    assert_eq!(cart.load(MARKER_N), 1);

    cart.store(0x4000, 0x01);
    assert_eq!(cart.load(MARKER_N), 0x21);
    assert_eq!(cart.load(BANK_MARKER as u16), 0, "mode 0 keeps bank 0 low");

    cart.store(0x6000, 0x01);
    assert_eq!(cart.load(BANK_MARKER as u16), 0x20);
}

#[test]
fn mbc1_ram_needs_enable_latch() {
    let mut cart = Cartridge::from_bytes(rom(0x03, 0, 3)).unwrap();
    cart.store(0xA000, 0x12);
    assert_eq!(cart.load(0xA000), 0xFF);

    cart.store(0x0000, 0x0A);
    cart.store(0xA000, 0x12);
    assert_eq!(cart.load(0xA000), 0x12);

    cart.store(0x0000, 0x00);
    assert_eq!(cart.load(0xA000), 0xFF);

    // Only the low nibble is compared.
    cart.store(0x0000, 0x1A);
    assert_eq!(cart.load(0xA000), 0x12);

    // Mode 1 routes the secondary register to the RAM bank.
    cart.store(0x6000, 0x01);
    cart.store(0x4000, 0x02);
    assert_eq!(cart.load(0xA000), 0x00);
    cart.store(0xA000, 0x34);
    assert_eq!(cart.external_ram()[2 * 0x2000], 0x34);
}

#[test]
fn mbc3_rom_and_ram_banks() {
    let mut cart = Cartridge::from_bytes(rom(0x13, 6, 3)).unwrap();
    assert!(matches!(cart.controller(), BankController::Mbc3(_)));
    cart.store(0x2000, 0x00);
    assert_eq!(cart.load(MARKER_N), 1);
    cart.store(0x2000, 0x7F);
    assert_eq!(cart.load(MARKER_N), 0x7F);

    cart.store(0x0000, 0x0A);
    cart.store(0x4000, 0x03);
    cart.store(0xA123, 0x56);
    assert_eq!(cart.external_ram()[3 * 0x2000 + 0x123], 0x56);

    // No clock on this cart: RTC selects read open bus.
    cart.store(0x4000, 0x08);
    assert_eq!(cart.load(0xA000), 0xFF);
}

#[test]
fn mbc5_allows_bank_zero_and_nine_bit_banks() {
    let mut image = rom(0x1B, 8, 4);
    image[0x102 * 0x4000 + 1] = 0xEE;
    let mut cart = Cartridge::from_bytes(image).unwrap();
    assert!(matches!(cart.controller(), BankController::Mbc5(_)));
    assert_eq!(cart.load(MARKER_N), 1);

    cart.store(0x2000, 0x00);
    assert_eq!(cart.load(MARKER_N), 0);

    cart.store(0x2000, 0x02);
    cart.store(0x3000, 0x01);
    assert_eq!(cart.load(0x4001), 0xEE);

    // Enable needs exactly 0x0A.
    cart.store(0x0000, 0x1A);
    cart.store(0xA000, 0x77);
    assert_eq!(cart.load(0xA000), 0xFF);
    cart.store(0x0000, 0x0A);
    cart.store(0x4000, 0x0F);
    cart.store(0xA000, 0x77);
    assert_eq!(cart.external_ram()[15 * 0x2000], 0x77);
}

#[test]
fn unsupported_and_truncated_images_are_rejected() {
    let err = Cartridge::from_bytes(rom(0x05, 0, 0)).unwrap_err();
    assert!(matches!(
        err,
        EmuError::UnsupportedCartridge {
            code: 0x05,
            kind: CartridgeKind::Mbc2
        }
    ));

    let err = Cartridge::from_bytes(vec![0; 0x100]).unwrap_err();
    assert!(matches!(err, EmuError::InvalidRom { .. }));
}

#[test]
fn missing_rom_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = Cartridge::from_file(dir.path().join("absent.gb")).unwrap_err();
    assert!(matches!(err, EmuError::Io { .. }));
}

#[test]
fn battery_ram_saved_to_disk() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("game.gb");
    fs::write(&rom_path, rom(0x03, 0, 3)).unwrap();

    let mut cart = Cartridge::from_file(&rom_path).unwrap();
    assert_eq!(cart.save_path(), Some(rom_path.with_extension("sav").as_path()));
    cart.store(0x0000, 0x0A);
    cart.store(0xA000, 0xAA);
    cart.save_external_ram().unwrap();

    let data = fs::read(rom_path.with_extension("sav")).unwrap();
    assert_eq!(data.len(), 0x8000);
    assert_eq!(data[0], 0xAA);

    let mut cart = Cartridge::from_file(&rom_path).unwrap();
    cart.store(0x0000, 0x0A);
    assert_eq!(cart.load(0xA000), 0xAA);
}

#[test]
fn carts_without_battery_do_not_save() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("nobattery.gb");
    fs::write(&rom_path, rom(0x02, 0, 2)).unwrap();

    let mut cart = Cartridge::from_file(&rom_path).unwrap();
    assert_eq!(cart.save_path(), None);
    cart.save_external_ram().unwrap();
    assert!(!rom_path.with_extension("sav").exists());
}

#[test]
fn rtc_latches_elapsed_host_time() {
    let clock = clock();
    let mut cart = Cartridge::with_clock(rom(0x10, 0, 3), Box::new(clock.clone())).unwrap();
    assert!(cart.has_rtc());

    cart.store(0x0000, 0x0A);
    cart.store(0x4000, 0x08);
    cart.store(0xA000, 30);

    clock.advance(Duration::from_millis(90_500));
    cart.store(0x6000, 0x00);
    cart.store(0x6000, 0x01);

    assert_eq!(cart.load(0xA000), 0);
    cart.store(0x4000, 0x09);
    assert_eq!(cart.load(0xA000), 2);

    // Latched values hold until the next latch.
    clock.advance(Duration::from_secs(60));
    assert_eq!(cart.load(0xA000), 2);

    // The half second carried over makes this exactly one more second.
    clock.advance(Duration::from_millis(500));
    cart.store(0x6000, 0x00);
    cart.store(0x6000, 0x01);
    assert_eq!(cart.load(0xA000), 3);
    cart.store(0x4000, 0x08);
    assert_eq!(cart.load(0xA000), 1);
}

#[test]
fn halted_rtc_does_not_advance() {
    let clock = clock();
    let mut cart = Cartridge::with_clock(rom(0x0F, 0, 0), Box::new(clock.clone())).unwrap();
    cart.store(0x0000, 0x0A);
    cart.store(0x4000, 0x0C);
    cart.store(0xA000, 0x40);

    clock.advance(Duration::from_secs(1000));
    cart.store(0x6000, 0x00);
    cart.store(0x6000, 0x01);
    cart.store(0x4000, 0x08);
    assert_eq!(cart.load(0xA000), 0);
    assert!(cart.rtc().unwrap().live().halt);
}

#[test]
fn rtc_state_roundtrips_through_save_file() {
    let dir = tempdir().unwrap();
    let save_path = dir.path().join("rtc.sav");
    let clock = clock();

    let mut cart = Cartridge::with_clock(rom(0x10, 0, 3), Box::new(clock.clone())).unwrap();
    cart.set_save_path(&save_path);
    cart.store(0x0000, 0x0A);
    cart.store(0x4000, 0x08);
    cart.store(0xA000, 10);
    cart.store(0x4000, 0x00);
    cart.store(0xA000, 0x5A);
    cart.save_external_ram().unwrap();
    assert_eq!(fs::read(&save_path).unwrap().len(), 0x8000 + RTC_SAVE_LEN);

    // Time keeps running while the program is closed.
    clock.advance(Duration::from_secs(3600));

    let mut cart = Cartridge::with_clock(rom(0x10, 0, 3), Box::new(clock.clone())).unwrap();
    cart.set_save_path(&save_path);
    cart.load_external_ram_from_save_file().unwrap();
    assert_eq!(cart.external_ram()[0], 0x5A);

    let live = cart.rtc().unwrap().live();
    assert_eq!((live.hours, live.minutes, live.seconds), (1, 0, 10));
}

#[test]
fn header_fields() {
    let mut image = rom(0x1B, 1, 2);
    image[0x134..0x138].copy_from_slice(b"TEST");
    image[0x143] = 0xC0;
    let cart = Cartridge::from_bytes(image).unwrap();
    assert_eq!(cart.title(), "TEST");
    assert!(cart.header().cgb_support.supports_cgb());
    assert_eq!(cart.header().rom_size(), Some(0x10000));
    assert_eq!(cart.header().ram_size(), 0x2000);
    assert!(cart.has_battery());
    assert!(!cart.has_rtc());
}
