use crate::error::{EmuError, Result};

/// Cartridge type byte at 0x0147.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeKind {
    RomOnly,
    Mbc1,
    Mbc1Ram,
    Mbc1RamBattery,
    Mbc2,
    Mbc2Battery,
    RomRam,
    RomRamBattery,
    Mmm01,
    Mmm01Ram,
    Mmm01RamBattery,
    Mbc3TimerBattery,
    Mbc3TimerRamBattery,
    Mbc3,
    Mbc3Ram,
    Mbc3RamBattery,
    Mbc5,
    Mbc5Ram,
    Mbc5RamBattery,
    Mbc5Rumble,
    Mbc5RumbleRam,
    Mbc5RumbleRamBattery,
    Mbc6,
    Mbc7SensorRumbleRamBattery,
    PocketCamera,
    BandaiTama5,
    HuC3,
    HuC1RamBattery,
    Unknown(u8),
}

/// Bank controller families this core can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerFamily {
    Plain,
    Mbc1,
    Mbc3,
    Mbc5,
}

impl CartridgeKind {
    pub fn from_code(code: u8) -> Self {
        use CartridgeKind::*;
        match code {
            0x00 => RomOnly,
            0x01 => Mbc1,
            0x02 => Mbc1Ram,
            0x03 => Mbc1RamBattery,
            0x05 => Mbc2,
            0x06 => Mbc2Battery,
            0x08 => RomRam,
            0x09 => RomRamBattery,
            0x0B => Mmm01,
            0x0C => Mmm01Ram,
            0x0D => Mmm01RamBattery,
            0x0F => Mbc3TimerBattery,
            0x10 => Mbc3TimerRamBattery,
            0x11 => Mbc3,
            0x12 => Mbc3Ram,
            0x13 => Mbc3RamBattery,
            0x19 => Mbc5,
            0x1A => Mbc5Ram,
            0x1B => Mbc5RamBattery,
            0x1C => Mbc5Rumble,
            0x1D => Mbc5RumbleRam,
            0x1E => Mbc5RumbleRamBattery,
            0x20 => Mbc6,
            0x22 => Mbc7SensorRumbleRamBattery,
            0xFC => PocketCamera,
            0xFD => BandaiTama5,
            0xFE => HuC3,
            0xFF => HuC1RamBattery,
            other => Unknown(other),
        }
    }

    pub fn family(self) -> Option<ControllerFamily> {
        use CartridgeKind::*;
        match self {
            RomOnly | RomRam | RomRamBattery => Some(ControllerFamily::Plain),
            Mbc1 | Mbc1Ram | Mbc1RamBattery => Some(ControllerFamily::Mbc1),
            Mbc3TimerBattery | Mbc3TimerRamBattery | Mbc3 | Mbc3Ram | Mbc3RamBattery => {
                Some(ControllerFamily::Mbc3)
            }
            Mbc5 | Mbc5Ram | Mbc5RamBattery | Mbc5Rumble | Mbc5RumbleRam
            | Mbc5RumbleRamBattery => Some(ControllerFamily::Mbc5),
            _ => None,
        }
    }

    pub fn has_battery(self) -> bool {
        use CartridgeKind::*;
        matches!(
            self,
            Mbc1RamBattery
                | Mbc2Battery
                | RomRamBattery
                | Mmm01RamBattery
                | Mbc3TimerBattery
                | Mbc3TimerRamBattery
                | Mbc3RamBattery
                | Mbc5RamBattery
                | Mbc5RumbleRamBattery
                | Mbc7SensorRumbleRamBattery
                | HuC1RamBattery
        )
    }

    pub fn has_rtc(self) -> bool {
        matches!(
            self,
            CartridgeKind::Mbc3TimerBattery | CartridgeKind::Mbc3TimerRamBattery
        )
    }

    pub fn has_rumble(self) -> bool {
        use CartridgeKind::*;
        matches!(
            self,
            Mbc5Rumble | Mbc5RumbleRam | Mbc5RumbleRamBattery | Mbc7SensorRumbleRamBattery
        )
    }
}

/// CGB support flag stored in the last byte of the title block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgbSupport {
    DmgOnly,
    Compatible,
    CgbOnly,
}

impl CgbSupport {
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            0xC0 => CgbSupport::CgbOnly,
            f if f & 0x80 != 0 => CgbSupport::Compatible,
            _ => CgbSupport::DmgOnly,
        }
    }

    pub fn supports_cgb(self) -> bool {
        !matches!(self, CgbSupport::DmgOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Japan,
    Overseas,
}

/// Parsed cartridge header (0x0100-0x014F).
#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub entry_point: [u8; 4],
    pub logo: [u8; 0x30],
    pub title: String,
    pub cgb_support: CgbSupport,
    pub new_licensee: [u8; 2],
    pub sgb_supported: bool,
    pub kind_code: u8,
    pub kind: CartridgeKind,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub destination: Destination,
    pub old_licensee: u8,
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
    computed_checksum: u8,
}

const HEADER_END: usize = 0x0150;

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<Self> {
        if rom.len() < HEADER_END {
            return Err(EmuError::InvalidRom {
                reason: format!("{} bytes is too short to hold a header", rom.len()),
            });
        }

        let mut entry_point = [0; 4];
        entry_point.copy_from_slice(&rom[0x0100..0x0104]);
        let mut logo = [0; 0x30];
        logo.copy_from_slice(&rom[0x0104..0x0134]);

        let cgb_flag = rom[0x0143];
        let cgb_support = CgbSupport::from_flag(cgb_flag);
        // On CGB-aware titles the last title byte is the flag itself.
        let title_end = if cgb_flag & 0x80 != 0 { 0x0143 } else { 0x0144 };
        let mut title = &rom[0x0134..title_end];
        if let Some(nul) = title.iter().position(|&b| b == 0) {
            title = &title[..nul];
        }

        let computed_checksum = rom[0x0134..=0x014C]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1));

        Ok(Self {
            entry_point,
            logo,
            title: String::from_utf8_lossy(title).trim().to_string(),
            cgb_support,
            new_licensee: [rom[0x0144], rom[0x0145]],
            sgb_supported: rom[0x0146] == 0x03,
            kind_code: rom[0x0147],
            kind: CartridgeKind::from_code(rom[0x0147]),
            rom_size_code: rom[0x0148],
            ram_size_code: rom[0x0149],
            destination: if rom[0x014A] == 0 {
                Destination::Japan
            } else {
                Destination::Overseas
            },
            old_licensee: rom[0x014B],
            version: rom[0x014C],
            header_checksum: rom[0x014D],
            global_checksum: u16::from_be_bytes([rom[0x014E], rom[0x014F]]),
            computed_checksum,
        })
    }

    /// ROM size declared by the header, in bytes.
    pub fn rom_size(&self) -> Option<usize> {
        (self.rom_size_code <= 8).then(|| 0x8000usize << self.rom_size_code)
    }

    /// External RAM size declared by the header, in bytes.
    pub fn ram_size(&self) -> usize {
        match self.ram_size_code {
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x2_0000,
            0x05 => 0x1_0000,
            _ => 0,
        }
    }

    pub fn header_checksum_valid(&self) -> bool {
        self.computed_checksum == self.header_checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with(kind: u8, cgb: u8, title: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0134..0x0134 + title.len()].copy_from_slice(title);
        rom[0x0143] = cgb;
        rom[0x0147] = kind;
        rom[0x0148] = 0x01;
        rom[0x0149] = 0x03;
        let sum = rom[0x0134..=0x014C]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1));
        rom[0x014D] = sum;
        rom
    }

    #[test]
    fn parses_fields() {
        let rom = rom_with(0x13, 0x80, b"POCKETMON");
        let header = CartridgeHeader::parse(&rom).unwrap();
        assert_eq!(header.title, "POCKETMON");
        assert_eq!(header.kind, CartridgeKind::Mbc3RamBattery);
        assert_eq!(header.kind.family(), Some(ControllerFamily::Mbc3));
        assert!(header.kind.has_battery());
        assert!(!header.kind.has_rtc());
        assert_eq!(header.cgb_support, CgbSupport::Compatible);
        assert_eq!(header.rom_size(), Some(0x1_0000));
        assert_eq!(header.ram_size(), 0x8000);
        assert!(header.header_checksum_valid());
    }

    #[test]
    fn cgb_only_flag() {
        let rom = rom_with(0x00, 0xC0, b"COLOR");
        let header = CartridgeHeader::parse(&rom).unwrap();
        assert_eq!(header.cgb_support, CgbSupport::CgbOnly);
        assert!(header.cgb_support.supports_cgb());
    }

    #[test]
    fn rumble_carts_are_mbc5() {
        let kind = CartridgeKind::from_code(0x1E);
        assert!(kind.has_rumble());
        assert!(kind.has_battery());
        assert_eq!(kind.family(), Some(ControllerFamily::Mbc5));
        assert!(!CartridgeKind::from_code(0x1B).has_rumble());
    }

    #[test]
    fn unsupported_families() {
        assert_eq!(CartridgeKind::from_code(0x05).family(), None);
        assert_eq!(CartridgeKind::from_code(0xFE), CartridgeKind::HuC3);
        assert_eq!(CartridgeKind::from_code(0x42), CartridgeKind::Unknown(0x42));
    }

    #[test]
    fn rejects_truncated_image() {
        assert!(matches!(
            CartridgeHeader::parse(&[0u8; 0x100]),
            Err(EmuError::InvalidRom { .. })
        ));
    }
}
