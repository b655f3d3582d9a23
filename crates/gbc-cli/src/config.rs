use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmulationMode {
    #[default]
    Auto,
    ForceDmg,
    ForceCgb,
}

impl From<EmulationMode> for gbc_core::EmulationMode {
    fn from(mode: EmulationMode) -> Self {
        match mode {
            EmulationMode::Auto => Self::Auto,
            EmulationMode::ForceDmg => Self::ForceDmg,
            EmulationMode::ForceCgb => Self::ForceCgb,
        }
    }
}

/// On-disk settings. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub emulation_mode: EmulationMode,
    pub dmg_bootrom_path: Option<PathBuf>,
    pub cgb_bootrom_path: Option<PathBuf>,
    pub require_bootrom: bool,
    pub trace_instructions: bool,
    pub save_on_exit: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            emulation_mode: EmulationMode::default(),
            dmg_bootrom_path: None,
            cgb_bootrom_path: None,
            require_bootrom: false,
            trace_instructions: false,
            // Battery saves are kept unless the user opts out.
            save_on_exit: true,
        }
    }
}

impl FileConfig {
    pub fn into_emu_config(self) -> gbc_core::EmuConfig {
        gbc_core::EmuConfig {
            mode: self.emulation_mode.into(),
            dmg_boot_rom: self.dmg_bootrom_path,
            cgb_boot_rom: self.cgb_bootrom_path,
            require_boot_rom: self.require_bootrom,
            trace_instructions: self.trace_instructions,
            save_on_exit: self.save_on_exit,
        }
    }
}

pub fn load_from_file(path: &Path) -> FileConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to read config {}: {e}; using defaults", path.display());
            return FileConfig::default();
        }
    };

    match toml::from_str::<FileConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            FileConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_kebab_case_mode_and_partial_file() {
        let cfg: FileConfig = toml::from_str(
            r#"
            emulation_mode = "force-cgb"
            cgb_bootrom_path = "cgb_boot.bin"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.emulation_mode, EmulationMode::ForceCgb);
        assert_eq!(cfg.cgb_bootrom_path, Some(PathBuf::from("cgb_boot.bin")));
        assert!(cfg.save_on_exit, "missing key keeps saving enabled");

        let emu = cfg.into_emu_config();
        assert_eq!(emu.mode, gbc_core::EmulationMode::ForceCgb);
    }

    #[test]
    fn save_on_exit_can_be_disabled_in_file() {
        let cfg: FileConfig = toml::from_str("save_on_exit = false").unwrap();
        assert!(!cfg.into_emu_config().save_on_exit);
    }

    #[test]
    fn bad_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "emulation_mode = 42").unwrap();
        assert_eq!(load_from_file(file.path()), FileConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_file(&dir.path().join("absent.toml"));
        assert_eq!(cfg, FileConfig::default());
    }
}
