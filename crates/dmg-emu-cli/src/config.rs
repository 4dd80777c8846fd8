use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use dmg_emu_core::{EmulatorConfig, sound::DEFAULT_SAMPLE_RATE};

/// Shades written for colour numbers 0-3, lightest first.
pub const DEFAULT_PALETTE: [u8; 4] = [0xFF, 0xAA, 0x55, 0x00];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CliConfig {
    /// Frames to run when `--frames` is not given. `None` runs until the
    /// time limit, or forever.
    pub frames: Option<u64>,
    pub seconds: Option<u64>,
    pub sound: bool,
    pub sample_rate: u32,
    pub palette: [u8; 4],
    /// Print serial output and CPU state every this many frames with `--debug`.
    pub debug_interval: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            frames: None,
            seconds: None,
            sound: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            palette: DEFAULT_PALETTE,
            debug_interval: 60,
        }
    }
}

impl CliConfig {
    pub fn emulator_config(&self, mute: bool) -> EmulatorConfig {
        EmulatorConfig {
            sound_enabled: self.sound && !mute,
            sample_rate: self.sample_rate,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("dmg-emu").join("config.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dmg-emu").join("config.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("dmg-emu")
            .join("config.toml");
    }

    PathBuf::from("config.toml")
}

/// Read the config at `path`. A missing file silently yields the defaults;
/// an unreadable or malformed one warns first.
pub fn load_from_file(path: &Path) -> CliConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CliConfig::default(),
        Err(e) => {
            warn!("Failed to read config {}: {e}; using defaults", path.display());
            return CliConfig::default();
        }
    };

    match toml::from_str::<CliConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            CliConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_file(&dir.path().join("nope.toml"));
        assert_eq!(cfg, CliConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frames = 120\nsound = false\n").unwrap();
        let cfg = load_from_file(&path);
        assert_eq!(cfg.frames, Some(120));
        assert!(!cfg.sound);
        assert_eq!(cfg.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(cfg.palette, DEFAULT_PALETTE);
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frames = \"lots\"").unwrap();
        assert_eq!(load_from_file(&path), CliConfig::default());
    }

    #[test]
    fn mute_flag_wins_over_file() {
        let cfg = CliConfig::default();
        assert!(cfg.emulator_config(false).sound_enabled);
        assert!(!cfg.emulator_config(true).sound_enabled);
    }
}
