//! Frontend configuration: `config.toml` under the user config directory,
//! overridden by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_MACHINE: &str = "48k";
pub const DEFAULT_FRAMES: u64 = 50;

/// Every key is optional; unset keys fall back to the next layer.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub machine: Option<String>,
    pub rom_path: Option<PathBuf>,
    pub clock_multiplier: Option<u32>,
    pub frames: Option<u64>,
    pub debug: bool,
    pub breakpoints: Vec<u16>,
    pub screenshot: Option<PathBuf>,
}

/// Fully resolved run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub machine: String,
    pub rom_path: PathBuf,
    pub clock_multiplier: u32,
    pub frames: u64,
    pub debug: bool,
    pub breakpoints: Vec<u16>,
    pub screenshot: Option<PathBuf>,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("spectra").join("config.toml"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `explicit` if given, else the default location if it exists.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Values set in `other` win; breakpoints from both layers are kept.
    pub fn overridden_by(self, other: Config) -> Config {
        let mut breakpoints = self.breakpoints;
        for addr in other.breakpoints {
            if !breakpoints.contains(&addr) {
                breakpoints.push(addr);
            }
        }
        Config {
            machine: other.machine.or(self.machine),
            rom_path: other.rom_path.or(self.rom_path),
            clock_multiplier: other.clock_multiplier.or(self.clock_multiplier),
            frames: other.frames.or(self.frames),
            debug: self.debug || other.debug,
            breakpoints,
            screenshot: other.screenshot.or(self.screenshot),
        }
    }

    pub fn into_settings(self) -> Result<Settings> {
        let Some(rom_path) = self.rom_path else {
            bail!("no ROM path: pass --rom-path or set rom_path in config.toml");
        };
        let clock_multiplier = self.clock_multiplier.unwrap_or(1);
        if clock_multiplier == 0 {
            bail!("clock_multiplier must be at least 1");
        }
        Ok(Settings {
            machine: self.machine.unwrap_or_else(|| DEFAULT_MACHINE.to_string()),
            rom_path,
            clock_multiplier,
            frames: self.frames.unwrap_or(DEFAULT_FRAMES),
            debug: self.debug,
            breakpoints: self.breakpoints,
            screenshot: self.screenshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_keys() {
        let config = Config::parse(
            r#"
            machine = "128k"
            rom_path = "/roms"
            clock_multiplier = 2
            frames = 10
            debug = true
            breakpoints = [0x8000, 0x0038]
            screenshot = "shot.png"
            "#,
        )
        .unwrap();
        assert_eq!(config.machine.as_deref(), Some("128k"));
        assert_eq!(config.breakpoints, vec![0x8000, 0x0038]);
        assert_eq!(config.clock_multiplier, Some(2));
        assert!(config.debug);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::parse("scale = 3").is_err());
    }

    #[test]
    fn command_line_overrides_file() {
        let file = Config::parse("machine = \"plus3\"\nrom_path = \"/a\"\nbreakpoints = [1]").unwrap();
        let cli = Config {
            rom_path: Some(PathBuf::from("/b")),
            breakpoints: vec![1, 2],
            ..Config::default()
        };
        let settings = file.overridden_by(cli).into_settings().unwrap();
        assert_eq!(settings.machine, "plus3");
        assert_eq!(settings.rom_path, PathBuf::from("/b"));
        assert_eq!(settings.breakpoints, vec![1, 2]);
        assert_eq!(settings.frames, DEFAULT_FRAMES);
        assert_eq!(settings.clock_multiplier, 1);
    }

    #[test]
    fn settings_need_a_rom_path_and_sane_multiplier() {
        assert!(Config::default().into_settings().is_err());
        let config = Config {
            rom_path: Some(PathBuf::from("/roms")),
            clock_multiplier: Some(0),
            ..Config::default()
        };
        assert!(config.into_settings().is_err());
    }
}
