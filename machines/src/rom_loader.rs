//! ROM images for the Spectrum models.
//!
//! A [`RomSet`] is a bag of named files, read from a directory, unpacked
//! from an archive by the caller, or built in memory for tests. A
//! [`RomRegion`] describes which files make up a model's ROM pages and
//! assembles them, checking sizes and (optionally) CRC32 checksums.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

/// CRC-32 lookup table (reflected polynomial 0xEDB88320), as used by ZIP and PNG.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

pub fn crc32(data: &[u8]) -> u32 {
    let crc = data.iter().fold(0xFFFF_FFFFu32, |crc, &byte| {
        (crc >> 8) ^ CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize]
    });
    !crc
}

#[derive(Debug, Error)]
pub enum RomLoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing ROM file: {0}")]
    MissingFile(String),

    #[error("ROM {file}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },

    #[error("ROM {file}: CRC32 expected 0x{expected:08X}, got 0x{actual:08X}")]
    ChecksumMismatch {
        file: String,
        expected: u32,
        actual: u32,
    },
}

/// Named ROM files.
#[derive(Clone, Debug, Default)]
pub struct RomSet {
    files: HashMap<String, Vec<u8>>,
}

impl RomSet {
    /// Read every regular file directly inside `path`, keyed by file name.
    pub fn from_directory(path: &Path) -> Result<Self, RomLoadError> {
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }
            let Some(name) = file_path.file_name() else {
                continue;
            };
            let name = name.to_string_lossy().into_owned();
            files.insert(name, std::fs::read(&file_path)?);
        }
        Ok(Self { files })
    }

    /// Build a set from already-read files (for example archive members).
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            files: entries.into_iter().collect(),
        }
    }

    pub fn from_slices(entries: &[(&str, &[u8])]) -> Self {
        Self::from_entries(
            entries
                .iter()
                .map(|(name, data)| (name.to_string(), data.to_vec())),
        )
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> Result<&[u8], RomLoadError> {
        self.get(name)
            .ok_or_else(|| RomLoadError::MissingFile(name.to_string()))
    }

    pub fn require_sized(&self, name: &str, expected: usize) -> Result<&[u8], RomLoadError> {
        let data = self.require(name)?;
        if data.len() != expected {
            return Err(RomLoadError::SizeMismatch {
                file: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.files.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// One file of a ROM region.
pub struct RomEntry {
    pub name: &'static str,
    pub size: usize,
    /// Offset within the region.
    pub offset: usize,
    /// `None` accepts any contents.
    pub crc32: Option<u32>,
}

/// The complete ROM of a model: `size` bytes filled by `entries`.
pub struct RomRegion {
    pub size: usize,
    pub entries: &'static [RomEntry],
}

impl RomRegion {
    /// Assemble the region, validating sizes and checksums.
    pub fn load(&self, rom_set: &RomSet) -> Result<Vec<u8>, RomLoadError> {
        self.load_inner(rom_set, true)
    }

    /// Assemble the region, validating sizes only. For patched or custom ROMs.
    pub fn load_skip_checksums(&self, rom_set: &RomSet) -> Result<Vec<u8>, RomLoadError> {
        self.load_inner(rom_set, false)
    }

    fn load_inner(&self, rom_set: &RomSet, verify: bool) -> Result<Vec<u8>, RomLoadError> {
        let mut region = vec![0u8; self.size];
        for entry in self.entries {
            debug_assert!(entry.offset + entry.size <= self.size);
            let data = rom_set.require_sized(entry.name, entry.size)?;
            if verify && let Some(expected) = entry.crc32 {
                let actual = crc32(data);
                if actual != expected {
                    return Err(RomLoadError::ChecksumMismatch {
                        file: entry.name.to_string(),
                        expected,
                        actual,
                    });
                }
            }
            region[entry.offset..entry.offset + entry.size].copy_from_slice(data);
        }
        Ok(region)
    }
}
