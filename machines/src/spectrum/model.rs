use spectra_core::device::ScreenConfig;

use crate::rom_loader::{RomEntry, RomRegion};

pub const PAGE_SIZE: usize = 0x4000;

/// Supported Spectrum models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpectrumModel {
    Zx48,
    Zx128,
    Plus3,
}

static ROM_48K: [RomEntry; 1] = [RomEntry {
    name: "48.rom",
    size: PAGE_SIZE,
    offset: 0,
    crc32: None,
}];

static ROM_128K: [RomEntry; 2] = [
    RomEntry {
        name: "128-0.rom",
        size: PAGE_SIZE,
        offset: 0,
        crc32: None,
    },
    RomEntry {
        name: "128-1.rom",
        size: PAGE_SIZE,
        offset: PAGE_SIZE,
        crc32: None,
    },
];

static ROM_PLUS3: [RomEntry; 4] = [
    RomEntry {
        name: "plus3-0.rom",
        size: PAGE_SIZE,
        offset: 0,
        crc32: None,
    },
    RomEntry {
        name: "plus3-1.rom",
        size: PAGE_SIZE,
        offset: PAGE_SIZE,
        crc32: None,
    },
    RomEntry {
        name: "plus3-2.rom",
        size: PAGE_SIZE,
        offset: 2 * PAGE_SIZE,
        crc32: None,
    },
    RomEntry {
        name: "plus3-3.rom",
        size: PAGE_SIZE,
        offset: 3 * PAGE_SIZE,
        crc32: None,
    },
];

static REGION_48K: RomRegion = RomRegion {
    size: PAGE_SIZE,
    entries: &ROM_48K,
};

static REGION_128K: RomRegion = RomRegion {
    size: 2 * PAGE_SIZE,
    entries: &ROM_128K,
};

static REGION_PLUS3: RomRegion = RomRegion {
    size: 4 * PAGE_SIZE,
    entries: &ROM_PLUS3,
};

impl SpectrumModel {
    pub const ALL: [SpectrumModel; 3] = [Self::Zx48, Self::Zx128, Self::Plus3];

    pub fn name(self) -> &'static str {
        match self {
            Self::Zx48 => "48k",
            Self::Zx128 => "128k",
            Self::Plus3 => "plus3",
        }
    }

    pub fn clock_hz(self) -> u32 {
        match self {
            Self::Zx48 => 3_500_000,
            Self::Zx128 | Self::Plus3 => 3_546_900,
        }
    }

    pub fn screen_config(self) -> ScreenConfig {
        match self {
            Self::Zx48 => ScreenConfig::zx48(),
            Self::Zx128 => ScreenConfig::zx128(),
            Self::Plus3 => ScreenConfig::plus3(),
        }
    }

    pub fn rom_region(self) -> &'static RomRegion {
        match self {
            Self::Zx48 => &REGION_48K,
            Self::Zx128 => &REGION_128K,
            Self::Plus3 => &REGION_PLUS3,
        }
    }

    pub fn rom_pages(self) -> usize {
        self.rom_region().size / PAGE_SIZE
    }

    /// RAM banks that share the bus with the ULA.
    pub fn is_contended_bank(self, bank: u8) -> bool {
        match self {
            Self::Zx48 | Self::Zx128 => bank & 1 == 1,
            Self::Plus3 => bank >= 4,
        }
    }

    /// The gate array on the +3 does not stretch I/O cycles.
    pub fn has_io_contention(self) -> bool {
        self != Self::Plus3
    }

    pub fn decodes_7ffd(self, port: u16) -> bool {
        match self {
            Self::Zx48 => false,
            Self::Zx128 => port & 0x8002 == 0,
            Self::Plus3 => port & 0xC002 == 0x4000,
        }
    }

    pub fn decodes_1ffd(self, port: u16) -> bool {
        self == Self::Plus3 && port & 0xF002 == 0x1000
    }
}
