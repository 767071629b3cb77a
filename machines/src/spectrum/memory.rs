use spectra_core::device::screen::SCREEN_MEMORY_SIZE;

use super::model::{PAGE_SIZE, SpectrumModel};

const RAM_BANKS: usize = 8;

/// +3 all-RAM configurations, selected by bits 1-2 of port 0x1FFD.
const SPECIAL_CONFIGS: [[u8; 4]; 4] = [[0, 1, 2, 3], [4, 5, 6, 7], [4, 5, 6, 3], [4, 7, 6, 3]];

/// What is paged into one 16K slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Rom(u8),
    Ram(u8),
}

impl Page {
    /// Partition index: ROM pages are negative (`-page - 1`), RAM banks are the bank number.
    pub fn partition(self) -> i32 {
        match self {
            Page::Rom(page) => -(page as i32) - 1,
            Page::Ram(bank) => bank as i32,
        }
    }
}

/// ROM pages, eight RAM banks and the paging latches.
///
/// The 48K only ever sees banks 5, 2 and 0; the other banks exist but are
/// unreachable.
pub struct SpectrumMemory {
    model: SpectrumModel,
    rom: Vec<u8>,
    ram: Vec<u8>,
    port_7ffd: u8,
    port_1ffd: u8,
    slots: [Page; 4],
}

impl SpectrumMemory {
    /// `rom` holds the model's ROM pages back to back; short images are zero-padded.
    pub fn new(model: SpectrumModel, mut rom: Vec<u8>) -> Self {
        rom.resize(model.rom_pages() * PAGE_SIZE, 0);
        let mut memory = Self {
            model,
            rom,
            ram: vec![0; RAM_BANKS * PAGE_SIZE],
            port_7ffd: 0,
            port_1ffd: 0,
            slots: [Page::Rom(0), Page::Ram(5), Page::Ram(2), Page::Ram(0)],
        };
        memory.remap();
        memory
    }

    pub fn model(&self) -> SpectrumModel {
        self.model
    }

    pub fn reset_paging(&mut self) {
        self.port_7ffd = 0;
        self.port_1ffd = 0;
        self.remap();
    }

    pub fn clear_ram(&mut self) {
        self.ram.fill(0);
    }

    pub fn port_7ffd(&self) -> u8 {
        self.port_7ffd
    }

    pub fn port_1ffd(&self) -> u8 {
        self.port_1ffd
    }

    /// Bit 5 of 0x7FFD freezes both paging ports until reset.
    pub fn paging_locked(&self) -> bool {
        self.port_7ffd & 0x20 != 0
    }

    /// Returns false when the write was ignored.
    pub fn write_7ffd(&mut self, value: u8) -> bool {
        if self.model == SpectrumModel::Zx48 || self.paging_locked() {
            return false;
        }
        self.port_7ffd = value;
        self.remap();
        true
    }

    pub fn write_1ffd(&mut self, value: u8) -> bool {
        if self.model != SpectrumModel::Plus3 || self.paging_locked() {
            return false;
        }
        self.port_1ffd = value;
        self.remap();
        true
    }

    fn remap(&mut self) {
        self.slots = match self.model {
            SpectrumModel::Zx48 => [Page::Rom(0), Page::Ram(5), Page::Ram(2), Page::Ram(0)],
            SpectrumModel::Plus3 if self.port_1ffd & 1 != 0 => {
                SPECIAL_CONFIGS[((self.port_1ffd >> 1) & 3) as usize].map(Page::Ram)
            }
            model => {
                let mut rom = (self.port_7ffd >> 4) & 1;
                if model == SpectrumModel::Plus3 {
                    rom |= (self.port_1ffd >> 1) & 2;
                }
                [
                    Page::Rom(rom),
                    Page::Ram(5),
                    Page::Ram(2),
                    Page::Ram(self.port_7ffd & 7),
                ]
            }
        };
    }

    pub fn page(&self, addr: u16) -> Page {
        self.slots[(addr >> 14) as usize]
    }

    pub fn read(&self, addr: u16) -> u8 {
        let offset = addr as usize & (PAGE_SIZE - 1);
        match self.page(addr) {
            Page::Rom(page) => self.rom[page as usize * PAGE_SIZE + offset],
            Page::Ram(bank) => self.ram[bank as usize * PAGE_SIZE + offset],
        }
    }

    /// ROM writes are dropped.
    pub fn write(&mut self, addr: u16, data: u8) {
        if let Page::Ram(bank) = self.page(addr) {
            self.ram[bank as usize * PAGE_SIZE + (addr as usize & (PAGE_SIZE - 1))] = data;
        }
    }

    pub fn is_contended(&self, addr: u16) -> bool {
        matches!(self.page(addr), Page::Ram(bank) if self.model.is_contended_bank(bank))
    }

    /// Bank the ULA displays: 5, or 7 when the shadow screen is selected.
    pub fn screen_bank(&self) -> u8 {
        if self.model != SpectrumModel::Zx48 && self.port_7ffd & 0x08 != 0 {
            7
        } else {
            5
        }
    }

    /// Bitmap and attributes of the displayed screen.
    pub fn screen(&self) -> &[u8] {
        let start = self.screen_bank() as usize * PAGE_SIZE;
        &self.ram[start..start + SCREEN_MEMORY_SIZE]
    }

    /// True if a write to `addr` changes what the ULA displays.
    pub fn is_screen_write(&self, addr: u16) -> bool {
        self.page(addr) == Page::Ram(self.screen_bank())
            && (addr as usize & (PAGE_SIZE - 1)) < SCREEN_MEMORY_SIZE
    }

    pub fn partition(&self, index: i32) -> Option<&[u8]> {
        let (memory, page) = if index < 0 {
            (&self.rom, (-index - 1) as usize)
        } else {
            (&self.ram, index as usize)
        };
        memory.get(page * PAGE_SIZE..(page + 1) * PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_pages(pages: u8) -> Vec<u8> {
        (0..pages).flat_map(|p| vec![0xA0 + p; PAGE_SIZE]).collect()
    }

    #[test]
    fn zx48_layout_is_fixed() {
        let mut memory = SpectrumMemory::new(SpectrumModel::Zx48, rom_pages(1));
        assert!(!memory.write_7ffd(0x07));
        assert_eq!(memory.page(0xC000), Page::Ram(0));
        assert_eq!(memory.page(0x4000).partition(), 5);
        assert_eq!(memory.page(0x0000).partition(), -1);
        memory.write(0x0000, 0x55);
        assert_eq!(memory.read(0x0000), 0xA0);
        assert!(memory.is_contended(0x4000));
        assert!(!memory.is_contended(0x8000));
    }

    #[test]
    fn port_7ffd_selects_bank_rom_and_screen() {
        let mut memory = SpectrumMemory::new(SpectrumModel::Zx128, rom_pages(2));
        memory.write(0xC000, 0x11);
        assert!(memory.write_7ffd(0x13)); // bank 3, ROM 1
        assert_eq!(memory.page(0xC000), Page::Ram(3));
        assert_eq!(memory.read(0x0000), 0xA1);
        assert!(memory.is_contended(0xC000));
        memory.write(0xC000, 0x33);
        assert!(memory.write_7ffd(0x00));
        assert_eq!(memory.read(0xC000), 0x11);
        assert_eq!(memory.partition(3).unwrap()[0], 0x33);
        assert_eq!(memory.partition(-2).unwrap()[0], 0xA1);
        assert!(memory.partition(-3).is_none());

        assert!(memory.write_7ffd(0x0F)); // bank 7 at 0xC000, shadow screen
        assert_eq!(memory.screen_bank(), 7);
        assert!(memory.is_screen_write(0xC000));
        assert!(!memory.is_screen_write(0x4000));
        assert!(!memory.is_screen_write(0xDB00));
    }

    #[test]
    fn lock_freezes_paging_until_reset() {
        let mut memory = SpectrumMemory::new(SpectrumModel::Plus3, rom_pages(4));
        assert!(memory.write_7ffd(0x24)); // bank 4, locked
        assert!(!memory.write_7ffd(0x01));
        assert!(!memory.write_1ffd(0x01));
        assert_eq!(memory.page(0xC000), Page::Ram(4));
        memory.reset_paging();
        assert!(memory.write_7ffd(0x01));
        assert_eq!(memory.page(0xC000), Page::Ram(1));
    }

    #[test]
    fn plus3_special_modes_and_high_rom_bit() {
        let mut memory = SpectrumMemory::new(SpectrumModel::Plus3, rom_pages(4));
        assert!(memory.write_1ffd(0x04));
        assert!(memory.write_7ffd(0x10));
        assert_eq!(memory.page(0x0000), Page::Rom(3));
        assert_eq!(memory.read(0x0000), 0xA3);

        let expected = [[0, 1, 2, 3], [4, 5, 6, 7], [4, 5, 6, 3], [4, 7, 6, 3]];
        for (config, banks) in expected.iter().enumerate() {
            assert!(memory.write_1ffd(((config as u8) << 1) | 1));
            let paged: Vec<Page> = (0..4).map(|slot| memory.page(slot << 14)).collect();
            assert_eq!(paged, banks.map(Page::Ram).to_vec(), "config {config}");
        }
        // All-RAM mode makes the bottom slot writable.
        memory.write(0x0000, 0x42);
        assert_eq!(memory.read(0x0000), 0x42);
        assert!(memory.is_contended(0x0000));
        assert!(!memory.is_contended(0xC000));
    }
}
