use slog::{Logger, trace};
use spectra_core::core::bus::InterruptState;
use spectra_core::core::{Bus, FrameBus};
use spectra_core::device::{BeeperDevice, EarInput, KeyboardDevice, ScreenDevice};

use super::memory::SpectrumMemory;
use super::model::SpectrumModel;

/// The ULA side of the machine: paged memory, contention, ports and the
/// devices hanging off port 0xFE.
pub struct SpectrumBus {
    model: SpectrumModel,
    pub(crate) memory: SpectrumMemory,
    pub(crate) screen: ScreenDevice,
    pub(crate) beeper: BeeperDevice,
    pub(crate) keyboard: KeyboardDevice,
    ear: Option<Box<dyn EarInput>>,
    last_fe: u8,
    frame_start: u64,
    multiplier: u32,
    /// CPU clock of the access currently on the bus, contention included.
    clock: u64,
    contention_frame: u64,
    contention_total: u64,
    logger: Logger,
}

impl SpectrumBus {
    pub fn new(model: SpectrumModel, rom: Vec<u8>, logger: Logger) -> Self {
        Self {
            model,
            memory: SpectrumMemory::new(model, rom),
            screen: ScreenDevice::new(model.screen_config()),
            beeper: BeeperDevice::new(model.clock_hz()),
            keyboard: KeyboardDevice::new(),
            ear: None,
            last_fe: 0,
            frame_start: 0,
            multiplier: 1,
            clock: 0,
            contention_frame: 0,
            contention_total: 0,
            logger,
        }
    }

    /// Power-on state. ROM contents and the EAR source are kept.
    pub fn reset(&mut self) {
        self.memory.reset_paging();
        self.memory.clear_ram();
        self.screen.reset();
        self.beeper.reset();
        self.keyboard.release_all();
        self.last_fe = 0;
        self.frame_start = 0;
        self.multiplier = 1;
        self.clock = 0;
        self.contention_frame = 0;
        self.contention_total = 0;
    }

    pub fn set_ear_input(&mut self, ear: Option<Box<dyn EarInput>>) {
        self.ear = ear;
    }

    pub fn contention_frame(&self) -> u64 {
        self.contention_frame
    }

    pub fn contention_total(&self) -> u64 {
        self.contention_total
    }

    /// Position of CPU clock `tacts` within the ULA frame.
    pub fn frame_tact(&self, tacts: u64) -> u32 {
        let rel = tacts.saturating_sub(self.frame_start) / self.multiplier as u64;
        (rel % self.screen.config().frame_tacts() as u64) as u32
    }

    fn contend(&mut self, tacts: u64) -> u64 {
        let delay = self.screen.contention(self.frame_tact(tacts)) as u64;
        self.contention_frame += delay;
        self.contention_total += delay;
        delay
    }

    fn render_to_clock(&mut self) {
        let tact = self.frame_tact(self.clock);
        self.screen.render_to(tact, self.memory.screen());
    }

    fn read_ula(&mut self, port: u16) -> u8 {
        let keys = self.keyboard.read((port >> 8) as u8);
        let ear = match self.ear.as_mut() {
            Some(ear) if ear.is_active() => ear.level(self.clock),
            // With nothing plugged in, the EAR line follows the speaker output.
            _ => self.last_fe & 0x10 != 0,
        };
        0xA0 | keys | if ear { 0x40 } else { 0 }
    }

    fn floating_bus(&self) -> u8 {
        self.screen
            .floating_bus(self.frame_tact(self.clock), self.memory.screen())
    }

    fn write_ula(&mut self, data: u8) {
        let tact = self.frame_tact(self.clock);
        if data & 0x07 != self.screen.border() {
            self.screen.set_border(data & 0x07, tact, self.memory.screen());
        }
        self.beeper
            .write(self.clock.saturating_sub(self.frame_start), data & 0x10 != 0);
        self.last_fe = data;
    }
}

impl Bus for SpectrumBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        if self.memory.is_screen_write(addr) {
            self.render_to_clock();
        }
        self.memory.write(addr, data);
    }

    fn io_read(&mut self, port: u16) -> u8 {
        if port & 1 == 0 {
            self.read_ula(port)
        } else {
            self.floating_bus()
        }
    }

    fn io_write(&mut self, port: u16, data: u8) {
        if port & 1 == 0 {
            self.write_ula(data);
        }
        if self.model.decodes_7ffd(port) {
            self.render_to_clock();
            let accepted = self.memory.write_7ffd(data);
            trace!(self.logger, "paging write"; "port" => "7FFD", "value" => format!("{data:02X}"), "accepted" => accepted);
        } else if self.model.decodes_1ffd(port) {
            let accepted = self.memory.write_1ffd(data);
            trace!(self.logger, "paging write"; "port" => "1FFD", "value" => format!("{data:02X}"), "accepted" => accepted);
        }
    }

    fn memory_delay(&mut self, addr: u16, tacts: u64) -> u32 {
        let delay = if self.memory.is_contended(addr) {
            self.contend(tacts)
        } else {
            0
        };
        self.clock = tacts + delay;
        delay as u32
    }

    fn io_tacts(&mut self, port: u16, tacts: u64) -> u32 {
        if !self.model.has_io_contention() {
            self.clock = tacts + 3;
            return 4;
        }
        let high_contended = self.memory.is_contended(port);
        let ula = port & 1 == 0;
        let mut t = tacts;
        match (high_contended, ula) {
            // N:4
            (false, false) => t += 3,
            // N:1 C:3
            (false, true) => {
                t += 1;
                t += self.contend(t);
            }
            // C:1 C:3
            (true, true) => {
                t += self.contend(t) + 1;
                t += self.contend(t);
            }
            // C:1 C:1 C:1 C:1
            (true, false) => {
                for _ in 0..3 {
                    t += self.contend(t) + 1;
                }
                t += self.contend(t);
            }
        }
        // The data is latched at the start of the last cycle.
        self.clock = t;
        let last = if ula { 3 } else { 1 };
        (t + last - tacts) as u32
    }

    fn check_interrupts(&self, tacts: u64) -> InterruptState {
        InterruptState {
            nmi: false,
            irq: self.screen.interrupt_active(self.frame_tact(tacts)),
            irq_vector: 0xFF,
        }
    }
}

impl FrameBus for SpectrumBus {
    fn frame_tacts(&self) -> u32 {
        self.screen.config().frame_tacts()
    }

    fn begin_frame(&mut self, frame_start: u64, multiplier: u32) {
        self.frame_start = frame_start;
        self.multiplier = multiplier.max(1);
        self.contention_frame = 0;
        self.screen.begin_frame();
        self.beeper
            .begin_frame(self.model.clock_hz() as u64 * self.multiplier as u64);
    }

    fn end_frame(&mut self) {
        self.screen.end_frame(self.memory.screen());
        let frame_len = self.frame_tacts() as u64 * self.multiplier as u64;
        self.beeper.end_frame(frame_len);
    }

    fn partition_of(&self, addr: u16) -> i32 {
        self.memory.page(addr).partition()
    }

    fn peek(&self, addr: u16) -> u8 {
        self.memory.read(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::o;

    fn bus(model: SpectrumModel) -> SpectrumBus {
        let rom = vec![0; model.rom_pages() * 0x4000];
        let mut bus = SpectrumBus::new(model, rom, Logger::root(slog::Discard, o!()));
        bus.begin_frame(0, 1);
        bus
    }

    /// First contended tact of the 48K frame (value 6).
    const CONTENDED_48K: u64 = 14_335;

    #[test]
    fn memory_delay_follows_the_table() {
        let mut bus = bus(SpectrumModel::Zx48);
        assert_eq!(bus.memory_delay(0x4000, CONTENDED_48K), 6);
        assert_eq!(bus.memory_delay(0x4000, CONTENDED_48K + 1), 5);
        assert_eq!(bus.memory_delay(0x4000, CONTENDED_48K + 6), 0);
        assert_eq!(bus.memory_delay(0x8000, CONTENDED_48K), 0);
        assert_eq!(bus.memory_delay(0x4000, 100), 0);
        assert_eq!(bus.contention_frame(), 11);
        bus.begin_frame(69_888, 1);
        assert_eq!(bus.contention_frame(), 0);
        assert_eq!(bus.contention_total(), 11);
    }

    #[test]
    fn io_patterns() {
        let mut bus = bus(SpectrumModel::Zx48);
        // N:4 and N:1 C:3 outside the display.
        assert_eq!(bus.io_tacts(0x80FF, 0), 4);
        assert_eq!(bus.io_tacts(0x80FE, 0), 4);
        // N:1 C:3 with the C:3 landing on a 6-delay tact.
        assert_eq!(bus.io_tacts(0x80FE, CONTENDED_48K - 1), 4 + 6);
        // C:1 C:3: the second check lands on an idle tact of the fetch group.
        assert_eq!(bus.io_tacts(0x40FE, CONTENDED_48K), 6 + 1 + 3);
        // C:1 x4: delays 6, 0, then 6 again at the next group, then 0.
        assert_eq!(bus.io_tacts(0x40FF, CONTENDED_48K), 6 + 1 + 1 + 6 + 1 + 1);
    }

    #[test]
    fn plus3_io_is_never_contended() {
        let mut bus = bus(SpectrumModel::Plus3);
        assert!(bus.memory.write_7ffd(0x05));
        for tact in 14_000..15_000 {
            assert_eq!(bus.io_tacts(0xC0FF, tact), 4);
        }
    }

    #[test]
    fn ula_reads_keyboard_and_ear() {
        let mut bus = bus(SpectrumModel::Zx48);
        bus.keyboard.set_key(spectra_core::device::SpectrumKey::Q, true);
        assert_eq!(bus.io_read(0xFBFE), 0xBE);
        assert_eq!(bus.io_read(0xFEFE), 0xBF);
        bus.io_write(0x00FE, 0x10);
        assert_eq!(bus.io_read(0xFEFE), 0xFF);
        assert!(bus.beeper.level());

        let ear = spectra_core::device::PulseEar::new(vec![10]);
        bus.set_ear_input(Some(Box::new(ear)));
        // An inactive source (not started) falls back to the speaker output.
        assert_eq!(bus.io_read(0xFEFE) & 0x40, 0x40);
    }

    #[test]
    fn border_write_renders_up_to_the_clock() {
        let mut bus = bus(SpectrumModel::Zx48);
        bus.memory_delay(0x8000, 20_000);
        bus.io_write(0x00FE, 0x02);
        assert_eq!(bus.screen.border(), 2);
        bus.end_frame();
        let pixels = bus.screen.pixels();
        // Top-left border pixel was drawn white before the change, the last line red.
        assert_eq!(pixels[0], 7);
        assert_eq!(pixels[pixels.len() - 1], 2);
    }

    #[test]
    fn interrupt_window_uses_frame_relative_tacts() {
        let mut bus = bus(SpectrumModel::Zx48);
        assert!(bus.check_interrupts(0).irq);
        assert!(bus.check_interrupts(31).irq);
        assert!(!bus.check_interrupts(32).irq);
        bus.begin_frame(139_776, 2);
        assert!(bus.check_interrupts(139_776 + 63).irq);
        assert!(!bus.check_interrupts(139_776 + 64).irq);
    }
}
