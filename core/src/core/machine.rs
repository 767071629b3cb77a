use std::time::Duration;

use crate::core::context::ExecutionContext;
use crate::cpu::z80::Z80;

/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "Enter", "Caps Shift").
    pub name: &'static str,
}

/// Machine-agnostic interface for emulated systems.
///
/// Each machine (Spectrum 48K, 128K, +3, the flat test system) implements
/// this trait so the controller and frontends can drive it without knowing
/// about paging, contention or the ULA.
pub trait Machine: Send {
    /// Short model name (e.g., "48k").
    fn name(&self) -> &str;

    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Wall-clock duration of one frame at the nominal clock.
    fn frame_duration(&self) -> Duration;

    /// Nominal frame length in CPU tacts at multiplier 1.
    fn frame_tacts(&self) -> u32;

    /// Run until the frame completes or `ctx` requests termination.
    /// Returns true when the frame completed.
    fn execute_frame(&mut self, ctx: &mut ExecutionContext) -> bool;

    fn frame_completed(&self) -> bool;

    /// Tacts the last frame ran past its nominal length, carried into the next.
    fn frame_overflow(&self) -> u64;

    fn frame_count(&self) -> u64;

    /// Integer clock multiplier (>= 1); applied at the next frame boundary.
    fn set_clock_multiplier(&mut self, multiplier: u32);

    fn clock_multiplier(&self) -> u32;

    /// Power-on reset of CPU, memory paging and devices.
    fn hard_reset(&mut self);

    /// CPU reset line only.
    fn soft_reset(&mut self);

    fn cpu(&self) -> &Z80;

    fn cpu_mut(&mut self) -> &mut Z80;

    /// Render the current video state into an RGB24 pixel buffer.
    ///
    /// The buffer must be at least `width * height * 3` bytes (from `display_size()`).
    /// Pixels are stored left-to-right, top-to-bottom, 3 bytes per pixel (R, G, B).
    fn render_frame(&self, buffer: &mut [u8]);

    /// Palette-indexed pixel buffer, one byte per pixel.
    fn pixel_buffer(&self) -> &[u8] {
        &[]
    }

    /// Audio samples rendered during the last frame.
    fn audio_samples(&self) -> &[i16] {
        &[]
    }

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Read through the current paging, without timing side effects.
    fn read_memory(&self, addr: u16) -> u8;

    /// Write through the current paging (ROM writes are ignored).
    fn write_memory(&mut self, addr: u16, data: u8);

    /// The 64K address space as currently paged.
    fn memory_snapshot(&self) -> Vec<u8> {
        (0..=0xFFFFu16).map(|addr| self.read_memory(addr)).collect()
    }

    /// A 16K partition: `index < 0` selects ROM page `-index - 1`, `index >= 0` a RAM bank.
    fn partition(&self, _index: i32) -> Option<&[u8]> {
        None
    }

    /// Contention delay tacts accumulated during the current frame.
    fn contention_frame(&self) -> u64 {
        0
    }

    /// Contention delay tacts accumulated since reset.
    fn contention_total(&self) -> u64 {
        0
    }
}
