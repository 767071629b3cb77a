//! ULA video timing: the per-tact rendering/contention table and the
//! incremental renderer that draws border and display into a palette-indexed
//! pixel buffer.

/// Visible output width in pixels (48 px border, 256 px display, 48 px border).
pub const SCREEN_WIDTH: u32 = 352;
/// Visible output height in lines (48 border, 192 display, 48 border).
pub const SCREEN_HEIGHT: u32 = 288;

const BORDER_LINES: u32 = 48;
const BORDER_TACTS: u32 = 24;
const DISPLAY_LINES: u32 = 192;
const DISPLAY_TACTS: u32 = 128;
const VISIBLE_TACTS: u32 = BORDER_TACTS * 2 + DISPLAY_TACTS;

/// Size of the bitmap plus attribute area.
pub const SCREEN_MEMORY_SIZE: usize = 0x1B00;

/// Frame layout and ULA timing constants for one Spectrum model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenConfig {
    pub line_tacts: u32,
    pub lines: u32,
    /// Raster line holding the first display pixel row.
    pub first_display_line: u32,
    /// Tacts before the first display fetch at which memory contention begins
    /// (negative when it begins after it).
    pub contention_prefetch: i32,
    /// Delay pattern applied within each 8-tact fetch group.
    pub contention_values: [u8; 8],
    /// Tacts from the first display tact to the first floating-bus fetch.
    /// `None` when unattached ports always read 0xFF.
    pub floating_bus_offset: Option<u32>,
    /// Length of the maskable interrupt pulse at the start of the frame.
    pub interrupt_tacts: u32,
}

impl ScreenConfig {
    pub fn zx48() -> Self {
        Self {
            line_tacts: 224,
            lines: 312,
            first_display_line: 64,
            contention_prefetch: 1,
            contention_values: [6, 5, 4, 3, 2, 1, 0, 0],
            floating_bus_offset: Some(2),
            interrupt_tacts: 32,
        }
    }

    pub fn zx128() -> Self {
        Self {
            line_tacts: 228,
            lines: 311,
            first_display_line: 63,
            contention_prefetch: 3,
            contention_values: [6, 5, 4, 3, 2, 1, 0, 0],
            floating_bus_offset: Some(0),
            interrupt_tacts: 36,
        }
    }

    pub fn plus3() -> Self {
        Self {
            contention_prefetch: -1,
            contention_values: [1, 0, 7, 6, 5, 4, 3, 2],
            floating_bus_offset: None,
            ..Self::zx128()
        }
    }

    pub fn frame_tacts(&self) -> u32 {
        self.line_tacts * self.lines
    }

    /// Tact at which the ULA starts fetching the first display byte.
    pub fn display_start(&self) -> u32 {
        self.first_display_line * self.line_tacts
    }

    /// First tact of the visible window (top-left border pixel).
    pub fn window_origin(&self) -> u32 {
        (self.first_display_line - BORDER_LINES) * self.line_tacts - BORDER_TACTS
    }
}

/// What the beam does during one tact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TactPhase {
    /// Retrace or off-screen border; nothing is drawn.
    #[default]
    Hidden,
    Border,
    /// Two display pixels taken from `bitmap_addr`/`attr_addr`, starting at bit `7 - shift`.
    Display {
        bitmap_addr: u16,
        attr_addr: u16,
        shift: u8,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TactInfo {
    pub phase: TactPhase,
    /// Index of the first of the two pixels this tact draws.
    pub pixel_offset: u32,
    /// Memory contention delay for an access starting at this tact.
    pub contention: u8,
    /// Screen-memory offset the ULA fetches at this tact, if any.
    pub floating_addr: Option<u16>,
}

/// Bitmap offset of pixel row `y`, character column `cx`.
pub fn bitmap_offset(y: u32, cx: u32) -> u16 {
    (((y & 0xC0) << 5) | ((y & 0x07) << 8) | ((y & 0x38) << 2) | cx) as u16
}

pub fn attr_offset(y: u32, cx: u32) -> u16 {
    (0x1800 + (y >> 3) * 32 + cx) as u16
}

/// Precomputed per-tact rendering and contention information for a whole frame.
#[derive(Clone, Debug)]
pub struct RenderingTable {
    tacts: Vec<TactInfo>,
}

impl RenderingTable {
    pub fn new(config: &ScreenConfig) -> Self {
        let frame = config.frame_tacts();
        let origin = config.window_origin();
        let display_start = config.display_start();
        let display_end = display_start + DISPLAY_LINES * config.line_tacts;

        let tacts = (0..frame)
            .map(|tact| {
                let mut info = TactInfo::default();

                if let Some(rel) = tact.checked_sub(origin) {
                    let row = rel / config.line_tacts;
                    let col = rel % config.line_tacts;
                    if row < SCREEN_HEIGHT && col < VISIBLE_TACTS {
                        info.pixel_offset = row * SCREEN_WIDTH + col * 2;
                        let in_display = (BORDER_LINES..BORDER_LINES + DISPLAY_LINES).contains(&row)
                            && (BORDER_TACTS..BORDER_TACTS + DISPLAY_TACTS).contains(&col);
                        info.phase = if in_display {
                            let y = row - BORDER_LINES;
                            let cx = (col - BORDER_TACTS) / 4;
                            TactPhase::Display {
                                bitmap_addr: bitmap_offset(y, cx),
                                attr_addr: attr_offset(y, cx),
                                shift: (((col - BORDER_TACTS) % 4) * 2) as u8,
                            }
                        } else {
                            TactPhase::Border
                        };
                    }
                }

                let contended = tact as i64 + config.contention_prefetch as i64;
                if contended >= display_start as i64 && contended < display_end as i64 {
                    let rel = contended as u32 - display_start;
                    let col = rel % config.line_tacts;
                    if col < DISPLAY_TACTS {
                        info.contention = config.contention_values[(col % 8) as usize];
                    }
                }

                if let Some(offset) = config.floating_bus_offset
                    && let Some(rel) = tact.checked_sub(display_start + offset)
                    && rel < DISPLAY_LINES * config.line_tacts
                {
                    let y = rel / config.line_tacts;
                    let col = rel % config.line_tacts;
                    if col < DISPLAY_TACTS {
                        let cx = (col / 8) * 2;
                        info.floating_addr = match col % 8 {
                            0 => Some(bitmap_offset(y, cx)),
                            1 => Some(attr_offset(y, cx)),
                            2 => Some(bitmap_offset(y, cx + 1)),
                            3 => Some(attr_offset(y, cx + 1)),
                            _ => None,
                        };
                    }
                }

                info
            })
            .collect();

        Self { tacts }
    }

    pub fn len(&self) -> usize {
        self.tacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tacts.is_empty()
    }

    /// Entry for a frame-relative tact; tacts past the frame end map to idle.
    pub fn get(&self, tact: u32) -> TactInfo {
        self.tacts.get(tact as usize).copied().unwrap_or_default()
    }

    pub fn contention(&self, tact: u32) -> u8 {
        self.tacts.get(tact as usize).map_or(0, |t| t.contention)
    }
}

/// RGB values for the 16 palette indices (index 8-15 are BRIGHT).
pub const PALETTE: [[u8; 3]; 16] = build_palette();

const fn build_palette() -> [[u8; 3]; 16] {
    let mut palette = [[0u8; 3]; 16];
    let mut i = 0;
    while i < 16 {
        let level = if i >= 8 { 0xFF } else { 0xD7 };
        let c = i & 7;
        palette[i] = [
            if c & 2 != 0 { level } else { 0 },
            if c & 4 != 0 { level } else { 0 },
            if c & 1 != 0 { level } else { 0 },
        ];
        i += 1;
    }
    palette
}

const FLASH_FRAMES: u32 = 16;

/// Incremental ULA renderer.
///
/// The owning machine calls [`render_to`](Self::render_to) with the current
/// frame tact before every write to screen memory and every border change, so
/// the buffer reflects exactly what the beam saw.
pub struct ScreenDevice {
    config: ScreenConfig,
    table: RenderingTable,
    pixels: Vec<u8>,
    border: u8,
    flash: bool,
    flash_counter: u32,
    rendered_to: u32,
}

impl ScreenDevice {
    pub fn new(config: ScreenConfig) -> Self {
        let table = RenderingTable::new(&config);
        Self {
            config,
            table,
            pixels: vec![0; (SCREEN_WIDTH * SCREEN_HEIGHT) as usize],
            border: 7,
            flash: false,
            flash_counter: 0,
            rendered_to: 0,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn table(&self) -> &RenderingTable {
        &self.table
    }

    pub fn reset(&mut self) {
        self.pixels.fill(0);
        self.border = 7;
        self.flash = false;
        self.flash_counter = 0;
        self.rendered_to = 0;
    }

    pub fn begin_frame(&mut self) {
        self.rendered_to = 0;
        self.flash_counter += 1;
        if self.flash_counter >= FLASH_FRAMES {
            self.flash_counter = 0;
            self.flash = !self.flash;
        }
    }

    pub fn end_frame(&mut self, screen: &[u8]) {
        self.render_to(self.config.frame_tacts(), screen);
    }

    pub fn border(&self) -> u8 {
        self.border
    }

    /// Change the border colour at `tact`, rendering everything before it first.
    pub fn set_border(&mut self, color: u8, tact: u32, screen: &[u8]) {
        self.render_to(tact, screen);
        self.border = color & 7;
    }

    pub fn flash_phase(&self) -> bool {
        self.flash
    }

    /// Render all tacts before `tact` that have not been drawn yet.
    pub fn render_to(&mut self, tact: u32, screen: &[u8]) {
        let end = tact.min(self.config.frame_tacts());
        while self.rendered_to < end {
            let info = self.table.get(self.rendered_to);
            self.rendered_to += 1;
            let (first, second) = match info.phase {
                TactPhase::Hidden => continue,
                TactPhase::Border => (self.border, self.border),
                TactPhase::Display {
                    bitmap_addr,
                    attr_addr,
                    shift,
                } => {
                    let bits = screen.get(bitmap_addr as usize).copied().unwrap_or(0);
                    let attr = screen.get(attr_addr as usize).copied().unwrap_or(0);
                    (
                        self.pixel_color(bits, attr, 7 - shift),
                        self.pixel_color(bits, attr, 6 - shift),
                    )
                }
            };
            let offset = info.pixel_offset as usize;
            self.pixels[offset] = first;
            self.pixels[offset + 1] = second;
        }
    }

    fn pixel_color(&self, bits: u8, attr: u8, bit: u8) -> u8 {
        let mut ink = bits & (1 << bit) != 0;
        if attr & 0x80 != 0 && self.flash {
            ink = !ink;
        }
        let bright = (attr & 0x40) >> 3;
        if ink {
            (attr & 0x07) | bright
        } else {
            ((attr >> 3) & 0x07) | bright
        }
    }

    /// Palette-indexed pixels, `SCREEN_WIDTH * SCREEN_HEIGHT` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Convert the pixel buffer to RGB24.
    pub fn render_rgb(&self, buffer: &mut [u8]) {
        for (dst, &index) in buffer.chunks_exact_mut(3).zip(&self.pixels) {
            dst.copy_from_slice(&PALETTE[(index & 0x0F) as usize]);
        }
    }

    pub fn contention(&self, tact: u32) -> u8 {
        self.table.contention(tact)
    }

    /// Byte the ULA is fetching at `tact`, or 0xFF when idle.
    pub fn floating_bus(&self, tact: u32, screen: &[u8]) -> u8 {
        self.table
            .get(tact)
            .floating_addr
            .and_then(|addr| screen.get(addr as usize).copied())
            .unwrap_or(0xFF)
    }

    pub fn interrupt_active(&self, tact: u32) -> bool {
        tact < self.config.interrupt_tacts
    }
}
