use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use spectra_core::core::machine::Machine;

/// Write the machine's current frame as an RGB PNG.
pub fn save(machine: &dyn Machine, path: &Path) -> Result<()> {
    let (width, height) = machine.display_size();
    ensure!(width > 0 && height > 0, "{} has no display", machine.name());
    let mut rgb = vec![0u8; (width * height * 3) as usize];
    machine.render_frame(&mut rgb);
    write_png(path, width, height, &rgb)
}

pub fn write_png(path: &Path, width: u32, height: u32, rgb: &[u8]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgb)?;
    writer.finish()?;
    Ok(())
}
