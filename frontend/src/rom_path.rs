//! ROM path resolution: loads a [`RomSet`] from a rompath directory holding
//! `<rom_name>.zip`, a direct ZIP file, or a directory of loose ROM files.

use spectra_machines::rom_loader::{RomLoadError, RomSet};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Resolution order:
/// 1. `path` ends with `.zip`: load that archive.
/// 2. `path` is a directory containing `{rom_name}.zip`: load that archive.
/// 3. `path` is a directory: load its loose files.
pub fn load_rom_set(rom_name: &str, path: &Path) -> Result<RomSet, RomLoadError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }

    if path.is_dir() {
        let zip_path = path.join(format!("{rom_name}.zip"));
        if zip_path.exists() {
            return load_from_zip(&zip_path);
        }
        return RomSet::from_directory(path);
    }

    Err(RomLoadError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("ROM path not found: {}", path.display()),
    )))
}

fn invalid_zip(e: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("invalid ZIP: {e}"))
}

/// Every file in the archive, keyed by its base name so that ROMs stored
/// under a folder inside the ZIP still resolve.
fn load_from_zip(path: &Path) -> Result<RomSet, RomLoadError> {
    let reader = BufReader::new(File::open(path)?);
    let mut archive = zip::ZipArchive::new(reader).map_err(invalid_zip)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(invalid_zip)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }

    Ok(RomSet::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spectra_rompath_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn create_test_zip(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let zip_path = dir.join(name);
        let file = File::create(&zip_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (fname, data) in files {
            zip.start_file(*fname, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        zip_path
    }

    #[test]
    fn resolve_zip_file_directly() {
        let dir = scratch_dir("zip");
        let zip_path = create_test_zip(&dir, "anything.zip", &[("48.rom", &[0xAA; 16])]);

        let rom_set = load_rom_set("spec48", &zip_path).unwrap();
        assert_eq!(rom_set.get("48.rom"), Some(&[0xAA; 16][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_zip_from_rompath_directory() {
        let dir = scratch_dir("dir");
        create_test_zip(&dir, "spec128.zip", &[("roms/128-0.rom", &[0xBB; 8])]);

        let rom_set = load_rom_set("spec128", &dir).unwrap();
        assert_eq!(rom_set.get("128-0.rom"), Some(&[0xBB; 8][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_loose_directory_fallback() {
        let dir = scratch_dir("loose");
        std::fs::write(dir.join("48.rom"), [0xCC; 4]).unwrap();

        let rom_set = load_rom_set("spec48", &dir).unwrap();
        assert_eq!(rom_set.get("48.rom"), Some(&[0xCC; 4][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_path_is_an_io_error() {
        let missing = std::env::temp_dir().join("spectra_rompath_does_not_exist");
        assert!(matches!(
            load_rom_set("spec48", &missing),
            Err(RomLoadError::Io(e)) if e.kind() == io::ErrorKind::NotFound
        ));
    }
}
