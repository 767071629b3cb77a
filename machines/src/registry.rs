//! Machine registry for front-end discovery.
//!
//! Each model self-registers via [`inventory::submit!`] with a
//! [`MachineEntry`] holding its command line name, the ROM set it needs and
//! a factory. Front-ends enumerate models at runtime without a central list.

use slog::Logger;
use spectra_core::core::machine::Machine;

use crate::rom_loader::{RomLoadError, RomSet};

/// Factory signature: build a machine from its ROM set, logging through `logger`.
pub type CreateFn = fn(&RomSet, Logger) -> Result<Box<dyn Machine>, RomLoadError>;

pub struct MachineEntry {
    /// Command line name (e.g., "128k").
    pub name: &'static str,
    /// ROM set name used for archive lookup (e.g., "spec128").
    pub rom_name: &'static str,
    pub description: &'static str,
    pub create: CreateFn,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        rom_name: &'static str,
        description: &'static str,
        create: CreateFn,
    ) -> Self {
        Self {
            name,
            rom_name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// All registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
