//! Package reading and validation functionality

use super::{Entry, Package, SETTINGS_PATH, discover_model_path};
use crate::error::{Error, Result};
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Open a source package from raw archive bytes
///
/// Every entry is read into memory. Fails with `CorruptArchive` when the
/// bytes are not a readable ZIP, when two entries share a name, or when the
/// model document or settings document is missing.
pub fn open(bytes: &[u8]) -> Result<Package> {
    let package = read_entries(bytes)?;

    let model_path = discover_model_path(&package)?;
    if !package.has_file(&model_path) {
        return Err(Error::missing_entry(&model_path));
    }
    if !package.has_file(SETTINGS_PATH) {
        return Err(Error::missing_entry(SETTINGS_PATH));
    }

    Ok(package)
}

/// Read every entry of an archive without checking for required parts
pub(crate) fn read_entries(bytes: &[u8]) -> Result<Package> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut package = Package::new();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let compression = file.compression();
        let is_dir = file.is_dir();

        let mut data = Vec::new();
        if !is_dir {
            file.read_to_end(&mut data).map_err(|e| {
                Error::CorruptArchive(format!("Failed to read entry '{}': {}", name, e))
            })?;
        }

        package.push(Entry {
            name: super::normalize_part_name(&name).into_owned(),
            data,
            compression,
            is_dir,
        })?;
    }

    debug!(entries = package.len(), "read package");
    Ok(package)
}
