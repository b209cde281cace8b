//! Package writing functionality

use super::Package;
use crate::error::{Error, Result};
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Serialize a package into ZIP archive bytes
///
/// Entries are written in package order. Each keeps the compression method
/// it was read with; methods other than Stored are written Deflated, the
/// only two the destination slicer is known to open.
pub fn write(package: &Package) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in package.entries() {
        let method = match entry.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);

        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options).map_err(|e| {
                Error::internal(format!("Failed to add directory '{}': {}", entry.name, e))
            })?;
            continue;
        }

        zip.start_file(entry.name.as_str(), options).map_err(|e| {
            Error::internal(format!("Failed to create entry '{}': {}", entry.name, e))
        })?;
        zip.write_all(&entry.data).map_err(|e| {
            Error::internal(format!("Failed to write entry '{}': {}", entry.name, e))
        })?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::internal(format!("Failed to finalize ZIP archive: {}", e)))?;

    debug!(entries = package.len(), "wrote package");
    Ok(cursor.into_inner())
}
