//! OPC (Open Packaging Conventions) handling for project packages
//!
//! Project files are ZIP archives following the OPC standard. A [`Package`]
//! holds every entry of one archive in memory, in archive order, so that a
//! conversion can run as a pure function from input bytes to output bytes.

mod reader;
mod relationships;
mod writer;

pub use reader::open;
pub(crate) use reader::read_entries;
pub use relationships::discover_model_path;
pub use writer::write;

use crate::error::{Error, Result};
use std::borrow::Cow;
use zip::CompressionMethod;

/// Main 3D model file path within the archive
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Directory holding every model part (root model, object parts, model rels)
pub const MODEL_DIR: &str = "3D/";

/// Project settings document (flat JSON object)
pub const SETTINGS_PATH: &str = "Metadata/project_settings.config";

/// Per-object settings, including filament (extruder) assignments
pub const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";

/// Slice summary written by the slicer, lists used filaments
pub const SLICE_INFO_PATH: &str = "Metadata/slice_info.config";

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// One named entry of a package
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Part name, without a leading slash
    pub name: String,
    /// Uncompressed content
    pub data: Vec<u8>,
    /// Compression method the entry was stored with
    pub compression: CompressionMethod,
    /// Directory marker entry
    pub is_dir: bool,
}

impl Entry {
    /// Create a deflated file entry
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: normalize_part_name(&name.into()).into_owned(),
            data,
            compression: CompressionMethod::Deflated,
            is_dir: false,
        }
    }

    /// Create a file entry with an explicit compression method
    pub fn with_compression(name: impl Into<String>, data: Vec<u8>, compression: CompressionMethod) -> Self {
        Self {
            compression,
            ..Self::new(name, data)
        }
    }
}

/// An ordered, in-memory OPC package
///
/// Entry names are unique. Lookups accept names with or without a leading
/// slash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    entries: Vec<Entry>,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append an entry, rejecting duplicate names
    pub fn push(&mut self, entry: Entry) -> Result<()> {
        if self.has_file(&entry.name) {
            return Err(Error::CorruptArchive(format!(
                "Duplicate entry name '{}'",
                entry.name
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// All entries in archive order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Look up an entry by part name
    pub fn get(&self, name: &str) -> Option<&Entry> {
        let name = normalize_part_name(name);
        self.entries.iter().find(|e| e.name == name)
    }

    /// Check if a file exists in the package
    pub fn has_file(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get a file as binary data
    pub fn get_file_binary(&self, name: &str) -> Result<&[u8]> {
        self.get(name)
            .map(|e| e.data.as_slice())
            .ok_or_else(|| Error::missing_entry(name))
    }

    /// Get a file as UTF-8 text, `None` if absent or not valid UTF-8
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|e| std::str::from_utf8(&e.data).ok())
    }

    /// List all file names in the package
    pub fn file_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the package is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether an entry belongs to the model document
///
/// The model document is every part under `3D/` plus the per-object
/// settings that carry filament assignments.
pub fn is_model_part(name: &str) -> bool {
    let name = normalize_part_name(name);
    (name.starts_with(MODEL_DIR) && name.len() > MODEL_DIR.len()) || name == MODEL_SETTINGS_PATH
}

/// Relationships part of a part: `3D/a.model` → `3D/_rels/a.model.rels`
pub fn part_rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Strip a leading slash and decode percent-escapes in a part name
///
/// Relationship targets and `p:path` attributes are URIs, while ZIP entry
/// names are plain UTF-8.
pub fn normalize_part_name(name: &str) -> Cow<'_, str> {
    let stripped = name.strip_prefix('/').unwrap_or(name);
    if !stripped.contains('%') {
        return Cow::Borrowed(stripped);
    }
    match urlencoding::decode(stripped) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Borrowed(stripped),
    }
}
