//! Filament profile remapping
//!
//! Source projects name filaments by material type and vendor; the
//! destination slicer needs one of its own filament profile ids per slot.
//! A [`RemapTable`] resolves a `(type, brand)` pair to a profile id with a
//! fixed precedence:
//!
//! 1. an entry for the exact type and brand
//! 2. an entry for the type alone
//! 3. `Generic <family>` when the type is a recognized material family
//! 4. the table's default profile
//!
//! A type the table does not know, such as `PLA-CF`, is retried under its
//! leading family (`PLA`) before the default applies. Lookups never fail.

use crate::error::{Error, Result};
use crate::model::{DEFAULT_MATERIAL, FilamentList, SettingsMap};
use crate::opc::{self, SETTINGS_PATH};
use crate::parser::parse_settings;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Profile used when nothing else matches
pub const DEFAULT_PROFILE: &str = "Snapmaker PLA SnapSpeed @U1";

const BUILTIN_ENTRIES: &[(&str, Option<&str>, &str)] = &[
    ("PLA", Some("Snapmaker"), "Snapmaker PLA SnapSpeed @U1"),
    ("PETG", Some("Snapmaker"), "Snapmaker PETG HF"),
    ("PLA", None, "Snapmaker PLA SnapSpeed @U1"),
    ("PETG", None, "Snapmaker PETG HF"),
    ("ABS", None, "Generic ABS"),
    ("TPU", None, "Generic TPU"),
];

const BUILTIN_FAMILIES: &[&str] = &[
    "PLA", "PETG", "ABS", "ASA", "TPU", "PA", "PC", "PET", "PVA", "HIPS", "PP", "PA-CF",
    "PETG-CF", "PLA-CF",
];

/// One row of a remap table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapEntry {
    /// Material type, e.g. `PETG`
    pub material: String,
    /// Vendor; `None` makes this the type-only entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Destination profile id
    pub profile: String,
}

/// Which rule resolved a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact type and brand entry
    Brand,
    /// Type-only entry
    Material,
    /// `Generic <family>` for a recognized family
    Family,
    /// Table default
    Default,
}

/// Static mapping from `(type, brand)` to destination profile ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapTable {
    entries: Vec<RemapEntry>,
    #[serde(default)]
    families: Vec<String>,
    default_profile: String,
}

impl Default for RemapTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RemapTable {
    /// Create a table
    pub fn new(entries: Vec<RemapEntry>, families: Vec<String>, default_profile: impl Into<String>) -> Self {
        Self {
            entries,
            families,
            default_profile: default_profile.into(),
        }
    }

    /// Table with the Snapmaker U1 profiles
    pub fn builtin() -> Self {
        let entries = BUILTIN_ENTRIES
            .iter()
            .map(|(material, brand, profile)| RemapEntry {
                material: material.to_string(),
                brand: brand.map(String::from),
                profile: profile.to_string(),
            })
            .collect();
        let families = BUILTIN_FAMILIES.iter().map(|f| f.to_string()).collect();
        Self::new(entries, families, DEFAULT_PROFILE)
    }

    /// Load a table from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidTemplate(format!("Invalid remap table: {}", e)))
    }

    /// Build a table from a reference profile package
    ///
    /// The package is a project whose settings list one filament per
    /// available profile: `filament_type[i]` is served by
    /// `filament_settings_id[i]`, and `filament_vendor[i]`, when it names a
    /// vendor, adds a brand-specific entry. The first type seen for a
    /// material wins, and the first profile becomes the default.
    pub fn from_profile_package(bytes: &[u8]) -> Result<Self> {
        let package = opc::read_entries(bytes)
            .map_err(|e| Error::InvalidTemplate(format!("Profile package: {}", e)))?;
        let settings_bytes = package
            .get_file_binary(SETTINGS_PATH)
            .map_err(|e| Error::InvalidTemplate(format!("Profile package: {}", e)))?;
        let settings = parse_settings(settings_bytes, SETTINGS_PATH)
            .map_err(|e| Error::InvalidTemplate(format!("Profile package: {}", e)))?;

        Self::from_settings(&settings)
    }

    fn from_settings(settings: &SettingsMap) -> Result<Self> {
        let types = settings.get_list("filament_type");
        let profiles = settings.get_list("filament_settings_id");
        let vendors = settings.get_list("filament_vendor");

        if profiles.is_empty() {
            return Err(Error::InvalidTemplate(
                "Profile package lists no filament_settings_id".to_string(),
            ));
        }

        let mut table = Self::new(Vec::new(), Self::builtin().families, profiles[0].clone());

        for (index, (material, profile)) in types.iter().zip(&profiles).enumerate() {
            let material = material.trim();
            if material.is_empty() || profile.trim().is_empty() {
                continue;
            }

            let brand = vendors
                .get(index)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("generic"));
            if let Some(brand) = brand {
                if table.find(material, Some(brand)).is_none() {
                    table.entries.push(RemapEntry {
                        material: material.to_string(),
                        brand: Some(brand.to_string()),
                        profile: profile.clone(),
                    });
                }
            }

            if table.find(material, None).is_none() {
                table.entries.push(RemapEntry {
                    material: material.to_string(),
                    brand: None,
                    profile: profile.clone(),
                });
            }

            if !table.families.iter().any(|f| f.eq_ignore_ascii_case(material)) {
                table.families.push(material.to_string());
            }
        }

        debug!(
            entries = table.entries.len(),
            default = %table.default_profile,
            "remap table loaded from profile package"
        );
        Ok(table)
    }

    /// Table rows
    pub fn entries(&self) -> &[RemapEntry] {
        &self.entries
    }

    /// Profile used when nothing else matches
    pub fn default_profile(&self) -> &str {
        &self.default_profile
    }

    /// Profile given to padded placeholder slots
    pub fn placeholder_profile(&self) -> String {
        self.lookup(DEFAULT_MATERIAL, None)
    }

    /// Resolve a profile id
    pub fn lookup(&self, material: &str, brand: Option<&str>) -> String {
        self.resolve(material, brand).0
    }

    /// Resolve a profile id and report which rule matched
    pub fn resolve(&self, material: &str, brand: Option<&str>) -> (String, MatchKind) {
        let brand = brand.map(str::trim).filter(|b| !b.is_empty());

        for candidate in family_candidates(material.trim()) {
            if let Some(brand) = brand {
                if let Some(entry) = self.find(candidate, Some(brand)) {
                    return (entry.profile.clone(), MatchKind::Brand);
                }
            }
            if let Some(entry) = self.find(candidate, None) {
                return (entry.profile.clone(), MatchKind::Material);
            }
            if let Some(family) = self.families.iter().find(|f| f.eq_ignore_ascii_case(candidate)) {
                return (format!("Generic {}", family), MatchKind::Family);
            }
        }

        (self.default_profile.clone(), MatchKind::Default)
    }

    /// Set the destination profile of every slot
    pub fn remap_all(&self, mut filaments: FilamentList) -> FilamentList {
        for slot in filaments.slots_mut() {
            let (profile, kind) = self.resolve(&slot.material, slot.brand.as_deref());
            debug!(
                slot = slot.index,
                material = %slot.material,
                brand = slot.brand.as_deref().unwrap_or("-"),
                profile = %profile,
                rule = ?kind,
                "remapped filament"
            );
            slot.profile = Some(profile);
        }
        filaments
    }

    fn find(&self, material: &str, brand: Option<&str>) -> Option<&RemapEntry> {
        self.entries.iter().find(|e| {
            e.material.eq_ignore_ascii_case(material)
                && match (e.brand.as_deref(), brand) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    (None, None) => true,
                    _ => false,
                }
        })
    }
}

/// The type itself, then its leading family if it has a suffix
fn family_candidates(material: &str) -> Vec<&str> {
    let mut candidates = vec![material];
    if let Some(pos) = material.find(['-', ' ', '+']) {
        let family = material[..pos].trim();
        if !family.is_empty() {
            candidates.push(family);
        }
    }
    candidates
}
