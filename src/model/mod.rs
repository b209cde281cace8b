//! Data structures for parsed project documents

mod document;
mod filament;
mod settings;

pub use document::{
    BuildItem, Component, FilamentAssignment, Mesh, ModelDocument, ModelObject, ObjectType,
    PaintMap, TrianglePaint,
};
pub use filament::{
    DEFAULT_MATERIAL, FilamentList, FilamentOverride, FilamentSlot, MAX_FILAMENTS,
    PLACEHOLDER_COLOUR, normalize_colour,
};
pub use settings::{DIFFERENT_SETTINGS_KEY, SettingsMap};
