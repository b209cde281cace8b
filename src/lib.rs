//! # u1convert
//!
//! Converts multi-colour Bambu Studio projects (`.3mf`) into projects the
//! Snapmaker U1 slicer opens with paint, colours and filament assignments
//! intact.
//!
//! A conversion grafts the source model (every part under `3D/` plus the
//! per-object filament assignments) into a pre-built U1 template project,
//! byte-for-byte, and rewrites only the template's filament settings:
//! colours, types and U1 filament profiles for exactly four slots.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Geometry and paint data are never rewritten
//! - Filament profiles resolved from a static remap table or a reference
//!   profile package
//! - Support-on and support-off templates picked from the source settings
//! - One immutable [`Converter`] can serve many threads
//!
//! ## Example
//!
//! ```no_run
//! use u1convert::{Converter, ConverterConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::from_config(
//!     &ConverterConfig::new()
//!         .with_template("u1_template.3mf")
//!         .with_support_template("u1_template_supports.3mf"),
//! )?;
//!
//! let source = std::fs::read("benchy_multicolor.3mf")?;
//! let output = converter.convert(&source)?;
//! std::fs::write("benchy_multicolor_U1_Ready.3mf", output)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod converter;
pub mod error;
pub mod merger;
pub mod model;
pub mod opc;
pub mod padding;
pub mod parser;
pub mod remap;
pub mod template;

pub use converter::{Converter, ConverterConfig, ProjectSummary};
pub use error::{Error, ErrorKind, Result};
pub use model::{
    FilamentList, FilamentOverride, FilamentSlot, MAX_FILAMENTS, ModelDocument, SettingsMap,
};
pub use remap::{RemapEntry, RemapTable};
pub use template::{SupportMode, Template, TemplateSet};
