//! Conversion pipeline
//!
//! A [`Converter`] owns the destination templates and the remap table, all
//! read-only after construction, and runs one conversion per call:
//!
//! ```text
//! open → parse model + parse settings → extract filaments → remap
//!      → pad → select template → merge → write
//! ```
//!
//! Conversions share nothing mutable, so one converter can serve many
//! threads at once.

use crate::error::{Error, Result};
use crate::merger::merge;
use crate::model::{FilamentList, FilamentOverride, MAX_FILAMENTS, ModelDocument, SettingsMap};
use crate::opc::{self, SETTINGS_PATH};
use crate::padding::pad_filaments;
use crate::parser::{extract_filaments, parse_model_document, parse_settings_document};
use crate::remap::RemapTable;
use crate::template::{SupportMode, TemplateSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a [`Converter`] loads its assets from
///
/// # Example
///
/// ```no_run
/// use u1convert::{Converter, ConverterConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConverterConfig::new()
///     .with_template("templates/u1_template.3mf")
///     .with_support_template("templates/u1_template_supports.3mf")
///     .with_profile_package("templates/filament_types.3mf");
/// let converter = Converter::from_config(&config)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConverterConfig {
    template: Option<PathBuf>,
    support_template: Option<PathBuf>,
    profile_package: Option<PathBuf>,
    remap_table: Option<RemapTable>,
}

impl ConverterConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the support-off template path
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    /// Set the support-on template path
    pub fn with_support_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.support_template = Some(path.into());
        self
    }

    /// Build the remap table from a profile package
    pub fn with_profile_package(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_package = Some(path.into());
        self
    }

    /// Use a custom remap table; takes precedence over a profile package
    pub fn with_remap_table(mut self, table: RemapTable) -> Self {
        self.remap_table = Some(table);
        self
    }

    /// Support-off template path
    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    /// Support-on template path
    pub fn support_template(&self) -> Option<&Path> {
        self.support_template.as_deref()
    }

    /// Profile package path
    pub fn profile_package(&self) -> Option<&Path> {
        self.profile_package.as_deref()
    }
}

/// Facts about a source project, as shown before converting it
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    /// Declared filaments with their destination profiles, not padded
    pub filaments: FilamentList,
    /// Support mode the output will use
    pub support: SupportMode,
    /// Number of objects across all model parts
    pub objects: usize,
    /// Number of triangles across all meshes
    pub triangles: usize,
    /// Number of triangles with paint data
    pub painted_triangles: usize,
}

/// Converts source projects into destination projects
#[derive(Debug, Clone)]
pub struct Converter {
    templates: TemplateSet,
    table: RemapTable,
    placeholder_profile: String,
}

struct Prepared {
    model: ModelDocument,
    settings: SettingsMap,
    filaments: FilamentList,
}

impl Converter {
    /// Create a converter from loaded templates and a remap table
    pub fn new(templates: TemplateSet, table: RemapTable) -> Self {
        let placeholder_profile = table.placeholder_profile();
        Self {
            templates,
            table,
            placeholder_profile,
        }
    }

    /// Load templates and remap table from disk
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTemplate`] when a template path is not configured
    ///   or a file is not a usable template or profile package
    /// - [`Error::Io`] when a file cannot be read
    pub fn from_config(config: &ConverterConfig) -> Result<Self> {
        let template = config.template().ok_or_else(|| {
            Error::InvalidTemplate("No support-off template configured".to_string())
        })?;
        let support_template = config.support_template().ok_or_else(|| {
            Error::InvalidTemplate("No support-on template configured".to_string())
        })?;

        let templates =
            TemplateSet::from_bytes(&std::fs::read(template)?, &std::fs::read(support_template)?)?;

        let table = match (&config.remap_table, config.profile_package()) {
            (Some(table), _) => table.clone(),
            (None, Some(path)) => RemapTable::from_profile_package(&std::fs::read(path)?)?,
            (None, None) => RemapTable::builtin(),
        };

        debug!(
            template = %template.display(),
            support_template = %support_template.display(),
            profiles = table.entries().len(),
            "converter ready"
        );
        Ok(Self::new(templates, table))
    }

    /// Loaded templates
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Remap table in use
    pub fn remap_table(&self) -> &RemapTable {
        &self.table
    }

    /// Convert a source project
    ///
    /// # Errors
    ///
    /// Any error kind except [`Error::Io`] and [`Error::InvalidTemplate`];
    /// nothing is produced on error.
    pub fn convert(&self, source: &[u8]) -> Result<Vec<u8>> {
        self.convert_with_overrides(source, &[])
    }

    /// Convert a source project after replacing some filament colours or
    /// materials
    pub fn convert_with_overrides(&self, source: &[u8], overrides: &[FilamentOverride]) -> Result<Vec<u8>> {
        let Prepared {
            model,
            settings,
            filaments,
        } = self.prepare(source, overrides)?;

        let filaments = pad_filaments(filaments, &self.placeholder_profile)?;
        let template = self.templates.select(&settings);
        let output = merge(&model, &filaments, template)?;
        let bytes = opc::write(&output)?;

        info!(
            support = ?template.mode(),
            filaments = filaments.iter().filter(|s| !s.placeholder).count(),
            painted_triangles = model.painted_triangle_count(),
            input_bytes = source.len(),
            output_bytes = bytes.len(),
            "converted project"
        );
        Ok(bytes)
    }

    /// Inspect a source project without converting it
    ///
    /// Fails the same way a conversion would on bad input, including
    /// [`Error::TooManyFilaments`].
    pub fn analyze(&self, source: &[u8]) -> Result<ProjectSummary> {
        let Prepared {
            model,
            settings,
            filaments,
        } = self.prepare(source, &[])?;

        if filaments.len() > MAX_FILAMENTS {
            return Err(Error::TooManyFilaments {
                count: filaments.len(),
                max: MAX_FILAMENTS,
            });
        }

        Ok(ProjectSummary {
            support: SupportMode::from_settings(&settings),
            objects: model.objects.len(),
            triangles: model.triangle_count(),
            painted_triangles: model.painted_triangle_count(),
            filaments,
        })
    }

    fn prepare(&self, source: &[u8], overrides: &[FilamentOverride]) -> Result<Prepared> {
        let package = opc::open(source)?;
        let model = parse_model_document(&package)?;
        let settings = parse_settings_document(&package)?;
        let mut filaments = extract_filaments(&package, &settings)?;

        apply_overrides(&mut filaments, overrides)?;
        check_references(&model, &filaments)?;
        debug!(
            entries = package.len(),
            filaments = filaments.len(),
            "source project read"
        );

        let filaments = self.table.remap_all(filaments);
        Ok(Prepared {
            model,
            settings,
            filaments,
        })
    }
}

fn apply_overrides(filaments: &mut FilamentList, overrides: &[FilamentOverride]) -> Result<()> {
    let declared = filaments.len();
    for o in overrides {
        let slot = filaments.slots_mut().get_mut(o.index).ok_or_else(|| {
            Error::malformed_settings(
                SETTINGS_PATH,
                &format!(
                    "override for filament {} but the project declares {}",
                    o.index + 1,
                    declared
                ),
            )
        })?;
        o.apply(slot);
    }
    Ok(())
}

/// Reject paint or assignments the destination cannot represent
fn check_references(model: &ModelDocument, filaments: &FilamentList) -> Result<()> {
    let Some(max_slot) = model.max_referenced_slot() else {
        return Ok(());
    };

    if max_slot >= MAX_FILAMENTS {
        return Err(Error::TooManyFilaments {
            count: max_slot + 1,
            max: MAX_FILAMENTS,
        });
    }
    if max_slot >= filaments.len() {
        warn!(
            slot = max_slot,
            declared = filaments.len(),
            "model references an undeclared filament; it will print with a placeholder"
        );
    }
    Ok(())
}
