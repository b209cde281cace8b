//! Destination templates
//!
//! A template is a project saved by the destination slicer with the
//! printer, process and filament presets the output should carry. Two
//! exist, identical except for support generation; the source project's
//! settings pick one.

use crate::error::{Error, Result};
use crate::model::SettingsMap;
use crate::opc::{self, Package};
use crate::parser::parse_settings_document;
use tracing::warn;

/// Setting that turns support generation on
pub const SUPPORT_KEY: &str = "enable_support";

/// Whether a project generates supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportMode {
    /// No supports
    Disabled,
    /// Supports enabled
    Enabled,
}

impl SupportMode {
    /// Support mode requested by a source project
    ///
    /// Supports count as requested only when the user overrode
    /// `enable_support` and its value is true. A value equal to the
    /// preset default is not a request.
    pub fn from_settings(settings: &SettingsMap) -> Self {
        if settings.is_overridden(SUPPORT_KEY) && settings.is_true(SUPPORT_KEY) {
            SupportMode::Enabled
        } else {
            SupportMode::Disabled
        }
    }
}

/// A destination template with its settings parsed once
#[derive(Debug, Clone)]
pub struct Template {
    mode: SupportMode,
    package: Package,
    root_path: String,
    settings: SettingsMap,
}

impl Template {
    /// Load a template from archive bytes
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTemplate`] when the bytes are not a project with a
    /// model and a JSON settings document.
    pub fn from_bytes(bytes: &[u8], mode: SupportMode) -> Result<Self> {
        let package = opc::open(bytes).map_err(|e| invalid(mode, e))?;
        let root_path = opc::discover_model_path(&package).map_err(|e| invalid(mode, e))?;
        let settings = parse_settings_document(&package).map_err(|e| invalid(mode, e))?;

        let declared = if settings.is_true(SUPPORT_KEY) {
            SupportMode::Enabled
        } else {
            SupportMode::Disabled
        };
        if declared != mode {
            warn!(
                expected = ?mode,
                found = ?declared,
                "template support setting disagrees with its role"
            );
        }

        Ok(Self {
            mode,
            package,
            root_path,
            settings,
        })
    }

    /// Support mode this template serves
    pub fn mode(&self) -> SupportMode {
        self.mode
    }

    /// Template entries
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Root model part its relationships point at
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Parsed template settings
    pub fn settings(&self) -> &SettingsMap {
        &self.settings
    }
}

fn invalid(mode: SupportMode, err: Error) -> Error {
    Error::InvalidTemplate(format!("{:?} template: {}", mode, err))
}

/// The support-off and support-on templates
#[derive(Debug, Clone)]
pub struct TemplateSet {
    support_off: Template,
    support_on: Template,
}

impl TemplateSet {
    /// Pair two templates
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTemplate`] when a template is passed in the wrong role.
    pub fn new(support_off: Template, support_on: Template) -> Result<Self> {
        if support_off.mode() != SupportMode::Disabled || support_on.mode() != SupportMode::Enabled {
            return Err(Error::InvalidTemplate(
                "Templates passed in the wrong support roles".to_string(),
            ));
        }
        Ok(Self {
            support_off,
            support_on,
        })
    }

    /// Load both templates from archive bytes
    pub fn from_bytes(support_off: &[u8], support_on: &[u8]) -> Result<Self> {
        Self::new(
            Template::from_bytes(support_off, SupportMode::Disabled)?,
            Template::from_bytes(support_on, SupportMode::Enabled)?,
        )
    }

    /// Template for a support mode
    pub fn get(&self, mode: SupportMode) -> &Template {
        match mode {
            SupportMode::Disabled => &self.support_off,
            SupportMode::Enabled => &self.support_on,
        }
    }

    /// Template matching a source project's settings
    pub fn select(&self, settings: &SettingsMap) -> &Template {
        self.get(SupportMode::from_settings(settings))
    }
}
