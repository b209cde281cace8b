//! Error types for project conversion
//!
//! Every error carries a code so callers (an HTTP layer, the CLI) can relay a
//! stable kind together with a human-readable message.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: document structure errors
//! - **E3xxx**: hardware limits
//! - **E4xxx**: startup configuration errors
//! - **E9xxx**: internal defects
//!
//! ## Codes
//!
//! - `E1001`: I/O error reading a template or profile file
//! - `E1002`: corrupt archive or missing required entry
//! - `E2001`: malformed model document
//! - `E2002`: malformed settings document
//! - `E3001`: more filaments than the printer has slots
//! - `E4001`: invalid template or profile package
//! - `E9001`: internal invariant violation

use std::io;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error category, suitable for mapping onto a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File system error while loading startup assets
    Io,
    /// Unreadable archive or missing required entry
    CorruptArchive,
    /// Model document present but invalid
    MalformedModel,
    /// Settings document present but invalid
    MalformedSettings,
    /// Source uses more filaments than the destination printer supports
    TooManyFilaments,
    /// A template or profile package is unusable
    InvalidTemplate,
    /// A conversion invariant was broken; this is a defect, not bad input
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::CorruptArchive => "corrupt_archive",
            ErrorKind::MalformedModel => "malformed_model",
            ErrorKind::MalformedSettings => "malformed_settings",
            ErrorKind::TooManyFilaments => "too_many_filaments",
            ErrorKind::InvalidTemplate => "invalid_template",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while converting a project
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading a template or profile file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Template path misconfigured
    /// - Insufficient permissions
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a readable package
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Not a ZIP file, or a truncated upload
    /// - Missing `3D/3dmodel.model` or `Metadata/project_settings.config`
    /// - Duplicate entry names
    ///
    /// **Suggestions**:
    /// - Re-export the project from the slicer as a full project file, not a plate
    #[error("[E1002] Corrupt archive: {0}")]
    CorruptArchive(String),

    /// The model document does not parse or has dangling references
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Malformed XML in a model part
    /// - Component referencing an object that does not exist
    /// - Paint data that is not a valid hex code
    #[error("[E2001] Malformed model: {0}")]
    MalformedModel(String),

    /// The settings document does not parse or has the wrong shape
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - Settings file is not a JSON object
    /// - No filaments declared
    #[error("[E2002] Malformed settings: {0}")]
    MalformedSettings(String),

    /// The source declares or paints with more filaments than the printer has
    ///
    /// **Error Code**: E3001
    ///
    /// **Suggestions**:
    /// - Merge colors in the source project until at most `max` remain
    #[error("[E3001] Too many filaments: {count} used, the printer supports at most {max}")]
    TooManyFilaments {
        /// Number of filaments the source needs
        count: usize,
        /// Number of slots the destination printer offers
        max: usize,
    },

    /// A template or profile package could not be used
    ///
    /// **Error Code**: E4001
    ///
    /// **Common Causes**:
    /// - Template file is not a U1 project
    /// - Template is missing its settings document
    #[error("[E4001] Invalid template: {0}")]
    InvalidTemplate(String),

    /// An internal invariant was violated
    ///
    /// **Error Code**: E9001
    ///
    /// Never caused by user input; report it as a bug.
    #[error("[E9001] Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::CorruptArchive(format!("ZIP error: {}", err))
    }
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::CorruptArchive(_) => ErrorKind::CorruptArchive,
            Error::MalformedModel(_) => ErrorKind::MalformedModel,
            Error::MalformedSettings(_) => ErrorKind::MalformedSettings,
            Error::TooManyFilaments { .. } => ErrorKind::TooManyFilaments,
            Error::InvalidTemplate(_) => ErrorKind::InvalidTemplate,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is a defect rather than a problem with the input
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    /// Create a CorruptArchive error for a required entry that is absent
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_entry("3D/3dmodel.model")
    /// ```
    pub fn missing_entry(name: &str) -> Self {
        Error::CorruptArchive(format!(
            "Missing required entry '{}'. \
             Export the project from the slicer as a full project file.",
            name
        ))
    }

    /// Create a MalformedModel error with the part it was found in
    ///
    /// # Arguments
    /// * `part` - Archive path of the model part
    /// * `message` - Description of the problem
    pub fn malformed_model(part: &str, message: &str) -> Self {
        Error::MalformedModel(format!("{}: {}", part, message))
    }

    /// Create a MalformedSettings error with the entry it was found in
    ///
    /// # Arguments
    /// * `entry` - Archive path of the settings document
    /// * `message` - Description of the problem
    pub fn malformed_settings(entry: &str, message: &str) -> Self {
        Error::MalformedSettings(format!("{}: {}", entry, message))
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }
}
