//! Error types for `SwgForge`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `SwgForge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== IFF Structure Errors ====================
    /// A form or chunk was not the one the caller expected.
    #[error("structural mismatch: expected {expected}, found {found}")]
    StructuralMismatch {
        /// The tag (or block kind) the caller asked for.
        expected: String,
        /// What was actually at the cursor.
        found: String,
    },

    /// A read would run past the end of the current block.
    #[error("truncated data: wanted {wanted} bytes, {available} available")]
    TruncatedData {
        /// Bytes the read needed.
        wanted: usize,
        /// Bytes left in the current block.
        available: usize,
    },

    /// A tag was not exactly four ASCII bytes.
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    // ==================== Format Errors ====================
    /// The version form of a file is not one this tool can read.
    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion {
        /// Format name, e.g. `MESH`.
        format: String,
        /// The offending version tag.
        version: String,
    },

    /// A referenced file could not be located under the asset root.
    #[error("missing reference: {path}")]
    MissingReference {
        /// The relative reference as stored in the referencing file.
        path: PathBuf,
    },

    // ==================== Geometry Errors ====================
    /// Geometry did not have the shape the encoder needs (e.g. a quad).
    #[error("geometry assumption violated: {message}")]
    GeometryAssumption {
        /// Description of the offending element.
        message: String,
    },

    /// A cell portal did not resolve to exactly one partner cell.
    #[error("portal {portal} of cell {cell} has {partners} partner cells (expected 1)")]
    AmbiguousConnectivity {
        /// Building-wide portal id.
        portal: i32,
        /// Index of the cell that references the portal.
        cell: usize,
        /// Number of other cells that reference the same portal.
        partners: usize,
    },

    /// The caller asked to keep the imported CRC but none was loaded.
    #[error("no imported CRC available for this portal container")]
    IdentityUnavailable,

    // ==================== Serialization Errors ====================
    /// Tool configuration could not be parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// An opaque blob carried as text was not valid base64.
    #[error("invalid blob encoding: {0}")]
    Blob(#[from] base64::DecodeError),

    /// JSON dump failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::StructuralMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn unsupported(format: &str, version: &str) -> Self {
        Error::UnsupportedVersion {
            format: format.to_string(),
            version: version.to_string(),
        }
    }

    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        Error::GeometryAssumption {
            message: message.into(),
        }
    }
}

/// Result type alias for `SwgForge` operations.
pub type Result<T> = std::result::Result<T, Error>;
