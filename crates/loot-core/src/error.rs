//! Error types for loot-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in loot-core
#[derive(Debug, Error)]
pub enum Error {
    /// Modpack root is missing or not a directory
    #[error("modpack root '{0}' is not a directory")]
    InvalidRoot(PathBuf),

    /// A single archive, file or descriptor could not be read during discovery
    #[error("source '{path}' is unreadable: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    /// Blank namespace or table path on create/save
    #[error("{0} is required")]
    IdentityRequired(&'static str),

    /// Override manifest exists but cannot be parsed
    #[error("override manifest '{path}' is corrupt: {source}")]
    ManifestCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A row references an enchantment pool that is not stored
    #[error("enchantment pool '{0}' not found")]
    PoolUnresolved(String),

    /// No visible table carries the requested identifier
    #[error("loot table not found: {0}")]
    TableNotFound(String),

    /// Create/fork target already exists
    #[error("loot table already exists at '{0}'")]
    TargetExists(PathBuf),

    /// Load requested for an archive member that no longer exists
    #[error("archive '{archive}' has no entry '{member}'")]
    ArchiveEntryMissing { archive: PathBuf, member: String },

    /// Malformed namespace:path identifier
    #[error("invalid loot id: '{0}'")]
    InvalidLootId(String),

    /// Invalid enchantment pool definition
    #[error("invalid enchantment pool: {0}")]
    InvalidPool(String),

    /// Background task could not be started or did not finish
    #[error("task '{name}' failed: {message}")]
    TaskFailed { name: String, message: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Zip/jar archive error
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any error raised while visiting one discovery source
    pub(crate) fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::SourceUnreadable {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
