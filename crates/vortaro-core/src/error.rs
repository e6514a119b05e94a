//! Error types for Vortaro core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using VortaroError
pub type Result<T> = std::result::Result<T, VortaroError>;

/// Core error types for Vortaro operations.
///
/// Data errors inside a single dictionary line never surface here; they are
/// counted by the indexer and skipped. What remains are failures a caller may
/// want to handle differently (e.g., rebuilding the index after a format
/// change).
#[derive(Error, Debug)]
pub enum VortaroError {
    // === Index Errors ===
    /// The index file is missing or could not be found
    #[error("index not found at {path}")]
    IndexNotFound { path: PathBuf },

    /// The index file exists but is corrupted or unreadable
    #[error("index is corrupted: {reason}")]
    IndexCorrupted { reason: String },

    /// The index format version doesn't match the current version
    #[error("index version mismatch: found {found}, expected {expected}")]
    IndexVersionMismatch { found: u32, expected: u32 },

    /// The stored index was built with another fragment size
    #[error("index was built with fragment size {found}, configured size is {expected}")]
    FragmentSizeMismatch { found: usize, expected: usize },

    // === Source Errors ===
    /// A dictionary source file could not be opened or read to the end
    #[error("cannot read dictionary {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dictionary source file has no recognizable header
    #[error("unrecognized dictionary format in {path}: {reason}")]
    UnrecognizedSource { path: PathBuf, reason: String },

    // === Alphabet Errors ===
    /// An alphabet table contains a key that is empty or longer than two characters
    #[error("invalid alphabet for '{language}': key {key:?} must be 1 or 2 characters")]
    InvalidAlphabet { language: String, key: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl VortaroError {
    /// Returns true if this error indicates the index needs to be rebuilt
    pub fn requires_reindex(&self) -> bool {
        matches!(
            self,
            VortaroError::IndexNotFound { .. }
                | VortaroError::IndexCorrupted { .. }
                | VortaroError::IndexVersionMismatch { .. }
                | VortaroError::FragmentSizeMismatch { .. }
        )
    }

    /// Returns true if this error is recoverable (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VortaroError::Io(_) | VortaroError::SourceUnreadable { .. }
        )
    }

    /// Create a source read error for a file
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VortaroError::SourceUnreadable {
            path: path.into(),
            source,
        }
    }
}

impl From<bincode::Error> for VortaroError {
    fn from(err: bincode::Error) -> Self {
        VortaroError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_reindex() {
        let err = VortaroError::IndexNotFound {
            path: PathBuf::from("/test"),
        };
        assert!(err.requires_reindex());

        let err = VortaroError::FragmentSizeMismatch {
            found: 3,
            expected: 4,
        };
        assert!(err.requires_reindex());

        let err = VortaroError::InvalidAlphabet {
            language: "sr".to_string(),
            key: String::new(),
        };
        assert!(!err.requires_reindex());
    }

    #[test]
    fn test_unreadable_is_recoverable() {
        let err = VortaroError::unreadable(
            "/data/dict.cc/en-de.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("en-de.txt"));
    }
}
