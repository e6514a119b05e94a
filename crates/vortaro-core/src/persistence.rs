//! Persistence layer for the Vortaro index.
//!
//! This module handles saving and loading the index to/from disk. The on-disk
//! format is designed for:
//!
//! - Compactness: every record is stored once, phrase and fragment sets refer
//!   to positions instead of repeating strings
//! - Versioning: format changes are detected and reported
//! - Atomic writes: prevent corruption on crash
//! - Integrity: checksums to detect corruption
//!
//! ## Index File Format
//!
//! ```text
//! [Header: 32 bytes]
//!   - Magic: "VRTO" (4 bytes)
//!   - Version: u32 (4 bytes)
//!   - Flags: u32 (4 bytes) - compression
//!   - Record count: u64 (8 bytes)
//!   - Fragment size: u32 (4 bytes)
//!   - Reserved: 8 bytes
//!
//! [Body: variable]
//!   - IndexSnapshot (bincode), LZ4 compressed when flagged
//!
//! [Footer: 8 bytes]
//!   - CRC32 checksum of the body: u32
//!   - Magic: "OTRV" (4 bytes)
//! ```

use crate::error::{Result, VortaroError};
use crate::index::Index;
use crate::types::{Definition, Watermark};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Magic bytes at the start of index files
pub const MAGIC_HEADER: &[u8; 4] = b"VRTO";
/// Magic bytes at the end of index files (reversed)
pub const MAGIC_FOOTER: &[u8; 4] = b"OTRV";
/// Current index format version
pub const INDEX_VERSION: u32 = 1;

const HEADER_LEN: usize = 32;
const FOOTER_LEN: usize = 8;
const FILE_NAME: &str = "vortaro.idx";

/// Flags for index file format
#[derive(Debug, Clone, Copy)]
pub struct IndexFlags(u32);

impl IndexFlags {
    /// No compression
    pub const NONE: Self = IndexFlags(0);
    /// LZ4 compression
    pub const COMPRESSED_LZ4: Self = IndexFlags(1);

    fn is_compressed(&self) -> bool {
        self.0 & 1 != 0
    }
}

/// Header structure for the index file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexHeader {
    magic: [u8; 4],
    version: u32,
    flags: u32,
    record_count: u64,
    fragment_size: u32,
    reserved: [u8; 8],
}

impl IndexHeader {
    fn new(record_count: u64, fragment_size: usize, flags: IndexFlags) -> Self {
        IndexHeader {
            magic: *MAGIC_HEADER,
            version: INDEX_VERSION,
            flags: flags.0,
            record_count,
            fragment_size: fragment_size as u32,
            reserved: [0; 8],
        }
    }

    fn validate(&self, fragment_size: usize) -> Result<()> {
        if self.magic != *MAGIC_HEADER {
            return Err(VortaroError::IndexCorrupted {
                reason: "Invalid magic bytes in header".to_string(),
            });
        }
        if self.version != INDEX_VERSION {
            return Err(VortaroError::IndexVersionMismatch {
                found: self.version,
                expected: INDEX_VERSION,
            });
        }
        if self.fragment_size as usize != fragment_size {
            return Err(VortaroError::FragmentSizeMismatch {
                found: self.fragment_size as usize,
                expected: fragment_size,
            });
        }
        Ok(())
    }
}

/// The index flattened for storage.
///
/// `phrases` point into `records`, `fragments` point into `phrases`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IndexSnapshot {
    pub(crate) fragment_size: usize,
    pub(crate) records: Vec<Definition>,
    pub(crate) phrases: Vec<(String, Vec<u32>)>,
    pub(crate) fragments: Vec<(String, Vec<u32>)>,
    pub(crate) watermarks: Vec<(PathBuf, Watermark)>,
    pub(crate) last_updated: Option<DateTime<Utc>>,
}

/// Manages persistence of the index to disk.
///
/// ## Example
///
/// ```rust,ignore
/// use vortaro_core::{Index, IndexStore};
///
/// let store = IndexStore::new("./data");
/// store.save(&Index::new(3))?;
/// let loaded = store.load(3)?;
/// ```
pub struct IndexStore {
    /// Base directory for storing index files
    base_dir: PathBuf,

    /// Whether to use compression
    use_compression: bool,
}

impl IndexStore {
    /// Create a new IndexStore with the given base directory.
    ///
    /// The directory is created on first save.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        IndexStore {
            base_dir: base_dir.as_ref().to_path_buf(),
            use_compression: true,
        }
    }

    /// Set whether to use compression when saving.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.use_compression = compress;
        self
    }

    /// Get the path to the main index file.
    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(FILE_NAME)
    }

    fn backup_path(&self) -> PathBuf {
        self.base_dir.join(format!("{FILE_NAME}.bak"))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_dir.join(format!("{FILE_NAME}.tmp"))
    }

    /// Check if an index file exists.
    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    /// Save the index to disk.
    ///
    /// Uses atomic write (write to temp, then rename) to prevent corruption.
    pub fn save(&self, index: &Index) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;

        let snapshot = index.snapshot();
        let record_count = snapshot.records.len() as u64;

        info!(
            path = %self.index_path().display(),
            records = record_count,
            "Saving index to disk"
        );

        let bytes = bincode::serialize(&snapshot)?;
        let (body, flags) = if self.use_compression {
            (lz4_flex::compress_prepend_size(&bytes), IndexFlags::COMPRESSED_LZ4)
        } else {
            (bytes, IndexFlags::NONE)
        };

        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);

            let header = IndexHeader::new(record_count, snapshot.fragment_size, flags);
            writer.write_all(&bincode::serialize(&header)?)?;
            writer.write_all(&body)?;

            writer.write_all(&crc32fast::hash(&body).to_le_bytes())?;
            writer.write_all(MAGIC_FOOTER)?;

            writer.flush()?;
        }

        // Keep the previous index as a backup
        let index_path = self.index_path();
        let backup_path = self.backup_path();
        if index_path.exists() {
            let _ = fs::remove_file(&backup_path);
            let _ = fs::rename(&index_path, &backup_path);
        }

        fs::rename(&temp_path, &index_path)?;

        debug!(
            compressed = flags.is_compressed(),
            bytes = body.len(),
            "Index saved successfully"
        );
        Ok(())
    }

    /// Load the index from disk.
    ///
    /// `fragment_size` must match the size the index was built with.
    pub fn load(&self, fragment_size: usize) -> Result<Index> {
        let index_path = self.index_path();

        if !index_path.exists() {
            return Err(VortaroError::IndexNotFound { path: index_path });
        }

        info!(path = %index_path.display(), "Loading index from disk");

        let file = File::open(&index_path)?;
        let file_len = file.metadata()?.len() as usize;
        if file_len < HEADER_LEN + FOOTER_LEN {
            return Err(VortaroError::IndexCorrupted {
                reason: format!("File too short ({file_len} bytes)"),
            });
        }
        let mut reader = BufReader::new(file);

        let mut header_bytes = [0u8; HEADER_LEN];
        reader.read_exact(&mut header_bytes)?;
        let header: IndexHeader = bincode::deserialize(&header_bytes)?;
        header.validate(fragment_size)?;

        let mut body = vec![0u8; file_len - HEADER_LEN - FOOTER_LEN];
        reader.read_exact(&mut body)?;

        let mut footer = [0u8; FOOTER_LEN];
        reader.read_exact(&mut footer)?;

        let stored_checksum = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        if &footer[4..8] != MAGIC_FOOTER {
            return Err(VortaroError::IndexCorrupted {
                reason: "Invalid footer magic bytes".to_string(),
            });
        }

        let computed_checksum = crc32fast::hash(&body);
        if stored_checksum != computed_checksum {
            return Err(VortaroError::IndexCorrupted {
                reason: format!(
                    "Checksum mismatch: expected {:08x}, got {:08x}",
                    stored_checksum, computed_checksum
                ),
            });
        }

        let bytes = if IndexFlags(header.flags).is_compressed() {
            lz4_flex::decompress_size_prepended(&body).map_err(|e| VortaroError::IndexCorrupted {
                reason: format!("Decompression failed: {}", e),
            })?
        } else {
            body
        };

        let snapshot: IndexSnapshot =
            bincode::deserialize(&bytes).map_err(|e| VortaroError::IndexCorrupted {
                reason: format!("Deserialization failed: {}", e),
            })?;
        if snapshot.records.len() as u64 != header.record_count {
            return Err(VortaroError::IndexCorrupted {
                reason: format!(
                    "Header promises {} records, body holds {}",
                    header.record_count,
                    snapshot.records.len()
                ),
            });
        }

        let index = Index::from_snapshot(snapshot)?;
        info!(records = index.len(), "Index loaded successfully");
        Ok(index)
    }

    /// Load the index, or return a new empty one if loading fails.
    ///
    /// A damaged index file is replaced by its backup when the backup loads.
    pub fn load_or_new(&self, fragment_size: usize) -> Index {
        match self.load(fragment_size) {
            Ok(index) => index,
            Err(VortaroError::IndexNotFound { .. }) => Index::new(fragment_size),
            Err(e @ VortaroError::IndexCorrupted { .. }) => {
                match self.restore_from_backup(fragment_size) {
                    Ok(index) => {
                        warn!(error = %e, "Index unreadable, restored from backup");
                        index
                    }
                    Err(_) => {
                        warn!(error = %e, "Failed to load index, starting fresh");
                        Index::new(fragment_size)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load index, starting fresh");
                Index::new(fragment_size)
            }
        }
    }

    /// Delete all stored index data.
    pub fn clear(&self) -> Result<()> {
        let index_path = self.index_path();
        let backup_path = self.backup_path();

        if index_path.exists() {
            fs::remove_file(&index_path)?;
        }
        if backup_path.exists() {
            fs::remove_file(&backup_path)?;
        }

        Ok(())
    }

    /// Restore from backup if main index is corrupted.
    pub fn restore_from_backup(&self, fragment_size: usize) -> Result<Index> {
        let backup_path = self.backup_path();
        let index_path = self.index_path();

        if !backup_path.exists() {
            return Err(VortaroError::IndexNotFound { path: backup_path });
        }

        fs::copy(&backup_path, &index_path)?;
        self.load(fragment_size)
    }
}
