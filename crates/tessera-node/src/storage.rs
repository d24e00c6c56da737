//! Snapshot storage
//!
//! ## File Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic `TSRA` |
//! | 4 | 2 | format version (LE) |
//! | 6 | 32 | BLAKE3 of the payload |
//! | 38 | .. | bincode payload |
//!
//! Writes go to a sibling temp file which is renamed over the snapshot, so
//! a crash leaves either the old or the new state on disk.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"TSRA";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 32;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("not a snapshot file")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("snapshot truncated: {0} bytes")]
    Truncated(usize),

    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
}

/// Frame a serializable value as snapshot bytes
pub fn encode<S: Serialize>(state: &S) -> Result<Vec<u8>, StorageError> {
    let payload = bincode::serialize(state)?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(blake3::hash(&payload).as_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Verify framing and checksum, then decode
pub fn decode<S: DeserializeOwned>(bytes: &[u8]) -> Result<S, StorageError> {
    if bytes.len() < HEADER_LEN {
        return Err(StorageError::Truncated(bytes.len()));
    }
    if &bytes[..4] != MAGIC {
        return Err(StorageError::BadMagic);
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(StorageError::UnsupportedVersion(version));
    }
    let payload = &bytes[HEADER_LEN..];
    if blake3::hash(payload).as_bytes()[..] != bytes[6..HEADER_LEN] {
        return Err(StorageError::ChecksumMismatch);
    }
    Ok(bincode::deserialize(payload)?)
}

/// Single-file snapshot store
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    fsync: bool,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fsync: true,
        }
    }

    /// Skip fsync before rename (tests, throwaway pools)
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Atomically replace the snapshot
    pub fn save<S: Serialize>(&self, state: &S) -> Result<(), StorageError> {
        let bytes = encode(state)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            if self.fsync {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    /// Load the snapshot, or `None` if none has been written yet
    pub fn load<S: DeserializeOwned>(&self) -> Result<Option<S>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let state = decode(&bytes)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot loaded");
        Ok(Some(state))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
