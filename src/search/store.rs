//! Content-addressed file store for cached results
use super::{CacheKey, SearchResult};
use crate::error::{Result, TocError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Kinds of values the store knows how to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredKind {
    Table,
    Scalar,
    Blob,
}

impl StoredKind {
    fn extension(self) -> &'static str {
        match self {
            StoredKind::Table => "json",
            StoredKind::Scalar => "num",
            StoredKind::Blob => "bin",
        }
    }
}

/// A persisted value. The producer picks the variant, and each variant has its own encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
    Table(SearchResult),
    Scalar(f64),
    Blob(Vec<u8>),
}

impl Stored {
    pub fn kind(&self) -> StoredKind {
        match self {
            Stored::Table(_) => StoredKind::Table,
            Stored::Scalar(_) => StoredKind::Scalar,
            Stored::Blob(_) => StoredKind::Blob,
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Stored::Table(result) => Ok(serde_json::to_vec(result)?),
            Stored::Scalar(value) => Ok(value.to_string().into_bytes()),
            Stored::Blob(bytes) => Ok(bytes.clone()),
        }
    }

    fn decode(kind: StoredKind, bytes: Vec<u8>) -> Result<Self> {
        match kind {
            StoredKind::Table => Ok(Stored::Table(serde_json::from_slice(&bytes)?)),
            StoredKind::Scalar => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| TocError::Other(format!("scalar entry is not UTF-8: {e}")))?;
                text.trim()
                    .parse::<f64>()
                    .map(Stored::Scalar)
                    .map_err(|e| TocError::Other(format!("invalid scalar entry '{text}': {e}")))
            }
            StoredKind::Blob => Ok(Stored::Blob(bytes)),
        }
    }
}

/// One file per key under `<root>/<namespace>/`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    verbatim_limit: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, verbatim_limit: usize) -> Self {
        Self {
            root: root.into(),
            verbatim_limit,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey, kind: StoredKind) -> PathBuf {
        self.root.join(&key.namespace).join(format!(
            "{}.{}",
            key.file_stem(self.verbatim_limit),
            kind.extension()
        ))
    }

    /// Read an entry. A missing file is `Ok(None)`; an unreadable one is an error.
    pub fn get(&self, key: &CacheKey, kind: StoredKind) -> Result<Option<Stored>> {
        let path = self.path_for(key, kind);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Stored::decode(kind, bytes).map(Some)
    }

    /// Write an entry through a temporary file renamed into place.
    ///
    /// Storing the same key again replaces the previous file.
    pub fn put(&self, key: &CacheKey, value: &Stored) -> Result<PathBuf> {
        let path = self.path_for(key, value.kind());
        let dir = path
            .parent()
            .ok_or_else(|| TocError::Other(format!("cache path has no parent: {}", path.display())))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&value.encode()?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| TocError::Io(e.error))?;
        Ok(path)
    }

    /// Remove every entry of one namespace
    pub fn clear_namespace(&self, namespace: &str) -> Result<()> {
        let dir = self.root.join(namespace);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn clear_all(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Number of persisted entries across all namespaces
    pub fn entry_count(&self) -> usize {
        let Ok(namespaces) = fs::read_dir(&self.root) else {
            return 0;
        };
        namespaces
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| fs::read_dir(entry.path()).ok())
            .flat_map(|files| files.filter_map(|f| f.ok()))
            .filter(|f| {
                f.path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e, "json" | "num" | "bin"))
            })
            .count()
    }
}
