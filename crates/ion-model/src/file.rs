//! File handles, metadata and the storage abstraction.
//!
//! Content objects reference files by storage name plus public URL; the
//! actual bytes live behind [`FileStorage`]. Metadata (size, checksum,
//! mime type, mtime) is resolved through the storage at serialization
//! time so a missing file surfaces as an ordinary I/O error the caller
//! can either propagate or degrade from.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reference to a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle {
    /// Storage-relative name, resolved through [`FileStorage`].
    pub name: String,
    /// Public URL path. Relative URLs are made absolute via the
    /// serialization context.
    pub url: String,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Resolved metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub size: u64,
    /// Content checksum, `sha256:<hex>`.
    pub checksum: String,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Abstraction over the file storage backend.
///
/// Implementations may be local disk or any remote object store; failures
/// are reported as `io::Error` so the serializers and the tar writer can
/// apply their missing-file policies uniformly.
pub trait FileStorage: Send + Sync {
    /// Open a file for reading.
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;

    /// Byte size of a file.
    fn size(&self, name: &str) -> io::Result<u64>;

    /// Last modification time, if the backend tracks one.
    fn last_modified(&self, name: &str) -> io::Result<Option<DateTime<Utc>>>;
}

/// Read a file completely and compute checksum + detected mime type.
///
/// The mime type is guessed from the file name; the checksum is a sha-256
/// digest over the content, rendered as `sha256:<hex>`.
pub fn file_metadata(storage: &dyn FileStorage, name: &str) -> io::Result<FileMeta> {
    let mut reader = storage.open(name)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok(FileMeta {
        size,
        checksum: format!("sha256:{}", hex::encode(hasher.finalize())),
        mime_type: detect_mime_type(name),
        last_modified: storage.last_modified(name)?,
    })
}

/// Guess a mime type from the file name, defaulting to octet-stream.
pub fn detect_mime_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Local-filesystem storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage name below the root, rejecting path escapes.
    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("invalid storage name: {name}"),
                    ));
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl FileStorage for LocalStorage {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let path = self.resolve(name)?;
        Ok(Box::new(File::open(path)?))
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        let path = self.resolve(name)?;
        Ok(path.metadata()?.len())
    }

    fn last_modified(&self, name: &str) -> io::Result<Option<DateTime<Utc>>> {
        let path = self.resolve(name)?;
        let modified = path.metadata()?.modified()?;
        Ok(Some(DateTime::<Utc>::from(modified)))
    }
}
