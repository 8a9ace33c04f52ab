//! Archive entries and their two-phase lifecycle.
//!
//! An entry is declared first (name, source, mtime) and prepared later:
//! preparation resolves the content size and opens the reader, which is
//! what allows header emission before any content bytes flow. A source
//! that fails to open is either a hard error or, under the archive's
//! missing-file tolerance, degrades to a zero-length entry. A source that
//! fails mid-read after its header has been written cannot be retracted;
//! the remaining announced bytes are zero-filled so the archive stays
//! structurally valid.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ion_model::FileStorage;
use tracing::warn;

use crate::error::{Result, TarError};
use crate::header::{BLOCK_LEN, EntryKind, padding_for, write_header};

/// Where an entry's content comes from.
pub enum EntrySource {
    /// In-memory bytes, typically rendered JSON.
    Data(Vec<u8>),
    Directory,
    /// A file on the local filesystem, outside any storage backend.
    LocalFile(PathBuf),
    /// A file resolved through the archive's storage backend.
    Storage(String),
}

/// Resolved state of a prepared entry.
struct Prepared {
    size: u64,
    reader: Option<Box<dyn Read + Send>>,
}

pub struct TarEntry {
    name: String,
    /// Filled at construction, except for local files without an explicit
    /// stamp, where [`prepare`](Self::prepare) derives it from the file's
    /// modification time.
    mtime: Option<DateTime<Utc>>,
    source: EntrySource,
    prepared: Option<Prepared>,
}

impl TarEntry {
    pub fn data(name: impl Into<String>, bytes: Vec<u8>, mtime: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            mtime: Some(mtime),
            source: EntrySource::Data(bytes),
            prepared: None,
        }
    }

    pub fn directory(name: impl Into<String>, mtime: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            mtime: Some(mtime),
            source: EntrySource::Directory,
            prepared: None,
        }
    }

    /// A local filesystem file; its header mtime is taken from the file's
    /// modification time when [`prepare`](Self::prepare) stats it.
    pub fn local_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mtime: None,
            source: EntrySource::LocalFile(path.into()),
            prepared: None,
        }
    }

    /// A local filesystem file with an explicit header mtime.
    pub fn local_file_with_mtime(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        mtime: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            mtime: Some(mtime),
            source: EntrySource::LocalFile(path.into()),
            prepared: None,
        }
    }

    pub fn storage(
        name: impl Into<String>,
        storage_name: impl Into<String>,
        mtime: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            mtime: Some(mtime),
            source: EntrySource::Storage(storage_name.into()),
            prepared: None,
        }
    }

    /// Archive-internal path of this entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        match self.source {
            EntrySource::Directory => EntryKind::Directory,
            _ => EntryKind::File,
        }
    }

    /// Resolve content size and open the reader.
    ///
    /// With `tolerate_missing` an unopenable source becomes a zero-length
    /// entry instead of an error; the name still appears in the archive so
    /// readers see a complete manifest.
    pub fn prepare(&mut self, storage: &dyn FileStorage, tolerate_missing: bool) -> Result<()> {
        if self.prepared.is_some() {
            return Ok(());
        }
        let mut stat_mtime = None;
        let resolved = match &mut self.source {
            EntrySource::Data(bytes) => {
                let size = bytes.len() as u64;
                Ok(Prepared {
                    size,
                    reader: Some(Box::new(io::Cursor::new(std::mem::take(bytes)))
                        as Box<dyn Read + Send>),
                })
            }
            EntrySource::Directory => Ok(Prepared {
                size: 0,
                reader: None,
            }),
            EntrySource::LocalFile(path) => std::fs::File::open(path).and_then(|file| {
                let metadata = file.metadata()?;
                stat_mtime = metadata.modified().map(DateTime::<Utc>::from).ok();
                Ok(Prepared {
                    size: metadata.len(),
                    reader: Some(Box::new(file) as Box<dyn Read + Send>),
                })
            }),
            EntrySource::Storage(name) => storage.size(name).and_then(|size| {
                Ok(Prepared {
                    size,
                    reader: Some(storage.open(name)?),
                })
            }),
        };
        if self.mtime.is_none() {
            self.mtime = stat_mtime;
        }
        self.prepared = Some(match resolved {
            Ok(prepared) => prepared,
            Err(source) if tolerate_missing => {
                warn!(entry = %self.name, error = %source, "source unavailable, archiving as empty");
                Prepared {
                    size: 0,
                    reader: None,
                }
            }
            Err(source) => {
                return Err(TarError::SourceUnavailable {
                    name: self.name.clone(),
                    source,
                });
            }
        });
        Ok(())
    }

    /// Announced content size. Only valid after [`prepare`](Self::prepare).
    pub fn size(&self) -> Result<u64> {
        self.prepared
            .as_ref()
            .map(|p| p.size)
            .ok_or_else(|| TarError::NotPrepared {
                name: self.name.clone(),
            })
    }

    /// Header + content + padding, in bytes.
    pub fn emitted_len(&self) -> Result<u64> {
        let size = self.size()?;
        Ok(BLOCK_LEN as u64 + size + padding_for(size) as u64)
    }

    /// Encoded header block. Only valid after [`prepare`](Self::prepare).
    pub(crate) fn header_block(&self) -> Result<[u8; BLOCK_LEN]> {
        let size = self.size()?;
        let mtime = self.mtime.unwrap_or_default();
        Ok(write_header(&self.name, size, mtime, self.kind()))
    }

    /// Detach the content reader, leaving the entry header-only.
    pub(crate) fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.prepared.as_mut().and_then(|p| p.reader.take())
    }

    /// Stream header, content and block padding into `out`.
    ///
    /// Exactly [`emitted_len`](Self::emitted_len) bytes are written even
    /// when the source fails mid-read; the shortfall is zero-filled.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<()> {
        out.write_all(&self.header_block()?)?;
        let size = self.size()?;
        let prepared = self.prepared.as_mut().ok_or_else(|| TarError::NotPrepared {
            name: self.name.clone(),
        })?;

        let copied = match prepared.reader.as_mut() {
            Some(reader) => copy_content(&self.name, reader, size, out)?,
            None => 0,
        };
        self.release();

        // size announced in the header is authoritative
        let shortfall = size - copied;
        write_zeros(out, shortfall + padding_for(size) as u64)?;
        Ok(())
    }

    /// Close the content reader. Called after an entry's content has been
    /// emitted and when a stream is abandoned partway, so file handles are
    /// released promptly.
    pub fn release(&mut self) {
        if let Some(prepared) = self.prepared.as_mut() {
            prepared.reader = None;
        }
    }
}

/// Copy up to `announced` bytes from the reader; on a mid-read failure log
/// and return what was copied so the caller can zero-fill the rest.
fn copy_content<W: Write>(
    name: &str,
    reader: &mut (dyn Read + Send),
    announced: u64,
    out: &mut W,
) -> Result<u64> {
    let mut buf = [0u8; BLOCK_LEN * 16];
    let mut copied = 0u64;
    while copied < announced {
        let want = (announced - copied).min(buf.len() as u64) as usize;
        match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => {
                out.write_all(&buf[..n])?;
                copied += n as u64;
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                warn!(entry = %name, %error, bytes_written = copied, "read failed mid-entry, zero-filling remainder");
                break;
            }
        }
    }
    Ok(copied)
}

pub(crate) fn write_zeros<W: Write>(out: &mut W, mut remaining: u64) -> io::Result<()> {
    let zeros = [0u8; BLOCK_LEN];
    while remaining > 0 {
        let chunk = remaining.min(BLOCK_LEN as u64) as usize;
        out.write_all(&zeros[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}
