//! Archive assembly and streaming.
//!
//! An archive is declared entry by entry, prepared in one pass (sizes
//! resolved, readers opened, in parallel batches since storage backends
//! are often remote), and then emitted either into a writer or as a chunk
//! stream. After preparation the total emitted size is exact, so callers
//! can announce a content length before the first byte is produced.

use std::io::{self, Read, Write};
use std::thread;

use ion_model::FileStorage;
use tracing::{debug, warn};

use crate::entry::{TarEntry, write_zeros};
use crate::error::{Result, TarError};
use crate::header::{BLOCK_LEN, END_MARKER_LEN, padding_for};

/// Entries prepared concurrently per batch.
const PREPARE_BATCH: usize = 16;

/// Preferred chunk size of the streaming iterator.
const CHUNK_LEN: usize = 64 * BLOCK_LEN;

/// An archive under construction.
pub struct TarArchive {
    entries: Vec<TarEntry>,
    tolerate_missing: bool,
    prepared: bool,
}

impl TarArchive {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            tolerate_missing: false,
            prepared: false,
        }
    }

    /// Degrade unopenable sources to zero-length entries instead of
    /// failing the whole archive.
    pub fn tolerate_missing(mut self, tolerate: bool) -> Self {
        self.tolerate_missing = tolerate;
        self
    }

    pub fn add(&mut self, entry: TarEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve sizes and open readers for all entries, in declaration
    /// order, batches of [`PREPARE_BATCH`] concurrently.
    pub fn prepare(&mut self, storage: &dyn FileStorage) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        let tolerate = self.tolerate_missing;
        for batch in self.entries.chunks_mut(PREPARE_BATCH) {
            let mut first_error = None;
            thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter_mut()
                    .map(|entry| scope.spawn(move || entry.prepare(storage, tolerate)))
                    .collect();
                for handle in handles {
                    let outcome = handle
                        .join()
                        .unwrap_or_else(|_| Err(io::Error::other("prepare worker panicked").into()));
                    if let Err(error) = outcome {
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                }
            });
            if let Some(error) = first_error {
                return Err(error);
            }
        }
        self.prepared = true;
        debug!(entries = self.entries.len(), "archive prepared");
        Ok(())
    }

    /// Exact number of bytes the archive will emit, end marker included.
    /// Only valid after [`prepare`](Self::prepare).
    pub fn total_size(&self) -> Result<u64> {
        let mut total = END_MARKER_LEN as u64;
        for entry in &self.entries {
            total += entry.emitted_len()?;
        }
        Ok(total)
    }

    /// Emit the complete archive into `out`.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if !self.prepared {
            return Err(TarError::NotPrepared {
                name: self
                    .entries
                    .first()
                    .map(|e| e.name().to_string())
                    .unwrap_or_default(),
            });
        }
        for entry in &mut self.entries {
            entry.write_to(out)?;
        }
        write_zeros(out, END_MARKER_LEN as u64)?;
        Ok(())
    }

    /// Turn the prepared archive into a chunk iterator.
    pub fn into_stream(self) -> TarStream {
        TarStream {
            entries: self.entries,
            index: 0,
            current: None,
            end_emitted: false,
            failed: false,
        }
    }
}

impl Default for TarArchive {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming state for the entry whose content is currently flowing.
struct CurrentEntry {
    name: String,
    reader: Option<Box<dyn Read + Send>>,
    /// Content bytes still owed per the emitted header.
    remaining: u64,
    padding: u64,
}

/// Iterator over archive chunks.
///
/// Yields the byte stream of the archive in bounded chunks; file content
/// is read lazily, one entry at a time. Dropping the iterator partway
/// releases any open reader. A source failing mid-entry does not end the
/// stream; the owed bytes are zero-filled as promised by the header.
pub struct TarStream {
    entries: Vec<TarEntry>,
    index: usize,
    current: Option<CurrentEntry>,
    end_emitted: bool,
    failed: bool,
}

impl TarStream {
    /// Close every reader still held by the stream. Run on fatal errors
    /// so the stream does not keep file handles open while the caller
    /// decides what to do with the dead iterator.
    fn release_remaining(&mut self) {
        self.current = None;
        for entry in &mut self.entries[self.index..] {
            entry.release();
        }
    }

    fn content_chunk(&mut self) -> Option<Vec<u8>> {
        let current = self.current.as_mut()?;
        if current.remaining > 0 {
            let want = current.remaining.min(CHUNK_LEN as u64) as usize;
            let mut buf = vec![0u8; want];
            let read = match current.reader.as_mut() {
                Some(reader) => match read_some(reader.as_mut(), &mut buf) {
                    Ok(0) => {
                        warn!(entry = %current.name, owed = current.remaining,
                              "source ended early, zero-filling remainder");
                        current.reader = None;
                        want
                    }
                    Ok(read) => read,
                    Err(error) => {
                        warn!(entry = %current.name, %error,
                              "read failed mid-entry, zero-filling remainder");
                        current.reader = None;
                        buf.fill(0);
                        want
                    }
                },
                // no reader: the bytes owed are all zeros
                None => want,
            };
            buf.truncate(read);
            current.remaining -= read as u64;
            return Some(buf);
        }
        if current.padding > 0 {
            let padding = current.padding as usize;
            current.padding = 0;
            return Some(vec![0u8; padding]);
        }
        self.current = None;
        None
    }
}

impl Iterator for TarStream {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(chunk) = self.content_chunk() {
            return Some(Ok(chunk));
        }
        if self.index < self.entries.len() {
            let entry = &mut self.entries[self.index];
            self.index += 1;
            let header = match entry.header_block() {
                Ok(header) => header,
                Err(error) => {
                    self.failed = true;
                    self.release_remaining();
                    return Some(Err(error));
                }
            };
            let size = match entry.size() {
                Ok(size) => size,
                Err(error) => {
                    self.failed = true;
                    self.release_remaining();
                    return Some(Err(error));
                }
            };
            self.current = Some(CurrentEntry {
                name: entry.name().to_string(),
                reader: entry.take_reader(),
                remaining: size,
                padding: padding_for(size) as u64,
            });
            return Some(Ok(header.to_vec()));
        }
        if !self.end_emitted {
            self.end_emitted = true;
            return Some(Ok(vec![0u8; END_MARKER_LEN]));
        }
        None
    }
}

/// Read into `buf`, retrying on interruption.
fn read_some(reader: &mut (dyn Read + Send), buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ion_model::LocalStorage;

    fn mtime() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, 6, 7, 8, 9).unwrap()
    }

    fn storage_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).expect("write fixture");
        }
        let storage = LocalStorage::new(dir.path());
        (dir, storage)
    }

    #[test]
    fn empty_archive_is_just_the_end_marker() {
        let (_dir, storage) = storage_with(&[]);
        let mut archive = TarArchive::new();
        archive.prepare(&storage).expect("prepare");
        assert_eq!(archive.total_size().expect("size"), 1024);

        let mut out = Vec::new();
        archive.write_to(&mut out).expect("write");
        assert_eq!(out, vec![0u8; 1024]);
    }

    #[test]
    fn total_size_matches_emitted_bytes() {
        let (_dir, storage) = storage_with(&[("a.bin", &[1u8; 700]), ("b.bin", &[2u8; 512])]);
        let mut archive = TarArchive::new();
        archive.add(TarEntry::directory("pages", mtime()));
        archive.add(TarEntry::data("index.json", b"[]".to_vec(), mtime()));
        archive.add(TarEntry::storage("pages/a/0", "a.bin", mtime()));
        archive.add(TarEntry::storage("pages/a/1", "b.bin", mtime()));
        archive.prepare(&storage).expect("prepare");

        let announced = archive.total_size().expect("size");
        let mut out = Vec::new();
        archive.write_to(&mut out).expect("write");
        assert_eq!(out.len() as u64, announced);
        // dir(512) + data(512+512) + a(512+1024) + b(512+512) + end(1024)
        assert_eq!(announced, 5120);
    }

    #[test]
    fn unprepared_archive_refuses_to_write() {
        let mut archive = TarArchive::new();
        archive.add(TarEntry::data("x", vec![0], mtime()));
        let mut out = Vec::new();
        assert!(matches!(
            archive.write_to(&mut out),
            Err(TarError::NotPrepared { .. })
        ));
    }

    #[test]
    fn missing_file_fails_prepare_by_default() {
        let (_dir, storage) = storage_with(&[]);
        let mut archive = TarArchive::new();
        archive.add(TarEntry::storage("pages/a/0", "gone.png", mtime()));
        assert!(matches!(
            archive.prepare(&storage),
            Err(TarError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn missing_file_tolerated_keeps_the_entry() {
        let (_dir, storage) = storage_with(&[]);
        let mut archive = TarArchive::new().tolerate_missing(true);
        archive.add(TarEntry::storage("pages/a/0", "gone.png", mtime()));
        archive.prepare(&storage).expect("prepare");
        assert_eq!(archive.total_size().expect("size"), 512 + 1024);

        let mut out = Vec::new();
        archive.write_to(&mut out).expect("write");
        assert_eq!(&out[..9], b"pages/a/0");
    }

    #[test]
    fn stream_concatenates_to_the_same_bytes_as_write_to() {
        let (_dir, storage) = storage_with(&[("a.bin", &[9u8; 1000])]);

        let build = || {
            let mut archive = TarArchive::new();
            archive.add(TarEntry::directory("pages", mtime()));
            archive.add(TarEntry::storage("pages/p/0", "a.bin", mtime()));
            archive.add(TarEntry::data("pages/p/page.json", b"{}".to_vec(), mtime()));
            archive
        };

        let mut direct = Vec::new();
        let mut archive = build();
        archive.prepare(&storage).expect("prepare");
        archive.write_to(&mut direct).expect("write");

        let mut archive = build();
        archive.prepare(&storage).expect("prepare");
        let mut streamed = Vec::new();
        for chunk in archive.into_stream() {
            streamed.extend(chunk.expect("chunk"));
        }
        assert_eq!(streamed, direct);
    }

    #[test]
    fn stream_can_be_dropped_midway() {
        let (_dir, storage) = storage_with(&[("a.bin", &[3u8; 4096])]);
        let mut archive = TarArchive::new();
        archive.add(TarEntry::storage("pages/p/0", "a.bin", mtime()));
        archive.prepare(&storage).expect("prepare");

        let mut stream = archive.into_stream();
        let first = stream.next().expect("header").expect("chunk");
        assert_eq!(first.len(), 512);
        drop(stream);
    }

    #[test]
    fn fatal_stream_error_ends_the_stream_and_releases_readers() {
        let (_dir, storage) = storage_with(&[("a.bin", &[4u8; 100])]);
        let mut archive = TarArchive::new();
        archive.add(TarEntry::storage("pages/p/0", "a.bin", mtime()));
        archive.prepare(&storage).expect("prepare");
        // slipped in after prepare, so it is never resolved
        archive.add(TarEntry::data("pages/p/late", vec![1], mtime()));

        let mut stream = archive.into_stream();
        let mut saw_error = false;
        for chunk in &mut stream {
            if chunk.is_err() {
                saw_error = true;
                break;
            }
        }
        assert!(saw_error);
        // a failed stream yields nothing further, not even the end marker
        assert!(stream.next().is_none());
    }

    #[test]
    fn prepare_preserves_declaration_order() {
        let files: Vec<(String, Vec<u8>)> = (0..40)
            .map(|i| (format!("f{i}.bin"), vec![i as u8; 10 + i]))
            .collect();
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, content) in &files {
            std::fs::write(dir.path().join(name), content).expect("write fixture");
        }
        let storage = LocalStorage::new(dir.path());

        let mut archive = TarArchive::new();
        for (i, (name, _)) in files.iter().enumerate() {
            archive.add(TarEntry::storage(format!("pages/x/{i}"), name.clone(), mtime()));
        }
        archive.prepare(&storage).expect("prepare");

        let mut out = Vec::new();
        archive.write_to(&mut out).expect("write");
        let mut offset = 0usize;
        for (i, (_, content)) in files.iter().enumerate() {
            let name = format!("pages/x/{i}");
            assert_eq!(&out[offset..offset + name.len()], name.as_bytes());
            let size = content.len();
            assert_eq!(&out[offset + 512..offset + 512 + size], content.as_slice());
            offset += 512 + size + padding_for(size as u64);
        }
    }
}
