//! Streaming POSIX-ustar archive writer.
//!
//! Builds tar archives whose byte layout is fixed and reproducible:
//! identical inputs produce identical archives. Entries are declared
//! first, prepared in a separate pass (sizes resolved and readers opened,
//! so the exact archive size is known before the first byte is emitted),
//! and then streamed either into a writer or as a chunk iterator.
//!
//! A source that disappears between preparation and emission cannot make
//! the archive malformed: the bytes owed by the already-written header
//! are zero-filled and the stream continues with the next entry.

pub mod archive;
pub mod entry;
pub mod error;
pub mod header;

pub use archive::{TarArchive, TarStream};
pub use entry::{EntrySource, TarEntry};
pub use error::{Result, TarError};
pub use header::{BLOCK_LEN, END_MARKER_LEN, EntryKind, header_checksum, padding_for, write_header};
