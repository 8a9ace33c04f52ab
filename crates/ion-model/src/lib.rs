//! ION content model definitions.
//!
//! Pure data types shared across the workspace: the closed content
//! [`Value`] variants, file handles and the storage abstraction, the
//! [`Page`] model, and serialization options.

pub mod error;
pub mod file;
pub mod options;
pub mod page;
pub mod value;

pub use error::{ModelError, Result};
pub use file::{FileHandle, FileMeta, FileStorage, LocalStorage, detect_mime_type, file_metadata};
pub use options::{DEFAULT_MEDIA_RENDITION, SerializeOptions};
pub use page::{ExtraField, Page};
pub use value::{
    DocumentContent, ImageContent, ImageRendition, MediaContent, MediaKind, MediaRendition,
    MediaRenditionRef, PageLink, StreamItem, TableValue, Value, ValueKind,
};
