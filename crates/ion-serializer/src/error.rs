//! Error types for ION serialization.

use ion_model::{ModelError, ValueKind};
use thiserror::Error;

/// Errors that can occur while serializing a content tree.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// No serializer is registered for a value's kind. Raised by
    /// containers when a child cannot be dispatched; this is a
    /// configuration bug and aborts the whole tree build.
    #[error("no serializer registered for content kind {kind:?}")]
    NoSerializer { kind: ValueKind },

    /// A referenced file could not be resolved through storage and
    /// missing-file tolerance is off.
    #[error("missing file '{name}': {source}")]
    MissingFile {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Attached files were queried before a successful `serialize()`.
    /// This is a programming error in the caller.
    #[error("attached files are only available after successful serialization")]
    AttachedFilesNotReady,

    /// Page content declarations could not be resolved.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type alias for serialization operations.
pub type Result<T> = std::result::Result<T, SerializeError>;

impl SerializeError {
    /// Create a MissingFile error.
    pub fn missing_file(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::MissingFile {
            name: name.into(),
            source,
        }
    }
}
