//! Ambient serialization context.
//!
//! The context replaces the parent back-reference chain of the node tree:
//! it is built once per serialization pass and passed explicitly down the
//! recursion, so nodes never hold references to each other.

use ion_model::{FileHandle, FileMeta, FileStorage, SerializeOptions, file_metadata};

/// Request-scoped data available to every serializer in a pass.
pub struct SerializeContext<'a> {
    pub options: &'a SerializeOptions,
    pub storage: &'a dyn FileStorage,
}

impl<'a> SerializeContext<'a> {
    pub fn new(options: &'a SerializeOptions, storage: &'a dyn FileStorage) -> Self {
        Self { options, storage }
    }

    /// Build an absolute URL from a possibly relative path.
    pub fn absolute_url(&self, url: &str) -> String {
        self.options.absolute_url(url)
    }

    /// Resolve the metadata of a stored file.
    pub fn file_meta(&self, handle: &FileHandle) -> std::io::Result<FileMeta> {
        file_metadata(self.storage, &handle.name)
    }

    /// Whether missing files degrade to sentinels instead of failing.
    pub fn allow_missing_files(&self) -> bool {
        self.options.allow_missing_files
    }
}
