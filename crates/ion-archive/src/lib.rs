//! Archive assembly: serialize pages, collect their files and lay the
//! result out as a streamed tar archive with an `index.json` manifest.

pub mod build;
pub mod collect;
pub mod error;

pub use build::{BuildUrl, build_collection_archive, build_page_archive, default_build_url};
pub use collect::{
    CollectedFile, IndexEntry, NamedFile, assign_archive_names, collect_page_files, dedup_files,
    dedup_index,
};
pub use error::{ArchiveError, Result};
