//! File collection and manifest entries.
//!
//! A serialized page tree advertises the files its content references;
//! collection turns those into archive candidates tagged with the owning
//! page. Both the candidate list and the manifest are deduplicated by
//! resolved URL, first occurrence wins, so serializing overlapping pages
//! stays idempotent.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use ion_model::FileHandle;
use ion_serializer::AttachedFile;
use serde::Serialize;

/// A file collected from a page's content tree, candidate for archival.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedFile {
    /// Absolute public URL; dedup key.
    pub url: String,
    /// Slug of the page whose content referenced the file.
    pub page_slug: String,
    pub checksum: String,
    pub handle: FileHandle,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One entry of the `index.json` manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub url: String,
    /// Archive-internal path of the entry.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Tag a page's attached files with the owning slug.
pub fn collect_page_files(page_slug: &str, files: &[AttachedFile]) -> Vec<CollectedFile> {
    files
        .iter()
        .map(|file| CollectedFile {
            url: file.url.clone(),
            page_slug: page_slug.to_string(),
            checksum: file.checksum.clone(),
            handle: file.handle.clone(),
            last_modified: file.last_modified,
        })
        .collect()
}

/// A collected file paired with its archive-internal name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFile {
    pub file: CollectedFile,
    pub archive_name: String,
}

/// Assign archive names `pages/<slug>/<n>`, one counter per page, in
/// collection order.
pub fn assign_archive_names(files: Vec<CollectedFile>) -> Vec<NamedFile> {
    let mut counters: HashMap<String, u64> = HashMap::new();
    files
        .into_iter()
        .map(|file| {
            let counter = counters.entry(file.page_slug.clone()).or_insert(0);
            let archive_name = format!("pages/{}/{}", file.page_slug, counter);
            *counter += 1;
            NamedFile { file, archive_name }
        })
        .collect()
}

/// Drop files whose URL was already seen, keeping the first occurrence.
pub fn dedup_files(files: Vec<NamedFile>) -> Vec<NamedFile> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|named| seen.insert(named.file.url.clone()))
        .collect()
}

/// Drop manifest entries whose URL was already seen, keeping the first.
pub fn dedup_index(entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.url.clone()))
        .collect()
}
