//! Archive layout: serialize pages, collect files, write the manifest
//! and hand everything to the tar writer.
//!
//! Layout of a built archive, in emission order:
//! 1. `index.json` — manifest of every entry, URLs resolved, first file.
//! 2. `pages` directory entry.
//! 3. One `pages/<slug>.json` document per serialized page.
//! 4. A `pages/<slug>` directory entry per page that owns files.
//! 5. The collected files as `pages/<slug>/<n>`.

use chrono::{DateTime, Utc};
use ion_model::Page;
use ion_serializer::{OutletRemap, SerializeContext, SerializerRegistry, serialize_page};
use ion_tar::{TarArchive, TarEntry};
use tracing::info;

use crate::collect::{
    CollectedFile, IndexEntry, NamedFile, assign_archive_names, collect_page_files, dedup_files,
    dedup_index,
};
use crate::error::Result;

/// Builds the manifest URL of a page. Deployments with custom routing
/// substitute their own.
pub type BuildUrl = fn(&SerializeContext<'_>, &Page) -> String;

/// Default page URL: `<base>/pages/<collection>/<slug>?variation=<v>`.
pub fn default_build_url(ctx: &SerializeContext<'_>, page: &Page) -> String {
    let collection = page.collection.as_deref().unwrap_or("default");
    let url = ctx.absolute_url(&format!("pages/{collection}/{}", page.slug));
    format!("{url}?variation={}", ctx.options.variation)
}

/// Append the requested variation to file URLs served by this deployment.
/// External URLs are left alone.
fn variation_url(ctx: &SerializeContext<'_>, url: &str) -> String {
    let variation = &ctx.options.variation;
    let base = ctx.options.base_url.trim_end_matches('/');
    if variation != "default" && !base.is_empty() && url.starts_with(base) {
        format!("{url}?variation={variation}")
    } else {
        url.to_string()
    }
}

fn file_index_entries(ctx: &SerializeContext<'_>, files: &[NamedFile]) -> Vec<IndexEntry> {
    files
        .iter()
        .map(|named| IndexEntry {
            url: variation_url(ctx, &named.file.url),
            name: named.archive_name.clone(),
            checksum: Some(named.file.checksum.clone()),
        })
        .collect()
}

fn file_entry(named: &NamedFile, fallback_mtime: DateTime<Utc>) -> TarEntry {
    TarEntry::storage(
        named.archive_name.clone(),
        named.file.handle.name.clone(),
        named.file.last_modified.unwrap_or(fallback_mtime),
    )
}

/// Build the archive of a single page.
pub fn build_page_archive(
    page: &Page,
    ctx: &SerializeContext<'_>,
    registry: &SerializerRegistry,
    remapper: &dyn OutletRemap,
    build_url: BuildUrl,
) -> Result<TarArchive> {
    let serialized = serialize_page(page, ctx, registry, remapper)?;
    let content = serde_json::to_vec(&serialized.data)?;
    let mtime = page.last_published.unwrap_or_else(Utc::now);

    let mut index = vec![IndexEntry {
        url: build_url(ctx, page),
        name: format!("pages/{}.json", page.slug),
        checksum: None,
    }];

    let collected = collect_page_files(&page.slug, &serialized.attached_files);
    let named = assign_archive_names(collected);
    index.extend(file_index_entries(ctx, &named));

    let named = dedup_files(named);
    let index = dedup_index(index);

    let mut archive = TarArchive::new().tolerate_missing(ctx.allow_missing_files());
    archive.add(TarEntry::data(
        "index.json",
        serde_json::to_vec(&index)?,
        mtime,
    ));
    archive.add(TarEntry::directory("pages", mtime));
    archive.add(TarEntry::data(
        format!("pages/{}.json", page.slug),
        content,
        mtime,
    ));
    if !named.is_empty() {
        archive.add(TarEntry::directory(format!("pages/{}", page.slug), mtime));
    }
    for file in &named {
        archive.add(file_entry(file, mtime));
    }

    info!(page = %page.slug, entries = archive.len(), "page archive assembled");
    Ok(archive)
}

/// Build the archive of a page collection.
///
/// Every page contributes a manifest entry; only pages listed in
/// `updated` are serialized and shipped with their files. Consumers keep
/// their cached copies of the rest.
pub fn build_collection_archive(
    pages: &[Page],
    updated: &[&str],
    ctx: &SerializeContext<'_>,
    registry: &SerializerRegistry,
    remapper: &dyn OutletRemap,
    build_url: BuildUrl,
) -> Result<TarArchive> {
    let mut index = Vec::new();
    let mut documents: Vec<(String, Vec<u8>, DateTime<Utc>)> = Vec::new();
    let mut collected: Vec<CollectedFile> = Vec::new();

    for page in pages {
        index.push(IndexEntry {
            url: build_url(ctx, page),
            name: format!("pages/{}.json", page.slug),
            checksum: None,
        });
        if !updated.contains(&page.slug.as_str()) {
            continue;
        }
        let serialized = serialize_page(page, ctx, registry, remapper)?;
        documents.push((
            page.slug.clone(),
            serde_json::to_vec(&serialized.data)?,
            page.last_published.unwrap_or_else(Utc::now),
        ));
        collected.extend(collect_page_files(&page.slug, &serialized.attached_files));
    }

    let named = assign_archive_names(collected);
    index.extend(file_index_entries(ctx, &named));

    let named = dedup_files(named);
    let index = dedup_index(index);

    let top_mtime = pages
        .iter()
        .filter_map(|page| page.last_published)
        .max()
        .unwrap_or_else(Utc::now);

    let mut archive = TarArchive::new().tolerate_missing(ctx.allow_missing_files());
    archive.add(TarEntry::data(
        "index.json",
        serde_json::to_vec(&index)?,
        top_mtime,
    ));
    archive.add(TarEntry::directory("pages", top_mtime));

    for (slug, json, mtime) in &documents {
        archive.add(TarEntry::data(format!("pages/{slug}.json"), json.clone(), *mtime));
        let page_dir = format!("pages/{slug}");
        let dir_used = named
            .iter()
            .any(|file| file.archive_name.starts_with(&format!("{page_dir}/")));
        if dir_used {
            archive.add(TarEntry::directory(page_dir, *mtime));
        }
    }
    for file in &named {
        archive.add(file_entry(file, top_mtime));
    }

    info!(
        pages = pages.len(),
        updated = documents.len(),
        entries = archive.len(),
        "collection archive assembled"
    );
    Ok(archive)
}
