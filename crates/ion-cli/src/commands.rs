//! Command implementations for the ION exporter.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use ion_archive::{build_collection_archive, build_page_archive, default_build_url};
use ion_model::{LocalStorage, Page, SerializeOptions};
use ion_serializer::{IdentityRemap, SerializeContext, SerializerRegistry, serialize_page};
use serde::Deserialize;
use tracing::info;

use crate::cli::{ArchiveArgs, CommonArgs, InspectArgs};

/// Content manifest: the page set to export plus storage defaults.
#[derive(Debug, Deserialize)]
pub struct ContentManifest {
    #[serde(default)]
    pub base_url: String,
    /// Storage root, relative paths resolved against the manifest location.
    #[serde(default)]
    pub storage_root: Option<PathBuf>,
    pub pages: Vec<Page>,
}

impl ContentManifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open manifest {}", path.display()))?;
        serde_json::from_reader(file)
            .with_context(|| format!("failed to parse manifest {}", path.display()))
    }
}

struct ExportSetup {
    manifest: ContentManifest,
    options: SerializeOptions,
    storage: LocalStorage,
}

fn setup(common: &CommonArgs) -> anyhow::Result<ExportSetup> {
    let manifest = ContentManifest::load(&common.manifest)?;

    let base_url = common
        .base_url
        .clone()
        .unwrap_or_else(|| manifest.base_url.clone());
    let options = SerializeOptions::new()
        .with_base_url(base_url)
        .with_variation(common.variation.clone())
        .with_allow_missing_files(common.allow_missing_files);

    let manifest_dir = common
        .manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let storage_root = common
        .storage_root
        .clone()
        .or_else(|| {
            manifest
                .storage_root
                .as_ref()
                .map(|root| manifest_dir.join(root))
        })
        .unwrap_or(manifest_dir);

    Ok(ExportSetup {
        manifest,
        options,
        storage: LocalStorage::new(storage_root),
    })
}

fn find_page<'a>(pages: &'a [Page], slug: &str) -> anyhow::Result<&'a Page> {
    pages
        .iter()
        .find(|page| page.slug == slug)
        .with_context(|| format!("page {slug:?} not found in manifest"))
}

/// Build a tar archive from the manifest. Returns the output path.
pub fn run_archive(args: &ArchiveArgs) -> anyhow::Result<PathBuf> {
    let ExportSetup {
        manifest,
        options,
        storage,
    } = setup(&args.common)?;
    if manifest.pages.is_empty() {
        bail!("manifest contains no pages");
    }
    let ctx = SerializeContext::new(&options, &storage);
    let registry = SerializerRegistry::global();

    let mut archive = if let Some(slug) = &args.page {
        let page = find_page(&manifest.pages, slug)?;
        build_page_archive(page, &ctx, registry, &IdentityRemap, default_build_url)?
    } else {
        let updated: Vec<&str> = if args.updated.is_empty() {
            manifest.pages.iter().map(|page| page.slug.as_str()).collect()
        } else {
            args.updated.iter().map(String::as_str).collect()
        };
        build_collection_archive(
            &manifest.pages,
            &updated,
            &ctx,
            registry,
            &IdentityRemap,
            default_build_url,
        )?
    };

    archive
        .prepare(&storage)
        .context("failed to prepare archive entries")?;
    let total = archive.total_size()?;

    let output = args.output.clone().unwrap_or_else(|| {
        args.common.manifest.with_extension("tar")
    });
    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    archive
        .write_to(&mut writer)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(output = %output.display(), bytes = total, "archive written");
    Ok(output)
}

/// Serialize one page and return its JSON document as a string.
pub fn run_inspect(args: &InspectArgs) -> anyhow::Result<String> {
    let ExportSetup {
        manifest,
        options,
        storage,
    } = setup(&args.common)?;
    let ctx = SerializeContext::new(&options, &storage);
    let registry = SerializerRegistry::global();

    let page = find_page(&manifest.pages, &args.slug)?;
    let serialized = serialize_page(page, &ctx, registry, &IdentityRemap)?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&serialized.data)?
    } else {
        serde_json::to_string(&serialized.data)?
    };
    Ok(rendered)
}
