//! File-backed serializers: documents, images and media.
//!
//! These render URLs plus integrity metadata resolved through the storage
//! backend, and advertise the underlying files for archive export via
//! [`AttachedFile`]. A file missing from storage either aborts the tree
//! build or, with `allow_missing_files` set, degrades to well-known
//! sentinel values and contributes nothing to the archive.

use ion_model::{DocumentContent, FileHandle, FileMeta, ImageContent, MediaContent, MediaKind};
use serde_json::Value as Json;
use tracing::warn;

use crate::container::ContainerSerializer;
use crate::context::SerializeContext;
use crate::error::{Result, SerializeError};
use crate::node::{AttachedFile, AttachedFileSlot, IonSerializer, base_node};

/// Sentinel URL for missing document/media files.
pub const FILE_MISSING: &str = "FILE_MISSING";
/// Sentinel URL for missing image files.
pub const IMAGE_MISSING: &str = "IMAGE_MISSING";
/// Sentinel checksum for missing files.
pub const CHECKSUM_MISSING: &str = "null:";
/// Sentinel mime type for missing files.
pub const MIME_MISSING: &str = "application/x-empty";

/// Resolve file metadata, applying the missing-file policy.
///
/// Returns `Ok(None)` when the file is missing and tolerance is on; the
/// caller substitutes sentinels. Without tolerance the error is fatal.
fn resolve_meta(
    ctx: &SerializeContext<'_>,
    handle: &FileHandle,
    what: &str,
) -> Result<Option<FileMeta>> {
    match ctx.file_meta(handle) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if ctx.allow_missing_files() => {
            warn!(file = %handle.name, kind = what, error = %err, "skipped missing file");
            Ok(None)
        }
        Err(err) => Err(SerializeError::missing_file(&handle.name, err)),
    }
}

fn attached(ctx: &SerializeContext<'_>, handle: &FileHandle, meta: &FileMeta) -> AttachedFile {
    AttachedFile {
        handle: handle.clone(),
        url: ctx.absolute_url(&handle.url),
        checksum: meta.checksum.clone(),
        size: meta.size,
        last_modified: meta.last_modified,
    }
}

/// Serializes documents as `filecontent`.
pub struct DocumentSerializer {
    name: String,
    index: Option<u64>,
    data: DocumentContent,
    files: AttachedFileSlot,
}

impl DocumentSerializer {
    pub fn new(name: impl Into<String>, data: DocumentContent) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
            files: AttachedFileSlot::new(),
        }
    }
}

impl IonSerializer for DocumentSerializer {
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("filecontent"));
        node.insert("name".to_string(), Json::from(self.data.title.clone()));

        match resolve_meta(ctx, &self.data.file, "document")? {
            Some(meta) => {
                node.insert(
                    "file".to_string(),
                    Json::from(ctx.absolute_url(&self.data.file.url)),
                );
                node.insert("file_size".to_string(), Json::from(meta.size));
                node.insert("checksum".to_string(), Json::from(meta.checksum.clone()));
                node.insert("mime_type".to_string(), Json::from(meta.mime_type.clone()));
                if self.data.include_in_archive {
                    self.files.fill(vec![attached(ctx, &self.data.file, &meta)]);
                } else {
                    self.files.fill_empty();
                }
            }
            None => {
                node.insert("file".to_string(), Json::from(FILE_MISSING));
                node.insert("file_size".to_string(), Json::from(0));
                node.insert("checksum".to_string(), Json::from(CHECKSUM_MISSING));
                node.insert("mime_type".to_string(), Json::from(MIME_MISSING));
                self.files.fill_empty();
            }
        }
        Ok(Some(Json::Object(node)))
    }

    fn attached_files(&self) -> Result<&[AttachedFile]> {
        self.files.get()
    }
}

/// Serializes images as `imagecontent`.
///
/// The pre-generated archive rendition is always preferred; the original
/// file is reported alongside under `original_*` keys.
pub struct ImageSerializer {
    name: String,
    index: Option<u64>,
    data: ImageContent,
    files: AttachedFileSlot,
}

impl ImageSerializer {
    pub fn new(name: impl Into<String>, data: ImageContent) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
            files: AttachedFileSlot::new(),
        }
    }
}

impl IonSerializer for ImageSerializer {
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("imagecontent"));

        let rendition = self.data.export_rendition();
        let resolved = match resolve_meta(ctx, &rendition.file, "image rendition")? {
            Some(rendition_meta) => resolve_meta(ctx, &self.data.file, "image")?
                .map(|original_meta| (rendition_meta, original_meta)),
            None => None,
        };

        match resolved {
            Some((rendition_meta, original_meta)) => {
                node.insert(
                    "mime_type".to_string(),
                    Json::from(rendition_meta.mime_type.clone()),
                );
                node.insert(
                    "image".to_string(),
                    Json::from(ctx.absolute_url(&rendition.file.url)),
                );
                node.insert("file_size".to_string(), Json::from(rendition_meta.size));
                node.insert(
                    "checksum".to_string(),
                    Json::from(rendition_meta.checksum.clone()),
                );
                node.insert("width".to_string(), Json::from(rendition.width));
                node.insert("height".to_string(), Json::from(rendition.height));
                node.insert(
                    "original_image".to_string(),
                    Json::from(ctx.absolute_url(&self.data.file.url)),
                );
                node.insert(
                    "original_mime_type".to_string(),
                    Json::from(original_meta.mime_type),
                );
                node.insert(
                    "original_checksum".to_string(),
                    Json::from(original_meta.checksum),
                );
                node.insert("original_width".to_string(), Json::from(self.data.width));
                node.insert("original_height".to_string(), Json::from(self.data.height));
                node.insert(
                    "original_file_size".to_string(),
                    Json::from(original_meta.size),
                );
                if self.data.include_in_archive {
                    self.files
                        .fill(vec![attached(ctx, &rendition.file, &rendition_meta)]);
                } else {
                    self.files.fill_empty();
                }
            }
            None => {
                node.insert("mime_type".to_string(), Json::from(MIME_MISSING));
                node.insert("image".to_string(), Json::from(IMAGE_MISSING));
                node.insert("file_size".to_string(), Json::from(0));
                node.insert("checksum".to_string(), Json::from(CHECKSUM_MISSING));
                node.insert("width".to_string(), Json::from(0));
                node.insert("height".to_string(), Json::from(0));
                node.insert("original_image".to_string(), Json::from(IMAGE_MISSING));
                node.insert("original_mime_type".to_string(), Json::from(MIME_MISSING));
                node.insert(
                    "original_checksum".to_string(),
                    Json::from(CHECKSUM_MISSING),
                );
                node.insert("original_width".to_string(), Json::from(0));
                node.insert("original_height".to_string(), Json::from(0));
                node.insert("original_file_size".to_string(), Json::from(0));
                self.files.fill_empty();
            }
        }

        node.insert("translation_x".to_string(), Json::from(0));
        node.insert("translation_y".to_string(), Json::from(0));
        node.insert("scale".to_string(), Json::from(1.0));
        Ok(Some(Json::Object(node)))
    }

    fn attached_files(&self) -> Result<&[AttachedFile]> {
        self.files.get()
    }
}

/// Serializes media objects as a `media` sub-container.
///
/// Audio renders a single `mediacontent` child; video renders a
/// `mediacontent` child plus an `imagecontent` thumbnail child.
pub struct MediaSerializer {
    inner: Vec<Box<dyn IonSerializer>>,
}

impl MediaSerializer {
    pub fn new(name: impl Into<String>, data: MediaContent) -> Self {
        let name = name.into();
        let mut container =
            ContainerSerializer::with_subtype(format!("mediacontainer_{name}"), "media");
        match data.kind {
            MediaKind::Audio => {
                container.push_child(Box::new(MediaTrackSerializer::audio("audio", data)));
            }
            MediaKind::Video => {
                let thumbnail = data.thumbnail.clone().map(|handle| {
                    MediaThumbnailSerializer::new("video_thumbnail", data.clone(), handle)
                });
                container.push_child(Box::new(MediaTrackSerializer::video("video", data)));
                if let Some(thumbnail) = thumbnail {
                    container.push_child(Box::new(thumbnail));
                }
            }
        }
        Self {
            inner: vec![Box::new(container)],
        }
    }
}

impl IonSerializer for MediaSerializer {
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        match self.inner.first_mut() {
            Some(container) => container.serialize(ctx),
            None => Ok(None),
        }
    }

    fn children(&self) -> &[Box<dyn IonSerializer>] {
        &self.inner
    }
}

/// Renders the audio/video track of a media object as `mediacontent`.
struct MediaTrackSerializer {
    name: String,
    data: MediaContent,
    with_dimensions: bool,
    files: AttachedFileSlot,
}

impl MediaTrackSerializer {
    fn audio(name: impl Into<String>, data: MediaContent) -> Self {
        Self {
            name: name.into(),
            data,
            with_dimensions: false,
            files: AttachedFileSlot::new(),
        }
    }

    fn video(name: impl Into<String>, data: MediaContent) -> Self {
        Self {
            name: name.into(),
            data,
            with_dimensions: true,
            files: AttachedFileSlot::new(),
        }
    }
}

impl IonSerializer for MediaTrackSerializer {
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let rendition = self.data.export_rendition(&ctx.options.media_rendition);
        let rendition_file = rendition.file.clone();
        let rendition_width = rendition.width;
        let rendition_height = rendition.height;

        let mut node = base_node(&self.name, None);
        node.insert("type".to_string(), Json::from("mediacontent"));
        node.insert("name".to_string(), Json::from(self.data.title.clone()));
        node.insert("length".to_string(), Json::from(self.data.duration));
        node.insert("original_length".to_string(), Json::from(self.data.duration));

        let resolved = match resolve_meta(ctx, &rendition_file, "media rendition")? {
            Some(rendition_meta) => resolve_meta(ctx, &self.data.file, "media")?
                .map(|original_meta| (rendition_meta, original_meta)),
            None => None,
        };

        match resolved {
            Some((rendition_meta, original_meta)) => {
                node.insert(
                    "mime_type".to_string(),
                    Json::from(rendition_meta.mime_type.clone()),
                );
                node.insert(
                    "file".to_string(),
                    Json::from(ctx.absolute_url(&rendition_file.url)),
                );
                node.insert(
                    "checksum".to_string(),
                    Json::from(rendition_meta.checksum.clone()),
                );
                node.insert("file_size".to_string(), Json::from(rendition_meta.size));
                node.insert(
                    "original_mime_type".to_string(),
                    Json::from(original_meta.mime_type),
                );
                node.insert(
                    "original_file".to_string(),
                    Json::from(ctx.absolute_url(&self.data.file.url)),
                );
                node.insert(
                    "original_checksum".to_string(),
                    Json::from(original_meta.checksum),
                );
                node.insert(
                    "original_file_size".to_string(),
                    Json::from(original_meta.size),
                );
                if self.with_dimensions {
                    node.insert("width".to_string(), Json::from(rendition_width));
                    node.insert("height".to_string(), Json::from(rendition_height));
                    node.insert("original_width".to_string(), Json::from(self.data.width));
                    node.insert("original_height".to_string(), Json::from(self.data.height));
                }
                if self.data.include_in_archive {
                    self.files
                        .fill(vec![attached(ctx, &rendition_file, &rendition_meta)]);
                } else {
                    self.files.fill_empty();
                }
            }
            None => {
                node.insert("mime_type".to_string(), Json::from(MIME_MISSING));
                node.insert("file".to_string(), Json::from(FILE_MISSING));
                node.insert("checksum".to_string(), Json::from(CHECKSUM_MISSING));
                node.insert("file_size".to_string(), Json::from(0));
                node.insert("original_mime_type".to_string(), Json::from(MIME_MISSING));
                node.insert("original_file".to_string(), Json::from(FILE_MISSING));
                node.insert(
                    "original_checksum".to_string(),
                    Json::from(CHECKSUM_MISSING),
                );
                node.insert("original_file_size".to_string(), Json::from(0));
                if self.with_dimensions {
                    node.insert("width".to_string(), Json::from(0));
                    node.insert("height".to_string(), Json::from(0));
                    node.insert("original_width".to_string(), Json::from(0));
                    node.insert("original_height".to_string(), Json::from(0));
                }
                self.files.fill_empty();
            }
        }
        Ok(Some(Json::Object(node)))
    }

    fn attached_files(&self) -> Result<&[AttachedFile]> {
        self.files.get()
    }
}

/// Renders a video poster image as `imagecontent`.
struct MediaThumbnailSerializer {
    name: String,
    data: MediaContent,
    thumbnail: FileHandle,
    files: AttachedFileSlot,
}

impl MediaThumbnailSerializer {
    fn new(name: impl Into<String>, data: MediaContent, thumbnail: FileHandle) -> Self {
        Self {
            name: name.into(),
            data,
            thumbnail,
            files: AttachedFileSlot::new(),
        }
    }
}

impl IonSerializer for MediaThumbnailSerializer {
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, None);
        node.insert("type".to_string(), Json::from("imagecontent"));

        match resolve_meta(ctx, &self.thumbnail, "media thumbnail")? {
            Some(meta) => {
                node.insert("mime_type".to_string(), Json::from(meta.mime_type.clone()));
                node.insert(
                    "image".to_string(),
                    Json::from(ctx.absolute_url(&self.thumbnail.url)),
                );
                node.insert("checksum".to_string(), Json::from(meta.checksum.clone()));
                node.insert("file_size".to_string(), Json::from(meta.size));
                node.insert("width".to_string(), Json::from(self.data.width));
                node.insert("height".to_string(), Json::from(self.data.height));
                node.insert(
                    "original_image".to_string(),
                    Json::from(ctx.absolute_url(&self.thumbnail.url)),
                );
                node.insert(
                    "original_mime_type".to_string(),
                    Json::from(meta.mime_type.clone()),
                );
                node.insert(
                    "original_checksum".to_string(),
                    Json::from(meta.checksum.clone()),
                );
                node.insert("original_width".to_string(), Json::from(self.data.width));
                node.insert("original_height".to_string(), Json::from(self.data.height));
                node.insert("original_file_size".to_string(), Json::from(meta.size));
                if self.data.include_in_archive {
                    self.files.fill(vec![attached(ctx, &self.thumbnail, &meta)]);
                } else {
                    self.files.fill_empty();
                }
            }
            None => {
                node.insert("mime_type".to_string(), Json::from(MIME_MISSING));
                node.insert("image".to_string(), Json::from(IMAGE_MISSING));
                node.insert("checksum".to_string(), Json::from(CHECKSUM_MISSING));
                node.insert("file_size".to_string(), Json::from(0));
                node.insert("width".to_string(), Json::from(0));
                node.insert("height".to_string(), Json::from(0));
                node.insert("original_image".to_string(), Json::from(IMAGE_MISSING));
                node.insert("original_mime_type".to_string(), Json::from(MIME_MISSING));
                node.insert(
                    "original_checksum".to_string(),
                    Json::from(CHECKSUM_MISSING),
                );
                node.insert("original_width".to_string(), Json::from(0));
                node.insert("original_height".to_string(), Json::from(0));
                node.insert("original_file_size".to_string(), Json::from(0));
                self.files.fill_empty();
            }
        }

        node.insert("translation_x".to_string(), Json::from(0));
        node.insert("translation_y".to_string(), Json::from(0));
        node.insert("scale".to_string(), Json::from(1.0));
        Ok(Some(Json::Object(node)))
    }

    fn attached_files(&self) -> Result<&[AttachedFile]> {
        self.files.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::collect_attached_files;
    use ion_model::{ImageRendition, LocalStorage, SerializeOptions};
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: LocalStorage,
        options: SerializeOptions,
    }

    fn fixture(allow_missing: bool) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("manual.pdf"), b"pdf bytes").expect("write");
        fs::write(dir.path().join("hero.archive.jpg"), b"rendition").expect("write");
        fs::write(dir.path().join("hero.png"), b"original").expect("write");
        let storage = LocalStorage::new(dir.path());
        let options = SerializeOptions::new()
            .with_base_url("https://cms.example.com")
            .with_allow_missing_files(allow_missing);
        Fixture {
            _dir: dir,
            storage,
            options,
        }
    }

    fn document() -> DocumentContent {
        DocumentContent {
            title: "Manual".to_string(),
            file: FileHandle::new("manual.pdf", "/media/manual.pdf"),
            include_in_archive: true,
        }
    }

    fn image(rendition_name: &str) -> ImageContent {
        ImageContent {
            title: "Hero".to_string(),
            file: FileHandle::new("hero.png", "/media/hero.png"),
            width: 2000,
            height: 1000,
            archive_rendition: Some(ImageRendition {
                file: FileHandle::new(rendition_name, format!("/media/{rendition_name}")),
                width: 1024,
                height: 512,
            }),
            include_in_archive: true,
        }
    }

    #[test]
    fn document_serializes_with_metadata() {
        let fx = fixture(false);
        let ctx = SerializeContext::new(&fx.options, &fx.storage);
        let mut serializer = DocumentSerializer::new("download", document());
        let node = serializer.serialize(&ctx).expect("serialize").expect("some");

        assert_eq!(node["type"], "filecontent");
        assert_eq!(node["name"], "Manual");
        assert_eq!(node["file"], "https://cms.example.com/media/manual.pdf");
        assert_eq!(node["file_size"], 9);
        assert_eq!(node["mime_type"], "application/pdf");
        let files = serializer.attached_files().expect("attached");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].url, "https://cms.example.com/media/manual.pdf");
    }

    #[test]
    fn attached_files_before_serialize_is_an_error() {
        let serializer = DocumentSerializer::new("download", document());
        assert!(matches!(
            serializer.attached_files(),
            Err(SerializeError::AttachedFilesNotReady)
        ));
    }

    #[test]
    fn document_not_marked_for_archive_contributes_nothing() {
        let fx = fixture(false);
        let ctx = SerializeContext::new(&fx.options, &fx.storage);
        let mut content = document();
        content.include_in_archive = false;
        let mut serializer = DocumentSerializer::new("download", content);
        serializer.serialize(&ctx).expect("serialize");
        assert!(serializer.attached_files().expect("attached").is_empty());
    }

    #[test]
    fn image_prefers_archive_rendition() {
        let fx = fixture(false);
        let ctx = SerializeContext::new(&fx.options, &fx.storage);
        let mut serializer = ImageSerializer::new("hero", image("hero.archive.jpg"));
        let node = serializer.serialize(&ctx).expect("serialize").expect("some");

        assert_eq!(node["type"], "imagecontent");
        assert_eq!(node["image"], "https://cms.example.com/media/hero.archive.jpg");
        assert_eq!(node["original_image"], "https://cms.example.com/media/hero.png");
        assert_eq!(node["width"], 1024);
        assert_eq!(node["original_width"], 2000);
        assert_eq!(node["scale"], 1.0);
        let files = serializer.attached_files().expect("attached");
        assert_eq!(files[0].handle.name, "hero.archive.jpg");
    }

    #[test]
    fn missing_image_degrades_with_tolerance() {
        let fx = fixture(true);
        let ctx = SerializeContext::new(&fx.options, &fx.storage);
        let mut serializer = ImageSerializer::new("hero", image("gone.jpg"));
        let node = serializer.serialize(&ctx).expect("serialize").expect("some");

        assert_eq!(node["image"], IMAGE_MISSING);
        assert_eq!(node["file_size"], 0);
        assert_eq!(node["checksum"], CHECKSUM_MISSING);
        assert_eq!(node["mime_type"], MIME_MISSING);
        assert_eq!(node["width"], 0);
        assert!(serializer.attached_files().expect("attached").is_empty());
    }

    #[test]
    fn missing_image_fails_without_tolerance() {
        let fx = fixture(false);
        let ctx = SerializeContext::new(&fx.options, &fx.storage);
        let mut serializer = ImageSerializer::new("hero", image("gone.jpg"));
        assert!(matches!(
            serializer.serialize(&ctx),
            Err(SerializeError::MissingFile { .. })
        ));
    }

    #[test]
    fn video_media_wraps_track_and_thumbnail() {
        let fx = fixture(false);
        fs::write(fx.storage.root().join("clip.mp4"), b"video bytes").expect("write");
        fs::write(fx.storage.root().join("clip.jpg"), b"poster").expect("write");
        let ctx = SerializeContext::new(&fx.options, &fx.storage);

        let media = MediaContent {
            title: "Clip".to_string(),
            kind: MediaKind::Video,
            file: FileHandle::new("clip.mp4", "/media/clip.mp4"),
            duration: 42.5,
            width: 1920,
            height: 1080,
            thumbnail: Some(FileHandle::new("clip.jpg", "/media/clip.jpg")),
            renditions: vec![],
            include_in_archive: true,
        };
        let mut serializer = MediaSerializer::new("movie", media);
        let node = serializer.serialize(&ctx).expect("serialize").expect("some");

        assert_eq!(node["type"], "containercontent");
        assert_eq!(node["subtype"], "media");
        assert_eq!(node["outlet"], "mediacontainer_movie");
        let children = node["children"].as_array().expect("children");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["type"], "mediacontent");
        assert_eq!(children[0]["length"], 42.5);
        assert_eq!(children[0]["width"], 1920);
        assert_eq!(children[1]["type"], "imagecontent");
        assert_eq!(children[1]["image"], "https://cms.example.com/media/clip.jpg");

        // track + thumbnail each contribute one file
        let files = collect_attached_files(&serializer).expect("collect");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn audio_media_has_single_track_without_dimensions() {
        let fx = fixture(false);
        fs::write(fx.storage.root().join("talk.mp3"), b"audio").expect("write");
        let ctx = SerializeContext::new(&fx.options, &fx.storage);

        let media = MediaContent {
            title: "Talk".to_string(),
            kind: MediaKind::Audio,
            file: FileHandle::new("talk.mp3", "/media/talk.mp3"),
            duration: 300.0,
            width: 0,
            height: 0,
            thumbnail: None,
            renditions: vec![],
            include_in_archive: false,
        };
        let mut serializer = MediaSerializer::new("episode", media);
        let node = serializer.serialize(&ctx).expect("serialize").expect("some");
        let children = node["children"].as_array().expect("children");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["outlet"], "audio");
        assert!(children[0].get("width").is_none());
        assert!(
            collect_attached_files(&serializer)
                .expect("collect")
                .is_empty()
        );
    }
}
