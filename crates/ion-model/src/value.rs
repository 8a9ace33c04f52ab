//! Content value model for ION serialization.
//!
//! CMS content is materialized into a closed set of tagged variants before
//! serialization. Every variant maps to exactly one ION content type in the
//! output tree (`textcontent`, `flagcontent`, `containercontent`, ...);
//! the serializer registry dispatches on [`ValueKind`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::file::FileHandle;

/// A single piece of CMS content.
///
/// The variants mirror what a content editor can put into a page: scalar
/// fields, rich text, nested block structures and file-backed media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent content. Always omitted from serialized output.
    Null,
    /// Boolean flag.
    Flag(bool),
    /// Numeric content. JSON only has 64-bit floats, so integers beyond
    /// 2^53 - 1 lose precision before they ever reach this variant.
    Number(f64),
    /// Plain text. May still turn out to be HTML; the text serializer
    /// runs a markup heuristic on it.
    Text(String),
    /// Rich text straight from the CMS editor. Always treated as HTML.
    RichText(String),
    /// Calendar date without a time of day. Serialized as midnight UTC.
    Date(NaiveDate),
    /// Timestamp. Normalized to UTC on output.
    DateTime(DateTime<Utc>),
    /// Ordered homogeneously-named list of arbitrary content.
    List(Vec<Value>),
    /// Named key/value block. Keys stay unique, children keep their key
    /// as outlet name.
    Struct(Vec<(String, Value)>),
    /// Stream of heterogeneous blocks, each carrying its block-type name.
    Stream(Vec<StreamItem>),
    /// Tabular content.
    Table(TableValue),
    /// Downloadable document.
    Document(DocumentContent),
    /// Image with an optional pre-generated archive rendition.
    Image(ImageContent),
    /// Audio or video media object.
    Media(MediaContent),
    /// Link to another page.
    PageLink(PageLink),
}

impl Value {
    /// The dispatch kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Flag(_) => ValueKind::Flag,
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::RichText(_) => ValueKind::RichText,
            Value::Date(_) => ValueKind::Date,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::List(_) => ValueKind::List,
            Value::Struct(_) => ValueKind::Struct,
            Value::Stream(_) => ValueKind::Stream,
            Value::Table(_) => ValueKind::Table,
            Value::Document(_) => ValueKind::Document,
            Value::Image(_) => ValueKind::Image,
            Value::Media(_) => ValueKind::Media,
            Value::PageLink(_) => ValueKind::PageLink,
        }
    }

    /// Convenience constructor for plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    /// Convenience constructor for numeric content.
    pub fn number(value: impl Into<f64>) -> Self {
        Value::Number(value.into())
    }
}

/// Discriminant used for serializer dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Flag,
    Number,
    Text,
    RichText,
    Date,
    DateTime,
    List,
    Struct,
    Stream,
    Table,
    Document,
    Image,
    Media,
    PageLink,
}

/// One block inside a stream field: block-type name plus content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamItem {
    /// Block type name, becomes the child outlet name.
    pub block_type: String,
    pub value: Value,
}

/// Tabular content with header flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableValue {
    pub first_row_is_header: bool,
    pub first_col_is_header: bool,
    /// Row-major cell data.
    pub cells: Vec<Vec<String>>,
}

/// A downloadable document attached to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub title: String,
    pub file: FileHandle,
    /// Whether this document should be pulled into exported archives.
    #[serde(default)]
    pub include_in_archive: bool,
}

/// An image with declared pixel dimensions.
///
/// The CMS pre-generates a fixed-quality "archive rendition" for bulk
/// export; serialization always prefers it over the original when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub title: String,
    pub file: FileHandle,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub archive_rendition: Option<ImageRendition>,
    #[serde(default)]
    pub include_in_archive: bool,
}

impl ImageContent {
    /// The rendition used for archive export, falling back to the original.
    pub fn export_rendition(&self) -> ImageRendition {
        self.archive_rendition.clone().unwrap_or(ImageRendition {
            file: self.file.clone(),
            width: self.width,
            height: self.height,
        })
    }
}

/// A pre-generated derivative of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRendition {
    pub file: FileHandle,
    pub width: u32,
    pub height: u32,
}

/// Audio/video media object with optional transcoded renditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    pub title: String,
    pub kind: MediaKind,
    pub file: FileHandle,
    /// Duration in seconds.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Poster/thumbnail image for video media.
    #[serde(default)]
    pub thumbnail: Option<FileHandle>,
    /// Transcoded renditions, in transcode order.
    #[serde(default)]
    pub renditions: Vec<MediaRendition>,
    #[serde(default)]
    pub include_in_archive: bool,
}

impl MediaContent {
    /// The first successfully transcoded rendition matching `name`, or the
    /// raw source if no transcode finished yet.
    pub fn export_rendition(&self, name: &str) -> MediaRenditionRef<'_> {
        self.renditions
            .iter()
            .find(|r| r.name == name && r.transcode_finished)
            .map(|r| MediaRenditionRef {
                file: &r.file,
                width: r.width,
                height: r.height,
            })
            .unwrap_or(MediaRenditionRef {
                file: &self.file,
                width: self.width,
                height: self.height,
            })
    }
}

/// Media category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

/// A transcoded derivative of a media object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRendition {
    /// Configured rendition name (e.g. the transcode preset).
    pub name: String,
    pub file: FileHandle,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub transcode_finished: bool,
}

/// Borrowed view of the rendition selected for export.
#[derive(Debug, Clone, Copy)]
pub struct MediaRenditionRef<'a> {
    pub file: &'a FileHandle,
    pub width: u32,
    pub height: u32,
}

/// Link to another page, addressed by collection and slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLink {
    pub collection: String,
    pub slug: String,
}

impl PageLink {
    /// The connection string rendered into `connectioncontent` nodes.
    pub fn connection_string(&self) -> String {
        format!("//{}/{}", self.collection, self.slug)
    }
}
