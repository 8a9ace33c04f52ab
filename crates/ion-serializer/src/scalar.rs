//! Leaf serializers for scalar content: flags, numbers, text, dates,
//! tables, page links and absent values.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use ion_model::{PageLink, TableValue};
use regex::Regex;
use serde_json::{Number, Value as Json};

use crate::context::SerializeContext;
use crate::error::Result;
use crate::node::{IonSerializer, base_node};

/// Serializes `Flag` values as `flagcontent`.
///
/// Booleans always win over the generic number serializer; a flag must
/// never render as `numbercontent`.
pub struct FlagSerializer {
    name: String,
    index: Option<u64>,
    data: bool,
}

impl FlagSerializer {
    pub fn new(name: impl Into<String>, data: bool) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
        }
    }
}

impl IonSerializer for FlagSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("flagcontent"));
        node.insert("is_enabled".to_string(), Json::Bool(self.data));
        Ok(Some(Json::Object(node)))
    }
}

/// Serializes numeric values as `numbercontent`.
///
/// JSON carries 64-bit floats only; non-finite values have no JSON
/// representation and render as `null`.
pub struct NumberSerializer {
    name: String,
    index: Option<u64>,
    data: f64,
}

impl NumberSerializer {
    pub fn new(name: impl Into<String>, data: f64) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
        }
    }
}

impl IonSerializer for NumberSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("numbercontent"));
        let value = Number::from_f64(self.data)
            .map(Json::Number)
            .unwrap_or(Json::Null);
        node.insert("value".to_string(), value);
        Ok(Some(Json::Object(node)))
    }
}

// All empty paragraphs filled only with whitespace or <br> tags.
static EMPTY_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p>\s*(<br\s*/?>\s*)*</p>").expect("empty paragraph pattern"));
// All list items that end with a <br> tag before the closing </li>.
static TRAILING_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<br\s*/?>\s*</li>").expect("trailing break pattern"));
// At least one markup element.
static HTML_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*[a-zA-Z][^>]*>").expect("element pattern"));

/// Strip empty paragraphs and trailing line breaks from HTML content.
pub fn clean_html(content: &str) -> String {
    let content = EMPTY_PARAGRAPH.replace_all(content, "");
    let content = TRAILING_BREAK.replace_all(&content, "</li>");
    content.trim().to_string()
}

/// Markup heuristic: text counts as HTML if it contains an element.
pub fn looks_like_html(content: &str) -> bool {
    HTML_ELEMENT.is_match(content)
}

/// Serializes text as `textcontent`.
///
/// Rich text is always HTML; plain text goes through the markup
/// heuristic. HTML gets cleaned up, plain text trimmed. Text that ends
/// up empty is omitted from the output.
pub struct TextSerializer {
    name: String,
    index: Option<u64>,
    text: String,
    is_html: bool,
}

impl TextSerializer {
    pub fn new(name: impl Into<String>, data: &str) -> Self {
        let is_html = looks_like_html(data);
        Self::build(name.into(), data, is_html)
    }

    /// Rich text from the CMS editor skips the heuristic.
    pub fn rich(name: impl Into<String>, data: &str) -> Self {
        Self::build(name.into(), data, true)
    }

    fn build(name: String, data: &str, is_html: bool) -> Self {
        let text = if is_html {
            clean_html(data)
        } else {
            data.trim().to_string()
        };
        Self {
            name,
            index: None,
            text,
            is_html,
        }
    }
}

impl IonSerializer for TextSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        if self.text.is_empty() {
            return Ok(None);
        }
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("textcontent"));
        node.insert("is_multiline".to_string(), Json::Bool(self.is_html));
        node.insert(
            "mime_type".to_string(),
            Json::from(if self.is_html {
                "text/html"
            } else {
                "text/plain"
            }),
        );
        node.insert("text".to_string(), Json::from(self.text.clone()));
        Ok(Some(Json::Object(node)))
    }
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SSZ` (seconds precision, UTC).
pub fn iso_date(datetime: DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Serializes dates and timestamps as `datetimecontent`.
pub struct DateTimeSerializer {
    name: String,
    index: Option<u64>,
    data: DateTime<Utc>,
}

impl DateTimeSerializer {
    pub fn new(name: impl Into<String>, data: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
        }
    }

    /// A date without a time of day is treated as midnight UTC.
    pub fn from_date(name: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(name, date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
    }
}

impl IonSerializer for DateTimeSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("datetimecontent"));
        node.insert("datetime".to_string(), Json::from(iso_date(self.data)));
        Ok(Some(Json::Object(node)))
    }
}

/// Serializes absent content by omitting it.
///
/// Registering another serializer for `Null` overrides this behavior.
pub struct NullSerializer;

impl IonSerializer for NullSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        Ok(None)
    }
}

/// Serializes tabular content as `tablecontent`.
pub struct TableSerializer {
    name: String,
    index: Option<u64>,
    data: TableValue,
}

impl TableSerializer {
    pub fn new(name: impl Into<String>, data: TableValue) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
        }
    }
}

impl IonSerializer for TableSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("tablecontent"));
        node.insert(
            "cells".to_string(),
            serde_json::to_value(&self.data.cells).unwrap_or(Json::Null),
        );
        node.insert(
            "first_row_header".to_string(),
            Json::Bool(self.data.first_row_is_header),
        );
        node.insert(
            "first_col_header".to_string(),
            Json::Bool(self.data.first_col_is_header),
        );
        Ok(Some(Json::Object(node)))
    }
}

/// Serializes page links as `connectioncontent`.
pub struct PageLinkSerializer {
    name: String,
    index: Option<u64>,
    data: PageLink,
}

impl PageLinkSerializer {
    pub fn new(name: impl Into<String>, data: PageLink) -> Self {
        Self {
            name: name.into(),
            index: None,
            data,
        }
    }
}

impl IonSerializer for PageLinkSerializer {
    fn serialize(&mut self, _ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("connectioncontent"));
        node.insert(
            "connection_string".to_string(),
            Json::from(self.data.connection_string()),
        );
        Ok(Some(Json::Object(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ion_model::{LocalStorage, SerializeOptions};

    fn with_ctx<T>(f: impl FnOnce(&SerializeContext<'_>) -> T) -> T {
        let options = SerializeOptions::default();
        let storage = LocalStorage::new(std::env::temp_dir());
        let ctx = SerializeContext::new(&options, &storage);
        f(&ctx)
    }

    #[test]
    fn flag_serializes_as_flagcontent() {
        with_ctx(|ctx| {
            let node = FlagSerializer::new("enabled", true)
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["type"], "flagcontent");
            assert_eq!(node["is_enabled"], true);
        });
    }

    #[test]
    fn number_serializes_as_numbercontent() {
        with_ctx(|ctx| {
            let node = NumberSerializer::new("count", 1.5)
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["type"], "numbercontent");
            assert_eq!(node["value"], 1.5);
        });
    }

    #[test]
    fn plain_text_is_single_line() {
        with_ctx(|ctx| {
            let node = TextSerializer::new("title", "  Hello  ")
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["type"], "textcontent");
            assert_eq!(node["text"], "Hello");
            assert_eq!(node["is_multiline"], false);
            assert_eq!(node["mime_type"], "text/plain");
        });
    }

    #[test]
    fn html_cleanup_strips_empty_paragraphs() {
        with_ctx(|ctx| {
            let node = TextSerializer::new("body", "<p><br></p><p>Hello</p>")
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["text"], "<p>Hello</p>");
            assert_eq!(node["is_multiline"], true);
            assert_eq!(node["mime_type"], "text/html");
        });
    }

    #[test]
    fn html_cleanup_strips_breaks_before_closing_list_items() {
        assert_eq!(
            clean_html("<ul><li>one<br></li><li>two<br/>  </li></ul>"),
            "<ul><li>one</li><li>two</li></ul>"
        );
    }

    #[test]
    fn empty_text_is_omitted() {
        with_ctx(|ctx| {
            assert!(
                TextSerializer::new("title", "   ")
                    .serialize(ctx)
                    .expect("serialize")
                    .is_none()
            );
            assert!(
                TextSerializer::rich("body", "<p> <br> </p>")
                    .serialize(ctx)
                    .expect("serialize")
                    .is_none()
            );
        });
    }

    #[test]
    fn datetime_renders_utc_seconds() {
        with_ctx(|ctx| {
            let stamp = DateTime::parse_from_rfc3339("2020-05-04T10:20:30.456+02:00")
                .expect("parse")
                .with_timezone(&Utc);
            let node = DateTimeSerializer::new("published", stamp)
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["type"], "datetimecontent");
            assert_eq!(node["datetime"], "2020-05-04T08:20:30Z");
        });
    }

    #[test]
    fn date_becomes_midnight_utc() {
        with_ctx(|ctx| {
            let date = NaiveDate::from_ymd_opt(2021, 12, 24).expect("date");
            let node = DateTimeSerializer::from_date("day", date)
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["datetime"], "2021-12-24T00:00:00Z");
        });
    }

    #[test]
    fn null_is_omitted() {
        with_ctx(|ctx| {
            assert!(NullSerializer.serialize(ctx).expect("serialize").is_none());
        });
    }

    #[test]
    fn table_serializes_cells_and_flags() {
        with_ctx(|ctx| {
            let table = TableValue {
                first_row_is_header: true,
                first_col_is_header: false,
                cells: vec![
                    vec!["h1".to_string(), "h2".to_string()],
                    vec!["a".to_string(), "b".to_string()],
                ],
            };
            let node = TableSerializer::new("grid", table)
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["type"], "tablecontent");
            assert_eq!(node["first_row_header"], true);
            assert_eq!(node["first_col_header"], false);
            assert_eq!(node["cells"][1][0], "a");
        });
    }

    #[test]
    fn page_link_serializes_connection_string() {
        with_ctx(|ctx| {
            let link = PageLink {
                collection: "manual".to_string(),
                slug: "intro".to_string(),
            };
            let node = PageLinkSerializer::new("next", link)
                .serialize(ctx)
                .expect("serialize")
                .expect("emitted");
            assert_eq!(node["type"], "connectioncontent");
            assert_eq!(node["connection_string"], "//manual/intro");
        });
    }
}
