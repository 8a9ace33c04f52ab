//! Page serialization: walks a page's content panels and extra fields
//! through the registry and renders the full page detail document.

use chrono::NaiveDate;
use ion_model::{Page, Value};
use serde_json::{Map, Value as Json, json};

use crate::container::ContainerSerializer;
use crate::context::SerializeContext;
use crate::error::Result;
use crate::node::{AttachedFile, IonSerializer, collect_attached_files};
use crate::registry::SerializerRegistry;
use crate::scalar::iso_date;

/// Remaps outlet names after serialization.
///
/// The remapper receives the full ancestor outlet path including the
/// node's own name as last element. This exists so deployments can rename
/// outlets that collide with reserved words in a consuming app.
pub trait OutletRemap {
    fn remap(&self, path: &[&str]) -> String;
}

/// Default remapper: keeps every outlet name unaltered.
pub struct IdentityRemap;

impl OutletRemap for IdentityRemap {
    fn remap(&self, path: &[&str]) -> String {
        path.last().map(ToString::to_string).unwrap_or_default()
    }
}

/// Recursively remap outlet names in a serialized tree.
pub fn remap_outlet_names(node: &mut Json, remapper: &dyn OutletRemap) {
    let mut path = Vec::new();
    remap_recursive(node, remapper, &mut path);
}

fn remap_recursive(node: &mut Json, remapper: &dyn OutletRemap, path: &mut Vec<String>) {
    let Json::Object(map) = node else {
        return;
    };
    let Some(Json::String(outlet)) = map.get("outlet") else {
        return;
    };

    let mut full_path: Vec<&str> = path.iter().map(String::as_str).collect();
    full_path.push(outlet);
    let renamed = remapper.remap(&full_path);
    map.insert("outlet".to_string(), Json::String(renamed.clone()));

    let Some(Json::Array(children)) = map.get_mut("children") else {
        return;
    };
    path.push(renamed);
    for child in children {
        remap_recursive(child, remapper, path);
    }
    path.pop();
}

/// A fully serialized page: detail document plus the files its content
/// tree advertised for archival.
pub struct SerializedPage {
    pub data: Json,
    pub attached_files: Vec<AttachedFile>,
}

/// Serialize a page's content panels and extra fields into the top-level
/// content container, collecting attached files from the tree.
pub fn serialize_contents(
    page: &Page,
    ctx: &SerializeContext<'_>,
    registry: &SerializerRegistry,
) -> Result<(Json, Vec<AttachedFile>)> {
    let mut container = ContainerSerializer::new("container_0");
    for (outlet, value) in page.content_pairs()? {
        container.add_child(registry, &outlet, value)?;
    }
    let data = container
        .serialize(ctx)?
        .unwrap_or_else(|| json!({ "outlet": "container_0", "children": [] }));
    let files = collect_attached_files(&container)?;
    Ok((data, files))
}

/// Render the page's meta declarations as a flat object of scalars.
///
/// Dates are normalized to timestamps (midnight UTC) so every temporal
/// meta value reads the same; null and structured values are skipped.
pub fn serialize_meta(page: &Page) -> Result<Json> {
    let mut meta = Map::new();
    for (name, value) in page.meta_pairs()? {
        if let Some(rendered) = meta_scalar(value) {
            meta.insert(name, rendered);
        }
    }
    Ok(Json::Object(meta))
}

fn meta_scalar(value: &Value) -> Option<Json> {
    match value {
        Value::Flag(flag) => Some(Json::Bool(*flag)),
        Value::Number(number) => Some(Json::Number(serde_json::Number::from_f64(*number)?)),
        Value::Text(text) | Value::RichText(text) => Some(Json::from(text.clone())),
        Value::Date(date) => Some(Json::from(iso_date(midnight(*date)))),
        Value::DateTime(stamp) => Some(Json::from(iso_date(*stamp))),
        _ => None,
    }
}

fn midnight(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Serialize the full page detail document.
pub fn serialize_page(
    page: &Page,
    ctx: &SerializeContext<'_>,
    registry: &SerializerRegistry,
    remapper: &dyn OutletRemap,
) -> Result<SerializedPage> {
    let (mut contents, attached_files) = serialize_contents(page, ctx, registry)?;
    remap_outlet_names(&mut contents, remapper);

    let mut data = Map::new();
    data.insert("identifier".to_string(), Json::from(page.slug.clone()));
    data.insert(
        "parent".to_string(),
        page.parent.clone().map(Json::from).unwrap_or(Json::Null),
    );
    data.insert(
        "collection".to_string(),
        page.collection.clone().map(Json::from).unwrap_or(Json::Null),
    );
    data.insert(
        "last_changed".to_string(),
        page.last_published
            .map(|stamp| Json::from(iso_date(stamp)))
            .unwrap_or(Json::Null),
    );
    data.insert("archive".to_string(), Json::from(archive_url(page, ctx)));
    data.insert(
        "locale".to_string(),
        page.locale.clone().map(Json::from).unwrap_or(Json::Null),
    );
    data.insert("layout".to_string(), Json::from(page.layout.clone()));
    data.insert("meta".to_string(), serialize_meta(page)?);
    data.insert("contents".to_string(), Json::Array(vec![contents]));
    data.insert(
        "children".to_string(),
        Json::from(page.children.clone()),
    );

    Ok(SerializedPage {
        data: Json::Object(data),
        attached_files,
    })
}

/// Absolute URL of the page's archive endpoint.
pub fn archive_url(page: &Page, ctx: &SerializeContext<'_>) -> String {
    let locale = page.locale.as_deref().unwrap_or("default");
    let collection = page.collection.as_deref().unwrap_or("default");
    let url = ctx.absolute_url(&format!("v1/{locale}/{collection}/{}/archive", page.slug));
    format!("{url}?variation={}", ctx.options.variation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ion_model::{LocalStorage, SerializeOptions, Value};
    use std::collections::BTreeMap;

    fn page() -> Page {
        Page {
            slug: "intro".to_string(),
            parent: Some("home".to_string()),
            collection: Some("manual".to_string()),
            locale: Some("en".to_string()),
            layout: "article".to_string(),
            last_published: Some(Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap()),
            panels: vec![
                ("title".to_string(), Value::text("Welcome")),
                ("missing".to_string(), Value::Null),
                ("count".to_string(), Value::number(3.0)),
            ],
            extra_fields: vec![],
            meta: vec![],
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
            children: vec!["child-a".to_string(), "child-b".to_string()],
        }
    }

    fn with_ctx<T>(f: impl FnOnce(&SerializeContext<'_>) -> T) -> T {
        let options = SerializeOptions::new().with_base_url("https://cms.example.com");
        let storage = LocalStorage::new(std::env::temp_dir());
        let ctx = SerializeContext::new(&options, &storage);
        f(&ctx)
    }

    #[test]
    fn page_detail_document_shape() {
        with_ctx(|ctx| {
            let registry = SerializerRegistry::with_defaults();
            let serialized =
                serialize_page(&page(), ctx, &registry, &IdentityRemap).expect("serialize");
            let data = serialized.data;

            assert_eq!(data["identifier"], "intro");
            assert_eq!(data["parent"], "home");
            assert_eq!(data["collection"], "manual");
            assert_eq!(data["last_changed"], "2023-03-01T12:00:00Z");
            assert_eq!(data["layout"], "article");
            assert_eq!(data["locale"], "en");
            assert_eq!(
                data["archive"],
                "https://cms.example.com/v1/en/manual/intro/archive?variation=default"
            );
            assert_eq!(data["children"][1], "child-b");

            let contents = &data["contents"][0];
            assert_eq!(contents["outlet"], "container_0");
            let children = contents["children"].as_array().expect("children");
            // the null panel disappears
            assert_eq!(children.len(), 2);
            assert_eq!(children[0]["outlet"], "title");
            assert_eq!(children[1]["outlet"], "count");
        });
    }

    #[test]
    fn meta_declarations_render_as_scalars() {
        with_ctx(|ctx| {
            let registry = SerializerRegistry::with_defaults();
            let mut page = page();
            page.fields.insert("subtitle".to_string(), Value::text("A subtitle"));
            page.fields.insert("rating".to_string(), Value::number(4.5));
            page.fields.insert(
                "published_on".to_string(),
                Value::Date(chrono::NaiveDate::from_ymd_opt(2023, 3, 1).expect("date")),
            );
            page.fields.insert("draft".to_string(), Value::Null);
            let mut author = BTreeMap::new();
            author.insert("name".to_string(), Value::text("Jo"));
            page.relations.insert("author".to_string(), author);
            page.meta = vec![
                ion_model::ExtraField::Name("subtitle".to_string()),
                ion_model::ExtraField::Name("rating".to_string()),
                ion_model::ExtraField::Name("published_on".to_string()),
                ion_model::ExtraField::Name("draft".to_string()),
                ion_model::ExtraField::Renamed {
                    outlet: "author".to_string(),
                    path: "author.name".to_string(),
                },
            ];

            let serialized =
                serialize_page(&page, ctx, &registry, &IdentityRemap).expect("serialize");
            let meta = &serialized.data["meta"];
            assert_eq!(meta["subtitle"], "A subtitle");
            assert_eq!(meta["rating"], 4.5);
            // dates are normalized to midnight timestamps
            assert_eq!(meta["published_on"], "2023-03-01T00:00:00Z");
            assert_eq!(meta["author"], "Jo");
            // null values are skipped, not rendered as JSON null
            assert!(meta.get("draft").is_none());
        });
    }

    #[test]
    fn pages_without_meta_declarations_get_an_empty_object() {
        with_ctx(|ctx| {
            let registry = SerializerRegistry::with_defaults();
            let serialized =
                serialize_page(&page(), ctx, &registry, &IdentityRemap).expect("serialize");
            assert_eq!(serialized.data["meta"], serde_json::json!({}));
        });
    }

    struct PrefixRemap;

    impl OutletRemap for PrefixRemap {
        fn remap(&self, path: &[&str]) -> String {
            let name = path.last().copied().unwrap_or_default();
            if path.len() > 1 {
                format!("x_{name}")
            } else {
                name.to_string()
            }
        }
    }

    #[test]
    fn remap_receives_ancestor_path() {
        with_ctx(|ctx| {
            let registry = SerializerRegistry::with_defaults();
            let mut page = page();
            page.panels = vec![(
                "block".to_string(),
                Value::Struct(vec![("label".to_string(), Value::text("hi"))]),
            )];
            let serialized =
                serialize_page(&page, ctx, &registry, &PrefixRemap).expect("serialize");
            let contents = &serialized.data["contents"][0];
            // top-level container keeps its name, everything below is prefixed
            assert_eq!(contents["outlet"], "container_0");
            let block = &contents["children"][0];
            assert_eq!(block["outlet"], "x_block");
            assert_eq!(block["children"][0]["outlet"], "x_label");
        });
    }
}
