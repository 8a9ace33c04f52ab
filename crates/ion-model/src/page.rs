//! Page model: metadata, content panels and extra-field declarations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::value::Value;

/// A CMS page, materialized for serialization.
///
/// `panels` is the ordered list of content panels the page type declares;
/// `extra_fields` lets a page type pull additional fields (its own or one
/// relation hop away) into the content tree under a chosen outlet name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub slug: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    pub layout: String,
    #[serde(default)]
    pub last_published: Option<DateTime<Utc>>,
    /// Ordered (outlet name, content) pairs from the page's content panels.
    #[serde(default)]
    pub panels: Vec<(String, Value)>,
    /// Extra fields to serialize in addition to the panels.
    #[serde(default)]
    pub extra_fields: Vec<ExtraField>,
    /// Fields to surface in the page document's `meta` object. Same
    /// declaration shape as `extra_fields`, but values are rendered as
    /// plain scalars instead of content nodes.
    #[serde(default)]
    pub meta: Vec<ExtraField>,
    /// Named fields referenced by extra-field declarations.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Related objects reachable from extra-field paths (one hop).
    #[serde(default)]
    pub relations: BTreeMap<String, BTreeMap<String, Value>>,
    /// Slugs of live child pages.
    #[serde(default)]
    pub children: Vec<String>,
}

/// Declaration of one extra field to include in a page's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraField {
    /// Bare field name: outlet name equals the field name, looked up on
    /// the page itself.
    Name(String),
    /// Explicit outlet name plus a lookup path (`field` or
    /// `relation.field`).
    Renamed { outlet: String, path: String },
}

impl ExtraField {
    fn outlet_and_path(&self) -> (&str, &str) {
        match self {
            ExtraField::Name(name) => (name, name),
            ExtraField::Renamed { outlet, path } => (outlet, path),
        }
    }
}

impl Page {
    /// Resolve all extra-field declarations to (outlet name, value) pairs.
    ///
    /// Exactly one level of relation traversal (`relation.field`) is
    /// supported; a deeper path is a configuration error.
    pub fn extra_field_pairs(&self) -> Result<Vec<(String, &Value)>> {
        let mut pairs = Vec::with_capacity(self.extra_fields.len());
        for declaration in &self.extra_fields {
            let (outlet, path) = declaration.outlet_and_path();
            let value = self.resolve_path(path)?;
            pairs.push((outlet.to_string(), value));
        }
        Ok(pairs)
    }

    /// Resolve the meta declarations to (name, value) pairs, with the
    /// same one-hop path rules as extra fields.
    pub fn meta_pairs(&self) -> Result<Vec<(String, &Value)>> {
        let mut pairs = Vec::with_capacity(self.meta.len());
        for declaration in &self.meta {
            let (name, path) = declaration.outlet_and_path();
            let value = self.resolve_path(path)?;
            pairs.push((name.to_string(), value));
        }
        Ok(pairs)
    }

    /// All content to serialize: extra fields first, then the panels,
    /// matching the page walk order of the CMS.
    pub fn content_pairs(&self) -> Result<Vec<(String, &Value)>> {
        let mut pairs = self.extra_field_pairs()?;
        pairs.extend(self.panels.iter().map(|(name, value)| (name.clone(), value)));
        Ok(pairs)
    }

    fn resolve_path(&self, path: &str) -> Result<&Value> {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => self.fields.get(first).ok_or_else(|| ModelError::UnknownField {
                page: self.slug.clone(),
                field: first.to_string(),
            }),
            (Some(field), None) => {
                let related =
                    self.relations
                        .get(first)
                        .ok_or_else(|| ModelError::UnknownRelation {
                            page: self.slug.clone(),
                            relation: first.to_string(),
                        })?;
                related.get(field).ok_or_else(|| ModelError::UnknownField {
                    page: self.slug.clone(),
                    field: format!("{first}.{field}"),
                })
            }
            (Some(_), Some(_)) => Err(ModelError::FieldPathTooDeep {
                path: path.to_string(),
            }),
        }
    }
}
