//! Serializer registry: ordered, predicate-filtered dispatch from content
//! values to serializer nodes.
//!
//! The registry is a stack: entries registered later take precedence over
//! earlier ones for overlapping kinds, and an entry's `can_serialize`
//! predicate can reject a specific value to let lookup fall through to the
//! next match. The registry is populated once at process startup and
//! treated as read-only afterwards; no locking is needed under that
//! discipline.

use std::sync::OnceLock;

use ion_model::{Value, ValueKind};

use crate::container::ContainerSerializer;
use crate::error::{Result, SerializeError};
use crate::files::{DocumentSerializer, ImageSerializer, MediaSerializer};
use crate::node::IonSerializer;
use crate::scalar::{
    DateTimeSerializer, FlagSerializer, NullSerializer, NumberSerializer, PageLinkSerializer,
    TableSerializer, TextSerializer,
};

/// Builder function turning an (outlet name, value) pair into a node.
///
/// Receives the registry so container builders can dispatch their
/// children recursively. Returns `None` when the value's shape does not
/// match the entry after all; lookup then falls through.
pub type BuildFn =
    fn(&SerializerRegistry, &str, &Value) -> Option<Result<Box<dyn IonSerializer>>>;

/// One registered serializer type.
pub struct SerializerEntry {
    /// Human-readable name, for diagnostics.
    pub name: &'static str,
    /// Content kinds this serializer handles.
    pub supports: &'static [ValueKind],
    /// Fine-grained sanity check on a concrete value.
    pub can_serialize: fn(&Value) -> bool,
    pub build: BuildFn,
}

impl SerializerEntry {
    fn matches(&self, kind: ValueKind, value: Option<&Value>) -> bool {
        self.supports.contains(&kind)
            && value.map(|v| (self.can_serialize)(v)).unwrap_or(true)
    }
}

/// Ordered stack of serializer entries, scanned front to back.
#[derive(Default)]
pub struct SerializerRegistry {
    entries: Vec<SerializerEntry>,
}

impl SerializerRegistry {
    /// An empty registry. Mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with all built-in serializers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for entry in default_entries() {
            registry.register(entry);
        }
        registry
    }

    /// The process-wide registry, built on first use.
    pub fn global() -> &'static SerializerRegistry {
        static GLOBAL: OnceLock<SerializerRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SerializerRegistry::with_defaults)
    }

    /// Register a serializer entry, giving it precedence over all earlier
    /// registrations for overlapping kinds. There is no removal; the
    /// registry lives for the process lifetime.
    pub fn register(&mut self, entry: SerializerEntry) {
        self.entries.insert(0, entry);
    }

    /// Find the serializer for a content kind, optionally sanity-checking
    /// a concrete value. Returns `None` when nothing matches; the caller
    /// decides whether that is fatal.
    pub fn find(&self, kind: ValueKind, value: Option<&Value>) -> Option<&SerializerEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(kind, value))
    }

    /// Dispatch a value to its serializer and build the node.
    ///
    /// A value without a registered serializer is a configuration bug;
    /// containers surface it as a fatal error.
    pub fn build(&self, name: &str, value: &Value) -> Result<Box<dyn IonSerializer>> {
        let kind = value.kind();
        for entry in &self.entries {
            if !entry.matches(kind, Some(value)) {
                continue;
            }
            if let Some(built) = (entry.build)(self, name, value) {
                return built;
            }
        }
        Err(SerializeError::NoSerializer { kind })
    }
}

fn always(_: &Value) -> bool {
    true
}

/// Built-in serializer entries, in registration order (later entries win).
fn default_entries() -> Vec<SerializerEntry> {
    vec![
        SerializerEntry {
            name: "list",
            supports: &[ValueKind::List],
            can_serialize: always,
            build: |registry, name, value| match value {
                Value::List(items) => Some(
                    ContainerSerializer::list(registry, name, items)
                        .map(|c| Box::new(c) as Box<dyn IonSerializer>),
                ),
                _ => None,
            },
        },
        SerializerEntry {
            name: "flag",
            supports: &[ValueKind::Flag],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Flag(flag) => Some(Ok(Box::new(FlagSerializer::new(name, *flag)))),
                _ => None,
            },
        },
        SerializerEntry {
            name: "datetime",
            supports: &[ValueKind::Date, ValueKind::DateTime],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Date(date) => Some(Ok(Box::new(DateTimeSerializer::from_date(name, *date)))),
                Value::DateTime(stamp) => Some(Ok(Box::new(DateTimeSerializer::new(name, *stamp)))),
                _ => None,
            },
        },
        SerializerEntry {
            name: "document",
            supports: &[ValueKind::Document],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Document(doc) => {
                    Some(Ok(Box::new(DocumentSerializer::new(name, doc.clone()))))
                }
                _ => None,
            },
        },
        SerializerEntry {
            name: "image",
            supports: &[ValueKind::Image],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Image(image) => {
                    Some(Ok(Box::new(ImageSerializer::new(name, image.clone()))))
                }
                _ => None,
            },
        },
        SerializerEntry {
            name: "media",
            supports: &[ValueKind::Media],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Media(media) => {
                    Some(Ok(Box::new(MediaSerializer::new(name, media.clone()))))
                }
                _ => None,
            },
        },
        // Flags are a numeric subtype in loosely-typed source systems;
        // the number entry must never claim them.
        SerializerEntry {
            name: "number",
            supports: &[ValueKind::Number],
            can_serialize: |value| !matches!(value, Value::Flag(_)),
            build: |_, name, value| match value {
                Value::Number(number) => Some(Ok(Box::new(NumberSerializer::new(name, *number)))),
                _ => None,
            },
        },
        SerializerEntry {
            name: "page_link",
            supports: &[ValueKind::PageLink],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::PageLink(link) => {
                    Some(Ok(Box::new(PageLinkSerializer::new(name, link.clone()))))
                }
                _ => None,
            },
        },
        SerializerEntry {
            name: "stream",
            supports: &[ValueKind::Stream],
            can_serialize: always,
            build: |registry, name, value| match value {
                Value::Stream(items) => Some(
                    ContainerSerializer::stream(registry, name, items)
                        .map(|c| Box::new(c) as Box<dyn IonSerializer>),
                ),
                _ => None,
            },
        },
        SerializerEntry {
            name: "struct",
            supports: &[ValueKind::Struct],
            can_serialize: always,
            build: |registry, name, value| match value {
                Value::Struct(entries) => Some(
                    ContainerSerializer::structure(registry, name, entries)
                        .map(|c| Box::new(c) as Box<dyn IonSerializer>),
                ),
                _ => None,
            },
        },
        SerializerEntry {
            name: "table",
            supports: &[ValueKind::Table],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Table(table) => Some(Ok(Box::new(TableSerializer::new(name, table.clone())))),
                _ => None,
            },
        },
        SerializerEntry {
            name: "text",
            supports: &[ValueKind::Text, ValueKind::RichText],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Text(text) => Some(Ok(Box::new(TextSerializer::new(name, text)))),
                Value::RichText(html) => Some(Ok(Box::new(TextSerializer::rich(name, html)))),
                _ => None,
            },
        },
        SerializerEntry {
            name: "null",
            supports: &[ValueKind::Null],
            can_serialize: always,
            build: |_, _, value| match value {
                Value::Null => Some(Ok(Box::new(NullSerializer))),
                _ => None,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializeContext;
    use ion_model::{LocalStorage, SerializeOptions};
    use serde_json::Value as Json;

    fn render(value: &Value) -> Option<Json> {
        let options = SerializeOptions::default();
        let storage = LocalStorage::new(std::env::temp_dir());
        let ctx = SerializeContext::new(&options, &storage);
        SerializerRegistry::with_defaults()
            .build("outlet", value)
            .expect("build")
            .serialize(&ctx)
            .expect("serialize")
    }

    #[test]
    fn bools_are_flags_not_numbers() {
        let node = render(&Value::Flag(true)).expect("emitted");
        assert_eq!(node["type"], "flagcontent");
        let node = render(&Value::Flag(false)).expect("emitted");
        assert_eq!(node["type"], "flagcontent");
    }

    #[test]
    fn numbers_are_numbercontent() {
        for value in [0.0, 1.0, 1.5] {
            let node = render(&Value::Number(value)).expect("emitted");
            assert_eq!(node["type"], "numbercontent");
        }
    }

    #[test]
    fn null_is_omitted_via_registry() {
        assert!(render(&Value::Null).is_none());
    }

    #[test]
    fn later_registration_wins() {
        let mut registry = SerializerRegistry::with_defaults();
        registry.register(SerializerEntry {
            name: "shouting_text",
            supports: &[ValueKind::Text],
            can_serialize: always,
            build: |_, name, value| match value {
                Value::Text(text) => Some(Ok(Box::new(TextSerializer::new(
                    name,
                    &text.to_uppercase(),
                )))),
                _ => None,
            },
        });

        let found = registry
            .find(ValueKind::Text, Some(&Value::text("hi")))
            .expect("found");
        assert_eq!(found.name, "shouting_text");
    }

    #[test]
    fn predicate_rejection_falls_through() {
        let mut registry = SerializerRegistry::with_defaults();
        registry.register(SerializerEntry {
            name: "special_text",
            supports: &[ValueKind::Text],
            can_serialize: |value| {
                matches!(value, Value::Text(text) if text.starts_with("special:"))
            },
            build: |_, name, value| match value {
                Value::Text(text) => Some(Ok(Box::new(TextSerializer::new(name, text)))),
                _ => None,
            },
        });

        let found = registry
            .find(ValueKind::Text, Some(&Value::text("special: yes")))
            .expect("found");
        assert_eq!(found.name, "special_text");

        let fallback = registry
            .find(ValueKind::Text, Some(&Value::text("ordinary")))
            .expect("found");
        assert_eq!(fallback.name, "text");
    }

    #[test]
    fn find_without_value_skips_predicates() {
        let registry = SerializerRegistry::with_defaults();
        let found = registry.find(ValueKind::Number, None).expect("found");
        assert_eq!(found.name, "number");
    }

    #[test]
    fn empty_registry_reports_no_serializer() {
        let registry = SerializerRegistry::new();
        assert!(registry.find(ValueKind::Text, None).is_none());
        assert!(matches!(
            registry.build("outlet", &Value::text("hi")),
            Err(SerializeError::NoSerializer { .. })
        ));
    }
}
