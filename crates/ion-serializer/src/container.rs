//! Container serializers: generic containers, lists, streams and structs.
//!
//! Containers recurse through the serializer registry so they can hold
//! arbitrary heterogeneous content. A child that serializes to `None` is
//! dropped and consumes no index slot.

use ion_model::{StreamItem, Value};
use serde_json::Value as Json;

use crate::context::SerializeContext;
use crate::error::Result;
use crate::node::{IonSerializer, base_node};
use crate::registry::SerializerRegistry;

/// Generic nested-children node, serialized as `containercontent`.
pub struct ContainerSerializer {
    name: String,
    index: Option<u64>,
    subtype: &'static str,
    /// When set, surviving children get a zero-based running index.
    index_children: bool,
    children: Vec<Box<dyn IonSerializer>>,
}

impl ContainerSerializer {
    /// Create an empty container of subtype `generic`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_subtype(name, "generic")
    }

    /// Create an empty container with an explicit subtype tag.
    pub fn with_subtype(name: impl Into<String>, subtype: &'static str) -> Self {
        Self {
            name: name.into(),
            index: None,
            subtype,
            index_children: false,
            children: Vec::new(),
        }
    }

    /// Enable running indexes on surviving children.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.index_children = true;
        self
    }

    /// Append an already-built child node.
    pub fn push_child(&mut self, child: Box<dyn IonSerializer>) {
        self.children.push(child);
    }

    /// Add a child with registry dispatch on the value's kind.
    ///
    /// A value no registered serializer can handle is a configuration bug
    /// and fails the whole tree build.
    pub fn add_child(
        &mut self,
        registry: &SerializerRegistry,
        name: &str,
        value: &Value,
    ) -> Result<()> {
        let child = registry.build(name, value)?;
        self.children.push(child);
        Ok(())
    }

    /// Wrap a list value: every item dispatched through the registry,
    /// children named `<name>_item` and indexed.
    pub fn list(registry: &SerializerRegistry, name: &str, items: &[Value]) -> Result<Self> {
        let mut container = Self::with_subtype(name, "list").indexed();
        let item_name = format!("{name}_item");
        for item in items {
            container.add_child(registry, &item_name, item)?;
        }
        Ok(container)
    }

    /// Wrap a stream value: children keep their block-type name and may
    /// repeat, so they are indexed.
    pub fn stream(registry: &SerializerRegistry, name: &str, items: &[StreamItem]) -> Result<Self> {
        let mut container = Self::with_subtype(name, "streamblock").indexed();
        for item in items {
            container.add_child(registry, &item.block_type, &item.value)?;
        }
        Ok(container)
    }

    /// Wrap a struct value: children keep their unique mapping key as
    /// outlet name, so no index is emitted.
    pub fn structure(
        registry: &SerializerRegistry,
        name: &str,
        entries: &[(String, Value)],
    ) -> Result<Self> {
        let mut container = Self::with_subtype(name, "structblock");
        for (key, value) in entries {
            container.add_child(registry, key, value)?;
        }
        Ok(container)
    }

    fn serialize_children(&mut self, ctx: &SerializeContext<'_>) -> Result<Vec<Json>> {
        let mut rendered = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            if let Some(mut node) = child.serialize(ctx)? {
                if self.index_children {
                    if let Json::Object(map) = &mut node {
                        map.insert("index".to_string(), Json::from(rendered.len() as u64));
                    }
                }
                rendered.push(node);
            }
        }
        Ok(rendered)
    }
}

impl IonSerializer for ContainerSerializer {
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>> {
        let children = self.serialize_children(ctx)?;
        let mut node = base_node(&self.name, self.index);
        node.insert("type".to_string(), Json::from("containercontent"));
        node.insert("subtype".to_string(), Json::from(self.subtype));
        node.insert("children".to_string(), Json::Array(children));
        Ok(Some(Json::Object(node)))
    }

    fn children(&self) -> &[Box<dyn IonSerializer>] {
        &self.children
    }
}
