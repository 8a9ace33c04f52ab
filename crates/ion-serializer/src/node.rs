//! Serializer node contract and attached-file tracking.

use chrono::{DateTime, Utc};
use ion_model::FileHandle;
use serde_json::{Map, Value as Json};

use crate::context::SerializeContext;
use crate::error::{Result, SerializeError};

/// One node of the serializer tree.
///
/// `serialize()` renders the node into a JSON object, or `None` to omit
/// the node from its parent's children entirely. Containers rely on the
/// `None`-means-skip convention to drop optional/empty content without
/// special-casing every caller.
pub trait IonSerializer {
    /// Render this node. `Ok(None)` omits the node from the output.
    fn serialize(&mut self, ctx: &SerializeContext<'_>) -> Result<Option<Json>>;

    /// Child nodes, for recursive attached-file collection.
    fn children(&self) -> &[Box<dyn IonSerializer>] {
        &[]
    }

    /// Files this node contributes to an archive.
    ///
    /// Only valid after a successful `serialize()`; file-backed nodes
    /// return [`SerializeError::AttachedFilesNotReady`] before that.
    fn attached_files(&self) -> Result<&[AttachedFile]> {
        Ok(&[])
    }
}

/// A file advertised by a serialized subtree as eligible for archival.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedFile {
    pub handle: FileHandle,
    /// Absolute public URL; archives dedup on this.
    pub url: String,
    pub checksum: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Holder for attached files that enforces the serialize-first contract.
#[derive(Debug, Default)]
pub struct AttachedFileSlot {
    files: Option<Vec<AttachedFile>>,
}

impl AttachedFileSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the files contributed by a successful serialization.
    pub fn fill(&mut self, files: Vec<AttachedFile>) {
        self.files = Some(files);
    }

    /// Record that a successful serialization contributed no files.
    pub fn fill_empty(&mut self) {
        self.files = Some(Vec::new());
    }

    pub fn get(&self) -> Result<&[AttachedFile]> {
        self.files
            .as_deref()
            .ok_or(SerializeError::AttachedFilesNotReady)
    }
}

/// Build the base JSON object shared by every serialized node.
pub fn base_node(outlet: &str, index: Option<u64>) -> Map<String, Json> {
    let mut node = Map::new();
    node.insert("outlet".to_string(), Json::String(outlet.to_string()));
    node.insert("variation".to_string(), Json::String("default".to_string()));
    node.insert("is_searchable".to_string(), Json::Bool(false));
    if let Some(index) = index {
        node.insert("index".to_string(), Json::from(index));
    }
    node
}

/// Recursively gather the attached files of a serialized tree.
pub fn collect_attached_files(root: &dyn IonSerializer) -> Result<Vec<AttachedFile>> {
    let mut files = Vec::new();
    collect_into(root, &mut files)?;
    Ok(files)
}

fn collect_into(node: &dyn IonSerializer, files: &mut Vec<AttachedFile>) -> Result<()> {
    files.extend(node.attached_files()?.iter().cloned());
    for child in node.children() {
        collect_into(child.as_ref(), files)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_rejects_access_before_fill() {
        let slot = AttachedFileSlot::new();
        assert!(matches!(
            slot.get(),
            Err(SerializeError::AttachedFilesNotReady)
        ));
    }

    #[test]
    fn slot_returns_files_after_fill() {
        let mut slot = AttachedFileSlot::new();
        slot.fill_empty();
        assert_eq!(slot.get().expect("filled").len(), 0);
    }

    #[test]
    fn base_node_shape() {
        let node = base_node("title", Some(2));
        assert_eq!(node["outlet"], "title");
        assert_eq!(node["variation"], "default");
        assert_eq!(node["is_searchable"], false);
        assert_eq!(node["index"], 2);

        let node = base_node("title", None);
        assert!(!node.contains_key("index"));
    }
}
