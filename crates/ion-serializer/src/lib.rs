//! Type-dispatch serialization of ION content trees.
//!
//! Content values are dispatched through an ordered serializer registry
//! (last registered wins, predicate filters) and rendered into a nested
//! JSON tree of outlets. File-backed content advertises its underlying
//! files for archive export; a missing file either aborts the build or
//! degrades to sentinel values, controlled by
//! [`SerializeOptions::allow_missing_files`](ion_model::SerializeOptions).
//!
//! # Example
//!
//! ```no_run
//! use ion_model::{LocalStorage, SerializeOptions, Value};
//! use ion_serializer::{ContainerSerializer, IonSerializer, SerializeContext, SerializerRegistry};
//!
//! let options = SerializeOptions::new().with_base_url("https://cms.example.com");
//! let storage = LocalStorage::new("/var/media");
//! let ctx = SerializeContext::new(&options, &storage);
//!
//! let registry = SerializerRegistry::global();
//! let mut container = ContainerSerializer::new("container_0");
//! container.add_child(registry, "title", &Value::text("Hello")).unwrap();
//! let tree = container.serialize(&ctx).unwrap();
//! ```

pub mod container;
pub mod context;
pub mod error;
pub mod files;
pub mod node;
pub mod page;
pub mod registry;
pub mod scalar;

pub use container::ContainerSerializer;
pub use context::SerializeContext;
pub use error::{Result, SerializeError};
pub use files::{
    CHECKSUM_MISSING, DocumentSerializer, FILE_MISSING, IMAGE_MISSING, ImageSerializer,
    MIME_MISSING, MediaSerializer,
};
pub use node::{AttachedFile, AttachedFileSlot, IonSerializer, base_node, collect_attached_files};
pub use page::{
    IdentityRemap, OutletRemap, SerializedPage, archive_url, remap_outlet_names,
    serialize_contents, serialize_meta, serialize_page,
};
pub use registry::{BuildFn, SerializerEntry, SerializerRegistry};
pub use scalar::{
    DateTimeSerializer, FlagSerializer, NullSerializer, NumberSerializer, PageLinkSerializer,
    TableSerializer, TextSerializer, clean_html, iso_date, looks_like_html,
};
