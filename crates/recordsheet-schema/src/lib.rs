//! Recordsheet kind registry.
//!
//! A registry declares every record kind and enumeration a sheet may
//! reference. The declarative form ([`RegistryDoc`]) is a plain serde model
//! loaded from YAML and validated into granular issues; [`KindRegistry`]
//! binds it into runtime-friendly descriptors with interned ids, parsed field
//! types, and per-kind name-lookup tables built once up front.

pub mod doc;
pub mod registry;

pub use doc::{EnumDef, FieldDef, KindDef, RegistryDoc, RegistryIssue, ValidationError};
pub use registry::{
    EnumDescriptor, FieldDescriptor, FieldType, KindDescriptor, KindRegistry, normalize_member,
};
