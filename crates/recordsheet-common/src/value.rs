//! Typed field values.
//!
//! [`Value`] is the closed set of shapes a record field can take. Cell text is
//! converted to and from these by the sync engine's codec; the schema crate's
//! `FieldType` carries the matching type tags.

/// Identifies a record kind interned in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindId(pub u32);

/// Identifies an enumeration interned in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(pub u32);

/// Identifies a record instance owned by an instance store.
///
/// Ids are only meaningful to the store that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u32);

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unset reference or nested payload.
    Empty,
    Int(i32),
    UShort(u16),
    Float(f32),
    Bool(bool),
    Text(String),
    /// Enumeration bits (flags) or variant index (plain enums).
    Enum(u32),
    Vec3([f32; 3]),
    Array(Vec<Value>),
    /// Reference to a named record instance.
    Ref(InstanceId),
    /// Nested inline record payload, embedded whole in one cell.
    Record(Box<RecordValue>),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

/// The value-type payload of a nested inline record.
///
/// Unlike a record instance this carries no identity: it lives entirely inside
/// the field that holds it. `fields` is parallel to the kind's field
/// descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub kind: KindId,
    pub fields: Vec<Value>,
}
