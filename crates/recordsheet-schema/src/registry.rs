use recordsheet_common::{EnumId, KindId, Value};
use rustc_hash::FxHashMap;

use crate::doc::{RegistryDoc, RegistryIssue, ValidationError};

/// Closed set of declared field types.
///
/// Every cell conversion dispatches on one of these tags; there is no open
/// type switch anywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int,
    UShort,
    Float,
    Bool,
    Text,
    Vec3,
    Enum(EnumId),
    /// Reference to a named instance of the given kind.
    Ref(KindId),
    /// Nested inline record; the concrete kind is named by the cell text.
    Record,
    Array(Box<FieldType>),
}

impl FieldType {
    /// The value a freshly created instance or nested payload starts with.
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Int => Value::Int(0),
            FieldType::UShort => Value::UShort(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Bool => Value::Bool(false),
            FieldType::Text => Value::Text(String::new()),
            FieldType::Vec3 => Value::Vec3([0.0; 3]),
            FieldType::Enum(_) => Value::Enum(0),
            FieldType::Ref(_) | FieldType::Record => Value::Empty,
            FieldType::Array(_) => Value::Array(Vec::new()),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array(_))
    }
}

/// A bound field: declared name, parsed type, nested-record visibility.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: FieldType,
    pub serialized: bool,
}

/// A bound record kind with its prebuilt field-lookup table.
#[derive(Debug, Clone)]
pub struct KindDescriptor {
    name: String,
    non_unique_names: bool,
    ordered: bool,
    fields: Vec<FieldDescriptor>,
    by_name: FxHashMap<String, usize>,
}

impl KindDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instances of this kind may legitimately share a display name, which
    /// disables identity caching for them.
    pub fn non_unique_names(&self) -> bool {
        self.non_unique_names
    }

    /// Whether instances carry a positional order value.
    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, slot: usize) -> &FieldDescriptor {
        &self.fields[slot]
    }

    /// Resolve a field name to its slot, case-insensitively and with spaces
    /// stripped, through the table built at bind time.
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.by_name.get(&normalize_member(name)).copied()
    }

    /// Zero values for every field, in slot order.
    pub fn zero_fields(&self) -> Vec<Value> {
        self.fields.iter().map(|f| f.ty.zero()).collect()
    }
}

/// A bound enumeration.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    name: String,
    flags: bool,
    variants: Vec<String>,
}

impl EnumDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> bool {
        self.flags
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Numeric value of variant *i*: a bit for flags enums, the index
    /// otherwise.
    pub fn variant_value(&self, index: usize) -> u32 {
        if self.flags { 1 << index } else { index as u32 }
    }

    /// Numeric value of a named variant.
    pub fn value_of(&self, token: &str) -> Option<u32> {
        self.variants
            .iter()
            .position(|v| v == token)
            .map(|i| self.variant_value(i))
    }

    /// Variant name for an exact numeric value.
    pub fn name_of(&self, value: u32) -> Option<&str> {
        self.variants
            .iter()
            .enumerate()
            .find(|(i, _)| self.variant_value(*i) == value)
            .map(|(_, name)| name.as_str())
    }
}

/// Bound registry: every kind and enumeration with interned ids.
///
/// [`KindRegistry::resolve`] is the kind-resolver capability the sync engine
/// injects into a run; [`KindDescriptor::find_field`] is the accessor-resolver
/// capability.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: Vec<KindDescriptor>,
    enums: Vec<EnumDescriptor>,
    kinds_by_name: FxHashMap<String, KindId>,
    enums_by_name: FxHashMap<String, EnumId>,
}

impl KindRegistry {
    /// Validate and bind a registry document.
    ///
    /// Field types are parsed here, once; unknown bases, enums, or kinds are
    /// reported as issues carrying the offending document path.
    pub fn new(doc: RegistryDoc) -> Result<Self, ValidationError> {
        doc.validate()?;

        let mut enums_by_name = FxHashMap::default();
        let mut enums = Vec::with_capacity(doc.enums.len());
        for (idx, def) in doc.enums.into_iter().enumerate() {
            enums_by_name.insert(def.name.clone(), EnumId(idx as u32));
            enums.push(EnumDescriptor {
                name: def.name,
                flags: def.flags,
                variants: def.variants,
            });
        }

        let mut kinds_by_name = FxHashMap::default();
        for (idx, def) in doc.kinds.iter().enumerate() {
            kinds_by_name.insert(def.name.clone(), KindId(idx as u32));
        }

        let mut issues = Vec::new();
        let mut kinds = Vec::with_capacity(doc.kinds.len());
        for (idx, def) in doc.kinds.into_iter().enumerate() {
            let mut fields = Vec::with_capacity(def.fields.len());
            let mut by_name = FxHashMap::default();
            for (fidx, field) in def.fields.into_iter().enumerate() {
                let ty = match parse_field_type(&field.ty, &kinds_by_name, &enums_by_name) {
                    Ok(ty) => ty,
                    Err(message) => {
                        issues.push(RegistryIssue::new(
                            format!("kinds[{idx}].fields[{fidx}].type"),
                            message,
                        ));
                        FieldType::Text
                    }
                };
                by_name.insert(normalize_member(&field.name), fidx);
                fields.push(FieldDescriptor {
                    name: field.name,
                    ty,
                    serialized: field.serialized,
                });
            }
            kinds.push(KindDescriptor {
                name: def.name,
                non_unique_names: def.non_unique_names,
                ordered: def.ordered,
                fields,
                by_name,
            });
        }

        if !issues.is_empty() {
            return Err(ValidationError::new(issues));
        }

        Ok(Self {
            kinds,
            enums,
            kinds_by_name,
            enums_by_name,
        })
    }

    /// Resolve a kind name as it appears in a sheet header.
    pub fn resolve(&self, name: &str) -> Option<KindId> {
        self.kinds_by_name.get(name.trim()).copied()
    }

    pub fn resolve_enum(&self, name: &str) -> Option<EnumId> {
        self.enums_by_name.get(name.trim()).copied()
    }

    pub fn kind(&self, id: KindId) -> &KindDescriptor {
        &self.kinds[id.0 as usize]
    }

    pub fn enumeration(&self, id: EnumId) -> &EnumDescriptor {
        &self.enums[id.0 as usize]
    }

    pub fn kinds(&self) -> impl Iterator<Item = (KindId, &KindDescriptor)> {
        self.kinds
            .iter()
            .enumerate()
            .map(|(i, k)| (KindId(i as u32), k))
    }
}

/// Normalize a member name for lookup: lowercase, spaces stripped.
pub fn normalize_member(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_field_type(
    raw: &str,
    kinds: &FxHashMap<String, KindId>,
    enums: &FxHashMap<String, EnumId>,
) -> Result<FieldType, String> {
    let raw = raw.trim();
    if let Some(base) = raw.strip_suffix("[]") {
        return Ok(FieldType::Array(Box::new(parse_field_type(
            base, kinds, enums,
        )?)));
    }
    if let Some(name) = raw.strip_prefix("enum:") {
        return enums
            .get(name.trim())
            .copied()
            .map(FieldType::Enum)
            .ok_or_else(|| format!("unknown enum `{}`", name.trim()));
    }
    if let Some(name) = raw.strip_prefix("ref:") {
        return kinds
            .get(name.trim())
            .copied()
            .map(FieldType::Ref)
            .ok_or_else(|| format!("unknown kind `{}`", name.trim()));
    }
    match raw {
        "int" => Ok(FieldType::Int),
        "ushort" => Ok(FieldType::UShort),
        "float" => Ok(FieldType::Float),
        "bool" => Ok(FieldType::Bool),
        "string" => Ok(FieldType::Text),
        "vec3" => Ok(FieldType::Vec3),
        "record" => Ok(FieldType::Record),
        other => Err(format!("unknown field type `{other}`")),
    }
}
