//! Cell text ⇄ typed value conversion.
//!
//! Decoding is total over the closed [`FieldType`] set: anything malformed is
//! logged and reported as "no value" so the caller leaves the field at its
//! prior state. Only instance-store failures propagate as errors. Encoding
//! yields `None` for blank cells (zero enums, empty arrays, unset references).

use recordsheet_common::{RecordValue, Value};
use recordsheet_schema::{FieldType, KindRegistry};

use crate::error::SyncError;
use crate::state::SyncState;
use crate::store::InstanceStore;

/// Decode one cell's text as a declared field type.
///
/// `Ok(None)` means the field should keep its prior value: either the text
/// was blank for a type with no blank form, or it was malformed (already
/// logged). Dangling references and blank reference/record cells decode to
/// [`Value::Empty`], clearing the field.
pub fn decode<S: InstanceStore + ?Sized>(
    ty: &FieldType,
    text: &str,
    state: &mut SyncState<'_, S>,
) -> Result<Option<Value>, SyncError> {
    let blank = text.trim().is_empty();
    match ty {
        FieldType::Int => Ok(if blank {
            None
        } else {
            parse_scalar(text, "int", |t| t.parse().map(Value::Int).ok())
        }),
        FieldType::UShort => Ok(if blank {
            None
        } else {
            parse_scalar(text, "ushort", |t| t.parse().map(Value::UShort).ok())
        }),
        FieldType::Float => Ok(if blank {
            None
        } else {
            parse_scalar(text, "float", |t| t.parse().map(Value::Float).ok())
        }),
        FieldType::Bool => Ok(if blank {
            None
        } else {
            parse_scalar(text, "bool", |t| match t.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            })
        }),
        FieldType::Text => Ok(Some(Value::Text(text.to_owned()))),
        FieldType::Vec3 => Ok(if blank { None } else { decode_vec3(text) }),
        FieldType::Enum(id) => Ok(decode_enum(state.registry(), *id, text)),
        FieldType::Ref(kind) => {
            if blank {
                return Ok(Some(Value::Empty));
            }
            match state.resolve_instance(*kind, text, false, None)? {
                Some(id) => Ok(Some(Value::Ref(id))),
                None => {
                    let kind_name = state.registry().kind(*kind).name();
                    tracing::warn!(kind = %kind_name, name = %text, "referenced record not found");
                    Ok(Some(Value::Empty))
                }
            }
        }
        FieldType::Record => {
            if blank {
                return Ok(Some(Value::Empty));
            }
            decode_record(text, state)
        }
        FieldType::Array(inner) => {
            if blank {
                return Ok(Some(Value::Array(Vec::new())));
            }
            let mut items = Vec::new();
            for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                match decode(inner, token, state)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Ok(Some(Value::Array(items)))
        }
    }
}

fn parse_scalar(
    text: &str,
    ty: &'static str,
    parse: impl Fn(&str) -> Option<Value>,
) -> Option<Value> {
    let parsed = parse(text.trim());
    if parsed.is_none() {
        tracing::warn!(ty, text, "cell text does not parse");
    }
    parsed
}

fn decode_vec3(text: &str) -> Option<Value> {
    let mut parts = Vec::new();
    for token in text.split(',') {
        match token.trim().parse::<f32>() {
            Ok(v) => parts.push(v),
            Err(_) => {
                tracing::warn!(text, "vector component does not parse");
                return None;
            }
        }
    }
    if parts.len() != 3 {
        tracing::warn!(text, components = parts.len(), "vector needs three components");
        parts.resize(3, 0.0);
    }
    Some(Value::Vec3([parts[0], parts[1], parts[2]]))
}

fn decode_enum(
    registry: &KindRegistry,
    id: recordsheet_common::EnumId,
    text: &str,
) -> Option<Value> {
    // Variant lists arrive comma separated, space separated, or a mix of
    // both; empty text is the zero value.
    let desc = registry.enumeration(id);
    let mut bits = 0u32;
    for token in text.split([',', ' ']).filter(|t| !t.is_empty()) {
        match desc.value_of(token) {
            Some(value) => bits |= value,
            None => {
                tracing::warn!(name = %desc.name(), token, "unknown enum variant");
                return None;
            }
        }
    }
    Some(Value::Enum(bits))
}

/// Decode a nested inline record of the shape `Kind{field:value;field:value}`.
fn decode_record<S: InstanceStore + ?Sized>(
    text: &str,
    state: &mut SyncState<'_, S>,
) -> Result<Option<Value>, SyncError> {
    let registry = state.registry();
    let (Some(open), Some(close)) = (text.find('{'), text.find('}')) else {
        tracing::warn!(text, "nested record is missing braces");
        return Ok(None);
    };
    if close < open {
        tracing::warn!(text, "nested record is missing braces");
        return Ok(None);
    }
    let name = text[..open].trim();
    let Some(kind_id) = registry.resolve(name) else {
        tracing::warn!(name, "unknown nested record kind");
        return Ok(None);
    };
    let kind = registry.kind(kind_id);
    let mut fields = kind.zero_fields();
    for segment in text[open + 1..close]
        .split(';')
        .filter(|s| !s.trim().is_empty())
    {
        let Some((field_name, field_text)) = segment.split_once(':') else {
            tracing::warn!(kind = %kind.name(), segment, "nested record field lacks a `:`");
            continue;
        };
        let Some(slot) = kind.find_field(field_name) else {
            tracing::warn!(kind = %kind.name(), field = %field_name.trim(), "nested record field not found");
            continue;
        };
        if let Some(value) = decode(&kind.field(slot).ty, field_text, state)? {
            fields[slot] = value;
        }
    }
    Ok(Some(Value::Record(Box::new(RecordValue {
        kind: kind_id,
        fields,
    }))))
}

/// Encode a field value back into cell text. `None` means a blank cell.
pub fn encode<S: InstanceStore + ?Sized>(
    ty: &FieldType,
    value: &Value,
    state: &SyncState<'_, S>,
) -> Option<String> {
    match (ty, value) {
        (FieldType::Int, Value::Int(v)) => Some(v.to_string()),
        (FieldType::UShort, Value::UShort(v)) => Some(v.to_string()),
        (FieldType::Float, Value::Float(v)) => Some(format_float(*v)),
        (FieldType::Bool, Value::Bool(v)) => Some(v.to_string()),
        (FieldType::Text, Value::Text(s)) => Some(escape_formula(s)),
        (FieldType::Vec3, Value::Vec3([x, y, z])) => Some(format!(
            "{},{},{}",
            format_float(*x),
            format_float(*y),
            format_float(*z)
        )),
        (FieldType::Enum(id), Value::Enum(bits)) => encode_enum(state.registry(), *id, *bits),
        (FieldType::Ref(_), Value::Ref(id)) => Some(state.store().display_name(*id).to_owned()),
        (FieldType::Record, Value::Record(payload)) => Some(encode_record(payload, state)),
        (FieldType::Array(inner), Value::Array(items)) => {
            if items.is_empty() {
                return None;
            }
            Some(
                items
                    .iter()
                    .map(|item| encode(inner, item, state).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
        (_, Value::Empty) => None,
        _ => None,
    }
}

fn encode_enum(
    registry: &KindRegistry,
    id: recordsheet_common::EnumId,
    bits: u32,
) -> Option<String> {
    // Zero round-trips to a blank cell, not to the zero variant's name.
    if bits == 0 {
        return None;
    }
    let desc = registry.enumeration(id);
    if desc.flags() {
        let mut names = Vec::new();
        let mut rest = bits;
        for (i, variant) in desc.variants().iter().enumerate() {
            let bit = desc.variant_value(i);
            if bits & bit != 0 {
                names.push(variant.as_str());
                rest &= !bit;
            }
        }
        if rest != 0 || names.is_empty() {
            return Some(bits.to_string());
        }
        Some(names.join(", "))
    } else {
        match desc.name_of(bits) {
            Some(name) => Some(name.to_owned()),
            None => Some(bits.to_string()),
        }
    }
}

fn encode_record<S: InstanceStore + ?Sized>(
    payload: &RecordValue,
    state: &SyncState<'_, S>,
) -> String {
    let kind = state.registry().kind(payload.kind);
    let body = kind
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| field.serialized)
        .map(|(slot, field)| {
            let text = payload
                .fields
                .get(slot)
                .and_then(|value| encode(&field.ty, value, state))
                .unwrap_or_default();
            format!("{}:{}", field.name, text)
        })
        .collect::<Vec<_>>()
        .join(";");
    format!("{}{{{}}}", kind.name(), body)
}

/// Up to four fractional digits, trailing zeros trimmed.
fn format_float(v: f32) -> String {
    let mut s = format!("{v:.4}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// A leading quote keeps spreadsheet UIs from treating the text as a formula.
fn escape_formula(s: &str) -> String {
    if s.starts_with('=') || s.starts_with('+') {
        format!("'{s}")
    } else {
        s.to_owned()
    }
}
