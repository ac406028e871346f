//! Turns one raw property declaration into a typed `(name, value)` pair.
//!
//! Coercion is pure. Nested class-typed members read the already-flattened
//! set of the referenced class through a [`ClassLookup`]; nothing in here
//! ever asks for a class to be resolved.

use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::error::{ResolveError, Result};
use crate::model::{
    EnumDeclaration, EnumStorage, FlattenedPropertySet, MemberDeclaration, MemberKind,
    PropertyMap, PropertyValue,
};

/// Read-only view of resolved classes and declared enums.
pub trait ClassLookup {
    fn class(&self, name: &str) -> Option<&FlattenedPropertySet>;
    fn enumeration(&self, name: &str) -> Option<&EnumDeclaration>;
}

pub fn coerce(
    decl: &MemberDeclaration,
    lookup: &impl ClassLookup,
) -> Result<(String, PropertyValue)> {
    let name = decl.name.as_str();
    let raw = &decl.value;

    let value = match &decl.kind {
        MemberKind::String => PropertyValue::String(as_str(name, "string", raw)?),
        MemberKind::File => PropertyValue::File(as_str(name, "file", raw)?),
        MemberKind::Int => PropertyValue::Int(as_int(name, raw)?),
        MemberKind::Float => PropertyValue::Float(as_float(name, raw)?),
        MemberKind::Bool => PropertyValue::Bool(as_bool(name, raw)?),
        MemberKind::Color => PropertyValue::Color(as_color(name, raw)?),
        MemberKind::Object => PropertyValue::ObjectRef(as_object_ref(name, raw)?),
        MemberKind::Enum(enumeration) => {
            as_enum(name, raw, lookup.enumeration(enumeration))?
        }
        MemberKind::Class(class) => {
            let mut base = lookup
                .class(class)
                .ok_or_else(|| ResolveError::UnresolvedClassReference {
                    property: name.to_string(),
                    class: class.clone(),
                })?
                .clone();
            match raw {
                Value::Null => {}
                Value::Object(overrides) => apply_overrides(&mut base, overrides, name)?,
                other => return Err(invalid(name, "class", other)),
            }
            PropertyValue::Class(base)
        }
    };

    Ok((decl.name.clone(), value))
}

/// Writes inline member overrides onto a copy of a class's flattened set.
///
/// Each override is typed after the value it replaces; names the class
/// does not declare are typed from their JSON shape.
pub fn apply_overrides(
    target: &mut PropertyMap,
    overrides: &Map<String, Value>,
    property: &str,
) -> Result<()> {
    for (key, raw) in overrides {
        let path = format!("{property}.{key}");
        match target.get_mut(key) {
            Some(existing) => *existing = retype(existing, raw, &path)?,
            None => {
                if let Some(value) = PropertyValue::infer(raw) {
                    target.insert(key.clone(), value);
                }
            }
        }
    }
    Ok(())
}

fn retype(existing: &PropertyValue, raw: &Value, property: &str) -> Result<PropertyValue> {
    Ok(match existing {
        PropertyValue::Bool(_) => PropertyValue::Bool(as_bool(property, raw)?),
        PropertyValue::Int(_) => PropertyValue::Int(as_int(property, raw)?),
        PropertyValue::Float(_) => PropertyValue::Float(as_float(property, raw)?),
        PropertyValue::String(_) => PropertyValue::String(as_str(property, "string", raw)?),
        PropertyValue::File(_) => PropertyValue::File(as_str(property, "file", raw)?),
        PropertyValue::Color(_) => PropertyValue::Color(as_color(property, raw)?),
        PropertyValue::ObjectRef(_) => PropertyValue::ObjectRef(as_object_ref(property, raw)?),
        PropertyValue::Flags(_) => PropertyValue::Flags(as_flags(property, raw)?),
        PropertyValue::Class(base) => {
            let mut nested = base.clone();
            match raw {
                Value::Null => {}
                Value::Object(overrides) => apply_overrides(&mut nested, overrides, property)?,
                other => return Err(invalid(property, "class", other)),
            }
            PropertyValue::Class(nested)
        }
    })
}

// ─────────────────────────────────────────────────────
// Primitive conversions. A missing value means the kind's default.

fn as_str(property: &str, expected: &'static str, raw: &Value) -> Result<String> {
    match raw {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        other => Err(invalid(property, expected, other)),
    }
}

fn as_int(property: &str, raw: &Value) -> Result<i64> {
    match raw {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| invalid(property, "int", raw)),
        other => Err(invalid(property, "int", other)),
    }
}

fn as_float(property: &str, raw: &Value) -> Result<f64> {
    match raw {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(property, "float", raw)),
        other => Err(invalid(property, "float", other)),
    }
}

fn as_bool(property: &str, raw: &Value) -> Result<bool> {
    match raw {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => Err(invalid(property, "bool", other)),
    }
}

fn as_color(property: &str, raw: &Value) -> Result<Option<crate::model::Color>> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => s
            .parse()
            .map(Some)
            .map_err(|_| invalid(property, "color", raw)),
        other => Err(invalid(property, "color", other)),
    }
}

fn as_object_ref(property: &str, raw: &Value) -> Result<u32> {
    match raw {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| invalid(property, "object", raw)),
        other => Err(invalid(property, "object", other)),
    }
}

fn as_flags(property: &str, raw: &Value) -> Result<IndexSet<String>> {
    match raw {
        Value::Null => Ok(IndexSet::new()),
        Value::String(s) => Ok(split_flags(s)),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(property, "flags", raw))
            })
            .collect(),
        other => Err(invalid(property, "flags", other)),
    }
}

fn as_enum(
    property: &str,
    raw: &Value,
    declaration: Option<&EnumDeclaration>,
) -> Result<PropertyValue> {
    if let Some(decl) = declaration
        && decl.values_as_flags
        && decl.storage_type == EnumStorage::String
    {
        return Ok(PropertyValue::Flags(as_flags(property, raw)?));
    }

    match raw {
        Value::String(s) => Ok(PropertyValue::String(s.clone())),
        Value::Number(_) => Ok(PropertyValue::Int(as_int(property, raw)?)),
        Value::Null => Ok(match declaration.map(|d| d.storage_type) {
            Some(EnumStorage::Int) => PropertyValue::Int(0),
            _ => PropertyValue::String(String::new()),
        }),
        other => Err(invalid(property, "enum", other)),
    }
}

fn split_flags(s: &str) -> IndexSet<String> {
    s.split(',')
        .map(str::trim)
        .filter(|flag| !flag.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(property: &str, expected: &'static str, raw: &Value) -> ResolveError {
    ResolveError::InvalidValue {
        property: property.to_string(),
        expected,
        found: raw.to_string(),
    }
}
