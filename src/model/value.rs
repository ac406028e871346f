//! Resolved, typed property values.

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Property name -> resolved value, in insertion order.
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// The fully resolved properties of one class. Cached by the flattener and
/// never mutated afterwards; clone it to get a private copy.
pub type FlattenedPropertySet = PropertyMap;

/// A class's flattened set further overridden by one entity's instance
/// properties and intrinsic fields.
pub type ResolvedEntityProperties = PropertyMap;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `None` is Tiled's "unset" colour (an empty string in the source).
    Color(Option<Color>),
    File(String),
    /// Object reference by id, 0 meaning "no object".
    ObjectRef(u32),
    /// Flag-style enum stored as strings.
    Flags(IndexSet<String>),
    Class(PropertyMap),
}

impl PropertyValue {
    /// Best-effort typing of a raw JSON value with no declared kind.
    pub fn infer(raw: &Value) -> Option<Self> {
        match raw {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64()?),
            }),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Object(members) => {
                let mut map = PropertyMap::with_capacity(members.len());
                for (name, value) in members {
                    if let Some(v) = Self::infer(value) {
                        map.insert(name.clone(), v);
                    }
                }
                Some(Self::Class(map))
            }
            Value::Null | Value::Array(_) => None,
        }
    }

    /// Short human name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Color(_) => "color",
            Self::File(_) => "file",
            Self::ObjectRef(_) => "object",
            Self::Flags(_) => "flags",
            Self::Class(_) => "class",
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) | Self::File(s) => serializer.serialize_str(s),
            Self::Color(Some(c)) => serializer.collect_str(c),
            Self::Color(None) => serializer.serialize_str(""),
            Self::ObjectRef(id) => serializer.serialize_u32(*id),
            Self::Flags(flags) => {
                let mut seq = serializer.serialize_seq(Some(flags.len()))?;
                for flag in flags {
                    seq.serialize_element(flag)?;
                }
                seq.end()
            }
            Self::Class(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (k, v) in members {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// ARGB colour. Displays as Tiled's `#aarrggbb`, lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub alpha: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a #RRGGBB or #AARRGGBB colour")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());

        match hex.len() {
            6 => Ok(Color {
                alpha: 0xff,
                red: byte(0)?,
                green: byte(2)?,
                blue: byte(4)?,
            }),
            8 => Ok(Color {
                alpha: byte(0)?,
                red: byte(2)?,
                green: byte(4)?,
                blue: byte(6)?,
            }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.alpha, self.red, self.green, self.blue
        )
    }
}
