//! Declarations and entities as they come out of the JSON loader.
//!
//! Everything here is immutable once parsed. Class hierarchies are kept
//! by name, never by reference, so a cyclic project file cannot create a
//! cyclic structure in memory.

pub mod value;

pub use value::{
    Color, FlattenedPropertySet, PropertyMap, PropertyValue, ResolvedEntityProperties,
};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Declared kind of a member or instance property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    String,
    Int,
    Float,
    Bool,
    Color,
    File,
    Object,
    /// A `string` or `int` property whose `propertyType` names an enum.
    Enum(String),
    /// Nested class-typed member.
    Class(String),
}

impl MemberKind {
    /// Builds the kind from Tiled's `type` + `propertyType` pair.
    pub fn from_tiled(kind: &str, property_type: Option<&str>) -> Result<Self, String> {
        let property_type = property_type.filter(|p| !p.is_empty());
        Ok(match (kind, property_type) {
            ("class", Some(class)) => MemberKind::Class(class.to_string()),
            ("class", None) => return Err("class-typed property without `propertyType`".into()),
            ("string" | "int", Some(enumeration)) => MemberKind::Enum(enumeration.to_string()),
            ("string", None) => MemberKind::String,
            ("int", None) => MemberKind::Int,
            ("float", _) => MemberKind::Float,
            ("bool", _) => MemberKind::Bool,
            ("color", _) => MemberKind::Color,
            ("file", _) => MemberKind::File,
            ("object", _) => MemberKind::Object,
            (other, _) => return Err(format!("unknown property type `{other}`")),
        })
    }
}

/// On-disk shape shared by class members (project file) and instance
/// properties (map file). The two files disagree on the casing of
/// `propertyType`, so both are accepted.
#[derive(Debug, Deserialize)]
pub struct RawProperty {
    name: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    value: Value,
    #[serde(default, rename = "propertytype", alias = "propertyType")]
    property_type: Option<String>,
}

fn default_kind() -> String {
    "string".to_string()
}

/// One property declared on a class, or set on an entity instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawProperty")]
pub struct MemberDeclaration {
    pub name: String,
    pub kind: MemberKind,
    pub value: Value,
}

impl TryFrom<RawProperty> for MemberDeclaration {
    type Error = String;

    fn try_from(raw: RawProperty) -> Result<Self, Self::Error> {
        let kind = MemberKind::from_tiled(&raw.kind, raw.property_type.as_deref())
            .map_err(|e| format!("property `{}`: {e}", raw.name))?;
        Ok(MemberDeclaration {
            name: raw.name,
            kind,
            value: raw.value,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub name: String,
    pub parent: Option<String>,
    pub members: Vec<MemberDeclaration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumStorage {
    #[default]
    String,
    Int,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDeclaration {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub storage_type: EnumStorage,
    #[serde(default)]
    pub values_as_flags: bool,
}

/// Every custom type declared by the project file, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub classes: IndexMap<String, ClassDeclaration>,
    pub enums: IndexMap<String, EnumDeclaration>,
}

/// ─────────────────────────────────────────────────────
/// Map document entities
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapDocument {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Layer {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Layer kind (`tilelayer`, `objectgroup`, `group`, ...). Unrelated to
    /// the class, despite objects using the same key for their class.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub class: String,
    #[serde(default = "zero")]
    pub x: Value,
    #[serde(default = "zero")]
    pub y: Value,
    #[serde(default)]
    pub properties: Vec<MemberDeclaration>,
    /// Children of a `group` layer.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Contents of an `objectgroup` layer.
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

impl Layer {
    /// Class reference of a layer lives in `class`.
    pub fn class_name(&self) -> Option<&str> {
        non_empty(&self.class)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapObject {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub class_type: String,
    /// Written instead of `type` by Tiled 1.9.
    #[serde(default)]
    pub class: String,
    #[serde(default = "zero")]
    pub x: Value,
    #[serde(default = "zero")]
    pub y: Value,
    #[serde(default)]
    pub properties: Vec<MemberDeclaration>,
}

impl MapObject {
    /// Class reference of an object lives in `type`.
    pub fn class_name(&self) -> Option<&str> {
        non_empty(&self.class_type).or_else(|| non_empty(&self.class))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tileset {
    pub firstgid: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub class: String,
    /// Set on external tilesets, which carry nothing else inline.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub properties: Vec<MemberDeclaration>,
}

impl Tileset {
    pub fn class_name(&self) -> Option<&str> {
        non_empty(&self.class)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

fn zero() -> Value {
    Value::from(0)
}
