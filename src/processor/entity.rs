//! Per-entity property resolution.
//!
//! An entity's properties are its class's flattened set, then its own
//! instance properties, then its intrinsic fields. Intrinsic fields are
//! structural and always win.

use serde_json::Value;

use super::coerce::coerce;
use super::flattener::Flattener;
use crate::error::{ResolveError, Result};
use crate::model::{
    Layer, MapObject, MemberDeclaration, MemberKind, PropertyValue, ResolvedEntityProperties,
    Tileset,
};

/// What to do when an entity names a class the project does not declare.
///
/// Only covers the entity's own class reference; broken hierarchies and
/// nested-member references always fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MissingClassPolicy {
    /// Fail the whole conversion.
    #[default]
    Abort,
    /// Resolve the entity as if it had no class.
    Empty,
    /// Leave the entity out of the output.
    Skip,
}

/// A map record that can carry a class and instance properties.
pub trait Entity {
    /// Short kind name used in diagnostics.
    const KIND: &'static str;

    /// Key the entity is stored under in the parsed result.
    fn key(&self) -> u32;

    fn class_name(&self) -> Option<&str>;

    fn properties(&self) -> &[MemberDeclaration];

    /// Structural fields written last, over any same-named property.
    fn intrinsics(&self) -> Vec<(&'static str, PropertyValue)>;
}

impl Entity for Layer {
    const KIND: &'static str = "layer";

    fn key(&self) -> u32 {
        self.id
    }

    fn class_name(&self) -> Option<&str> {
        Layer::class_name(self)
    }

    fn properties(&self) -> &[MemberDeclaration] {
        &self.properties
    }

    fn intrinsics(&self) -> Vec<(&'static str, PropertyValue)> {
        positioned(&self.name, self.id, &self.x, &self.y)
    }
}

impl Entity for MapObject {
    const KIND: &'static str = "object";

    fn key(&self) -> u32 {
        self.id
    }

    fn class_name(&self) -> Option<&str> {
        MapObject::class_name(self)
    }

    fn properties(&self) -> &[MemberDeclaration] {
        &self.properties
    }

    fn intrinsics(&self) -> Vec<(&'static str, PropertyValue)> {
        positioned(&self.name, self.id, &self.x, &self.y)
    }
}

impl Entity for Tileset {
    const KIND: &'static str = "tileset";

    fn key(&self) -> u32 {
        self.firstgid
    }

    fn class_name(&self) -> Option<&str> {
        Tileset::class_name(self)
    }

    fn properties(&self) -> &[MemberDeclaration] {
        &self.properties
    }

    fn intrinsics(&self) -> Vec<(&'static str, PropertyValue)> {
        let mut fields = Vec::with_capacity(2);
        if let Some(name) = &self.name {
            fields.push(("name", PropertyValue::String(name.clone())));
        }
        fields.push(("firstgid", PropertyValue::Int(i64::from(self.firstgid))));
        fields
    }
}

fn positioned(name: &str, id: u32, x: &Value, y: &Value) -> Vec<(&'static str, PropertyValue)> {
    let mut fields = vec![
        ("name", PropertyValue::String(name.to_string())),
        ("id", PropertyValue::Int(i64::from(id))),
    ];
    for (key, raw) in [("x", x), ("y", y)] {
        if let Some(v) = PropertyValue::infer(raw) {
            fields.push((key, v));
        }
    }
    fields
}

/// Resolves one entity. Returns `Ok(None)` only when `policy` is
/// [`MissingClassPolicy::Skip`] and the entity's class is undeclared.
///
/// The flattener's cache is only ever read or extended, never modified,
/// and the returned map is always a private copy.
pub fn resolve_entity<E: Entity>(
    entity: &E,
    flattener: &mut Flattener,
    policy: MissingClassPolicy,
) -> Result<Option<ResolvedEntityProperties>> {
    let mut props = match entity.class_name() {
        Some(class) => match flattener.resolve(class) {
            Ok(set) => set.clone(),
            Err(ResolveError::UnknownClass { name }) if name == class => match policy {
                MissingClassPolicy::Abort => return Err(ResolveError::UnknownClass { name }),
                MissingClassPolicy::Empty => {
                    tracing::warn!(
                        kind = E::KIND,
                        id = entity.key(),
                        class,
                        "undeclared class, resolving without it"
                    );
                    ResolvedEntityProperties::new()
                }
                MissingClassPolicy::Skip => {
                    tracing::warn!(
                        kind = E::KIND,
                        id = entity.key(),
                        class,
                        "undeclared class, skipping entity"
                    );
                    return Ok(None);
                }
            },
            Err(e) => return Err(e),
        },
        None => ResolvedEntityProperties::new(),
    };

    for property in entity.properties() {
        if let MemberKind::Class(nested) = &property.kind
            && flattener.project().classes.contains_key(nested)
        {
            flattener.resolve(nested)?;
        }
        let (name, value) = coerce(property, &*flattener)?;
        props.insert(name, value);
    }

    for (name, value) in entity.intrinsics() {
        props.insert(name.to_string(), value);
    }

    Ok(Some(props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDeclaration, Project};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn enemy_project() -> Flattener {
        let mut project = Project::default();
        project.classes.insert(
            "Enemy".into(),
            ClassDeclaration {
                name: "Enemy".into(),
                parent: None,
                members: vec![
                    MemberDeclaration {
                        name: "hp".into(),
                        kind: MemberKind::Int,
                        value: json!(20),
                    },
                    MemberDeclaration {
                        name: "name".into(),
                        kind: MemberKind::String,
                        value: json!("generic"),
                    },
                ],
            },
        );
        Flattener::new(project)
    }

    fn boss(class: &str) -> MapObject {
        serde_json::from_value(json!({
            "id": 4, "name": "boss", "type": class, "x": 10, "y": 20,
            "properties": [{ "name": "hp", "type": "int", "value": 5 }]
        }))
        .unwrap()
    }

    #[test]
    fn test_object_override_and_intrinsics() {
        let mut f = enemy_project();
        let props = resolve_entity(&boss("Enemy"), &mut f, MissingClassPolicy::Abort)
            .unwrap()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            json!({ "hp": 5, "name": "boss", "id": 4, "x": 10, "y": 20 })
        );
        // cached class set is untouched
        assert_eq!(f.get("Enemy").unwrap()["hp"], PropertyValue::Int(20));
    }

    #[test]
    fn test_repeat_resolution_is_equal() {
        let mut f = enemy_project();
        let obj = boss("Enemy");
        let first = resolve_entity(&obj, &mut f, MissingClassPolicy::Abort).unwrap();
        let second = resolve_entity(&obj, &mut f, MissingClassPolicy::Abort).unwrap();
        assert_eq!(first, second);
        assert_eq!(f.resolutions(), 1);
    }

    #[test]
    fn test_layer_ignores_its_type_field() {
        let mut f = enemy_project();
        let layer: Layer = serde_json::from_value(json!({
            "id": 2, "name": "baddies", "type": "Enemy", "x": 0, "y": 0
        }))
        .unwrap();
        let props = resolve_entity(&layer, &mut f, MissingClassPolicy::Abort)
            .unwrap()
            .unwrap();
        assert!(!props.contains_key("hp"));
        assert_eq!(f.resolutions(), 0);
    }

    #[test]
    fn test_missing_class_policies() {
        let mut f = enemy_project();
        let ghost = boss("Ghost");

        assert_eq!(
            resolve_entity(&ghost, &mut f, MissingClassPolicy::Abort).unwrap_err(),
            ResolveError::UnknownClass {
                name: "Ghost".into()
            }
        );

        let empty = resolve_entity(&ghost, &mut f, MissingClassPolicy::Empty)
            .unwrap()
            .unwrap();
        assert_eq!(empty["hp"], PropertyValue::Int(5));
        assert_eq!(empty.len(), 5);

        assert_eq!(
            resolve_entity(&ghost, &mut f, MissingClassPolicy::Skip).unwrap(),
            None
        );
    }

    #[test]
    fn test_tileset_keyed_by_firstgid() {
        let mut f = enemy_project();
        let tileset: Tileset = serde_json::from_value(json!({
            "firstgid": 33, "name": "monsters", "class": "Enemy"
        }))
        .unwrap();
        assert_eq!(tileset.key(), 33);
        let props = resolve_entity(&tileset, &mut f, MissingClassPolicy::Abort)
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            json!({ "hp": 20, "name": "monsters", "firstgid": 33 })
        );
    }
}
