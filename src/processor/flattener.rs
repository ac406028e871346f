//! Class flattening: own members layered over everything inherited.
//!
//! Each class is computed once and cached by name. Own member declarations
//! always overwrite inherited ones, at any depth of the hierarchy, and
//! within one class the last declaration of a name wins.
//!
//! Resolution recurses into the parent and into classes referenced by
//! nested members before touching the class itself. An explicit
//! in-progress stack guards both, so a cyclic hierarchy becomes an error
//! instead of unbounded recursion.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::coerce::{ClassLookup, coerce};
use crate::error::{ResolveError, Result};
use crate::model::{ClassDeclaration, EnumDeclaration, FlattenedPropertySet, MemberKind, Project};

/// Owns the class declarations of one project and the memoisation cache
/// derived from them. Build one per conversion.
#[derive(Debug)]
pub struct Flattener {
    project: Project,
    cache: IndexMap<String, FlattenedPropertySet>,
    in_progress: IndexSet<String>,
    resolutions: usize,
}

impl Flattener {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            cache: IndexMap::new(),
            in_progress: IndexSet::new(),
            resolutions: 0,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Number of classes actually computed, cache hits excluded.
    pub fn resolutions(&self) -> usize {
        self.resolutions
    }

    /// Already flattened set for `name`, if it has been resolved.
    pub fn get(&self, name: &str) -> Option<&FlattenedPropertySet> {
        self.cache.get(name)
    }

    /// Resolves every declared class, in declaration order.
    ///
    /// After this returns `Ok`, [`Flattener::get`] answers for every class,
    /// so the flattener can be shared read-only.
    pub fn resolve_all(&mut self) -> Result<()> {
        let names: Vec<String> = self.project.classes.keys().cloned().collect();
        for name in names {
            self.resolve(&name)?;
        }
        Ok(())
    }

    /// Flattened properties of `class_name`, computing and caching them on
    /// first use.
    pub fn resolve(&mut self, class_name: &str) -> Result<&FlattenedPropertySet> {
        self.ensure(class_name)?;
        self.cache
            .get(class_name)
            .ok_or_else(|| ResolveError::UnknownClass {
                name: class_name.to_string(),
            })
    }

    fn ensure(&mut self, class_name: &str) -> Result<()> {
        if self.cache.contains_key(class_name) {
            debug!(class = class_name, "cache hit");
            return Ok(());
        }

        if self.in_progress.contains(class_name) {
            let mut chain: Vec<String> = self
                .in_progress
                .iter()
                .skip_while(|name| name.as_str() != class_name)
                .cloned()
                .collect();
            chain.push(class_name.to_string());
            return Err(ResolveError::CyclicInheritance { chain });
        }

        let Some(decl) = self.project.classes.get(class_name).cloned() else {
            return Err(ResolveError::UnknownClass {
                name: class_name.to_string(),
            });
        };

        self.in_progress.insert(class_name.to_string());
        let computed = self.compute(&decl);
        self.in_progress.shift_remove(class_name);

        let flattened = computed?;
        self.resolutions += 1;
        debug!(
            class = class_name,
            properties = flattened.len(),
            "class flattened"
        );
        self.cache.insert(class_name.to_string(), flattened);
        Ok(())
    }

    fn compute(&mut self, decl: &ClassDeclaration) -> Result<FlattenedPropertySet> {
        let mut result = match &decl.parent {
            Some(parent) => self.resolve(parent)?.clone(),
            None => FlattenedPropertySet::new(),
        };

        // Nested classes must be cached before coercion reads them.
        // Undeclared ones are left for coercion to report.
        for member in &decl.members {
            if let MemberKind::Class(nested) = &member.kind
                && self.project.classes.contains_key(nested)
            {
                self.ensure(nested)?;
            }
        }

        for member in &decl.members {
            let (name, value) = coerce(member, &*self)?;
            result.insert(name, value);
        }

        Ok(result)
    }
}

impl ClassLookup for Flattener {
    fn class(&self, name: &str) -> Option<&FlattenedPropertySet> {
        self.cache.get(name)
    }

    fn enumeration(&self, name: &str) -> Option<&EnumDeclaration> {
        self.project.enums.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberDeclaration, PropertyValue};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn int(name: &str, value: i64) -> MemberDeclaration {
        MemberDeclaration {
            name: name.into(),
            kind: MemberKind::Int,
            value: json!(value),
        }
    }

    fn nested(name: &str, class: &str, value: Value) -> MemberDeclaration {
        MemberDeclaration {
            name: name.into(),
            kind: MemberKind::Class(class.into()),
            value,
        }
    }

    fn class(name: &str, parent: Option<&str>, members: Vec<MemberDeclaration>) -> ClassDeclaration {
        ClassDeclaration {
            name: name.into(),
            parent: parent.map(str::to_string),
            members,
        }
    }

    fn flattener(classes: Vec<ClassDeclaration>) -> Flattener {
        let mut project = Project::default();
        for c in classes {
            project.classes.insert(c.name.clone(), c);
        }
        Flattener::new(project)
    }

    fn props(pairs: &[(&str, i64)]) -> FlattenedPropertySet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PropertyValue::Int(*v)))
            .collect()
    }

    #[test]
    fn test_root_class_has_only_own_members() {
        let mut f = flattener(vec![
            class("A", None, vec![int("hp", 10), int("mp", 3)]),
            class("Other", None, vec![int("unrelated", 1)]),
        ]);
        assert_eq!(f.resolve("A").unwrap(), &props(&[("hp", 10), ("mp", 3)]));
    }

    #[test]
    fn test_own_members_override_parent() {
        // declaration order of the child must not matter
        let mut f = flattener(vec![
            class("B", Some("A"), vec![int("speed", 9), int("hp", 99)]),
            class("A", None, vec![int("hp", 1), int("speed", 1), int("armor", 2)]),
        ]);
        let b = f.resolve("B").unwrap();
        assert_eq!(b["hp"], PropertyValue::Int(99));
        assert_eq!(b["speed"], PropertyValue::Int(9));
        assert_eq!(b["armor"], PropertyValue::Int(2));
    }

    #[test]
    fn test_three_level_chain() {
        let mut f = flattener(vec![
            class("A", None, vec![int("hp", 10)]),
            class("B", Some("A"), vec![int("hp", 20), int("speed", 5)]),
            class("C", Some("B"), vec![int("speed", 7)]),
        ]);
        assert_eq!(f.resolve("C").unwrap(), &props(&[("hp", 20), ("speed", 7)]));
    }

    #[test]
    fn test_last_declaration_wins_within_class() {
        let mut f = flattener(vec![class("A", None, vec![int("hp", 1), int("hp", 2)])]);
        assert_eq!(f.resolve("A").unwrap(), &props(&[("hp", 2)]));
    }

    #[test]
    fn test_self_parent_is_cyclic() {
        let mut f = flattener(vec![class("A", Some("A"), vec![int("hp", 1)])]);
        assert_eq!(
            f.resolve("A").unwrap_err(),
            ResolveError::CyclicInheritance {
                chain: vec!["A".into(), "A".into()]
            }
        );
    }

    #[test]
    fn test_long_cycle_is_reported_not_overflowed() {
        let mut f = flattener(vec![
            class("A", Some("C"), vec![]),
            class("B", Some("A"), vec![]),
            class("C", Some("B"), vec![]),
        ]);
        let err = f.resolve("A").unwrap_err();
        assert_eq!(
            err,
            ResolveError::CyclicInheritance {
                chain: vec!["A".into(), "C".into(), "B".into(), "A".into()]
            }
        );
        // nothing half-built was cached, and a retry fails the same way
        assert!(f.get("A").is_none());
        assert!(matches!(
            f.resolve("B"),
            Err(ResolveError::CyclicInheritance { .. })
        ));
    }

    #[test]
    fn test_unknown_parent() {
        let mut f = flattener(vec![class("A", Some("Ghost"), vec![])]);
        assert_eq!(
            f.resolve("A").unwrap_err(),
            ResolveError::UnknownClass {
                name: "Ghost".into()
            }
        );
        assert_eq!(
            f.resolve("Nope").unwrap_err(),
            ResolveError::UnknownClass {
                name: "Nope".into()
            }
        );
    }

    #[test]
    fn test_memoised() {
        let mut f = flattener(vec![
            class("A", None, vec![int("hp", 10)]),
            class("B", Some("A"), vec![int("speed", 5)]),
        ]);
        let first = f.resolve("B").unwrap().clone();
        assert_eq!(f.resolutions(), 2);

        let second = f.resolve("B").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(f.resolutions(), 2);

        // the parent was cached on the way
        f.resolve("A").unwrap();
        assert_eq!(f.resolutions(), 2);
    }

    #[test]
    fn test_resolve_all_fills_cache() {
        let mut f = flattener(vec![
            class("C", Some("B"), vec![int("c", 3)]),
            class("B", Some("A"), vec![int("b", 2)]),
            class("A", None, vec![int("a", 1)]),
        ]);
        f.resolve_all().unwrap();
        assert_eq!(f.resolutions(), 3);
        assert_eq!(f.get("C").unwrap(), &props(&[("a", 1), ("b", 2), ("c", 3)]));
    }

    #[test]
    fn test_nested_class_member() {
        let mut f = flattener(vec![
            class("Enemy", None, vec![nested("stats", "Stats", json!({ "hp": 40 }))]),
            class("Stats", None, vec![int("hp", 10), int("mp", 5)]),
        ]);
        let enemy = f.resolve("Enemy").unwrap();
        assert_eq!(
            enemy["stats"],
            PropertyValue::Class(props(&[("hp", 40), ("mp", 5)]))
        );
        assert_eq!(f.get("Stats").unwrap(), &props(&[("hp", 10), ("mp", 5)]));
    }

    #[test]
    fn test_nested_self_reference_is_cyclic() {
        let mut f = flattener(vec![class("Node", None, vec![nested("next", "Node", json!({}))])]);
        assert!(matches!(
            f.resolve("Node"),
            Err(ResolveError::CyclicInheritance { .. })
        ));
    }

    #[test]
    fn test_nested_undeclared_class() {
        let mut f = flattener(vec![class("A", None, vec![nested("s", "Missing", Value::Null)])]);
        assert_eq!(
            f.resolve("A").unwrap_err(),
            ResolveError::UnresolvedClassReference {
                property: "s".into(),
                class: "Missing".into()
            }
        );
    }
}
