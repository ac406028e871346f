use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::{ClassDeclaration, EnumDeclaration, MapDocument, MemberDeclaration, MemberKind, Project};

/// Name of the member that declares a class's parent when the project file
/// has no top-level `extends` key for it.
const EXTENDS_MEMBER: &str = "extends";

/// Parse a `.tiled-project` document into its class and enum declarations.
///
/// Only the top-level `propertyTypes` array is read. Entries whose `type`
/// is neither `class` nor `enum` are skipped.
pub fn load_project(json: &str) -> Result<Project> {
    let root: Value = serde_json::from_str(json).context("project file is not valid JSON")?;

    let types = match root.get("propertyTypes") {
        Some(v) => v
            .as_array()
            .ok_or_else(|| anyhow!("`propertyTypes` is not an array"))?,
        None => {
            warn!("project file has no `propertyTypes`; no classes declared");
            return Ok(Project::default());
        }
    };

    let mut project = Project::default();

    for (i, entry) in types.iter().enumerate() {
        let kind = entry.get("type").and_then(Value::as_str).unwrap_or("class");
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("property type {i} missing `name`"))?;

        match kind {
            "class" => {
                let class = parse_class(entry).with_context(|| format!("class `{name}`"))?;
                if project.classes.insert(name.to_string(), class).is_some() {
                    warn!(class = name, "class declared twice, keeping the later one");
                }
            }
            "enum" => {
                let decl: EnumDeclaration = serde_json::from_value(entry.clone())
                    .with_context(|| format!("enum `{name}`"))?;
                project.enums.insert(name.to_string(), decl);
            }
            other => warn!(name, kind = other, "ignoring unsupported property type"),
        }
    }

    info!(
        classes = project.classes.len(),
        enums = project.enums.len(),
        "project parsed"
    );
    Ok(project)
}

fn parse_class(entry: &Value) -> Result<ClassDeclaration> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut members: Vec<MemberDeclaration> = match entry.get("members") {
        Some(raw) => serde_json::from_value(raw.clone())?,
        None => Vec::new(),
    };

    // An `extends` string member is a parent reference, not a property.
    let mut parent = None;
    members.retain(|m| {
        if m.name == EXTENDS_MEMBER && m.kind == MemberKind::String {
            parent = m.value.as_str().map(str::to_string);
            false
        } else {
            true
        }
    });

    if let Some(explicit) = entry.get("extends") {
        parent = Some(
            explicit
                .as_str()
                .ok_or_else(|| anyhow!("`extends` must be a class name"))?
                .to_string(),
        );
    }
    let parent = parent.filter(|p| !p.is_empty());

    debug!(class = %name, parent = ?parent, members = members.len(), "class declared");
    Ok(ClassDeclaration {
        name,
        parent,
        members,
    })
}

/// Parse a map document (`.tmj`) into its layers and tilesets.
pub fn load_map(json: &str) -> Result<MapDocument> {
    let root: Value = serde_json::from_str(json).context("map file is not valid JSON")?;

    if !root.get("layers").is_some_and(Value::is_array) {
        return Err(anyhow!("map file has no `layers` array"));
    }

    let map: MapDocument = serde_json::from_value(root)?;
    info!(
        layers = map.layers.len(),
        tilesets = map.tilesets.len(),
        "map parsed"
    );
    Ok(map)
}
