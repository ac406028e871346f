//! The functional core: class flattening and per-entity resolution.
pub mod coerce;
pub mod entity;
pub mod flattener;
pub mod result;

pub use entity::{Entity, MissingClassPolicy, resolve_entity};
pub use flattener::Flattener;
pub use result::ParsedResult;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::{Layer, MapDocument, Project};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub on_missing_class: MissingClassPolicy,
}

/// Resolves every layer, object and tileset of `map` against `project`.
///
/// Classes are all flattened up front, so a broken hierarchy fails the run
/// even if no entity uses it.
pub fn run(project: Project, map: &MapDocument, options: &ConvertOptions) -> Result<ParsedResult> {
    let mut flattener = Flattener::new(project);
    flattener
        .resolve_all()
        .context("Flattening project classes")?;

    let mut result = ParsedResult::new();

    let mut layers = Vec::new();
    collect_layers(&map.layers, &mut layers);

    for layer in &layers {
        if let Some(props) = resolve(*layer, &mut flattener, options)? {
            result.insert_layer(layer.id, props);
        }
    }
    for layer in &layers {
        for object in &layer.objects {
            if let Some(props) = resolve(object, &mut flattener, options)? {
                result.insert_object(object.id, props);
            }
        }
    }
    for tileset in &map.tilesets {
        if tileset.source.is_some() && tileset.name.is_none() {
            tracing::debug!(firstgid = tileset.firstgid, "external tileset, no inline properties");
        }
        if let Some(props) = resolve(tileset, &mut flattener, options)? {
            result.insert_tileset(tileset.firstgid, props);
        }
    }

    info!(
        classes = flattener.resolutions(),
        layers = result.counts().0,
        objects = result.counts().1,
        tilesets = result.counts().2,
        "map resolved"
    );
    Ok(result)
}

/// Depth-first, each group before its children.
fn collect_layers<'a>(layers: &'a [Layer], out: &mut Vec<&'a Layer>) {
    for layer in layers {
        out.push(layer);
        collect_layers(&layer.layers, out);
    }
}

fn resolve<E: Entity>(
    entity: &E,
    flattener: &mut Flattener,
    options: &ConvertOptions,
) -> Result<Option<crate::model::ResolvedEntityProperties>> {
    resolve_entity(entity, flattener, options.on_missing_class)
        .with_context(|| format!("Resolving {} {}", E::KIND, entity.key()))
}
