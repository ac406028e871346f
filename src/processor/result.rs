//! Collected per-entity properties, ready to be written out.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::model::ResolvedEntityProperties;

pub type IdToProperties = IndexMap<u32, ResolvedEntityProperties>;

/// Layers and objects are keyed by id, tilesets by their first global
/// tile id. All three keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedResult {
    layers: IdToProperties,
    objects: IdToProperties,
    tilesets: IdToProperties,
}

impl ParsedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_layer(&mut self, id: u32, props: ResolvedEntityProperties) {
        self.layers.insert(id, props);
    }

    pub fn insert_object(&mut self, id: u32, props: ResolvedEntityProperties) {
        self.objects.insert(id, props);
    }

    pub fn insert_tileset(&mut self, firstgid: u32, props: ResolvedEntityProperties) {
        self.tilesets.insert(firstgid, props);
    }

    /// Entry counts of layers, objects and tilesets.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.layers.len(), self.objects.len(), self.tilesets.len())
    }

    /// Independent copy of the layer map.
    pub fn layers(&self) -> IdToProperties {
        self.layers.clone()
    }

    /// Independent copy of the object map.
    pub fn objects(&self) -> IdToProperties {
        self.objects.clone()
    }

    /// Independent copy of the tileset map.
    pub fn tilesets(&self) -> IdToProperties {
        self.tilesets.clone()
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// UTF-8 JSON with `layers`, `objects` and `tilesets` at the top level.
    /// Pretty output is indented by four spaces.
    pub fn to_document(&self, pretty: bool) -> serde_json::Result<Vec<u8>> {
        if !pretty {
            return serde_json::to_vec(self);
        }
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(
            &mut out,
            PrettyFormatter::with_indent(b"    "),
        );
        self.serialize(&mut ser)?;
        Ok(out)
    }
}
