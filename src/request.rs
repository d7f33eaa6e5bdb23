use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use geo_types::{Coord, Rect};
use serde_json::Value as Json;

use crate::crs::Crs;
use crate::feature::{FeatureSource, MemorySource};
use crate::filter::{Filter, parse_filter};
use crate::geojson::parse_feature_collection;
use crate::style::{Style, parse_style};

/// One layer of a map request, already resolved against the catalog.
pub struct LayerRequest {
    /// Feature type name, also used as the `<map>` name.
    pub name: String,
    pub source: Box<dyn FeatureSource>,
    /// Native CRS of the source.
    pub crs: Crs,
    /// Ancestor type names, matched by style groups as well.
    pub super_types: Vec<String>,
    pub style: Style,
    /// Restriction applied to every query of this layer.
    pub definition: Option<Filter>,
}

impl std::fmt::Debug for LayerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRequest")
            .field("name", &self.name)
            .field("crs", &self.crs)
            .field("super_types", &self.super_types)
            .field("style", &self.style)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

impl LayerRequest {
    pub fn new(
        name: impl Into<String>,
        source: impl FeatureSource + 'static,
        style: Style,
    ) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
            crs: Crs::wgs84(),
            super_types: Vec::new(),
            style,
            definition: None,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_super_types(mut self, super_types: Vec<String>) -> Self {
        self.super_types = super_types;
        self
    }

    pub fn with_definition(mut self, definition: Filter) -> Self {
        self.definition = Some(definition);
        self
    }
}

#[derive(Debug)]
pub struct MapRequest {
    pub bbox: Rect<f64>,
    pub crs: Crs,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<LayerRequest>,
}

impl MapRequest {
    pub fn new(bbox: Rect<f64>, crs: Crs, width: u32, height: u32) -> Self {
        Self {
            bbox,
            crs,
            width,
            height,
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: LayerRequest) -> Self {
        self.layers.push(layer);
        self
    }
}

pub fn read_request(path: &Path) -> Result<MapRequest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read request file: {}", path.display()))?;
    let value: Json = serde_json::from_str(&contents).context("parse request json")?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_request(&value, base)
}

/// Build a request from JSON. Relative style and feature paths resolve
/// against `base`.
pub fn parse_request(value: &Json, base: &Path) -> Result<MapRequest> {
    let bbox = parse_bbox(value.get("bbox").ok_or_else(|| anyhow!("request missing bbox"))?)?;
    let crs = match value.get("crs") {
        Some(raw) => parse_crs(raw)?,
        None => Crs::wgs84(),
    };
    let width = parse_dimension(value, "width")?;
    let height = parse_dimension(value, "height")?;

    let mut request = MapRequest::new(bbox, crs, width, height);
    let layers = value
        .get("layers")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("request missing layers array"))?;
    for (idx, layer) in layers.iter().enumerate() {
        let layer = parse_layer(layer, &request.crs, base)
            .with_context(|| format!("parse layer {idx}"))?;
        request.layers.push(layer);
    }
    Ok(request)
}

fn parse_layer(value: &Json, default_crs: &Crs, base: &Path) -> Result<LayerRequest> {
    let name = value
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("layer missing name"))?
        .to_string();
    let crs = match value.get("crs") {
        Some(raw) => parse_crs(raw)?,
        None => default_crs.clone(),
    };
    let super_types = value
        .get("super_types")
        .and_then(|v| v.as_array())
        .map(|names| {
            names
                .iter()
                .filter_map(|name| name.as_str())
                .map(|name| name.to_string())
                .collect()
        })
        .unwrap_or_default();
    let definition = match value.get("definition") {
        None | Some(Json::Null) => None,
        Some(raw) => Some(parse_filter(raw).unwrap_or(Filter::Unknown)),
    };
    let style_json = resolve(
        value.get("style").ok_or_else(|| anyhow!("layer missing style"))?,
        base,
    )?;
    let style = parse_style(&style_json).context("parse style")?;
    let features_json = resolve(
        value
            .get("features")
            .ok_or_else(|| anyhow!("layer missing features"))?,
        base,
    )?;
    let features = parse_feature_collection(&features_json, &name)?;

    Ok(LayerRequest {
        name,
        source: Box::new(MemorySource::new(features)),
        crs,
        super_types,
        style,
        definition,
    })
}

/// Inline JSON is used as is; a string is a path to a JSON file.
fn resolve(value: &Json, base: &Path) -> Result<Json> {
    match value.as_str() {
        Some(relative) => {
            let path = base.join(relative);
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
        }
        None => Ok(value.clone()),
    }
}

fn parse_bbox(value: &Json) -> Result<Rect<f64>> {
    let coords: Option<Vec<f64>> = value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_f64()).collect());
    match coords.as_deref() {
        Some([min_x, min_y, max_x, max_y]) => Ok(Rect::new(
            Coord { x: *min_x, y: *min_y },
            Coord { x: *max_x, y: *max_y },
        )),
        _ => bail!("bbox must be [min_x, min_y, max_x, max_y]"),
    }
}

pub fn parse_crs(value: &Json) -> Result<Crs> {
    if let Some(code) = value.as_str() {
        return Crs::from_code(code).ok_or_else(|| anyhow!("unknown CRS code: {code}"));
    }
    let code = value
        .get("code")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("crs missing code"))?;
    match value.get("proj").and_then(|v| v.as_str()) {
        Some(proj) => Ok(Crs::new(code, proj)),
        None => Crs::from_code(code).ok_or_else(|| anyhow!("unknown CRS code: {code}")),
    }
}

fn parse_dimension(value: &Json, key: &str) -> Result<u32> {
    let raw = value
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| anyhow!("request missing {key}"))?;
    u32::try_from(raw).with_context(|| format!("{key} out of range: {raw}"))
}
