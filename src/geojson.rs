//! Minimal GeoJSON reading for feature collections.

use anyhow::{Context, Result, anyhow, bail};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::Value as Json;

use crate::feature::{Feature, Value};

/// Read the features of a GeoJSON FeatureCollection. Features without an id
/// are named `{prefix}.{n}`, counting from one.
pub fn parse_feature_collection(value: &Json, prefix: &str) -> Result<Vec<Feature>> {
    let features = value
        .get("features")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("feature collection missing features array"))?;
    features
        .iter()
        .enumerate()
        .map(|(idx, feature)| {
            parse_feature(feature, prefix, idx).with_context(|| format!("parse feature {idx}"))
        })
        .collect()
}

fn parse_feature(value: &Json, prefix: &str, idx: usize) -> Result<Feature> {
    let id = match value.get("id") {
        Some(Json::String(text)) => text.clone(),
        Some(Json::Number(number)) => number.to_string(),
        _ => format!("{prefix}.{}", idx + 1),
    };
    let geometry = parse_geometry(
        value
            .get("geometry")
            .ok_or_else(|| anyhow!("feature missing geometry"))?,
    )?;
    let mut feature = Feature::new(id, geometry);
    if let Some(properties) = value.get("properties").and_then(|v| v.as_object()) {
        for (key, raw) in properties {
            if let Some(parsed) = Value::from_json(raw) {
                feature.properties.insert(key.clone(), parsed);
            }
        }
    }
    Ok(feature)
}

pub fn parse_geometry(value: &Json) -> Result<Geometry<f64>> {
    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("geometry missing type"))?;
    if kind == "GeometryCollection" {
        let members = value
            .get("geometries")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("geometry collection missing geometries"))?
            .iter()
            .map(parse_geometry)
            .collect::<Result<Vec<_>>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection::from(members)));
    }

    let coords = value
        .get("coordinates")
        .ok_or_else(|| anyhow!("{kind} missing coordinates"))?;
    let geometry = match kind {
        "Point" => Geometry::Point(Point(parse_coord(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint::new(
            items(coords)?
                .iter()
                .map(|c| parse_coord(c).map(Point))
                .collect::<Result<Vec<_>>>()?,
        )),
        "LineString" => Geometry::LineString(parse_line(coords)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            items(coords)?
                .iter()
                .map(parse_line)
                .collect::<Result<Vec<_>>>()?,
        )),
        "Polygon" => Geometry::Polygon(parse_polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            items(coords)?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => bail!("unsupported geometry type: {other}"),
    };
    Ok(geometry)
}

fn items(value: &Json) -> Result<&Vec<Json>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("expected coordinate array"))
}

fn parse_coord(value: &Json) -> Result<Coord<f64>> {
    let pair = items(value)?;
    let x = pair.first().and_then(|v| v.as_f64());
    let y = pair.get(1).and_then(|v| v.as_f64());
    match (x, y) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => bail!("expected [x, y] position"),
    }
}

fn parse_line(value: &Json) -> Result<LineString<f64>> {
    Ok(LineString::new(
        items(value)?
            .iter()
            .map(parse_coord)
            .collect::<Result<Vec<_>>>()?,
    ))
}

fn parse_polygon(value: &Json) -> Result<Polygon<f64>> {
    let mut rings = items(value)?
        .iter()
        .map(parse_line)
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| anyhow!("polygon without exterior ring"))?;
    Ok(Polygon::new(exterior, rings.collect()))
}
