//! Shape encoders, one per geometry kind.
//!
//! Every encoder takes an already clipped geometry plus the parameters of the
//! matched symbolizers and yields one [`ShapeDescriptor`] per geometry
//! component. Failures stay local to the component that raised them.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use geo_types::{Coord, Geometry, LineString, Point, Polygon};

use crate::buffer::buffer_line;
use crate::error::EncodeError;
use crate::feature::Feature;
use crate::mapper::CoordinateMapper;
use crate::simplify::{decimate_polygon, remove_holes};
use crate::style::{DEFAULT_MARK, Rule, Symbolizer};

/// Circle radius in pixels when no point symbolizer matched.
pub const DEFAULT_RADIUS: f64 = 6.0;
/// Stroke width in pixels when no line symbolizer matched.
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;
/// Attribute key for labels of unnamed rules.
pub const DEFAULT_ATTRIBUTE: &str = "title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Poly,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Poly => "poly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDescriptor {
    pub kind: ShapeKind,
    pub id: String,
    pub coords: String,
    pub attributes: BTreeMap<String, String>,
}

/// Symbolizer parameters collected from the rules matched by one feature.
/// Later rules override earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeStyle {
    pub mark: Option<(String, f64)>,
    pub line_width: Option<f64>,
    pub attributes: BTreeMap<String, String>,
}

impl ShapeStyle {
    pub fn from_rules(rules: &[&Rule], feature: &Feature) -> Self {
        let mut style = ShapeStyle::default();
        for rule in rules {
            for symbolizer in &rule.symbolizers {
                match symbolizer {
                    Symbolizer::Point { mark, size } => style.mark = Some((mark.clone(), *size)),
                    Symbolizer::Line { width } => style.line_width = Some(*width),
                    Symbolizer::Polygon => {}
                    Symbolizer::Text { label } => {
                        let text = label.evaluate_text(feature);
                        if !text.is_empty() {
                            let key = rule.name.as_deref().unwrap_or(DEFAULT_ATTRIBUTE);
                            style.attributes.insert(key.to_string(), text);
                        }
                    }
                }
            }
        }
        style
    }

    fn mark(&self) -> (&str, f64) {
        match &self.mark {
            Some((mark, size)) => (mark.as_str(), *size),
            None => (DEFAULT_MARK, DEFAULT_RADIUS),
        }
    }
}

/// One encoded unit: the id it was encoded under and its outcome.
pub type EncodedUnit = (String, Result<ShapeDescriptor, EncodeError>);

/// Encode `geometry` as image map shapes. Multi-part geometries and
/// collections yield one unit per component with ids suffixed `.0`, `.1`...
pub fn encode_geometry(
    id: &str,
    geometry: &Geometry<f64>,
    style: &ShapeStyle,
    mapper: &CoordinateMapper,
) -> Vec<EncodedUnit> {
    match geometry {
        Geometry::Point(point) => {
            vec![unit(id.to_string(), |id| encode_point(id, point, style, mapper))]
        }
        Geometry::MultiPoint(points) => points
            .iter()
            .enumerate()
            .map(|(idx, point)| {
                unit(format!("{id}.{idx}"), |id| encode_point(id, point, style, mapper))
            })
            .collect(),
        Geometry::LineString(line) => {
            vec![unit(id.to_string(), |id| encode_line(id, line, style, mapper))]
        }
        Geometry::MultiLineString(lines) => lines
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                unit(format!("{id}.{idx}"), |id| encode_line(id, line, style, mapper))
            })
            .collect(),
        Geometry::Polygon(polygon) => {
            vec![unit(id.to_string(), |id| encode_polygon(id, polygon, style, mapper))]
        }
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .enumerate()
            .map(|(idx, polygon)| {
                unit(format!("{id}.{idx}"), |id| encode_polygon(id, polygon, style, mapper))
            })
            .collect(),
        Geometry::GeometryCollection(collection) => collection
            .iter()
            .enumerate()
            .flat_map(|(idx, member)| {
                encode_geometry(&format!("{id}.{idx}"), member, style, mapper)
            })
            .collect(),
        Geometry::Line(line) => {
            let line = LineString::from(*line);
            vec![unit(id.to_string(), |id| encode_line(id, &line, style, mapper))]
        }
        Geometry::Rect(rect) => {
            let polygon = rect.to_polygon();
            vec![unit(id.to_string(), |id| encode_polygon(id, &polygon, style, mapper))]
        }
        Geometry::Triangle(triangle) => {
            let polygon = triangle.to_polygon();
            vec![unit(id.to_string(), |id| encode_polygon(id, &polygon, style, mapper))]
        }
    }
}

fn unit(
    id: String,
    encode: impl FnOnce(String) -> Result<ShapeDescriptor, EncodeError>,
) -> EncodedUnit {
    let result = encode(id.clone());
    (id, result)
}

fn encode_point(
    id: String,
    point: &Point<f64>,
    style: &ShapeStyle,
    mapper: &CoordinateMapper,
) -> Result<ShapeDescriptor, EncodeError> {
    let (mark, radius) = style.mark();
    if !mark.eq_ignore_ascii_case("circle") {
        return Err(EncodeError::UnsupportedMark(mark.to_string()));
    }
    let (x, y) = mapper.to_screen(point.0);
    Ok(ShapeDescriptor {
        kind: ShapeKind::Circle,
        id,
        coords: format!("{x},{y},{}", radius.round() as i64),
        attributes: style.attributes.clone(),
    })
}

fn encode_line(
    id: String,
    line: &LineString<f64>,
    style: &ShapeStyle,
    mapper: &CoordinateMapper,
) -> Result<ShapeDescriptor, EncodeError> {
    let width = style.line_width.unwrap_or(DEFAULT_LINE_WIDTH);
    let distance = mapper
        .pixels_to_world(width / 2.0)
        .ok_or(EncodeError::NonInvertible)?;
    let buffered = buffer_line(line, distance)?;
    let decimated = decimate_polygon(buffered, mapper);
    Ok(ShapeDescriptor {
        kind: ShapeKind::Poly,
        id,
        coords: format_ring(&decimated.exterior().0, mapper)?,
        attributes: style.attributes.clone(),
    })
}

fn encode_polygon(
    id: String,
    polygon: &Polygon<f64>,
    style: &ShapeStyle,
    mapper: &CoordinateMapper,
) -> Result<ShapeDescriptor, EncodeError> {
    let hole_free = if polygon.interiors().is_empty() {
        polygon.clone()
    } else {
        let tolerance = mapper.pixels_to_world(1.0).unwrap_or(0.0);
        remove_holes(polygon, tolerance)
    };
    let decimated = decimate_polygon(hole_free, mapper);
    Ok(ShapeDescriptor {
        kind: ShapeKind::Poly,
        id,
        coords: format_ring(&decimated.exterior().0, mapper)?,
        attributes: style.attributes.clone(),
    })
}

/// Format ring vertices as space separated `x,y` pixel pairs.
///
/// A ring that is not closed gets the *world* coordinates of its first vertex
/// appended as is.
pub fn format_ring(
    coords: &[Coord<f64>],
    mapper: &CoordinateMapper,
) -> Result<String, EncodeError> {
    let (first, last) = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(EncodeError::Empty),
    };
    let mut out = String::new();
    for (idx, coord) in coords.iter().enumerate() {
        let (x, y) = mapper.to_screen(*coord);
        if idx > 0 {
            out.push(' ');
        }
        write!(out, "{x},{y}")?;
    }
    if first != last {
        write!(out, " {},{}", first.x, first.y)?;
    }
    Ok(out)
}
