//! Clipping of feature geometries to the visible area.
//!
//! Geometries already inside the area are passed through untouched. When the
//! intersection itself cannot be computed the unclipped geometry is used.

use std::panic::{AssertUnwindSafe, catch_unwind};

use geo::{BooleanOps, BoundingRect};
use geo_types::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Rect,
};

/// Intersect `geometry` with `area`. Returns `None` when nothing of the
/// geometry is left inside the area.
pub fn clip_to_area(geometry: &Geometry<f64>, area: &Rect<f64>) -> Option<Geometry<f64>> {
    let bounds = geometry.bounding_rect()?;
    if !is_finite(&bounds) {
        tracing::debug!("non-finite geometry bounds, skipping clip");
        return Some(geometry.clone());
    }
    if contains(area, &bounds) {
        return Some(geometry.clone());
    }
    if !overlaps(area, &bounds) {
        return None;
    }

    match catch_unwind(AssertUnwindSafe(|| clip(geometry, area))) {
        Ok(clipped) => clipped,
        Err(_) => {
            tracing::debug!("intersection failed, using unclipped geometry");
            Some(geometry.clone())
        }
    }
}

fn clip(geometry: &Geometry<f64>, area: &Rect<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(point) => point_inside(point, area).then(|| Geometry::Point(*point)),
        Geometry::MultiPoint(points) => {
            let kept: Vec<Point<f64>> = points
                .iter()
                .filter(|point| point_inside(point, area))
                .copied()
                .collect();
            (!kept.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(kept)))
        }
        Geometry::LineString(line) => {
            let lines = MultiLineString::new(vec![line.clone()]);
            collapse_lines(area.to_polygon().clip(&lines, false))
        }
        Geometry::MultiLineString(lines) => {
            let clipped = area.to_polygon().clip(lines, false);
            (!clipped.0.is_empty()).then(|| Geometry::MultiLineString(clipped))
        }
        Geometry::Polygon(polygon) => collapse_polygons(polygon.intersection(&area.to_polygon())),
        Geometry::MultiPolygon(polygons) => {
            let clipped = polygons.intersection(&MultiPolygon::new(vec![area.to_polygon()]));
            (!clipped.0.is_empty()).then(|| Geometry::MultiPolygon(clipped))
        }
        Geometry::GeometryCollection(collection) => {
            let members: Vec<Geometry<f64>> = collection
                .iter()
                .filter_map(|member| clip_to_area(member, area))
                .collect();
            (!members.is_empty()).then(|| {
                let collection: GeometryCollection<f64> = members.into_iter().collect();
                Geometry::GeometryCollection(collection)
            })
        }
        Geometry::Line(line) => clip(&Geometry::LineString(LineString::from(*line)), area),
        Geometry::Rect(rect) => clip(&Geometry::Polygon(rect.to_polygon()), area),
        Geometry::Triangle(triangle) => clip(&Geometry::Polygon(triangle.to_polygon()), area),
    }
}

/// A single surviving part keeps the single-part kind.
fn collapse_lines(mut lines: MultiLineString<f64>) -> Option<Geometry<f64>> {
    match lines.0.len() {
        0 => None,
        1 => Some(Geometry::LineString(lines.0.remove(0))),
        _ => Some(Geometry::MultiLineString(lines)),
    }
}

fn collapse_polygons(mut polygons: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match polygons.0.len() {
        0 => None,
        1 => Some(Geometry::Polygon(polygons.0.remove(0))),
        _ => Some(Geometry::MultiPolygon(polygons)),
    }
}

fn point_inside(point: &Point<f64>, area: &Rect<f64>) -> bool {
    point.x() >= area.min().x
        && point.x() <= area.max().x
        && point.y() >= area.min().y
        && point.y() <= area.max().y
}

fn contains(area: &Rect<f64>, bounds: &Rect<f64>) -> bool {
    bounds.min().x >= area.min().x
        && bounds.max().x <= area.max().x
        && bounds.min().y >= area.min().y
        && bounds.max().y <= area.max().y
}

fn overlaps(area: &Rect<f64>, bounds: &Rect<f64>) -> bool {
    bounds.max().x >= area.min().x
        && bounds.min().x <= area.max().x
        && bounds.max().y >= area.min().y
        && bounds.min().y <= area.max().y
}

fn is_finite(rect: &Rect<f64>) -> bool {
    rect.min().x.is_finite()
        && rect.min().y.is_finite()
        && rect.max().x.is_finite()
        && rect.max().y.is_finite()
}
