use std::f64::consts::PI;
use std::panic::{AssertUnwindSafe, catch_unwind};

use geo::unary_union;
use geo_types::{Coord, LineString, Polygon};

use crate::error::EncodeError;

/// Vertices used to approximate the round cap drawn at each line vertex.
const JOIN_SEGMENTS: usize = 8;

/// Buffer `line` by `distance` world units on each side.
///
/// The buffer is the union of one rectangle per segment and one round join
/// per vertex. It fails unless the union is exactly one polygon.
pub fn buffer_line(line: &LineString<f64>, distance: f64) -> Result<Polygon<f64>, EncodeError> {
    if !(distance.is_finite() && distance > 0.0) {
        return Err(EncodeError::BufferNotPolygon);
    }
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
    for coord in line.coords() {
        if !(coord.x.is_finite() && coord.y.is_finite()) {
            return Err(EncodeError::BufferNotPolygon);
        }
        if coords.last() != Some(coord) {
            coords.push(*coord);
        }
    }
    if coords.is_empty() {
        return Err(EncodeError::Empty);
    }

    let mut pieces: Vec<Polygon<f64>> = coords.iter().map(|c| join(*c, distance)).collect();
    pieces.extend(
        coords
            .windows(2)
            .map(|pair| segment(pair[0], pair[1], distance)),
    );

    let merged = catch_unwind(AssertUnwindSafe(|| unary_union(&pieces)))
        .map_err(|_| EncodeError::BufferNotPolygon)?;
    let mut polygons = merged.0;
    if polygons.len() == 1 {
        Ok(polygons.remove(0))
    } else {
        Err(EncodeError::BufferNotPolygon)
    }
}

fn join(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let ring = (0..JOIN_SEGMENTS)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / JOIN_SEGMENTS as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect::<Vec<_>>();
    Polygon::new(LineString::new(ring), Vec::new())
}

fn segment(start: Coord<f64>, end: Coord<f64>, distance: f64) -> Polygon<f64> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length = dx.hypot(dy);
    let offset = Coord {
        x: -dy / length * distance,
        y: dx / length * distance,
    };
    Polygon::new(
        LineString::new(vec![
            start + offset,
            end + offset,
            end - offset,
            start - offset,
        ]),
        Vec::new(),
    )
}
