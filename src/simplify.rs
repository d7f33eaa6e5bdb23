use geo::BoundingRect;
use geo_types::{Coord, LineString, Polygon};

use crate::mapper::CoordinateMapper;

/// Vertices closer than this many pixels to the previously kept vertex are
/// dropped.
pub const DECIMATION_PIXELS: f64 = 0.8;

/// Drops vertices that would land on the same rendered position.
#[derive(Debug, Clone, Copy)]
pub struct Decimator {
    span: f64,
}

impl Decimator {
    /// `None` when the mapper has no usable inverse.
    pub fn new(mapper: &CoordinateMapper) -> Option<Self> {
        let span = mapper.pixels_to_world(DECIMATION_PIXELS)?;
        (span > 0.0).then_some(Self { span })
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn line(&self, line: &LineString<f64>) -> LineString<f64> {
        match self.coords(&line.0, 2) {
            Some(coords) => LineString::new(coords),
            None => line.clone(),
        }
    }

    /// Rings keep their closing vertex and never shrink below four vertices.
    pub fn ring(&self, ring: &LineString<f64>) -> LineString<f64> {
        match self.coords(&ring.0, 4) {
            Some(coords) => LineString::new(coords),
            None => ring.clone(),
        }
    }

    pub fn polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.ring(polygon.exterior()),
            polygon.interiors().iter().map(|ring| self.ring(ring)).collect(),
        )
    }

    fn coords(&self, coords: &[Coord<f64>], min_len: usize) -> Option<Vec<Coord<f64>>> {
        let (first, rest) = coords.split_first()?;
        let (last, middle) = rest.split_last()?;
        let mut kept = vec![*first];
        for coord in middle {
            let previous = kept[kept.len() - 1];
            if (coord.x - previous.x).abs() > self.span || (coord.y - previous.y).abs() > self.span
            {
                kept.push(*coord);
            }
        }
        kept.push(*last);
        (kept.len() >= min_len).then_some(kept)
    }
}

/// Decimate `polygon` for `mapper`, returning it unchanged when decimation
/// is not possible.
pub fn decimate_polygon(polygon: Polygon<f64>, mapper: &CoordinateMapper) -> Polygon<f64> {
    match Decimator::new(mapper) {
        Some(decimator) => decimator.polygon(&polygon),
        None => {
            tracing::debug!("transform not invertible, skipping decimation");
            polygon
        }
    }
}

/// Merge the interior rings of `polygon` into its exterior ring.
///
/// Each hole is joined to the exterior through a zero-width bridge between
/// the closest pair of vertices, walked in the opposite winding so the hole
/// stays outside the resulting ring. Holes whose extent is below `tolerance`
/// in both directions are dropped.
pub fn remove_holes(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let mut outer = open_ring(polygon.exterior());
    if outer.len() < 3 {
        return Polygon::new(polygon.exterior().clone(), Vec::new());
    }
    let outer_winding = signed_area(&outer).signum();

    for hole in polygon.interiors() {
        let Some(extent) = hole.bounding_rect() else {
            continue;
        };
        if extent.width() < tolerance && extent.height() < tolerance {
            continue;
        }
        let mut inner = open_ring(hole);
        if inner.len() < 3 {
            continue;
        }
        if signed_area(&inner).signum() == outer_winding {
            inner.reverse();
        }

        let (outer_idx, inner_idx) = closest_pair(&outer, &inner);
        let mut spliced = Vec::with_capacity(outer.len() + inner.len() + 2);
        spliced.extend_from_slice(&outer[..=outer_idx]);
        spliced.extend_from_slice(&inner[inner_idx..]);
        spliced.extend_from_slice(&inner[..=inner_idx]);
        spliced.extend_from_slice(&outer[outer_idx..]);
        outer = spliced;
    }

    Polygon::new(LineString::new(outer), Vec::new())
}

fn open_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let coords = ring.0.as_slice();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords[..coords.len() - 1].to_vec()
    } else {
        coords.to_vec()
    }
}

fn signed_area(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}

fn closest_pair(outer: &[Coord<f64>], inner: &[Coord<f64>]) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_distance = f64::INFINITY;
    for (i, a) in outer.iter().enumerate() {
        for (j, b) in inner.iter().enumerate() {
            let distance = (a.x - b.x).powi(2) + (a.y - b.y).powi(2);
            if distance < best_distance {
                best_distance = distance;
                best = (i, j);
            }
        }
    }
    best
}
