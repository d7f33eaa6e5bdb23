use geo::AffineTransform;
use geo_types::{Coord, Rect};

use crate::crs::Crs;

/// Size of the OGC standardized rendering pixel in metres.
pub const STANDARD_PIXEL_SIZE: f64 = 0.00028;

/// OGC scale denominator for `world` drawn `width` pixels wide.
pub fn scale_denominator(world: &Rect<f64>, crs: &Crs, width: u32) -> f64 {
    world.width() * crs.meters_per_unit() / width as f64 / STANDARD_PIXEL_SIZE
}

/// World to pixel transform for one request.
///
/// Pixel space has its origin at the top-left corner, so the y axis is
/// flipped relative to world space.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    world: Rect<f64>,
    width: u32,
    height: u32,
    forward: AffineTransform<f64>,
    inverse: Option<AffineTransform<f64>>,
}

impl CoordinateMapper {
    pub fn new(world: Rect<f64>, width: u32, height: u32) -> Self {
        let sx = width as f64 / world.width();
        let sy = height as f64 / world.height();
        let forward = AffineTransform::new(
            sx,
            0.0,
            -world.min().x * sx,
            0.0,
            -sy,
            world.max().y * sy,
        );
        let determinant = -sx * sy;
        let inverse = if determinant.is_finite() && determinant != 0.0 {
            forward.inverse()
        } else {
            None
        };
        Self {
            world,
            width,
            height,
            forward,
            inverse,
        }
    }

    pub fn world(&self) -> &Rect<f64> {
        &self.world
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_invertible(&self) -> bool {
        self.inverse.is_some()
    }

    /// Pixel position of `coord`, rounded to the nearest integer pixel.
    pub fn to_screen(&self, coord: Coord<f64>) -> (i64, i64) {
        let screen = self.forward.apply(coord);
        (screen.x.round() as i64, screen.y.round() as i64)
    }

    pub fn to_world(&self, screen: Coord<f64>) -> Option<Coord<f64>> {
        self.inverse.as_ref().map(|inverse| inverse.apply(screen))
    }

    /// World length of `pixels` screen pixels, measured along the x axis at
    /// the center of the pixel rectangle.
    pub fn pixels_to_world(&self, pixels: f64) -> Option<f64> {
        let center = Coord {
            x: self.width as f64 / 2.0,
            y: self.height as f64 / 2.0,
        };
        let origin = self.to_world(center)?;
        let shifted = self.to_world(Coord {
            x: center.x + pixels,
            y: center.y,
        })?;
        let distance = (shifted.x - origin.x).abs();
        distance.is_finite().then_some(distance)
    }
}
