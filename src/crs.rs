use geo::MapCoords;
use geo_types::{Coord, Geometry, Rect};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::{Error, Result};

/// Equatorial metres per degree on the WGS84 ellipsoid.
pub const METERS_PER_DEGREE: f64 = 6_378_137.0 * 2.0 * std::f64::consts::PI / 360.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    pub code: String,
    /// PROJ.4 definition.
    pub proj: String,
}

impl Crs {
    pub fn new(code: impl Into<String>, proj: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            proj: proj.into(),
        }
    }

    pub fn wgs84() -> Self {
        Self::new("EPSG:4326", "+proj=longlat +datum=WGS84 +no_defs +type=crs")
    }

    pub fn web_mercator() -> Self {
        Self::new(
            "EPSG:3857",
            concat!(
                "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 ",
                "+x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs",
            ),
        )
    }

    /// Built-in definitions for bare codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" => Some(Self::wgs84()),
            "EPSG:3857" | "EPSG:900913" => Some(Self::web_mercator()),
            _ => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        self.proj.contains("+proj=longlat") || self.proj.contains("+proj=latlong")
    }

    pub fn meters_per_unit(&self) -> f64 {
        if self.is_geographic() {
            METERS_PER_DEGREE
        } else {
            1.0
        }
    }

    pub fn same_as(&self, other: &Crs) -> bool {
        self.code.eq_ignore_ascii_case(&other.code)
    }
}

/// Coordinate conversion between two CRSs.
pub struct Reprojector {
    from: Proj,
    to: Proj,
    from_geographic: bool,
    to_geographic: bool,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("from_geographic", &self.from_geographic)
            .field("to_geographic", &self.to_geographic)
            .finish()
    }
}

impl Reprojector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        Ok(Self {
            from: build_proj(from)?,
            to: build_proj(to)?,
            from_geographic: from.is_geographic(),
            to_geographic: to.is_geographic(),
        })
    }

    pub fn coord(&self, coord: Coord<f64>) -> std::result::Result<Coord<f64>, String> {
        let mut point = if self.from_geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point).map_err(|err| err.to_string())?;
        let out = if self.to_geographic {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        };
        if out.x.is_finite() && out.y.is_finite() {
            Ok(out)
        } else {
            Err(format!("non-finite result for ({}, {})", coord.x, coord.y))
        }
    }

    pub fn geometry(&self, geometry: &Geometry<f64>) -> std::result::Result<Geometry<f64>, String> {
        geometry.try_map_coords(|coord| self.coord(coord))
    }

    /// Bounding box of the reprojected rectangle, sampled at its corners and
    /// edge midpoints.
    pub fn rect(&self, rect: &Rect<f64>) -> std::result::Result<Rect<f64>, String> {
        let (min, max) = (rect.min(), rect.max());
        let center = rect.center();
        let samples = [
            Coord { x: min.x, y: min.y },
            Coord { x: center.x, y: min.y },
            Coord { x: max.x, y: min.y },
            Coord { x: max.x, y: center.y },
            Coord { x: max.x, y: max.y },
            Coord { x: center.x, y: max.y },
            Coord { x: min.x, y: max.y },
            Coord { x: min.x, y: center.y },
        ];
        let mut lo = Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut hi = Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };
        for sample in samples {
            let projected = self.coord(sample)?;
            lo.x = lo.x.min(projected.x);
            lo.y = lo.y.min(projected.y);
            hi.x = hi.x.max(projected.x);
            hi.y = hi.y.max(projected.y);
        }
        Ok(Rect::new(lo, hi))
    }
}

fn build_proj(crs: &Crs) -> Result<Proj> {
    Proj::from_proj_string(&crs.proj).map_err(|err| Error::Crs {
        code: crs.code.clone(),
        reason: err.to_string(),
    })
}
