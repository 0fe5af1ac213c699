//! Coordinate reference systems and reprojection between them.
//!
//! A [`Crs`] is an EPSG code. Definitions come from the bundled EPSG table and
//! transforms are carried out by `proj4rs`, which works in radians for
//! geographic systems; [`Reprojector`] hides that and speaks degrees.

use crate::error::{Result, TessellateError};
use geo::MapCoords;
use geo_types::{Coord, Geometry};
use proj4rs::proj::Proj;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Crs(u16);

impl Crs {
    /// WGS 84 longitude/latitude, the RFC 7946 GeoJSON default.
    pub const WGS84: Crs = Crs(4326);
    /// NAD83 / UTM zone 10N.
    pub const UTM_10N: Crs = Crs(26910);

    pub const fn epsg(code: u16) -> Self {
        Crs(code)
    }

    pub fn code(&self) -> u16 {
        self.0
    }

    /// OGC URN naming this system, as written into a GeoJSON `crs` member.
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.0)
    }

    pub fn proj4(&self) -> Result<&'static str> {
        crs_definitions::from_code(self.0)
            .map(|def| def.proj4)
            .ok_or_else(|| TessellateError::Projection(format!("unknown CRS {self}")))
    }

    pub fn is_geographic(&self) -> Result<bool> {
        Ok(self.proj4()?.contains("+proj=longlat"))
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::UTM_10N
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = TessellateError;

    /// Accepts `epsg:N`, `EPSG:N`, `urn:ogc:def:crs:EPSG::N` and the OGC CRS84 URN.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper == "URN:OGC:DEF:CRS:OGC:1.3:CRS84" || upper == "OGC:CRS84" {
            return Ok(Crs::WGS84);
        }

        // URNs may carry a version between the authority and the code.
        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| {
                upper
                    .strip_prefix("URN:OGC:DEF:CRS:EPSG:")
                    .and_then(|rest| rest.rsplit(':').next())
            })
            .ok_or_else(|| TessellateError::Projection(format!("unrecognised CRS identifier '{trimmed}'")))?;

        code.parse::<u16>()
            .map(Crs)
            .map_err(|_| TessellateError::Projection(format!("unrecognised CRS identifier '{trimmed}'")))
    }
}

struct Endpoint {
    proj: Proj,
    geographic: bool,
}

impl Endpoint {
    fn new(crs: Crs) -> Result<Self> {
        let definition = crs.proj4()?;
        let proj = Proj::from_proj_string(definition)
            .map_err(|e| TessellateError::Projection(format!("{crs}: {e}")))?;
        Ok(Self { proj, geographic: definition.contains("+proj=longlat") })
    }
}

/// Transforms coordinates from one [`Crs`] into another.
///
/// Building one for identical systems is free and leaves coordinates untouched.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    endpoints: Option<(Endpoint, Endpoint)>,
}

impl Reprojector {
    pub fn new(from: Crs, to: Crs) -> Result<Self> {
        let endpoints = if from == to {
            None
        } else {
            Some((Endpoint::new(from)?, Endpoint::new(to)?))
        };
        Ok(Self { from, to, endpoints })
    }

    pub fn is_identity(&self) -> bool {
        self.endpoints.is_none()
    }

    pub fn transform_coord(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let Some((src, dst)) = &self.endpoints else {
            return Ok(c);
        };

        let mut point = if src.geographic {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };

        proj4rs::transform::transform(&src.proj, &dst.proj, &mut point).map_err(|e| {
            TessellateError::Projection(format!("{} -> {} at ({}, {}): {e}", self.from, self.to, c.x, c.y))
        })?;

        let out = if dst.geographic {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        };

        if !out.x.is_finite() || !out.y.is_finite() {
            return Err(TessellateError::Projection(format!(
                "{} -> {} produced a non-finite coordinate for ({}, {})",
                self.from, self.to, c.x, c.y
            )));
        }
        Ok(out)
    }

    pub fn transform_geometry(&self, geom: &Geometry<f64>) -> Result<Geometry<f64>> {
        if self.is_identity() {
            return Ok(geom.clone());
        }
        geom.try_map_coords(|c| self.transform_coord(c))
    }
}

#[cfg(test)]
#[path = "crs_tests.rs"]
mod tests;
