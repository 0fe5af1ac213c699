use crate::crs::{Crs, Reprojector};
use crate::error::{Result, TessellateError};
use crate::io::read_geometries;
use geo::{Area, BoundingRect, ConvexHull, CoordsIter};
use geo_types::{Coord, Geometry, GeometryCollection, LineString, MultiPoint, Point, Polygon, Rect};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// Directions used to approximate a round margin around a convex hull.
const HULL_MARGIN_SEGMENTS: usize = 16;

/// The loaded area of interest, already in the working CRS.
#[derive(Clone, Debug)]
pub struct AreaGeometry {
    geometries: Vec<Geometry<f64>>,
    crs: Crs,
    source: PathBuf,
}

impl AreaGeometry {
    pub fn geometries(&self) -> &[Geometry<f64>] {
        &self.geometries
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Path the area was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// Polygon enclosing an [`AreaGeometry`]; scopes road retrieval and clipping.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingPolygon {
    polygon: Polygon<f64>,
    crs: Crs,
}

impl BoundingPolygon {
    /// Wraps `polygon`, rejecting one without positive area.
    pub fn new(polygon: Polygon<f64>, crs: Crs) -> Result<Self> {
        if !(polygon.unsigned_area() > 0.0) {
            return Err(TessellateError::InvalidGeometry("bounding polygon is degenerate".into()));
        }
        Ok(Self { polygon, crs })
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Rect<f64> {
        // Non-degenerate by construction.
        self.polygon
            .bounding_rect()
            .unwrap_or_else(|| Rect::new(Coord::zero(), Coord::zero()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Axis-aligned envelope of the area.
    #[default]
    Envelope,
    /// Convex hull of the area.
    ConvexHull,
}

/// Loads an area file into the working CRS and derives its bounding polygon.
#[derive(Clone, Debug, Default)]
pub struct AreaLoader {
    pub crs: Crs,
    /// Extra distance, in working CRS units, added around the area's extent.
    pub margin: f64,
    pub boundary: BoundaryKind,
}

impl AreaLoader {
    pub fn new(crs: Crs) -> Self {
        Self { crs, ..Self::default() }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryKind) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<AreaGeometry> {
        let path = path.as_ref();
        let file = read_geometries(path)?;

        if file.geometries.is_empty() {
            return Err(TessellateError::InvalidGeometry(format!(
                "{} contains no features",
                path.display()
            )));
        }

        let reprojector = Reprojector::new(file.crs, self.crs)?;
        let mut geometries = Vec::with_capacity(file.geometries.len());
        for geom in &file.geometries {
            let projected = reprojector.transform_geometry(geom)?;
            check_valid(&projected)?;
            geometries.push(projected);
        }

        log::debug!(
            "Loaded {} geometries from {} ({} -> {})",
            geometries.len(),
            path.display(),
            file.crs,
            self.crs
        );

        Ok(AreaGeometry {
            geometries,
            crs: self.crs,
            source: path.to_path_buf(),
        })
    }

    pub fn bounding_polygon(&self, area: &AreaGeometry) -> Result<BoundingPolygon> {
        let collection = GeometryCollection::from(area.geometries.clone());

        let polygon = match self.boundary {
            BoundaryKind::Envelope => {
                let rect = collection
                    .bounding_rect()
                    .ok_or_else(|| TessellateError::InvalidGeometry("area has no extent".into()))?;
                let m = self.margin.max(0.0);
                Rect::new(
                    Coord { x: rect.min().x - m, y: rect.min().y - m },
                    Coord { x: rect.max().x + m, y: rect.max().y + m },
                )
                .to_polygon()
            }
            BoundaryKind::ConvexHull => {
                let hull = collection.convex_hull();
                if self.margin > 0.0 {
                    grow_convex(&hull, self.margin)
                } else {
                    hull
                }
            }
        };

        BoundingPolygon::new(polygon, area.crs)
    }
}

fn check_valid(geom: &Geometry<f64>) -> Result<()> {
    if geom.coords_count() == 0 {
        return Err(TessellateError::InvalidGeometry("empty geometry".into()));
    }
    if geom.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(TessellateError::InvalidGeometry("non-finite coordinate".into()));
    }
    check_parts(geom)
}

/// Every member of a multi-part geometry must be well formed on its own.
fn check_parts(geom: &Geometry<f64>) -> Result<()> {
    match geom {
        Geometry::LineString(line) => check_line(line),
        Geometry::MultiLineString(lines) => lines.iter().try_for_each(check_line),
        Geometry::Polygon(p) => check_polygon(p),
        Geometry::MultiPolygon(polygons) => polygons.iter().try_for_each(check_polygon),
        Geometry::GeometryCollection(collection) => collection.iter().try_for_each(check_parts),
        _ => Ok(()),
    }
}

fn check_line(line: &LineString<f64>) -> Result<()> {
    if line.0.len() < 2 {
        return Err(TessellateError::InvalidGeometry("line with fewer than 2 coordinates".into()));
    }
    Ok(())
}

fn check_polygon(p: &Polygon<f64>) -> Result<()> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .try_for_each(|ring| {
            if ring.0.len() < 4 {
                return Err(TessellateError::InvalidGeometry("polygon ring with fewer than 3 vertices".into()));
            }
            Ok(())
        })
}

/// Minkowski sum of a convex polygon with a regular polygon of radius `margin`.
fn grow_convex(hull: &Polygon<f64>, margin: f64) -> Polygon<f64> {
    let mut points = Vec::with_capacity(hull.exterior().0.len() * HULL_MARGIN_SEGMENTS);
    for c in hull.exterior().coords() {
        for k in 0..HULL_MARGIN_SEGMENTS {
            let theta = 2.0 * PI * k as f64 / HULL_MARGIN_SEGMENTS as f64;
            points.push(Point::new(c.x + margin * theta.cos(), c.y + margin * theta.sin()));
        }
    }
    MultiPoint::new(points).convex_hull()
}

#[cfg(test)]
#[path = "area_tests.rs"]
mod tests;
