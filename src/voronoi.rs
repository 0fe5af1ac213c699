//! Line-seeded Voronoi partition built as the dual of a Delaunay triangulation.
//!
//! Every vertex of every seed line is a generator, so a road drawn with many
//! vertices gets many small cells along it. Identical vertices collapse into
//! one generator; its cell is credited to the first seed line that used it.

use crate::error::{Result, TessellateError};
use crate::network::SeedLines;
use geo::{Area, BooleanOps, BoundingRect};
use geo_types::{Coord, LineString, MultiPolygon, Polygon, Rect};
use spade::handles::FixedVertexHandle;
use spade::{DelaunayTriangulation, Point2, Triangulation};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::f64::consts::PI;

/// Sentinel generators placed on a ring around the working extent.
const FRAME_POINTS: usize = 8;
/// Frame radius as a multiple of the working extent's diagonal.
const FRAME_SCALE: f64 = 4.0;

#[derive(Clone, Debug, PartialEq)]
pub struct VoronoiCell {
    /// Index of the seed line whose vertex generated this cell.
    pub seed: usize,
    pub generator: Coord<f64>,
    pub polygon: Polygon<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoronoiPartition {
    cells: Vec<VoronoiCell>,
}

impl VoronoiPartition {
    pub fn new(cells: Vec<VoronoiCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[VoronoiCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The planar operations the tessellation pipeline needs.
pub trait GeometryEngine: Send + Sync {
    /// Voronoi partition of the seed vertices. The union of the returned cells
    /// must cover `extent`.
    fn voronoi(&self, seeds: &SeedLines, extent: Rect<f64>) -> Result<VoronoiPartition>;

    /// Intersection of two polygons; empty when they do not overlap.
    fn intersect(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> Result<MultiPolygon<f64>>;
}

/// [`GeometryEngine`] backed by `spade` triangulation and `geo` overlays.
#[derive(Clone, Copy, Debug, Default)]
pub struct DelaunayEngine;

impl GeometryEngine for DelaunayEngine {
    fn voronoi(&self, seeds: &SeedLines, extent: Rect<f64>) -> Result<VoronoiPartition> {
        let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
        let mut generators: Vec<(FixedVertexHandle, usize)> = Vec::new();
        let mut seen = HashSet::new();

        for (seed, line) in seeds.lines().iter().enumerate() {
            for c in line.coords() {
                let handle = insert(&mut triangulation, *c)?;
                if seen.insert(handle) {
                    generators.push((handle, seed));
                }
            }
        }

        if generators.is_empty() {
            return Ok(VoronoiPartition::default());
        }

        let working = seed_extent(seeds.lines())
            .map(|r| union_rect(r, extent))
            .unwrap_or(extent);
        for sentinel in frame(working) {
            insert(&mut triangulation, sentinel)?;
        }

        let cells = generators
            .into_iter()
            .map(|(handle, seed)| {
                let generator = triangulation.vertex(handle).position();
                Ok(VoronoiCell {
                    seed,
                    generator: Coord { x: generator.x, y: generator.y },
                    polygon: cell_polygon(&triangulation, handle)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(VoronoiPartition::new(cells))
    }

    fn intersect(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> Result<MultiPolygon<f64>> {
        Ok(a.intersection(b))
    }
}

fn insert(
    triangulation: &mut DelaunayTriangulation<Point2<f64>>,
    c: Coord<f64>,
) -> Result<FixedVertexHandle> {
    triangulation
        .insert(Point2::new(c.x, c.y))
        .map_err(|e| TessellateError::Geometry(format!("cannot triangulate ({}, {}): {e:?}", c.x, c.y)))
}

fn seed_extent(lines: &[LineString<f64>]) -> Option<Rect<f64>> {
    lines
        .iter()
        .filter_map(|l| l.bounding_rect())
        .reduce(union_rect)
}

fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

/// Ring of sentinels far enough out that no point of `extent` is nearer to a
/// sentinel than to a generator inside `extent`, and every such generator is
/// strictly inside the triangulation's hull.
fn frame(extent: Rect<f64>) -> Vec<Coord<f64>> {
    let center = extent.center();
    let diagonal = extent.width().hypot(extent.height()).max(1.0);
    let radius = FRAME_SCALE * diagonal;
    (0..FRAME_POINTS)
        .map(|k| {
            let theta = 2.0 * PI * k as f64 / FRAME_POINTS as f64;
            Coord {
                x: center.x + radius * theta.cos(),
                y: center.y + radius * theta.sin(),
            }
        })
        .collect()
}

/// Cell of an interior vertex: the circumcenters of its triangles in angular
/// order. Hull vertices have unbounded cells and are an error, as are cells
/// that collapse numerically.
fn cell_polygon(
    triangulation: &DelaunayTriangulation<Point2<f64>>,
    handle: FixedVertexHandle,
) -> Result<Polygon<f64>> {
    let generator = triangulation.vertex(handle).position();
    bounded_cell(triangulation, handle).ok_or_else(|| {
        TessellateError::Geometry(format!(
            "generator ({}, {}) produced no bounded cell",
            generator.x, generator.y
        ))
    })
}

fn bounded_cell(
    triangulation: &DelaunayTriangulation<Point2<f64>>,
    handle: FixedVertexHandle,
) -> Option<Polygon<f64>> {
    let vertex = triangulation.vertex(handle);
    let generator = vertex.position();

    let mut corners = Vec::new();
    for edge in vertex.out_edges() {
        let face = edge.face().as_inner()?;
        let [a, b, c] = face.vertices().map(|v| v.position());
        corners.push(circumcenter(a, b, c)?);
    }

    corners.sort_by(|p, q| {
        let angle_p = (p.y - generator.y).atan2(p.x - generator.x);
        let angle_q = (q.y - generator.y).atan2(q.x - generator.x);
        angle_p.partial_cmp(&angle_q).unwrap_or(Ordering::Equal)
    });
    // Co-circular generators share a circumcenter.
    corners.dedup_by(|p, q| same_corner(*p, *q));
    // The sort is cyclic, so a shared corner can straddle the atan2 seam.
    while corners.len() > 1 && same_corner(corners[0], corners[corners.len() - 1]) {
        corners.pop();
    }

    if corners.len() < 3 {
        return None;
    }

    let polygon = Polygon::new(LineString::new(corners), vec![]);
    if polygon.unsigned_area() > 0.0 {
        Some(polygon)
    } else {
        None
    }
}

fn same_corner(p: Coord<f64>, q: Coord<f64>) -> bool {
    (p.x - q.x).abs() < 1e-9 && (p.y - q.y).abs() < 1e-9
}

fn circumcenter(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Option<Coord<f64>> {
    let (bx, by) = (b.x - a.x, b.y - a.y);
    let (cx, cy) = (c.x - a.x, c.y - a.y);
    let d = 2.0 * (bx * cy - by * cx);
    if d == 0.0 {
        return None;
    }
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    Some(Coord {
        x: a.x + (cy * b2 - by * c2) / d,
        y: a.y + (bx * c2 - cx * b2) / d,
    })
}

#[cfg(test)]
#[path = "voronoi_tests.rs"]
mod tests;
