use crate::crs::{Crs, Reprojector};
use crate::error::{Result, TessellateError};
use crate::io::read_geometries;
use geo::{BoundingRect, Densify, Intersects};
use geo_types::{Coord, Geometry, GeometryCollection, LineString, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::path::PathBuf;

pub type JunctionId = usize;
pub type RoadEdgeId = usize;

// Wrapper for Coord to be Hashable (since f64 is not Hash)
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
struct JunctionKey(u64, u64);

impl From<Coord<f64>> for JunctionKey {
    fn from(c: Coord<f64>) -> Self {
        // Exact match: road ends meet only where the source says they do.
        JunctionKey(c.x.to_bits(), c.y.to_bits())
    }
}

#[derive(Clone, Debug)]
pub struct Junction {
    pub coordinate: Coord<f64>,
    /// Incident edges. A self-loop appears twice.
    pub edges: SmallVec<[RoadEdgeId; 4]>,
}

#[derive(Clone, Debug)]
pub struct RoadEdge {
    pub from: JunctionId,
    pub to: JunctionId,
    pub geometry: LineString<f64>,
}

/// Road junctions and the road segments between them, in one CRS.
#[derive(Clone, Debug)]
pub struct RoadNetworkGraph {
    crs: Crs,
    junctions: Vec<Junction>,
    edges: Vec<RoadEdge>,
    junction_map: HashMap<JunctionKey, JunctionId>,
}

impl RoadNetworkGraph {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            junctions: Vec::new(),
            edges: Vec::new(),
            junction_map: HashMap::new(),
        }
    }

    pub fn from_lines<I>(crs: Crs, lines: I) -> Self
    where
        I: IntoIterator<Item = LineString<f64>>,
    {
        let mut graph = Self::new(crs);
        for line in lines {
            graph.add_edge(line);
        }
        graph
    }

    /// Adds a road segment; its end points become (or join) junctions.
    /// Lines with fewer than two coordinates are ignored.
    pub fn add_edge(&mut self, geometry: LineString<f64>) -> Option<RoadEdgeId> {
        let (first, last) = match (geometry.0.first(), geometry.0.last()) {
            (Some(&first), Some(&last)) if geometry.0.len() >= 2 => (first, last),
            _ => return None,
        };

        let id = self.edges.len();
        let from = self.junction(first);
        let to = self.junction(last);
        self.junctions[from].edges.push(id);
        self.junctions[to].edges.push(id);
        self.edges.push(RoadEdge { from, to, geometry });
        Some(id)
    }

    fn junction(&mut self, coordinate: Coord<f64>) -> JunctionId {
        let junctions = &mut self.junctions;
        *self.junction_map.entry(coordinate.into()).or_insert_with(|| {
            junctions.push(Junction { coordinate, edges: SmallVec::new() });
            junctions.len() - 1
        })
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn road_edges(&self) -> &[RoadEdge] {
        &self.edges
    }

    /// Line geometry of every edge, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &LineString<f64>> + '_ {
        self.edges.iter().map(|e| &e.geometry)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Merges chains of edges through degree-2 junctions into single edges.
    ///
    /// Junctions of any other degree, and the loops hanging off them, are kept.
    /// A ring made only of degree-2 junctions collapses to one closed edge.
    pub fn simplify(&self) -> RoadNetworkGraph {
        let mut visited = vec![false; self.edges.len()];
        let mut simplified = RoadNetworkGraph::new(self.crs);

        for (start, junction) in self.junctions.iter().enumerate() {
            if self.is_interior(start) {
                continue;
            }
            for &edge in &junction.edges {
                if !visited[edge] {
                    simplified.add_edge(self.walk(start, edge, &mut visited));
                }
            }
        }

        // Whatever is left belongs to isolated rings.
        for edge in 0..self.edges.len() {
            if !visited[edge] {
                let start = self.edges[edge].from;
                simplified.add_edge(self.walk(start, edge, &mut visited));
            }
        }

        simplified
    }

    fn is_interior(&self, junction: JunctionId) -> bool {
        let edges = &self.junctions[junction].edges;
        edges.len() == 2 && edges[0] != edges[1]
    }

    fn walk(&self, start: JunctionId, first: RoadEdgeId, visited: &mut [bool]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut at = start;
        let mut edge = first;

        loop {
            visited[edge] = true;
            let e = &self.edges[edge];
            let forward = e.from == at;
            let mut piece = e.geometry.0.clone();
            if !forward {
                piece.reverse();
            }
            let skip = usize::from(!coords.is_empty());
            coords.extend(piece.into_iter().skip(skip));
            at = if forward { e.to } else { e.from };

            if at == start || !self.is_interior(at) {
                break;
            }
            let incident = &self.junctions[at].edges;
            let next = if incident[0] == edge { incident[1] } else { incident[0] };
            if visited[next] {
                break;
            }
            edge = next;
        }

        LineString::new(coords)
    }
}

/// Supplies the road graph covering a polygon.
///
/// Implementations are expected to return an already simplified graph in the
/// requested CRS. An empty graph is a valid answer.
pub trait RoadNetworkProvider {
    fn graph_from_polygon(&self, polygon: &Polygon<f64>, crs: Crs) -> Result<RoadNetworkGraph>;
}

impl<P: RoadNetworkProvider + ?Sized> RoadNetworkProvider for &P {
    fn graph_from_polygon(&self, polygon: &Polygon<f64>, crs: Crs) -> Result<RoadNetworkGraph> {
        (**self).graph_from_polygon(polygon, crs)
    }
}

/// Seed geometry for the Voronoi stage: one line per road edge.
#[derive(Clone, Debug)]
pub struct SeedLines {
    lines: Vec<LineString<f64>>,
    crs: Crs,
}

impl SeedLines {
    pub fn new(lines: Vec<LineString<f64>>, crs: Crs) -> Self {
        Self { lines, crs }
    }

    pub fn lines(&self) -> &[LineString<f64>] {
        &self.lines
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of vertices, i.e. Voronoi generators before de-duplication.
    pub fn vertex_count(&self) -> usize {
        self.lines.iter().map(|l| l.0.len()).sum()
    }

    /// Inserts vertices so no segment is longer than `spacing`.
    pub fn densified(&self, spacing: f64) -> SeedLines {
        Self {
            lines: self.lines.iter().map(|l| l.densify(spacing)).collect(),
            crs: self.crs,
        }
    }

    pub fn to_geometry_collection(&self) -> GeometryCollection<f64> {
        GeometryCollection::from(self.lines.clone())
    }
}

/// One seed line per graph edge. Duplicate edges give duplicate lines.
pub fn edges_to_geometry_collection(graph: &RoadNetworkGraph) -> SeedLines {
    SeedLines::new(graph.edges().cloned().collect(), graph.crs())
}

struct IndexedRoad {
    envelope: AABB<[f64; 2]>,
    index: usize,
}

impl RTreeObject for IndexedRoad {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Serves road graphs from a GeoJSON snapshot of road centre lines.
///
/// The snapshot may be in any CRS it declares. Lines are reprojected into the
/// requested CRS and only those touching the query polygon are returned.
pub struct GeoJsonRoadNetwork {
    path: PathBuf,
    pub simplify: bool,
}

impl GeoJsonRoadNetwork {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), simplify: true }
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    fn load_lines(&self, crs: Crs) -> Result<Vec<LineString<f64>>> {
        let file = read_geometries(&self.path)
            .map_err(|e| TessellateError::Retrieval(format!("{}: {e}", self.path.display())))?;
        let reprojector = Reprojector::new(file.crs, crs)
            .map_err(|e| TessellateError::Retrieval(e.to_string()))?;

        let mut lines = Vec::new();
        for geom in &file.geometries {
            let projected = reprojector
                .transform_geometry(geom)
                .map_err(|e| TessellateError::Retrieval(e.to_string()))?;
            extract_lines(projected, &mut lines);
        }
        Ok(lines)
    }
}

impl RoadNetworkProvider for GeoJsonRoadNetwork {
    fn graph_from_polygon(&self, polygon: &Polygon<f64>, crs: Crs) -> Result<RoadNetworkGraph> {
        let lines = self.load_lines(crs)?;

        let indexed: Vec<IndexedRoad> = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                let bbox = line.bounding_rect()?;
                Some(IndexedRoad {
                    envelope: AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]),
                    index,
                })
            })
            .collect();
        let tree = RTree::bulk_load(indexed);

        let Some(query) = polygon.bounding_rect() else {
            return Ok(RoadNetworkGraph::new(crs));
        };
        let aabb = AABB::from_corners([query.min().x, query.min().y], [query.max().x, query.max().y]);

        let mut hits: Vec<usize> = tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|road| road.index)
            .filter(|&i| polygon.intersects(&lines[i]))
            .collect();
        hits.sort_unstable();

        let graph = RoadNetworkGraph::from_lines(crs, hits.into_iter().map(|i| lines[i].clone()));
        log::debug!(
            "Snapshot {} yielded {} road edges ({} junctions)",
            self.path.display(),
            graph.edge_count(),
            graph.junction_count()
        );

        Ok(if self.simplify { graph.simplify() } else { graph })
    }
}

fn extract_lines(geom: Geometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geom {
        Geometry::Line(line) => out.push(line.into()),
        Geometry::LineString(ls) => out.push(ls),
        Geometry::MultiLineString(mls) => out.extend(mls.0),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                extract_lines(g, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
