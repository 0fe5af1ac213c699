//! The tessellation pipeline: road graph -> seed lines -> Voronoi cells -> tiles.
//!
//! Each stage takes the previous stage's output by reference and returns a new
//! value, so stages can be driven one at a time. [`TessellationEngine::area`]
//! runs them all in order and writes the result.

use crate::area::{AreaGeometry, AreaLoader, BoundingPolygon};
use crate::crs::Crs;
use crate::error::{Result, TessellateError};
use crate::io::{write_polygons, PolygonFeature};
use crate::network::{edges_to_geometry_collection, RoadNetworkGraph, RoadNetworkProvider, SeedLines};
use crate::utils::parallel;
use crate::voronoi::{DelaunayEngine, GeometryEngine, VoronoiPartition};
use geo::{Area, Intersects};
use geo_types::Polygon;
use geojson::JsonObject;
use log::Level;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Clipped fragments smaller than this share of the boundary's area are dropped.
const SLIVER_RATIO: f64 = 1e-12;

/// Suffix replacing the input's extension when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_tip.geojson";

/// Names the pipeline stage a log line reports on. Only a label: stage order
/// is carried by the stage methods' inputs, not tracked here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Idle,
    GraphRetrieved,
    VoronoiComputed,
    Clipped,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::GraphRetrieved => "graph retrieved",
            Stage::VoronoiComputed => "voronoi computed",
            Stage::Clipped => "clipped",
            Stage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    /// Seed line (road edge) whose Voronoi cell this tile was cut from.
    pub seed: usize,
    pub polygon: Polygon<f64>,
}

/// Voronoi cells clipped to the bounding polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct TileSet {
    tiles: Vec<Tile>,
    crs: Crs,
}

impl TileSet {
    pub fn new(tiles: Vec<Tile>, crs: Crs) -> Self {
        Self { tiles, crs }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn polygons(&self) -> impl Iterator<Item = &Polygon<f64>> + '_ {
        self.tiles.iter().map(|t| &t.polygon)
    }

    pub fn total_area(&self) -> f64 {
        self.polygons().map(|p| p.unsigned_area()).sum()
    }
}

/// `<dir>/<stem>_tip.geojson` next to `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_else(|| OsStr::new("area"));
    let mut name = stem.to_os_string();
    name.push(OUTPUT_SUFFIX);
    input.with_file_name(name)
}

/// Tiles one area of interest. Build one engine per run.
pub struct TessellationEngine<P, E = DelaunayEngine> {
    area: AreaGeometry,
    boundary: BoundingPolygon,
    provider: P,
    engine: E,
    /// Densify seed lines to this vertex spacing before triangulating.
    /// `None` keeps the roads' own vertices.
    pub seed_spacing: Option<f64>,
    /// Raise per-stage diagnostics from `debug` to `info` level.
    pub debug: bool,
}

impl<P: RoadNetworkProvider> TessellationEngine<P> {
    /// Loads `path` into `crs` with default loader settings.
    pub fn open(path: impl AsRef<Path>, crs: Crs, provider: P) -> Result<Self> {
        Self::with_loader(&AreaLoader::new(crs), path, provider)
    }

    pub fn with_loader(loader: &AreaLoader, path: impl AsRef<Path>, provider: P) -> Result<Self> {
        let area = loader.load(path)?;
        let boundary = loader.bounding_polygon(&area)?;
        Ok(Self::from_area(area, boundary, provider))
    }

    pub fn from_area(area: AreaGeometry, boundary: BoundingPolygon, provider: P) -> Self {
        Self {
            area,
            boundary,
            provider,
            engine: DelaunayEngine,
            seed_spacing: None,
            debug: false,
        }
    }
}

impl<P: RoadNetworkProvider, E: GeometryEngine> TessellationEngine<P, E> {
    pub fn with_engine<E2: GeometryEngine>(self, engine: E2) -> TessellationEngine<P, E2> {
        TessellationEngine {
            area: self.area,
            boundary: self.boundary,
            provider: self.provider,
            engine,
            seed_spacing: self.seed_spacing,
            debug: self.debug,
        }
    }

    pub fn with_seed_spacing(mut self, spacing: Option<f64>) -> Self {
        self.seed_spacing = spacing;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn crs(&self) -> Crs {
        self.area.crs()
    }

    pub fn area_geometry(&self) -> &AreaGeometry {
        &self.area
    }

    pub fn bounding_polygon(&self) -> &BoundingPolygon {
        &self.boundary
    }

    fn level(&self) -> Level {
        if self.debug {
            Level::Info
        } else {
            Level::Debug
        }
    }

    /// Asks the provider for the roads around `boundary`, in the working CRS.
    pub fn retrieve_road_network(&self, boundary: &BoundingPolygon) -> Result<RoadNetworkGraph> {
        let graph = self.provider.graph_from_polygon(boundary.polygon(), self.crs())?;

        if graph.crs() != self.crs() {
            return Err(TessellateError::Retrieval(format!(
                "provider returned a graph in {}, expected {}",
                graph.crs(),
                self.crs()
            )));
        }
        if graph.is_empty() {
            return Err(TessellateError::NoRoadData);
        }

        log::log!(
            self.level(),
            "{}: {} road edges, {} junctions",
            Stage::GraphRetrieved,
            graph.edge_count(),
            graph.junction_count()
        );
        Ok(graph)
    }

    pub fn extract_seed_lines(&self, graph: &RoadNetworkGraph) -> SeedLines {
        let seeds = edges_to_geometry_collection(graph);
        match self.seed_spacing.filter(|d| *d > 0.0) {
            Some(spacing) => seeds.densified(spacing),
            None => seeds,
        }
    }

    pub fn compute_voronoi(&self, seeds: &SeedLines, boundary: &BoundingPolygon) -> Result<VoronoiPartition> {
        let partition = self.engine.voronoi(seeds, boundary.bounding_rect())?;
        if partition.is_empty() {
            return Err(TessellateError::EmptyTiling);
        }

        log::log!(
            self.level(),
            "{}: {} cells from {} seed lines ({} vertices)",
            Stage::VoronoiComputed,
            partition.len(),
            seeds.len(),
            seeds.vertex_count()
        );
        Ok(partition)
    }

    /// Cuts every cell down to `boundary`, dropping cells outside it.
    pub fn clip_to_boundary(&self, partition: &VoronoiPartition, boundary: &BoundingPolygon) -> Result<TileSet> {
        let engine = &self.engine;
        let clip = boundary.polygon();
        let min_area = boundary.area() * SLIVER_RATIO;

        let pieces = parallel::map(partition.cells(), |cell| -> Result<Vec<Tile>> {
            if !cell.polygon.intersects(clip) {
                return Ok(Vec::new());
            }
            let clipped = engine.intersect(&cell.polygon, clip)?;
            Ok(clipped
                .into_iter()
                .filter(|p| p.unsigned_area() > min_area)
                .map(|polygon| Tile { seed: cell.seed, polygon })
                .collect())
        });

        let mut tiles = Vec::with_capacity(partition.len());
        for piece in pieces {
            tiles.extend(piece?);
        }
        if tiles.is_empty() {
            return Err(TessellateError::EmptyTiling);
        }

        let tile_set = TileSet::new(tiles, boundary.crs());
        log::log!(
            self.level(),
            "{}: {} tiles covering {:.3} of {:.3} square units",
            Stage::Clipped,
            tile_set.len(),
            tile_set.total_area(),
            boundary.area()
        );
        Ok(tile_set)
    }

    /// Writes `tiles` to `output`, or next to the input file when `None`.
    pub fn persist(&self, tiles: &TileSet, output: Option<&Path>) -> Result<PathBuf> {
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => default_output_path(self.area.source()),
        };

        let features = tiles.tiles().iter().enumerate().map(|(i, tile)| {
            let mut properties = JsonObject::new();
            properties.insert("tile".to_string(), i.into());
            properties.insert("seed".to_string(), tile.seed.into());
            PolygonFeature { polygon: &tile.polygon, properties }
        });
        write_polygons(&path, tiles.crs(), features)?;

        log::log!(self.level(), "{}: {} tiles to {}", Stage::Persisted, tiles.len(), path.display());
        Ok(path)
    }

    /// Runs every in-memory stage and returns the tiles without writing them.
    pub fn tessellate(&self) -> Result<TileSet> {
        log::log!(
            self.level(),
            "{}: tessellating {} in {}",
            Stage::Idle,
            self.area.source().display(),
            self.crs()
        );
        let graph = self.retrieve_road_network(&self.boundary)?;
        let seeds = self.extract_seed_lines(&graph);
        let partition = self.compute_voronoi(&seeds, &self.boundary)?;
        self.clip_to_boundary(&partition, &self.boundary)
    }

    /// Tessellates the area and writes the tiles, returning the path written.
    pub fn area(&self, output: Option<&Path>) -> Result<PathBuf> {
        let tiles = self.tessellate()?;
        self.persist(&tiles, output)
    }
}

#[cfg(test)]
#[path = "tessellate_tests.rs"]
mod tests;
