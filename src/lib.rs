pub mod area;
pub mod crs;
pub mod error;
pub mod io;
pub mod network;
pub mod tessellate;
pub mod tessellator;
pub mod utils;
pub mod voronoi;

pub use area::{AreaGeometry, AreaLoader, BoundaryKind, BoundingPolygon};
pub use crs::Crs;
pub use error::{Result, TessellateError};
pub use network::{GeoJsonRoadNetwork, RoadNetworkGraph, RoadNetworkProvider, SeedLines};
pub use tessellate::{default_output_path, TessellationEngine, Tile, TileSet};
pub use tessellator::{TessellateOptions, Tessellator};
pub use voronoi::{DelaunayEngine, GeometryEngine, VoronoiCell, VoronoiPartition};
