use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TessellateError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Projection error: {0}")]
    Projection(String),

    /// The road-network provider failed or handed back an unusable graph.
    #[error("Road network retrieval failed: {0}")]
    Retrieval(String),

    /// The planar geometry engine failed (triangulation, overlay).
    #[error("Geometry engine failed: {0}")]
    Geometry(String),

    #[error("No road network found within the bounding polygon")]
    NoRoadData,

    #[error("Tessellation produced no tiles inside the bounding polygon")]
    EmptyTiling,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TessellateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TessellateError::NotFound { .. })
    }

    pub fn is_invalid_geometry(&self) -> bool {
        matches!(self, TessellateError::InvalidGeometry(_))
    }
}

pub type Result<T> = std::result::Result<T, TessellateError>;
