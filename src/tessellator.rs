use crate::crs::Crs;
use crate::error::Result;
use crate::network::RoadNetworkProvider;
use crate::tessellate::TessellationEngine;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TessellateOptions {
    /// Working CRS. Must be projected for distances and areas to mean anything.
    pub crs: Crs,
    pub debug: bool,
}

/// Entry point: turns an area file into a tile file.
///
/// Holds configuration and a road-network provider; every call builds its own
/// [`TessellationEngine`], so one `Tessellator` can serve unrelated areas.
pub struct Tessellator<P> {
    options: TessellateOptions,
    provider: P,
}

impl<P: RoadNetworkProvider> Tessellator<P> {
    pub fn new(options: TessellateOptions, provider: P) -> Self {
        Self { options, provider }
    }

    pub fn crs(&self) -> Crs {
        self.options.crs
    }

    pub fn debug(&self) -> bool {
        self.options.debug
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Tessellates `filepath` and returns the path of the written tiles.
    ///
    /// Without `output` the tiles land next to the input as `<stem>_tip.geojson`.
    pub fn tessellate_area(&self, filepath: impl AsRef<Path>, output: Option<&Path>) -> Result<PathBuf> {
        TessellationEngine::open(filepath, self.options.crs, &self.provider)?
            .with_debug(self.options.debug)
            .area(output)
    }
}
