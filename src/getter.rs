use async_trait::async_trait;
use census::PopulationRow;

use crate::boundary::BoundaryFeature;

/// Gets administrative boundaries for a region.
#[async_trait]
pub trait BoundarySource {
    /// Gets the subdivisions of `region_code` (e.g. `"11"` for Seoul).
    async fn boundaries(&self, region_code: &str) -> anyhow::Result<Vec<BoundaryFeature>>;
}

/// Gets population by single-year age.
#[async_trait]
pub trait PopulationSource {
    /// Gets one row per administrative subdivision.
    async fn population(&self) -> anyhow::Result<Vec<PopulationRow>>;
}
