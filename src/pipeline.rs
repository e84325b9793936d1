use census::{
    derive_metrics, reconcile_with, AgeRange, JoinPolicy, JoinedFeature, MetricIndex,
    ReconcileSummary,
};

use crate::boundary::BoundaryFeature;
use crate::getter::{BoundarySource, PopulationSource};

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub joined: Vec<JoinedFeature<BoundaryFeature>>,
    pub summary: ReconcileSummary,
    /// Join keys claimed by more than one population row.
    pub collisions: Vec<String>,
}

/// Fetches both sources for `region_code` and joins the subgroup share onto
/// every boundary.
pub async fn run_pipeline<B, P>(
    boundaries: &B,
    population: &P,
    region_code: &str,
    range: AgeRange,
    policy: JoinPolicy,
) -> anyhow::Result<PipelineOutput>
where
    B: BoundarySource + Sync,
    P: PopulationSource + Sync,
{
    let features = boundaries.boundaries(region_code).await?;
    let rows = population.population().await?;

    let metrics = derive_metrics(&rows, range);
    let index = MetricIndex::build(&metrics, policy);
    if !index.collisions().is_empty() {
        tracing::warn!(
            count = index.collisions().len(),
            names = ?index.collisions(),
            "population rows share a join key, later rows win"
        );
    }

    let joined = reconcile_with(&features, &index);
    let summary = ReconcileSummary::of(&joined);
    tracing::info!(
        region_code,
        %range,
        ?policy,
        matched = summary.matched,
        unmatched = summary.unmatched.len(),
        "joined population onto boundaries"
    );
    if !summary.unmatched.is_empty() {
        tracing::debug!(names = ?summary.unmatched, "boundaries without population");
    }

    Ok(PipelineOutput {
        joined,
        summary,
        collisions: index.collisions().to_vec(),
    })
}
