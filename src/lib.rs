pub mod boundary;
pub mod getter;
pub mod pipeline;
pub mod population;
pub mod regions;
pub mod render;
pub mod sgis;

pub use boundary::BoundaryFeature;
pub use getter::{BoundarySource, PopulationSource};
pub use pipeline::{run_pipeline, PipelineOutput};
