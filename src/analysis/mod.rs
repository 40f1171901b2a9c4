// Keyword co-ranking clique analysis.
//
// Stages, in pipeline order: normalize, window, overlap, clique, report.
// `pipeline::analyze` runs them all; `control` carries progress and
// cancellation across stage boundaries.

pub mod clique;
pub mod control;
pub mod normalize;
pub mod overlap;
pub mod pipeline;
pub mod report;
pub mod window;

pub use pipeline::{analyze, AnalysisOptions};
