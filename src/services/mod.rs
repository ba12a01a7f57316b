pub mod candidates;
pub mod enrichment;
pub mod providers;
pub mod recommendations;

pub use recommendations::ShowSearchPipeline;
