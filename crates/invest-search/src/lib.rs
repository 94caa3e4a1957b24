pub mod model;
pub mod optimizer;
pub mod stats;

pub use model::{evaluate, expected_value, PairScore};
pub use optimizer::{
    optimize, save_results_json, sweep, GridCell, OptimizationResult, SearchGrid,
};
pub use stats::{survival_counts, SurvivalCounts};
