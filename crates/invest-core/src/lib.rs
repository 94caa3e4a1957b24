pub mod config;
pub mod domain;
pub mod logging;

pub use config::Settings;
pub use domain::errors::{AnalyzerError, Result};
