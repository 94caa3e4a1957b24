use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid lower threshold: x must be positive, got {0}")]
    InvalidThreshold(f64),

    #[error("Invalid search range: step must be positive, got {0}")]
    InvalidRange(f64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
