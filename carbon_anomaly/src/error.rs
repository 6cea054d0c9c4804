use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing required columns in {table} data: {}", missing.join(", "))]
    Schema {
        table: &'static str,
        missing: Vec<String>,
    },

    #[error("Row {row}: unrecognised month '{value}'")]
    InvalidMonth { row: usize, value: String },

    #[error("Row {row}: non-numeric value '{value}' in column {column}")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("Emissions factor for '{category}' must be positive, got {factor}")]
    InvalidFactor { category: String, factor: f64 },

    #[error("Emissions factor table has no fallback entry '{0}'")]
    MissingFallback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
