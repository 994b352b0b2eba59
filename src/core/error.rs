// Error handling for the telemetry log engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CanlogError>;

#[derive(Error, Debug)]
pub enum CanlogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Too many parse errors in {source_name}: {count} (limit {limit})")]
    TooManyErrors {
        source_name: String,
        count: usize,
        limit: usize,
    },

    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Division by zero at {count} aligned points")]
    DivisionByZero { count: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Config error: {0}")]
    Config(String),
}
