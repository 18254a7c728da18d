use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for spray card analysis
#[derive(Error, Debug)]
pub enum SprayCardError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    /// Rejected before the analysis core runs (bad dimensions, missing file, bad extension,
    /// undecodable bytes)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The one failure the analysis core itself raises
    #[error("Cannot compute pixel area of a {width}x{height} image")]
    DegenerateImage { width: u32, height: u32 },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

impl SprayCardError {
    /// Status code the boundary layer should answer with for this error.
    /// Caller mistakes map to 400, failures during computation or output to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            SprayCardError::InvalidInput(_) | SprayCardError::InvalidPath(_) => 400,
            _ => 500,
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, SprayCardError>;
