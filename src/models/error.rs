use thiserror::Error;

/// Custom error types for the chaosmark watermarking library
#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Invalid dimensions: {0}")]
    Dimension(String),

    #[error("Side-channel record not found: {0}")]
    RecordNotFound(String),

    #[error("Degenerate arithmetic: {0}")]
    DegenerateArithmetic(String),

    #[error("Record serialization error: {0}")]
    Record(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
