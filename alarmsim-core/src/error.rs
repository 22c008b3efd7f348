use thiserror::Error;

/// Result type alias for alarmsim core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for alarmsim core operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A caller-supplied parameter is outside its domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An aggregation was asked to summarize zero values
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),
}
