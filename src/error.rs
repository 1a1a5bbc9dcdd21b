use thiserror::Error;

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured photo library is missing or not a directory.
    #[error("invalid photo library: {0}")]
    BadDir(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Configuration parsed but holds values the slideshow cannot run with.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
