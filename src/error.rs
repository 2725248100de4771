use thiserror::Error;

/// Failure to read a resource below the gallery root.
///
/// `NotFound` is an expected outcome (absent story text), the other variants
/// are real read failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("refusing to read outside the gallery root: {0}")]
    OutsideRoot(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Failure to produce a gallery from its manifest.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Invalid command line or configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("unexpected extra argument: {0}")]
    UnexpectedArgument(String),
}
