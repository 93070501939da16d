//! Error types used by the crate.

use cartograph_mvt::error::CartographMvtError;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum CartographError {
    /// I/O error (network or file)
    #[error("failed to load data")]
    IO,
    /// Error decoding vector tile data.
    #[error("failed to decode data")]
    Decoding(#[from] CartographMvtError),
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// Image decoding error.
    #[error("image decode error")]
    ImageDecode,
    /// Error reading a zip archive, or an entry not present inside one.
    #[error("archive error: {0}")]
    Zip(String),
    /// Error parsing a scene document.
    #[error("failed to parse scene document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A URL could not be parsed or resolved against its base.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// A scene document import graph contains a cycle.
    #[error("import cycle detected at {0}")]
    Cycle(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
    /// Error reading/writing data to the FS.
    #[error("failed to read file")]
    FsIo(#[from] std::io::Error),
}

impl From<reqwest::Error> for CartographError {
    fn from(_value: reqwest::Error) -> Self {
        Self::IO
    }
}

impl From<zip::result::ZipError> for CartographError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Zip(value.to_string())
    }
}

impl From<url::ParseError> for CartographError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidUrl(value.to_string())
    }
}
