//! Error types for reprojection.

use std::path::PathBuf;

use fits_io::FitsError;
use thiserror::Error;
use wcs::WcsError;

/// Errors that abort a reprojection run.
///
/// Per-sample transform failures are not errors: they leave the output
/// sample blank.
#[derive(Error, Debug)]
pub enum ReprojectError {
    /// Bad `-a` value or an alternate that does not exist.
    #[error("{0}")]
    InvalidSelector(String),

    /// Every corner of the input image failed to transform.
    #[error("cannot determine the image footprint: no corner has valid world coordinates")]
    FootprintUndetermined,

    /// Output scale or dimensions cannot be derived.
    #[error("output geometry is underspecified: {0}")]
    GeometryUnderspecified(String),

    /// Reading or writing the image container failed.
    #[error(transparent)]
    Container(#[from] FitsError),

    /// Header parsing, table loading or transform setup failed.
    #[error(transparent)]
    Wcs(WcsError),

    /// The output WCS header file could not be read.
    #[error("cannot open header file \"{path}\": {source}")]
    HeaderFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or value is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input HDU cannot be reprojected.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// Writing program output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl ReprojectError {
    /// Create an InvalidSelector error.
    pub fn invalid_selector(msg: impl Into<String>) -> Self {
        Self::InvalidSelector(msg.into())
    }

    /// Create a GeometryUnderspecified error.
    pub fn underspecified(msg: impl Into<String>) -> Self {
        Self::GeometryUnderspecified(msg.into())
    }

    /// Create an UnsupportedImage error.
    pub fn unsupported_image(msg: impl Into<String>) -> Self {
        Self::UnsupportedImage(msg.into())
    }

    /// The container error behind this error, if any.
    ///
    /// Table-loading failures surface as WCS errors wrapping a container
    /// error; both count as container failures.
    pub fn container_error(&self) -> Option<&FitsError> {
        match self {
            Self::Container(err) => Some(err),
            Self::Wcs(WcsError::Fits(err)) => Some(err),
            _ => None,
        }
    }
}

impl From<WcsError> for ReprojectError {
    fn from(err: WcsError) -> Self {
        match err {
            WcsError::Fits(err) => Self::Container(err),
            other => Self::Wcs(other),
        }
    }
}

impl From<serde_yaml::Error> for ReprojectError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for reprojection operations.
pub type Result<T> = std::result::Result<T, ReprojectError>;
