//! Error types for coordinate descriptors and transforms.

use fits_io::FitsError;
use thiserror::Error;

/// Result type for descriptor parsing, table loading and transform setup.
pub type WcsResult<T> = Result<T, WcsError>;

/// Errors raised while building coordinate descriptors or transforms.
#[derive(Error, Debug)]
pub enum WcsError {
    /// The header holds no WCS keyrecords at all.
    #[error("no world coordinate systems found")]
    NoDescriptorsFound,

    /// A WCS keyword carries a value the descriptor cannot use.
    #[error("keyword {keyword} has an invalid value: {reason}")]
    InvalidKeyword { keyword: String, reason: String },

    /// Descriptor is internally inconsistent.
    #[error("invalid coordinate descriptor: {0}")]
    InvalidDescriptor(String),

    /// CTYPE names an algorithm this crate does not implement.
    #[error("unsupported projection code '{code}' on axis {axis}")]
    UnsupportedProjection { axis: usize, code: String },

    /// Linear transformation matrix cannot be inverted.
    #[error("linear transformation matrix is singular")]
    SingularMatrix,

    /// A -TAB axis was used before its lookup table was loaded.
    #[error("lookup table for axis {axis} has not been loaded")]
    TableNotLoaded { axis: usize },

    /// Lookup table shape or contents not supported.
    #[error("unsupported lookup table: {0}")]
    UnsupportedTable(String),

    /// Celestial pole cannot be placed from CRVAL, LONPOLE and LATPOLE.
    #[error("invalid celestial parameters: {0}")]
    InvalidCelestial(String),

    /// Error reading the table extension.
    #[error(transparent)]
    Fits(#[from] FitsError),
}

impl WcsError {
    /// Create an InvalidKeyword error.
    pub fn invalid_keyword(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidDescriptor error.
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// Create an UnsupportedTable error.
    pub fn unsupported_table(msg: impl Into<String>) -> Self {
        Self::UnsupportedTable(msg.into())
    }
}

/// Per-point failure of a pixel/world transform.
///
/// Callers treat these as "no value here" rather than fatal errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// Input coordinate is NaN or infinite.
    #[error("coordinate is not finite")]
    NonFinite,

    /// Buffer shorter than the descriptor's axis count.
    #[error("coordinate buffer has {actual} axes, expected at least {expected}")]
    AxisMismatch { expected: usize, actual: usize },

    /// Point lies outside the domain of the celestial projection.
    #[error("point lies outside the projection domain")]
    OutOfDomain,

    /// Point lies outside the lookup table (beyond half a cell past its edge).
    #[error("coordinate lies outside the lookup table")]
    OutsideTable,

    /// Inverse table lookup found no cell containing the world coordinate.
    #[error("no lookup table cell contains the world coordinate")]
    NoSolution,
}
