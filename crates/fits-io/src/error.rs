//! Error types for FITS container operations.

use std::io::Write;

use thiserror::Error;

/// Result type for FITS container operations.
pub type FitsResult<T> = Result<T, FitsError>;

/// Errors raised while reading or writing a FITS container.
#[derive(Error, Debug)]
pub enum FitsError {
    /// Error reported by cfitsio through the `fitsio` bindings
    #[error(transparent)]
    Fits(#[from] fitsio::errors::Error),

    /// File I/O error outside cfitsio
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed header record
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A mandatory keyword is absent
    #[error("missing required keyword {0}")]
    MissingKeyword(String),

    /// A keyword is present but its value has the wrong type
    #[error("keyword {keyword} has an invalid value: {reason}")]
    InvalidKeyword { keyword: String, reason: String },

    /// BITPIX value outside the FITS standard set
    #[error("unsupported BITPIX value {0}")]
    UnsupportedBitpix(i64),

    /// Requested HDU does not exist
    #[error("HDU not found: {0}")]
    HduNotFound(String),

    /// HDU exists but is not of the expected kind
    #[error("HDU {index} is not a {expected}")]
    WrongHduKind { index: usize, expected: &'static str },

    /// Binary table column not present
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Output file exists and clobbering was not requested
    #[error("file already exists: {0} (prefix the name with '!' to overwrite)")]
    FileExists(String),

    /// Pixel buffer does not match the declared image shape
    #[error("invalid image data: {0}")]
    InvalidData(String),
}

impl FitsError {
    /// Create an InvalidHeader error.
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Create an InvalidKeyword error.
    pub fn invalid_keyword(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }

    /// cfitsio status code, when the error came from cfitsio.
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Fits(fitsio::errors::Error::Fits(e)) => Some(e.status),
            _ => None,
        }
    }

    /// Write a diagnostic block for this error, including its source chain.
    pub fn report<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "FITS error: {}", self)?;
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            writeln!(out, "  caused by: {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}

/// Turn a cfitsio status code into a result.
pub(crate) fn check_status(status: i32) -> FitsResult<()> {
    fitsio::errors::check_status(status).map_err(FitsError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_message() {
        let err = FitsError::MissingKeyword("NAXIS".to_string());
        let mut buf = Vec::new();
        err.report(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("FITS error: missing required keyword NAXIS"));
    }

    #[test]
    fn test_cfitsio_status_is_kept() {
        // 104: FILE_NOT_OPENED
        let err = check_status(104).unwrap_err();
        assert_eq!(err.status(), Some(104));
        let mut buf = Vec::new();
        err.report(&mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("FITS error: "));
        assert!(check_status(0).is_ok());
    }
}
