//! FITS container access on top of cfitsio (through the `fitsio` crate).
//!
//! Reads headers, images and binary-table cells and writes image and
//! single-row table HDUs. Header keyrecords are kept as parsed [`Card`]s so
//! the same representation serves FITS files and free-standing header text.
//!
//! # Example
//!
//! ```ignore
//! use fits_io::FitsFile;
//!
//! let mut file = FitsFile::open("image.fits")?;
//! let primary = file.primary()?;
//! let info = primary.image_info()?;
//! println!("{} with axes {:?}", info.pixel_type, info.axes);
//! let pixels = primary.read_image(&mut file)?;
//! ```

pub mod card;
pub mod error;
pub mod hdu;
pub mod header;
pub mod image;
pub mod table;
pub mod writer;

use std::path::{Path, PathBuf};

use tracing::debug;

pub use card::{Card, Value};
pub use error::{FitsError, FitsResult};
pub use hdu::{Hdu, HduKind};
pub use header::Header;
pub use image::{ImageData, ImageInfo, PixelType};
pub use table::{BinTable, Column};
pub use writer::{FitsWriter, TableColumn};

/// An open FITS file.
pub struct FitsFile {
    path: PathBuf,
    fptr: fitsio::FitsFile,
}

impl std::fmt::Debug for FitsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitsFile").field("path", &self.path).finish()
    }
}

impl FitsFile {
    /// Open an existing file read-only.
    pub fn open(path: impl AsRef<Path>) -> FitsResult<Self> {
        let path = path.as_ref();
        let fptr = fitsio::FitsFile::open(path)?;
        debug!(path = %path.display(), "opened FITS file");
        Ok(Self {
            path: path.to_path_buf(),
            fptr,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn raw_mut(&mut self) -> &mut fitsio::FitsFile {
        &mut self.fptr
    }

    /// HDU `index`, 0 being the primary HDU.
    pub fn hdu(&mut self, index: usize) -> FitsResult<Hdu> {
        Hdu::load(&mut self.fptr, index)
    }

    pub fn primary(&mut self) -> FitsResult<Hdu> {
        self.hdu(0)
    }

    /// Every HDU in file order.
    pub fn hdus(&mut self) -> FitsResult<Vec<Hdu>> {
        let mut hdus = vec![self.primary()?];
        while let Ok(hdu) = self.hdu(hdus.len()) {
            hdus.push(hdu);
        }
        Ok(hdus)
    }

    /// Find an extension by EXTNAME, EXTVER and EXTLEVEL.
    ///
    /// EXTNAME comparison ignores case and trailing blanks; absent EXTVER and
    /// EXTLEVEL keywords count as 1.
    pub fn find_extension(&mut self, extname: &str, extver: i64, extlevel: i64) -> FitsResult<Hdu> {
        let wanted = extname.trim();
        let mut index = 1;
        while let Ok(hdu) = self.hdu(index) {
            let matches = hdu
                .extname()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(wanted))
                && hdu.extver() == extver
                && hdu.extlevel() == extlevel;
            if matches {
                return Ok(hdu);
            }
            index += 1;
        }
        Err(FitsError::HduNotFound(format!(
            "EXTNAME='{}' EXTVER={} EXTLEVEL={}",
            wanted, extver, extlevel
        )))
    }
}
