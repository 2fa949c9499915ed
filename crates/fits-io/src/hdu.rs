//! Header-data units.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use fitsio::hdu::HduInfo;
use fitsio::sys;

use crate::card::CARD_LEN;
use crate::error::{check_status, FitsError, FitsResult};
use crate::header::Header;
use crate::image::{ImageData, ImageInfo, PixelType};
use crate::table::BinTable;
use crate::FitsFile;

/// Kind of header-data unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HduKind {
    Primary,
    Image,
    BinTable,
    AsciiTable,
    Other(String),
}

/// Data layout cfitsio reports for an HDU.
#[derive(Debug, Clone)]
enum Layout {
    /// NAXIS1..NAXISn, fastest axis first.
    Image(Vec<usize>),
    /// Column names with their repeat counts, and the row count.
    Table(Vec<(String, usize)>, usize),
    Other,
}

/// One header-data unit of an open FITS file, with its keyrecords.
#[derive(Debug, Clone)]
pub struct Hdu {
    pub index: usize,
    pub kind: HduKind,
    pub header: Header,
    layout: Layout,
}

impl Hdu {
    /// Move to HDU `index` (0 = primary) and read its keyrecords.
    pub(crate) fn load(fptr: &mut fitsio::FitsFile, index: usize) -> FitsResult<Self> {
        let hdu = fptr.hdu(index)?;
        let header = read_keyrecords(fptr)?;

        let layout = match &hdu.info {
            // cfitsio reports the slowest axis first.
            HduInfo::ImageInfo { shape, .. } => Layout::Image(shape.iter().rev().copied().collect()),
            HduInfo::TableInfo {
                column_descriptions,
                num_rows,
            } => Layout::Table(
                column_descriptions
                    .iter()
                    .map(|c| (c.name.clone(), c.data_type.repeat))
                    .collect(),
                *num_rows,
            ),
            HduInfo::AnyInfo => Layout::Other,
        };

        let kind = match (&layout, index) {
            (Layout::Image(_), 0) => HduKind::Primary,
            (Layout::Image(_), _) => HduKind::Image,
            _ => match header.get_str("XTENSION").map(str::trim) {
                Some("BINTABLE") => HduKind::BinTable,
                Some("TABLE") => HduKind::AsciiTable,
                Some(other) => HduKind::Other(other.to_string()),
                None => return Err(FitsError::MissingKeyword("XTENSION".to_string())),
            },
        };

        tracing::debug!(index, kind = ?kind, keyrecords = header.len(), "loaded HDU");
        Ok(Self {
            index,
            kind,
            header,
            layout,
        })
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, HduKind::Primary | HduKind::Image)
    }

    pub fn extname(&self) -> Option<&str> {
        self.header.get_str("EXTNAME")
    }

    pub fn extver(&self) -> i64 {
        self.header.get_i64("EXTVER").unwrap_or(1)
    }

    pub fn extlevel(&self) -> i64 {
        self.header.get_i64("EXTLEVEL").unwrap_or(1)
    }

    /// Pixel type and axis extents of an image HDU.
    ///
    /// The pixel type follows the stored BITPIX, not the type BZERO implies.
    pub fn image_info(&self) -> FitsResult<ImageInfo> {
        let Layout::Image(axes) = &self.layout else {
            return Err(FitsError::WrongHduKind {
                index: self.index,
                expected: "image",
            });
        };
        let pixel_type = PixelType::from_bitpix(self.header.require_i64("BITPIX")?)?;
        Ok(ImageInfo {
            pixel_type,
            axes: axes.clone(),
        })
    }

    /// Read the image samples in storage order, exactly as stored.
    pub fn read_image(&self, file: &mut FitsFile) -> FitsResult<ImageData> {
        let info = self.image_info()?;
        let count = info.pixel_count().ok_or_else(|| {
            FitsError::InvalidData(format!("image axes {:?} overflow the address space", info.axes))
        })?;
        if count == 0 {
            return Ok(ImageData::blank(info.pixel_type, 0));
        }

        let fptr = file.raw_mut();
        let hdu = fptr.hdu(self.index)?;
        disable_scaling(fptr)?;
        let data = ImageData::read(info.pixel_type, &hdu, fptr)?;
        if data.len() != count {
            return Err(FitsError::InvalidData(format!(
                "read {} samples for axes {:?}",
                data.len(),
                info.axes
            )));
        }
        Ok(data)
    }

    /// Column layout of a binary table HDU.
    pub fn read_bintable(&self) -> FitsResult<BinTable> {
        match (&self.kind, &self.layout) {
            (HduKind::BinTable, Layout::Table(columns, rows)) => {
                BinTable::from_layout(self.index, columns, *rows, &self.header)
            }
            _ => Err(FitsError::WrongHduKind {
                index: self.index,
                expected: "binary table",
            }),
        }
    }
}

/// All keyrecords of the current HDU, END excluded.
fn read_keyrecords(fptr: &mut fitsio::FitsFile) -> FitsResult<Header> {
    let mut status: c_int = 0;
    let mut count: c_int = 0;
    let mut more: c_int = 0;
    let raw = unsafe { fptr.as_raw() };
    unsafe {
        sys::ffghsp(raw, &mut count, &mut more, &mut status);
    }
    check_status(status)?;

    let mut records = Vec::with_capacity(count.max(0) as usize);
    for n in 1..=count {
        let mut buf: [c_char; CARD_LEN + 1] = [0; CARD_LEN + 1];
        unsafe {
            sys::ffgrec(raw, n, buf.as_mut_ptr(), &mut status);
        }
        check_status(status)?;
        let record = unsafe { CStr::from_ptr(buf.as_ptr()) };
        records.push(record.to_string_lossy().into_owned());
    }
    Header::from_records(records.iter().map(String::as_str))
}

/// Read integer images as stored, leaving BSCALE/BZERO to the header.
fn disable_scaling(fptr: &mut fitsio::FitsFile) -> FitsResult<()> {
    let mut status: c_int = 0;
    unsafe {
        sys::ffpscl(fptr.as_raw(), 1.0, 0.0, &mut status);
    }
    check_status(status)
}
