//! Sequential FITS writer.

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};

use fitsio::hdu::FitsHdu;
use fitsio::images::ImageDescription;
use fitsio::sys;
use fitsio::tables::{ColumnDataType, ColumnDescription};
use tracing::{debug, warn};

use crate::card::{Card, Value};
use crate::error::{check_status, FitsError, FitsResult};
use crate::header::Header;
use crate::image::ImageData;

/// Keywords cfitsio generates itself; copies in caller headers are dropped.
const STRUCTURAL: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "EXTEND", "PCOUNT", "GCOUNT", "TFIELDS", "END",
];

/// One double-precision column of a single-row binary table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub name: String,
    pub values: Vec<f64>,
    /// Written as TDIMn when present; the product must equal `values.len()`.
    pub dims: Option<Vec<usize>>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            dims: None,
        }
    }

    pub fn with_dims(mut self, dims: Vec<usize>) -> Self {
        self.dims = Some(dims);
        self
    }
}

/// Writes HDUs one after another to a new file.
///
/// The file only survives if [`FitsWriter::close`] is called; a writer
/// dropped early deletes what it wrote.
pub struct FitsWriter {
    path: PathBuf,
    clobber: bool,
    fptr: Option<fitsio::FitsFile>,
    hdu_count: usize,
    closed: bool,
}

impl FitsWriter {
    /// Prepare to write `name`.
    ///
    /// An existing file is an error unless the name starts with `!`, in which
    /// case the `!` is stripped and the file is replaced. Nothing is written
    /// until the first HDU.
    pub fn create(name: impl AsRef<str>) -> FitsResult<Self> {
        let name = name.as_ref();
        let (path, clobber) = match name.strip_prefix('!') {
            Some(rest) => (PathBuf::from(rest), true),
            None => (PathBuf::from(name), false),
        };
        if !clobber && path.exists() {
            return Err(FitsError::FileExists(path.display().to_string()));
        }

        Ok(Self {
            path,
            clobber,
            fptr: None,
            hdu_count: 0,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an image HDU (the primary HDU if nothing was written yet).
    ///
    /// `extra` supplies additional keyrecords such as WCS or BUNIT. They are
    /// written after the pixels so BSCALE/BZERO never rescale them.
    pub fn write_image(&mut self, extra: &Header, axes: &[usize], data: &ImageData) -> FitsResult<()> {
        let expected = if axes.is_empty() {
            Some(0)
        } else {
            axes.iter().try_fold(1usize, |acc, &len| acc.checked_mul(len))
        };
        if expected != Some(data.len()) {
            return Err(FitsError::InvalidData(format!(
                "{} samples for axes {:?}",
                data.len(),
                axes
            )));
        }

        // cfitsio takes the slowest axis first.
        let dimensions: Vec<usize> = axes.iter().rev().copied().collect();
        let description = ImageDescription {
            data_type: data.pixel_type().image_type(),
            dimensions: &dimensions,
        };

        let hdu = if self.fptr.is_none() {
            self.open_with(Some(&description))?.primary_hdu()?
        } else {
            let extname = extra.get_str("EXTNAME").unwrap_or("IMAGE").to_string();
            self.file()?.create_image(extname, &description)?
        };

        let fptr = self.file()?;
        if !data.is_empty() {
            data.write(&hdu, fptr)?;
        }
        write_keyrecords(fptr, &hdu, extra)?;
        self.hdu_count += 1;
        debug!(axes = ?axes, pixel_type = %data.pixel_type(), "wrote image HDU");
        Ok(())
    }

    /// Write a single-row binary table of double-precision array columns.
    ///
    /// An empty primary HDU is written first when needed. The extension is
    /// named by EXTNAME in `extra`.
    pub fn write_bintable(&mut self, extra: &Header, columns: &[TableColumn]) -> FitsResult<()> {
        for column in columns {
            if let Some(dims) = &column.dims {
                if dims.iter().product::<usize>() != column.values.len() {
                    return Err(FitsError::InvalidData(format!(
                        "column {} has {} values but TDIM {:?}",
                        column.name,
                        column.values.len(),
                        dims
                    )));
                }
            }
        }
        let extname = extra
            .get_str("EXTNAME")
            .ok_or_else(|| FitsError::MissingKeyword("EXTNAME".to_string()))?
            .to_string();

        if self.fptr.is_none() {
            self.open_with(None)?;
            self.hdu_count += 1;
        }

        let descriptions = columns
            .iter()
            .map(|column| {
                ColumnDescription::new(column.name.as_str())
                    .with_type(ColumnDataType::Double)
                    .that_repeats(column.values.len())
                    .create()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fptr = self.file()?;
        let hdu = fptr.create_table(extname, &descriptions)?;
        for (n, column) in columns.iter().enumerate() {
            hdu.write_col(fptr, column.name.as_str(), column.values.as_slice())?;
            if let Some(dims) = &column.dims {
                let dims: Vec<String> = dims.iter().map(usize::to_string).collect();
                hdu.write_key(fptr, &format!("TDIM{}", n + 1), format!("({})", dims.join(",")))?;
            }
        }

        let mut rest = Header::new();
        for card in extra.cards().iter().filter(|c| c.keyword != "EXTNAME") {
            rest.push(card.clone());
        }
        write_keyrecords(fptr, &hdu, &rest)?;
        self.hdu_count += 1;
        debug!(columns = columns.len(), "wrote binary table HDU");
        Ok(())
    }

    /// Flush and keep the file.
    pub fn close(mut self) -> FitsResult<()> {
        if self.fptr.is_none() {
            // Nothing written yet: leave an empty primary HDU.
            self.open_with(None)?;
        }
        // cfitsio flushes and closes when the handle drops.
        drop(self.fptr.take());
        self.closed = true;
        debug!(path = %self.path.display(), hdus = self.hdu_count, "closed output file");
        Ok(())
    }

    fn open_with(&mut self, primary: Option<&ImageDescription>) -> FitsResult<&mut fitsio::FitsFile> {
        let mut builder = fitsio::FitsFile::create(&self.path);
        if let Some(description) = primary {
            builder = builder.with_custom_primary(description);
        }
        if self.clobber {
            builder = builder.overwrite();
        }
        let fptr = builder.open()?;
        debug!(path = %self.path.display(), clobber = self.clobber, "created output file");
        Ok(self.fptr.insert(fptr))
    }

    fn file(&mut self) -> FitsResult<&mut fitsio::FitsFile> {
        self.fptr
            .as_mut()
            .ok_or_else(|| FitsError::InvalidData("writer already closed".to_string()))
    }
}

impl Drop for FitsWriter {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let opened = self.fptr.take().is_some();
        if opened {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove partial output file");
            } else {
                debug!(path = %self.path.display(), "removed partial output file");
            }
        }
    }
}

fn is_structural(keyword: &str) -> bool {
    STRUCTURAL.contains(&keyword)
        || (keyword.starts_with("NAXIS") && keyword[5..].chars().all(|c| c.is_ascii_digit()))
}

/// Append caller keyrecords to the current HDU.
///
/// Plain string, integer and real cards go through `write_key`; commentary
/// and anything carrying a comment is written as a raw record.
fn write_keyrecords(fptr: &mut fitsio::FitsFile, hdu: &FitsHdu, extra: &Header) -> FitsResult<()> {
    for card in extra.cards() {
        if is_structural(&card.keyword) {
            continue;
        }
        match (&card.value, &card.comment) {
            (Some(Value::Str(v)), None) => hdu.write_key(fptr, &card.keyword, v.clone())?,
            (Some(Value::Int(v)), None) => hdu.write_key(fptr, &card.keyword, *v)?,
            (Some(Value::Float(v)), None) => hdu.write_key(fptr, &card.keyword, *v)?,
            _ => write_record(fptr, card)?,
        }
    }
    Ok(())
}

fn write_record(fptr: &mut fitsio::FitsFile, card: &Card) -> FitsResult<()> {
    let record = CString::new(card.to_record())
        .map_err(|e| FitsError::invalid_header(e.to_string()))?;
    let mut status: c_int = 0;
    unsafe {
        sys::ffprec(fptr.as_raw(), record.as_ptr(), &mut status);
    }
    check_status(status)
}
