//! Binary table (BINTABLE) extensions.
//!
//! Only what coordinate lookup tables need: locating columns by TTYPE,
//! reading TDIM, and reading numeric cells as f64.

use std::os::raw::c_int;

use fitsio::sys;

use crate::error::{check_status, FitsError, FitsResult};
use crate::header::Header;
use crate::FitsFile;

/// One column of a binary table.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// 1-based column number.
    pub number: usize,
    /// Elements per cell.
    pub repeat: usize,
    /// TDIMn in FITS order (first index varies fastest), when declared.
    pub dims: Option<Vec<usize>>,
}

impl Column {
    /// Cell shape: TDIM when present, otherwise the repeat count.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.clone().unwrap_or_else(|| vec![self.repeat])
    }
}

/// Column layout of a binary table HDU.
#[derive(Debug, Clone)]
pub struct BinTable {
    hdu_index: usize,
    columns: Vec<Column>,
    rows: usize,
}

impl BinTable {
    pub(crate) fn from_layout(
        hdu_index: usize,
        layout: &[(String, usize)],
        rows: usize,
        header: &Header,
    ) -> FitsResult<Self> {
        let columns = layout
            .iter()
            .enumerate()
            .map(|(n, (name, repeat))| {
                let dims = header
                    .get_str(&format!("TDIM{}", n + 1))
                    .map(parse_tdim)
                    .transpose()?;
                Ok(Column {
                    name: name.clone(),
                    number: n + 1,
                    repeat: *repeat,
                    dims,
                })
            })
            .collect::<FitsResult<Vec<_>>>()?;
        Ok(Self {
            hdu_index,
            columns,
            rows,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Find a column by TTYPE (case-insensitive, trailing blanks ignored).
    pub fn column(&self, name: &str) -> FitsResult<&Column> {
        let wanted = name.trim();
        self.columns
            .iter()
            .find(|c| c.name.trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FitsError::ColumnNotFound(name.to_string()))
    }

    /// Read every element of one cell (0-based `row`) as f64, in storage order.
    ///
    /// cfitsio converts integer and single-precision columns.
    pub fn read_cell_f64(&self, file: &mut FitsFile, name: &str, row: usize) -> FitsResult<Vec<f64>> {
        let column = self.column(name)?;
        if row >= self.rows {
            return Err(FitsError::InvalidData(format!(
                "row {} out of range ({} rows)",
                row, self.rows
            )));
        }

        let fptr = file.raw_mut();
        fptr.hdu(self.hdu_index)?;

        let mut values = vec![0.0f64; column.repeat];
        let mut any_null: c_int = 0;
        let mut status: c_int = 0;
        unsafe {
            sys::ffgcvd(
                fptr.as_raw(),
                column.number as c_int,
                row as i64 + 1,
                1,
                column.repeat as i64,
                f64::NAN,
                values.as_mut_ptr(),
                &mut any_null,
                &mut status,
            );
        }
        check_status(status)?;
        Ok(values)
    }
}

/// Parse a TDIM value such as `(2,10,5)`.
pub fn parse_tdim(tdim: &str) -> FitsResult<Vec<usize>> {
    let inner = tdim
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| FitsError::invalid_keyword("TDIM", format!("malformed '{}'", tdim)))?;
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| FitsError::invalid_keyword("TDIM", format!("malformed '{}'", tdim)))
        })
        .collect()
}
