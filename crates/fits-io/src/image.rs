//! Image pixel types and typed pixel buffers.

use fitsio::hdu::FitsHdu;
use fitsio::images::ImageType;

use crate::error::{FitsError, FitsResult};

/// Sample storage format, one variant per standard BITPIX value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PixelType {
    pub fn from_bitpix(bitpix: i64) -> FitsResult<Self> {
        match bitpix {
            8 => Ok(Self::U8),
            16 => Ok(Self::I16),
            32 => Ok(Self::I32),
            64 => Ok(Self::I64),
            -32 => Ok(Self::F32),
            -64 => Ok(Self::F64),
            other => Err(FitsError::UnsupportedBitpix(other)),
        }
    }

    pub fn bitpix(&self) -> i64 {
        match self {
            Self::U8 => 8,
            Self::I16 => 16,
            Self::I32 => 32,
            Self::I64 => 64,
            Self::F32 => -32,
            Self::F64 => -64,
        }
    }

    /// cfitsio image type with the same BITPIX.
    pub fn image_type(&self) -> ImageType {
        match self {
            Self::U8 => ImageType::UnsignedByte,
            Self::I16 => ImageType::Short,
            Self::I32 => ImageType::Long,
            Self::I64 => ImageType::LongLong,
            Self::F32 => ImageType::Float,
            Self::F64 => ImageType::Double,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// BLANK value written for undefined integer samples.
    pub fn default_blank(&self) -> Option<i64> {
        match self {
            Self::U8 => Some(0),
            Self::I16 => Some(i16::MIN as i64),
            Self::I32 => Some(i32::MIN as i64),
            Self::I64 => Some(i64::MIN),
            Self::F32 | Self::F64 => None,
        }
    }
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BITPIX={}", self.bitpix())
    }
}

/// Pixel type and NAXISn extents of an image HDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub pixel_type: PixelType,
    /// NAXIS1..NAXISn; NAXIS1 varies fastest in storage.
    pub axes: Vec<usize>,
}

impl ImageInfo {
    /// Number of samples, or `None` when the product overflows.
    pub fn pixel_count(&self) -> Option<usize> {
        if self.axes.is_empty() {
            return Some(0);
        }
        self.axes
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
    }
}

/// Image samples in native byte order, typed by BITPIX.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl ImageData {
    /// Read the whole image of the current HDU as stored, without BSCALE/BZERO.
    pub(crate) fn read(
        pixel_type: PixelType,
        hdu: &FitsHdu,
        fptr: &mut fitsio::FitsFile,
    ) -> FitsResult<Self> {
        let data = match pixel_type {
            PixelType::U8 => Self::U8(hdu.read_image(fptr)?),
            PixelType::I16 => Self::I16(hdu.read_image(fptr)?),
            PixelType::I32 => Self::I32(hdu.read_image(fptr)?),
            PixelType::I64 => Self::I64(hdu.read_image(fptr)?),
            PixelType::F32 => Self::F32(hdu.read_image(fptr)?),
            PixelType::F64 => Self::F64(hdu.read_image(fptr)?),
        };
        Ok(data)
    }

    /// Write every sample into the image of `hdu`.
    pub(crate) fn write(&self, hdu: &FitsHdu, fptr: &mut fitsio::FitsFile) -> FitsResult<()> {
        match self {
            Self::U8(v) => hdu.write_image(fptr, v.as_slice())?,
            Self::I16(v) => hdu.write_image(fptr, v.as_slice())?,
            Self::I32(v) => hdu.write_image(fptr, v.as_slice())?,
            Self::I64(v) => hdu.write_image(fptr, v.as_slice())?,
            Self::F32(v) => hdu.write_image(fptr, v.as_slice())?,
            Self::F64(v) => hdu.write_image(fptr, v.as_slice())?,
        };
        Ok(())
    }

    /// A buffer of `len` undefined samples (NaN or the default BLANK value).
    pub fn blank(pixel_type: PixelType, len: usize) -> Self {
        Self::blank_with(pixel_type, len, None)
    }

    /// Like [`Self::blank`], with an explicit BLANK value for integer types.
    pub fn blank_with(pixel_type: PixelType, len: usize, blank: Option<i64>) -> Self {
        let blank = blank.or(pixel_type.default_blank()).unwrap_or(0);
        match pixel_type {
            PixelType::U8 => Self::U8(vec![blank as u8; len]),
            PixelType::I16 => Self::I16(vec![blank as i16; len]),
            PixelType::I32 => Self::I32(vec![blank as i32; len]),
            PixelType::I64 => Self::I64(vec![blank; len]),
            PixelType::F32 => Self::F32(vec![f32::NAN; len]),
            PixelType::F64 => Self::F64(vec![f64::NAN; len]),
        }
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            Self::U8(_) => PixelType::U8,
            Self::I16(_) => PixelType::I16,
            Self::I32(_) => PixelType::I32,
            Self::I64(_) => PixelType::I64,
            Self::F32(_) => PixelType::F32,
            Self::F64(_) => PixelType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy sample `src_idx` of `src` into slot `dst_idx` without conversion.
    ///
    /// Both buffers must share a pixel type.
    pub fn copy_sample(&mut self, dst_idx: usize, src: &ImageData, src_idx: usize) -> FitsResult<()> {
        match (self, src) {
            (Self::U8(d), Self::U8(s)) => d[dst_idx] = s[src_idx],
            (Self::I16(d), Self::I16(s)) => d[dst_idx] = s[src_idx],
            (Self::I32(d), Self::I32(s)) => d[dst_idx] = s[src_idx],
            (Self::I64(d), Self::I64(s)) => d[dst_idx] = s[src_idx],
            (Self::F32(d), Self::F32(s)) => d[dst_idx] = s[src_idx],
            (Self::F64(d), Self::F64(s)) => d[dst_idx] = s[src_idx],
            (dst, src) => {
                return Err(FitsError::InvalidData(format!(
                    "cannot copy {} sample into {} buffer",
                    src.pixel_type(),
                    dst.pixel_type()
                )))
            }
        }
        Ok(())
    }

    /// Sample `idx` widened to f64 (raw stored value, no BSCALE/BZERO).
    pub fn value_f64(&self, idx: usize) -> Option<f64> {
        match self {
            Self::U8(v) => v.get(idx).map(|x| *x as f64),
            Self::I16(v) => v.get(idx).map(|x| *x as f64),
            Self::I32(v) => v.get(idx).map(|x| *x as f64),
            Self::I64(v) => v.get(idx).map(|x| *x as f64),
            Self::F32(v) => v.get(idx).map(|x| *x as f64),
            Self::F64(v) => v.get(idx).copied(),
        }
    }
}
