//! Consumers of sample mappings.

use std::io::Write;

use fits_io::ImageData;

use crate::error::{ReprojectError, Result};
use crate::types::{MappingGrid, OutputGrid, SampleMapping};

/// Receives one mapping per output sample, in storage order.
pub trait ResultEmitter {
    fn emit(&mut self, mapping: &SampleMapping<'_>) -> Result<()>;

    /// Called once after the last sample.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Replay every mapping of `mappings` to each emitter, then finish them.
pub fn replay(mappings: &MappingGrid, grid: &OutputGrid, emitters: &mut [&mut dyn ResultEmitter]) -> Result<()> {
    for mapping in mappings.mappings(grid) {
        for emitter in emitters.iter_mut() {
            emitter.emit(&mapping)?;
        }
    }
    for emitter in emitters.iter_mut() {
        emitter.finish()?;
    }
    Ok(())
}

/// Copies the input sample nearest to each mapped position.
///
/// Invalid mappings and positions outside the input image leave the output
/// sample blank.
pub struct NearestSampler<'a> {
    input: &'a ImageData,
    input_axes: Vec<usize>,
    grid: OutputGrid,
    output: ImageData,
    filled: usize,
}

impl<'a> NearestSampler<'a> {
    /// `blank` is the BLANK value for integer output; ignored for floats.
    pub fn new(input: &'a ImageData, input_axes: &[usize], grid: &OutputGrid, blank: Option<i64>) -> Result<Self> {
        if input.pixel_type() != grid.pixel_type {
            return Err(ReprojectError::unsupported_image(format!(
                "input samples are {} but the output grid is {}",
                input.pixel_type(),
                grid.pixel_type
            )));
        }
        Ok(Self {
            input,
            input_axes: input_axes.to_vec(),
            grid: grid.clone(),
            output: ImageData::blank_with(grid.pixel_type, grid.pixel_count(), blank),
            filled: 0,
        })
    }

    /// Storage index of the input sample nearest to 1-based `pixel`.
    fn nearest_index(&self, pixel: &[f64]) -> Option<usize> {
        let mut index = 0;
        let mut stride = 1;
        for (k, &len) in self.input_axes.iter().enumerate() {
            let p = pixel.get(k).copied().unwrap_or(1.0);
            let nearest = (p + 0.5).floor();
            if !(nearest >= 1.0 && nearest <= len as f64) {
                return None;
            }
            index += (nearest as usize - 1) * stride;
            stride *= len;
        }
        Some(index)
    }

    /// Number of output samples that received a value.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn into_data(self) -> ImageData {
        self.output
    }
}

impl ResultEmitter for NearestSampler<'_> {
    fn emit(&mut self, mapping: &SampleMapping<'_>) -> Result<()> {
        let Some(pixel) = mapping.input else {
            return Ok(());
        };
        let Some(src) = self.nearest_index(pixel) else {
            return Ok(());
        };
        let [i, j, z] = mapping.output;
        let dst = self.grid.index(i, j, z);
        self.output.copy_sample(dst, self.input, src)?;
        self.filled += 1;
        Ok(())
    }
}

/// Writes `Input: x, y[, z]` for every valid mapping.
pub struct CoordinateListing<W: Write> {
    out: W,
}

impl<W: Write> CoordinateListing<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultEmitter for CoordinateListing<W> {
    fn emit(&mut self, mapping: &SampleMapping<'_>) -> Result<()> {
        if let Some(pixel) = mapping.input {
            let values: Vec<String> = pixel.iter().map(|v| format_g(*v, 9, 14)).collect();
            write!(self.out, "\nInput: {}\n", values.join(", "))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// C-style `%<width>.<precision>g` formatting.
pub fn format_g(value: f64, precision: usize, width: usize) -> String {
    let precision = precision.max(1);
    let body = if value == 0.0 {
        "0".to_string()
    } else if !value.is_finite() {
        if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else {
        let sci = format!("{:.*e}", precision - 1, value);
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        if exponent < -4 || exponent >= precision as i32 {
            let mantissa = trim_fraction(mantissa);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        } else {
            let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
            trim_fraction(&format!("{:.*}", decimals, value)).to_string()
        }
    };
    format!("{:>width$}", body, width = width)
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
