//! Pixel to intermediate world coordinates (FITS WCS Paper I, eq. 1-3).
//!
//! x_i = s_i * sum_j m_ij (p_j - r_j), with s = CDELT, m = PC, r = CRPIX.

use nalgebra::DMatrix;

use crate::descriptor::CoordinateDescriptor;
use crate::error::{TransformError, WcsError, WcsResult};

/// Linear part of a coordinate transform, shared by every axis type.
#[derive(Debug, Clone)]
pub struct LinearTransform {
    reference_pixel: Vec<f64>,
    /// CDELT * PC, row-major.
    matrix: DMatrix<f64>,
    inverse: DMatrix<f64>,
}

impl LinearTransform {
    pub fn new(descriptor: &CoordinateDescriptor) -> WcsResult<Self> {
        let n = descriptor.axis_count();
        let matrix = DMatrix::from_fn(n, n, |i, j| descriptor.scale[i] * descriptor.pc_at(i, j));
        let inverse = matrix
            .clone()
            .try_inverse()
            .ok_or(WcsError::SingularMatrix)?;
        if inverse.iter().any(|v| !v.is_finite()) {
            return Err(WcsError::SingularMatrix);
        }
        Ok(Self {
            reference_pixel: descriptor.reference_pixel.clone(),
            matrix,
            inverse,
        })
    }

    pub fn axis_count(&self) -> usize {
        self.reference_pixel.len()
    }

    /// Pixel coordinates (1-based) to intermediate world coordinates.
    pub fn pixel_to_intermediate(&self, pixel: &[f64], out: &mut [f64]) -> Result<(), TransformError> {
        let n = self.axis_count();
        if pixel[..n].iter().any(|p| !p.is_finite()) {
            return Err(TransformError::NonFinite);
        }
        for (i, x) in out.iter_mut().enumerate().take(n) {
            *x = (0..n)
                .map(|j| self.matrix[(i, j)] * (pixel[j] - self.reference_pixel[j]))
                .sum();
        }
        Ok(())
    }

    /// Intermediate world coordinates back to pixel coordinates.
    pub fn intermediate_to_pixel(&self, x: &[f64], out: &mut [f64]) -> Result<(), TransformError> {
        let n = self.axis_count();
        if x[..n].iter().any(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite);
        }
        for (i, p) in out.iter_mut().enumerate().take(n) {
            *p = self.reference_pixel[i] + (0..n).map(|j| self.inverse[(i, j)] * x[j]).sum::<f64>();
        }
        Ok(())
    }
}
