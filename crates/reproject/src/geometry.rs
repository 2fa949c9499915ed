//! Output descriptor and grid dimensions.
//!
//! The output grid is either taken from a supplied descriptor (a `-h`
//! header file) or derived from the input's footprint:
//!
//! 1. A positive resolution replaces the scale of every output axis.
//! 2. Missing dimensions come from the reference pixel when both spatial
//!    reference pixels are set (`floor(2 * crpix) - 1`, the reference pixel
//!    is the grid centre), otherwise from `span / |scale|`, in which case the
//!    reference pixel moves to the grid centre and the reference value is
//!    set to half the footprint span.
//! 3. The depth comes from the input's third axis.

use fits_io::ImageInfo;
use tracing::{debug, warn};
use wcs::descriptor::{coordinate_type, is_latitude, is_longitude};
use wcs::{AltKey, CoordinateDescriptor};

use crate::error::{ReprojectError, Result};
use crate::types::{Footprint, OutputGrid};

/// Largest extent, and largest sample count, an output grid may have.
pub const MAX_DIMENSION: usize = i64::MAX as usize;

/// What the caller knows about the output grid.
#[derive(Debug, Clone, Default)]
pub struct GeometryRequest {
    /// Descriptor parsed from an output header file.
    pub output_descriptor: Option<CoordinateDescriptor>,
    /// Degrees per output pixel.
    pub resolution: Option<f64>,
    /// Explicit NAXIS1 and NAXIS2.
    pub dimensions: [Option<usize>; 2],
}

/// Fully specified output descriptor and grid.
#[derive(Debug, Clone)]
pub struct ResolvedGeometry {
    pub descriptor: CoordinateDescriptor,
    pub grid: OutputGrid,
}

/// Output descriptor used when no header file is given.
///
/// Axes 1 and 2 get plate carree types when the input has a celestial
/// axis pair (plain coordinate types otherwise), zero reference pixel and
/// value, and zero scale so that geometry must come from a resolution.
/// Further axes copy the input.
pub fn default_output_descriptor(input: &CoordinateDescriptor) -> CoordinateDescriptor {
    let n = input.axis_count().max(2);
    let mut out = CoordinateDescriptor::new(AltKey::Primary, n);
    let celestial = input.celestial_axes().is_some();

    for i in 0..n.min(input.axis_count()) {
        let ctype = &input.ctype[i];
        if i < 2 {
            let base = coordinate_type(ctype);
            out.ctype[i] = if celestial && (is_longitude(ctype) || is_latitude(ctype)) {
                out.cunit[i] = "deg".to_string();
                format!("{:-<4}-CAR", base)
            } else {
                base.to_string()
            };
            out.reference_pixel[i] = 0.0;
            out.reference_value[i] = 0.0;
            out.scale[i] = 0.0;
        } else {
            out.ctype[i] = ctype.clone();
            out.cunit[i] = input.cunit[i].clone();
            out.reference_pixel[i] = input.reference_pixel[i];
            out.reference_value[i] = input.reference_value[i];
            out.scale[i] = input.scale[i];
        }
    }
    if input.axis_count() < 2 {
        out.scale[1] = 0.0;
    }
    out
}

/// Resolve the output descriptor and grid.
///
/// `footprint` is only consulted when the geometry has to be derived from
/// it; `None` then fails with [`ReprojectError::FootprintUndetermined`].
pub fn resolve_geometry(
    request: GeometryRequest,
    input: &CoordinateDescriptor,
    info: &ImageInfo,
    footprint: Option<&Footprint>,
) -> Result<ResolvedGeometry> {
    let GeometryRequest {
        output_descriptor,
        resolution,
        dimensions,
    } = request;

    let mut descriptor = match output_descriptor {
        Some(descriptor) => descriptor,
        None => default_output_descriptor(input),
    };
    if descriptor.axis_count() < 2 {
        return Err(ReprojectError::underspecified(format!(
            "output descriptor has {} axis, two spatial axes are needed",
            descriptor.axis_count()
        )));
    }

    match resolution {
        Some(res) if res > 0.0 && res.is_finite() => {
            if descriptor.axis_count() < input.axis_count() {
                extend_axes(&mut descriptor, input);
            }
            descriptor.scale.iter_mut().for_each(|s| *s = res);
        }
        Some(res) => warn!(resolution = res, "ignoring non-positive resolution"),
        None => {}
    }

    let [n1, n2] = resolve_dimensions(&mut descriptor, dimensions, footprint)?;

    let mut grid_dims = vec![n1, n2];
    let depth = if info.axes.len() >= 3 { info.axes[2] } else { 1 };
    if depth > 1 {
        grid_dims.push(depth);
    }
    let samples = grid_dims.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n));
    if !samples.is_some_and(|n| n <= MAX_DIMENSION) {
        return Err(ReprojectError::underspecified(format!(
            "output grid {:?} has too many samples",
            grid_dims
        )));
    }

    debug!(dimensions = ?grid_dims, crpix = ?descriptor.reference_pixel, "resolved output geometry");
    Ok(ResolvedGeometry {
        descriptor,
        grid: OutputGrid {
            dimensions: grid_dims,
            pixel_type: info.pixel_type,
        },
    })
}

fn resolve_dimensions(
    descriptor: &mut CoordinateDescriptor,
    given: [Option<usize>; 2],
    footprint: Option<&Footprint>,
) -> Result<[usize; 2]> {
    let crpix_set = descriptor.reference_pixel[0] != 0.0 && descriptor.reference_pixel[1] != 0.0;

    for (axis, n) in given.iter().enumerate() {
        if let Some(n) = *n {
            if n > MAX_DIMENSION {
                return Err(ReprojectError::underspecified(format!(
                    "NAXIS{} of {} exceeds {}",
                    axis + 1,
                    n,
                    MAX_DIMENSION
                )));
            }
        }
    }

    if let [Some(n1), Some(n2)] = given {
        if n1 == 0 || n2 == 0 {
            return Err(ReprojectError::underspecified("output dimensions must be positive"));
        }
        if !crpix_set {
            let footprint = footprint.ok_or(ReprojectError::FootprintUndetermined)?;
            center_on_footprint(descriptor, [n1, n2], footprint);
        }
        return Ok([n1, n2]);
    }

    if descriptor.scale[0] == 0.0 || descriptor.scale[1] == 0.0 {
        return Err(ReprojectError::underspecified(
            "output scale is zero on a spatial axis; give a resolution or an output header with CDELT",
        ));
    }

    let mut dims = [0usize; 2];
    if crpix_set {
        for axis in 0..2 {
            dims[axis] = match given[axis] {
                Some(n) => n,
                None => checked_dimension((2.0 * descriptor.reference_pixel[axis]).trunc() - 1.0, axis)?,
            };
        }
    } else {
        let footprint = footprint.ok_or(ReprojectError::FootprintUndetermined)?;
        for axis in 0..2 {
            dims[axis] = match given[axis] {
                Some(n) => n,
                None => checked_dimension((footprint.span(axis) / descriptor.scale[axis].abs()).floor(), axis)?,
            };
        }
        center_on_footprint(descriptor, dims, footprint);
    }
    Ok(dims)
}

fn checked_dimension(value: f64, axis: usize) -> Result<usize> {
    if !value.is_finite() || value < 1.0 {
        return Err(ReprojectError::underspecified(format!(
            "derived NAXIS{} is {}, must be at least 1",
            axis + 1,
            value
        )));
    }
    // i64::MAX rounds up to 2^63 as f64.
    if value >= MAX_DIMENSION as f64 {
        return Err(ReprojectError::underspecified(format!(
            "derived NAXIS{} is {}, exceeds {}",
            axis + 1,
            value,
            MAX_DIMENSION
        )));
    }
    Ok(value as usize)
}

/// Reference pixel at the grid centre, reference value half the span.
fn center_on_footprint(descriptor: &mut CoordinateDescriptor, dims: [usize; 2], footprint: &Footprint) {
    for axis in 0..2 {
        descriptor.reference_pixel[axis] = 0.5 + dims[axis] as f64 / 2.0;
        descriptor.reference_value[axis] = footprint.span(axis) / 2.0;
    }
}

/// Append the input's trailing axes to a shorter output descriptor.
fn extend_axes(descriptor: &mut CoordinateDescriptor, input: &CoordinateDescriptor) {
    let old = descriptor.axis_count();
    let n = input.axis_count();
    let mut pc = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            pc[i * n + j] = if i < old && j < old {
                descriptor.pc_at(i, j)
            } else if i == j {
                1.0
            } else {
                0.0
            };
        }
    }
    descriptor.pc = pc;
    for i in old..n {
        descriptor.ctype.push(input.ctype[i].clone());
        descriptor.cunit.push(input.cunit[i].clone());
        descriptor.reference_pixel.push(input.reference_pixel[i]);
        descriptor.reference_value.push(input.reference_value[i]);
        descriptor.scale.push(input.scale[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fits_io::PixelType;

    fn input_descriptor(n: usize) -> CoordinateDescriptor {
        let mut d = CoordinateDescriptor::new(AltKey::Primary, n);
        d.ctype[0] = "RA---TAB".into();
        d.ctype[1] = "DEC".into();
        if n > 2 {
            d.ctype[2] = "FREQ".into();
            d.reference_pixel[2] = 1.0;
            d.reference_value[2] = 1.0;
        }
        d
    }

    fn info(axes: Vec<usize>) -> ImageInfo {
        ImageInfo {
            pixel_type: PixelType::F32,
            axes,
        }
    }

    fn output(crpix: [f64; 2], scale: [f64; 2]) -> CoordinateDescriptor {
        let mut d = CoordinateDescriptor::new(AltKey::Primary, 2);
        d.ctype = vec!["RA---CAR".into(), "DEC--CAR".into()];
        d.reference_pixel = crpix.to_vec();
        d.scale = scale.to_vec();
        d
    }

    fn footprint(lon: [f64; 2], lat: [f64; 2]) -> Footprint {
        let mut fp = Footprint::from_point(lon[0], lat[0]);
        fp.include(lon[1], lat[1]);
        fp
    }

    #[test]
    fn test_dimensions_from_reference_pixel() {
        let request = GeometryRequest {
            output_descriptor: Some(output([50.0, 50.0], [0.1, 0.1])),
            ..Default::default()
        };
        let resolved = resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), None).unwrap();
        assert_eq!(resolved.grid.dimensions, vec![99, 99]);
        assert_eq!(resolved.descriptor.reference_pixel, vec![50.0, 50.0]);
    }

    #[test]
    fn test_dimensions_from_footprint() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.5])),
            ..Default::default()
        };
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        let resolved = resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)).unwrap();
        assert_eq!(resolved.grid.dimensions, vec![4, 2]);
        assert_eq!(resolved.descriptor.reference_pixel, vec![2.5, 1.5]);
        assert_eq!(resolved.descriptor.reference_value, vec![1.0, 0.5]);
    }

    #[test]
    fn test_zero_scale_is_underspecified() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.0])),
            ..Default::default()
        };
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        assert!(matches!(
            resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)),
            Err(ReprojectError::GeometryUnderspecified(_))
        ));

        // No header file and no resolution.
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        assert!(matches!(
            resolve_geometry(GeometryRequest::default(), &input_descriptor(2), &info(vec![10, 10]), Some(&fp)),
            Err(ReprojectError::GeometryUnderspecified(_))
        ));
    }

    #[test]
    fn test_missing_footprint() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.5])),
            ..Default::default()
        };
        assert!(matches!(
            resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), None),
            Err(ReprojectError::FootprintUndetermined)
        ));
    }

    #[test]
    fn test_span_smaller_than_scale() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [5.0, 5.0])),
            ..Default::default()
        };
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        assert!(matches!(
            resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)),
            Err(ReprojectError::GeometryUnderspecified(_))
        ));
    }

    #[test]
    fn test_resolution_overrides_every_axis() {
        let mut out = output([10.0, 10.0], [1.0, 1.0]);
        out.ctype.push("FREQ".into());
        out.cunit.push(String::new());
        out.reference_pixel.push(1.0);
        out.reference_value.push(1.0);
        out.scale.push(3.0);
        out.pc = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

        let request = GeometryRequest {
            output_descriptor: Some(out),
            resolution: Some(0.25),
            ..Default::default()
        };
        let resolved = resolve_geometry(request, &input_descriptor(3), &info(vec![10, 10, 4]), None).unwrap();
        // The depth axis scale is overwritten too.
        assert_eq!(resolved.descriptor.scale, vec![0.25, 0.25, 0.25]);
        assert_eq!(resolved.grid.dimensions, vec![19, 19, 4]);
    }

    #[test]
    fn test_resolution_extends_short_descriptor() {
        let request = GeometryRequest {
            output_descriptor: Some(output([3.0, 3.0], [1.0, 1.0])),
            resolution: Some(0.5),
            ..Default::default()
        };
        let resolved = resolve_geometry(request, &input_descriptor(3), &info(vec![10, 10, 1]), None).unwrap();
        assert_eq!(resolved.descriptor.axis_count(), 3);
        assert_eq!(resolved.descriptor.ctype[2], "FREQ");
        assert_eq!(resolved.descriptor.scale[2], 0.5);
        assert_eq!(resolved.descriptor.pc_at(2, 2), 1.0);
        assert_eq!(resolved.descriptor.pc_at(0, 2), 0.0);
        // Depth 1 adds no output axis.
        assert_eq!(resolved.grid.dimensions, vec![5, 5]);
    }

    #[test]
    fn test_default_descriptor_with_resolution() {
        let request = GeometryRequest {
            resolution: Some(0.5),
            ..Default::default()
        };
        let fp = footprint([10.0, 12.0], [-30.0, -29.0]);
        let resolved = resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)).unwrap();
        assert_eq!(resolved.descriptor.ctype, vec!["RA---CAR", "DEC--CAR"]);
        assert_eq!(resolved.grid.dimensions, vec![4, 2]);
        assert_eq!(resolved.descriptor.reference_value, vec![1.0, 0.5]);
    }

    #[test]
    fn test_tiny_resolution_is_underspecified() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.5])),
            resolution: Some(1e-300),
            ..Default::default()
        };
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        assert!(matches!(
            resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)),
            Err(ReprojectError::GeometryUnderspecified(_))
        ));
    }

    #[test]
    fn test_huge_dimensions_are_underspecified() {
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);

        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.5])),
            dimensions: [Some(usize::MAX), None],
            ..Default::default()
        };
        assert!(matches!(
            resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)),
            Err(ReprojectError::GeometryUnderspecified(_))
        ));

        // Each extent fits, the product does not.
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.5])),
            dimensions: [Some(1 << 40), Some(1 << 40)],
            ..Default::default()
        };
        assert!(matches!(
            resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)),
            Err(ReprojectError::GeometryUnderspecified(_))
        ));
    }

    #[test]
    fn test_one_dimension_given() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.5, 0.5])),
            dimensions: [Some(7), None],
            ..Default::default()
        };
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        let resolved = resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)).unwrap();
        assert_eq!(resolved.grid.dimensions, vec![7, 2]);
        assert_eq!(resolved.descriptor.reference_pixel, vec![4.0, 1.5]);
    }

    #[test]
    fn test_both_dimensions_given() {
        let request = GeometryRequest {
            output_descriptor: Some(output([0.0, 0.0], [0.0, 0.0])),
            dimensions: [Some(8), Some(6)],
            ..Default::default()
        };
        let fp = footprint([0.0, 2.0], [0.0, 1.0]);
        let resolved = resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), Some(&fp)).unwrap();
        assert_eq!(resolved.grid.dimensions, vec![8, 6]);
        assert_eq!(resolved.descriptor.reference_pixel, vec![4.5, 3.5]);

        let request = GeometryRequest {
            output_descriptor: Some(output([2.0, 2.0], [0.5, 0.5])),
            dimensions: [Some(8), Some(6)],
            ..Default::default()
        };
        let resolved = resolve_geometry(request, &input_descriptor(2), &info(vec![10, 10]), None).unwrap();
        assert_eq!(resolved.descriptor.reference_pixel, vec![2.0, 2.0]);
    }

    #[test]
    fn test_depth_from_input() {
        let request = GeometryRequest {
            output_descriptor: Some(output([5.0, 5.0], [1.0, 1.0])),
            ..Default::default()
        };
        let resolved = resolve_geometry(request, &input_descriptor(3), &info(vec![10, 10, 3]), None).unwrap();
        assert_eq!(resolved.grid.dimensions, vec![9, 9, 3]);
        assert_eq!(resolved.grid.depth(), 3);
    }

    #[test]
    fn test_default_descriptor_types() {
        let d = default_output_descriptor(&input_descriptor(3));
        assert_eq!(d.ctype, vec!["RA---CAR", "DEC--CAR", "FREQ"]);
        assert_eq!(d.scale, vec![0.0, 0.0, 1.0]);
        assert_eq!(d.reference_pixel, vec![0.0, 0.0, 1.0]);

        let mut linear = CoordinateDescriptor::new(AltKey::Primary, 2);
        linear.ctype = vec!["WAVE-TAB".into(), "TIME".into()];
        let d = default_output_descriptor(&linear);
        assert_eq!(d.ctype, vec!["WAVE", "TIME"]);
    }
}
