//! World-coordinate footprint of the input image.

use tracing::debug;
use wcs::CoordinateTransform;

use crate::error::{ReprojectError, Result};
use crate::types::Footprint;

/// 1-based pixel coordinates of the four image corners: (1,1), (N1,1),
/// (1,N2), (N1,N2). Every other axis stays at pixel 1.
///
/// `axis_count` is the transform's axis count and must be at least 2.
pub fn image_corners(axes: &[usize], axis_count: usize) -> [Vec<f64>; 4] {
    let n1 = axes.first().copied().unwrap_or(1) as f64;
    let n2 = axes.get(1).copied().unwrap_or(1) as f64;
    let corner = |p1: f64, p2: f64| {
        let mut pixel = vec![1.0; axis_count.max(2)];
        pixel[0] = p1;
        pixel[1] = p2;
        pixel
    };
    [
        corner(1.0, 1.0),
        corner(n1, 1.0),
        corner(1.0, n2),
        corner(n1, n2),
    ]
}

/// Bounding box of the corners' first two world coordinates.
///
/// Corners whose forward transform fails are skipped; if all four fail
/// the footprint is undetermined.
pub fn compute_footprint(transform: &dyn CoordinateTransform, axes: &[usize]) -> Result<Footprint> {
    let n = transform.axis_count().max(2);
    let mut world = vec![0.0; n];
    let mut footprint: Option<Footprint> = None;

    for (k, pixel) in image_corners(axes, n).iter().enumerate() {
        if let Err(err) = transform.pixel_to_world(pixel, &mut world) {
            debug!(corner = k, pixel = ?pixel, error = %err, "corner has no world coordinates");
            continue;
        }
        match footprint.as_mut() {
            Some(fp) => fp.include(world[0], world[1]),
            None => footprint = Some(Footprint::from_point(world[0], world[1])),
        }
    }

    let footprint = footprint.ok_or(ReprojectError::FootprintUndetermined)?;
    debug!(
        lon_min = footprint.lon_min,
        lon_max = footprint.lon_max,
        lat_min = footprint.lat_min,
        lat_max = footprint.lat_max,
        "computed footprint"
    );
    Ok(footprint)
}
