//! Test data generators for synthetic images and lookup tables.
//!
//! These generators create predictable, verifiable patterns that can be
//! checked after reprojection.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that a sample was copied from the expected
/// input pixel: the value at 0-based (col, row) is `col * 1000 + row`.
///
/// # Arguments
///
/// * `width` - Number of columns (NAXIS1)
/// * `height` - Number of rows (NAXIS2)
///
/// # Returns
///
/// A `Vec<f32>` in FITS storage order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a stack of test grids; plane `z` holds `create_test_grid` values
/// plus `z * 100000`.
pub fn create_test_cube(width: usize, height: usize, depth: usize) -> Vec<f32> {
    let plane = create_test_grid(width, height);
    (0..depth)
        .flat_map(|z| plane.iter().map(move |v| v + (z * 100_000) as f32))
        .collect()
}

/// Coordinate array for a nonlinear 1-D `-TAB` axis.
///
/// Element k (1-based) holds `offset + k^2 / 10`, so spacing grows along
/// the axis and no linear WCS can describe it.
pub fn quadratic_table(len: usize, offset: f64) -> Vec<f64> {
    (1..=len).map(|k| offset + (k * k) as f64 / 10.0).collect()
}
