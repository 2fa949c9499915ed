//! Shared test fixtures for the wcstabproj workspace.
//!
//! - [`generators`]: pixel patterns and lookup-table arrays with known values
//! - [`fixtures`]: FITS files with a `-TAB` coordinate system and matching
//!   output header files, written under a caller-owned temp directory
//! - [`assert_approx_eq!`] and [`assert_coords_approx_eq!`]

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Approximate floating-point equality; both sides are compared as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of two `(x, y)` tuples, e.g. world coordinates
/// against [`tab_world`].
///
/// ```ignore
/// assert_coords_approx_eq!((10.1, -30.0), tab_world(1.0, 1.0), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (x1, y1): (f64, f64) = $left;
        let (x2, y2): (f64, f64) = $right;
        $crate::assert_approx_eq!(x1, x2, $epsilon);
        $crate::assert_approx_eq!(y1, y2, $epsilon);
    }};
}
