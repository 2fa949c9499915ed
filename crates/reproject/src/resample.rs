//! The per-sample mapping loop.
//!
//! For every output sample, plane by plane and row by row:
//! output pixel -> output world (forward) -> input pixel (inverse).
//! A failing transform leaves that sample invalid; nothing else is
//! affected.

use rayon::prelude::*;
use tracing::debug;
use wcs::CoordinateTransform;

use crate::types::{MappingGrid, OutputGrid};

/// Both transforms of a reprojection plus what the inverse needs for axes
/// the output does not describe.
pub struct Resampler<'a> {
    output: &'a dyn CoordinateTransform,
    input: &'a dyn CoordinateTransform,
    /// World values for input axes beyond the output's axis count.
    input_reference: &'a [f64],
}

impl<'a> Resampler<'a> {
    pub fn new(
        output: &'a dyn CoordinateTransform,
        input: &'a dyn CoordinateTransform,
        input_reference: &'a [f64],
    ) -> Self {
        Self {
            output,
            input,
            input_reference,
        }
    }

    /// Map every sample of `grid`, optionally spreading rows over the rayon
    /// thread pool. Both paths produce the same grid.
    pub fn run(&self, grid: &OutputGrid, parallel: bool) -> MappingGrid {
        let rows = grid.height() * grid.depth();
        let row_grids: Vec<MappingGrid> = if parallel {
            (0..rows)
                .into_par_iter()
                .map(|r| self.map_row(grid, r / grid.height(), r % grid.height()))
                .collect()
        } else {
            (0..rows)
                .map(|r| self.map_row(grid, r / grid.height(), r % grid.height()))
                .collect()
        };

        let mut mappings = MappingGrid::with_capacity(self.input.axis_count(), grid.pixel_count());
        for row in &row_grids {
            mappings.append(row);
        }
        debug!(
            samples = mappings.len(),
            valid = mappings.valid_count(),
            parallel,
            "resampled output grid"
        );
        mappings
    }

    /// Map output row `j` of plane `z` (both 0-based).
    fn map_row(&self, grid: &OutputGrid, z: usize, j: usize) -> MappingGrid {
        let out_n = self.output.axis_count();
        let in_n = self.input.axis_count();
        let mut pixel = vec![1.0; out_n.max(2)];
        let mut world = vec![0.0; out_n.max(2)];
        let mut world_in = vec![0.0; in_n];
        let mut pixel_in = vec![0.0; in_n];

        let mut row = MappingGrid::with_capacity(in_n, grid.width());
        for i in 0..grid.width() {
            let ok = self.map_sample(
                [i, j, z],
                grid.depth(),
                &mut pixel,
                &mut world,
                &mut world_in,
                &mut pixel_in,
            );
            row.push(ok.then_some(pixel_in.as_slice()));
        }
        row
    }

    /// Map one sample; `pixel_in` holds the result when this returns true.
    fn map_sample(
        &self,
        [i, j, z]: [usize; 3],
        depth: usize,
        pixel: &mut [f64],
        world: &mut [f64],
        world_in: &mut [f64],
        pixel_in: &mut [f64],
    ) -> bool {
        pixel[0] = (i + 1) as f64;
        pixel[1] = (j + 1) as f64;
        if pixel.len() > 2 {
            pixel[2] = (z + 1) as f64;
        }
        if self.output.pixel_to_world(pixel, world).is_err() {
            return false;
        }

        for (n, slot) in world_in.iter_mut().enumerate() {
            *slot = if n < world.len() {
                world[n]
            } else {
                self.input_reference.get(n).copied().unwrap_or(0.0)
            };
        }
        // The depth axis is carried through positionally.
        if depth > 1 && world_in.len() > 2 {
            world_in[2] = (z + 1) as f64;
        }

        self.input.world_to_pixel(world_in, pixel_in).is_ok()
    }
}
