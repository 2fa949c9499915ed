//! Loading coordinate lookup tables from binary table extensions.

use fits_io::{BinTable, FitsFile};
use tracing::debug;

use crate::descriptor::CoordinateDescriptor;
use crate::error::{WcsError, WcsResult};
use crate::tab::{table_specs, LookupTable, TableSpec};

/// Source of the lookup tables referenced by -TAB axes.
pub trait TableLoader {
    /// Read the coordinate array and index vectors `spec` points at.
    fn read_table(&mut self, spec: &TableSpec) -> WcsResult<LookupTable>;

    /// Load every table `descriptor` references into `descriptor.tables`.
    ///
    /// Descriptors without -TAB axes are left untouched.
    fn load_tables(&mut self, descriptor: &mut CoordinateDescriptor) -> WcsResult<()> {
        let specs = table_specs(descriptor)?;
        let mut tables = Vec::with_capacity(specs.len());
        for spec in &specs {
            tables.push(self.read_table(spec)?);
            debug!(
                extname = %spec.extname,
                column = %spec.coord_column,
                axes = ?spec.axes,
                "loaded lookup table"
            );
        }
        descriptor.tables = tables;
        Ok(())
    }
}

impl TableLoader for FitsFile {
    /// Row 1 of the binary table extension the table keywords name.
    fn read_table(&mut self, spec: &TableSpec) -> WcsResult<LookupTable> {
        let table = self
            .find_extension(&spec.extname, spec.extver, spec.extlevel)?
            .read_bintable()?;

        let extents = cell_extents(spec, &table)?;
        let coords = table.read_cell_f64(self, &spec.coord_column, 0)?;
        let index_vectors = spec
            .index_columns
            .iter()
            .map(|name| match name {
                Some(name) => table.read_cell_f64(self, name, 0).map(Some),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        LookupTable::new(spec.axes.clone(), extents, index_vectors, coords)
    }
}

/// K_1..K_M from the shape of the coordinate column.
fn cell_extents(spec: &TableSpec, table: &BinTable) -> WcsResult<Vec<usize>> {
    let dimension = spec.axes.len();
    let shape = table.column(&spec.coord_column)?.shape();

    if shape.len() == dimension + 1 && shape[0] == dimension {
        Ok(shape[1..].to_vec())
    } else if dimension == 1 && shape.len() == 1 {
        Ok(shape)
    } else {
        Err(WcsError::unsupported_table(format!(
            "column '{}' has shape {:?}, expected ({}, K_1..K_{})",
            spec.coord_column, shape, dimension, dimension
        )))
    }
}
