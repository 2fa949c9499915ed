//! Pixel <-> world transforms assembled from a coordinate descriptor.

use crate::celestial::CelestialTransform;
use crate::descriptor::{CoordinateDescriptor, ProjectionCode};
use crate::error::{TransformError, WcsError, WcsResult};
use crate::linear::LinearTransform;
use crate::tab::LookupTable;

/// Point-wise mapping between 1-based pixel coordinates and world coordinates.
///
/// Buffers must hold at least [`CoordinateTransform::axis_count`] values;
/// extra trailing values are ignored.
pub trait CoordinateTransform: Send + Sync {
    fn axis_count(&self) -> usize;

    fn pixel_to_world(&self, pixel: &[f64], world: &mut [f64]) -> Result<(), TransformError>;

    fn world_to_pixel(&self, world: &[f64], pixel: &mut [f64]) -> Result<(), TransformError>;
}

/// What produces the world coordinate of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
enum AxisRole {
    /// world = x + CRVAL
    Linear,
    /// Handled by the celestial axis pair.
    Celestial,
    /// Coordinate `m` of lookup table `table`.
    Table { table: usize, m: usize },
}

/// Transform for one descriptor: linear, celestial and -TAB axes together.
#[derive(Debug, Clone)]
pub struct WcsTransform {
    linear: LinearTransform,
    reference_value: Vec<f64>,
    roles: Vec<AxisRole>,
    celestial: Option<CelestialTransform>,
    tables: Vec<LookupTable>,
}

impl WcsTransform {
    /// Build the transform, validating the descriptor.
    ///
    /// Descriptors with -TAB axes must have had their tables loaded.
    pub fn new(descriptor: &CoordinateDescriptor) -> WcsResult<Self> {
        let n = descriptor.axis_count();
        let linear = LinearTransform::new(descriptor)?;
        let codes = (0..n)
            .map(|i| descriptor.axis_code(i))
            .collect::<WcsResult<Vec<_>>>()?;

        let mut roles = vec![AxisRole::Linear; n];

        let mut celestial = None;
        if let Some((lon, lat)) = descriptor.celestial_axes() {
            let (lon_code, lat_code) = (codes[lon], codes[lat]);
            if lon_code.is_celestial() || lat_code.is_celestial() {
                if lon_code != lat_code {
                    return Err(WcsError::invalid_descriptor(format!(
                        "longitude axis {} uses '{}' but latitude axis {} uses '{}'",
                        lon + 1,
                        lon_code.as_str(),
                        lat + 1,
                        lat_code.as_str()
                    )));
                }
                celestial = Some(CelestialTransform::new(descriptor, lon, lat, lon_code)?);
                roles[lon] = AxisRole::Celestial;
                roles[lat] = AxisRole::Celestial;
            }
        }
        for (i, code) in codes.iter().enumerate() {
            if code.is_celestial() && roles[i] != AxisRole::Celestial {
                return Err(WcsError::invalid_descriptor(format!(
                    "axis {} ('{}') has a spherical projection but no celestial partner",
                    i + 1,
                    descriptor.ctype[i]
                )));
            }
        }

        for (t, table) in descriptor.tables.iter().enumerate() {
            for (m, &axis) in table.axes().iter().enumerate() {
                if axis >= n || codes[axis] != ProjectionCode::Tab {
                    return Err(WcsError::unsupported_table(format!(
                        "table refers to axis {} which is not a -TAB axis",
                        axis + 1
                    )));
                }
                roles[axis] = AxisRole::Table { table: t, m };
            }
        }
        if let Some(axis) = (0..n).find(|&i| codes[i] == ProjectionCode::Tab && roles[i] == AxisRole::Linear) {
            return Err(WcsError::TableNotLoaded { axis: axis + 1 });
        }

        Ok(Self {
            linear,
            reference_value: descriptor.reference_value.clone(),
            roles,
            celestial,
            tables: descriptor.tables.clone(),
        })
    }

    fn check_len(&self, len: usize) -> Result<(), TransformError> {
        let n = self.axis_count();
        if len < n {
            return Err(TransformError::AxisMismatch {
                expected: n,
                actual: len,
            });
        }
        Ok(())
    }
}

impl CoordinateTransform for WcsTransform {
    fn axis_count(&self) -> usize {
        self.roles.len()
    }

    fn pixel_to_world(&self, pixel: &[f64], world: &mut [f64]) -> Result<(), TransformError> {
        self.check_len(pixel.len())?;
        self.check_len(world.len())?;
        let n = self.axis_count();

        let mut x = vec![0.0; n];
        self.linear.pixel_to_intermediate(pixel, &mut x)?;

        for i in 0..n {
            if self.roles[i] == AxisRole::Linear {
                world[i] = x[i] + self.reference_value[i];
            }
        }

        if let Some(cel) = &self.celestial {
            let (lon, lat) = cel.forward(x[cel.lon_axis], x[cel.lat_axis])?;
            world[cel.lon_axis] = lon;
            world[cel.lat_axis] = lat;
        }

        for table in &self.tables {
            let mut psi = [0.0; 2];
            let mut out = [0.0; 2];
            for (m, &axis) in table.axes().iter().enumerate() {
                psi[m] = x[axis] + self.reference_value[axis];
            }
            table.forward(&psi, &mut out)?;
            for (m, &axis) in table.axes().iter().enumerate() {
                world[axis] = out[m];
            }
        }
        Ok(())
    }

    fn world_to_pixel(&self, world: &[f64], pixel: &mut [f64]) -> Result<(), TransformError> {
        self.check_len(world.len())?;
        self.check_len(pixel.len())?;
        let n = self.axis_count();
        if world[..n].iter().any(|w| !w.is_finite()) {
            return Err(TransformError::NonFinite);
        }

        let mut x = vec![0.0; n];
        for i in 0..n {
            if self.roles[i] == AxisRole::Linear {
                x[i] = world[i] - self.reference_value[i];
            }
        }

        if let Some(cel) = &self.celestial {
            let (px, py) = cel.inverse(world[cel.lon_axis], world[cel.lat_axis])?;
            x[cel.lon_axis] = px;
            x[cel.lat_axis] = py;
        }

        for table in &self.tables {
            let mut w = [0.0; 2];
            let mut psi = [0.0; 2];
            for (m, &axis) in table.axes().iter().enumerate() {
                w[m] = world[axis];
            }
            table.inverse(&w, &mut psi)?;
            for (m, &axis) in table.axes().iter().enumerate() {
                x[axis] = psi[m] - self.reference_value[axis];
            }
        }

        self.linear.intermediate_to_pixel(&x, pixel)
    }
}
