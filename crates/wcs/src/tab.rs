//! Coordinate lookup tables for `-TAB` axes (FITS WCS Paper III).
//!
//! A table ties M intermediate world coordinates to M world coordinates:
//!
//! 1. psi_m = x_i + CRVAL_i for the axis i assigned to table coordinate m.
//! 2. psi_m is located in the optional index vector m, giving a fractional
//!    1-based array index upsilon_m (upsilon_m = psi_m without one).
//! 3. The coordinate array, shaped (M, K_1, ..., K_M), is interpolated
//!    multilinearly at (upsilon_1, ..., upsilon_M).
//!
//! Points up to half a cell beyond the first and last array elements are
//! extrapolated from the end segments; anything further out is rejected.
//! Tables with M = 1 or M = 2 are supported.

use std::collections::BTreeMap;

use nalgebra::{Matrix2, Vector2};

use crate::descriptor::CoordinateDescriptor;
use crate::error::{TransformError, WcsError, WcsResult};

/// Newton iterations allowed per candidate cell of a 2-D inverse lookup.
const MAX_ITERATIONS: usize = 40;

/// Slack on the cell-fraction bounds during inverse lookups.
const EDGE_TOL: f64 = 1.0e-9;

/// Table location and layout as declared by PSi_ma / PVi_ma keyrecords.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    /// PSi_0a: EXTNAME of the binary table extension.
    pub extname: String,
    /// PVi_1a: EXTVER (default 1).
    pub extver: i64,
    /// PVi_2a: EXTLEVEL (default 1).
    pub extlevel: i64,
    /// PSi_1a: TTYPE of the coordinate array column.
    pub coord_column: String,
    /// `axes[m - 1]` is the 0-based descriptor axis of table coordinate m.
    pub axes: Vec<usize>,
    /// PSi_2a per table coordinate: TTYPE of the index vector column.
    pub index_columns: Vec<Option<String>>,
}

/// Group the -TAB axes of `descriptor` into the tables they reference.
///
/// Axes naming the same extension and coordinate column share one table;
/// PVi_3a (default 1) orders them within it.
pub fn table_specs(descriptor: &CoordinateDescriptor) -> WcsResult<Vec<TableSpec>> {
    type Key = (String, i64, i64, String);
    let mut groups: BTreeMap<Key, Vec<(usize, usize, Option<String>)>> = BTreeMap::new();

    for axis in descriptor.tab_axes() {
        let i = axis + 1;
        let extname = descriptor
            .ps(i, 0)
            .ok_or_else(|| WcsError::invalid_keyword(format!("PS{}_0", i), "missing table EXTNAME"))?;
        let column = descriptor
            .ps(i, 1)
            .ok_or_else(|| WcsError::invalid_keyword(format!("PS{}_1", i), "missing coordinate column"))?;
        let extver = descriptor.pv(i, 1).unwrap_or(1.0) as i64;
        let extlevel = descriptor.pv(i, 2).unwrap_or(1.0) as i64;
        let m = descriptor.pv(i, 3).unwrap_or(1.0);
        if m < 1.0 || m.fract() != 0.0 {
            return Err(WcsError::invalid_keyword(
                format!("PV{}_3", i),
                format!("table axis number {} must be a positive integer", m),
            ));
        }

        groups
            .entry((extname.to_string(), extver, extlevel, column.to_string()))
            .or_default()
            .push((m as usize, axis, descriptor.ps(i, 2).map(str::to_string)));
    }

    let mut specs = Vec::with_capacity(groups.len());
    for ((extname, extver, extlevel, coord_column), mut members) in groups {
        members.sort_by_key(|(m, _, _)| *m);
        let dimension = members.len();
        for (expected, (m, axis, _)) in members.iter().enumerate() {
            if *m != expected + 1 {
                return Err(WcsError::invalid_keyword(
                    format!("PV{}_3", axis + 1),
                    format!(
                        "table '{}' column '{}' has {} axes but axis number {} is not 1..{} exactly once",
                        extname, coord_column, dimension, m, dimension
                    ),
                ));
            }
        }
        specs.push(TableSpec {
            extname,
            extver,
            extlevel,
            coord_column,
            axes: members.iter().map(|(_, axis, _)| *axis).collect(),
            index_columns: members.into_iter().map(|(_, _, index)| index).collect(),
        });
    }
    Ok(specs)
}

/// A loaded coordinate lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    axes: Vec<usize>,
    extents: Vec<usize>,
    index_vectors: Vec<Option<Vec<f64>>>,
    /// Element (c, k_1, ..., k_M) at `c + M * (k_1 + K_1 * k_2 + ...)`, 0-based.
    coords: Vec<f64>,
}

impl LookupTable {
    /// Validate and assemble a table.
    ///
    /// `axes` holds the descriptor axis of each table coordinate, `extents`
    /// the array lengths K_m and `coords` the coordinate array in storage order.
    pub fn new(
        axes: Vec<usize>,
        extents: Vec<usize>,
        index_vectors: Vec<Option<Vec<f64>>>,
        coords: Vec<f64>,
    ) -> WcsResult<Self> {
        let dimension = axes.len();
        if !(1..=2).contains(&dimension) {
            return Err(WcsError::unsupported_table(format!(
                "{}-dimensional coordinate arrays are not supported",
                dimension
            )));
        }
        if extents.len() != dimension || index_vectors.len() != dimension {
            return Err(WcsError::unsupported_table(format!(
                "table has {} axes but {} extents and {} index vectors",
                dimension,
                extents.len(),
                index_vectors.len()
            )));
        }
        if let Some(k) = extents.iter().find(|&&k| k < 2) {
            return Err(WcsError::unsupported_table(format!(
                "coordinate array extent {} is too small for interpolation",
                k
            )));
        }
        let expected = dimension * extents.iter().product::<usize>();
        if coords.len() != expected {
            return Err(WcsError::unsupported_table(format!(
                "coordinate array has {} elements, expected {}",
                coords.len(),
                expected
            )));
        }
        for (m, index) in index_vectors.iter().enumerate() {
            if let Some(index) = index {
                if index.len() != extents[m] {
                    return Err(WcsError::unsupported_table(format!(
                        "index vector {} has {} elements, expected {}",
                        m + 1,
                        index.len(),
                        extents[m]
                    )));
                }
                if !is_monotonic(index) {
                    return Err(WcsError::unsupported_table(format!(
                        "index vector {} is not monotonic",
                        m + 1
                    )));
                }
            }
        }
        Ok(Self {
            axes,
            extents,
            index_vectors,
            coords,
        })
    }

    /// Descriptor axes served by this table, in table-coordinate order.
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Number of table coordinates (M).
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// psi values to world values, both in table-coordinate order.
    pub fn forward(&self, psi: &[f64], world: &mut [f64]) -> Result<(), TransformError> {
        let dimension = self.dimension();
        let mut upsilon = [0.0; 2];
        for m in 0..dimension {
            upsilon[m] = self.psi_to_upsilon(m, psi[m])?;
        }
        for (c, w) in world.iter_mut().enumerate().take(dimension) {
            *w = self.interpolate(c, &upsilon[..dimension]);
        }
        Ok(())
    }

    /// World values back to psi values.
    pub fn inverse(&self, world: &[f64], psi: &mut [f64]) -> Result<(), TransformError> {
        if world[..self.dimension()].iter().any(|w| !w.is_finite()) {
            return Err(TransformError::NonFinite);
        }
        let upsilon = match self.dimension() {
            1 => [self.invert_1d(world[0])?, 0.0],
            _ => self.invert_2d(world[0], world[1])?,
        };
        for (m, p) in psi.iter_mut().enumerate().take(self.dimension()) {
            *p = self.upsilon_to_psi(m, upsilon[m]);
        }
        Ok(())
    }

    /// Index-vector lookup: psi to a 1-based fractional array index.
    fn psi_to_upsilon(&self, m: usize, psi: f64) -> Result<f64, TransformError> {
        if !psi.is_finite() {
            return Err(TransformError::NonFinite);
        }
        let k_len = self.extents[m];
        let upsilon = match &self.index_vectors[m] {
            None => psi,
            Some(index) => {
                let increasing = index[k_len - 1] >= index[0];
                let segment = index.windows(2).position(|w| {
                    let (lo, hi) = if increasing { (w[0], w[1]) } else { (w[1], w[0]) };
                    lo <= psi && psi <= hi
                });
                let k = match segment {
                    Some(k) => k,
                    None => {
                        let before = if increasing { psi < index[0] } else { psi > index[0] };
                        if before {
                            0
                        } else {
                            k_len - 2
                        }
                    }
                };
                let (lo, hi) = (index[k], index[k + 1]);
                if hi == lo {
                    if psi != lo {
                        return Err(TransformError::OutsideTable);
                    }
                    (k + 1) as f64
                } else {
                    (k + 1) as f64 + (psi - lo) / (hi - lo)
                }
            }
        };

        if upsilon < 0.5 - EDGE_TOL || upsilon > k_len as f64 + 0.5 + EDGE_TOL {
            return Err(TransformError::OutsideTable);
        }
        Ok(upsilon)
    }

    /// Inverse of [`Self::psi_to_upsilon`], extrapolating from end segments.
    fn upsilon_to_psi(&self, m: usize, upsilon: f64) -> f64 {
        match &self.index_vectors[m] {
            None => upsilon,
            Some(index) => {
                let k = lower_node(upsilon, self.extents[m]);
                index[k] + (upsilon - (k + 1) as f64) * (index[k + 1] - index[k])
            }
        }
    }

    /// Multilinear interpolation of coordinate `c` at `upsilon` (1-based).
    fn interpolate(&self, c: usize, upsilon: &[f64]) -> f64 {
        let dimension = self.dimension();
        match dimension {
            1 => {
                let k = lower_node(upsilon[0], self.extents[0]);
                let t = upsilon[0] - (k + 1) as f64;
                let a = self.coords[k];
                let b = self.coords[k + 1];
                a + t * (b - a)
            }
            _ => {
                let k1 = lower_node(upsilon[0], self.extents[0]);
                let k2 = lower_node(upsilon[1], self.extents[1]);
                let u = upsilon[0] - (k1 + 1) as f64;
                let v = upsilon[1] - (k2 + 1) as f64;
                let [a, b, cc, d] = self.cell(c, k1, k2);
                bilinear(a, b, cc, d, u, v)
            }
        }
    }

    /// Corner values of coordinate `c` for the 2-D cell with lower nodes (k1, k2):
    /// (k1, k2), (k1+1, k2), (k1, k2+1), (k1+1, k2+1).
    fn cell(&self, c: usize, k1: usize, k2: usize) -> [f64; 4] {
        let k1_len = self.extents[0];
        let at = |i: usize, j: usize| self.coords[c + 2 * (i + k1_len * j)];
        [at(k1, k2), at(k1 + 1, k2), at(k1, k2 + 1), at(k1 + 1, k2 + 1)]
    }

    fn invert_1d(&self, world: f64) -> Result<f64, TransformError> {
        let k_len = self.extents[0];
        let fraction = |k: usize| {
            let (a, b) = (self.coords[k], self.coords[k + 1]);
            if a == b {
                (world == a).then_some(0.0)
            } else {
                Some((world - a) / (b - a))
            }
        };

        // Interior segments first, then the half-cell extrapolation zones.
        for k in 0..k_len - 1 {
            if let Some(t) = fraction(k) {
                if (-EDGE_TOL..=1.0 + EDGE_TOL).contains(&t) {
                    return Ok((k + 1) as f64 + t);
                }
            }
        }
        if let Some(t) = fraction(0) {
            if (-0.5 - EDGE_TOL..0.0).contains(&t) {
                return Ok(1.0 + t);
            }
        }
        if let Some(t) = fraction(k_len - 2) {
            if t > 1.0 && t <= 1.5 + EDGE_TOL {
                return Ok((k_len - 1) as f64 + t);
            }
        }
        Err(TransformError::NoSolution)
    }

    fn invert_2d(&self, w1: f64, w2: f64) -> Result<[f64; 2], TransformError> {
        let (k1_len, k2_len) = (self.extents[0], self.extents[1]);
        let target = Vector2::new(w1, w2);

        // Interior pass with a bounding-box prefilter.
        for k2 in 0..k2_len - 1 {
            for k1 in 0..k1_len - 1 {
                let c1 = self.cell(0, k1, k2);
                let c2 = self.cell(1, k1, k2);
                if !in_bounds(&c1, w1) || !in_bounds(&c2, w2) {
                    continue;
                }
                if let Some((u, v)) = solve_cell(&c1, &c2, &target) {
                    if (-EDGE_TOL..=1.0 + EDGE_TOL).contains(&u)
                        && (-EDGE_TOL..=1.0 + EDGE_TOL).contains(&v)
                    {
                        return Ok([(k1 + 1) as f64 + u, (k2 + 1) as f64 + v]);
                    }
                }
            }
        }

        // Edge cells, allowing half a cell of extrapolation outward.
        for k2 in 0..k2_len - 1 {
            for k1 in 0..k1_len - 1 {
                let edge1 = k1 == 0 || k1 == k1_len - 2;
                let edge2 = k2 == 0 || k2 == k2_len - 2;
                if !edge1 && !edge2 {
                    continue;
                }
                let u_range = (
                    if k1 == 0 { -0.5 } else { 0.0 } - EDGE_TOL,
                    if k1 == k1_len - 2 { 1.5 } else { 1.0 } + EDGE_TOL,
                );
                let v_range = (
                    if k2 == 0 { -0.5 } else { 0.0 } - EDGE_TOL,
                    if k2 == k2_len - 2 { 1.5 } else { 1.0 } + EDGE_TOL,
                );
                let c1 = self.cell(0, k1, k2);
                let c2 = self.cell(1, k1, k2);
                if let Some((u, v)) = solve_cell(&c1, &c2, &target) {
                    if u >= u_range.0 && u <= u_range.1 && v >= v_range.0 && v <= v_range.1 {
                        return Ok([(k1 + 1) as f64 + u, (k2 + 1) as f64 + v]);
                    }
                }
            }
        }
        Err(TransformError::NoSolution)
    }
}

/// 0-based lower node of the interpolation segment containing `upsilon`.
fn lower_node(upsilon: f64, k_len: usize) -> usize {
    let k = upsilon.floor() as i64 - 1;
    k.clamp(0, k_len as i64 - 2) as usize
}

fn is_monotonic(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] >= w[0]) || values.windows(2).all(|w| w[1] <= w[0])
}

#[inline]
fn bilinear(a: f64, b: f64, c: f64, d: f64, u: f64, v: f64) -> f64 {
    (1.0 - u) * (1.0 - v) * a + u * (1.0 - v) * b + (1.0 - u) * v * c + u * v * d
}

fn in_bounds(corners: &[f64; 4], w: f64) -> bool {
    let min = corners.iter().copied().fold(f64::INFINITY, f64::min);
    let max = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let slack = (max - min).abs() * EDGE_TOL + EDGE_TOL;
    w >= min - slack && w <= max + slack
}

/// Solve bilinear(c1)(u, v) = target.x and bilinear(c2)(u, v) = target.y
/// by Newton iteration from the cell centre.
fn solve_cell(c1: &[f64; 4], c2: &[f64; 4], target: &Vector2<f64>) -> Option<(f64, f64)> {
    let mut uv = Vector2::new(0.5, 0.5);
    let scale = 1.0 + target.amax();

    for _ in 0..MAX_ITERATIONS {
        let (u, v) = (uv.x, uv.y);
        let residual = Vector2::new(
            bilinear(c1[0], c1[1], c1[2], c1[3], u, v),
            bilinear(c2[0], c2[1], c2[2], c2[3], u, v),
        ) - target;
        if residual.amax() <= 1.0e-12 * scale {
            return Some((u, v));
        }

        let jacobian = Matrix2::new(
            (1.0 - v) * (c1[1] - c1[0]) + v * (c1[3] - c1[2]),
            (1.0 - u) * (c1[2] - c1[0]) + u * (c1[3] - c1[1]),
            (1.0 - v) * (c2[1] - c2[0]) + v * (c2[3] - c2[2]),
            (1.0 - u) * (c2[2] - c2[0]) + u * (c2[3] - c2[1]),
        );
        let step = jacobian.try_inverse()? * residual;
        uv -= step;
        if !uv.x.is_finite() || !uv.y.is_finite() {
            return None;
        }
    }

    // Accept a slow finish if the residual is still small.
    let (u, v) = (uv.x, uv.y);
    let residual = Vector2::new(
        bilinear(c1[0], c1[1], c1[2], c1[3], u, v),
        bilinear(c2[0], c2[1], c2[2], c2[3], u, v),
    ) - target;
    (residual.amax() <= 1.0e-9 * scale).then_some((u, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AltKey;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Quadratic 1-D table: C_k = k^2 for k = 1..5.
    fn quadratic() -> LookupTable {
        let coords = (1..=5).map(|k| (k * k) as f64).collect();
        LookupTable::new(vec![0], vec![5], vec![None], coords).unwrap()
    }

    #[test]
    fn test_forward_at_nodes_and_between() {
        let t = quadratic();
        let mut w = [0.0];
        t.forward(&[3.0], &mut w).unwrap();
        assert!(approx(w[0], 9.0));
        t.forward(&[3.5], &mut w).unwrap();
        assert!(approx(w[0], 12.5));
    }

    #[test]
    fn test_forward_extrapolates_half_cell() {
        let t = quadratic();
        let mut w = [0.0];
        t.forward(&[0.5], &mut w).unwrap();
        assert!(approx(w[0], -0.5));
        t.forward(&[5.5], &mut w).unwrap();
        assert!(approx(w[0], 29.5));
        assert_eq!(t.forward(&[0.4], &mut w), Err(TransformError::OutsideTable));
        assert_eq!(t.forward(&[5.6], &mut w), Err(TransformError::OutsideTable));
    }

    #[test]
    fn test_inverse_1d() {
        let t = quadratic();
        let mut psi = [0.0];
        t.inverse(&[12.5], &mut psi).unwrap();
        assert!(approx(psi[0], 3.5));
        t.inverse(&[-0.5], &mut psi).unwrap();
        assert!(approx(psi[0], 0.5));
        assert_eq!(t.inverse(&[40.0], &mut psi), Err(TransformError::NoSolution));
    }

    #[test]
    fn test_index_vector_lookup() {
        // psi values 10, 20, 40 index elements 1, 2, 3.
        let t = LookupTable::new(
            vec![0],
            vec![3],
            vec![Some(vec![10.0, 20.0, 40.0])],
            vec![100.0, 200.0, 300.0],
        )
        .unwrap();
        let mut w = [0.0];
        t.forward(&[30.0], &mut w).unwrap();
        assert!(approx(w[0], 250.0));

        let mut psi = [0.0];
        t.inverse(&[250.0], &mut psi).unwrap();
        assert!(approx(psi[0], 30.0));

        // Extrapolation below the first index value: upsilon = 0.5.
        t.forward(&[5.0], &mut w).unwrap();
        assert!(approx(w[0], 50.0));
        assert_eq!(t.forward(&[4.0], &mut w), Err(TransformError::OutsideTable));
    }

    #[test]
    fn test_decreasing_index_vector() {
        let t = LookupTable::new(
            vec![0],
            vec![3],
            vec![Some(vec![3.0, 2.0, 1.0])],
            vec![10.0, 20.0, 30.0],
        )
        .unwrap();
        let mut w = [0.0];
        t.forward(&[1.5], &mut w).unwrap();
        assert!(approx(w[0], 25.0));
    }

    fn skewed_2d() -> LookupTable {
        // 3 x 3 grid, world = (k1 + 0.1 * k2, k2 + 0.2 * k1 + 0.05 * k1 * k2).
        let mut coords = Vec::new();
        for k2 in 1..=3 {
            for k1 in 1..=3 {
                let (a, b) = (k1 as f64, k2 as f64);
                coords.push(a + 0.1 * b);
                coords.push(b + 0.2 * a + 0.05 * a * b);
            }
        }
        LookupTable::new(vec![0, 1], vec![3, 3], vec![None, None], coords).unwrap()
    }

    #[test]
    fn test_2d_round_trip() {
        let t = skewed_2d();
        for psi in [[1.0, 1.0], [1.7, 2.4], [2.9, 1.2], [0.6, 3.4]] {
            let mut w = [0.0; 2];
            t.forward(&psi, &mut w).unwrap();
            let mut back = [0.0; 2];
            t.inverse(&w, &mut back).unwrap();
            assert!(approx(back[0], psi[0]) && approx(back[1], psi[1]), "{:?} -> {:?}", psi, back);
        }
    }

    #[test]
    fn test_2d_outside() {
        let t = skewed_2d();
        let mut psi = [0.0; 2];
        assert_eq!(t.inverse(&[50.0, 50.0], &mut psi), Err(TransformError::NoSolution));
    }

    #[test]
    fn test_table_validation() {
        assert!(LookupTable::new(vec![0], vec![1], vec![None], vec![1.0]).is_err());
        assert!(LookupTable::new(vec![0], vec![3], vec![None], vec![1.0, 2.0]).is_err());
        assert!(LookupTable::new(
            vec![0],
            vec![3],
            vec![Some(vec![1.0, 3.0, 2.0])],
            vec![1.0, 2.0, 3.0]
        )
        .is_err());
        assert!(LookupTable::new(vec![0, 1, 2], vec![2, 2, 2], vec![None, None, None], vec![0.0; 24]).is_err());
    }

    #[test]
    fn test_table_specs_grouping() {
        let mut d = CoordinateDescriptor::new(AltKey::Primary, 3);
        d.ctype = vec!["RA---TAB".into(), "DEC--TAB".into(), "WAVE-TAB".into()];
        for (axis, m) in [(1usize, 1.0), (2, 2.0)] {
            d.ps.push(crate::descriptor::StringParam { axis, index: 0, value: "WCS-TAB".into() });
            d.ps.push(crate::descriptor::StringParam { axis, index: 1, value: "CELEST".into() });
            d.pv.push(crate::descriptor::ProjectionParam { axis, index: 3, value: m });
        }
        d.ps.push(crate::descriptor::StringParam { axis: 3, index: 0, value: "WCS-TAB".into() });
        d.ps.push(crate::descriptor::StringParam { axis: 3, index: 1, value: "WAVE".into() });
        d.ps.push(crate::descriptor::StringParam { axis: 3, index: 2, value: "WAVEIDX".into() });

        let specs = table_specs(&d).unwrap();
        assert_eq!(specs.len(), 2);
        let celest = specs.iter().find(|s| s.coord_column == "CELEST").unwrap();
        assert_eq!(celest.axes, vec![0, 1]);
        assert_eq!((celest.extver, celest.extlevel), (1, 1));
        let wave = specs.iter().find(|s| s.coord_column == "WAVE").unwrap();
        assert_eq!(wave.axes, vec![2]);
        assert_eq!(wave.index_columns, vec![Some("WAVEIDX".to_string())]);
    }

    #[test]
    fn test_table_specs_missing_extname() {
        let mut d = CoordinateDescriptor::new(AltKey::Primary, 1);
        d.ctype = vec!["WAVE-TAB".into()];
        assert!(matches!(table_specs(&d), Err(WcsError::InvalidKeyword { .. })));
    }
}
