//! Celestial axis pairs: spherical projections and rotations (FITS WCS Paper II).
//!
//! Intermediate world coordinates (x, y) in degrees are handed to a `mapproj`
//! projection centred on the reference point, which also carries the rotation
//! between native and celestial spherical coordinates.
//!
//! Supported projections:
//! - Zenithal (fiducial point at the native pole): TAN, SIN, ARC, STG, ZEA
//! - Cylindrical (fiducial point at native (0, 0)): CAR, CEA, MER

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use mapproj::{
    cylindrical::{car::Car, cea::Cea, mer::Mer},
    zenithal::{arc::Arc as ArcProj, sin::Sin, stg::Stg, tan::Tan, zea::Zea},
    CanonicalProjection, CenteredProjection, LonLat, ProjXY, Projection,
};

use crate::descriptor::{CoordinateDescriptor, ProjectionCode};
use crate::error::{TransformError, WcsError, WcsResult};

/// Tolerance for pole checks, in radians.
const TOL: f64 = 1.0e-10;

/// Normalize a longitude into [0, 360).
pub fn normalize_lon(lon: f64) -> f64 {
    let l = lon.rem_euclid(360.0);
    if l >= 360.0 {
        0.0
    } else {
        l
    }
}

/// Wrap an angle in radians into (-pi, pi].
fn wrap_pi(angle: f64) -> f64 {
    let a = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if a <= -PI {
        a + 2.0 * PI
    } else {
        a
    }
}

/// A projection centred on the reference point, one variant per supported code.
enum SphericalProjection {
    Tan(CenteredProjection<Tan>),
    Sin(CenteredProjection<Sin>),
    Arc(CenteredProjection<ArcProj>),
    Stg(CenteredProjection<Stg>),
    Zea(CenteredProjection<Zea>),
    Car(CenteredProjection<Car>),
    Cea(CenteredProjection<Cea>),
    Mer(CenteredProjection<Mer>),
}

macro_rules! each_projection {
    ($self:expr, $proj:ident => $body:expr) => {
        match $self {
            SphericalProjection::Tan($proj) => $body,
            SphericalProjection::Sin($proj) => $body,
            SphericalProjection::Arc($proj) => $body,
            SphericalProjection::Stg($proj) => $body,
            SphericalProjection::Zea($proj) => $body,
            SphericalProjection::Car($proj) => $body,
            SphericalProjection::Cea($proj) => $body,
            SphericalProjection::Mer($proj) => $body,
        }
    };
}

fn centered<P: CanonicalProjection>(proj: P, center: &LonLat, positional_angle: f64) -> CenteredProjection<P> {
    let mut centered = CenteredProjection::new(proj);
    centered.set_proj_center_from_lonlat_and_positional_angle(center, -positional_angle);
    centered
}

impl SphericalProjection {
    fn new(code: ProjectionCode, lambda: f64, center: &LonLat, positional_angle: f64) -> WcsResult<Self> {
        let projection = match code {
            ProjectionCode::Tan => Self::Tan(centered(Tan::new(), center, positional_angle)),
            ProjectionCode::Sin => Self::Sin(centered(Sin::new(), center, positional_angle)),
            ProjectionCode::Arc => Self::Arc(centered(ArcProj::new(), center, positional_angle)),
            ProjectionCode::Stg => Self::Stg(centered(Stg::new(), center, positional_angle)),
            ProjectionCode::Zea => Self::Zea(centered(Zea::new(), center, positional_angle)),
            ProjectionCode::Car => Self::Car(centered(Car, center, positional_angle)),
            ProjectionCode::Cea => {
                if !(lambda > 0.0 && lambda <= 1.0) {
                    return Err(WcsError::InvalidCelestial(format!(
                        "CEA lambda must be in (0, 1], got {}",
                        lambda
                    )));
                }
                Self::Cea(centered(Cea::from_param(lambda), center, positional_angle))
            }
            ProjectionCode::Mer => Self::Mer(centered(Mer, center, positional_angle)),
            other => {
                return Err(WcsError::InvalidCelestial(format!(
                    "'{}' is not a spherical projection",
                    other.as_str()
                )))
            }
        };
        Ok(projection)
    }

    fn unproj(&self, pos: &ProjXY) -> Option<LonLat> {
        each_projection!(self, p => p.unproj_lonlat(pos))
    }

    fn proj(&self, lonlat: &LonLat) -> Option<ProjXY> {
        each_projection!(self, p => p.proj_lonlat(lonlat))
    }
}

/// Celestial position of the native pole (FITS WCS Paper II, section 2.4).
///
/// Angles in radians. `(phi_0, theta_0)` is the native fiducial point.
fn celestial_pole(
    phi_p: f64,
    theta_p: f64,
    alpha_0: f64,
    delta_0: f64,
    phi_0: f64,
    theta_0: f64,
) -> WcsResult<LonLat> {
    let (s_t0, c_t0) = theta_0.sin_cos();
    let (s_phi, c_phi) = (phi_p - phi_0).sin_cos();
    let (s_d0, c_d0) = delta_0.sin_cos();

    let a = c_t0 * c_t0 * s_phi * s_phi;
    let delta_p = if a >= 1.0 - TOL {
        if delta_0.abs() < TOL {
            theta_p
        } else {
            return Err(WcsError::InvalidCelestial(
                "celestial pole is undetermined for this LONPOLE".to_string(),
            ));
        }
    } else {
        let ratio = s_d0 / (1.0 - a).sqrt();
        if ratio.abs() > 1.0 + TOL {
            return Err(WcsError::InvalidCelestial(
                "no celestial pole satisfies CRVAL and LONPOLE".to_string(),
            ));
        }
        let b = s_t0.atan2(c_t0 * c_phi);
        let c = ratio.clamp(-1.0, 1.0).acos();
        let (north, south) = (wrap_pi(b + c), wrap_pi(b - c));
        let valid = -FRAC_PI_2 - TOL..=FRAC_PI_2 + TOL;
        match (valid.contains(&north), valid.contains(&south)) {
            (false, false) => {
                return Err(WcsError::InvalidCelestial(
                    "celestial pole latitude out of range".to_string(),
                ))
            }
            (true, false) => north,
            (false, true) => south,
            (true, true) => {
                if (north - theta_p).abs() <= (south - theta_p).abs() {
                    north
                } else {
                    south
                }
            }
        }
        .clamp(-FRAC_PI_2, FRAC_PI_2)
    };

    let alpha_p = if (delta_0.abs() - FRAC_PI_2).abs() < TOL {
        alpha_0
    } else if (delta_p - FRAC_PI_2).abs() < TOL {
        alpha_0 + phi_p - phi_0 - PI
    } else if (delta_p + FRAC_PI_2).abs() < TOL {
        alpha_0 - phi_p + phi_0
    } else {
        let (s_dp, c_dp) = delta_p.sin_cos();
        let y = s_phi * c_t0 / c_d0;
        let x = (s_t0 - s_dp * s_d0) / (c_dp * c_d0);
        alpha_0 - y.atan2(x)
    };

    Ok(LonLat::new(alpha_p, delta_p))
}

/// Angle at the reference point between the native pole and the celestial
/// north pole, in radians.
fn positional_angle(
    code: ProjectionCode,
    crval: &LonLat,
    lonpole: f64,
    latpole: f64,
) -> WcsResult<f64> {
    if code.is_zenithal() {
        return Ok(PI - lonpole);
    }

    let pole = celestial_pole(lonpole, latpole, crval.lon(), crval.lat(), 0.0, 0.0)?;
    let north_pole = LonLat::new(0.0, FRAC_PI_2);
    if pole == *crval || north_pole == *crval {
        return Ok(0.0);
    }

    // Spherical law of cosines in the triangle reference point, pole, north pole.
    let (s_p, c_p) = crval.haversine_dist(&pole).sin_cos();
    let (s_np, c_np) = crval.haversine_dist(&north_pole).sin_cos();
    let c = (pole.haversine_dist(&north_pole).cos() - c_p * c_np) / (s_p * s_np);
    Ok(if c >= 1.0 {
        0.0
    } else if c <= -1.0 {
        PI
    } else {
        c.acos()
    })
}

/// A longitude/latitude axis pair sharing one spherical projection.
#[derive(Clone)]
pub struct CelestialTransform {
    pub lon_axis: usize,
    pub lat_axis: usize,
    code: ProjectionCode,
    projection: Arc<SphericalProjection>,
}

impl std::fmt::Debug for CelestialTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CelestialTransform")
            .field("lon_axis", &self.lon_axis)
            .field("lat_axis", &self.lat_axis)
            .field("projection", &self.code.as_str())
            .finish()
    }
}

impl CelestialTransform {
    pub fn new(
        descriptor: &CoordinateDescriptor,
        lon_axis: usize,
        lat_axis: usize,
        code: ProjectionCode,
    ) -> WcsResult<Self> {
        let alpha_0 = descriptor.reference_value[lon_axis];
        let delta_0 = descriptor.reference_value[lat_axis];
        if delta_0.abs() > 90.0 + TOL {
            return Err(WcsError::InvalidCelestial(format!(
                "reference latitude {} outside [-90, 90]",
                delta_0
            )));
        }

        let theta_0 = if code.is_zenithal() { 90.0 } else { 0.0 };
        let lonpole = descriptor
            .lonpole
            .unwrap_or(if delta_0 >= theta_0 { 0.0 } else { 180.0 });
        let latpole = descriptor.latpole.unwrap_or(90.0);
        let crval = LonLat::new(alpha_0.to_radians(), delta_0.to_radians());
        let angle = positional_angle(code, &crval, lonpole.to_radians(), latpole.to_radians())?;

        let lambda = descriptor.pv(lat_axis + 1, 1).unwrap_or(1.0);
        let projection = SphericalProjection::new(code, lambda, &crval, angle)?;
        tracing::debug!(
            projection = code.as_str(),
            lonpole,
            positional_angle = angle.to_degrees(),
            "celestial transform ready"
        );
        Ok(Self {
            lon_axis,
            lat_axis,
            code,
            projection: Arc::new(projection),
        })
    }

    pub fn code(&self) -> ProjectionCode {
        self.code
    }

    /// Intermediate (x, y) in degrees to celestial (lon, lat) in degrees.
    pub fn forward(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let pos = ProjXY::new(x.to_radians(), y.to_radians());
        let lonlat = self
            .projection
            .unproj(&pos)
            .ok_or(TransformError::OutOfDomain)?;
        Ok((normalize_lon(lonlat.lon().to_degrees()), lonlat.lat().to_degrees()))
    }

    /// Celestial (lon, lat) in degrees to intermediate (x, y) in degrees.
    pub fn inverse(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        if lat.abs() > 90.0 + TOL {
            return Err(TransformError::OutOfDomain);
        }
        let lonlat = LonLat::new(lon.to_radians(), lat.clamp(-90.0, 90.0).to_radians());
        let pos = self
            .projection
            .proj(&lonlat)
            .ok_or(TransformError::OutOfDomain)?;
        Ok((pos.x().to_degrees(), pos.y().to_degrees()))
    }
}
