//! Model-relative to geographic wind rotation.
//!
//! Winds on a rotated grid are expressed along the rotated frame's local
//! east/north axes. Per grid point the rotation runs: geographic lat/lon →
//! rotated lat/lon, tangential components → Cartesian vector in the
//! rotated frame, inverse rotation → Cartesian in the geographic frame,
//! projection onto the local geographic east/north axes. The same basis
//! matrix used for coordinate generation drives the whole pipeline.
//!
//! The per-point kernels are single precision. Double-precision
//! coordinate arrays are downcast through an explicit check and any value
//! that would not survive the downcast fails with
//! `PrecisionPolicyViolation`; mixed precision is never degraded silently.

use nalgebra::{Matrix3, Vector3};

use fst_common::error::{FstError, FstResult};
use fst_common::grid::RotationPole;

use crate::assemble::FieldValues;

/// Unit conversion for raw wind components stored in knots.
pub const KNOT_TO_MS: f32 = 0.514444;

/// Derived geographic wind quantities.
#[derive(Debug, Clone)]
pub struct RotatedWinds {
    /// Geographic zonal component [m/s].
    pub uuwe: FieldValues,
    /// Geographic meridional component [m/s].
    pub vvsn: FieldValues,
    /// Wind modulus in the raw components' units.
    pub modulus: FieldValues,
    /// Meteorological direction [deg], the direction the wind comes from.
    pub direction: FieldValues,
}

/// Rotate model-relative components into geographic components.
///
/// `u` and `v` are raw model-relative winds in knots, broadcast over
/// levels; `lat`/`lon` are the geographic coordinates of every grid
/// point, row-major (nj, ni). `pole` is `None` on unrotated grids, where
/// the rotation reduces to the unit conversion.
pub fn rotate(
    u: &FieldValues,
    v: &FieldValues,
    lat: &[f64],
    lon: &[f64],
    pole: Option<&RotationPole>,
) -> FstResult<RotatedWinds> {
    if u.shape() != v.shape() {
        let (_, nj, ni) = u.shape();
        let (_, got_nj, got_ni) = v.shape();
        return Err(FstError::InconsistentGridShape {
            expected: (nj, ni),
            got: (got_nj, got_ni),
        });
    }
    let (nk, nj, ni) = u.shape();
    let points = ni * nj;
    if lat.len() != points || lon.len() != points {
        return Err(FstError::InconsistentGridShape {
            expected: (nj, ni),
            got: (lat.len() / ni.max(1), ni),
        });
    }

    let lat32 = downcast_coordinates(lat, "latitude")?;
    let lon32 = downcast_coordinates(lon, "longitude")?;

    let rotation: Option<Matrix3<f32>> = match pole {
        Some(pole) => Some(pole.matrix()?.map(|x| x as f32)),
        None => None,
    };

    let mut uuwe = FieldValues::zeros(ni, nj, nk);
    let mut vvsn = FieldValues::zeros(ni, nj, nk);
    let mut modulus = FieldValues::zeros(ni, nj, nk);
    let mut direction = FieldValues::zeros(ni, nj, nk);

    for idx in 0..points {
        let geo = tangent_basis(lat32[idx], lon32[idx]);
        // rotated-frame tangent basis at this point, when the grid rotates
        let rotated = rotation.map(|m| {
            let p = m * geo.position;
            let (rlat, rlon) = latlon_of(&p);
            (m, tangent_basis(rlat, rlon))
        });

        for k in 0..nk {
            let raw_u = u.data[k * points + idx];
            let raw_v = v.data[k * points + idx];
            let (si_u, si_v) = (raw_u * KNOT_TO_MS, raw_v * KNOT_TO_MS);

            let (zonal, meridional) = match &rotated {
                Some((m, basis)) => {
                    let wind = basis.east * si_u + basis.north * si_v;
                    let geo_wind = m.transpose() * wind;
                    (geo.east.dot(&geo_wind), geo.north.dot(&geo_wind))
                }
                None => (si_u, si_v),
            };

            uuwe.data[k * points + idx] = zonal;
            vvsn.data[k * points + idx] = meridional;
            modulus.data[k * points + idx] = (raw_u * raw_u + raw_v * raw_v).sqrt();
            direction.data[k * points + idx] = zonal.atan2(meridional).to_degrees() + 180.0;
        }
    }

    Ok(RotatedWinds {
        uuwe,
        vvsn,
        modulus,
        direction,
    })
}

/// Position and local east/north unit vectors at a point on the sphere.
struct TangentBasis {
    position: Vector3<f32>,
    east: Vector3<f32>,
    north: Vector3<f32>,
}

fn tangent_basis(lat_deg: f32, lon_deg: f32) -> TangentBasis {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    TangentBasis {
        position: Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        east: Vector3::new(-sin_lon, cos_lon, 0.0),
        north: Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
    }
}

fn latlon_of(p: &Vector3<f32>) -> (f32, f32) {
    (
        p.z.clamp(-1.0, 1.0).asin().to_degrees(),
        p.y.atan2(p.x).to_degrees(),
    )
}

/// Downcast f64 coordinates for the single-precision kernels.
///
/// Fails loudly on any value the downcast would corrupt: non-finite
/// input, or finite input that overflows f32.
fn downcast_coordinates(values: &[f64], what: &str) -> FstResult<Vec<f32>> {
    values
        .iter()
        .map(|&value| {
            let narrowed = value as f32;
            if !value.is_finite() || !narrowed.is_finite() {
                return Err(FstError::PrecisionPolicyViolation(format!(
                    "{} value {} cannot pass through the single-precision rotation kernels",
                    what, value
                )));
            }
            Ok(narrowed)
        })
        .collect()
}
