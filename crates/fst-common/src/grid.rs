//! Horizontal grid descriptors and rotated-pole geometry.
//!
//! Three grid families appear in standard files:
//! - 'L': regular lat/lon, affine in geographic coordinates
//! - 'E': rotated lat/lon, affine in a frame defined by two reference
//!   points on the rotated equator
//! - 'U': combined Yin-Yang, two rotated sub-grids stacked along the row
//!   axis of one record
//!
//! The rotation basis built here is shared by coordinate generation and by
//! the wind rotator: the same matrix that places grid points on the sphere
//! turns model-relative wind vectors back into geographic ones.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FstError, FstResult};

/// Rotation-pole parameters of a rotated lat/lon grid.
///
/// The first reference point maps to the rotated origin; the second fixes
/// the direction of the rotated x axis along the rotated equator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationPole {
    pub xlat1: f64,
    pub xlon1: f64,
    pub xlat2: f64,
    pub xlon2: f64,
}

impl RotationPole {
    /// Rotation matrix taking geographic Cartesian vectors into the rotated
    /// frame. Rows are the rotated basis expressed geographically; the
    /// inverse is the transpose.
    pub fn matrix(&self) -> FstResult<Matrix3<f64>> {
        let a = unit_cartesian(self.xlat1, self.xlon1);
        let b = unit_cartesian(self.xlat2, self.xlon2);
        let cross = a.cross(&b);
        if cross.norm() < 1e-12 {
            return Err(FstError::store(format!(
                "degenerate rotation pole: reference points ({}, {}) and ({}, {}) \
                 do not span a rotated equator",
                self.xlat1, self.xlon1, self.xlat2, self.xlon2
            )));
        }
        let pole = cross.normalize();
        let y = pole.cross(&a);
        Ok(Matrix3::from_rows(&[
            a.transpose(),
            y.transpose(),
            pole.transpose(),
        ]))
    }
}

/// Unit vector on the sphere for a geographic point in degrees.
pub fn unit_cartesian(lat_deg: f64, lon_deg: f64) -> Vector3<f64> {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Geographic (lat, lon) in degrees of a unit Cartesian vector.
pub fn latlon_from_cartesian(v: &Vector3<f64>) -> (f64, f64) {
    (
        v.z.clamp(-1.0, 1.0).asin().to_degrees(),
        v.y.atan2(v.x).to_degrees(),
    )
}

/// Geometry of a horizontal grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridGeometry {
    /// Regular lat/lon grid ('L').
    Regular {
        lat0: f64,
        lon0: f64,
        dlat: f64,
        dlon: f64,
    },
    /// Rotated lat/lon grid ('E'): regular in the rotated frame.
    Rotated {
        lat0: f64,
        lon0: f64,
        dlat: f64,
        dlon: f64,
        pole: RotationPole,
    },
    /// Combined Yin-Yang grid ('U'): two rotated sub-grids stacked along
    /// the row axis of one record.
    YinYang {
        yin: Box<GridDescriptor>,
        yang: Box<GridDescriptor>,
    },
}

/// Horizontal grid attached to a set of records.
///
/// Two records share a grid iff their descriptors compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    /// Identifier triplet linking records to this grid.
    pub grid_id: (u32, u32, u32),
    /// Grid-type tag as stored in record metadata.
    pub grtyp: char,
    /// Points along a row (columns).
    pub ni: usize,
    /// Rows.
    pub nj: usize,
    pub geometry: GridGeometry,
}

impl GridDescriptor {
    /// True for combined Yin-Yang grids.
    pub fn is_yin_yang(&self) -> bool {
        matches!(self.geometry, GridGeometry::YinYang { .. })
    }

    /// Rotation-pole parameters, when the grid is rotated.
    pub fn rotation(&self) -> Option<&RotationPole> {
        match &self.geometry {
            GridGeometry::Rotated { pole, .. } => Some(pole),
            _ => None,
        }
    }

    /// Grid shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.nj, self.ni)
    }

    /// 2D latitude and longitude arrays, row-major (nj, ni).
    ///
    /// Combined Yin-Yang grids have no single coordinate field; callers
    /// use the sub-grid descriptors instead.
    pub fn latlon(&self) -> FstResult<(Vec<f64>, Vec<f64>)> {
        match &self.geometry {
            GridGeometry::Regular {
                lat0,
                lon0,
                dlat,
                dlon,
            } => {
                let mut lat = Vec::with_capacity(self.ni * self.nj);
                let mut lon = Vec::with_capacity(self.ni * self.nj);
                for j in 0..self.nj {
                    for i in 0..self.ni {
                        lat.push(lat0 + j as f64 * dlat);
                        lon.push(lon0 + i as f64 * dlon);
                    }
                }
                Ok((lat, lon))
            }
            GridGeometry::Rotated {
                lat0,
                lon0,
                dlat,
                dlon,
                pole,
            } => {
                let rotation = pole.matrix()?;
                let inverse = rotation.transpose();
                let mut lat = Vec::with_capacity(self.ni * self.nj);
                let mut lon = Vec::with_capacity(self.ni * self.nj);
                for j in 0..self.nj {
                    for i in 0..self.ni {
                        let rlat = lat0 + j as f64 * dlat;
                        let rlon = lon0 + i as f64 * dlon;
                        let geo = inverse * unit_cartesian(rlat, rlon);
                        let (glat, glon) = latlon_from_cartesian(&geo);
                        lat.push(glat);
                        lon.push(glon);
                    }
                }
                Ok((lat, lon))
            }
            GridGeometry::YinYang { .. } => Err(FstError::MalformedYinYangGrid(
                "combined Yin-Yang grid has no single-panel coordinates".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(ni: usize, nj: usize) -> GridDescriptor {
        GridDescriptor {
            grid_id: (100, 200, 0),
            grtyp: 'L',
            ni,
            nj,
            geometry: GridGeometry::Regular {
                lat0: 40.0,
                lon0: -80.0,
                dlat: 0.5,
                dlon: 0.5,
            },
        }
    }

    #[test]
    fn test_regular_latlon_affine() {
        let grid = regular(4, 3);
        let (lat, lon) = grid.latlon().unwrap();
        assert_eq!(lat.len(), 12);
        assert!((lat[0] - 40.0).abs() < 1e-12);
        assert!((lon[0] + 80.0).abs() < 1e-12);
        // row 2, column 3
        assert!((lat[2 * 4 + 3] - 41.0).abs() < 1e-12);
        assert!((lon[2 * 4 + 3] + 78.5).abs() < 1e-12);
    }

    #[test]
    fn test_unrotated_pole_is_identity() {
        // reference points on the true equator leave coordinates unchanged
        let pole = RotationPole {
            xlat1: 0.0,
            xlon1: 0.0,
            xlat2: 0.0,
            xlon2: 90.0,
        };
        let rotation = pole.matrix().unwrap();
        let p = unit_cartesian(47.0, -71.0);
        let q = rotation * p;
        let (lat, lon) = latlon_from_cartesian(&q);
        assert!((lat - 47.0).abs() < 1e-9);
        assert!((lon + 71.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_matrix_is_orthonormal() {
        let pole = RotationPole {
            xlat1: 57.5,
            xlon1: -130.0,
            xlat2: 0.0,
            xlon2: -40.0,
        };
        let m = pole.matrix().unwrap();
        let identity = m * m.transpose();
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((identity[(r, c)] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_pole_rejected() {
        let pole = RotationPole {
            xlat1: 10.0,
            xlon1: 20.0,
            xlat2: 10.0,
            xlon2: 20.0,
        };
        assert!(pole.matrix().is_err());
    }

    #[test]
    fn test_rotated_grid_first_point_maps_to_reference() {
        // rotated origin at (0, 0) in the rotated frame lands on the first
        // reference point
        let pole = RotationPole {
            xlat1: 48.0,
            xlon1: -100.0,
            xlat2: 0.0,
            xlon2: -10.0,
        };
        let grid = GridDescriptor {
            grid_id: (1, 2, 3),
            grtyp: 'E',
            ni: 1,
            nj: 1,
            geometry: GridGeometry::Rotated {
                lat0: 0.0,
                lon0: 0.0,
                dlat: 0.5,
                dlon: 0.5,
                pole,
            },
        };
        let (lat, lon) = grid.latlon().unwrap();
        assert!((lat[0] - 48.0).abs() < 1e-9);
        assert!((lon[0] + 100.0).abs() < 1e-9);
    }
}
