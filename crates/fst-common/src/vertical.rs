//! Vertical-coordinate descriptors.
//!
//! Every record collection carries one descriptor for its vertical
//! coordinate. Decoding a level code is a pure function of the code and
//! this descriptor; pressure reconstruction for terrain-following levels
//! goes through the per-code hybrid coefficients stored here. The
//! descriptor is an injected capability read from the collection, never a
//! global table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FstError, FstResult};
use crate::level::{LevelCode, LevelKind};

/// Coordinate family a collection's vertical axis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalKind {
    /// Sigma coordinate, p / p_surface.
    Sigma,
    /// Hybrid terrain-following coordinate.
    Hybrid,
    /// Plain pressure levels.
    Pressure,
}

/// Per-level coefficients for pressure reconstruction: p = a + b * p0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridCoefficient {
    /// Additive term in pascals.
    pub a: f64,
    /// Surface-pressure multiplier, dimensionless.
    pub b: f64,
}

impl HybridCoefficient {
    /// Pressure in hPa at a point with surface pressure `p0_hpa`.
    pub fn pressure_hpa(&self, p0_hpa: f64) -> f64 {
        (self.a + self.b * p0_hpa * 100.0) / 100.0
    }
}

/// Vertical-coordinate description of one record collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalDescriptor {
    pub kind: VerticalKind,
    /// Coefficients keyed by raw level code.
    #[serde(default)]
    pub coefficients: BTreeMap<u32, HybridCoefficient>,
}

impl VerticalDescriptor {
    /// Descriptor for plain pressure-level collections (no coefficients).
    pub fn pressure() -> Self {
        Self {
            kind: VerticalKind::Pressure,
            coefficients: BTreeMap::new(),
        }
    }

    /// True when this descriptor covers level codes of `kind`.
    ///
    /// Surface and diagnostic height levels appear in every family; theta
    /// surfaces are not supported by any of them.
    pub fn supports(&self, kind: LevelKind) -> bool {
        let diagnostic = matches!(
            kind,
            LevelKind::MetresAboveSea | LevelKind::MetresAboveGround | LevelKind::Arbitrary
        );
        diagnostic
            || match self.kind {
                VerticalKind::Sigma => kind == LevelKind::Sigma,
                VerticalKind::Hybrid => kind == LevelKind::Hybrid,
                VerticalKind::Pressure => kind == LevelKind::PressureHpa,
            }
    }

    /// Decode a level code against this descriptor.
    pub fn decode(&self, code: LevelCode) -> FstResult<(f64, LevelKind)> {
        let (value, kind) = code.decode()?;
        if !self.supports(kind) {
            return Err(FstError::UnsupportedVerticalCoordinate(format!(
                "{:?} level code {} in a {:?} coordinate collection",
                kind, code.0, self.kind
            )));
        }
        Ok((value, kind))
    }

    /// Coefficients stored for `code`, validating kind support first.
    pub fn coefficient(&self, code: LevelCode) -> FstResult<HybridCoefficient> {
        self.decode(code)?;
        self.coefficients.get(&code.0).copied().ok_or_else(|| {
            FstError::UnsupportedVerticalCoordinate(format!(
                "no pressure coefficients for level code {}",
                code.0
            ))
        })
    }

    /// Pressure in hPa at `code` for a point with surface pressure `p0_hpa`.
    ///
    /// Pressure-level codes decode directly; terrain-following codes go
    /// through their stored coefficients.
    pub fn pressure_hpa(&self, code: LevelCode, p0_hpa: f64) -> FstResult<f64> {
        let (value, kind) = self.decode(code)?;
        if kind == LevelKind::PressureHpa {
            return Ok(value);
        }
        Ok(self.coefficient(code)?.pressure_hpa(p0_hpa))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hybrid_descriptor(code: LevelCode, a: f64, b: f64) -> VerticalDescriptor {
        let mut coefficients = BTreeMap::new();
        coefficients.insert(code.0, HybridCoefficient { a, b });
        VerticalDescriptor {
            kind: VerticalKind::Hybrid,
            coefficients,
        }
    }

    #[test]
    fn test_pressure_code_decodes_directly() {
        let descriptor = VerticalDescriptor::pressure();
        let code = LevelCode::encode(850.0, LevelKind::PressureHpa);
        assert_eq!(descriptor.pressure_hpa(code, 1013.0).unwrap(), 850.0);
    }

    #[test]
    fn test_hybrid_pressure_uses_coefficients() {
        let code = LevelCode::encode(0.995, LevelKind::Hybrid);
        // a = 0 Pa, b = 0.995: p tracks the surface pressure
        let descriptor = hybrid_descriptor(code, 0.0, 0.995);
        let p = descriptor.pressure_hpa(code, 1000.0).unwrap();
        assert!((p - 995.0).abs() < 1e-9);
    }

    #[test]
    fn test_theta_unsupported_in_every_family() {
        let code = LevelCode::encode(320.0, LevelKind::Theta);
        for kind in [VerticalKind::Sigma, VerticalKind::Hybrid, VerticalKind::Pressure] {
            let descriptor = VerticalDescriptor {
                kind,
                coefficients: BTreeMap::new(),
            };
            assert!(matches!(
                descriptor.decode(code),
                Err(FstError::UnsupportedVerticalCoordinate(_))
            ));
        }
    }

    #[test]
    fn test_missing_coefficients_rejected() {
        let descriptor = VerticalDescriptor {
            kind: VerticalKind::Hybrid,
            coefficients: BTreeMap::new(),
        };
        let code = LevelCode::encode(0.5, LevelKind::Hybrid);
        assert!(matches!(
            descriptor.pressure_hpa(code, 1000.0),
            Err(FstError::UnsupportedVerticalCoordinate(_))
        ));
    }
}
