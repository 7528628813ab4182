//! Vertical-level codes.
//!
//! A level code packs a level-kind tag, a decimal exponent and a mantissa
//! into one integer: bits 24..28 carry the kind, bits 20..24 the exponent
//! `e`, bits 0..20 the mantissa `m`, and the decoded value is `m / 10^e`.
//! Raw codes are not monotonic with altitude, so ordering always goes
//! through the decoded value, with a direction that depends on the kind
//! (pressure-like coordinates grow downward).

use serde::{Deserialize, Serialize};

use crate::error::{FstError, FstResult};

const KIND_SHIFT: u32 = 24;
const KIND_MASK: u32 = 0xF;
const EXP_SHIFT: u32 = 20;
const EXP_MASK: u32 = 0xF;
const MANTISSA_MASK: u32 = (1 << 20) - 1;

/// Largest decimal exponent the packing can carry.
const MAX_EXP: i32 = 6;

/// Kind of vertical coordinate a level code refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelKind {
    /// Metres above sea level.
    MetresAboveSea = 0,
    /// Sigma coordinate (p / p_surface), 1.0 at the surface.
    Sigma = 1,
    /// Pressure in hectopascals.
    PressureHpa = 2,
    /// Arbitrary code, unit-free.
    Arbitrary = 3,
    /// Metres above ground level.
    MetresAboveGround = 4,
    /// Hybrid terrain-following coordinate, 1.0 at the surface.
    Hybrid = 5,
    /// Potential temperature in kelvin.
    Theta = 6,
}

impl LevelKind {
    /// Decode a kind tag; undefined tags have no kind.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::MetresAboveSea),
            1 => Some(Self::Sigma),
            2 => Some(Self::PressureHpa),
            3 => Some(Self::Arbitrary),
            4 => Some(Self::MetresAboveGround),
            5 => Some(Self::Hybrid),
            6 => Some(Self::Theta),
            _ => None,
        }
    }

    /// The tag stored in a packed code.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// True for coordinates whose value grows toward the ground.
    pub fn grows_downward(self) -> bool {
        matches!(self, Self::Sigma | Self::PressureHpa | Self::Hybrid)
    }
}

/// Packed vertical-level identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelCode(pub u32);

impl LevelCode {
    /// Pack a physical value and kind into a code.
    ///
    /// Picks the largest decimal exponent that keeps the mantissa within
    /// 20 bits, so precision is maximal for small values (sigma, hybrid)
    /// and still exact for whole-number pressures and heights.
    pub fn encode(value: f64, kind: LevelKind) -> Self {
        let value = value.max(0.0);
        for exp in (0..=MAX_EXP).rev() {
            let scaled = (value * 10f64.powi(exp)).round();
            if scaled <= MANTISSA_MASK as f64 {
                let mantissa = scaled as u32;
                return Self(
                    (kind.tag() << KIND_SHIFT) | ((exp as u32) << EXP_SHIFT) | mantissa,
                );
            }
        }
        // value too large for any exponent: saturate the mantissa
        Self((kind.tag() << KIND_SHIFT) | MANTISSA_MASK)
    }

    /// Decode into a physical value and kind.
    ///
    /// Total over every code a valid file can contain; an undefined kind
    /// tag fails with `UnsupportedVerticalCoordinate`.
    pub fn decode(self) -> FstResult<(f64, LevelKind)> {
        let tag = (self.0 >> KIND_SHIFT) & KIND_MASK;
        let kind = LevelKind::from_tag(tag).ok_or_else(|| {
            FstError::UnsupportedVerticalCoordinate(format!(
                "level code {} carries undefined kind tag {}",
                self.0, tag
            ))
        })?;
        let exp = ((self.0 >> EXP_SHIFT) & EXP_MASK) as i32;
        let mantissa = (self.0 & MANTISSA_MASK) as f64;
        Ok((mantissa / 10f64.powi(exp), kind))
    }

    /// Sort key placing the lowest physical level first.
    ///
    /// Pressure, sigma and hybrid values grow toward the ground, so they
    /// order by descending value; heights and theta order ascending.
    pub fn order_key(self) -> FstResult<f64> {
        let (value, kind) = self.decode()?;
        Ok(if kind.grows_downward() { -value } else { value })
    }
}
