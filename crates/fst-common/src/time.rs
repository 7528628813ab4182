//! Validity-time handling.
//!
//! Standard files stamp every record with a native timestamp code counting
//! 5-second units since 1980-01-01T00:00:00Z, so validity times on
//! fractional minutes never collide at stamp resolution. Searches match a
//! requested validity time within a small tolerance window; the closest
//! stamp wins and an exact tie is ambiguous.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds represented by one stamp unit.
const STAMP_UNIT_SECS: i64 = 5;

/// Half-width of the validity-time matching window, in seconds.
pub const VALIDITY_TOLERANCE_SECS: i64 = 30;

/// Native validity-timestamp code of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NativeStamp(pub i64);

impl NativeStamp {
    /// Stamp epoch: 1980-01-01T00:00:00Z.
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).unwrap()
    }

    /// Encode a calendar time, rounding to the 5-second stamp resolution.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = (dt - Self::epoch()).num_seconds();
        // round-to-nearest keeps encode/decode stable around unit boundaries
        let units = (secs + STAMP_UNIT_SECS / 2).div_euclid(STAMP_UNIT_SECS);
        Self(units)
    }

    /// Decode back to a calendar time.
    pub fn to_datetime(self) -> DateTime<Utc> {
        Self::epoch() + Duration::seconds(self.0 * STAMP_UNIT_SECS)
    }

    /// Absolute distance to another stamp, in seconds.
    pub fn distance_secs(self, other: NativeStamp) -> i64 {
        (self.0 - other.0).abs() * STAMP_UNIT_SECS
    }

    /// True when `self` lies within the tolerance window around `requested`.
    pub fn matches(self, requested: NativeStamp) -> bool {
        self.distance_secs(requested) <= VALIDITY_TOLERANCE_SECS
    }
}

/// A requested validity time: either a native stamp code or a calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    /// Native timestamp code, passed through untouched.
    Stamp(NativeStamp),
    /// Calendar timestamp, encoded at stamp resolution.
    Calendar(DateTime<Utc>),
}

impl Validity {
    /// The native stamp this validity resolves to.
    pub fn stamp(&self) -> NativeStamp {
        match self {
            Validity::Stamp(s) => *s,
            Validity::Calendar(dt) => NativeStamp::from_datetime(*dt),
        }
    }
}

impl From<DateTime<Utc>> for Validity {
    fn from(dt: DateTime<Utc>) -> Self {
        Validity::Calendar(dt)
    }
}

impl From<NativeStamp> for Validity {
    fn from(stamp: NativeStamp) -> Self {
        Validity::Stamp(stamp)
    }
}

impl From<i64> for Validity {
    fn from(code: i64) -> Self {
        Validity::Stamp(NativeStamp(code))
    }
}
