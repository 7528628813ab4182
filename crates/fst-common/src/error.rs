//! Error types for standard-file field extraction.

use thiserror::Error;

/// Result type alias using FstError.
pub type FstResult<T> = Result<T, FstError>;

/// Primary error type for extraction and transformation operations.
///
/// Every variant is terminal for the request that raised it: nothing in this
/// engine retries automatically, and partial results are never returned.
#[derive(Debug, Error)]
pub enum FstError {
    // === Search errors ===
    /// No record satisfied the search criteria.
    #[error("no matching record: {0}")]
    NoMatchingRecord(String),

    /// More than one candidate satisfied criteria that must identify exactly one.
    #[error("ambiguous match: {0}")]
    AmbiguousMatch(String),

    // === Decoding errors ===
    /// Level code or descriptor outside the supported vertical-coordinate kinds.
    #[error("unsupported vertical coordinate: {0}")]
    UnsupportedVerticalCoordinate(String),

    /// Combined Yin-Yang record whose leading axis cannot be split in half.
    #[error("malformed Yin-Yang grid: {0}")]
    MalformedYinYangGrid(String),

    /// Records of one level group disagree on horizontal shape.
    #[error("inconsistent grid shape: expected {expected:?}, got {got:?}")]
    InconsistentGridShape {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Input that the single-precision rotation kernels would corrupt silently.
    #[error("precision policy violation: {0}")]
    PrecisionPolicyViolation(String),

    // === Interpolation errors ===
    /// The external interpolation tool exited abnormally.
    #[error("interpolation tool failed: {0}")]
    InterpolationToolFailed(String),

    /// The external interpolation tool exceeded the configured deadline.
    #[error("interpolation tool timed out after {0:?}")]
    InterpolationTimeout(std::time::Duration),

    /// Temporary-workspace creation or removal failed.
    #[error("workspace I/O error: {0}")]
    WorkspaceIo(String),

    // === Request errors ===
    /// Malformed query (missing source, missing variable name, empty level list).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Record store failure (open, read, decode).
    #[error("record store error: {0}")]
    Store(String),
}

impl FstError {
    /// Create a NoMatchingRecord error.
    pub fn no_match(msg: impl Into<String>) -> Self {
        Self::NoMatchingRecord(msg.into())
    }

    /// Create an AmbiguousMatch error.
    pub fn ambiguous(msg: impl Into<String>) -> Self {
        Self::AmbiguousMatch(msg.into())
    }

    /// Create a Store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a WorkspaceIo error.
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::WorkspaceIo(msg.into())
    }
}

impl From<std::io::Error> for FstError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for FstError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("JSON error: {}", err))
    }
}
