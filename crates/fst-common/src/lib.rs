//! Common types shared across the standard-file extraction crates.

pub mod error;
pub mod grid;
pub mod level;
pub mod time;
pub mod vertical;

pub use error::{FstError, FstResult};
pub use grid::{GridDescriptor, GridGeometry, RotationPole};
pub use level::{LevelCode, LevelKind};
pub use time::{NativeStamp, Validity};
pub use vertical::{HybridCoefficient, VerticalDescriptor, VerticalKind};
