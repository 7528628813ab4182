//! Field-assembly and geometric-transformation engine for standard files.
//!
//! Given a variable name and selection criteria (file or directory,
//! validity time, level codes), the engine locates matching records,
//! stacks them into vertically ordered 3D fields, attaches grid
//! coordinates, splits combined Yin-Yang grids, rotates model-relative
//! winds to geographic components, and orchestrates an external tool for
//! vertical interpolation onto pressure levels.
//!
//! [`query::Extractor`] is the single entry point; the pipeline behind it
//! runs locate → resolve → assemble → wind → interpolation, strictly in
//! that order and fully synchronously.

pub mod assemble;
pub mod interp;
pub mod locate;
pub mod query;
pub mod resolve;
pub mod wind;

pub use assemble::{AssembledField, FieldValues, LevelEntry, SharedValues, WindFields, YinYangPair};
pub use interp::{InterpolationScheme, ToolConfig};
pub use query::{Extractor, FieldQuery};
