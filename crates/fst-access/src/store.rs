//! Store traits: the seam between the engine and the standard-file codec.
//!
//! A `RecordStore` opens paths into collections, a `RecordCollection`
//! answers metadata queries and reads payloads, a `RecordSink` writes a
//! new file. The engine is generic over these traits; the native binary
//! codec plugs in behind them, and [`crate::JsonStore`] is the bundled
//! reference implementation.

use std::path::Path;

use fst_common::error::FstResult;
use fst_common::grid::GridDescriptor;
use fst_common::vertical::VerticalDescriptor;

use crate::metadata::{RecordMetadata, RecordQuery};

/// Opens standard files for reading and writing.
pub trait RecordStore {
    type Collection: RecordCollection;
    type Sink: RecordSink;

    /// True when the file at `path` is a standard file this store can open.
    /// Used by directory discovery to skip foreign files without erroring.
    fn is_standard_file(&self, path: &Path) -> bool;

    /// Open an existing file as a record collection.
    fn open(&self, path: &Path) -> FstResult<Self::Collection>;

    /// Create a new file for writing records.
    fn create(&self, path: &Path) -> FstResult<Self::Sink>;
}

/// One opened standard file.
pub trait RecordCollection {
    /// All records satisfying `query`, in file order. A fresh call
    /// re-scans the collection.
    fn find(&self, query: &RecordQuery) -> FstResult<Vec<RecordMetadata>>;

    /// 2D payload of `meta`, row-major (nj, ni).
    fn read_values(&self, meta: &RecordMetadata) -> FstResult<Vec<f32>>;

    /// Horizontal grid descriptor for `meta`'s grid identifier.
    fn grid_descriptor(&self, meta: &RecordMetadata) -> FstResult<GridDescriptor>;

    /// Vertical-coordinate descriptor of the collection.
    fn vertical_descriptor(&self, meta: &RecordMetadata) -> FstResult<VerticalDescriptor>;
}

/// Write half of the boundary, used to stage interpolation inputs.
pub trait RecordSink {
    /// Append one record. `values` must hold `meta.ni * meta.nj` points.
    fn write_record(&mut self, meta: &RecordMetadata, values: &[f32]) -> FstResult<()>;

    /// Attach a grid descriptor.
    fn write_grid(&mut self, grid: &GridDescriptor) -> FstResult<()>;

    /// Attach the vertical-coordinate descriptor.
    fn write_vertical(&mut self, descriptor: &VerticalDescriptor) -> FstResult<()>;

    /// Flush and close the file.
    fn finish(self) -> FstResult<()>;
}
