//! JSON-backed reference store.
//!
//! One file holds a flat document of records, grid descriptors and the
//! vertical descriptor. The native binary codec is the production backend;
//! this store keeps the engine, tests and CLI runnable without it.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use fst_common::error::{FstError, FstResult};
use fst_common::grid::GridDescriptor;
use fst_common::vertical::VerticalDescriptor;

use crate::metadata::{RecordMetadata, RecordQuery};
use crate::store::{RecordCollection, RecordSink, RecordStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    meta: RecordMetadata,
    values: Vec<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FileDocument {
    records: Vec<StoredRecord>,
    grids: Vec<GridDescriptor>,
    vertical: Option<VerticalDescriptor>,
}

/// Store reading and writing the JSON file format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStore;

impl RecordStore for JsonStore {
    type Collection = JsonCollection;
    type Sink = JsonSink;

    fn is_standard_file(&self, path: &Path) -> bool {
        let Ok(file) = File::open(path) else {
            return false;
        };
        serde_json::from_reader::<_, FileDocument>(BufReader::new(file)).is_ok()
    }

    fn open(&self, path: &Path) -> FstResult<Self::Collection> {
        let file = File::open(path).map_err(|e| {
            FstError::store(format!("cannot open {}: {}", path.display(), e))
        })?;
        let doc: FileDocument = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            FstError::store(format!("{} is not a standard file: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), records = doc.records.len(), "opened collection");
        Ok(JsonCollection {
            path: path.to_path_buf(),
            doc,
        })
    }

    fn create(&self, path: &Path) -> FstResult<Self::Sink> {
        Ok(JsonSink {
            path: path.to_path_buf(),
            doc: FileDocument::default(),
        })
    }
}

/// One opened JSON-format file.
#[derive(Debug)]
pub struct JsonCollection {
    path: PathBuf,
    doc: FileDocument,
}

impl RecordCollection for JsonCollection {
    fn find(&self, query: &RecordQuery) -> FstResult<Vec<RecordMetadata>> {
        Ok(self
            .doc
            .records
            .iter()
            .filter(|r| query.matches(&r.meta))
            .map(|r| r.meta.clone())
            .collect())
    }

    fn read_values(&self, meta: &RecordMetadata) -> FstResult<Vec<f32>> {
        let record = self
            .doc
            .records
            .iter()
            .find(|r| r.meta == *meta)
            .ok_or_else(|| {
                FstError::store(format!(
                    "record {} (level code {}) not present in {}",
                    meta.nomvar,
                    meta.ip1.0,
                    self.path.display()
                ))
            })?;
        if record.values.len() != meta.ni * meta.nj {
            return Err(FstError::store(format!(
                "record {} holds {} values for a {}x{} grid",
                meta.nomvar,
                record.values.len(),
                meta.nj,
                meta.ni
            )));
        }
        Ok(record.values.clone())
    }

    fn grid_descriptor(&self, meta: &RecordMetadata) -> FstResult<GridDescriptor> {
        self.doc
            .grids
            .iter()
            .find(|g| g.grid_id == meta.grid_id)
            .cloned()
            .ok_or_else(|| {
                FstError::store(format!(
                    "no grid descriptor {:?} in {}",
                    meta.grid_id,
                    self.path.display()
                ))
            })
    }

    fn vertical_descriptor(&self, _meta: &RecordMetadata) -> FstResult<VerticalDescriptor> {
        self.doc.vertical.clone().ok_or_else(|| {
            FstError::store(format!(
                "no vertical descriptor in {}",
                self.path.display()
            ))
        })
    }
}

/// Sink accumulating a JSON-format file, written on `finish`.
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
    doc: FileDocument,
}

impl RecordSink for JsonSink {
    fn write_record(&mut self, meta: &RecordMetadata, values: &[f32]) -> FstResult<()> {
        if values.len() != meta.ni * meta.nj {
            return Err(FstError::store(format!(
                "payload of {} values does not fill a {}x{} grid",
                values.len(),
                meta.nj,
                meta.ni
            )));
        }
        self.doc.records.push(StoredRecord {
            meta: meta.clone(),
            values: values.to_vec(),
        });
        Ok(())
    }

    fn write_grid(&mut self, grid: &GridDescriptor) -> FstResult<()> {
        if !self.doc.grids.iter().any(|g| g.grid_id == grid.grid_id) {
            self.doc.grids.push(grid.clone());
        }
        Ok(())
    }

    fn write_vertical(&mut self, descriptor: &VerticalDescriptor) -> FstResult<()> {
        self.doc.vertical = Some(descriptor.clone());
        Ok(())
    }

    fn finish(self) -> FstResult<()> {
        let file = File::create(&self.path).map_err(|e| {
            FstError::store(format!("cannot create {}: {}", self.path.display(), e))
        })?;
        serde_json::to_writer(BufWriter::new(file), &self.doc)?;
        debug!(path = %self.path.display(), records = self.doc.records.len(), "wrote collection");
        Ok(())
    }
}
