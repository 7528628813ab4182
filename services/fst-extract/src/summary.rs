//! JSON summary of an assembled field, and the write-back path.

use std::path::Path;

use serde::Serialize;

use fst_access::{RecordSink, RecordStore};
use fst_common::error::FstResult;
use fst_engine::AssembledField;

/// What the CLI reports about an extraction.
#[derive(Debug, Serialize)]
pub struct FieldSummary {
    pub variable: String,
    pub validity: String,
    /// (nk, nj, ni)
    pub shape: (usize, usize, usize),
    pub grid_type: char,
    pub levels: Vec<LevelSummary>,
    pub has_latlon: bool,
    pub has_pressure: bool,
    pub yin_yang: bool,
    pub wind: bool,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Serialize)]
pub struct LevelSummary {
    pub code: u32,
    pub value: f64,
    pub kind: String,
}

impl FieldSummary {
    pub fn from_field(field: &AssembledField) -> Self {
        let values = field.values();
        let (min, max) = values.data.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), &v| (min.min(v), max.max(v)),
        );
        Self {
            variable: field.meta.nomvar.clone(),
            validity: field.meta.datev.to_datetime().to_rfc3339(),
            shape: values.shape(),
            grid_type: field.grid.grtyp,
            levels: field
                .levels
                .iter()
                .map(|entry| LevelSummary {
                    code: entry.code.0,
                    value: entry.value,
                    kind: format!("{:?}", entry.kind),
                })
                .collect(),
            has_latlon: field.lat.is_some(),
            has_pressure: field.pressure.is_some(),
            yin_yang: field.yin_yang.is_some(),
            wind: field.wind.is_some(),
            min,
            max,
        }
    }
}

/// Write the assembled field back out, one record per level.
///
/// For split Yin-Yang fields the default view is written on the Yin
/// panel's grid, since the combined record no longer exists.
pub fn write_field<S: RecordStore>(
    store: &S,
    path: &Path,
    field: &AssembledField,
) -> FstResult<()> {
    let grid = match &field.yin_yang {
        Some(pair) => &pair.yin.grid,
        None => &field.grid,
    };
    let values = field.values();
    let mut sink = store.create(path)?;
    for (k, entry) in field.levels.iter().enumerate() {
        let mut meta = field.meta.clone();
        meta.ip1 = entry.code;
        meta.grtyp = grid.grtyp;
        meta.grid_id = grid.grid_id;
        meta.nj = values.nj;
        meta.ni = values.ni;
        sink.write_record(&meta, values.level_slice(k))?;
    }
    sink.write_grid(grid)?;
    sink.finish()
}
