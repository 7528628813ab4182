//! Grid resolution and Yin-Yang split geometry.

use fst_access::{RecordCollection, RecordMetadata};
use fst_common::error::{FstError, FstResult};
use fst_common::grid::{GridDescriptor, GridGeometry};

/// Split geometry of a combined Yin-Yang record.
#[derive(Debug, Clone)]
pub struct YinYangSplit {
    pub yin: GridDescriptor,
    pub yang: GridDescriptor,
    /// Rows per panel: half the combined record's row count.
    pub rows_per_panel: usize,
}

/// Horizontal grid resolved for a located record set.
#[derive(Debug, Clone)]
pub struct ResolvedGrid {
    pub descriptor: GridDescriptor,
    pub split: Option<YinYangSplit>,
}

/// Resolve the grid of `reference` and detect combined Yin-Yang encoding.
///
/// The combined record stacks the two panels along its row axis, so the
/// row count must split exactly in half; each half keeps the geometry of
/// its own rotated sub-grid.
pub fn resolve<C: RecordCollection>(
    collection: &C,
    reference: &RecordMetadata,
) -> FstResult<ResolvedGrid> {
    let descriptor = collection.grid_descriptor(reference)?;
    if descriptor.shape() != reference.shape() {
        return Err(FstError::InconsistentGridShape {
            expected: descriptor.shape(),
            got: reference.shape(),
        });
    }
    let split = match &descriptor.geometry {
        GridGeometry::YinYang { yin, yang } => {
            if reference.nj % 2 != 0 {
                return Err(FstError::MalformedYinYangGrid(format!(
                    "combined record has odd row count {}",
                    reference.nj
                )));
            }
            let rows_per_panel = reference.nj / 2;
            for (name, panel) in [("yin", yin.as_ref()), ("yang", yang.as_ref())] {
                if panel.nj != rows_per_panel || panel.ni != reference.ni {
                    return Err(FstError::MalformedYinYangGrid(format!(
                        "{} panel is {}x{}, expected {}x{}",
                        name, panel.nj, panel.ni, rows_per_panel, reference.ni
                    )));
                }
            }
            Some(YinYangSplit {
                yin: (**yin).clone(),
                yang: (**yang).clone(),
                rows_per_panel,
            })
        }
        _ => None,
    };
    Ok(ResolvedGrid { descriptor, split })
}
