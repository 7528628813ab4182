//! Synthetic payload generators for field-extraction tests.
//!
//! These generators create predictable, verifiable data patterns that can
//! be checked point by point across the test suite.

/// Creates a test payload with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, so
/// `payload[row * ni + col] == col * 1000 + row` verifies layout and
/// copying end to end.
///
/// # Arguments
///
/// * `ni` - Number of columns
/// * `nj` - Number of rows
pub fn indexed_payload(ni: usize, nj: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(ni * nj);
    for row in 0..nj {
        for col in 0..ni {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a payload filled with a constant value.
pub fn constant_payload(ni: usize, nj: usize, value: f32) -> Vec<f32> {
    vec![value; ni * nj]
}

/// Creates a payload whose value equals the level tag everywhere.
///
/// Stacking several of these makes the level order of an assembled field
/// directly readable from the data.
pub fn level_tagged_payload(ni: usize, nj: usize, tag: f32) -> Vec<f32> {
    constant_payload(ni, nj, tag)
}

/// Creates a surface-pressure-like payload with a gentle gradient around
/// a base value in hPa.
pub fn surface_pressure_payload(ni: usize, nj: usize, base_hpa: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(ni * nj);
    for row in 0..nj {
        for col in 0..ni {
            let x = col as f32 / ni.max(1) as f32;
            let y = row as f32 / nj.max(1) as f32;
            data.push(base_hpa - 10.0 * x + 5.0 * y);
        }
    }
    data
}
