//! Field assembly: stacking level records into ordered 3D arrays.
//!
//! Records that differ only by vertical level stack along a third axis,
//! sorted so the lowest physical level sits at k = 0. Combined Yin-Yang
//! records additionally split into two panel fields; the parent field's
//! arrays then alias the Yin panel's through shared handles, so mutation
//! through either side is observable through the other. That aliasing is
//! an API contract, not an accident.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use fst_access::{RecordCollection, RecordMetadata, RecordQuery};
use fst_common::error::{FstError, FstResult};
use fst_common::grid::GridDescriptor;
use fst_common::level::{LevelCode, LevelKind};
use fst_common::vertical::VerticalDescriptor;

use crate::locate::{LocatedSet, SURFACE_PRESSURE};
use crate::resolve::ResolvedGrid;

/// Dense row-major f32 array of shape (nk, nj, ni); level slices are
/// contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValues {
    pub data: Vec<f32>,
    pub ni: usize,
    pub nj: usize,
    pub nk: usize,
}

impl FieldValues {
    /// Zero-filled array of the given shape.
    pub fn zeros(ni: usize, nj: usize, nk: usize) -> Self {
        Self {
            data: vec![0.0; ni * nj * nk],
            ni,
            nj,
            nk,
        }
    }

    /// Shape as (nk, nj, ni).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nk, self.nj, self.ni)
    }

    /// Value at (k, j, i).
    pub fn get(&self, k: usize, j: usize, i: usize) -> f32 {
        self.data[(k * self.nj + j) * self.ni + i]
    }

    /// Set the value at (k, j, i).
    pub fn set(&mut self, k: usize, j: usize, i: usize, value: f32) {
        self.data[(k * self.nj + j) * self.ni + i] = value;
    }

    /// Contiguous 2D slice of level `k`.
    pub fn level_slice(&self, k: usize) -> &[f32] {
        let plane = self.ni * self.nj;
        &self.data[k * plane..(k + 1) * plane]
    }

    /// Mutable 2D slice of level `k`.
    pub fn level_slice_mut(&mut self, k: usize) -> &mut [f32] {
        let plane = self.ni * self.nj;
        &mut self.data[k * plane..(k + 1) * plane]
    }
}

/// Shared handle to a field's value array.
pub type SharedValues = Arc<RwLock<FieldValues>>;

/// One entry of a field's vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelEntry {
    pub code: LevelCode,
    /// Decoded physical value (unit per kind).
    pub value: f64,
    pub kind: LevelKind,
}

/// The two independently valid panels of a split Yin-Yang field.
#[derive(Debug, Clone)]
pub struct YinYangPair {
    pub yin: AssembledField,
    pub yang: AssembledField,
}

/// Raw and derived wind components of a composite wind field.
#[derive(Debug, Clone)]
pub struct WindFields {
    /// Raw zonal model-relative component (aliases the carrier field).
    pub uu: SharedValues,
    /// Raw meridional model-relative component.
    pub vv: SharedValues,
    /// Geographic zonal component [m/s].
    pub uuwe: FieldValues,
    /// Geographic meridional component [m/s].
    pub vvsn: FieldValues,
    /// Wind modulus in the raw components' units.
    pub modulus: FieldValues,
    /// Meteorological direction [deg], the direction the wind comes from.
    pub direction: FieldValues,
}

/// A fully assembled field with its grid, vertical axis and optional
/// extensions.
#[derive(Debug, Clone)]
pub struct AssembledField {
    /// Stacked values. For combined Yin-Yang grids this handle aliases the
    /// Yin panel's values.
    pub values: SharedValues,
    /// Metadata of the first matching record, representative of the field.
    pub meta: RecordMetadata,
    pub grid: GridDescriptor,
    /// Vertical axis, lowest physical level first (unless assembled with
    /// `keep_order`).
    pub levels: Vec<LevelEntry>,
    /// 2D latitudes, row-major (nj, ni); aliases the Yin panel's on
    /// combined grids.
    pub lat: Option<Arc<Vec<f64>>>,
    /// 2D longitudes, same layout as `lat`.
    pub lon: Option<Arc<Vec<f64>>>,
    /// 3D pressure [hPa] matching `values` in shape.
    pub pressure: Option<Arc<FieldValues>>,
    pub yin_yang: Option<Box<YinYangPair>>,
    pub wind: Option<Box<WindFields>>,
}

impl AssembledField {
    /// Read access to the value array.
    pub fn values(&self) -> RwLockReadGuard<'_, FieldValues> {
        self.values.read().expect("field values lock poisoned")
    }

    /// Write access to the value array.
    pub fn values_mut(&self) -> RwLockWriteGuard<'_, FieldValues> {
        self.values.write().expect("field values lock poisoned")
    }

    /// Shape of the value array as (nk, nj, ni).
    pub fn shape(&self) -> (usize, usize, usize) {
        self.values().shape()
    }

    /// Level codes in axis order.
    pub fn level_codes(&self) -> Vec<LevelCode> {
        self.levels.iter().map(|l| l.code).collect()
    }

    /// Decoded level values in axis order.
    pub fn level_values(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.value).collect()
    }
}

/// Knobs for one assembly call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    /// Attach 2D latitude/longitude arrays.
    pub latlon: bool,
    /// Keep the located order instead of the canonical vertical sort.
    /// Pressure-interpolated output keeps the caller's level order.
    pub keep_order: bool,
}

/// Stack a located record set into an assembled field.
pub fn assemble<C: RecordCollection>(
    collection: &C,
    set: &LocatedSet,
    grid: &ResolvedGrid,
    options: &AssembleOptions,
) -> FstResult<AssembledField> {
    if set.records.is_empty() {
        return Err(FstError::no_match(format!(
            "empty level group for {}",
            set.reference.nomvar
        )));
    }

    // decode every level up front; sorting is by decoded value, never raw code
    let mut entries: Vec<(RecordMetadata, LevelEntry, f64)> = Vec::with_capacity(set.records.len());
    for record in &set.records {
        let (value, kind) = record.ip1.decode()?;
        let key = record.ip1.order_key()?;
        let entry = LevelEntry {
            code: record.ip1,
            value,
            kind,
        };
        entries.push((record.clone(), entry, key));
    }
    if !options.keep_order {
        entries.sort_by(|a, b| a.2.total_cmp(&b.2));
    }

    let (nj, ni) = set.reference.shape();
    let nk = entries.len();
    let mut values = FieldValues::zeros(ni, nj, nk);
    for (k, (record, _, _)) in entries.iter().enumerate() {
        if record.shape() != (nj, ni) {
            return Err(FstError::InconsistentGridShape {
                expected: (nj, ni),
                got: record.shape(),
            });
        }
        let payload = collection.read_values(record)?;
        if payload.len() != ni * nj {
            return Err(FstError::store(format!(
                "payload of {} values for a {}x{} record",
                payload.len(),
                nj,
                ni
            )));
        }
        values.level_slice_mut(k).copy_from_slice(&payload);
    }
    let levels: Vec<LevelEntry> = entries.iter().map(|(_, entry, _)| *entry).collect();
    debug!(
        nomvar = %set.reference.nomvar,
        nk,
        nj,
        ni,
        "assembled field"
    );

    if let Some(split) = &grid.split {
        return assemble_split(set, grid, split, values, levels, options);
    }

    let (lat, lon) = if options.latlon {
        let (lat, lon) = grid.descriptor.latlon()?;
        (Some(Arc::new(lat)), Some(Arc::new(lon)))
    } else {
        (None, None)
    };

    Ok(AssembledField {
        values: Arc::new(RwLock::new(values)),
        meta: set.reference.clone(),
        grid: grid.descriptor.clone(),
        levels,
        lat,
        lon,
        pressure: None,
        yin_yang: None,
        wind: None,
    })
}

/// Build the Yin and Yang panel fields and the aliased default view.
fn assemble_split(
    set: &LocatedSet,
    grid: &ResolvedGrid,
    split: &crate::resolve::YinYangSplit,
    combined: FieldValues,
    levels: Vec<LevelEntry>,
    options: &AssembleOptions,
) -> FstResult<AssembledField> {
    let rows = split.rows_per_panel;
    let panel_field = |descriptor: &GridDescriptor, take_second: bool| -> FstResult<AssembledField> {
        let mut panel = FieldValues::zeros(combined.ni, rows, combined.nk);
        let plane = combined.ni * rows;
        for k in 0..combined.nk {
            let slice = combined.level_slice(k);
            let half = if take_second {
                &slice[plane..]
            } else {
                &slice[..plane]
            };
            panel.level_slice_mut(k).copy_from_slice(half);
        }
        let (lat, lon) = if options.latlon {
            let (lat, lon) = descriptor.latlon()?;
            (Some(Arc::new(lat)), Some(Arc::new(lon)))
        } else {
            (None, None)
        };
        let mut meta = set.reference.clone();
        meta.nj = rows;
        Ok(AssembledField {
            values: Arc::new(RwLock::new(panel)),
            meta,
            grid: descriptor.clone(),
            levels: levels.clone(),
            lat,
            lon,
            pressure: None,
            yin_yang: None,
            wind: None,
        })
    };

    let yin = panel_field(&split.yin, false)?;
    let yang = panel_field(&split.yang, true)?;

    // the default view shares the Yin panel's arrays; identity, not a copy
    Ok(AssembledField {
        values: Arc::clone(&yin.values),
        meta: set.reference.clone(),
        grid: grid.descriptor.clone(),
        levels,
        lat: yin.lat.clone(),
        lon: yin.lon.clone(),
        pressure: None,
        yin_yang: Some(Box::new(YinYangPair { yin, yang })),
        wind: None,
    })
}

/// Reconstruct and attach the 3D pressure array of `field`.
///
/// Pressure-level entries decode directly; terrain-following entries go
/// through the collection's vertical descriptor and the surface-pressure
/// field located on the same grid and validity time. On combined Yin-Yang
/// grids the surface-pressure record is combined too: it splits along its
/// row axis like the data, each panel gets its own pressure array, and
/// the default view aliases the Yin panel's.
pub fn attach_pressure<C: RecordCollection>(
    collection: &C,
    field: &mut AssembledField,
) -> FstResult<()> {
    let needs_surface = field
        .levels
        .iter()
        .any(|entry| entry.kind != LevelKind::PressureHpa);

    if let Some(pair) = field.yin_yang.as_deref_mut() {
        let surface = if needs_surface {
            let descriptor = collection.vertical_descriptor(&field.meta)?;
            let p0 = locate_surface_pressure(collection, &field.meta, field.meta.shape())?;
            Some((descriptor, p0))
        } else {
            None
        };
        let plane = pair.yin.values().ni * pair.yin.values().nj;
        for (panel, offset) in [(&mut pair.yin, 0), (&mut pair.yang, plane)] {
            let panel_surface = surface
                .as_ref()
                .map(|(descriptor, p0)| (descriptor, &p0[offset..offset + plane]));
            let (nk, nj, ni) = panel.shape();
            let pressure = pressure_field(&panel.levels, (nk, nj, ni), panel_surface)?;
            panel.pressure = Some(Arc::new(pressure));
        }
        field.pressure = pair.yin.pressure.clone();
        return Ok(());
    }

    let surface = if needs_surface {
        let descriptor = collection.vertical_descriptor(&field.meta)?;
        let p0 = locate_surface_pressure(collection, &field.meta, field.meta.shape())?;
        Some((descriptor, p0))
    } else {
        None
    };
    let pressure = pressure_field(
        &field.levels,
        field.shape(),
        surface.as_ref().map(|(d, p0)| (d, p0.as_slice())),
    )?;
    field.pressure = Some(Arc::new(pressure));
    Ok(())
}

/// Surface pressure [hPa] on the given grid at the given validity time.
fn locate_surface_pressure<C: RecordCollection>(
    collection: &C,
    meta: &RecordMetadata,
    shape: (usize, usize),
) -> FstResult<Vec<f32>> {
    let query = RecordQuery::variable(SURFACE_PRESSURE)
        .at(meta.datev)
        .on_grid(meta.grid_id);
    let record = collection
        .find(&query)?
        .into_iter()
        .find(|m| m.datev == meta.datev)
        .ok_or_else(|| {
            FstError::no_match(format!(
                "surface pressure is required to reconstruct pressure for {}",
                meta.nomvar
            ))
        })?;
    if record.shape() != shape {
        return Err(FstError::InconsistentGridShape {
            expected: shape,
            got: record.shape(),
        });
    }
    collection.read_values(&record)
}

/// Build one pressure array; terrain-following levels need the vertical
/// descriptor and a surface-pressure plane.
fn pressure_field(
    levels: &[LevelEntry],
    shape: (usize, usize, usize),
    surface: Option<(&VerticalDescriptor, &[f32])>,
) -> FstResult<FieldValues> {
    let (nk, nj, ni) = shape;
    let mut pressure = FieldValues::zeros(ni, nj, nk);
    for (k, entry) in levels.iter().enumerate() {
        if entry.kind == LevelKind::PressureHpa {
            pressure.level_slice_mut(k).fill(entry.value as f32);
            continue;
        }
        let Some((descriptor, p0_hpa)) = surface else {
            return Err(FstError::UnsupportedVerticalCoordinate(format!(
                "level code {} needs surface pressure for reconstruction",
                entry.code.0
            )));
        };
        let coeff = descriptor.coefficient(entry.code)?;
        let slice = pressure.level_slice_mut(k);
        for (point, p0) in slice.iter_mut().zip(p0_hpa.iter()) {
            *point = coeff.pressure_hpa(f64::from(*p0)) as f32;
        }
    }
    Ok(pressure)
}
