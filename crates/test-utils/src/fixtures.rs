//! Fixtures for field-extraction tests: grids, descriptors, records,
//! on-disk collections and stub interpolation tools.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fst_access::{JsonStore, RecordMetadata, RecordSink, RecordStore};
use fst_common::grid::{GridDescriptor, GridGeometry, RotationPole};
use fst_common::level::{LevelCode, LevelKind};
use fst_common::time::NativeStamp;
use fst_common::vertical::{HybridCoefficient, VerticalDescriptor, VerticalKind};

/// Validity stamp shared by most fixtures (an arbitrary mid-2016 time).
pub const BASE_STAMP: NativeStamp = NativeStamp(230_000_000);

/// A small regular lat/lon grid over eastern Canada.
pub fn regular_grid(ni: usize, nj: usize) -> GridDescriptor {
    GridDescriptor {
        grid_id: (100, 200, 0),
        grtyp: 'L',
        ni,
        nj,
        geometry: GridGeometry::Regular {
            lat0: 45.0,
            lon0: -75.0,
            dlat: 0.5,
            dlon: 0.5,
        },
    }
}

/// A rotated lat/lon grid with a mid-latitude rotation pole.
pub fn rotated_grid(ni: usize, nj: usize) -> GridDescriptor {
    GridDescriptor {
        grid_id: (300, 400, 0),
        grtyp: 'E',
        ni,
        nj,
        geometry: GridGeometry::Rotated {
            lat0: -5.0,
            lon0: -5.0,
            dlat: 0.5,
            dlon: 0.5,
            pole: RotationPole {
                xlat1: 57.5,
                xlon1: -130.0,
                xlat2: 0.0,
                xlon2: -40.0,
            },
        },
    }
}

/// A combined Yin-Yang grid of two rotated panels with `nj_panel` rows
/// each; the combined record carries `2 * nj_panel` rows.
pub fn yin_yang_grid(ni: usize, nj_panel: usize) -> GridDescriptor {
    let panel = |grid_id, xlat1, xlon1| GridDescriptor {
        grid_id,
        grtyp: 'E',
        ni,
        nj: nj_panel,
        geometry: GridGeometry::Rotated {
            lat0: -5.0,
            lon0: -5.0,
            dlat: 0.5,
            dlon: 0.5,
            pole: RotationPole {
                xlat1,
                xlon1,
                xlat2: 0.0,
                xlon2: -40.0,
            },
        },
    };
    GridDescriptor {
        grid_id: (500, 600, 0),
        grtyp: 'U',
        ni,
        nj: nj_panel * 2,
        geometry: GridGeometry::YinYang {
            yin: Box::new(panel((500, 600, 1), 57.5, -130.0)),
            yang: Box::new(panel((500, 600, 2), -57.5, 50.0)),
        },
    }
}

/// Record metadata on `grid` at the base validity stamp.
pub fn record(nomvar: &str, ip1: LevelCode, grid: &GridDescriptor) -> RecordMetadata {
    record_at(nomvar, ip1, BASE_STAMP, grid)
}

/// Record metadata on `grid` at an explicit validity stamp.
pub fn record_at(
    nomvar: &str,
    ip1: LevelCode,
    datev: NativeStamp,
    grid: &GridDescriptor,
) -> RecordMetadata {
    RecordMetadata {
        nomvar: nomvar.to_string(),
        typvar: "P".to_string(),
        etiket: "G133K80P".to_string(),
        datev,
        ip1,
        ip2: 6,
        ip3: 0,
        grtyp: grid.grtyp,
        grid_id: grid.grid_id,
        ni: grid.ni,
        nj: grid.nj,
    }
}

/// Surface level code (0 m above ground).
pub fn surface_code() -> LevelCode {
    LevelCode::encode(0.0, LevelKind::MetresAboveGround)
}

/// Pressure-level code in hPa.
pub fn pressure_code(hpa: f64) -> LevelCode {
    LevelCode::encode(hpa, LevelKind::PressureHpa)
}

/// Hybrid-level code.
pub fn hybrid_code(value: f64) -> LevelCode {
    LevelCode::encode(value, LevelKind::Hybrid)
}

/// Hybrid vertical descriptor with coefficients for the given codes.
pub fn hybrid_descriptor(coefficients: &[(LevelCode, f64, f64)]) -> VerticalDescriptor {
    let mut table = BTreeMap::new();
    for &(code, a, b) in coefficients {
        table.insert(code.0, HybridCoefficient { a, b });
    }
    VerticalDescriptor {
        kind: VerticalKind::Hybrid,
        coefficients: table,
    }
}

/// Write a JSON-format collection with the given records, grids and
/// optional vertical descriptor.
pub fn write_collection(
    path: &Path,
    records: &[(RecordMetadata, Vec<f32>)],
    grids: &[GridDescriptor],
    vertical: Option<&VerticalDescriptor>,
) {
    let mut sink = JsonStore.create(path).expect("create collection");
    for (meta, values) in records {
        sink.write_record(meta, values).expect("write record");
    }
    for grid in grids {
        sink.write_grid(grid).expect("write grid");
    }
    if let Some(descriptor) = vertical {
        sink.write_vertical(descriptor).expect("write vertical");
    }
    sink.finish().expect("finish collection");
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write stub tool");
    let mut permissions = fs::metadata(&path).expect("stat stub tool").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod stub tool");
    path
}

/// Stub interpolation tool that copies a canned output file to its `-d`
/// target, whatever the remaining arguments.
pub fn write_stub_tool(dir: &Path, canned_output: &Path) -> PathBuf {
    let body = format!(
        "#!/bin/sh\n\
         out=\"\"\n\
         while [ \"$#\" -gt 0 ]; do\n\
         \x20 case \"$1\" in\n\
         \x20   -d) out=\"$2\"; shift 2 ;;\n\
         \x20   *) shift ;;\n\
         \x20 esac\n\
         done\n\
         cp \"{}\" \"$out\"\n",
        canned_output.display()
    );
    write_script(dir, "stub-pxs2pxt", &body)
}

/// Stub interpolation tool that prints to stderr and exits non-zero.
pub fn write_failing_tool(dir: &Path, message: &str, exit_code: i32) -> PathBuf {
    let body = format!(
        "#!/bin/sh\necho \"{}\" >&2\nexit {}\n",
        message, exit_code
    );
    write_script(dir, "failing-pxs2pxt", &body)
}

/// Stub interpolation tool that sleeps past any reasonable deadline.
pub fn write_hanging_tool(dir: &Path, seconds: u32) -> PathBuf {
    let body = format!("#!/bin/sh\nsleep {}\n", seconds);
    write_script(dir, "hanging-pxs2pxt", &body)
}
