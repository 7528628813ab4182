//! Facade-level behaviour: composite wind queries and their derived
//! fields.

use std::sync::Arc;

use fst_access::JsonStore;
use fst_common::error::FstError;
use fst_engine::wind::KNOT_TO_MS;
use fst_engine::{Extractor, FieldQuery};
use test_utils::{
    assert_approx_eq, constant_payload, pressure_code, record, regular_grid, rotated_grid,
    write_collection,
};

fn extractor() -> Extractor<JsonStore> {
    Extractor::new(JsonStore)
}

fn wind_file(path: &std::path::Path, grid: &fst_common::grid::GridDescriptor, u: f32, v: f32) {
    let levels = [1000.0, 500.0];
    let mut records = Vec::new();
    for &hpa in &levels {
        records.push((
            record("UU", pressure_code(hpa), grid),
            constant_payload(grid.ni, grid.nj, u),
        ));
        records.push((
            record("VV", pressure_code(hpa), grid),
            constant_payload(grid.ni, grid.nj, v),
        ));
    }
    write_collection(path, &records, &[grid.clone()], None);
}

#[test]
fn test_composite_wind_returns_raw_and_derived() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wind.fst");
    let grid = regular_grid(4, 3);
    wind_file(&path, &grid, 0.0, 1.0);

    let field = extractor()
        .extract(&FieldQuery::variable("UV").from_file(&path))
        .unwrap();
    let wind = field.wind.as_ref().unwrap();

    // the raw U component is the carrier field itself
    assert!(Arc::ptr_eq(&wind.uu, &field.values));

    let (nk, nj, ni) = field.shape();
    assert_eq!((nk, nj, ni), (2, 3, 4));
    assert_eq!(wind.vv.read().unwrap().shape(), (2, 3, 4));
    assert_eq!(wind.uuwe.shape(), (2, 3, 4));
    assert_eq!(wind.vvsn.shape(), (2, 3, 4));
    assert_eq!(wind.modulus.shape(), (2, 3, 4));
    assert_eq!(wind.direction.shape(), (2, 3, 4));
}

#[test]
fn test_wind_direction_identity_on_unrotated_grid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wind.fst");
    let grid = regular_grid(3, 3);
    // U = 0, V = 1 knot: a southerly, coming from 180 degrees
    wind_file(&path, &grid, 0.0, 1.0);

    let field = extractor()
        .extract(&FieldQuery::variable("UV").from_file(&path))
        .unwrap();
    let wind = field.wind.as_ref().unwrap();
    for idx in 0..wind.direction.data.len() {
        let uuwe = f64::from(wind.uuwe.data[idx]);
        let vvsn = f64::from(wind.vvsn.data[idx]);
        let wd = f64::from(wind.direction.data[idx]);
        assert_approx_eq!(wd, uuwe.atan2(vvsn).to_degrees() + 180.0, 1e-3);
        assert_approx_eq!(wd, 180.0, 1e-2);
        assert_approx_eq!(vvsn, f64::from(KNOT_TO_MS), 1e-4);
        assert_approx_eq!(uuwe, 0.0, 1e-4);
    }
}

#[test]
fn test_wind_modulus_consistent_with_si_components() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wind.fst");
    let grid = rotated_grid(4, 3);
    wind_file(&path, &grid, 3.0, 4.0);

    let field = extractor()
        .extract(&FieldQuery::variable("UV").from_file(&path))
        .unwrap();
    let wind = field.wind.as_ref().unwrap();
    for idx in 0..wind.modulus.data.len() {
        // modulus keeps raw units; SI magnitude comes from the rotated pair
        assert_approx_eq!(wind.modulus.data[idx], 5.0, 1e-4);
        let si = (f64::from(wind.uuwe.data[idx]).powi(2)
            + f64::from(wind.vvsn.data[idx]).powi(2))
        .sqrt();
        assert_approx_eq!(f64::from(wind.modulus.data[idx]) * f64::from(KNOT_TO_MS), si, 1e-3);
    }
}

#[test]
fn test_composite_wind_with_mismatched_components_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wind.fst");
    let grid = regular_grid(4, 3);
    // VV is missing one level
    let records = vec![
        (
            record("UU", pressure_code(1000.0), &grid),
            constant_payload(4, 3, 1.0),
        ),
        (
            record("UU", pressure_code(500.0), &grid),
            constant_payload(4, 3, 1.0),
        ),
        (
            record("VV", pressure_code(1000.0), &grid),
            constant_payload(4, 3, 1.0),
        ),
    ];
    write_collection(&path, &records, &[grid], None);

    let err = extractor()
        .extract(&FieldQuery::variable("UV").from_file(&path))
        .unwrap_err();
    assert!(matches!(err, FstError::InconsistentGridShape { .. }));
}

#[test]
fn test_empty_variable_name_is_invalid() {
    let err = extractor()
        .extract(&FieldQuery::variable("").from_file("/tmp/x"))
        .unwrap_err();
    assert!(matches!(err, FstError::InvalidQuery(_)));
}
