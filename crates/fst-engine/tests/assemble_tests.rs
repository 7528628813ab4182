//! Assembly behaviour: vertical ordering, Yin-Yang splitting and aliasing,
//! coordinate and pressure attachment.

use std::sync::Arc;

use fst_access::JsonStore;
use fst_common::error::FstError;
use fst_engine::{Extractor, FieldQuery};
use test_utils::{
    constant_payload, hybrid_code, hybrid_descriptor, level_tagged_payload, pressure_code,
    record, regular_grid, surface_code, write_collection, yin_yang_grid,
};

fn extractor() -> Extractor<JsonStore> {
    Extractor::new(JsonStore)
}

#[test]
fn test_levels_sorted_lowest_first_for_all_permutations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tt.fst");
    let grid = regular_grid(4, 3);
    let hpa = [800.0, 500.0, 200.0];
    let records: Vec<_> = hpa
        .iter()
        .map(|&p| {
            (
                record("TT", pressure_code(p), &grid),
                level_tagged_payload(4, 3, p as f32),
            )
        })
        .collect();
    write_collection(&path, &records, &[grid], None);

    let permutations: [[f64; 3]; 6] = [
        [800.0, 500.0, 200.0],
        [800.0, 200.0, 500.0],
        [500.0, 800.0, 200.0],
        [500.0, 200.0, 800.0],
        [200.0, 800.0, 500.0],
        [200.0, 500.0, 800.0],
    ];
    for perm in permutations {
        let query = FieldQuery::variable("TT")
            .from_file(&path)
            .at_levels(perm.iter().map(|&p| pressure_code(p)));
        let field = extractor().extract(&query).unwrap();
        // lowest level first: 800 hPa, then 500, then 200
        assert_eq!(field.level_values(), vec![800.0, 500.0, 200.0]);
        let values = field.values();
        assert_eq!(values.get(0, 0, 0), 800.0);
        assert_eq!(values.get(1, 0, 0), 500.0);
        assert_eq!(values.get(2, 0, 0), 200.0);
    }
}

#[test]
fn test_sibling_sweep_collects_all_levels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tt.fst");
    let grid = regular_grid(5, 4);
    let records: Vec<_> = [1000.0, 850.0, 700.0, 250.0]
        .iter()
        .map(|&p| {
            (
                record("TT", pressure_code(p), &grid),
                level_tagged_payload(5, 4, p as f32),
            )
        })
        .collect();
    write_collection(&path, &records, &[grid], None);

    let query = FieldQuery::variable("TT").from_file(&path);
    let field = extractor().extract(&query).unwrap();
    assert_eq!(field.shape(), (4, 4, 5));
    assert_eq!(field.level_values(), vec![1000.0, 850.0, 700.0, 250.0]);
}

#[test]
fn test_single_level_field_has_depth_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p0.fst");
    let grid = regular_grid(6, 5);
    write_collection(
        &path,
        &[(record("P0", surface_code(), &grid), constant_payload(6, 5, 1013.0))],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(&FieldQuery::variable("P0").from_file(&path))
        .unwrap();
    assert_eq!(field.shape(), (1, 5, 6));
    assert_eq!(field.values().get(0, 2, 3), 1013.0);
}

#[test]
fn test_latlon_attached_once_per_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tt.fst");
    let grid = regular_grid(4, 3);
    let records: Vec<_> = [850.0, 500.0]
        .iter()
        .map(|&p| (record("TT", pressure_code(p), &grid), constant_payload(4, 3, p as f32)))
        .collect();
    write_collection(&path, &records, &[grid], None);

    let field = extractor()
        .extract(&FieldQuery::variable("TT").from_file(&path).with_latlon())
        .unwrap();
    let lat = field.lat.as_ref().unwrap();
    let lon = field.lon.as_ref().unwrap();
    // horizontal geometry is level-invariant: one 2D plane regardless of nk
    assert_eq!(lat.len(), 12);
    assert_eq!(lon.len(), 12);
    assert!((lat[0] - 45.0).abs() < 1e-12);
    assert!((lon[0] + 75.0).abs() < 1e-12);
}

#[test]
fn test_yin_yang_split_shapes_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yy.fst");
    let grid = yin_yang_grid(4, 3); // combined rows = 6
    let mut payload = constant_payload(4, 3, 1.0);
    payload.extend(constant_payload(4, 3, 2.0));
    write_collection(
        &path,
        &[(record("P0", surface_code(), &grid), payload)],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(&FieldQuery::variable("P0").from_file(&path))
        .unwrap();
    let pair = field.yin_yang.as_ref().unwrap();
    assert_eq!(pair.yin.shape(), (1, 3, 4));
    assert_eq!(pair.yang.shape(), (1, 3, 4));
    assert!(pair.yin.values().data.iter().all(|&v| v == 1.0));
    assert!(pair.yang.values().data.iter().all(|&v| v == 2.0));
}

#[test]
fn test_yin_yang_default_view_aliases_yin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yy.fst");
    let grid = yin_yang_grid(4, 2);
    write_collection(
        &path,
        &[(record("P0", surface_code(), &grid), constant_payload(4, 4, 7.0))],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(&FieldQuery::variable("P0").from_file(&path))
        .unwrap();
    let pair = field.yin_yang.as_ref().unwrap();

    // identity, not equality
    assert!(Arc::ptr_eq(&field.values, &pair.yin.values));
    assert!(!Arc::ptr_eq(&field.values, &pair.yang.values));

    // mutation through the default view is observable through the panel
    field.values_mut().set(0, 1, 2, 42.0);
    assert_eq!(pair.yin.values().get(0, 1, 2), 42.0);
    assert_eq!(pair.yang.values().get(0, 1, 2), 7.0);
}

#[test]
fn test_yin_yang_odd_rows_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yy.fst");
    let mut grid = yin_yang_grid(4, 2);
    grid.nj = 5; // cannot split in half
    write_collection(
        &path,
        &[(record("P0", surface_code(), &grid), constant_payload(4, 5, 7.0))],
        &[grid],
        None,
    );

    let err = extractor()
        .extract(&FieldQuery::variable("P0").from_file(&path))
        .unwrap_err();
    assert!(matches!(err, FstError::MalformedYinYangGrid(_)));
}

#[test]
fn test_yin_yang_latlon_comes_from_panels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yy.fst");
    let grid = yin_yang_grid(3, 2);
    write_collection(
        &path,
        &[(record("P0", surface_code(), &grid), constant_payload(3, 4, 1.0))],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(&FieldQuery::variable("P0").from_file(&path).with_latlon())
        .unwrap();
    let pair = field.yin_yang.as_ref().unwrap();
    // each panel has its own coordinates; the default view aliases Yin's
    assert!(Arc::ptr_eq(field.lat.as_ref().unwrap(), pair.yin.lat.as_ref().unwrap()));
    let yin_lat = pair.yin.lat.as_ref().unwrap();
    let yang_lat = pair.yang.lat.as_ref().unwrap();
    assert_eq!(yin_lat.len(), 6);
    assert_eq!(yang_lat.len(), 6);
    assert!(yin_lat
        .iter()
        .zip(yang_lat.iter())
        .any(|(a, b)| (a - b).abs() > 1.0));
}

#[test]
fn test_pressure_from_hybrid_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hu.fst");
    let grid = regular_grid(3, 2);
    let low = hybrid_code(0.995);
    let high = hybrid_code(0.3);
    let descriptor = hybrid_descriptor(&[(low, 0.0, 0.995), (high, 5000.0, 0.3)]);
    write_collection(
        &path,
        &[
            (record("HU", low, &grid), constant_payload(3, 2, 0.01)),
            (record("HU", high, &grid), constant_payload(3, 2, 0.001)),
            (record("P0", surface_code(), &grid), constant_payload(3, 2, 1000.0)),
        ],
        &[grid],
        Some(&descriptor),
    );

    let field = extractor()
        .extract(&FieldQuery::variable("HU").from_file(&path).with_pressure())
        .unwrap();
    let pressure = field.pressure.as_ref().unwrap();
    assert_eq!(pressure.shape(), (2, 2, 3));
    // k = 0 is the lowest level (hybrid 0.995)
    assert!((pressure.get(0, 0, 0) - 995.0).abs() < 1e-3);
    assert!((pressure.get(1, 0, 0) - 350.0).abs() < 1e-3);
}

#[test]
fn test_pressure_on_pressure_levels_needs_no_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tt.fst");
    let grid = regular_grid(3, 2);
    let records: Vec<_> = [700.0, 300.0]
        .iter()
        .map(|&p| (record("TT", pressure_code(p), &grid), constant_payload(3, 2, 0.0)))
        .collect();
    // no vertical descriptor and no P0 in the file
    write_collection(&path, &records, &[grid], None);

    let field = extractor()
        .extract(&FieldQuery::variable("TT").from_file(&path).with_pressure())
        .unwrap();
    let pressure = field.pressure.as_ref().unwrap();
    assert_eq!(pressure.get(0, 1, 1), 700.0);
    assert_eq!(pressure.get(1, 1, 1), 300.0);
}

#[test]
fn test_yin_yang_pressure_splits_combined_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yy.fst");
    let grid = yin_yang_grid(3, 2); // combined rows = 4
    let code = hybrid_code(0.995);
    let descriptor = hybrid_descriptor(&[(code, 0.0, 0.995)]);
    // Yin panel sits at 1000 hPa surface pressure, Yang at 900
    let mut p0 = constant_payload(3, 2, 1000.0);
    p0.extend(constant_payload(3, 2, 900.0));
    write_collection(
        &path,
        &[
            (record("HU", code, &grid), constant_payload(3, 4, 0.01)),
            (record("P0", surface_code(), &grid), p0),
        ],
        &[grid],
        Some(&descriptor),
    );

    let field = extractor()
        .extract(&FieldQuery::variable("HU").from_file(&path).with_pressure())
        .unwrap();
    let pair = field.yin_yang.as_ref().unwrap();
    let yin_pressure = pair.yin.pressure.as_ref().unwrap();
    let yang_pressure = pair.yang.pressure.as_ref().unwrap();
    assert!((yin_pressure.get(0, 0, 0) - 995.0).abs() < 1e-3);
    assert!((yang_pressure.get(0, 0, 0) - 895.5).abs() < 1e-3);
    // the default view's pressure aliases the Yin panel's
    assert!(Arc::ptr_eq(
        field.pressure.as_ref().unwrap(),
        yin_pressure
    ));
}

#[test]
fn test_missing_variable_is_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p0.fst");
    let grid = regular_grid(3, 2);
    write_collection(
        &path,
        &[(record("P0", surface_code(), &grid), constant_payload(3, 2, 1000.0))],
        &[grid],
        None,
    );

    let err = extractor()
        .extract(&FieldQuery::variable("GZ").from_file(&path))
        .unwrap_err();
    assert!(matches!(err, FstError::NoMatchingRecord(_)));
}
