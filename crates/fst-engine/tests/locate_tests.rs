//! Record location: validity-time discrimination, ambiguity policy,
//! explicit level lists and directory discovery.

use fst_access::JsonStore;
use fst_common::error::FstError;
use fst_common::time::NativeStamp;
use fst_engine::{Extractor, FieldQuery};
use test_utils::{
    constant_payload, pressure_code, record_at, regular_grid, surface_code, write_collection,
    BASE_STAMP,
};

fn extractor() -> Extractor<JsonStore> {
    Extractor::new(JsonStore)
}

#[test]
fn test_validity_tolerance_excludes_far_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p0.fst");
    let grid = regular_grid(3, 2);
    let far = NativeStamp(BASE_STAMP.0 + 60); // 5 minutes away
    write_collection(
        &path,
        &[(
            record_at("P0", surface_code(), far, &grid),
            constant_payload(3, 2, 1000.0),
        )],
        &[grid],
        None,
    );

    let err = extractor()
        .extract(
            &FieldQuery::variable("P0")
                .from_file(&path)
                .valid_at_stamp(BASE_STAMP.0),
        )
        .unwrap_err();
    assert!(matches!(err, FstError::NoMatchingRecord(_)));
}

#[test]
fn test_closest_stamp_wins_inside_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p0.fst");
    let grid = regular_grid(3, 2);
    let near = NativeStamp(BASE_STAMP.0 + 2); // 10 s away
    let farther = NativeStamp(BASE_STAMP.0 - 4); // 20 s away
    write_collection(
        &path,
        &[
            (
                record_at("P0", surface_code(), farther, &grid),
                constant_payload(3, 2, 900.0),
            ),
            (
                record_at("P0", surface_code(), near, &grid),
                constant_payload(3, 2, 1000.0),
            ),
        ],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(
            &FieldQuery::variable("P0")
                .from_file(&path)
                .valid_at_stamp(BASE_STAMP.0),
        )
        .unwrap();
    assert_eq!(field.meta.datev, near);
    assert_eq!(field.values().get(0, 0, 0), 1000.0);
}

#[test]
fn test_boundary_records_do_not_both_match() {
    // two records 30 seconds apart around the requested instant: exactly
    // one ends up in the field
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p0.fst");
    let grid = regular_grid(3, 2);
    let exact = BASE_STAMP;
    let boundary = NativeStamp(BASE_STAMP.0 + 6); // 30 s later
    write_collection(
        &path,
        &[
            (
                record_at("P0", surface_code(), exact, &grid),
                constant_payload(3, 2, 1000.0),
            ),
            (
                record_at("P0", surface_code(), boundary, &grid),
                constant_payload(3, 2, 900.0),
            ),
        ],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(
            &FieldQuery::variable("P0")
                .from_file(&path)
                .valid_at_stamp(exact.0),
        )
        .unwrap();
    assert_eq!(field.shape(), (1, 2, 3));
    assert_eq!(field.meta.datev, exact);
    assert_eq!(field.values().get(0, 0, 0), 1000.0);
}

#[test]
fn test_equidistant_stamps_are_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p0.fst");
    let grid = regular_grid(3, 2);
    let before = NativeStamp(BASE_STAMP.0 - 3); // 15 s early
    let after = NativeStamp(BASE_STAMP.0 + 3); // 15 s late
    write_collection(
        &path,
        &[
            (
                record_at("P0", surface_code(), before, &grid),
                constant_payload(3, 2, 900.0),
            ),
            (
                record_at("P0", surface_code(), after, &grid),
                constant_payload(3, 2, 1000.0),
            ),
        ],
        &[grid],
        None,
    );

    let err = extractor()
        .extract(
            &FieldQuery::variable("P0")
                .from_file(&path)
                .valid_at_stamp(BASE_STAMP.0),
        )
        .unwrap_err();
    assert!(matches!(err, FstError::AmbiguousMatch(_)));
}

#[test]
fn test_explicit_level_list_with_missing_code_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tt.fst");
    let grid = regular_grid(3, 2);
    write_collection(
        &path,
        &[(
            record_at("TT", pressure_code(500.0), BASE_STAMP, &grid),
            constant_payload(3, 2, -5.0),
        )],
        &[grid],
        None,
    );

    let err = extractor()
        .extract(
            &FieldQuery::variable("TT")
                .from_file(&path)
                .at_levels([pressure_code(500.0), pressure_code(250.0)]),
        )
        .unwrap_err();
    assert!(matches!(err, FstError::NoMatchingRecord(_)));
}

#[test]
fn test_directory_discovery_finds_the_right_file() {
    let dir = tempfile::tempdir().unwrap();
    let grid = regular_grid(3, 2);

    // a foreign file passing the name filters must be skipped, not fatal
    std::fs::write(dir.path().join("2016081200_notes_0001"), "not a standard file").unwrap();

    write_collection(
        &dir.path().join("2016081200_006_0001"),
        &[(
            record_at("PR", surface_code(), BASE_STAMP, &grid),
            constant_payload(3, 2, 0.5),
        )],
        &[grid.clone()],
        None,
    );
    write_collection(
        &dir.path().join("2016081200_012_0001"),
        &[(
            record_at("PR", surface_code(), NativeStamp(BASE_STAMP.0 + 4320), &grid),
            constant_payload(3, 2, 1.5),
        )],
        &[grid],
        None,
    );

    let field = extractor()
        .extract(
            &FieldQuery::variable("PR")
                .from_dir(dir.path())
                .with_prefix("2016081200")
                .with_suffix("0001")
                .valid_at_stamp(BASE_STAMP.0),
        )
        .unwrap();
    assert_eq!(field.values().get(0, 0, 0), 0.5);
}

#[test]
fn test_directory_match_in_two_files_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let grid = regular_grid(3, 2);
    for name in ["a_0001", "b_0001"] {
        write_collection(
            &dir.path().join(name),
            &[(
                record_at("PR", surface_code(), BASE_STAMP, &grid),
                constant_payload(3, 2, 0.5),
            )],
            &[grid.clone()],
            None,
        );
    }

    let err = extractor()
        .extract(
            &FieldQuery::variable("PR")
                .from_dir(dir.path())
                .valid_at_stamp(BASE_STAMP.0),
        )
        .unwrap_err();
    assert!(matches!(err, FstError::AmbiguousMatch(_)));
}

#[test]
fn test_directory_without_candidates_is_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let err = extractor()
        .extract(
            &FieldQuery::variable("PR")
                .from_dir(dir.path())
                .with_prefix("nothing"),
        )
        .unwrap_err();
    assert!(matches!(err, FstError::NoMatchingRecord(_)));
}

#[test]
fn test_query_without_source_is_invalid() {
    let err = extractor()
        .extract(&FieldQuery::variable("PR"))
        .unwrap_err();
    assert!(matches!(err, FstError::InvalidQuery(_)));
}

#[test]
fn test_missing_file_is_no_match() {
    let err = extractor()
        .extract(&FieldQuery::variable("PR").from_file("/no/such/file.fst"))
        .unwrap_err();
    assert!(matches!(err, FstError::NoMatchingRecord(_)));
}
