//! Record location: single-file search, directory discovery, composite
//! wind resolution.
//!
//! A locate call finds the records of one variable that belong together:
//! a reference record first, then either its level siblings (same
//! metadata, any level) or exactly the levels the caller listed. The
//! closest validity stamp inside the tolerance window wins; an exact tie
//! between two distinct stamps is ambiguous rather than silently picked.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use fst_access::{RecordCollection, RecordMetadata, RecordQuery, RecordStore};
use fst_common::error::{FstError, FstResult};
use fst_common::level::LevelCode;
use fst_common::time::NativeStamp;

/// Composite variable sentinel resolving to the two wind components.
pub const WIND_SENTINEL: &str = "UV";
/// Zonal model-relative wind component.
pub const WIND_U: &str = "UU";
/// Meridional model-relative wind component.
pub const WIND_V: &str = "VV";
/// Surface pressure, required for vertical interpolation.
pub const SURFACE_PRESSURE: &str = "P0";

/// Criteria one locate call works from.
#[derive(Debug, Clone, Default)]
pub struct LocateSpec {
    pub nomvar: String,
    pub datev: Option<NativeStamp>,
    pub ip1: Option<Vec<LevelCode>>,
    pub ip2: Option<u32>,
    pub ip3: Option<u32>,
    pub typvar: Option<String>,
    pub etiket: Option<String>,
}

impl LocateSpec {
    /// Constituent variable names this spec resolves to: the composite
    /// wind sentinel expands to both components, anything else to itself.
    pub fn variables(&self) -> Vec<&str> {
        if self.nomvar == WIND_SENTINEL {
            vec![WIND_U, WIND_V]
        } else {
            vec![self.nomvar.as_str()]
        }
    }

    fn base_query(&self, nomvar: &str) -> RecordQuery {
        let mut query = RecordQuery::variable(nomvar);
        query.datev = self.datev;
        query.ip2 = self.ip2;
        query.ip3 = self.ip3;
        query.typvar = self.typvar.clone();
        query.etiket = self.etiket.clone();
        query
    }
}

/// The records of one variable that assemble into a single field.
#[derive(Debug, Clone)]
pub struct LocatedSet {
    /// First matching record; its metadata represents the field.
    pub reference: RecordMetadata,
    /// All records of the set, in request order (explicit levels) or file
    /// order (sibling sweep). Level codes are unique.
    pub records: Vec<RecordMetadata>,
}

/// Pick the reference record among tolerance-window matches.
///
/// Closest requested-validity distance wins; two distinct stamps at the
/// same distance are ambiguous. Without a requested validity the first
/// record in file order is the reference.
fn pick_reference(
    matches: Vec<RecordMetadata>,
    requested: Option<NativeStamp>,
) -> FstResult<Option<RecordMetadata>> {
    let Some(requested) = requested else {
        return Ok(matches.into_iter().next());
    };
    let Some(best) = matches
        .iter()
        .min_by_key(|m| m.datev.distance_secs(requested))
    else {
        return Ok(None);
    };
    let best_distance = best.datev.distance_secs(requested);
    let tied: Vec<NativeStamp> = matches
        .iter()
        .filter(|m| m.datev.distance_secs(requested) == best_distance)
        .map(|m| m.datev)
        .collect();
    if tied.iter().any(|s| *s != tied[0]) {
        return Err(FstError::ambiguous(format!(
            "two validity stamps at {} s from the requested time: {} and {}",
            best_distance,
            tied[0].0,
            tied.iter().find(|s| **s != tied[0]).map(|s| s.0).unwrap_or_default()
        )));
    }
    let best = best.clone();
    Ok(Some(best))
}

/// Locate one variable in an open collection, or `None` when absent.
pub fn try_locate<C: RecordCollection>(
    collection: &C,
    spec: &LocateSpec,
    nomvar: &str,
) -> FstResult<Option<LocatedSet>> {
    let base = spec.base_query(nomvar);

    // reference search: with an explicit level list the first listed code
    // that exists anchors the set
    let reference = match &spec.ip1 {
        Some(codes) => {
            let mut found = None;
            for code in codes {
                let matches = collection.find(&base.clone().at_level(*code))?;
                if let Some(reference) = pick_reference(matches, spec.datev)? {
                    found = Some(reference);
                    break;
                }
            }
            found
        }
        None => pick_reference(collection.find(&base)?, spec.datev)?,
    };
    let Some(reference) = reference else {
        return Ok(None);
    };

    let records = match &spec.ip1 {
        Some(codes) => {
            // exactly the listed levels, joined on the reference metadata
            let mut records = Vec::with_capacity(codes.len());
            for code in codes {
                let query = RecordQuery::siblings_of(&reference).at_level(*code);
                let found = collection.find(&query)?;
                let record = found
                    .into_iter()
                    .find(|m| m.datev == reference.datev)
                    .ok_or_else(|| {
                        FstError::no_match(format!(
                            "no {} record with level code {}",
                            nomvar, code.0
                        ))
                    })?;
                records.push(record);
            }
            records
        }
        None => {
            // sibling sweep: same metadata, any level, exact stamp
            let mut records = Vec::new();
            let mut seen = Vec::new();
            for record in collection.find(&RecordQuery::siblings_of(&reference))? {
                if record.datev != reference.datev {
                    continue;
                }
                if seen.contains(&record.ip1) {
                    warn!(
                        nomvar,
                        ip1 = record.ip1.0,
                        "duplicate level code in collection; keeping the first entry"
                    );
                    continue;
                }
                seen.push(record.ip1);
                records.push(record);
            }
            records
        }
    };

    debug!(nomvar, levels = records.len(), "located record set");
    Ok(Some(LocatedSet { reference, records }))
}

/// Locate one variable in an open collection, failing when absent.
pub fn locate<C: RecordCollection>(
    collection: &C,
    spec: &LocateSpec,
    nomvar: &str,
) -> FstResult<LocatedSet> {
    try_locate(collection, spec, nomvar)?.ok_or_else(|| {
        FstError::no_match(format!(
            "no {} record satisfies the search criteria",
            nomvar
        ))
    })
}

/// Files in `dir` whose names carry the given prefix and suffix, sorted.
fn candidate_files(dir: &Path, prefix: &str, suffix: &str) -> FstResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FstError::InvalidQuery(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with(prefix) && name.ends_with(suffix)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(FstError::no_match(format!(
            "no files matching {}/{}*{}",
            dir.display(),
            prefix,
            suffix
        )));
    }
    Ok(files)
}

/// Search a directory for the one file containing the requested records.
///
/// Non-standard files are skipped. A file qualifies when every constituent
/// variable of the spec is present — plus the surface-pressure field when
/// the caller needs interpolation inputs. Matches in two distinct files
/// are ambiguous; different files never merge.
pub fn discover<S: RecordStore>(
    store: &S,
    dir: &Path,
    prefix: &str,
    suffix: &str,
    spec: &LocateSpec,
    need_surface_pressure: bool,
) -> FstResult<PathBuf> {
    let mut matched: Option<PathBuf> = None;
    for path in candidate_files(dir, prefix, suffix)? {
        if !store.is_standard_file(&path) {
            debug!(path = %path.display(), "skipping non-standard file");
            continue;
        }
        let collection = store.open(&path)?;
        let mut satisfied = true;
        if need_surface_pressure {
            let p0_spec = LocateSpec {
                nomvar: SURFACE_PRESSURE.to_string(),
                datev: spec.datev,
                ip1: None,
                ip2: None,
                ip3: None,
                typvar: spec.typvar.clone(),
                etiket: spec.etiket.clone(),
            };
            satisfied = try_locate(&collection, &p0_spec, SURFACE_PRESSURE)?.is_some();
        }
        for nomvar in spec.variables() {
            if !satisfied {
                break;
            }
            satisfied = try_locate(&collection, spec, nomvar)?.is_some();
        }
        if satisfied {
            if let Some(first) = &matched {
                return Err(FstError::ambiguous(format!(
                    "search criteria matched in two files: {} and {}",
                    first.display(),
                    path.display()
                )));
            }
            matched = Some(path);
        }
    }
    matched.ok_or_else(|| {
        FstError::no_match(format!(
            "no file under {} contains {} at the requested time",
            dir.display(),
            spec.nomvar
        ))
    })
}
