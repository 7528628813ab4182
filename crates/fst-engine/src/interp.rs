//! Scoped orchestration of the external pressure-interpolation tool.
//!
//! One interpolate call owns one temporary workspace: surface pressure and
//! the vertical descriptor are staged into it, the tool runs as a blocking
//! subprocess against the source file, and the tool's output is re-ingested
//! into a fresh field restricted to the requested pressure levels. The
//! workspace is released on every exit path; removal failures on the
//! success path surface instead of leaking.

use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info};

use fst_access::{RecordCollection, RecordSink, RecordStore};
use fst_common::error::{FstError, FstResult};
use fst_common::level::{LevelCode, LevelKind};

use crate::assemble::{assemble, AssembleOptions, AssembledField};
use crate::locate::{locate, LocateSpec, SURFACE_PRESSURE};
use crate::resolve::resolve;

/// Interpolation scheme selector, encoded in the tool's variable argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationScheme {
    /// Cubic interpolation.
    #[default]
    Cubic,
    /// Cubic with negative values clipped.
    CubicClipped,
    /// Linear interpolation.
    Linear,
    /// No interpolation; surface and 2D variables only.
    NoInterpolation,
}

impl InterpolationScheme {
    /// Variable-argument prefix understood by the tool.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Cubic => "CUB_",
            Self::CubicClipped => "CUBP_",
            Self::Linear => "LIN_",
            Self::NoInterpolation => "NOI_",
        }
    }
}

/// External interpolation tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable to invoke.
    pub program: String,
    pub scheme: InterpolationScheme,
    /// Deadline for the subprocess; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "d.pxs2pxt".to_string(),
            scheme: InterpolationScheme::default(),
            timeout: None,
        }
    }
}

/// Interpolate `nomvar` from `source_path` onto the given pressure levels.
///
/// The result's level list is exactly `pressure_levels` in caller order —
/// never re-sorted, unlike regular assembly, since these levels are
/// caller-defined targets.
#[allow(clippy::too_many_arguments)]
pub fn interpolate<S: RecordStore>(
    store: &S,
    source_path: &Path,
    collection: &S::Collection,
    spec: &LocateSpec,
    nomvar: &str,
    pressure_levels: &[f64],
    tmp_dir: Option<&Path>,
    options: &AssembleOptions,
    tool: &ToolConfig,
) -> FstResult<AssembledField> {
    if pressure_levels.is_empty() {
        return Err(FstError::InvalidQuery(
            "pressure interpolation needs at least one target level".to_string(),
        ));
    }

    // surface pressure and the variable must live on the same grid
    let p0_spec = LocateSpec {
        nomvar: SURFACE_PRESSURE.to_string(),
        datev: spec.datev,
        ip1: None,
        ip2: None,
        ip3: None,
        typvar: spec.typvar.clone(),
        etiket: spec.etiket.clone(),
    };
    let p0_set = locate(collection, &p0_spec, SURFACE_PRESSURE)?;
    let var_set = locate(collection, spec, nomvar)?;
    if p0_set.reference.grid_id != var_set.reference.grid_id {
        return Err(FstError::InconsistentGridShape {
            expected: var_set.reference.shape(),
            got: p0_set.reference.shape(),
        });
    }

    let workspace = acquire_workspace(tmp_dir)?;
    let pxs_path = workspace.path().join("surface-pressure.fst");
    let out_path = workspace.path().join("interpolated.fst");

    // stage the tool inputs entirely inside the workspace
    let mut sink = store.create(&pxs_path)?;
    sink.write_record(
        &p0_set.reference,
        &collection.read_values(&p0_set.reference)?,
    )?;
    sink.write_grid(&collection.grid_descriptor(&p0_set.reference)?)?;
    sink.write_vertical(&collection.vertical_descriptor(&var_set.reference)?)?;
    sink.finish()?;

    let level_arg = pressure_levels
        .iter()
        .map(|level| format!("{:07.2}", level))
        .collect::<Vec<_>>()
        .join(",");
    let var_arg = format!("{}{}", tool.scheme.prefix(), nomvar);

    info!(
        program = %tool.program,
        nomvar,
        levels = %level_arg,
        "invoking pressure interpolation"
    );
    let mut command = Command::new(&tool.program);
    command
        .arg("-s")
        .arg(source_path)
        .arg("-datev")
        .arg(var_set.reference.datev.0.to_string())
        .arg("-d")
        .arg(&out_path)
        .arg("-pxs")
        .arg(&pxs_path)
        .arg("-plevs")
        .arg(&level_arg)
        .arg("-var")
        .arg(&var_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FstError::InterpolationToolFailed(format!(
                "{} not found; is the interpolation package loaded?",
                tool.program
            ))
        } else {
            FstError::InterpolationToolFailed(format!(
                "cannot spawn {}: {}",
                tool.program, e
            ))
        }
    })?;
    let output = wait_with_timeout(child, tool.timeout)?;
    if !output.status.success() {
        return Err(FstError::InterpolationToolFailed(format!(
            "{} exited with {}: {}",
            tool.program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    if !out_path.exists() {
        return Err(FstError::InterpolationToolFailed(format!(
            "{} produced no output file",
            tool.program
        )));
    }

    // re-ingest restricted to the target pressure codes, in caller order
    let codes: Vec<LevelCode> = pressure_levels
        .iter()
        .map(|&level| LevelCode::encode(level, LevelKind::PressureHpa))
        .collect();
    let out_spec = LocateSpec {
        nomvar: nomvar.to_string(),
        datev: Some(var_set.reference.datev),
        ip1: Some(codes),
        ip2: None,
        ip3: None,
        typvar: None,
        etiket: None,
    };
    let out_collection = store.open(&out_path)?;
    let out_set = locate(&out_collection, &out_spec, nomvar).map_err(|e| match e {
        FstError::NoMatchingRecord(msg) => FstError::InterpolationToolFailed(format!(
            "tool output is missing requested levels: {}",
            msg
        )),
        other => other,
    })?;
    let resolved = resolve(&out_collection, &out_set.reference)?;
    let field = assemble(
        &out_collection,
        &out_set,
        &resolved,
        &AssembleOptions {
            latlon: options.latlon,
            keep_order: true,
        },
    )?;
    debug!(nomvar, levels = field.levels.len(), "re-ingested interpolated field");

    workspace
        .close()
        .map_err(|e| FstError::workspace(format!("cannot remove workspace: {}", e)))?;
    Ok(field)
}

/// Create the scoped workspace under `tmp_dir` or the system default.
fn acquire_workspace(tmp_dir: Option<&Path>) -> FstResult<TempDir> {
    let base = match tmp_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::temp_dir(),
    };
    if !base.is_dir() {
        return Err(FstError::workspace(format!(
            "{} is not a usable temporary directory",
            base.display()
        )));
    }
    tempfile::Builder::new()
        .prefix("fst-interp-")
        .tempdir_in(&base)
        .map_err(|e| FstError::workspace(format!("cannot create workspace: {}", e)))
}

/// Block until the child exits or the deadline passes; on timeout the
/// child is killed and the call fails.
fn wait_with_timeout(mut child: Child, timeout: Option<Duration>) -> FstResult<Output> {
    let Some(limit) = timeout else {
        return child
            .wait_with_output()
            .map_err(|e| FstError::InterpolationToolFailed(e.to_string()));
    };
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                return child
                    .wait_with_output()
                    .map_err(|e| FstError::InterpolationToolFailed(e.to_string()));
            }
            Ok(None) => {
                if start.elapsed() >= limit {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(FstError::InterpolationTimeout(limit));
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => return Err(FstError::InterpolationToolFailed(e.to_string())),
        }
    }
}
