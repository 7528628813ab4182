//! Query facade: one entry point composing location, assembly and the
//! geometric transforms.
//!
//! # Examples
//!
//! ```rust
//! use fst_engine::FieldQuery;
//!
//! // a 3D temperature field with coordinates attached
//! let query = FieldQuery::variable("TT")
//!     .from_file("/data/2016081200_006")
//!     .with_latlon();
//!
//! // search a directory for surface pressure at a validity time
//! let query = FieldQuery::variable("P0")
//!     .from_dir("/data/forecasts")
//!     .with_prefix("2016081200")
//!     .valid_at_stamp(230_000_000);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fst_access::RecordStore;
use fst_common::error::{FstError, FstResult};
use fst_common::level::LevelCode;
use fst_common::time::Validity;

use crate::assemble::{assemble, attach_pressure, AssembleOptions, AssembledField, WindFields};
use crate::interp::{interpolate, ToolConfig};
use crate::locate::{discover, locate, LocateSpec, WIND_SENTINEL, WIND_U, WIND_V};
use crate::resolve::resolve;
use crate::wind;

/// One field-extraction request.
///
/// `file_name` supersedes `dir_name` when both are set. The variable name
/// `"UV"` is the composite wind sentinel: it locates both components and
/// attaches the rotated geographic winds to the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldQuery {
    pub file_name: Option<PathBuf>,
    pub dir_name: Option<PathBuf>,
    pub prefix: String,
    pub suffix: String,
    pub var_name: String,
    pub datev: Option<Validity>,
    pub ip1: Option<Vec<LevelCode>>,
    pub ip2: Option<u32>,
    pub ip3: Option<u32>,
    pub typvar: Option<String>,
    pub etiket: Option<String>,
    pub latlon: bool,
    pub pressure_from_var: bool,
    pub pressure_levels: Option<Vec<f64>>,
    pub tmp_dir: Option<PathBuf>,
    pub tool: ToolConfig,
}

impl FieldQuery {
    /// Query for one variable (or the composite wind sentinel).
    pub fn variable(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
            ..Self::default()
        }
    }

    /// Read from a single file.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_name = Some(path.into());
        self
    }

    /// Search all standard files in a directory.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir_name = Some(path.into());
        self
    }

    /// Constrain directory search to file names with this prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Constrain directory search to file names with this suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Request a validity time (calendar timestamp or native code).
    pub fn valid_at(mut self, datev: impl Into<Validity>) -> Self {
        self.datev = Some(datev.into());
        self
    }

    /// Request a validity time as a native timestamp code.
    pub fn valid_at_stamp(mut self, code: i64) -> Self {
        self.datev = Some(Validity::from(code));
        self
    }

    /// Read exactly these level codes instead of sweeping all levels.
    pub fn at_levels(mut self, codes: impl IntoIterator<Item = LevelCode>) -> Self {
        self.ip1 = Some(codes.into_iter().collect());
        self
    }

    /// Restrict the second discriminator (typically the forecast hour).
    pub fn with_ip2(mut self, ip2: u32) -> Self {
        self.ip2 = Some(ip2);
        self
    }

    /// Restrict the third discriminator.
    pub fn with_ip3(mut self, ip3: u32) -> Self {
        self.ip3 = Some(ip3);
        self
    }

    /// Restrict the type-of-variable tag.
    pub fn with_typvar(mut self, typvar: impl Into<String>) -> Self {
        self.typvar = Some(typvar.into());
        self
    }

    /// Restrict the production label.
    pub fn with_etiket(mut self, etiket: impl Into<String>) -> Self {
        self.etiket = Some(etiket.into());
        self
    }

    /// Attach 2D latitude/longitude arrays.
    pub fn with_latlon(mut self) -> Self {
        self.latlon = true;
        self
    }

    /// Attach the 3D pressure array reconstructed from the vertical
    /// descriptor and surface pressure.
    pub fn with_pressure(mut self) -> Self {
        self.pressure_from_var = true;
        self
    }

    /// Interpolate onto these pressure levels [hPa] via the external tool.
    /// The result keeps exactly this level order.
    pub fn on_pressure_levels(mut self, levels: impl IntoIterator<Item = f64>) -> Self {
        self.pressure_levels = Some(levels.into_iter().collect());
        self
    }

    /// Override the interpolation workspace location.
    pub fn with_tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(path.into());
        self
    }

    /// Override the interpolation tool configuration.
    pub fn with_tool(mut self, tool: ToolConfig) -> Self {
        self.tool = tool;
        self
    }

    fn locate_spec(&self) -> LocateSpec {
        LocateSpec {
            nomvar: self.var_name.clone(),
            datev: self.datev.as_ref().map(|v| v.stamp()),
            ip1: self.ip1.clone(),
            ip2: self.ip2,
            ip3: self.ip3,
            typvar: self.typvar.clone(),
            etiket: self.etiket.clone(),
        }
    }

    fn is_composite(&self) -> bool {
        self.var_name == WIND_SENTINEL
    }
}

/// The extraction engine over one record store.
pub struct Extractor<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> Extractor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run one query to completion.
    ///
    /// Either a fully assembled field comes back or the call fails; levels
    /// and points are never silently truncated.
    pub fn extract(&self, query: &FieldQuery) -> FstResult<AssembledField> {
        if query.var_name.is_empty() {
            return Err(FstError::InvalidQuery(
                "var_name must name a variable, e.g. P0, UU, TT".to_string(),
            ));
        }
        let spec = query.locate_spec();
        let path = self.resolve_source(query, &spec)?;
        let collection = self.store.open(&path)?;
        let options = AssembleOptions {
            latlon: query.latlon,
            keep_order: false,
        };

        let mut field = if let Some(levels) = &query.pressure_levels {
            self.extract_interpolated(query, &spec, &path, &collection, levels, &options)?
        } else if query.is_composite() {
            let u = self.assemble_one(&collection, &spec, WIND_U, &options)?;
            let v = self.assemble_one(&collection, &spec, WIND_V, &options)?;
            attach_wind(u, v)?
        } else {
            self.assemble_one(&collection, &spec, &query.var_name, &options)?
        };

        if query.pressure_from_var {
            attach_pressure(&collection, &mut field)?;
        }
        debug!(var = %query.var_name, shape = ?field.shape(), "extraction complete");
        Ok(field)
    }

    /// Resolve the file to read: explicit path, or directory discovery.
    fn resolve_source(&self, query: &FieldQuery, spec: &LocateSpec) -> FstResult<PathBuf> {
        if let Some(file) = &query.file_name {
            if !file.is_file() {
                return Err(FstError::no_match(format!(
                    "{} does not exist",
                    file.display()
                )));
            }
            return Ok(file.clone());
        }
        let Some(dir) = &query.dir_name else {
            return Err(FstError::InvalidQuery(
                "provide one of file_name or dir_name".to_string(),
            ));
        };
        discover(
            &self.store,
            dir,
            &query.prefix,
            &query.suffix,
            spec,
            query.pressure_levels.is_some(),
        )
    }

    fn assemble_one(
        &self,
        collection: &S::Collection,
        spec: &LocateSpec,
        nomvar: &str,
        options: &AssembleOptions,
    ) -> FstResult<AssembledField> {
        let set = locate(collection, spec, nomvar)?;
        let grid = resolve(collection, &set.reference)?;
        assemble(collection, &set, &grid, options)
    }

    fn extract_interpolated(
        &self,
        query: &FieldQuery,
        spec: &LocateSpec,
        path: &Path,
        collection: &S::Collection,
        levels: &[f64],
        options: &AssembleOptions,
    ) -> FstResult<AssembledField> {
        if query.is_composite() {
            let u = interpolate(
                &self.store,
                path,
                collection,
                spec,
                WIND_U,
                levels,
                query.tmp_dir.as_deref(),
                options,
                &query.tool,
            )?;
            let v = interpolate(
                &self.store,
                path,
                collection,
                spec,
                WIND_V,
                levels,
                query.tmp_dir.as_deref(),
                options,
                &query.tool,
            )?;
            attach_wind(u, v)
        } else {
            interpolate(
                &self.store,
                path,
                collection,
                spec,
                &query.var_name,
                levels,
                query.tmp_dir.as_deref(),
                options,
                &query.tool,
            )
        }
    }
}

/// Rotate the component pair and attach raw plus derived winds to the
/// U-component carrier field.
fn attach_wind(u_field: AssembledField, v_field: AssembledField) -> FstResult<AssembledField> {
    if u_field.grid != v_field.grid {
        return Err(FstError::InconsistentGridShape {
            expected: u_field.grid.shape(),
            got: v_field.grid.shape(),
        });
    }
    if u_field.shape() != v_field.shape() {
        let (_, nj, ni) = u_field.shape();
        let (_, got_nj, got_ni) = v_field.shape();
        return Err(FstError::InconsistentGridShape {
            expected: (nj, ni),
            got: (got_nj, got_ni),
        });
    }

    // rotation happens on the default view; for combined grids that is the
    // Yin panel and its grid
    let view_grid = match &u_field.yin_yang {
        Some(pair) => pair.yin.grid.clone(),
        None => u_field.grid.clone(),
    };
    let (lat, lon) = match (&u_field.lat, &u_field.lon) {
        (Some(lat), Some(lon)) => (Arc::clone(lat), Arc::clone(lon)),
        _ => {
            let (lat, lon) = view_grid.latlon()?;
            (Arc::new(lat), Arc::new(lon))
        }
    };

    let rotated = {
        let u_values = u_field.values();
        let v_values = v_field.values();
        wind::rotate(&u_values, &v_values, &lat, &lon, view_grid.rotation())?
    };

    let mut field = u_field;
    field.wind = Some(Box::new(WindFields {
        uu: Arc::clone(&field.values),
        vv: Arc::clone(&v_field.values),
        uuwe: rotated.uuwe,
        vvsn: rotated.vvsn,
        modulus: rotated.modulus,
        direction: rotated.direction,
    }));
    Ok(field)
}
