//! Field-extraction CLI.
//!
//! Runs one query against a standard file (or a directory of them) and
//! prints a JSON summary of the assembled field. With `--output` the
//! assembled levels are also written back out as a collection.

mod summary;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fst_access::JsonStore;
use fst_common::level::LevelCode;
use fst_common::time::Validity;
use fst_engine::{Extractor, FieldQuery, InterpolationScheme, ToolConfig};

#[derive(Parser, Debug)]
#[command(name = "fst-extract")]
#[command(about = "Extract and transform fields from standard files")]
struct Args {
    /// Source file (supersedes --dir)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Directory of standard files to search
    #[arg(long)]
    dir: Option<PathBuf>,

    /// File-name prefix filter for --dir
    #[arg(long, default_value = "")]
    prefix: String,

    /// File-name suffix filter for --dir
    #[arg(long, default_value = "")]
    suffix: String,

    /// Variable name (UV selects the composite wind pair)
    #[arg(short, long)]
    var: String,

    /// Validity time: RFC 3339 timestamp or native stamp code
    #[arg(long)]
    datev: Option<String>,

    /// Explicit level codes (repeatable)
    #[arg(long = "ip1")]
    ip1: Vec<u32>,

    /// Attach 2D latitude/longitude arrays
    #[arg(long)]
    latlon: bool,

    /// Attach the reconstructed 3D pressure array
    #[arg(long)]
    pressure_from_var: bool,

    /// Interpolate onto these pressure levels [hPa], comma separated
    #[arg(long, value_delimiter = ',')]
    pres_levels: Vec<f64>,

    /// Workspace directory for interpolation scratch files
    #[arg(long, env = "FST_TMP_DIR")]
    tmp_dir: Option<PathBuf>,

    /// Interpolation tool executable
    #[arg(long, env = "FST_INTERP_TOOL", default_value = "d.pxs2pxt")]
    tool: String,

    /// Interpolation scheme: cubic, cubic-clipped, linear, none
    #[arg(long, default_value = "cubic")]
    scheme: String,

    /// Interpolation tool deadline in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the assembled field to this path as a collection
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let query = build_query(&args)?;
    info!(var = %args.var, "running extraction");

    let extractor = Extractor::new(JsonStore);
    let field = extractor
        .extract(&query)
        .with_context(|| format!("extraction of {} failed", args.var))?;

    let report = summary::FieldSummary::from_field(&field);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(output) = &args.output {
        summary::write_field(&JsonStore, output, &field)
            .with_context(|| format!("cannot write {}", output.display()))?;
        info!(path = %output.display(), "wrote assembled field");
    }
    Ok(())
}

fn build_query(args: &Args) -> Result<FieldQuery> {
    let mut query = FieldQuery::variable(&args.var);
    if let Some(file) = &args.file {
        query = query.from_file(file);
    }
    if let Some(dir) = &args.dir {
        query = query
            .from_dir(dir)
            .with_prefix(&args.prefix)
            .with_suffix(&args.suffix);
    }
    if let Some(datev) = &args.datev {
        query = query.valid_at(parse_validity(datev)?);
    }
    if !args.ip1.is_empty() {
        query = query.at_levels(args.ip1.iter().map(|&code| LevelCode(code)));
    }
    if args.latlon {
        query = query.with_latlon();
    }
    if args.pressure_from_var {
        query = query.with_pressure();
    }
    if !args.pres_levels.is_empty() {
        query = query.on_pressure_levels(args.pres_levels.iter().copied());
    }
    if let Some(tmp_dir) = &args.tmp_dir {
        query = query.with_tmp_dir(tmp_dir);
    }
    let scheme = match args.scheme.to_lowercase().as_str() {
        "cubic" => InterpolationScheme::Cubic,
        "cubic-clipped" => InterpolationScheme::CubicClipped,
        "linear" => InterpolationScheme::Linear,
        "none" => InterpolationScheme::NoInterpolation,
        other => bail!("unknown interpolation scheme: {}", other),
    };
    query = query.with_tool(ToolConfig {
        program: args.tool.clone(),
        scheme,
        timeout: args.timeout_secs.map(std::time::Duration::from_secs),
    });
    Ok(query)
}

/// Parse a validity argument: native stamp code first, then RFC 3339,
/// then a bare `YYYY-mm-ddTHH:MM:SS` assumed UTC.
fn parse_validity(s: &str) -> Result<Validity> {
    if let Ok(code) = s.parse::<i64>() {
        return Ok(Validity::from(code));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Validity::from(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Validity::from(Utc.from_utc_datetime(&naive)));
    }
    bail!("cannot parse validity time: {}", s)
}
