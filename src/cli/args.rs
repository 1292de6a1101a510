//! Command-line argument definitions for memdb
//!
//! This module defines the CLI interface using the clap derive API. Query
//! options are shared by every command that selects data.

use crate::app::models::{Level, Query, SlotId, Trange};
use crate::app::models::var::Varcode;
use crate::constants::DATETIME_FORMAT;
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the memdb observation store
///
/// Loads the snapshot directory into memory, runs one command against it and,
/// for commands that change data, saves the snapshot back.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "memdb",
    version,
    about = "Query and maintain an in-memory archive of meteorological observations",
    long_about = "Loads a CSV snapshot of stations, level/time ranges and observation values \
                  into memory, answers queries by position, identity, variable code, date and \
                  level, and writes changes back atomically."
)]
pub struct Args {
    /// Snapshot directory (overrides config file and MEMDB_SNAPSHOT_DIR)
    #[arg(
        short = 'd',
        long = "dir",
        value_name = "PATH",
        global = true,
        help = "Snapshot directory"
    )]
    pub dir: Option<PathBuf>,

    /// JSON configuration file
    ///
    /// Defaults to memdb.json in the user configuration directory when present.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Configuration file (JSON)"
    )]
    pub config_file: Option<PathBuf>,

    /// Fail on snapshot rows referring to unknown stations or level/time ranges
    #[arg(long = "strict", global = true, help = "Reject dangling snapshot rows")]
    pub strict: bool,

    /// Output format for listings
    #[arg(
        long = "format",
        value_enum,
        default_value = "human",
        global = true,
        help = "Output format"
    )]
    pub format: OutputFormat,

    /// Enable verbose output (can be repeated for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v info, -vv debug, -vvv trace)"
    )]
    pub verbose: u8,

    /// Only report errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress all but error output"
    )]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Show entity counts and the variable codes in use
    Summary,
    /// List stations matching the query
    Stations(QueryArgs),
    /// List observation values matching the query
    Data(QueryArgs),
    /// List station values matching the query
    StationData(QueryArgs),
    /// Remove observation values matching the query and save the snapshot
    Remove(QueryArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// One JSON document per listing
    Json,
}

/// Query filters shared by the listing and removal commands
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct QueryArgs {
    /// Station slot id
    #[arg(long = "ana-id", value_name = "ID")]
    pub ana_id: Option<SlotId>,

    /// Minimum latitude in degrees
    #[arg(long = "latmin", value_name = "DEG", allow_hyphen_values = true)]
    pub latmin: Option<f64>,

    /// Maximum latitude in degrees
    #[arg(long = "latmax", value_name = "DEG", allow_hyphen_values = true)]
    pub latmax: Option<f64>,

    /// Western longitude bound in degrees
    ///
    /// A bound greater than --lonmax selects a range across the antimeridian.
    #[arg(long = "lonmin", value_name = "DEG", allow_hyphen_values = true)]
    pub lonmin: Option<f64>,

    /// Eastern longitude bound in degrees
    #[arg(long = "lonmax", value_name = "DEG", allow_hyphen_values = true)]
    pub lonmax: Option<f64>,

    /// Only mobile stations
    #[arg(long = "mobile", conflicts_with = "fixed")]
    pub mobile: bool,

    /// Only fixed stations
    #[arg(long = "fixed")]
    pub fixed: bool,

    /// Mobile station identifier; an empty string selects fixed stations
    #[arg(long = "ident", value_name = "IDENT")]
    pub ident: Option<String>,

    /// Report (network) name
    #[arg(long = "report", value_name = "NAME")]
    pub report: Option<String>,

    /// Variable code such as B12101 (repeatable)
    #[arg(long = "var", value_name = "CODE")]
    pub varcodes: Vec<Varcode>,

    /// Comparison on values, e.g. "B12101>=273.15"
    #[arg(long = "datafilter", value_name = "EXPR")]
    pub datafilter: Option<String>,

    /// Comparison on attributes, e.g. "B33007>50"
    #[arg(long = "attrfilter", value_name = "EXPR")]
    pub attrfilter: Option<String>,

    /// Earliest datetime, "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DD"
    #[arg(long = "dtmin", value_name = "DATETIME")]
    pub dtmin: Option<String>,

    /// Latest datetime; a bare date includes the whole day
    #[arg(long = "dtmax", value_name = "DATETIME")]
    pub dtmax: Option<String>,

    /// Level as "ltype1,l1,ltype2,l2" with "-" for missing fields
    #[arg(long = "level", value_name = "LEVEL")]
    pub level: Option<String>,

    /// Time range as "pind,p1,p2" with "-" for missing fields
    #[arg(long = "trange", value_name = "TRANGE")]
    pub trange: Option<String>,
}

impl Commands {
    /// Name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Summary => "summary",
            Commands::Stations(_) => "stations",
            Commands::Data(_) => "data",
            Commands::StationData(_) => "station-data",
            Commands::Remove(_) => "remove",
        }
    }
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// True when verbosity was requested on the command line
    pub fn log_level_overridden(&self) -> bool {
        self.quiet || self.verbose > 0
    }

    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(Error::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if let Some(dir) = &self.dir {
            if dir.exists() && !dir.is_dir() {
                return Err(Error::configuration(format!(
                    "Snapshot path is not a directory: {}",
                    dir.display()
                )));
            }
        }

        match &self.command {
            Some(Commands::Stations(query))
            | Some(Commands::Data(query))
            | Some(Commands::StationData(query))
            | Some(Commands::Remove(query)) => query.validate(),
            Some(Commands::Summary) | None => Ok(()),
        }
    }
}

impl QueryArgs {
    /// Validate bounds and formats without building the query
    pub fn validate(&self) -> Result<()> {
        for (name, value, limit) in [
            ("latmin", self.latmin, 90.0),
            ("latmax", self.latmax, 90.0),
            ("lonmin", self.lonmin, 360.0),
            ("lonmax", self.lonmax, 360.0),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value.abs() > limit {
                    return Err(Error::configuration(format!(
                        "--{} must be within [-{}, {}], got {}",
                        name, limit, limit, value
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.latmin, self.latmax) {
            if min > max {
                return Err(Error::configuration(
                    "--latmin must not exceed --latmax".to_string(),
                ));
            }
        }
        if self.lonmin.is_some() != self.lonmax.is_some() {
            return Err(Error::configuration(
                "--lonmin and --lonmax must be given together".to_string(),
            ));
        }

        let dtmin = self.dtmin.as_deref().map(|s| parse_datetime(s, false)).transpose()?;
        let dtmax = self.dtmax.as_deref().map(|s| parse_datetime(s, true)).transpose()?;
        if let (Some(min), Some(max)) = (dtmin, dtmax) {
            if min > max {
                return Err(Error::configuration(
                    "--dtmin must not be after --dtmax".to_string(),
                ));
            }
        }

        if let Some(level) = &self.level {
            parse_level(level)?;
        }
        if let Some(trange) = &self.trange {
            parse_trange(trange)?;
        }
        Ok(())
    }

    /// Build the library query
    ///
    /// Value and attribute filter expressions are passed through unparsed;
    /// they are checked against the variable table when the query runs.
    pub fn to_query(&self) -> Result<Query> {
        self.validate()?;
        Ok(Query {
            ana_id: self.ana_id,
            latmin: self.latmin,
            latmax: self.latmax,
            lonmin: self.lonmin,
            lonmax: self.lonmax,
            mobile: match (self.mobile, self.fixed) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            ident: self.ident.clone(),
            report: self.report.clone(),
            varcodes: self.varcodes.iter().copied().collect(),
            datafilter: self.datafilter.clone(),
            attrfilter: self.attrfilter.clone(),
            dtmin: self.dtmin.as_deref().map(|s| parse_datetime(s, false)).transpose()?,
            dtmax: self.dtmax.as_deref().map(|s| parse_datetime(s, true)).transpose()?,
            level: self.level.as_deref().map(parse_level).transpose()?,
            trange: self.trange.as_deref().map(parse_trange).transpose()?,
        })
    }
}

/// Parse a full datetime, or a bare date as the start (or end) of that day
pub fn parse_datetime(text: &str, end_of_day: bool) -> Result<NaiveDateTime> {
    let text = text.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT) {
        return Ok(datetime);
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| Error::datetime_parsing(format!("Invalid datetime '{}'", text), e))?;
    let datetime = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    datetime.ok_or_else(|| Error::configuration(format!("Invalid datetime '{}'", text)))
}

/// Parse "ltype1,l1,ltype2,l2"
pub fn parse_level(text: &str) -> Result<Level> {
    let [ltype1, l1, ltype2, l2] = parse_fields::<4>(text, "level")?;
    Ok(Level::new(ltype1, l1, ltype2, l2))
}

/// Parse "pind,p1,p2"
pub fn parse_trange(text: &str) -> Result<Trange> {
    let [pind, p1, p2] = parse_fields::<3>(text, "time range")?;
    Ok(Trange::new(pind, p1, p2))
}

fn parse_fields<const N: usize>(text: &str, what: &str) -> Result<[Option<i32>; N]> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(Error::parse(
            text,
            format!("{} needs {} comma-separated fields", what, N),
        ));
    }
    let mut fields = [None; N];
    for (field, part) in fields.iter_mut().zip(parts) {
        if part == "-" || part.is_empty() {
            continue;
        }
        *field = Some(
            part.parse()
                .map_err(|_| Error::parse(text, format!("invalid {} field '{}'", what, part)))?,
        );
    }
    Ok(fields)
}
