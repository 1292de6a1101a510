//! Command implementations for the memdb CLI
//!
//! This module loads configuration and the snapshot, runs one command against
//! the in-memory database and reports the result.

use crate::app::models::var::Var;
use crate::app::services::memdb::Memdb;
use crate::app::services::snapshot::{Snapshot, SnapshotStats};
use crate::app::services::vartable::BufrTable;
use crate::cli::args::{Args, Commands, OutputFormat, QueryArgs};
use crate::config::Config;
use crate::{Error, Result};
use colored::*;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of one command run
#[derive(Debug, Clone, Default)]
pub struct CommandStats {
    /// Rows read from the snapshot
    pub loaded: SnapshotStats,
    /// Entities listed or selected for removal
    pub matched: usize,
    /// Values removed
    pub removed: usize,
    /// Rows written back, when the command changed data
    pub saved: Option<SnapshotStats>,
    /// Total run time
    pub elapsed: Duration,
}

/// Main command runner
///
/// 1. Validate arguments and load layered configuration
/// 2. Set up logging
/// 3. Load the snapshot and run the command, writing to stdout
pub fn run(args: Args) -> Result<CommandStats> {
    let start_time = Instant::now();

    args.validate()?;
    let config = load_configuration(&args)?;
    setup_logging(&config.log_level, args.quiet)?;

    info!("Starting memdb");
    debug!("Command line arguments: {:?}", args);
    debug!("Loaded configuration: {:?}", config);

    let command = args
        .command
        .clone()
        .ok_or_else(|| Error::configuration("No command given"))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut stats = execute(&command, &config, args.format, &mut out)?;
    stats.elapsed = start_time.elapsed();

    info!(
        "Finished in {:.2}s: {} matched, {} removed",
        stats.elapsed.as_secs_f64(),
        stats.matched,
        stats.removed
    );
    Ok(stats)
}

/// Run `command` against the snapshot named by `config`
pub fn execute(
    command: &Commands,
    config: &Config,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<CommandStats> {
    let snapshot = Snapshot::new(&config.snapshot_dir).strict(config.strict_load);
    let (mut db, loaded) = snapshot.load(Arc::new(BufrTable::standard()))?;
    let mut stats = CommandStats {
        loaded,
        ..Default::default()
    };

    match command {
        Commands::Summary => report_summary(&db, config, format, out)?,
        Commands::Stations(query) => stats.matched = list_stations(&db, query, format, out)?,
        Commands::Data(query) => stats.matched = list_data(&db, query, format, out)?,
        Commands::StationData(query) => {
            stats.matched = list_station_data(&db, query, format, out)?
        }
        Commands::Remove(query) => {
            let removed = db.remove_data(&query.to_query()?)?;
            stats.matched = removed;
            stats.removed = removed;
            if removed > 0 {
                stats.saved = Some(snapshot.save(&db)?);
            } else {
                debug!("Nothing removed, snapshot left untouched");
            }
            report_removed(removed, format, out)?;
        }
    }
    out.flush()?;
    Ok(stats)
}

/// Set up structured logging
///
/// `RUST_LOG` takes precedence over `log_level`.
fn setup_logging(log_level: &str, quiet: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("memdb={}", log_level)));

    let result = if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.map_err(|e| Error::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> env -> args)
fn load_configuration(args: &Args) -> Result<Config> {
    let mut config = Config::load_layered(args.config_file.as_deref())?;
    apply_cli_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if let Some(dir) = &args.dir {
        config.snapshot_dir = dir.clone();
    }
    if args.strict {
        config.strict_load = true;
    }
    if args.log_level_overridden() {
        config.log_level = args.get_log_level().to_string();
    }
}

// =============================================================================
// Reporting
// =============================================================================

fn report_summary(
    db: &Memdb,
    config: &Config,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let summary = db.summary();
    match format {
        OutputFormat::Human => {
            writeln!(out, "{}", "memdb summary".bright_green().bold())?;
            writeln!(out, "  Snapshot:          {}", config.snapshot_dir.display())?;
            writeln!(out, "  Stations:          {}", summary.stations)?;
            writeln!(out, "  Level/time ranges: {}", summary.levtrs)?;
            writeln!(out, "  Station values:    {}", summary.station_values)?;
            writeln!(out, "  Values:            {}", summary.values)?;
            let codes: Vec<String> = summary.varcodes.iter().map(|c| c.to_string()).collect();
            writeln!(out, "  Variables:         {}", codes.join(" "))?;
        }
        OutputFormat::Json => write_json(
            out,
            &serde_json::json!({
                "snapshot_dir": config.snapshot_dir,
                "summary": summary,
            }),
        )?,
    }
    Ok(())
}

fn list_stations(
    db: &Memdb,
    args: &QueryArgs,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<usize> {
    let results = db.query_stations(&args.to_query()?)?;
    let stations: Vec<_> = results.iter().collect();
    match format {
        OutputFormat::Human => {
            for (id, station) in &stations {
                writeln!(out, "{:>6}  {}", id, station)?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = stations
                .iter()
                .map(|(id, station)| serde_json::json!({ "id": id, "station": station }))
                .collect();
            write_json(out, &rows)?;
        }
    }
    Ok(stations.len())
}

fn list_data(
    db: &Memdb,
    args: &QueryArgs,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<usize> {
    let rows = db.query_data(&args.to_query()?)?;
    match format {
        OutputFormat::Human => {
            for row in &rows {
                writeln!(
                    out,
                    "{:>6}  {}  {} {}  {}  {}",
                    row.id,
                    row.station,
                    row.levtr.level,
                    row.levtr.trange,
                    row.datetime,
                    format_var(db, row.var)
                )?;
            }
        }
        OutputFormat::Json => write_json(out, &rows)?,
    }
    Ok(rows.len())
}

fn list_station_data(
    db: &Memdb,
    args: &QueryArgs,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<usize> {
    let rows = db.query_station_data(&args.to_query()?)?;
    match format {
        OutputFormat::Human => {
            for row in &rows {
                writeln!(out, "{:>6}  {}  {}", row.id, row.station, format_var(db, row.var))?;
            }
        }
        OutputFormat::Json => write_json(out, &rows)?,
    }
    Ok(rows.len())
}

fn report_removed(removed: usize, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Human => {
            if removed == 0 {
                writeln!(out, "No values matched")?;
            } else {
                writeln!(
                    out,
                    "Removed {} values",
                    removed.to_string().bright_white().bold()
                )?;
            }
        }
        OutputFormat::Json => write_json(out, &serde_json::json!({ "removed": removed }))?,
    }
    Ok(())
}

/// Render a variable with decoded value and attributes
fn format_var(db: &Memdb, var: &Var) -> String {
    let value = |v: &Var| match (v.value(), db.vartable().query(v.code())) {
        (None, _) => "-".to_string(),
        (Some(value), Ok(info)) => info.format_value(value),
        (Some(value), Err(_)) => value.to_string(),
    };
    let mut text = format!("{}={}", var.code(), value(var));
    if !var.attrs().is_empty() {
        let attrs: Vec<String> = var
            .attrs()
            .iter()
            .map(|a| format!("{}={}", a.code(), value(a)))
            .collect();
        text.push_str(&format!(" [{}]", attrs.join(" ")));
    }
    text
}

fn write_json<T: serde::Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::configuration(format!("Failed to encode JSON output: {}", e)))?;
    writeln!(out, "{}", json)?;
    Ok(())
}
