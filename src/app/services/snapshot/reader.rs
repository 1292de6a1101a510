//! Snapshot reader
//!
//! Files are read in dependency order: stations and level/time ranges first,
//! then the values referring to them, then attributes. Saved slot ids are only
//! used to resolve references within the snapshot.

use super::{AttrRow, LevTrRow, SnapshotStats, StationRow, StationValueRow, ValueRow, decode_value};
use crate::app::models::var::Var;
use crate::app::models::{Coords, LevTr, Level, SlotId, Station, Trange};
use crate::app::services::memdb::Memdb;
use crate::constants::{DATETIME_FORMAT, SNAPSHOT_DELIMITER, snapshot_files};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Load the snapshot in `dir` into `db`
///
/// A missing directory or file counts as empty. Rows referring to a station,
/// level/time range or value absent from the snapshot are skipped with a
/// warning, or rejected when `strict` is set.
///
/// # Errors
/// * Returns `Error::CsvParsing` for unreadable or malformed files
/// * Returns `Error::Consistency` for dangling references when `strict` is set
/// * Returns the decoding error of an invalid coordinate, datetime or value
pub fn read_snapshot(dir: &Path, db: &mut Memdb, strict: bool) -> Result<SnapshotStats> {
    let mut stats = SnapshotStats::default();
    if !dir.exists() {
        info!(
            "Snapshot directory {} does not exist, starting empty",
            dir.display()
        );
        return Ok(stats);
    }
    let start_time = Instant::now();
    let skip = |message: String| -> Result<()> {
        if strict {
            return Err(Error::consistency(message));
        }
        warn!("Skipping snapshot row: {}", message);
        Ok(())
    };

    let mut stations: HashMap<SlotId, SlotId> = HashMap::new();
    for row in read_rows::<StationRow>(dir, snapshot_files::STATIONS)? {
        let station = Station {
            coords: Coords::new(row.lat, row.lon)?,
            mobile: row.mobile,
            ident: row.ident,
            report: row.report,
        };
        stations.insert(row.id, db.obtain_station(&station, true)?);
        stats.stations += 1;
    }

    let mut levtrs: HashMap<SlotId, SlotId> = HashMap::new();
    for row in read_rows::<LevTrRow>(dir, snapshot_files::LEVTRS)? {
        let levtr = LevTr::new(
            Level::new(row.ltype1, row.l1, row.ltype2, row.l2),
            Trange::new(row.pind, row.p1, row.p2),
        );
        levtrs.insert(row.id, db.obtain_levtr(&levtr, true)?);
        stats.levtrs += 1;
    }

    let mut station_values: HashMap<SlotId, SlotId> = HashMap::new();
    for row in read_rows::<StationValueRow>(dir, snapshot_files::STATION_VALUES)? {
        let Some(&station) = stations.get(&row.station) else {
            skip(format!(
                "station value {} refers to unknown station {}",
                row.id, row.station
            ))?;
            stats.skipped += 1;
            continue;
        };
        let value = decode_value(db.vartable(), row.code, row.value)?;
        let id = db.insert_station_value(station, Var::with_value(row.code, value), true)?;
        station_values.insert(row.id, id);
        stats.station_values += 1;
    }

    for row in read_rows::<AttrRow>(dir, snapshot_files::STATION_VALUE_ATTRS)? {
        let Some(&id) = station_values.get(&row.id) else {
            skip(format!("attribute {} refers to unknown station value {}", row.code, row.id))?;
            stats.skipped += 1;
            continue;
        };
        let attr = Var::with_value(row.code, decode_value(db.vartable(), row.code, row.value)?);
        db.set_station_value_attrs(id, vec![attr], false)?;
        stats.attributes += 1;
    }

    let mut values: HashMap<SlotId, SlotId> = HashMap::new();
    for row in read_rows::<ValueRow>(dir, snapshot_files::VALUES)? {
        let (Some(&station), Some(&levtr)) = (stations.get(&row.station), levtrs.get(&row.levtr))
        else {
            skip(format!(
                "value {} refers to unknown station {} or level/time range {}",
                row.id, row.station, row.levtr
            ))?;
            stats.skipped += 1;
            continue;
        };
        let datetime = NaiveDateTime::parse_from_str(&row.datetime, DATETIME_FORMAT).map_err(|e| {
            Error::datetime_parsing(format!("Invalid datetime '{}' for value {}", row.datetime, row.id), e)
        })?;
        let value = decode_value(db.vartable(), row.code, row.value)?;
        let id = db.insert_value(station, levtr, datetime, Var::with_value(row.code, value), true)?;
        values.insert(row.id, id);
        stats.values += 1;
    }

    for row in read_rows::<AttrRow>(dir, snapshot_files::VALUE_ATTRS)? {
        let Some(&id) = values.get(&row.id) else {
            skip(format!("attribute {} refers to unknown value {}", row.code, row.id))?;
            stats.skipped += 1;
            continue;
        };
        let attr = Var::with_value(row.code, decode_value(db.vartable(), row.code, row.value)?);
        db.set_value_attrs(id, vec![attr], false)?;
        stats.attributes += 1;
    }

    info!(
        "Loaded snapshot from {}: {} stations, {} levtrs, {} station values, {} values, {} attributes ({} rows skipped) in {:.2}s",
        dir.display(),
        stats.stations,
        stats.levtrs,
        stats.station_values,
        stats.values,
        stats.attributes,
        stats.skipped,
        start_time.elapsed().as_secs_f64()
    );
    Ok(stats)
}

/// Deserialize every row of one snapshot file; a missing file has no rows
fn read_rows<R: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<R>> {
    let path = dir.join(name);
    if !path.exists() {
        warn!("Snapshot file {} not found, treating as empty", path.display());
        return Ok(Vec::new());
    }
    let file_name = path.to_string_lossy().to_string();
    let mut reader = ReaderBuilder::new()
        .delimiter(SNAPSHOT_DELIMITER)
        .from_path(&path)
        .map_err(|e| Error::csv_parsing(&file_name, "Failed to open snapshot file", Some(e)))?;

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<R>, csv::Error>>()
        .map_err(|e| Error::csv_parsing(&file_name, "Malformed snapshot row", Some(e)))?;
    debug!("Read {} rows from {}", rows.len(), file_name);
    Ok(rows)
}
