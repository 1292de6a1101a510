//! Snapshot writer
//!
//! Every file is first written to a temporary file in the snapshot directory,
//! and the renames start only once all of them are complete. A failure while
//! writing leaves the previous snapshot untouched.
//!
//! Each rename replaces one file atomically, but the set as a whole is not:
//! if a rename fails partway, the files already renamed hold the new snapshot
//! and the rest still hold the old one.

use super::{AttrRow, LevTrRow, SnapshotStats, StationRow, StationValueRow, ValueRow, encode_value};
use crate::app::models::SlotId;
use crate::app::models::var::Var;
use crate::app::services::memdb::Memdb;
use crate::constants::{DATETIME_FORMAT, SNAPSHOT_DELIMITER, snapshot_files};
use crate::{Error, Result};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Write `db` to `dir`, creating the directory if needed
///
/// # Errors
/// * Returns `Error::Io` if the directory or a file cannot be created or renamed
/// * Returns `Error::CsvParsing` if a row cannot be serialized
pub fn write_snapshot(db: &Memdb, dir: &Path) -> Result<SnapshotStats> {
    let start_time = Instant::now();
    fs::create_dir_all(dir).map_err(|e| {
        Error::io(
            format!("Failed to create snapshot directory {}", dir.display()),
            e,
        )
    })?;

    let mut stats = SnapshotStats::default();
    let mut staged = Vec::with_capacity(snapshot_files::ALL.len());

    let (file, count) = stage(
        dir,
        snapshot_files::STATIONS,
        db.stations().iter().map(|(id, s)| StationRow {
            id,
            lat: s.coords.lat,
            lon: s.coords.lon,
            mobile: s.mobile,
            ident: s.ident.clone(),
            report: s.report.clone(),
        }),
    )?;
    stats.stations = count;
    staged.push((snapshot_files::STATIONS, file));

    let (file, count) = stage(
        dir,
        snapshot_files::LEVTRS,
        db.levtrs().iter().map(|(id, lt)| LevTrRow {
            id,
            ltype1: lt.level.ltype1,
            l1: lt.level.l1,
            ltype2: lt.level.ltype2,
            l2: lt.level.l2,
            pind: lt.trange.pind,
            p1: lt.trange.p1,
            p2: lt.trange.p2,
        }),
    )?;
    stats.levtrs = count;
    staged.push((snapshot_files::LEVTRS, file));

    let (file, count) = stage(
        dir,
        snapshot_files::STATION_VALUES,
        db.station_values().iter().map(|(id, sv)| StationValueRow {
            id,
            station: sv.station,
            code: sv.var.code(),
            value: encode_value(sv.var.value()),
        }),
    )?;
    stats.station_values = count;
    staged.push((snapshot_files::STATION_VALUES, file));

    let (file, count) = stage(
        dir,
        snapshot_files::STATION_VALUE_ATTRS,
        attr_rows(db.station_values().iter().map(|(id, sv)| (id, &sv.var))),
    )?;
    stats.attributes += count;
    staged.push((snapshot_files::STATION_VALUE_ATTRS, file));

    let (file, count) = stage(
        dir,
        snapshot_files::VALUES,
        db.values().iter().map(|(id, v)| ValueRow {
            id,
            station: v.station,
            levtr: v.levtr,
            datetime: v.datetime.format(DATETIME_FORMAT).to_string(),
            code: v.var.code(),
            value: encode_value(v.var.value()),
        }),
    )?;
    stats.values = count;
    staged.push((snapshot_files::VALUES, file));

    let (file, count) = stage(
        dir,
        snapshot_files::VALUE_ATTRS,
        attr_rows(db.values().iter().map(|(id, v)| (id, &v.var))),
    )?;
    stats.attributes += count;
    staged.push((snapshot_files::VALUE_ATTRS, file));

    for (name, file) in staged {
        let path = dir.join(name);
        file.persist(&path).map_err(|e| {
            Error::io(
                format!("Failed to replace snapshot file {}", path.display()),
                e.error,
            )
        })?;
    }

    info!(
        "Saved snapshot to {}: {} stations, {} levtrs, {} station values, {} values, {} attributes in {:.2}s",
        dir.display(),
        stats.stations,
        stats.levtrs,
        stats.station_values,
        stats.values,
        stats.attributes,
        start_time.elapsed().as_secs_f64()
    );
    Ok(stats)
}

fn attr_rows<'a>(vars: impl Iterator<Item = (SlotId, &'a Var)>) -> impl Iterator<Item = AttrRow> {
    vars.flat_map(|(id, var)| {
        var.attrs().iter().map(move |attr| AttrRow {
            id,
            code: attr.code(),
            value: encode_value(attr.value()),
        })
    })
}

/// Serialize `rows` into a temporary file next to their final location
fn stage<R: Serialize>(
    dir: &Path,
    name: &str,
    rows: impl IntoIterator<Item = R>,
) -> Result<(NamedTempFile, usize)> {
    let file = NamedTempFile::new_in(dir).map_err(|e| {
        Error::io(
            format!("Failed to create temporary file in {}", dir.display()),
            e,
        )
    })?;
    let mut writer = WriterBuilder::new()
        .delimiter(SNAPSHOT_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(file);

    let mut count = 0;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| Error::csv_parsing(name, "Failed to write snapshot row", Some(e)))?;
        count += 1;
    }
    let file = writer
        .into_inner()
        .map_err(|e| Error::io(format!("Failed to flush {}", name), e.into_error()))?;
    debug!("Staged {} rows for {}", count, name);
    Ok((file, count))
}
