//! Data models for memdb
//!
//! This module contains the identity types of the archive (coordinates, levels,
//! time ranges, stations), the stored entity types, and the [`Query`] structure
//! used to select them.

pub mod var;

use crate::constants::{COORD_SCALE, LAT_LIMIT, LON_MAX, LON_MIN, LON_PERIOD};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use var::{Var, Varcode};

/// Identifier of an arena slot
pub type SlotId = usize;

// =============================================================================
// Coordinates
// =============================================================================

/// Station position in fixed-point units of 1e-5 degrees
///
/// Longitude is normalised into `[-180, 180)` on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coords {
    pub lat: i32,
    pub lon: i32,
}

impl Coords {
    /// Build coordinates from fixed-point values
    pub fn new(lat: i32, lon: i32) -> Result<Self> {
        if !(-LAT_LIMIT..=LAT_LIMIT).contains(&lat) {
            return Err(Error::consistency(format!(
                "Invalid latitude {}: must be between -90 and 90 degrees",
                lat as f64 / COORD_SCALE
            )));
        }
        Ok(Self {
            lat,
            lon: normalise_lon(lon),
        })
    }

    /// Build coordinates from decimal degrees
    pub fn from_degrees(lat: f64, lon: f64) -> Result<Self> {
        check_finite("latitude", lat)?;
        check_finite("longitude", lon)?;
        Self::new(lat_to_int(lat), lon_to_int(lon))
    }

    pub fn dlat(&self) -> f64 {
        self.lat as f64 / COORD_SCALE
    }

    pub fn dlon(&self) -> f64 {
        self.lon as f64 / COORD_SCALE
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.dlat(), self.dlon())
    }
}

/// Reject NaN and infinite coordinates
pub fn check_finite(name: &str, degrees: f64) -> Result<()> {
    if degrees.is_finite() {
        Ok(())
    } else {
        Err(Error::consistency(format!("Invalid {}: {}", name, degrees)))
    }
}

/// Convert decimal degrees of latitude to fixed point
///
/// Values outside the `i32` range saturate.
pub fn lat_to_int(lat: f64) -> i32 {
    (lat * COORD_SCALE).round() as i32
}

/// Convert decimal degrees of longitude to normalised fixed point
///
/// Degrees are folded into one turn first, so any finite longitude maps into
/// `[-180, 180)`.
pub fn lon_to_int(lon: f64) -> i32 {
    normalise_lon((lon.rem_euclid(360.0) * COORD_SCALE).round() as i32)
}

/// Fold a fixed-point longitude into `[-180, 180)`
pub fn normalise_lon(lon: i32) -> i32 {
    if (LON_MIN..LON_MAX).contains(&lon) {
        return lon;
    }
    ((lon as i64 - LON_MIN as i64).rem_euclid(LON_PERIOD as i64) + LON_MIN as i64) as i32
}

// =============================================================================
// Level and time range
// =============================================================================

/// Vertical level: two layer types with their values, any of which may be missing
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Level {
    pub ltype1: Option<i32>,
    pub l1: Option<i32>,
    pub ltype2: Option<i32>,
    pub l2: Option<i32>,
}

impl Level {
    pub fn new(ltype1: Option<i32>, l1: Option<i32>, ltype2: Option<i32>, l2: Option<i32>) -> Self {
        Self {
            ltype1,
            l1,
            ltype2,
            l2,
        }
    }

    /// Single-layer level such as `(1, -, -, -)` for ground
    pub fn single(ltype1: i32, l1: Option<i32>) -> Self {
        Self::new(Some(ltype1), l1, None, None)
    }
}

/// Time range: statistical processing indicator and two periods
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Trange {
    pub pind: Option<i32>,
    pub p1: Option<i32>,
    pub p2: Option<i32>,
}

impl Trange {
    pub fn new(pind: Option<i32>, p1: Option<i32>, p2: Option<i32>) -> Self {
        Self { pind, p1, p2 }
    }

    /// Instantaneous value
    pub fn instant() -> Self {
        Self::new(Some(254), Some(0), Some(0))
    }
}

fn fmt_opt(f: &mut fmt::Formatter<'_>, value: Option<i32>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{}", v),
        None => f.write_str("-"),
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_opt(f, self.ltype1)?;
        f.write_str(",")?;
        fmt_opt(f, self.l1)?;
        f.write_str(",")?;
        fmt_opt(f, self.ltype2)?;
        f.write_str(",")?;
        fmt_opt(f, self.l2)
    }
}

impl fmt::Display for Trange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_opt(f, self.pind)?;
        f.write_str(",")?;
        fmt_opt(f, self.p1)?;
        f.write_str(",")?;
        fmt_opt(f, self.p2)
    }
}

// =============================================================================
// Stored entities
// =============================================================================

/// Observing station
///
/// Fixed stations have an empty identifier; mobile stations (ships, aircraft)
/// are told apart by their identifier rather than by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Station {
    pub coords: Coords,
    pub mobile: bool,
    pub ident: String,
    pub report: String,
}

impl Station {
    /// Create a fixed station
    pub fn fixed(coords: Coords, report: impl Into<String>) -> Self {
        Self {
            coords,
            mobile: false,
            ident: String::new(),
            report: report.into(),
        }
    }

    /// Create a mobile station with its identifier
    pub fn mobile(coords: Coords, ident: impl Into<String>, report: impl Into<String>) -> Self {
        Self {
            coords,
            mobile: true,
            ident: ident.into(),
            report: report.into(),
        }
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mobile {
            write!(f, "{} {} ({})", self.coords, self.ident, self.report)
        } else {
            write!(f, "{} fixed ({})", self.coords, self.report)
        }
    }
}

/// Level and time range pair shared by many values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevTr {
    pub level: Level,
    pub trange: Trange,
}

impl LevTr {
    pub fn new(level: Level, trange: Trange) -> Self {
        Self { level, trange }
    }
}

/// Station-level value such as station name or height
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationValue {
    pub station: SlotId,
    pub var: Var,
}

/// Observation value at a station, level/time range and instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub station: SlotId,
    pub levtr: SlotId,
    pub datetime: NaiveDateTime,
    pub var: Var,
}

// =============================================================================
// Query
// =============================================================================

/// Set of simple constraints selecting stations and values
///
/// Every field left at its default does not constrain the query. Coordinates
/// are in decimal degrees; longitude bounds must be given together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub ana_id: Option<SlotId>,
    pub latmin: Option<f64>,
    pub latmax: Option<f64>,
    pub lonmin: Option<f64>,
    pub lonmax: Option<f64>,
    pub mobile: Option<bool>,
    pub ident: Option<String>,
    pub report: Option<String>,
    pub varcodes: BTreeSet<Varcode>,
    pub datafilter: Option<String>,
    pub attrfilter: Option<String>,
    pub dtmin: Option<NaiveDateTime>,
    pub dtmax: Option<NaiveDateTime>,
    pub level: Option<Level>,
    pub trange: Option<Trange>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no station-selecting constraint is set
    pub fn selects_all_stations(&self) -> bool {
        self.ana_id.is_none()
            && self.latmin.is_none()
            && self.latmax.is_none()
            && self.lonmin.is_none()
            && self.lonmax.is_none()
            && self.mobile.is_none()
            && self.ident.is_none()
            && self.report.is_none()
    }

    /// True if no level/time range constraint is set
    pub fn selects_all_levtrs(&self) -> bool {
        self.level.is_none() && self.trange.is_none()
    }
}

// =============================================================================
// Query rows
// =============================================================================

/// One observation value resolved with its station and level/time range
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DataRow<'a> {
    pub id: SlotId,
    pub station_id: SlotId,
    pub station: &'a Station,
    pub levtr_id: SlotId,
    pub levtr: &'a LevTr,
    pub datetime: NaiveDateTime,
    pub var: &'a Var,
}

/// One station value resolved with its station
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StationDataRow<'a> {
    pub id: SlotId,
    pub station_id: SlotId,
    pub station: &'a Station,
    pub var: &'a Var,
}

/// Entity counts of a memdb
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub stations: usize,
    pub levtrs: usize,
    pub station_values: usize,
    pub values: usize,
    pub varcodes: BTreeSet<Varcode>,
}
