//! Shared test utilities and fixtures for memdb tests

use crate::app::models::var::{Var, Varcode};
use crate::app::models::{Coords, LevTr, Level, Station, Trange};
use crate::app::services::memdb::Memdb;
use chrono::{NaiveDate, NaiveDateTime};

pub mod memdb_tests;
pub mod value_tests;

pub const TEMPERATURE: Varcode = Varcode::new(0, 12, 101);
pub const HUMIDITY: Varcode = Varcode::new(0, 13, 3);
pub const STATION_NAME: Varcode = Varcode::new(0, 1, 19);
pub const HEIGHT: Varcode = Varcode::new(0, 7, 30);
pub const CONFIDENCE: Varcode = Varcode::new(0, 33, 7);

/// Create a fixed station at the given position
pub fn create_test_station(lat: f64, lon: f64, report: &str) -> Station {
    Station::fixed(Coords::from_degrees(lat, lon).unwrap(), report)
}

/// Create a mobile station at the given position
pub fn create_mobile_station(lat: f64, lon: f64, ident: &str, report: &str) -> Station {
    Station::mobile(Coords::from_degrees(lat, lon).unwrap(), ident, report)
}

/// Surface level with an instantaneous time range
pub fn surface_levtr() -> LevTr {
    LevTr::new(Level::single(1, None), Trange::instant())
}

/// Two metres above ground with an instantaneous time range
pub fn screen_levtr() -> LevTr {
    LevTr::new(Level::single(103, Some(2000)), Trange::instant())
}

pub fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

pub fn temperature(raw: i32) -> Var {
    Var::int(TEMPERATURE, raw)
}

/// Three synop stations on the 11E meridian with a temperature each,
/// plus one metar station
pub fn create_test_db() -> Memdb {
    let mut db = Memdb::default();
    for (i, lat) in [40.0, 41.0, 42.0].into_iter().enumerate() {
        db.insert_data(
            &create_test_station(lat, 11.0, "synop"),
            &screen_levtr(),
            datetime(2024, 1, 1, 12),
            vec![temperature(27_000 + i as i32 * 100)],
            false,
            true,
        )
        .unwrap();
    }
    db.insert_data(
        &create_test_station(44.5, 11.3, "metar"),
        &screen_levtr(),
        datetime(2024, 1, 2, 0),
        vec![temperature(28_000), Var::int(HUMIDITY, 80)],
        false,
        true,
    )
    .unwrap();
    db
}
