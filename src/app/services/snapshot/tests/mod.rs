//! Shared test utilities and fixtures for snapshot tests

use crate::app::models::var::{Var, Varcode};
use crate::app::models::{Coords, LevTr, Level, Station, Trange};
use crate::app::services::memdb::Memdb;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;


pub const TEMPERATURE: Varcode = Varcode::new(0, 12, 101);
pub const STATION_NAME: Varcode = Varcode::new(0, 1, 19);
pub const CONFIDENCE: Varcode = Varcode::new(0, 33, 7);

/// Database with awkward strings, missing level fields and attributes
pub fn create_test_db() -> Memdb {
    let mut db = Memdb::default();
    let station = Station::mobile(
        Coords::from_degrees(43.21, -8.4).unwrap(),
        "ship, \"A\"",
        "ship",
    );
    let fixed = Station::fixed(Coords::from_degrees(44.5, 11.3).unwrap(), "synop");
    let levtr = LevTr::new(Level::single(1, None), Trange::new(Some(254), Some(0), None));
    let datetime = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(6, 30, 0)
        .unwrap();

    let inserted = db
        .insert_data(
            &station,
            &levtr,
            datetime,
            vec![Var::int(TEMPERATURE, 28_815)],
            false,
            true,
        )
        .unwrap();
    db.set_value_attrs(inserted.values[0], vec![Var::int(CONFIDENCE, 70)], false)
        .unwrap();
    db.insert_data(
        &fixed,
        &levtr,
        datetime,
        vec![Var::new(TEMPERATURE)],
        false,
        true,
    )
    .unwrap();

    let (_, names) = db
        .insert_station_data(
            &station,
            vec![Var::string(STATION_NAME, "Line one\nline two, \"quoted\"")],
            false,
            true,
        )
        .unwrap();
    db.set_station_value_attrs(names[0], vec![Var::int(CONFIDENCE, 100)], false)
        .unwrap();
    db
}

/// Write raw snapshot file contents
pub fn write_file(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}
