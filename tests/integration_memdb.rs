//! Integration tests for the memdb public API
//!
//! These tests build a small archive of fixed and mobile stations, query it
//! through the library surface and round-trip it through a CSV snapshot.

use chrono::{NaiveDate, NaiveDateTime};
use memdb::app::services::snapshot::Snapshot;
use memdb::{BufrTable, Coords, LevTr, Level, Memdb, Query, Station, Trange, Var, Varcode};
use std::sync::Arc;
use tempfile::TempDir;

const TEMPERATURE: Varcode = Varcode::new(0, 12, 101);
const PRESSURE: Varcode = Varcode::new(0, 10, 4);
const CONFIDENCE: Varcode = Varcode::new(0, 33, 7);

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .expect("valid date")
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

/// Two fixed stations in Italy, a ship near the antimeridian and a buoy
fn build_archive() -> Memdb {
    let mut db = Memdb::new(Arc::new(BufrTable::standard()));
    let surface = LevTr::new(Level::single(1, None), Trange::instant());
    let screen = LevTr::new(
        Level::new(Some(103), Some(2000), None, None),
        Trange::instant(),
    );

    let bologna = Station::fixed(Coords::from_degrees(44.5, 11.34).expect("coords"), "synop");
    let milano = Station::fixed(Coords::from_degrees(45.46, 9.19).expect("coords"), "synop");
    let ship = Station::mobile(
        Coords::from_degrees(-17.5, 179.5).expect("coords"),
        "SHIP01",
        "ship",
    );
    let buoy = Station::mobile(
        Coords::from_degrees(-18.0, -179.2).expect("coords"),
        "BUOY7",
        "buoy",
    );

    for (station, temp) in [(&bologna, 30_115), (&milano, 29_615)] {
        for hour in [0, 12] {
            let inserted = db
                .insert_data(
                    station,
                    &screen,
                    at(1, hour),
                    vec![Var::int(TEMPERATURE, temp + hour as i32 * 10)],
                    false,
                    true,
                )
                .expect("insert temperature");
            db.set_value_attrs(inserted.values[0], vec![Var::int(CONFIDENCE, 80)], false)
                .expect("set confidence");
        }
        db.insert_data(
            station,
            &surface,
            at(1, 12),
            vec![Var::int(PRESSURE, 101_325)],
            false,
            true,
        )
        .expect("insert pressure");
    }

    for (station, day) in [(&ship, 2), (&buoy, 3)] {
        db.insert_data(
            station,
            &surface,
            at(day, 6),
            vec![Var::int(TEMPERATURE, 29_815), Var::int(PRESSURE, 100_900)],
            false,
            true,
        )
        .expect("insert marine data");
    }

    db.insert_station_data(
        &bologna,
        vec![Var::string(Varcode::new(0, 1, 19), "Bologna Borgo Panigale")],
        false,
        false,
    )
    .expect("insert station name");
    db
}

/// Purpose: Verify that position, identity, date and value filters compose
/// Benefit: Exercises every index and filter path through the public API
#[test]
fn test_queries_across_the_archive() {
    let db = build_archive();
    db.check_consistency().expect("archive is consistent");

    let summary = db.summary();
    assert_eq!(summary.stations, 4);
    assert_eq!(summary.levtrs, 2);
    assert_eq!(summary.values, 10);
    assert_eq!(summary.station_values, 1);

    // Box around northern Italy
    let query = Query {
        latmin: Some(44.0),
        latmax: Some(46.0),
        lonmin: Some(8.0),
        lonmax: Some(12.0),
        ..Query::new()
    };
    assert_eq!(db.query_stations(&query).expect("query").count(), 2);

    // Longitude range across the antimeridian catches ship and buoy
    let query = Query {
        lonmin: Some(179.0),
        lonmax: Some(-179.0),
        ..Query::new()
    };
    let idents: Vec<String> = db
        .query_stations(&query)
        .expect("query")
        .iter()
        .map(|(_, s)| s.ident.clone())
        .collect();
    assert_eq!(idents, vec!["SHIP01".to_string(), "BUOY7".to_string()]);

    // Mobile station by identifier
    let query = Query {
        ident: Some("BUOY7".to_string()),
        varcodes: [TEMPERATURE].into_iter().collect(),
        ..Query::new()
    };
    let rows = db.query_data(&query).expect("query");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].datetime, at(3, 6));

    // Value and attribute filters on the screen level
    let query = Query {
        datafilter: Some("B12101>300".to_string()),
        attrfilter: Some("B33007>=80".to_string()),
        level: Some(Level::new(Some(103), Some(2000), None, None)),
        ..Query::new()
    };
    let rows = db.query_data(&query).expect("query");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.station.coords.lat == 4_450_000));

    // Date window on day one only
    let query = Query {
        dtmin: Some(at(1, 0)),
        dtmax: Some(at(1, 23)),
        ..Query::new()
    };
    assert_eq!(db.query_data(&query).expect("query").len(), 6);

    // Fixed stations only
    let query = Query {
        mobile: Some(false),
        varcodes: [PRESSURE].into_iter().collect(),
        ..Query::new()
    };
    assert_eq!(db.query_data(&query).expect("query").len(), 2);

    let names = db.query_station_data(&Query::new()).expect("query");
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].var.as_str(), Some("Bologna Borgo Panigale"));
}

/// Purpose: Verify that a saved archive loads back with identical content
/// Benefit: Guards the CSV layout and reference remapping on load
#[test]
fn test_snapshot_round_trip() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db = build_archive();

    let saved = Snapshot::new(temp_dir.path()).save(&db).expect("save");
    assert_eq!(saved.values, 10);
    assert_eq!(saved.attributes, 4);

    let (loaded, stats) = Snapshot::new(temp_dir.path())
        .strict(true)
        .load(Arc::new(BufrTable::standard()))
        .expect("load");
    assert_eq!(stats.skipped, 0);
    assert_eq!(loaded.summary(), db.summary());
    loaded.check_consistency().expect("loaded archive is consistent");

    let render = |db: &Memdb| -> Vec<String> {
        db.query_data(&Query::new())
            .expect("query")
            .iter()
            .map(|r| {
                format!(
                    "{} {} {} {} {} {}",
                    r.station, r.levtr.level, r.levtr.trange, r.datetime, r.var,
                    r.var.attrs().len()
                )
            })
            .collect()
    };
    assert_eq!(render(&loaded), render(&db));
}

/// Purpose: Verify removal by query and by station, then persistence of the result
/// Benefit: Ensures cascades leave no dangling references in memory or on disk
#[test]
fn test_removal_and_resave() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut db = build_archive();

    let removed = db
        .remove_data(&Query {
            report: Some("ship".to_string()),
            ..Query::new()
        })
        .expect("remove ship data");
    assert_eq!(removed, 2);

    let bologna = db
        .query_stations(&Query {
            latmin: Some(44.5),
            latmax: Some(44.5),
            ..Query::new()
        })
        .expect("query")
        .to_ids();
    assert_eq!(bologna.len(), 1);
    let cascaded = db.remove_station(bologna[0]).expect("remove station");
    assert_eq!(cascaded, 4);
    db.check_consistency().expect("consistent after removal");

    Snapshot::new(temp_dir.path()).save(&db).expect("save");
    let (loaded, _) = Snapshot::new(temp_dir.path())
        .load(Arc::new(BufrTable::standard()))
        .expect("load");
    let summary = loaded.summary();
    assert_eq!(summary.values, 5);
    assert_eq!(summary.station_values, 0);

    db.remove_all();
    assert!(db.is_empty());
}
