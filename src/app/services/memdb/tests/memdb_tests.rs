//! Tests for cross-store operations on the database

use super::*;
use crate::Error;
use crate::app::models::Query;

#[test]
fn test_insert_value_requires_live_references() {
    let mut db = Memdb::default();
    let station = db
        .obtain_station(&create_test_station(45.0, 9.0, "synop"), true)
        .unwrap();
    let levtr = db.obtain_levtr(&screen_levtr(), true).unwrap();

    let err = db
        .insert_value(station + 1, levtr, datetime(2024, 1, 1, 0), temperature(1), false)
        .unwrap_err();
    assert!(err.is_not_found());
    let err = db
        .insert_value(station, levtr + 1, datetime(2024, 1, 1, 0), temperature(1), false)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(
        db.insert_station_value(station + 5, Var::int(HEIGHT, 1), false)
            .unwrap_err()
            .is_not_found()
    );
    assert!(db.values().is_empty());
    assert!(db.station_values().is_empty());
}

#[test]
fn test_insert_data_is_idempotent_with_replace() {
    let mut db = create_test_db();
    let before = db.summary();

    let first = db
        .insert_data(
            &create_test_station(40.0, 11.0, "synop"),
            &screen_levtr(),
            datetime(2024, 1, 1, 12),
            vec![temperature(26_500)],
            true,
            true,
        )
        .unwrap();
    assert_eq!(first.station, 0);
    assert_eq!(first.values, vec![0]);
    assert_eq!(db.summary(), before);
    assert_eq!(db.values().get(0).unwrap().var.as_int(), Some(26_500));
    db.check_consistency().unwrap();
}

#[test]
fn test_duplicate_insert_leaves_db_unchanged() {
    let mut db = create_test_db();
    let before = db.summary();

    let err = db
        .insert_data(
            &create_test_station(44.5, 11.3, "metar"),
            &screen_levtr(),
            datetime(2024, 1, 2, 0),
            vec![Var::int(Varcode::new(0, 11, 1), 180), Var::int(HUMIDITY, 10)],
            false,
            true,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }));
    assert_eq!(db.summary(), before);

    let err = db
        .insert_data(
            &create_test_station(0.0, 0.0, "synop"),
            &surface_levtr(),
            datetime(2024, 1, 2, 0),
            vec![temperature(1), temperature(2)],
            false,
            true,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }));
    assert_eq!(db.summary(), before);

    let err = db
        .insert_data(
            &create_test_station(0.0, 0.0, "synop"),
            &surface_levtr(),
            datetime(2024, 1, 2, 0),
            vec![temperature(1)],
            false,
            false,
        )
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(db.summary(), before);
}

#[test]
fn test_insert_station_data() {
    let mut db = Memdb::default();
    let station = create_test_station(45.0, 9.0, "synop");
    let (id, values) = db
        .insert_station_data(
            &station,
            vec![Var::string(STATION_NAME, "Milano"), Var::int(HEIGHT, 122)],
            false,
            true,
        )
        .unwrap();
    assert_eq!(values.len(), 2);

    let err = db
        .insert_station_data(&station, vec![Var::int(HEIGHT, 150)], false, true)
        .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }));

    let (same, replaced) = db
        .insert_station_data(&station, vec![Var::int(HEIGHT, 150)], true, true)
        .unwrap();
    assert_eq!(same, id);
    assert_eq!(replaced, vec![values[1]]);
    assert_eq!(
        db.station_values().get(values[1]).unwrap().var.as_int(),
        Some(150)
    );
}

#[test]
fn test_remove_station_cascades() {
    let mut db = create_test_db();
    let metar = 3;
    db.insert_station_value(metar, Var::string(STATION_NAME, "Bologna"), false)
        .unwrap();

    let removed = db.remove_station(metar).unwrap();
    assert_eq!(removed, 3);
    assert!(db.stations().get(metar).is_none());
    assert_eq!(db.values().len(), 3);
    assert!(db.station_values().is_empty());
    assert!(db.remove_station(metar).unwrap_err().is_not_found());
    db.check_consistency().unwrap();

    let mut query = Query::new();
    query.ana_id = Some(metar);
    assert!(db.query_data(&query).unwrap().is_empty());
}

#[test]
fn test_remove_levtr_refuses_referenced() {
    let mut db = create_test_db();
    let err = db.remove_levtr(0).unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }));
    assert_eq!(db.levtrs().len(), 1);

    let unused = db.obtain_levtr(&surface_levtr(), true).unwrap();
    assert_eq!(db.remove_levtr(unused).unwrap(), surface_levtr());
    db.check_consistency().unwrap();
}

#[test]
fn test_remove_data_by_query() {
    let mut db = create_test_db();
    let mut query = Query::new();
    query.report = Some("synop".to_string());
    query.latmin = Some(41.0);

    assert_eq!(db.remove_data(&query).unwrap(), 2);
    assert_eq!(db.values().len(), 3);
    assert_eq!(db.remove_data(&query).unwrap(), 0);
    // Stations stay even when all their values are gone
    assert_eq!(db.stations().len(), 4);
    db.check_consistency().unwrap();

    let mut query = Query::new();
    query.datafilter = Some("not a filter".to_string());
    assert!(db.remove_data(&query).is_err());
    assert_eq!(db.values().len(), 3);
}

#[test]
fn test_remove_station_data_by_query() {
    let mut db = create_test_db();
    for id in 0..4 {
        db.insert_station_value(id, Var::int(HEIGHT, 10 * id as i32), false)
            .unwrap();
    }
    db.insert_station_value(0, Var::string(STATION_NAME, "Alpha"), false)
        .unwrap();

    let mut query = Query::new();
    query.varcodes.insert(HEIGHT);
    query.latmax = Some(41.0);
    assert_eq!(db.remove_station_data(&query).unwrap(), 2);
    assert_eq!(db.station_values().len(), 3);
    db.check_consistency().unwrap();
}

#[test]
fn test_remove_all_resets_numbering() {
    let mut db = create_test_db();
    db.remove_all();
    assert!(db.is_empty());
    assert_eq!(db.summary(), Default::default());

    let id = db
        .obtain_station(&create_test_station(1.0, 1.0, "synop"), true)
        .unwrap();
    assert_eq!(id, 0);
}

#[test]
fn test_value_attributes() {
    let mut db = create_test_db();
    db.set_value_attrs(
        0,
        vec![Var::int(CONFIDENCE, 70), Var::int(Varcode::new(0, 33, 196), 1)],
        false,
    )
    .unwrap();
    assert_eq!(db.value_attrs(0).unwrap().len(), 2);

    db.set_value_attrs(0, vec![Var::int(CONFIDENCE, 95)], false)
        .unwrap();
    let attrs = db.value_attrs(0).unwrap();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs[0].as_int(), Some(95));

    db.set_value_attrs(0, vec![Var::int(CONFIDENCE, 60)], true)
        .unwrap();
    assert_eq!(db.value_attrs(0).unwrap().len(), 1);
    db.set_value_attrs(0, vec![Var::int(Varcode::new(0, 33, 196), 1)], false)
        .unwrap();

    db.remove_value_attrs(0, &[CONFIDENCE]).unwrap();
    assert_eq!(db.value_attrs(0).unwrap().len(), 1);
    db.remove_value_attrs(0, &[]).unwrap();
    assert!(db.value_attrs(0).unwrap().is_empty());

    assert!(db.value_attrs(99).unwrap_err().is_not_found());
    assert!(db.set_value_attrs(99, Vec::new(), false).unwrap_err().is_not_found());
}

#[test]
fn test_station_value_attributes() {
    let mut db = create_test_db();
    let id = db
        .insert_station_value(1, Var::int(HEIGHT, 12), false)
        .unwrap();
    db.set_station_value_attrs(id, vec![Var::int(CONFIDENCE, 50)], false)
        .unwrap();
    assert_eq!(
        db.station_value_attrs(id).unwrap()[0].code(),
        CONFIDENCE
    );
    db.remove_station_value_attrs(id, &[]).unwrap();
    assert!(db.station_value_attrs(id).unwrap().is_empty());
}

#[test]
fn test_summary() {
    let db = create_test_db();
    let summary = db.summary();
    assert_eq!(summary.stations, 4);
    assert_eq!(summary.levtrs, 1);
    assert_eq!(summary.values, 5);
    assert_eq!(summary.station_values, 0);
    assert_eq!(
        summary.varcodes.into_iter().collect::<Vec<_>>(),
        vec![TEMPERATURE, HUMIDITY]
    );
}

#[test]
fn test_consistency_after_mixed_operations() {
    let mut db = create_test_db();
    for hour in 0..24 {
        db.insert_data(
            &create_mobile_station(30.0 + hour as f64 / 10.0, -20.0, "ship1", "ship"),
            &surface_levtr(),
            datetime(2024, 2, 1, hour),
            vec![temperature(28_000 + hour as i32)],
            false,
            true,
        )
        .unwrap();
    }
    db.check_consistency().unwrap();

    let mut query = Query::new();
    query.ident = Some("ship1".to_string());
    query.dtmax = Some(datetime(2024, 2, 1, 11));
    assert_eq!(db.remove_data(&query).unwrap(), 12);
    db.remove_station(0).unwrap();
    db.check_consistency().unwrap();

    let mut query = Query::new();
    query.ident = Some("ship1".to_string());
    assert_eq!(db.query_data(&query).unwrap().len(), 12);
}
