//! Tests for station value and observation value stores

use super::*;
use crate::app::services::memdb::station_value::StationValues;
use crate::app::services::memdb::value::Values;

#[test]
fn test_station_value_duplicate_rejected_without_mutation() {
    let mut values = StationValues::new();
    let id = values
        .insert(0, Var::string(STATION_NAME, "Bologna"), false)
        .unwrap();

    let err = values
        .insert(0, Var::string(STATION_NAME, "Modena"), false)
        .unwrap_err();
    assert!(matches!(err, crate::Error::Consistency { .. }));
    assert_eq!(values.len(), 1);
    assert_eq!(values.get(id).unwrap().var.as_str(), Some("Bologna"));
}

#[test]
fn test_station_value_replace_keeps_slot() {
    let mut values = StationValues::new();
    let id = values.insert(3, Var::int(HEIGHT, 100), false).unwrap();
    let replaced = values.insert(3, Var::int(HEIGHT, 120), true).unwrap();
    assert_eq!(id, replaced);
    assert_eq!(values.get(id).unwrap().var.as_int(), Some(120));

    // Same code at a different station is a different value
    let other = values.insert(4, Var::int(HEIGHT, 100), false).unwrap();
    assert_ne!(other, id);
    assert_eq!(values.ids_for_station(3), vec![id]);
    values.check_indices().unwrap();
}

#[test]
fn test_value_identity() {
    let mut values = Values::new();
    let dt = datetime(2024, 6, 1, 0);
    let a = values.insert(0, 0, dt, temperature(29_000), false).unwrap();
    let b = values.insert(0, 1, dt, temperature(29_000), false).unwrap();
    let c = values
        .insert(0, 0, datetime(2024, 6, 1, 1), temperature(29_000), false)
        .unwrap();
    let d = values.insert(0, 0, dt, Var::int(HUMIDITY, 60), false).unwrap();
    assert_eq!(values.len(), 4);
    assert_eq!([a, b, c, d], [0, 1, 2, 3]);

    assert!(values.insert(0, 0, dt, temperature(1), false).is_err());
    assert_eq!(values.get(a).unwrap().var.as_int(), Some(29_000));

    assert_eq!(values.insert(0, 0, dt, temperature(1), true).unwrap(), a);
    assert_eq!(values.get(a).unwrap().var.as_int(), Some(1));
    values.check_indices().unwrap();
}

#[test]
fn test_value_remove_and_extent() {
    let mut values = Values::new();
    let early = values
        .insert(0, 0, datetime(2024, 1, 1, 0), temperature(1), false)
        .unwrap();
    values
        .insert(0, 0, datetime(2024, 3, 1, 0), temperature(2), false)
        .unwrap();
    assert_eq!(
        values.datetime_extent(),
        Some((datetime(2024, 1, 1, 0), datetime(2024, 3, 1, 0)))
    );

    values.remove(early).unwrap();
    assert_eq!(
        values.datetime_extent(),
        Some((datetime(2024, 3, 1, 0), datetime(2024, 3, 1, 0)))
    );
    assert!(values.references_levtr(0));
    values.check_indices().unwrap();
}
