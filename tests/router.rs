//! Tests for year partition routing.

use chrono::NaiveDate;
use yearload::dataset::DatasetType;
use yearload::error::IngestError;
use yearload::projection::ResolvedRow;
use yearload::router::{PartitionKey, Route, YearSet, route, route_batch};
use yearload::schema::Value;

fn dated(y: i32, m: u32, d: u32) -> ResolvedRow {
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    ResolvedRow {
        values: vec![Value::Date(date)],
        date,
        coerced_values: 0,
    }
}

#[test]
fn year_set_rejects_empty() {
    let err = YearSet::new(Vec::<i32>::new()).unwrap_err();
    assert!(matches!(err, IngestError::InvalidParams(_)));
}

#[test]
fn year_set_sorted_and_deduplicated() {
    let years = YearSet::new([2023, 2022, 2023]).unwrap();
    assert_eq!(years.len(), 2);
    assert_eq!(years.iter().collect::<Vec<_>>(), [2022, 2023]);
    assert_eq!(years.to_string(), "[2022, 2023]");
}

#[test]
fn route_requested_year() {
    let years = YearSet::new([2022, 2023]).unwrap();
    assert_eq!(
        route(&dated(2022, 3, 1), DatasetType::Crashes, &years),
        Route::To(PartitionKey::new(DatasetType::Crashes, 2022))
    );
    assert_eq!(
        route(&dated(2023, 12, 31), DatasetType::Persons, &years),
        Route::To(PartitionKey::new(DatasetType::Persons, 2023))
    );
}

#[test]
fn route_drops_other_years() {
    let years = YearSet::new([2022]).unwrap();
    assert_eq!(route(&dated(2021, 12, 31), DatasetType::Crashes, &years), Route::Dropped);
    assert_eq!(route(&dated(2023, 1, 1), DatasetType::Crashes, &years), Route::Dropped);
}

#[test]
fn partition_key_names() {
    let key = PartitionKey::new(DatasetType::Vehicles, 2019);
    assert_eq!(key.table_name(), "MVC_V_2019");
    assert_eq!(key.to_string(), "V/2019");
}

#[test]
fn route_batch_groups_in_source_order() {
    let years = YearSet::new([2022, 2023]).unwrap();
    let rows = vec![
        dated(2023, 1, 5),
        dated(2022, 6, 1),
        dated(2021, 1, 1),
        dated(2023, 1, 2),
        dated(2022, 2, 1),
    ];
    let routed = route_batch(rows, DatasetType::Crashes, &years);

    assert_eq!(routed.dropped, 1);
    assert_eq!(routed.routed(), 4);
    let keys: Vec<i32> = routed.groups.keys().map(|k| k.year).collect();
    assert_eq!(keys, [2022, 2023]);

    let days_2023: Vec<NaiveDate> = routed.groups[&PartitionKey::new(DatasetType::Crashes, 2023)]
        .iter()
        .map(|r| r.date)
        .collect();
    assert_eq!(
        days_2023,
        [
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        ]
    );
}
