//! Tests for projecting and resolving raw rows.

use chrono::{NaiveDate, NaiveTime};
use yearload::projection::{RawRow, project, project_and_resolve, resolve};
use yearload::schema::{ColumnSpec, ColumnType, SchemaDeclaration, Value};
use yearload::temporal::DEFAULT_TIME_FORMAT;
use yearload::validation::Malformed;

fn small_schema() -> SchemaDeclaration {
    SchemaDeclaration::new(vec![
        ColumnSpec::new("ID", "id", ColumnType::Integer),
        ColumnSpec::new("CRASH DATE", "crash_date", ColumnType::Date),
        ColumnSpec::new("CRASH TIME", "crash_time", ColumnType::Time),
        ColumnSpec::new("BOROUGH", "borough", ColumnType::Text),
    ])
    .unwrap()
}

fn row(pairs: &[(&str, Option<&str>)]) -> RawRow {
    RawRow::from_pairs(pairs.iter().map(|(k, v)| (*k, *v)))
}

#[test]
fn project_orders_by_declaration() {
    let schema = small_schema();
    let raw = row(&[
        ("BOROUGH", Some("QUEENS")),
        ("UNUSED", Some("x")),
        ("CRASH TIME", Some("14:05")),
        ("CRASH DATE", Some("03/01/2022")),
        ("ID", Some("7")),
    ]);
    let projected = project(&raw, &schema).unwrap();
    let values: Vec<Option<&str>> = projected.values().iter().map(Option::as_deref).collect();
    assert_eq!(
        values,
        [Some("7"), Some("03/01/2022"), Some("14:05"), Some("QUEENS")]
    );
    assert_eq!(projected.get(&schema, "borough"), Some("QUEENS"));
}

#[test]
fn project_same_output_for_any_input_order() {
    let schema = small_schema();
    let a = row(&[
        ("ID", Some("1")),
        ("CRASH DATE", Some("2022-03-01")),
        ("CRASH TIME", None),
        ("BOROUGH", Some("BRONX")),
    ]);
    let b = row(&[
        ("BOROUGH", Some("BRONX")),
        ("CRASH TIME", None),
        ("CRASH DATE", Some("2022-03-01")),
        ("ID", Some("1")),
    ]);
    assert_eq!(project(&a, &schema).unwrap(), project(&b, &schema).unwrap());
}

#[test]
fn project_missing_field() {
    let schema = small_schema();
    let raw = row(&[("ID", Some("1")), ("CRASH DATE", Some("2022-03-01"))]);
    assert_eq!(
        project(&raw, &schema).unwrap_err(),
        Malformed::MissingField("CRASH TIME".into())
    );
}

#[test]
fn empty_field_is_present_but_null() {
    let schema = small_schema();
    let raw = row(&[
        ("ID", None),
        ("CRASH DATE", Some("2022-03-01")),
        ("CRASH TIME", None),
        ("BOROUGH", None),
    ]);
    let resolved = project_and_resolve(&raw, &schema, DEFAULT_TIME_FORMAT).unwrap();
    assert_eq!(resolved.values[0], Value::Null);
    assert_eq!(resolved.values[2], Value::Null);
    assert_eq!(resolved.values[3], Value::Null);
    assert_eq!(resolved.coerced_values, 0);
}

#[test]
fn resolve_types_values() {
    let schema = small_schema();
    let raw = row(&[
        ("ID", Some("42")),
        ("CRASH DATE", Some("07/04/2023")),
        ("CRASH TIME", Some("17:45")),
        ("BOROUGH", Some("BROOKLYN")),
    ]);
    let resolved = project_and_resolve(&raw, &schema, DEFAULT_TIME_FORMAT).unwrap();
    let date = NaiveDate::from_ymd_opt(2023, 7, 4).unwrap();
    assert_eq!(
        resolved.values,
        vec![
            Value::Integer(42),
            Value::Date(date),
            Value::Time(NaiveTime::from_hms_opt(17, 45, 0).unwrap()),
            Value::Text("BROOKLYN".into()),
        ]
    );
    assert_eq!(resolved.date, date);
    assert_eq!(resolved.year(), 2023);
}

#[test]
fn resolve_unparseable_date_is_malformed() {
    let schema = small_schema();
    let raw = row(&[
        ("ID", Some("1")),
        ("CRASH DATE", Some("notadate")),
        ("CRASH TIME", Some("10:00")),
        ("BOROUGH", None),
    ]);
    let projected = project(&raw, &schema).unwrap();
    assert_eq!(
        resolve(projected, &schema, DEFAULT_TIME_FORMAT).unwrap_err(),
        Malformed::UnparseableDate(Some("notadate".into()))
    );
}

#[test]
fn resolve_missing_date_is_malformed() {
    let schema = small_schema();
    let raw = row(&[
        ("ID", Some("1")),
        ("CRASH DATE", None),
        ("CRASH TIME", Some("10:00")),
        ("BOROUGH", None),
    ]);
    assert_eq!(
        project_and_resolve(&raw, &schema, DEFAULT_TIME_FORMAT).unwrap_err(),
        Malformed::UnparseableDate(None)
    );
}

#[test]
fn bad_time_keeps_row() {
    let schema = small_schema();
    let raw = row(&[
        ("ID", Some("1")),
        ("CRASH DATE", Some("2022-03-01")),
        ("CRASH TIME", Some("14:05:30")),
        ("BOROUGH", None),
    ]);
    let resolved = project_and_resolve(&raw, &schema, DEFAULT_TIME_FORMAT).unwrap();
    assert_eq!(resolved.values[2], Value::Null);
}

#[test]
fn integer_coercion() {
    let schema = small_schema();
    let resolve_id = |id: &str| {
        let raw = row(&[
            ("ID", Some(id)),
            ("CRASH DATE", Some("2022-03-01")),
            ("CRASH TIME", None),
            ("BOROUGH", None),
        ]);
        let r = project_and_resolve(&raw, &schema, DEFAULT_TIME_FORMAT).unwrap();
        (r.values[0].clone(), r.coerced_values)
    };
    assert_eq!(resolve_id("3"), (Value::Integer(3), 0));
    assert_eq!(resolve_id("3.0"), (Value::Integer(3), 0));
    assert_eq!(resolve_id("-12"), (Value::Integer(-12), 0));
    assert_eq!(resolve_id("3.5"), (Value::Null, 1));
    assert_eq!(resolve_id("three"), (Value::Null, 1));
}
