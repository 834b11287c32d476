//! Tests for partition provisioning.

use yearload::dataset::DatasetType;
use yearload::error::IngestError;
use yearload::provision::provision;
use yearload::router::YearSet;
use yearload::schema::{ColumnType, Value};
use yearload::sink::{DataSink, MemorySink};

#[test]
fn provision_creates_one_table_per_year() {
    let sink = MemorySink::new();
    let years = YearSet::new([2023, 2022]).unwrap();
    let schema = DatasetType::Crashes.schema();

    let partitions = provision(DatasetType::Crashes, &years, schema, &sink).unwrap();
    let tables: Vec<&str> = partitions.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(tables, ["MVC_C_2022", "MVC_C_2023"]);
    assert_eq!(sink.table_names(), ["MVC_C_2022", "MVC_C_2023"]);

    let columns = sink.columns("MVC_C_2022").unwrap();
    assert_eq!(columns.len(), schema.len());
    assert_eq!(columns[1], ("crash_date".to_string(), ColumnType::Date));
    assert_eq!(sink.count_rows("MVC_C_2023").unwrap(), 0);
}

#[test]
fn provision_replaces_existing_tables() {
    let sink = MemorySink::new();
    sink.seed_rows("MVC_P_2020", vec![vec![Value::Integer(1)]; 7]);
    assert_eq!(sink.count_rows("MVC_P_2020").unwrap(), 7);

    let years = YearSet::new([2020]).unwrap();
    let schema = DatasetType::Persons.schema();
    provision(DatasetType::Persons, &years, schema, &sink).unwrap();
    assert_eq!(sink.count_rows("MVC_P_2020").unwrap(), 0);

    // Provisioning twice ends in the same state as once.
    provision(DatasetType::Persons, &years, schema, &sink).unwrap();
    assert_eq!(sink.count_rows("MVC_P_2020").unwrap(), 0);
    assert_eq!(sink.columns("MVC_P_2020").unwrap().len(), schema.len());
}

#[test]
fn provision_leaves_other_years_alone() {
    let sink = MemorySink::new();
    sink.seed_rows("MVC_C_2019", vec![vec![Value::Null]; 3]);
    let years = YearSet::new([2020]).unwrap();
    provision(DatasetType::Crashes, &years, DatasetType::Crashes.schema(), &sink).unwrap();
    assert_eq!(sink.count_rows("MVC_C_2019").unwrap(), 3);
}

#[test]
fn provision_failure_names_year_and_stops() {
    let sink = MemorySink::new();
    sink.fail_creates_of("MVC_V_2023");
    let years = YearSet::new([2022, 2023, 2024]).unwrap();

    let err = provision(DatasetType::Vehicles, &years, DatasetType::Vehicles.schema(), &sink)
        .unwrap_err();
    match &err {
        IngestError::PartitionProvisioningFailed { dataset, year, .. } => {
            assert_eq!(*dataset, DatasetType::Vehicles);
            assert_eq!(*year, 2023);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.partition(), Some((DatasetType::Vehicles, 2023)));
    assert_eq!(sink.table_names(), ["MVC_V_2022"]);
}
