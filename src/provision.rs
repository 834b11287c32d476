//! Partition provisioning.
//!
//! Before any row flows, every requested year gets an empty table with
//! exactly the declared canonical columns. An existing table of the same
//! name is dropped and recreated, never merged: re-running a year always
//! starts that partition from zero rows. This is how reloads stay
//! idempotent.

use crate::dataset::DatasetType;
use crate::error::IngestError;
use crate::router::{PartitionKey, YearSet};
use crate::schema::SchemaDeclaration;
use crate::sink::DataSink;
use tracing::{error, info};

/// A provisioned, empty destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub key: PartitionKey,
    pub table: String,
}

/// Create or replace one table per requested year.
///
/// Stops at the first rejected table; tables already recreated stay in
/// place (empty), and no data is loaded.
///
/// # Errors
/// [`IngestError::PartitionProvisioningFailed`] naming the year the sink
/// rejected.
pub fn provision(
    dataset: DatasetType,
    years: &YearSet,
    schema: &SchemaDeclaration,
    sink: &dyn DataSink,
) -> Result<Vec<Partition>, IngestError> {
    let mut partitions = Vec::with_capacity(years.len());
    for year in years.iter() {
        let key = PartitionKey::new(dataset, year);
        let table = key.table_name();
        if let Err(source) = sink.create_or_replace_table(&table, schema.columns()) {
            error!(%table, sink = sink.name(), error = %source, "provision.failed");
            return Err(IngestError::PartitionProvisioningFailed {
                dataset,
                year,
                source,
            });
        }
        info!(%table, columns = schema.len(), "provision.table_ready");
        partitions.push(Partition { key, table });
    }
    Ok(partitions)
}
