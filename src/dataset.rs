//! The closed set of dataset types and their built-in schema declarations.
//!
//! Each [`DatasetType`] maps to exactly one [`SchemaDeclaration`], resolved
//! once at run start through [`DatasetType::schema`].

use crate::schema::ColumnType::{Date, Integer, Text, Time};
use crate::schema::{ColumnSpec, ColumnType, SchemaDeclaration};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Category of source data; selects the schema and the partition names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DatasetType {
    /// One row per collision event.
    #[serde(rename = "C")]
    Crashes,
    /// One row per vehicle involved in a collision.
    #[serde(rename = "V")]
    Vehicles,
    /// One row per person involved in a collision.
    #[serde(rename = "P")]
    Persons,
}

impl DatasetType {
    /// All dataset types, in report column order.
    pub const ALL: [DatasetType; 3] = [Self::Crashes, Self::Vehicles, Self::Persons];

    /// Single-letter code used in partition names.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Crashes => "C",
            Self::Vehicles => "V",
            Self::Persons => "P",
        }
    }

    /// Column header used by the reconciliation report.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Crashes => "Crashes",
            Self::Vehicles => "Vehicles",
            Self::Persons => "Person",
        }
    }

    /// Deterministic destination table name for one year.
    #[must_use]
    pub fn table_name(self, year: i32) -> String {
        format!("MVC_{}_{year}", self.code())
    }

    /// Conventional local file name of a downloaded source.
    #[must_use]
    pub fn source_file_name(self) -> String {
        format!("MVC_{}.csv", self.code())
    }

    /// The declared schema for this dataset type.
    #[must_use]
    pub fn schema(self) -> &'static SchemaDeclaration {
        match self {
            Self::Crashes => &*CRASHES,
            Self::Vehicles => &*VEHICLES,
            Self::Persons => &*PERSONS,
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown dataset code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dataset type {0:?} (expected C, V or P)")]
pub struct UnknownDataset(pub String);

impl FromStr for DatasetType {
    type Err = UnknownDataset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "crashes" => Ok(Self::Crashes),
            "v" | "vehicles" => Ok(Self::Vehicles),
            "p" | "persons" | "person" => Ok(Self::Persons),
            _ => Err(UnknownDataset(s.to_string())),
        }
    }
}

fn build(cols: &[(&str, &str, ColumnType)]) -> SchemaDeclaration {
    SchemaDeclaration::declared(
        cols.iter()
            .map(|(raw, canonical, ty)| ColumnSpec::new(*raw, *canonical, *ty))
            .collect(),
    )
}

static CRASHES: LazyLock<SchemaDeclaration> = LazyLock::new(|| {
    build(&[
        ("COLLISION_ID", "collision_id", Integer),
        ("CRASH DATE", "crash_date", Date),
        ("CRASH TIME", "crash_time", Time),
        ("BOROUGH", "borough", Text),
        ("NUMBER OF PERSONS INJURED", "injured", Integer),
        ("NUMBER OF PERSONS KILLED", "killed", Integer),
        ("VEHICLE TYPE CODE 1", "vhc_1_code", Text),
        ("CONTRIBUTING FACTOR VEHICLE 1", "contr_f_vhc_1", Text),
        ("VEHICLE TYPE CODE 2", "vhc_2_code", Text),
        ("CONTRIBUTING FACTOR VEHICLE 2", "contr_f_vhc_2", Text),
        ("VEHICLE TYPE CODE 3", "vhc_3_code", Text),
        ("CONTRIBUTING FACTOR VEHICLE 3", "contr_f_vhc_3", Text),
        ("VEHICLE TYPE CODE 4", "vhc_4_code", Text),
        ("CONTRIBUTING FACTOR VEHICLE 4", "contr_f_vhc_4", Text),
    ])
});

static VEHICLES: LazyLock<SchemaDeclaration> = LazyLock::new(|| {
    build(&[
        ("UNIQUE_ID", "unique_id", Integer),
        ("COLLISION_ID", "collision_id", Integer),
        ("CRASH_DATE", "crash_date", Date),
        ("CRASH_TIME", "crash_time", Time),
        ("VEHICLE_TYPE", "vhc_type", Text),
        ("VEHICLE_DAMAGE", "vhc_dmg", Text),
        ("DRIVER_SEX", "dr_sex", Text),
        ("DRIVER_LICENSE_STATUS", "dr_lic_status", Text),
        ("VEHICLE_YEAR", "vhc_year", Integer),
        ("VEHICLE_OCCUPANTS", "vhc_occupants", Integer),
        ("STATE_REGISTRATION", "state_reg", Text),
        ("CONTRIBUTING_FACTOR_1", "contr_f", Text),
    ])
});

static PERSONS: LazyLock<SchemaDeclaration> = LazyLock::new(|| {
    build(&[
        ("UNIQUE_ID", "unique_id", Integer),
        ("COLLISION_ID", "collision_id", Integer),
        ("CRASH_DATE", "crash_date", Date),
        ("CRASH_TIME", "crash_time", Time),
        ("EJECTION", "ejection", Text),
        ("BODILY_INJURY", "body_inj", Text),
        ("PERSON_INJURY", "person_inj", Text),
        ("POSITION_IN_VEHICLE", "pos_in_vhc", Text),
        ("SAFETY_EQUIPMENT", "safety_equip", Text),
        ("PERSON_TYPE", "person_type", Text),
        ("PERSON_AGE", "age", Integer),
        ("PERSON_SEX", "sex", Text),
        ("EMOTIONAL_STATUS", "emot_status", Text),
        ("CONTRIBUTING_FACTOR_1", "contr_f", Text),
    ])
});
