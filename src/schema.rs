//! Column names of the two dashboard tables, and typed accessors that turn a
//! missing column into [`DashboardError::MissingColumn`].

use crate::error::{DashboardError, Result, TableKind};
use chrono::NaiveDate;
use polars::prelude::*;

// Encounter (EHR) columns
pub const PATIENT_ID: &str = "Patient_ID";
pub const NAME: &str = "Name";
pub const DOB: &str = "DOB";
pub const GENDER: &str = "Gender";
pub const ADMISSION_DATE: &str = "Admission_Date";
pub const DISCHARGE_DATE: &str = "Discharge_Date";
pub const LENGTH_OF_STAY: &str = "Length_of_Stay";
pub const PROVIDER: &str = "Provider";
pub const DIAGNOSIS_CODE: &str = "Diagnosis_Code";
pub const DIAGNOSIS_DESCRIPTION: &str = "Diagnosis_Description";
pub const PROCEDURE_CODE: &str = "Procedure_Code";
pub const PROCEDURE_DESCRIPTION: &str = "Procedure_Description";
pub const NOTES: &str = "Notes";

// Claim columns
pub const CLAIM_ID: &str = "Claim_ID";
pub const SERVICE_DATE: &str = "Service_Date";
pub const ICD_CODE: &str = "ICD_Code";
pub const CPT_CODE: &str = "CPT_Code";
pub const BILLED_AMOUNT: &str = "Billed_Amount";
pub const PAID_AMOUNT: &str = "Paid_Amount";
pub const STATUS: &str = "Status";

/// Derived column appended to claims by the monthly trend chart.
pub const MONTH: &str = "Month";

pub const STATUS_PAID: &str = "Paid";
pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_DENIED: &str = "Denied";

/// Date fields whose names do not contain "Date".
pub const KNOWN_DATE_COLUMNS: &[&str] = &[DOB];

/// Whether the loader should coerce this column to a date.
pub fn is_date_column(name: &str) -> bool {
    name.contains("Date") || KNOWN_DATE_COLUMNS.contains(&name)
}

/// Identifier, code and category columns that must stay text even when
/// every cell looks numeric.
pub fn is_text_column(name: &str) -> bool {
    name.ends_with("_ID") || name.ends_with("_Code") || name == PROVIDER || name == STATUS
}

pub fn require<'a>(df: &'a DataFrame, table: TableKind, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| DashboardError::missing_column(table, name))
}

/// Fail fast when any of `names` is absent, before doing any work.
pub fn require_all(df: &DataFrame, table: TableKind, names: &[&str]) -> Result<()> {
    for name in names {
        require(df, table, name)?;
    }
    Ok(())
}

/// Column values coerced to strings. Nulls stay `None`.
pub fn string_values(df: &DataFrame, table: TableKind, name: &str) -> Result<Vec<Option<String>>> {
    let series = require(df, table, name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// Column values coerced to `f64`; cells that do not convert become `None`.
pub fn float_values(df: &DataFrame, table: TableKind, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require(df, table, name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

/// Column values coerced to unsigned counts.
pub fn count_values(df: &DataFrame, table: TableKind, name: &str) -> Result<Vec<Option<u64>>> {
    let series = require(df, table, name)?.cast(&DataType::UInt64)?;
    let values = series.u64()?.into_iter().collect();
    Ok(values)
}

/// Column values as calendar dates. String columns are parsed best-effort.
pub fn date_values(df: &DataFrame, table: TableKind, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let series = require(df, table, name)?;
    match series.dtype() {
        DataType::Date => Ok(series.date()?.as_date_iter().collect()),
        _ => {
            let as_text = series.cast(&DataType::String)?;
            let values = as_text
                .str()?
                .into_iter()
                .map(|v| v.and_then(crate::loader::parse_date))
                .collect();
            Ok(values)
        }
    }
}
