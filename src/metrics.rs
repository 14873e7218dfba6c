//! Metrics Calculator - the four headline numbers of the dashboard.
//!
//! Each metric is computed independently; a missing column makes only that
//! metric unavailable.

use crate::aggregations::rank_groups;
use crate::error::{Result, TableKind};
use crate::schema::{self, LENGTH_OF_STAY, PATIENT_ID, PROCEDURE_CODE, STATUS, STATUS_DENIED, STATUS_PAID};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Paid vs denied claim counts. Other statuses are excluded from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalCounts {
    pub paid: usize,
    pub denied: usize,
}

impl fmt::Display for ApprovalCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.paid, self.denied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_patients: Option<usize>,
    /// `None` when there are no stays to average, or the column is missing.
    pub avg_length_of_stay: Option<f64>,
    pub most_common_procedure: Option<String>,
    pub approval: Option<ApprovalCounts>,
    /// Metrics that could not be computed, with the reason.
    pub unavailable: Vec<String>,
}

impl MetricsSummary {
    pub fn compute(encounters: &DataFrame, claims: &DataFrame) -> Self {
        let mut unavailable = Vec::new();
        let mut keep = |name: &str, err: crate::error::DashboardError| {
            warn!("Metric '{}' unavailable: {}", name, err);
            unavailable.push(format!("{}: {}", name, err));
        };

        let total_patients = total_patients(encounters)
            .map_err(|e| keep("Total Patients", e))
            .ok();
        let avg_length_of_stay = avg_length_of_stay(encounters)
            .map_err(|e| keep("Avg. Length of Stay", e))
            .ok()
            .flatten();
        let most_common_procedure = most_common_procedure(encounters)
            .map_err(|e| keep("Most Common Procedure", e))
            .ok()
            .flatten();
        let approval = approval_counts(claims)
            .map_err(|e| keep("Approval Ratio", e))
            .ok();

        Self {
            total_patients,
            avg_length_of_stay,
            most_common_procedure,
            approval,
            unavailable,
        }
    }
}

/// Distinct non-null patient ids.
pub fn total_patients(encounters: &DataFrame) -> Result<usize> {
    schema::require(encounters, TableKind::Encounters, PATIENT_ID)?;
    let out = encounters
        .clone()
        .lazy()
        .select([col(PATIENT_ID).drop_nulls().n_unique().alias(PATIENT_ID)])
        .collect()?;
    let count = scalar_count(&out, TableKind::Encounters, PATIENT_ID)?;
    Ok(count as usize)
}

/// Mean stay in days, rounded to two decimals.
pub fn avg_length_of_stay(encounters: &DataFrame) -> Result<Option<f64>> {
    schema::require(encounters, TableKind::Encounters, LENGTH_OF_STAY)?;
    let out = encounters
        .clone()
        .lazy()
        .select([col(LENGTH_OF_STAY).cast(DataType::Float64).mean()])
        .collect()?;
    let mean = schema::float_values(&out, TableKind::Encounters, LENGTH_OF_STAY)?
        .into_iter()
        .next()
        .flatten();
    Ok(mean.map(round2))
}

/// Modal procedure code. Ties go to the code seen first.
pub fn most_common_procedure(encounters: &DataFrame) -> Result<Option<String>> {
    schema::require(encounters, TableKind::Encounters, PROCEDURE_CODE)?;
    let ranked = rank_groups(encounters.clone().lazy(), PROCEDURE_CODE, len(), 1)?;
    let mode = schema::string_values(&ranked, TableKind::Encounters, PROCEDURE_CODE)?
        .into_iter()
        .next()
        .flatten();
    Ok(mode)
}

pub fn approval_counts(claims: &DataFrame) -> Result<ApprovalCounts> {
    schema::require(claims, TableKind::Claims, STATUS)?;
    let is = |status: &str| {
        col(STATUS)
            .cast(DataType::String)
            .eq(lit(status))
            .cast(DataType::UInt64)
            .sum()
            .alias(status)
    };
    let out = claims
        .clone()
        .lazy()
        .select([is(STATUS_PAID), is(STATUS_DENIED)])
        .collect()?;
    Ok(ApprovalCounts {
        paid: scalar_count(&out, TableKind::Claims, STATUS_PAID)? as usize,
        denied: scalar_count(&out, TableKind::Claims, STATUS_DENIED)? as usize,
    })
}

fn scalar_count(df: &DataFrame, table: TableKind, name: &str) -> Result<u64> {
    let value = schema::count_values(df, table, name)?.into_iter().next().flatten();
    Ok(value.unwrap_or(0))
}

/// Round to two decimals, ties to even.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encounters() -> DataFrame {
        df! [
            PATIENT_ID => ["P1", "P2", "P2", "P3"],
            LENGTH_OF_STAY => [3i64, 5, 4, 1],
            PROCEDURE_CODE => ["93000", "99213", "99213", "93000"],
        ]
        .unwrap()
    }

    #[test]
    fn test_total_patients_counts_distinct_ids() {
        assert_eq!(total_patients(&encounters()).unwrap(), 3);
    }

    #[test]
    fn test_avg_length_of_stay_rounds() {
        let df = df! [ LENGTH_OF_STAY => [1i64, 2, 2] ].unwrap();
        assert_eq!(avg_length_of_stay(&df).unwrap(), Some(1.67));
        assert_eq!(avg_length_of_stay(&encounters()).unwrap(), Some(3.25));
    }

    #[test]
    fn test_avg_length_of_stay_rounds_half_to_even() {
        let df = df! [ LENGTH_OF_STAY => [1i64, 1, 1, 1, 1, 1, 1, 2] ].unwrap();
        assert_eq!(avg_length_of_stay(&df).unwrap(), Some(1.12));
        assert_eq!(round2(0.375), 0.38);
    }

    #[test]
    fn test_mode_tie_breaks_on_first_seen() {
        assert_eq!(most_common_procedure(&encounters()).unwrap(), Some("93000".to_string()));
    }

    #[test]
    fn test_mode_keeps_leading_zeros() {
        let csv = "Patient_ID,Procedure_Code\nP1,01996\nP2,01996\nP3,99213\n";
        let encounters = crate::loader::load_encounters_csv(csv.as_bytes()).unwrap();
        assert_eq!(most_common_procedure(&encounters).unwrap(), Some("01996".to_string()));
    }

    #[test]
    fn test_mode_ignores_nulls() {
        let df = df! [ PROCEDURE_CODE => [None, Some("71020"), None] ].unwrap();
        assert_eq!(most_common_procedure(&df).unwrap(), Some("71020".to_string()));
    }

    #[test]
    fn test_approval_counts_exclude_pending() {
        let claims = df! [ STATUS => ["Paid", "Pending", "Denied", "Paid", "paid"] ].unwrap();
        let counts = approval_counts(&claims).unwrap();
        assert_eq!(counts, ApprovalCounts { paid: 2, denied: 1 });
        assert_eq!(counts.to_string(), "2 / 1");
    }

    #[test]
    fn test_empty_tables_return_sentinels() {
        let encounters = df! [
            PATIENT_ID => Vec::<String>::new(),
            LENGTH_OF_STAY => Vec::<i64>::new(),
            PROCEDURE_CODE => Vec::<String>::new(),
        ]
        .unwrap();
        let claims = df! [ STATUS => Vec::<String>::new() ].unwrap();
        let summary = MetricsSummary::compute(&encounters, &claims);
        assert_eq!(summary.total_patients, Some(0));
        assert_eq!(summary.avg_length_of_stay, None);
        assert_eq!(summary.most_common_procedure, None);
        assert_eq!(summary.approval, Some(ApprovalCounts { paid: 0, denied: 0 }));
        assert!(summary.unavailable.is_empty());
    }

    #[test]
    fn test_missing_column_only_disables_its_metric() {
        let encounters = df! [ PATIENT_ID => ["P1", "P2"] ].unwrap();
        let claims = df! [ STATUS => ["Paid"] ].unwrap();
        let summary = MetricsSummary::compute(&encounters, &claims);
        assert_eq!(summary.total_patients, Some(2));
        assert_eq!(summary.approval, Some(ApprovalCounts { paid: 1, denied: 0 }));
        assert_eq!(summary.unavailable.len(), 2);
        assert!(summary.unavailable[0].starts_with("Avg. Length of Stay"));
    }
}
