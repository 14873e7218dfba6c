//! Visualization adapters - turn the session tables into chart specs a
//! front end can draw directly.

use crate::aggregations::{rank_groups, VALUE};
use crate::error::{Result, TableKind};
use crate::loader::date_expr;
use crate::schema::{
    self, BILLED_AMOUNT, DIAGNOSIS_CODE, DIAGNOSIS_DESCRIPTION, MONTH, PAID_AMOUNT, PATIENT_ID,
    PROVIDER, SERVICE_DATE, STATUS,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

const TOP_DIAGNOSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    GroupedBar,
    Line,
    Heatmap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// One chart. For heatmaps `categories` are the rows and each series is a
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// All dashboard charts, each one independently available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSet {
    pub charts: Vec<ChartSpec>,
    pub unavailable: Vec<String>,
}

impl ChartSet {
    pub fn build(encounters: &DataFrame, claims: &DataFrame) -> Self {
        let attempts = [
            ("Claim status summary", status_summary(claims)),
            ("Top diagnoses", top_diagnoses(encounters)),
            ("Claims by provider", claims_by_provider(encounters, claims)),
            ("Monthly trends", monthly_trends(claims)),
            ("Diagnosis heatmap", diagnosis_status_heatmap(encounters, claims)),
        ];

        let mut charts = Vec::new();
        let mut unavailable = Vec::new();
        for (name, attempt) in attempts {
            match attempt {
                Ok(chart) => charts.push(chart),
                Err(e) => {
                    warn!("Chart '{}' unavailable: {}", name, e);
                    unavailable.push(format!("{}: {}", name, e));
                }
            }
        }
        Self { charts, unavailable }
    }
}

/// Mean billed and paid amount per claim status.
pub fn status_summary(claims: &DataFrame) -> Result<ChartSpec> {
    schema::require_all(claims, TableKind::Claims, &[STATUS, BILLED_AMOUNT, PAID_AMOUNT])?;
    let mean = |name: &str| col(name).cast(DataType::Float64).mean().fill_null(lit(0.0));
    let grouped = sorted_groups(
        claims.clone().lazy(),
        STATUS,
        [mean(BILLED_AMOUNT), mean(PAID_AMOUNT)],
    )?;

    Ok(ChartSpec {
        kind: ChartKind::GroupedBar,
        title: "Average Billed vs Paid by Claim Status".to_string(),
        x_label: STATUS.to_string(),
        y_label: "Average Amount".to_string(),
        categories: categories(&grouped, TableKind::Claims, STATUS)?,
        series: vec![
            amount_series(&grouped, BILLED_AMOUNT)?,
            amount_series(&grouped, PAID_AMOUNT)?,
        ],
    })
}

/// The ten most frequent diagnosis descriptions.
pub fn top_diagnoses(encounters: &DataFrame) -> Result<ChartSpec> {
    schema::require(encounters, TableKind::Encounters, DIAGNOSIS_DESCRIPTION)?;
    let ranked = rank_groups(encounters.clone().lazy(), DIAGNOSIS_DESCRIPTION, len(), TOP_DIAGNOSES)?;
    let counts = schema::float_values(&ranked, TableKind::Encounters, VALUE)?;

    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: "Top 10 Diagnoses".to_string(),
        x_label: "Diagnosis".to_string(),
        y_label: "Count".to_string(),
        categories: categories(&ranked, TableKind::Encounters, DIAGNOSIS_DESCRIPTION)?,
        series: vec![ChartSeries {
            name: "Count".to_string(),
            values: counts.into_iter().map(|c| c.unwrap_or(0.0)).collect(),
        }],
    })
}

/// Total billed and paid per provider over encounters joined to claims.
pub fn claims_by_provider(encounters: &DataFrame, claims: &DataFrame) -> Result<ChartSpec> {
    schema::require_all(encounters, TableKind::Encounters, &[PATIENT_ID, PROVIDER])?;
    schema::require_all(claims, TableKind::Claims, &[PATIENT_ID, BILLED_AMOUNT, PAID_AMOUNT])?;

    let joined = join_on_patient(
        encounters.select([PATIENT_ID, PROVIDER])?,
        claims.select([PATIENT_ID, BILLED_AMOUNT, PAID_AMOUNT])?,
        JoinType::Inner,
    )?;
    let totals = sorted_groups(joined.lazy(), PROVIDER, [total(BILLED_AMOUNT), total(PAID_AMOUNT)])?;

    Ok(ChartSpec {
        kind: ChartKind::GroupedBar,
        title: "Claims Summary by Provider".to_string(),
        x_label: PROVIDER.to_string(),
        y_label: "Total Amount".to_string(),
        categories: categories(&totals, TableKind::Encounters, PROVIDER)?,
        series: vec![
            amount_series(&totals, BILLED_AMOUNT)?,
            amount_series(&totals, PAID_AMOUNT)?,
        ],
    })
}

/// Append the `YYYY-MM` service month to `claims`. Rows without a service
/// date get a null month.
pub fn with_month_label(claims: &DataFrame) -> Result<DataFrame> {
    let service_date = schema::require(claims, TableKind::Claims, SERVICE_DATE)?;
    let date = match service_date.dtype() {
        DataType::Date => col(SERVICE_DATE),
        _ => date_expr(SERVICE_DATE),
    };
    let labelled = claims
        .clone()
        .lazy()
        .with_column(date.dt().strftime("%Y-%m").alias(MONTH))
        .collect()?;
    Ok(labelled)
}

/// Billed vs paid totals per service month.
pub fn monthly_trends(claims: &DataFrame) -> Result<ChartSpec> {
    schema::require_all(claims, TableKind::Claims, &[SERVICE_DATE, BILLED_AMOUNT, PAID_AMOUNT])?;
    let labelled = with_month_label(claims)?;
    let totals = sorted_groups(labelled.lazy(), MONTH, [total(BILLED_AMOUNT), total(PAID_AMOUNT)])?;

    Ok(ChartSpec {
        kind: ChartKind::Line,
        title: "Monthly Billed vs Paid Amount".to_string(),
        x_label: MONTH.to_string(),
        y_label: "Total Amount".to_string(),
        categories: categories(&totals, TableKind::Claims, MONTH)?,
        series: vec![
            amount_series(&totals, BILLED_AMOUNT)?,
            amount_series(&totals, PAID_AMOUNT)?,
        ],
    })
}

/// Mean billed amount by diagnosis code (rows) and claim status (columns),
/// for the ten most frequent diagnosis codes. Empty cells are 0.
pub fn diagnosis_status_heatmap(encounters: &DataFrame, claims: &DataFrame) -> Result<ChartSpec> {
    schema::require_all(encounters, TableKind::Encounters, &[PATIENT_ID, DIAGNOSIS_CODE])?;
    schema::require_all(claims, TableKind::Claims, &[PATIENT_ID, STATUS, BILLED_AMOUNT])?;

    let top_codes = rank_groups(encounters.clone().lazy(), DIAGNOSIS_CODE, len(), TOP_DIAGNOSES)?
        .select([DIAGNOSIS_CODE])?;
    let top_encounters = encounters
        .clone()
        .lazy()
        .select([col(PATIENT_ID), col(DIAGNOSIS_CODE).cast(DataType::String)])
        .join(
            top_codes.lazy(),
            [col(DIAGNOSIS_CODE)],
            [col(DIAGNOSIS_CODE)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    let cells = join_on_patient(
        top_encounters,
        claims.select([PATIENT_ID, STATUS, BILLED_AMOUNT])?,
        JoinType::Left,
    )?
    .lazy()
    .filter(col(STATUS).is_not_null())
    .group_by([col(DIAGNOSIS_CODE), col(STATUS).cast(DataType::String)])
    .agg([col(BILLED_AMOUNT)
        .cast(DataType::Float64)
        .mean()
        .fill_null(lit(0.0))
        .alias(VALUE)])
    .sort_by_exprs([col(DIAGNOSIS_CODE), col(STATUS)], SortMultipleOptions::default())
    .collect()?;

    let codes = schema::string_values(&cells, TableKind::Encounters, DIAGNOSIS_CODE)?;
    let statuses = schema::string_values(&cells, TableKind::Claims, STATUS)?;
    let means = schema::float_values(&cells, TableKind::Claims, VALUE)?;

    // Lay the long (code, status, mean) rows out as a sorted grid.
    let mut grid: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut rows = BTreeSet::new();
    let mut columns = BTreeSet::new();
    for ((code, status), mean) in codes.into_iter().zip(statuses).zip(means) {
        if let (Some(code), Some(status)) = (code, status) {
            rows.insert(code.clone());
            columns.insert(status.clone());
            grid.insert((code, status), mean.unwrap_or(0.0));
        }
    }

    let series = columns
        .iter()
        .map(|status| ChartSeries {
            name: status.clone(),
            values: rows
                .iter()
                .map(|code| {
                    grid.get(&(code.clone(), status.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect(),
        })
        .collect();

    Ok(ChartSpec {
        kind: ChartKind::Heatmap,
        title: "Avg. Billed by Diagnosis & Claim Status".to_string(),
        x_label: "Claim Status".to_string(),
        y_label: "Diagnosis Code".to_string(),
        categories: rows.into_iter().collect(),
        series,
    })
}

/// Group by the text of `key`, dropping null keys, with groups sorted by key.
fn sorted_groups<E: AsRef<[Expr]>>(lf: LazyFrame, key: &str, aggs: E) -> Result<DataFrame> {
    let grouped = lf
        .filter(col(key).is_not_null())
        .group_by([col(key).cast(DataType::String)])
        .agg(aggs)
        .sort_by_exprs([col(key)], SortMultipleOptions::default())
        .collect()?;
    Ok(grouped)
}

fn total(name: &str) -> Expr {
    col(name).cast(DataType::Float64).sum()
}

fn categories(df: &DataFrame, table: TableKind, key: &str) -> Result<Vec<String>> {
    Ok(schema::string_values(df, table, key)?.into_iter().flatten().collect())
}

fn amount_series(df: &DataFrame, name: &str) -> Result<ChartSeries> {
    let values = schema::float_values(df, TableKind::Claims, name)?;
    Ok(ChartSeries {
        name: name.to_string(),
        values: values.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
    })
}

/// Join on `Patient_ID`, compared as text on both sides.
fn join_on_patient(left: DataFrame, right: DataFrame, how: JoinType) -> Result<DataFrame> {
    let key = || col(PATIENT_ID).cast(DataType::String);
    let joined = left
        .lazy()
        .with_column(key())
        .join(
            right.lazy().with_column(key()),
            [col(PATIENT_ID)],
            [col(PATIENT_ID)],
            JoinArgs::new(how),
        )
        .collect()?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_claims_csv, load_encounters_csv};

    const ENCOUNTERS: &str = "\
Patient_ID,Provider,Diagnosis_Code,Diagnosis_Description
P1,Dr. Smith,I10,Essential (primary) hypertension
P2,Dr. Lee,E11,Type 2 diabetes mellitus
P3,Dr. Smith,I10,Essential (primary) hypertension
P4,Dr. Patel,J45,Asthma
";

    const CLAIMS: &str = "\
Claim_ID,Patient_ID,Service_Date,Billed_Amount,Paid_Amount,Status
C1,P1,2024-01-05,500,400,Paid
C2,P2,2024-01-20,800,0,Denied
C3,P3,2024-02-11,300,100,Paid
C4,P9,2024-02-28,1000,0,Pending
C5,P1,,200,50,Denied
";

    fn tables() -> (DataFrame, DataFrame) {
        (
            load_encounters_csv(ENCOUNTERS.as_bytes()).unwrap(),
            load_claims_csv(CLAIMS.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_status_summary_means() {
        let (_, claims) = tables();
        let chart = status_summary(&claims).unwrap();
        assert_eq!(chart.kind, ChartKind::GroupedBar);
        assert_eq!(chart.categories, vec!["Denied", "Paid", "Pending"]);
        assert_eq!(chart.series[0].values, vec![500.0, 400.0, 1000.0]);
        assert_eq!(chart.series[1].values, vec![25.0, 250.0, 0.0]);
    }

    #[test]
    fn test_top_diagnoses_counts() {
        let (encounters, _) = tables();
        let chart = top_diagnoses(&encounters).unwrap();
        assert_eq!(chart.categories[0], "Essential (primary) hypertension");
        assert_eq!(chart.series[0].values, vec![2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_claims_by_provider_skips_orphans() {
        let (encounters, claims) = tables();
        let chart = claims_by_provider(&encounters, &claims).unwrap();
        assert_eq!(chart.categories, vec!["Dr. Lee", "Dr. Smith"]);
        assert_eq!(chart.series[0].values, vec![800.0, 1000.0]);
        assert_eq!(chart.series[1].values, vec![0.0, 550.0]);
    }

    #[test]
    fn test_month_label_is_appended() {
        let (_, claims) = tables();
        let labelled = with_month_label(&claims).unwrap();
        assert_eq!(labelled.width(), claims.width() + 1);
        assert_eq!(labelled.height(), claims.height());
        let months = schema::string_values(&labelled, TableKind::Claims, MONTH).unwrap();
        assert_eq!(months[0].as_deref(), Some("2024-01"));
        assert_eq!(months[4], None);
    }

    #[test]
    fn test_monthly_trends() {
        let (_, claims) = tables();
        let chart = monthly_trends(&claims).unwrap();
        assert_eq!(chart.categories, vec!["2024-01", "2024-02"]);
        assert_eq!(chart.series[0].values, vec![1300.0, 1300.0]);
        assert_eq!(chart.series[1].values, vec![400.0, 100.0]);
    }

    #[test]
    fn test_heatmap_fills_missing_cells() {
        let (encounters, claims) = tables();
        let chart = diagnosis_status_heatmap(&encounters, &claims).unwrap();
        // J45 (P4) has no claims, so it drops out of the grid
        assert_eq!(chart.categories, vec!["E11", "I10"]);
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Denied", "Paid"]);
        assert_eq!(chart.series[0].values, vec![800.0, 200.0]);
        assert_eq!(chart.series[1].values, vec![0.0, 400.0]);
    }

    #[test]
    fn test_chart_set_reports_unavailable_charts() {
        let (encounters, _) = tables();
        let claims = df! [ "Claim_ID" => ["C1"] ].unwrap();
        let set = ChartSet::build(&encounters, &claims);
        assert_eq!(set.charts.len(), 1);
        assert_eq!(set.unavailable.len(), 4);
    }
}
