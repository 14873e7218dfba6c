//! Rendering helpers shared by the CLI and the HTTP API.

use crate::error::Result;
use crate::metrics::MetricsSummary;
use crate::prompt::InsightResult;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde_json::{json, Map, Value};

/// DataFrame rows as JSON objects keyed by column name. Dates render as
/// `YYYY-MM-DD`, nulls as JSON null.
pub fn frame_to_json(df: &DataFrame) -> Result<Vec<Value>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = Map::new();
        for series in columns {
            row.insert(series.name().to_string(), any_value_to_json(series.get(idx)?));
        }
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::Int32(i) => json!(i),
        AnyValue::Int64(i) => json!(i),
        AnyValue::UInt32(i) => json!(i),
        AnyValue::UInt64(i) => json!(i),
        AnyValue::Float32(f) => json!(f),
        AnyValue::Float64(f) => json!(f),
        AnyValue::Date(days) => Value::String(days_to_date(days).format("%Y-%m-%d").to_string()),
        other => Value::String(other.to_string()),
    }
}

fn days_to_date(days: i32) -> NaiveDate {
    NaiveDate::default() + Duration::days(days as i64)
}

/// Frame plus row count, the shape every table-valued API response uses.
pub fn table_json(df: &DataFrame) -> Result<Value> {
    Ok(json!({
        "row_count": df.height(),
        "columns": df.get_column_names(),
        "rows": frame_to_json(df)?,
    }))
}

/// The four metric tiles as label/value lines.
pub fn metrics_lines(summary: &MetricsSummary) -> Vec<(String, String)> {
    let undefined = || "n/a".to_string();
    vec![
        (
            "Total Patients".to_string(),
            summary.total_patients.map_or_else(undefined, |v| v.to_string()),
        ),
        (
            "Avg. Length of Stay".to_string(),
            summary.avg_length_of_stay.map_or_else(undefined, |v| format!("{:.2}", v)),
        ),
        (
            "Most Common Procedure".to_string(),
            summary.most_common_procedure.clone().unwrap_or_else(undefined),
        ),
        (
            "Approval Ratio".to_string(),
            summary.approval.map_or_else(undefined, |a| a.to_string()),
        ),
    ]
}

pub fn insight_lines(result: &InsightResult) -> Vec<String> {
    match result {
        InsightResult::CostlyDiagnoses(rows) => rows
            .iter()
            .map(|e| format!("{:<10} {:>14.2}", e.key, e.value))
            .collect(),
        InsightResult::DenialRate(rows) => rows
            .iter()
            .map(|e| format!("{:<10} {:>14}", e.key, e.value))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_claims_csv;

    #[test]
    fn test_days_to_date_epoch() {
        assert_eq!(days_to_date(0), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(days_to_date(19723), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_frame_to_json_renders_dates_and_nulls() {
        let claims = load_claims_csv(b"Claim_ID,Service_Date,Billed_Amount\nC1,2024-01-01,500\nC2,,\n").unwrap();
        let rows = frame_to_json(&claims).unwrap();
        assert_eq!(rows[0], json!({"Claim_ID": "C1", "Service_Date": "2024-01-01", "Billed_Amount": 500}));
        assert_eq!(rows[1]["Service_Date"], Value::Null);
        assert_eq!(rows[1]["Billed_Amount"], Value::Null);
    }

    #[test]
    fn test_metrics_lines_mark_undefined_values() {
        let summary = MetricsSummary {
            total_patients: Some(0),
            avg_length_of_stay: None,
            most_common_procedure: None,
            approval: None,
            unavailable: vec![],
        };
        let lines = metrics_lines(&summary);
        assert_eq!(lines[0].1, "0");
        assert_eq!(lines[1].1, "n/a");
        assert_eq!(lines[3].1, "n/a");
    }
}
