//! Data Loader - parses encounter and claim CSV payloads into DataFrames
//!
//! Parsing goes through the polars CSV reader with a full inference pass.
//! Identifier and code columns ("..._ID", "..._Code", `Provider`, `Status`)
//! are pinned to `String` so codes such as `01996` keep their text. Date
//! columns ("...Date", `DOB`) are read as text and converted to `Date`
//! non-strictly: a cell in no accepted format becomes null.
//!
//! The only fatal failures are undecodable input and a missing header row.

use crate::error::{DashboardError, Result, TableKind};
use crate::schema;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a single date cell. Returns `None` for anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    None
}

pub fn load_encounters_csv(bytes: &[u8]) -> Result<DataFrame> {
    read_table(bytes, TableKind::Encounters)
}

pub fn load_claims_csv(bytes: &[u8]) -> Result<DataFrame> {
    read_table(bytes, TableKind::Claims)
}

pub fn load_encounters_file(path: impl AsRef<Path>) -> Result<DataFrame> {
    let bytes = read_file(path.as_ref())?;
    load_encounters_csv(&bytes)
}

pub fn load_claims_file(path: impl AsRef<Path>) -> Result<DataFrame> {
    let bytes = read_file(path.as_ref())?;
    load_claims_csv(&bytes)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| DashboardError::Load(format!("Failed to read {}: {}", path.display(), e)))
}

fn read_table(bytes: &[u8], table: TableKind) -> Result<DataFrame> {
    std::str::from_utf8(bytes)
        .map_err(|e| DashboardError::Load(format!("{} CSV is not valid UTF-8: {}", table, e)))?;

    let headers = read_headers(bytes, table)?;

    // Pin text columns by their raw header name. Only names present in the
    // header go into the overwrite, so polars never falls back to matching
    // by position.
    let mut overwrite = Schema::new();
    for raw in &headers {
        let name = raw.trim();
        if schema::is_text_column(name) || schema::is_date_column(name) {
            overwrite.with_column(raw.as_str().into(), DataType::String);
        }
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| {
            opts.with_missing_is_null(true)
                .with_truncate_ragged_lines(true)
        })
        .with_schema_overwrite(Some(Arc::new(overwrite)))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| DashboardError::Load(format!("Failed to parse {} CSV: {}", table, e)))?;

    for raw in &headers {
        let name = raw.trim();
        if name != raw.as_str() {
            df.rename(raw, name)?;
        }
    }

    let date_columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| schema::is_date_column(name))
        .map(str::to_string)
        .collect();
    let df = parse_date_columns(df, &date_columns)?;

    info!("Loaded {} table: {} rows, {} columns", table, df.height(), df.width());
    Ok(df)
}

fn read_headers(bytes: &[u8], table: TableKind) -> Result<Vec<String>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = rdr
        .headers()
        .map_err(|e| DashboardError::Load(format!("Failed to read {} CSV headers: {}", table, e)))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DashboardError::Load(format!("{} CSV has no header row", table)));
    }
    Ok(headers)
}

/// Convert text date columns to `Date`, trying each accepted format in turn.
fn parse_date_columns(df: DataFrame, names: &[String]) -> Result<DataFrame> {
    if names.is_empty() {
        return Ok(df);
    }
    let before: Vec<usize> = names
        .iter()
        .map(|name| df.column(name).map(|s| s.null_count()))
        .collect::<PolarsResult<_>>()?;

    let exprs: Vec<Expr> = names.iter().map(|name| date_expr(name)).collect();
    let df = df.lazy().with_columns(exprs).collect()?;

    for (name, nulls) in names.iter().zip(before) {
        let dropped = df.column(name)?.null_count() - nulls;
        if dropped > 0 {
            debug!("Column {}: {} cells did not parse as dates", name, dropped);
        }
    }
    Ok(df)
}

pub(crate) fn date_expr(name: &str) -> Expr {
    let text = || col(name).cast(DataType::String).str();
    let mut attempts: Vec<Expr> = DATE_FORMATS
        .iter()
        .map(|format| text().to_date(lenient(format)))
        .collect();
    attempts.extend(DATETIME_FORMATS.iter().map(|format| {
        text()
            .to_datetime(Some(TimeUnit::Microseconds), None, lenient(format), lit("raise"))
            .cast(DataType::Date)
    }));
    coalesce(&attempts).alias(name)
}

fn lenient(format: &str) -> StrptimeOptions {
    StrptimeOptions {
        format: Some(format.to_string()),
        strict: false,
        exact: true,
        cache: true,
    }
}
