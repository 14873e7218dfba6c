//! Prompt Router - keyword dispatch over a free-text question.
//!
//! This is not language understanding: the text is scanned for an optional
//! `YYYY-MM-DD .. YYYY-MM-DD` range and then checked, in order, against a
//! fixed table of keywords. At most one aggregation runs per prompt.

use crate::aggregations::{self, RankedEntry};
use crate::error::{Result, TableKind};
use crate::schema::{self, SERVICE_DATE};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    static ref DATE_LITERAL: Regex = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    CostlyDiagnoses,
    DenialRate,
}

/// Keywords checked in this order; the first hit wins.
pub const DISPATCH_TABLE: &[(&str, Insight)] = &[
    ("costly", Insight::CostlyDiagnoses),
    ("denial", Insight::DenialRate),
];

impl Insight {
    pub fn title(&self) -> &'static str {
        match self {
            Insight::CostlyDiagnoses => "Most Costly Diagnoses",
            Insight::DenialRate => "CPT Codes with Highest Denial Rate",
        }
    }
}

/// Inclusive service-date window. `start` is the first literal in the text
/// and `end` the second; they are never swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// What a prompt asks for, before any data is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPlan {
    pub date_range: Option<DateRange>,
    pub insight: Option<Insight>,
}

/// Ranked output of the dispatched aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "insight", content = "rows", rename_all = "snake_case")]
pub enum InsightResult {
    CostlyDiagnoses(Vec<RankedEntry<f64>>),
    DenialRate(Vec<RankedEntry<u64>>),
}

impl InsightResult {
    pub fn insight(&self) -> Insight {
        match self {
            InsightResult::CostlyDiagnoses(_) => Insight::CostlyDiagnoses,
            InsightResult::DenialRate(_) => Insight::DenialRate,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InsightResult::CostlyDiagnoses(rows) => rows.len(),
            InsightResult::DenialRate(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exactly two date literals form a range; any other count, or a literal
/// that is not a calendar date, means no restriction.
pub fn extract_date_range(text: &str) -> Option<DateRange> {
    let literals: Vec<&str> = DATE_LITERAL.find_iter(text).map(|m| m.as_str()).collect();
    if literals.len() != 2 {
        return None;
    }
    let start = NaiveDate::parse_from_str(literals[0], "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(literals[1], "%Y-%m-%d").ok()?;
    Some(DateRange { start, end })
}

pub fn match_insight(text: &str) -> Option<Insight> {
    let lowered = text.to_lowercase();
    DISPATCH_TABLE
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, insight)| *insight)
}

pub fn plan(text: &str) -> PromptPlan {
    PromptPlan {
        date_range: extract_date_range(text),
        insight: match_insight(text),
    }
}

/// Claims whose service date falls inside `range`. Missing dates never match.
pub fn restrict_to_range(claims: &DataFrame, range: &DateRange) -> Result<DataFrame> {
    let dates = schema::date_values(claims, TableKind::Claims, SERVICE_DATE)?;
    let mask: BooleanChunked = dates
        .iter()
        .map(|d| d.map_or(false, |d| range.contains(d)))
        .collect();
    Ok(claims.filter(&mask)?)
}

/// Route a prompt: restrict by date when asked, then run at most one
/// aggregation. `Ok(None)` is the neutral "nothing recognised" state.
pub fn answer(claims: &DataFrame, text: &str) -> Result<Option<InsightResult>> {
    let plan = plan(text);
    debug!("Prompt plan: {:?}", plan);

    let Some(insight) = plan.insight else {
        return Ok(None);
    };

    let scoped;
    let claims = match &plan.date_range {
        Some(range) => {
            scoped = restrict_to_range(claims, range)?;
            &scoped
        }
        None => claims,
    };

    let result = match insight {
        Insight::CostlyDiagnoses => InsightResult::CostlyDiagnoses(aggregations::costly_diagnoses(claims)?),
        Insight::DenialRate => InsightResult::DenialRate(aggregations::denial_rate(claims)?),
    };
    Ok(Some(result))
}
