//! Claims Filter - status and provider selections applied to the claims table.
//!
//! Both filters are plain row masks combined with AND, so the order in which
//! they are applied does not change the result.

use crate::error::{Result, TableKind};
use crate::schema::{self, PATIENT_ID, PROVIDER, STATUS};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sentinel selection that disables a filter.
pub const ALL: &str = "All";

/// One dropdown selection: everything, or a single value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        if value == ALL {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        }
    }
}

impl From<Option<String>> for Selection {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Selection::from).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimsFilter {
    pub status: Selection,
    pub provider: Selection,
}

impl ClaimsFilter {
    pub fn new(status: impl Into<Selection>, provider: impl Into<Selection>) -> Self {
        Self {
            status: status.into(),
            provider: provider.into(),
        }
    }

    /// Apply both selections to `claims`. An empty result is valid.
    pub fn apply(&self, encounters: &DataFrame, claims: &DataFrame) -> Result<DataFrame> {
        let by_status = self.status_mask(claims)?;
        let by_provider = self.provider_mask(encounters, claims)?;
        let mask: BooleanChunked = by_status
            .iter()
            .zip(&by_provider)
            .map(|(s, p)| *s && *p)
            .collect();
        Ok(claims.filter(&mask)?)
    }

    /// Only the status selection.
    pub fn apply_status(&self, claims: &DataFrame) -> Result<DataFrame> {
        let mask: BooleanChunked = self.status_mask(claims)?.into_iter().collect();
        Ok(claims.filter(&mask)?)
    }

    /// Only the provider selection.
    pub fn apply_provider(&self, encounters: &DataFrame, claims: &DataFrame) -> Result<DataFrame> {
        let mask: BooleanChunked = self.provider_mask(encounters, claims)?.into_iter().collect();
        Ok(claims.filter(&mask)?)
    }

    fn status_mask(&self, claims: &DataFrame) -> Result<Vec<bool>> {
        match &self.status {
            Selection::All => Ok(vec![true; claims.height()]),
            Selection::Only(wanted) => {
                let statuses = schema::string_values(claims, TableKind::Claims, STATUS)?;
                Ok(statuses
                    .iter()
                    .map(|s| s.as_deref() == Some(wanted.as_str()))
                    .collect())
            }
        }
    }

    fn provider_mask(&self, encounters: &DataFrame, claims: &DataFrame) -> Result<Vec<bool>> {
        match &self.provider {
            Selection::All => Ok(vec![true; claims.height()]),
            Selection::Only(wanted) => {
                let patients = provider_patients(encounters, wanted)?;
                let claim_patients = schema::string_values(claims, TableKind::Claims, PATIENT_ID)?;
                Ok(claim_patients
                    .iter()
                    .map(|id| id.as_ref().map_or(false, |id| patients.contains(id)))
                    .collect())
            }
        }
    }
}

/// Patient ids seen with `provider` in the encounters table.
pub fn provider_patients(encounters: &DataFrame, provider: &str) -> Result<HashSet<String>> {
    let providers = schema::string_values(encounters, TableKind::Encounters, PROVIDER)?;
    let ids = schema::string_values(encounters, TableKind::Encounters, PATIENT_ID)?;
    Ok(providers
        .into_iter()
        .zip(ids)
        .filter(|(p, _)| p.as_deref() == Some(provider))
        .filter_map(|(_, id)| id)
        .collect())
}

/// Dropdown choices: `All` followed by distinct values in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub statuses: Vec<String>,
    pub providers: Vec<String>,
}

impl FilterOptions {
    pub fn collect(encounters: &DataFrame, claims: &DataFrame) -> Result<Self> {
        let statuses = schema::string_values(claims, TableKind::Claims, STATUS)?;
        let providers = schema::string_values(encounters, TableKind::Encounters, PROVIDER)?;
        Ok(Self {
            statuses: with_all(statuses),
            providers: with_all(providers),
        })
    }
}

fn with_all(values: Vec<Option<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = vec![ALL.to_string()];
    for value in values.into_iter().flatten() {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CLAIM_ID;

    fn encounters() -> DataFrame {
        df! [
            PATIENT_ID => ["P1", "P2", "P3"],
            PROVIDER => ["Dr. Smith", "Dr. Lee", "Dr. Smith"],
        ]
        .unwrap()
    }

    fn claims() -> DataFrame {
        df! [
            CLAIM_ID => ["C1", "C2", "C3", "C4", "C5"],
            PATIENT_ID => [Some("P1"), Some("P2"), Some("P3"), Some("P9"), None],
            STATUS => ["Paid", "Denied", "Denied", "Denied", "Paid"],
        ]
        .unwrap()
    }

    fn claim_ids(df: &DataFrame) -> Vec<String> {
        schema::string_values(df, TableKind::Claims, CLAIM_ID)
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_all_passes_through() {
        let out = ClaimsFilter::default().apply(&encounters(), &claims()).unwrap();
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn test_status_filter() {
        let out = ClaimsFilter::new("Denied", ALL).apply(&encounters(), &claims()).unwrap();
        assert_eq!(claim_ids(&out), vec!["C2", "C3", "C4"]);
    }

    #[test]
    fn test_provider_filter_drops_orphans() {
        let out = ClaimsFilter::new(ALL, "Dr. Smith").apply(&encounters(), &claims()).unwrap();
        assert_eq!(claim_ids(&out), vec!["C1", "C3"]);
    }

    #[test]
    fn test_filters_compose_with_and() {
        let filter = ClaimsFilter::new("Denied", "Dr. Smith");
        let out = filter.apply(&encounters(), &claims()).unwrap();
        assert_eq!(claim_ids(&out), vec!["C3"]);
    }

    #[test]
    fn test_no_rows_is_not_an_error() {
        let out = ClaimsFilter::new("Pending", ALL).apply(&encounters(), &claims()).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), 3);
    }

    #[test]
    fn test_status_filter_does_not_need_provider_column() {
        let bare = df! [ PATIENT_ID => ["P1"] ].unwrap();
        let out = ClaimsFilter::new("Paid", ALL).apply(&bare, &claims()).unwrap();
        assert_eq!(out.height(), 2);
        let err = ClaimsFilter::new(ALL, "Dr. Lee").apply(&bare, &claims()).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_filter_options() {
        let options = FilterOptions::collect(&encounters(), &claims()).unwrap();
        assert_eq!(options.statuses, vec!["All", "Paid", "Denied"]);
        assert_eq!(options.providers, vec!["All", "Dr. Smith", "Dr. Lee"]);
    }

    #[test]
    fn test_selection_from_optional_value() {
        assert_eq!(Selection::from(None), Selection::All);
        assert_eq!(Selection::from(Some("All".to_string())), Selection::All);
        assert_eq!(Selection::from(Some("Paid".to_string())), Selection::Only("Paid".into()));
    }
}
