//! Session - one loaded pair of encounter and claim tables.
//!
//! A session is replaced wholesale when a new pair of files is loaded; the
//! tables are never modified in place.

use crate::charts::ChartSet;
use crate::claims_filter::{ClaimsFilter, FilterOptions};
use crate::error::Result;
use crate::loader;
use crate::lookup::{self, CodeMatches};
use crate::metrics::MetricsSummary;
use crate::prompt::{self, InsightResult};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Session {
    pub encounters: DataFrame,
    pub claims: DataFrame,
    pub loaded_at: DateTime<Utc>,
}

impl Session {
    pub fn new(encounters: DataFrame, claims: DataFrame) -> Self {
        Self {
            encounters,
            claims,
            loaded_at: Utc::now(),
        }
    }

    /// Load both files. Either failing fails the whole load.
    pub fn load_files(encounters: impl AsRef<Path>, claims: impl AsRef<Path>) -> Result<Self> {
        info!(
            "Loading session from {} and {}",
            encounters.as_ref().display(),
            claims.as_ref().display()
        );
        let encounters = loader::load_encounters_file(encounters)?;
        let claims = loader::load_claims_file(claims)?;
        Ok(Self::new(encounters, claims))
    }

    pub fn from_csv_bytes(encounters: &[u8], claims: &[u8]) -> Result<Self> {
        let encounters = loader::load_encounters_csv(encounters)?;
        let claims = loader::load_claims_csv(claims)?;
        Ok(Self::new(encounters, claims))
    }

    pub fn metrics(&self) -> MetricsSummary {
        MetricsSummary::compute(&self.encounters, &self.claims)
    }

    pub fn lookup(&self, query: &str) -> Result<Option<CodeMatches>> {
        lookup::lookup_codes(&self.encounters, query)
    }

    pub fn filter_options(&self) -> Result<FilterOptions> {
        FilterOptions::collect(&self.encounters, &self.claims)
    }

    pub fn filter_claims(&self, filter: &ClaimsFilter) -> Result<DataFrame> {
        filter.apply(&self.encounters, &self.claims)
    }

    pub fn ask(&self, prompt: &str) -> Result<Option<InsightResult>> {
        prompt::answer(&self.claims, prompt)
    }

    pub fn charts(&self) -> ChartSet {
        ChartSet::build(&self.encounters, &self.claims)
    }
}
