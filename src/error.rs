use std::fmt;
use thiserror::Error;

/// Which of the two session tables an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Encounters,
    Claims,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Encounters => write!(f, "encounters"),
            TableKind::Claims => write!(f, "claims"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Column '{column}' not found in {table} table")]
    MissingColumn { table: TableKind, column: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl DashboardError {
    pub fn missing_column(table: TableKind, column: &str) -> Self {
        DashboardError::MissingColumn {
            table,
            column: column.to_string(),
        }
    }

    /// True when the error only makes one dashboard step unavailable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DashboardError::MissingColumn { .. })
    }
}

impl From<polars::error::PolarsError> for DashboardError {
    fn from(err: polars::error::PolarsError) -> Self {
        DashboardError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
