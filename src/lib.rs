pub mod aggregations;
pub mod api;
pub mod charts;
pub mod claims_filter;
pub mod config;
pub mod error;
pub mod generator;
pub mod loader;
pub mod lookup;
pub mod metrics;
pub mod prompt;
pub mod render;
pub mod schema;
pub mod session;

pub use error::{DashboardError, Result, TableKind};
pub use session::Session;
