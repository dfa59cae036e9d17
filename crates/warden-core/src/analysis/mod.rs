//! Analysis pass: data source → metrics → classification → issues → report.

pub mod aggregator;
pub mod limiter;

pub use aggregator::Aggregator;
pub use limiter::RequestLimiter;

use chrono::{DateTime, Utc};
use thiserror::Error;
use warden_types::analysis::AnalysisReport;
use warden_types::error::DataSourceError;

/// The report built by one pass.
///
/// `complete` is false when the pass was cancelled; the report then omits
/// every unit that had not finished and must not replace a stored report.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPass {
    pub report: AnalysisReport,
    pub complete: bool,
}

/// Errors that abort an analysis pass.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to list repositories for organization '{organization}': {source}")]
    Enumeration {
        organization: String,
        #[source]
        source: DataSourceError,
    },

    #[error("the data source is rejecting requests: {0}; wait for the quota to reset and re-run")]
    QuotaExhausted(DataSourceError),
}
