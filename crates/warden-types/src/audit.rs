//! Audit trail entries.
//!
//! Every lifecycle action (attempted or successful) and every analysis pass
//! is recorded as an [`AuditLogEntry`]. Entries are append-only: once
//! written they are never edited or deleted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Analyze,
    Disable,
    Restore,
    Backup,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Analyze => write!(f, "analyze"),
            AuditAction::Disable => write!(f, "disable"),
            AuditAction::Restore => write!(f, "restore"),
            AuditAction::Backup => write!(f, "backup"),
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analyze" => Ok(AuditAction::Analyze),
            "disable" => Ok(AuditAction::Disable),
            "restore" => Ok(AuditAction::Restore),
            "backup" => Ok(AuditAction::Backup),
            other => Err(format!("invalid audit action: '{other}'")),
        }
    }
}

/// A single append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// UUID v7, so entries sort by creation time.
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Simulated entries written by dry runs.
    #[serde(default)]
    pub dry_run: bool,
}

impl AuditLogEntry {
    /// Start a successful entry for `action`.
    pub fn new(action: AuditAction) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            action,
            repository: None,
            workflow: None,
            details: BTreeMap::new(),
            success: true,
            error: None,
            dry_run: false,
        }
    }

    pub fn workflow(mut self, repository: &str, workflow: &str) -> Self {
        self.repository = Some(repository.to_string());
        self.workflow = Some(workflow.to_string());
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn simulated(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Mark the entry as a failure carrying `error`.
    pub fn failed(mut self, error: impl fmt::Display) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}
