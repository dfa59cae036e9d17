//! Configuration types for Warden.
//!
//! `AuditConfig` represents `config.toml` after environment overrides have
//! been layered on. It is assembled once at startup and passed explicitly
//! into every component; nothing reads ambient configuration on its own.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration.
///
/// Loaded from `~/.warden/config.toml`. Every field except `organization`
/// has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Organization whose repositories are audited.
    pub organization: String,
    /// Consecutive failures (and minimum run count) that flag a workflow.
    pub failure_threshold: u32,
    /// Failure-rate percentage that flags a workflow.
    pub failure_rate_threshold: f64,
    /// Only runs created within this many days are examined.
    pub time_window_days: u32,
    /// Repository names skipped entirely.
    pub excluded_repositories: BTreeSet<String>,
    /// Workflow file names that are never disabled.
    pub safelisted_workflows: BTreeSet<String>,
    /// Upper bound on concurrent data source requests.
    pub max_in_flight_requests: usize,
    /// Whether `disable`/`restore` simulate unless told otherwise.
    pub dry_run: bool,
    /// Where workflow backups are written. Defaults to `<data_dir>/backups`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    /// Retries for transient data source failures.
    pub max_retries: u32,
    /// Remaining-quota level below which a warning is logged.
    pub quota_safety_margin: u32,
    pub max_runs_per_workflow: u32,
    pub include_archived: bool,
    /// End a consecutive-failure streak at a cancelled/skipped run instead
    /// of passing over it.
    pub cancelled_breaks_streak: bool,
    pub api_base_url: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            failure_threshold: 3,
            failure_rate_threshold: 80.0,
            time_window_days: 7,
            excluded_repositories: BTreeSet::new(),
            safelisted_workflows: BTreeSet::new(),
            max_in_flight_requests: 5,
            dry_run: true,
            backup_dir: None,
            request_timeout_secs: 30,
            max_retries: 2,
            quota_safety_margin: 100,
            max_runs_per_workflow: 100,
            include_archived: false,
            cancelled_breaks_streak: false,
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

impl AuditConfig {
    /// Reject values that would make a pass meaningless. Runs before any
    /// data source call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization.trim().is_empty() {
            return Err(ConfigError::MissingOrganization);
        }
        if self.failure_threshold < 1 {
            return Err(ConfigError::OutOfRange {
                field: "failure_threshold",
                value: self.failure_threshold.to_string(),
                expected: "an integer >= 1",
            });
        }
        if !(0.0..=100.0).contains(&self.failure_rate_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "failure_rate_threshold",
                value: self.failure_rate_threshold.to_string(),
                expected: "a percentage between 0 and 100",
            });
        }
        if self.time_window_days < 1 {
            return Err(ConfigError::OutOfRange {
                field: "time_window_days",
                value: self.time_window_days.to_string(),
                expected: "an integer >= 1",
            });
        }
        if self.max_in_flight_requests < 1 {
            return Err(ConfigError::OutOfRange {
                field: "max_in_flight_requests",
                value: self.max_in_flight_requests.to_string(),
                expected: "an integer >= 1",
            });
        }
        if self.request_timeout_secs < 1 {
            return Err(ConfigError::OutOfRange {
                field: "request_timeout_secs",
                value: self.request_timeout_secs.to_string(),
                expected: "an integer >= 1",
            });
        }
        Ok(())
    }
}

/// Fatal configuration problems. Each message ends with a remediation hint.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no organization configured; set `organization` in config.toml or WARDEN_ORG")]
    MissingOrganization,

    #[error("no API token found; export {var} with a token that can read the organization's workflows")]
    MissingCredential { var: &'static str },

    #[error("{field} = {value} is out of range; expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid value '{value}' for {var}; expected {expected}")]
    InvalidOverride {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read {path}: {message}; check the file exists and is readable")]
    Read { path: String, message: String },

    #[error("invalid config at {path}: {message}; fix the TOML syntax or remove the file to use defaults")]
    Parse { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AuditConfig {
        AuditConfig {
            organization: "acme".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_values() {
        let config = AuditConfig::default();
        assert_eq!(config.failure_threshold, 3);
        assert!((config.failure_rate_threshold - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.time_window_days, 7);
        assert_eq!(config.max_in_flight_requests, 5);
        assert!(config.dry_run);
        assert!(!config.cancelled_breaks_streak);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AuditConfig = toml::from_str("organization = \"acme\"").unwrap();
        assert_eq!(config.organization, "acme");
        assert_eq!(config.failure_threshold, 3);
        assert!(config.safelisted_workflows.is_empty());
    }

    #[test]
    fn test_deserialize_with_values() {
        let toml_str = r#"
organization = "acme"
failure_threshold = 5
failure_rate_threshold = 90.5
time_window_days = 14
excluded_repositories = ["sandbox", "archive"]
safelisted_workflows = ["release.yml"]
max_in_flight_requests = 8
dry_run = false
"#;
        let config: AuditConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.failure_threshold, 5);
        assert!((config.failure_rate_threshold - 90.5).abs() < f64::EPSILON);
        assert_eq!(config.time_window_days, 14);
        assert!(config.excluded_repositories.contains("sandbox"));
        assert!(config.safelisted_workflows.contains("release.yml"));
        assert_eq!(config.max_in_flight_requests, 8);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_validate_accepts_defaults_with_org() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_organization() {
        let err = AuditConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingOrganization));
        assert!(err.to_string().contains("WARDEN_ORG"));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = valid();
        config.failure_threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "failure_threshold", .. })
        ));

        let mut config = valid();
        config.failure_rate_threshold = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "failure_rate_threshold", .. })
        ));

        let mut config = valid();
        config.time_window_days = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.max_in_flight_requests = 0;
        assert!(config.validate().is_err());
    }
}
