//! Configuration loader for Warden.
//!
//! Reads `config.toml` from the data directory (`~/.warden/` in production),
//! and layers `WARDEN_*` environment overrides on top.
//! A config that exists but cannot be parsed is fatal.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use warden_types::config::{AuditConfig, ConfigError};

/// Token variables, in lookup order.
pub const TOKEN_VARS: [&str; 2] = ["WARDEN_GITHUB_TOKEN", "GITHUB_TOKEN"];

/// Load configuration from `path` and apply environment overrides.
///
/// - Missing file: defaults.
/// - Unreadable or malformed file: [`ConfigError::Read`] / [`ConfigError::Parse`].
///
/// Range checks are left to [`AuditConfig::validate`], which commands that
/// contact the data source run before their first request.
pub async fn load_config(path: &Path) -> Result<AuditConfig, ConfigError> {
    let config = read_config_file(path).await?;
    apply_env_overrides(config, |var| std::env::var(var).ok())
}

/// Parse `path` without overrides or validation.
pub async fn read_config_file(path: &Path) -> Result<AuditConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return Ok(AuditConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<AuditConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.message().to_string(),
    })
}

/// Layer `WARDEN_*` overrides onto `config`. `lookup` resolves a variable
/// name to its value; empty values are ignored.
pub fn apply_env_overrides(
    mut config: AuditConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AuditConfig, ConfigError> {
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(org) = get("WARDEN_ORG") {
        config.organization = org.trim().to_string();
    }
    if let Some(v) = get("WARDEN_FAILURE_THRESHOLD") {
        config.failure_threshold = parse_override("WARDEN_FAILURE_THRESHOLD", &v, "an integer")?;
    }
    if let Some(v) = get("WARDEN_FAILURE_RATE_THRESHOLD") {
        config.failure_rate_threshold =
            parse_override("WARDEN_FAILURE_RATE_THRESHOLD", &v, "a number")?;
    }
    if let Some(v) = get("WARDEN_TIME_WINDOW_DAYS") {
        config.time_window_days = parse_override("WARDEN_TIME_WINDOW_DAYS", &v, "an integer")?;
    }
    if let Some(v) = get("WARDEN_MAX_IN_FLIGHT") {
        config.max_in_flight_requests = parse_override("WARDEN_MAX_IN_FLIGHT", &v, "an integer")?;
    }
    if let Some(v) = get("WARDEN_DRY_RUN") {
        config.dry_run = parse_bool("WARDEN_DRY_RUN", &v)?;
    }
    if let Some(v) = get("WARDEN_BACKUP_DIR") {
        config.backup_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get("WARDEN_API_URL") {
        config.api_base_url = v.trim().trim_end_matches('/').to_string();
    }

    Ok(config)
}

fn parse_override<T: FromStr>(
    var: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        var,
        value: value.to_string(),
        expected,
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            var,
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}

/// Resolve the API token from the process environment.
pub fn resolve_token() -> Result<SecretString, ConfigError> {
    resolve_token_with(|var| std::env::var(var).ok())
}

/// Resolve the API token: `WARDEN_GITHUB_TOKEN`, then `GITHUB_TOKEN`.
pub fn resolve_token_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    TOKEN_VARS
        .iter()
        .find_map(|var| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .inspect(|_| tracing::debug!(source = *var, "API token resolved"))
        })
        .map(SecretString::from)
        .ok_or(ConfigError::MissingCredential { var: TOKEN_VARS[0] })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[tokio::test]
    async fn read_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(&tmp.path().join("config.toml")).await.unwrap();
        assert_eq!(config, AuditConfig::default());
    }

    #[tokio::test]
    async fn read_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
organization = "acme"
failure_threshold = 4
excluded_repositories = ["sandbox"]
safelisted_workflows = ["release.yml"]
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(&path).await.unwrap();
        assert_eq!(config.organization, "acme");
        assert_eq!(config.failure_threshold, 4);
        assert!(config.excluded_repositories.contains("sandbox"));
        assert!(config.safelisted_workflows.contains("release.yml"));
        assert_eq!(config.time_window_days, 7);
    }

    #[tokio::test]
    async fn read_config_invalid_toml_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!").await.unwrap();

        let err = read_config_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("fix the TOML syntax"));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let config = AuditConfig {
            organization: "from-file".to_string(),
            ..Default::default()
        };
        let config = apply_env_overrides(
            config,
            env(&[
                ("WARDEN_ORG", "from-env"),
                ("WARDEN_FAILURE_THRESHOLD", "6"),
                ("WARDEN_FAILURE_RATE_THRESHOLD", "95.5"),
                ("WARDEN_TIME_WINDOW_DAYS", "30"),
                ("WARDEN_MAX_IN_FLIGHT", "2"),
                ("WARDEN_DRY_RUN", "false"),
                ("WARDEN_BACKUP_DIR", "/srv/warden/backups"),
                ("WARDEN_API_URL", "https://ghe.example.com/api/v3/"),
            ]),
        )
        .unwrap();

        assert_eq!(config.organization, "from-env");
        assert_eq!(config.failure_threshold, 6);
        assert!((config.failure_rate_threshold - 95.5).abs() < f64::EPSILON);
        assert_eq!(config.time_window_days, 30);
        assert_eq!(config.max_in_flight_requests, 2);
        assert!(!config.dry_run);
        assert_eq!(config.backup_dir, Some(PathBuf::from("/srv/warden/backups")));
        assert_eq!(config.api_base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn empty_override_is_ignored() {
        let config = apply_env_overrides(AuditConfig::default(), env(&[("WARDEN_ORG", "  ")])).unwrap();
        assert!(config.organization.is_empty());
    }

    #[test]
    fn malformed_override_names_the_variable() {
        let err = apply_env_overrides(
            AuditConfig::default(),
            env(&[("WARDEN_TIME_WINDOW_DAYS", "a week")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                var: "WARDEN_TIME_WINDOW_DAYS",
                ..
            }
        ));

        let err =
            apply_env_overrides(AuditConfig::default(), env(&[("WARDEN_DRY_RUN", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("WARDEN_DRY_RUN"));
    }

    #[tokio::test]
    async fn loaded_config_with_out_of_range_value_fails_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "organization = \"acme\"\nfailure_rate_threshold = 150.0\n")
            .await
            .unwrap();

        let config = read_config_file(&path).await.unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "failure_rate_threshold",
                ..
            }
        ));
    }

    #[test]
    fn token_prefers_warden_variable() {
        let token = resolve_token_with(env(&[
            ("GITHUB_TOKEN", "ghp_generic"),
            ("WARDEN_GITHUB_TOKEN", "ghp_specific"),
        ]))
        .unwrap();
        assert_eq!(token.expose_secret(), "ghp_specific");

        let token = resolve_token_with(env(&[("GITHUB_TOKEN", "ghp_generic")])).unwrap();
        assert_eq!(token.expose_secret(), "ghp_generic");
    }

    #[test]
    fn missing_token_is_a_credential_error() {
        let err = resolve_token_with(env(&[("WARDEN_GITHUB_TOKEN", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
        assert!(err.to_string().contains("WARDEN_GITHUB_TOKEN"));
    }
}
