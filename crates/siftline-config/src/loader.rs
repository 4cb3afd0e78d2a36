//! YAML configuration loading with environment variable overrides.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;
use crate::validate;

/// Environment variable prefix recognised for scalar overrides, e.g.
/// `SIFTLINE_TORRENT_CLIENT__PASS`.
const ENV_PREFIX: &str = "SIFTLINE_";

/// Credential fields eligible for environment override, keyed by suffix.
const OVERRIDE_KEYS: [&str; 4] = [
    "TORRENT_CLIENT__PASS",
    "TORRENT_CLIENT__USER",
    "DEEP_STORAGE__PASS",
    "DEEP_STORAGE__EMAIL",
];

/// Load configuration from a YAML file, apply environment overrides, and validate it.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse as valid YAML,
/// carries an unparsable environment override, or fails validation.
pub fn load(path: &Path) -> ConfigResult<Config> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    apply_overrides(&mut config, &collect_env_overrides()?);
    validate::validate(&config)?;
    Ok(config)
}

fn collect_env_overrides() -> ConfigResult<HashMap<&'static str, String>> {
    let mut overrides = HashMap::new();
    for suffix in OVERRIDE_KEYS {
        let key = format!("{ENV_PREFIX}{suffix}");
        match env::var(&key) {
            Ok(value) if !value.is_empty() => {
                overrides.insert(suffix, value);
            }
            Ok(_) | Err(env::VarError::NotPresent) => {}
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::InvalidEnvOverride {
                    var: key,
                    reason: "value is not valid UTF-8".to_string(),
                });
            }
        }
    }
    Ok(overrides)
}

/// Apply a small, explicit set of secret-bearing overrides.
///
/// Credentials are the only fields expected to move between deployments
/// without touching the checked-in YAML file; everything else belongs in the
/// file so a run's behavior is fully reconstructable from it.
fn apply_overrides(config: &mut Config, overrides: &HashMap<&'static str, String>) {
    if let Some(value) = overrides.get("TORRENT_CLIENT__PASS") {
        config.torrent_client.pass = value.clone();
    }
    if let Some(value) = overrides.get("TORRENT_CLIENT__USER") {
        config.torrent_client.user = value.clone();
    }
    if let Some(value) = overrides.get("DEEP_STORAGE__PASS") {
        config.deep_storage.pass = value.clone();
    }
    if let Some(value) = overrides.get("DEEP_STORAGE__EMAIL") {
        config.deep_storage.email = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r"
scraper:
  end_page: 10
  base_url: https://catalog.example
proxy:
  mode: single
  cooldown_seconds: 1800
  max_failures: 3
bypass:
  enabled: false
  service_port: 8080
torrent_client:
  host: localhost
  port: 8081
  user: admin
  pass: secret
  category_daily: daily
  category_adhoc: adhoc
  save_path: /downloads
  auto_start: true
  skip_checking: false
history:
  path: reports/parsed_movies_history.csv
deep_storage:
  email: bot@example.com
  pass: secret
";

    #[test]
    fn loads_and_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.scraper.start_page, 1);
        assert_eq!(config.scraper.phase_2_min_comments, 80);
        assert_eq!(config.torrent_client.request_timeout_ms, 10_000);
    }

    #[test]
    fn missing_file_produces_read_error() {
        let err = load(Path::new("/nonexistent/siftline.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn override_replaces_credential_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();
        let mut config = load(file.path()).unwrap();

        let mut overrides = HashMap::new();
        overrides.insert("TORRENT_CLIENT__PASS", "overridden".to_string());
        apply_overrides(&mut config, &overrides);

        assert_eq!(config.torrent_client.pass, "overridden");
    }
}
