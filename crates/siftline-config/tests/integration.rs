//! End-to-end coverage of `siftline_config::load`: YAML parse, environment
//! overrides, and validation, exercised together through the public API
//! rather than through the crate's internal `#[cfg(test)]` units.

use std::io::Write;
use std::sync::Mutex;

use siftline_config::ConfigError;

/// Serializes tests that mutate process environment variables so they don't
/// race each other under the default parallel test runner.
static ENV_LOCK: Mutex<()> = Mutex::new(());

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

fn write_sample(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn load_applies_environment_overrides_for_credentials() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_sample(SAMPLE_YAML);

    // SAFETY: serialized by `ENV_LOCK`, restored before the guard is dropped.
    unsafe {
        std::env::set_var("SIFTLINE_TORRENT_CLIENT__PASS", "from-env");
        std::env::set_var("SIFTLINE_DEEP_STORAGE__EMAIL", "override@example.com");
    }

    let config = siftline_config::load(file.path()).unwrap();
    assert_eq!(config.torrent_client.pass, "from-env");
    assert_eq!(config.deep_storage.email, "override@example.com");
    // Untouched credential fields still come from the file.
    assert_eq!(config.torrent_client.user, "admin");

    unsafe {
        std::env::remove_var("SIFTLINE_TORRENT_CLIENT__PASS");
        std::env::remove_var("SIFTLINE_DEEP_STORAGE__EMAIL");
    }
}

#[test]
fn load_without_overrides_keeps_file_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_sample(SAMPLE_YAML);

    let config = siftline_config::load(file.path()).unwrap();
    assert_eq!(config.torrent_client.pass, "secret");
    assert_eq!(config.deep_storage.email, "bot@example.com");
}

#[test]
fn load_surfaces_validation_failures() {
    let _guard = ENV_LOCK.lock().unwrap();
    let invalid = SAMPLE_YAML.replacen("category_adhoc: adhoc", "category_adhoc: daily", 1);
    let file = write_sample(&invalid);

    let err = siftline_config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { field, .. } if field == "category_adhoc"));
}

#[test]
fn load_surfaces_malformed_yaml_as_parse_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_sample("scraper: [this is not a mapping");

    let err = siftline_config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
