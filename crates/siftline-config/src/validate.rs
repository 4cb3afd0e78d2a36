//! Validation rules applied to a loaded [`Config`](crate::model::Config).

use crate::error::ConfigError;
use crate::model::{Config, ProxyMode};

/// Validate cross-field invariants that a plain `serde` deserialisation cannot express.
///
/// # Errors
///
/// Returns an error describing the first invalid field encountered.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper(config)?;
    validate_proxy(config)?;
    validate_torrent_client(config)?;
    Ok(())
}

fn validate_scraper(config: &Config) -> Result<(), ConfigError> {
    let scraper = &config.scraper;
    if !scraper.all_mode && scraper.end_page < scraper.start_page {
        return Err(ConfigError::InvalidField {
            section: "scraper".to_string(),
            field: "end_page".to_string(),
            reason: "must be greater than or equal to start_page unless all_mode is set"
                .to_string(),
        });
    }
    if scraper.base_url.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section: "scraper".to_string(),
            field: "base_url".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if !(0.0..=10.0).contains(&scraper.phase_2_min_rate) {
        return Err(ConfigError::InvalidField {
            section: "scraper".to_string(),
            field: "phase_2_min_rate".to_string(),
            reason: "must be between 0.0 and 10.0".to_string(),
        });
    }
    Ok(())
}

fn validate_proxy(config: &Config) -> Result<(), ConfigError> {
    let proxy = &config.proxy;
    if proxy.mode == ProxyMode::Pool && proxy.pool.is_empty() {
        return Err(ConfigError::InvalidField {
            section: "proxy".to_string(),
            field: "pool".to_string(),
            reason: "must contain at least one proxy when mode is 'pool'".to_string(),
        });
    }
    if proxy.max_failures == 0 {
        return Err(ConfigError::InvalidField {
            section: "proxy".to_string(),
            field: "max_failures".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if proxy.cooldown_seconds == 0 {
        return Err(ConfigError::InvalidField {
            section: "proxy".to_string(),
            field: "cooldown_seconds".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_torrent_client(config: &Config) -> Result<(), ConfigError> {
    let client = &config.torrent_client;
    if client.host.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section: "torrent_client".to_string(),
            field: "host".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if client.category_daily == client.category_adhoc {
        return Err(ConfigError::InvalidField {
            section: "torrent_client".to_string(),
            field: "category_adhoc".to_string(),
            reason: "must differ from category_daily so runs stay distinguishable".to_string(),
        });
    }
    Ok(())
}
