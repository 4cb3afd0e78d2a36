//! Proxy selection and ban tracking (C1).

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use siftline_config::{ProxyConfig, ProxyMode, ProxyModule};
use siftline_core::{BanRecord, FailureKind, IngestError, IngestResult};

use crate::ledger;
use crate::model::{ProxyEntry, ProxySelection, ProxyStats};

struct PoolState {
    mode: ProxyMode,
    entries: Vec<ProxyEntry>,
    modules: Vec<ProxyModule>,
    max_failures: u32,
    cooldown: chrono::Duration,
    ban_delta: Vec<BanRecord>,
}

impl PoolState {
    fn applies_to(&self, module: ProxyModule) -> bool {
        self.modules.contains(&ProxyModule::All) || self.modules.contains(&module)
    }
}

/// A pool of outbound proxies, guarded by a single mutex (§4.1).
///
/// Selection and failure reporting are totally ordered against each other:
/// both take the same lock, so two racing failure reports for one proxy
/// cannot both append a ban record.
pub struct ProxyPool {
    state: Mutex<PoolState>,
    ledger_path: PathBuf,
}

impl ProxyPool {
    /// Construct a pool from configuration, seeding ban state from the
    /// persisted ledger.
    ///
    /// # Errors
    /// Returns an error if the ledger file exists but cannot be read.
    pub fn new(config: &ProxyConfig, ledger_path: impl Into<PathBuf>) -> IngestResult<Self> {
        let ledger_path = ledger_path.into();
        let mut entries: Vec<ProxyEntry> = config.pool.iter().map(ProxyEntry::new).collect();

        for record in ledger::load_active(&ledger_path)? {
            if let Some(entry) = entries.iter_mut().find(|e| e.host == record.proxy_host) {
                entry.banned_until = Some(match entry.banned_until {
                    Some(existing) if existing > record.expires_at => existing,
                    _ => record.expires_at,
                });
            }
        }

        let cooldown = chrono::Duration::seconds(i64::try_from(config.cooldown_seconds).unwrap_or(i64::MAX));

        Ok(Self {
            state: Mutex::new(PoolState {
                mode: config.mode,
                entries,
                modules: config.modules.clone(),
                max_failures: config.max_failures,
                cooldown,
                ban_delta: Vec::new(),
            }),
            ledger_path,
        })
    }

    /// Select a proxy for `module`, or `None` when this module is not
    /// configured to use the pool (the caller should connect directly).
    ///
    /// # Errors
    /// Returns [`IngestError::NoProxyAvailable`] when the pool applies to
    /// `module` but every candidate is currently banned.
    pub fn select(&self, module: ProxyModule) -> IngestResult<Option<ProxySelection>> {
        let mut state = self.state.lock().expect("proxy pool mutex poisoned");
        if !state.applies_to(module) {
            return Ok(None);
        }

        let now = Utc::now();
        let idx = match state.mode {
            ProxyMode::Single => {
                if state.entries.is_empty() {
                    return Err(IngestError::NoProxyAvailable);
                }
                0
            }
            ProxyMode::Pool => state
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.is_banned(now))
                .min_by_key(|(_, e)| e.last_used.unwrap_or(DateTime::<Utc>::MIN_UTC))
                .map(|(i, _)| i)
                .ok_or(IngestError::NoProxyAvailable)?,
        };

        if state.entries[idx].is_banned(now) {
            return Err(IngestError::NoProxyAvailable);
        }

        let entry = &mut state.entries[idx];
        entry.last_used = Some(now);
        Ok(Some(entry.selection()))
    }

    /// Record a successful request through `proxy_name`.
    pub fn report_success(&self, proxy_name: &str) {
        let mut state = self.state.lock().expect("proxy pool mutex poisoned");
        let now = Utc::now();
        if let Some(entry) = state.entries.iter_mut().find(|e| e.name == proxy_name) {
            entry.consecutive_failures = 0;
            entry.last_success = Some(now);
            entry.total_success += 1;
        }
    }

    /// Record a failed request through `proxy_name`, banning it when `kind`
    /// is itself a ban signal or the failure streak reaches `max_failures`.
    ///
    /// Idempotent while the proxy is already banned: a racing report never
    /// appends a second ledger row or extends the existing cooldown.
    ///
    /// # Errors
    /// Returns an error if a new ban must be persisted but the ledger cannot
    /// be written, or if `proxy_name` names no entry in the pool.
    pub fn report_failure(
        &self,
        proxy_name: &str,
        kind: FailureKind,
        description: impl Into<String>,
    ) -> IngestResult<()> {
        let mut state = self.state.lock().expect("proxy pool mutex poisoned");
        let now = Utc::now();

        let idx = state
            .entries
            .iter()
            .position(|e| e.name == proxy_name)
            .ok_or_else(|| IngestError::LogicGuard {
                message: format!("report_failure for unknown proxy {proxy_name}"),
            })?;

        state.entries[idx].total_failure += 1;
        state.entries[idx].last_failure = Some(now);

        if state.entries[idx].is_banned(now) {
            return Ok(());
        }

        state.entries[idx].consecutive_failures += 1;
        let should_ban = kind.is_ban() || state.entries[idx].consecutive_failures >= state.max_failures;
        if !should_ban {
            return Ok(());
        }

        let expires_at = now + state.cooldown;
        state.entries[idx].banned_until = Some(expires_at);

        let record = BanRecord {
            proxy_name: state.entries[idx].name.clone(),
            proxy_host: state.entries[idx].host.clone(),
            banned_at: now,
            expires_at,
            reason: kind,
            description: description.into(),
        };

        ledger::append(&self.ledger_path, &record)?;
        state.ban_delta.push(record);
        Ok(())
    }

    /// Structured per-proxy statistics for inclusion in a `RunStatus`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProxyStats> {
        let state = self.state.lock().expect("proxy pool mutex poisoned");
        state.entries.iter().map(ProxyEntry::stats).collect()
    }

    /// Drain and return the bans recorded by this pool instance since the
    /// last call, for embedding in `RunStatus::ban_ledger_delta`.
    pub fn take_ban_delta(&self) -> Vec<BanRecord> {
        let mut state = self.state.lock().expect("proxy pool mutex poisoned");
        std::mem::take(&mut state.ban_delta)
    }
}
