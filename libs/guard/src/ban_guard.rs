//! Ban guard for preventing brute force attacks on the login form

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::client_ip::{RequestMeta, normalize_ip, resolve_client_ip};
use crate::config::SecurityConfig;
use crate::error::GuardResult;
use crate::state::{BanState, SharedBanState};
use crate::store::BanFile;

/// Ban guard
///
/// Tracks failed logins per client IP and bans clients that reach the
/// configured threshold. Cloning is cheap and every clone shares the same
/// state.
#[derive(Debug, Clone)]
pub struct BanGuard {
    /// Ban threshold and duration
    config: Arc<SecurityConfig>,
    /// Trusted proxy addresses
    trusted_proxies: Arc<HashSet<String>>,
    /// Ban state shared across requests
    state: SharedBanState,
    /// Where the state is persisted
    store: BanFile,
}

impl BanGuard {
    /// Create a guard over `state`, replacing its content with whatever was
    /// persisted in `ban_file`
    pub async fn load(
        config: SecurityConfig,
        ban_file: impl Into<std::path::PathBuf>,
        state: SharedBanState,
    ) -> Self {
        let store = BanFile::new(ban_file);
        let persisted = store.load().await;
        *state.lock().await = persisted;

        let trusted_proxies = config
            .trusted_proxies
            .iter()
            .map(|ip| normalize_ip(ip))
            .collect();

        Self {
            config: Arc::new(config),
            trusted_proxies: Arc::new(trusted_proxies),
            state,
            store,
        }
    }

    /// Resolve the IP a request is attributed to
    pub fn resolve_client_ip(&self, meta: &RequestMeta) -> String {
        resolve_client_ip(meta, &self.trusted_proxies)
    }

    /// Check whether the client behind `meta` may attempt to log in
    ///
    /// Expired bans do not block but are left in place.
    pub async fn can_login(&self, meta: &RequestMeta) -> bool {
        let ip = self.resolve_client_ip(meta);
        !self.state.lock().await.is_banned(&ip, Utc::now())
    }

    /// Expiry of the running ban on the client behind `meta`, if any
    pub async fn ban_expiry(&self, meta: &RequestMeta) -> Option<DateTime<Utc>> {
        let ip = self.resolve_client_ip(meta);
        self.state.lock().await.active_ban(&ip, Utc::now())
    }

    /// Current failure count for the client behind `meta`
    pub async fn failures(&self, meta: &RequestMeta) -> u32 {
        let ip = self.resolve_client_ip(meta);
        self.state
            .lock()
            .await
            .failures
            .get(&ip)
            .copied()
            .unwrap_or(0)
    }

    /// Record a failed login and ban the client once it reaches the threshold
    ///
    /// Keeps counting when the client is already banned.
    pub async fn handle_failed_login(&self, meta: &RequestMeta) -> GuardResult<()> {
        let ip = self.resolve_client_ip(meta);
        let mut state = self.state.lock().await;

        let attempts = state.record_failure(&ip);
        warn!("Failed login attempt {} from {}", attempts, ip);

        if attempts >= self.config.ban_after {
            let expiry = self.ban_expiry_from(Utc::now());
            state.bans.insert(ip.clone(), expiry);
            warn!(
                "Banned {} until {} after {} failed attempts",
                ip, expiry, attempts
            );
        }

        self.persist(&state).await
    }

    /// Give the client behind `meta` a clean slate
    pub async fn handle_successful_login(&self, meta: &RequestMeta) -> GuardResult<()> {
        let ip = self.resolve_client_ip(meta);
        let mut state = self.state.lock().await;

        if state.clear(&ip) {
            info!("Cleared failed login records for {}", ip);
        }

        self.persist(&state).await
    }

    /// Lift every expired ban and return how many were removed
    pub async fn purge_expired(&self) -> GuardResult<usize> {
        let mut state = self.state.lock().await;
        let purged = state.purge_expired(Utc::now());

        if purged > 0 {
            info!("Lifted {} expired bans", purged);
            self.persist(&state).await?;
        }

        Ok(purged)
    }

    fn ban_expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.config.ban_duration)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|duration| now.checked_add_signed(duration))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn persist(&self, state: &BanState) -> GuardResult<()> {
        self.store.save(state).await.inspect_err(|e| {
            error!("{}", e);
        })
    }
}
