//! Ban state data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ban state handle shared by every clone of a guard
pub type SharedBanState = Arc<Mutex<BanState>>;

/// Failure counters and ban expirations keyed by client IP
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanState {
    /// Consecutive failed attempts since the last success or lifted ban
    pub failures: BTreeMap<String, u32>,
    /// Ban expiry (exclusive) per IP
    pub bans: BTreeMap<String, DateTime<Utc>>,
}

impl BanState {
    /// Create a fresh shared handle around an empty state
    pub fn shared() -> SharedBanState {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Count one more failure for `ip` and return the new total
    pub fn record_failure(&mut self, ip: &str) -> u32 {
        let count = self.failures.entry(ip.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Forget everything about `ip`, returning whether anything was removed
    pub fn clear(&mut self, ip: &str) -> bool {
        let had_failures = self.failures.remove(ip).is_some();
        let had_ban = self.bans.remove(ip).is_some();
        had_failures || had_ban
    }

    /// Whether `ip` holds a ban that has not expired at `now`
    pub fn is_banned(&self, ip: &str, now: DateTime<Utc>) -> bool {
        self.active_ban(ip, now).is_some()
    }

    /// Expiry of the ban on `ip`, if it is still running at `now`
    pub fn active_ban(&self, ip: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.bans.get(ip).copied().filter(|expiry| *expiry > now)
    }

    /// Drop bans that expired at or before `now`, along with their failure
    /// counters, and return how many were lifted
    ///
    /// Counters of IPs that never reached the threshold are kept: they only
    /// reset on success. Under address rotation the map (and the ban file
    /// rewritten on every failure) keeps growing until those clients log in.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .bans
            .iter()
            .filter(|(_, expiry)| **expiry <= now)
            .map(|(ip, _)| ip.clone())
            .collect();

        for ip in &expired {
            self.clear(ip);
        }

        expired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.bans.is_empty()
    }
}
