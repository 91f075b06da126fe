use crate::links::host_of;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::warn;

/// Host -> time of the latest fetch attempt.
pub type HostClock = HashMap<String, DateTime<Utc>>;

/// Per-host rate limit and blacklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolitenessConfig {
    pub min_interval: Duration,
    blacklist: HashSet<String>,
}

impl PolitenessConfig {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            blacklist: HashSet::new(),
        }
    }

    /// Adds hosts to the blacklist. Entries are normalized to the
    /// `scheme://netloc/` form, so `x.com`, `https://x.com` and
    /// `https://x.com/` all match the same host. Entries that name no host are
    /// skipped.
    pub fn with_blacklist<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for host in hosts {
            let host = host.as_ref().trim();
            let normalized = if host.contains("://") {
                host_of(host)
            } else {
                host_of(&format!("https://{}", host))
            };
            match normalized {
                Some(normalized) => {
                    self.blacklist.insert(normalized);
                }
                None => warn!("Ignoring blacklist entry '{}' (no host)", host),
            }
        }
        self
    }

    pub fn is_blacklisted(&self, host: &str) -> bool {
        self.blacklist.contains(host)
    }

    pub fn blacklist(&self) -> impl Iterator<Item = &String> {
        self.blacklist.iter()
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDecision {
    Ready,
    Cooling { remaining: Duration },
    Blacklisted,
}

pub fn check_host(
    host: &str,
    clock: &HostClock,
    config: &PolitenessConfig,
    now: DateTime<Utc>,
) -> HostDecision {
    if config.is_blacklisted(host) {
        return HostDecision::Blacklisted;
    }

    let Some(last_visit) = clock.get(host) else {
        return HostDecision::Ready;
    };

    // A clock that went backwards counts as no time elapsed.
    let elapsed = (now - *last_visit).to_std().unwrap_or(Duration::ZERO);

    match config.min_interval.checked_sub(elapsed) {
        Some(remaining) if !remaining.is_zero() => HostDecision::Cooling { remaining },
        _ => HostDecision::Ready,
    }
}

/// Whether `host` may be fetched at `now`. Has no side effects; callers record
/// the attempt with [`record_visit`].
pub fn may_visit_host(
    host: &str,
    clock: &HostClock,
    config: &PolitenessConfig,
    now: DateTime<Utc>,
) -> bool {
    check_host(host, clock, config, now) == HostDecision::Ready
}

pub fn record_visit(clock: &mut HostClock, host: &str, now: DateTime<Utc>) {
    clock.insert(host.to_string(), now);
}
