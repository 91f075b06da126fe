//! Per-host robots.txt cache.
//!
//! A host's policy is fetched lazily the first time one of its URLs is
//! considered and reused for the rest of the run. Lookups that fail are never
//! cached and resolve to [`RobotsVerdict::LookupFailed`], which permits the
//! fetch: an unreadable robots file must not block crawling.

use crate::error::{Result, ScanError};
use crate::fetch::DEFAULT_USER_AGENT;
use futures::future::BoxFuture;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Produces the robots.txt body for a host (`scheme://netloc/`).
pub trait RobotsSource: Send + Sync {
    fn fetch_robots<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Decides whether a robots.txt body allows a URL.
pub trait RobotsMatcher: Send + Sync {
    fn allows(&self, robots_text: &str, url: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsVerdict {
    Allowed,
    Disallowed,
    /// robots.txt could not be fetched; treated as allowed.
    LookupFailed,
}

impl RobotsVerdict {
    pub fn permits_fetch(self) -> bool {
        !matches!(self, RobotsVerdict::Disallowed)
    }
}

const DISALLOW_ALL: &str = "User-agent: *\nDisallow: /\n";

/// Fetches `<host>robots.txt` over HTTP.
///
/// Status handling follows the usual robots parser convention: 401 and 403
/// mean the whole site is off limits, any other 4xx means there are no rules,
/// and 5xx is a failed lookup.
#[derive(Debug, Clone)]
pub struct HttpRobotsSource {
    client: Client,
}

impl HttpRobotsSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl RobotsSource for HttpRobotsSource {
    fn fetch_robots<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let robots_url = format!("{}robots.txt", host);
            debug!("Fetching {}", robots_url);

            let response = self.client.get(&robots_url).send().await?;
            let status = response.status();

            if status.is_success() {
                Ok(response.text().await?)
            } else if status.as_u16() == 401 || status.as_u16() == 403 {
                Ok(DISALLOW_ALL.to_string())
            } else if status.is_client_error() {
                Ok(String::new())
            } else {
                Err(ScanError::RobotsUnavailable {
                    host: host.to_string(),
                    reason: format!("status {}", status),
                })
            }
        })
    }
}

/// Matcher backed by the `robotstxt` crate.
#[derive(Debug, Clone)]
pub struct RobotstxtMatcher {
    user_agent: String,
}

impl RobotstxtMatcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for RobotstxtMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl RobotsMatcher for RobotstxtMatcher {
    fn allows(&self, robots_text: &str, url: &str) -> bool {
        DefaultMatcher::default().one_agent_allowed_by_robots(robots_text, &self.user_agent, url)
    }
}

type PolicySlot = Arc<OnceCell<String>>;

pub struct RobotsCache {
    source: Arc<dyn RobotsSource>,
    matcher: Arc<dyn RobotsMatcher>,
    policies: Mutex<HashMap<String, PolicySlot>>,
}

impl RobotsCache {
    pub fn new(source: Arc<dyn RobotsSource>, matcher: Arc<dyn RobotsMatcher>) -> Self {
        Self {
            source,
            matcher,
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// Checks `url` against the policy of `host`, fetching the policy on first
    /// use. Concurrent callers for the same host share a single fetch.
    pub async fn allowed(&self, url: &str, host: &str) -> RobotsVerdict {
        let slot = self.slot(host);

        let fetched = slot
            .get_or_try_init(|| async { self.source.fetch_robots(host).await })
            .await;

        match fetched {
            Ok(robots_text) => {
                if self.matcher.allows(robots_text, url) {
                    RobotsVerdict::Allowed
                } else {
                    debug!("robots.txt disallows {}", url);
                    RobotsVerdict::Disallowed
                }
            }
            Err(e) => {
                warn!("robots.txt lookup failed for {}: {}", host, e);
                RobotsVerdict::LookupFailed
            }
        }
    }

    pub fn is_cached(&self, host: &str) -> bool {
        self.policies
            .lock()
            .map(|policies| policies.get(host).is_some_and(|slot| slot.initialized()))
            .unwrap_or(false)
    }

    fn slot(&self, host: &str) -> PolicySlot {
        // A poisoned lock only means another worker panicked mid-insert; the
        // map itself is still usable.
        let mut policies = self
            .policies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        policies.entry(host.to_string()).or_default().clone()
    }
}
