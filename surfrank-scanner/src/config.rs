use crate::fetch::DEFAULT_USER_AGENT;
use crate::politeness::PolitenessConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_VISIT_CAP: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub politeness: PolitenessConfig,
    /// Crawl stops once this many pages have been visited.
    pub visit_cap: usize,
    pub workers: usize,
    /// Failed fetches put a candidate back in the frontier until it has been
    /// tried this many times.
    pub max_fetch_attempts: usize,
    /// Back-off between scheduling rounds when nothing can be fetched yet.
    pub poll_interval: Duration,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Fixed seed for frontier selection; worker `i` uses `seed + i`.
    pub rng_seed: Option<u64>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            politeness: PolitenessConfig::default(),
            visit_cap: DEFAULT_VISIT_CAP,
            workers: 1,
            max_fetch_attempts: 3,
            poll_interval: Duration::from_millis(50),
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rng_seed: None,
        }
    }
}

impl CrawlConfig {
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.politeness.min_interval = interval;
        self
    }

    pub fn with_blacklist<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.politeness = self.politeness.with_blacklist(hosts);
        self
    }

    pub fn with_visit_cap(mut self, cap: usize) -> Self {
        self.visit_cap = cap;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_fetch_attempts(mut self, attempts: usize) -> Self {
        self.max_fetch_attempts = attempts.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
