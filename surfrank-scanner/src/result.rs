use crate::graph::LinkGraph;
use crate::politeness::HostClock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FrontierExhausted,
    VisitCapReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FrontierExhausted => write!(f, "frontier exhausted"),
            StopReason::VisitCapReached => write!(f, "visit cap reached"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub fetch_attempts: usize,
    pub fetch_failures: usize,
    pub robots_rejections: usize,
    pub blacklist_rejections: usize,
    pub scheme_rejections: usize,
    pub duplicate_rejections: usize,
    pub deferrals: usize,
    pub untitled_pages: usize,
    pub abandoned: usize,
}

/// Everything a crawl leaves behind.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub session_id: String,
    /// URL -> page title.
    pub visited: HashMap<String, String>,
    /// Remaining, unvisited candidates. May contain duplicates.
    pub frontier: Vec<String>,
    pub host_clock: HostClock,
    pub graph: LinkGraph,
    pub stats: CrawlStats,
    pub stop_reason: StopReason,
}

impl CrawlOutcome {
    pub fn hosts_seen(&self) -> usize {
        self.host_clock.len()
    }
}
