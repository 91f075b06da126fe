//! Crawl session state and the per-candidate scheduling decisions.
//!
//! The session owns every collection one crawl mutates. Workers hold its lock
//! only for the decisions below, never across a network call.

use crate::graph::LinkGraph;
use crate::links::{host_of, is_crawlable};
use crate::politeness::{HostClock, HostDecision, PolitenessConfig, check_host, record_visit};
use crate::result::{CrawlOutcome, CrawlStats, StopReason};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Outcome of one selection round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Round {
    Stop(StopReason),
    /// Frontier is empty but fetches are still in flight.
    Wait,
    /// The drawn candidate was rejected and removed.
    Skip,
    Candidate { url: String, host: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Removed from the frontier, host clock recorded; fetch it.
    Go,
    /// Stays in the frontier for a later round.
    Deferred,
    /// Already handled elsewhere.
    Gone,
}

#[derive(Debug)]
pub struct CrawlSession {
    id: String,
    frontier: Vec<String>,
    visited: HashMap<String, String>,
    /// Fetched pages that had no title. Never fetched again.
    dropped: HashSet<String>,
    host_clock: HostClock,
    graph: LinkGraph,
    in_flight: HashSet<String>,
    attempts: HashMap<String, usize>,
    stats: CrawlStats,
}

impl CrawlSession {
    pub fn new<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4().to_string(),
            frontier: seeds.into_iter().map(Into::into).collect(),
            visited: HashMap::new(),
            dropped: HashSet::new(),
            host_clock: HostClock::new(),
            graph: LinkGraph::new(),
            in_flight: HashSet::new(),
            attempts: HashMap::new(),
            stats: CrawlStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frontier(&self) -> &[String] {
        &self.frontier
    }

    pub fn visited(&self) -> &HashMap<String, String> {
        &self.visited
    }

    pub fn host_clock(&self) -> &HostClock {
        &self.host_clock
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stop_reason(&self, visit_cap: usize) -> Option<StopReason> {
        if self.visited.len() >= visit_cap {
            Some(StopReason::VisitCapReached)
        } else if self.frontier.is_empty() && self.in_flight.is_empty() {
            Some(StopReason::FrontierExhausted)
        } else {
            None
        }
    }

    /// Draws a candidate uniformly at random and drops it on the spot if it can
    /// never be fetched: not https, already fetched, or on a blacklisted host.
    pub fn next_candidate<R: Rng + ?Sized>(
        &mut self,
        politeness: &PolitenessConfig,
        visit_cap: usize,
        rng: &mut R,
    ) -> Round {
        if let Some(reason) = self.stop_reason(visit_cap) {
            return Round::Stop(reason);
        }
        if self.frontier.is_empty() {
            return Round::Wait;
        }

        let idx = rng.random_range(0..self.frontier.len());
        let url = &self.frontier[idx];

        let host = match host_of(url) {
            Some(host) if is_crawlable(url) => host,
            _ => {
                debug!("Rejecting non-https candidate {}", url);
                self.frontier.swap_remove(idx);
                self.stats.scheme_rejections += 1;
                return Round::Skip;
            }
        };

        if self.already_fetched(url) {
            self.frontier.swap_remove(idx);
            self.stats.duplicate_rejections += 1;
            return Round::Skip;
        }

        if politeness.is_blacklisted(&host) {
            debug!("Rejecting {} (blacklisted host)", url);
            self.frontier.swap_remove(idx);
            self.stats.blacklist_rejections += 1;
            return Round::Skip;
        }

        Round::Candidate {
            url: url.clone(),
            host,
        }
    }

    /// Whether `host` is out of its cooldown at `now`. Checked before the
    /// robots.txt lookup so a cooling host sees no request of any kind.
    pub fn host_ready(
        &mut self,
        host: &str,
        politeness: &PolitenessConfig,
        now: DateTime<Utc>,
    ) -> bool {
        match check_host(host, &self.host_clock, politeness, now) {
            HostDecision::Cooling { .. } => {
                self.stats.deferrals += 1;
                false
            }
            HostDecision::Ready | HostDecision::Blacklisted => true,
        }
    }

    pub fn reject_disallowed(&mut self, url: &str) {
        if self.remove_one(url) {
            self.stats.robots_rejections += 1;
        }
    }

    /// Final checks before a fetch. On `Go` the candidate has left the frontier
    /// and the host clock already carries `now`, so no other worker can pass the
    /// gate for this host until the interval elapses.
    pub fn try_dispatch(
        &mut self,
        url: &str,
        host: &str,
        politeness: &PolitenessConfig,
        visit_cap: usize,
        now: DateTime<Utc>,
    ) -> Dispatch {
        if self.already_fetched(url) {
            if self.remove_one(url) {
                self.stats.duplicate_rejections += 1;
            }
            return Dispatch::Gone;
        }

        if self.in_flight.contains(url) || self.visited.len() + self.in_flight.len() >= visit_cap {
            return Dispatch::Deferred;
        }

        match check_host(host, &self.host_clock, politeness, now) {
            HostDecision::Ready => {}
            HostDecision::Cooling { remaining } => {
                debug!("Deferring {} ({:?} until {} is ready)", url, remaining, host);
                self.stats.deferrals += 1;
                return Dispatch::Deferred;
            }
            HostDecision::Blacklisted => {
                if self.remove_one(url) {
                    self.stats.blacklist_rejections += 1;
                }
                return Dispatch::Gone;
            }
        }

        if !self.remove_one(url) {
            return Dispatch::Gone;
        }

        self.in_flight.insert(url.to_string());
        record_visit(&mut self.host_clock, host, now);
        self.stats.fetch_attempts += 1;
        Dispatch::Go
    }

    /// Folds a fetched page back into the session.
    pub fn complete_page(
        &mut self,
        url: &str,
        links: Vec<String>,
        title: Option<String>,
        visit_cap: usize,
    ) {
        self.in_flight.remove(url);
        self.attempts.remove(url);

        self.graph.add_node(url);
        for link in &links {
            self.graph.record_edge(url, link);
        }
        self.frontier.extend(links);

        match title {
            Some(title) if self.visited.len() < visit_cap => {
                self.visited.insert(url.to_string(), title);
            }
            Some(_) => {}
            None => {
                debug!("Dropping {} (no title)", url);
                self.dropped.insert(url.to_string());
                self.stats.untitled_pages += 1;
            }
        }
    }

    /// A failed fetch goes back to the frontier until it runs out of attempts.
    pub fn complete_failure(&mut self, url: &str, max_attempts: usize) -> bool {
        self.in_flight.remove(url);
        self.stats.fetch_failures += 1;

        let attempts = self.attempts.entry(url.to_string()).or_insert(0);
        *attempts += 1;

        if *attempts < max_attempts {
            self.frontier.push(url.to_string());
            true
        } else {
            self.attempts.remove(url);
            self.stats.abandoned += 1;
            false
        }
    }

    pub fn into_outcome(self, stop_reason: StopReason) -> CrawlOutcome {
        CrawlOutcome {
            session_id: self.id,
            visited: self.visited,
            frontier: self.frontier,
            host_clock: self.host_clock,
            graph: self.graph,
            stats: self.stats,
            stop_reason,
        }
    }

    fn already_fetched(&self, url: &str) -> bool {
        self.visited.contains_key(url) || self.dropped.contains(url)
    }

    fn remove_one(&mut self, url: &str) -> bool {
        match self.frontier.iter().position(|candidate| candidate == url) {
            Some(idx) => {
                self.frontier.swap_remove(idx);
                true
            }
            None => false,
        }
    }
}
