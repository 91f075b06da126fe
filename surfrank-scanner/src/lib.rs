pub mod config;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod graph;
pub mod links;
pub mod politeness;
pub mod result;
pub mod robots;

pub use config::CrawlConfig;
pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use fetch::{FetchedPage, Fetcher, PageParser, ParsedPage};
pub use graph::LinkGraph;
pub use politeness::{HostClock, PolitenessConfig, may_visit_host};
pub use result::{CrawlOutcome, CrawlStats, StopReason};
pub use robots::{RobotsCache, RobotsMatcher, RobotsSource, RobotsVerdict};
