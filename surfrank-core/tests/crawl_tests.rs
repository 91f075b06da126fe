// Tests for crawl orchestration

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use surfrank_core::crawl::{CrawlOptions, crawl_and_rank, execute_crawl};
use surfrank_core::rank::{RankConfig, RankError};
use surfrank_scanner::{
    CrawlConfig, Crawler, FetchedPage, Fetcher, PageParser, ParsedPage, RobotsMatcher,
    RobotsSource, ScanError, StopReason,
};

// ============================================================================
// In-memory collaborators
// ============================================================================

/// Serves pages from a map; the body is the URL so the parser can find it again.
#[derive(Default)]
struct StaticWeb {
    pages: HashMap<String, (Vec<String>, Option<String>)>,
    fetches: AtomicUsize,
}

impl StaticWeb {
    fn page(mut self, url: &str, anchors: &[&str], title: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (
                anchors.iter().map(|a| a.to_string()).collect(),
                Some(title.to_string()),
            ),
        );
        self
    }
}

impl Fetcher for StaticWeb {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, surfrank_scanner::error::Result<FetchedPage>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.pages.contains_key(url) {
                Ok(FetchedPage {
                    status: 200,
                    body: url.as_bytes().to_vec(),
                })
            } else {
                Err(ScanError::Other(format!("no such page {}", url)))
            }
        })
    }
}

impl PageParser for StaticWeb {
    fn parse(&self, body: &[u8]) -> surfrank_scanner::error::Result<ParsedPage> {
        let url = String::from_utf8_lossy(body);
        let (anchors, title) = self.pages.get(url.as_ref()).cloned().unwrap_or_default();
        Ok(ParsedPage { anchors, title })
    }
}

struct OpenRobots;

impl RobotsSource for OpenRobots {
    fn fetch_robots<'a>(&'a self, _host: &'a str) -> BoxFuture<'a, surfrank_scanner::error::Result<String>> {
        Box::pin(async { Ok(String::new()) })
    }
}

impl RobotsMatcher for OpenRobots {
    fn allows(&self, _robots_text: &str, _url: &str) -> bool {
        true
    }
}

fn crawler_for(web: Arc<StaticWeb>, config: CrawlConfig) -> Crawler {
    let robots = Arc::new(OpenRobots);
    Crawler::new(web.clone(), web, robots.clone(), robots).with_config(config)
}

fn fast_config() -> CrawlConfig {
    CrawlConfig::default()
        .with_min_interval(Duration::ZERO)
        .with_poll_interval(Duration::from_millis(1))
        .with_rng_seed(7)
}

// ============================================================================
// crawl_and_rank
// ============================================================================

#[tokio::test]
async fn test_crawl_and_rank_ranks_discovered_graph() {
    let web = Arc::new(
        StaticWeb::default()
            .page("https://a.example/", &["/b", "https://c.example/"], "A")
            .page("https://a.example/b", &["/"], "B")
            .page("https://c.example/", &["https://a.example/"], "C"),
    );
    let crawler = crawler_for(web.clone(), fast_config());

    let summary = crawl_and_rank(&crawler, &["https://a.example/"], &RankConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.outcome.visited.len(), 3);
    assert_eq!(summary.outcome.stop_reason, StopReason::FrontierExhausted);

    let ranking = summary.ranking.unwrap();
    assert_eq!(ranking.len(), 3);
    assert!((ranking.total() - 1.0).abs() < 1e-9);

    // a.example is linked from both other pages
    let top = ranking.top(1);
    assert_eq!(top[0].0, "https://a.example/");
}

#[tokio::test]
async fn test_crawl_and_rank_keeps_outcome_when_ranking_fails() {
    let web = Arc::new(
        StaticWeb::default()
            .page("https://a.example/", &["/b"], "A")
            .page("https://a.example/b", &[], "B"),
    );
    let crawler = crawler_for(web, fast_config());
    let rank_config = RankConfig::default().with_max_iterations(0);

    let summary = crawl_and_rank(&crawler, &["https://a.example/"], &rank_config)
        .await
        .unwrap();

    assert_eq!(summary.outcome.visited.len(), 2);
    match summary.ranking {
        Err(RankError::NotConverged { iterations, .. }) => assert_eq!(iterations, 0),
        other => panic!("expected NotConverged, got {:?}", other),
    }
}

#[tokio::test]
async fn test_crawl_and_rank_respects_visit_cap() {
    let web = Arc::new(
        StaticWeb::default()
            .page("https://a.example/", &["/1", "/2", "/3"], "A")
            .page("https://a.example/1", &[], "1")
            .page("https://a.example/2", &[], "2")
            .page("https://a.example/3", &[], "3"),
    );
    let crawler = crawler_for(web.clone(), fast_config().with_visit_cap(1));

    let summary = crawl_and_rank(&crawler, &["https://a.example/"], &RankConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.outcome.visited.len(), 1);
    assert_eq!(summary.outcome.stop_reason, StopReason::VisitCapReached);
    assert_eq!(web.fetches.load(Ordering::SeqCst), 1);
    // The ranked graph still holds the discovered but unvisited pages
    assert_eq!(summary.ranking.unwrap().len(), 4);
}

#[tokio::test]
async fn test_crawl_and_rank_with_worker_pool() {
    let mut web = StaticWeb::default();
    let hub: Vec<String> = (0..12).map(|i| format!("https://h{}.example/", i)).collect();
    let hub_refs: Vec<&str> = hub.iter().map(String::as_str).collect();
    web = web.page("https://hub.example/", &hub_refs, "Hub");
    for url in &hub {
        web = web.page(url, &["https://hub.example/"], "Leaf");
    }
    let web = Arc::new(web);
    let crawler = crawler_for(web.clone(), fast_config().with_workers(4));

    let summary = crawl_and_rank(&crawler, &["https://hub.example/"], &RankConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.outcome.visited.len(), 13);
    assert_eq!(web.fetches.load(Ordering::SeqCst), 13);
    let ranking = summary.ranking.unwrap();
    assert_eq!(ranking.top(1)[0].0, "https://hub.example/");
}

// ============================================================================
// execute_crawl
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_without_crawlable_seeds() {
    let options = CrawlOptions {
        seeds: vec!["http://plain.example/".to_string(), "mailto:x@y.z".to_string()],
        crawl: fast_config(),
        rank: RankConfig::default(),
        show_progress_bars: false,
    };

    let summary = execute_crawl(options, None).await.unwrap();

    assert!(summary.outcome.visited.is_empty());
    assert_eq!(summary.outcome.stats.scheme_rejections, 2);
    assert_eq!(summary.outcome.stop_reason, StopReason::FrontierExhausted);
    assert!(summary.ranking.unwrap().is_empty());
}
