use crate::config::CrawlConfig;
use crate::error::Result;
use crate::fetch::{Fetcher, HtmlParser, HttpFetcher, PageParser, ParsedPage, build_client};
use crate::frontier::{CrawlSession, Dispatch, Round};
use crate::links::extract_links;
use crate::result::{CrawlOutcome, StopReason};
use crate::robots::{HttpRobotsSource, RobotsCache, RobotsMatcher, RobotsSource, RobotstxtMatcher};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    robots_source: Arc<dyn RobotsSource>,
    robots_matcher: Arc<dyn RobotsMatcher>,
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
}

/// Shared by every worker of one crawl.
struct CrawlContext {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    robots: RobotsCache,
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
        robots_source: Arc<dyn RobotsSource>,
        robots_matcher: Arc<dyn RobotsMatcher>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            robots_source,
            robots_matcher,
            config: CrawlConfig::default(),
            progress_callback: None,
        }
    }

    /// Crawler over the real web: reqwest for pages and robots.txt, scraper for
    /// HTML, robotstxt for rule matching.
    pub fn http(config: CrawlConfig) -> Result<Self> {
        let client = build_client(config.timeout_secs, &config.user_agent)?;
        let crawler = Self::new(
            Arc::new(HttpFetcher::new(client.clone())),
            Arc::new(HtmlParser::new()?),
            Arc::new(HttpRobotsSource::new(client)),
            Arc::new(RobotstxtMatcher::new(config.user_agent.clone())),
        );
        Ok(crawler.with_config(config))
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls from `seeds` until the frontier runs dry or the visit cap is hit.
    /// Each call is an independent session with its own robots cache.
    pub async fn crawl<S: AsRef<str>>(&self, seeds: &[S]) -> Result<CrawlOutcome> {
        let session = CrawlSession::new(seeds.iter().map(|s| s.as_ref().to_string()));
        let session_id = session.id().to_string();
        let workers = self.config.workers.max(1);

        info!(
            "Starting crawl session {} with {} seed(s) and {} worker(s)",
            session_id,
            seeds.len(),
            workers
        );

        let session = Arc::new(Mutex::new(session));
        let context = Arc::new(CrawlContext {
            fetcher: self.fetcher.clone(),
            parser: self.parser.clone(),
            robots: RobotsCache::new(self.robots_source.clone(), self.robots_matcher.clone()),
            config: self.config.clone(),
            progress_callback: self.progress_callback.clone(),
        });

        let mut worker_handles = Vec::new();
        for worker_id in 0..workers {
            let rng = match self.config.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
                None => StdRng::from_os_rng(),
            };
            let session = session.clone();
            let context = context.clone();

            worker_handles.push(tokio::spawn(async move {
                run_worker(worker_id, session, context, rng).await
            }));
        }

        let mut stop_reason = None;
        for handle in worker_handles {
            stop_reason = stop_reason.or(Some(handle.await?));
        }

        let session = Arc::try_unwrap(session)
            .map(Mutex::into_inner)
            .map_err(|_| crate::error::ScanError::Other("crawl session still shared".to_string()))?;
        let stop_reason = session
            .stop_reason(self.config.visit_cap)
            .or(stop_reason)
            .unwrap_or(StopReason::FrontierExhausted);
        let outcome = session.into_outcome(stop_reason);

        info!(
            "Crawl complete ({}). Visited {} pages, frontier has {} URLs, met {} hosts",
            outcome.stop_reason,
            outcome.visited.len(),
            outcome.frontier.len(),
            outcome.hosts_seen()
        );
        Ok(outcome)
    }
}

async fn run_worker(
    worker_id: usize,
    session: Arc<Mutex<CrawlSession>>,
    context: Arc<CrawlContext>,
    mut rng: StdRng,
) -> StopReason {
    let config = &context.config;
    debug!("Worker {} started", worker_id);

    loop {
        let round = session
            .lock()
            .await
            .next_candidate(&config.politeness, config.visit_cap, &mut rng);

        let (url, host) = match round {
            Round::Stop(reason) => {
                debug!("Worker {} finished ({})", worker_id, reason);
                return reason;
            }
            Round::Skip => continue,
            Round::Wait => {
                tokio::time::sleep(config.poll_interval).await;
                continue;
            }
            Round::Candidate { url, host } => (url, host),
        };

        let ready = session
            .lock()
            .await
            .host_ready(&host, &config.politeness, Utc::now());
        if !ready {
            tokio::time::sleep(config.poll_interval).await;
            continue;
        }

        if !context.robots.allowed(&url, &host).await.permits_fetch() {
            session.lock().await.reject_disallowed(&url);
            continue;
        }

        let dispatch = session.lock().await.try_dispatch(
            &url,
            &host,
            &config.politeness,
            config.visit_cap,
            Utc::now(),
        );
        match dispatch {
            Dispatch::Go => {}
            Dispatch::Gone => continue,
            Dispatch::Deferred => {
                tokio::time::sleep(config.poll_interval).await;
                continue;
            }
        }

        if let Some(ref callback) = context.progress_callback {
            callback(worker_id, url.clone());
        }

        match fetch_and_parse(&context, &url).await {
            Ok(page) => {
                let links = extract_links(&url, &page.anchors);
                debug!(
                    "[Worker {}] {} anchors, {} crawlable links on {}",
                    worker_id,
                    page.anchors.len(),
                    links.len(),
                    url
                );

                let mut session = session.lock().await;
                if let Some(ref title) = page.title {
                    info!("Visit #{}: {} at {}", session.visited().len(), title, url);
                }
                session.complete_page(&url, links, page.title, config.visit_cap);
            }
            Err(e) => {
                warn!("Crawl error for {}: {}", url, e);
                let requeued = session
                    .lock()
                    .await
                    .complete_failure(&url, config.max_fetch_attempts);
                if !requeued {
                    warn!("Giving up on {} after {} attempts", url, config.max_fetch_attempts);
                }
            }
        }
    }
}

async fn fetch_and_parse(context: &CrawlContext, url: &str) -> Result<ParsedPage> {
    let page = context.fetcher.fetch(url).await?;
    debug!("{} answered {} ({} bytes)", url, page.status, page.body.len());
    context.parser.parse(&page.body)
}
