use crate::error::Result;
use crate::rank::{RankConfig, RankError, Ranking, rank};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use surfrank_scanner::{CrawlConfig, CrawlOutcome, Crawler, ProgressCallback};
use tracing::{info, warn};

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seeds: Vec<String>,
    pub crawl: CrawlConfig,
    pub rank: RankConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// A finished crawl and the ranking of its link graph. A ranking that failed
/// to converge is kept as the error so the crawl data is not lost with it.
#[derive(Debug)]
pub struct CrawlSummary {
    pub outcome: CrawlOutcome,
    pub ranking: std::result::Result<Ranking, RankError>,
}

/// Execute a crawl over the web with the default HTTP collaborators, then rank
/// the link graph it produced.
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary> {
    let CrawlOptions {
        seeds,
        crawl,
        rank: rank_config,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let count_clone = processed_count.clone();
    let pb_clone = progress_bar.clone();
    let worker_progress: ProgressCallback = Arc::new(move |worker_id: usize, url: String| {
        let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!("Crawling... {} fetches, now {}", count, url));
            pb.tick();
        }
        if let Some(ref callback) = progress_callback {
            callback(format!("[worker {}] {}", worker_id, url));
        }
    });

    let crawler = Crawler::http(crawl)?.with_progress_callback(worker_progress);
    let summary = crawl_and_rank(&crawler, &seeds, &rank_config).await?;

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!(
            "Crawl complete! {} fetches, {} pages visited",
            total,
            summary.outcome.visited.len()
        ));
    }

    Ok(summary)
}

/// Crawl with an already configured crawler and rank the resulting graph.
pub async fn crawl_and_rank<S: AsRef<str>>(
    crawler: &Crawler,
    seeds: &[S],
    rank_config: &RankConfig,
) -> Result<CrawlSummary> {
    let outcome = crawler.crawl(seeds).await?;

    let ranking = rank(&outcome.graph, rank_config);
    match ranking {
        Ok(ref ranking) => info!(
            "Ranked {} nodes in {} iterations",
            ranking.len(),
            ranking.iterations()
        ),
        Err(ref e) => warn!("Ranking failed: {}", e),
    }

    Ok(CrawlSummary { outcome, ranking })
}
