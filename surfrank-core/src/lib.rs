pub mod crawl;
pub mod error;
pub mod rank;
pub mod report;

pub use crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, crawl_and_rank, execute_crawl};
pub use error::{CoreError, Result};
pub use rank::{IterationStep, PowerIteration, RankConfig, RankError, Ranking, rank};
pub use report::{ReportData, ReportFormat};
