// Report generation from crawl and ranking results

use crate::crawl::CrawlSummary;
use crate::rank::{RankError, Ranking};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use surfrank_scanner::{CrawlStats, LinkGraph, StopReason};

/// Frontier URLs listed in a report before the rest is summarised as a count.
const FRONTIER_SAMPLE: usize = 10;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl: Option<CrawlSection>,
    pub ranking: RankSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    pub session_id: String,
    pub stop_reason: StopReason,
    pub stats: CrawlStats,
    /// Visited pages, best ranked first.
    pub pages: Vec<PageEntry>,
    pub hosts: Vec<HostEntry>,
    pub frontier_size: usize,
    pub frontier_sample: Vec<String>,
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntry {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub host: String,
    pub last_fetch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankSection {
    pub node_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub top: Vec<RankedNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedNode {
    pub position: usize,
    pub url: String,
    pub score: f64,
}

fn rank_section(
    node_count: usize,
    ranking: &Result<Ranking, RankError>,
    top: usize,
) -> RankSection {
    match ranking {
        Ok(ranking) => RankSection {
            node_count,
            iterations: Some(ranking.iterations()),
            error: None,
            top: ranking
                .top(top)
                .into_iter()
                .enumerate()
                .map(|(idx, (url, score))| RankedNode {
                    position: idx + 1,
                    url: url.to_string(),
                    score,
                })
                .collect(),
        },
        Err(e) => RankSection {
            node_count,
            iterations: None,
            error: Some(e.to_string()),
            top: Vec::new(),
        },
    }
}

pub fn gather_report_data(summary: &CrawlSummary, top: usize) -> ReportData {
    let outcome = &summary.outcome;
    let ranking = summary.ranking.as_ref().ok();

    let mut pages: Vec<PageEntry> = outcome
        .visited
        .iter()
        .map(|(url, title)| PageEntry {
            url: url.clone(),
            title: title.clone(),
            score: ranking.and_then(|r| r.score(url)),
        })
        .collect();
    pages.sort_by(|a, b| {
        let a_score = a.score.unwrap_or(0.0);
        let b_score = b.score.unwrap_or(0.0);
        b_score.total_cmp(&a_score).then_with(|| a.url.cmp(&b.url))
    });

    let mut hosts: Vec<HostEntry> = outcome
        .host_clock
        .iter()
        .map(|(host, at)| HostEntry {
            host: host.clone(),
            last_fetch: at.to_rfc3339(),
        })
        .collect();
    hosts.sort_by(|a, b| a.host.cmp(&b.host));

    let crawl = CrawlSection {
        session_id: outcome.session_id.clone(),
        stop_reason: outcome.stop_reason,
        stats: outcome.stats.clone(),
        pages,
        hosts,
        frontier_size: outcome.frontier.len(),
        frontier_sample: outcome.frontier.iter().take(FRONTIER_SAMPLE).cloned().collect(),
        node_count: outcome.graph.node_count(),
        edge_count: outcome.graph.edge_count(),
    };

    ReportData {
        generated_at: chrono::Utc::now().to_rfc3339(),
        crawl: Some(crawl),
        ranking: rank_section(outcome.graph.node_count(), &summary.ranking, top),
    }
}

/// Report for a graph that was ranked without crawling it first.
pub fn gather_rank_report(
    graph: &LinkGraph,
    ranking: &Result<Ranking, RankError>,
    top: usize,
) -> ReportData {
    ReportData {
        generated_at: chrono::Utc::now().to_rfc3339(),
        crawl: None,
        ranking: rank_section(graph.node_count(), ranking, top),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                           SURFRANK CRAWL REPORT\n");
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("Generated:    {}\n", data.generated_at));

    if let Some(ref crawl) = data.crawl {
        report.push_str(&format!("Session ID:   {}\n", crawl.session_id));
        report.push_str(&format!("Stopped:      {}\n", crawl.stop_reason));
        report.push_str(&format!("Pages:        {}\n", crawl.pages.len()));
        report.push_str(&format!("Hosts:        {}\n", crawl.hosts.len()));
        report.push_str(&format!(
            "Graph:        {} nodes, {} edges\n",
            crawl.node_count, crawl.edge_count
        ));
        report.push_str(&format!("Frontier:     {} remaining\n", crawl.frontier_size));
        report.push('\n');

        report.push_str(RULE);
        report.push_str("CRAWL STATISTICS\n");
        report.push_str(RULE);
        report.push('\n');
        let stats = &crawl.stats;
        for (label, value) in [
            ("Fetch attempts", stats.fetch_attempts),
            ("Fetch failures", stats.fetch_failures),
            ("Abandoned", stats.abandoned),
            ("Untitled pages", stats.untitled_pages),
            ("Robots rejections", stats.robots_rejections),
            ("Blacklisted", stats.blacklist_rejections),
            ("Wrong scheme", stats.scheme_rejections),
            ("Duplicates", stats.duplicate_rejections),
            ("Deferrals", stats.deferrals),
        ] {
            report.push_str(&format!("  {:<20}{}\n", format!("{}:", label), value));
        }
        report.push('\n');

        if !crawl.hosts.is_empty() {
            report.push_str(RULE);
            report.push_str("HOSTS\n");
            report.push_str(RULE);
            report.push('\n');
            for host in &crawl.hosts {
                report.push_str(&format!("  {}  (last fetch {})\n", host.host, host.last_fetch));
            }
            report.push('\n');
        }

        if !crawl.frontier_sample.is_empty() {
            report.push_str("Unvisited frontier sample:\n");
            for url in &crawl.frontier_sample {
                report.push_str(&format!("  {}\n", url));
            }
            if crawl.frontier_size > crawl.frontier_sample.len() {
                report.push_str(&format!(
                    "  ... and {} more\n",
                    crawl.frontier_size - crawl.frontier_sample.len()
                ));
            }
            report.push('\n');
        }
    }

    report.push_str(RULE);
    report.push_str("PAGERANK\n");
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&generate_ranking_text(&data.ranking, data.crawl.as_ref()));

    report.push_str(RULE);
    report.push_str("                          End of Report\n");
    report.push_str(RULE);

    report
}

fn generate_ranking_text(ranking: &RankSection, crawl: Option<&CrawlSection>) -> String {
    let mut text = String::new();

    if let Some(ref error) = ranking.error {
        text.push_str(&format!("Ranking failed: {}\n\n", error));
        return text;
    }

    text.push_str(&format!("Nodes:        {}\n", ranking.node_count));
    if let Some(iterations) = ranking.iterations {
        text.push_str(&format!("Iterations:   {}\n", iterations));
    }
    text.push('\n');

    if ranking.top.is_empty() {
        text.push_str("  (empty)\n\n");
        return text;
    }

    for node in &ranking.top {
        text.push_str(&format!("  {:>4}. {:.6}  {}\n", node.position, node.score, node.url));
        if let Some(title) = crawl.and_then(|c| title_of(c, &node.url)) {
            if !title.is_empty() {
                text.push_str(&format!("               {}\n", title));
            }
        }
    }
    text.push('\n');

    text
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "surfrank",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": data.generated_at,
                "format": "json"
            },
            "crawl": data.crawl,
            "ranking": data.ranking
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// One row per ranked node. Titles are filled in for visited pages.
pub fn generate_csv_report(data: &ReportData) -> String {
    let mut csv = String::from("position,url,score,title\n");

    for node in &data.ranking.top {
        let title = data
            .crawl
            .as_ref()
            .and_then(|c| title_of(c, &node.url))
            .unwrap_or("");
        csv.push_str(&format!(
            "{},{},{},{}\n",
            node.position,
            escape_csv(&node.url),
            node.score,
            escape_csv(title)
        ));
    }

    csv
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut md = String::from("# Surfrank Report\n\n");
    md.push_str(&format!("_Generated {}_\n\n", data.generated_at));

    if let Some(ref crawl) = data.crawl {
        md.push_str("## Crawl\n\n");
        md.push_str("| | |\n|---|---|\n");
        md.push_str(&format!("| Session | `{}` |\n", crawl.session_id));
        md.push_str(&format!("| Stopped | {} |\n", crawl.stop_reason));
        md.push_str(&format!("| Pages visited | {} |\n", crawl.pages.len()));
        md.push_str(&format!("| Hosts | {} |\n", crawl.hosts.len()));
        md.push_str(&format!("| Nodes | {} |\n", crawl.node_count));
        md.push_str(&format!("| Edges | {} |\n", crawl.edge_count));
        md.push_str(&format!("| Frontier remaining | {} |\n", crawl.frontier_size));
        md.push_str(&format!("| Fetch attempts | {} |\n", crawl.stats.fetch_attempts));
        md.push_str(&format!("| Fetch failures | {} |\n", crawl.stats.fetch_failures));
        md.push('\n');
    }

    md.push_str("## PageRank\n\n");
    if let Some(ref error) = data.ranking.error {
        md.push_str(&format!("**Ranking failed:** {}\n", error));
        return md;
    }
    if let Some(iterations) = data.ranking.iterations {
        md.push_str(&format!(
            "{} nodes, converged after {} iterations.\n\n",
            data.ranking.node_count, iterations
        ));
    }
    if data.ranking.top.is_empty() {
        md.push_str("_No nodes to rank._\n");
        return md;
    }

    md.push_str("| # | Score | URL | Title |\n|---:|---:|---|---|\n");
    for node in &data.ranking.top {
        let title = data
            .crawl
            .as_ref()
            .and_then(|c| title_of(c, &node.url))
            .unwrap_or("");
        md.push_str(&format!(
            "| {} | {:.6} | {} | {} |\n",
            node.position,
            node.score,
            node.url,
            title.replace('|', "\\|")
        ));
    }

    md
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn title_of<'a>(crawl: &'a CrawlSection, url: &str) -> Option<&'a str> {
    crawl
        .pages
        .iter()
        .find(|page| page.url == url)
        .map(|page| page.title.as_str())
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
