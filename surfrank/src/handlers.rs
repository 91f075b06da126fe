use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use surfrank_core::crawl::{CrawlOptions, execute_crawl};
use surfrank_core::rank::{RankConfig, rank};
use surfrank_core::report::{
    ReportFormat, gather_rank_report, gather_report_data, generate_report, save_report,
};
use surfrank_scanner::{CrawlConfig, LinkGraph};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

pub fn print_banner() {
    let banner = r#"
   ___ _   _ _ __ / _|_ __ __ _ _ __ | | __
  / __| | | | '__| |_| '__/ _` | '_ \| |/ /
  \__ \ |_| | |  |  _| | | (_| | | | |   <
  |___/\__,_|_|  |_| |_|  \__,_|_| |_|_|\_\
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "crawl politely, rank honestly".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

/// Logs go to stderr so reports on stdout stay clean. `RUST_LOG` wins over
/// the verbosity flag.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// Helper functions for crawl handler

/// Load URLs from either a file or the seed URL arguments
pub fn load_urls_from_source(urls: &[Url], hosts_file: Option<&PathBuf>) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if !urls.is_empty() {
        Ok(urls.iter().map(|url| url.as_str().to_string()).collect())
    } else {
        Err(anyhow!("Either --url or --hosts-file must be provided"))
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let urls = read_url_lines(path)?;
    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }
    Ok(urls)
}

fn read_url_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect())
}

/// Parse a single line as a URL, adding https:// if it has no scheme
pub fn parse_url_line(line: &str) -> Option<String> {
    let candidate = if line.contains("://") {
        line.to_string()
    } else {
        format!("https://{}", line)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.has_host() => Some(candidate),
        _ => {
            warn!("Skipping invalid URL '{}'", line);
            None
        }
    }
}

/// Blacklisted hosts from the command line and an optional file. Unlike seeds,
/// an empty blacklist is fine.
pub fn load_blacklist(hosts: &[String], blacklist_file: Option<&PathBuf>) -> Result<Vec<String>> {
    let mut blacklist: Vec<String> = hosts
        .iter()
        .filter_map(|host| parse_url_line(host.trim()))
        .collect();
    if let Some(path) = blacklist_file {
        blacklist.extend(read_url_lines(path)?);
    }
    Ok(blacklist)
}

/// Reads a `source target` edge list. A line holding a single URL adds an
/// isolated node.
pub fn load_edge_list(path: &Path) -> Result<LinkGraph> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read edge list {}", path.display()))?;
    parse_edge_list(&content).with_context(|| format!("Invalid edge list {}", path.display()))
}

pub fn parse_edge_list(content: &str) -> Result<LinkGraph> {
    let mut graph = LinkGraph::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [node] => {
                graph.add_node(node);
            }
            [source, target] => {
                graph.record_edge(source, target);
            }
            _ => bail!(
                "line {}: expected `source target`, found {} fields",
                number + 1,
                fields.len()
            ),
        }
    }

    Ok(graph)
}

pub fn rank_config_from(args: &ArgMatches) -> RankConfig {
    let defaults = RankConfig::default();
    RankConfig {
        damping: args.get_one::<f64>("damping").copied().unwrap_or(defaults.damping),
        max_iterations: args
            .get_one::<usize>("max-iterations")
            .copied()
            .unwrap_or(defaults.max_iterations),
        tolerance: args.get_one::<f64>("tolerance").copied().unwrap_or(defaults.tolerance),
    }
}

pub fn crawl_config_from(args: &ArgMatches, blacklist: Vec<String>) -> Result<CrawlConfig> {
    let interval = args.get_one::<f64>("interval").copied().unwrap_or(1.0);
    let interval = Duration::try_from_secs_f64(interval)
        .map_err(|e| anyhow!("Invalid --interval {}: {}", interval, e))?;

    let mut config = CrawlConfig::default()
        .with_min_interval(interval)
        .with_blacklist(blacklist);
    if let Some(&cap) = args.get_one::<usize>("visit-cap") {
        config = config.with_visit_cap(cap);
    }
    if let Some(&workers) = args.get_one::<usize>("threads") {
        config = config.with_workers(workers);
    }
    if let Some(&timeout) = args.get_one::<u64>("timeout") {
        config = config.with_timeout(timeout);
    }
    if let Some(&attempts) = args.get_one::<usize>("max-attempts") {
        config = config.with_max_fetch_attempts(attempts);
    }
    if let Some(&seed) = args.get_one::<u64>("seed") {
        config = config.with_rng_seed(seed);
    }
    Ok(config)
}

fn report_format_from(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

/// Prints the report, or writes it to `output` (with `~` expanded). The save
/// confirmation goes to stderr and is suppressed when `quiet`.
pub fn emit_report(content: &str, output: Option<&String>, quiet: bool) -> Result<()> {
    match output {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let path = Path::new(expanded.as_ref());
            save_report(content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let urls: Vec<Url> = sub_matches
        .get_many::<Url>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let seeds = load_urls_from_source(&urls, hosts_file)?;

    let blacklist_hosts: Vec<String> = sub_matches
        .get_many::<String>("blacklist")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let blacklist = load_blacklist(&blacklist_hosts, sub_matches.get_one::<PathBuf>("blacklist-file"))?;

    let crawl = crawl_config_from(sub_matches, blacklist)?;
    let rank_config = rank_config_from(sub_matches);
    rank_config.validate()?;
    let top = sub_matches.get_one::<usize>("top").copied().unwrap_or(20);
    let format = report_format_from(sub_matches);

    if !quiet {
        eprintln!("{} Crawling from {} seed(s)", "→".blue(), seeds.len());
        eprintln!(
            "  Workers: {}  Visit cap: {}  Interval: {:?}",
            crawl.workers, crawl.visit_cap, crawl.politeness.min_interval
        );
        let blacklisted = crawl.politeness.blacklist().count();
        if blacklisted > 0 {
            eprintln!("  Blacklisted hosts: {}", blacklisted);
        }
        eprintln!();
    }

    let options = CrawlOptions {
        seeds,
        crawl,
        rank: rank_config,
        show_progress_bars: !quiet,
    };
    let summary = execute_crawl(options, None).await?;
    info!(
        "Session {} visited {} pages",
        summary.outcome.session_id,
        summary.outcome.visited.len()
    );

    let data = gather_report_data(&summary, top);
    let report = generate_report(&data, format)?;
    emit_report(&report, sub_matches.get_one::<String>("output"), quiet)?;

    summary.ranking.map(|_| ()).map_err(Into::into)
}

pub fn handle_rank(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let edges_file = sub_matches
        .get_one::<PathBuf>("edges-file")
        .ok_or_else(|| anyhow!("--edges-file is required"))?;
    let graph = load_edge_list(edges_file)?;
    let config = rank_config_from(sub_matches);
    let top = sub_matches.get_one::<usize>("top").copied().unwrap_or(20);

    info!(
        "Ranking {} nodes and {} edges from {}",
        graph.node_count(),
        graph.edge_count(),
        edges_file.display()
    );
    let ranking = rank(&graph, &config);

    let data = gather_rank_report(&graph, &ranking, top);
    let report = generate_report(&data, report_format_from(sub_matches))?;
    emit_report(&report, sub_matches.get_one::<String>("output"), quiet)?;

    ranking.map(|_| ()).map_err(Into::into)
}
