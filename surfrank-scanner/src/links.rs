//! URL helpers shared by the scheduler: host extraction, the https filter and
//! anchor resolution.

use url::Url;

/// The only scheme the crawler will fetch.
pub const CRAWLABLE_SCHEME: &str = "https";

/// Returns the `scheme://netloc/` prefix of a URL, the unit of rate limiting
/// and robots caching.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
        None => format!("{}://{}/", parsed.scheme(), host),
    })
}

/// True when the URL parses and carries the `https` scheme.
pub fn is_crawlable(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.scheme() == CRAWLABLE_SCHEME && u.host_str().is_some())
        .unwrap_or(false)
}

/// Turns an anchor href into an absolute URL, resolved against the page it
/// was found on.
pub fn format_href(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Formats every href and keeps the crawlable ones. Order and duplicates are
/// preserved; the frontier tolerates both.
pub fn extract_links<'a, I>(page_url: &str, hrefs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    hrefs
        .into_iter()
        .filter_map(|href| format_href(page_url, href))
        .filter(|url| is_crawlable(url))
        .collect()
}
