use crate::error::{Result, ScanError};
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "surfrank/0.1 (+https://github.com/trapdoorsec/surfrank)";

/// Raw response for a page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: Vec<u8>,
}

/// What the scheduler needs out of a page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub anchors: Vec<String>,
    pub title: Option<String>,
}

pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedPage>>;
}

pub trait PageParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<ParsedPage>;
}

/// Builds the shared HTTP client used for pages and robots.txt.
pub fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self::new(build_client(timeout_secs, DEFAULT_USER_AGENT)?))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedPage>> {
        Box::pin(async move {
            debug!("Fetching {}", url);
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(FetchedPage { status, body })
        })
    }
}

/// Anchor and title extraction backed by `scraper`.
#[derive(Debug, Clone)]
pub struct HtmlParser {
    anchors: Selector,
    title: Selector,
}

impl HtmlParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            anchors: parse_selector("a[href]")?,
            title: parse_selector("title")?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScanError::ParseError(format!("selector {}: {}", selector, e)))
}

impl PageParser for HtmlParser {
    fn parse(&self, body: &[u8]) -> Result<ParsedPage> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let anchors = document
            .select(&self.anchors)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| !href.is_empty())
            .map(|href| href.to_string())
            .collect();

        let title = document
            .select(&self.title)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string());

        Ok(ParsedPage { anchors, title })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_html_parser_extracts_anchors_and_title() {
        let parser = HtmlParser::new().unwrap();
        let page = parser
            .parse(
                br#"<html><head><title> Page A </title></head><body>
                    <a href="/b">B</a>
                    <a href="https://c.example/">C</a>
                    <a>no href</a>
                    <a href="">empty</a>
                </body></html>"#,
            )
            .unwrap();

        assert_eq!(page.anchors, vec!["/b", "https://c.example/"]);
        assert_eq!(page.title, Some("Page A".to_string()));
    }

    #[test]
    fn test_html_parser_missing_and_empty_title() {
        let parser = HtmlParser::new().unwrap();

        let untitled = parser.parse(b"<html><body>nothing</body></html>").unwrap();
        assert_eq!(untitled.title, None);

        let empty = parser
            .parse(b"<html><head><title></title></head></html>")
            .unwrap();
        assert_eq!(empty.title, Some(String::new()));
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_status_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><title>T</title></html>".as_slice()),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::with_timeout(5).unwrap();
        let url = format!("{}/page", mock_server.uri());
        let page = fetcher.fetch(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, b"<html><title>T</title></html>");
    }

    #[tokio::test]
    async fn test_http_fetcher_surfaces_transport_errors() {
        let fetcher = HttpFetcher::with_timeout(1).unwrap();
        // Port 9 (discard) on localhost is not listening in test environments
        let result = fetcher.fetch("http://127.0.0.1:9/").await;
        assert!(matches!(result, Err(ScanError::HttpError(_))));
    }
}
