use std::io::Write;
use std::path::PathBuf;
use surfrank::handlers::*;
use tempfile::{NamedTempFile, TempDir};
use url::Url;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_with_port_and_no_scheme() {
    let result = parse_url_line("example.com:8443/docs");
    assert_eq!(result, Some("https://example.com:8443/docs".to_string()));
}

#[test]
fn test_parse_url_line_keeps_other_schemes() {
    // The crawler's scheme filter rejects these later
    let result = parse_url_line("http://example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    let result = parse_url_line("not a valid url!!!");
    assert_eq!(result, None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com")?;
    writeln!(temp_file, "httpbin.org")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "# a comment")?;
    writeln!(temp_file, "  https://api.example.com  ")?;

    let path = PathBuf::from(temp_file.path());
    let urls = load_urls_from_file(&path)?;

    assert_eq!(urls.len(), 3);
    assert_eq!(urls[0], "https://example.com");
    assert_eq!(urls[1], "https://httpbin.org");
    assert_eq!(urls[2], "https://api.example.com");

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_urls_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("No valid URLs"));
}

#[test]
fn test_load_urls_from_missing_file() {
    let result = load_urls_from_file(&PathBuf::from("/nonexistent/seeds.txt"));
    assert!(result.unwrap_err().to_string().contains("Failed to read"));
}

#[test]
fn test_load_urls_from_source_urls() {
    let urls = vec![
        Url::parse("https://example.com").unwrap(),
        Url::parse("https://example.org/start").unwrap(),
    ];
    let result = load_urls_from_source(&urls, None).unwrap();

    assert_eq!(result, vec!["https://example.com/", "https://example.org/start"]);
}

#[test]
fn test_load_urls_from_source_no_input() {
    let result = load_urls_from_source(&[], None);
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Either --url or --hosts-file must be provided")
    );
}

#[test]
fn test_load_blacklist_merges_arguments_and_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "# trackers")?;
    writeln!(temp_file, "ads.example")?;

    let path = PathBuf::from(temp_file.path());
    let blacklist = load_blacklist(&["https://x.com".to_string()], Some(&path))?;

    assert_eq!(blacklist, vec!["https://x.com", "https://ads.example"]);
    Ok(())
}

#[test]
fn test_load_blacklist_may_be_empty() {
    assert!(load_blacklist(&[], None).unwrap().is_empty());
}

#[test]
fn test_parse_edge_list() {
    let graph = parse_edge_list(
        "# tiny web\n\
         a b\n\
         b\ta\n\
         \n\
         a b\n\
         lonely\n",
    )
    .unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.contains_edge("b", "a"));
    assert_eq!(graph.out_degree("lonely"), 0);
}

#[test]
fn test_parse_edge_list_rejects_extra_fields() {
    let err = parse_edge_list("a b\na b c\n").unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_load_edge_list_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("edges.txt");
    std::fs::write(&path, "A B\nB A\n")?;

    let graph = load_edge_list(&path)?;

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 2);
    Ok(())
}

#[test]
fn test_emit_report_writes_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("report.txt");

    emit_report("hello", Some(&path.display().to_string()), false)?;

    assert_eq!(std::fs::read_to_string(&path)?, "hello");
    Ok(())
}

#[test]
fn test_quiet_emit_report_still_writes_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("ranks.json");

    emit_report("{\"ranks\": []}", Some(&path.display().to_string()), true)?;

    assert_eq!(std::fs::read_to_string(&path)?, "{\"ranks\": []}");
    Ok(())
}
