//! Corpus fetching against a mock MediaWiki API

mod test_helpers;

use cityqa::corpus::{Corpus, CorpusError, WikipediaClient, WikipediaConfig};
use serde_json::json;
use std::time::Duration;
use test_helpers::BOSTON_TEXT;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn extract_body(title: &str, extract: &str) -> serde_json::Value {
    json!({
        "batchcomplete": "",
        "query": {"pages": {"1": {"pageid": 1, "ns": 0, "title": title, "extract": extract}}}
    })
}

async fn mount_article(server: &MockServer, title: &str, extract: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "query"))
        .and(query_param("prop", "extracts"))
        .and(query_param("explaintext", "true"))
        .and(query_param("titles", title))
        .respond_with(ResponseTemplate::new(200).set_body_json(extract_body(title, extract)))
        .expect(times)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> WikipediaClient {
    WikipediaClient::new(WikipediaConfig {
        api_url: format!("{}/w/api.php", server.uri()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_returns_plain_text_extract() {
    let server = MockServer::start().await;
    mount_article(&server, "Boston", BOSTON_TEXT, 1).await;

    let document = client(&server).fetch("Boston").await.unwrap();
    assert_eq!(document.title, "Boston");
    assert!(document.text.contains("== History =="));
}

#[tokio::test]
async fn test_fetch_missing_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"pages": {"-1": {"ns": 0, "title": "Atlantis", "missing": ""}}}
        })))
        .mount(&server)
        .await;

    let result = client(&server).fetch("Atlantis").await;
    assert!(matches!(result, Err(CorpusError::PageNotFound(title)) if title == "Atlantis"));
}

#[tokio::test]
async fn test_fetch_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client(&server).fetch("Boston").await;
    assert!(matches!(result, Err(CorpusError::Fetch { .. })));
}

#[tokio::test]
async fn test_corpus_fetch_caches_and_skips_cached_titles() {
    let server = MockServer::start().await;
    mount_article(&server, "Boston", BOSTON_TEXT, 1).await;
    mount_article(&server, "Seattle", "Seattle is in Washington.", 2).await;

    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("Boston.txt"), "old Boston text").unwrap();

    let titles = vec!["Boston".to_string(), "Seattle".to_string()];
    let client = client(&server);

    let report = Corpus::fetch(&titles, &data_dir, &client, false).await.unwrap();
    assert_eq!(report.downloaded, vec!["Seattle"]);
    assert_eq!(report.cached, vec!["Boston"]);

    let report = Corpus::fetch(&titles, &data_dir, &client, true).await.unwrap();
    assert_eq!(report.downloaded, titles);

    let corpus = Corpus::load(&titles, &data_dir).unwrap();
    assert_eq!(corpus.get("Boston").unwrap().text, BOSTON_TEXT);
    assert_eq!(corpus.get("seattle").unwrap().text, "Seattle is in Washington.");
}

#[tokio::test]
async fn test_corpus_fetch_refresh_overwrites_stale_cache() {
    let server = MockServer::start().await;
    mount_article(&server, "Boston", BOSTON_TEXT, 1).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Boston.txt"), "stale Boston text").unwrap();

    let report = Corpus::fetch(&["Boston".to_string()], dir.path(), &client(&server), true)
        .await
        .unwrap();
    assert_eq!(report.downloaded, vec!["Boston"]);
    assert!(report.cached.is_empty());

    let cached = std::fs::read_to_string(dir.path().join("Boston.txt")).unwrap();
    assert_eq!(cached, BOSTON_TEXT);
}

#[tokio::test]
async fn test_corpus_fetch_creates_data_dir() {
    let server = MockServer::start().await;
    mount_article(&server, "Seattle", "Seattle.", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("nested").join("data");

    Corpus::fetch(&["Seattle".to_string()], &data_dir, &client(&server), false)
        .await
        .unwrap();
    assert!(data_dir.join("Seattle.txt").exists());
}
