use osintel_collect::{Collector, GithubCollector, HttpSettings, RssCollector};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn github_collects_commits_and_issues() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "sha": "abc123",
                "html_url": "https://github.com/acme/widgets/commit/abc123",
                "commit": {
                    "message": "Fix retry loop\n\ndetails",
                    "author": {"name": "Ada", "date": "2026-08-29T10:00:00Z"}
                }
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "number": 42,
                "title": "Broken pagination",
                "body": "Steps to reproduce",
                "state": "open",
                "labels": [{"name": "bug"}],
                "comments": 1,
                "user": {"login": "grace"},
                "html_url": "https://github.com/acme/widgets/issues/42",
                "created_at": "2026-08-29T12:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let config = json!({"repositories": ["acme/widgets"]});
    let collector = GithubCollector::from_config_with_base_url(&config, &HttpSettings::default(), &server.uri())
        .expect("valid config");

    let items = collector.collect().await.expect("collection succeeds");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].item_type, "commit");
    assert_eq!(items[0].external_id.as_deref(), Some("abc123"));
    assert_eq!(items[1].item_type, "issue");
    assert_eq!(items[1].external_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn github_skips_failing_repository() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/broken/commits"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/ok/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "sha": "def456",
                "commit": {"message": "works"}
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ok/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = json!({"repositories": ["acme/broken", "acme/ok"]});
    let collector = GithubCollector::from_config_with_base_url(&config, &HttpSettings::default(), &server.uri())
        .expect("valid config");

    let items = collector.collect().await.expect("collection succeeds");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id.as_deref(), Some("def456"));
}

#[tokio::test]
async fn github_test_connection_reports_reachability() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": {}})))
        .mount(&server)
        .await;

    let config = json!({"repositories": []});
    let collector = GithubCollector::from_config_with_base_url(&config, &HttpSettings::default(), &server.uri())
        .expect("valid config");
    assert!(collector.test_connection().await);

    let unreachable = GithubCollector::from_config_with_base_url(&config, &HttpSettings::default(), "http://127.0.0.1:9")
        .expect("valid config");
    assert!(!unreachable.test_connection().await);
}

#[tokio::test]
async fn rss_collects_articles_across_feeds() {
    let server = MockServer::start().await;

    let feed = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>Campaign observed</title>
    <link>https://example.com/a</link>
    <guid>a-1</guid>
    <description>Report body</description>
    <pubDate>Fri, 28 Aug 2026 09:30:00 GMT</pubDate>
  </item>
</channel></rss>"#;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = json!({
        "feeds": [
            format!("{}/feed.xml", server.uri()),
            format!("{}/down.xml", server.uri()),
        ]
    });
    let collector = RssCollector::from_config(&config, &HttpSettings::default()).expect("valid config");

    let items = collector.collect().await.expect("collection succeeds");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_type, "article");
    assert_eq!(items[0].external_id.as_deref(), Some("a-1"));
    assert_eq!(items[0].content, "Report body");
}

#[tokio::test]
async fn rss_test_connection_probes_first_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
        .mount(&server)
        .await;

    let config = json!({"feeds": [format!("{}/feed.xml", server.uri())]});
    let collector = RssCollector::from_config(&config, &HttpSettings::default()).expect("valid config");
    assert!(collector.test_connection().await);

    let dead = json!({"feeds": ["http://127.0.0.1:9/feed.xml"]});
    let collector = RssCollector::from_config(&dead, &HttpSettings::default()).expect("valid config");
    assert!(!collector.test_connection().await);
}
