//! Integration tests for feed pagination against a mock upstream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zhihu_comments::error::AppError;
use zhihu_comments::models::{Endpoint, FeedConfig};
use zhihu_comments::services::{FeedFetcher, FeedSource};

const FEEDS_PATH: &str = "/questions/800718032/feeds";

/// Create a test configuration pointing at the mock server.
fn create_test_config(server: &MockServer) -> FeedConfig {
    FeedConfig {
        api_base: server.uri(),
        page_delay_ms: 0,
        request_timeout_secs: Some(5),
        ..FeedConfig::server_defaults()
    }
}

fn fetcher(config: FeedConfig) -> FeedFetcher {
    FeedFetcher::new(Arc::new(config)).expect("Failed to create fetcher")
}

/// A page of `ids` with the given paging block.
fn page(ids: &[u64], paging: Value) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"target_type": "answer", "target": {"id": id}}))
        .collect();
    json!({ "data": data, "paging": paging })
}

fn ids(items: &zhihu_comments::models::RawFeedPage) -> Vec<String> {
    items
        .data
        .iter()
        .filter_map(|item| item.resolve()?.answer_id().map(String::from))
        .collect()
}

#[tokio::test]
async fn test_single_page_when_upstream_says_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "10"))
        .and(query_param("platform", "desktop"))
        .and(query_param_is_missing("sort_by"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &[1, 2],
            json!({"is_end": true, "next": format!("{}/never", server.uri())}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let feed = fetcher(create_test_config(&server)).fetch_all().await.unwrap();
    assert_eq!(ids(&feed), ["1", "2"]);
}

#[tokio::test]
async fn test_follows_cursor_verbatim() {
    let server = MockServer::start().await;
    let next = format!("{}/cursor/page2?session_id=abc&offset=10", server.uri());

    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[1, 2], json!({"is_end": false, "next": next}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/page2"))
        .and(query_param("session_id", "abc"))
        .and(query_param("offset", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(&[3], json!({"is_end": true}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = fetcher(create_test_config(&server)).fetch_all().await.unwrap();
    assert_eq!(ids(&feed), ["1", "2", "3"]);
}

#[tokio::test]
async fn test_max_pages_caps_requests() {
    let server = MockServer::start().await;
    let next = format!("{}/cursor/more", server.uri());

    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[1], json!({"is_end": false, "next": next.clone()}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/more"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[2], json!({"is_end": false, "next": next}))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = FeedConfig {
        max_pages: Some(3),
        ..create_test_config(&server)
    };
    let feed = fetcher(config).fetch_all().await.unwrap();
    assert_eq!(feed.data.len(), 3);
}

#[tokio::test]
async fn test_error_envelope_fails_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "请求参数异常，请升级客户端后重试", "code": 10003}
        })))
        .mount(&server)
        .await;

    let err = fetcher(create_test_config(&server))
        .fetch_all()
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Upstream(ref m) if m.contains("请求参数异常")));
}

#[tokio::test]
async fn test_loosely_shaped_error_envelopes_fail_the_fetch() {
    for (body, expected) in [
        (json!({"error": "ERR_LOGIN_REQUIRED"}), "Zhihu API error: ERR_LOGIN_REQUIRED"),
        (
            json!({"error": {"message": null, "code": 40352}}),
            "Zhihu API error: error code 40352",
        ),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FEEDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = fetcher(create_test_config(&server))
            .fetch_all()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), expected);
    }
}

#[tokio::test]
async fn test_error_envelope_wins_over_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": {"message": "forbidden"}})),
        )
        .mount(&server)
        .await;

    let err = fetcher(create_test_config(&server))
        .fetch_all()
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Zhihu API error: forbidden");
}

#[tokio::test]
async fn test_non_success_status_fails_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let err = fetcher(create_test_config(&server))
        .fetch_all()
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UpstreamStatus { status: 403, .. }));
    assert_eq!(err.to_string(), "Zhihu API error: 403 Forbidden");
}

#[tokio::test]
async fn test_failure_on_later_page_discards_everything() {
    let server = MockServer::start().await;
    let next = format!("{}/cursor/broken", server.uri());
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[1], json!({"is_end": false, "next": next}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = fetcher(create_test_config(&server)).fetch_all().await;
    assert!(matches!(result, Err(AppError::UpstreamStatus { status: 500, .. })));
}

#[tokio::test]
async fn test_login_wall_stops_softly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &[1, 2],
            json!({
                "is_end": false,
                "need_force_login": true,
                "next": format!("{}/cursor/login", server.uri())
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let feed = fetcher(create_test_config(&server)).fetch_all().await.unwrap();
    assert_eq!(ids(&feed), ["1", "2"]);
}

#[tokio::test]
async fn test_missing_paging_ends_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": 5}]})))
        .expect(1)
        .mount(&server)
        .await;

    let feed = fetcher(create_test_config(&server)).fetch_all().await.unwrap();
    assert_eq!(ids(&feed), ["5"]);
}

#[tokio::test]
async fn test_answers_endpoint_sends_sort_by() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/800718032/answers"))
        .and(query_param("sort_by", "created"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(&[9], json!({"is_end": true}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = FeedConfig {
        endpoint: Endpoint::Answers,
        include: Endpoint::Answers.default_include().to_string(),
        ..create_test_config(&server)
    };
    let feed = fetcher(config).fetch_all().await.unwrap();
    assert_eq!(ids(&feed), ["9"]);
}

#[tokio::test]
async fn test_sends_base_and_custom_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .and(header("referer", "https://www.zhihu.com/question/800718032"))
        .and(header("cookie", "z_c0=token"))
        .and(header("x-zse-93", "101_3_3.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&[], json!({"is_end": true}))))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config
        .extra_headers
        .insert("cookie".into(), "z_c0=token".into());
    config
        .extra_headers
        .insert("x-zse-93".into(), "101_3_3.0".into());

    let feed = fetcher(config).fetch_all().await.unwrap();
    assert!(feed.data.is_empty());
}

const PAGE_DELAY_MS: u64 = 400;

fn delayed_config(server: &MockServer) -> FeedConfig {
    FeedConfig {
        page_delay_ms: PAGE_DELAY_MS,
        ..create_test_config(server)
    }
}

#[tokio::test]
async fn test_single_page_does_not_sleep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(&[1], json!({"is_end": true}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let started = Instant::now();
    let feed = fetcher(delayed_config(&server)).fetch_all().await.unwrap();
    assert_eq!(ids(&feed), ["1"]);
    assert!(started.elapsed() < Duration::from_millis(PAGE_DELAY_MS));
}

#[tokio::test]
async fn test_sleeps_between_pages_only() {
    let server = MockServer::start().await;
    let second = format!("{}/cursor/second", server.uri());
    let third = format!("{}/cursor/third", server.uri());

    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[1], json!({"is_end": false, "next": second}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/second"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[2], json!({"is_end": false, "next": third}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/third"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(&[3], json!({"is_end": true}))),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let feed = fetcher(delayed_config(&server)).fetch_all().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(ids(&feed), ["1", "2", "3"]);
    assert!(elapsed >= Duration::from_millis(2 * PAGE_DELAY_MS), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3 * PAGE_DELAY_MS), "{elapsed:?}");
}

#[tokio::test]
async fn test_page_cap_does_not_sleep_after_last_page() {
    let server = MockServer::start().await;
    let next = format!("{}/cursor/more", server.uri());

    Mock::given(method("GET"))
        .and(path(FEEDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[1], json!({"is_end": false, "next": next.clone()}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/more"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(&[2], json!({"is_end": false, "next": next}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = FeedConfig {
        max_pages: Some(2),
        ..delayed_config(&server)
    };
    let started = Instant::now();
    let feed = fetcher(config).fetch_all().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(feed.data.len(), 2);
    assert!(elapsed >= Duration::from_millis(PAGE_DELAY_MS), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2 * PAGE_DELAY_MS), "{elapsed:?}");
}
