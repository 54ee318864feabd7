//! Integration tests for QueryService using wiremock and a file-backed cache.
//!
//! These tests exercise the full miss → fetch → store → hit path over HTTP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use skyquery_cache::{cache_key, FileCache, ManualClock};
use skyquery_weather::{
    QueryService, ResponseError, RetryConfig, TransportConfig, Units, WeatherError, YqlTransport,
    DARK_LOGO, DARK_LOGO_KEY, LIGHT_LOGO, LIGHT_LOGO_KEY,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const YQL_PATH: &str = "/v1/public/yql";
const Q1: &str = "select * from weather.forecast where woeid = 2487956 and u='c'";

fn transport_for(server: &MockServer, retry: RetryConfig) -> Arc<YqlTransport> {
    Arc::new(
        YqlTransport::new(TransportConfig {
            base_url: format!("{}{}", server.uri(), YQL_PATH),
            timeout: Duration::from_secs(2),
            retry,
        })
        .unwrap(),
    )
}

fn service_for(server: &MockServer, dir: &tempfile::TempDir) -> QueryService {
    let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
    QueryService::new(Arc::new(cache), transport_for(server, RetryConfig::none()))
}

#[tokio::test]
async fn test_end_to_end_miss_then_hit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .and(query_param("q", Q1))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "results": { "temp": 20 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service_for(&server, &dir);

    let first = service.data(2487956, Units::Metric).await.unwrap();
    assert_eq!(first["query"]["results"]["temp"], json!(20));
    assert_eq!(first[LIGHT_LOGO_KEY], json!(LIGHT_LOGO));
    assert_eq!(first[DARK_LOGO_KEY], json!(DARK_LOGO));

    // Stored record already includes the augmentation
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join(cache_key(Q1))).unwrap()).unwrap();
    assert_eq!(raw["data"], serde_json::Value::Object(first.clone()));

    let second = service.data(2487956, Units::Metric).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.len(), 3);
}

#[tokio::test]
async fn test_cache_survives_new_service_instance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "results": { "wind": { "speed": "11" } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let first = service_for(&server, &dir)
        .wind(523920, Units::Imperial)
        .await
        .unwrap();
    let second = service_for(&server, &dir)
        .wind(523920, Units::Imperial)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "results": { "temp": 20 } }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
    let cache = FileCache::with_clock(dir.path(), Duration::from_secs(1), clock.clone()).unwrap();
    let service = QueryService::new(Arc::new(cache), transport_for(&server, RetryConfig::none()));

    service.fetch(Q1).await.unwrap();
    clock.advance(Duration::from_millis(500));
    service.fetch(Q1).await.unwrap();
    clock.advance(Duration::from_millis(1000));
    service.fetch(Q1).await.unwrap();
}

#[tokio::test]
async fn test_malformed_body_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service_for(&server, &dir);

    let err = service.fetch(Q1).await.unwrap_err();
    assert!(
        matches!(err, WeatherError::Response(ResponseError::InvalidResponse(_))),
        "unexpected error: {:?}",
        err
    );
    assert!(service.cache().get(Q1).unwrap().is_none());
}

#[tokio::test]
async fn test_null_results_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "count": 0, "results": null }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service_for(&server, &dir);

    let err = service.forecast(1, Units::Metric).await.unwrap_err();
    assert!(matches!(err, WeatherError::Response(ResponseError::NoResults)));
}

#[tokio::test]
async fn test_server_error_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service_for(&server, &dir);

    let err = service.conditions(1, Units::Metric).await.unwrap_err();
    assert!(matches!(err, WeatherError::Response(ResponseError::Unreachable(_))));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_timeout_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "query": { "results": {} } }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let transport = Arc::new(
        YqlTransport::new(TransportConfig {
            base_url: format!("{}{}", server.uri(), YQL_PATH),
            timeout: Duration::from_millis(200),
            retry: RetryConfig::none(),
        })
        .unwrap(),
    );
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
    let service = QueryService::new(Arc::new(cache), transport);

    let err = service.atmosphere(1, Units::Metric).await.unwrap_err();
    assert!(matches!(err, WeatherError::Response(ResponseError::Unreachable(_))));
}

#[tokio::test]
async fn test_unreachable_host_is_response_error() {
    // Nothing listens on port 1, so the connection is refused.
    let transport = Arc::new(
        YqlTransport::new(TransportConfig {
            base_url: format!("http://127.0.0.1:1{}", YQL_PATH),
            timeout: Duration::from_secs(2),
            retry: RetryConfig::none(),
        })
        .unwrap(),
    );
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
    let service = QueryService::new(Arc::new(cache), transport);

    let err = service.astronomy(1, Units::Metric).await.unwrap_err();
    assert!(matches!(err, WeatherError::Response(ResponseError::Unreachable(_))));
}

#[tokio::test]
async fn test_retry_recovers_from_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "results": { "temp": 7 } }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
    let service = QueryService::new(
        Arc::new(cache),
        transport_for(&server, RetryConfig::new(2, 10, 50)),
    );

    let payload = service.fetch(Q1).await.unwrap();
    assert_eq!(payload["query"]["results"]["temp"], json!(7));
}

#[tokio::test]
async fn test_location_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .and(query_param(
            "q",
            "select woeid, country.content, admin1.content, locality1.content from geo.places where text=\"Warsaw\"",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "count": 1, "results": { "place": { "woeid": "523920" } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service_for(&server, &dir);

    let payload = service.search_locations("Warsaw").await.unwrap();
    assert_eq!(
        payload["query"]["results"]["place"]["woeid"],
        json!("523920")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_are_coalesced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(YQL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "query": { "results": { "temp": 20 } } }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(service_for(&server, &dir));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.fetch(Q1).await })
        })
        .collect();

    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap().unwrap());
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
