use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use portal_cache::{CacheSettings, MokaLinkCache, ResolutionCache};
use portal_core::{ClickRepository, ClickWindow, Dispatcher, LinkRepository, ShortCode};
use portal_gateway::{App, AppState};
use portal_generator::{InMemorySequence, SequenceGenerator};
use portal_redirector::{ClickRecorder, ResolutionService};
use portal_shortener::{CodeGenerator, LinkService, UrlPolicy};
use portal_storage::InMemoryRepository;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BASE_URL: &str = "https://sho.rt";

struct TestApp {
    router: Router,
    store: Arc<InMemoryRepository>,
    dispatcher: Dispatcher,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryRepository::new());
        let cache = ResolutionCache::new(Arc::new(MokaLinkCache::new()), CacheSettings::default());
        let ids = SequenceGenerator::new(Arc::new(InMemorySequence::with_offset(100_000)));
        let codes = CodeGenerator::new(Arc::new(ids), store.clone());
        let links = LinkService::new(
            store.clone(),
            store.clone(),
            codes,
            cache.clone(),
            UrlPolicy::default(),
        );
        let dispatcher = Dispatcher::default();
        let recorder = ClickRecorder::new(store.clone(), store.clone(), cache.clone());
        let resolver = ResolutionService::new(store.clone(), cache, recorder, dispatcher.clone());

        let router = App::router(AppState::new(links, Arc::new(resolver), BASE_URL));
        Self {
            router,
            store,
            dispatcher,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn create(&self, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, "/v1/links", Some(body)).await
    }
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_returns_created_link() {
    let app = TestApp::new();
    let (status, body) = app
        .create(json!({
            "url": "HTTPS://Example.com/docs",
            "created_by": "alice",
            "description": "docs"
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let code = body["short_code"].as_str().unwrap();
    assert_eq!(body["short_url"], format!("{BASE_URL}/{code}"));
    assert_eq!(body["long_url"], "https://example.com/docs");
    assert_eq!(body["status"], "active");
    assert_eq!(body["created_by"], "alice");
    assert_eq!(body["version"], 1);
}

#[tokio::test]
async fn create_errors_map_to_statuses() {
    let app = TestApp::new();

    let (status, body) = app.create(json!({ "url": "ftp://example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_url");

    let (status, body) = app
        .create(json!({ "url": "https://example.com", "custom_code": "a!" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_custom_code");

    app.create(json!({ "url": "https://example.com", "custom_code": "taken" }))
        .await;
    let (status, body) = app
        .create(json!({ "url": "https://example.org", "custom_code": "taken" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "code_conflict");
}

#[tokio::test]
async fn redirect_answers_found_and_counts_click() {
    let app = TestApp::new();
    app.create(json!({ "url": "https://example.com/landing", "custom_code": "go" }))
        .await;

    let request = Request::builder()
        .uri("/go")
        .header(header::USER_AGENT, "curl/8.4.0")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.send(request).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        headers.get(header::LOCATION).unwrap(),
        "https://example.com/landing"
    );

    app.dispatcher.drain().await;
    let code = ShortCode::new_unchecked("go");
    assert_eq!(app.store.find_by_code(&code).await.unwrap().click_count, 1);
    let summary = app.store.summary(&code, ClickWindow::all()).await.unwrap();
    assert_eq!(summary.devices.get("curl"), Some(&1));
}

#[tokio::test]
async fn redirect_errors_map_to_statuses() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "link_not_found");

    app.create(json!({ "url": "https://example.com", "custom_code": "paused" }))
        .await;
    let (status, _) = app
        .call(Method::POST, "/v1/links/paused/disable", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::GET, "/paused", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "link_disabled");
}

#[tokio::test]
async fn info_update_and_delete() {
    let app = TestApp::new();
    app.create(json!({ "url": "https://example.com", "custom_code": "doc" }))
        .await;

    let (status, body) = app.call(Method::GET, "/v1/links/doc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);

    let (status, body) = app
        .call(
            Method::PATCH,
            "/v1/links/doc",
            Some(json!({ "url": "https://example.org", "version": 1, "updated_by": "bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["long_url"], "https://example.org/");
    assert_eq!(body["updated_by"], "bob");
    assert_eq!(body["version"], 2);

    let (status, body) = app
        .call(
            Method::PATCH,
            "/v1/links/doc",
            Some(json!({ "description": "stale", "version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "version_conflict");

    let (status, _) = app
        .call(Method::DELETE, "/v1/links/doc?version=2", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::GET, "/v1/links/doc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::GET, "/doc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_reports_failures_by_index() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/v1/links/batch",
            Some(json!({
                "links": [
                    { "url": "https://example.com/a" },
                    { "url": "javascript:alert(1)" },
                    { "url": "https://example.com/c" }
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert_eq!(body["failed"][0]["index"], 1);
    assert_eq!(body["failed"][0]["error"]["code"], "invalid_url");
}

#[tokio::test]
async fn list_pages_and_filters() {
    let app = TestApp::new();
    for owner in ["alice", "bob", "alice"] {
        app.create(json!({ "url": "https://example.com", "created_by": owner }))
            .await;
    }

    let (status, body) = app
        .call(
            Method::GET,
            "/v1/links?created_by=alice&page=1&page_size=1",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page_count"], 2);
    assert_eq!(body["page_size"], 1);
    assert_eq!(body["links"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_summarize_clicks() {
    let app = TestApp::new();
    app.create(json!({ "url": "https://example.com", "custom_code": "stat" }))
        .await;

    for ua in ["curl/8.0", "Mozilla/5.0 (iPhone) Mobile"] {
        let request = Request::builder()
            .uri("/stat")
            .header(header::USER_AGENT, ua)
            .body(Body::empty())
            .unwrap();
        app.send(request).await;
    }
    app.dispatcher.drain().await;

    let (status, body) = app.call(Method::GET, "/v1/links/stat/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["devices"]["curl"], 1);
    assert_eq!(body["devices"]["mobile"], 1);
    assert_eq!(body["referers"]["direct"], 2);

    let (status, _) = app.call(Method::GET, "/v1/links/none/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            Method::GET,
            "/v1/links/stat/stats?until=2000-01-01T00:00:00Z",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, body) = app
        .call(
            Method::GET,
            "/v1/links/stat/stats?since=2030-01-01T00:00:00Z&until=2020-01-01T00:00:00Z",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn daily_stats_group_clicks_by_day() {
    let app = TestApp::new();
    app.create(json!({ "url": "https://example.com", "custom_code": "day" }))
        .await;

    for ip in ["198.51.100.1", "198.51.100.1", "198.51.100.2"] {
        let request = Request::builder()
            .uri("/day")
            .header("x-real-ip", ip)
            .body(Body::empty())
            .unwrap();
        app.send(request).await;
    }
    app.dispatcher.drain().await;

    let (status, body) = app
        .call(Method::GET, "/v1/links/day/stats/daily", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["clicks"], 3);
    assert_eq!(days[0]["unique_ips"], 2);
    assert_eq!(days[0]["date"].as_str().unwrap().len(), 10);

    let (status, body) = app
        .call(Method::GET, "/v1/links/day/stats/daily?days=0", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_request");

    let (status, _) = app
        .call(Method::GET, "/v1/links/none/stats/daily?days=7", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_codes_are_rejected() {
    let app = TestApp::new();
    let long = "a".repeat(40);
    let (status, body) = app.call(Method::GET, &format!("/{long}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_short_code");
}
