//! Shared fixtures: a mock shortener API, token builder and app setup

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

use shortener_web::api::ApiClient;
use shortener_web::clipboard::{Clipboard, ClipboardError};
use shortener_web::database::{init_db, AppState};
use shortener_web::route::create_app;

pub const USERNAME: &str = "user@example.com";
pub const PASSWORD: &str = "secret1";

/// Builds a JWT-shaped token; the signature segment is not checked client-side.
pub fn make_token(exp: i64, sub: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": sub, "exp": exp }).to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn valid_token() -> String {
    make_token(Utc::now().timestamp() + 3600, USERNAME)
}

pub fn expired_token() -> String {
    make_token(Utc::now().timestamp() - 60, USERNAME)
}

/// What the mock API has seen and how it should behave
#[derive(Default)]
pub struct MockState {
    pub token: String,
    pub links: Vec<Value>,
    pub analytics_chart: Vec<Value>,
    pub registered: Vec<String>,
    /// Every bearer token is refused with `401`
    pub revoked: bool,
    /// `PUT /invalidate/{id}` answers `500` with this message
    pub invalidate_failure: Option<String>,
    /// `POST /login` answers `503`
    pub login_outage: bool,
    pub login_calls: usize,
    pub register_calls: usize,
    pub logout_calls: usize,
    pub account_calls: usize,
    pub shorten_calls: usize,
    pub invalidate_calls: usize,
    pub extend_calls: usize,
    pub last_shortened: Option<String>,
    pub last_authorization: Option<String>,
}

#[derive(Clone)]
pub struct MockApi {
    pub base_url: String,
    pub inner: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap()
    }
}

pub fn sample_links() -> Vec<Value> {
    vec![
        json!({
            "id": 1, "url": "https://example.com/one", "shortUrl": "aaa111",
            "active": true, "createdAt": "2024-01-01T10:00:00",
            "expiration": "2099-01-01T00:00:00", "lastAccessed": null,
            "clicksCount": 5, "extensions": 0, "maximumExtensions": 5
        }),
        json!({
            "id": 2, "url": "https://example.com/two", "shortUrl": "bbb222",
            "active": true, "createdAt": "2024-01-03T10:00:00",
            "expiration": "2000-01-01T00:00:00",
            "clicksCount": 5, "extensions": 1, "maximumExtensions": 5
        }),
        json!({
            "id": 3, "url": "https://example.com/three", "shortUrl": "ccc333",
            "active": false, "createdAt": "2024-01-02T10:00:00",
            "expiration": "2099-01-01T00:00:00",
            "clicksCount": 0, "extensions": 0, "maximumExtensions": 5
        }),
        json!({
            "id": 4, "url": "https://example.com/four", "shortUrl": "ddd444",
            "active": true, "createdAt": "2024-01-04T10:00:00",
            "expiration": "2099-01-01T00:00:00",
            "clicksCount": 12, "extensions": 5, "maximumExtensions": 5
        }),
    ]
}

fn authorized(mock: &MockApi, headers: &HeaderMap) -> bool {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut state = mock.state();
    state.last_authorization = header.clone();
    !state.revoked && header == Some(format!("Bearer {}", state.token))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
}

async fn mock_login(State(mock): State<MockApi>, Json(body): Json<Value>) -> Response {
    let mut state = mock.state();
    state.login_calls += 1;
    if state.login_outage {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        Json(json!({ "token": state.token })).into_response()
    } else {
        unauthorized()
    }
}

async fn mock_register(State(mock): State<MockApi>, Json(body): Json<Value>) -> Response {
    let mut state = mock.state();
    state.register_calls += 1;
    let username = body["username"].as_str().unwrap_or_default().to_string();
    if state.registered.contains(&username) {
        return (StatusCode::CONFLICT, Json(json!({ "error": "exists" }))).into_response();
    }
    state.registered.push(username);
    StatusCode::CREATED.into_response()
}

async fn mock_logout(State(mock): State<MockApi>) -> StatusCode {
    mock.state().logout_calls += 1;
    StatusCode::OK
}

async fn mock_account(State(mock): State<MockApi>, headers: HeaderMap) -> Response {
    mock.state().account_calls += 1;
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    Json(Value::Array(mock.state().links.clone())).into_response()
}

async fn mock_shorten(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    authorized(&mock, &headers);
    let mut state = mock.state();
    state.shorten_calls += 1;
    state.last_shortened = body["urlAddress"].as_str().map(str::to_string);
    Json(json!({ "fullShortUrl": format!("{}/r/zzz999", mock.base_url), "code": "zzz999" }))
        .into_response()
}

async fn mock_analytics(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    let state = mock.state();
    let link = state.links.iter().find(|l| l["id"] == id).cloned();
    Json(json!({ "url": link, "analyticsChart": state.analytics_chart })).into_response()
}

async fn mock_invalidate(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    mock.state().invalidate_calls += 1;
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    let mut state = mock.state();
    if let Some(message) = state.invalidate_failure.clone() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": message })),
        )
            .into_response();
    }
    if let Some(link) = state.links.iter_mut().find(|l| l["id"] == id) {
        link["active"] = json!(false);
    }
    StatusCode::OK.into_response()
}

async fn mock_extend(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    mock.state().extend_calls += 1;
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    let days = body["days"].as_i64().unwrap_or_default();
    let mut state = mock.state();
    let Some(link) = state.links.iter_mut().find(|l| l["id"] == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let extensions = link["extensions"].as_i64().unwrap_or_default() + 1;
    let expiration = format!("2099-01-{:02}T00:00:00Z", 1 + days);
    link["extensions"] = json!(extensions);
    link["expiration"] = json!(expiration);
    Json(json!({
        "id": id,
        "extensions": extensions,
        "expiration": expiration,
        "maximumExtensions": link["maximumExtensions"],
    }))
    .into_response()
}

/// Starts the mock API on an ephemeral port
pub async fn spawn_mock_api() -> MockApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mock = MockApi {
        base_url: format!("http://{}", addr),
        inner: Arc::new(Mutex::new(MockState {
            token: valid_token(),
            links: sample_links(),
            ..Default::default()
        })),
    };

    let router = Router::new()
        .route("/login", post(mock_login))
        .route("/register", post(mock_register))
        .route("/logout", post(mock_logout))
        .route("/account", get(mock_account))
        .route("/shorten", post(mock_shorten))
        .route("/analytics/{id}", get(mock_analytics))
        .route("/invalidate/{id}", put(mock_invalidate))
        .route("/url/{id}/extend", put(mock_extend))
        .with_state(mock.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    mock
}

/// Records what was copied, or fails every copy
#[derive(Default)]
pub struct FakeClipboard {
    pub copied: Mutex<Vec<String>>,
    pub deny: bool,
}

impl Clipboard for FakeClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.deny {
            return Err(ClipboardError::Denied("permission denied".to_string()));
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub mock: MockApi,
    pub clipboard: Arc<FakeClipboard>,
    _temp_db: NamedTempFile,
}

impl TestContext {
    /// Stores the mock API's token and publishes the logged-in state
    pub fn log_in(&self) {
        let token = self.mock.state().token.clone();
        self.state.auth.login(&token).unwrap().expect("token should be valid");
    }

    /// Publishes whatever is stored (as the background watcher would)
    pub fn settle(&self) {
        self.state.auth.evaluate(Utc::now()).unwrap();
    }
}

pub async fn setup_with_clipboard(clipboard: FakeClipboard) -> TestContext {
    let mock = spawn_mock_api().await;

    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize storage");
    let api = ApiClient::new(&format!("{}/", mock.base_url), Duration::from_secs(5)).unwrap();
    let clipboard = Arc::new(clipboard);

    let state = AppState::new(Arc::new(db), api, clipboard.clone());
    let app = create_app(state.clone());

    TestContext {
        app,
        state,
        mock,
        clipboard,
        _temp_db: temp_db,
    }
}

pub async fn setup() -> TestContext {
    setup_with_clipboard(FakeClipboard::default()).await
}

/// Helper function to parse response body as JSON
pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

pub fn ids(view: &Value) -> Vec<i64> {
    view["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_i64().unwrap())
        .collect()
}
