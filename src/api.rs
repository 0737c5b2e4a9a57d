//! Client for the external shortener API
//!
//! All business rules (code generation, click counting, expiration) live on
//! the other side of these calls. Authenticated calls take the `Session`
//! explicitly and send it as a bearer token.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::model::{
    AnalyticsResponse, ApiCredentials, ExtendResponse, LoginResponse, ShortLink, ShortenResponse,
};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered `401`; the credential is no longer accepted
    #[error("session is no longer accepted by the API")]
    Unauthorized,

    #[error("API rejected the request ({status}): {message:?}")]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("could not reach the API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected API response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Message for the user, falling back to `default` when the API gave none.
    pub fn user_message(&self, default: &str) -> String {
        match self {
            ApiError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => default.to_string(),
        }
    }
}

/// Strips trailing slashes so paths can be joined with a single `/`.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("shortener-web/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Where the browser is sent for Google sign-in
    pub fn google_authorization_url(&self) -> String {
        self.endpoint("oauth2/authorization/google")
    }

    /// Public link that redirects to the original URL
    pub fn short_link_for(&self, link: &ShortLink) -> String {
        self.endpoint(&format!("r/{}", link.short_url))
    }

    pub async fn login(&self, credentials: &ApiCredentials) -> Result<LoginResponse, ApiError> {
        let response = send(self.http.post(self.endpoint("login")).json(credentials)).await?;
        decode(response).await
    }

    pub async fn register(&self, credentials: &ApiCredentials) -> Result<(), ApiError> {
        send(self.http.post(self.endpoint("register")).json(credentials)).await?;
        Ok(())
    }

    /// Best-effort: the server session may already be gone.
    pub async fn logout(&self, session: Option<&Session>) {
        let request = with_session(self.http.post(self.endpoint("logout")), session);
        if let Err(e) = send(request).await {
            tracing::debug!("logout call failed, ignoring: {}", e);
        }
    }

    pub async fn account(&self, session: &Session) -> Result<Vec<ShortLink>, ApiError> {
        let request = with_session(self.http.get(self.endpoint("account")), Some(session));
        let response = send(request).await?;
        // An empty body means no links yet.
        let links: Option<Vec<ShortLink>> = decode(response).await?;
        Ok(links.unwrap_or_default())
    }

    pub async fn shorten(&self, session: &Session, url: &str) -> Result<ShortenResponse, ApiError> {
        let request = self
            .http
            .post(self.endpoint("shorten"))
            .json(&json!({ "urlAddress": url }));
        let response = send(with_session(request, Some(session))).await?;
        decode(response).await
    }

    pub async fn analytics(
        &self,
        session: &Session,
        id: i64,
    ) -> Result<AnalyticsResponse, ApiError> {
        let request = self.http.get(self.endpoint(&format!("analytics/{}", id)));
        let response = send(with_session(request, Some(session))).await?;
        decode(response).await
    }

    pub async fn invalidate(&self, session: &Session, id: i64) -> Result<(), ApiError> {
        let request = self
            .http
            .put(self.endpoint(&format!("invalidate/{}", id)))
            .json(&json!({}));
        send(with_session(request, Some(session))).await?;
        Ok(())
    }

    pub async fn extend(
        &self,
        session: &Session,
        id: i64,
        days: u32,
    ) -> Result<ExtendResponse, ApiError> {
        let request = self
            .http
            .put(self.endpoint(&format!("url/{}/extend", id)))
            .json(&json!({ "days": days }));
        let response = send(with_session(request, Some(session))).await?;
        decode(response).await
    }
}

fn with_session(request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
    match session {
        Some(session) => request.bearer_auth(session.token()),
        None => request,
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(ApiError::Transport)?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body: Option<Value> = response.json().await.ok();
        let message = body.as_ref().and_then(error_message);
        tracing::warn!(%status, ?message, "API call rejected");
        return Err(ApiError::Rejected { status, message });
    }
    Ok(response)
}

/// Prefers the body's `message`, then `error`, when they are strings.
fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(ApiError::Transport)?;
    // An empty body reads as JSON `null`, which `Option<T>` callers accept.
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("failed to decode API response: {}", e);
        ApiError::Decode(e)
    })
}
