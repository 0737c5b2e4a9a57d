//! HTTP request handlers for the shortener front-end
//!
//! This module implements the pages and actions of the front-end:
//! - Login, registration, logout and the Google sign-in hand-off
//! - Shortening a URL
//! - The account dashboard (stats, filtering, sorting)
//! - Invalidating, extending and copying owned links
//! - The analytics page with its fixed 12-day window
//!
//! Protected handlers receive the `Session` from the route guard and pass it
//! to the API client explicitly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use chrono::{Local, Utc};
use serde_json::{json, Value};

use crate::analytics::{build_fixed_window, total_clicks, WINDOW_DAYS};
use crate::api::ApiError;
use crate::database::AppState;
use crate::error::{AppError, AppResult, LOGIN_PATH};
use crate::model::{
    AnalyticsView, ApiCredentials, DashboardParams, ExtendRequest, LoginRequest, RegisterRequest,
    ShortenRequest, ShortenResult,
};
use crate::session::{Session, SessionState};
use crate::validation::{normalize_username, validate_login, validate_registration, validate_target};
use crate::view::{check_extension, is_expired, DashboardView, ExtendRefusal};

/// Turns an API failure into the front-end's answer.
///
/// A `401` purges the credential and forgets the local link list before the
/// redirect to the login page; anything else becomes a recoverable message
/// and leaves local state untouched.
async fn api_failure(state: &AppState, err: ApiError, default_message: &str) -> AppError {
    match err {
        ApiError::Unauthorized => {
            tracing::info!("API refused the session, logging out");
            if let Err(e) = state.auth.expire() {
                tracing::error!("failed to purge credential: {}", e);
            }
            state.links.write().await.cancel();
            AppError::SessionExpired
        }
        other => {
            tracing::warn!("API call failed: {}", other);
            AppError::Upstream(other.user_message(default_message))
        }
    }
}

fn is_outage(err: &ApiError) -> bool {
    matches!(err, ApiError::Rejected { status, .. } if status.is_server_error())
}

fn session_json(state: &SessionState) -> Value {
    match state {
        SessionState::Authenticated(session) => json!({
            "state": state.label(),
            "subject": session.subject(),
            "expiresAt": session.expires_at(),
        }),
        _ => json!({ "state": state.label() }),
    }
}

/// Login entry point
///
/// Everything the login page needs: the current login state and where the
/// browser goes for Google sign-in.
pub async fn login_page(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "page": "login",
        "session": session_json(&state.auth.current()),
        "googleLoginUrl": state.api.google_authorization_url(),
    }))
}

/// Logs in with e-mail and password
///
/// # Request Body
///
/// ```json
/// { "username": "you@example.com", "password": "secret1" }
/// ```
///
/// # Response
///
/// - **200 OK** - token stored, session details returned
/// - **400 Bad Request** - malformed e-mail or short password (no API call)
/// - **401 Unauthorized** - the API refused the credentials
/// - **502 Bad Gateway** - the API is down or answered something unreadable
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    validate_login(&payload.username, &payload.password)
        .map_err(|msg| AppError::Validation(msg.to_string()))?;

    let credentials = ApiCredentials {
        username: normalize_username(&payload.username),
        password: payload.password,
    };

    let issued = match state.api.login(&credentials).await {
        Ok(issued) => issued,
        Err(e @ (ApiError::Unauthorized | ApiError::Rejected { .. })) if !is_outage(&e) => {
            tracing::info!("login refused: {}", e);
            return Err(AppError::InvalidCredentials("Invalid credentials.".to_string()));
        }
        Err(e) => {
            tracing::warn!("login request failed: {}", e);
            return Err(AppError::Upstream(
                "Something went wrong. Please try again.".to_string(),
            ));
        }
    };

    // A different account may be logging in; forget the previous list.
    state.links.write().await.cancel();

    match state.auth.login(&issued.token)? {
        Some(session) => {
            tracing::info!(subject = ?session.subject(), "logged in");
            Ok(Json(session_json(&SessionState::Authenticated(session))))
        }
        None => Err(AppError::Upstream(
            "Login failed: the server issued an unusable token.".to_string(),
        )),
    }
}

/// Creates an account
///
/// # Response
///
/// - **201 Created** - account created, continue at the login page
/// - **400 Bad Request** - client-side validation failed (no API call)
/// - **502 Bad Gateway** - the API refused the registration
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    validate_registration(
        &payload.username,
        &payload.password,
        &payload.confirm_password,
    )
    .map_err(|msg| AppError::Validation(msg.to_string()))?;

    let credentials = ApiCredentials {
        username: normalize_username(&payload.username),
        password: payload.password,
    };

    if let Err(e) = state.api.register(&credentials).await {
        tracing::info!("registration refused: {}", e);
        return Err(AppError::Upstream(
            "Registration failed. Email may already exist.".to_string(),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "registered": true, "next": LOGIN_PATH })),
    ))
}

/// Logs out locally and on the API, then sends the browser to the login page
pub async fn logout(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let session = match state.auth.current() {
        SessionState::Authenticated(session) => Some(session),
        _ => None,
    };
    state.api.logout(session.as_ref()).await;

    state.auth.expire()?;
    state.links.write().await.cancel();
    tracing::info!("logged out");

    Ok(Redirect::to(LOGIN_PATH))
}

/// Full-page hand-off to the API's Google sign-in
pub async fn google_login(State(state): State<AppState>) -> impl IntoResponse {
    Redirect::to(&state.api.google_authorization_url())
}

fn status_page(page: &str, title: &str, subtitle: &str, hint: &str) -> Value {
    json!({
        "page": page,
        "title": title,
        "subtitle": subtitle,
        "hint": hint,
        "actions": { "home": "/", "login": LOGIN_PATH },
    })
}

/// Where the API sends visitors of a short link that is no longer active
pub async fn expired_page() -> impl IntoResponse {
    Json(status_page(
        "expired",
        "Link expired",
        "The shortened URL you tried to access is no longer active.",
        "If you own this link, log in to manage it in your dashboard.",
    ))
}

fn not_found_payload() -> Value {
    status_page(
        "not-found",
        "404 - Not found",
        "The shortened URL you tried to access doesn't exist or was deleted.",
        "If you own this link, log in to check your dashboard.",
    )
}

/// Where the API sends visitors of an unknown short link
pub async fn not_found_page() -> impl IntoResponse {
    Json(not_found_payload())
}

/// Any path without a route
pub async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(not_found_payload()))
}

/// Current login state
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(session_json(&state.auth.current()))
}

/// Home page, where URLs are shortened
pub async fn home(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(json!({
        "page": "home",
        "subject": session.subject(),
        "shorten": "/shorten",
        "dashboard": "/dashboard",
    }))
}

/// Shortens a URL
///
/// The input is sanitized (whitespace removed, `https://` assumed) and must
/// be a valid http(s) URL before anything is sent. The new link is owned by
/// the session's account.
///
/// # Response
///
/// ```json
/// {
///   "original": "https://example.com/very/long/url",
///   "shortUrl": "http://localhost:8080/r/aZ3kP9",
///   "code": "aZ3kP9"
/// }
/// ```
pub async fn shorten(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ShortenRequest>,
) -> AppResult<impl IntoResponse> {
    let target = validate_target(&payload.url).map_err(|msg| AppError::Validation(msg.to_string()))?;

    let created = match state.api.shorten(&session, &target).await {
        Ok(created) => created,
        Err(e) => {
            return Err(api_failure(&state, e, "Something went wrong. Please try again.").await)
        }
    };

    Ok(Json(ShortenResult {
        original: target,
        short_url: created.full_short_url,
        code: created.code,
    }))
}

/// Fetches `/account` and replaces the local list, unless a newer fetch or
/// a logout superseded this one meanwhile.
async fn refresh_links(state: &AppState, session: &Session) -> AppResult<()> {
    let ticket = state.links.write().await.begin_fetch();

    let links = match state.api.account(session).await {
        Ok(links) => links,
        Err(e) => return Err(api_failure(state, e, "Could not load your URLs. Try again.").await),
    };

    if !state.links.write().await.commit(ticket, links) {
        tracing::debug!("dropping superseded /account response");
    }
    Ok(())
}

async fn current_view(state: &AppState, params: &DashboardParams) -> DashboardView {
    let api = &state.api;
    state
        .links
        .read()
        .await
        .view(params.status, params.sort, Utc::now(), |link| {
            api.short_link_for(link)
        })
}

/// Account dashboard
///
/// Re-fetches the account's links, then returns the filtered and sorted list
/// together with the summary stats (always over every link).
///
/// # Example Request
///
/// `GET /dashboard?status=active&sort=desc`
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<DashboardParams>,
) -> AppResult<Json<DashboardView>> {
    refresh_links(&state, &session).await?;
    Ok(Json(current_view(&state, &params).await))
}

/// Re-derives the dashboard from the local list
///
/// Changing the filter or sort needs no network call; the list is only
/// fetched if nothing has been loaded yet.
pub async fn dashboard_view(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<DashboardParams>,
) -> AppResult<Json<DashboardView>> {
    let loaded = state.links.read().await.is_loaded();
    if !loaded {
        refresh_links(&state, &session).await?;
    }
    Ok(Json(current_view(&state, &params).await))
}

/// Analytics for one link
///
/// # Response
///
/// `series` always holds exactly 12 consecutive days ending today, with
/// zero-click days filled in; `totalClicks` is summed over that window.
pub async fn analytics(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> AppResult<Json<AnalyticsView>> {
    let data = match state.api.analytics(&session, id).await {
        Ok(data) => data,
        Err(e) => return Err(api_failure(&state, e, "Could not load analytics.").await),
    };

    let series = build_fixed_window(
        &data.analytics_chart,
        Local::now().date_naive(),
        WINDOW_DAYS,
    );
    let total = total_clicks(&series);

    Ok(Json(AnalyticsView {
        short_link: data.url.as_ref().map(|link| state.api.short_link_for(link)),
        url: data.url,
        series,
        total_clicks: total,
    }))
}

/// Invalidates a link
///
/// On success the row is patched locally (`active = false`, expiration set to
/// now) and flagged pending until the next dashboard fetch confirms it.
pub async fn invalidate(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Query(params): Query<DashboardParams>,
) -> AppResult<Json<DashboardView>> {
    if let Err(e) = state.api.invalidate(&session, id).await {
        return Err(api_failure(&state, e, "Could not invalidate the URL.").await);
    }

    if !state.links.write().await.mark_invalidated(id, Utc::now()) {
        tracing::debug!(id, "invalidated link is not in the local list");
    }
    tracing::info!(id, "link invalidated");

    Ok(Json(current_view(&state, &params).await))
}

/// Extends a link's expiration by 1 to 7 days
///
/// Refused without a network call when the link's extension quota is used
/// up or the link is already expired.
///
/// # Response
///
/// - **200 OK** - updated dashboard view
/// - **400 Bad Request** - `days` outside 1..=7
/// - **404 Not Found** - the link is not one of the account's links
/// - **409 Conflict** - no extensions left or link expired
pub async fn extend(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Query(params): Query<DashboardParams>,
    Json(payload): Json<ExtendRequest>,
) -> AppResult<Json<DashboardView>> {
    if !state.links.read().await.is_loaded() {
        refresh_links(&state, &session).await?;
    }

    let link = state
        .links
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Link not found.".to_string()))?;

    match check_extension(&link, payload.days, Utc::now()) {
        Ok(()) => {}
        Err(refusal @ ExtendRefusal::DaysOutOfRange) => {
            return Err(AppError::Validation(refusal.message().to_string()))
        }
        Err(refusal) => return Err(AppError::ExtensionRejected(refusal.message().to_string())),
    }

    let response = match state.api.extend(&session, id, payload.days).await {
        Ok(response) => response,
        Err(e) => return Err(api_failure(&state, e, "Could not extend the URL.").await),
    };

    state.links.write().await.apply_extension(id, &response);
    tracing::info!(id, days = payload.days, "link extended");

    Ok(Json(current_view(&state, &params).await))
}

/// Copies a link's short URL to the clipboard
///
/// Best-effort: a failure is reported as a notice, never as an error status.
pub async fn copy_link(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !state.links.read().await.is_loaded() {
        refresh_links(&state, &session).await?;
    }

    let link = state
        .links
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Link not found.".to_string()))?;

    let short_link = state.api.short_link_for(&link);
    if is_expired(&link, Utc::now()) {
        return Ok(Json(json!({
            "copied": false,
            "shortLink": short_link,
            "notice": "This link is expired and can no longer be copied.",
        })));
    }

    let clipboard = state.clipboard.clone();
    let text = short_link.clone();
    let outcome = tokio::task::spawn_blocking(move || clipboard.write_text(&text)).await;

    let body = match outcome {
        Ok(Ok(())) => json!({ "copied": true, "shortLink": short_link }),
        Ok(Err(e)) => {
            tracing::warn!("copy failed: {}", e);
            json!({
                "copied": false,
                "shortLink": short_link,
                "notice": "Copy failed. Clipboard access was blocked.",
            })
        }
        Err(e) => {
            tracing::error!("clipboard task failed: {}", e);
            json!({
                "copied": false,
                "shortLink": short_link,
                "notice": "Copy failed. Clipboard access was blocked.",
            })
        }
    };
    Ok(Json(body))
}
