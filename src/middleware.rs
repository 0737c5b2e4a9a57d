use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::database::AppState;
use crate::error::AppError;
use crate::session::{decide, GuardDecision};

/// Route guard for every page that needs a logged-in user
///
/// Looks at the published session state and:
/// - while the first evaluation is still running, answers with a neutral
///   loading response (never the page, never a redirect),
/// - without a usable credential, purges whatever is stored and redirects to
///   the login page with `303 See Other` so the protected page does not stay
///   in history,
/// - otherwise hands the `Session` to the handler through request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match decide(&state.auth.current(), Utc::now()) {
        GuardDecision::Loading => (
            StatusCode::ACCEPTED,
            [(header::RETRY_AFTER, "1")],
            Json(json!({ "status": "loading" })),
        )
            .into_response(),
        GuardDecision::RedirectToLogin => {
            tracing::debug!(path = %request.uri().path(), "no usable session, redirecting to login");
            if let Err(e) = state.auth.expire() {
                return AppError::Storage(e).into_response();
            }
            state.links.write().await.cancel();
            AppError::SessionExpired.into_response()
        }
        GuardDecision::Proceed(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
    }
}
