//! Route definitions for the shortener front-end
//!
//! This module maps every page and action to its handler and puts the
//! session guard in front of the account pages.

use axum::routing::{get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    analytics, copy_link, dashboard, dashboard_view, expired_page, extend, fallback, google_login,
    home, invalidate, login, login_page, logout, not_found_page, register, session_status,
    shorten,
};

use axum::middleware;
use crate::middleware::require_session;

/// Creates the router with all routes configured
///
/// # Route Definitions
///
/// Public:
/// - `GET /login` - Login entry point
/// - `POST /login` - Log in with e-mail and password
/// - `POST /register` - Create an account
/// - `POST /logout` - Log out and go back to the login page
/// - `GET /oauth2/google` - Hand off to Google sign-in
/// - `GET /session` - Current login state
/// - `GET /expired` - Status page for a link that is no longer active
/// - `GET /not-found` - Status page for an unknown link (also every unmatched path)
///
/// Behind the session guard:
/// - `GET /` - Home page
/// - `POST /shorten` - Shorten a URL
/// - `GET /dashboard` - Fetch links, return the dashboard view
/// - `GET /dashboard/view` - Re-derive the view from the local list
/// - `GET /analytics/{id}` - 12-day click series for one link
/// - `PUT /links/{id}/invalidate` - Invalidate a link
/// - `PUT /links/{id}/extend` - Extend a link by 1 to 7 days
/// - `POST /links/{id}/copy` - Copy a link's short URL
///
/// # Example Usage
///
/// ```no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use shortener_web::api::ApiClient;
/// # use shortener_web::clipboard::SystemClipboard;
/// # use shortener_web::database::{init_db, AppState};
/// # use shortener_web::route::create_app;
/// # let db = init_db("session.db").unwrap();
/// # let api = ApiClient::new("http://localhost:8080", Duration::from_secs(10)).unwrap();
/// let state = AppState::new(Arc::new(db), api, Arc::new(SystemClipboard));
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    // Account pages require a usable session
    let protected = Router::new()
        .route("/", get(home))
        .route("/shorten", post(shorten))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/view", get(dashboard_view))
        .route("/analytics/{id}", get(analytics))
        .route("/links/{id}/invalidate", put(invalidate))
        .route("/links/{id}/extend", put(extend))
        .route("/links/{id}/copy", post(copy_link))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/oauth2/google", get(google_login))
        .route("/session", get(session_status))
        .route("/expired", get(expired_page))
        .route("/not-found", get(not_found_page))
        .merge(protected)
        .fallback(fallback)
        // Inject the application state into all handlers
        .with_state(state)
}
