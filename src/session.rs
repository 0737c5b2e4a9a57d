//! Session credential handling
//!
//! Decodes the bearer token handed out by the API's `/login`, decides whether
//! it is still usable, and publishes the login state to the rest of the app.
//! An expired or malformed token is treated exactly like a missing one and is
//! purged from storage as soon as it is discovered.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::database::CredentialStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not made of three segments")]
    Shape,
    #[error("token payload is not base64url")]
    Encoding,
    #[error("token payload is not valid JSON claims")]
    Claims,
    #[error("token has no expiration claim")]
    MissingExpiration,
}

/// Claims the front-end cares about. `exp` is a NumericDate and may carry a
/// fractional part.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: f64,
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<f64>,
}

/// Reads the claims embedded in a JWT-shaped token.
///
/// The signature is not checked here; the API does that on every call.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Shape);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| TokenError::Encoding)?;
    let raw: RawClaims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Claims)?;
    let exp = raw.exp.ok_or(TokenError::MissingExpiration)?;

    Ok(Claims { sub: raw.sub, exp })
}

/// True when `exp` (seconds) converted to milliseconds is strictly after `now`.
pub fn claims_unexpired(claims: &Claims, now: DateTime<Utc>) -> bool {
    claims.exp.is_finite() && claims.exp * 1000.0 > now.timestamp_millis() as f64
}

/// Fail-closed validity check for a stored credential.
pub fn is_session_valid(token: Option<&str>, now: DateTime<Utc>) -> bool {
    token
        .and_then(|t| decode_claims(t).ok())
        .is_some_and(|claims| claims_unexpired(&claims, now))
}

/// A usable credential, threaded explicitly to every call that needs it
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: String,
    claims: Claims,
}

impl Session {
    /// Builds a session from a raw token, or `None` if it is not usable at `now`.
    pub fn from_token(token: &str, now: DateTime<Utc>) -> Option<Self> {
        let claims = decode_claims(token).ok()?;
        claims_unexpired(&claims, now).then(|| Session {
            token: token.to_string(),
            claims,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp_ms = self.claims.exp * 1000.0;
        if !exp_ms.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(exp_ms.ceil() as i64)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        claims_unexpired(&self.claims, now)
    }
}

/// Loads the stored token and validates it, purging it when unusable.
#[derive(Clone)]
pub struct SessionGuard {
    store: CredentialStore,
}

impl SessionGuard {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn valid_session(&self, now: DateTime<Utc>) -> Result<Option<Session>, redb::Error> {
        let Some(token) = self.store.load()? else {
            return Ok(None);
        };

        match Session::from_token(&token, now) {
            Some(session) => Ok(Some(session)),
            None => {
                tracing::info!("stored credential is expired or malformed, purging it");
                self.store.purge()?;
                Ok(None)
            }
        }
    }
}

/// Login state as seen by the routing layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No evaluation has completed yet
    Checking,
    Authenticated(Session),
    Anonymous,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Checking => "checking",
            SessionState::Authenticated(_) => "logged_in",
            SessionState::Anonymous => "logged_out",
        }
    }
}

/// What a protected route must do for the current state
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Loading,
    Proceed(Session),
    RedirectToLogin,
}

pub fn decide(state: &SessionState, now: DateTime<Utc>) -> GuardDecision {
    match state {
        SessionState::Checking => GuardDecision::Loading,
        SessionState::Authenticated(session) if session.is_valid_at(now) => {
            GuardDecision::Proceed(session.clone())
        }
        _ => GuardDecision::RedirectToLogin,
    }
}

/// Application-wide login state, created once at the root and shared
/// through `AppState`.
#[derive(Clone)]
pub struct AuthContext {
    guard: SessionGuard,
    store: CredentialStore,
    state: Arc<watch::Sender<SessionState>>,
}

impl AuthContext {
    pub fn new(store: CredentialStore) -> Self {
        let (state, _) = watch::channel(SessionState::Checking);
        Self {
            guard: SessionGuard::new(store.clone()),
            store,
            state: Arc::new(state),
        }
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Re-reads the credential store and publishes the resulting state.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Result<SessionState, redb::Error> {
        let next = match self.guard.valid_session(now) {
            Ok(Some(session)) => SessionState::Authenticated(session),
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                // Unreadable storage counts as logged out.
                self.state.send_replace(SessionState::Anonymous);
                return Err(e);
            }
        };
        self.state.send_replace(next.clone());
        Ok(next)
    }

    /// Persists a freshly issued token. Returns `None` if the token is
    /// already unusable, in which case nothing is stored.
    pub fn login(&self, token: &str) -> Result<Option<Session>, redb::Error> {
        let now = Utc::now();
        let Some(session) = Session::from_token(token, now) else {
            tracing::warn!("API issued a token that is already expired or malformed");
            self.store.purge()?;
            self.state.send_replace(SessionState::Anonymous);
            return Ok(None);
        };
        self.store.save(token)?;
        self.state
            .send_replace(SessionState::Authenticated(session.clone()));
        Ok(Some(session))
    }

    /// Drops the credential, e.g. on logout or after a `401`.
    pub fn expire(&self) -> Result<(), redb::Error> {
        self.state.send_replace(SessionState::Anonymous);
        self.store.purge()
    }

    /// Keeps the published state fresh: re-evaluates whenever the
    /// credential store changes and when the current token runs out.
    pub fn spawn_watcher(&self) -> JoinHandle<()> {
        let ctx = self.clone();
        let mut changes = self.store.subscribe();

        tokio::spawn(async move {
            loop {
                let state = match ctx.evaluate(Utc::now()) {
                    Ok(state) => state,
                    Err(e) => {
                        tracing::error!("failed to read stored credential: {}", e);
                        SessionState::Anonymous
                    }
                };
                tracing::debug!(state = state.label(), "session state evaluated");

                let expiry = match &state {
                    SessionState::Authenticated(session) => session
                        .expires_at()
                        .and_then(|at| (at - Utc::now()).to_std().ok()),
                    _ => None,
                };

                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = sleep_or_pending(expiry) => {}
                }
            }
        })
    }
}

async fn sleep_or_pending(duration: Option<std::time::Duration>) {
    match duration {
        // One extra millisecond so the check lands strictly after `exp`.
        Some(d) => tokio::time::sleep(d + std::time::Duration::from_millis(1)).await,
        None => std::future::pending::<()>().await,
    }
}
