//! Data models for the shortener front-end
//!
//! This module defines the records returned by the shortener API and the
//! request/response payloads exchanged with both the API and the browser.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Default extension quota when the API omits `maximumExtensions`
pub const DEFAULT_MAXIMUM_EXTENSIONS: u32 = 5;

/// A short link owned by the logged-in account, as returned by `GET /account`
///
/// The record is owned by the API. The front-end only reflects state changes
/// (tentatively after invalidate/extend, authoritatively after a re-fetch).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    /// Identifier used by the invalidate/extend/analytics endpoints
    pub id: i64,

    /// The original long URL
    pub url: String,

    /// The short code (e.g. "aZ3kP9")
    pub short_url: String,

    /// Whether the API still serves this link
    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub expiration: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub last_accessed: Option<DateTime<Utc>>,

    /// Number of times the short link has been followed
    #[serde(default)]
    pub clicks_count: u64,

    /// Extensions already spent
    #[serde(default)]
    pub extensions: u32,

    #[serde(default = "default_maximum_extensions")]
    pub maximum_extensions: u32,
}

fn default_active() -> bool {
    true
}

fn default_maximum_extensions() -> u32 {
    DEFAULT_MAXIMUM_EXTENSIONS
}

/// Accepts RFC 3339 strings, naive ISO date-times (local time), bare dates
/// (UTC midnight) and epoch milliseconds. Anything else becomes `None`.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(timestamp_from_json(&raw, &Local))
}

pub fn timestamp_from_json<Tz: TimeZone>(raw: &Value, tz: &Tz) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_timestamp_in(s, tz),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            })?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(value, &Local)
}

/// Like [`parse_timestamp`], with naive date-times read in `tz`.
pub fn parse_timestamp_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One day of the click series
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPoint {
    /// Calendar date in `YYYY-MM-DD` form
    pub date: String,

    #[serde(default)]
    pub clicks_count: u64,
}

/// Response of `GET /analytics/{id}`
///
/// `analyticsChart` is sparse: only days with at least one click are present.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub url: Option<ShortLink>,

    #[serde(default)]
    pub analytics_chart: Vec<AnalyticsPoint>,
}

/// Response of `PUT /url/{id}/extend`
///
/// Every field is optional; absent values keep the local ones.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtendResponse {
    pub id: Option<i64>,
    pub extensions: Option<u32>,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub expiration: Option<DateTime<Utc>>,
    pub maximum_extensions: Option<u32>,
}

/// Response of `POST /shorten`
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub full_short_url: String,
    pub code: String,
}

/// Response of `POST /login`
#[derive(Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub token: String,
}

/// Body sent to the API's `/login` and `/register`
#[derive(Serialize, Debug, Clone)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

/// Request payload for `POST /login`
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request payload for `POST /register`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request payload for `POST /shorten`
///
/// # Example
/// ```json
/// { "url": "example.com/very/long/url" }
/// ```
#[derive(Deserialize)]
pub struct ShortenRequest {
    /// Raw user input; sanitized before validation
    pub url: String,
}

/// Result shown after a successful shorten
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResult {
    /// The sanitized URL that was submitted
    pub original: String,
    pub short_url: String,
    pub code: String,
}

/// Request payload for `PUT /links/{id}/extend`
#[derive(Deserialize)]
pub struct ExtendRequest {
    pub days: u32,
}

/// Query parameters of the dashboard routes
///
/// # Example
/// Query string: `?status=expired&sort=desc`
#[derive(Deserialize, Default)]
pub struct DashboardParams {
    #[serde(default)]
    pub status: crate::view::StatusFilter,

    #[serde(default)]
    pub sort: crate::view::ClickSort,
}

/// Analytics page payload
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub url: Option<ShortLink>,
    /// Display short link, when the API returned the link record
    pub short_link: Option<String>,
    pub series: Vec<AnalyticsPoint>,
    pub total_clicks: u64,
}
