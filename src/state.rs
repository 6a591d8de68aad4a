use crate::middleware::RateLimiter;
use crate::services::notify::Notifier;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_key: Vec<u8>,
    pub notifier: Notifier,
    pub login_limiter: RateLimiter,
    pub database_url: String,
    pub org_tz: Tz,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

/// Survey windows are calendar days in the organization's timezone.
pub fn org_timezone() -> Tz {
    let raw = std::env::var("ORG_TIMEZONE").unwrap_or_else(|_| "Asia/Tokyo".to_string());
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid ORG_TIMEZONE '{}', falling back to Asia/Tokyo", raw);
        chrono_tz::Asia::Tokyo
    })
}
