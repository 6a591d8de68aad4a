pub mod auth;
pub mod departments;
pub mod employees;
pub mod error;
pub mod growth_questions;
pub mod growth_scores;
pub mod jobs;
pub mod login_logs;
pub mod notifications;
pub mod problems;
pub mod responses;
pub mod session;
pub mod summaries;
pub mod surveys;
pub mod system;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::router(state.clone()))
        .nest("/api/departments", departments::router(state.clone()))
        .nest("/api/jobs", jobs::router(state.clone()))
        .nest("/api/employees", employees::router(state.clone()))
        .nest("/api/surveys", surveys::router(state.clone()))
        .merge(notifications::status_router(state.clone()))
        .nest("/api/notifications", notifications::router(state.clone()))
        .nest("/api/problems", problems::router(state.clone()))
        .nest(
            "/api/growth-survey-questions",
            growth_questions::router(state.clone()),
        )
        .merge(responses::router(state.clone()))
        .nest(
            "/api/organizational-survey-summary",
            summaries::router(state.clone()),
        )
        .nest(
            "/api/growth-survey-category-scores",
            growth_scores::router(state.clone()),
        )
        .nest("/api/users/login-logs", login_logs::router(state.clone()))
        .nest("/api/system", system::router(state))
}
