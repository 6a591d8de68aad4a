use crate::db;
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub survey_id: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStatusRow {
    pub employee_id: i64,
    pub name: String,
    pub email: String,
    pub department_name: Option<String>,
    pub responded: bool,
    pub response_rate: f64,
}

#[derive(Serialize)]
pub struct ResponseStatusList {
    pub statuses: Vec<ResponseStatusRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPayload {
    pub survey_id: i64,
    pub user_ids: Vec<i64>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct SendResult {
    pub sent: usize,
    pub failed: usize,
}

pub fn status_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/survey-response-status", get(response_status))
        .with_state(state)
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/send", post(send))
        .with_state(state)
}

/// Per-employee response standing for one survey. "Responded" means the
/// employee's own response rate reached 100%, not merely "has any row".
async fn response_status(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<ResponseStatusList> {
    require_admin(&state, employee_id).await?;

    if db::find_survey(&state.pool, query.survey_id).await?.is_none() {
        return Err(ApiError::NotFound("サーベイが見つかりません".to_string()));
    }

    let statuses = sqlx::query_as::<_, ResponseStatusRow>(
        r#"
        SELECT e.id AS employee_id,
               e.name,
               e.email,
               d.name AS department_name,
               COALESCE(s.response_rate >= 100, FALSE) AS responded,
               COALESCE(s.response_rate, 0) AS response_rate
        FROM employees e
        LEFT JOIN departments d ON d.id = e.department_id
        LEFT JOIN org_survey_summaries s
               ON s.employee_id = e.id AND s.survey_id = $1
        WHERE e.role != 'none'
        ORDER BY e.id ASC
        "#,
    )
    .bind(query.survey_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ok(ResponseStatusList { statuses }))
}

/// Dispatch one notification per target employee. Delivery and retry are
/// owned by the external API; this loop only reports aggregate counts.
async fn send(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<SendPayload>,
) -> ApiResult<SendResult> {
    require_admin(&state, employee_id).await?;

    if payload.user_ids.is_empty() {
        return Err(ApiError::BadRequest("通知先が選択されていません".to_string()));
    }
    if !state.notifier.is_configured() {
        return Err(ApiError::BadRequest(
            "通知APIが設定されていません".to_string(),
        ));
    }

    let survey = db::find_survey(&state.pool, payload.survey_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;

    let mut sent = 0usize;
    let mut failed = 0usize;

    for user_id in &payload.user_ids {
        let employee = match db::find_employee_by_id(&state.pool, *user_id).await? {
            Some(employee) => employee,
            None => {
                tracing::warn!("Notification target {} not found", user_id);
                failed += 1;
                continue;
            }
        };

        match state
            .notifier
            .send(&employee, &survey, payload.message.as_deref())
            .await
        {
            Ok(()) => {
                sent += 1;
                tracing::debug!("Sent survey reminder to {}", employee.email);
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to notify {}: {}", employee.email, e);
            }
        }

        // Keep the external API happy.
        tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
    }

    tracing::info!(
        "Survey reminder dispatch finished: {} sent, {} failed",
        sent,
        failed
    );

    Ok(ok(SendResult { sent, failed }))
}
