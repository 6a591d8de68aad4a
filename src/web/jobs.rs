use crate::db;
use crate::domain::models::Job;
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult, Empty};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
}

#[derive(Serialize)]
pub struct JobPayloadOut {
    pub job: Job,
}

#[derive(Deserialize)]
pub struct JobInput {
    pub name: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .with_state(state)
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<JobList> {
    require_admin(&state, employee_id).await?;
    let jobs = db::list_jobs(&state.pool).await?;
    Ok(ok(JobList { jobs }))
}

async fn create(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(input): Json<JobInput>,
) -> ApiResult<JobPayloadOut> {
    require_admin(&state, employee_id).await?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("役職名を入力してください".to_string()));
    }
    if db::find_job_by_name(&state.pool, name).await?.is_some() {
        return Err(ApiError::Conflict(format!("役職「{name}」は既に存在します")));
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO jobs (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(&state.pool)
        .await?;

    let job = db::find_job(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("役職が見つかりません".to_string()))?;

    Ok(ok(JobPayloadOut { job }))
}

async fn update(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<JobInput>,
) -> ApiResult<JobPayloadOut> {
    require_admin(&state, employee_id).await?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("役職名を入力してください".to_string()));
    }

    let result = sqlx::query("UPDATE jobs SET name = $1 WHERE id = $2")
        .bind(name)
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("役職が見つかりません".to_string()));
    }

    let job = db::find_job(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("役職が見つかりません".to_string()))?;

    Ok(ok(JobPayloadOut { job }))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("役職が見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}
