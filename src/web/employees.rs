use crate::db::{self, EmployeeWithOrg};
use crate::domain::models::Role;
use crate::import_utils::{self, EmployeeImportRow, RowError};
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult, Empty};
use crate::web::session::{require_admin, UserSession};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

/// Row-level import errors shown individually are capped; the rest are
/// reported as a count.
const IMPORT_ERROR_DETAIL_LIMIT: usize = 5;

#[derive(Serialize)]
pub struct EmployeeList {
    pub employees: Vec<EmployeeWithOrg>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeIdOut {
    pub id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeePayload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub department_id: Option<i64>,
    pub job_id: Option<i64>,
}

/// PUT carries the full edit form; omitted ids clear the assignment.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeePayload {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub job_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct PasswordPayload {
    pub password: String,
}

#[derive(Deserialize)]
pub struct ImportPayload {
    pub rows: Vec<EmployeeImportRow>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
    pub more_errors: usize,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .route("/import", post(import))
        .route("/:id/password", post(reset_password))
        .with_state(state)
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::BadRequest(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    let salt = SaltString::generate(OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<EmployeeList> {
    require_admin(&state, employee_id).await?;
    let employees = db::list_employees(&state.pool).await?;
    Ok(ok(EmployeeList { employees }))
}

async fn create(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<CreateEmployeePayload>,
) -> ApiResult<EmployeeIdOut> {
    require_admin(&state, employee_id).await?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("氏名を入力してください".to_string()));
    }
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("メールアドレスが不正です".to_string()));
    }
    if db::find_employee_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::Conflict(format!("{email} は既に登録されています")));
    }

    if let Some(department_id) = payload.department_id {
        if db::find_department(&state.pool, department_id).await?.is_none() {
            return Err(ApiError::BadRequest("部署が存在しません".to_string()));
        }
    }
    if let Some(job_id) = payload.job_id {
        if db::find_job(&state.pool, job_id).await?.is_none() {
            return Err(ApiError::BadRequest("役職が存在しません".to_string()));
        }
    }

    let hash = hash_password(&payload.password)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO employees (name, email, hash, role, department_id, job_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(&hash)
    .bind(payload.role.unwrap_or(Role::Employee))
    .bind(payload.department_id)
    .bind(payload.job_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ok(EmployeeIdOut { id }))
}

async fn update(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(target_id): Path<i64>,
    Json(payload): Json<UpdateEmployeePayload>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    if db::find_employee_by_id(&state.pool, target_id).await?.is_none() {
        return Err(ApiError::NotFound("従業員が見つかりません".to_string()));
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("氏名を入力してください".to_string()));
    }
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("メールアドレスが不正です".to_string()));
    }
    if let Some(existing) = db::find_employee_by_email(&state.pool, &email).await? {
        if existing.id != target_id {
            return Err(ApiError::Conflict(format!("{email} は既に登録されています")));
        }
    }

    if let Some(department_id) = payload.department_id {
        if db::find_department(&state.pool, department_id).await?.is_none() {
            return Err(ApiError::BadRequest("部署が存在しません".to_string()));
        }
    }
    if let Some(job_id) = payload.job_id {
        if db::find_job(&state.pool, job_id).await?.is_none() {
            return Err(ApiError::BadRequest("役職が存在しません".to_string()));
        }
    }

    sqlx::query(
        r#"
        UPDATE employees
        SET name = $1,
            email = $2,
            role = $3,
            department_id = $4,
            job_id = $5,
            updated_at = NOW()
        WHERE id = $6
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(payload.role)
    .bind(payload.department_id)
    .bind(payload.job_id)
    .bind(target_id)
    .execute(&state.pool)
    .await?;

    Ok(ok(Empty {}))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(target_id): Path<i64>,
) -> ApiResult<Empty> {
    let requester = require_admin(&state, employee_id).await?;
    if requester.id == target_id {
        return Err(ApiError::BadRequest("自分自身は削除できません".to_string()));
    }

    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(target_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("従業員が見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}

async fn import(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<ImportPayload>,
) -> ApiResult<ImportResult> {
    require_admin(&state, employee_id).await?;

    if payload.rows.is_empty() {
        return Err(ApiError::BadRequest("取り込む行がありません".to_string()));
    }

    let outcome = import_utils::import_employees(&state.pool, &payload.rows).await?;
    let failed = outcome.errors.len();
    let mut errors = outcome.errors;
    let more_errors = failed.saturating_sub(IMPORT_ERROR_DETAIL_LIMIT);
    errors.truncate(IMPORT_ERROR_DETAIL_LIMIT);

    tracing::info!("Employee import finished: {} imported, {} failed", outcome.imported, failed);

    Ok(ok(ImportResult {
        imported: outcome.imported,
        failed,
        errors,
        more_errors,
    }))
}

async fn reset_password(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(target_id): Path<i64>,
    Json(payload): Json<PasswordPayload>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let hash = hash_password(&payload.password)?;

    let result = sqlx::query("UPDATE employees SET hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&hash)
        .bind(target_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("従業員が見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}
