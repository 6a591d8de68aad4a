use crate::db;
use crate::domain::models::Department;
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
pub struct DepartmentList {
    pub departments: Vec<Department>,
}

#[derive(Serialize)]
pub struct DepartmentPayloadOut {
    pub department: Department,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    pub name: String,
    pub code: String,
    pub parent_id: Option<i64>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .with_state(state)
}

fn validate(input: &DepartmentInput) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("部署名を入力してください".to_string()));
    }
    if input.code.trim().is_empty() {
        return Err(ApiError::BadRequest("部署コードを入力してください".to_string()));
    }
    Ok(())
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<DepartmentList> {
    require_admin(&state, employee_id).await?;

    let mut departments = db::list_departments(&state.pool).await?;
    // Codes are numeric-as-string; sort numerically where possible.
    departments.sort_by_key(|d| (d.numeric_code().unwrap_or(i64::MAX), d.id));

    Ok(ok(DepartmentList { departments }))
}

async fn create(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<DepartmentPayloadOut> {
    require_admin(&state, employee_id).await?;
    validate(&input)?;

    if let Some(parent_id) = input.parent_id {
        if db::find_department(&state.pool, parent_id).await?.is_none() {
            return Err(ApiError::BadRequest("親部署が存在しません".to_string()));
        }
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO departments (name, code, parent_id)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(input.name.trim())
    .bind(input.code.trim())
    .bind(input.parent_id)
    .fetch_one(&state.pool)
    .await?;

    let department = db::find_department(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("部署が見つかりません".to_string()))?;

    Ok(ok(DepartmentPayloadOut { department }))
}

async fn update(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<DepartmentPayloadOut> {
    require_admin(&state, employee_id).await?;
    validate(&input)?;

    if db::find_department(&state.pool, id).await?.is_none() {
        return Err(ApiError::NotFound("部署が見つかりません".to_string()));
    }

    if let Some(parent_id) = input.parent_id {
        if parent_id == id {
            return Err(ApiError::BadRequest("自分自身を親部署にはできません".to_string()));
        }
        if db::find_department(&state.pool, parent_id).await?.is_none() {
            return Err(ApiError::BadRequest("親部署が存在しません".to_string()));
        }
    }

    sqlx::query(
        r#"
        UPDATE departments
        SET name = $1,
            code = $2,
            parent_id = $3,
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(input.name.trim())
    .bind(input.code.trim())
    .bind(input.parent_id)
    .bind(id)
    .execute(&state.pool)
    .await?;

    let department = db::find_department(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("部署が見つかりません".to_string()))?;

    Ok(ok(DepartmentPayloadOut { department }))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let result = sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("部署が見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}
