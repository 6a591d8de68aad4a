use crate::db;
use crate::domain::categories;
use crate::domain::models::Problem;
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult, Empty};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ProblemList {
    pub problems: Vec<Problem>,
}

#[derive(Serialize)]
pub struct ProblemPayloadOut {
    pub problem: Problem,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemInput {
    pub question_text: String,
    pub category: String,
    pub category_id: i32,
    pub answer1_score: f64,
    pub answer2_score: f64,
    pub answer3_score: f64,
    pub answer4_score: f64,
    pub answer5_score: f64,
    pub answer6_score: f64,
}

#[derive(Deserialize)]
pub struct OrderPayload {
    pub ids: Vec<i64>,
}

/// Up/down buttons send a direction; drag-and-drop sends the target
/// index. Both land on the same persisted ordering.
#[derive(Deserialize)]
pub struct MovePayload {
    pub direction: Option<String>,
    pub to: Option<usize>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .route("/:id/move", post(move_problem))
        .route("/order", post(reorder))
        .with_state(state)
}

fn validate(input: &ProblemInput) -> Result<(), ApiError> {
    if input.question_text.trim().is_empty() {
        return Err(ApiError::BadRequest("設問文を入力してください".to_string()));
    }
    if !categories::is_problem_category(&input.category) {
        return Err(ApiError::BadRequest(format!(
            "カテゴリ「{}」は使用できません",
            input.category
        )));
    }
    if categories::org_category_label(input.category_id).is_none() {
        return Err(ApiError::BadRequest("スコアカテゴリIDが不正です".to_string()));
    }
    for score in [
        input.answer1_score,
        input.answer2_score,
        input.answer3_score,
        input.answer4_score,
        input.answer5_score,
        input.answer6_score,
    ] {
        if !score.is_finite() {
            return Err(ApiError::BadRequest("選択肢スコアが不正です".to_string()));
        }
    }
    Ok(())
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<ProblemList> {
    require_admin(&state, employee_id).await?;
    let problems = db::list_problems(&state.pool).await?;
    Ok(ok(ProblemList { problems }))
}

async fn create(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(input): Json<ProblemInput>,
) -> ApiResult<ProblemPayloadOut> {
    require_admin(&state, employee_id).await?;
    validate(&input)?;

    // New problems go to the end of the display sequence.
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO problems (
            question_text, category, category_id,
            answer1_score, answer2_score, answer3_score,
            answer4_score, answer5_score, answer6_score,
            display_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                (SELECT COALESCE(MAX(display_order) + 1, 0) FROM problems))
        RETURNING id
        "#,
    )
    .bind(input.question_text.trim())
    .bind(&input.category)
    .bind(input.category_id)
    .bind(input.answer1_score)
    .bind(input.answer2_score)
    .bind(input.answer3_score)
    .bind(input.answer4_score)
    .bind(input.answer5_score)
    .bind(input.answer6_score)
    .fetch_one(&state.pool)
    .await?;

    let problem = db::find_problem(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("設問が見つかりません".to_string()))?;

    Ok(ok(ProblemPayloadOut { problem }))
}

async fn update(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<ProblemInput>,
) -> ApiResult<ProblemPayloadOut> {
    require_admin(&state, employee_id).await?;
    validate(&input)?;

    let result = sqlx::query(
        r#"
        UPDATE problems
        SET question_text = $1,
            category = $2,
            category_id = $3,
            answer1_score = $4,
            answer2_score = $5,
            answer3_score = $6,
            answer4_score = $7,
            answer5_score = $8,
            answer6_score = $9,
            updated_at = NOW()
        WHERE id = $10
        "#,
    )
    .bind(input.question_text.trim())
    .bind(&input.category)
    .bind(input.category_id)
    .bind(input.answer1_score)
    .bind(input.answer2_score)
    .bind(input.answer3_score)
    .bind(input.answer4_score)
    .bind(input.answer5_score)
    .bind(input.answer6_score)
    .bind(id)
    .execute(&state.pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("設問が見つかりません".to_string()));
    }

    let problem = db::find_problem(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("設問が見つかりません".to_string()))?;

    Ok(ok(ProblemPayloadOut { problem }))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let result = sqlx::query("DELETE FROM problems WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("設問が見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}

async fn move_problem(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<MovePayload>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let mut ids: Vec<i64> = db::list_problems(&state.pool)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    let index = ids
        .iter()
        .position(|candidate| *candidate == id)
        .ok_or_else(|| ApiError::NotFound("設問が見つかりません".to_string()))?;

    let moved = match (payload.to, payload.direction.as_deref()) {
        (Some(to), _) => crate::domain::ordering::move_to(&mut ids, index, to),
        (None, Some("up")) => crate::domain::ordering::move_up(&mut ids, index),
        (None, Some("down")) => crate::domain::ordering::move_down(&mut ids, index),
        _ => {
            return Err(ApiError::BadRequest(
                "移動方向または移動先を指定してください".to_string(),
            ))
        }
    };

    if moved {
        apply_order(&state, "problems", &ids).await?;
    }

    Ok(ok(Empty {}))
}

/// Bulk reorder: the persisted display order equals each id's index in
/// the posted array. All ids must be present; the update is atomic.
async fn reorder(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<OrderPayload>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;
    apply_order(&state, "problems", &payload.ids).await?;
    Ok(ok(Empty {}))
}

/// Shared with the growth-question catalog; both reorder endpoints have
/// identical semantics over different tables.
pub(crate) async fn apply_order(
    state: &SharedState,
    table: &str,
    ids: &[i64],
) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Err(ApiError::BadRequest("並び順が空です".to_string()));
    }

    let mut tx = state.pool.begin().await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *tx)
        .await?;
    if total != ids.len() as i64 {
        return Err(ApiError::BadRequest(
            "並び順の件数が一致しません。最新の一覧を取得し直してください".to_string(),
        ));
    }

    for (index, id) in ids.iter().enumerate() {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET display_order = $1, updated_at = NOW() WHERE id = $2"
        ))
        .bind(index as i32)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::BadRequest(format!("ID {id} が見つかりません")));
        }
    }

    tx.commit().await?;
    Ok(())
}
