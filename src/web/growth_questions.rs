use crate::db;
use crate::domain::categories;
use crate::domain::models::{GrowthAnswerOption, GrowthQuestion, GrowthQuestionType};
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult, Empty};
use crate::web::problems::apply_order;
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as Jsonb;

#[derive(Serialize)]
pub struct GrowthQuestionList {
    pub questions: Vec<GrowthQuestion>,
}

#[derive(Serialize)]
pub struct GrowthQuestionPayloadOut {
    pub question: GrowthQuestion,
}

/// Create/update payload as a tagged variant: the two question kinds have
/// different required fields, so the shape is decided by `questionType`
/// instead of a pile of optional fields.
#[derive(Debug, Deserialize)]
#[serde(tag = "questionType", rename_all = "snake_case")]
pub enum GrowthQuestionInput {
    #[serde(rename_all = "camelCase")]
    SingleChoice {
        question_text: String,
        category: String,
        weight: Option<f64>,
        #[serde(default)]
        target_jobs: Vec<String>,
        answers: Vec<GrowthAnswerOption>,
        #[serde(default = "default_active")]
        is_active: bool,
    },
    #[serde(rename_all = "camelCase")]
    FreeText {
        question_text: String,
        #[serde(default)]
        target_jobs: Vec<String>,
        #[serde(default = "default_active")]
        is_active: bool,
    },
}

fn default_active() -> bool {
    true
}

struct ValidatedInput {
    question_text: String,
    question_type: GrowthQuestionType,
    category: Option<String>,
    weight: Option<f64>,
    target_jobs: Vec<String>,
    answers: Vec<GrowthAnswerOption>,
    is_active: bool,
}

impl GrowthQuestionInput {
    fn validate(self) -> Result<ValidatedInput, ApiError> {
        match self {
            GrowthQuestionInput::SingleChoice {
                question_text,
                category,
                weight,
                target_jobs,
                answers,
                is_active,
            } => {
                let question_text = question_text.trim().to_string();
                if question_text.is_empty() {
                    return Err(ApiError::BadRequest("設問文を入力してください".to_string()));
                }
                if !categories::is_growth_category(&category) {
                    return Err(ApiError::BadRequest(format!(
                        "カテゴリ「{category}」は使用できません"
                    )));
                }
                if answers.is_empty() {
                    return Err(ApiError::BadRequest(
                        "選択肢を1件以上登録してください".to_string(),
                    ));
                }
                if answers.iter().any(|a| a.text.trim().is_empty() || !a.score.is_finite()) {
                    return Err(ApiError::BadRequest("選択肢の内容が不正です".to_string()));
                }
                // Weight input is masked to two decimals client-side; only
                // sign and finiteness are enforced here.
                if let Some(weight) = weight {
                    if !weight.is_finite() || weight < 0.0 {
                        return Err(ApiError::BadRequest("重みが不正です".to_string()));
                    }
                }
                Ok(ValidatedInput {
                    question_text,
                    question_type: GrowthQuestionType::SingleChoice,
                    category: Some(category),
                    weight,
                    target_jobs,
                    answers,
                    is_active,
                })
            }
            GrowthQuestionInput::FreeText {
                question_text,
                target_jobs,
                is_active,
            } => {
                let question_text = question_text.trim().to_string();
                if question_text.is_empty() {
                    return Err(ApiError::BadRequest("設問文を入力してください".to_string()));
                }
                Ok(ValidatedInput {
                    question_text,
                    question_type: GrowthQuestionType::FreeText,
                    category: None,
                    weight: None,
                    target_jobs,
                    answers: Vec::new(),
                    is_active,
                })
            }
        }
    }
}

#[derive(Deserialize)]
pub struct OrderPayload {
    pub ids: Vec<i64>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .route("/order", post(reorder))
        .with_state(state)
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<GrowthQuestionList> {
    require_admin(&state, employee_id).await?;
    let questions = db::list_growth_questions(&state.pool).await?;
    Ok(ok(GrowthQuestionList { questions }))
}

async fn create(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(input): Json<GrowthQuestionInput>,
) -> ApiResult<GrowthQuestionPayloadOut> {
    require_admin(&state, employee_id).await?;
    let input = input.validate()?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO growth_questions (
            question_text, question_type, category, weight,
            target_jobs, answers, is_active, display_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7,
                (SELECT COALESCE(MAX(display_order) + 1, 0) FROM growth_questions))
        RETURNING id
        "#,
    )
    .bind(&input.question_text)
    .bind(input.question_type)
    .bind(&input.category)
    .bind(input.weight)
    .bind(Jsonb(&input.target_jobs))
    .bind(Jsonb(&input.answers))
    .bind(input.is_active)
    .fetch_one(&state.pool)
    .await?;

    let question = db::find_growth_question(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("設問が見つかりません".to_string()))?;

    Ok(ok(GrowthQuestionPayloadOut { question }))
}

async fn update(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<GrowthQuestionInput>,
) -> ApiResult<GrowthQuestionPayloadOut> {
    require_admin(&state, employee_id).await?;
    let input = input.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE growth_questions
        SET question_text = $1,
            question_type = $2,
            category = $3,
            weight = $4,
            target_jobs = $5,
            answers = $6,
            is_active = $7,
            updated_at = NOW()
        WHERE id = $8
        "#,
    )
    .bind(&input.question_text)
    .bind(input.question_type)
    .bind(&input.category)
    .bind(input.weight)
    .bind(Jsonb(&input.target_jobs))
    .bind(Jsonb(&input.answers))
    .bind(input.is_active)
    .bind(id)
    .execute(&state.pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("設問が見つかりません".to_string()));
    }

    let question = db::find_growth_question(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("設問が見つかりません".to_string()))?;

    Ok(ok(GrowthQuestionPayloadOut { question }))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let result = sqlx::query("DELETE FROM growth_questions WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("設問が見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}

async fn reorder(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<OrderPayload>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;
    apply_order(&state, "growth_questions", &payload.ids).await?;
    Ok(ok(Empty {}))
}
