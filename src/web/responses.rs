//! Answer ingestion. Summary rows are recomputed here, at write time, so
//! every read surface works from the same derived table.

use crate::db;
use crate::domain::models::{GrowthQuestionType, SurveyType};
use crate::scoring::aggregate;
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult};
use crate::web::session::UserSession;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalSubmission {
    pub survey_id: i64,
    pub answers: Vec<OrganizationalAnswer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalAnswer {
    pub problem_id: i64,
    pub answer_index: i16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub answered: usize,
    pub response_rate: f64,
    pub total_score: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSubmission {
    pub survey_id: i64,
    pub answers: Vec<GrowthAnswer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthAnswer {
    pub question_id: i64,
    pub answer_index: Option<i16>,
    pub answer_text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSubmissionResult {
    pub answered: usize,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/survey-responses", post(submit_organizational))
        .route("/api/growth-responses", post(submit_growth))
        .with_state(state)
}

async fn submit_organizational(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<OrganizationalSubmission>,
) -> ApiResult<SubmissionResult> {
    let survey = db::find_survey(&state.pool, payload.survey_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;
    if survey.survey_type != SurveyType::Organizational {
        return Err(ApiError::BadRequest(
            "組織サーベイ以外には回答できません".to_string(),
        ));
    }

    let problems = db::list_problems(&state.pool).await?;

    for answer in &payload.answers {
        if !(1..=6).contains(&answer.answer_index) {
            return Err(ApiError::BadRequest(format!(
                "回答番号が不正です: {}",
                answer.answer_index
            )));
        }
        if !problems.iter().any(|p| p.id == answer.problem_id) {
            return Err(ApiError::BadRequest(format!(
                "設問ID {} が見つかりません",
                answer.problem_id
            )));
        }
    }

    for answer in &payload.answers {
        sqlx::query(
            r#"
            INSERT INTO survey_responses (survey_id, employee_id, problem_id, answer_index)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (survey_id, employee_id, problem_id) DO UPDATE
            SET answer_index = EXCLUDED.answer_index,
                created_at = NOW()
            "#,
        )
        .bind(survey.id)
        .bind(employee_id)
        .bind(answer.problem_id)
        .bind(answer.answer_index)
        .execute(&state.pool)
        .await?;
    }

    // Recompute this employee's summary from the full answer set.
    let answers = db::organizational_answers(&state.pool, survey.id, employee_id).await?;
    let computation = aggregate::summarize_answers(&problems, &answers);
    db::upsert_summary(&state.pool, &survey, employee_id, &computation).await?;

    Ok(ok(SubmissionResult {
        answered: answers.len(),
        response_rate: computation.response_rate,
        total_score: computation.total,
    }))
}

async fn submit_growth(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<GrowthSubmission>,
) -> ApiResult<GrowthSubmissionResult> {
    let survey = db::find_survey(&state.pool, payload.survey_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;
    if survey.survey_type != SurveyType::Growth {
        return Err(ApiError::BadRequest(
            "成長サーベイ以外には回答できません".to_string(),
        ));
    }

    let questions = db::list_growth_questions(&state.pool).await?;

    for answer in &payload.answers {
        let question = questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .ok_or_else(|| {
                ApiError::BadRequest(format!("設問ID {} が見つかりません", answer.question_id))
            })?;

        match question.question_type {
            GrowthQuestionType::SingleChoice => {
                let index = answer.answer_index.ok_or_else(|| {
                    ApiError::BadRequest("選択式の設問には回答番号が必要です".to_string())
                })?;
                if index < 1 || index as usize > question.answers.0.len() {
                    return Err(ApiError::BadRequest(format!("回答番号が不正です: {index}")));
                }
            }
            GrowthQuestionType::FreeText => {
                let has_text = answer
                    .answer_text
                    .as_deref()
                    .map(|t| !t.trim().is_empty())
                    .unwrap_or(false);
                if !has_text {
                    return Err(ApiError::BadRequest(
                        "自由記述の設問には本文が必要です".to_string(),
                    ));
                }
            }
        }
    }

    for answer in &payload.answers {
        sqlx::query(
            r#"
            INSERT INTO growth_responses (survey_id, employee_id, question_id, answer_index, answer_text)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (survey_id, employee_id, question_id) DO UPDATE
            SET answer_index = EXCLUDED.answer_index,
                answer_text = EXCLUDED.answer_text,
                created_at = NOW()
            "#,
        )
        .bind(survey.id)
        .bind(employee_id)
        .bind(answer.question_id)
        .bind(answer.answer_index)
        .bind(answer.answer_text.as_deref().map(str::trim))
        .execute(&state.pool)
        .await?;
    }

    Ok(ok(GrowthSubmissionResult {
        answered: payload.answers.len(),
    }))
}
