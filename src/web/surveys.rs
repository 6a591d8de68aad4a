use crate::db;
use crate::domain::models::{Survey, SurveyStatus, SurveyType};
use crate::domain::survey::{
    check_display_enable, check_running_enable, derive_status, pick_current_survey, DerivedStatus,
};
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult, Empty};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyOut {
    #[serde(flatten)]
    pub survey: Survey,
    pub actual_status: DerivedStatus,
}

/// Every dashboard defaults to the "current" survey per type: the active
/// one, else the most recently ended.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyList {
    pub surveys: Vec<SurveyOut>,
    pub current_organizational_id: Option<i64>,
    pub current_growth_id: Option<i64>,
}

#[derive(Serialize)]
pub struct SurveyPayloadOut {
    pub survey: SurveyOut,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInput {
    pub name: String,
    pub survey_type: SurveyType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: SurveyStatus,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub display: bool,
}

fn default_status() -> SurveyStatus {
    SurveyStatus::Inactive
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .with_state(state)
}

fn present(survey: Survey, state: &SharedState) -> SurveyOut {
    let actual_status = derive_status(&survey, Utc::now(), state.org_tz);
    SurveyOut {
        survey,
        actual_status,
    }
}

fn validate(input: &SurveyInput) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("サーベイ名を入力してください".to_string()));
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(ApiError::BadRequest(
                "終了日は開始日以降の日付を指定してください".to_string(),
            ));
        }
    }
    Ok(())
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<SurveyList> {
    // Non-admin sessions get 403 here; the client treats that as an
    // empty list rather than an error.
    require_admin(&state, employee_id).await?;

    let surveys = db::list_surveys(&state.pool).await?;
    let now = Utc::now();

    let current_id = |survey_type: SurveyType| {
        let of_type: Vec<Survey> = surveys
            .iter()
            .filter(|s| s.survey_type == survey_type)
            .cloned()
            .collect();
        pick_current_survey(&of_type, now, state.org_tz).map(|s| s.id)
    };
    let current_organizational_id = current_id(SurveyType::Organizational);
    let current_growth_id = current_id(SurveyType::Growth);

    let surveys = surveys.into_iter().map(|s| present(s, &state)).collect();
    Ok(ok(SurveyList {
        surveys,
        current_organizational_id,
        current_growth_id,
    }))
}

async fn create(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Json(input): Json<SurveyInput>,
) -> ApiResult<SurveyPayloadOut> {
    require_admin(&state, employee_id).await?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;

    if input.running || input.display {
        let others = lock_surveys_of_type(&mut tx, input.survey_type).await?;
        if input.running {
            check_running_enable(0, input.survey_type, &others)
                .map_err(|v| ApiError::Conflict(v.to_string()))?;
        }
        if input.display {
            check_display_enable(0, input.survey_type, &others)
                .map_err(|v| ApiError::Conflict(v.to_string()))?;
        }
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO surveys (name, survey_type, start_date, end_date, status, running, display)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(input.name.trim())
    .bind(input.survey_type)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.status)
    .bind(input.running)
    .bind(input.display)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let survey = db::find_survey(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;

    Ok(ok(SurveyPayloadOut {
        survey: present(survey, &state),
    }))
}

async fn update(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<SurveyInput>,
) -> ApiResult<SurveyPayloadOut> {
    require_admin(&state, employee_id).await?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;

    let existing = sqlx::query_as::<_, Survey>(
        r#"
        SELECT id, name, survey_type, start_date, end_date, status, running, display, created_at
        FROM surveys
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;

    // Uniqueness checks run inside the row-locking transaction so two
    // admins cannot both pass and both win.
    let enabling_running = input.running && !existing.running;
    let enabling_display = input.display && !existing.display;
    if enabling_running || enabling_display || input.survey_type != existing.survey_type {
        let others = lock_surveys_of_type(&mut tx, input.survey_type).await?;
        if input.running {
            check_running_enable(id, input.survey_type, &others)
                .map_err(|v| ApiError::Conflict(v.to_string()))?;
        }
        if input.display {
            check_display_enable(id, input.survey_type, &others)
                .map_err(|v| ApiError::Conflict(v.to_string()))?;
        }
    }

    sqlx::query(
        r#"
        UPDATE surveys
        SET name = $1,
            survey_type = $2,
            start_date = $3,
            end_date = $4,
            status = $5,
            running = $6,
            display = $7,
            updated_at = NOW()
        WHERE id = $8
        "#,
    )
    .bind(input.name.trim())
    .bind(input.survey_type)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.status)
    .bind(input.running)
    .bind(input.display)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let survey = db::find_survey(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;

    Ok(ok(SurveyPayloadOut {
        survey: present(survey, &state),
    }))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    // Responses and summaries cascade with the survey row.
    let result = sqlx::query("DELETE FROM surveys WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("サーベイが見つかりません".to_string()));
    }

    Ok(ok(Empty {}))
}

async fn lock_surveys_of_type(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    survey_type: SurveyType,
) -> Result<Vec<Survey>, ApiError> {
    let surveys = sqlx::query_as::<_, Survey>(
        r#"
        SELECT id, name, survey_type, start_date, end_date, status, running, display, created_at
        FROM surveys
        WHERE survey_type = $1
        FOR UPDATE
        "#,
    )
    .bind(survey_type)
    .fetch_all(&mut **tx)
    .await?;
    Ok(surveys)
}
