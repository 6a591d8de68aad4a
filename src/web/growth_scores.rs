//! Growth-survey chart data: per-category scores for one survey, the
//! data-bearing survey list, and the current-vs-previous comparison.
//!
//! Survey selection here deliberately differs from the organizational
//! dashboard: only surveys with at least one response row are candidates,
//! and "previous" means the next entry of that filtered ordering.

use crate::db;
use crate::domain::categories::{growth_display_categories, GROWTH_BONUS_CATEGORY};
use crate::domain::models::Survey;
use crate::scoring::{aggregate, comparison, growth};
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthCategoryOut {
    pub category: String,
    pub score: Option<f64>,
    pub answer_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextOut {
    pub question_id: i64,
    pub question_text: String,
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthScoresOut {
    pub survey_id: i64,
    pub survey_name: String,
    pub end_date: Option<NaiveDate>,
    pub categories: Vec<GrowthCategoryOut>,
    pub total_respondents: usize,
    pub free_text: Vec<FreeTextOut>,
}

#[derive(Serialize)]
pub struct GrowthSurveyList {
    pub surveys: Vec<Survey>,
}

#[derive(Serialize)]
pub struct GrowthComparison {
    pub current: Option<GrowthScoresOut>,
    pub previous: Option<GrowthScoresOut>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/surveys", get(surveys_with_data))
        .route("/comparison", get(comparison_view))
        .route("/:survey_id", get(survey_scores))
        .with_state(state)
}

async fn surveys_with_data(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<GrowthSurveyList> {
    require_admin(&state, employee_id).await?;
    let surveys = db::growth_surveys_with_data(&state.pool).await?;
    Ok(ok(GrowthSurveyList { surveys }))
}

async fn survey_scores(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Path(survey_id): Path<i64>,
) -> ApiResult<GrowthScoresOut> {
    require_admin(&state, employee_id).await?;

    let survey = db::find_survey(&state.pool, survey_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("サーベイが見つかりません".to_string()))?;

    Ok(ok(build_scores(&state, &survey).await?))
}

async fn comparison_view(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<GrowthComparison> {
    require_admin(&state, employee_id).await?;

    // Already filtered to data-bearing surveys, latest end date first;
    // previous is simply the next entry of this list.
    let candidates = db::growth_surveys_with_data(&state.pool).await?;
    let ranked = comparison::rank_by_end_date(
        candidates.iter().map(|s| (s.id, s.end_date)).collect(),
    );

    let mut current = None;
    let mut previous = None;
    if let Some((survey_id, _)) = ranked.first() {
        if let Some(survey) = candidates.iter().find(|s| s.id == *survey_id) {
            current = Some(build_scores(&state, survey).await?);
        }
    }
    if let Some((survey_id, _)) = ranked.get(1) {
        if let Some(survey) = candidates.iter().find(|s| s.id == *survey_id) {
            previous = Some(build_scores(&state, survey).await?);
        }
    }

    Ok(ok(GrowthComparison { current, previous }))
}

async fn build_scores(state: &SharedState, survey: &Survey) -> Result<GrowthScoresOut, ApiError> {
    let questions = db::list_growth_questions(&state.pool).await?;
    let responses = db::growth_responses_for_survey(&state.pool, survey.id).await?;
    let employee_jobs = db::employee_job_names(&state.pool).await?;

    let aggregated = growth::aggregate_growth(&questions, &responses, &employee_jobs);
    let free_text = growth::collect_free_text(&questions, &responses);

    // The fifth display category is borrowed from the organizational
    // survey: the overall score of its most recent summary group.
    let org_rows = db::all_summaries(&state.pool).await?;
    let (org_current, _) = comparison::select_current_and_previous(&org_rows);
    let bonus_score = org_current.and_then(|g| aggregate::compute_overall_score(&g.rows));

    let categories = growth_display_categories()
        .into_iter()
        .map(|display| {
            if display == GROWTH_BONUS_CATEGORY {
                return GrowthCategoryOut {
                    category: display.to_string(),
                    score: bonus_score,
                    answer_count: 0,
                };
            }
            let found = aggregated.categories.iter().find(|c| c.category == display);
            GrowthCategoryOut {
                category: display.to_string(),
                score: found.and_then(|c| c.score),
                answer_count: found.map(|c| c.answer_count).unwrap_or(0),
            }
        })
        .collect();

    Ok(GrowthScoresOut {
        survey_id: survey.id,
        survey_name: survey.name.clone(),
        end_date: survey.end_date,
        categories,
        total_respondents: aggregated.total_respondents,
        free_text: free_text
            .into_iter()
            .map(|f| FreeTextOut {
                question_id: f.question_id,
                question_text: f.question_text,
                text: f.text,
            })
            .collect(),
    })
}
