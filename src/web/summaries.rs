//! Read surfaces over the derived organizational-survey summaries: raw
//! rows, organization-wide rollups, department breakdowns, the
//! current-vs-previous comparison and the historical trend.

use crate::db;
use crate::domain::categories::ORG_CATEGORIES;
use crate::domain::models::SummaryRow;
use crate::scoring::{aggregate, comparison};
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub survey_id: Option<i64>,
    pub for_organization: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyScopedQuery {
    pub survey_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResponsesQuery {
    pub survey_id: i64,
    pub employee_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    pub id: i32,
    pub label: &'static str,
    pub average: f64,
}

#[derive(Serialize)]
pub struct SummaryList {
    pub summaries: Vec<SummaryRow>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRollup {
    pub categories: Vec<CategoryAverage>,
    pub overall_score: Option<f64>,
    pub response_rate: Option<f64>,
    pub respondent_count: usize,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetailRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub summary: SummaryRow,
    pub employee_name: String,
    pub department_name: Option<String>,
}

#[derive(Serialize)]
pub struct SummaryDetailList {
    pub summaries: Vec<SummaryDetailRow>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentScoreOut {
    pub department_id: i64,
    pub name: String,
    pub code: String,
    pub categories: Vec<CategoryAverage>,
    pub overall: f64,
    pub respondents: usize,
}

#[derive(Serialize)]
pub struct DepartmentScoreList {
    pub departments: Vec<DepartmentScoreOut>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupScoresOut {
    pub survey_id: i64,
    pub end_date: Option<NaiveDate>,
    pub categories: Option<Vec<CategoryAverage>>,
    pub overall: Option<f64>,
    pub respondents: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPointOut {
    pub survey_id: i64,
    pub label: String,
    pub average_total: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllSurveysDetail {
    pub trend: Vec<TrendPointOut>,
    pub current: Option<GroupScoresOut>,
    pub previous: Option<GroupScoresOut>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResponseRow {
    pub problem_id: i64,
    pub question_text: String,
    pub category: String,
    pub category_id: i32,
    pub answer_index: i16,
    pub score: f64,
}

#[derive(Serialize)]
pub struct DetailedResponseList {
    pub responses: Vec<DetailedResponseRow>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/detail", get(detail))
        .route("/department-category", get(department_category))
        .route("/all-surveys-detail", get(all_surveys_detail))
        .route("/detailed-responses", get(detailed_responses))
        .with_state(state)
}

fn labelled(averages: [f64; 8]) -> Vec<CategoryAverage> {
    ORG_CATEGORIES
        .iter()
        .zip(averages)
        .map(|(category, average)| CategoryAverage {
            id: category.id,
            label: category.label,
            average: aggregate::round1(average),
        })
        .collect()
}

fn present_group(scores: comparison::GroupScores) -> GroupScoresOut {
    GroupScoresOut {
        survey_id: scores.survey_id,
        end_date: scores.end_date,
        categories: scores.categories.map(labelled),
        overall: scores.overall,
        respondents: scores.respondents,
    }
}

async fn load_rows(state: &SharedState, survey_id: Option<i64>) -> Result<Vec<SummaryRow>, ApiError> {
    let rows = match survey_id {
        Some(survey_id) => db::summaries_for_survey(&state.pool, survey_id).await?,
        None => db::all_summaries(&state.pool).await?,
    };
    Ok(rows)
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<SummaryQuery>,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;

    require_admin(&state, employee_id).await?;
    let rows = load_rows(&state, query.survey_id).await?;

    if query.for_organization.unwrap_or(false) {
        let total_employees = db::count_employees(&state.pool).await? as usize;
        let respondent_count = rows.iter().filter(|r| aggregate::row_has_data(r)).count();
        let rollup = OrganizationRollup {
            categories: aggregate::category_averages(&rows)
                .map(labelled)
                .unwrap_or_default(),
            overall_score: aggregate::compute_overall_score(&rows),
            response_rate: aggregate::organization_response_rate(&rows, total_employees),
            respondent_count,
        };
        return Ok(ok(rollup).into_response());
    }

    Ok(ok(SummaryList { summaries: rows }).into_response())
}

async fn detail(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<SurveyScopedQuery>,
) -> ApiResult<SummaryDetailList> {
    require_admin(&state, employee_id).await?;

    let summaries = sqlx::query_as::<_, SummaryDetailRow>(
        r#"
        SELECT s.id, s.survey_id, s.employee_id,
               s.category1_score, s.category2_score, s.category3_score, s.category4_score,
               s.category5_score, s.category6_score, s.category7_score, s.category8_score,
               s.total_score, s.response_rate, s.start_date, s.end_date, s.updated_at,
               e.name AS employee_name,
               d.name AS department_name
        FROM org_survey_summaries s
        JOIN employees e ON e.id = s.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        WHERE s.survey_id = $1
        ORDER BY s.employee_id ASC
        "#,
    )
    .bind(query.survey_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ok(SummaryDetailList { summaries }))
}

async fn department_category(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<SurveyScopedQuery>,
) -> ApiResult<DepartmentScoreList> {
    require_admin(&state, employee_id).await?;

    let rows = db::summaries_for_survey(&state.pool, query.survey_id).await?;
    let employee_departments = db::employee_department_map(&state.pool).await?;
    let departments = db::list_departments(&state.pool).await?;

    let scores = aggregate::department_scores(&rows, &employee_departments, &departments);
    let departments = scores
        .into_iter()
        .map(|score| DepartmentScoreOut {
            department_id: score.department_id,
            name: score.name,
            code: score.code,
            categories: labelled(score.categories),
            overall: score.overall,
            respondents: score.respondents,
        })
        .collect();

    Ok(ok(DepartmentScoreList { departments }))
}

async fn all_surveys_detail(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<AllSurveysDetail> {
    require_admin(&state, employee_id).await?;

    let rows = db::all_summaries(&state.pool).await?;

    let trend = comparison::trend_series(&rows)
        .into_iter()
        .map(|point| TrendPointOut {
            survey_id: point.survey_id,
            label: point.label,
            average_total: point.average_total,
        })
        .collect();

    let (current, previous) = comparison::select_current_and_previous(&rows);

    Ok(ok(AllSurveysDetail {
        trend,
        current: current.map(|g| present_group(comparison::score_group(&g))),
        previous: previous.map(|g| present_group(comparison::score_group(&g))),
    }))
}

async fn detailed_responses(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<DetailedResponsesQuery>,
) -> ApiResult<DetailedResponseList> {
    require_admin(&state, employee_id).await?;

    let responses = sqlx::query_as::<_, DetailedResponseRow>(
        r#"
        SELECT r.problem_id,
               p.question_text,
               p.category,
               p.category_id,
               r.answer_index,
               CASE r.answer_index
                   WHEN 1 THEN p.answer1_score
                   WHEN 2 THEN p.answer2_score
                   WHEN 3 THEN p.answer3_score
                   WHEN 4 THEN p.answer4_score
                   WHEN 5 THEN p.answer5_score
                   WHEN 6 THEN p.answer6_score
                   ELSE 0
               END AS score
        FROM survey_responses r
        JOIN problems p ON p.id = r.problem_id
        WHERE r.survey_id = $1
          AND r.employee_id = $2
        ORDER BY p.display_order ASC, p.id ASC
        "#,
    )
    .bind(query.survey_id)
    .bind(query.employee_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ok(DetailedResponseList { responses }))
}
