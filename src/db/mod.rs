pub mod seed;

use crate::domain::models::{
    Department, Employee, GrowthQuestion, GrowthResponse, Job, LoginLog, Problem, SummaryRow,
    Survey,
};
use crate::scoring::aggregate::SummaryComputation;
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

// ========== Departments / Jobs ==========

pub async fn list_departments(pool: &PgPool) -> Result<Vec<Department>> {
    let departments = sqlx::query_as::<_, Department>(
        r#"
        SELECT id, name, code, parent_id, created_at
        FROM departments
        ORDER BY code ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(departments)
}

pub async fn find_department(pool: &PgPool, id: i64) -> Result<Option<Department>> {
    let department = sqlx::query_as::<_, Department>(
        r#"
        SELECT id, name, code, parent_id, created_at
        FROM departments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(department)
}

pub async fn list_jobs(pool: &PgPool) -> Result<Vec<Job>> {
    let jobs = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, name, created_at
        FROM jobs
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(jobs)
}

pub async fn find_job(pool: &PgPool, id: i64) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, name, created_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(job)
}

pub async fn find_job_by_name(pool: &PgPool, name: &str) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, name, created_at
        FROM jobs
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(job)
}

// ========== Employees ==========

const EMPLOYEE_COLUMNS: &str = "id, name, email, hash, role, department_id, job_id, created_at";

/// Employee joined with its organization names, for list views.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWithOrg {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub employee: Employee,
    pub department_name: Option<String>,
    pub job_name: Option<String>,
}

pub async fn list_employees(pool: &PgPool) -> Result<Vec<EmployeeWithOrg>> {
    let employees = sqlx::query_as::<_, EmployeeWithOrg>(
        r#"
        SELECT e.id, e.name, e.email, e.hash, e.role, e.department_id, e.job_id, e.created_at,
               d.name AS department_name,
               j.name AS job_name
        FROM employees e
        LEFT JOIN departments d ON d.id = e.department_id
        LEFT JOIN jobs j ON j.id = e.job_id
        ORDER BY e.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(employees)
}

pub async fn find_employee_by_id(pool: &PgPool, id: i64) -> Result<Option<Employee>> {
    let employee = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(employee)
}

pub async fn find_employee_by_email(pool: &PgPool, email: &str) -> Result<Option<Employee>> {
    let employee = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(employee)
}

pub async fn count_employees(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// employee id -> department id, for department rollups.
pub async fn employee_department_map(pool: &PgPool) -> Result<HashMap<i64, i64>> {
    let rows: Vec<(i64, Option<i64>)> = sqlx::query_as("SELECT id, department_id FROM employees")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, department_id)| department_id.map(|d| (id, d)))
        .collect())
}

/// employee id -> job name, for growth-survey target-job filtering.
pub async fn employee_job_names(pool: &PgPool) -> Result<HashMap<i64, String>> {
    let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
        r#"
        SELECT e.id, j.name
        FROM employees e
        LEFT JOIN jobs j ON j.id = e.job_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, job)| job.map(|j| (id, j)))
        .collect())
}

// ========== Surveys ==========

const SURVEY_COLUMNS: &str =
    "id, name, survey_type, start_date, end_date, status, running, display, created_at";

pub async fn list_surveys(pool: &PgPool) -> Result<Vec<Survey>> {
    let surveys = sqlx::query_as::<_, Survey>(&format!(
        "SELECT {SURVEY_COLUMNS} FROM surveys ORDER BY end_date DESC NULLS LAST, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(surveys)
}

pub async fn find_survey(pool: &PgPool, id: i64) -> Result<Option<Survey>> {
    let survey = sqlx::query_as::<_, Survey>(&format!(
        "SELECT {SURVEY_COLUMNS} FROM surveys WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(survey)
}

// ========== Problem bank ==========

const PROBLEM_COLUMNS: &str = "id, question_text, category, category_id, \
     answer1_score, answer2_score, answer3_score, answer4_score, answer5_score, answer6_score, \
     display_order";

pub async fn list_problems(pool: &PgPool) -> Result<Vec<Problem>> {
    let problems = sqlx::query_as::<_, Problem>(&format!(
        "SELECT {PROBLEM_COLUMNS} FROM problems ORDER BY display_order ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(problems)
}

pub async fn find_problem(pool: &PgPool, id: i64) -> Result<Option<Problem>> {
    let problem = sqlx::query_as::<_, Problem>(&format!(
        "SELECT {PROBLEM_COLUMNS} FROM problems WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(problem)
}

// ========== Growth survey questions ==========

const GROWTH_QUESTION_COLUMNS: &str = "id, question_text, question_type, category, weight, \
     target_jobs, answers, is_active, display_order";

pub async fn list_growth_questions(pool: &PgPool) -> Result<Vec<GrowthQuestion>> {
    let questions = sqlx::query_as::<_, GrowthQuestion>(&format!(
        "SELECT {GROWTH_QUESTION_COLUMNS} FROM growth_questions ORDER BY display_order ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

pub async fn find_growth_question(pool: &PgPool, id: i64) -> Result<Option<GrowthQuestion>> {
    let question = sqlx::query_as::<_, GrowthQuestion>(&format!(
        "SELECT {GROWTH_QUESTION_COLUMNS} FROM growth_questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(question)
}

// ========== Raw responses ==========

pub async fn organizational_answers(
    pool: &PgPool,
    survey_id: i64,
    employee_id: i64,
) -> Result<HashMap<i64, i16>> {
    let rows: Vec<(i64, i16)> = sqlx::query_as(
        r#"
        SELECT problem_id, answer_index
        FROM survey_responses
        WHERE survey_id = $1
          AND employee_id = $2
        "#,
    )
    .bind(survey_id)
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

pub async fn growth_responses_for_survey(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<GrowthResponse>> {
    let responses = sqlx::query_as::<_, GrowthResponse>(
        r#"
        SELECT id, survey_id, employee_id, question_id, answer_index, answer_text, created_at
        FROM growth_responses
        WHERE survey_id = $1
        ORDER BY employee_id ASC, question_id ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;
    Ok(responses)
}

/// Growth surveys that have at least one response row, latest end date
/// first. The growth chart never offers a survey nobody answered.
pub async fn growth_surveys_with_data(pool: &PgPool) -> Result<Vec<Survey>> {
    let surveys = sqlx::query_as::<_, Survey>(&format!(
        r#"
        SELECT {SURVEY_COLUMNS} FROM surveys s
        WHERE s.survey_type = 'growth'
          AND EXISTS (SELECT 1 FROM growth_responses r WHERE r.survey_id = s.id)
        ORDER BY s.end_date DESC NULLS LAST, s.id DESC
        "#
    ))
    .fetch_all(pool)
    .await?;
    Ok(surveys)
}

// ========== Summaries ==========

const SUMMARY_COLUMNS: &str = "id, survey_id, employee_id, \
     category1_score, category2_score, category3_score, category4_score, \
     category5_score, category6_score, category7_score, category8_score, \
     total_score, response_rate, start_date, end_date, updated_at";

pub async fn summaries_for_survey(pool: &PgPool, survey_id: i64) -> Result<Vec<SummaryRow>> {
    let rows = sqlx::query_as::<_, SummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM org_survey_summaries WHERE survey_id = $1 ORDER BY employee_id ASC"
    ))
    .bind(survey_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn all_summaries(pool: &PgPool) -> Result<Vec<SummaryRow>> {
    let rows = sqlx::query_as::<_, SummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM org_survey_summaries ORDER BY survey_id ASC, employee_id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn upsert_summary(
    pool: &PgPool,
    survey: &Survey,
    employee_id: i64,
    computation: &SummaryComputation,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO org_survey_summaries (
            survey_id, employee_id,
            category1_score, category2_score, category3_score, category4_score,
            category5_score, category6_score, category7_score, category8_score,
            total_score, response_rate, start_date, end_date
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (survey_id, employee_id) DO UPDATE
        SET category1_score = EXCLUDED.category1_score,
            category2_score = EXCLUDED.category2_score,
            category3_score = EXCLUDED.category3_score,
            category4_score = EXCLUDED.category4_score,
            category5_score = EXCLUDED.category5_score,
            category6_score = EXCLUDED.category6_score,
            category7_score = EXCLUDED.category7_score,
            category8_score = EXCLUDED.category8_score,
            total_score = EXCLUDED.total_score,
            response_rate = EXCLUDED.response_rate,
            start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date,
            updated_at = NOW()
        "#,
    )
    .bind(survey.id)
    .bind(employee_id)
    .bind(computation.categories[0])
    .bind(computation.categories[1])
    .bind(computation.categories[2])
    .bind(computation.categories[3])
    .bind(computation.categories[4])
    .bind(computation.categories[5])
    .bind(computation.categories[6])
    .bind(computation.categories[7])
    .bind(computation.total)
    .bind(computation.response_rate)
    .bind(survey.start_date)
    .bind(survey.end_date)
    .execute(pool)
    .await?;
    Ok(())
}

/// Employees who have not fully responded to the given survey, for the
/// notification sweep.
pub async fn non_responders(pool: &PgPool, survey_id: i64) -> Result<Vec<Employee>> {
    let employees = sqlx::query_as::<_, Employee>(&format!(
        r#"
        SELECT {EMPLOYEE_COLUMNS} FROM employees e
        WHERE e.role != 'none'
          AND NOT EXISTS (
            SELECT 1 FROM org_survey_summaries s
            WHERE s.survey_id = $1
              AND s.employee_id = e.id
              AND s.response_rate >= 100
          )
        ORDER BY e.id ASC
        "#
    ))
    .bind(survey_id)
    .fetch_all(pool)
    .await?;
    Ok(employees)
}

// ========== Login logs ==========

pub async fn record_login_log(
    pool: &PgPool,
    employee_id: Option<i64>,
    email: &str,
    ip: &str,
    succeeded: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO login_logs (employee_id, email, ip, succeeded)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(employee_id)
    .bind(email)
    .bind(ip)
    .bind(succeeded)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_login_logs(
    pool: &PgPool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<LoginLog>> {
    let logs = sqlx::query_as::<_, LoginLog>(
        r#"
        SELECT id, employee_id, email, ip, succeeded, created_at
        FROM login_logs
        WHERE ($1::date IS NULL OR created_at >= $1::date)
          AND ($2::date IS NULL OR created_at < $2::date + INTERVAL '1 day')
        ORDER BY created_at DESC
        LIMIT 1000
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(logs)
}

pub async fn delete_login_logs(
    pool: &PgPool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM login_logs
        WHERE ($1::date IS NULL OR created_at >= $1::date)
          AND ($2::date IS NULL OR created_at < $2::date + INTERVAL '1 day')
        "#,
    )
    .bind(start)
    .bind(end)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
