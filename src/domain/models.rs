use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "employee_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    None,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "survey_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SurveyType {
    Organizational,
    Growth,
}

/// Stored lifecycle flag. Independent of the derived presentation status:
/// an `active` survey whose end date already passed stays `active` in the
/// database until an admin updates it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "survey_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    Active,
    Inactive,
    Completed,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "growth_question_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrowthQuestionType {
    SingleChoice,
    FreeText,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Department {
    /// Numeric sort/filter key. Codes are stored as strings but are
    /// numeric by convention; codes 1 and 2 are reserved sentinels.
    pub fn numeric_code(&self) -> Option<i64> {
        self.code.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hash: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub job_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: i64,
    pub name: String,
    pub survey_type: SurveyType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: SurveyStatus,
    pub running: bool,
    pub display: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: i64,
    pub question_text: String,
    pub category: String,
    pub category_id: i32,
    pub answer1_score: f64,
    pub answer2_score: f64,
    pub answer3_score: f64,
    pub answer4_score: f64,
    pub answer5_score: f64,
    pub answer6_score: f64,
    pub display_order: i32,
}

impl Problem {
    pub fn option_scores(&self) -> [f64; 6] {
        [
            self.answer1_score,
            self.answer2_score,
            self.answer3_score,
            self.answer4_score,
            self.answer5_score,
            self.answer6_score,
        ]
    }

    /// Score for a 1-based answer index.
    pub fn score_for(&self, answer_index: i16) -> Option<f64> {
        if (1..=6).contains(&answer_index) {
            Some(self.option_scores()[(answer_index - 1) as usize])
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrowthAnswerOption {
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GrowthQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_type: GrowthQuestionType,
    pub category: Option<String>,
    pub weight: Option<f64>,
    pub target_jobs: Json<Vec<String>>,
    pub answers: Json<Vec<GrowthAnswerOption>>,
    pub is_active: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GrowthResponse {
    pub id: i64,
    pub survey_id: i64,
    pub employee_id: i64,
    pub question_id: i64,
    pub answer_index: Option<i16>,
    pub answer_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One employee's aggregated category scores for one survey instance.
/// Survey dates are denormalized for chart labelling.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub id: i64,
    pub survey_id: i64,
    pub employee_id: i64,
    pub category1_score: Option<f64>,
    pub category2_score: Option<f64>,
    pub category3_score: Option<f64>,
    pub category4_score: Option<f64>,
    pub category5_score: Option<f64>,
    pub category6_score: Option<f64>,
    pub category7_score: Option<f64>,
    pub category8_score: Option<f64>,
    pub total_score: Option<f64>,
    pub response_rate: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryRow {
    pub fn categories(&self) -> [Option<f64>; 8] {
        [
            self.category1_score,
            self.category2_score,
            self.category3_score,
            self.category4_score,
            self.category5_score,
            self.category6_score,
            self.category7_score,
            self.category8_score,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginLog {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub email: String,
    pub ip: String,
    pub succeeded: bool,
    pub created_at: DateTime<Utc>,
}
