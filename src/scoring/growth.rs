//! Growth-survey scoring. Single-choice answers contribute the selected
//! option's score multiplied by the question weight; free-text answers
//! score nothing but still mark their author as a respondent.

use crate::domain::categories::GROWTH_CATEGORIES;
use crate::domain::models::{GrowthQuestion, GrowthQuestionType, GrowthResponse};
use crate::scoring::aggregate::round1;
use std::collections::{HashMap, HashSet};

/// A question with an empty target-job list applies to every job.
pub fn question_applies(question: &GrowthQuestion, job_name: Option<&str>) -> bool {
    if question.target_jobs.0.is_empty() {
        return true;
    }
    match job_name {
        Some(job) => question.target_jobs.0.iter().any(|t| t == job),
        None => false,
    }
}

/// Score one answer against its question. Free text is always 0.
pub fn response_score(question: &GrowthQuestion, answer_index: Option<i16>) -> f64 {
    match question.question_type {
        GrowthQuestionType::FreeText => 0.0,
        GrowthQuestionType::SingleChoice => {
            let Some(index) = answer_index else {
                return 0.0;
            };
            if index < 1 {
                return 0.0;
            }
            match question.answers.0.get((index - 1) as usize) {
                Some(option) => option.score * question.weight.unwrap_or(1.0),
                None => 0.0,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthCategoryScore {
    pub category: &'static str,
    pub score: Option<f64>,
    pub answer_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthAggregate {
    pub categories: Vec<GrowthCategoryScore>,
    pub total_respondents: usize,
}

#[derive(Debug, Clone)]
pub struct FreeTextAnswer {
    pub question_id: i64,
    pub question_text: String,
    pub employee_id: i64,
    pub text: String,
}

/// Aggregate category scores across all responses for one survey.
/// `employee_jobs` maps employee id to job name for target-job filtering;
/// inactive questions are ignored.
pub fn aggregate_growth(
    questions: &[GrowthQuestion],
    responses: &[GrowthResponse],
    employee_jobs: &HashMap<i64, String>,
) -> GrowthAggregate {
    let by_id: HashMap<i64, &GrowthQuestion> =
        questions.iter().map(|q| (q.id, q)).collect();

    let mut sums: HashMap<&'static str, (f64, usize)> = HashMap::new();
    let mut respondents: HashSet<i64> = HashSet::new();

    for response in responses {
        let Some(question) = by_id.get(&response.question_id) else {
            continue;
        };
        if !question.is_active {
            continue;
        }

        // Every answer marks its author as a respondent, free text included.
        respondents.insert(response.employee_id);

        if question.question_type == GrowthQuestionType::FreeText {
            continue;
        }
        let job = employee_jobs.get(&response.employee_id).map(|s| s.as_str());
        if !question_applies(question, job) {
            continue;
        }
        let Some(category) = question
            .category
            .as_deref()
            .and_then(|c| GROWTH_CATEGORIES.iter().find(|g| **g == c).copied())
        else {
            continue;
        };

        let score = response_score(question, response.answer_index);
        let entry = sums.entry(category).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    let categories = GROWTH_CATEGORIES
        .iter()
        .copied()
        .map(|category| {
            let (sum, count) = sums.get(category).copied().unwrap_or((0.0, 0));
            GrowthCategoryScore {
                category,
                score: (count > 0).then(|| round1(sum / count as f64)),
                answer_count: count,
            }
        })
        .collect();

    GrowthAggregate {
        categories,
        total_respondents: respondents.len(),
    }
}

/// Raw free-text answers, retained for display alongside the chart.
pub fn collect_free_text(
    questions: &[GrowthQuestion],
    responses: &[GrowthResponse],
) -> Vec<FreeTextAnswer> {
    let by_id: HashMap<i64, &GrowthQuestion> =
        questions.iter().map(|q| (q.id, q)).collect();

    responses
        .iter()
        .filter_map(|response| {
            let question = by_id.get(&response.question_id)?;
            if question.question_type != GrowthQuestionType::FreeText {
                return None;
            }
            let text = response.answer_text.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            Some(FreeTextAnswer {
                question_id: question.id,
                question_text: question.question_text.clone(),
                employee_id: response.employee_id,
                text: text.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::GrowthAnswerOption;
    use chrono::Utc;
    use sqlx::types::Json;

    fn single_choice(
        id: i64,
        category: &str,
        weight: Option<f64>,
        target_jobs: Vec<&str>,
        scores: &[f64],
    ) -> GrowthQuestion {
        GrowthQuestion {
            id,
            question_text: format!("設問{id}"),
            question_type: GrowthQuestionType::SingleChoice,
            category: Some(category.to_string()),
            weight,
            target_jobs: Json(target_jobs.into_iter().map(String::from).collect()),
            answers: Json(
                scores
                    .iter()
                    .enumerate()
                    .map(|(idx, score)| GrowthAnswerOption {
                        text: format!("選択肢{}", idx + 1),
                        score: *score,
                    })
                    .collect(),
            ),
            is_active: true,
            display_order: 0,
        }
    }

    fn free_text(id: i64) -> GrowthQuestion {
        GrowthQuestion {
            id,
            question_text: format!("設問{id}"),
            question_type: GrowthQuestionType::FreeText,
            category: None,
            weight: None,
            target_jobs: Json(Vec::new()),
            answers: Json(Vec::new()),
            is_active: true,
            display_order: 0,
        }
    }

    fn response(employee_id: i64, question_id: i64, answer_index: Option<i16>, text: Option<&str>) -> GrowthResponse {
        GrowthResponse {
            id: employee_id * 100 + question_id,
            survey_id: 1,
            employee_id,
            question_id,
            answer_index,
            answer_text: text.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn weight_multiplies_selected_option_score() {
        let weighted = single_choice(1, "ルール", Some(1.5), vec![], &[4.0, 2.0]);
        assert_eq!(response_score(&weighted, Some(1)), 6.0);

        let unweighted = single_choice(2, "ルール", None, vec![], &[4.0, 2.0]);
        assert_eq!(response_score(&unweighted, Some(2)), 2.0);

        assert_eq!(response_score(&unweighted, Some(9)), 0.0);
        assert_eq!(response_score(&unweighted, None), 0.0);
    }

    #[test]
    fn free_text_scores_zero_but_counts_respondent() {
        let questions = vec![free_text(1)];
        let responses = vec![response(7, 1, None, Some("looks good"))];

        let aggregate = aggregate_growth(&questions, &responses, &HashMap::new());
        assert_eq!(aggregate.total_respondents, 1);
        assert!(aggregate.categories.iter().all(|c| c.score.is_none()));

        let free = collect_free_text(&questions, &responses);
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].text, "looks good");
    }

    #[test]
    fn target_jobs_filter_applies() {
        let questions = vec![single_choice(1, "評価制度", None, vec!["エンジニア"], &[5.0])];
        let responses = vec![response(1, 1, Some(1), None), response(2, 1, Some(1), None)];

        let mut jobs = HashMap::new();
        jobs.insert(1, "エンジニア".to_string());
        jobs.insert(2, "営業".to_string());

        let aggregate = aggregate_growth(&questions, &responses, &jobs);
        let evaluation = aggregate
            .categories
            .iter()
            .find(|c| c.category == "評価制度")
            .unwrap();
        assert_eq!(evaluation.answer_count, 1);
        assert_eq!(evaluation.score, Some(5.0));
        // Both still count as respondents.
        assert_eq!(aggregate.total_respondents, 2);
    }

    #[test]
    fn empty_target_jobs_means_everyone() {
        let question = single_choice(1, "ルール", None, vec![], &[3.0]);
        assert!(question_applies(&question, Some("営業")));
        assert!(question_applies(&question, None));

        let scoped = single_choice(2, "ルール", None, vec!["営業"], &[3.0]);
        assert!(question_applies(&scoped, Some("営業")));
        assert!(!question_applies(&scoped, Some("エンジニア")));
        assert!(!question_applies(&scoped, None));
    }
}
