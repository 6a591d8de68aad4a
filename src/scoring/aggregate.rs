//! Category/score aggregation over per-employee summary rows.
//!
//! Inclusion rule: a row participates in an aggregate when at least one
//! of its eight category fields is a finite number. Missing fields on an
//! included row contribute 0 rather than shrinking the divisor; rows with
//! no finite field at all are excluded entirely, which keeps "no data"
//! distinct from "scored 0".

use crate::domain::categories::ORG_CATEGORY_COUNT;
use crate::domain::models::{Department, Problem, SummaryRow};
use std::collections::HashMap;

/// Department codes below this are reserved sentinels (unassigned /
/// management) and never appear in department-level output.
const MIN_VISIBLE_DEPARTMENT_CODE: i64 = 3;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn row_has_data(row: &SummaryRow) -> bool {
    row.categories().iter().any(|v| finite(*v).is_some())
}

/// Per-category averages over the included rows, or `None` when no row
/// qualifies.
pub fn category_averages(rows: &[SummaryRow]) -> Option<[f64; ORG_CATEGORY_COUNT]> {
    let included: Vec<&SummaryRow> = rows.iter().filter(|r| row_has_data(r)).collect();
    if included.is_empty() {
        return None;
    }

    let mut sums = [0.0; ORG_CATEGORY_COUNT];
    for row in &included {
        for (idx, value) in row.categories().iter().enumerate() {
            sums[idx] += finite(*value).unwrap_or(0.0);
        }
    }

    let count = included.len() as f64;
    Some(sums.map(|sum| sum / count))
}

/// Overall score: mean of the eight per-category averages, one decimal.
/// `None` means no data, which is not the same as 0.
pub fn compute_overall_score(rows: &[SummaryRow]) -> Option<f64> {
    category_averages(rows)
        .map(|averages| round1(averages.iter().sum::<f64>() / ORG_CATEGORY_COUNT as f64))
}

/// Organization response rate in percent, one decimal. An employee counts
/// as responded only when their own response rate reached 100%.
pub fn organization_response_rate(rows: &[SummaryRow], total_employees: usize) -> Option<f64> {
    if total_employees == 0 {
        return None;
    }
    let responded = rows
        .iter()
        .filter(|r| (r.response_rate - 100.0).abs() < 1e-9)
        .count();
    Some(round1(responded as f64 / total_employees as f64 * 100.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentScore {
    pub department_id: i64,
    pub name: String,
    pub code: String,
    pub categories: [f64; ORG_CATEGORY_COUNT],
    pub overall: f64,
    pub respondents: usize,
}

/// Group included rows by the employee's department and average each
/// category. Departments whose code does not parse, or parses below 3,
/// are dropped; output is sorted by numeric code.
pub fn department_scores(
    rows: &[SummaryRow],
    employee_departments: &HashMap<i64, i64>,
    departments: &[Department],
) -> Vec<DepartmentScore> {
    let mut grouped: HashMap<i64, Vec<&SummaryRow>> = HashMap::new();
    for row in rows.iter().filter(|r| row_has_data(r)) {
        if let Some(department_id) = employee_departments.get(&row.employee_id) {
            grouped.entry(*department_id).or_default().push(row);
        }
    }

    let mut scores = Vec::new();
    for department in departments {
        let Some(code) = department.numeric_code() else {
            continue;
        };
        if code < MIN_VISIBLE_DEPARTMENT_CODE {
            continue;
        }
        let Some(members) = grouped.get(&department.id) else {
            continue;
        };

        let owned: Vec<SummaryRow> = members.iter().map(|r| (*r).clone()).collect();
        let Some(averages) = category_averages(&owned) else {
            continue;
        };
        let overall = round1(averages.iter().sum::<f64>() / ORG_CATEGORY_COUNT as f64);

        scores.push(DepartmentScore {
            department_id: department.id,
            name: department.name.clone(),
            code: department.code.clone(),
            categories: averages.map(round1),
            overall,
            respondents: members.len(),
        });
    }

    scores.sort_by_key(|s| s.code.trim().parse::<i64>().unwrap_or(i64::MAX));
    scores
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryComputation {
    pub categories: [Option<f64>; ORG_CATEGORY_COUNT],
    pub total: Option<f64>,
    pub response_rate: f64,
}

/// Build one employee's summary from raw answers: each answered problem
/// contributes its selected option's score to the problem's category; a
/// category's score is the mean over its answered problems. The total is
/// the mean of the eight category scores (unanswered categories count as
/// 0 once any category has data, matching the consumption-side rule).
pub fn summarize_answers(
    problems: &[Problem],
    answers: &HashMap<i64, i16>,
) -> SummaryComputation {
    let mut sums = [0.0; ORG_CATEGORY_COUNT];
    let mut counts = [0usize; ORG_CATEGORY_COUNT];
    let mut answered = 0usize;

    for problem in problems {
        let Some(answer_index) = answers.get(&problem.id) else {
            continue;
        };
        let Some(score) = problem.score_for(*answer_index) else {
            continue;
        };
        answered += 1;
        let idx = (problem.category_id - 1) as usize;
        if idx < ORG_CATEGORY_COUNT {
            sums[idx] += score;
            counts[idx] += 1;
        }
    }

    let mut categories = [None; ORG_CATEGORY_COUNT];
    for idx in 0..ORG_CATEGORY_COUNT {
        if counts[idx] > 0 {
            categories[idx] = Some(sums[idx] / counts[idx] as f64);
        }
    }

    let total = if categories.iter().any(|c| c.is_some()) {
        let sum: f64 = categories.iter().map(|c| c.unwrap_or(0.0)).sum();
        Some(round1(sum / ORG_CATEGORY_COUNT as f64))
    } else {
        None
    };

    let response_rate = if problems.is_empty() {
        0.0
    } else {
        round1(answered as f64 / problems.len() as f64 * 100.0)
    };

    SummaryComputation {
        categories,
        total,
        response_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(employee_id: i64, categories: [Option<f64>; 8], response_rate: f64) -> SummaryRow {
        SummaryRow {
            id: employee_id,
            survey_id: 1,
            employee_id,
            category1_score: categories[0],
            category2_score: categories[1],
            category3_score: categories[2],
            category4_score: categories[3],
            category5_score: categories[4],
            category6_score: categories[5],
            category7_score: categories[6],
            category8_score: categories[7],
            total_score: None,
            response_rate,
            start_date: None,
            end_date: None,
            updated_at: Utc::now(),
        }
    }

    fn full_row(employee_id: i64, value: f64) -> SummaryRow {
        row(employee_id, [Some(value); 8], 100.0)
    }

    #[test]
    fn overall_is_mean_of_category_means() {
        let rows = vec![full_row(1, 4.0), full_row(2, 2.0)];
        // Every category averages 3.0, so the overall is 3.0.
        assert_eq!(compute_overall_score(&rows), Some(3.0));

        let rows = vec![full_row(1, 4.15), full_row(2, 4.15)];
        assert_eq!(compute_overall_score(&rows), Some(4.2));
    }

    #[test]
    fn empty_input_is_no_data_not_zero() {
        assert_eq!(compute_overall_score(&[]), None);
        assert_eq!(category_averages(&[]), None);
    }

    #[test]
    fn partially_missing_rows_stay_included_with_zero_fill() {
        let mut categories = [Some(4.0); 8];
        categories[3] = None;
        categories[7] = Some(f64::NAN);
        let rows = vec![row(1, categories, 100.0)];

        // 6 finite fields of 4.0, two treated as 0: (6 * 4.0) / 8 = 3.0
        assert_eq!(compute_overall_score(&rows), Some(3.0));

        // A row with nothing finite is excluded entirely.
        let rows = vec![row(1, [None; 8], 0.0)];
        assert_eq!(compute_overall_score(&rows), None);
    }

    #[test]
    fn response_rate_counts_only_complete_responders() {
        let rows = vec![
            row(1, [Some(3.0); 8], 100.0),
            row(2, [Some(3.0); 8], 50.0),
        ];
        // 1 of 4 employees fully responded.
        assert_eq!(organization_response_rate(&rows, 4), Some(25.0));
        assert_eq!(organization_response_rate(&rows, 0), None);
    }

    #[test]
    fn department_scores_drop_reserved_codes() {
        let departments = vec![
            department(1, "未所属", "1"),
            department(2, "経営管理", "2"),
            department(3, "営業部", "3"),
            department(4, "開発部", "10"),
        ];
        let mut employee_departments = HashMap::new();
        employee_departments.insert(1, 1); // sentinel, filtered
        employee_departments.insert(2, 3);
        employee_departments.insert(3, 4);

        let rows = vec![full_row(1, 5.0), full_row(2, 4.0), full_row(3, 2.0)];
        let scores = department_scores(&rows, &employee_departments, &departments);

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].name, "営業部");
        assert_eq!(scores[0].overall, 4.0);
        assert_eq!(scores[1].name, "開発部");
        assert_eq!(scores[1].overall, 2.0);
    }

    fn department(id: i64, name: &str, code: &str) -> Department {
        Department {
            id,
            name: name.to_string(),
            code: code.to_string(),
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_from_raw_answers() {
        let problems = vec![
            problem(10, 1, [6.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
            problem(11, 1, [6.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
            problem(12, 2, [6.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
        ];
        let mut answers = HashMap::new();
        answers.insert(10, 1i16); // 6.0
        answers.insert(11, 3i16); // 4.0
        // problem 12 unanswered

        let summary = summarize_answers(&problems, &answers);
        assert_eq!(summary.categories[0], Some(5.0));
        assert_eq!(summary.categories[1], None);
        // 5.0 across eight categories with seven zero-filled: 0.6
        assert_eq!(summary.total, Some(0.6));
        assert_eq!(summary.response_rate, 66.7);
    }

    fn problem(id: i64, category_id: i32, scores: [f64; 6]) -> Problem {
        Problem {
            id,
            question_text: format!("設問{id}"),
            category: "組織風土".to_string(),
            category_id,
            answer1_score: scores[0],
            answer2_score: scores[1],
            answer3_score: scores[2],
            answer4_score: scores[3],
            answer5_score: scores[4],
            answer6_score: scores[5],
            display_order: 0,
        }
    }
}
