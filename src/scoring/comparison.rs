//! Current-vs-previous survey selection and the historical trend series.
//!
//! "Current" is the survey with the latest end date, whether it is still
//! open or already closed. The growth chart additionally restricts the
//! candidate list to surveys that actually have response rows, and takes
//! "previous" as the next entry of that filtered ordering; the two rules
//! intentionally disagree.

use crate::domain::models::SummaryRow;
use crate::scoring::aggregate::{self, round1};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SurveyGroup {
    pub survey_id: i64,
    pub end_date: Option<NaiveDate>,
    pub rows: Vec<SummaryRow>,
}

/// Group rows by survey, keeping the maximum end date seen per group,
/// sorted by that date descending (undated groups last).
pub fn group_by_survey(rows: &[SummaryRow]) -> Vec<SurveyGroup> {
    let mut grouped: HashMap<i64, SurveyGroup> = HashMap::new();
    for row in rows {
        let group = grouped.entry(row.survey_id).or_insert_with(|| SurveyGroup {
            survey_id: row.survey_id,
            end_date: None,
            rows: Vec::new(),
        });
        if row.end_date > group.end_date {
            group.end_date = row.end_date;
        }
        group.rows.push(row.clone());
    }

    let mut groups: Vec<SurveyGroup> = grouped.into_values().collect();
    groups.sort_by(|a, b| b.end_date.cmp(&a.end_date).then(b.survey_id.cmp(&a.survey_id)));
    groups
}

/// Select current and previous directly from raw summary rows.
pub fn select_current_and_previous(rows: &[SummaryRow]) -> (Option<SurveyGroup>, Option<SurveyGroup>) {
    let groups = group_by_survey(rows);
    let mut iter = groups.into_iter();
    (iter.next(), iter.next())
}

/// Generic ranking for survey id / end-date pairs, latest first. Used by
/// the growth chart after its data-bearing filter has been applied.
pub fn rank_by_end_date(mut standings: Vec<(i64, Option<NaiveDate>)>) -> Vec<(i64, Option<NaiveDate>)> {
    standings.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
    standings
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub survey_id: i64,
    pub label: String,
    pub month: NaiveDate,
    pub average_total: f64,
}

/// One point per survey: labelled by the survey's earliest start date as
/// "{year}年{month}月", valued at the mean of the rows' total scores,
/// sorted ascending. Surveys without any dated row cannot be placed on
/// the axis and are skipped.
pub fn trend_series(rows: &[SummaryRow]) -> Vec<TrendPoint> {
    let mut grouped: HashMap<i64, (Option<NaiveDate>, Vec<f64>)> = HashMap::new();
    for row in rows {
        let entry = grouped.entry(row.survey_id).or_insert((None, Vec::new()));
        if let Some(start) = row.start_date {
            entry.0 = Some(match entry.0 {
                Some(existing) if existing <= start => existing,
                _ => start,
            });
        }
        if let Some(total) = row.total_score.filter(|t| t.is_finite()) {
            entry.1.push(total);
        }
    }

    let mut points = Vec::new();
    for (survey_id, (start, totals)) in grouped {
        let Some(start) = start else {
            continue;
        };
        if totals.is_empty() {
            continue;
        }
        let average = totals.iter().sum::<f64>() / totals.len() as f64;
        points.push(TrendPoint {
            survey_id,
            label: format!("{}年{}月", start.year(), start.month()),
            month: start,
            average_total: round1(average),
        });
    }

    points.sort_by_key(|p| (p.month, p.survey_id));
    points
}

/// Per-category averages and overall score for one group, for chart
/// payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupScores {
    pub survey_id: i64,
    pub end_date: Option<NaiveDate>,
    pub categories: Option<[f64; 8]>,
    pub overall: Option<f64>,
    pub respondents: usize,
}

pub fn score_group(group: &SurveyGroup) -> GroupScores {
    GroupScores {
        survey_id: group.survey_id,
        end_date: group.end_date,
        categories: aggregate::category_averages(&group.rows).map(|a| a.map(round1)),
        overall: aggregate::compute_overall_score(&group.rows),
        respondents: group.rows.iter().filter(|r| aggregate::row_has_data(r)).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(survey_id: i64, employee_id: i64, start: &str, end: &str, total: f64) -> SummaryRow {
        SummaryRow {
            id: survey_id * 100 + employee_id,
            survey_id,
            employee_id,
            category1_score: Some(total),
            category2_score: Some(total),
            category3_score: Some(total),
            category4_score: Some(total),
            category5_score: Some(total),
            category6_score: Some(total),
            category7_score: Some(total),
            category8_score: Some(total),
            total_score: Some(total),
            response_rate: 100.0,
            start_date: Some(start.parse().unwrap()),
            end_date: Some(end.parse().unwrap()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn latest_end_date_wins_current() {
        let rows = vec![
            row(1, 1, "2024-01-01", "2024-01-31", 3.0),
            row(1, 2, "2024-01-01", "2024-01-31", 4.0),
            row(2, 1, "2024-06-01", "2024-06-30", 3.5),
        ];

        let (current, previous) = select_current_and_previous(&rows);
        assert_eq!(current.as_ref().map(|g| g.survey_id), Some(2));
        assert_eq!(previous.as_ref().map(|g| g.survey_id), Some(1));
        assert_eq!(
            previous.map(|g| g.end_date),
            Some(Some("2024-01-31".parse().unwrap()))
        );
    }

    #[test]
    fn single_group_has_no_previous() {
        let rows = vec![row(1, 1, "2024-01-01", "2024-01-31", 3.0)];
        let (current, previous) = select_current_and_previous(&rows);
        assert!(current.is_some());
        assert!(previous.is_none());
    }

    #[test]
    fn group_scores_average_independently() {
        let rows = vec![
            row(1, 1, "2024-01-01", "2024-01-31", 2.0),
            row(1, 2, "2024-01-01", "2024-01-31", 4.0),
            row(2, 1, "2024-06-01", "2024-06-30", 5.0),
        ];
        let groups = group_by_survey(&rows);
        let current = score_group(&groups[0]);
        let previous = score_group(&groups[1]);

        assert_eq!(current.overall, Some(5.0));
        assert_eq!(previous.overall, Some(3.0));
        assert_eq!(previous.respondents, 2);
    }

    #[test]
    fn trend_points_sorted_ascending_with_japanese_labels() {
        let rows = vec![
            row(2, 1, "2024-06-05", "2024-06-30", 4.0),
            row(2, 2, "2024-06-01", "2024-06-30", 2.0),
            row(1, 1, "2024-01-10", "2024-01-31", 3.2),
        ];

        let points = trend_series(&rows);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].survey_id, 1);
        assert_eq!(points[0].label, "2024年1月");
        assert_eq!(points[0].average_total, 3.2);
        // Earliest start date in the group labels the point.
        assert_eq!(points[1].label, "2024年6月");
        assert_eq!(points[1].average_total, 3.0);
    }

    #[test]
    fn rank_by_end_date_puts_undated_last() {
        let ranked = rank_by_end_date(vec![
            (1, Some("2024-01-31".parse().unwrap())),
            (3, None),
            (2, Some("2024-06-30".parse().unwrap())),
        ]);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[1].0, 1);
        assert_eq!(ranked[2].0, 3);
    }
}
