//! Survey window semantics: the presentation status is derived from the
//! clock and the survey's date range, never from the stored lifecycle
//! flag (except as a fallback when a date is missing).

use crate::domain::models::{Survey, SurveyStatus, SurveyType};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Display surveys per type are capped; enabling a sixth is rejected.
pub const DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SurveyPhase {
    Scheduled,
    Active,
    Ended,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DerivedStatus {
    pub status: SurveyPhase,
    pub label: &'static str,
    pub color: &'static str,
}

const SCHEDULED: DerivedStatus = DerivedStatus {
    status: SurveyPhase::Scheduled,
    label: "予定",
    color: "blue",
};
const ACTIVE: DerivedStatus = DerivedStatus {
    status: SurveyPhase::Active,
    label: "実施中",
    color: "green",
};
const ENDED: DerivedStatus = DerivedStatus {
    status: SurveyPhase::Ended,
    label: "終了",
    color: "gray",
};
const UNKNOWN: DerivedStatus = DerivedStatus {
    status: SurveyPhase::Unknown,
    label: "不明",
    color: "gray",
};

fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Start of the survey window: the start date's local midnight.
fn window_start(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    local_instant(date, NaiveTime::MIN, tz)
}

/// End of the survey window: the end date's local calendar day is
/// inclusive, so the boundary sits at 23:59:59.999.
fn window_end(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let eod = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
    local_instant(date, eod, tz)
}

/// Derive the presentation status from `now` and the survey window. When
/// either date is missing the stored lifecycle flag decides instead.
pub fn derive_status(survey: &Survey, now: DateTime<Utc>, tz: Tz) -> DerivedStatus {
    let bounds = survey
        .start_date
        .and_then(|s| window_start(s, tz))
        .zip(survey.end_date.and_then(|e| window_end(e, tz)));

    match bounds {
        Some((start, end)) => {
            if now < start {
                SCHEDULED
            } else if now <= end {
                ACTIVE
            } else {
                ENDED
            }
        }
        None => match survey.status {
            SurveyStatus::Active => ACTIVE,
            SurveyStatus::Completed => ENDED,
            SurveyStatus::Inactive => UNKNOWN,
        },
    }
}

/// The survey every dashboard defaults to: the active one if any exists,
/// otherwise the most recently ended one by end date.
pub fn pick_current_survey<'a>(
    surveys: &'a [Survey],
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<&'a Survey> {
    if let Some(active) = surveys
        .iter()
        .find(|s| derive_status(s, now, tz).status == SurveyPhase::Active)
    {
        return Some(active);
    }

    surveys
        .iter()
        .filter(|s| derive_status(s, now, tz).status == SurveyPhase::Ended)
        .max_by_key(|s| s.end_date)
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ToggleViolation {
    #[error("「{0}」が既に実施中のため、同時に実施できるサーベイは同一タイプにつき1件までです")]
    RunningConflict(String),
    #[error("表示中のサーベイは同一タイプにつき{DISPLAY_LIMIT}件までです")]
    DisplayLimit,
}

/// Pre-flight for enabling `running`: at most one running survey per type.
/// The violation names the conflicting survey so the admin can find it.
pub fn check_running_enable(
    target_id: i64,
    survey_type: SurveyType,
    surveys: &[Survey],
) -> Result<(), ToggleViolation> {
    match surveys
        .iter()
        .find(|s| s.id != target_id && s.survey_type == survey_type && s.running)
    {
        Some(conflict) => Err(ToggleViolation::RunningConflict(conflict.name.clone())),
        None => Ok(()),
    }
}

/// Pre-flight for enabling `display`: at most [`DISPLAY_LIMIT`] displayed
/// surveys per type.
pub fn check_display_enable(
    target_id: i64,
    survey_type: SurveyType,
    surveys: &[Survey],
) -> Result<(), ToggleViolation> {
    let displayed = surveys
        .iter()
        .filter(|s| s.id != target_id && s.survey_type == survey_type && s.display)
        .count();
    if displayed >= DISPLAY_LIMIT {
        Err(ToggleViolation::DisplayLimit)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn survey(
        id: i64,
        survey_type: SurveyType,
        start: Option<&str>,
        end: Option<&str>,
        status: SurveyStatus,
        running: bool,
        display: bool,
    ) -> Survey {
        Survey {
            id,
            name: format!("第{id}回サーベイ"),
            survey_type,
            start_date: start.map(|s| s.parse().unwrap()),
            end_date: end.map(|s| s.parse().unwrap()),
            status,
            running,
            display,
            created_at: Utc::now(),
        }
    }

    const UTC_TZ: Tz = chrono_tz::UTC;

    #[test]
    fn end_of_day_is_inclusive_to_the_millisecond() {
        let s = survey(
            1,
            SurveyType::Organizational,
            Some("2024-06-01"),
            Some("2024-06-30"),
            SurveyStatus::Active,
            true,
            true,
        );

        let boundary = Utc
            .with_ymd_and_hms(2024, 6, 30, 23, 59, 59)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(999))
            .unwrap();
        assert_eq!(derive_status(&s, boundary, UTC_TZ).status, SurveyPhase::Active);

        let one_ms_later = boundary + chrono::Duration::milliseconds(1);
        assert_eq!(derive_status(&s, one_ms_later, UTC_TZ).status, SurveyPhase::Ended);
    }

    #[test]
    fn before_start_is_scheduled() {
        let s = survey(
            1,
            SurveyType::Organizational,
            Some("2024-06-01"),
            Some("2024-06-30"),
            SurveyStatus::Inactive,
            false,
            false,
        );
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let derived = derive_status(&s, now, UTC_TZ);
        assert_eq!(derived.status, SurveyPhase::Scheduled);
        assert_eq!(derived.label, "予定");
    }

    #[test]
    fn missing_dates_fall_back_to_stored_status() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();

        let active = survey(1, SurveyType::Organizational, None, Some("2024-06-30"), SurveyStatus::Active, true, false);
        assert_eq!(derive_status(&active, now, UTC_TZ).label, "実施中");

        let completed = survey(2, SurveyType::Organizational, None, None, SurveyStatus::Completed, false, false);
        assert_eq!(derive_status(&completed, now, UTC_TZ).label, "終了");

        let inactive = survey(3, SurveyType::Organizational, Some("2024-06-01"), None, SurveyStatus::Inactive, false, false);
        assert_eq!(derive_status(&inactive, now, UTC_TZ).label, "不明");
    }

    #[test]
    fn current_survey_prefers_active_then_latest_ended() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 0, 0, 0).unwrap();
        let ended_old = survey(1, SurveyType::Organizational, Some("2024-01-01"), Some("2024-01-31"), SurveyStatus::Completed, false, true);
        let ended_recent = survey(2, SurveyType::Organizational, Some("2024-06-01"), Some("2024-06-30"), SurveyStatus::Completed, false, true);

        let surveys = vec![ended_old.clone(), ended_recent.clone()];
        assert_eq!(pick_current_survey(&surveys, now, UTC_TZ).map(|s| s.id), Some(2));

        let active = survey(3, SurveyType::Organizational, Some("2024-07-01"), Some("2024-07-31"), SurveyStatus::Active, true, true);
        let surveys = vec![ended_old, ended_recent, active];
        assert_eq!(pick_current_survey(&surveys, now, UTC_TZ).map(|s| s.id), Some(3));
    }

    #[test]
    fn running_toggle_rejected_with_conflicting_name() {
        let running = survey(1, SurveyType::Organizational, Some("2024-06-01"), Some("2024-06-30"), SurveyStatus::Active, true, false);
        let target = survey(2, SurveyType::Organizational, Some("2024-07-01"), Some("2024-07-31"), SurveyStatus::Inactive, false, false);

        let err = check_running_enable(target.id, target.survey_type, &[running.clone(), target.clone()])
            .unwrap_err();
        assert_eq!(err, ToggleViolation::RunningConflict("第1回サーベイ".to_string()));
        assert!(err.to_string().contains("第1回サーベイ"));

        // A running survey of the other type does not conflict.
        let growth_target = survey(3, SurveyType::Growth, None, None, SurveyStatus::Inactive, false, false);
        assert!(check_running_enable(growth_target.id, growth_target.survey_type, &[running]).is_ok());
    }

    #[test]
    fn display_toggle_capped_at_five_per_type() {
        let displayed: Vec<Survey> = (1..=5)
            .map(|id| survey(id, SurveyType::Organizational, None, None, SurveyStatus::Completed, false, true))
            .collect();
        let target = survey(6, SurveyType::Organizational, None, None, SurveyStatus::Inactive, false, false);

        assert_eq!(
            check_display_enable(target.id, target.survey_type, &displayed),
            Err(ToggleViolation::DisplayLimit)
        );

        // Re-enabling display on an already-displayed survey is not a violation.
        assert!(check_display_enable(3, SurveyType::Organizational, &displayed).is_ok());
    }
}
