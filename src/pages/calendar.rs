use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::cases::patch_case;
use super::{visible_cases, PageResult};
use crate::auth::Role;
use crate::backend::Backend;
use crate::error::ApiError;
use crate::models::Case;
use crate::session::{Notice, SessionView};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HearingEvent {
    pub id: Uuid,
    pub case_id: Uuid,
    pub title: String,
    pub case_title: String,
    pub date: NaiveDate,
}

impl HearingEvent {
    fn from_case(case: &Case) -> Option<Self> {
        Some(Self {
            id: case.id,
            case_id: case.id,
            title: format!("Hearing: {}", case.title),
            case_title: case.title.clone(),
            date: case.next_hearing_date?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarPage {
    pub selected_date: NaiveDate,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub events: Vec<HearingEvent>,
    pub selected_events: Vec<HearingEvent>,
    pub event_days: Vec<NaiveDate>,
    pub can_schedule: bool,
}

#[derive(Debug, Deserialize)]
pub struct HearingForm {
    pub case_id: Uuid,
    pub hearing_date: NaiveDate,
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = date.with_day(1)?;
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some((first, next_month.pred_opt()?))
}

/// Hearings between `from` and `to` inclusive, in date order.
pub(crate) async fn hearings_between(backend: &dyn Backend, view: &SessionView, from: NaiveDate, to: NaiveDate) -> PageResult<Vec<HearingEvent>> {
    let cases = visible_cases(backend, view, |query| {
        query
            .gte("next_hearing_date", from.to_string())
            .lte("next_hearing_date", to.to_string())
            .order("next_hearing_date asc, title asc")
    })
    .await?;
    Ok(cases.iter().filter_map(HearingEvent::from_case).collect())
}

/// `GET /calendar`
pub async fn calendar_page(backend: &dyn Backend, view: &SessionView, selected: NaiveDate) -> PageResult<CalendarPage> {
    let (month_start, month_end) = month_bounds(selected).ok_or_else(|| ApiError::field("date", "date is out of range"))?;
    let events = hearings_between(backend, view, month_start, month_end).await?;

    let selected_events = events.iter().filter(|e| e.date == selected).cloned().collect();
    let event_days = events.iter().map(|e| e.date).collect::<BTreeSet<_>>().into_iter().collect();

    Ok(CalendarPage {
        selected_date: selected,
        month_start,
        month_end,
        events,
        selected_events,
        event_days,
        can_schedule: view.is_admin() || view.is_lawyer(),
    })
}

/// `POST /calendar/hearings`
pub async fn schedule_hearing(backend: &dyn Backend, view: &SessionView, form: HearingForm, today: NaiveDate) -> PageResult<(HearingEvent, Notice)> {
    let profile = view.require(Role::Lawyer)?;
    if form.hearing_date < today {
        return Err(ApiError::field("hearing_date", "Hearing date cannot be in the past"));
    }

    let case = patch_case(backend, profile, form.case_id, json!({ "next_hearing_date": form.hearing_date })).await?;
    let event = HearingEvent::from_case(&case).ok_or_else(|| ApiError::internal_server_error("Hearing date was not saved"))?;
    Ok((event, Notice::success("Hearing scheduled successfully")))
}
