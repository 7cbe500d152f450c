use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{fetch, matches_search, parse_date, parse_status, profile_names, visible_cases, PageResult, UNKNOWN_CLIENT};
use crate::auth::Role;
use crate::backend::{Backend, Table};
use crate::error::ApiError;
use crate::filter::Query;
use crate::models::{self, Case, CaseStatus, Profile};
use crate::session::{Notice, SessionView};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    /// Deep link from global search.
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Uuid,
    pub client_name: String,
    pub lawyer_id: Option<Uuid>,
    pub status: CaseStatus,
    pub next_hearing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl CaseRow {
    fn matches(&self, search: Option<&str>, status: Option<CaseStatus>) -> bool {
        let id = self.id.to_string();
        status.map_or(true, |s| s == self.status) && matches_search(search, &[&self.title, &self.client_name, &id])
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCaseForm {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,
    pub client_id: Uuid,
    pub description: Option<String>,
    pub case_status: Option<CaseStatus>,
    pub next_hearing_date: Option<NaiveDate>,
}

/// `next_hearing_date`: absent leaves it alone, empty clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseUpdateForm {
    pub case_status: Option<CaseStatus>,
    pub next_hearing_date: Option<String>,
}

/// Attach client names to raw cases.
pub(crate) async fn case_rows(backend: &dyn Backend, cases: Vec<Case>) -> PageResult<Vec<CaseRow>> {
    let names = profile_names(backend, cases.iter().map(|c| c.client_id)).await?;
    Ok(cases
        .into_iter()
        .map(|case| CaseRow {
            client_name: names.get(&case.client_id).cloned().unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
            id: case.id,
            title: case.title,
            description: case.description,
            client_id: case.client_id,
            lawyer_id: case.lawyer_id,
            status: case.case_status,
            next_hearing_date: case.next_hearing_date,
            created_at: case.created_at,
        })
        .collect())
}

async fn list(backend: &dyn Backend, view: &SessionView, filter: &CaseFilter, only_active: bool) -> PageResult<Vec<CaseRow>> {
    let status = parse_status::<CaseStatus>(filter.status.as_deref())?;
    let cases = visible_cases(backend, view, |mut query| {
        if only_active {
            query = query.eq("case_status", CaseStatus::Active.as_str());
        }
        if let Some(id) = filter.id {
            query = query.eq("id", id.to_string());
        }
        query.order("created_at desc")
    })
    .await?;

    let rows = case_rows(backend, cases).await?;
    Ok(rows
        .into_iter()
        .filter(|row| row.matches(filter.search.as_deref(), status))
        .collect())
}

/// `GET /cases`
pub async fn list_cases(backend: &dyn Backend, view: &SessionView, filter: &CaseFilter) -> PageResult<Vec<CaseRow>> {
    list(backend, view, filter, false).await
}

/// `GET /active-cases`
pub async fn active_cases(backend: &dyn Backend, view: &SessionView, filter: &CaseFilter) -> PageResult<Vec<CaseRow>> {
    list(backend, view, filter, true).await
}

/// `GET /cases/daily`: hearings on one date.
pub async fn daily_cases(backend: &dyn Backend, view: &SessionView, date: NaiveDate) -> PageResult<Vec<CaseRow>> {
    let cases = visible_cases(backend, view, |query| {
        query.eq("next_hearing_date", date.to_string()).order("title asc")
    })
    .await?;
    case_rows(backend, cases).await
}

pub async fn create_case(backend: &dyn Backend, view: &SessionView, form: NewCaseForm) -> PageResult<(Case, Notice)> {
    let profile = view.require(Role::Lawyer)?;
    form.validate()?;

    let clients: Vec<Profile> = fetch(
        backend,
        Table::Profiles,
        &Query::new().eq("id", form.client_id.to_string()).eq("role", Role::Client.as_str()).limit(1),
    )
    .await?;
    if clients.is_empty() {
        return Err(ApiError::field("client_id", "Please select a client"));
    }

    let case = Case {
        id: Uuid::new_v4(),
        title: form.title.trim().to_string(),
        description: form.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        client_id: form.client_id,
        lawyer_id: Some(profile.id),
        case_status: form.case_status.unwrap_or(CaseStatus::Pending),
        next_hearing_date: form.next_hearing_date,
        created_at: Utc::now(),
    };
    let row = backend.insert(Table::Cases, models::to_row(&case)?).await?;
    info!("Case {} opened by {}", case.id, profile.id);
    Ok((models::from_row(row)?, Notice::success("Case created successfully")))
}

/// Writes `patch` to one case. Lawyers may only touch cases they handle.
pub(crate) async fn patch_case(backend: &dyn Backend, profile: &Profile, id: Uuid, patch: Value) -> PageResult<Case> {
    let mut query = Query::new().eq("id", id.to_string());
    if profile.role != Role::Admin {
        query = query.eq("lawyer_id", profile.id.to_string());
    }
    let updated = backend.update(Table::Cases, patch, &query).await?;
    match updated.into_iter().next() {
        Some(row) => Ok(models::from_row(row)?),
        None => {
            warn!("Case {} not updatable by {}", id, profile.id);
            Err(ApiError::not_found("Case not found"))
        }
    }
}

pub async fn update_case(backend: &dyn Backend, view: &SessionView, id: Uuid, form: CaseUpdateForm) -> PageResult<(Case, Notice)> {
    let profile = view.require(Role::Lawyer)?;

    let mut patch = Map::new();
    if let Some(status) = form.case_status {
        patch.insert("case_status".to_string(), json!(status));
    }
    match form.next_hearing_date.as_deref().map(str::trim) {
        None => {}
        Some("") => {
            patch.insert("next_hearing_date".to_string(), Value::Null);
        }
        Some(raw) => {
            let date = parse_date("next_hearing_date", raw)?;
            patch.insert("next_hearing_date".to_string(), json!(date));
        }
    }
    if patch.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let case = patch_case(backend, profile, id, Value::Object(patch)).await?;
    Ok((case, Notice::success("Case updated successfully")))
}
