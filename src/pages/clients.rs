use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{fetch, matches_search, PageResult};
use crate::auth::Role;
use crate::backend::{Backend, Table};
use crate::filter::Query;
use crate::models::{self, Case, CaseStatus, Profile};
use crate::session::{Notice, SessionView};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    pub search: Option<String>,
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub case_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewClientForm {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub full_name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: String,
    #[validate(length(min = 3, message = "Case title must be at least 3 characters"))]
    pub case_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedClient {
    pub client: Profile,
    pub initial_case: Case,
}

/// `GET /clients`: client profiles with how many cases each has.
pub async fn list_clients(backend: &dyn Backend, view: &SessionView, filter: &ClientFilter) -> PageResult<Vec<ClientRow>> {
    view.require(Role::Admin)?;

    let mut query = Query::new().eq("role", Role::Client.as_str()).order("full_name asc");
    if let Some(id) = filter.id {
        query = query.eq("id", id.to_string());
    }
    let clients: Vec<Profile> = fetch(backend, Table::Profiles, &query).await?;
    let cases: Vec<Case> = fetch(backend, Table::Cases, &Query::new()).await?;

    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for case in &cases {
        *counts.entry(case.client_id).or_default() += 1;
    }

    Ok(clients
        .into_iter()
        .filter(|c| matches_search(filter.search.as_deref(), &[&c.full_name, &c.email, &c.id.to_string()]))
        .map(|c| ClientRow {
            case_count: counts.get(&c.id).copied().unwrap_or(0),
            id: c.id,
            full_name: c.full_name,
            email: c.email,
            created_at: c.created_at,
        })
        .collect())
}

/// `POST /clients`: a client profile plus an initial active case that
/// records the address.
pub async fn create_client(backend: &dyn Backend, view: &SessionView, form: NewClientForm) -> PageResult<(CreatedClient, Notice)> {
    let admin = view.require(Role::Admin)?;
    form.validate()?;

    let name = form.full_name.trim().to_string();
    let profile = Profile::new(Uuid::new_v4(), name.clone(), form.email.trim().to_lowercase(), Role::Client);
    let profile: Profile = models::from_row(backend.insert(Table::Profiles, models::to_row(&profile)?).await?)?;

    let case = Case {
        id: Uuid::new_v4(),
        title: form.case_title.trim().to_string(),
        description: Some(format!("Initial case for {}. Client address: {}", name, form.address.trim())),
        client_id: profile.id,
        lawyer_id: None,
        case_status: CaseStatus::Active,
        next_hearing_date: None,
        created_at: Utc::now(),
    };
    let case: Case = models::from_row(backend.insert(Table::Cases, models::to_row(&case)?).await?)?;

    info!("Client {} added by {}", profile.id, admin.id);
    let notice = Notice::success(format!("{} has been added with an initial case.", name));
    Ok((CreatedClient { client: profile, initial_case: case }, notice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::world;

    fn form(name: &str, email: &str) -> NewClientForm {
        NewClientForm {
            full_name: name.into(),
            email: email.into(),
            address: "12 Mall Road, Lahore".into(),
            case_title: "Lease Review".into(),
        }
    }

    #[tokio::test]
    async fn admin_lists_clients_with_case_counts() {
        let w = world().await;
        let rows = list_clients(w.backend(), &w.admin, &ClientFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].full_name, "Ayesha Khan");
        assert_eq!(rows[0].case_count, 3);
    }

    #[tokio::test]
    async fn only_admins_see_clients() {
        let w = world().await;
        let err = list_clients(w.backend(), &w.lawyer, &ClientFilter::default()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn creating_a_client_opens_an_initial_case() {
        let w = world().await;
        let (created, notice) = create_client(w.backend(), &w.admin, form("Usman Tariq", "Usman@Example.com"))
            .await
            .unwrap();
        assert_eq!(created.client.role, Role::Client);
        assert_eq!(created.client.email, "usman@example.com");
        assert_eq!(created.initial_case.client_id, created.client.id);
        assert_eq!(created.initial_case.case_status, CaseStatus::Active);
        assert!(created.initial_case.description.as_deref().unwrap_or_default().contains("12 Mall Road"));
        assert_eq!(notice.message, "Usman Tariq has been added with an initial case.");

        let found = list_clients(w.backend(), &w.admin, &ClientFilter { search: Some("usman".into()), id: None })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].case_count, 1);
    }

    #[tokio::test]
    async fn client_form_rules() {
        let w = world().await;
        let err = create_client(w.backend(), &w.admin, form("U", "not-an-email")).await.unwrap_err();
        let body = err.to_json();
        assert_eq!(body["field_errors"]["full_name"], "Name must be at least 2 characters");
        assert_eq!(body["field_errors"]["email"], "Please enter a valid email");

        let dup = create_client(w.backend(), &w.admin, form("Dup Client", "client@lawdesk.test")).await.unwrap_err();
        assert_eq!(dup.status_code(), 409);
    }
}
