use serde::Serialize;

use super::{cases_by_id, fetch, profile_names, visible_cases, visible_invoices, PageResult, UNKNOWN_CLIENT};
use crate::auth::Role;
use crate::backend::{Backend, Table};
use crate::filter::Query;
use crate::models::Profile;
use crate::session::SessionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Case,
    Client,
    Invoice,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub subtitle: String,
    pub route: String,
}

/// `GET /search`: cases by title, clients by name, invoices by id, at most
/// `limit` of each, all within what the caller can see.
pub async fn global_search(backend: &dyn Backend, view: &SessionView, term: &str, limit: usize) -> PageResult<Vec<SearchResult>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }
    let profile = view.require(Role::Client)?;
    let mut results = Vec::new();

    let cases = visible_cases(backend, view, |query| query.contains("title", term).order("title asc").limit(limit)).await?;
    let names = profile_names(backend, cases.iter().map(|c| c.client_id)).await?;
    results.extend(cases.into_iter().map(|case| SearchResult {
        subtitle: format!("Client: {}", names.get(&case.client_id).map(String::as_str).unwrap_or(UNKNOWN_CLIENT)),
        route: format!("/cases?id={}", case.id),
        id: case.id.to_string(),
        title: case.title,
        kind: ResultKind::Case,
    }));

    if profile.role == Role::Admin {
        let query = Query::new()
            .eq("role", Role::Client.as_str())
            .contains("full_name", term)
            .order("full_name asc")
            .limit(limit);
        let clients: Vec<Profile> = fetch(backend, Table::Profiles, &query).await?;
        results.extend(clients.into_iter().map(|client| SearchResult {
            route: format!("/clients?id={}", client.id),
            id: client.id.to_string(),
            title: client.full_name,
            kind: ResultKind::Client,
            subtitle: client.email,
        }));
    }

    let invoices = visible_invoices(backend, view, Query::new().contains("id", term).order("id asc").limit(limit)).await?;
    let cases = cases_by_id(backend, invoices.iter().map(|i| i.case_id)).await?;
    results.extend(invoices.into_iter().map(|invoice| SearchResult {
        title: format!("Invoice {}", invoice.id),
        subtitle: format!("Case: {}", cases.get(&invoice.case_id).map(|c| c.title.as_str()).unwrap_or("Unknown Case")),
        route: format!("/billing?invoice={}", invoice.id),
        id: invoice.id,
        kind: ResultKind::Invoice,
    }));

    Ok(results)
}
