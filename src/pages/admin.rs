use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{fetch, PageResult};
use crate::auth::password::validate_password_length;
use crate::auth::Role;
use crate::backend::{AuthUser, Backend, NewUser, Table};
use crate::error::ApiError;
use crate::filter::Query;
use crate::models::{Case, Invoice, Profile};
use crate::session::{Notice, SessionProvider, SessionView};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleCounts {
    pub admin: usize,
    pub lawyer: usize,
    pub client: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
    pub users: RoleCounts,
    pub total_users: usize,
    pub cases: usize,
    pub invoices: usize,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserForm {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 2, message = "Full name must be at least 2 characters."))]
    pub full_name: String,
    pub role: Role,
}

/// `GET /admin`
pub async fn overview(backend: &dyn Backend, view: &SessionView) -> PageResult<AdminOverview> {
    view.require(Role::Admin)?;

    let profiles: Vec<Profile> = fetch(backend, Table::Profiles, &Query::new()).await?;
    let cases: Vec<Case> = fetch(backend, Table::Cases, &Query::new()).await?;
    let invoices: Vec<Invoice> = fetch(backend, Table::Invoices, &Query::new()).await?;

    let mut users = RoleCounts::default();
    for profile in &profiles {
        match profile.role {
            Role::Admin => users.admin += 1,
            Role::Lawyer => users.lawyer += 1,
            Role::Client => users.client += 1,
        }
    }

    Ok(AdminOverview {
        users,
        total_users: profiles.len(),
        cases: cases.len(),
        invoices: invoices.len(),
        roles: Role::ALL.to_vec(),
    })
}

/// `POST /admin/users`: validated, then handed to the session provider,
/// which owns the admin-only rule.
pub async fn create_user(
    sessions: &SessionProvider,
    view: &SessionView,
    form: NewUserForm,
    min_password_length: u64,
) -> PageResult<(AuthUser, Notice)> {
    form.validate()?;
    validate_password_length(&form.password, min_password_length).map_err(|msg| ApiError::field("password", msg))?;

    let user = NewUser {
        email: form.email.trim().to_string(),
        password: form.password,
        full_name: form.full_name.trim().to_string(),
        role: form.role,
    };
    Ok(sessions.create_user_account(view, user).await?)
}
