use serde::Serialize;
use uuid::Uuid;

use super::{Notice, SessionError};
use crate::auth::Role;
use crate::backend::AuthUser;
use crate::models::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Anonymous,
    Loading,
    Active,
}

/// Read-only snapshot of one session, handed to guards and pages.
///
/// Only [`SessionProvider`](super::SessionProvider) builds these. The role
/// flags are all derived from the single profile role, so at most one of
/// them is ever true.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    status: SessionStatus,
    session_id: Option<Uuid>,
    user: Option<AuthUser>,
    profile: Option<Profile>,
    #[serde(skip)]
    notices: Vec<Notice>,
}

impl SessionView {
    pub(crate) fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            session_id: None,
            user: None,
            profile: None,
            notices: Vec::new(),
        }
    }

    pub(crate) fn loading(session_id: Uuid, user: AuthUser) -> Self {
        Self {
            status: SessionStatus::Loading,
            session_id: Some(session_id),
            user: Some(user),
            profile: None,
            notices: Vec::new(),
        }
    }

    pub(crate) fn active(session_id: Uuid, user: AuthUser, profile: Option<Profile>, notices: Vec<Notice>) -> Self {
        Self {
            status: SessionStatus::Active,
            session_id: Some(session_id),
            user: Some(user),
            profile,
            notices,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    pub fn has_session(&self) -> bool {
        self.user.is_some()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_lawyer(&self) -> bool {
        self.role() == Some(Role::Lawyer)
    }

    pub fn is_client(&self) -> bool {
        self.role() == Some(Role::Client)
    }

    /// Role check for actions (as opposed to page access, which redirects).
    pub fn require(&self, required: Role) -> Result<&Profile, SessionError> {
        match self.profile.as_ref() {
            Some(profile) if profile.role.satisfies(required) => Ok(profile),
            _ => Err(SessionError::PermissionDenied(format!("This action requires the {} role", required))),
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_role(role: Role) -> SessionView {
        let id = Uuid::new_v4();
        let user = AuthUser { id, email: "someone@example.com".to_string() };
        let profile = Profile::new(id, "Someone", "someone@example.com", role);
        SessionView::active(Uuid::new_v4(), user, Some(profile), vec![])
    }

    #[test]
    fn lawyer_flags() {
        let view = with_role(Role::Lawyer);
        assert!(view.is_lawyer());
        assert!(!view.is_admin());
        assert!(!view.is_client());
    }

    #[test]
    fn exactly_one_flag_per_role() {
        for role in Role::ALL {
            let view = with_role(role);
            let set = [view.is_admin(), view.is_lawyer(), view.is_client()];
            assert_eq!(set.iter().filter(|f| **f).count(), 1);
        }
    }

    #[test]
    fn anonymous_has_no_flags() {
        let view = SessionView::anonymous();
        assert!(!view.has_session());
        assert_eq!(view.role(), None);
        assert!(!view.is_admin() && !view.is_lawyer() && !view.is_client());
    }

    #[test]
    fn require_follows_the_hierarchy() {
        assert!(with_role(Role::Admin).require(Role::Lawyer).is_ok());
        assert!(with_role(Role::Lawyer).require(Role::Lawyer).is_ok());
        assert!(with_role(Role::Client).require(Role::Lawyer).is_err());
        assert!(SessionView::anonymous().require(Role::Client).is_err());
    }
}
