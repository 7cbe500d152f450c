use crate::auth::Role;
use crate::routes::AppRoute;
use crate::session::SessionView;

/// Outcome of a page access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The session is still resolving; show a loading state, decide later.
    Loading,
    Granted,
    Redirect(AppRoute),
}

/// Decides whether `view` may open a protected page, optionally gated on
/// `required`.
///
/// Signed-out users go to the sign-in page. Signed-in users short of the
/// role (or without a profile to read one from) go to the dashboard.
pub fn check(view: &SessionView, required: Option<Role>) -> Access {
    if view.is_loading() {
        return Access::Loading;
    }
    if !view.has_session() {
        return Access::Redirect(AppRoute::Auth);
    }
    let Some(required) = required else {
        return Access::Granted;
    };
    match view.role() {
        Some(role) if role.satisfies(required) => Access::Granted,
        _ => Access::Redirect(AppRoute::Dashboard),
    }
}

/// [`check`] against the route's own requirement. Public routes always pass.
pub fn check_route(view: &SessionView, route: AppRoute) -> Access {
    if route.is_public() {
        return Access::Granted;
    }
    check(view, route.required_role())
}
