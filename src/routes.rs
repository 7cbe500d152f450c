use serde::Serialize;

use crate::auth::Role;

/// Every page the application serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppRoute {
    Index,
    Auth,
    Dashboard,
    Cases,
    ActiveCases,
    Clients,
    Calendar,
    Billing,
    Admin,
    Settings,
    NotFound,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

impl AppRoute {
    /// Menu order.
    pub const NAVIGATION: [AppRoute; 8] = [
        AppRoute::Dashboard,
        AppRoute::Cases,
        AppRoute::ActiveCases,
        AppRoute::Clients,
        AppRoute::Calendar,
        AppRoute::Billing,
        AppRoute::Admin,
        AppRoute::Settings,
    ];

    pub fn path(self) -> &'static str {
        match self {
            AppRoute::Index => "/",
            AppRoute::Auth => "/auth",
            AppRoute::Dashboard => "/dashboard",
            AppRoute::Cases => "/cases",
            AppRoute::ActiveCases => "/active-cases",
            AppRoute::Clients => "/clients",
            AppRoute::Calendar => "/calendar",
            AppRoute::Billing => "/billing",
            AppRoute::Admin => "/admin",
            AppRoute::Settings => "/settings",
            AppRoute::NotFound => "/404",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppRoute::Index => "Home",
            AppRoute::Auth => "Sign in",
            AppRoute::Dashboard => "Dashboard",
            AppRoute::Cases => "Cases",
            AppRoute::ActiveCases => "Active Cases",
            AppRoute::Clients => "Clients",
            AppRoute::Calendar => "Calendar",
            AppRoute::Billing => "Billing",
            AppRoute::Admin => "Admin",
            AppRoute::Settings => "Settings",
            AppRoute::NotFound => "Not Found",
        }
    }

    /// Reachable without a session.
    pub fn is_public(self) -> bool {
        matches!(self, AppRoute::Index | AppRoute::Auth | AppRoute::NotFound)
    }

    /// Role a signed-in user needs on top of having a session.
    pub fn required_role(self) -> Option<Role> {
        match self {
            AppRoute::Clients | AppRoute::Admin => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> AppRoute {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        [
            AppRoute::Index,
            AppRoute::Auth,
            AppRoute::Dashboard,
            AppRoute::Cases,
            AppRoute::ActiveCases,
            AppRoute::Clients,
            AppRoute::Calendar,
            AppRoute::Billing,
            AppRoute::Admin,
            AppRoute::Settings,
        ]
        .into_iter()
        .find(|route| route.path() == trimmed)
        .unwrap_or(AppRoute::NotFound)
    }
}

/// Menu entries the given role may open. Without a profile only the
/// ungated entries show.
pub fn nav_items(role: Option<Role>) -> Vec<NavItem> {
    AppRoute::NAVIGATION
        .into_iter()
        .filter(|route| match (route.required_role(), role) {
            (None, _) => true,
            (Some(required), Some(role)) => role.satisfies(required),
            (Some(_), None) => false,
        })
        .map(|route| NavItem { label: route.label(), path: route.path() })
        .collect()
}
