use serde::Serialize;

use super::PageResult;
use crate::auth::Role;
use crate::config::CurrencyConfig;
use crate::models::Profile;
use crate::routes::{nav_items, NavItem};
use crate::session::SessionView;

#[derive(Debug, Clone, Serialize)]
pub struct SettingsPage {
    pub profile: Option<Profile>,
    pub role: Option<Role>,
    pub navigation: Vec<NavItem>,
    pub currency: CurrencyConfig,
}

/// `GET /settings`: read-only account and display preferences.
pub fn settings_page(view: &SessionView, currency: &CurrencyConfig) -> PageResult<SettingsPage> {
    Ok(SettingsPage {
        profile: view.profile().cloned(),
        role: view.role(),
        navigation: nav_items(view.role()),
        currency: currency.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::{pkr, world};

    #[tokio::test]
    async fn shows_profile_and_currency() {
        let w = world().await;
        let page = settings_page(&w.client, &pkr()).unwrap();
        assert_eq!(page.role, Some(Role::Client));
        assert_eq!(page.profile.map(|p| p.full_name), Some("Ayesha Khan".to_string()));
        assert_eq!(page.currency.code, "PKR");
        assert!(!page.navigation.iter().any(|n| n.path == "/clients"));
    }
}
