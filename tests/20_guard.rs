mod common;

use axum::http::StatusCode;
use lawdesk::auth::Role;
use serde_json::json;

use common::TestApp;

const SESSION_PAGES: [&str; 7] = ["/dashboard", "/cases", "/active-cases", "/calendar", "/billing", "/settings", "/search?q=x"];
const ADMIN_PAGES: [&str; 2] = ["/clients", "/admin"];

#[tokio::test]
async fn no_session_redirects_to_auth_everywhere() {
    let app = TestApp::new();
    for path in SESSION_PAGES.iter().chain(ADMIN_PAGES.iter()) {
        let res = app.get(path, None).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(res.location(), Some("/auth"), "{}", path);
        assert_eq!(res.body["redirect"], "/auth");
    }

    // A forged or stale token is no session at all.
    let res = app.get("/dashboard", Some("not-a-real-token")).await;
    assert_eq!(res.location(), Some("/auth"));
}

#[tokio::test]
async fn roles_below_admin_are_sent_to_dashboard() {
    let app = TestApp::new();
    let (_, lawyer) = app.user_with_token("lawyer@lawdesk.test", "Bilal Lawyer", Role::Lawyer).await;
    let (_, client) = app.user_with_token("client@lawdesk.test", "Ayesha Khan", Role::Client).await;

    for token in [&lawyer, &client] {
        for path in ADMIN_PAGES {
            let res = app.get(path, Some(token)).await;
            assert_eq!(res.status, StatusCode::SEE_OTHER, "{}", path);
            assert_eq!(res.location(), Some("/dashboard"), "{}", path);
        }
        for path in SESSION_PAGES {
            assert_eq!(app.get(path, Some(token)).await.status, StatusCode::OK, "{}", path);
        }
    }
}

#[tokio::test]
async fn admin_opens_every_page() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("admin@lawdesk.test", "Amina Admin", Role::Admin).await;
    for path in SESSION_PAGES.iter().chain(ADMIN_PAGES.iter()) {
        let res = app.get(path, Some(&admin)).await;
        assert_eq!(res.status, StatusCode::OK, "{}: {}", path, res.body);
        assert_eq!(res.body["success"], true);
    }
}

#[tokio::test]
async fn lawyer_scenario_flags_and_navigation() {
    let app = TestApp::new();
    let (_, lawyer) = app.user_with_token("lawyer@lawdesk.test", "Bilal Lawyer", Role::Lawyer).await;

    let dashboard = app.get("/dashboard", Some(&lawyer)).await;
    assert_eq!(dashboard.body["data"]["role"], "lawyer");
    let nav: Vec<&str> = dashboard.body["data"]["navigation"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["path"].as_str())
        .collect();
    assert!(nav.contains(&"/cases"));
    assert!(!nav.contains(&"/admin"));
    assert!(!nav.contains(&"/clients"));

    let res = app.get("/admin", Some(&lawyer)).await;
    assert_eq!(res.location(), Some("/dashboard"));
}

#[tokio::test]
async fn non_admin_account_creation_is_refused() {
    let app = TestApp::new();
    let (_, lawyer) = app.user_with_token("lawyer@lawdesk.test", "Bilal Lawyer", Role::Lawyer).await;

    let res = app
        .post(
            "/admin/users",
            Some(&lawyer),
            json!({ "email": "x@lawdesk.test", "password": "secret1", "full_name": "Some One", "role": "admin" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), Some("/dashboard"));

    let sign_in = app
        .post("/auth/sign-in", None, json!({ "email": "x@lawdesk.test", "password": "secret1" }))
        .await;
    assert_eq!(sign_in.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_pages_and_not_found() {
    let app = TestApp::new();

    let root = app.get("/", None).await;
    assert_eq!(root.status, StatusCode::SEE_OTHER);
    assert_eq!(root.location(), Some("/auth"));

    let (_, client) = app.user_with_token("client@lawdesk.test", "Ayesha Khan", Role::Client).await;
    assert_eq!(app.get("/", Some(&client)).await.location(), Some("/dashboard"));

    let auth = app.get("/auth", None).await;
    assert_eq!(auth.status, StatusCode::OK);
    assert_eq!(auth.body["data"]["allow_sign_up"], true);

    let missing = app.get("/no/such/page", Some(&client)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["home"], "/");

    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
}
