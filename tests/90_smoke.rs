mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestServer;

/// GET that waits out the loading state a fresh session may briefly be in.
async fn get_settled(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    for _ in 0..20 {
        let res = client.get(url).send().await?;
        if res.status() != StatusCode::SERVICE_UNAVAILABLE {
            return Ok(res);
        }
        assert_eq!(res.headers()["retry-after"], "1");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("{} stayed loading", url)
}

#[tokio::test]
async fn binary_serves_the_sign_in_flow() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = TestServer::client();
    let base = &server.base_url;

    let health = client.get(format!("{}/health", base)).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.json::<serde_json::Value>().await?["data"]["backend"], "memory");

    let root = client.get(format!("{}/", base)).send().await?;
    assert_eq!(root.status(), StatusCode::SEE_OTHER);
    assert_eq!(root.headers()["location"], "/auth");

    let signed_out = client.get(format!("{}/dashboard", base)).send().await?;
    assert_eq!(signed_out.status(), StatusCode::SEE_OTHER);
    assert_eq!(signed_out.headers()["location"], "/auth");

    let sign_up = client
        .post(format!("{}/auth/sign-up", base))
        .json(&json!({ "email": "smoke@lawdesk.test", "password": "secret1", "full_name": "Smoke Test" }))
        .send()
        .await?;
    assert_eq!(sign_up.status(), StatusCode::CREATED);

    let sign_in = client
        .post(format!("{}/auth/sign-in", base))
        .json(&json!({ "email": "smoke@lawdesk.test", "password": "secret1" }))
        .send()
        .await?;
    assert_eq!(sign_in.status(), StatusCode::SEE_OTHER);
    assert_eq!(sign_in.headers()["location"], "/dashboard");

    // The cookie store carries the session from here on.
    let dashboard = get_settled(&client, &format!("{}/dashboard", base)).await?;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body = dashboard.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["role"], "client");

    let clients = get_settled(&client, &format!("{}/clients", base)).await?;
    assert_eq!(clients.status(), StatusCode::SEE_OTHER);
    assert_eq!(clients.headers()["location"], "/dashboard");

    let sign_out = client.post(format!("{}/auth/sign-out", base)).send().await?;
    assert_eq!(sign_out.status(), StatusCode::SEE_OTHER);
    assert_eq!(sign_out.headers()["location"], "/auth");

    let after = client.get(format!("{}/dashboard", base)).send().await?;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(after.headers()["location"], "/auth");

    Ok(())
}
