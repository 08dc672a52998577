mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", server.base_url)).send().await?;

    // OK or SERVICE_UNAVAILABLE depending on whether a database is around
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let body = res.json::<serde_json::Value>().await?;
    assert!(body["data"]["status"] == "ok" || body["data"]["status"] == "degraded");
    // datastore text never leaks
    assert!(body["data"].get("database_error").is_none());
    Ok(())
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = common::spawn_server().await?;
    let body: serde_json::Value = reqwest::get(format!("{}/", server.base_url))
        .await?
        .json()
        .await?;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Showcase API");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(format!("{}/api/projects/1", server.base_url)).await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn dropped_server_stops_listening() -> Result<()> {
    let server = common::spawn_server().await?;
    let url = format!("{}/health", server.base_url);
    drop(server);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()?;
    assert!(client.get(&url).send().await.is_err(), "server still answering after drop");
    Ok(())
}
