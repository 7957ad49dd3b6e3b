mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{test_config, TestApp};

#[tokio::test]
async fn root_lists_endpoints() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/").await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.data()["name"], "Agenda API");
    assert!(res.data()["endpoints"]["consultas"].is_string());
    Ok(())
}

#[tokio::test]
async fn health_reports_store_status() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/health").await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "ok");
    assert_eq!(res.data()["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn ready_when_store_is_usable() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/ready").await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "ready");
    Ok(())
}

#[tokio::test]
async fn unknown_paths_get_json_not_found() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/nao-existe").await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn serves_with_request_logging_on_and_off() -> Result<()> {
    for enabled in [true, false] {
        let mut config = test_config();
        config.api.enable_request_logging = enabled;
        let app = TestApp::with_config(config);

        let res = app.get("/health").await?;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.data()["status"], "ok");
    }
    Ok(())
}
