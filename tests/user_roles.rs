use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use dataset_portal::create_app_with;
use dataset_portal::jwt::JwtConfig;
use dataset_portal::navigation::Navigation;

async fn setup() -> Result<(TempDir, SqlitePool, Router)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test_roles.db");
    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    let app = create_app_with(pool.clone(), JwtConfig::new("test-secret", 1), Navigation::builtin()?)?;
    Ok((dir, pool, app))
}

async fn send(app: &Router, method: &str, uri: &str, body: Value, token: Option<&str>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let resp: Response = app.clone().oneshot(builder.body(Body::from(body.to_string()))?).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}

/// Register an account and return (user id, token).
async fn register(app: &Router, email: &str) -> Result<(String, String)> {
    let (status, v) = send(
        app,
        "POST",
        "/auth/register",
        json!({"name": email, "email": email, "password": "password123"}),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = v["user"]["id"].as_str().context("id")?.to_string();
    let token = v["token"].as_str().context("token")?.to_string();
    Ok((id, token))
}

async fn login(app: &Router, email: &str) -> Result<String> {
    let (status, v) = send(app, "POST", "/auth/login", json!({"email": email, "password": "password123"}), None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(v["token"].as_str().context("token")?.to_string())
}

#[tokio::test]
async fn only_admins_change_roles() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let (_admin_id, _) = register(&app, "admin@example.com").await?;
    let (member_id, member_token) = register(&app, "member@example.com").await?;

    // admins are promoted out of band (the CLI does the same update)
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = ?")
        .bind("admin@example.com")
        .execute(&pool)
        .await?;
    let admin_token = login(&app, "admin@example.com").await?;

    let uri = format!("/users/{member_id}/role");

    let (status, _) = send(&app, "PUT", &uri, json!({"role": "admin"}), Some(&member_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "PUT", &uri, json!({"role": "dataset_creator"}), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, v) = send(&app, "PUT", &uri, json!({"role": "root"}), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "unknown_role");

    let (status, v) = send(&app, "PUT", &uri, json!({"role": "dataset_creator"}), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["role"], "dataset_creator");

    let missing = format!("/users/{}/role", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "PUT", &missing, json!({"role": "user"}), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn demoted_admin_token_no_longer_changes_roles() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let (_, _) = register(&app, "former@example.com").await?;
    let (member_id, _) = register(&app, "member@example.com").await?;

    sqlx::query("UPDATE users SET role = 'admin' WHERE email = ?")
        .bind("former@example.com")
        .execute(&pool)
        .await?;
    let stale_token = login(&app, "former@example.com").await?;

    sqlx::query("UPDATE users SET role = 'user' WHERE email = ?")
        .bind("former@example.com")
        .execute(&pool)
        .await?;

    let uri = format!("/users/{member_id}/role");
    let (status, _) = send(&app, "PUT", &uri, json!({"role": "dataset_creator"}), Some(&stale_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}
