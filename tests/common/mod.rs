#![allow(dead_code)]

use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use proctoring_backend::{
    config::Config,
    database::pool::{create_pool, run_migrations},
    dto::exam_dto::CreateExamPayload,
    middleware::auth::{sign_token, Actor},
    models::{exam::Exam, user::Role},
    routes::create_router,
    AppState,
};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";
pub const BOUNDARY: &str = "proctoring-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub state: AppState,
    pub config: Config,
    _uploads: tempfile::TempDir,
}

pub struct TestUser {
    pub actor: Actor,
    pub email: String,
    pub token: String,
}

/// `None` when no database is configured; callers return early.
pub async fn setup() -> Option<TestApp> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database-backed test");
        return None;
    };

    let uploads = tempfile::tempdir().expect("uploads dir");
    let config = Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url,
        jwt_secret: JWT_SECRET.to_string(),
        uploads_dir: uploads.path().to_string_lossy().into_owned(),
        max_upload_bytes: 1024 * 1024,
        keyword_top_n: 20,
        db_max_connections: 5,
        rust_log: "info".to_string(),
        log_json: false,
    };

    let pool = create_pool(&config).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");

    let state = AppState::new(pool.clone(), config.clone());
    let router = create_router(state.clone());
    Some(TestApp {
        router,
        pool,
        state,
        config,
        _uploads: uploads,
    })
}

pub async fn seed_user(pool: &PgPool, role: Role) -> TestUser {
    let id = Uuid::new_v4();
    let email = format!("{}_{}@example.com", role.as_str(), id.simple());
    sqlx::query("INSERT INTO users (id, email, name, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(&email)
        .bind(format!("Test {}", role.as_str()))
        .bind(role.as_str())
        .execute(pool)
        .await
        .expect("seed user");

    let token = sign_token(id, role, Some(&email), JWT_SECRET, 3600).expect("sign token");
    TestUser {
        actor: Actor {
            user_id: id,
            role,
            email: Some(email.clone()),
        },
        email,
        token,
    }
}

/// An exam that opens in one hour and runs for two.
pub async fn seed_exam(app: &TestApp, owner: &TestUser, title: &str) -> Exam {
    let start = Utc::now() + Duration::hours(1);
    let payload = CreateExamPayload {
        title: title.to_string(),
        description: Some("seeded".to_string()),
        start_time: start,
        end_time: start + Duration::hours(2),
        duration_minutes: 90,
        total_marks: 100,
    };
    let (exam, _) = app
        .state
        .exam_service
        .create_exam(&owner.actor, payload, None)
        .await
        .expect("seed exam");
    exam
}

pub async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 4 * 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<JsonValue>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_request(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
