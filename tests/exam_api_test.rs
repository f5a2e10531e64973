mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{json_request, multipart_request, seed_exam, seed_user, send, setup, Part};
use proctoring_backend::models::user::Role;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_exam_with_question_paper_extracts_keywords() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;

    let start = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let end = (Utc::now() + Duration::hours(3)).to_rfc3339();
    let paper = b"Photosynthesis converts light. Photosynthesis needs chlorophyll.";
    let req = multipart_request(
        "/api/exam/create",
        &faculty.token,
        &[
            Part::Text("title", "Biology midterm"),
            Part::Text("description", "Chapters 1-4"),
            Part::Text("start_time", &start),
            Part::Text("end_time", &end),
            Part::Text("duration_minutes", "90"),
            Part::Text("total_marks", "50"),
            Part::File("question_paper", "midterm.txt", paper),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["title"], "Biology midterm");
    assert_eq!(body["status"], "upcoming");
    assert_eq!(body["upload"]["file"]["kind"], "question_paper");
    assert_eq!(body["upload"]["keywords"][0]["keyword"], "photosynthesis");
    assert_eq!(body["upload"]["keywords"][0]["weight"], 2.0);

    let exam_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request("GET", &format!("/api/exam/{}", exam_id), Some(&faculty.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    let stored_path = body["files"][0]["stored_path"].as_str().unwrap();
    assert!(std::path::Path::new(stored_path).exists());

    let (status, body) = send(
        &app,
        json_request(
            "GET",
            &format!("/api/exam/{}/keywords", exam_id),
            Some(&faculty.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let keywords = body.as_array().unwrap();
    assert_eq!(keywords[0]["keyword"], "photosynthesis");
    assert_eq!(keywords[0]["source"], "extracted");
}

#[tokio::test]
async fn create_exam_rejects_inverted_window() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;

    let start = (Utc::now() + Duration::hours(3)).to_rfc3339();
    let end = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let req = multipart_request(
        "/api/exam/create",
        &faculty.token,
        &[
            Part::Text("title", "Backwards"),
            Part::Text("start_time", &start),
            Part::Text("end_time", &end),
            Part::Text("duration_minutes", "30"),
            Part::Text("total_marks", "10"),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "bad_input");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE created_by = $1")
        .bind(faculty.actor.user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn upload_with_disallowed_extension_is_rejected() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;
    let exam = seed_exam(&app, &faculty, "Chemistry quiz").await;

    let req = multipart_request(
        &format!("/api/exam/{}/upload-file", exam.id),
        &faculty.token,
        &[
            Part::Text("kind", "question_paper"),
            Part::File("file", "payload.exe", b"MZ..."),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_file_type");

    let files = std::fs::read_dir(&app.config.uploads_dir)
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(files, 0);
}

#[tokio::test]
async fn keyword_upload_is_recorded_and_manual_save_replaces_all() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;
    let exam = seed_exam(&app, &faculty, "Physics final").await;

    let req = multipart_request(
        &format!("/api/exam/{}/upload-file", exam.id),
        &faculty.token,
        &[
            Part::Text("kind", "keywords"),
            Part::File("file", "terms.txt", b"voltage current voltage resistance"),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["file"]["kind"], "keywords");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/exam/{}/keywords", exam.id),
            Some(&faculty.token),
            Some(json!({"keywords": [
                {"keyword": "Ohm", "weight": 5.0},
                {"keyword": "ampere", "weight": 1.5}
            ]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = send(
        &app,
        json_request(
            "GET",
            &format!("/api/exam/{}/keywords", exam.id),
            Some(&faculty.token),
            None,
        ),
    )
    .await;
    let keywords: Vec<(String, String)> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|k| {
            (
                k["keyword"].as_str().unwrap().to_string(),
                k["source"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        keywords,
        vec![
            ("ohm".to_string(), "manual".to_string()),
            ("ampere".to_string(), "manual".to_string()),
        ]
    );

    let (status, body) = send(
        &app,
        json_request(
            "GET",
            &format!("/api/exam/{}/files", exam.id),
            Some(&faculty.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn exams_are_private_to_their_creator() {
    let Some(app) = setup().await else { return };
    let owner = seed_user(&app.pool, Role::Faculty).await;
    let other = seed_user(&app.pool, Role::Faculty).await;
    let student = seed_user(&app.pool, Role::Student).await;
    let admin = seed_user(&app.pool, Role::Admin).await;
    let exam = seed_exam(&app, &owner, "History essay").await;
    let uri = format!("/api/exam/{}", exam.id);

    let (status, body) = send(&app, json_request("GET", &uri, Some(&other.token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["category"], "permission");

    let (status, _) = send(&app, json_request("GET", &uri, Some(&student.token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, json_request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, json_request("GET", &uri, Some(&admin.token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request(
            "GET",
            &format!("/api/exam/{}", Uuid::new_v4()),
            Some(&owner.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn patch_revalidates_the_window() {
    let Some(app) = setup().await else { return };
    let owner = seed_user(&app.pool, Role::Faculty).await;
    let exam = seed_exam(&app, &owner, "Algebra").await;
    let uri = format!("/api/exam/{}", exam.id);

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &uri,
            Some(&owner.token),
            Some(json!({"duration_minutes": 500})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &uri,
            Some(&owner.token),
            Some(json!({"title": "Linear algebra", "total_marks": 80})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["title"], "Linear algebra");
    assert_eq!(body["total_marks"], 80);
    assert_eq!(body["duration_minutes"], 90);

    let (status, body) = send(&app, json_request("GET", "/api/exam/mine", Some(&owner.token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_titles_are_rejected_on_create_and_update() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;

    let start = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let end = (Utc::now() + Duration::hours(2)).to_rfc3339();
    let req = multipart_request(
        "/api/exam/create",
        &faculty.token,
        &[
            Part::Text("title", "   "),
            Part::Text("start_time", &start),
            Part::Text("end_time", &end),
            Part::Text("duration_minutes", "30"),
            Part::Text("total_marks", "10"),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["category"], "bad_input");

    let exam = seed_exam(&app, &faculty, "Trigonometry").await;
    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/exam/{}", exam.id),
            Some(&faculty.token),
            Some(json!({"title": " \t "})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let titles: Vec<String> = sqlx::query_scalar("SELECT title FROM exams WHERE created_by = $1")
        .bind(faculty.actor.user_id)
        .fetch_all(&app.pool)
        .await
        .unwrap();
    assert_eq!(titles, vec!["Trigonometry".to_string()]);
}

#[tokio::test]
async fn unreadable_question_paper_leaves_no_exam_or_file() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;

    let start = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let end = (Utc::now() + Duration::hours(2)).to_rfc3339();
    let req = multipart_request(
        "/api/exam/create",
        &faculty.token,
        &[
            Part::Text("title", "Broken paper"),
            Part::Text("start_time", &start),
            Part::Text("end_time", &end),
            Part::Text("duration_minutes", "30"),
            Part::Text("total_marks", "10"),
            Part::File("question_paper", "paper.pdf", b"%PDF-1.4 truncated"),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
    assert_eq!(body["error"], "corrupt_file");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE created_by = $1")
        .bind(faculty.actor.user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    let files = std::fs::read_dir(&app.config.uploads_dir)
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(files, 0);
}

#[tokio::test]
async fn body_over_the_request_limit_reports_file_too_large() {
    let Some(app) = setup().await else { return };
    let faculty = seed_user(&app.pool, Role::Faculty).await;
    let exam = seed_exam(&app, &faculty, "Huge upload").await;

    // Past the router's body limit of max_upload_bytes + 1 MiB.
    let oversized = vec![b'a'; app.config.max_upload_bytes + 2 * 1024 * 1024];
    let req = multipart_request(
        &format!("/api/exam/{}/upload-file", exam.id),
        &faculty.token,
        &[
            Part::Text("kind", "question_paper"),
            Part::File("file", "notes.txt", &oversized),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "file_too_large");
}
