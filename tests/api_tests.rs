use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use edu_portal::build_app;
use edu_portal::db::connect_in_memory;
use edu_portal::services::memory_store::MemoryObjectStore;
use edu_portal::state::AppState;

const PUBLIC_BASE: &str = "https://cdn.example.com";
const BOUNDARY: &str = "----portal-test-boundary";

// -- Helpers --------------------------------------------------------------

async fn build_test_app() -> (Router, MemoryObjectStore) {
    let db = Arc::new(connect_in_memory().await.unwrap());
    let store = MemoryObjectStore::new(PUBLIC_BASE);
    let state = AppState::new(db, Arc::new(store.clone()));
    (build_app(state, 64 * 1024 * 1024), store)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    read(app.clone().oneshot(request).await.unwrap()).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send_multipart(app: &Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    read(app.clone().oneshot(request).await.unwrap()).await
}

async fn create_branch(app: &Router, code: &str) -> String {
    let (status, json) = send(
        app,
        Method::POST,
        "/api/admin/branches",
        Some(json!({"name": format!("{code} branch"), "code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_str().unwrap().to_string()
}

async fn create_subject(app: &Router, branch_id: &str, code: &str, semester: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/admin/branches/{branch_id}/subjects"),
        Some(json!({"name": "Computer Networks", "code": code, "semester": semester, "credits": 4})),
    )
    .await
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn health_and_readiness() {
    let (app, _) = build_test_app().await;

    let (status, json) = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let (status, json) = send(&app, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["checks"]["sqlite"]["ok"], true);
    assert_eq!(json["checks"]["objectStore"]["ok"], true);
}

#[tokio::test]
async fn legacy_upload_stores_under_branch_and_semester() {
    let (app, store) = build_test_app().await;
    let branch_id = create_branch(&app, "CSE").await;
    let (_, subject) = create_subject(&app, &branch_id, "CN", 5).await;
    let subject_id = subject["data"]["id"].as_str().unwrap().to_string();

    let pdf = vec![b'%'; 2 * 1024 * 1024];
    let body = multipart_body(
        &[
            ("title", "Networks notes"),
            ("branch", "CSE"),
            ("semester", "5"),
            ("subjectId", subject_id.as_str()),
        ],
        Some(("notes.pdf", "application/pdf", pdf.as_slice())),
    );
    let (status, json) = send_multipart(&app, "/api/admin/resources/upload", body).await;

    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["success"], true);
    assert_eq!(json["pdf"]["title"], "Networks notes");
    assert_eq!(json["pdf"]["fileName"], "notes.pdf");
    assert_eq!(json["pdf"]["branch"], "CSE");
    assert_eq!(json["pdf"]["semester"], 5);
    assert_eq!(json["pdf"]["subjectName"], "Computer Networks");
    assert_eq!(json["pdf"]["subjectCode"], "CN");

    let keys = store.keys().await;
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("pdfs/CSE/5/"), "{}", keys[0]);
    assert!(keys[0].ends_with(".pdf"));
    assert_eq!(store.get(&keys[0]).await.unwrap().body.len(), pdf.len());
}

#[tokio::test]
async fn legacy_upload_without_file_is_rejected() {
    let (app, store) = build_test_app().await;
    let body = multipart_body(&[("title", "x"), ("semester", "5")], None);
    let (status, json) = send_multipart(&app, "/api/admin/resources/upload", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn duplicate_subject_code_is_rejected() {
    let (app, _) = build_test_app().await;
    let branch_id = create_branch(&app, "CSE").await;

    let (status, _) = create_subject(&app, &branch_id, "CN", 5).await;
    assert_eq!(status, StatusCode::CREATED);

    for code in ["CN", "cn"] {
        let (status, json) = create_subject(&app, &branch_id, code, 5).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Subject code already exists for this branch");
        assert_eq!(json["success"], false);
        assert_eq!(json["status"], 400);
    }
}

#[tokio::test]
async fn semester_bounds_are_enforced() {
    let (app, _) = build_test_app().await;
    let branch_id = create_branch(&app, "ECE").await;
    for semester in [0, 9] {
        let (status, _) = create_subject(&app, &branch_id, &format!("S{semester}"), semester).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = create_subject(&app, &branch_id, "S8", 8).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn reorder_is_applied_and_idempotent() {
    let (app, _) = build_test_app().await;
    let b1 = create_branch(&app, "CSE").await;
    let b2 = create_branch(&app, "ECE").await;
    let b3 = create_branch(&app, "ME").await;

    let order = json!({"branches": [
        {"id": b3, "position": 1},
        {"id": b1, "position": 2},
        {"id": b2, "position": 3},
    ]});

    for _ in 0..2 {
        let (status, _) = send(&app, Method::PUT, "/api/admin/branches/reorder", Some(order.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = send(&app, Method::GET, "/api/admin/branches", None).await;
        let ids: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![b3.as_str(), b1.as_str(), b2.as_str()]);
    }
}

#[tokio::test]
async fn recorded_resource_round_trips_through_listing() {
    let (app, _) = build_test_app().await;
    let branch_id = create_branch(&app, "CSE").await;
    let (_, subject) = create_subject(&app, &branch_id, "DBMS", 4).await;
    let subject_id = subject["data"]["id"].as_str().unwrap();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/admin/pdfs",
        Some(json!({
            "title": "Normalization cheatsheet",
            "key": "pdfs/1700000000000-abcd1234-normalization.pdf",
            "fileName": "normalization.pdf",
            "fileSize": 1024,
            "fileType": "application/pdf",
            "branch": "cse",
            "semester": 4,
            "subjectId": subject_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(
        created["data"]["fileUrl"],
        format!("{PUBLIC_BASE}/pdfs/1700000000000-abcd1234-normalization.pdf")
    );

    let (status, listed) = send(&app, Method::GET, "/api/admin/pdfs?branch=CSE&semester=4", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = listed["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    for field in ["id", "title", "branch", "semester", "subjectName"] {
        assert_eq!(items[0][field], created["data"][field], "{field}");
    }
    assert_eq!(items[0]["branch"], "CSE");
}

#[tokio::test]
async fn resource_flags_and_delete() {
    let (app, store) = build_test_app().await;
    let branch_id = create_branch(&app, "IT").await;
    let (_, subject) = create_subject(&app, &branch_id, "OS", 3).await;
    let subject_id = subject["data"]["id"].as_str().unwrap().to_string();

    let body = multipart_body(
        &[("title", "OS notes"), ("branch", "IT"), ("semester", "3"), ("subjectId", subject_id.as_str())],
        Some(("os.pdf", "application/pdf", &b"%PDF-1.7"[..])),
    );
    let (_, uploaded) = send_multipart(&app, "/api/admin/resources/upload", body).await;
    let id = uploaded["pdf"]["id"].as_str().unwrap().to_string();

    let (status, patched) = send(
        &app,
        Method::PATCH,
        &format!("/api/admin/pdfs/{id}"),
        Some(json!({"featured": true, "isActive": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["data"]["featured"], true);

    let (_, listed) = send(&app, Method::GET, "/api/admin/pdfs", None).await;
    assert!(listed["data"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, &format!("/api/resources/{id}/download"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/admin/pdfs/{id}?purge=true"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.keys().await.is_empty());

    let (status, json) = send(&app, Method::GET, &format!("/api/admin/pdfs/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn presigned_public_url_is_base_plus_key() {
    let (app, _) = build_test_app().await;
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/upload/presigned",
        Some(json!({
            "fileName": "My Notes (final).pdf",
            "fileSize": 2 * 1024 * 1024,
            "contentType": "application/pdf",
            "category": "pdfs",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["success"], true);
    let key = json["data"]["key"].as_str().unwrap();
    assert!(key.starts_with("pdfs/"));
    assert!(key.ends_with("-My_Notes_final_.pdf"), "{key}");
    assert_eq!(json["data"]["publicUrl"], format!("{PUBLIC_BASE}/{key}"));
    assert!(json["data"]["presignedUrl"].as_str().unwrap().contains(key));
}

#[tokio::test]
async fn presign_reports_the_signed_content_type() {
    let (app, _) = build_test_app().await;
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/upload/presigned",
        Some(json!({
            "fileName": "notes.txt",
            "fileSize": 12,
            "contentType": "Text/Plain; charset=utf-8",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["contentType"], "text/plain");
}

#[tokio::test]
async fn presign_validates_before_signing() {
    let (app, _) = build_test_app().await;
    let cases = [
        json!({"fileName": "huge.pdf", "fileSize": 51 * 1024 * 1024, "contentType": "application/pdf"}),
        json!({"fileName": "tool.exe", "fileSize": 10, "contentType": "application/x-msdownload"}),
        json!({"fileName": "../etc/passwd", "fileSize": 10, "contentType": "text/plain"}),
    ];
    for case in cases {
        let (status, json) = send(&app, Method::POST, "/api/upload/presigned", Some(case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn proxy_upload_writes_object() {
    let (app, store) = build_test_app().await;
    let body = multipart_body(
        &[("category", "images")],
        Some(("diagram.png", "image/png", &b"\x89PNG\r\n"[..])),
    );
    let (status, json) = send_multipart(&app, "/api/upload/proxy", body).await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let key = json["data"]["key"].as_str().unwrap();
    assert!(key.starts_with("images/"));
    assert_eq!(json["data"]["publicUrl"], format!("{PUBLIC_BASE}/{key}"));
    assert_eq!(store.get(key).await.unwrap().content_type, "image/png");
}

#[tokio::test]
async fn unknown_branch_uses_error_envelope() {
    let (app, _) = build_test_app().await;
    let (status, json) = send(&app, Method::GET, "/api/admin/branches/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn blog_and_quiz_endpoints() {
    let (app, _) = build_test_app().await;

    let (status, post) = send(
        &app,
        Method::POST,
        "/api/blog",
        Some(json!({"title": "Exam Week Tips", "content": "# Sleep", "published": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["data"]["slug"], "exam-week-tips");
    let (status, fetched) = send(&app, Method::GET, "/api/blog/exam-week-tips", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["content"], "# Sleep");

    let quiz = json!({
        "title": "Networks warm-up",
        "homePreviewPosition": 2,
        "questions": [{"prompt": "TCP is?", "options": ["L3", "L4"], "correctIndex": 1, "explanation": null}],
    });
    let (status, created) = send(&app, Method::POST, "/api/admin/quizzes", Some(quiz)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let (_, home) = send(&app, Method::GET, "/api/quizzes/home", None).await;
    assert_eq!(home["data"][0]["id"], created["data"]["id"]);
    assert_eq!(home["data"][0]["questions"][0]["correctIndex"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/quizzes",
        Some(json!({"title": "bad", "homePreviewPosition": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quiz_links_to_admin_created_subject() {
    let (app, _) = build_test_app().await;
    let branch_id = create_branch(&app, "CSE").await;
    let (_, subject) = create_subject(&app, &branch_id, "CN", 5).await;
    let subject_id = subject["data"]["id"].as_str().unwrap();

    let quiz = json!({
        "title": "Networks basics",
        "branch": "CSE",
        "semester": 5,
        "subjectId": subject_id,
        "questions": [{"prompt": "UDP is?", "options": ["Reliable", "Connectionless"], "correctIndex": 1, "explanation": null}],
    });
    let (status, created) = send(&app, Method::POST, "/api/admin/quizzes", Some(quiz)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert!(created["data"]["subjectId"].is_string());

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/admin/quizzes",
        Some(json!({"title": "Orphan", "subjectId": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    assert_eq!(json["success"], false);
}
