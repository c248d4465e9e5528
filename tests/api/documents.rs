use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{spawn_app, spawn_app_with, TestApp, MEDIA_URL};

const PDF: &str = "data:application/pdf;base64,JVBERi0xLjQK";

fn upload_body(title: &str) -> Value {
    json!({
        "base64_file": PDF,
        "filename": "annual-report.pdf",
        "title": title,
        "content": "Numbers for the year.",
        "category": "reports",
    })
}

async fn upload(app: &TestApp, token: &str, title: &str) -> Value {
    let response = app
        .post("/documents/upload", Some(token), &upload_body(title))
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn documents_are_uploaded_as_raw_files_named_after_the_filename() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    Mock::given(path("/upload"))
        .and(method("POST"))
        .and(body_partial_json(json!({
            "folder": "reports",
            "resource_type": "raw",
            "public_id": "annual-report.pdf",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "secure_url": MEDIA_URL })),
        )
        .expect(1)
        .mount(&app.media_server)
        .await;

    // Act
    let response = app
        .post("/documents/upload", Some(&token), &upload_body("Annual report"))
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Document uploaded successfully");
    assert_eq!(body["data"]["file_url"], MEDIA_URL);
    assert_eq!(body["data"]["title"], "Annual report");
}

#[tokio::test]
async fn the_legacy_camel_case_file_field_is_accepted() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;

    // Act
    let response = app
        .post(
            "/documents/upload",
            Some(&token),
            &json!({
                "base64File": PDF,
                "filename": "minutes.pdf",
                "title": "Minutes",
                "category": "meetings",
            }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn upload_rejects_missing_fields() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    let mut body = upload_body("Annual report");
    body["category"] = Value::Null;

    // Act
    let response = app.post("/documents/upload", Some(&token), &body).await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn oversized_files_are_rejected_without_uploading() {
    // Arrange
    let app = spawn_app_with(|c| c.media_client.max_upload_bytes = 1024).await;
    let token = app.create_admin().await;
    Mock::given(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.media_server)
        .await;
    let mut body = upload_body("Huge report");
    body["base64_file"] = json!("A".repeat(4096));

    // Act
    let response = app.post("/documents/upload", Some(&token), &body).await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn only_admins_can_upload_documents() {
    // Arrange
    let app = spawn_app().await;
    let (_, token) = app.create_verified_user().await;

    // Act
    let anonymous = app
        .post("/documents/upload", None, &upload_body("Annual report"))
        .await;
    let regular = app
        .post("/documents/upload", Some(&token), &upload_body("Annual report"))
        .await;

    // Assert
    assert_eq!(anonymous.status().as_u16(), 401);
    assert_eq!(regular.status().as_u16(), 403);
}

#[tokio::test]
async fn documents_can_be_listed_fetched_updated_and_deleted() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    upload(&app, &token, "Older").await;
    let document = upload(&app, &token, "Newer").await;
    let document_path = format!("/documents/{}", document["id"].as_str().unwrap());

    // Act - Part 1 - List
    let list: Value = app.get("/documents", None).await.json().await.unwrap();
    let items = list["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Newer");

    // Act - Part 2 - Update
    let response = app
        .patch(&document_path, Some(&token), &json!({ "title": "Renamed" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["category"], "reports");

    // Act - Part 3 - Fetch
    let fetched: Value = app.get(&document_path, None).await.json().await.unwrap();
    assert_eq!(fetched["data"]["title"], "Renamed");

    // Act - Part 4 - Delete
    let response = app.delete(&document_path, Some(&token), None).await;
    assert_eq!(response.status().as_u16(), 200);

    // Assert
    assert_eq!(app.get(&document_path, None).await.status().as_u16(), 404);
}

#[tokio::test]
async fn missing_documents_return_404() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let document_path = format!("/documents/{}", Uuid::new_v4());

    // Act
    let fetched = app.get(&document_path, None).await;
    let updated = app
        .patch(&document_path, Some(&token), &json!({ "title": "t" }))
        .await;
    let deleted = app.delete(&document_path, Some(&token), None).await;

    // Assert
    assert_eq!(fetched.status().as_u16(), 404);
    assert_eq!(updated.status().as_u16(), 404);
    assert_eq!(deleted.status().as_u16(), 404);
}
