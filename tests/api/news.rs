use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{assert_error, spawn_app, TestApp, MEDIA_URL};

const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

async fn create_news(app: &TestApp, token: &str, title: &str) -> Value {
    let response = app
        .post(
            "/news",
            Some(token),
            &json!({ "title": title, "content": "Something happened.", "img": IMAGE }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn creating_news_requires_every_field() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    let test_cases = vec![
        (json!({ "content": "c", "img": IMAGE }), "missing title"),
        (json!({ "title": "t", "img": IMAGE }), "missing content"),
        (json!({ "title": "t", "content": "c" }), "missing image"),
        (json!({ "title": "", "content": "c", "img": IMAGE }), "empty title"),
    ];

    for (body, description) in test_cases {
        // Act
        let response = app.post("/news", Some(&token), &body).await;

        // Assert
        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had a {}.",
            description
        );
        assert_error(&response.json().await.unwrap(), "All fields are required");
    }
}

#[tokio::test]
async fn news_images_are_uploaded_to_the_news_folder() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    Mock::given(path("/upload"))
        .and(method("POST"))
        .and(body_partial_json(json!({ "folder": "news" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "secure_url": MEDIA_URL })),
        )
        .expect(1)
        .mount(&app.media_server)
        .await;

    // Act
    let news = create_news(&app, &token, "Opening day").await;

    // Assert
    assert_eq!(news["img"], MEDIA_URL);
    assert_eq!(news["title"], "Opening day");
}

#[tokio::test]
async fn regular_users_cannot_publish_news() {
    // Arrange
    let app = spawn_app().await;
    let (_, token) = app.create_verified_user().await;

    // Act
    let response = app
        .post(
            "/news",
            Some(&token),
            &json!({ "title": "t", "content": "c", "img": IMAGE }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn news_is_public_and_listed_newest_first() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    create_news(&app, &token, "Older").await;
    let newest = create_news(&app, &token, "Newer").await;

    // Act
    let list: Value = app.get("/news", None).await.json().await.unwrap();
    let single = app
        .get(&format!("/news/{}", newest["id"].as_str().unwrap()), None)
        .await;

    // Assert
    let items = list["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Newer");
    assert_eq!(single.status().as_u16(), 200);
    let single: Value = single.json().await.unwrap();
    assert_eq!(single["data"]["title"], "Newer");
}

#[tokio::test]
async fn an_unchanged_image_is_not_uploaded_again() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    let news = create_news(&app, &token, "Opening day").await;
    let news_path = format!("/news/{}", news["id"].as_str().unwrap());

    // Act
    let response = app
        .patch(
            &news_path,
            Some(&token),
            &json!({ "title": "Opening week", "img": MEDIA_URL }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Opening week");
    assert_eq!(body["data"]["content"], "Something happened.");
    let uploads = app.media_server.received_requests().await.unwrap();
    assert_eq!(uploads.len(), 1);
}

#[tokio::test]
async fn a_new_image_is_uploaded_on_update() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    let news = create_news(&app, &token, "Opening day").await;

    // Act
    let response = app
        .patch(
            &format!("/news/{}", news["id"].as_str().unwrap()),
            Some(&token),
            &json!({ "img": "data:image/png;base64,R0lGODlh" }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let uploads = app.media_server.received_requests().await.unwrap();
    assert_eq!(uploads.len(), 2);
}

#[tokio::test]
async fn missing_news_returns_404() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let news_path = format!("/news/{}", Uuid::new_v4());

    // Act
    let fetched = app.get(&news_path, None).await;
    let updated = app
        .patch(&news_path, Some(&token), &json!({ "title": "t" }))
        .await;
    let deleted = app.delete(&news_path, Some(&token), None).await;

    // Assert
    assert_eq!(fetched.status().as_u16(), 404);
    assert_eq!(updated.status().as_u16(), 404);
    assert_eq!(deleted.status().as_u16(), 404);
    assert_error(&deleted.json().await.unwrap(), "News item not found");
}

#[tokio::test]
async fn deleted_news_is_gone() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;
    let news = create_news(&app, &token, "Opening day").await;
    let news_path = format!("/news/{}", news["id"].as_str().unwrap());

    // Act
    let response = app.delete(&news_path, Some(&token), None).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.get(&news_path, None).await.status().as_u16(), 404);
}
