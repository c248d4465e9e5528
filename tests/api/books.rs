use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{assert_error, spawn_app, TestApp, MEDIA_URL};

fn paged_book(title: &str, pages: u32) -> Value {
    let pages: Vec<Value> = (1..=pages)
        .map(|n| json!({ "page_number": n, "content": format!("page {}", n) }))
        .collect();
    json!({
        "title": title,
        "author": "Ibn Khaldun",
        "category": "humanities",
        "sub_category": "history",
        "content": { "pages": pages },
    })
}

async fn create_book(app: &TestApp, token: &str, body: &Value) -> Value {
    let response = app.post("/books", Some(token), body).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn creating_a_book_requires_an_admin() {
    // Arrange
    let app = spawn_app().await;
    let (_, user_token) = app.create_verified_user().await;
    let book = paged_book("Muqaddimah", 2);

    // Act
    let anonymous = app.post("/books", None, &book).await;
    let regular = app.post("/books", Some(&user_token), &book).await;

    // Assert
    assert_eq!(anonymous.status().as_u16(), 401);
    assert_eq!(regular.status().as_u16(), 403);
}

#[tokio::test]
async fn create_book_rejects_missing_fields() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;

    // Act
    let response = app
        .post("/books", Some(&token), &json!({ "title": "Half a book" }))
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    assert_error(
        &response.json().await.unwrap(),
        "All required fields must be filled.",
    );
}

#[tokio::test]
async fn create_book_rejects_a_subcategory_of_another_category() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let mut book = paged_book("Muqaddimah", 1);
    book["sub_category"] = json!("poetry and stories");

    // Act
    let response = app.post("/books", Some(&token), &book).await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn create_book_accepts_camel_case_and_text_content() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;

    // Act
    let book = create_book(
        &app,
        &token,
        &json!({
            "title": "Diwan",
            "author": "Al-Mutanabbi",
            "category": "language and literature books",
            "subCategory": "poetry and stories",
            "content": "One long poem.",
        }),
    )
    .await;

    // Assert
    assert_eq!(book["sub_category"], "poetry and stories");
    assert_eq!(book["content"], "One long poem.");
    assert_eq!(book["book_img"], "");
}

#[tokio::test]
async fn a_cover_image_is_uploaded_to_the_books_folder() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    Mock::given(path("/upload"))
        .and(method("POST"))
        .and(body_partial_json(json!({ "folder": "books", "resource_type": "image" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "secure_url": MEDIA_URL })),
        )
        .expect(1)
        .mount(&app.media_server)
        .await;
    let mut body = paged_book("Muqaddimah", 1);
    body["book_img"] = json!("data:image/png;base64,iVBORw0KGgo=");

    // Act
    let book = create_book(&app, &token, &body).await;

    // Assert
    assert_eq!(book["book_img"], MEDIA_URL);
}

#[tokio::test]
async fn books_are_listed_newest_first_without_content() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    for title in ["First", "Second", "Third"] {
        create_book(&app, &token, &paged_book(title, 1)).await;
    }

    // Act
    let response = app.get("/books?page=1&limit=2", None).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_books"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["current_page"], 1);
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["title"], "Third");
    assert!(books[0].get("content").is_none());
}

#[tokio::test]
async fn list_books_rejects_an_invalid_page() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get("/books?page=0", None).await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn get_book_returns_the_requested_page() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let book = create_book(&app, &token, &paged_book("Muqaddimah", 3)).await;
    let id = book["id"].as_str().unwrap();

    // Act
    let response = app.get(&format!("/books/{}?page=2", id), None).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Muqaddimah");
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["current_page"], 2);
    let pages = body["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["page_number"], 2);
    assert_eq!(body["content"]["pages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn get_book_reports_the_page_count_whatever_the_limit() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let book = create_book(&app, &token, &paged_book("Muqaddimah", 3)).await;
    let id = book["id"].as_str().unwrap();

    // Act
    let response = app.get(&format!("/books/{}?page=1&limit=2", id), None).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["pages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn text_books_are_read_as_a_single_page() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let mut body = paged_book("Essay", 1);
    body["content"] = json!("All of it.");
    let book = create_book(&app, &token, &body).await;

    // Act
    let response = app
        .get(&format!("/books/{}?page=3", book["id"].as_str().unwrap()), None)
        .await;

    // Assert
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["pages"][0]["content"], "All of it.");
}

#[tokio::test]
async fn missing_or_malformed_book_ids_return_404() {
    // Arrange
    let app = spawn_app().await;

    for id in [Uuid::new_v4().to_string(), "12345".to_string()] {
        // Act
        let response = app.get(&format!("/books/{}", id), None).await;

        // Assert
        assert_eq!(response.status().as_u16(), 404);
    }
}

#[tokio::test]
async fn updating_only_the_category_must_keep_the_subcategory_valid() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let book = create_book(&app, &token, &paged_book("Muqaddimah", 1)).await;
    let book_path = format!("/books/{}", book["id"].as_str().unwrap());

    // Act
    let mismatched = app
        .patch(&book_path, Some(&token), &json!({ "category": "law books" }))
        .await;
    let consistent = app
        .patch(
            &book_path,
            Some(&token),
            &json!({ "category": "law books", "sub_category": "law" }),
        )
        .await;

    // Assert
    assert_eq!(mismatched.status().as_u16(), 400);
    assert_eq!(consistent.status().as_u16(), 200);
    let body: Value = consistent.json().await.unwrap();
    assert_eq!(body["data"]["category"], "law books");
    assert_eq!(body["data"]["sub_category"], "law");
    assert_eq!(body["data"]["title"], "Muqaddimah");
}

#[tokio::test]
async fn page_content_is_upserted() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let book = create_book(&app, &token, &paged_book("Muqaddimah", 2)).await;
    let page_path = format!("/books/{}/page", book["id"].as_str().unwrap());

    // Act
    let replaced = app
        .put(
            &page_path,
            Some(&token),
            &json!({ "page_number": 1, "content": "rewritten" }),
        )
        .await;
    let added = app
        .put(
            &page_path,
            Some(&token),
            &json!({ "page_number": 5, "content": "appendix" }),
        )
        .await;

    // Assert
    assert_eq!(replaced.status().as_u16(), 200);
    assert_eq!(added.status().as_u16(), 200);
    let body: Value = added.json().await.unwrap();
    let pages = body["data"]["content"]["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["content"], "rewritten");
    assert_eq!(pages[2]["page_number"], 5);
}

#[tokio::test]
async fn pages_cannot_be_added_to_text_books() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let mut body = paged_book("Essay", 1);
    body["content"] = json!("All of it.");
    let book = create_book(&app, &token, &body).await;

    // Act
    let response = app
        .put(
            &format!("/books/{}/page", book["id"].as_str().unwrap()),
            Some(&token),
            &json!({ "page_number": 2, "content": "more" }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    assert_error(
        &response.json().await.unwrap(),
        "Invalid book content format",
    );
}

#[tokio::test]
async fn deleting_a_book_removes_it() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    let book = create_book(&app, &token, &paged_book("Muqaddimah", 1)).await;
    let book_path = format!("/books/{}", book["id"].as_str().unwrap());

    // Act
    let first = app.delete(&book_path, Some(&token), None).await;
    let second = app.delete(&book_path, Some(&token), None).await;

    // Assert
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 404);
    assert_error(&second.json().await.unwrap(), "Book not found");
    assert_eq!(app.get(&book_path, None).await.status().as_u16(), 404);
}

#[tokio::test]
async fn categories_are_listed_with_their_images() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;

    // Act - Part 1 - No images yet
    let body: Value = app.get("/books/categories", None).await.json().await.unwrap();
    let categories = body["data"].as_array().unwrap();
    assert_eq!(categories.len(), 5);
    assert!(categories.iter().all(|c| c["image"] == ""));

    // Act - Part 2 - Set one image
    let response = app
        .put(
            "/books/categories/image",
            Some(&token),
            &json!({ "category": "law books", "image": "data:image/png;base64,iVBORw0KGgo=" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    // Assert
    let body: Value = app.get("/books/categories", None).await.json().await.unwrap();
    let law = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "law books")
        .unwrap()
        .clone();
    assert_eq!(law["image"], MEDIA_URL);
    assert_eq!(law["subcategories"], json!(["law", "sharia and preaching"]));
}

#[tokio::test]
async fn unknown_categories_cannot_get_an_image() {
    // Arrange
    let app = spawn_app().await;
    let token = app.create_admin().await;
    app.accept_uploads().await;

    // Act
    let response = app
        .put(
            "/books/categories/image",
            Some(&token),
            &json!({ "category": "cookbooks", "image": MEDIA_URL }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}
