use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{BookContent, BookPage, Category, Pagination};
use crate::media_client::{MediaClient, MediaUpload};
use crate::utils::{e400, ApiError};

const BOOK_NOT_FOUND: &str = "Book not found";

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct BookSummary {
    #[serde(rename = "id")]
    book_id: Uuid,
    title: String,
    author: String,
    details: Option<String>,
    book_img: String,
    category: String,
    sub_category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct StoredBook {
    #[sqlx(flatten)]
    summary: BookSummary,
    content: String,
}

impl StoredBook {
    fn content(&self) -> Result<BookContent, anyhow::Error> {
        BookContent::from_stored(&self.content)
            .context("Stored book content is not valid")
    }
}

#[derive(serde::Serialize)]
struct BookWithContent<'a> {
    #[serde(flatten)]
    book: &'a BookSummary,
    content: &'a BookContent,
}

#[derive(serde::Serialize)]
struct BookReader<'a> {
    #[serde(flatten)]
    book: &'a BookSummary,
    content: &'a BookContent,
    total_pages: i64,
    current_page: i64,
    pages: Vec<BookPage>,
}

#[derive(serde::Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

#[derive(serde::Deserialize)]
pub struct CreateBookBody {
    title: Option<String>,
    author: Option<String>,
    details: Option<String>,
    category: Option<String>,
    #[serde(alias = "subCategory")]
    sub_category: Option<String>,
    content: Option<Value>,
    #[serde(alias = "bookImg")]
    book_img: Option<String>,
}

#[tracing::instrument(
    name = "Create a book",
    skip(body, pool, media_client),
    fields(book_title = ?body.title)
)]
pub async fn create_book(
    body: web::Json<CreateBookBody>,
    pool: web::Data<SqlitePool>,
    media_client: web::Data<MediaClient>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (Some(title), Some(author), Some(category), Some(sub_category), Some(content)) = (
        present(body.title),
        present(body.author),
        present(body.category),
        present(body.sub_category),
        body.content.filter(|c| !c.is_null()),
    ) else {
        return Err(ApiError::Validation(
            "All required fields must be filled.".into(),
        ));
    };

    let category = Category::try_from(category).map_err(e400)?;
    category.check_subcategory(&sub_category).map_err(e400)?;
    let content = BookContent::from_input(content).map_err(e400)?;

    let book_img = match present(body.book_img) {
        Some(image) => {
            media_client
                .upload(&image, MediaUpload::image("books"))
                .await?
                .secure_url
        }
        None => String::new(),
    };

    let now = Utc::now();
    let book = BookSummary {
        book_id: Uuid::new_v4(),
        title,
        author,
        details: present(body.details),
        book_img,
        category: category.as_str().to_string(),
        sub_category,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO books (
            book_id, title, author, details, book_img, category,
            sub_category, content, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book.book_id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.details)
    .bind(&book.book_img)
    .bind(&book.category)
    .bind(&book.sub_category)
    .bind(content.to_stored().context("Failed to encode book content")?)
    .bind(book.created_at)
    .bind(book.updated_at)
    .execute(pool.get_ref())
    .await
    .context("Failed to insert a new book")?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Book created successfully",
        "data": BookWithContent { book: &book, content: &content },
    })))
}

#[tracing::instrument(name = "List books", skip(query, pool))]
pub async fn list_books(
    query: web::Query<PageQuery>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination::new(query.page, query.limit).map_err(e400)?;

    let total_books = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
        .fetch_one(pool.get_ref())
        .await
        .context("Failed to count books")?;
    let books = sqlx::query_as::<_, BookSummary>(
        r#"
        SELECT book_id, title, author, details, book_img, category,
               sub_category, created_at, updated_at
        FROM books
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(i64::from(pagination.limit()))
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await
    .context("Failed to list books")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total_books": total_books,
        "total_pages": pagination.total_pages(total_books),
        "current_page": pagination.page(),
        "books": books,
    })))
}

#[tracing::instrument(name = "Fetch stored book", skip(pool))]
async fn get_stored_book(
    book_id: Uuid,
    pool: &SqlitePool,
) -> Result<StoredBook, ApiError> {
    sqlx::query_as::<_, StoredBook>(
        r#"
        SELECT book_id, title, author, details, book_img, category,
               sub_category, content, created_at, updated_at
        FROM books
        WHERE book_id = ?
        "#,
    )
    .bind(book_id)
    .fetch_optional(pool)
    .await
    .context("Failed to retrieve a book")?
    .ok_or_else(|| ApiError::NotFound(BOOK_NOT_FOUND.into()))
}

/// Pages default to one per request, the way a reader flips through.
#[tracing::instrument(name = "Get a book", skip(query, pool))]
pub async fn get_book(
    book_id: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination::with_default_limit(query.page, query.limit, 1)
        .map_err(e400)?;
    let stored = get_stored_book(book_id.into_inner(), &pool).await?;
    let content = stored.content()?;

    let current_page = match &content {
        BookContent::Text(_) => 1,
        BookContent::Pages { .. } => i64::from(pagination.page()),
    };
    Ok(HttpResponse::Ok().json(BookReader {
        book: &stored.summary,
        content: &content,
        total_pages: content.page_count() as i64,
        current_page,
        pages: content.paginate(&pagination),
    }))
}

#[derive(serde::Deserialize)]
pub struct UpdateBookBody {
    title: Option<String>,
    author: Option<String>,
    details: Option<String>,
    category: Option<String>,
    #[serde(alias = "subCategory")]
    sub_category: Option<String>,
    content: Option<Value>,
    #[serde(alias = "bookImg")]
    book_img: Option<String>,
}

#[tracing::instrument(name = "Update a book", skip(body, pool, media_client))]
pub async fn update_book(
    book_id: web::Path<Uuid>,
    body: web::Json<UpdateBookBody>,
    pool: web::Data<SqlitePool>,
    media_client: web::Data<MediaClient>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let StoredBook {
        summary: mut book,
        content,
    } = get_stored_book(book_id.into_inner(), &pool).await?;

    // The merged state has to be consistent, not just the patch.
    let category = Category::try_from(
        present(body.category).unwrap_or_else(|| book.category.clone()),
    )
    .map_err(e400)?;
    let sub_category = present(body.sub_category).unwrap_or(book.sub_category);
    category.check_subcategory(&sub_category).map_err(e400)?;
    book.category = category.as_str().to_string();
    book.sub_category = sub_category;

    let content = match body.content.filter(|c| !c.is_null()) {
        Some(input) => BookContent::from_input(input).map_err(e400)?,
        None => BookContent::from_stored(&content)
            .context("Stored book content is not valid")?,
    };
    if let Some(title) = present(body.title) {
        book.title = title;
    }
    if let Some(author) = present(body.author) {
        book.author = author;
    }
    if let Some(details) = body.details {
        book.details = Some(details);
    }
    if let Some(image) = present(body.book_img).filter(|i| *i != book.book_img) {
        book.book_img = media_client
            .upload(&image, MediaUpload::image("books"))
            .await?
            .secure_url;
    }
    book.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE books
        SET title = ?, author = ?, details = ?, book_img = ?, category = ?,
            sub_category = ?, content = ?, updated_at = ?
        WHERE book_id = ?
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.details)
    .bind(&book.book_img)
    .bind(&book.category)
    .bind(&book.sub_category)
    .bind(content.to_stored().context("Failed to encode book content")?)
    .bind(book.updated_at)
    .bind(book.book_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to update a book")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Book updated successfully",
        "data": BookWithContent { book: &book, content: &content },
    })))
}

#[derive(serde::Deserialize)]
pub struct UpdatePageBody {
    page_number: Option<u32>,
    content: Option<String>,
}

#[tracing::instrument(name = "Update a book page", skip(body, pool))]
pub async fn update_page_content(
    book_id: web::Path<Uuid>,
    body: web::Json<UpdatePageBody>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let UpdatePageBody {
        page_number,
        content,
    } = body.into_inner();
    let (Some(page_number), Some(page_content)) = (page_number, present(content))
    else {
        return Err(ApiError::Validation(
            "page_number and content are required".into(),
        ));
    };

    let stored = get_stored_book(book_id.into_inner(), &pool).await?;
    let mut content = stored.content()?;
    content.upsert_page(page_number, page_content).map_err(e400)?;

    let mut book = stored.summary;
    book.updated_at = Utc::now();
    sqlx::query(
        r#"
        UPDATE books
        SET content = ?, updated_at = ?
        WHERE book_id = ?
        "#,
    )
    .bind(content.to_stored().context("Failed to encode book content")?)
    .bind(book.updated_at)
    .bind(book.book_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to update a book page")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Page updated successfully",
        "data": BookWithContent { book: &book, content: &content },
    })))
}

#[tracing::instrument(name = "Delete a book", skip(pool))]
pub async fn delete_book(
    book_id: web::Path<Uuid>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM books WHERE book_id = ?")
        .bind(book_id.into_inner())
        .execute(pool.get_ref())
        .await
        .context("Failed to delete a book")?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::NotFound(BOOK_NOT_FOUND.into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Book deleted successfully",
    })))
}

#[derive(serde::Serialize)]
struct CategoryView {
    name: &'static str,
    subcategories: &'static [&'static str],
    image: String,
}

impl CategoryView {
    fn new(category: Category, image: String) -> Self {
        Self {
            name: category.as_str(),
            subcategories: category.subcategories(),
            image,
        }
    }
}

#[tracing::instrument(name = "List categories", skip(pool))]
pub async fn list_categories(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let mut images: HashMap<String, String> =
        sqlx::query_as::<_, (String, String)>("SELECT name, image FROM categories")
            .fetch_all(pool.get_ref())
            .await
            .context("Failed to list category images")?
            .into_iter()
            .collect();

    let categories: Vec<CategoryView> = Category::ALL
        .into_iter()
        .map(|c| CategoryView::new(c, images.remove(c.as_str()).unwrap_or_default()))
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": categories,
    })))
}

#[derive(serde::Deserialize)]
pub struct CategoryImageBody {
    category: Option<String>,
    image: Option<String>,
}

#[tracing::instrument(
    name = "Update a category image",
    skip(body, pool, media_client),
    fields(category = ?body.category)
)]
pub async fn update_category_image(
    body: web::Json<CategoryImageBody>,
    pool: web::Data<SqlitePool>,
    media_client: web::Data<MediaClient>,
) -> Result<HttpResponse, ApiError> {
    let CategoryImageBody { category, image } = body.into_inner();
    let (Some(category), Some(image)) = (present(category), present(image)) else {
        return Err(ApiError::Validation(
            "Category and image are required".into(),
        ));
    };
    let category = Category::try_from(category).map_err(e400)?;

    let image = media_client
        .upload(&image, MediaUpload::image("categories"))
        .await?
        .secure_url;
    sqlx::query(
        r#"
        INSERT INTO categories (name, image)
        VALUES (?, ?)
        ON CONFLICT (name) DO UPDATE SET image = excluded.image
        "#,
    )
    .bind(category.as_str())
    .bind(&image)
    .execute(pool.get_ref())
    .await
    .context("Failed to store the category image")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Category image updated successfully",
        "data": CategoryView::new(category, image),
    })))
}
