use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::media_client::{MediaClient, MediaUpload};
use crate::utils::ApiError;

const NEWS_NOT_FOUND: &str = "News item not found";

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct NewsItem {
    #[serde(rename = "id")]
    news_id: Uuid,
    title: String,
    content: String,
    img: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(serde::Deserialize)]
pub struct NewsBody {
    title: Option<String>,
    content: Option<String>,
    img: Option<String>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

#[tracing::instrument(name = "Create a news item", skip(body, pool, media_client))]
pub async fn create_news(
    body: web::Json<NewsBody>,
    pool: web::Data<SqlitePool>,
    media_client: web::Data<MediaClient>,
) -> Result<HttpResponse, ApiError> {
    let NewsBody {
        title,
        content,
        img,
    } = body.into_inner();
    let (Some(title), Some(content), Some(img)) =
        (present(title), present(content), present(img))
    else {
        return Err(ApiError::Validation("All fields are required".into()));
    };

    let img = media_client
        .upload(&img, MediaUpload::image("news"))
        .await?
        .secure_url;
    let now = Utc::now();
    let item = NewsItem {
        news_id: Uuid::new_v4(),
        title,
        content,
        img,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO news (news_id, title, content, img, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.news_id)
    .bind(&item.title)
    .bind(&item.content)
    .bind(&item.img)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(pool.get_ref())
    .await
    .context("Failed to insert a news item")?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "News item created successfully",
        "data": item,
    })))
}

#[tracing::instrument(name = "List news", skip(pool))]
pub async fn list_news(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let news = sqlx::query_as::<_, NewsItem>(
        r#"
        SELECT news_id, title, content, img, created_at, updated_at
        FROM news
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .context("Failed to list news")?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": news,
    })))
}

async fn get_news_item(
    news_id: Uuid,
    pool: &SqlitePool,
) -> Result<NewsItem, ApiError> {
    sqlx::query_as::<_, NewsItem>(
        r#"
        SELECT news_id, title, content, img, created_at, updated_at
        FROM news
        WHERE news_id = ?
        "#,
    )
    .bind(news_id)
    .fetch_optional(pool)
    .await
    .context("Failed to retrieve a news item")?
    .ok_or_else(|| ApiError::NotFound(NEWS_NOT_FOUND.into()))
}

#[tracing::instrument(name = "Get a news item", skip(pool))]
pub async fn get_news(
    news_id: web::Path<Uuid>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let item = get_news_item(news_id.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": item,
    })))
}

#[tracing::instrument(name = "Update a news item", skip(body, pool, media_client))]
pub async fn update_news(
    news_id: web::Path<Uuid>,
    body: web::Json<NewsBody>,
    pool: web::Data<SqlitePool>,
    media_client: web::Data<MediaClient>,
) -> Result<HttpResponse, ApiError> {
    let NewsBody {
        title,
        content,
        img,
    } = body.into_inner();
    let mut item = get_news_item(news_id.into_inner(), &pool).await?;

    // An unchanged url is already stored, only new images are uploaded.
    if let Some(img) = present(img).filter(|img| *img != item.img) {
        item.img = media_client
            .upload(&img, MediaUpload::image("news"))
            .await?
            .secure_url;
    }
    if let Some(title) = present(title) {
        item.title = title;
    }
    if let Some(content) = present(content) {
        item.content = content;
    }
    item.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE news
        SET title = ?, content = ?, img = ?, updated_at = ?
        WHERE news_id = ?
        "#,
    )
    .bind(&item.title)
    .bind(&item.content)
    .bind(&item.img)
    .bind(item.updated_at)
    .bind(item.news_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to update a news item")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "News item updated successfully",
        "data": item,
    })))
}

#[tracing::instrument(name = "Delete a news item", skip(pool))]
pub async fn delete_news(
    news_id: web::Path<Uuid>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM news WHERE news_id = ?")
        .bind(news_id.into_inner())
        .execute(pool.get_ref())
        .await
        .context("Failed to delete a news item")?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::NotFound(NEWS_NOT_FOUND.into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "News item deleted successfully",
    })))
}
