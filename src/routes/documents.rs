use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::media_client::{MediaClient, MediaUpload};
use crate::utils::ApiError;

const DOCUMENT_NOT_FOUND: &str = "Document not found";

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Document {
    #[serde(rename = "id")]
    document_id: Uuid,
    title: String,
    content: Option<String>,
    category: String,
    file_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

#[derive(serde::Deserialize)]
pub struct UploadDocumentBody {
    #[serde(alias = "base64File")]
    base64_file: Option<String>,
    filename: Option<String>,
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
}

#[tracing::instrument(
    name = "Upload a document",
    skip(body, pool, media_client),
    fields(filename = ?body.filename)
)]
pub async fn upload_document(
    body: web::Json<UploadDocumentBody>,
    pool: web::Data<SqlitePool>,
    media_client: web::Data<MediaClient>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (Some(file), Some(filename), Some(title), Some(category)) = (
        present(body.base64_file),
        present(body.filename),
        present(body.title),
        present(body.category),
    ) else {
        return Err(ApiError::Validation(
            "Missing required fields: base64_file, filename, title, and category are required"
                .into(),
        ));
    };

    let file_url = media_client
        .upload(&file, MediaUpload::raw("reports", &filename))
        .await?
        .secure_url;
    let now = Utc::now();
    let document = Document {
        document_id: Uuid::new_v4(),
        title,
        content: body.content,
        category,
        file_url,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO documents (
            document_id, title, content, category, file_url, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(document.document_id)
    .bind(&document.title)
    .bind(&document.content)
    .bind(&document.category)
    .bind(&document.file_url)
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(pool.get_ref())
    .await
    .context("Failed to insert a document")?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Document uploaded successfully",
        "data": document,
    })))
}

#[tracing::instrument(name = "List documents", skip(pool))]
pub async fn list_documents(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let documents = sqlx::query_as::<_, Document>(
        r#"
        SELECT document_id, title, content, category, file_url, created_at, updated_at
        FROM documents
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .context("Failed to list documents")?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": documents,
    })))
}

async fn get_stored_document(
    document_id: Uuid,
    pool: &SqlitePool,
) -> Result<Option<Document>, anyhow::Error> {
    sqlx::query_as::<_, Document>(
        r#"
        SELECT document_id, title, content, category, file_url, created_at, updated_at
        FROM documents
        WHERE document_id = ?
        "#,
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await
    .context("Failed to retrieve a document")
}

#[tracing::instrument(name = "Get a document", skip(pool))]
pub async fn get_document(
    document_id: web::Path<Uuid>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let document = get_stored_document(document_id.into_inner(), &pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(DOCUMENT_NOT_FOUND.into()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": document,
    })))
}

#[derive(serde::Deserialize)]
pub struct UpdateDocumentBody {
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
}

#[tracing::instrument(name = "Update a document", skip(body, pool))]
pub async fn update_document(
    document_id: web::Path<Uuid>,
    body: web::Json<UpdateDocumentBody>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let document_id = document_id.into_inner();
    let UpdateDocumentBody {
        title,
        content,
        category,
    } = body.into_inner();

    let updated = sqlx::query(
        r#"
        UPDATE documents
        SET title = COALESCE(?, title),
            content = COALESCE(?, content),
            category = COALESCE(?, category),
            updated_at = ?
        WHERE document_id = ?
        "#,
    )
    .bind(present(title))
    .bind(content)
    .bind(present(category))
    .bind(Utc::now())
    .bind(document_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to update a document")?
    .rows_affected();
    if updated == 0 {
        return Err(ApiError::NotFound(DOCUMENT_NOT_FOUND.into()));
    }

    let document = get_stored_document(document_id, &pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(DOCUMENT_NOT_FOUND.into()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Document updated",
        "data": document,
    })))
}

#[tracing::instrument(name = "Delete a document", skip(pool))]
pub async fn delete_document(
    document_id: web::Path<Uuid>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM documents WHERE document_id = ?")
        .bind(document_id.into_inner())
        .execute(pool.get_ref())
        .await
        .context("Failed to delete a document")?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::NotFound(DOCUMENT_NOT_FOUND.into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Document deleted",
    })))
}
