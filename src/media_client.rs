//! Client for the hosted media store that keeps avatars, covers, news
//! pictures and uploaded documents.
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    #[error("File size exceeds {limit_mb}MB limit")]
    TooLarge { limit_mb: usize },
    #[error("The file to upload is empty")]
    Empty,
    #[error("The media store did not return a url for the upload")]
    MissingUrl,
    #[error("Failed to upload file to the media store")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Raw,
}

#[derive(Debug)]
pub struct MediaUpload<'a> {
    pub folder: &'a str,
    pub kind: MediaKind,
    pub public_id: Option<&'a str>,
}

impl<'a> MediaUpload<'a> {
    pub fn image(folder: &'a str) -> Self {
        Self {
            folder,
            kind: MediaKind::Image,
            public_id: None,
        }
    }

    pub fn raw(folder: &'a str, public_id: &'a str) -> Self {
        Self {
            folder,
            kind: MediaKind::Raw,
            public_id: Some(public_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub secure_url: String,
}

pub struct MediaClient {
    http_client: Client,
    base_url: String,
    authorization_token: Secret<String>,
    max_upload_bytes: usize,
}

impl MediaClient {
    pub fn new(
        base_url: String,
        authorization_token: Secret<String>,
        timeout: std::time::Duration,
        max_upload_bytes: usize,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            authorization_token,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// `file` is a data URI, a bare base64 payload or a remote URL the
    /// store fetches by itself.
    #[tracing::instrument(
        name = "Uploading a file to the media store",
        skip(self, file),
        fields(folder = %upload.folder)
    )]
    pub async fn upload(
        &self,
        file: &str,
        upload: MediaUpload<'_>,
    ) -> Result<StoredMedia, MediaError> {
        self.check_size(file)?;

        let url = format!("{}/upload", self.base_url);
        let request_body = UploadRequest {
            file,
            folder: upload.folder,
            resource_type: upload.kind,
            public_id: upload.public_id,
        };
        let response: UploadResponse = self
            .http_client
            .post(&url)
            .bearer_auth(self.authorization_token.expose_secret())
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .secure_url
            .or(response.url)
            .map(|secure_url| StoredMedia { secure_url })
            .ok_or(MediaError::MissingUrl)
    }

    fn check_size(&self, file: &str) -> Result<(), MediaError> {
        let file = file.trim();
        if file.is_empty() {
            return Err(MediaError::Empty);
        }
        if file.starts_with("http://") || file.starts_with("https://") {
            return Ok(());
        }
        if estimated_decoded_size(file) > self.max_upload_bytes {
            return Err(MediaError::TooLarge {
                limit_mb: self.max_upload_bytes / (1024 * 1024),
            });
        }
        Ok(())
    }
}

// Base64 inflates its payload by a third.
fn estimated_decoded_size(file: &str) -> usize {
    let payload = match file.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, p)| p).unwrap_or(rest),
        None => file,
    };
    payload.len() * 3 / 4
}

#[derive(serde::Serialize)]
struct UploadRequest<'a> {
    file: &'a str,
    folder: &'a str,
    resource_type: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_id: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}
