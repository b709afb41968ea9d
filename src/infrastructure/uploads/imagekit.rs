#[cfg(test)]
#[path = "imagekit_test.rs"]
mod tests;

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart;

use crate::domain::models::Blob;
use crate::domain::models::MediaUploader;
use crate::domain::models::UploadAuth;
use crate::domain::models::UploadError;
use crate::domain::models::UploadResult;

pub const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:3001/api/upload";

const AUTH_FAILED: &str = "Authentication request failed";

/// Fetches upload credentials from the upload-authentication endpoint.
pub struct UploadAuthClient {
    client: reqwest::Client,
    url: String,
}

impl UploadAuthClient {
    pub fn new(url: &str) -> UploadAuthClient {
        return UploadAuthClient {
            client: reqwest::Client::new(),
            url: url.to_string(),
        };
    }

    #[allow(clippy::implicit_return)]
    pub async fn fetch(&self) -> Result<UploadAuth, UploadError> {
        let res = match self.client.get(&self.url).send().await {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Authentication error");
                return Err(UploadError::Authentication(AUTH_FAILED.to_string()));
            }
        };

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            tracing::error!(
                "Authentication error: Request failed with status {}: {}",
                status.as_u16(),
                error_text
            );
            return Err(UploadError::Authentication(AUTH_FAILED.to_string()));
        }

        return res.json::<UploadAuth>().await.map_err(|err| {
            tracing::error!(error = ?err, "Authentication response was malformed");
            return UploadError::Authentication(AUTH_FAILED.to_string());
        });
    }
}

#[derive(Debug, Clone)]
pub struct ImageKitSettings {
    pub upload_url: String,
    pub url_endpoint: String,
    pub public_key: String,
}

impl ImageKitSettings {
    /// Where the stored object at `path` can be viewed.
    pub fn preview_url(&self, path: &str) -> String {
        if self.url_endpoint.is_empty() {
            return path.to_string();
        }

        return format!(
            "{}/{}",
            self.url_endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
    }
}

pub struct ImageKitUploader {
    client: reqwest::Client,
    settings: ImageKitSettings,
    auth: UploadAuthClient,
}

impl ImageKitUploader {
    pub fn new(settings: ImageKitSettings, auth: UploadAuthClient) -> ImageKitUploader {
        return ImageKitUploader {
            client: reqwest::Client::new(),
            settings,
            auth,
        };
    }

    fn form(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        auth: UploadAuth,
    ) -> Result<multipart::Form, UploadError> {
        let file = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;

        return Ok(multipart::Form::new()
            .part("file", file)
            .text("fileName", file_name.to_string())
            .text("publicKey", self.settings.public_key.to_string())
            .text("signature", auth.signature)
            .text("expire", auth.expire.to_string())
            .text("token", auth.token)
            .text("useUniqueFileName", "true"));
    }
}

#[async_trait]
impl MediaUploader for ImageKitUploader {
    #[allow(clippy::implicit_return)]
    async fn upload(&self, file: &Path) -> Result<UploadResult, UploadError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|name| return name.to_string_lossy().to_string())
            .unwrap_or_else(|| return "upload".to_string());
        let mime_type = mime_guess::from_path(file)
            .first_or_octet_stream()
            .to_string();
        let data = STANDARD.encode(&bytes);

        tracing::debug!(file = %file_name, mime = %mime_type, size = bytes.len(), "Upload started");

        let auth = self.auth.fetch().await?;
        let form = self.form(&file_name, &mime_type, bytes, auth)?;
        let res = self
            .client
            .post(&self.settings.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), message = %message, "Upload rejected");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let mut result = res.json::<UploadResult>().await?;
        if result.path().is_none() {
            return Err(UploadError::MissingPath);
        }

        result.inline_data = Some(Blob { mime_type, data });
        tracing::debug!(path = ?result.file_path, "Upload finished");

        return Ok(result);
    }
}
