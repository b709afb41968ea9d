use std::path::Path;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Blob;
use super::UploadError;

/// Short-lived credentials the media host expects alongside a client-side upload.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAuth {
    pub signature: String,
    pub expire: i64,
    pub token: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub file_id: Option<String>,
    pub name: Option<String>,
    pub file_path: Option<String>,
    pub url: Option<String>,

    /// Local copy of the uploaded bytes, sent to the model with the next prompt.
    #[serde(skip)]
    pub inline_data: Option<Blob>,
}

impl UploadResult {
    /// The stored object's path, if the host returned a usable one.
    pub fn path(&self) -> Option<&str> {
        return self
            .file_path
            .as_deref()
            .filter(|path| return !path.trim().is_empty());
    }
}

#[async_trait]
pub trait MediaUploader {
    async fn upload(&self, file: &Path) -> Result<UploadResult, UploadError>;
}
