use std::path::PathBuf;

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;

use super::ImageKitSettings;
use super::ImageKitUploader;
use super::UploadAuthClient;
use crate::domain::models::Blob;
use crate::domain::models::MediaUploader;
use crate::domain::models::UploadAuth;
use crate::domain::models::UploadError;

fn auth_body() -> String {
    return json!({
        "token": "1bab386f-45ea-49e1-9f0d-6afe49a5b250",
        "expire": 1580372696,
        "signature": "59b1e7516713aec319a77b503c9a6d661ae6de95"
    })
    .to_string();
}

fn settings(url: &str) -> ImageKitSettings {
    return ImageKitSettings {
        upload_url: format!("{url}/api/v1/files/upload"),
        url_endpoint: "https://ik.imagekit.io/levy".to_string(),
        public_key: "public_key_test".to_string(),
    };
}

async fn fixture_file(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("levy-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, b"hello").await?;
    return Ok(path);
}

#[tokio::test]
async fn it_fetches_upload_credentials() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/upload")
        .with_status(200)
        .with_body(auth_body())
        .create_async()
        .await;

    let client = UploadAuthClient::new(&format!("{}/api/upload", server.url()));
    let auth = client.fetch().await?;

    mock.assert_async().await;
    assert_eq!(
        auth,
        UploadAuth {
            token: "1bab386f-45ea-49e1-9f0d-6afe49a5b250".to_string(),
            expire: 1580372696,
            signature: "59b1e7516713aec319a77b503c9a6d661ae6de95".to_string(),
        }
    );

    return Ok(());
}

#[tokio::test]
async fn it_fails_authentication_on_error_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/upload")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = UploadAuthClient::new(&format!("{}/api/upload", server.url()));
    let res = client.fetch().await;

    match res {
        Err(UploadError::Authentication(message)) => {
            assert_eq!(message, "Authentication request failed");
        }
        _ => panic!("Expected an authentication error"),
    }
}

#[tokio::test]
async fn it_uploads_files_with_signed_credentials() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let auth_mock = server
        .mock("GET", "/api/upload")
        .with_status(200)
        .with_body(auth_body())
        .create_async()
        .await;
    let upload_mock = server
        .mock("POST", "/api/v1/files/upload")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("name=\"publicKey\"\r\n\r\npublic_key_test".to_string()),
            Matcher::Regex(
                "name=\"signature\"\r\n\r\n59b1e7516713aec319a77b503c9a6d661ae6de95".to_string(),
            ),
            Matcher::Regex("name=\"expire\"\r\n\r\n1580372696".to_string()),
            Matcher::Regex("name=\"useUniqueFileName\"\r\n\r\ntrue".to_string()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "fileId": "f-1",
                "name": "img123.png",
                "filePath": "/img123.png",
                "url": "https://ik.imagekit.io/levy/img123.png"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let uploader = ImageKitUploader::new(
        settings(&server.url()),
        UploadAuthClient::new(&format!("{}/api/upload", server.url())),
    );
    let path = fixture_file("img123.png").await?;
    let res = uploader.upload(&path).await?;

    auth_mock.assert_async().await;
    upload_mock.assert_async().await;
    assert_eq!(res.path(), Some("/img123.png"));
    assert_eq!(res.file_id, Some("f-1".to_string()));
    assert_eq!(
        res.inline_data,
        Some(Blob {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        })
    );

    return Ok(());
}

#[tokio::test]
async fn it_reports_rejected_uploads() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _auth_mock = server
        .mock("GET", "/api/upload")
        .with_status(200)
        .with_body(auth_body())
        .create_async()
        .await;
    let _upload_mock = server
        .mock("POST", "/api/v1/files/upload")
        .with_status(403)
        .with_body("{\"message\":\"Your request contains invalid signature\"}")
        .create_async()
        .await;

    let uploader = ImageKitUploader::new(
        settings(&server.url()),
        UploadAuthClient::new(&format!("{}/api/upload", server.url())),
    );
    let path = fixture_file("img123.png").await?;
    let res = uploader.upload(&path).await;

    assert!(matches!(res, Err(UploadError::Rejected { status: 403, .. })));

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_missing_files() {
    let uploader = ImageKitUploader::new(
        settings("http://localhost:1"),
        UploadAuthClient::new("http://localhost:1/api/upload"),
    );
    let res = uploader.upload(&PathBuf::from("/does/not/exist.png")).await;

    assert!(matches!(res, Err(UploadError::Io(_))));
}

#[test]
fn it_builds_preview_urls() {
    let settings = settings("http://localhost:1");
    assert_eq!(
        settings.preview_url("/img123.png"),
        "https://ik.imagekit.io/levy/img123.png"
    );

    let bare = ImageKitSettings {
        url_endpoint: "".to_string(),
        ..settings
    };
    assert_eq!(bare.preview_url("/img123.png"), "/img123.png");
}
