#[cfg(test)]
#[path = "server_test.rs"]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde_derive::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::UploadAuth;
use crate::infrastructure::uploads::ImageKitSigner;

#[derive(Clone)]
struct ServerState {
    signer: Arc<ImageKitSigner>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "Request failed");
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    }
}

async fn upload_auth(State(state): State<ServerState>) -> Result<Json<UploadAuth>, AppError> {
    let auth = state.signer.authentication_parameters().map_err(AppError)?;
    tracing::debug!(expire = auth.expire, "Issued upload credentials");
    return Ok(Json(auth));
}

/// Routes for the upload-authentication API. Only `cors_origin` may call it
/// from a browser.
pub fn router(signer: ImageKitSigner, cors_origin: &str) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET]);

    let state = ServerState {
        signer: Arc::new(signer),
    };

    return Ok(Router::new()
        .route("/api/upload", get(upload_auth))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()));
}

pub async fn start() -> Result<()> {
    let signer = ImageKitSigner::new(&Config::get(ConfigKey::ImagekitPrivateKey))?;
    let app = router(signer, &Config::get(ConfigKey::CorsOrigin))?;

    let port = Config::port()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(port = port, "Server is running");

    axum::serve(listener, app).await?;

    return Ok(());
}
