#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::domain::models::Content;
use crate::domain::models::ContentGenerator;
use crate::domain::models::GenerationError;
use crate::domain::models::ProviderError;
use crate::domain::services::retry_transient;
use crate::domain::services::RetryPolicy;

pub const DEFAULT_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

fn transport_err(err: reqwest::Error) -> ProviderError {
    return ProviderError::new(
        err.status().map(|status| return status.as_u16()),
        None,
        &err.to_string(),
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: &str, threshold: &str) -> SafetySetting {
        return SafetySetting {
            category: category.to_string(),
            threshold: threshold.to_string(),
        };
    }
}

pub fn default_safety_settings() -> Vec<SafetySetting> {
    return vec![
        SafetySetting::new("HARM_CATEGORY_HARASSMENT", "BLOCK_LOW_AND_ABOVE"),
        SafetySetting::new("HARM_CATEGORY_HATE_SPEECH", "BLOCK_LOW_AND_ABOVE"),
    ];
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub url: String,
    pub token: String,
    pub model: String,
    pub safety_settings: Vec<SafetySetting>,
    pub retry: RetryPolicy,
    pub health_check_timeout: Duration,
}

impl GeminiSettings {
    pub fn new(url: &str, token: &str, model: &str) -> GeminiSettings {
        return GeminiSettings {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            model: model.to_string(),
            safety_settings: default_safety_settings(),
            retry: RetryPolicy::default(),
            health_check_timeout: Duration::from_millis(1000),
        };
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    safety_settings: &'a [SafetySetting],
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts joined in order.
    fn text(&self) -> String {
        return self
            .candidates
            .first()
            .and_then(|candidate| return candidate.content.as_ref())
            .map(|content| {
                return content
                    .parts
                    .iter()
                    .filter_map(|part| return part.text.as_deref())
                    .collect::<Vec<&str>>()
                    .join("");
            })
            .unwrap_or_default();
    }
}

impl ErrorDetail {
    fn into_provider_error(self, http_status: Option<u16>) -> ProviderError {
        return ProviderError::new(
            http_status.or(self.code),
            self.status.as_deref(),
            &self.message,
        );
    }
}

async fn error_from_response(res: reqwest::Response) -> ProviderError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();

    if let Ok(parsed) = serde_json::from_str::<GenerateContentResponse>(&body) {
        if let Some(detail) = parsed.error {
            return detail.into_provider_error(Some(status.as_u16()));
        }
    }

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body
    };

    return ProviderError::new(Some(status.as_u16()), None, &message);
}

pub struct Gemini {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl Gemini {
    pub fn new(settings: GeminiSettings) -> Gemini {
        return Gemini {
            client: reqwest::Client::new(),
            settings,
        };
    }

    fn endpoint(&self, method: &str, sse: bool) -> String {
        let alt = if sse { "alt=sse&" } else { "" };
        return format!(
            "{url}/v1beta/models/{model}:{method}?{alt}key={key}",
            url = self.settings.url,
            model = self.settings.model,
            key = self.settings.token,
        );
    }

    fn request_body<'a>(&'a self, history: &'a [Content]) -> GenerateContentRequest<'a> {
        return GenerateContentRequest {
            contents: history,
            safety_settings: &self.settings.safety_settings,
        };
    }

    /// Verifies the token is set and the configured model answers.
    #[allow(clippy::implicit_return)]
    pub async fn health_check(&self) -> Result<()> {
        if self.settings.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.settings.token.is_empty() {
            bail!("Gemini token is not defined");
        }

        let url = format!(
            "{url}/v1beta/models/{model}?key={key}",
            url = self.settings.url,
            model = self.settings.model,
            key = self.settings.token
        );

        let res = self
            .client
            .get(&url)
            .timeout(self.settings.health_check_timeout)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Gemini is not reachable");
                bail!("Gemini is not reachable");
            }
        };

        let status = res.status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "Gemini health check failed");
            bail!("Gemini health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate_once(&self, history: &[Content]) -> Result<String, ProviderError> {
        let res = self
            .client
            .post(self.endpoint("generateContent", false))
            .json(&self.request_body(history))
            .send()
            .await
            .map_err(transport_err)?;

        if !res.status().is_success() {
            let err = error_from_response(res).await;
            tracing::error!(
                status = ?err.status,
                code = ?err.code,
                "Failed to make completion request to Gemini"
            );
            return Err(err);
        }

        let body = res
            .json::<GenerateContentResponse>()
            .await
            .map_err(transport_err)?;
        tracing::debug!(body = ?body, "Completion response");

        return Ok(body.text());
    }

    #[allow(clippy::implicit_return)]
    async fn open_stream(&self, history: &[Content]) -> Result<reqwest::Response, ProviderError> {
        let res = self
            .client
            .post(self.endpoint("streamGenerateContent", true))
            .json(&self.request_body(history))
            .send()
            .await
            .map_err(transport_err)?;

        if !res.status().is_success() {
            let err = error_from_response(res).await;
            tracing::error!(
                status = ?err.status,
                code = ?err.code,
                "Failed to open completion stream to Gemini"
            );
            return Err(err);
        }

        return Ok(res);
    }
}

#[async_trait]
impl ContentGenerator for Gemini {
    #[allow(clippy::implicit_return)]
    async fn generate(&self, history: &[Content]) -> Result<String, GenerationError> {
        if history.is_empty() {
            return Err(GenerationError::EmptyHistory);
        }

        return retry_transient(&self.settings.retry, move |attempt| {
            tracing::debug!(attempt = attempt, model = %self.settings.model, "Requesting content");
            return self.generate_once(history);
        })
        .await;
    }

    #[allow(clippy::implicit_return)]
    async fn generate_stream<'a>(
        &self,
        history: &[Content],
        cancel: &CancellationToken,
        on_chunk: &'a mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, GenerationError> {
        if history.is_empty() {
            return Err(GenerationError::EmptyHistory);
        }

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            res = self.open_stream(history) => res.map_err(GenerationError::Streaming)?,
        };

        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();

        let mut accumulated = "".to_string();
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(received = accumulated.len(), "Stream cancelled");
                    return Err(GenerationError::Cancelled);
                }
                line = lines_reader.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = ?err, "Gemini stream dropped");
                    return Err(GenerationError::Streaming(ProviderError::transport(
                        &err.to_string(),
                    )));
                }
            };

            let cleaned_line = line.trim();
            let payload = match cleaned_line.strip_prefix("data:") {
                Some(payload) => payload.trim(),
                None => continue,
            };

            let fragment = serde_json::from_str::<GenerateContentResponse>(payload).map_err(
                |err| {
                    return GenerationError::Streaming(ProviderError::transport(&format!(
                        "Malformed stream fragment: {err}"
                    )));
                },
            )?;

            if let Some(detail) = fragment.error {
                let err = detail.into_provider_error(None);
                tracing::error!(code = ?err.code, "Gemini reported an error mid-stream");
                return Err(GenerationError::Streaming(err));
            }

            let text = fragment.text();
            if text.is_empty() {
                continue;
            }

            accumulated += &text;
            tracing::debug!(len = accumulated.len(), "Stream chunk");
            on_chunk(&accumulated);
        }

        return Ok(accumulated);
    }
}
