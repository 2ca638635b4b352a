use std::env;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::prompt::CompiledPrompt;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// How often and how patiently transient failures are retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based): doubles each time
    /// starting from the initial value.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff * (1u32 << attempt.min(16))
    }
}

/// Failure classes the caller can act on. Only `Transient` is retried.
#[derive(Debug)]
pub enum GenerationError {
    /// Credentials missing, invalid or lacking the required entitlement.
    Auth(String),
    /// Rate limit or server-side fault; retried internally and only
    /// surfaced once the retry budget is spent.
    Transient { status: u16, message: String },
    /// The request was processed but no image part came back.
    EmptyResult,
    /// Anything else, with the raw message kept for diagnostics.
    Unknown(String),
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient { .. })
    }

    fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => GenerationError::Auth(message),
            400 | 404
                if message.contains("API key not valid")
                    || message.contains("Requested entity was not found") =>
            {
                GenerationError::Auth(message)
            }
            429 => GenerationError::Transient {
                status: 429,
                message,
            },
            code if status.is_server_error() => GenerationError::Transient {
                status: code,
                message,
            },
            code => GenerationError::Unknown(format!("status {code}: {message}")),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Auth(message) => write!(f, "authorization failed: {message}"),
            GenerationError::Transient { status, message } => {
                write!(f, "transient failure (status {status}): {message}")
            }
            GenerationError::EmptyResult => write!(f, "the response carried no image data"),
            GenerationError::Unknown(message) => write!(f, "generation failed: {message}"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            GenerationError::Transient {
                status: 0,
                message: err.to_string(),
            }
        } else {
            GenerationError::Unknown(err.to_string())
        }
    }
}

/// One generated image, kept as base64 until a consumer needs bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    pub mime_type: String,
    pub data: String,
}

impl GenerationResult {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn bytes(&self) -> Result<Vec<u8>, GenerationError> {
        BASE64
            .decode(&self.data)
            .map_err(|e| GenerationError::Unknown(format!("invalid image payload: {e}")))
    }
}

// Wire types for models/*:generateContent.

#[derive(Serialize, Debug)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize, Debug)]
struct GenerationConfig {
    #[serde(rename = "imageConfig")]
    image_config: ImageConfig,
}

#[derive(Serialize, Debug)]
struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'static str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

fn build_request(prompt: &CompiledPrompt) -> GenerateRequest {
    let mut parts = Vec::with_capacity(2);
    // The reference image goes first so the model treats it as context for
    // the text instructions, matching the service's multimodal ordering.
    if let Some(reference) = &prompt.reference_image {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: reference.mime_type.clone(),
                data: reference.data.clone(),
            }),
        });
    }
    parts.push(Part {
        text: Some(prompt.text.clone()),
        inline_data: None,
    });

    GenerateRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: "1:1",
            },
        },
    }
}

fn first_image(response: &GenerateResponse) -> Option<GenerationResult> {
    response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .find_map(|part| part.inline_data.as_ref())
        .map(|inline| GenerationResult {
            mime_type: inline.mime_type.clone(),
            data: inline.data.clone(),
        })
}

/// Runs `attempt` until it succeeds, fails non-transiently, or the retry
/// budget is spent. Iterative on purpose: the backoff doubles per retry and
/// the counter makes the budget obvious.
async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut tries = 0;
    loop {
        match attempt(tries).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && tries < policy.max_retries => {
                let wait = policy.backoff_for(tries);
                warn!(
                    "transient failure ({err}), retrying in {}ms ({}/{} retries used)",
                    wait.as_millis(),
                    tries + 1,
                    policy.max_retries
                );
                tokio::time::sleep(wait).await;
                tries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Client for the generative-image endpoint. One `generate` call is one
/// logical request; transient failures are absorbed by the retry policy.
pub struct GeminiClient {
    http: ReqwestClient,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(http: ReqwestClient, api_key: String) -> Self {
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            http,
            base_url,
            api_key,
            retry: RetryPolicy::default(),
        }
    }

    pub async fn generate(
        &self,
        prompt: &CompiledPrompt,
    ) -> Result<GenerationResult, GenerationError> {
        let result = retry_transient(&self.retry, |attempt| self.attempt(prompt, attempt)).await?;
        info!("image generated ({}, {} base64 chars)", result.mime_type, result.data.len());
        Ok(result)
    }

    async fn attempt(
        &self,
        prompt: &CompiledPrompt,
        attempt: u32,
    ) -> Result<GenerationResult, GenerationError> {
        let url = format!("{}/{}:generateContent", self.base_url, IMAGE_MODEL);
        debug!("sending generation request, attempt {}", attempt + 1);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|envelope| envelope.error.message)
                .unwrap_or(raw);
            error!("generation request failed: {status} {message}");
            return Err(GenerationError::from_status(status, message));
        }

        let parsed = response.json::<GenerateResponse>().await?;
        first_image(&parsed).ok_or(GenerationError::EmptyResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn transient() -> GenerationError {
        GenerationError::Transient {
            status: 429,
            message: "slow down".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_from_the_initial_value() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn status_classification() {
        let auth = GenerationError::from_status(StatusCode::FORBIDDEN, "no".into());
        assert!(matches!(auth, GenerationError::Auth(_)));
        let auth = GenerationError::from_status(StatusCode::UNAUTHORIZED, "no".into());
        assert!(matches!(auth, GenerationError::Auth(_)));

        let bad_key = GenerationError::from_status(
            StatusCode::BAD_REQUEST,
            "API key not valid. Please pass a valid API key.".into(),
        );
        assert!(matches!(bad_key, GenerationError::Auth(_)));
        let missing = GenerationError::from_status(
            StatusCode::NOT_FOUND,
            "Requested entity was not found.".into(),
        );
        assert!(matches!(missing, GenerationError::Auth(_)));

        let limited = GenerationError::from_status(StatusCode::TOO_MANY_REQUESTS, "rate".into());
        assert!(limited.is_transient());
        let fault = GenerationError::from_status(StatusCode::SERVICE_UNAVAILABLE, "down".into());
        assert!(fault.is_transient());

        let other = GenerationError::from_status(StatusCode::BAD_REQUEST, "malformed".into());
        assert!(matches!(other, GenerationError::Unknown(_)));
    }

    #[test]
    fn transport_errors_split_by_retry_safety() {
        // is_transient is what the retry loop keys on
        assert!(transient().is_transient());
        assert!(!GenerationError::EmptyResult.is_transient());
        assert!(!GenerationError::Auth("x".into()).is_transient());
        assert!(!GenerationError::Unknown("x".into()).is_transient());
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = Cell::new(0u32);
        let result = retry_transient(&test_policy(), |n| {
            attempts.set(attempts.get() + 1);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok("image")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "image");
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn exhausts_the_budget_and_surfaces_the_last_error() {
        let attempts = Cell::new(0u32);
        let result: Result<(), _> = retry_transient(&test_policy(), |_| {
            attempts.set(attempts.get() + 1);
            async { Err(transient()) }
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        // initial attempt + max_retries
        assert_eq!(attempts.get(), 4);
    }

    #[tokio::test]
    async fn auth_errors_are_never_retried() {
        let attempts = Cell::new(0u32);
        let result: Result<(), _> = retry_transient(&test_policy(), |_| {
            attempts.set(attempts.get() + 1);
            async { Err(GenerationError::Auth("key rejected".into())) }
        })
        .await;
        assert!(matches!(result.unwrap_err(), GenerationError::Auth(_)));
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn empty_results_are_never_retried() {
        let attempts = Cell::new(0u32);
        let result: Result<(), _> = retry_transient(&test_policy(), |_| {
            attempts.set(attempts.get() + 1);
            async { Err(GenerationError::EmptyResult) }
        })
        .await;
        assert!(matches!(result.unwrap_err(), GenerationError::EmptyResult));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn response_scan_picks_the_first_image_part() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here is your card" },
                        { "inlineData": { "mimeType": "image/png", "data": "Zmlyc3Q=" } },
                        { "inlineData": { "mimeType": "image/png", "data": "c2Vjb25k" } }
                    ]
                }
            }]
        }))
        .unwrap();
        let image = first_image(&response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "Zmlyc3Q=");
    }

    #[test]
    fn text_only_response_yields_no_image() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "cannot draw that" }] } }]
        }))
        .unwrap();
        assert!(first_image(&response).is_none());

        let empty: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(first_image(&empty).is_none());
    }

    #[test]
    fn reference_image_is_the_leading_part() {
        let prompt = CompiledPrompt {
            text: "draw a card".to_string(),
            reference_image: Some(crate::config::ReferenceImage {
                mime_type: "image/jpeg".to_string(),
                data: "cmVm".to_string(),
            }),
        };
        let request = serde_json::to_value(build_request(&prompt)).unwrap();
        let parts = request["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["data"], "cmVm");
        assert_eq!(parts[1]["text"], "draw a card");
        assert_eq!(
            request["generationConfig"]["imageConfig"]["aspectRatio"],
            "1:1"
        );
    }

    #[test]
    fn data_url_carries_the_mime_type() {
        let result = GenerationResult {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        };
        assert_eq!(result.data_url(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(result.bytes().unwrap(), b"hello");
    }
}
