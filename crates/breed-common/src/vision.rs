/// Client for an OpenAI-compatible vision chat endpoint.
///
/// The default target is Gemini's OpenAI-compatible surface, but any host that
/// accepts `image_url` content parts on `/chat/completions` works. Requests are
/// retried with capped exponential backoff on timeouts, connection failures,
/// 429 and 5xx responses.
use std::future::Future;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,").expect("valid regex")
});

#[derive(Clone)]
pub struct VisionClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for VisionClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(5_000),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl VisionClientConfig {
    /// Optional:
    /// - `CLASSIFIER_API_KEY` (falls back to `GOOGLE_API_KEY`)
    /// - `CLASSIFIER_BASE_URL`, `CLASSIFIER_MODEL`
    /// - `CLASSIFIER_TIMEOUT_SECS`, `CLASSIFIER_MAX_RETRIES`
    /// - `CLASSIFIER_RETRY_INITIAL_MS`, `CLASSIFIER_RETRY_MAX_MS`
    /// - `CLASSIFIER_MAX_ERROR_BODY_BYTES`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var("CLASSIFIER_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let base_url = std::env::var("CLASSIFIER_BASE_URL").unwrap_or(defaults.base_url);
        let model = std::env::var("CLASSIFIER_MODEL").unwrap_or(defaults.model);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout: env_parse::<u64>("CLASSIFIER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: env_parse("CLASSIFIER_MAX_RETRIES").unwrap_or(defaults.max_retries),
            initial_backoff: env_parse::<u64>("CLASSIFIER_RETRY_INITIAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: env_parse::<u64>("CLASSIFIER_RETRY_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            max_error_body_bytes: env_parse("CLASSIFIER_MAX_ERROR_BODY_BYTES")
                .unwrap_or(defaults.max_error_body_bytes),
        }
    }
}

// The API key must never reach the logs.
impl std::fmt::Debug for VisionClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier API key is not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("classifier returned no completion text")]
    EmptyCompletion,
}

/// One classification call: the system instruction, the user-facing prompt and
/// the image as base64 text (optionally already a `data:` URL).
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a> {
    pub instruction: &'a str,
    pub prompt: &'a str,
    pub image_base64: &'a str,
}

/// The external vision classifier: takes an image plus instructions and returns
/// the model's free-text reply.
pub trait Classifier: Send + Sync {
    /// Whether credentials are present. An unconfigured classifier is a
    /// precondition failure, not a classification failure.
    fn is_configured(&self) -> bool {
        true
    }

    /// Model the classifier answers with. Empty when there is only one.
    fn model_id(&self) -> &str {
        ""
    }

    fn classify(
        &self,
        request: ClassifyRequest<'_>,
    ) -> impl Future<Output = Result<String, ClassifierError>> + Send;

    /// Models the classifier host offers. Hosts without a listing report none.
    fn list_models(&self) -> impl Future<Output = Result<ModelListResponse, ClassifierError>> + Send {
        async {
            Ok(ModelListResponse {
                object: None,
                data: Vec::new(),
            })
        }
    }
}

#[derive(Clone)]
pub struct VisionClient {
    config: VisionClientConfig,
    http: reqwest::Client,
}

impl VisionClient {
    pub fn new(config: VisionClientConfig) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .user_agent("breed-recognition/vision")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &VisionClientConfig {
        &self.config
    }

    pub async fn fetch_models(&self) -> Result<ModelListResponse, ClassifierError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models", self.config.base_url);
        self.request_with_retry(|| async {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(api_key)
                .timeout(self.config.timeout)
                .send()
                .await?;
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await
        })
        .await
    }

    pub async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClassifierError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url);
        self.request_with_retry(|| async {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(api_key)
                .timeout(self.config.timeout)
                .json(request)
                .send()
                .await?;
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await
        })
        .await
    }

    fn api_key(&self) -> Result<&str, ClassifierError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(ClassifierError::MissingApiKey)
    }

    async fn parse_json_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, ClassifierError> {
        if resp.status().is_success() {
            let bytes = resp.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        Err(Self::to_upstream_error(resp, max_error_body_bytes).await)
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> ClassifierError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        upstream_error(status, body)
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, ClassifierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClassifierError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt > self.config.max_retries || !should_retry(&e) => return Err(e),
                Err(e) => {
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "classifier request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Classifier for VisionClient {
    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn classify(&self, request: ClassifyRequest<'_>) -> Result<String, ClassifierError> {
        let body = ChatCompletionRequest::vision(&self.config.model, request);
        debug!(model = %body.model, "sending classification request");
        let response = self.chat_completions(&body).await?;
        completion_text(response)
    }

    async fn list_models(&self) -> Result<ModelListResponse, ClassifierError> {
        self.fetch_models().await
    }
}

/// Pull the assistant text out of the first choice.
fn completion_text(response: ChatCompletionResponse) -> Result<String, ClassifierError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ClassifierError::EmptyCompletion)
}

fn upstream_error(status: StatusCode, body: String) -> ClassifierError {
    // Gemini's compatibility layer sometimes wraps the envelope in a one-element array.
    // The array form goes first: a derived struct also accepts a JSON sequence.
    let envelope = serde_json::from_str::<Vec<ErrorEnvelope>>(&body)
        .ok()
        .and_then(|v| v.into_iter().next())
        .or_else(|| serde_json::from_str::<ErrorEnvelope>(&body).ok());
    match envelope {
        Some(parsed) => ClassifierError::Upstream {
            status,
            message: parsed
                .error
                .message
                .unwrap_or_else(|| "unknown upstream error".to_string()),
        },
        None => ClassifierError::UpstreamBody { status, body },
    }
}

fn should_retry(err: &ClassifierError) -> bool {
    match err {
        ClassifierError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        ClassifierError::Upstream { status, .. } | ClassifierError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        ClassifierError::MissingApiKey
        | ClassifierError::InvalidJson(_)
        | ClassifierError::EmptyCompletion => false,
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let capped_ms = initial.as_millis().saturating_mul(mult).min(max.as_millis()) as u64;
    let jitter_cap = (capped_ms / 4).max(1);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            b.truncate(max_bytes);
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

/// Turn an image payload into a `data:` URL suitable for an `image_url` part.
///
/// Payloads that already are image data URLs pass through unchanged. Bare base64
/// gets its MIME type from the encoded magic bytes, JPEG when unrecognized.
pub fn image_data_url(payload: &str) -> String {
    let payload = payload.trim();
    if DATA_URL_RE.is_match(payload) {
        return payload.to_string();
    }
    format!("data:{};base64,{payload}", sniff_mime_type(payload))
}

fn sniff_mime_type(base64: &str) -> &'static str {
    const SIGNATURES: &[(&str, &str)] = &[
        ("/9j/", "image/jpeg"),
        ("iVBORw0KGgo", "image/png"),
        ("R0lGOD", "image/gif"),
        ("UklGR", "image/webp"),
    ];
    SIGNATURES
        .iter()
        .find(|(prefix, _)| base64.starts_with(prefix))
        .map(|(_, mime)| *mime)
        .unwrap_or("image/jpeg")
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelListResponse {
    pub object: Option<String>,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelInfo {
    pub id: String,
    pub object: Option<String>,
    pub owned_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    /// System instruction, then a user turn holding the prompt and the image.
    pub fn vision(model: &str, request: ClassifyRequest<'_>) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: MessageContent::Text(request.instruction.to_string()),
                },
                Message {
                    role: "user".to_string(),
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: request.prompt.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_data_url(request.image_base64),
                            },
                        },
                    ]),
                },
            ],
            temperature: Some(0.2),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: Option<u32>,
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}
