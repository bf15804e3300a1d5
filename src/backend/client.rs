use std::env;
use std::time::Duration;

use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::output::extract_reply;
use super::types::{
    ApiError, BackendReply, ErrorBody, LocationHint, OutputSchema, Reasoning, ResponsesRequest,
    ResponsesResponse, TextConfig, TextFormat, Tool, UserLocation,
};

const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_REASONING_MODEL: &str = "o3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const SEARCH_MAX_OUTPUT_TOKENS: u32 = 64_000;
const REASONING_MAX_OUTPUT_TOKENS: u32 = 100_000;

const ANALYST_INSTRUCTIONS: &str = "You are a market research analyst assistant. You are given a query and you need to research online and provide a structured response with steps and final answer.";
const PROMPT_ENGINEER_INSTRUCTIONS: &str = "You are a prompt engineer assistant. You are given a query and the result from such query. You need to reason about the query and the result, see what are the pattern of relevant and irrelevant companies. Suggest new sentences to add on the existing query so that the result is more relevant.";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("OPENAI_API_KEY not set. Get one at https://platform.openai.com/api-keys")]
    ApiKeyNotSet,

    #[error("invalid OPENAI_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend returned no output text")]
    EmptyOutput,
}

/// Research-capable answering service the finder drives.
/// Implemented by `OpenAiClient` for production; scripted mocks in tests.
pub trait Backend {
    /// Web-research call, optionally localized and schema-constrained.
    async fn search(
        &self,
        prompt: &str,
        location: Option<&LocationHint>,
        schema: Option<&OutputSchema>,
    ) -> Result<BackendReply, BackendError>;

    /// Offline reasoning call over a prompt, schema-constrained.
    async fn reason(&self, prompt: &str, schema: &OutputSchema)
    -> Result<BackendReply, BackendError>;
}

/// Transient-error retry window: exponential backoff clamped to
/// `[min_backoff, max_backoff]`, giving up once `deadline` would be exceeded.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(10),
            deadline: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Equal jitter over `2^attempt` seconds, then clamped.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = 1000u64.saturating_mul(2u64.saturating_pow(attempt));
        let half = base / 2;
        let jittered = Duration::from_millis(half + fastrand::u64(..half.max(1)));
        jittered.clamp(self.min_backoff, self.max_backoff)
    }
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    reasoning_model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn from_env(http: Client) -> Result<Self, BackendError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| BackendError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(BackendError::ApiKeyNotSet);
        }
        let base_url = env_or("OPENAI_BASE_URL", API_BASE);
        url::Url::parse(&base_url)?;
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
            reasoning_model: env_or("OPENAI_REASONING_MODEL", DEFAULT_REASONING_MODEL),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            base_url: base_url.to_string(),
            retry,
        }
    }

    async fn create_response(
        &self,
        request: &ResponsesRequest,
    ) -> Result<ResponsesResponse, BackendError> {
        let url = format!("{}/responses", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<ErrorBody>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(status.as_u16(), err);
                warn!(error = %classified, "backend API error");
                return Err(classified);
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!("backend API rate limited");
                return Err(BackendError::RateLimited);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, "backend API error (no structured body)");
            return Err(BackendError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: ResponsesResponse = response.json().await?;
        debug!(model = %request.model, "backend response received");

        if let Some(err) = &body.error {
            let classified = classify_api_error(status.as_u16(), err);
            warn!(error = %classified, "backend API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }

    async fn create_with_retry(
        &self,
        request: &ResponsesRequest,
    ) -> Result<ResponsesResponse, BackendError> {
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            match self.create_response(request).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retriable(&e) => {
                    let delay = self.retry.backoff(attempt);
                    if started.elapsed() + delay >= self.retry.deadline {
                        return Err(e);
                    }
                    attempt += 1;
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn complete(
        &self,
        request: ResponsesRequest,
    ) -> Result<BackendReply, BackendError> {
        let structured = request.text.is_some();
        let response = self.create_with_retry(&request).await?;
        extract_reply(&response, structured).ok_or(BackendError::EmptyOutput)
    }
}

impl Backend for OpenAiClient {
    async fn search(
        &self,
        prompt: &str,
        location: Option<&LocationHint>,
        schema: Option<&OutputSchema>,
    ) -> Result<BackendReply, BackendError> {
        let instructions = match location {
            Some(hint) => format!(
                "{ANALYST_INSTRUCTIONS} The companies should be based in {}.",
                hint.country
            ),
            None => ANALYST_INSTRUCTIONS.to_string(),
        };
        let request = ResponsesRequest {
            model: self.model.clone(),
            instructions,
            input: prompt.to_string(),
            tools: vec![Tool {
                kind: "web_search_preview",
                search_context_size: "high",
                user_location: location.map(UserLocation::from),
            }],
            text: schema.map(text_config),
            reasoning: None,
            max_output_tokens: SEARCH_MAX_OUTPUT_TOKENS,
        };
        self.complete(request).await
    }

    async fn reason(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<BackendReply, BackendError> {
        let request = ResponsesRequest {
            model: self.reasoning_model.clone(),
            instructions: PROMPT_ENGINEER_INSTRUCTIONS.to_string(),
            input: prompt.to_string(),
            tools: vec![],
            text: Some(text_config(schema)),
            reasoning: Some(Reasoning { effort: "high" }),
            max_output_tokens: REASONING_MAX_OUTPUT_TOKENS,
        };
        self.complete(request).await
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn text_config(schema: &OutputSchema) -> TextConfig {
    TextConfig {
        format: TextFormat {
            kind: "json_schema",
            name: schema.name.to_string(),
            schema: schema.schema.clone(),
            strict: false,
        },
    }
}

fn is_retriable(e: &BackendError) -> bool {
    matches!(
        e,
        BackendError::RateLimited
            | BackendError::Api {
                code: 500..=599,
                ..
            }
    )
}

fn classify_api_error(status: u16, err: &ApiError) -> BackendError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match (status, err.code.as_deref()) {
        (_, Some("insufficient_quota")) => BackendError::QuotaExhausted(message),
        (429, _) | (_, Some("rate_limit_exceeded")) => BackendError::RateLimited,
        (code, _) => BackendError::Api { code, message },
    }
}
