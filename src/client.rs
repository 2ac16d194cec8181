use std::env;
use std::time::{Duration, Instant};

use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{ChatCompletion, ChatCompletionRequest, Model, Reply, Turn};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted when no API token is passed explicitly.
pub const API_TOKEN_ENV: &str = "OPENAI_API_TOKEN";

//////////////////////////////////////////// Completer /////////////////////////////////////////////

/// Anything that can turn a transcript into the next agent turn.
///
/// The remote API is stateless, so every call receives the full ordered
/// history.  Implementations return exactly one agent turn or an error; they
/// never return an empty turn.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    /// Complete the conversation in `turns` with `model`.
    async fn complete(&self, model: &Model, turns: &[Turn]) -> Result<Reply>;
}

////////////////////////////////////////////// OpenAi //////////////////////////////////////////////

/// Client for OpenAI-compatible chat-completion APIs.
///
/// One client owns one connection pool.  Construct it once per process and
/// lend it to the chat session by reference.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_token: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl OpenAi {
    /// Create a new client.
    ///
    /// The API token can be provided directly or read from the
    /// `OPENAI_API_TOKEN` environment variable.
    pub fn new(api_token: Option<String>) -> Result<Self> {
        Self::with_options(api_token, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `base_url` points the client at any server that speaks the
    /// chat-completion protocol; it must be an absolute http(s) URL.
    pub fn with_options(
        api_token: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_token = match api_token {
            Some(token) => token,
            None => env::var(API_TOKEN_ENV).map_err(|_| {
                Error::authentication(format!(
                    "API token not provided and {API_TOKEN_ENV} environment variable not set"
                ))
            })?,
        };
        if api_token.trim().is_empty() {
            return Err(Error::authentication("API token is empty"));
        }

        let base_url = match base_url {
            Some(base_url) => normalize_base_url(&base_url)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_token,
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_message = detail
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());
        let error_param = detail.as_ref().and_then(|e| e.param.clone());

        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }

    /// Send a chat-completion request and wait for the whole response.
    pub async fn send(&self, request: &ChatCompletionRequest<'_>) -> Result<ChatCompletion> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            "sending chat completion"
        );
        let result = self.send_once(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(completion) => tracing::debug!(
                id = completion.id.as_deref().unwrap_or("-"),
                choices = completion.choices.len(),
                "chat completion received"
            ),
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(error = %err, "chat completion failed");
            }
        }
        result
    }

    async fn send_once(&self, request: &ChatCompletionRequest<'_>) -> Result<ChatCompletion> {
        let url = format!("{}chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatCompletion>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl Completer for OpenAi {
    async fn complete(&self, model: &Model, turns: &[Turn]) -> Result<Reply> {
        let request = ChatCompletionRequest::new(model, turns);
        self.send(&request).await?.into_reply()
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let mut url = Url::parse(base_url)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::url(
            format!("base URL must be http or https: {base_url}"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.to_string())
}
