//! Gemini generation provider.
//!
//! Calls `models/{model}:generateContent`. A 429 response is reported as
//! `AttemptFailure::RateLimited`; every other failure, timeouts included,
//! is reported as `AttemptFailure::Failed`.

use crate::client::{AttemptFailure, Candidate, LlmClient, LlmResponse};
use crate::types::{GenerationRequest, SamplingConfig};
use askstore_core::config::DEFAULT_BASE_URL;
use askstore_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP status the service uses for rate limiting.
const RATE_LIMIT_STATUS: u16 = 429;

/// Gemini API request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: &'a SamplingConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini generation client.
pub struct GeminiClient {
    /// Base URL for the API (without trailing slash)
    base_url: String,

    /// API key sent as `x-goog-api-key`
    api_key: String,

    /// Per-attempt timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client against the public endpoint with a 60 second timeout.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, Duration::from_secs(60))
    }

    /// Create a client with a custom base URL and timeout.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Convert a GenerationRequest to the Gemini format.
    fn to_gemini_request<'a>(&self, request: &'a GenerationRequest) -> GeminiRequest<'a> {
        GeminiRequest {
            contents: request
                .turns
                .iter()
                .map(|turn| GeminiContent {
                    role: turn.role.as_str(),
                    parts: vec![GeminiPart { text: &turn.text }],
                })
                .collect(),
            generation_config: &request.sampling,
        }
    }

    /// Convert a Gemini response to LlmResponse.
    ///
    /// A candidate without text parts yields an empty answer rather than
    /// being dropped, so the candidate count is preserved.
    fn convert_response(&self, response: GeminiResponse) -> LlmResponse {
        let candidates = response
            .candidates
            .into_iter()
            .map(|candidate| Candidate {
                text: candidate
                    .content
                    .and_then(|content| content.parts.into_iter().next())
                    .and_then(|part| part.text)
                    .unwrap_or_default(),
            })
            .collect();

        LlmResponse { candidates }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<LlmResponse, AttemptFailure> {
        tracing::info!(
            "Sending generation request to Gemini ({} turns, model {})",
            request.turns.len(),
            model
        );

        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else {
                    e.to_string()
                };
                AppError::upstream("Generation", None, message)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if status.as_u16() == RATE_LIMIT_STATUS {
                return Err(AttemptFailure::RateLimited {
                    message: error_text,
                });
            }

            return Err(AppError::upstream("Generation", Some(status.as_u16()), error_text).into());
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            AppError::upstream(
                "Generation",
                Some(status.as_u16()),
                format!("Failed to parse Gemini response: {}", e),
            )
        })?;

        tracing::debug!(
            "Received {} candidates from Gemini",
            gemini_response.candidates.len()
        );

        Ok(self.convert_response(gemini_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askstore_core::ConversationTurn;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answer the first request on a local port with `status` and `body`.
    async fn respond_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}", addr)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let mut expected = None;

        loop {
            if let Some(total) = expected {
                if buf.len() >= total {
                    return;
                }
            } else if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                expected = Some(end + 4 + length);
                continue;
            }

            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[test]
    fn test_gemini_client_creation() {
        let client = GeminiClient::new("secret").unwrap();
        assert_eq!(client.provider_name(), "gemini");
        assert_eq!(
            client.endpoint("gemini-2.5-flash-lite"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client =
            GeminiClient::with_base_url("http://localhost:9000/", "k", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.endpoint("m"),
            "http://localhost:9000/models/m:generateContent"
        );
    }

    #[test]
    fn test_request_conversion() {
        let client = GeminiClient::new("secret").unwrap();
        let request = GenerationRequest::new(vec![
            ConversationTurn::user("hello"),
            ConversationTurn::model("hi"),
            ConversationTurn::user("question"),
        ]);

        let json = serde_json::to_value(client.to_gemini_request(&request)).unwrap();

        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "question");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_response_conversion() {
        let client = GeminiClient::new("secret").unwrap();
        let raw: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "answer"}], "role": "model"}},
                {"finishReason": "SAFETY"}
            ]}"#,
        )
        .unwrap();

        let response = client.convert_response(raw);
        assert_eq!(response.candidates.len(), 2);
        assert_eq!(response.candidates[0].text, "answer");
        assert_eq!(response.candidates[1].text, "");
    }

    #[test]
    fn test_response_without_candidates() {
        let client = GeminiClient::new("secret").unwrap();
        let raw: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "OTHER"}}"#).unwrap();
        assert!(client.convert_response(raw).candidates.is_empty());
    }

    fn question() -> GenerationRequest {
        GenerationRequest::new(vec![ConversationTurn::user("question")])
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let base = respond_once("429 Too Many Requests", "slow").await;
        let client = GeminiClient::with_base_url(base, "k", Duration::from_secs(5)).unwrap();

        let failure = client.attempt(&question(), "m").await.unwrap_err();
        assert!(matches!(
            failure,
            AttemptFailure::RateLimited { ref message } if message == "slow"
        ));
    }

    #[tokio::test]
    async fn test_other_status_is_failed() {
        let base = respond_once("503 Service Unavailable", "down").await;
        let client = GeminiClient::with_base_url(base, "k", Duration::from_secs(5)).unwrap();

        let failure = client.attempt(&question(), "m").await.unwrap_err();
        assert!(matches!(
            failure,
            AttemptFailure::Failed(AppError::UpstreamUnavailable {
                status: Some(503),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_success_returns_candidates() {
        let base = respond_once(
            "200 OK",
            r#"{"candidates": [{"content": {"parts": [{"text": "grounded"}]}}]}"#,
        )
        .await;
        let client = GeminiClient::with_base_url(base, "k", Duration::from_secs(5)).unwrap();

        let response = client.attempt(&question(), "m").await.unwrap();
        assert_eq!(response.candidates[0].text, "grounded");
    }
}
