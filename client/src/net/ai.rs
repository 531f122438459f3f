//! Code-suggestion text generation.
//!
//! Thin HTTP wrapper over the Gemini `generateContent` REST endpoint. Pure
//! parsing in `parse_response` for testability; the [`GenerateText`] trait
//! lets the store and CLI run against a mock.

#[cfg(test)]
#[path = "ai_test.rs"]
mod ai_test;

use std::time::Duration;

use frames::ErrorCode;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

/// Errors produced by text generation.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The HTTP request to the provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider answered with no text.
    #[error("empty response from model")]
    EmptyResponse,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for AiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::EmptyResponse => "E_EMPTY_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

/// Provider-neutral prompt-in, text-out generator. Enables mocking in tests.
#[async_trait::async_trait]
pub trait GenerateText: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`AiError`] if the request fails or the response is
    /// malformed or empty.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Prompt asking for a bare code continuation of `code`.
#[must_use]
pub fn suggestion_prompt(language: &str, code: &str) -> String {
    format!(
        "Provide a code suggestion for the following {language} code snippet. \
         Return only the suggested code without explanation:\n\n{code}"
    )
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`AiError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AiError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait::async_trait]
impl GenerateText for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = ApiRequest { contents: vec![ApiContent { parts: vec![ApiPart { text: prompt }] }] };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AiError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(AiError::ApiResponse { status, body: text });
        }

        parse_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ApiRequest<'a> {
    contents: Vec<ApiContent<'a>>,
}

#[derive(Serialize)]
struct ApiContent<'a> {
    parts: Vec<ApiPart<'a>>,
}

#[derive(Serialize)]
struct ApiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Text of the first candidate, parts concatenated.
fn parse_response(json: &str) -> Result<String, AiError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| AiError::ApiParse(e.to_string()))?;

    let text: String = api
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}
