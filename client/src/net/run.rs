//! Remote code execution against a Piston-compatible service.
//!
//! Language auto-selection from the active file, request building and
//! response interpretation are pure; [`ExecutionClient`] is the only part
//! that touches the network. A language picked by hand travels from the
//! picker to the session store as a tagged string checked by
//! [`decode_selection`]. A [`RunJob`] snapshots what a run needs so it can
//! finish on its own task.

#[cfg(test)]
#[path = "run_test.rs"]
mod run_test;

use std::time::Duration;

use frames::ErrorCode;
use serde::{Deserialize, Serialize};

use crate::util::language;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to fetch supported languages: {0}")]
    Runtimes(String),

    #[error("Failed to run the code: {0}")]
    Execute(String),

    #[error("execution service returned status {status}")]
    ApiResponse { status: u16, body: String },

    #[error("execution service response parse failed: {0}")]
    ApiParse(String),

    #[error("no supported language for {file_name}")]
    NoLanguage { file_name: String },

    #[error("Unable to parse selected language. Please try again.")]
    Selection(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for RunError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Runtimes(_) => "E_FETCH_LANGUAGES",
            Self::Execute(_) => "E_RUN_CODE",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::NoLanguage { .. } => "E_NO_LANGUAGE",
            Self::Selection(_) => "E_PARSE_LANGUAGE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Runtimes(_) | Self::Execute(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Runtime offered by the execution service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub stdin: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub run: RunResult,
}

impl ExecuteResponse {
    /// What the user sees: stderr when the program wrote any, else stdout.
    #[must_use]
    pub fn output(&self) -> &str {
        if self.run.stderr.is_empty() { &self.run.stdout } else { &self.run.stderr }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.run.stderr.is_empty()
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// Runtime for a file: one whose aliases include the extension, or whose
/// name matches the language the extension maps to.
#[must_use]
pub fn select_language<'a>(languages: &'a [Language], file_name: &str) -> Option<&'a Language> {
    let extension = language::extension(file_name)?.to_lowercase();
    let mapped = language::lookup(&extension);
    languages.iter().find(|lang| {
        lang.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(&extension))
            || mapped.is_some_and(|name| lang.language.to_lowercase() == name)
    })
}

/// Runtime by name or alias, ignoring case.
#[must_use]
pub fn find_language<'a>(languages: &'a [Language], name: &str) -> Option<&'a Language> {
    let name = name.trim();
    languages.iter().find(|lang| {
        lang.language.eq_ignore_ascii_case(name) || lang.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

/// Execution request for one source file.
#[must_use]
pub fn build_request(language: &Language, file_name: &str, code: &str, stdin: &str) -> ExecuteRequest {
    ExecuteRequest {
        language: language.language.clone(),
        version: language.version.clone(),
        files: vec![SourceFile { name: file_name.to_owned(), content: code.to_owned() }],
        stdin: stdin.to_owned(),
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Selection {
    Language(Language),
}

/// Serialize a selected language for a string-valued UI control.
#[must_use]
pub fn encode_selection(language: &Language) -> String {
    serde_json::to_string(&Selection::Language(language.clone())).unwrap_or_default()
}

/// Inverse of [`encode_selection`].
///
/// # Errors
///
/// Returns [`RunError::Selection`] when the value is not a tagged language
/// with non-empty name and version.
pub fn decode_selection(raw: &str) -> Result<Language, RunError> {
    let Selection::Language(language) = serde_json::from_str(raw).map_err(|e| RunError::Selection(e.to_string()))?;
    if language.language.trim().is_empty() || language.version.trim().is_empty() {
        return Err(RunError::Selection("language and version must be non-empty".into()));
    }
    Ok(language)
}

// =============================================================================
// JOB
// =============================================================================

/// One execution, detached from the session that asked for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunJob {
    pub file_name: String,
    pub code: String,
    pub stdin: String,
    /// Chosen by hand; auto-selected from the file name when absent.
    pub language: Option<Language>,
}

impl RunJob {
    /// # Errors
    ///
    /// Returns [`RunError::NoLanguage`] when nothing was chosen and no
    /// runtime matches the file.
    pub fn request(&self, languages: &[Language]) -> Result<ExecuteRequest, RunError> {
        let language = match &self.language {
            Some(language) => language,
            None => select_language(languages, &self.file_name)
                .ok_or_else(|| RunError::NoLanguage { file_name: self.file_name.clone() })?,
        };
        Ok(build_request(language, &self.file_name, &self.code, &self.stdin))
    }

    /// Fetch runtimes when needed, then execute.
    ///
    /// # Errors
    ///
    /// Returns the first runtimes, selection or execute error.
    pub async fn run(&self, runner: &dyn CodeRunner) -> Result<ExecuteResponse, RunError> {
        let languages = if self.language.is_some() { Vec::new() } else { runner.runtimes().await? };
        let request = self.request(&languages)?;
        runner.execute(&request).await
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Execution-service operations. Enables mocking in tests.
#[async_trait::async_trait]
pub trait CodeRunner: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RunError::Runtimes`] or a response error.
    async fn runtimes(&self) -> Result<Vec<Language>, RunError>;

    /// # Errors
    ///
    /// Returns [`RunError::Execute`] or a response error.
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, RunError>;
}

pub struct ExecutionClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExecutionClient {
    /// # Errors
    ///
    /// Returns [`RunError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, RunError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| RunError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn read_body(response: reqwest::Response, wrap: fn(String) -> RunError) -> Result<String, RunError> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| wrap(e.to_string()))?;
    if status != 200 {
        return Err(RunError::ApiResponse { status, body: text });
    }
    Ok(text)
}

#[async_trait::async_trait]
impl CodeRunner for ExecutionClient {
    async fn runtimes(&self) -> Result<Vec<Language>, RunError> {
        let response = self
            .http
            .get(self.url("/runtimes"))
            .send()
            .await
            .map_err(|e| RunError::Runtimes(e.to_string()))?;
        let text = read_body(response, RunError::Runtimes).await?;
        parse_runtimes(&text)
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, RunError> {
        tracing::debug!(language = %request.language, version = %request.version, "execute request");
        let response = self
            .http
            .post(self.url("/execute"))
            .json(request)
            .send()
            .await
            .map_err(|e| RunError::Execute(e.to_string()))?;
        let text = read_body(response, RunError::Execute).await?;
        parse_execute(&text)
    }
}

fn parse_runtimes(json: &str) -> Result<Vec<Language>, RunError> {
    serde_json::from_str(json).map_err(|e| RunError::ApiParse(e.to_string()))
}

fn parse_execute(json: &str) -> Result<ExecuteResponse, RunError> {
    serde_json::from_str(json).map_err(|e| RunError::ApiParse(e.to_string()))
}
