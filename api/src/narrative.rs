//! Narrative Generator adapter.
//!
//! One single-shot text completion per analysis: system instructions plus
//! user context in, free text out. The HTTP client is built once; the
//! credential, model and endpoint are read from the environment on every
//! call, so a missing key only fails the call that needs it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const MODEL_ENV: &str = "BENTO_NARRATIVE_MODEL";
const BASE_URL_ENV: &str = "BENTO_NARRATIVE_BASE_URL";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingCredential,
    #[error("narrative HTTP client is unavailable: {0}")]
    ClientUnavailable(String),
    #[error("request to narrative backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("narrative backend returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("narrative backend response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("narrative backend returned no text")]
    EmptyContent,
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, instructions: &str, context: &str) -> Result<String, NarrativeError>;

    /// Model name for log lines.
    fn model(&self) -> String {
        "unspecified".to_string()
    }
}

/// Per-call settings, resolved lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NarrativeSettings {
    api_key: String,
    model: String,
    base_url: String,
}

impl NarrativeSettings {
    fn from_env() -> Result<Self, NarrativeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NarrativeError> {
        let api_key = non_blank(&lookup, API_KEY_ENV).ok_or(NarrativeError::MissingCredential)?;
        Ok(Self {
            api_key,
            model: model_from(&lookup),
            base_url: non_blank(&lookup, BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url.trim_end_matches('/'))
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn model_from(lookup: &impl Fn(&str) -> Option<String>) -> String {
    non_blank(lookup, MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<ResponsesOutputItem>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: Vec<ResponsesContent>,
}

#[derive(Debug, Deserialize)]
struct ResponsesContent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ResponsesResponse {
    /// Prefer the aggregated `output_text`; otherwise join the text parts of
    /// every message item.
    fn into_text(self) -> Option<String> {
        if let Some(text) = self.output_text.filter(|t| !t.trim().is_empty()) {
            return Some(text);
        }

        let joined = self
            .output
            .into_iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n");

        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

fn upstream_error(status: reqwest::StatusCode, body: &str) -> NarrativeError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    NarrativeError::Upstream {
        status: status.as_u16(),
        message,
    }
}

/// Client for the OpenAI Responses API.
pub struct OpenAiNarrativeClient {
    client: Result<reqwest::Client, String>,
}

impl OpenAiNarrativeClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to build narrative HTTP client");
                e.to_string()
            });
        Self { client }
    }
}

#[async_trait]
impl NarrativeGenerator for OpenAiNarrativeClient {
    async fn generate(&self, instructions: &str, context: &str) -> Result<String, NarrativeError> {
        let settings = NarrativeSettings::from_env()?;
        let client = self
            .client
            .as_ref()
            .map_err(|reason| NarrativeError::ClientUnavailable(reason.clone()))?;

        tracing::debug!(
            model = %settings.model,
            instructions_len = instructions.len(),
            context_len = context.len(),
            "Requesting narrative"
        );

        let response = client
            .post(settings.responses_url())
            .bearer_auth(&settings.api_key)
            .json(&ResponsesRequest {
                model: &settings.model,
                instructions,
                input: context,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(upstream_error(status, &body));
        }

        serde_json::from_str::<ResponsesResponse>(&body)?
            .into_text()
            .ok_or(NarrativeError::EmptyContent)
    }

    fn model(&self) -> String {
        model_from(&|key: &str| std::env::var(key).ok())
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn settings_require_a_credential() {
        let err = NarrativeSettings::from_lookup(lookup_from(&[(API_KEY_ENV, "   ")]))
            .expect_err("blank key must be rejected");
        assert!(matches!(err, NarrativeError::MissingCredential));
    }

    #[test]
    fn settings_apply_defaults_and_overrides() {
        let settings = NarrativeSettings::from_lookup(lookup_from(&[(API_KEY_ENV, "sk-test")]))
            .expect("key is present");
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.responses_url(), "https://api.openai.com/v1/responses");

        let settings = NarrativeSettings::from_lookup(lookup_from(&[
            (API_KEY_ENV, "sk-test"),
            (MODEL_ENV, "gpt-4.1-mini"),
            (BASE_URL_ENV, "http://localhost:8080/v1/"),
        ]))
        .expect("key is present");
        assert_eq!(settings.model, "gpt-4.1-mini");
        assert_eq!(settings.responses_url(), "http://localhost:8080/v1/responses");
    }

    #[test]
    fn model_name_does_not_need_a_credential() {
        assert_eq!(model_from(&lookup_from(&[])), DEFAULT_MODEL);
        assert_eq!(model_from(&lookup_from(&[(MODEL_ENV, " gpt-4.1-mini ")])), "gpt-4.1-mini");
        assert_eq!(stubs::FailingNarrative.model(), "unspecified");
    }

    #[test]
    fn output_text_is_preferred() {
        let response: ResponsesResponse =
            serde_json::from_str(r#"{"output_text": "今天不錯", "output": []}"#).expect("valid json");
        assert_eq!(response.into_text().as_deref(), Some("今天不錯"));
    }

    #[test]
    fn message_parts_are_joined_when_output_text_is_absent() {
        let response: ResponsesResponse = serde_json::from_str(
            r#"{
                "output": [
                    {"type": "reasoning", "content": [{"type": "output_text", "text": "hidden"}]},
                    {"type": "message", "content": [
                        {"type": "output_text", "text": "第一段"},
                        {"type": "refusal", "text": "no"},
                        {"type": "output_text", "text": "第二段"}
                    ]}
                ]
            }"#,
        )
        .expect("valid json");
        assert_eq!(response.into_text().as_deref(), Some("第一段\n第二段"));
    }

    #[test]
    fn blank_output_yields_no_text() {
        let response: ResponsesResponse =
            serde_json::from_str(r#"{"output_text": "  ", "output": []}"#).expect("valid json");
        assert_eq!(response.into_text(), None);
    }

    #[test]
    fn upstream_error_prefers_structured_message() {
        let err = upstream_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "Incorrect API key provided"}}"#,
        );
        match err {
            NarrativeError::Upstream { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error variant: {:?}", other),
        }

        let err = upstream_error(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn construction_does_not_need_credentials() {
        let client = OpenAiNarrativeClient::new();
        assert!(client.client.is_ok());
    }
}
