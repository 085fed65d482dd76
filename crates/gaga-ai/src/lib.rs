//! Completion adapters: OpenAI chat completions and Google Gemini.

mod gemini;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_MODEL};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use gaga_core::{
    errors::Error,
    ports::{CompletionClient, CompletionRequest},
    Result,
};

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::External(format!("http client build error: {e}")))
}

/// First 200 chars of an error body, for logs and error messages.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            http: http_client()?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, req: CompletionRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": req.system },
                { "role": "user", "content": req.prompt },
            ],
            "max_tokens": 1000,
            "temperature": 0.7,
        });

        debug!(model = %self.model, "openai chat completion");
        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "openai completion failed: {status} {}",
                snippet(&body)
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("openai json error: {e}")))?;

        let text = v
            .pointer("/choices/0/message/content")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();

        if text.trim().is_empty() {
            return Err(Error::External(
                "openai completion returned empty text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "be brief".to_string(),
            prompt: "What is Rust?".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_chat_request_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "max_tokens": 1000,
                "temperature": 0.7,
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "What is Rust?" },
                ],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "A language." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test")
            .unwrap()
            .with_base_url(server.uri())
            .with_model("gpt-test");
        assert_eq!(client.complete(request()).await.unwrap(), "A language.");
    }

    #[tokio::test]
    async fn http_errors_are_external() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-bad")
            .unwrap()
            .with_base_url(server.uri());
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, Error::External(ref m) if m.contains("401") && m.contains("bad key")));
    }

    #[tokio::test]
    async fn empty_choice_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk")
            .unwrap()
            .with_base_url(server.uri());
        assert!(client.complete(request()).await.is_err());
    }
}
