use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use gaga_core::{
    errors::Error,
    ports::{CompletionClient, CompletionRequest},
    Result,
};

use crate::{http_client, snippet};

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
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
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, req: CompletionRequest) -> Result<String> {
        // Persona goes in as a leading paragraph.
        let body = json!({
            "contents": [{
                "parts": [{ "text": format!("{}\n\n{}", req.system, req.prompt) }]
            }]
        });

        debug!(model = %self.model, "gemini generateContent");
        let resp = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("gemini request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "gemini completion failed: {status} {}",
                snippet(&body)
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("gemini json error: {e}")))?;

        let text = v
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();

        if text.trim().is_empty() {
            return Err(Error::External(
                "gemini completion returned empty text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn posts_to_model_endpoint_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Hello!" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("g-key")
            .unwrap()
            .with_base_url(server.uri())
            .with_model("gemini-test");
        let out = client
            .complete(CompletionRequest {
                system: "persona".to_string(),
                prompt: "hi".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(out, "Hello!");

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "persona\n\nhi");
    }

    #[tokio::test]
    async fn missing_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k").unwrap().with_base_url(server.uri());
        let err = client
            .complete(CompletionRequest {
                system: String::new(),
                prompt: "hi".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }
}
