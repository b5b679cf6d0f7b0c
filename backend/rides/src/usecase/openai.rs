use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::usecase::contracts::AddressResolver;

const ADDRESS_SYSTEM_PROMPT: &str = "You turn informal descriptions of places in India into a precise, \
postal-style address suitable for a map search. Reply with a JSON object of the form \
{\"accurate_address\": \"...\"}. If you cannot tell which place is meant, reply with \
{\"accurate_address\": \"\"}.";

#[derive(Debug, Clone, Serialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

impl OpenAIMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<OpenAIResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChatResponse {
    pub choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAIResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddressAnswer {
    #[serde(default)]
    accurate_address: String,
}

pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(base_url: String, model: String, api_key: String) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow!("failed to create reqwest client: {}", e))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::info!(%base_url, %model, "OpenAI client created");

        Ok(Self {
            http_client,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, request: OpenAIChatRequest) -> anyhow::Result<OpenAIChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(%url, model = %request.model, messages_count = request.messages.len(), "sending chat request to OpenAI");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to send request to OpenAI");
                anyhow!("OpenAI request failed: {}", e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read OpenAI response");
            anyhow!("Failed to read OpenAI response: {}", e)
        })?;

        if !status.is_success() {
            tracing::error!(%status, %body, "OpenAI returned error");
            return Err(anyhow!("OpenAI error ({}): {}", status, body));
        }

        serde_json::from_str::<OpenAIChatResponse>(&body).map_err(|e| {
            tracing::error!(error = %e, %body, "failed to parse OpenAI response");
            anyhow!("Failed to parse OpenAI response: {}", e)
        })
    }
}

impl AddressResolver for OpenAIClient {
    #[tracing::instrument(skip(self, location_description), fields(model = %self.model))]
    async fn resolve_address(&self, location_description: &str) -> anyhow::Result<String> {
        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage::new("system", ADDRESS_SYSTEM_PROMPT),
                OpenAIMessage::new("user", location_description),
            ],
            response_format: Some(OpenAIResponseFormat {
                kind: "json_object".to_string(),
            }),
            temperature: Some(0.0),
        };

        let response = self.chat(request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no content"))?;

        let answer: AddressAnswer = serde_json::from_str(&content).map_err(|e| {
            tracing::warn!(error = %e, %content, "address answer is not the expected JSON");
            anyhow!("Unexpected address answer: {}", e)
        })?;

        tracing::debug!(address = %answer.accurate_address, "address resolved");
        Ok(answer.accurate_address.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    async fn client_for(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new(format!("{}/v1/", server.uri()), "gpt-4o-mini".to_string(), "sk-test".to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_address_reads_accurate_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"accurate_address": "RK Beach Road, Visakhapatnam, Andhra Pradesh 530017"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let address = client
            .resolve_address("the beach road near the submarine museum in vizag")
            .await
            .unwrap();

        assert_eq!(address, "RK Beach Road, Visakhapatnam, Andhra Pradesh 530017");
    }

    #[tokio::test]
    async fn test_resolve_address_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.resolve_address("charminar").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolve_address_rejects_non_json_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Charminar, Hyderabad")))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.resolve_address("charminar").await.is_err());
    }
}
