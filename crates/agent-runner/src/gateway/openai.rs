//! OpenAI chat-completions gateway

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, GatewayError, ModelGateway};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for [`OpenAiGateway`]
#[derive(Debug)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Fallback key used when a run carries no credential of its own
    pub api_key: Option<SecretString>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

impl OpenAiConfig {
    /// Read `PSSCRIPT_GATEWAY_URL` and `OPENAI_API_KEY`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PSSCRIPT_GATEWAY_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionResponse {
    fn into_reply(self) -> Result<String, GatewayError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("response has no message content".into()))
    }
}

/// Gateway speaking the OpenAI chat-completions protocol
pub struct OpenAiGateway {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        credential: Option<&SecretString>,
    ) -> Result<String, GatewayError> {
        let key = credential
            .or(self.config.api_key.as_ref())
            .ok_or(GatewayError::MissingCredential)?;

        let request = CompletionRequest {
            model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("Requesting completion from {} with {} messages", model, messages.len());

        let res = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Http { status, body });
        }

        let response: CompletionResponse = res
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        response.into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        let config = OpenAiConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..OpenAiConfig::default()
        };
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(
            OpenAiConfig::default().completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            ChatMessage::system("You are a PowerShell expert."),
            ChatMessage::user("Get-Process?"),
        ];
        let request = CompletionRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 4000,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["max_tokens"], 4000);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Get-Process?");
    }

    #[test]
    fn test_reply_from_first_choice() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Use Get-Service." } }
            ]
        }))
        .unwrap();
        assert_eq!(response.into_reply().unwrap(), "Use Get-Service.");
    }

    #[test]
    fn test_reply_without_content_is_invalid() {
        let empty: CompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(empty.into_reply(), Err(GatewayError::InvalidResponse(_))));

        let null: CompletionResponse = serde_json::from_value(json!({
            "choices": [ { "message": { "role": "assistant", "content": null } } ]
        }))
        .unwrap();
        assert!(matches!(null.into_reply(), Err(GatewayError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_request() {
        let gateway = OpenAiGateway::new(OpenAiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..OpenAiConfig::default()
        });

        let result = gateway
            .complete("gpt-4o", &[ChatMessage::user("hi")], None)
            .await;
        assert!(matches!(result, Err(GatewayError::MissingCredential)));
    }
}
