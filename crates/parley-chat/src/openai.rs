//! OpenAI-compatible Chat Completions client.
//!
//! Works against any endpoint implementing `POST /v1/chat/completions` with
//! the OpenAI request/response shape. The API key is optional so that local
//! model servers can be used.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use parley_core::config::LlmConfig;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

const PROVIDER_NAME: &str = "openai";

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Build a client from config; the key falls back to `OPENAI_API_KEY`.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.resolve_api_key(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/v1/{}", base, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let url = self.api_url("chat/completions");
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatCompletionMessage {
                role: "system",
                content: &request.system_prompt,
            }],
            max_tokens: request.max_tokens,
        };

        tracing::debug!(url = %url, max_tokens = request.max_tokens, "Sending completion request");

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!("{} request failed: {}", PROVIDER_NAME, e);
            LlmError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            tracing::error!("{} response body unreadable: {}", PROVIDER_NAME, e);
            LlmError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("failed to read response body: {}", e),
            }
        })?;

        tracing::debug!(status = %status, "Completion response received");

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => LlmError::AuthFailed {
                    provider: PROVIDER_NAME.to_string(),
                },
                429 => LlmError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                },
                _ => LlmError::RequestFailed {
                    provider: PROVIDER_NAME.to_string(),
                    reason: format!("HTTP {}: {}", status, response_text),
                },
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: "No choices in response".to_string(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> OpenAiClient {
        let config = LlmConfig {
            base_url: server.url(),
            model: "test-model".to_string(),
            api_key: api_key.map(str::to_string),
            ..LlmConfig::default()
        };
        let mut client = OpenAiClient::new(&config);
        // Keep the environment out of tests that expect no key.
        client.api_key = api_key.map(str::to_string);
        client
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are a test.".to_string(),
            max_tokens: 50,
        }
    }

    #[test]
    fn test_api_url_trims_slashes() {
        let config = LlmConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::new(&config);
        assert_eq!(
            client.api_url("/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_complete_sends_single_system_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "messages": [{"role": "system", "content": "You are a test."}],
                "max_tokens": 50
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"x","choices":[{"message":{"role":"assistant","content":"lrange chat_history:alice 0 -1"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let text = client.complete(request()).await.unwrap();
        assert_eq!(text, "lrange chat_history:alice 0 -1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_without_key_sends_no_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"None"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        assert_eq!(client.complete(request()).await.unwrap(), "None");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_maps_401_to_auth_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client_for(&server, Some("bad")).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[tokio::test]
    async fn test_complete_maps_429_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let err = client_for(&server, None).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_complete_maps_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client_for(&server, None).complete(request()).await.unwrap_err();
        match err {
            LlmError::RequestFailed { reason, .. } => assert!(reason.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server, None).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client_for(&server, None).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_complete_maps_truncated_body_to_request_failed() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promise 100 bytes of body, send a few, then hang up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let has_headers = request.windows(4).any(|w| w == b"\r\n\r\n");
                if has_headers && request.ends_with(b"}") {
                    break;
                }
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"choices\"",
                )
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let config = LlmConfig {
            base_url: format!("http://{}", addr),
            ..LlmConfig::default()
        };
        let mut client = OpenAiClient::new(&config);
        client.api_key = None;

        let err = client.complete(request()).await.unwrap_err();
        match err {
            LlmError::RequestFailed { reason, .. } => {
                assert!(reason.contains("response body"), "reason: {reason}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_model_name() {
        let client = OpenAiClient::new(&LlmConfig::default());
        assert_eq!(client.model_name(), "gpt-3.5-turbo-0125");
    }
}
