//! OpenAI-compatible chat completion client

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::config::LlmConfig;
use crate::errors::GrainwiseError;
use crate::llm::CompletionProvider;
use crate::llm::TokenStream;
use crate::models::ChatMessage;
use crate::models::Role;
use crate::Result;

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct CompletionClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl CompletionClient {
    /// Create a new completion client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(endpoint: String, model: String, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GrainwiseError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            model,
            api_key,
            client,
        })
    }

    /// Create from application configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        builder
    }

    fn build_messages<'a>(
        system_prompt: &'a str,
        messages: &'a [ChatMessage],
    ) -> Vec<WireMessage<'a>> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(WireMessage {
            role: "system",
            content: system_prompt,
        });
        for message in messages {
            wire.push(WireMessage {
                role: match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &message.content,
            });
        }
        wire
    }

    async fn map_error_response(response: reqwest::Response) -> GrainwiseError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        // A rejected credential means answers are impossible, not transient
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            GrainwiseError::Configuration(format!("completion API rejected credentials: {status}"))
        } else {
            GrainwiseError::Http(format!("completion API error ({status}): {error_text}"))
        }
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling completion API: {}", url);

        let request = CompletionRequest {
            model: &self.model,
            temperature,
            stream: false,
            messages: Self::build_messages(system_prompt, messages),
        };

        let response = self
            .request_builder(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GrainwiseError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::map_error_response(response).await);
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GrainwiseError::Http(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GrainwiseError::Http("No choices in completion response".to_string()))
    }

    async fn complete_streaming(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<TokenStream> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling streaming completion API: {}", url);

        let request = CompletionRequest {
            model: &self.model,
            temperature,
            stream: true,
            messages: Self::build_messages(system_prompt, messages),
        };

        let response = self
            .request_builder(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GrainwiseError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::map_error_response(response).await);
        }

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(32);

        // The forwarding task ends when the SSE stream finishes or the
        // receiver is dropped; dropping the response aborts the in-flight
        // provider request.
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(GrainwiseError::Streaming(e.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find("\n\n") {
                    let event: String = buffer.drain(..pos + 2).collect();
                    for line in event.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        if data.trim() == "[DONE]" {
                            return;
                        }
                        match serde_json::from_str::<StreamChunk>(data) {
                            Ok(parsed) => {
                                let delta = parsed
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.delta.content)
                                    .unwrap_or_default();
                                if !delta.is_empty() && tx.send(Ok(delta)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                let _ = tx
                                    .send(Err(GrainwiseError::Streaming(format!(
                                        "malformed stream chunk: {e}"
                                    ))))
                                    .await;
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages_prepend_system() {
        let messages = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let wire = CompletionClient::build_messages("persona", &messages);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
    }

    #[test]
    fn test_stream_chunk_parses_delta() {
        let raw = r#"{"choices":[{"delta":{"content":"mor"}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(raw).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("mor"));
    }

    #[test]
    fn test_stream_chunk_tolerates_empty_delta() {
        let raw = r#"{"choices":[{"delta":{}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(raw).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }
}
