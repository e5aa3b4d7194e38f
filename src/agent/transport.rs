//! Decision transport
//!
//! One logical call per decision: send the conversation window, receive the
//! reply text. Retries are the transport's business; the arena treats any
//! error as terminal for that tick.

use std::future::Future;

use serde_json::{Value, json};

use super::conversation::Turn;
use crate::config::{AgentEndpoint, ProxyConfig};
use crate::error::TransportError;

/// Characters of an error body kept in `TransportError::Status`
const ERROR_BODY_CHARS: usize = 150;

/// Everything needed for one decision round trip
#[derive(Debug, Clone, Default)]
pub struct DecisionRequest {
    pub endpoint: AgentEndpoint,
    pub turns: Vec<Turn>,
}

/// Sends a conversation window and returns the reply text
pub trait Transport: Send + Sync + 'static {
    fn complete(&self, request: DecisionRequest) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Request/response layout, chosen by sniffing the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// Single string `input`, reply under `output`
    Responses,
    /// Multi-turn `messages`, reply under `choices`
    Chat,
}

impl WireShape {
    pub fn detect(path: &str) -> Self {
        if path.contains("/responses") {
            WireShape::Responses
        } else {
            WireShape::Chat
        }
    }

    /// JSON body for this shape
    pub fn payload(self, model: &str, turns: &[Turn]) -> Value {
        match self {
            WireShape::Responses => {
                let input = turns
                    .iter()
                    .map(|t| t.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                json!({ "model": model, "input": input })
            }
            WireShape::Chat => json!({ "model": model, "messages": turns }),
        }
    }

    /// Reply text from a decoded body; empty when the expected field is absent
    pub fn extract(self, body: &Value) -> String {
        let text = match self {
            WireShape::Responses => body
                .pointer("/output/0/content/0/text")
                .and_then(Value::as_str)
                .or_else(|| body.get("output_text").and_then(Value::as_str)),
            WireShape::Chat => body.pointer("/choices/0/message/content").and_then(Value::as_str),
        };
        text.unwrap_or_default().to_string()
    }
}

/// HTTP transport over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(proxy: &ProxyConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(url) = proxy.active_url() {
            log::info!("Routing agent requests through proxy {url}");
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    fn complete(&self, request: DecisionRequest) -> impl Future<Output = Result<String, TransportError>> + Send {
        let client = self.client.clone();
        async move {
            let endpoint = request.endpoint.trimmed();
            let shape = WireShape::detect(&endpoint.path);
            let payload = shape.payload(&endpoint.model, &request.turns);

            let response = client
                .post(endpoint.url())
                .bearer_auth(&endpoint.api_key)
                .json(&payload)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(ERROR_BODY_CHARS).collect(),
                });
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))?;
            Ok(shape.extract(&body))
        }
    }
}
