//! JSON-RPC `message/send` transport for agent-to-agent exchanges.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{Counterparty, CounterpartyReply};
use crate::error::{ConfigError, ExchangeError};

/// Default timeout for one exchange. The counterparty runs an LLM call and a
/// scored submission before replying.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(600);

const SEND_METHOD: &str = "message/send";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: SendParams<'a>,
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    message: OutgoingMessage<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingMessage<'a> {
    kind: &'static str,
    role: &'static str,
    message_id: String,
    parts: Vec<TextPart<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Counterparty client speaking JSON-RPC 2.0 over HTTP.
pub struct A2aClient {
    http_client: Client,
}

impl A2aClient {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http_client })
    }
}

fn build_request<'a>(text: &'a str, context_id: Option<&'a str>) -> JsonRpcRequest<'a> {
    JsonRpcRequest {
        jsonrpc: "2.0",
        id: Uuid::new_v4().to_string(),
        method: SEND_METHOD,
        params: SendParams {
            message: OutgoingMessage {
                kind: "message",
                role: "user",
                message_id: Uuid::new_v4().simple().to_string(),
                parts: vec![TextPart { kind: "text", text }],
                context_id,
            },
        },
    }
}

/// Reads a reply out of a JSON-RPC response. The result must be a message.
fn parse_reply(response: JsonRpcResponse) -> Result<CounterpartyReply, ExchangeError> {
    if let Some(error) = response.error {
        return Err(ExchangeError::Remote {
            code: error.code,
            message: error.message,
        });
    }
    let result = response
        .result
        .ok_or_else(|| ExchangeError::MalformedResponse("response has neither result nor error".to_string()))?;

    match result.get("kind").and_then(Value::as_str) {
        Some("message") => {}
        other => {
            return Err(ExchangeError::MalformedResponse(format!(
                "expected a message result, got kind {}",
                other.unwrap_or("<missing>")
            )))
        }
    }

    let text = result
        .get("parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|part| part.get("kind").and_then(Value::as_str) == Some("text"))
        .find_map(|part| part.get("text").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    let context_id = result
        .get("contextId")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(CounterpartyReply { text, context_id })
}

#[async_trait]
impl Counterparty for A2aClient {
    async fn send(
        &self,
        endpoint: &str,
        text: &str,
        context_id: Option<&str>,
    ) -> Result<CounterpartyReply, ExchangeError> {
        let request = build_request(text, context_id);
        debug!(endpoint = %endpoint, request_id = %request.id, "Sending message");

        let response = self
            .http_client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))?;
        parse_reply(response)
    }
}
