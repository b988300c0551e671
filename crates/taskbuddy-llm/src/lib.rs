//! Blocking client for OpenAI-compatible chat-completions endpoints,
//! with tool (function calling) support and bounded retry on transient
//! failures.

use anyhow::{Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use serde_json::{Value, json};
use std::thread;
use std::time::Duration;
use taskbuddy_core::{ChatMessage, ChatRequest, LlmConfig, LlmResponse, LlmToolCall};

/// Base delay for network/transport error retries (1s, 2s, 4s backoff).
const NETWORK_RETRY_BASE_MS: u64 = 1000;

pub trait LlmClient {
    /// Chat completion with tool definitions. Sends a multi-turn
    /// conversation with tool schemas and returns the response.
    fn complete_chat(&self, req: &ChatRequest) -> Result<LlmResponse>;
}

#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    cfg: LlmConfig,
    client: Client,
}

impl ChatCompletionsClient {
    pub fn new(cfg: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        Ok(Self { cfg, client })
    }

    fn complete_chat_inner(&self, req: &ChatRequest, api_key: &str) -> Result<LlmResponse> {
        let mut payload = build_chat_payload(req);
        // Requests without an explicit temperature use the configured one.
        if req.temperature.is_none() {
            payload["temperature"] = json!(self.cfg.temperature);
        }

        let mut last_err: Option<anyhow::Error> = None;
        let mut attempt: u8 = 0;
        while attempt <= self.cfg.max_retries {
            let response = self
                .client
                .post(&self.cfg.endpoint)
                .bearer_auth(api_key)
                .json(&payload)
                .send();

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let retry_after = parse_retry_after_seconds(resp.headers().get(RETRY_AFTER));
                    let body = resp.text()?;
                    if status.is_success() {
                        return parse_chat_payload(&body);
                    }
                    last_err = Some(format_api_error(status, &body));
                    if should_retry_status(status) && attempt < self.cfg.max_retries {
                        thread::sleep(retry_delay(self.cfg.retry_base_ms, attempt, retry_after));
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                    break;
                }
                Err(e) => {
                    last_err = Some(anyhow!("chat request transport error: {e}"));
                    if should_retry_transport_error(&e) && attempt < self.cfg.max_retries {
                        thread::sleep(retry_delay(NETWORK_RETRY_BASE_MS, attempt, None));
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                    break;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("chat request failed without detailed error")))
    }
}

impl LlmClient for ChatCompletionsClient {
    fn complete_chat(&self, req: &ChatRequest) -> Result<LlmResponse> {
        let api_key = self.cfg.resolve_api_key().ok_or_else(|| {
            anyhow!(
                "missing API key: set llm.api_key in settings or the {} environment variable",
                self.cfg.api_key_env
            )
        })?;
        self.complete_chat_inner(req, &api_key)
    }
}

fn build_chat_payload(req: &ChatRequest) -> Value {
    let messages: Vec<Value> = req
        .messages
        .iter()
        .map(|m| match m {
            ChatMessage::System { content } => json!({"role": "system", "content": content}),
            ChatMessage::User { content } => json!({"role": "user", "content": content}),
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut msg = json!({"role": "assistant"});
                if let Some(c) = content {
                    msg["content"] = json!(c);
                }
                if !tool_calls.is_empty() {
                    let tc: Vec<Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments
                                }
                            })
                        })
                        .collect();
                    msg["tool_calls"] = json!(tc);
                }
                msg
            }
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => json!({"role": "tool", "tool_call_id": tool_call_id, "content": content}),
        })
        .collect();

    let mut payload = json!({
        "model": req.model,
        "messages": messages,
        "max_tokens": req.max_tokens,
        "stream": false
    });
    if let Some(temp) = req.temperature {
        payload["temperature"] = json!(temp);
    }
    if !req.tools.is_empty() {
        payload["tools"] = serde_json::to_value(&req.tools).unwrap_or(json!([]));
        payload["tool_choice"] = serde_json::to_value(&req.tool_choice).unwrap_or(json!("auto"));
    }
    payload
}

fn parse_chat_payload(body: &str) -> Result<LlmResponse> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| anyhow!("malformed chat response: {e}"))?;
    let choice = value
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| anyhow!("chat response has no choices"))?;
    let message = choice
        .get("message")
        .ok_or_else(|| anyhow!("chat response choice has no message"))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("stop")
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            let function = call.get("function").unwrap_or(&Value::Null);
            tool_calls.push(LlmToolCall {
                id: call
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name: function
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                arguments: function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("{}")
                    .to_string(),
            });
        }
    }

    Ok(LlmResponse {
        text,
        finish_reason,
        tool_calls,
    })
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn should_retry_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn parse_retry_after_seconds(header: Option<&HeaderValue>) -> Option<u64> {
    header?.to_str().ok()?.trim().parse::<u64>().ok()
}

fn retry_delay(base_ms: u64, attempt: u8, retry_after_seconds: Option<u64>) -> Duration {
    if let Some(seconds) = retry_after_seconds {
        return Duration::from_secs(seconds);
    }
    Duration::from_millis(base_ms.saturating_mul(1_u64 << attempt.min(6)))
}

fn format_api_error(status: StatusCode, body: &str) -> anyhow::Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    anyhow!("chat API error {status}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use taskbuddy_core::{ToolChoice, ToolDefinition};

    fn sample_request(tools: Vec<ToolDefinition>) -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![
                ChatMessage::System {
                    content: "be helpful".to_string(),
                },
                ChatMessage::User {
                    content: "add milk to my list".to_string(),
                },
            ],
            tools,
            tool_choice: ToolChoice::auto(),
            max_tokens: 512,
            temperature: None,
        }
    }

    fn sample_tool() -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: taskbuddy_core::FunctionDefinition {
                name: "todo_create".to_string(),
                description: "Creates a new todo item".to_string(),
                parameters: json!({"type": "object", "properties": {"title": {"type": "string"}}}),
            },
        }
    }

    #[test]
    fn payload_omits_temperature_and_tools_when_unset() {
        let payload = build_chat_payload(&sample_request(vec![]));
        assert_eq!(payload["model"], "test-model");
        assert!(payload.get("temperature").is_none());
        assert!(payload.get("tools").is_none());
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["role"], "user");
    }

    #[test]
    fn payload_carries_tool_schemas() {
        let mut req = sample_request(vec![sample_tool()]);
        // Exactly representable in f32, so the f64 widening in JSON is lossless.
        req.temperature = Some(0.5);
        let payload = build_chat_payload(&req);
        assert_eq!(payload["tools"][0]["function"]["name"], "todo_create");
        assert_eq!(payload["tool_choice"], "auto");
        assert_eq!(payload["temperature"], 0.5);
    }

    #[test]
    fn assistant_tool_calls_serialize_nested() {
        let req = ChatRequest {
            messages: vec![
                ChatMessage::Assistant {
                    content: None,
                    tool_calls: vec![LlmToolCall {
                        id: "call_1".to_string(),
                        name: "todo_fetch_all".to_string(),
                        arguments: "{}".to_string(),
                    }],
                },
                ChatMessage::Tool {
                    tool_call_id: "call_1".to_string(),
                    content: "[]".to_string(),
                },
            ],
            ..sample_request(vec![])
        };
        let payload = build_chat_payload(&req);
        assert_eq!(
            payload["messages"][0]["tool_calls"][0]["function"]["name"],
            "todo_fetch_all"
        );
        assert_eq!(payload["messages"][1]["role"], "tool");
        assert_eq!(payload["messages"][1]["tool_call_id"], "call_1");
    }

    #[test]
    fn parse_text_response() {
        let body = r#"{"choices":[{"finish_reason":"stop","message":{"content":"Done!"}}]}"#;
        let resp = parse_chat_payload(body).expect("parse");
        assert_eq!(resp.text, "Done!");
        assert_eq!(resp.finish_reason, "stop");
        assert!(resp.tool_calls.is_empty());
    }

    #[test]
    fn parse_tool_call_response() {
        let body = r#"{
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_7",
                        "type": "function",
                        "function": {"name": "todo_create", "arguments": "{\"title\":\"Buy milk\"}"}
                    }]
                }
            }]
        }"#;
        let resp = parse_chat_payload(body).expect("parse");
        assert!(resp.text.is_empty());
        assert_eq!(resp.finish_reason, "tool_calls");
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "todo_create");
        assert!(resp.tool_calls[0].arguments.contains("Buy milk"));
    }

    #[test]
    fn parse_rejects_bodies_without_choices() {
        assert!(parse_chat_payload("{}").is_err());
        assert!(parse_chat_payload("not json").is_err());
    }

    #[test]
    fn retry_policy_targets_transient_statuses() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(should_retry_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!should_retry_status(StatusCode::BAD_REQUEST));
        assert!(!should_retry_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn retry_delay_backs_off_and_honors_retry_after() {
        assert_eq!(retry_delay(400, 0, None), Duration::from_millis(400));
        assert_eq!(retry_delay(400, 1, None), Duration::from_millis(800));
        assert_eq!(retry_delay(400, 2, None), Duration::from_millis(1600));
        assert_eq!(retry_delay(400, 2, Some(7)), Duration::from_secs(7));
    }

    #[test]
    fn complete_chat_round_trips_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = vec![0_u8; 65536];
            let n = stream.read(&mut buf).expect("read request");
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let body =
                r#"{"choices":[{"finish_reason":"stop","message":{"content":"All set."}}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).expect("write response");
            request
        });

        let cfg = LlmConfig {
            endpoint: format!("http://{addr}/chat/completions"),
            api_key: Some("test-key".to_string()),
            max_retries: 0,
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::new(cfg).expect("client");
        let resp = client
            .complete_chat(&sample_request(vec![sample_tool()]))
            .expect("complete");
        assert_eq!(resp.text, "All set.");

        let request = server.join().expect("join server");
        assert!(request.contains("POST /chat/completions"));
        assert!(request.contains("Bearer test-key"));
    }
}
