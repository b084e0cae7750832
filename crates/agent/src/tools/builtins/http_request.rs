//! `http_request`: generic HTTP client tool (§4.3).
//!
//! Never throws on a 4xx/5xx response — the status code, headers, and body
//! all reach the model so it can decide how to react, mirroring how a
//! human using curl would see the response either way.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub struct HttpRequestTool {
    client: reqwest::Client,
}

impl HttpRequestTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("agentcore-http-request/0.1")
                .build()
                .expect("reqwest client build"),
        }
    }
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Make an HTTP request. JSON responses are parsed and returned as \
                    structured data; anything else is returned as text. Does not raise an \
                    error on 4xx/5xx responses — the status code is returned for the caller \
                    to inspect."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "url": { "type": "string" },
                        "method": {
                            "type": "string",
                            "description": "HTTP method. Defaults to GET.",
                            "default": "GET"
                        },
                        "headers": {
                            "type": "object",
                            "additionalProperties": { "type": "string" }
                        },
                        "body": { "type": "string" },
                        "params": {
                            "type": "object",
                            "additionalProperties": { "type": "string" },
                            "description": "Query string parameters."
                        },
                        "timeout": {
                            "type": "integer",
                            "description": "Request timeout in milliseconds. Defaults to 10000.",
                            "default": DEFAULT_TIMEOUT_MS
                        }
                    },
                    "required": ["url"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("url is required".to_string()))?;
        let method_str = args
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let method = reqwest::Method::from_str(&method_str)
            .map_err(|_| ToolError::InvalidRequest(format!("invalid method: {method_str}")))?;
        let timeout_ms = args
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        ctx.emit(Event::HttpRequestStart {
            url: url.to_string(),
        });

        let mut builder = self
            .client
            .request(method, url)
            .timeout(Duration::from_millis(timeout_ms));

        if let Some(headers) = args.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    builder = builder.header(key, v);
                }
            }
        }
        if let Some(params) = args.get("params").and_then(Value::as_object) {
            let pairs: Vec<(String, String)> = params
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
            builder = builder.query(&pairs);
        }
        if let Some(body) = args.get("body").and_then(Value::as_str) {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ToolError::Other(anyhow::anyhow!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|e| ToolError::Other(anyhow::anyhow!("read failed: {e}")))?;

        ctx.emit(Event::HttpRequestFinish {
            url: url.to_string(),
            status,
        });

        let body_value = if content_type.contains("json") {
            serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        Ok(serde_json::to_string_pretty(&json!({
            "status": status,
            "body": body_value,
        }))
        .unwrap())
    }
}
