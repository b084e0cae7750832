//! `fetch_url`: fetch a page and convert its HTML body to markdown (§4.3).
//!
//! Falls back to the raw response text when the body isn't HTML, or when
//! markdown conversion fails — a tool result is always produced, never a
//! hard error, so the model can decide whether the content was useful.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub struct FetchUrlTool {
    client: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("agentcore-fetch-url/0.1")
                .build()
                .expect("reqwest client build"),
        }
    }
}

impl Default for FetchUrlTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Fetch a URL and convert its HTML body to markdown. Falls back to \
                    raw text if the body isn't HTML."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "description": "URL to fetch." },
                        "timeout": {
                            "type": "integer",
                            "description": "Request timeout in milliseconds. Defaults to 10000.",
                            "default": DEFAULT_TIMEOUT_MS
                        },
                        "extract_article": {
                            "type": "boolean",
                            "description": "Attempt to extract the main article content instead of the full page.",
                            "default": false
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
        let timeout_ms = args
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let extract_article = args
            .get("extract_article")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        ctx.emit(Event::FetchUrlStart {
            url: url.to_string(),
        });

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| ToolError::Other(anyhow::anyhow!("request failed: {e}")))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Other(anyhow::anyhow!("read failed: {e}")))?;

        let is_html = content_type.contains("html") || body.trim_start().starts_with("<");
        let markdown = if is_html {
            fast_html2md::parse_html(&body, true)
        } else {
            body.clone()
        };
        // `extract_article` narrows to the first large block of converted text;
        // without a dedicated readability pass this is a best-effort heuristic,
        // not full boilerplate stripping.
        let content = if extract_article {
            markdown
                .split("\n\n")
                .max_by_key(|block| block.len())
                .unwrap_or(&markdown)
                .to_string()
        } else {
            markdown
        };

        let truncated = content.len() > 65_536;
        let content = if truncated {
            content.chars().take(65_536).collect::<String>()
        } else {
            content
        };

        ctx.emit(Event::FetchUrlFinish {
            url: url.to_string(),
            truncated,
        });

        Ok(serde_json::to_string_pretty(&json!({
            "status": status.as_u16(),
            "truncated": truncated,
            "content": content,
        }))
        .unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_detection_recognizes_tag_prefixed_bodies() {
        let body = "<html><body>hi</body></html>";
        assert!(body.trim_start().starts_with("<"));
    }
}
