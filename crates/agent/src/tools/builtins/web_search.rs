//! `web_search`: external vendor search, results formatted as markdown (§4.3).
//!
//! Talks to Exa's search API — `query` is the only required field, results
//! come back as numbered markdown sections (`[n] title` / url / snippet)
//! rather than raw JSON, since that's the shape a model reads best.

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

const SEARCH_URL: &str = "https://api.exa.ai/search";
const SNIPPET_MAX_CHARS: usize = 1500;

pub struct WebSearchTool {
    api_key: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

fn format_results(value: &Value) -> String {
    let results = value
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if results.is_empty() {
        return "No results.".to_string();
    }

    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        let title = r.get("title").and_then(Value::as_str).unwrap_or("(no title)");
        let url = r.get("url").and_then(Value::as_str).unwrap_or("");
        out.push_str(&format!("## [{}] {}\n{}\n\n", i + 1, title, url));

        let snippet = r
            .get("summary")
            .and_then(Value::as_str)
            .or_else(|| r.get("text").and_then(Value::as_str))
            .unwrap_or("");
        if !snippet.is_empty() {
            let trimmed = snippet.trim();
            let excerpt: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
            out.push_str(&excerpt.replace('\n', " "));
            out.push_str("\n\n");
        }
    }
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Search the web for current information. Results are returned as \
                    numbered markdown sections with title, URL, and a snippet."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query." },
                        "max_results": {
                            "type": "integer",
                            "description": "Maximum number of results. Defaults to 10.",
                            "default": 10,
                            "minimum": 1,
                            "maximum": 100
                        },
                        "topic": {
                            "type": "string",
                            "description": "Optional category to focus results, e.g. \"news\"."
                        },
                        "include_raw_content": {
                            "type": "boolean",
                            "description": "Include full page text alongside the summary.",
                            "default": false
                        }
                    },
                    "required": ["query"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("query is required".to_string()))?;
        let max_results = args.get("max_results").and_then(Value::as_u64).unwrap_or(10);
        let topic = args.get("topic").and_then(Value::as_str);
        let include_raw_content = args
            .get("include_raw_content")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        ctx.emit(Event::WebSearchStart {
            query: query.to_string(),
        });

        let mut body = json!({
            "query": query,
            "numResults": max_results.min(100),
            "contents": { "text": { "maxCharacters": if include_raw_content { 10_000 } else { 2_000 } } },
        });
        if let Some(topic) = topic {
            body["category"] = json!(topic);
        }

        let response = self
            .client
            .post(SEARCH_URL)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Other(anyhow::anyhow!("search request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Other(anyhow::anyhow!(
                "search API error {status}: {text}"
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Other(anyhow::anyhow!("invalid search response: {e}")))?;

        let count = value
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        ctx.emit(Event::WebSearchFinish {
            query: query.to_string(),
            count,
        });

        Ok(format_results(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_results_as_numbered_sections() {
        let value = json!({
            "results": [
                { "title": "Rust", "url": "https://rust-lang.org", "summary": "A systems language" }
            ]
        });
        let formatted = format_results(&value);
        assert!(formatted.contains("[1] Rust"));
        assert!(formatted.contains("rust-lang.org"));
        assert!(formatted.contains("systems language"));
    }

    #[test]
    fn empty_results_yield_placeholder() {
        assert_eq!(format_results(&json!({"results": []})), "No results.");
    }
}
