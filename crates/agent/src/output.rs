//! Structured output (§4.8, §6.3 `OutputSchema`): a JSON Schema the agent's
//! final assistant message must satisfy.
//!
//! The model client this core drives is treated as opaque (§6.1) and has no
//! schema-aware generation mode of its own (see `ChatProvider::chat_with_instructions`
//! in the `model` crate), so validation happens here: the final message's
//! text is parsed as JSON and checked against `schema` with a minimal
//! structural validator — enough to catch a missing required property or a
//! wrong top-level type, not a full JSON Schema implementation.

use serde_json::Value;

/// `{schema, description?}` from §3/§6.5 — the value the final assistant
/// message must produce when an agent is configured for structured output.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub schema: Value,
    pub description: Option<String>,
}

impl OutputSchema {
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Pull the last JSON value out of `text`: a fenced ` ```json ` block if
/// present, else the whole trimmed string parsed as JSON.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(start) = text.rfind("```json") {
        let after = &text[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str(after[..end].trim()) {
                return Some(value);
            }
        }
    }
    serde_json::from_str(text.trim()).ok()
}

/// Structural validator (glossary): a narrow check that a `Value` is
/// shaped like `schema` demands — object `required`/`properties` presence
/// and the handful of primitive `type` names a JSON Schema document names.
/// Does not cover `$ref`, combinators, or numeric bounds.
pub fn validate(schema: &Value, value: &Value) -> Result<(), String> {
    validate_at("$", schema, value)
}

fn validate_at(path: &str, schema: &Value, value: &Value) -> Result<(), String> {
    let Some(schema_type) = schema.get("type").and_then(Value::as_str) else {
        return Ok(());
    };
    match schema_type {
        "object" => {
            let Value::Object(obj) = value else {
                return Err(format!("{path}: expected object, got {value}"));
            };
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for key in required {
                    let Some(key) = key.as_str() else { continue };
                    if !obj.contains_key(key) {
                        return Err(format!("{path}: missing required property `{key}`"));
                    }
                }
            }
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, sub_schema) in properties {
                    if let Some(sub_value) = obj.get(key) {
                        validate_at(&format!("{path}.{key}"), sub_schema, sub_value)?;
                    }
                }
            }
            Ok(())
        }
        "array" => {
            let Value::Array(items) = value else {
                return Err(format!("{path}: expected array, got {value}"));
            };
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_at(&format!("{path}[{i}]"), item_schema, item)?;
                }
            }
            Ok(())
        }
        "string" => {
            if value.is_string() {
                Ok(())
            } else {
                Err(format!("{path}: expected string, got {value}"))
            }
        }
        "number" | "integer" => {
            if value.is_number() {
                Ok(())
            } else {
                Err(format!("{path}: expected number, got {value}"))
            }
        }
        "boolean" => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(format!("{path}: expected boolean, got {value}"))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\n";
        assert_eq!(extract_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn extracts_bare_json() {
        assert_eq!(extract_json("{\"a\": 1}"), Some(json!({"a": 1})));
    }

    #[test]
    fn non_json_text_extracts_nothing() {
        assert_eq!(extract_json("just some text"), None);
    }

    #[test]
    fn validates_required_properties() {
        let schema = json!({
            "type": "object",
            "properties": {"sentiment": {"type": "string"}, "score": {"type": "number"}},
            "required": ["sentiment", "score"],
        });
        assert!(validate(&schema, &json!({"sentiment": "positive", "score": 0.9})).is_ok());
        assert!(validate(&schema, &json!({"sentiment": "positive"})).is_err());
    }

    #[test]
    fn validates_type_mismatch() {
        let schema = json!({"type": "object", "properties": {"score": {"type": "number"}}});
        assert!(validate(&schema, &json!({"score": "not a number"})).is_err());
    }
}
