//! Structured (JSON) text generation.
//!
//! The schema is rendered into the prompt, the provider is asked for JSON,
//! and the reply must parse with the schema's top-level shape. A reply that
//! does not is a [`MalformedResponse`](ProviderError::MalformedResponse)
//! from that provider and moves the chain on to the fallback.

use serde_json::Value;
use tracing::instrument;

use super::TextManager;
use crate::Result;
use crate::error::{ProviderError, ProviderResult};
use crate::types::{GenerationOptions, ResponseFormat};

/// Top-level JSON shape a schema asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Array,
    Any,
}

impl Shape {
    fn of_schema(schema: &Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("object") => Self::Object,
            Some("array") => Self::Array,
            Some(_) => Self::Any,
            None if schema.get("properties").is_some() => Self::Object,
            None => Self::Any,
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Object => "a JSON object",
            Self::Array => "a JSON array",
            Self::Any => "a JSON value",
        }
    }
}

impl TextManager {
    /// Generate a JSON document conforming to `schema`'s top-level shape.
    ///
    /// `options.response_format` is forced to [`ResponseFormat::Json`]. The
    /// parse runs after each successful provider call; a failure there is
    /// not retried but falls back like any other terminal error. Cached
    /// replies are re-validated before use.
    #[instrument(skip(self, payload, schema, options), fields(modality = "text", operation = "generate_structured"))]
    pub async fn generate_structured(
        &self,
        payload: &str,
        schema: &Value,
        options: &GenerationOptions,
    ) -> Result<Value> {
        let prompt = render_prompt(payload, schema);
        let options = options.clone().response_format(ResponseFormat::Json);
        let shape = Shape::of_schema(schema);

        let (_, value) = self
            .run(&prompt, &options, "generate_structured", |content: &String| {
                parse_structured(content, shape)
            })
            .await?;
        Ok(value)
    }
}

/// Append the schema rendering and the JSON-only instruction to `payload`.
fn render_prompt(payload: &str, schema: &Value) -> String {
    let shape = Shape::of_schema(schema);
    let mut prompt = String::with_capacity(payload.len() + 512);
    prompt.push_str(payload.trim_end());
    prompt.push_str("\n\nRespond with ");
    prompt.push_str(shape.describe());
    prompt.push_str(" only. Do not include explanations, markdown, or any text outside the JSON.\n");

    let fields = describe_fields(schema);
    if !fields.is_empty() {
        prompt.push_str("\nFields:\n");
        prompt.push_str(&fields);
    }

    prompt.push_str("\nJSON schema:\n");
    prompt.push_str(&serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string()));
    prompt.push('\n');
    prompt
}

/// One line per property: `- name (type, required): description`.
fn describe_fields(schema: &Value) -> String {
    // Arrays describe their items' properties.
    let object = match Shape::of_schema(schema) {
        Shape::Array => schema.get("items").unwrap_or(schema),
        _ => schema,
    };
    let Some(properties) = object.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    let required: Vec<&str> = object
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut out = String::new();
    for (name, property) in properties {
        let kind = type_name(property);
        out.push_str(&format!("- {name} ({kind}"));
        if required.contains(&name.as_str()) {
            out.push_str(", required");
        }
        out.push(')');
        if let Some(description) = property.get("description").and_then(Value::as_str) {
            out.push_str(": ");
            out.push_str(description);
        }
        out.push('\n');
    }
    out
}

fn type_name(property: &Value) -> String {
    match property.get("type").and_then(Value::as_str) {
        Some("array") => match property.get("items") {
            Some(items) => format!("array of {}", type_name(items)),
            None => "array".to_string(),
        },
        Some(kind) => kind.to_string(),
        None if property.get("enum").is_some() => "enum".to_string(),
        None => "any".to_string(),
    }
}

/// Parse a reply, tolerating a surrounding markdown code fence.
fn parse_structured(content: &str, shape: Shape) -> ProviderResult<Value> {
    let json = strip_code_fence(content);
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ProviderError::MalformedResponse(format!("reply is not valid JSON: {e}")))?;
    if !shape.matches(&value) {
        return Err(ProviderError::MalformedResponse(format!(
            "expected {}, got {}",
            shape.describe(),
            kind_of(&value)
        )));
    }
    Ok(value)
}

/// Strip a leading ```` ``` ```` / ```` ```json ```` line and the closing fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") up to the first newline
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
