use crate::error::BslResult;
use serde::{Deserialize, Serialize};

/// Leading text of every failed tool result.
pub const FAILURE_MARKER: &str = "Error:";

// ---------------------------------------------------------------------------
// Tool call result – the contract handed to the transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
    /// Machine-readable code for failed calls. Not part of the text contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl CallToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
            error_code: None,
        }
    }

    pub fn failure(code: ErrorCode, message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![Content::Text {
                text: format!("{} {}", FAILURE_MARKER, message),
            }],
            is_error: true,
            error_code: Some(code),
        }
    }

    /// Flatten an operation outcome into text plus error flag.
    pub fn from_outcome(outcome: BslResult<String>) -> Self {
        match outcome {
            Ok(text) => Self::success(text),
            Err(e) => Self::failure(e.error_code(), &e),
        }
    }

    /// Concatenated text of all content items.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                Content::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    DependencyMissing,
    NotFound,
    EngineFailed,
    Timeout,
    ReportMissing,
    IoError,
    Interrupted,
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&s)
    }
}

// ---------------------------------------------------------------------------
// Tool metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// JSON schema for an object with a single required string property.
pub fn single_string_schema(field: &str, description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            field: {
                "type": "string",
                "description": description,
            }
        },
        "required": [field],
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a new run ID (UUIDv4).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BslError;
    use std::path::PathBuf;

    #[test]
    fn test_failure_text_starts_with_marker() {
        let r = CallToolResult::from_outcome(Err(BslError::PathNotFound(PathBuf::from(
            "/does/not/exist",
        ))));
        assert!(r.is_error);
        assert!(r.text().starts_with(FAILURE_MARKER));
        assert!(r.text().contains("/does/not/exist"));
        assert_eq!(r.error_code, Some(ErrorCode::NotFound));
    }

    #[test]
    fn test_success_is_not_flagged() {
        let r = CallToolResult::from_outcome(Ok("Analysis: x".into()));
        assert!(!r.is_error);
        assert_eq!(r.text(), "Analysis: x");
        assert_eq!(r.error_code, None);
    }

    #[test]
    fn test_serialized_shape() {
        let r = CallToolResult::success("done");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "content": [{ "type": "text", "text": "done" }],
                "isError": false,
            })
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::DependencyMissing.to_string(), "DEPENDENCY_MISSING");
    }

    #[test]
    fn test_single_string_schema() {
        let s = single_string_schema("src", "path");
        assert_eq!(s["required"][0], "src");
        assert_eq!(s["properties"]["src"]["type"], "string");
    }
}
