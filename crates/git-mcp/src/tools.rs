//! MCP tool definitions
//!
//! Every registered operation is exposed as a tool named `git_<operation>`.
//! Input schemas are generated from the registry's parameter specs, plus the
//! `repo_path` every call needs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::dispatch::DispatchResponse;
use crate::formatter::OperationResult;
use crate::registry::{OperationRegistry, OperationSpec};

/// Prefix distinguishing tool names from operation names
pub const TOOL_PREFIX: &str = "git_";

/// Tool definition for MCP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result from a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content types for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    /// Render a dispatch response as tool output.
    ///
    /// Text results become the text content as-is; record lists and errors
    /// are pretty-printed JSON.
    pub fn from_response(response: &DispatchResponse) -> serde_json::Result<Self> {
        match response {
            DispatchResponse::Success(OperationResult::Text { body }) => {
                Ok(Self::text(body.clone()))
            }
            DispatchResponse::Success(OperationResult::RecordList { records }) => {
                Ok(Self::text(serde_json::to_string_pretty(records)?))
            }
            DispatchResponse::Failure(error) => {
                Ok(Self::error(serde_json::to_string_pretty(error)?))
            }
        }
    }
}

pub fn tool_name(operation: &str) -> String {
    format!("{TOOL_PREFIX}{operation}")
}

/// Operation name for a tool name; bare operation names pass through.
pub fn operation_name(tool: &str) -> &str {
    tool.strip_prefix(TOOL_PREFIX).unwrap_or(tool)
}

fn input_schema(spec: &OperationSpec, repo_path_required: bool) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    properties.insert(
        "repo_path".to_string(),
        json!({ "type": "string", "description": "Path to the Git repository" }),
    );
    if repo_path_required {
        required.push(Value::from("repo_path"));
    }

    for param in &spec.parameters {
        let mut schema = param.kind.json_schema();
        if let Value::Object(fields) = &mut schema {
            fields.insert("description".into(), Value::from(param.description));
            if let Some(default) = &param.default {
                fields.insert("default".into(), default.to_json());
            }
        }
        properties.insert(param.name.to_string(), schema);
        if param.required {
            required.push(Value::from(param.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// One tool per registered operation, in registration order.
///
/// `repo_path_required` is false when the server has a default repository.
pub fn tool_definitions(
    registry: &OperationRegistry,
    repo_path_required: bool,
) -> Vec<ToolDefinition> {
    registry
        .operations()
        .map(|op| ToolDefinition {
            name: tool_name(op.spec.name),
            description: op.spec.description.to_string(),
            input_schema: input_schema(&op.spec, repo_path_required),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use crate::registry::registry;
    use pretty_assertions::assert_eq;

    fn definition(name: &str) -> ToolDefinition {
        tool_definitions(registry(), true)
            .into_iter()
            .find(|t| t.name == name)
            .unwrap()
    }

    #[test]
    fn one_tool_per_operation() {
        let tools = tool_definitions(registry(), true);
        assert_eq!(tools.len(), 15);
        assert!(tools.iter().all(|t| t.name.starts_with("git_")));
    }

    #[test]
    fn log_schema_declares_default() {
        let schema = definition("git_log").input_schema;
        assert_eq!(schema["properties"]["max_count"]["type"], "integer");
        assert_eq!(schema["properties"]["max_count"]["default"], 10);
        assert_eq!(schema["required"], json!(["repo_path"]));
    }

    #[test]
    fn add_schema_takes_string_array() {
        let schema = definition("git_add").input_schema;
        assert_eq!(
            schema["properties"]["files"],
            json!({
                "type": "array",
                "items": { "type": "string" },
                "description": "Paths to stage, relative to the repository root or absolute; '.' stages everything"
            })
        );
        assert_eq!(schema["required"], json!(["repo_path", "files"]));
    }

    #[test]
    fn repo_path_optional_with_default_repository() {
        let tools = tool_definitions(registry(), false);
        let status = tools.iter().find(|t| t.name == "git_status").unwrap();
        assert_eq!(status.input_schema["required"], json!([]));
    }

    #[test]
    fn operation_names_accept_both_forms() {
        assert_eq!(operation_name("git_status"), "status");
        assert_eq!(operation_name("status"), "status");
        assert_eq!(tool_name("remote_add"), "git_remote_add");
    }

    #[test]
    fn error_results_are_flagged() {
        let response = DispatchResponse::Failure(OperationError::missing_argument("url"));
        let result = ToolResult::from_response(&response).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], true);
        let ToolContent::Text { text } = &result.content[0];
        assert!(text.contains("MissingArgumentError"));
    }
}
