pub mod config;
pub mod doctor;
pub mod tool;

use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOG: u8 = 3;
pub const EXIT_TOOL: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct ToolOutcome<'a> {
    command: &'a str,
    status: &'a str,
    tool: &'a str,
    result: Value,
}

impl CommandResult {
    pub fn tool_success(command: &str, tool: &str, result: Value) -> Self {
        let payload = ToolOutcome { command, status: "ok", tool, result };
        let output = serde_json::to_string_pretty(&payload).unwrap_or_else(|error| {
            serialize_payload(&CommandOutcome {
                command: command.to_string(),
                status: "error".to_string(),
                error_class: Some("serialization".to_string()),
                message: error.to_string(),
            })
        });
        Self { exit_code: 0, output }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
