use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy for tool execution.
///
/// Kinds 1–6 (everything except `Internal`) are always carried inside a
/// `ToolResult` with `success = false`; the host loop never needs to catch
/// them around `execute`. `Internal` is the only kind that may also surface
/// as an `Err` from `execute`, and it terminates the current tool call only.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ToolError {
    /// The tool or the whole tool subsystem is switched off.
    #[error("{0}")]
    Disabled(String),

    /// Missing or wrong-typed argument, out-of-range number.
    #[error("{0}")]
    Validation(String),

    /// The target violates the sandbox or command whitelist. Distinguished
    /// from `Validation` because it depends on runtime config, not argument
    /// shape.
    #[error("{0}")]
    Policy(String),

    /// The resource does not exist or is in the wrong state.
    #[error("{0}")]
    NotFound(String),

    /// Transport error, non-2xx response, or parse failure from an external
    /// service.
    #[error("{0}")]
    Remote(String),

    /// A cancel token tripped while the tool was running.
    #[error("{0}")]
    Cancelled(String),

    /// An unexpected fault.
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Uniform disabled message naming the config switch that controls the
    /// tool.
    pub fn disabled(tool: &str, switch: &str) -> Self {
        Self::Disabled(format!(
            "tool '{}' is disabled (enable it with {})",
            tool, switch
        ))
    }

    pub fn missing_param(key: &str) -> Self {
        Self::Validation(format!("missing required parameter: {}", key))
    }

    pub fn invalid_param(key: &str, detail: &str) -> Self {
        Self::Validation(format!("invalid parameter '{}': {}", key, detail))
    }

    /// Remote API error in the shared `<service> API error (<status>): <message>`
    /// shape used by every outbound tool.
    pub fn api_error(service: &str, status: u16, message: &str) -> Self {
        Self::Remote(format!(
            "{} API error ({}): {}",
            service, status, message
        ))
    }

    /// Stable kind label, used for validate/execute agreement checks and for
    /// the LLM-facing error header.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::Validation(_) => "validation",
            Self::Policy(_) => "policy",
            Self::NotFound(_) => "not_found",
            Self::Remote(_) => "remote",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;
