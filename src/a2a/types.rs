use serde::{Deserialize, Serialize};

/// Remote task lifecycle state.
///
/// Observed transitions:
/// `submitted → working → (input-required → working)* → {completed | failed | canceled}`.
///
/// `input-required` ends the polling worker but not the task: the next
/// submission for the same context resumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    /// Terminal for the task itself.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Terminal for a polling worker (`input-required` pauses the task but
    /// ends monitoring).
    pub fn ends_polling(self) -> bool {
        self.is_terminal() || self == Self::InputRequired
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

/// A message or artifact part: text, or a binary blob with filename/mimetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    File {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Base64-encoded content.
        bytes: String,
    },
}

/// Concatenate the text parts of a message or artifact.
pub fn extract_text(parts: &[Part]) -> String {
    let mut out = String::new();
    for part in parts {
        if let Part::Text { text } = part {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub kind: String,
    pub role: String,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl AgentMessage {
    /// A user text message, optionally continuing an existing task/context.
    pub fn user_text(text: &str, task_id: Option<String>, context_id: Option<String>) -> Self {
        Self {
            kind: "message".to_string(),
            role: "user".to_string(),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
            task_id,
            context_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendConfiguration {
    pub blocking: bool,
    pub accepted_output_modes: Vec<String>,
}

/// Parameters for a `message/send` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: AgentMessage,
    pub configuration: SendConfiguration,
}

impl MessageSendParams {
    pub fn blocking_text(
        text: &str,
        task_id: Option<String>,
        context_id: Option<String>,
    ) -> Self {
        Self {
            message: AgentMessage::user_text(text, task_id, context_id),
            configuration: SendConfiguration {
                blocking: true,
                accepted_output_modes: vec!["text".to_string()],
            },
        }
    }
}

/// Parameters for a `tasks/get` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueryParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<AgentMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// The agent's view of a task, as returned by `message/send` and `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl AgentTask {
    /// Text extracted from the current status message.
    pub fn status_text(&self) -> Option<String> {
        self.status
            .message
            .as_ref()
            .map(|m| extract_text(&m.parts))
            .filter(|t| !t.is_empty())
    }
}
