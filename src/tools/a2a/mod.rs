use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::a2a::client::A2aClient;
use crate::a2a::tracker::AgentTaskTracker;
use crate::a2a::types::{MessageSendParams, Part, TaskState};
use crate::a2a::worker::{PollSchedule, PollWorker};
use crate::config::A2aConfig;
use crate::errors::ToolError;
use crate::tools::base::{
    ArtifactReport, Tool, ToolArgs, ToolData, ToolDefinition, ToolResult,
};
use crate::tools::params;

/// Turn an agent-supplied artifact id or part filename into a single safe
/// path component. Anything outside ASCII alphanumerics, dots, dashes, and
/// underscores becomes a dash; leading dots and dashes are stripped so an
/// artifact can neither hide itself nor smuggle a `..` segment.
fn artifact_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '-',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '-']).to_string();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

fn check_agent_url(url: &str) -> Result<(), ToolError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ToolError::invalid_param(
            "agent_url",
            "must start with http:// or https://",
        ))
    }
}

/// Delegate a task to a remote agent and monitor it in the background.
pub struct SubmitTaskTool {
    client: Arc<A2aClient>,
    tracker: Arc<AgentTaskTracker>,
    schedule: PollSchedule,
    enabled: bool,
}

impl SubmitTaskTool {
    pub const NAME: &'static str = "a2a_submit_task";

    pub fn new(
        client: Arc<A2aClient>,
        tracker: Arc<AgentTaskTracker>,
        config: &A2aConfig,
        enabled: bool,
    ) -> Self {
        Self {
            client,
            tracker,
            schedule: PollSchedule::from_config(config),
            enabled,
        }
    }
}

#[async_trait]
impl Tool for SubmitTaskTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Delegate a task to a remote agent. Returns immediately; the task is \
                          monitored in the background and the final result is delivered \
                          automatically; never poll manually."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "agent_url": { "type": "string", "description": "Base URL of the agent" },
                    "task_description": { "type": "string", "description": "What the agent should do" }
                },
                "required": ["agent_url", "task_description"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let agent_url = params::require_str(args, "agent_url")?;
        check_agent_url(&agent_url)?;
        params::require_str(args, "task_description")?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }
        let agent_url = params::require_str(&args, "agent_url").expect("validated");
        let task_description = params::require_str(&args, "task_description").expect("validated");

        // Continuation logic: look at the latest task for this agent first.
        let known_context = self.tracker.latest_context(&agent_url).await;
        let mut continuation = false;
        let mut continue_task_id = None;

        if let Some(prev_id) = self.tracker.latest_task(&agent_url).await {
            match self.client.get_task(&agent_url, &prev_id).await {
                Ok(prev) => match prev.status.state {
                    TaskState::Working => {
                        return Ok(ToolResult::failure(
                            Self::NAME,
                            args,
                            ToolError::NotFound(format!(
                                "existing task {} is still in working state; wait for it to \
                                 finish before submitting another",
                                prev_id
                            )),
                        ));
                    }
                    TaskState::InputRequired => {
                        continuation = true;
                        continue_task_id = Some(prev_id);
                    }
                    _ => {}
                },
                Err(e) => {
                    warn!(
                        "could not query previous task {} on {}: {}; submitting fresh",
                        prev_id, agent_url, e
                    );
                }
            }
        }

        let send = MessageSendParams::blocking_text(
            &task_description,
            continue_task_id.clone(),
            known_context.clone(),
        );
        let task = match self.client.send_task(&agent_url, &send).await {
            Ok(task) => task,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let task_id = task.id.clone();
        let context_id = task
            .context_id
            .clone()
            .or(known_context)
            .unwrap_or_else(|| format!("ctx-{}", &Uuid::new_v4().to_string()[..8]));

        let worker_channels = match self
            .tracker
            .register_task(&agent_url, &context_id, &task_id)
            .await
        {
            Ok(channels) => channels,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        PollWorker::new(
            self.client.clone(),
            self.tracker.clone(),
            agent_url.clone(),
            task_id.clone(),
            self.schedule,
            worker_channels,
        )
        .spawn();
        info!(
            "a2a: submitted task {} to {} (continuation: {})",
            task_id, agent_url, continuation
        );

        // Return promptly: monitoring happens in the background.
        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::TaskSubmit {
                task_id,
                context_id: Some(context_id),
                agent_url,
                continuation,
                message: "Task submitted; monitoring continues in the background and the final \
                          result will be delivered automatically. Do not poll for status."
                    .to_string(),
            },
        ))
    }
}

/// Fetch the current snapshot of a remote task. Read-only; does not touch
/// the tracker.
pub struct QueryTaskTool {
    client: Arc<A2aClient>,
    enabled: bool,
}

impl QueryTaskTool {
    pub const NAME: &'static str = "a2a_query_task";

    pub fn new(client: Arc<A2aClient>, enabled: bool) -> Self {
        Self { client, enabled }
    }
}

#[async_trait]
impl Tool for QueryTaskTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Fetch the current state of a delegated task by id.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "agent_url": { "type": "string" },
                    "task_id": { "type": "string" }
                },
                "required": ["agent_url", "task_id"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let agent_url = params::require_str(args, "agent_url")?;
        check_agent_url(&agent_url)?;
        params::require_str(args, "task_id")?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }
        let agent_url = params::require_str(&args, "agent_url").expect("validated");
        let task_id = params::require_str(&args, "task_id").expect("validated");

        match self.client.get_task(&agent_url, &task_id).await {
            Ok(task) => Ok(ToolResult::success(
                Self::NAME,
                args,
                ToolData::TaskQuery {
                    task_id,
                    state: task.status.state,
                    status_message: task.status_text(),
                    artifact_count: task.artifacts.len(),
                },
            )),
            Err(err) => Ok(ToolResult::failure(Self::NAME, args, err)),
        }
    }
}

/// Download every artifact of a completed task to the configured directory.
pub struct DownloadArtifactsTool {
    client: Arc<A2aClient>,
    download_dir: PathBuf,
    organize_by_artifact: bool,
    enabled: bool,
}

impl DownloadArtifactsTool {
    pub const NAME: &'static str = "a2a_download_artifacts";

    pub fn new(client: Arc<A2aClient>, config: &A2aConfig, enabled: bool) -> Self {
        Self {
            client,
            download_dir: PathBuf::from(&config.download_dir),
            organize_by_artifact: config.organize_by_artifact,
            enabled,
        }
    }

    /// Write one artifact's parts to disk, returning the report. Failures
    /// are contained per artifact.
    fn save_artifact(
        &self,
        artifact_id: &str,
        parts: &[Part],
    ) -> Result<(PathBuf, u64), ToolError> {
        let dir = if self.organize_by_artifact {
            self.download_dir.join(artifact_file_name(artifact_id))
        } else {
            self.download_dir.clone()
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| ToolError::Internal(format!("cannot create {}: {}", dir.display(), e)))?;

        let mut total: u64 = 0;
        let mut last_path = dir.clone();
        for (i, part) in parts.iter().enumerate() {
            let (name, bytes) = match part {
                Part::Text { text } => (
                    format!("{}-part{}.txt", artifact_file_name(artifact_id), i),
                    text.clone().into_bytes(),
                ),
                Part::File { name, bytes, .. } => {
                    let decoded = base64::engine::general_purpose::STANDARD
                        .decode(bytes)
                        .map_err(|e| {
                            ToolError::Remote(format!(
                                "artifact {} part {} is not valid base64: {}",
                                artifact_id, i, e
                            ))
                        })?;
                    let fallback = format!("{}-part{}.bin", artifact_file_name(artifact_id), i);
                    (
                        name.as_deref().map_or(fallback, artifact_file_name),
                        decoded,
                    )
                }
            };
            let path = dir.join(name);
            std::fs::write(&path, &bytes)
                .map_err(|e| ToolError::Internal(format!("cannot write {}: {}", path.display(), e)))?;
            total += bytes.len() as u64;
            last_path = path;
        }
        Ok((last_path, total))
    }
}

#[async_trait]
impl Tool for DownloadArtifactsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Download all artifacts of a completed task to the download directory."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "agent_url": { "type": "string" },
                    "task_id": { "type": "string" }
                },
                "required": ["agent_url", "task_id"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let agent_url = params::require_str(args, "agent_url")?;
        check_agent_url(&agent_url)?;
        params::require_str(args, "task_id")?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }
        let agent_url = params::require_str(&args, "agent_url").expect("validated");
        let task_id = params::require_str(&args, "task_id").expect("validated");

        let task = match self.client.get_task(&agent_url, &task_id).await {
            Ok(task) => task,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        // Artifacts only exist once the task has completed.
        if task.status.state != TaskState::Completed {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::NotFound(format!(
                    "task {} is in state {}; artifacts can only be downloaded from a completed \
                     task",
                    task_id, task.status.state
                )),
            ));
        }

        let mut artifacts = Vec::with_capacity(task.artifacts.len());
        for artifact in &task.artifacts {
            match self.save_artifact(&artifact.artifact_id, &artifact.parts) {
                Ok((path, size)) => artifacts.push(ArtifactReport {
                    artifact_id: artifact.artifact_id.clone(),
                    local_path: path.display().to_string(),
                    size,
                    downloaded: true,
                    error: None,
                }),
                // One failed artifact does not abort the batch.
                Err(err) => artifacts.push(ArtifactReport {
                    artifact_id: artifact.artifact_id.clone(),
                    local_path: String::new(),
                    size: 0,
                    downloaded: false,
                    error: Some(err.to_string()),
                }),
            }
        }

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::ArtifactDownload {
                task_id,
                directory: self.download_dir.display().to_string(),
                artifacts,
            },
        ))
    }
}

#[cfg(test)]
mod tests;
