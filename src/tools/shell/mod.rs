use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ToolError;
use crate::policy::{CommandWhitelist, PathSandbox};
use crate::tools::base::{Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;
use crate::utils::subprocess::scrubbed_command;

/// Maximum combined stdout+stderr size before truncation.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL when stopping a background shell.
const KILL_GRACE: Duration = Duration::from_secs(5);

struct BackgroundShell {
    child: tokio::process::Child,
    command: String,
}

/// Registry of background shells, shared between the bash tool (which
/// creates them) and the kill tool (which consumes them).
#[derive(Default)]
pub struct ShellSessions {
    inner: Mutex<HashMap<String, BackgroundShell>>,
}

impl ShellSessions {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, id: String, shell: BackgroundShell) {
        let mut sessions = self.inner.lock().await;
        // Reap any shells that already exited.
        sessions.retain(|_, s| matches!(s.child.try_wait(), Ok(None)));
        sessions.insert(id, shell);
    }

    async fn remove(&self, id: &str) -> Option<BackgroundShell> {
        self.inner.lock().await.remove(id)
    }

    pub async fn running_count(&self) -> usize {
        let mut sessions = self.inner.lock().await;
        sessions.retain(|_, s| matches!(s.child.try_wait(), Ok(None)));
        sessions.len()
    }
}

/// Truncate a byte slice at a UTF-8 character boundary, never splitting
/// a multi-byte character.
fn truncate_at_utf8_boundary(data: &[u8], max: usize) -> &[u8] {
    if max >= data.len() {
        return data;
    }
    let mut end = max;
    while end > 0 && (data[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    &data[..end]
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> (String, bool) {
    let combined_len = stdout.len() + stderr.len();
    let truncated = combined_len > MAX_OUTPUT_BYTES;

    // Reserve at least 25% for stderr so error messages aren't lost.
    let stderr_reserve = MAX_OUTPUT_BYTES / 4;
    let stdout_max = MAX_OUTPUT_BYTES - stderr_reserve.min(stderr.len());
    let stdout_bytes = if stdout.len() > stdout_max {
        truncate_at_utf8_boundary(stdout, stdout_max)
    } else {
        stdout
    };
    let remaining = MAX_OUTPUT_BYTES.saturating_sub(stdout_bytes.len());
    let stderr_bytes = if stderr.len() > remaining {
        truncate_at_utf8_boundary(stderr, remaining)
    } else {
        stderr
    };

    let stdout = String::from_utf8_lossy(stdout_bytes);
    let stderr = String::from_utf8_lossy(stderr_bytes);

    let mut out = String::new();
    if !stdout.is_empty() {
        out.push_str(&stdout);
    }
    if !stderr.is_empty() {
        if !out.is_empty() {
            out.push_str("\n--- stderr ---\n");
        }
        out.push_str(&stderr);
    }
    if truncated {
        out.push_str("\n[output truncated at 1MB]");
    }
    (out, truncated)
}

pub struct BashTool {
    whitelist: Arc<CommandWhitelist>,
    sandbox: Arc<PathSandbox>,
    sessions: Arc<ShellSessions>,
    timeout: Duration,
    enabled: bool,
}

impl BashTool {
    pub const NAME: &'static str = "bash";

    pub fn new(
        whitelist: Arc<CommandWhitelist>,
        sandbox: Arc<PathSandbox>,
        sessions: Arc<ShellSessions>,
        timeout: Duration,
        enabled: bool,
    ) -> Self {
        Self {
            whitelist,
            sandbox,
            sessions,
            timeout,
            enabled,
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Run a whitelisted shell command. Set background=true for long-running \
                          commands; the returned shell id feeds kill_shell."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "Command to run" },
                    "working_dir": { "type": "string", "description": "Working directory" },
                    "background": { "type": "boolean", "default": false }
                },
                "required": ["command"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let command = params::require_str(args, "command")?;
        self.whitelist.check(&command)?;
        params::optional_bool(args, "background", false)?;
        if let Some(dir) = params::optional_str(args, "working_dir") {
            self.sandbox.validate(Path::new(&dir))?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }
        let command = params::require_str(&args, "command").expect("validated");
        let background = params::optional_bool(&args, "background", false).expect("validated");
        let working_dir = match params::optional_str(&args, "working_dir") {
            Some(dir) => match self.sandbox.validate(Path::new(&dir)) {
                Ok(p) => Some(p),
                Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
            },
            None => None,
        };

        let mut cmd = scrubbed_command("sh");
        cmd.arg("-c").arg(&command);
        if let Some(dir) = &working_dir {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(true);

        if background {
            cmd.stdin(std::process::Stdio::null());
            cmd.stdout(std::process::Stdio::null());
            cmd.stderr(std::process::Stdio::null());
            let child = match cmd.spawn() {
                Ok(c) => c,
                Err(e) => {
                    return Ok(ToolResult::failure(
                        Self::NAME,
                        args,
                        ToolError::Internal(format!("failed to spawn command: {}", e)),
                    ));
                }
            };
            let id = Uuid::new_v4().to_string()[..8].to_string();
            debug!("bash: started background shell {} for '{}'", id, command);
            self.sessions
                .insert(
                    id.clone(),
                    BackgroundShell {
                        child,
                        command: command.clone(),
                    },
                )
                .await;
            return Ok(ToolResult::success(
                Self::NAME,
                args,
                ToolData::Bash {
                    command,
                    exit_code: None,
                    output: String::new(),
                    background_id: Some(id),
                },
            ));
        }

        let output = tokio::select! {
            () = cancel.cancelled() => {
                return Ok(ToolResult::failure(
                    Self::NAME,
                    args,
                    ToolError::Cancelled(format!("command cancelled: {}", command)),
                ));
            }
            result = tokio::time::timeout(self.timeout, cmd.output()) => match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Ok(ToolResult::failure(
                        Self::NAME,
                        args,
                        ToolError::Internal(format!("error executing command: {}", e)),
                    ));
                }
                Err(_) => {
                    return Ok(ToolResult::failure(
                        Self::NAME,
                        args,
                        ToolError::Validation(format!(
                            "command timed out after {} seconds",
                            self.timeout.as_secs()
                        )),
                    ));
                }
            },
        };

        let (combined, _truncated) = combine_output(&output.stdout, &output.stderr);
        let exit_code = output.status.code();

        if output.status.success() {
            Ok(ToolResult::success(
                Self::NAME,
                args,
                ToolData::Bash {
                    command,
                    exit_code,
                    output: if combined.is_empty() {
                        "(no output)".to_string()
                    } else {
                        combined
                    },
                    background_id: None,
                },
            ))
        } else {
            let mut result = ToolResult::failure(
                Self::NAME,
                args,
                ToolError::Validation(format!(
                    "command exited with code {}: {}",
                    exit_code.unwrap_or(-1),
                    crate::utils::truncate_chars(&combined, 500, "…")
                )),
            );
            result.data = Some(ToolData::Bash {
                command,
                exit_code,
                output: combined,
                background_id: None,
            });
            Ok(result)
        }
    }
}

pub struct KillShellTool {
    sessions: Arc<ShellSessions>,
    enabled: bool,
}

impl KillShellTool {
    pub const NAME: &'static str = "kill_shell";

    pub fn new(sessions: Arc<ShellSessions>, enabled: bool) -> Self {
        Self { sessions, enabled }
    }

    #[cfg(unix)]
    fn send_sigterm(child: &tokio::process::Child) {
        if let Some(pid) = child.id() {
            // SAFETY: plain kill(2) on a pid we own.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }

    #[cfg(not(unix))]
    fn send_sigterm(_child: &tokio::process::Child) {}
}

#[async_trait]
impl Tool for KillShellTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Stop a background shell: graceful stop first, forced kill after five \
                          seconds."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "shell_id": { "type": "string", "description": "Id returned by bash background mode" }
                },
                "required": ["shell_id"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        params::require_str(args, "shell_id").map(|_| ())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let shell_id = match params::require_str(&args, "shell_id") {
            Ok(id) => id,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let Some(mut shell) = self.sessions.remove(&shell_id).await else {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::NotFound(format!("no background shell with id {}", shell_id)),
            ));
        };

        Self::send_sigterm(&shell.child);
        let forced = match tokio::time::timeout(KILL_GRACE, shell.child.wait()).await {
            Ok(_) => false,
            Err(_) => {
                warn!(
                    "shell {} ('{}') ignored SIGTERM, killing",
                    shell_id, shell.command
                );
                let _ = shell.child.kill().await;
                true
            }
        };

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::ShellKill { shell_id, forced },
        ))
    }
}
