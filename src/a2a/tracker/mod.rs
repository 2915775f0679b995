use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::a2a::types::TaskState;
use crate::errors::ToolError;
use crate::tools::base::ToolResult;

/// Status channel depth. Status is informational, so a full channel drops
/// instead of blocking the polling worker.
const STATUS_CHANNEL_DEPTH: usize = 64;

/// A non-blocking status update published on every poll tick.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub task_id: String,
    pub agent_url: String,
    pub state: TaskState,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Host-side receivers for one monitored task.
pub struct TaskChannels {
    pub status_rx: mpsc::Receiver<StatusUpdate>,
    pub result_rx: mpsc::Receiver<ToolResult>,
    pub error_rx: mpsc::Receiver<ToolError>,
}

/// Worker-side handles. The polling worker owns only these, never the
/// tracker's maps.
#[derive(Clone, Debug)]
pub struct WorkerChannels {
    pub status_tx: mpsc::Sender<StatusUpdate>,
    pub result_tx: mpsc::Sender<ToolResult>,
    pub error_tx: mpsc::Sender<ToolError>,
    pub cancel: CancellationToken,
}

struct PollRegistration {
    agent_url: String,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    channels: Option<TaskChannels>,
}

#[derive(Default)]
struct TrackerState {
    /// agent_url → latest context id.
    contexts: HashMap<String, String>,
    /// context id → ordered task ids. Retained after polling ends so that
    /// continuations can find the latest task.
    context_tasks: HashMap<String, Vec<String>>,
    /// task id → owning context. Enforces that a task never appears under
    /// two contexts.
    task_context: HashMap<String, String>,
    /// task id → live polling state. At most one per task.
    polls: HashMap<String, PollRegistration>,
}

/// Process-wide registry of remote agent tasks and their polling workers.
///
/// The only shared mutable state in the A2A family; every map access is
/// serialized behind one mutex. Workers receive a [`WorkerChannels`] at spawn
/// and interact with the tracker solely through `remove_task` on exit.
#[derive(Default)]
pub struct AgentTaskTracker {
    state: Mutex<TrackerState>,
}

impl AgentTaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest context id recorded for an agent.
    pub async fn latest_context(&self, agent_url: &str) -> Option<String> {
        self.state.lock().await.contexts.get(agent_url).cloned()
    }

    /// Most recent task id in the agent's latest context.
    pub async fn latest_task(&self, agent_url: &str) -> Option<String> {
        let state = self.state.lock().await;
        let context = state.contexts.get(agent_url)?;
        state
            .context_tasks
            .get(context)
            .and_then(|tasks| tasks.last())
            .cloned()
    }

    /// Register a task under its context and create its polling state.
    /// Returns the worker-side handles; the host side stays in the tracker
    /// until [`take_channels`](Self::take_channels) claims it.
    pub async fn register_task(
        &self,
        agent_url: &str,
        context_id: &str,
        task_id: &str,
    ) -> Result<WorkerChannels, ToolError> {
        let mut state = self.state.lock().await;

        if state.polls.contains_key(task_id) {
            return Err(ToolError::Validation(format!(
                "task {} is already being monitored",
                task_id
            )));
        }
        if let Some(existing) = state.task_context.get(task_id)
            && existing != context_id
        {
            return Err(ToolError::Validation(format!(
                "task {} already belongs to context {}",
                task_id, existing
            )));
        }

        state
            .contexts
            .insert(agent_url.to_string(), context_id.to_string());
        let tasks = state
            .context_tasks
            .entry(context_id.to_string())
            .or_default();
        if !tasks.iter().any(|t| t == task_id) {
            tasks.push(task_id.to_string());
        }
        state
            .task_context
            .insert(task_id.to_string(), context_id.to_string());

        let (status_tx, status_rx) = mpsc::channel(STATUS_CHANNEL_DEPTH);
        let (result_tx, result_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        state.polls.insert(
            task_id.to_string(),
            PollRegistration {
                agent_url: agent_url.to_string(),
                started_at: Utc::now(),
                cancel: cancel.clone(),
                channels: Some(TaskChannels {
                    status_rx,
                    result_rx,
                    error_rx,
                }),
            },
        );
        debug!(
            "tracker: registered task {} under context {} ({})",
            task_id, context_id, agent_url
        );

        Ok(WorkerChannels {
            status_tx,
            result_tx,
            error_tx,
            cancel,
        })
    }

    /// Claim the host-side channels for a task. Each registration yields them
    /// exactly once.
    pub async fn take_channels(&self, task_id: &str) -> Option<TaskChannels> {
        let mut state = self.state.lock().await;
        state
            .polls
            .get_mut(task_id)
            .and_then(|reg| reg.channels.take())
    }

    /// Trip a task's cancel handle. The worker delivers the cancelled error
    /// and removes the task itself.
    pub async fn cancel_task(&self, task_id: &str) -> bool {
        let state = self.state.lock().await;
        if let Some(reg) = state.polls.get(task_id) {
            reg.cancel.cancel();
            true
        } else {
            false
        }
    }

    /// Remove a task's polling state, closing any unclaimed channels. The
    /// context history is retained for continuations. Idempotent.
    pub async fn remove_task(&self, task_id: &str) {
        let mut state = self.state.lock().await;
        if state.polls.remove(task_id).is_some() {
            debug!("tracker: removed task {}", task_id);
        }
    }

    pub async fn is_monitored(&self, task_id: &str) -> bool {
        self.state.lock().await.polls.contains_key(task_id)
    }

    pub async fn monitored_count(&self) -> usize {
        self.state.lock().await.polls.len()
    }

    /// Age of a task's polling registration, for diagnostics.
    pub async fn monitoring_since(&self, task_id: &str) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .await
            .polls
            .get(task_id)
            .map(|reg| reg.started_at)
    }

    /// Cancel every live polling worker (shutdown path).
    pub async fn cancel_all(&self) {
        let state = self.state.lock().await;
        let count = state.polls.len();
        for (task_id, reg) in &state.polls {
            reg.cancel.cancel();
            debug!("tracker: cancelled task {} ({})", task_id, reg.agent_url);
        }
        if count > 0 {
            warn!("tracker: cancelled {} polling worker(s)", count);
        }
    }
}
