use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::a2a::client::A2aClient;
use crate::a2a::tracker::{AgentTaskTracker, StatusUpdate, WorkerChannels};
use crate::a2a::types::{AgentTask, TaskState};
use crate::config::{A2aConfig, PollStrategy};
use crate::errors::ToolError;
use crate::tools::base::{ToolData, ToolResult};

/// Consecutive query failures tolerated before the worker gives up and
/// delivers a failed terminal result.
const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 5;

/// Poll scheduling strategy.
#[derive(Debug, Clone, Copy)]
pub enum PollSchedule {
    /// Poll every interval.
    Fixed(Duration),
    /// Start at `initial`, multiply by `multiplier` after every poll
    /// (success and transient error alike), clamped to `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl PollSchedule {
    pub fn from_config(config: &A2aConfig) -> Self {
        match config.poll_strategy {
            PollStrategy::Fixed => Self::Fixed(Duration::from_secs(config.status_poll_seconds)),
            PollStrategy::Exponential => Self::Exponential {
                initial: Duration::from_secs(config.initial_poll_interval.max(1)),
                multiplier: config.backoff_multiplier.max(1.0),
                max: Duration::from_secs(config.max_poll_interval.max(1)),
            },
        }
    }

    pub fn first(&self) -> Duration {
        match self {
            Self::Fixed(interval) => *interval,
            Self::Exponential { initial, .. } => *initial,
        }
    }

    /// Interval for the next tick, given the one just used.
    pub fn advance(&self, current: Duration) -> Duration {
        match self {
            Self::Fixed(interval) => *interval,
            Self::Exponential {
                multiplier, max, ..
            } => {
                let next = current.mul_f64(*multiplier);
                next.min(*max)
            }
        }
    }
}

/// Background worker that advances the local view of one remote task.
///
/// Holds only the handles given to it at spawn: the A2A client, its channel
/// ends, and the cancel token. Every exit path removes the task from the
/// tracker after any terminal delivery, so the worker never outlives its
/// registration.
pub struct PollWorker {
    client: Arc<A2aClient>,
    tracker: Arc<AgentTaskTracker>,
    agent_url: String,
    task_id: String,
    schedule: PollSchedule,
    channels: WorkerChannels,
}

impl PollWorker {
    pub fn new(
        client: Arc<A2aClient>,
        tracker: Arc<AgentTaskTracker>,
        agent_url: String,
        task_id: String,
        schedule: PollSchedule,
        channels: WorkerChannels,
    ) -> Self {
        Self {
            client,
            tracker,
            agent_url,
            task_id,
            schedule,
            channels,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut interval = self.schedule.first();
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                () = self.channels.cancel.cancelled() => {
                    debug!("poll worker for task {} cancelled", self.task_id);
                    let _ = self.channels.error_tx.try_send(ToolError::Cancelled(format!(
                        "monitoring for task {} was cancelled",
                        self.task_id
                    )));
                    break;
                }
                () = tokio::time::sleep(interval) => {
                    match self.client.get_task(&self.agent_url, &self.task_id).await {
                        Ok(task) => {
                            consecutive_failures = 0;
                            self.publish_status(&task);
                            if task.status.state.ends_polling() {
                                self.deliver_result(&task);
                                break;
                            }
                        }
                        Err(err) => {
                            consecutive_failures += 1;
                            warn!(
                                "poll for task {} failed ({}/{}): {}",
                                self.task_id, consecutive_failures,
                                MAX_CONSECUTIVE_POLL_FAILURES, err
                            );
                            if consecutive_failures >= MAX_CONSECUTIVE_POLL_FAILURES {
                                self.deliver_poll_failure(&err);
                                break;
                            }
                        }
                    }
                    // Errors back off exactly like successes.
                    interval = self.schedule.advance(interval);
                }
            }
        }

        self.tracker.remove_task(&self.task_id).await;
    }

    /// Non-blocking status publication. A full channel drops the update,
    /// since status is informational.
    fn publish_status(&self, task: &AgentTask) {
        let update = StatusUpdate {
            task_id: self.task_id.clone(),
            agent_url: self.agent_url.clone(),
            state: task.status.state,
            message: task.status_text(),
            timestamp: Utc::now(),
        };
        if self.channels.status_tx.try_send(update).is_err() {
            debug!("status channel full for task {}, dropping update", self.task_id);
        }
    }

    /// Compose and deliver the terminal result. The result channel is
    /// buffered once, so the single terminal send never blocks.
    fn deliver_result(&self, task: &AgentTask) {
        let state = task.status.state;
        let message = task.status_text().unwrap_or_else(|| match state {
            TaskState::Completed => format!(
                "task completed with {} artifact(s)",
                task.artifacts.len()
            ),
            TaskState::InputRequired => "the agent is waiting for more input".to_string(),
            other => format!("task ended in state {}", other),
        });

        let data = ToolData::TaskResult {
            task_id: self.task_id.clone(),
            agent_url: self.agent_url.clone(),
            state,
            message: message.clone(),
        };

        let result = match state {
            TaskState::Failed | TaskState::Canceled => {
                let mut r = ToolResult::failure(
                    "a2a_submit_task",
                    crate::tools::base::ToolArgs::new(),
                    ToolError::Remote(format!("task {} {}: {}", self.task_id, state, message)),
                );
                r.data = Some(data);
                r
            }
            _ => ToolResult::success(
                "a2a_submit_task",
                crate::tools::base::ToolArgs::new(),
                data,
            ),
        };

        if self.channels.result_tx.try_send(result).is_err() {
            warn!("result channel closed for task {}", self.task_id);
        }
    }

    fn deliver_poll_failure(&self, err: &ToolError) {
        let result = ToolResult::failure(
            "a2a_submit_task",
            crate::tools::base::ToolArgs::new(),
            ToolError::Remote(format!(
                "monitoring for task {} gave up after {} consecutive poll failures: {}",
                self.task_id, MAX_CONSECUTIVE_POLL_FAILURES, err
            )),
        );
        if self.channels.result_tx.try_send(result).is_err() {
            warn!("result channel closed for task {}", self.task_id);
        }
    }
}
