pub mod client;
pub mod tracker;
pub mod types;
pub mod worker;

pub use client::A2aClient;
pub use tracker::{AgentTaskTracker, StatusUpdate, TaskChannels, WorkerChannels};
pub use types::{AgentTask, Artifact, Part, TaskState};
pub use worker::{PollSchedule, PollWorker};
