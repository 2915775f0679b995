use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::ToolError;

/// Sliding-window rate limiter for computer-use actions.
///
/// Admission rule: an action is admitted iff the number of recorded
/// timestamps strictly within `(now - window, now]` is below `max_actions`.
/// On admission the current instant is recorded. Callers are serialized by
/// the internal mutex.
pub struct ActionRateLimiter {
    window: Duration,
    max_actions: usize,
    recorded: Mutex<VecDeque<Instant>>,
}

impl ActionRateLimiter {
    pub fn new(window: Duration, max_actions: usize) -> Self {
        Self {
            window,
            max_actions,
            recorded: Mutex::new(VecDeque::new()),
        }
    }

    /// Admit or reject `action`. Rejection reports the live window count so
    /// the model can see how saturated the bucket is.
    pub fn check_and_record(&self, action: &str) -> Result<(), ToolError> {
        let now = Instant::now();
        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self::evict_expired(&mut recorded, now, self.window);

        if recorded.len() >= self.max_actions {
            return Err(ToolError::Validation(format!(
                "rate limited: action '{}' rejected, {} of {} actions used in the last {}s",
                action,
                recorded.len(),
                self.max_actions,
                self.window.as_secs()
            )));
        }
        recorded.push_back(now);
        Ok(())
    }

    /// Number of admissions currently inside the window.
    pub fn window_count(&self) -> usize {
        let now = Instant::now();
        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self::evict_expired(&mut recorded, now, self.window);
        recorded.len()
    }

    /// Clear all recorded history.
    pub fn reset(&self) {
        self.recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    fn evict_expired(recorded: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        // Timestamps are recorded in order, so expired entries are at the front.
        while let Some(front) = recorded.front() {
            if now.duration_since(*front) >= window {
                recorded.pop_front();
            } else {
                break;
            }
        }
    }
}
