//! Progress reporting and cooperative cancellation

use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Receives progress from a run and tells it when to stop.
///
/// `is_cancelled` is polled before every query submission.
pub trait ProgressSink: Send + Sync {
    /// Begin a sub-task of `total` steps
    fn start_sub_task(&self, total: usize, label: &str);

    /// One step of the current sub-task completed
    fn advance(&self);

    fn is_cancelled(&self) -> bool;

    /// The whole run finished
    fn mark_complete(&self);
}

#[derive(Debug, Default)]
struct SubTaskState {
    label: String,
    total: usize,
    done: usize,
}

/// Progress sink that logs through `tracing`, cancelled through a token
#[derive(Debug)]
pub struct LoggingProgress {
    cancel_token: CancellationToken,
    state: Mutex<SubTaskState>,
    /// Log every n-th step (always logs the last one)
    log_every: usize,
}

impl LoggingProgress {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            state: Mutex::new(SubTaskState::default()),
            log_every: 10,
        }
    }

    pub fn with_log_interval(mut self, log_every: usize) -> Self {
        self.log_every = log_every.max(1);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// (done, total) of the current sub-task
    pub fn position(&self) -> (usize, usize) {
        match self.state.lock() {
            Ok(state) => (state.done, state.total),
            Err(poisoned) => {
                let state = poisoned.into_inner();
                (state.done, state.total)
            }
        }
    }
}

impl ProgressSink for LoggingProgress {
    fn start_sub_task(&self, total: usize, label: &str) {
        if let Ok(mut state) = self.state.lock() {
            *state = SubTaskState {
                label: label.to_string(),
                total,
                done: 0,
            };
        }
        tracing::info!(task = %label, total, "Starting sub-task");
    }

    fn advance(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.done += 1;
        if state.done % self.log_every == 0 || state.done == state.total {
            tracing::info!(
                task = %state.label,
                done = state.done,
                total = state.total,
                "Progress"
            );
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    fn mark_complete(&self) {
        tracing::info!("Analysis complete");
    }
}
