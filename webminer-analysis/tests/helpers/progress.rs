//! Recording progress sink with scripted cancellation

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use webminer_analysis::ProgressSink;

/// Records sub-tasks and steps; cancels once `cancel_after` steps are done
#[derive(Debug, Default)]
pub struct RecordingProgress {
    cancel_after: Option<usize>,
    advances: AtomicUsize,
    complete: AtomicBool,
    sub_tasks: Mutex<Vec<(usize, String)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_after(steps: usize) -> Self {
        Self {
            cancel_after: Some(steps),
            ..Self::default()
        }
    }

    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }

    pub fn sub_tasks(&self) -> Vec<(usize, String)> {
        self.sub_tasks.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn start_sub_task(&self, total: usize, label: &str) {
        self.sub_tasks.lock().unwrap().push((total, label.to_string()));
    }

    fn advance(&self) {
        self.advances.fetch_add(1, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after
            .map_or(false, |steps| self.advances() >= steps)
    }

    fn mark_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }
}
