use crate::foundation::ids::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a render job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Snapshot of one render job, as returned by status queries and published to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub job_id: JobId,
    pub state: JobState,
    /// Fraction of work done, in `[0, 1]`.
    pub progress: f64,
    /// Failure message; present only when `state` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final media file; present only when `state` is `Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl RenderJob {
    /// Fresh `Queued` job with zero progress.
    pub fn queued(job_id: JobId) -> Self {
        Self {
            job_id,
            state: JobState::Queued,
            progress: 0.0,
            error: None,
            output_path: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next` if the lifecycle allows it. Returns `false` (and leaves the job untouched)
    /// otherwise.
    pub(crate) fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    /// Raise progress to `p` (clamped). Progress never decreases and is frozen once terminal.
    /// Returns `true` when the value changed.
    pub(crate) fn advance(&mut self, p: f64) -> bool {
        if self.is_terminal() || !p.is_finite() {
            return false;
        }
        let p = p.clamp(0.0, 1.0);
        if p <= self.progress {
            return false;
        }
        self.progress = p;
        true
    }

    pub(crate) fn complete(&mut self, output: PathBuf) -> bool {
        if !self.transition(JobState::Completed) {
            return false;
        }
        self.progress = 1.0;
        self.output_path = Some(output);
        true
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.transition(JobState::Failed) {
            return false;
        }
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "render failed".to_owned();
        }
        self.error = Some(message);
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/job.rs"]
mod tests;
