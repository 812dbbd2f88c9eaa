//! Storyboard generation through an external language model.
//!
//! The model is treated as an unreliable collaborator: whatever text it returns goes through
//! [`extract_document`] and then the schema validator, and nothing is invented when it fails.

pub(crate) mod command;
pub(crate) mod extract;
pub(crate) mod prompt;

use crate::foundation::error::SceneCraftResult;
use crate::scene::model::Storyboard;
use crate::schema::validate::validate;
use std::time::Duration;

pub use extract::{extract_document, unwrap_embedded};

/// Failure of the storyboard agent or of its output.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The agent could not be run or exited unsuccessfully.
    #[error("{0}")]
    Command(String),

    /// The agent did not answer in time.
    #[error("agent timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// No JSON object could be found in the agent's answer.
    #[error("no JSON object found in agent output")]
    NoDocument,

    /// Every attempt produced unusable output.
    #[error("no usable storyboard after {attempts} attempt(s); last problem: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// Source of raw storyboard text for a transcript.
pub trait StoryboardAgent: Send + Sync {
    /// Produce storyboard text for `transcript`.
    fn generate(&self, transcript: &str) -> Result<String, AgentError>;

    /// Produce storyboard text again after the previous answer failed with `problem`.
    fn regenerate(&self, transcript: &str, problem: &str) -> Result<String, AgentError> {
        let _ = problem;
        self.generate(transcript)
    }
}

/// Ask `agent` for a storyboard and validate it, retrying on unusable output.
///
/// At most `attempts` answers are requested (at least one). Failures to run the agent are
/// returned at once; only extraction and validation failures are retried.
#[tracing::instrument(skip_all, fields(attempts = attempts))]
pub fn generate_storyboard(
    agent: &dyn StoryboardAgent,
    transcript: &str,
    attempts: usize,
) -> SceneCraftResult<Storyboard> {
    let attempts = attempts.max(1);
    let mut problem: Option<String> = None;
    for attempt in 1..=attempts {
        let raw = match &problem {
            None => agent.generate(transcript)?,
            Some(p) => agent.regenerate(transcript, p)?,
        };
        let outcome = extract_document(&raw)
            .map(unwrap_embedded)
            .map_err(|e| e.to_string())
            .and_then(|doc| validate(&doc).map_err(|e| e.to_string()));
        match outcome {
            Ok(storyboard) => {
                tracing::info!(attempt, scenes = storyboard.scenes().len(), "storyboard generated");
                return Ok(storyboard);
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "agent output rejected");
                problem = Some(e);
            }
        }
    }
    Err(AgentError::Exhausted {
        attempts,
        last: problem.unwrap_or_default(),
    }
    .into())
}

#[cfg(test)]
#[path = "../../tests/unit/agent/generate.rs"]
mod tests;
