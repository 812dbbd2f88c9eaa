use crate::agent::AgentError;
use crate::foundation::ids::JobId;
use crate::jobs::job::JobState;
use crate::render::backend::BackendError;
use crate::schema::validate::ValidationError;

/// Crate-wide result alias.
pub type SceneCraftResult<T> = Result<T, SceneCraftError>;

/// Every error the library surfaces to its callers.
#[derive(thiserror::Error, Debug)]
pub enum SceneCraftError {
    /// The storyboard document does not conform to the schema.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A compiled program violated its structural contract.
    #[error("compilation error: {0}")]
    Compilation(String),

    /// The rendering backend failed.
    #[error("render backend error: {0}")]
    Backend(#[from] BackendError),

    /// The storyboard agent failed or produced unusable text.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// No job is registered under the given id.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// The job has already reached a terminal state.
    #[error("job {id} is already {state}")]
    AlreadyTerminal {
        /// Job that was targeted.
        id: JobId,
        /// Terminal state the job is in.
        state: JobState,
    },

    /// Reading or writing a persisted artifact failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SceneCraftError {
    /// Build a [`SceneCraftError::Compilation`].
    pub fn compilation(msg: impl Into<String>) -> Self {
        Self::Compilation(msg.into())
    }

    /// Build a [`SceneCraftError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
