use crate::compile::program::SceneBlock;
use crate::foundation::ids::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What the backend can do, probed once per job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackendCaps {
    /// The backend can typeset mathematical notation. When `false`, equations render as plain
    /// text for the whole job.
    pub typesetting: bool,
}

/// Opaque render quality passed through to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "l")]
    Low,
    #[default]
    #[serde(rename = "m")]
    Medium,
    #[serde(rename = "h")]
    High,
    #[serde(rename = "k")]
    UltraHigh,
}

impl Quality {
    /// Single-letter code (`l`, `m`, `h`, `k`).
    pub fn code(self) -> char {
        match self {
            Quality::Low => 'l',
            Quality::Medium => 'm',
            Quality::High => 'h',
            Quality::UltraHigh => 'k',
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l" => Ok(Quality::Low),
            "m" => Ok(Quality::Medium),
            "h" => Ok(Quality::High),
            "k" => Ok(Quality::UltraHigh),
            other => Err(format!("unknown quality \"{other}\" (expected l, m, h or k)")),
        }
    }
}

/// Per-job render settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub quality: Quality,
    /// Directory that receives the final media file.
    pub output_dir: PathBuf,
    /// Upper bound on every individual backend call. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            output_dir: PathBuf::from("media"),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Job-wide information handed to every backend call.
#[derive(Clone, Debug)]
pub struct JobContext {
    pub job_id: JobId,
    pub title: String,
    pub options: RenderOptions,
    /// Number of scene blocks in the program.
    pub scene_count: usize,
    /// Raised when the manager has given up on the job's current backend call.
    pub abort: AbortSignal,
}

/// One-way flag telling a backend to stop whatever it is running for the job.
///
/// Backends that shell out should poll it and kill their child processes once it is raised.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Scene-local information for [`RenderBackend::render_scene`].
#[derive(Clone)]
pub struct SceneContext {
    /// 0-based position of the block in the program.
    pub index: usize,
    pub progress: ProgressReporter,
}

/// Handle for reporting progress within the current scene.
///
/// Fractions are scene-local (`0.0..=1.0`); the job manager maps them onto job progress.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(f64) + Send + Sync>,
}

impl ProgressReporter {
    /// Wrap a callback receiving clamped scene-local fractions.
    pub fn new(sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Reporter that drops every update.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report that `fraction` of the current scene is done.
    pub fn report(&self, fraction: f64) {
        if fraction.is_finite() {
            (self.sink)(fraction.clamp(0.0, 1.0));
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressReporter")
    }
}

impl fmt::Debug for SceneContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneContext")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Failure reported by (or on behalf of) a rendering backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A tool the backend shells out to is not installed.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// A backend call exceeded the job's timeout.
    #[error("timed out after {}s during {during}", .after.as_secs_f64())]
    Timeout { after: Duration, during: String },

    /// The backend panicked.
    #[error("backend panicked during {0}")]
    Panicked(String),

    /// Any other failure, with a human-readable message.
    #[error("{0}")]
    Failed(String),
}

impl BackendError {
    /// Build a [`BackendError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Build a [`BackendError::MissingDependency`].
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingDependency(what.into())
    }
}

/// External engine that turns compiled scene blocks into media.
///
/// Implementations must be shareable across jobs; each call receives everything it needs.
pub trait RenderBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Capability probe, called once per job before the first scene.
    fn probe(&self) -> Result<BackendCaps, BackendError>;

    /// Render one scene block and return the path of the produced clip.
    fn render_scene(
        &self,
        job: &JobContext,
        scene: &SceneContext,
        block: &SceneBlock,
    ) -> Result<PathBuf, BackendError>;

    /// Combine the scene clips (in program order) into the final media file.
    fn finalize(&self, job: &JobContext, clips: &[PathBuf]) -> Result<PathBuf, BackendError>;

    /// Drop per-job scratch state. Called once after the job's last backend call, whatever the
    /// outcome.
    fn release(&self, job: &JobContext) {
        let _ = job;
    }
}
