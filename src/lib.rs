//! SceneCraft turns narrated storyboards into rendered math animations.
//!
//! The pipeline is:
//!
//! - Validate an untrusted storyboard document into a [`Storyboard`] ([`validate`])
//! - Compile it into a renderer-agnostic [`CompiledProgram`] ([`compile()`])
//! - Submit the program to a [`JobManager`], which renders it in the background through a
//!   [`RenderBackend`] and streams [`RenderJob`] snapshots to [`Subscription`]s
//!
//! Storyboards can also be requested from a language model through a [`StoryboardAgent`].
#![forbid(unsafe_code)]

mod foundation;

/// Storyboard generation through an external language model.
pub mod agent;
pub(crate) mod compile;
pub(crate) mod jobs;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod schema;

pub use crate::foundation::error::{SceneCraftError, SceneCraftResult};
pub use crate::foundation::ids::{JobId, Slot};

pub use crate::agent::command::{CommandAgent, CommandAgentOpts};
pub use crate::agent::{AgentError, StoryboardAgent, generate_storyboard};
pub use crate::compile::compiler::{DEFAULT_RUN_TIME, compile};
pub use crate::compile::fingerprint::ProgramFingerprint;
pub use crate::compile::program::{CompatNote, CompiledProgram, Instruction, SceneBlock};
pub use crate::jobs::channel::Subscription;
pub use crate::jobs::job::{JobState, RenderJob};
pub use crate::jobs::manager::{JobManager, JobManagerOpts};
pub use crate::render::backend::{
    AbortSignal, BackendCaps, BackendError, JobContext, ProgressReporter, Quality, RenderBackend,
    RenderOptions, SceneContext,
};
pub use crate::render::manim::{ManimBackend, ManimBackendOpts};
pub use crate::scene::color::{Color, PALETTE};
pub use crate::scene::model::{
    Animation, DEFAULT_SCALE, Element, ElementKind, Position, Scene, Storyboard,
    StoryboardSummary,
};
pub use crate::schema::validate::{DEFAULT_ANIMATION_TYPE, ValidationError, validate};
