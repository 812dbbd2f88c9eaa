//! Rendering backends.
//!
//! The job manager only talks to [`backend::RenderBackend`]; the Manim implementation shells out
//! to `manim` per scene and joins the clips with `ffmpeg`.

pub(crate) mod backend;
pub(crate) mod ffmpeg;
pub(crate) mod manim;
pub(crate) mod process;
pub(crate) mod script;
