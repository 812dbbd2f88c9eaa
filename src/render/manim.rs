use crate::compile::program::SceneBlock;
use crate::render::backend::{
    BackendCaps, BackendError, JobContext, Quality, RenderBackend, SceneContext,
};
use crate::render::ffmpeg::{concat_clips, is_on_path};
use crate::render::process::run_tool;
use crate::render::script::{lower_block, scene_class_name};
use std::path::{Path, PathBuf};
use std::process::Command;

const STDERR_TAIL_LINES: usize = 20;

/// Options for [`ManimBackend`].
#[derive(Clone, Debug)]
pub struct ManimBackendOpts {
    /// `manim` executable.
    pub manim: PathBuf,
    /// Executable whose presence means equations can be typeset.
    pub latex: PathBuf,
    /// `ffmpeg` executable, used to join scene clips.
    pub ffmpeg: PathBuf,
    /// Scratch root; each job renders under `<work_root>/<job_id>`.
    pub work_root: PathBuf,
}

impl Default for ManimBackendOpts {
    fn default() -> Self {
        Self {
            manim: PathBuf::from("manim"),
            latex: PathBuf::from("latex"),
            ffmpeg: PathBuf::from("ffmpeg"),
            work_root: std::env::temp_dir().join("scenecraft"),
        }
    }
}

/// Backend that renders each scene with the Manim community edition CLI.
#[derive(Clone, Debug, Default)]
pub struct ManimBackend {
    opts: ManimBackendOpts,
}

impl ManimBackend {
    /// Create a backend with the given tool locations.
    pub fn new(opts: ManimBackendOpts) -> Self {
        Self { opts }
    }

    fn job_dir(&self, job: &JobContext) -> PathBuf {
        self.opts.work_root.join(job.job_id.to_string())
    }
}

/// Directory name Manim uses for a quality preset.
fn quality_dir(q: Quality) -> &'static str {
    match q {
        Quality::Low => "480p15",
        Quality::Medium => "720p30",
        Quality::High => "1080p60",
        Quality::UltraHigh => "2160p60",
    }
}

impl RenderBackend for ManimBackend {
    fn name(&self) -> &str {
        "manim"
    }

    fn probe(&self) -> Result<BackendCaps, BackendError> {
        if !is_on_path(&self.opts.manim, "--version") {
            return Err(BackendError::missing(format!(
                "{} is required for rendering, but was not found on PATH",
                self.opts.manim.display()
            )));
        }
        Ok(BackendCaps {
            typesetting: is_on_path(&self.opts.latex, "--version"),
        })
    }

    fn render_scene(
        &self,
        job: &JobContext,
        scene: &SceneContext,
        block: &SceneBlock,
    ) -> Result<PathBuf, BackendError> {
        let dir = self.job_dir(job);
        std::fs::create_dir_all(&dir).map_err(|e| {
            BackendError::failed(format!("create work dir '{}': {e}", dir.display()))
        })?;

        let stem = format!("scene_{}", block.scene_id);
        let script = dir.join(format!("{stem}.py"));
        std::fs::write(&script, lower_block(block)).map_err(|e| {
            BackendError::failed(format!("write scene script '{}': {e}", script.display()))
        })?;

        let media_dir = dir.join("media");
        let class = scene_class_name(block.scene_id);
        tracing::debug!(job = %job.job_id, scene_id = block.scene_id, script = %script.display(), "invoking manim");

        let mut cmd = Command::new(&self.opts.manim);
        cmd.arg(format!("-q{}", job.options.quality.code()))
            .args(["--progress_bar", "none", "--media_dir"])
            .arg(&media_dir)
            .args(["-o", &stem])
            .arg(&script)
            .arg(&class);
        let during = format!("scene {}", block.scene_id);
        let output = run_tool(cmd, &during, &job.abort, job.options.timeout)?;

        if !output.status.success() {
            let tail = tail_lines(&output.stderr, STDERR_TAIL_LINES);
            if tail.contains("LaTeX") && tail.contains("not") {
                return Err(BackendError::missing(format!(
                    "LaTeX toolchain failed while typesetting scene {}: {tail}",
                    block.scene_id
                )));
            }
            return Err(BackendError::failed(format!(
                "manim exited with status {} on scene {}: {tail}",
                output.status, block.scene_id
            )));
        }

        let clip = media_dir
            .join("videos")
            .join(&stem)
            .join(quality_dir(job.options.quality))
            .join(format!("{stem}.mp4"));
        if !clip.is_file() {
            return Err(BackendError::failed(format!(
                "manim reported success but produced no clip at '{}'",
                clip.display()
            )));
        }
        scene.progress.report(1.0);
        Ok(clip)
    }

    fn finalize(&self, job: &JobContext, clips: &[PathBuf]) -> Result<PathBuf, BackendError> {
        let out_dir = &job.options.output_dir;
        std::fs::create_dir_all(out_dir).map_err(|e| {
            BackendError::failed(format!("create output dir '{}': {e}", out_dir.display()))
        })?;
        let out = out_dir.join(format!("{}.mp4", job.job_id));

        match clips {
            [] => return Err(BackendError::failed("no scene clips were rendered")),
            [single] => {
                std::fs::copy(single, &out).map_err(|e| {
                    BackendError::failed(format!("copy clip to '{}': {e}", out.display()))
                })?;
            }
            many => concat_clips(
                &self.opts.ffmpeg,
                many,
                &out,
                &job.abort,
                job.options.timeout,
            )?,
        }

        Ok(out)
    }

    fn release(&self, job: &JobContext) {
        remove_work_dir(&self.job_dir(job));
    }
}

fn remove_work_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        tracing::debug!(dir = %dir.display(), error = %e, "could not remove work dir");
    }
}

fn tail_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
