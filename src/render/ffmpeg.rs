use crate::render::backend::{AbortSignal, BackendError};
use crate::render::process::run_tool;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Concatenate same-format clips into `out` with the concat demuxer (stream copy, no re-encode).
///
/// ffmpeg is killed when `abort` is raised or `limit` elapses.
pub(crate) fn concat_clips(
    ffmpeg: &Path,
    clips: &[PathBuf],
    out: &Path,
    abort: &AbortSignal,
    limit: Option<Duration>,
) -> Result<(), BackendError> {
    if clips.is_empty() {
        return Err(BackendError::failed("no clips to concatenate"));
    }
    if !is_on_path(ffmpeg, "-version") {
        return Err(BackendError::missing(format!(
            "{} is required to join scene clips, but was not found on PATH",
            ffmpeg.display()
        )));
    }

    let list_path = out.with_extension("concat.txt");
    let mut list = String::new();
    for clip in clips {
        let abs = std::path::absolute(clip).map_err(|e| {
            BackendError::failed(format!("resolve clip path '{}': {e}", clip.display()))
        })?;
        // concat list syntax: single-quoted, with ' written as '\''
        let quoted = abs.to_string_lossy().replace('\'', "'\\''");
        let _ = writeln!(list, "file '{quoted}'");
    }
    std::fs::write(&list_path, list).map_err(|e| {
        BackendError::failed(format!("write concat list '{}': {e}", list_path.display()))
    })?;

    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy"])
        .arg(out);
    let output = run_tool(cmd, "finalize", abort, limit);
    let _ = std::fs::remove_file(&list_path);
    let output = output?;

    if !output.status.success() {
        return Err(BackendError::failed(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Return `true` when `program` can be invoked (with `probe_arg`) from `PATH`.
pub(crate) fn is_on_path(program: &Path, probe_arg: &str) -> bool {
    Command::new(program)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
