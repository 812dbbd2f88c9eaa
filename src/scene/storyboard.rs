use crate::foundation::error::{SceneCraftError, SceneCraftResult};
use crate::scene::model::{Storyboard, StoryboardSummary};
use crate::schema::validate::validate;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

impl Storyboard {
    /// Parse and validate a storyboard from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> SceneCraftResult<Self> {
        let raw: serde_json::Value = serde_json::from_reader(r)
            .map_err(|e| SceneCraftError::serde(format!("parse storyboard JSON: {e}")))?;
        Ok(validate(&raw)?)
    }

    /// Parse and validate a storyboard from JSON text.
    pub fn from_json_str(s: &str) -> SceneCraftResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse and validate a storyboard from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> SceneCraftResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SceneCraftError::serde(format!("open storyboard JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Write the storyboard as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> SceneCraftResult<()> {
        write_json_pretty(path.as_ref(), self)
    }

    /// Title, scene count and total declared duration.
    pub fn summary(&self) -> StoryboardSummary {
        StoryboardSummary {
            title: self.title.clone(),
            description: self.description.clone(),
            num_scenes: self.scenes.len(),
            total_duration: self.scenes.iter().map(|s| s.duration).sum(),
        }
    }
}

pub(crate) fn write_json_pretty<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> SceneCraftResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            SceneCraftError::serde(format!("create directory '{}': {e}", parent.display()))
        })?;
    }
    let f = File::create(path)
        .map_err(|e| SceneCraftError::serde(format!("create '{}': {e}", path.display())))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)
        .map_err(|e| SceneCraftError::serde(format!("write '{}': {e}", path.display())))?;
    w.write_all(b"\n")
        .and_then(|_| w.flush())
        .map_err(|e| SceneCraftError::serde(format!("write '{}': {e}", path.display())))
}
