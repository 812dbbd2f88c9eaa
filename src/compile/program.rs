use crate::compile::fingerprint::{ProgramFingerprint, fingerprint_program};
use crate::foundation::error::{SceneCraftError, SceneCraftResult};
use crate::foundation::ids::Slot;
use crate::scene::model::{Animation, Element, ElementKind};
use crate::scene::storyboard::write_json_pretty;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Renderer-agnostic instruction sequence compiled from a storyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub(crate) title: String,
    pub(crate) blocks: Vec<SceneBlock>,
    #[serde(default)]
    pub(crate) notes: Vec<CompatNote>,
}

/// Instructions for one scene, executed top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBlock {
    pub scene_id: u64,
    pub narration: String,
    /// Declared scene duration in seconds.
    pub duration: f64,
    pub instructions: Vec<Instruction>,
}

/// One renderer step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Build `element` and bind it to `slot`.
    ///
    /// `plain_text_fallback` marks equations that may be rendered as plain text when the backend
    /// cannot typeset.
    Construct {
        slot: Slot,
        element: Element,
        plain_text_fallback: bool,
    },
    /// Play `animation` on the element bound to `slot`.
    Animate {
        slot: Slot,
        animation: Animation,
        run_time: f64,
    },
    /// Hold the frame.
    Wait { seconds: f64 },
}

/// An (element kind, animation) pairing the compiler accepted but considers unusual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatNote {
    pub scene_id: u64,
    pub slot: Slot,
    pub element: String,
    pub animation: Animation,
    pub reason: String,
}

impl CompiledProgram {
    /// Storyboard title the program was compiled from.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Per-scene blocks in playback order.
    pub fn blocks(&self) -> &[SceneBlock] {
        &self.blocks
    }

    /// Unusual pairings flagged during compilation.
    pub fn notes(&self) -> &[CompatNote] {
        &self.notes
    }

    /// Sum of declared scene durations, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.blocks.iter().map(|b| b.duration).sum()
    }

    /// `true` when any construct carries the equation fallback flag.
    pub fn has_equations(&self) -> bool {
        self.blocks.iter().any(|b| {
            b.instructions.iter().any(|i| {
                matches!(
                    i,
                    Instruction::Construct {
                        plain_text_fallback: true,
                        ..
                    }
                )
            })
        })
    }

    /// Stable 128-bit fingerprint of the instruction stream.
    pub fn fingerprint(&self) -> ProgramFingerprint {
        fingerprint_program(self)
    }

    /// Deterministic text dump, one instruction per line.
    pub fn dump(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "CompiledProgram {:?}", self.title);
        let _ = writeln!(s, "blocks: {}", self.blocks.len());
        for (i, block) in self.blocks.iter().enumerate() {
            let _ = writeln!(
                s,
                "  B{i}: scene={} duration={} instructions={}",
                block.scene_id,
                block.duration,
                block.instructions.len()
            );
            for ins in &block.instructions {
                let _ = writeln!(s, "    {}", dump_instruction(ins));
            }
        }
        let _ = writeln!(s, "notes: {}", self.notes.len());
        for n in &self.notes {
            let _ = writeln!(
                s,
                "  scene={} {} {} {}: {}",
                n.scene_id, n.slot, n.element, n.animation, n.reason
            );
        }
        s
    }

    /// Check the structural contract of a program that did not come straight from
    /// [`crate::compile`], e.g. one loaded from disk.
    pub fn check(&self) -> SceneCraftResult<()> {
        if self.blocks.is_empty() {
            return Err(SceneCraftError::compilation("program has no scene blocks"));
        }
        let mut ids = HashSet::new();
        for (bi, block) in self.blocks.iter().enumerate() {
            if !ids.insert(block.scene_id) {
                return Err(SceneCraftError::compilation(format!(
                    "block {bi}: duplicate scene_id {}",
                    block.scene_id
                )));
            }
            if !block.duration.is_finite() || block.duration <= 0.0 {
                return Err(SceneCraftError::compilation(format!(
                    "block {bi}: duration must be finite and > 0"
                )));
            }
            let mut bound = HashSet::new();
            for (ii, ins) in block.instructions.iter().enumerate() {
                match ins {
                    Instruction::Construct { slot, .. } => {
                        if !bound.insert(*slot) {
                            return Err(SceneCraftError::compilation(format!(
                                "block {bi} instruction {ii}: slot {slot} constructed twice"
                            )));
                        }
                    }
                    Instruction::Animate { slot, run_time, .. } => {
                        if !bound.contains(slot) {
                            return Err(SceneCraftError::compilation(format!(
                                "block {bi} instruction {ii}: slot {slot} animated before construction"
                            )));
                        }
                        if !run_time.is_finite() || *run_time < 0.0 {
                            return Err(SceneCraftError::compilation(format!(
                                "block {bi} instruction {ii}: run_time must be finite and >= 0"
                            )));
                        }
                    }
                    Instruction::Wait { seconds } => {
                        if !seconds.is_finite() || *seconds < 0.0 {
                            return Err(SceneCraftError::compilation(format!(
                                "block {bi} instruction {ii}: wait must be finite and >= 0"
                            )));
                        }
                    }
                }
            }
            if block.animation_time() > block.duration {
                return Err(SceneCraftError::compilation(format!(
                    "block {bi}: animations exceed the declared duration"
                )));
            }
        }
        Ok(())
    }

    /// Write the program and its fingerprint as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> SceneCraftResult<()> {
        let doc = PersistedProgram {
            fingerprint: self.fingerprint().to_string(),
            program: self.clone(),
        };
        write_json_pretty(path.as_ref(), &doc)
    }

    /// Load a program written by [`CompiledProgram::save`], verifying fingerprint and structure.
    pub fn from_path(path: impl AsRef<Path>) -> SceneCraftResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SceneCraftError::serde(format!("open program JSON '{}': {e}", path.display()))
        })?;
        let doc: PersistedProgram = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| SceneCraftError::serde(format!("parse program JSON: {e}")))?;
        let actual = doc.program.fingerprint().to_string();
        if actual != doc.fingerprint {
            return Err(SceneCraftError::compilation(format!(
                "fingerprint mismatch: file says {}, program hashes to {actual}",
                doc.fingerprint
            )));
        }
        doc.program.check()?;
        Ok(doc.program)
    }
}

impl SceneBlock {
    /// Total run time of the block's animate steps.
    pub fn animation_time(&self) -> f64 {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Animate { run_time, .. } => Some(*run_time),
                _ => None,
            })
            .sum()
    }

    /// Total wall-clock length: animations plus waits.
    pub fn total_time(&self) -> f64 {
        self.instructions
            .iter()
            .map(|i| match i {
                Instruction::Animate { run_time, .. } => *run_time,
                Instruction::Wait { seconds } => *seconds,
                Instruction::Construct { .. } => 0.0,
            })
            .sum()
    }

    /// Copy of this block with every fallback-flagged equation turned into plain text.
    pub fn with_plain_text_equations(&self) -> SceneBlock {
        let instructions = self
            .instructions
            .iter()
            .map(|ins| match ins {
                Instruction::Construct {
                    slot,
                    element,
                    plain_text_fallback: true,
                } => {
                    let mut element = element.clone();
                    element.kind = match element.kind {
                        ElementKind::Equation { content } => ElementKind::Text { content },
                        other => other,
                    };
                    Instruction::Construct {
                        slot: *slot,
                        element,
                        plain_text_fallback: false,
                    }
                }
                other => other.clone(),
            })
            .collect();
        SceneBlock {
            scene_id: self.scene_id,
            narration: self.narration.clone(),
            duration: self.duration,
            instructions,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedProgram {
    fingerprint: String,
    program: CompiledProgram,
}

fn dump_instruction(ins: &Instruction) -> String {
    match ins {
        Instruction::Construct {
            slot,
            element,
            plain_text_fallback,
        } => {
            let content = match &element.kind {
                ElementKind::Text { content } | ElementKind::Equation { content } => {
                    format!(" {content:?}")
                }
                ElementKind::Graph { content: Some(c) } => format!(" {c:?}"),
                _ => String::new(),
            };
            let [x, y, z] = element.position.0;
            format!(
                "construct {slot} {}{content} pos=[{x}, {y}, {z}] color={} scale={}{}",
                element.kind.name(),
                element.color,
                element.scale,
                if *plain_text_fallback { " fallback" } else { "" }
            )
        }
        Instruction::Animate {
            slot,
            animation,
            run_time,
        } => format!("animate {slot} {animation} run_time={run_time}"),
        Instruction::Wait { seconds } => format!("wait {seconds}"),
    }
}
