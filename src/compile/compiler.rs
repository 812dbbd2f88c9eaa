use crate::compile::program::{CompatNote, CompiledProgram, Instruction, SceneBlock};
use crate::foundation::ids::Slot;
use crate::scene::model::{Animation, ElementKind, Scene, Storyboard};

/// Run time of one animation when the scene has room for it, in seconds.
pub const DEFAULT_RUN_TIME: f64 = 1.0;

/// Compile a validated storyboard into per-scene instruction blocks.
///
/// Pure and deterministic. Each element becomes a construct step followed by an animate step;
/// every block ends with a wait for whatever remains of the declared duration.
#[tracing::instrument(skip(storyboard), fields(title = %storyboard.title(), scenes = storyboard.scenes().len()))]
pub fn compile(storyboard: &Storyboard) -> CompiledProgram {
    let mut notes = Vec::new();
    let blocks = storyboard
        .scenes()
        .iter()
        .map(|scene| compile_scene(scene, &mut notes))
        .collect();

    for n in &notes {
        tracing::warn!(
            scene_id = n.scene_id,
            slot = %n.slot,
            element = %n.element,
            animation = %n.animation,
            "{}",
            n.reason
        );
    }

    CompiledProgram {
        title: storyboard.title().to_owned(),
        blocks,
        notes,
    }
}

fn compile_scene(scene: &Scene, notes: &mut Vec<CompatNote>) -> SceneBlock {
    let elements = scene.elements();
    let run_time = run_time_for(scene.duration(), elements.len());

    let mut instructions = Vec::with_capacity(elements.len() * 2 + 1);
    let mut consumed = 0.0f64;
    for (i, el) in elements.iter().enumerate() {
        let slot = Slot(i as u32);
        instructions.push(Instruction::Construct {
            slot,
            element: el.clone(),
            plain_text_fallback: matches!(el.kind, ElementKind::Equation { .. }),
        });
        instructions.push(Instruction::Animate {
            slot,
            animation: el.animation,
            run_time,
        });
        consumed += run_time;

        if let Some(reason) = unusual_pairing(&el.kind, el.animation) {
            notes.push(CompatNote {
                scene_id: scene.scene_id(),
                slot,
                element: el.kind.name().to_owned(),
                animation: el.animation,
                reason: reason.to_owned(),
            });
        }
    }

    // Clamped: a scene whose animations fill it gets a zero-length pause.
    let remaining = (scene.duration() - consumed).max(0.0);
    instructions.push(Instruction::Wait { seconds: remaining });

    SceneBlock {
        scene_id: scene.scene_id(),
        narration: scene.narration().to_owned(),
        duration: scene.duration(),
        instructions,
    }
}

/// Per-animation run time such that `count` sequential animations fit in `duration`.
///
/// The sum is accumulated in the same order callers sum it, so the bound holds exactly in
/// floating point rather than only approximately.
fn run_time_for(duration: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let mut rt = DEFAULT_RUN_TIME.min(duration / count as f64);
    while rt > 0.0 && (0..count).fold(0.0f64, |acc, _| acc + rt) > duration {
        rt = rt.next_down();
    }
    rt
}

/// Pairings the renderer will accept but that rarely do what the storyboard intends.
fn unusual_pairing(kind: &ElementKind, animation: Animation) -> Option<&'static str> {
    match animation {
        Animation::Transform => Some("Transform expects a source and a target; only one element given"),
        Animation::FadeOut => Some("FadeOut used as an entrance leaves the element invisible"),
        Animation::GrowFromCenter if kind.is_textual() => {
            Some("GrowFromCenter on glyphs usually reads better as Write")
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;
