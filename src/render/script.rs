//! Lowering of compiled scene blocks into Manim Python scripts.
//!
//! Every string that originates in the storyboard is emitted through [`py_str`], so storyboard
//! content can never escape its literal.

use crate::compile::program::{Instruction, SceneBlock};
use crate::foundation::ids::Slot;
use crate::scene::color::Color;
use crate::scene::model::{Animation, Element, ElementKind};
use std::fmt::Write as _;

const NARRATION_COMMENT_CHARS: usize = 70;

/// Python class name of the scene generated for `scene_id`.
pub(crate) fn scene_class_name(scene_id: u64) -> String {
    format!("Scene{scene_id}")
}

/// Emit a standalone Manim script containing a single scene class for `block`.
pub(crate) fn lower_block(block: &SceneBlock) -> String {
    let mut s = String::new();
    s.push_str("from manim import *\n\n\n");
    let _ = writeln!(s, "class {}(Scene):", scene_class_name(block.scene_id));
    s.push_str("    def construct(self):\n");

    let narration: String = block
        .narration
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(NARRATION_COMMENT_CHARS)
        .collect();
    if !narration.trim().is_empty() {
        let _ = writeln!(s, "        # {}", narration.trim_end());
    }

    let mut emitted = 0usize;
    for ins in &block.instructions {
        match ins {
            Instruction::Construct { slot, element, .. } => {
                lower_construct(&mut s, *slot, element);
                emitted += 1;
            }
            Instruction::Animate {
                slot,
                animation,
                run_time,
            } => {
                let _ = writeln!(
                    s,
                    "        self.play({}({slot}), run_time={})",
                    manim_animation(*animation),
                    py_float(*run_time)
                );
                emitted += 1;
            }
            Instruction::Wait { seconds } if *seconds > 0.0 => {
                let _ = writeln!(s, "        self.wait({})", py_float(*seconds));
                emitted += 1;
            }
            Instruction::Wait { .. } => {}
        }
    }
    if emitted == 0 {
        s.push_str("        pass\n");
    }
    s
}

fn lower_construct(s: &mut String, slot: Slot, el: &Element) {
    match &el.kind {
        ElementKind::Text { content } => {
            let _ = writeln!(s, "        {slot} = Text({})", py_str(content));
        }
        ElementKind::Equation { content } => {
            let _ = writeln!(s, "        {slot} = MathTex({})", py_str(content));
        }
        ElementKind::Circle => {
            let _ = writeln!(s, "        {slot} = Circle()");
        }
        ElementKind::Square => {
            let _ = writeln!(s, "        {slot} = Square()");
        }
        ElementKind::Arrow => {
            let _ = writeln!(s, "        {slot} = Arrow(start=LEFT, end=RIGHT)");
        }
        ElementKind::Line => {
            let _ = writeln!(s, "        {slot} = Line(start=LEFT, end=RIGHT)");
        }
        ElementKind::Axes | ElementKind::Graph { content: None } => {
            let _ = writeln!(s, "        {slot} = Axes()");
        }
        ElementKind::Graph {
            content: Some(label),
        } => {
            let _ = writeln!(s, "        {slot}_axes = Axes()");
            let _ = writeln!(
                s,
                "        {slot} = VGroup({slot}_axes, Text({}).scale(0.5).next_to({slot}_axes, UP))",
                py_str(label)
            );
        }
    }

    match el.color {
        Color::Named(name) => {
            let _ = writeln!(s, "        {slot}.set_color({name})");
        }
        Color::Hex([r, g, b, a]) => {
            let _ = writeln!(s, "        {slot}.set_color(\"#{r:02x}{g:02x}{b:02x}\")");
            if a != 255 {
                let _ = writeln!(
                    s,
                    "        {slot}.set_opacity({})",
                    py_float(f64::from(a) / 255.0)
                );
            }
        }
    }
    let _ = writeln!(s, "        {slot}.scale({})", py_float(el.scale));
    let [x, y, z] = el.position.0;
    let _ = writeln!(
        s,
        "        {slot}.move_to([{}, {}, {}])",
        py_float(x),
        py_float(y),
        py_float(z)
    );
}

fn manim_animation(a: Animation) -> &'static str {
    match a {
        // Manim dropped ShowCreation in favour of Create.
        Animation::ShowCreation | Animation::Create => "Create",
        other => other.as_str(),
    }
}

/// Python string literal. JSON string syntax is a subset of Python's.
fn py_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_owned())
}

fn py_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/script.rs"]
mod tests;
