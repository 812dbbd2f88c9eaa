use crate::compile::program::{CompiledProgram, Instruction};
use crate::scene::model::{Element, ElementKind};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5c3e_1a0d_9b27_f463;

/// Stable program fingerprint, used to tag persisted programs and render logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramFingerprint {
    pub(crate) hi: u64,
    pub(crate) lo: u64,
}

impl fmt::Display for ProgramFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

/// Hash every instruction in order. Compatibility notes are derived data and are not hashed.
pub(crate) fn fingerprint_program(program: &CompiledProgram) -> ProgramFingerprint {
    let mut h = StableHasher::new();
    h.write_str(&program.title);
    h.write_u64(program.blocks.len() as u64);
    for block in &program.blocks {
        h.write_u64(block.scene_id);
        h.write_f64(block.duration);
        h.write_str(&block.narration);
        h.write_u64(block.instructions.len() as u64);
        for ins in &block.instructions {
            match ins {
                Instruction::Construct {
                    slot,
                    element,
                    plain_text_fallback,
                } => {
                    h.write_u8(0);
                    h.write_u32(slot.0);
                    write_element(&mut h, element);
                    h.write_bool(*plain_text_fallback);
                }
                Instruction::Animate {
                    slot,
                    animation,
                    run_time,
                } => {
                    h.write_u8(1);
                    h.write_u32(slot.0);
                    h.write_str(animation.as_str());
                    h.write_f64(*run_time);
                }
                Instruction::Wait { seconds } => {
                    h.write_u8(2);
                    h.write_f64(*seconds);
                }
            }
        }
    }
    h.finish()
}

fn write_element(h: &mut StableHasher, el: &Element) {
    h.write_str(el.kind.name());
    match &el.kind {
        ElementKind::Text { content } | ElementKind::Equation { content } => {
            h.write_str(content)
        }
        ElementKind::Graph { content } => match content {
            Some(c) => {
                h.write_bool(true);
                h.write_str(c);
            }
            None => h.write_bool(false),
        },
        ElementKind::Circle
        | ElementKind::Square
        | ElementKind::Arrow
        | ElementKind::Line
        | ElementKind::Axes => {}
    }
    for v in el.position.0 {
        h.write_f64(v);
    }
    h.write_str(&el.color.to_string());
    h.write_str(el.animation.as_str());
    h.write_f64(el.scale);
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    // Length-prefixed so adjacent strings cannot alias.
    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> ProgramFingerprint {
        let v = self.inner.digest128();
        ProgramFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}
