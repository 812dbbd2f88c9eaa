use crate::scene::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validated storyboard: the root document describing a narrated sequence of scenes.
///
/// Values of this type only come out of [`crate::validate`], so every field is already checked
/// and defaulted. Serializing one yields a document that validates back to an equal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Storyboard {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) scenes: Vec<Scene>,
}

impl Storyboard {
    /// Storyboard title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scenes in playback order (never empty).
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }
}

/// One timed segment of narration and animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub(crate) scene_id: u64,
    pub(crate) duration: f64,
    pub(crate) narration: String,
    pub(crate) animation_type: String,
    pub(crate) elements: Vec<Element>,
}

impl Scene {
    /// Unique positive scene id.
    pub fn scene_id(&self) -> u64 {
        self.scene_id
    }

    /// Declared duration in seconds (`> 0`).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Narration text, possibly empty.
    pub fn narration(&self) -> &str {
        &self.narration
    }

    /// Informational animation tag.
    pub fn animation_type(&self) -> &str {
        &self.animation_type
    }

    /// Elements in render order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

/// A visual object placed and animated within a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(flatten)]
    pub kind: ElementKind,
    pub position: Position,
    pub color: Color,
    pub animation: Animation,
    pub scale: f64,
}

impl Element {
    /// Element with every optional field at its default.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            position: Position::ORIGIN,
            color: Color::DEFAULT,
            animation: Animation::DEFAULT,
            scale: DEFAULT_SCALE,
        }
    }
}

/// Scale applied when an element does not specify one.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Closed set of element kinds, each carrying only the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Text {
        content: String,
    },
    Equation {
        content: String,
    },
    Circle,
    Square,
    Arrow,
    Line,
    Axes,
    Graph {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl ElementKind {
    /// Wire names of every kind, in schema order.
    pub const NAMES: [&'static str; 8] = [
        "text", "equation", "circle", "square", "arrow", "line", "axes", "graph",
    ];

    /// Wire name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text { .. } => "text",
            ElementKind::Equation { .. } => "equation",
            ElementKind::Circle => "circle",
            ElementKind::Square => "square",
            ElementKind::Arrow => "arrow",
            ElementKind::Line => "line",
            ElementKind::Axes => "axes",
            ElementKind::Graph { .. } => "graph",
        }
    }

    /// `true` for kinds whose content is rendered as glyphs.
    pub fn is_textual(&self) -> bool {
        matches!(self, ElementKind::Text { .. } | ElementKind::Equation { .. })
    }
}

/// Entrance animation applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    Write,
    FadeIn,
    FadeOut,
    Create,
    Transform,
    GrowFromCenter,
    ShowCreation,
}

impl Animation {
    /// Animation used when an element does not specify one.
    pub const DEFAULT: Animation = Animation::FadeIn;

    /// Every animation, in schema order.
    pub const ALL: [Animation; 7] = [
        Animation::Write,
        Animation::FadeIn,
        Animation::FadeOut,
        Animation::Create,
        Animation::Transform,
        Animation::GrowFromCenter,
        Animation::ShowCreation,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Animation::Write => "Write",
            Animation::FadeIn => "FadeIn",
            Animation::FadeOut => "FadeOut",
            Animation::Create => "Create",
            Animation::Transform => "Transform",
            Animation::GrowFromCenter => "GrowFromCenter",
            Animation::ShowCreation => "ShowCreation",
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Animation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Animation::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Animation::ALL.iter().map(|a| a.as_str()).collect();
                format!("unknown animation \"{s}\" (expected one of {})", names.join(", "))
            })
    }
}

/// Scene-space position `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub [f64; 3]);

impl Position {
    /// The origin.
    pub const ORIGIN: Position = Position([0.0, 0.0, 0.0]);
}

impl Default for Position {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// Overview of a storyboard, shown before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryboardSummary {
    pub title: String,
    pub description: String,
    pub num_scenes: usize,
    /// Sum of declared scene durations, in seconds.
    pub total_duration: f64,
}
