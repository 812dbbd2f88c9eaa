use crate::scene::color::Color;
use crate::scene::model::{
    Animation, DEFAULT_SCALE, Element, ElementKind, Position, Scene, Storyboard,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Tag used for scenes that do not declare an `animation_type`.
pub const DEFAULT_ANIMATION_TYPE: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SchemaPathElem {
    Field(&'static str),
    Index(usize),
}

/// First schema rule a storyboard document violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    path: Vec<SchemaPathElem>,
    message: String,
}

impl ValidationError {
    fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// Dotted path of the offending field, e.g. `scenes[2].elements[0].type`.
    ///
    /// Empty when the document root itself is wrong.
    pub fn path(&self) -> String {
        format_path(&self.path)
    }

    /// Human-readable description of the violated rule.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

impl std::error::Error for ValidationError {}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::new();
    for p in path {
        match *p {
            SchemaPathElem::Field(name) => {
                if !s.is_empty() {
                    s.push('.');
                }
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

type VResult<T> = Result<T, ValidationError>;

/// Validate and normalize an untrusted storyboard document.
///
/// Checks run in document order and stop at the first violation. Absent optional fields are
/// filled with their defaults; nothing is ever repaired.
pub fn validate(raw: &Value) -> VResult<Storyboard> {
    let root = raw
        .as_object()
        .ok_or_else(|| ValidationError::at(&[], "storyboard must be a JSON object"))?;

    let title = required_string(root, &[], "title")?;
    let description = optional_string(root, &[], "description")?.unwrap_or_default();

    let scenes_path = [SchemaPathElem::Field("scenes")];
    let raw_scenes = root
        .get("scenes")
        .ok_or_else(|| ValidationError::at(&scenes_path, "missing required field"))?
        .as_array()
        .ok_or_else(|| ValidationError::at(&scenes_path, "must be an array of scenes"))?;
    if raw_scenes.is_empty() {
        return Err(ValidationError::at(
            &scenes_path,
            "must contain at least one scene",
        ));
    }

    // scene_id -> index of the scene that first used it.
    let mut first_use = HashMap::<u64, usize>::new();
    let mut scenes = Vec::with_capacity(raw_scenes.len());
    for (i, raw_scene) in raw_scenes.iter().enumerate() {
        let path = [scenes_path[0].clone(), SchemaPathElem::Index(i)];
        let scene = validate_scene(raw_scene, &path, i, &mut first_use)?;
        scenes.push(scene);
    }

    Ok(Storyboard {
        title,
        description,
        scenes,
    })
}

fn validate_scene(
    raw: &Value,
    path: &[SchemaPathElem],
    index: usize,
    first_use: &mut HashMap<u64, usize>,
) -> VResult<Scene> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::at(path, "scene must be a JSON object"))?;

    let id_path = child(path, "scene_id");
    let scene_id = match obj.get("scene_id") {
        None => return Err(ValidationError::at(&id_path, "missing required field")),
        Some(v) => v
            .as_u64()
            .filter(|&id| id > 0)
            .ok_or_else(|| ValidationError::at(&id_path, "must be a positive integer"))?,
    };
    if let Some(&first) = first_use.get(&scene_id) {
        return Err(ValidationError::at(
            &id_path,
            format!("duplicate scene_id {scene_id} (already used by scenes[{first}])"),
        ));
    }
    first_use.insert(scene_id, index);

    let duration_path = child(path, "duration");
    let duration = match obj.get("duration") {
        None => return Err(ValidationError::at(&duration_path, "missing required field")),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| ValidationError::at(&duration_path, "must be a number"))?,
    };
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ValidationError::at(
            &duration_path,
            format!("must be a finite number > 0 (got {duration})"),
        ));
    }

    let narration = optional_string(obj, path, "narration")?.unwrap_or_default();
    let animation_type = optional_string(obj, path, "animation_type")?
        .unwrap_or_else(|| DEFAULT_ANIMATION_TYPE.to_owned());

    let elements_path = child(path, "elements");
    let elements = match obj.get("elements") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (j, item) in items.iter().enumerate() {
                let el_path = [elements_path.as_slice(), &[SchemaPathElem::Index(j)]].concat();
                out.push(validate_element(item, &el_path)?);
            }
            out
        }
        Some(_) => {
            return Err(ValidationError::at(
                &elements_path,
                "must be an array of elements",
            ));
        }
    };

    Ok(Scene {
        scene_id,
        duration,
        narration,
        animation_type,
        elements,
    })
}

fn validate_element(raw: &Value, path: &[SchemaPathElem]) -> VResult<Element> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::at(path, "element must be a JSON object"))?;

    let type_path = child(path, "type");
    let type_name = match obj.get("type") {
        None => return Err(ValidationError::at(&type_path, "missing required field")),
        Some(v) => v
            .as_str()
            .ok_or_else(|| ValidationError::at(&type_path, "must be a string"))?,
    };

    let content = optional_string(obj, path, "content")?;
    let content_path = child(path, "content");
    let textual = |content: Option<String>| -> VResult<String> {
        match content {
            None => Err(ValidationError::at(
                &content_path,
                format!("required for {type_name} elements"),
            )),
            Some(c) if c.trim().is_empty() => Err(ValidationError::at(
                &content_path,
                format!("must not be blank for {type_name} elements"),
            )),
            Some(c) => Ok(c),
        }
    };
    let kind = match type_name {
        "text" => ElementKind::Text {
            content: textual(content)?,
        },
        "equation" => ElementKind::Equation {
            content: textual(content)?,
        },
        "circle" => ElementKind::Circle,
        "square" => ElementKind::Square,
        "arrow" => ElementKind::Arrow,
        "line" => ElementKind::Line,
        "axes" => ElementKind::Axes,
        "graph" => ElementKind::Graph {
            content: content.filter(|c| !c.trim().is_empty()),
        },
        other => {
            return Err(ValidationError::at(
                &type_path,
                format!(
                    "unknown element type \"{other}\" (expected one of {})",
                    ElementKind::NAMES.join(", ")
                ),
            ));
        }
    };

    let position = match obj.get("position") {
        None | Some(Value::Null) => Position::ORIGIN,
        Some(v) => parse_position(v, &child(path, "position"))?,
    };

    let color_path = child(path, "color");
    let color = match obj.get("color") {
        None | Some(Value::Null) => Color::DEFAULT,
        Some(Value::String(s)) => s
            .parse::<Color>()
            .map_err(|e| ValidationError::at(&color_path, e))?,
        Some(_) => return Err(ValidationError::at(&color_path, "must be a string")),
    };

    let animation_path = child(path, "animation");
    let animation = match obj.get("animation") {
        None | Some(Value::Null) => Animation::DEFAULT,
        Some(Value::String(s)) => s
            .parse::<Animation>()
            .map_err(|e| ValidationError::at(&animation_path, e))?,
        Some(_) => return Err(ValidationError::at(&animation_path, "must be a string")),
    };

    let scale_path = child(path, "scale");
    let scale = match obj.get("scale") {
        None | Some(Value::Null) => DEFAULT_SCALE,
        Some(v) => {
            let s = v
                .as_f64()
                .ok_or_else(|| ValidationError::at(&scale_path, "must be a number"))?;
            if !s.is_finite() || s <= 0.0 {
                return Err(ValidationError::at(
                    &scale_path,
                    format!("must be a finite number > 0 (got {s})"),
                ));
            }
            s
        }
    };

    Ok(Element {
        kind,
        position,
        color,
        animation,
        scale,
    })
}

fn parse_position(v: &Value, path: &[SchemaPathElem]) -> VResult<Position> {
    let items = v
        .as_array()
        .ok_or_else(|| ValidationError::at(path, "must be an array [x, y, z]"))?;
    if items.len() != 3 {
        return Err(ValidationError::at(
            path,
            format!("must have exactly 3 components (got {})", items.len()),
        ));
    }
    let mut out = [0.0f64; 3];
    for (i, item) in items.iter().enumerate() {
        let x = item.as_f64().filter(|x| x.is_finite()).ok_or_else(|| {
            ValidationError::at(
                &[path, &[SchemaPathElem::Index(i)]].concat(),
                "must be a finite number",
            )
        })?;
        out[i] = x;
    }
    Ok(Position(out))
}

fn child(path: &[SchemaPathElem], field: &'static str) -> Vec<SchemaPathElem> {
    [path, &[SchemaPathElem::Field(field)]].concat()
}

fn required_string(
    obj: &Map<String, Value>,
    path: &[SchemaPathElem],
    field: &'static str,
) -> VResult<String> {
    optional_string(obj, path, field)?
        .ok_or_else(|| ValidationError::at(&child(path, field), "missing required field"))
}

fn optional_string(
    obj: &Map<String, Value>,
    path: &[SchemaPathElem],
    field: &'static str,
) -> VResult<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::at(&child(path, field), "must be a string")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schema/validate.rs"]
mod tests;
