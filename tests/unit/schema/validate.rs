use super::*;
use serde_json::json;

fn one_scene(element: Value) -> Value {
    json!({
        "title": "Limits",
        "scenes": [{
            "scene_id": 1,
            "duration": 5,
            "narration": "What is a limit?",
            "elements": [element]
        }]
    })
}

fn err_of(raw: Value) -> ValidationError {
    validate(&raw).expect_err("document should be rejected")
}

#[test]
fn defaults_are_filled_for_missing_optional_fields() {
    let sb = validate(&one_scene(json!({ "type": "text", "content": "hi" }))).unwrap();
    assert_eq!(sb.title(), "Limits");
    assert_eq!(sb.description(), "");

    let scene = &sb.scenes()[0];
    assert_eq!(scene.animation_type(), DEFAULT_ANIMATION_TYPE);
    let el = &scene.elements()[0];
    assert_eq!(
        el.kind,
        ElementKind::Text {
            content: "hi".to_owned()
        }
    );
    assert_eq!(el.position, Position::ORIGIN);
    assert_eq!(el.color, Color::DEFAULT);
    assert_eq!(el.animation, Animation::FadeIn);
    assert_eq!(el.scale, 1.0);
}

#[test]
fn scene_without_elements_is_valid() {
    let sb = validate(&json!({
        "title": "t",
        "scenes": [{ "scene_id": 3, "duration": 1.5 }]
    }))
    .unwrap();
    assert!(sb.scenes()[0].elements().is_empty());
    assert_eq!(sb.scenes()[0].narration(), "");
}

#[test]
fn duplicate_scene_id_names_the_id() {
    let e = err_of(json!({
        "title": "t",
        "scenes": [
            { "scene_id": 7, "duration": 1 },
            { "scene_id": 7, "duration": 2 }
        ]
    }));
    assert_eq!(e.path(), "scenes[1].scene_id");
    assert!(e.message().contains("duplicate scene_id 7"), "{e}");
    assert!(e.message().contains("scenes[0]"), "{e}");
}

#[test]
fn duplicate_scene_id_is_reported_before_later_scene_fields() {
    let e = err_of(json!({
        "title": "t",
        "scenes": [
            { "scene_id": 1, "duration": 1 },
            { "scene_id": 1, "duration": -1, "elements": [{ "type": "hexagon" }] }
        ]
    }));
    assert_eq!(e.path(), "scenes[1].scene_id");
    assert!(e.message().contains("duplicate scene_id 1"), "{e}");
}

#[test]
fn hex_color_with_sign_characters_is_rejected() {
    let e = err_of(one_scene(json!({ "type": "circle", "color": "#+f+f+f" })));
    assert_eq!(e.path(), "scenes[0].elements[0].color");
}

#[test]
fn negative_duration_points_at_the_field() {
    let e = err_of(json!({
        "title": "t",
        "scenes": [
            { "scene_id": 1, "duration": 2 },
            { "scene_id": 2, "duration": -1 }
        ]
    }));
    assert_eq!(e.path(), "scenes[1].duration");
}

#[test]
fn zero_duration_and_non_numeric_duration_are_rejected() {
    let e = err_of(json!({ "title": "t", "scenes": [{ "scene_id": 1, "duration": 0 }] }));
    assert_eq!(e.path(), "scenes[0].duration");
    let e = err_of(json!({ "title": "t", "scenes": [{ "scene_id": 1, "duration": "5" }] }));
    assert_eq!(e.path(), "scenes[0].duration");
}

#[test]
fn scene_id_must_be_a_positive_integer() {
    for bad in [json!(0), json!(-2), json!(1.5), json!("1")] {
        let e = err_of(json!({ "title": "t", "scenes": [{ "scene_id": bad, "duration": 1 }] }));
        assert_eq!(e.path(), "scenes[0].scene_id");
    }
}

#[test]
fn top_level_shape_errors_come_first() {
    assert_eq!(err_of(json!([1, 2])).path(), "");
    assert_eq!(err_of(json!({ "scenes": [] })).path(), "title");
    assert_eq!(err_of(json!({ "title": 3, "scenes": [] })).path(), "title");
    let e = err_of(json!({ "title": "t", "scenes": [] }));
    assert_eq!(e.path(), "scenes");
    assert!(e.message().contains("at least one"));
    assert_eq!(err_of(json!({ "title": "t" })).path(), "scenes");
}

#[test]
fn unknown_type_is_an_error_with_element_path() {
    let e = err_of(one_scene(json!({ "type": "hexagon" })));
    assert_eq!(e.path(), "scenes[0].elements[0].type");
    assert!(e.message().contains("hexagon"));
}

#[test]
fn unknown_animation_is_an_error() {
    let e = err_of(one_scene(
        json!({ "type": "circle", "animation": "Spin" }),
    ));
    assert_eq!(e.path(), "scenes[0].elements[0].animation");
    let e = err_of(one_scene(
        json!({ "type": "circle", "animation": "fadein" }),
    ));
    assert_eq!(e.path(), "scenes[0].elements[0].animation");
}

#[test]
fn position_needs_exactly_three_finite_numbers() {
    let e = err_of(one_scene(json!({ "type": "square", "position": [1, 2] })));
    assert_eq!(e.path(), "scenes[0].elements[0].position");
    let e = err_of(one_scene(
        json!({ "type": "square", "position": [1, "x", 0] }),
    ));
    assert_eq!(e.path(), "scenes[0].elements[0].position[1]");

    let sb = validate(&one_scene(
        json!({ "type": "square", "position": [1, -2.5, 0] }),
    ))
    .unwrap();
    assert_eq!(sb.scenes()[0].elements()[0].position, Position([1.0, -2.5, 0.0]));
}

#[test]
fn color_and_scale_are_type_checked() {
    let e = err_of(one_scene(json!({ "type": "circle", "color": 12 })));
    assert_eq!(e.path(), "scenes[0].elements[0].color");
    let e = err_of(one_scene(json!({ "type": "circle", "color": "chartreuse" })));
    assert_eq!(e.path(), "scenes[0].elements[0].color");
    let e = err_of(one_scene(json!({ "type": "circle", "scale": 0 })));
    assert_eq!(e.path(), "scenes[0].elements[0].scale");
    let e = err_of(one_scene(json!({ "type": "circle", "scale": "big" })));
    assert_eq!(e.path(), "scenes[0].elements[0].scale");
}

#[test]
fn text_and_equation_require_content() {
    let e = err_of(one_scene(json!({ "type": "equation" })));
    assert_eq!(e.path(), "scenes[0].elements[0].content");
    let e = err_of(one_scene(json!({ "type": "text", "content": "   " })));
    assert_eq!(e.path(), "scenes[0].elements[0].content");
}

#[test]
fn shapes_drop_content_and_graph_keeps_expression() {
    let sb = validate(&json!({
        "title": "t",
        "scenes": [{
            "scene_id": 1,
            "duration": 2,
            "elements": [
                { "type": "circle", "content": "ignored" },
                { "type": "graph", "content": "x**2" },
                { "type": "graph", "content": "" }
            ]
        }]
    }))
    .unwrap();
    let els = sb.scenes()[0].elements();
    assert_eq!(els[0].kind, ElementKind::Circle);
    assert_eq!(
        els[1].kind,
        ElementKind::Graph {
            content: Some("x**2".to_owned())
        }
    );
    assert_eq!(els[2].kind, ElementKind::Graph { content: None });
}

#[test]
fn first_violation_wins() {
    // Both the duration of scene 0 and the element type of scene 1 are wrong.
    let e = err_of(json!({
        "title": "t",
        "scenes": [
            { "scene_id": 1, "duration": -3 },
            { "scene_id": 2, "duration": 1, "elements": [{ "type": "blob" }] }
        ]
    }));
    assert_eq!(e.path(), "scenes[0].duration");
}

#[test]
fn display_includes_path_prefix() {
    let e = err_of(one_scene(json!({ "type": "hexagon" })));
    assert!(e.to_string().starts_with("scenes[0].elements[0].type: "));
}

#[test]
fn revalidating_serialized_output_is_a_no_op() {
    let sb = validate(&json!({
        "title": "Derivatives",
        "description": "slopes",
        "scenes": [{
            "scene_id": 4,
            "duration": 6.5,
            "narration": "tangent lines",
            "animation_type": "graph",
            "elements": [
                { "type": "equation", "content": "f'(x)", "color": "yellow", "animation": "Write" },
                { "type": "arrow", "position": [1, 1, 0], "color": "#FF000080", "scale": 0.5 },
                { "type": "graph", "content": "sin(x)" }
            ]
        }]
    }))
    .unwrap();
    let again = validate(&serde_json::to_value(&sb).unwrap()).unwrap();
    assert_eq!(sb, again);
}
