use super::*;
use serde_json::json;

#[test]
fn plain_json_is_taken_as_is() {
    let v = extract_document(r#"  {"title": "T", "scenes": []}  "#).unwrap();
    assert_eq!(v, json!({ "title": "T", "scenes": [] }));
}

#[test]
fn object_is_found_inside_prose_and_fences() {
    let text = "Sure! Here is your storyboard:\n```json\n{\"title\": \"T\", \"scenes\": [{\"scene_id\": 1}]}\n```\nEnjoy.";
    let v = extract_document(text).unwrap();
    assert_eq!(v["scenes"][0]["scene_id"], 1);
}

#[test]
fn braces_inside_strings_do_not_break_the_scan() {
    let text = r#"output: {"title": "sets {a, b}", "note": "close } early", "scenes": []} trailing }"#;
    let v = extract_document(text).unwrap();
    assert_eq!(v["title"], "sets {a, b}");
    assert_eq!(v["note"], "close } early");
}

#[test]
fn unparseable_candidates_are_skipped() {
    let text = "{not json} then {\"title\": \"T\"}";
    assert_eq!(extract_document(text).unwrap(), json!({ "title": "T" }));
}

#[test]
fn json_string_document_is_unwrapped_once() {
    let once = serde_json::to_string(r#"{"title": "T"}"#).unwrap();
    assert_eq!(extract_document(&once).unwrap(), json!({ "title": "T" }));

    let twice = serde_json::to_string(&once).unwrap();
    assert!(extract_document(&twice).is_err());
}

#[test]
fn text_without_an_object_is_an_error() {
    for text in ["", "no json here", "[1, 2, 3]", "{ unclosed", "}{"] {
        assert!(
            matches!(extract_document(text), Err(AgentError::NoDocument)),
            "{text:?}"
        );
    }
}

#[test]
fn embedded_storyboard_replaces_wrapper_and_inherits_meta() {
    let inner = json!({ "scenes": [{ "scene_id": 1, "duration": 2 }, { "scene_id": 2, "duration": 3 }] });
    let wrapper = json!({
        "title": "Outer",
        "description": "outer desc",
        "scenes": [{ "scene_id": 1, "duration": 5, "description": inner.to_string() }]
    });
    let v = unwrap_embedded(wrapper);
    assert_eq!(v["title"], "Outer");
    assert_eq!(v["description"], "outer desc");
    assert_eq!(v["scenes"].as_array().unwrap().len(), 2);
}

#[test]
fn embedded_storyboard_keeps_its_own_title() {
    let inner = json!({ "title": "Inner", "scenes": [] });
    let wrapper = json!({ "title": "Outer", "scenes": [{ "description": inner.to_string() }] });
    assert_eq!(unwrap_embedded(wrapper)["title"], "Inner");
}

#[test]
fn ordinary_documents_are_left_alone() {
    let docs = [
        json!({ "title": "T", "scenes": [{ "scene_id": 1, "description": "just words" }] }),
        json!({ "title": "T", "scenes": [{ "description": "{\"title\": \"no scenes\"}" }] }),
        json!({ "title": "T", "scenes": [{ "scene_id": 1 }, { "scene_id": 2 }] }),
        json!({ "title": "T" }),
    ];
    for doc in docs {
        assert_eq!(unwrap_embedded(doc.clone()), doc);
    }
}

#[test]
fn stray_braces_before_the_document_are_skipped() {
    let text = format!("{} {}", "{ not json".repeat(10), r#"{"title": "T", "scenes": []}"#);
    assert_eq!(extract_document(&text).unwrap()["title"], "T");
}

#[test]
fn output_full_of_unclosed_braces_gives_up() {
    let text = "{".repeat(200_000);
    assert_eq!(extract_document(&text), Err(AgentError::NoDocument));

    let late = format!("{}{}", "{ x ".repeat(MAX_CANDIDATES), r#"{"title": "T"}"#);
    assert_eq!(extract_document(&late), Err(AgentError::NoDocument));
}
