use super::*;
use serde_json::json;

#[test]
fn validation_errors_keep_their_path_in_display() {
    let err: SceneCraftError = crate::schema::validate::validate(&json!({ "title": "T" }))
        .unwrap_err()
        .into();
    assert_eq!(err.to_string(), "validation error: scenes: missing required field");
}

#[test]
fn helper_constructors_build_expected_variants() {
    let e = SceneCraftError::compilation("slot e0 constructed twice");
    assert!(matches!(e, SceneCraftError::Compilation(_)));
    assert_eq!(e.to_string(), "compilation error: slot e0 constructed twice");

    let e = SceneCraftError::serde("bad json");
    assert!(matches!(e, SceneCraftError::Serde(_)));
    assert_eq!(e.to_string(), "serialization error: bad json");
}

#[test]
fn job_errors_name_the_job_and_state() {
    let id = JobId::new();
    assert_eq!(
        SceneCraftError::NotFound(id).to_string(),
        format!("job {id} not found")
    );
    let e = SceneCraftError::AlreadyTerminal {
        id,
        state: JobState::Completed,
    };
    assert_eq!(e.to_string(), format!("job {id} is already completed"));
}

#[test]
fn backend_and_agent_errors_convert() {
    let e: SceneCraftError = BackendError::missing("manim").into();
    assert_eq!(e.to_string(), "render backend error: missing dependency: manim");

    let e: SceneCraftError = AgentError::NoDocument.into();
    assert_eq!(
        e.to_string(),
        "agent error: no JSON object found in agent output"
    );
}

#[test]
fn anyhow_errors_are_transparent() {
    let e: SceneCraftError = anyhow::anyhow!("disk on fire").into();
    assert_eq!(e.to_string(), "disk on fire");
}
