mod common;

use std::sync::Arc;

use blueprint_adapters::Credentials;
use blueprint_pipeline::{
    PipelineError, PipelineInput, PipelineOrchestrator, SpecOverrides, StageName, StageStatus,
};
use blueprint_primitives::OutputType;
use blueprint_spec::create_empty_spec;

use common::{Role, ScriptedCaller, unavailable};

fn analysis_reply() -> String {
    serde_json::json!({
        "version": "9.9",
        "intent": {"primary_goal": "Invite customers to the spring sale", "urgency": "high"},
        "audience": {"primary": "existing customers", "expertise_level": "beginner"},
        "inferred": {"tone": "friendly", "reasoning": {"tone": "retail announcement"}}
    })
    .to_string()
}

fn generation_reply() -> String {
    format!(
        "Here you go:\n```json\n{}\n```",
        serde_json::json!({
            "expanded_prompt": "Write a friendly email inviting customers to the spring sale.",
            "structure_summary": "subject, hook, offer, call to action",
            "key_elements": ["discount code", "end date"]
        })
    )
}

fn orchestrator(caller: &Arc<ScriptedCaller>) -> PipelineOrchestrator {
    PipelineOrchestrator::new(caller.clone(), "test-model", Credentials::new())
}

#[tokio::test]
async fn full_run_records_every_stage() {
    let caller = Arc::new(ScriptedCaller::new(|role, _| match role {
        Role::Analysis => Ok(analysis_reply()),
        _ => Ok(generation_reply()),
    }));
    let input = PipelineInput {
        output_type: Some(OutputType::Email),
        overrides: SpecOverrides {
            tone: Some("professional".into()),
            ..SpecOverrides::default()
        },
        ..PipelineInput::new("write an email about our spring sale")
    };

    let output = orchestrator(&caller).run(&input).await.unwrap();

    assert!(output.spec.is_current_version());
    assert_eq!(output.spec.output_type, OutputType::Email);
    assert_eq!(output.spec.intent.primary_goal, "Invite customers to the spring sale");
    assert_eq!(output.spec.inferred.tone.as_deref(), Some("professional"));
    assert_eq!(
        output.spec.inferred.reasoning.get("tone").map(String::as_str),
        Some("caller override")
    );
    assert!(output.validation.valid);
    assert_eq!(
        output.generated.expanded_prompt,
        "Write a friendly email inviting customers to the spring sale."
    );
    assert_eq!(output.generated.key_elements.len(), 2);

    let stages: Vec<(StageName, StageStatus)> =
        output.stages.iter().map(|s| (s.stage, s.status)).collect();
    assert_eq!(
        stages,
        [
            (StageName::Analysis, StageStatus::Completed),
            (StageName::Overrides, StageStatus::Completed),
            (StageName::Validation, StageStatus::Completed),
            (StageName::Generation, StageStatus::Completed),
            (StageName::Quality, StageStatus::Skipped),
        ]
    );
    assert_eq!(caller.count(Role::Analysis), 1);
}

#[tokio::test]
async fn existing_spec_skips_analysis() {
    let caller = Arc::new(ScriptedCaller::new(|_, _| Ok("Plain prompt text".to_owned())));
    let mut spec = create_empty_spec(OutputType::Article);
    spec.intent.primary_goal = "Explain borrow checking".into();
    let input = PipelineInput {
        existing_spec: Some(spec.clone()),
        ..PipelineInput::new("explain borrow checking")
    };

    let output = orchestrator(&caller).run(&input).await.unwrap();

    assert_eq!(output.stages[0].status, StageStatus::Skipped);
    assert_eq!(output.stages[1].status, StageStatus::Skipped);
    assert_eq!(output.spec, spec);
    assert_eq!(output.generated.expanded_prompt, "Plain prompt text");
    assert_eq!(caller.count(Role::Analysis), 0);
    assert_eq!(caller.calls().len(), 1);
}

#[tokio::test]
async fn invalid_spec_still_generates() {
    let caller = Arc::new(ScriptedCaller::new(|_, _| Ok(generation_reply())));
    let input = PipelineInput {
        existing_spec: Some(create_empty_spec(OutputType::Text)),
        ..PipelineInput::new("")
    };

    let output = orchestrator(&caller).run(&input).await.unwrap();

    assert!(!output.validation.valid);
    assert!(!output.generated.expanded_prompt.is_empty());
}

#[tokio::test]
async fn analysis_only_pins_inferred_output_type() {
    let caller = Arc::new(ScriptedCaller::new(|_, _| Ok(analysis_reply())));

    let spec = orchestrator(&caller)
        .run_analysis_only(&PipelineInput::new("write an email to the team"))
        .await
        .unwrap();

    assert_eq!(spec.output_type, OutputType::Email);
    assert!(spec.is_current_version());
    let (_, request) = &caller.calls()[0];
    assert!(request.json_mode);
    assert!(request.user_prompt.contains("write an email to the team"));
}

#[tokio::test]
async fn generation_only_uses_bound_spec() {
    let caller = Arc::new(ScriptedCaller::new(|_, _| Ok(generation_reply())));
    let mut spec = create_empty_spec(OutputType::Email);
    spec.intent.primary_goal = "Announce the sale".into();

    let generated = orchestrator(&caller)
        .run_generation_only("announce the sale", &spec, &Default::default())
        .await
        .unwrap();

    assert_eq!(generated.structure_summary, "subject, hook, offer, call to action");
    assert_eq!(caller.count(Role::Analysis), 0);
}

#[tokio::test]
async fn model_failure_names_the_stage() {
    let caller = Arc::new(ScriptedCaller::new(|_, _| Err(unavailable())));

    let err = orchestrator(&caller)
        .run(&PipelineInput::new("write an email"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Model { stage: "analysis", .. }));
}
