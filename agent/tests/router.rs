mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use scholar_agent::{DELEGATE_TOOL, Router, RouterConfig, RunStatus};
use scholar_protocol::AgentContext;
use scholar_tools::ObservationKind;

fn router(fixture: &common::Fixture) -> Router {
    Router::new(
        fixture.toolkit.clone(),
        fixture.llm.clone(),
        RouterConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_simple_request_is_answered_directly() {
    let fixture = common::fixture(&[
        r#"{"action":"Final Answer","action_input":"Hi! Ask me about your papers."}"#,
    ])
    .await;

    let outcome = router(&fixture).run("hello", &AgentContext::library(1)).await;

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.result, Some(json!("Hi! Ask me about your papers.")));
    assert!(outcome.steps.is_empty());
    assert_eq!(fixture.llm.calls().await, 1);
}

#[tokio::test]
async fn test_router_only_sees_light_tools() {
    let fixture = common::fixture(&[r#"{"action":"Final Answer","action_input":"ok"}"#]).await;
    let router = router(&fixture);

    assert_eq!(
        router.reasoning_loop().registry().names(),
        vec!["list_papers", "semantic_search", DELEGATE_TOOL]
    );
    assert_eq!(router.reasoning_loop().config().max_iterations, 3);
}

#[tokio::test]
async fn test_delegated_answer_is_returned_verbatim() {
    let fixture = common::fixture(&[
        r#"{"thought":"needs methods","action":"delegate_research","action_input":{"task":"How was the model trained?","mode":"methodology"}}"#,
        r#"{"action":"semantic_search","action_input":{"query":"how was the model trained"}}"#,
        r#"{"action":"Final Answer","action_input":"Paper 10 trains on the Penn Treebank."}"#,
    ])
    .await;

    let outcome = router(&fixture)
        .run("How was the model trained?", &AgentContext::project(1, 1))
        .await;

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(
        outcome.result,
        Some(json!("Paper 10 trains on the Penn Treebank."))
    );
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].action, DELEGATE_TOOL);
    assert_eq!(fixture.llm.calls().await, 3);

    let requests = fixture.llm.requests().await;
    let specialist_system = requests[1].system_prompt.clone().unwrap_or_default();
    assert!(specialist_system.contains("methodology specialist"));
    assert!(requests[1].prompt.contains("Question: How was the model trained?"));

    let observed = &requests[2].prompt;
    assert!(observed.contains("Penn Treebank"));
    assert!(!observed.contains("95 F1"));
}

#[tokio::test]
async fn test_unknown_mode_gets_every_tool() {
    let fixture = common::fixture(&[
        r#"{"action":"delegate_research","action_input":{"task":"Dig in","mode":"deep-dive"}}"#,
        r#"{"action":"Final Answer","action_input":"dug"}"#,
    ])
    .await;

    let outcome = router(&fixture).run("Dig in", &AgentContext::library(1)).await;

    assert_eq!(outcome.status, RunStatus::Success);
    let requests = fixture.llm.requests().await;
    let specialist_system = requests[1].system_prompt.clone().unwrap_or_default();
    assert!(specialist_system.contains("every tool available"));
    assert!(requests[1].prompt.contains("- start_ingestion:"));
}

#[tokio::test]
async fn test_specialist_failure_reaches_the_caller() {
    let fixture = common::fixture(&[
        r#"{"action":"delegate_research","action_input":{"task":"Explain the setup","mode":"methodology"}}"#,
        "I cannot produce JSON today.",
        r#"{"action":"Final Answer","action_input":"never asked"}"#,
    ])
    .await;

    let outcome = router(&fixture)
        .run("Explain the setup", &AgentContext::project(1, 1))
        .await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.result, None);
    assert!(outcome.summary.contains("could not be understood"));
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].observation.kind, ObservationKind::Success);
    assert_eq!(fixture.llm.calls().await, 2);
}

#[tokio::test]
async fn test_specialist_loop_is_reported_as_a_loop() {
    let fixture = common::fixture(&[
        r#"{"action":"delegate_research","action_input":{"task":"What data?","mode":"findings"}}"#,
        r#"{"action":"semantic_search","action_input":{"query":"dataset"}}"#,
        r#"{"action":"semantic_search","action_input":{"query":"dataset"}}"#,
    ])
    .await;

    let outcome = router(&fixture)
        .run("What data?", &AgentContext::project(1, 1))
        .await;

    assert_eq!(outcome.status, RunStatus::LoopDetected);
    assert!(outcome.summary.contains("stuck repeating `semantic_search`"));
    assert!(outcome.result.is_some());
    assert_eq!(fixture.llm.calls().await, 3);
}

#[tokio::test]
async fn test_paper_ids_narrow_the_specialist() {
    let fixture = common::fixture(&[
        r#"{"action":"delegate_research","action_input":{"task":"What improved?","mode":"findings","paper_ids":[20]}}"#,
        r#"{"action":"semantic_search","action_input":{"query":"accuracy"}}"#,
        r#"{"action":"Final Answer","action_input":"Top-1 accuracy, by two points."}"#,
    ])
    .await;

    let outcome = router(&fixture)
        .run("What improved?", &AgentContext::library(1))
        .await;

    assert_eq!(outcome.status, RunStatus::Success);
    let requests = fixture.llm.requests().await;
    let observed = &requests[2].prompt;
    assert!(observed.contains("Top-1 accuracy"));
    assert!(!observed.contains("95 F1"));
}
