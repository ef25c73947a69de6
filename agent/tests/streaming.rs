mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_stream::StreamExt;

use scholar_agent::{AgentEvent, ReasoningLoop, RunStatus};
use scholar_protocol::AgentContext;
use scholar_tools::{ObservationKind, ToolRegistry};

fn event_name(event: &AgentEvent) -> &'static str {
    match event {
        AgentEvent::Status { .. } => "status",
        AgentEvent::ToolStart { .. } => "tool_start",
        AgentEvent::ToolEnd { .. } => "tool_end",
        AgentEvent::Message { .. } => "message",
        AgentEvent::MessageEnd { .. } => "message_end",
    }
}

#[tokio::test]
async fn test_events_follow_the_turn() {
    let fixture = common::fixture(&[
        r#"{"action":"semantic_search","action_input":{"query":"treebank"}}"#,
        r#"{"action":"Final Answer","action_input":"Penn Treebank"}"#,
    ])
    .await;
    let registry = ToolRegistry::from_tools([fixture.toolkit.semantic_search(3)]).unwrap();
    let agent = Arc::new(ReasoningLoop::new(fixture.llm.clone(), registry));

    let events: Vec<AgentEvent> = agent
        .run_streaming("Which corpus?", AgentContext::project(1, 1), Vec::new())
        .collect()
        .await;

    let names: Vec<&str> = events.iter().map(event_name).collect();
    assert_eq!(
        names,
        vec![
            "status",
            "tool_start",
            "tool_end",
            "status",
            "message",
            "message_end"
        ]
    );

    match &events[1] {
        AgentEvent::ToolStart { tool, input } => {
            assert_eq!(tool, "semantic_search");
            assert_eq!(input, &json!({"query": "treebank"}));
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[2] {
        AgentEvent::ToolEnd {
            kind, cache_hit, ..
        } => {
            assert_eq!(*kind, ObservationKind::Success);
            assert!(!cache_hit);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[4] {
        AgentEvent::Message { content } => assert_eq!(content, "Penn Treebank"),
        other => panic!("unexpected event {other:?}"),
    }
    match &events[5] {
        AgentEvent::MessageEnd { outcome } => {
            assert_eq!(outcome.status, RunStatus::Success);
            assert_eq!(outcome.result, Some(json!("Penn Treebank")));
            assert_eq!(outcome.steps.len(), 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_matches_blocking_run() {
    let replies = [r#"{"action":"Final Answer","action_input":"same either way"}"#];
    let streamed = common::fixture(&replies).await;
    let blocking = common::fixture(&replies).await;
    let context = AgentContext::library(1);

    let streaming_agent = Arc::new(ReasoningLoop::new(streamed.llm.clone(), ToolRegistry::new()));
    let last = streaming_agent
        .run_streaming("q", context.clone(), Vec::new())
        .collect::<Vec<_>>()
        .await
        .pop();

    let outcome = ReasoningLoop::new(blocking.llm.clone(), ToolRegistry::new())
        .run("q", &context)
        .await;

    assert_eq!(last, Some(AgentEvent::MessageEnd { outcome }));
}

#[tokio::test]
async fn test_failures_still_end_the_stream() {
    let fixture = common::fixture(&["not json at all"]).await;
    let agent = Arc::new(ReasoningLoop::new(fixture.llm.clone(), ToolRegistry::new()));

    let events: Vec<AgentEvent> = agent
        .run_streaming("q", AgentContext::library(1), Vec::new())
        .collect()
        .await;

    match events.last() {
        Some(AgentEvent::MessageEnd { outcome }) => {
            assert_eq!(outcome.status, RunStatus::Failed)
        }
        other => panic!("unexpected event {other:?}"),
    }
}
