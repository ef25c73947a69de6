mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use scholar_agent::{Assistant, Router, RouterConfig, RunStatus};
use scholar_protocol::AgentContext;
use scholar_store::{FileTranscripts, Role, TranscriptStore};

#[tokio::test]
async fn test_turns_are_recorded_and_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let transcripts = Arc::new(FileTranscripts::open(dir.path()).await.unwrap());
    let fixture = common::fixture(&[
        r#"{"action":"Final Answer","action_input":"You have two papers."}"#,
        r#"{"action":"Final Answer","action_input":"The first is about parsing."}"#,
    ])
    .await;
    let router = Router::new(
        fixture.toolkit.clone(),
        fixture.llm.clone(),
        RouterConfig::default(),
    )
    .unwrap();
    let assistant = Assistant::new(router, transcripts.clone());
    let context = AgentContext::library(1);

    let first = assistant
        .ask("conv-1", "How many papers do I have?", &context)
        .await
        .unwrap();
    let second = assistant
        .ask("conv-1", "What is the first about?", &context)
        .await
        .unwrap();

    assert_eq!(first.status, RunStatus::Success);
    assert_eq!(second.result, Some(json!("The first is about parsing.")));

    let second_prompt = fixture.llm.requests().await[1].prompt.clone();
    assert!(second_prompt.contains("User: How many papers do I have?"));
    assert!(second_prompt.contains("Assistant: You have two papers."));

    let history = transcripts.history("conv-1").await.unwrap();
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(history[1].metadata["status"], json!("success"));
    assert_eq!(history[1].metadata["steps"], json!(0));
}

#[tokio::test]
async fn test_conversations_are_separate() {
    let dir = tempfile::tempdir().unwrap();
    let transcripts = Arc::new(FileTranscripts::open(dir.path()).await.unwrap());
    let fixture = common::fixture(&[
        r#"{"action":"Final Answer","action_input":"one"}"#,
        r#"{"action":"Final Answer","action_input":"two"}"#,
    ])
    .await;
    let router = Router::new(
        fixture.toolkit.clone(),
        fixture.llm.clone(),
        RouterConfig::default(),
    )
    .unwrap();
    let assistant = Assistant::new(router, transcripts.clone());
    let context = AgentContext::library(1);

    assistant.ask("a", "first question", &context).await.unwrap();
    assistant.ask("b", "second question", &context).await.unwrap();

    let second_prompt = fixture.llm.requests().await[1].prompt.clone();
    assert!(!second_prompt.contains("first question"));
    assert_eq!(transcripts.history("b").await.unwrap().len(), 2);
}
