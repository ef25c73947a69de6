//! Conversation facade over the router.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use scholar_protocol::AgentContext;
use scholar_store::{Role, TranscriptMessage, TranscriptStore};

use crate::error::Result;
use crate::react::RunOutcome;
use crate::router::Router;

/// Runs turns through a [`Router`] and records them in a transcript.
///
/// The user message is appended before the turn runs and the assistant's
/// reply after it, with the status and step count as metadata. Earlier
/// messages of the conversation are fed to the router as history. The
/// [`AgentContext`] is never written to the transcript.
pub struct Assistant {
    router: Router,
    transcripts: Arc<dyn TranscriptStore>,
}

impl Assistant {
    pub fn new(router: Router, transcripts: Arc<dyn TranscriptStore>) -> Self {
        Self {
            router,
            transcripts,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Answer `message` within `conversation_id`.
    pub async fn ask(
        &self,
        conversation_id: &str,
        message: &str,
        context: &AgentContext,
    ) -> Result<RunOutcome> {
        let history = self.transcripts.history(conversation_id).await?;
        debug!(
            "Conversation {conversation_id} has {} earlier messages",
            history.len()
        );
        self.transcripts
            .append(conversation_id, TranscriptMessage::new(Role::User, message))
            .await?;

        let outcome = self
            .router
            .run_with_history(message, context, &history)
            .await;

        let reply = TranscriptMessage::new(Role::Assistant, outcome.message()).with_metadata(json!({
            "status": outcome.status,
            "summary": outcome.summary,
            "steps": outcome.steps.len(),
        }));
        self.transcripts.append(conversation_id, reply).await?;
        Ok(outcome)
    }
}
