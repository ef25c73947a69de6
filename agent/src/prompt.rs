//! Prompt assembly for one decision.

use scholar_protocol::{AgentContext, PaperId, Scope};
use scholar_store::{Role, TranscriptMessage};
use scholar_tools::ToolRegistry;

use crate::decision::FINAL_ANSWER;
use crate::state::Step;

const RESPONSE_FORMAT: &str = r#"Reply with exactly one JSON object and nothing else:
{"thought": "<your reasoning>", "action": "<tool name or Final Answer>", "action_input": <arguments object, or your answer>}

Call one tool per reply. When you can answer, use "Final Answer" as the action and put the answer in action_input. Never repeat a call you already made."#;

/// Builds the system prompt and the per-iteration prompt of a loop.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: String,
}

impl PromptBuilder {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Instructions plus the scope of this turn.
    pub fn system_prompt(&self, context: &AgentContext) -> String {
        format!(
            "{}\n\nYou are working with {}.",
            self.instructions,
            describe_scope(context)
        )
    }

    /// Catalogue, conversation history, steps so far, the question and the
    /// reply format, in that order.
    pub fn build(
        &self,
        registry: &ToolRegistry,
        history: &[TranscriptMessage],
        steps: &[Step],
        message: &str,
    ) -> String {
        let mut prompt = String::new();

        if registry.is_empty() {
            prompt.push_str("You have no tools. Answer directly.\n\n");
        } else {
            prompt.push_str("Tools:\n");
            prompt.push_str(&registry.render_catalogue());
            prompt.push_str("\n\n");
        }

        if !history.is_empty() {
            prompt.push_str("Conversation so far:\n");
            for entry in history {
                let speaker = match entry.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                prompt.push_str(&format!("{speaker}: {}\n", entry.content));
            }
            prompt.push('\n');
        }

        if !steps.is_empty() {
            prompt.push_str("Steps taken for this question:\n");
            for (i, step) in steps.iter().enumerate() {
                let n = i + 1;
                if let Some(thought) = &step.thought {
                    prompt.push_str(&format!("Thought {n}: {thought}\n"));
                }
                prompt.push_str(&format!(
                    "Action {n}: {} {}\nObservation {n}: {}\n",
                    step.action, step.action_input, step.observation.content
                ));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("Question: {message}\n\n{RESPONSE_FORMAT}"));
        prompt
    }
}

/// Final-answer-only instructions, used when no other instructions are set.
pub(crate) fn default_instructions() -> String {
    format!(
        "You are a research assistant. Answer the user's question, using tools \
         when they help. Finish with the \"{FINAL_ANSWER}\" action."
    )
}

fn describe_scope(context: &AgentContext) -> String {
    let ids = |ids: &[PaperId]| {
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    match context.scope {
        Scope::Document => match context.document_id() {
            Some(id) => format!("a single paper (id {id})"),
            None => "a single paper that was not specified".to_string(),
        },
        Scope::Selection => format!(
            "a selection of papers (ids {})",
            ids(&context.selected_document_ids)
        ),
        Scope::Project => match context.project_id {
            Some(id) => format!("the papers of project {id}"),
            None => "a project that was not specified".to_string(),
        },
        Scope::Library => "the user's whole library".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scholar_tools::{
        DataType, Observation, ObservationKind, Tool, ToolOutput, ToolParam, ToolSpec,
    };
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let tool = Tool::from_fn(
            "semantic_search",
            "Search passages.",
            ToolSpec::new().with_param(ToolParam::required("query", DataType::String, "Query.")),
            |_, _| async { Ok(ToolOutput::new("ok")) },
        );
        ToolRegistry::from_tools([tool]).unwrap()
    }

    #[test]
    fn test_sections_appear_in_order() {
        let step = Step {
            thought: Some("look it up".to_string()),
            action: "semantic_search".to_string(),
            action_input: json!({"query": "bert"}),
            observation: Observation {
                kind: ObservationKind::Success,
                content: "3 passages".to_string(),
                value: None,
                cache_hit: false,
                return_direct: false,
            },
        };
        let history = [TranscriptMessage::new(Role::User, "earlier question")];

        let prompt = PromptBuilder::new("x").build(&registry(), &history, &[step], "what is bert?");

        let tools = prompt.find("- semantic_search: Search passages.").unwrap();
        let earlier = prompt.find("User: earlier question").unwrap();
        let observed = prompt.find("Observation 1: 3 passages").unwrap();
        let question = prompt.find("Question: what is bert?").unwrap();
        let format = prompt.find("Reply with exactly one JSON object").unwrap();
        assert!(tools < earlier && earlier < observed && observed < question && question < format);
        assert!(prompt.contains(r#"Action 1: semantic_search {"query":"bert"}"#));
    }

    #[test]
    fn test_system_prompt_names_the_scope() {
        let builder = PromptBuilder::new("Be brief.");
        assert_eq!(
            builder.system_prompt(&AgentContext::project(1, 4)),
            "Be brief.\n\nYou are working with the papers of project 4."
        );
        assert!(
            builder
                .system_prompt(&AgentContext::selection(1, vec![3, 5]))
                .ends_with("(ids 3, 5).")
        );
    }
}
