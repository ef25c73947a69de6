//! Decoding the model's decision.
//!
//! The model is asked for one JSON object `{thought, action, action_input}`.
//! Replies often arrive wrapped in a code fence or surrounded by prose, so
//! [`parse_decision`] looks inside the first fence (if any) and decodes the
//! first balanced JSON object it finds. Anything else is a [`DecisionError`];
//! no action is ever guessed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The action name that ends a turn.
pub const FINAL_ANSWER: &str = "Final Answer";

/// Why a reply could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("the reply was empty")]
    Empty,

    #[error("the reply contained no JSON object")]
    NoJson,

    #[error("the reply's JSON was malformed: {0}")]
    InvalidJson(String),

    #[error("the reply named no action")]
    MissingAction,
}

/// One step chosen by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,

    pub action: String,

    #[serde(default)]
    pub action_input: Value,
}

impl Decision {
    /// Whether this decision ends the turn.
    pub fn is_final(&self) -> bool {
        self.action.eq_ignore_ascii_case(FINAL_ANSWER)
    }
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default)]
    thought: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    action_input: Value,
}

/// Decode a model reply into a [`Decision`].
pub fn parse_decision(reply: &str) -> Result<Decision, DecisionError> {
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(DecisionError::Empty);
    }

    let body = fenced_block(reply).unwrap_or(reply);
    let object = first_object(body)
        .or_else(|| first_object(reply))
        .ok_or(DecisionError::NoJson)?;
    let raw: RawDecision =
        serde_json::from_str(object).map_err(|e| DecisionError::InvalidJson(e.to_string()))?;

    let action = raw
        .action
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or(DecisionError::MissingAction)?;

    let mut decision = Decision {
        thought: raw.thought.filter(|t| !t.trim().is_empty()),
        action,
        action_input: raw.action_input,
    };

    // Tool arguments sometimes come back as a JSON-encoded string.
    if !decision.is_final() {
        if let Value::String(s) = &decision.action_input {
            if let Ok(inner @ Value::Object(_)) = serde_json::from_str::<Value>(s) {
                decision.action_input = inner;
            }
        }
    }

    Ok(decision)
}

/// Contents of the first ``` fenced block, without the info string.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// The first balanced `{...}` in `text`, honouring JSON string escapes.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
