//! # Agent
//!
//! The research assistant's control layer:
//!
//! - **Reasoning loop**: asks the model for one decision at a time, runs the
//!   chosen tool and feeds the observation back until it can answer
//! - **Router**: a light loop that answers simple requests and delegates deep
//!   ones to a specialist loop chosen by [`Mode`]
//! - **Assistant**: records each turn in a transcript and replays recent
//!   history into the next one
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Assistant                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  message ──► ┌──────────────┐        ┌──────────────────┐       │
//! │              │    Router    │ ─────► │ delegate_research│       │
//! │              │ (cap 3, light│        └──────────────────┘       │
//! │              │    tools)    │                 │ Mode            │
//! │              └──────────────┘                 ▼                 │
//! │                     │               ┌──────────────────┐        │
//! │                     │               │ Specialist loop  │        │
//! │                     │               │ (ResearchToolkit)│        │
//! │                     │               └──────────────────┘        │
//! │                     ▼                        │ return-direct    │
//! │              RunOutcome ◄────────────────────┘                  │
//! │                     │                                           │
//! │                     └──► TranscriptStore                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each loop iteration goes Thinking → Acting → Observing, and a turn ends in
//! one of the [`RunStatus`] values.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scholar_agent::{Router, RouterConfig};
//!
//! let router = Router::new(toolkit, llm, RouterConfig::default())?;
//! let outcome = router.run("What datasets do these papers use?", &context).await;
//! println!("{}: {}", outcome.status, outcome.message());
//! ```

pub mod assistant;
pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod prompt;
pub mod react;
pub mod router;
pub mod state;

pub use assistant::Assistant;
pub use config::{AgentConfig, RouterConfig};
pub use decision::{Decision, DecisionError, FINAL_ANSWER, parse_decision};
pub use error::{AgentError, Result};
pub use events::AgentEvent;
pub use prompt::PromptBuilder;
pub use react::{ReasoningLoop, RunOutcome, RunStatus};
pub use router::{DELEGATE_TOOL, DelegateResearch, Mode, Router, Specialists};
pub use state::{LoopPhase, LoopState, Step};
