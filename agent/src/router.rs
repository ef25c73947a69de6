//! Routing and delegation.
//!
//! The [`Router`] is a small reasoning loop with cheap tools and a low
//! iteration cap. It answers simple requests itself and hands anything deeper
//! to a specialist loop through the `delegate_research` tool. The specialist's
//! outcome, whatever its status, ends the router's turn unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::info;

use scholar_llm::CompletionClient;
use scholar_protocol::{AgentContext, PaperId, SectionType};
use scholar_store::TranscriptMessage;
use scholar_tools::{
    DataType, ResearchToolkit, Tool, ToolError, ToolHandler, ToolOutput, ToolParam, ToolRegistry,
    ToolSpec,
};

use crate::config::{AgentConfig, RouterConfig};
use crate::error::Result;
use crate::events::AgentEvent;
use crate::react::{ReasoningLoop, RunOutcome};

/// Name of the delegation tool.
pub const DELEGATE_TOOL: &str = "delegate_research";

const ROUTER_INSTRUCTIONS: &str = "You are the front desk of a research assistant. Answer \
greetings, small talk and quick factual lookups yourself, using list_papers or \
semantic_search when needed. For anything that needs reading several passages, analysing \
methods or findings, comparing papers or writing a synthesis, call delegate_research once \
with the task and the best matching mode; its answer is returned to the user as is.";

/// What kind of specialist a delegated task needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Methodology,
    Findings,
    Comparison,
    Synthesis,
    Summary,
    Full,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Methodology,
        Mode::Findings,
        Mode::Comparison,
        Mode::Synthesis,
        Mode::Summary,
        Mode::Full,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Methodology => "methodology",
            Self::Findings => "findings",
            Self::Comparison => "comparison",
            Self::Synthesis => "synthesis",
            Self::Summary => "summary",
            Self::Full => "full",
        }
    }

    /// Parse a mode name. Anything unrecognised is [`Mode::Full`].
    pub fn parse_lenient(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .unwrap_or(Self::Full)
    }

    /// Sections the specialist's search looks at first.
    pub fn preferred_sections(self) -> Vec<SectionType> {
        match self {
            Self::Methodology => vec![SectionType::Methods],
            Self::Findings => vec![
                SectionType::Results,
                SectionType::Discussion,
                SectionType::Conclusion,
            ],
            Self::Summary => vec![SectionType::Abstract, SectionType::Conclusion],
            Self::Comparison | Self::Synthesis | Self::Full => Vec::new(),
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            Self::Methodology => {
                "You are a methodology specialist. Explain how the studies were done: data, \
                 models, experimental setup and evaluation protocol. Cite paper ids."
            }
            Self::Findings => {
                "You are a findings specialist. Report what the papers found, with numbers \
                 where the text gives them, and note limitations. Cite paper ids."
            }
            Self::Comparison => {
                "You are a comparison specialist. Contrast the papers point by point using \
                 compare_papers and targeted searches. Cite paper ids."
            }
            Self::Synthesis => {
                "You are a synthesis specialist. Combine evidence across papers into one \
                 coherent account, flagging agreements and contradictions. Cite paper ids."
            }
            Self::Summary => {
                "You are a summary specialist. Give concise summaries using summarize_paper \
                 and the abstracts. Cite paper ids."
            }
            Self::Full => {
                "You are a research assistant with every tool available. Investigate the \
                 request thoroughly and answer with citations to paper ids."
            }
        }
    }

    /// Tools given to this mode's specialist.
    fn tools(self, toolkit: &ResearchToolkit, top_k: usize) -> Vec<Tool> {
        let mut tools = vec![
            toolkit.semantic_search_preferring(top_k, self.preferred_sections()),
            toolkit.extract_section(),
            toolkit.summarize_paper(),
            toolkit.compare_papers(),
            toolkit.list_papers(),
        ];
        if self == Self::Full {
            tools.push(toolkit.start_ingestion());
            tools.push(toolkit.ingestion_status());
        }
        tools
    }
}

/// Builds a specialist loop for a mode.
#[derive(Clone)]
pub struct Specialists {
    toolkit: ResearchToolkit,
    llm: Arc<dyn CompletionClient>,
    config: AgentConfig,
    top_k: usize,
}

impl Specialists {
    pub fn new(
        toolkit: ResearchToolkit,
        llm: Arc<dyn CompletionClient>,
        config: AgentConfig,
        top_k: usize,
    ) -> Self {
        Self {
            toolkit,
            llm,
            config,
            top_k,
        }
    }

    pub fn build(&self, mode: Mode) -> Result<ReasoningLoop> {
        let registry = ToolRegistry::from_tools(mode.tools(&self.toolkit, self.top_k))?;
        Ok(ReasoningLoop::new(self.llm.clone(), registry)
            .with_config(self.config.clone())
            .with_instructions(mode.instructions()))
    }
}

/// Runs a specialist loop and ends the router's turn with its outcome.
pub struct DelegateResearch {
    specialists: Specialists,
}

#[derive(Deserialize)]
struct DelegateParams {
    task: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    paper_ids: Vec<PaperId>,
}

impl DelegateResearch {
    pub fn tool(specialists: Specialists) -> Tool {
        let modes: Vec<&str> = Mode::ALL.into_iter().map(Mode::as_str).collect();
        let spec = ToolSpec::new()
            .with_param(ToolParam::required(
                "task",
                DataType::String,
                "The research task, stated fully for the specialist.",
            ))
            .with_param(ToolParam::optional(
                "mode",
                DataType::String,
                format!("Specialist to use: {}. Defaults to full.", modes.join(", ")),
            ))
            .with_param(ToolParam::optional(
                "paper_ids",
                DataType::Array,
                "Restrict the specialist to these papers within the current scope.",
            ));

        Tool::new(
            DELEGATE_TOOL,
            "Hand a deep research task to a specialist. The specialist's answer is returned \
             to the user directly.",
            spec,
            Arc::new(Self { specialists }),
        )
    }
}

#[async_trait]
impl ToolHandler for DelegateResearch {
    async fn call(
        &self,
        args: Map<String, Value>,
        context: &AgentContext,
    ) -> scholar_tools::Result<ToolOutput> {
        let params: DelegateParams = serde_json::from_value(Value::Object(args))
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let mode = Mode::parse_lenient(params.mode.as_deref().unwrap_or_default());
        let context = if params.paper_ids.is_empty() {
            context.clone()
        } else {
            context.narrowed_to(&params.paper_ids)
        };

        info!("Delegating to the {} specialist", mode.as_str());
        let specialist = self
            .specialists
            .build(mode)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        let outcome = specialist.run(&params.task, &context).await;
        info!("The {} specialist ended with {}", mode.as_str(), outcome.status);

        let value = serde_json::to_value(&outcome)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolOutput::direct(value))
    }
}

/// Front door of the assistant.
pub struct Router {
    inner: Arc<ReasoningLoop>,
}

impl Router {
    pub fn new(
        toolkit: ResearchToolkit,
        llm: Arc<dyn CompletionClient>,
        config: RouterConfig,
    ) -> Result<Self> {
        let specialists = Specialists::new(
            toolkit.clone(),
            llm.clone(),
            config.specialist.clone(),
            config.specialist_top_k,
        );
        let registry = ToolRegistry::from_tools([
            toolkit.list_papers(),
            toolkit.semantic_search(config.search_top_k),
            DelegateResearch::tool(specialists),
        ])?;
        let router_config = AgentConfig {
            max_iterations: config.max_iterations,
            ..config.specialist
        };

        let inner = ReasoningLoop::new(llm, registry)
            .with_config(router_config)
            .with_instructions(ROUTER_INSTRUCTIONS);
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn reasoning_loop(&self) -> &ReasoningLoop {
        &self.inner
    }

    pub async fn run(&self, message: &str, context: &AgentContext) -> RunOutcome {
        self.inner.run(message, context).await
    }

    pub async fn run_with_history(
        &self,
        message: &str,
        context: &AgentContext,
        history: &[TranscriptMessage],
    ) -> RunOutcome {
        self.inner.run_with_history(message, context, history).await
    }

    pub fn run_streaming(
        &self,
        message: impl Into<String>,
        context: AgentContext,
        history: Vec<TranscriptMessage>,
    ) -> UnboundedReceiverStream<AgentEvent> {
        self.inner.clone().run_streaming(message, context, history)
    }
}
