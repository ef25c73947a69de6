//! Scope flags shared by the commands.

use clap::Args;

use scholar_protocol::{AgentContext, PaperId, ProjectId, UserId};

/// Who is asking and what they may read.
#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// User the request runs on behalf of
    #[arg(long, default_value_t = 1, value_name = "ID")]
    pub user: UserId,

    /// Restrict to one project
    #[arg(long, value_name = "ID")]
    pub project: Option<ProjectId>,

    /// Restrict to one paper; repeat for a selection
    #[arg(long = "paper", value_name = "ID")]
    pub papers: Vec<PaperId>,
}

impl ScopeArgs {
    /// One paper reads that document, several read the selection, none read
    /// the project or, without a project, the whole library.
    pub fn to_context(&self) -> AgentContext {
        let context = match (self.papers.as_slice(), self.project) {
            ([], Some(project)) => return AgentContext::project(self.user, project),
            ([], None) => return AgentContext::library(self.user),
            ([paper], _) => AgentContext::document(self.user, *paper),
            (papers, _) => AgentContext::selection(self.user, papers.to_vec()),
        };
        match self.project {
            Some(project) => context.with_project(project),
            None => context,
        }
    }
}
