//! Per-turn caller context.
//!
//! The caller sets the context once per turn. It decides which documents the
//! retrieval engine may read and it is never taken from model output.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chunk::{PaperId, ProjectId, UserId};
use crate::error::ProtocolError;

/// Argument names owned by the context.
///
/// When tool arguments are merged with the context these keys always take
/// the context's value, whatever the model supplied.
pub const CONTEXT_FIELDS: [&str; 4] = ["user_id", "project_id", "scope", "selected_document_ids"];

/// Which documents a turn may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// A single document.
    Document,
    /// An explicit set of documents.
    Selection,
    /// Every document in one project.
    Project,
    /// Every document the user owns.
    Library,
}

impl Scope {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Selection => "selection",
            Self::Project => "project",
            Self::Library => "library",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" | "paper" => Ok(Self::Document),
            "selection" | "papers" => Ok(Self::Selection),
            "project" => Ok(Self::Project),
            "library" | "all" => Ok(Self::Library),
            other => Err(ProtocolError::UnknownScope(other.to_string())),
        }
    }
}

/// Identity and scope of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContext {
    /// The user the turn runs on behalf of.
    pub user_id: UserId,

    /// Active project, if any.
    #[serde(default)]
    pub project_id: Option<ProjectId>,

    /// Retrieval scope.
    pub scope: Scope,

    /// Documents selected by the caller. `Document` scope reads the first id.
    #[serde(default)]
    pub selected_document_ids: Vec<PaperId>,
}

impl AgentContext {
    /// Context reading the whole library of `user_id`.
    pub fn library(user_id: UserId) -> Self {
        Self {
            user_id,
            project_id: None,
            scope: Scope::Library,
            selected_document_ids: Vec::new(),
        }
    }

    /// Context reading one project.
    pub fn project(user_id: UserId, project_id: ProjectId) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
            scope: Scope::Project,
            selected_document_ids: Vec::new(),
        }
    }

    /// Context reading one document.
    pub fn document(user_id: UserId, paper_id: PaperId) -> Self {
        Self {
            user_id,
            project_id: None,
            scope: Scope::Document,
            selected_document_ids: vec![paper_id],
        }
    }

    /// Context reading an explicit set of documents.
    pub fn selection(user_id: UserId, paper_ids: Vec<PaperId>) -> Self {
        Self {
            user_id,
            project_id: None,
            scope: Scope::Selection,
            selected_document_ids: paper_ids,
        }
    }

    /// Attach a project id without changing the scope.
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// The single document read by `Document` scope.
    pub fn document_id(&self) -> Option<PaperId> {
        self.selected_document_ids.first().copied()
    }

    /// A copy of this context narrowed to a subset of documents.
    ///
    /// Narrowing never widens: ids outside the current selection are dropped
    /// when the context already has a `Document` or `Selection` scope, and a
    /// `Project` context keeps its project id, which a `Selection` also honors.
    pub fn narrowed_to(&self, paper_ids: &[PaperId]) -> Self {
        let (ids, project_id) = match self.scope {
            Scope::Document | Scope::Selection => (
                paper_ids
                    .iter()
                    .copied()
                    .filter(|id| self.selected_document_ids.contains(id))
                    .collect(),
                self.project_id,
            ),
            Scope::Project => (paper_ids.to_vec(), self.project_id),
            Scope::Library => (paper_ids.to_vec(), None),
        };
        Self {
            user_id: self.user_id,
            project_id,
            scope: Scope::Selection,
            selected_document_ids: ids,
        }
    }

    /// Overwrite the context-owned keys of a tool argument object.
    pub fn apply_to(&self, args: &mut Map<String, Value>) {
        args.insert("user_id".to_string(), Value::from(self.user_id));
        args.insert(
            "project_id".to_string(),
            self.project_id.map(Value::from).unwrap_or(Value::Null),
        );
        args.insert("scope".to_string(), Value::from(self.scope.as_str()));
        args.insert(
            "selected_document_ids".to_string(),
            Value::from(self.selected_document_ids.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_apply_overrides_model_supplied_identity() {
        let ctx = AgentContext::project(7, 3);
        let mut args = json!({"query": "x", "user_id": 99, "scope": "library"})
            .as_object()
            .cloned()
            .unwrap();

        ctx.apply_to(&mut args);

        assert_eq!(args["user_id"], json!(7));
        assert_eq!(args["project_id"], json!(3));
        assert_eq!(args["scope"], json!("project"));
        assert_eq!(args["query"], json!("x"));
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("Library".parse::<Scope>().unwrap(), Scope::Library);
        assert!("galaxy".parse::<Scope>().is_err());
    }

    #[test]
    fn test_narrowing_never_widens_a_selection() {
        let ctx = AgentContext::selection(1, vec![10, 20]);
        let narrowed = ctx.narrowed_to(&[20, 30]);
        assert_eq!(narrowed.selected_document_ids, vec![20]);
        assert_eq!(narrowed.scope, Scope::Selection);
    }

    #[test]
    fn test_narrowing_a_project_keeps_the_project() {
        let narrowed = AgentContext::project(1, 5).narrowed_to(&[10]);
        assert_eq!(narrowed.project_id, Some(5));
        assert_eq!(narrowed.selected_document_ids, vec![10]);

        let from_library = AgentContext::library(1).with_project(5).narrowed_to(&[10]);
        assert_eq!(from_library.project_id, None);
    }
}
