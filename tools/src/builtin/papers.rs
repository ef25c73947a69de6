use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use scholar_protocol::{AgentContext, Scope};
use scholar_store::PaperCatalog;

use super::parse_args;
use crate::error::Result;
use crate::spec::{DataType, ParamConstraints, ToolParam, ToolSpec};
use crate::tool::{Tool, ToolHandler, ToolOutput};

const DEFAULT_LIMIT: usize = 20;

/// Lists the papers visible in the current scope.
pub struct ListPapers {
    catalog: Arc<dyn PaperCatalog>,
}

#[derive(Deserialize)]
struct Params {
    limit: Option<usize>,
}

impl ListPapers {
    pub fn tool(catalog: Arc<dyn PaperCatalog>) -> Tool {
        let spec = ToolSpec::new().with_param(
            ToolParam::optional("limit", DataType::Integer, "Maximum number of papers to list.")
                .with_default(Value::from(DEFAULT_LIMIT))
                .with_constraints(ParamConstraints::range(1.0, 200.0)),
        );

        Tool::new(
            "list_papers",
            "List the papers in the current scope with their ids, titles and status.",
            spec,
            Arc::new(Self { catalog }),
        )
    }
}

#[async_trait]
impl ToolHandler for ListPapers {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let params: Params = parse_args(args)?;
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

        let mut papers = match context.scope {
            Scope::Project => match context.project_id {
                Some(project_id) => {
                    self.catalog
                        .list_papers(context.user_id, Some(project_id))
                        .await?
                }
                None => Vec::new(),
            },
            Scope::Document | Scope::Selection => {
                let mut papers = self
                    .catalog
                    .list_papers(context.user_id, context.project_id)
                    .await?;
                papers.retain(|p| context.selected_document_ids.contains(&p.id));
                papers
            }
            Scope::Library => self.catalog.list_papers(context.user_id, None).await?,
        };

        let total = papers.len();
        papers.truncate(limit);
        let listed: Vec<Value> = papers
            .iter()
            .map(|p| {
                json!({
                    "paper_id": p.id,
                    "title": p.title,
                    "authors": p.authors,
                    "year": p.year,
                    "status": p.status.to_string(),
                })
            })
            .collect();

        Ok(ToolOutput::new(json!({
            "scope": context.scope.as_str(),
            "total": total,
            "papers": listed,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing;
    use pretty_assertions::assert_eq;

    async fn titles(context: &AgentContext, args: Value) -> Vec<String> {
        let tool = ListPapers::tool(testing::store().await);
        let out = tool
            .handler
            .call(args.as_object().cloned().unwrap(), context)
            .await
            .unwrap();
        out.value["papers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_lists_follow_scope() {
        assert_eq!(
            titles(&AgentContext::library(1), json!({})).await,
            vec!["Attention Study", "CNN Study"]
        );
        assert_eq!(
            titles(&AgentContext::project(1, 2), json!({})).await,
            vec!["CNN Study"]
        );
        assert_eq!(
            titles(&AgentContext::selection(1, vec![10, 30]), json!({})).await,
            vec!["Attention Study"]
        );
        assert!(titles(&AgentContext::library(3), json!({})).await.is_empty());
    }

    #[tokio::test]
    async fn test_limit_truncates_but_reports_total() {
        let tool = ListPapers::tool(testing::store().await);
        let out = tool
            .handler
            .call(
                json!({"limit": 1}).as_object().cloned().unwrap(),
                &AgentContext::library(1),
            )
            .await
            .unwrap();

        assert_eq!(out.value["total"], json!(2));
        assert_eq!(out.value["papers"].as_array().unwrap().len(), 1);
    }
}
