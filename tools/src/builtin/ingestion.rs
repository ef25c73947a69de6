use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use scholar_protocol::AgentContext;
use scholar_store::{IngestionJob, IngestionRequest, IngestionService};

use super::parse_args;
use crate::error::Result;
use crate::spec::{DataType, ParamConstraints, ToolParam, ToolSpec};
use crate::tool::{Tool, ToolHandler, ToolOutput};

fn describe(job: &IngestionJob) -> Value {
    json!({
        "job_id": job.id,
        "source": job.request.source,
        "status": job.status.to_string(),
        "paper_id": job.paper_id,
        "error": job.error,
        "updated_at": job.updated_at.to_rfc3339(),
    })
}

/// Queues a file for ingestion into the current project.
pub struct StartIngestion {
    service: Arc<dyn IngestionService>,
}

#[derive(Deserialize)]
struct StartParams {
    source: String,
    title: Option<String>,
}

impl StartIngestion {
    pub fn tool(service: Arc<dyn IngestionService>) -> Tool {
        let spec = ToolSpec::new()
            .with_param(
                ToolParam::required("source", DataType::String, "Path or URL of the PDF.")
                    .with_constraints(ParamConstraints::length(1, 2048)),
            )
            .with_param(ToolParam::optional(
                "title",
                DataType::String,
                "Title to record for the paper.",
            ));

        Tool::new(
            "start_ingestion",
            "Queue a paper for ingestion. Returns a job id; processing continues in the \
             background.",
            spec,
            Arc::new(Self { service }),
        )
    }
}

#[async_trait]
impl ToolHandler for StartIngestion {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let params: StartParams = parse_args(args)?;
        let request = IngestionRequest {
            source: params.source,
            title: params.title,
            project_id: context.project_id,
        };

        let job = self.service.start(context.user_id, request).await?;
        Ok(ToolOutput::new(describe(&job)))
    }
}

/// Reports the state of an ingestion job.
pub struct IngestionStatusTool {
    service: Arc<dyn IngestionService>,
}

#[derive(Deserialize)]
struct StatusParams {
    job_id: String,
}

impl IngestionStatusTool {
    pub fn tool(service: Arc<dyn IngestionService>) -> Tool {
        let spec = ToolSpec::new().with_param(ToolParam::required(
            "job_id",
            DataType::String,
            "Job id returned by start_ingestion.",
        ));

        Tool::new(
            "ingestion_status",
            "Check the progress of an ingestion job.",
            spec,
            Arc::new(Self { service }),
        )
    }
}

#[async_trait]
impl ToolHandler for IngestionStatusTool {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let params: StatusParams = parse_args(args)?;
        let job = self.service.status(context.user_id, &params.job_id).await?;
        Ok(ToolOutput::new(describe(&job)))
    }
}
