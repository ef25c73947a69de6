//! Candidate resolution.
//!
//! The context picks one store query, so the candidate set is bounded before
//! ranking. The result is then re-checked against the context because the
//! store is a collaborator and may be implemented elsewhere.

use std::collections::HashSet;

use scholar_protocol::{AgentContext, Chunk, Scope, SectionType};
use scholar_store::ChunkStore;
use tracing::debug;

use crate::error::Result;

/// Load the chunks `context` may read, in canonical `(paper_id, order_index,
/// id)` order.
pub async fn resolve_candidates(
    store: &dyn ChunkStore,
    context: &AgentContext,
) -> Result<Vec<Chunk>> {
    let user_id = context.user_id;
    let mut chunks = match context.scope {
        Scope::Document => match context.document_id() {
            Some(paper_id) => {
                let mut chunks = store.chunks_for_paper(user_id, paper_id).await?;
                chunks.retain(|c| c.paper_id == paper_id);
                chunks
            }
            None => Vec::new(),
        },
        Scope::Selection => {
            if context.selected_document_ids.is_empty() {
                Vec::new()
            } else {
                let selected: HashSet<_> = context.selected_document_ids.iter().copied().collect();
                let mut chunks = store
                    .chunks_for_papers(user_id, &context.selected_document_ids)
                    .await?;
                chunks.retain(|c| selected.contains(&c.paper_id));
                if let Some(project_id) = context.project_id {
                    chunks.retain(|c| c.project_id == Some(project_id));
                }
                chunks
            }
        }
        Scope::Project => match context.project_id {
            Some(project_id) => {
                let mut chunks = store.chunks_for_project(user_id, project_id).await?;
                chunks.retain(|c| c.project_id == Some(project_id));
                chunks
            }
            None => Vec::new(),
        },
        Scope::Library => store.chunks_for_owner(user_id).await?,
    };

    chunks.retain(|c| c.owner_id == user_id);
    sort_canonical(&mut chunks);

    debug!(
        "Resolved {} candidates for {} scope of user {user_id}",
        chunks.len(),
        context.scope
    );
    Ok(chunks)
}

/// Keep only chunks whose section is one of `sections`. An empty filter keeps
/// everything; chunks without a section label never match a non-empty filter.
pub fn filter_sections(chunks: &mut Vec<Chunk>, sections: &[SectionType]) {
    if sections.is_empty() {
        return;
    }
    chunks.retain(|c| c.section_type.is_some_and(|s| sections.contains(&s)));
}

fn sort_canonical(chunks: &mut [Chunk]) {
    chunks.sort_by(|a, b| {
        a.paper_id
            .cmp(&b.paper_id)
            .then(a.order_index.cmp(&b.order_index))
            .then_with(|| a.id.cmp(&b.id))
    });
}
