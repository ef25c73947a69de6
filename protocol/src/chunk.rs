//! Stored text fragments.
//!
//! Chunks are produced by the external ingestion pipeline and are immutable
//! once stored. The core only reads them.

use serde::{Deserialize, Serialize};

/// Identifier of a paper (document).
pub type PaperId = i64;

/// Identifier of a project.
pub type ProjectId = i64;

/// Identifier of a user.
pub type UserId = i64;

/// Identifier of a chunk.
pub type ChunkId = String;

/// A text fragment with its embedding and ownership metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier.
    pub id: ChunkId,

    /// The fragment text.
    pub text: String,

    /// Dense embedding of `text`.
    pub embedding: Vec<f32>,

    /// Owning paper.
    pub paper_id: PaperId,

    /// Owning project, if the paper belongs to one.
    #[serde(default)]
    pub project_id: Option<ProjectId>,

    /// Owning user (tenant).
    pub owner_id: UserId,

    /// Section the fragment was taken from.
    #[serde(default)]
    pub section_type: Option<SectionType>,

    /// Position of the fragment inside its paper.
    #[serde(default)]
    pub order_index: u32,
}

impl Chunk {
    /// Create a chunk with no project or section.
    pub fn new(
        id: impl Into<ChunkId>,
        text: impl Into<String>,
        embedding: Vec<f32>,
        paper_id: PaperId,
        owner_id: UserId,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            paper_id,
            project_id: None,
            owner_id,
            section_type: None,
            order_index: 0,
        }
    }

    /// Set the owning project.
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Set the section label.
    pub fn with_section(mut self, section: SectionType) -> Self {
        self.section_type = Some(section);
        self
    }

    /// Set the position inside the paper.
    pub fn with_order(mut self, order_index: u32) -> Self {
        self.order_index = order_index;
        self
    }
}

/// Section of a paper a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Abstract,
    Introduction,
    RelatedWork,
    Methods,
    Results,
    Discussion,
    Conclusion,
    References,
    Other,
}

impl SectionType {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::Introduction => "introduction",
            Self::RelatedWork => "related_work",
            Self::Methods => "methods",
            Self::Results => "results",
            Self::Discussion => "discussion",
            Self::Conclusion => "conclusion",
            Self::References => "references",
            Self::Other => "other",
        }
    }

    /// Parse a free-form section label.
    ///
    /// Section labels come from an external parser and from the model, so
    /// common synonyms are accepted and anything unrecognised maps to
    /// [`SectionType::Other`].
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "abstract" | "summary" => Self::Abstract,
            "introduction" | "intro" | "background" => Self::Introduction,
            "related_work" | "literature_review" | "prior_work" => Self::RelatedWork,
            "methods" | "method" | "methodology" | "materials_and_methods" | "approach" => {
                Self::Methods
            }
            "results" | "result" | "findings" | "experiments" | "evaluation" => Self::Results,
            "discussion" | "analysis" => Self::Discussion,
            "conclusion" | "conclusions" | "future_work" => Self::Conclusion,
            "references" | "bibliography" => Self::References,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
