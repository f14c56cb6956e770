use chrono::{DateTime, Utc};
#[cfg(feature = "mcp-server")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who besides the uploader may query a document.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Team,
}

/// An uploaded document together with its extracted text.
///
/// Records are immutable from the query engine's point of view; only
/// `content` feeds relevance scoring and context assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub file_type: String,
    pub file_size: u64,
    pub project_id: String,
    pub uploaded_by: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        file_type: impl Into<String>,
        project_id: impl Into<String>,
        uploaded_by: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: sanitize_single_line(name),
            file_size: content.len() as u64,
            content,
            file_type: normalize_file_type(file_type),
            project_id: sanitize_single_line(project_id),
            uploaded_by: sanitize_single_line(uploaded_by),
            visibility,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` may include this document in a query corpus.
    pub fn visible_to(&self, user_id: &str) -> bool {
        self.uploaded_by == user_id || self.visibility == Visibility::Team
    }

    pub fn as_summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            name: self.name.clone(),
            file_type: self.file_type.clone(),
            file_size: self.file_size,
            project_id: self.project_id.clone(),
            uploaded_by: self.uploaded_by.clone(),
            visibility: self.visibility,
            created_at: self.created_at,
        }
    }
}

/// Lightweight projection used for listings; omits the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub name: String,
    pub file_type: String,
    pub file_size: u64,
    pub project_id: String,
    pub uploaded_by: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// A document the scorer considers a likely source for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub document_id: Uuid,
    pub document_name: String,
    /// Preview of the document, not a proof of relevance.
    pub relevant_text: String,
    pub confidence: f32,
}

/// Outcome of a single question against a corpus. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
}

fn sanitize_single_line(input: impl Into<String>) -> String {
    input
        .into()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn normalize_file_type(input: impl Into<String>) -> String {
    let normalized = input.into().trim().trim_start_matches('.').to_lowercase();
    if normalized.is_empty() {
        "txt".into()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_measures_content_and_trims_metadata() {
        let doc = Document::new(
            "  Budget.txt\nsecond line",
            "Total budget is $5000",
            ".TXT",
            "p1",
            "alice",
            Visibility::Private,
        );

        assert_eq!(doc.name, "Budget.txt");
        assert_eq!(doc.file_type, "txt");
        assert_eq!(doc.file_size, "Total budget is $5000".len() as u64);
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn team_documents_are_visible_to_everyone() {
        let private = Document::new("a", "x", "txt", "p", "alice", Visibility::Private);
        let team = Document::new("b", "y", "txt", "p", "alice", Visibility::Team);

        assert!(private.visible_to("alice"));
        assert!(!private.visible_to("bob"));
        assert!(team.visible_to("bob"));
    }

    #[test]
    fn visibility_serializes_lowercase() {
        let json = serde_json::to_string(&Visibility::Team).unwrap();
        assert_eq!(json, "\"team\"");
    }
}
