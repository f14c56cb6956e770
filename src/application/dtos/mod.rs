#[cfg(feature = "mcp-server")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{DocumentSummary, SearchResult, Visibility};

/// Payload accepted from the CLI, HTTP clients or MCP tools when storing a
/// document whose text has already been extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDocumentRequest {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub file_type: Option<String>,
    pub project_id: String,
    pub uploaded_by: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// A question about the documents a user can see.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub user_id: String,
    pub query: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Response envelope for ask operations. `result` is empty when the
/// question was blank or there was nothing to ask about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub query: String,
    pub result: Option<SearchResult>,
}

#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsRequest {
    pub user_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub items: Vec<DocumentSummary>,
}

/// Health/readiness report for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub ok: bool,
    pub message: String,
    pub details: Option<String>,
}
