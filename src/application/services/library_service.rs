use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::query_service::CorpusAccessor;
use crate::{
    application::dtos::{DocumentListResponse, HealthStatusResponse, UploadDocumentRequest},
    domain::{Document, DocumentSummary, DomainError},
};

const MAX_CONTENT_BYTES: usize = 2 * 1024 * 1024;
const MAX_NAME_CHARS: usize = 255;

/// Contract for the document store backing the corpus.
pub trait DocumentStore: CorpusAccessor {
    fn persist(&self, document: &Document) -> Result<(), DomainError>;

    fn get(&self, id: Uuid) -> Result<Option<Document>, DomainError>;

    fn remove(&self, id: Uuid) -> Result<(), DomainError>;

    fn ping(&self) -> Result<(), DomainError>;
}

/// Upload and listing operations around the document store.
pub struct LibraryService {
    store: Arc<dyn DocumentStore>,
}

impl LibraryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn upload(&self, payload: UploadDocumentRequest) -> Result<DocumentSummary, DomainError> {
        Self::validate_payload(&payload)?;

        let document = Document::new(
            payload.name,
            payload.content,
            payload.file_type.unwrap_or_default(),
            payload.project_id,
            payload.uploaded_by,
            payload.visibility,
        );
        self.store.persist(&document)?;

        info!(
            target: "tanya::library",
            id = %document.id,
            project = %document.project_id,
            bytes = document.file_size,
            "document stored"
        );

        Ok(document.as_summary())
    }

    /// Delete a document. Only its uploader may do so.
    pub fn remove(&self, user_id: &str, id: Uuid) -> Result<(), DomainError> {
        let document = self
            .store
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("document {id}")))?;

        if document.uploaded_by != user_id.trim() {
            return Err(DomainError::validation(
                "only the uploader may delete a document",
            ));
        }

        self.store.remove(id)
    }

    pub fn list(
        &self,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<DocumentListResponse, DomainError> {
        let documents = self.visible(user_id)?;
        let items = documents
            .iter()
            .filter(|doc| project_id.map_or(true, |p| doc.project_id == p))
            .map(Document::as_summary)
            .collect();

        Ok(DocumentListResponse { items })
    }

    pub fn projects(&self, user_id: &str) -> Result<Vec<String>, DomainError> {
        let unique: BTreeSet<String> = self
            .visible(user_id)?
            .into_iter()
            .map(|doc| doc.project_id)
            .collect();
        Ok(unique.into_iter().collect())
    }

    pub fn health(&self) -> Result<HealthStatusResponse, DomainError> {
        self.store.ping()?;

        Ok(HealthStatusResponse {
            ok: true,
            message: "ready".into(),
            details: Some(format!("checked_at: {}", Utc::now())),
        })
    }

    fn visible(&self, user_id: &str) -> Result<Vec<Document>, DomainError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(DomainError::validation("user id is required"));
        }
        self.store.fetch_documents(user_id)
    }

    fn validate_payload(payload: &UploadDocumentRequest) -> Result<(), DomainError> {
        if payload.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if payload.name.trim().lines().count() > 1 {
            return Err(DomainError::validation("name must be a single line"));
        }
        if payload.name.chars().count() > MAX_NAME_CHARS {
            return Err(DomainError::limit(format!(
                "name cannot exceed {} characters",
                MAX_NAME_CHARS
            )));
        }
        if payload.project_id.trim().is_empty() {
            return Err(DomainError::validation("project is required"));
        }
        if payload.uploaded_by.trim().is_empty() {
            return Err(DomainError::validation("uploader is required"));
        }
        if payload.content.trim().is_empty() {
            return Err(DomainError::validation("content is required"));
        }
        if payload.content.len() > MAX_CONTENT_BYTES {
            return Err(DomainError::limit(format!(
                "content cannot exceed {} bytes",
                MAX_CONTENT_BYTES
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Visibility;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        documents: Mutex<Vec<Document>>,
    }

    impl CorpusAccessor for MemoryStore {
        fn fetch_documents(&self, user_id: &str) -> Result<Vec<Document>, DomainError> {
            let mut docs: Vec<Document> = self
                .documents
                .lock()
                .iter()
                .filter(|doc| doc.visible_to(user_id))
                .cloned()
                .collect();
            docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(docs)
        }
    }

    impl DocumentStore for MemoryStore {
        fn persist(&self, document: &Document) -> Result<(), DomainError> {
            self.documents.lock().push(document.clone());
            Ok(())
        }

        fn get(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
            Ok(self.documents.lock().iter().find(|d| d.id == id).cloned())
        }

        fn remove(&self, id: Uuid) -> Result<(), DomainError> {
            self.documents.lock().retain(|d| d.id != id);
            Ok(())
        }

        fn ping(&self) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn upload(name: &str, project: &str, user: &str, visibility: Visibility) -> UploadDocumentRequest {
        UploadDocumentRequest {
            name: name.into(),
            content: format!("contents of {name}"),
            file_type: Some("txt".into()),
            project_id: project.into(),
            uploaded_by: user.into(),
            visibility,
        }
    }

    fn library() -> LibraryService {
        LibraryService::new(Arc::new(MemoryStore::default()))
    }

    #[test]
    fn upload_rejects_blank_content() {
        let lib = library();
        let mut payload = upload("a.txt", "p1", "alice", Visibility::Private);
        payload.content = "   ".into();

        let err = lib.upload(payload).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn upload_rejects_oversized_content() {
        let lib = library();
        let mut payload = upload("a.txt", "p1", "alice", Visibility::Private);
        payload.content = "x".repeat(MAX_CONTENT_BYTES + 1);

        let err = lib.upload(payload).unwrap_err();
        assert!(matches!(err, DomainError::LimitExceeded(_)));
    }

    #[test]
    fn list_respects_visibility_and_project() {
        let lib = library();
        lib.upload(upload("mine.txt", "p1", "alice", Visibility::Private))
            .unwrap();
        lib.upload(upload("shared.txt", "p2", "bob", Visibility::Team))
            .unwrap();
        lib.upload(upload("hidden.txt", "p1", "bob", Visibility::Private))
            .unwrap();

        let all = lib.list("alice", None).unwrap();
        let mut names: Vec<_> = all.items.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["mine.txt", "shared.txt"]);

        let p1 = lib.list("alice", Some("p1")).unwrap();
        assert_eq!(p1.items.len(), 1);
        assert_eq!(lib.projects("alice").unwrap(), vec!["p1", "p2"]);
    }

    #[test]
    fn only_uploader_can_remove() {
        let lib = library();
        let summary = lib
            .upload(upload("shared.txt", "p1", "bob", Visibility::Team))
            .unwrap();

        assert!(matches!(
            lib.remove("alice", summary.id),
            Err(DomainError::Validation(_))
        ));
        lib.remove("bob", summary.id).unwrap();
        assert!(matches!(
            lib.remove("bob", summary.id),
            Err(DomainError::NotFound(_))
        ));
    }
}
