//! Remote document store that proxies operations to tanya-service via HTTP.

use uuid::Uuid;

use crate::application::services::{CorpusAccessor, DocumentStore};
use crate::domain::{Document, DomainError};

use super::{get_service_url, handle_http_error};

/// Document store implementation that proxies all operations to a remote tanya-service
pub struct RemoteDocumentStore {
    base_url: String,
    agent: ureq::Agent,
}

impl RemoteDocumentStore {
    /// Create a new remote store client
    pub fn new(host: &str, port: u16) -> Self {
        let base_url = get_service_url(host, port);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(30))
            .build();

        Self { base_url, agent }
    }

    /// URL of a store route on the service.
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/store/{}", self.base_url, path)
    }

    fn corpus_url(&self, user_id: &str) -> String {
        format!(
            "{}?user_id={}",
            self.api_url("corpus"),
            urlencoding::encode(user_id)
        )
    }
}

impl CorpusAccessor for RemoteDocumentStore {
    fn fetch_documents(&self, user_id: &str) -> Result<Vec<Document>, DomainError> {
        let response = self
            .agent
            .get(&self.corpus_url(user_id))
            .call()
            .map_err(handle_http_error)?;

        response
            .into_json::<Vec<Document>>()
            .map_err(|e| DomainError::storage(format!("Failed to parse corpus response: {}", e)))
    }
}

impl DocumentStore for RemoteDocumentStore {
    fn persist(&self, document: &Document) -> Result<(), DomainError> {
        let url = self.api_url(&format!("documents/{}", document.id));

        self.agent
            .put(&url)
            .send_json(document)
            .map_err(handle_http_error)?;

        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
        let url = self.api_url(&format!("documents/{}", id));

        match self.agent.get(&url).call() {
            Ok(response) => response
                .into_json::<Document>()
                .map(Some)
                .map_err(|e| DomainError::storage(format!("Failed to parse document: {}", e))),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(handle_http_error(err)),
        }
    }

    fn remove(&self, id: Uuid) -> Result<(), DomainError> {
        let url = self.api_url(&format!("documents/{}", id));

        self.agent.delete(&url).call().map_err(handle_http_error)?;

        Ok(())
    }

    fn ping(&self) -> Result<(), DomainError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| DomainError::storage(format!("Health check failed: {}", e)))?;

        if response.status() == 200 {
            Ok(())
        } else {
            Err(DomainError::storage("Remote service is not healthy"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_url_encodes_user() {
        let store = RemoteDocumentStore::new("localhost", 3210);
        assert_eq!(
            store.corpus_url("ann smith"),
            "http://localhost:3210/api/store/corpus?user_id=ann%20smith"
        );
        assert!(store.api_url("documents").contains("localhost:3210"));
    }
}
