//! Infrastructure layer wiring concrete adapters (generators, storage, etc).

pub mod generation;
pub mod http_client;
pub mod storage;

pub use generation::{NoOpGenerator, OfflineGenerator, OpenAiCompatibleGenerator};
pub use http_client::{check_service_availability, RemoteDocumentStore};
pub use storage::SledDocumentStore;
