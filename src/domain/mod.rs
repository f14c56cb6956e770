//! Domain layer: core business entities and value objects for Tanya.

pub mod errors;
pub mod models;

pub use errors::DomainError;
pub use models::{Document, DocumentSummary, SearchResult, SourceAttribution, Visibility};
