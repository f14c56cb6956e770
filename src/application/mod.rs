//! Application layer wiring DTOs and services for Tanya.

pub mod dtos;
pub mod services;

pub use dtos::{
    AskRequest, AskResponse, DocumentListResponse, HealthStatusResponse, ListDocumentsRequest,
    UploadDocumentRequest,
};
pub use services::{LibraryService, QueryService};
