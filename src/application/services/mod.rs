//! Service layer orchestrating domain operations and infrastructure adapters.

pub mod context_assembler;
mod library_service;
pub mod prompts;
mod query_service;
pub mod relevance;
mod result_slot;

pub use context_assembler::{assemble_context, ContextBudget};
pub use library_service::{DocumentStore, LibraryService};
pub use query_service::{AnswerGenerator, CorpusAccessor, QueryConfig, QueryService};
pub use relevance::{score_sources, ConfidenceMode};
pub use result_slot::ResultSlot;
