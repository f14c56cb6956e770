//! Storage adapters for Tanya.
//!
//! This module currently exposes the embedded sled-backed document store
//! that serves the question-answering corpus and library listings.

pub mod sled_store;

pub use sled_store::SledDocumentStore;
