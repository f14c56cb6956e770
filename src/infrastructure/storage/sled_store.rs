use std::path::Path;

use bincode::Options;
use parking_lot::Mutex;
use sled::{Db, IVec, Tree};
use uuid::Uuid;

use crate::{
    application::services::{CorpusAccessor, DocumentStore},
    domain::{Document, DomainError},
};

const DOCUMENTS_TREE: &str = "documents";
const CACHE_BYTES: u64 = 16 * 1024 * 1024;

/// Embedded document store backed by `sled`.
///
/// Full `Document` payloads live in a single tree keyed by id. Corpus
/// reads scan the tree and apply the visibility rule in memory, which is
/// fine for per-user document libraries.
pub struct SledDocumentStore {
    db: Db,
    documents: Tree,
    write_lock: Mutex<()>,
}

impl SledDocumentStore {
    /// Open the store under `dir`, creating it on first use.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|err| storage_err(&format!("cannot create {}", dir.display()), err))?;

        let db = sled::Config::default()
            .path(dir)
            .cache_capacity(CACHE_BYTES)
            .open()
            .map_err(|err| storage_err("cannot open database", err))?;
        let documents = db
            .open_tree(DOCUMENTS_TREE)
            .map_err(|err| storage_err("cannot open documents tree", err))?;

        Ok(Self {
            db,
            documents,
            write_lock: Mutex::new(()),
        })
    }

    fn codec() -> impl Options {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
    }

    fn encode_document(document: &Document) -> Result<Vec<u8>, DomainError> {
        Self::codec()
            .serialize(document)
            .map_err(|err| storage_err("cannot encode document", err))
    }

    fn key(id: &Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn decode_document(bytes: &IVec) -> Result<Document, DomainError> {
        Self::codec()
            .deserialize(bytes.as_ref())
            .map_err(|err| storage_err("corrupt document record", err))
    }

    fn flush(&self) -> Result<(), DomainError> {
        self.documents
            .flush()
            .map(drop)
            .map_err(|err| storage_err("cannot flush documents", err))
    }
}

fn storage_err(context: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::storage(format!("{context}: {err}"))
}

impl CorpusAccessor for SledDocumentStore {
    fn fetch_documents(&self, user_id: &str) -> Result<Vec<Document>, DomainError> {
        let mut visible: Vec<Document> = Vec::new();

        for entry in self.documents.iter() {
            let (_, value) = entry.map_err(|err| storage_err("cannot scan documents", err))?;
            let document = Self::decode_document(&value)?;

            if document.visible_to(user_id) {
                visible.push(document);
            }
        }

        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(visible)
    }
}

impl DocumentStore for SledDocumentStore {
    fn persist(&self, document: &Document) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock();

        let bytes = Self::encode_document(document)?;
        self.documents
            .insert(Self::key(&document.id), bytes)
            .map_err(|err| storage_err("cannot write document", err))?;

        self.flush()
    }

    fn get(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
        self.documents
            .get(Self::key(&id))
            .map_err(|err| storage_err("cannot read document", err))?
            .map(|value| Self::decode_document(&value))
            .transpose()
    }

    fn remove(&self, id: Uuid) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock();

        let removed = self
            .documents
            .remove(Self::key(&id))
            .map_err(|err| storage_err("cannot delete document", err))?;
        if removed.is_none() {
            return Err(DomainError::not_found(format!("document {id}")));
        }

        self.flush()
    }

    fn ping(&self) -> Result<(), DomainError> {
        self.db
            .flush()
            .map(drop)
            .map_err(|err| storage_err("database is not writable", err))
    }
}
