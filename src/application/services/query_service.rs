use std::sync::Arc;

use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context_assembler::{assemble_with_budget, ContextBudget};
use super::prompts::{build_answer_prompt, DEFAULT_MAX_TOKENS};
use super::relevance::{matched_tokens, query_tokens, score_sources, ConfidenceMode};
use super::result_slot::ResultSlot;
use crate::domain::{Document, DomainError, SearchResult};

/// Tunables for the question-answering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    pub max_tokens: u32,
    pub context_budget: ContextBudget,
    pub confidence: ConfidenceMode,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            context_budget: ContextBudget::unbounded(),
            confidence: ConfidenceMode::Fixed,
        }
    }
}

impl QueryConfig {
    pub fn new(max_tokens: u32, context_budget: ContextBudget, confidence: ConfidenceMode) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
            context_budget,
            confidence,
        }
    }
}

/// Free-form text generation backend (hosted LLM, offline stub, ...).
///
/// One call per question, no streaming. Implementations block; the query
/// service moves them off the async executor.
pub trait AnswerGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, DomainError>;
}

/// Read access to the documents a user may ask about.
///
/// Documents come back most-recently-created first.
pub trait CorpusAccessor: Send + Sync {
    fn fetch_documents(&self, user_id: &str) -> Result<Vec<Document>, DomainError>;
}

/// The orchestrator: validate, assemble context, generate, score sources.
pub struct QueryService {
    generator: Arc<dyn AnswerGenerator>,
    corpus: Arc<dyn CorpusAccessor>,
    latest: ResultSlot,
    config: QueryConfig,
}

impl QueryService {
    pub fn new(
        generator: Arc<dyn AnswerGenerator>,
        corpus: Arc<dyn CorpusAccessor>,
        config: QueryConfig,
    ) -> Self {
        Self {
            generator,
            corpus,
            latest: ResultSlot::new(),
            config,
        }
    }

    pub fn config(&self) -> QueryConfig {
        self.config
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Most recent successful answer produced by this service.
    pub fn latest(&self) -> Option<Arc<SearchResult>> {
        self.latest.latest()
    }

    /// Answer `query` against `documents`.
    ///
    /// Returns `Ok(None)` without calling the generator when the query is
    /// blank or the corpus is empty.
    pub async fn search(
        &self,
        query: &str,
        documents: &[Document],
    ) -> Result<Option<Arc<SearchResult>>, DomainError> {
        self.search_cancellable(query, documents, &CancellationToken::new())
            .await
    }

    /// Same as [`search`](Self::search), abandoned once `cancel` fires.
    ///
    /// A cancelled or failed query leaves the latest result untouched.
    pub async fn search_cancellable(
        &self,
        query: &str,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<SearchResult>>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            debug!(target: "tanya::query", "blank query ignored");
            return Ok(None);
        }
        if documents.is_empty() {
            debug!(target: "tanya::query", "empty corpus, nothing to ask");
            return Ok(None);
        }

        let tokens = query_tokens(query);
        let context = assemble_with_budget(documents, self.config.context_budget, |doc| {
            matched_tokens(&tokens, doc) > 0
        });
        if context.included == 0 {
            warn!(
                target: "tanya::query",
                skipped = context.skipped,
                "no document fits the context budget, nothing to ask"
            );
            return Ok(None);
        }
        if context.skipped > 0 {
            warn!(
                target: "tanya::query",
                included = context.included,
                skipped = context.skipped,
                "context budget dropped documents"
            );
        }

        let prompt = build_answer_prompt(query, &context.text);
        let generator = Arc::clone(&self.generator);
        let max_tokens = self.config.max_tokens;

        debug!(
            target: "tanya::query",
            generator = generator.name(),
            documents = documents.len(),
            prompt_chars = prompt.len(),
            "requesting answer"
        );

        let answer = run_blocking(cancel, move || generator.generate(&prompt, max_tokens))
            .await
            .inspect_err(|err| warn!(target: "tanya::query", error = %err, "query failed"))?;

        let sources = score_sources(query, documents, self.config.confidence);
        info!(
            target: "tanya::query",
            sources = sources.len(),
            answer_chars = answer.len(),
            "answer ready"
        );

        Ok(Some(self.latest.publish(SearchResult { answer, sources })))
    }

    /// Fetch the user's corpus and answer `query` against it.
    ///
    /// `project_id` narrows the corpus to one project. The corpus is fetched
    /// once per call and never cached.
    pub async fn ask(
        &self,
        user_id: &str,
        query: &str,
        project_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<SearchResult>>, DomainError> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(DomainError::validation("user id is required"));
        }

        let corpus = Arc::clone(&self.corpus);
        let owner = user_id.to_string();
        let mut documents = run_blocking(cancel, move || corpus.fetch_documents(&owner)).await?;

        if let Some(project) = project_id.map(str::trim).filter(|p| !p.is_empty()) {
            documents.retain(|doc| doc.project_id == project);
        }

        self.search_cancellable(query, &documents, cancel).await
    }
}

async fn run_blocking<T, F>(cancel: &CancellationToken, work: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    // nothing leaves the process once the caller has given up
    if cancel.is_cancelled() {
        return Err(DomainError::Cancelled);
    }
    let handle = task::spawn_blocking(work);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::Cancelled),
        joined = handle => joined
            .map_err(|err| DomainError::other(format!("blocking task failed: {err}")))?,
    }
}
