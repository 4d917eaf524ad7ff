//! Pipeline orchestration.
//!
//! [`Pipeline`] wires the stages together and exposes the three user
//! actions: [`index_document`](Pipeline::index_document),
//! [`ask`](Pipeline::ask), and
//! [`extract_events`](Pipeline::extract_events). It holds the configuration
//! and the provider/client handles; all per-user state lives in the
//! [`Session`] passed into each call, so one `Pipeline` serves any number
//! of independent sessions.
//!
//! Failure never corrupts session state. A session is only mutated after
//! the operation that feeds it has fully succeeded: a failed re-index keeps
//! the previous index, a failed ask appends nothing to the transcript.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::chunk::chunk_document;
use crate::completion::{CompletionClient, HttpCompletionClient};
use crate::config::Config;
use crate::embedding::{self, EmbeddingError, EmbeddingProvider};
use crate::error::PipelineError;
use crate::events;
use crate::extract::extract_document;
use crate::index::SimilarityIndex;
use crate::models::{Answer, ChatMessage, DocumentInfo, ExtractedEvent};
use crate::prompt::{self, EXTRACTION_QUERY, EXTRACTION_TOP_K};
use crate::session::Session;

/// The document question-answering pipeline.
pub struct Pipeline {
    config: Config,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionClient>,
}

impl Pipeline {
    /// Build a pipeline from explicit provider and client handles.
    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            config,
            embedder,
            completer,
        }
    }

    /// Build a pipeline with the providers named in the configuration.
    pub fn from_config(config: Config) -> Result<Self, PipelineError> {
        let embedder = embedding::create_provider(&config.embedding)?;
        let completer: Arc<dyn CompletionClient> =
            Arc::new(HttpCompletionClient::new(&config.completion)?);
        Ok(Self::new(config, embedder, completer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract, chunk, embed, and index a document, then install the new
    /// index on the session.
    ///
    /// The session is untouched until the index is fully built, so a
    /// failure at any stage leaves a previously indexed document usable.
    pub async fn index_document(
        &self,
        session: &mut Session,
        name: &str,
        bytes: &[u8],
    ) -> Result<DocumentInfo, PipelineError> {
        info!(name, size_bytes = bytes.len(), "indexing document");

        let doc = extract_document(bytes)?;
        let chunks = chunk_document(&doc, &self.config.chunking);

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let batch_size = self.config.embedding.batch_size.max(1);
        let dims = self.config.embedding.dims;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            vectors.extend(self.embedder.embed_batch(batch).await?);
        }

        // A provider/config dims mismatch is a runtime condition, caught
        // here rather than tripping the index builder's precondition.
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(EmbeddingError::InvalidResponse(format!(
                "provider returned {}-dim vectors, configuration says {}",
                bad.len(),
                dims
            ))
            .into());
        }

        let chunk_count = chunks.len();
        let index = SimilarityIndex::build(chunks, vectors, dims);

        let info = DocumentInfo {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            size_bytes: bytes.len() as u64,
            sha256: format!("{:x}", Sha256::digest(bytes)),
            pages: doc.page_count() as u32,
            chunk_count,
            indexed_at: chrono::Utc::now(),
        };

        session.replace_index(info.clone(), index);
        info!(pages = info.pages, chunks = chunk_count, "document indexed");
        Ok(info)
    }

    /// Answer a question against the session's indexed document.
    ///
    /// Retrieves the configured top-k passages, builds the Q&A prompt, and
    /// requests a completion. On success the question and answer are
    /// appended to the transcript as a pair; the answer carries its source
    /// passages for citation rendering.
    ///
    /// Returns [`PipelineError::NoDocumentIndexed`] without contacting any
    /// provider when the session has no index.
    pub async fn ask(
        &self,
        session: &mut Session,
        question: &str,
    ) -> Result<Answer, PipelineError> {
        let index = session.index().ok_or(PipelineError::NoDocumentIndexed)?;

        info!(question_chars = question.len(), "answering question");

        let query_vector = embedding::embed_one(self.embedder.as_ref(), question).await?;
        let sources = index.query(&query_vector, self.config.retrieval.top_k);

        let messages = vec![ChatMessage::user(prompt::qa_prompt(&sources, question))];
        let text = self.completer.complete(&messages, None).await?;

        session.append_message(ChatMessage::user(question));
        session.append_message(ChatMessage::assistant(text.clone()));

        info!(answer_chars = text.len(), sources = sources.len(), "question answered");
        Ok(Answer { text, sources })
    }

    /// Extract risk events from the session's indexed document.
    ///
    /// Retrieves a wide fixed-query context, requests a low-temperature
    /// completion, and parses the structured output with the bounded retry
    /// loop in [`crate::events`]. Each call recomputes from scratch; the
    /// result is not stored on the session.
    ///
    /// Returns [`PipelineError::NoDocumentIndexed`] without contacting any
    /// provider when the session has no index.
    pub async fn extract_events(
        &self,
        session: &Session,
    ) -> Result<Vec<ExtractedEvent>, PipelineError> {
        let index = session.index().ok_or(PipelineError::NoDocumentIndexed)?;

        info!("extracting risk events");

        let query_vector = embedding::embed_one(self.embedder.as_ref(), EXTRACTION_QUERY).await?;
        let context = index.query(&query_vector, EXTRACTION_TOP_K);

        let messages = prompt::extraction_messages(&context);
        let extracted = events::extract_with_retry(self.completer.as_ref(), &messages).await?;

        info!(events = extracted.len(), "extraction complete");
        Ok(extracted)
    }
}
