//! Pipeline-level error type.
//!
//! Each pipeline stage has its own error enum colocated with its module
//! ([`ExtractError`](crate::extract::ExtractError),
//! [`EmbeddingError`](crate::embedding::EmbeddingError),
//! [`CompletionError`](crate::completion::CompletionError),
//! [`SchemaError`](crate::events::SchemaError)). [`PipelineError`] is the
//! boundary type returned from user actions (index, ask, extract).
//!
//! Two taxonomy entries resolve to non-errors: chunking is total and has no
//! error type, and querying an empty index returns empty results. Asking or
//! extracting before any document has been indexed is the distinct
//! [`PipelineError::NoDocumentIndexed`] state, reported before any provider
//! call is made.

use thiserror::Error;

use crate::completion::CompletionError;
use crate::embedding::EmbeddingError;
use crate::events::SchemaError;
use crate::extract::ExtractError;

/// Error returned from a pipeline user action.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ask or extract was called on a session with no indexed document.
    #[error("no document has been indexed yet")]
    NoDocumentIndexed,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
