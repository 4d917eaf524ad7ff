//! Mock providers for tests.
//!
//! Deterministic in-process stand-ins for the embedding provider and the
//! completion client, so pipeline behavior can be tested without a network.
//! Both record their calls and can be scripted with responses and errors;
//! clones share state, so a handle kept by the test observes calls made
//! through the pipeline's `Arc`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::completion::{CompletionClient, CompletionError};
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::ChatMessage;

/// Deterministic embedding provider.
///
/// Maps each text to a character-histogram vector: every char increments
/// the bucket at `char as usize % dims`. Identical texts always embed
/// identically, and texts sharing characters score higher under cosine
/// similarity, which is enough for retrieval-order assertions.
#[derive(Clone)]
pub struct MockEmbeddingProvider {
    dims: usize,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    errors: Arc<Mutex<VecDeque<String>>>,
}

impl MockEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            batches: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue a failure for the next `embed_batch` call.
    pub fn add_error(&self, message: &str) {
        self.errors.lock().unwrap().push_back(message.to_string());
    }

    /// Number of `embed_batch` calls made, including failed ones.
    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Every batch of texts passed to `embed_batch`, in call order.
    pub fn recorded_batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for ch in text.chars() {
            vector[ch as usize % self.dims] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn model_name(&self) -> &str {
        "mock"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.lock().unwrap().push(texts.to_vec());

        if let Some(message) = self.errors.lock().unwrap().pop_front() {
            return Err(EmbeddingError::Network(message));
        }

        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Scripted completion client.
///
/// Responses and errors are consumed in the order they were added. Every
/// call is recorded with its messages and temperature for assertion.
#[derive(Clone, Default)]
pub struct MockCompletionClient {
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<(Vec<ChatMessage>, Option<f32>)>>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn add_response(&self, text: &str) {
        self.script.lock().unwrap().push_back(Ok(text.to_string()));
    }

    /// Queue a transport failure.
    pub fn add_error(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Number of `complete` calls made.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every `(messages, temperature)` pair passed to `complete`, in call
    /// order.
    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, Option<f32>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<String, CompletionError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), temperature));

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(CompletionError::Network(message)),
            None => Err(CompletionError::Network(
                "no scripted response left".to_string(),
            )),
        }
    }
}
