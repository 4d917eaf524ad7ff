//! Per-user session state.
//!
//! A [`Session`] owns one user's document index, document summary, and chat
//! transcript. It is passed explicitly into every pipeline call and mutated
//! only through its two write methods, so there is no ambient shared state;
//! independent sessions never touch each other.
//!
//! State transitions keep the last-good invariant: [`Session::replace_index`]
//! is called only after a new index is fully built, so a failed re-index
//! leaves the previous index intact.

use crate::index::SimilarityIndex;
use crate::models::{ChatMessage, DocumentInfo};

/// One user's document, index, and conversation history.
#[derive(Default)]
pub struct Session {
    index: Option<SimilarityIndex>,
    document: Option<DocumentInfo>,
    transcript: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly built index and its document summary, discarding
    /// any previous document wholesale.
    pub fn replace_index(&mut self, document: DocumentInfo, index: SimilarityIndex) {
        self.index = Some(index);
        self.document = Some(document);
    }

    /// Append one message to the transcript.
    pub fn append_message(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    pub fn index(&self) -> Option<&SimilarityIndex> {
        self.index.as_ref()
    }

    /// Summary of the currently indexed document, if any.
    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Conversation history, oldest first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }
}
