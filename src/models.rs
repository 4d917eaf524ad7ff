//! Core data models used throughout askdoc.
//!
//! These types represent the document text, chunks, chat messages, and
//! extracted events that flow through the question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extracted document text with page boundaries preserved.
///
/// The original pages are kept so chunk offsets can be mapped back to
/// 1-based page numbers. [`full_text`](Self::full_text) concatenates the
/// pages in order with no separator, matching how the text is chunked.
#[derive(Debug, Clone, Default)]
pub struct DocumentText {
    pages: Vec<String>,
}

impl DocumentText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// All pages concatenated in order.
    pub fn full_text(&self) -> String {
        self.pages.concat()
    }

    /// 1-based page containing the given char offset into [`full_text`](Self::full_text).
    ///
    /// Returns `None` when the offset lies past the end of the text.
    pub fn page_at_char(&self, offset: usize) -> Option<u32> {
        let mut seen = 0usize;
        for (i, page) in self.pages.iter().enumerate() {
            seen += page.chars().count();
            if offset < seen {
                return Some(i as u32 + 1);
            }
        }
        None
    }
}

/// A chunk of document text, the unit of retrieval.
///
/// `text` includes the overlap prefix carried over from the previous chunk;
/// `start_char` and `overlap_chars` locate the non-overlap content in the
/// source text so the original can be reconstructed exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub sequence_index: usize,
    /// Char offset of the non-overlap content in the source text.
    pub start_char: usize,
    /// Number of chars at the start of `text` duplicated from the previous chunk.
    pub overlap_chars: usize,
    /// 1-based page the content starts on, when page tracking is available.
    pub page: Option<u32>,
}

/// Summary of the document currently backing a session's index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub pages: u32,
    pub chunk_count: usize,
    pub indexed_at: DateTime<Utc>,
}

/// Chat message role.
///
/// The session transcript only ever holds `User` and `Assistant`; `System`
/// exists for the completion wire (extraction mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message, both the transcript entry and the completion
/// wire format (`{"role": ..., "content": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Risk level of an extracted event.
///
/// Serializes as lowercase English. [`parse`](Self::parse) additionally
/// accepts the Chinese labels the extraction prompt requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Parse a risk level from LLM output. Accepts `高`/`中`/`低` and
    /// `high`/`medium`/`low` (any case). Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "高" => Some(RiskLevel::High),
            "中" => Some(RiskLevel::Medium),
            "低" => Some(RiskLevel::Low),
            other => match other.to_ascii_lowercase().as_str() {
                "high" => Some(RiskLevel::High),
                "medium" => Some(RiskLevel::Medium),
                "low" => Some(RiskLevel::Low),
                _ => None,
            },
        }
    }
}

/// A structured risk event pulled out of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub event_name: String,
    pub risk_level: RiskLevel,
    /// Mitigating action, advisory limit of 20 chars (not enforced).
    pub key_action: String,
    /// 1-based source page, when the model reported one.
    pub page_ref: Option<u32>,
}

/// An answer to a question, with the retrieved passages that grounded it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<crate::index::ScoredChunk>,
}
