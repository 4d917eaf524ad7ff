//! Separator-priority text chunker with overlap.
//!
//! Splits document text into [`Chunk`]s no longer than `max_chars`,
//! preferring separator boundaries over hard cuts:
//!
//! 1. Split on the first configured separator present in the text, keeping
//!    each separator attached to the piece it terminates. Pieces still over
//!    the limit are re-split with the remaining lower-priority separators;
//!    when separators run out, fall back to a hard cut every `max_chars`.
//! 2. Greedily re-merge adjacent pieces while they fit within `max_chars`.
//! 3. Prefix every chunk after the first with up to `overlap_chars` of
//!    trailing context from the previous piece. The prefix is clamped so
//!    the finished chunk never exceeds `max_chars`.
//!
//! All sizes count Unicode scalar values, never bytes. Nothing is trimmed:
//! stripping each chunk's `overlap_chars` prefix and concatenating the
//! remainders reproduces the input exactly.

use crate::config::ChunkingConfig;
use crate::models::{Chunk, DocumentText};

/// Split text into overlapping chunks. Empty input yields no chunks.
///
/// # Panics
///
/// Panics if `config.max_chars` is zero ([`load_config`](crate::config::load_config)
/// rejects such configs).
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    assert!(config.max_chars > 0, "chunking.max_chars must be > 0");

    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    split_recursive(text, config.max_chars, &config.separators, &mut pieces);
    let merged = merge_pieces(pieces, config.max_chars);

    let mut chunks = Vec::with_capacity(merged.len());
    let mut start_char = 0usize;
    let mut prev: Option<&String> = None;

    for (i, content) in merged.iter().enumerate() {
        let content_chars = char_len(content);
        let overlap_take = match prev {
            Some(p) => config
                .overlap_chars
                .min(char_len(p))
                .min(config.max_chars.saturating_sub(content_chars)),
            None => 0,
        };

        let text = match prev {
            Some(p) if overlap_take > 0 => {
                let suffix = char_suffix(p, overlap_take);
                let mut t = String::with_capacity(suffix.len() + content.len());
                t.push_str(suffix);
                t.push_str(content);
                t
            }
            _ => content.clone(),
        };

        chunks.push(Chunk {
            text,
            sequence_index: i,
            start_char,
            overlap_chars: overlap_take,
            page: None,
        });

        start_char += content_chars;
        prev = Some(content);
    }

    chunks
}

/// Chunk a document and tag each chunk with the 1-based page its content
/// starts on.
pub fn chunk_document(doc: &DocumentText, config: &ChunkingConfig) -> Vec<Chunk> {
    let text = doc.full_text();
    let mut chunks = split_text(&text, config);
    for chunk in &mut chunks {
        chunk.page = doc.page_at_char(chunk.start_char);
    }
    chunks
}

/// Recursively split `text` into pieces of at most `max_chars` chars.
/// Pieces are contiguous spans of `text`; concatenating them restores it.
fn split_recursive<'a>(
    text: &'a str,
    max_chars: usize,
    separators: &[String],
    out: &mut Vec<&'a str>,
) {
    if char_len(text) <= max_chars {
        if !text.is_empty() {
            out.push(text);
        }
        return;
    }

    let found = separators
        .iter()
        .position(|s| !s.is_empty() && text.contains(s.as_str()));

    let Some(pos) = found else {
        hard_cut(text, max_chars, out);
        return;
    };

    // Lower-priority separators only, so a piece ending in this separator
    // cannot recurse onto itself.
    let rest = &separators[pos + 1..];
    for piece in text.split_inclusive(separators[pos].as_str()) {
        if char_len(piece) <= max_chars {
            out.push(piece);
        } else {
            split_recursive(piece, max_chars, rest, out);
        }
    }
}

/// Cut `text` every `max_chars` chars on char boundaries.
fn hard_cut<'a>(text: &'a str, max_chars: usize, out: &mut Vec<&'a str>) {
    let mut rest = text;
    while !rest.is_empty() {
        let end = byte_index_at_char(rest, max_chars);
        out.push(&rest[..end]);
        rest = &rest[end..];
    }
}

/// Greedily concatenate adjacent pieces while the result stays within
/// `max_chars`. Every input piece is already within the limit.
fn merge_pieces(pieces: Vec<&str>, max_chars: usize) -> Vec<String> {
    let mut merged = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for piece in pieces {
        let piece_chars = char_len(piece);
        if buf_chars > 0 && buf_chars + piece_chars > max_chars {
            merged.push(std::mem::take(&mut buf));
            buf_chars = 0;
        }
        buf.push_str(piece);
        buf_chars += piece_chars;
    }

    if !buf.is_empty() {
        merged.push(buf);
    }

    merged
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `chars`-th char, or the string length when shorter.
fn byte_index_at_char(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// The last `n` chars of `s` (all of `s` when it has fewer).
fn char_suffix(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let start = s
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chars: usize, overlap_chars: usize, separators: &[&str]) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Strip overlap prefixes and concatenate; must reproduce the input.
    fn reconstruct(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| {
                let start = byte_index_at_char(&c.text, c.overlap_chars);
                c.text[start..].to_string()
            })
            .collect()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = split_text("", &ChunkingConfig::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = split_text("Hello, world!", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].overlap_chars, 0);
    }

    #[test]
    fn sentence_split_with_overlap_exact_output() {
        let chunks = split_text("A. B. C.", &config(4, 1, &["."]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A.", ". B.", ". C."]);
        assert_eq!(chunks[0].overlap_chars, 0);
        assert_eq!(chunks[1].overlap_chars, 1);
        assert_eq!(chunks[2].overlap_chars, 1);
        assert_eq!(chunks[1].start_char, 2);
        assert_eq!(chunks[2].start_char, 5);
    }

    #[test]
    fn chunks_never_exceed_max_chars() {
        let text = "One two three four five six seven eight nine ten. \
                    Eleven twelve thirteen fourteen fifteen.\n\n\
                    Sixteen seventeen eighteen nineteen twenty.";
        for max in [5, 8, 13, 40] {
            let chunks = split_text(&text.repeat(3), &config(max, 2, &["\n\n", ".", " "]));
            for c in &chunks {
                assert!(
                    char_len(&c.text) <= max,
                    "chunk {:?} exceeds max {}",
                    c.text,
                    max
                );
            }
        }
    }

    #[test]
    fn overlap_never_exceeds_configured_value() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        for overlap in [0, 1, 3, 7] {
            let chunks = split_text(text, &config(12, overlap, &[" "]));
            for c in &chunks {
                assert!(c.overlap_chars <= overlap);
            }
            assert_eq!(chunks[0].overlap_chars, 0);
        }
    }

    #[test]
    fn reconstruction_is_exact() {
        let inputs = [
            "A. B. C.".to_string(),
            "para one\n\npara two\n\npara three with more text".to_string(),
            "第一句。第二句。第三句话比较长一些。".to_string(),
            "no separators at all just one long run of letters".to_string(),
            "x".repeat(137),
        ];
        for text in &inputs {
            for (max, overlap) in [(4, 1), (10, 3), (25, 5), (500, 50)] {
                let chunks = split_text(text, &config(max, overlap, &["\n\n", "。", ".", " "]));
                assert_eq!(
                    &reconstruct(&chunks),
                    text,
                    "reconstruction failed for max={} overlap={}",
                    max,
                    overlap
                );
            }
        }
    }

    #[test]
    fn hard_cut_when_no_separator_applies() {
        let chunks = split_text("abcdefgh", &config(3, 0, &["."]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn full_width_chunks_get_no_overlap_room() {
        // Hard-cut pieces already fill max_chars, so the overlap prefix is
        // clamped to zero rather than overflowing the limit.
        let chunks = split_text("abcdefgh", &config(3, 2, &[]));
        for c in &chunks {
            assert!(char_len(&c.text) <= 3);
        }
        assert_eq!(reconstruct(&chunks), "abcdefgh");
    }

    #[test]
    fn separator_priority_prefers_paragraph_breaks() {
        let text = "one two\n\nthree four";
        let chunks = split_text(text, &config(10, 0, &["\n\n", " "]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["one two\n\n", "three four"]);
    }

    #[test]
    fn falls_through_to_lower_priority_separator() {
        // No paragraph break present; the space separator does the work.
        let text = "aaaa bbbb cccc";
        let chunks = split_text(text, &config(5, 0, &["\n\n", " "]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa ", "bbbb ", "cccc"]);
    }

    #[test]
    fn multibyte_text_counts_chars_not_bytes() {
        let chunks = split_text("你好。世界。再见。", &config(4, 1, &["。"]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["你好。", "。世界。", "。再见。"]);
        for c in &chunks {
            assert!(char_len(&c.text) <= 4);
        }
    }

    #[test]
    fn merge_packs_small_pieces_together() {
        let text = "a. b. c. d.";
        let chunks = split_text(text, &config(500, 50, &["."]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn sequence_indices_are_contiguous() {
        let text = (0..40).map(|i| format!("word{i} ")).collect::<String>();
        let chunks = split_text(&text, &config(15, 4, &[" "]));
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.sequence_index, i);
        }
    }

    #[test]
    fn deterministic_output() {
        let text = "Alpha beta. Gamma delta.\n\nEpsilon zeta eta.";
        let cfg = config(12, 3, &["\n\n", ".", " "]);
        let a = split_text(text, &cfg);
        let b = split_text(text, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_document_assigns_pages() {
        let doc = DocumentText::new(vec![
            "page one text.".to_string(),
            "page two text.".to_string(),
        ]);
        let chunks = chunk_document(&doc, &config(15, 0, &["."]));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, Some(1));
        assert_eq!(chunks[1].page, Some(2));
    }

    #[test]
    fn chunk_document_single_page() {
        let doc = DocumentText::new(vec!["short".to_string()]);
        let chunks = chunk_document(&doc, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, Some(1));
    }
}
