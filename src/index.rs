//! In-memory vector similarity index.
//!
//! [`SimilarityIndex`] stores chunks alongside their embedding vectors and
//! answers nearest-neighbor queries by brute-force cosine similarity. At the
//! scale this crate targets (one document, hundreds of chunks) an exhaustive
//! scan outperforms approximate structures and keeps results exact.
//!
//! Results are ordered by descending score; chunks with equal scores keep
//! their insertion order, so repeated queries over the same index return
//! identical rankings.

use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::models::Chunk;

/// A chunk returned from a similarity query, with its cosine score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Immutable index over one document's chunks and their vectors.
pub struct SimilarityIndex {
    dims: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    /// Build an index from chunks and their embedding vectors.
    ///
    /// # Panics
    ///
    /// Panics if `chunks` and `vectors` differ in length or any vector's
    /// dimensionality differs from `dims`. Callers embed the chunks they
    /// index, so a mismatch is a programming error, not a runtime condition.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, dims: usize) -> Self {
        assert_eq!(
            chunks.len(),
            vectors.len(),
            "chunk count must match vector count"
        );
        for vector in &vectors {
            assert_eq!(vector.len(), dims, "vector dimensionality mismatch");
        }

        Self {
            dims,
            chunks,
            vectors,
        }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimensionality this index was built with.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// `k` is clamped to the index size; an empty index yields an empty
    /// result. Equal scores preserve insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the index is non-empty and `query.len() != self.dims()`.
    pub fn query(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }
        assert_eq!(query.len(), self.dims, "query dimensionality mismatch");

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(self.vectors.iter())
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query, vector),
            })
            .collect();

        // sort_by is stable, so ties keep insertion order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k.min(scored.len()));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, sequence_index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            sequence_index,
            start_char: 0,
            overlap_chars: 0,
            page: None,
        }
    }

    fn index_of(vectors: Vec<Vec<f32>>) -> SimilarityIndex {
        let chunks = (0..vectors.len())
            .map(|i| chunk(&format!("chunk {i}"), i))
            .collect();
        SimilarityIndex::build(chunks, vectors, 2)
    }

    #[test]
    fn empty_index_returns_empty() {
        let index = SimilarityIndex::build(Vec::new(), Vec::new(), 2);
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn k_zero_returns_empty() {
        let index = index_of(vec![vec![1.0, 0.0]]);
        assert!(index.query(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn exact_match_ranks_first() {
        let index = index_of(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
        ]);

        let results = index.query(&[0.0, 1.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.sequence_index, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn k_clamped_to_index_size() {
        let index = index_of(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let results = index.query(&[1.0, 0.0], 10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        // Three identical vectors score identically against any query.
        let index = index_of(vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
        ]);

        let results = index.query(&[1.0, 0.0], 3);
        let order: Vec<usize> = results.iter().map(|r| r.chunk.sequence_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn repeated_queries_are_identical() {
        let index = index_of(vec![
            vec![0.9, 0.1],
            vec![0.5, 0.5],
            vec![0.1, 0.9],
        ]);

        let first = index.query(&[1.0, 0.0], 2);
        let second = index.query(&[1.0, 0.0], 2);

        let a: Vec<usize> = first.iter().map(|r| r.chunk.sequence_index).collect();
        let b: Vec<usize> = second.iter().map(|r| r.chunk.sequence_index).collect();
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "query dimensionality mismatch")]
    fn wrong_query_dims_panics() {
        let index = index_of(vec![vec![1.0, 0.0]]);
        index.query(&[1.0, 0.0, 0.0], 1);
    }

    #[test]
    #[should_panic(expected = "chunk count must match vector count")]
    fn build_rejects_mismatched_lengths() {
        SimilarityIndex::build(vec![chunk("a", 0)], Vec::new(), 2);
    }
}
