//! Dense nearest-neighbor retrieval over document embeddings.

use tracing::{debug, info};

use word_core::{Corpus, DocumentId, Embedder, RankedHit, Result, Similarity, WordError};

use crate::sparse::by_score_then_id;

/// Exact (flat) vector index; the corpus is small enough to scan fully.
pub struct DenseIndex {
    /// doc id -> embedding
    vectors: Vec<Vec<f32>>,
    /// doc id -> L2 norm, precomputed for cosine
    norms: Vec<f32>,
    dimension: usize,
    similarity: Similarity,
}

impl DenseIndex {
    /// Embed every document's `content` and store the vectors by id.
    pub async fn build<E>(corpus: &Corpus, embedder: &E, similarity: Similarity) -> Result<Self>
    where
        E: Embedder + ?Sized,
    {
        let texts: Vec<&str> = corpus.iter().map(|d| d.content.as_str()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_documents(&texts).await?
        };

        let index = Self::from_vectors(vectors, similarity)?;
        if index.len() != corpus.len() {
            return Err(WordError::embedding(format!(
                "Expected {} document embeddings, got {}",
                corpus.len(),
                index.len()
            )));
        }

        info!(
            "Built dense index: {} documents, dim={}, similarity={:?}",
            index.len(),
            index.dimension,
            similarity
        );
        Ok(index)
    }

    /// Wrap precomputed vectors; position is the document id.
    pub fn from_vectors(vectors: Vec<Vec<f32>>, similarity: Similarity) -> Result<Self> {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some((id, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
            return Err(WordError::embedding(format!(
                "Document {} has dimension {}, expected {}",
                id,
                v.len(),
                dimension
            )));
        }

        let norms = vectors.iter().map(|v| l2_norm(v)).collect();
        Ok(Self {
            vectors,
            norms,
            dimension,
            similarity,
        })
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Embedding dimension (0 for an empty index).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `query` and return the `k` most similar documents.
    pub async fn query<E>(&self, embedder: &E, query: &str, k: usize) -> Result<Vec<RankedHit>>
    where
        E: Embedder + ?Sized,
    {
        let embedding = embedder.embed_query(query).await?;
        self.search_vector(&embedding, k)
    }

    /// Rank all documents by similarity to `embedding`, highest first.
    ///
    /// Ties go to the lower document id.
    pub fn search_vector(&self, embedding: &[f32], k: usize) -> Result<Vec<RankedHit>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimension {
            return Err(WordError::embedding(format!(
                "Query dimension {} does not match index dimension {}",
                embedding.len(),
                self.dimension
            )));
        }

        let query_norm = l2_norm(embedding);
        let mut scored: Vec<(DocumentId, f32)> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(id, (v, &norm))| {
                let dot = dot(embedding, v);
                let score = match self.similarity {
                    Similarity::InnerProduct => dot,
                    Similarity::Cosine if norm > 0.0 && query_norm > 0.0 => {
                        dot / (norm * query_norm)
                    }
                    Similarity::Cosine => 0.0,
                };
                (id as DocumentId, score)
            })
            .collect();

        scored.sort_by(by_score_then_id);
        scored.truncate(k);

        debug!("Dense search returned {} hits", scored.len());

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (document_id, score))| RankedHit {
                document_id,
                score,
                rank: i as u32 + 1,
            })
            .collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use word_core::{Document, DEFAULT_CONTENT_TEMPLATE};

    /// Embeds by looking the text up in a fixed table.
    struct TableEmbedder(Vec<(&'static str, Vec<f32>)>);

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.lookup(t)).collect()
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.lookup(text)
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    impl TableEmbedder {
        fn lookup(&self, text: &str) -> Result<Vec<f32>> {
            self.0
                .iter()
                .find(|(key, _)| text.contains(key))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| WordError::embedding(format!("unknown text {:?}", text)))
        }
    }

    fn corpus(titles: &[&str]) -> Corpus {
        Corpus::new(
            titles
                .iter()
                .enumerate()
                .map(|(i, t)| Document::new(i as u32, t, "", "", DEFAULT_CONTENT_TEMPLATE))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_and_query() {
        let embedder = TableEmbedder(vec![
            ("금리", vec![1.0, 0.0]),
            ("환율", vec![0.0, 1.0]),
            ("물가", vec![0.6, 0.8]),
            ("질문", vec![0.8, 0.6]),
        ]);
        let index = DenseIndex::build(&corpus(&["금리", "환율", "물가"]), &embedder, Similarity::Cosine)
            .await
            .unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), 2);

        let hits = index.query(&embedder, "질문", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, 2);
        assert_eq!(hits[1].document_id, 0);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
        assert!((hits[0].score - 0.96).abs() < 1e-5);
    }

    #[test]
    fn test_ties_broken_by_ascending_id() {
        let index = DenseIndex::from_vectors(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]],
            Similarity::Cosine,
        )
        .unwrap();
        let hits = index.search_vector(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<DocumentId> = hits.iter().map(|h| h.document_id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn test_inner_product_uses_magnitude() {
        let vectors = vec![vec![1.0, 0.0], vec![3.0, 0.1]];
        let cosine = DenseIndex::from_vectors(vectors.clone(), Similarity::Cosine).unwrap();
        let inner = DenseIndex::from_vectors(vectors, Similarity::InnerProduct).unwrap();
        assert_eq!(cosine.search_vector(&[1.0, 0.0], 1).unwrap()[0].document_id, 0);
        assert_eq!(inner.search_vector(&[1.0, 0.0], 1).unwrap()[0].document_id, 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = DenseIndex::from_vectors(vec![vec![1.0, 0.0]], Similarity::Cosine).unwrap();
        let err = index.search_vector(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert_eq!(err.error_code(), "EMBEDDING_ERROR");

        assert!(DenseIndex::from_vectors(vec![vec![1.0], vec![1.0, 2.0]], Similarity::Cosine).is_err());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let embedder = TableEmbedder(vec![("금리", vec![1.0, 0.0])]);
        let index = DenseIndex::build(&corpus(&["금리"]), &embedder, Similarity::Cosine)
            .await
            .unwrap();
        let err = index.query(&embedder, "unknown", 1).await.unwrap_err();
        assert!(matches!(err, WordError::Embedding { .. }));
    }

    #[test]
    fn test_empty_index() {
        let index = DenseIndex::from_vectors(Vec::new(), Similarity::Cosine).unwrap();
        assert!(index.search_vector(&[1.0], 3).unwrap().is_empty());
    }
}
