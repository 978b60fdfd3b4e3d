//! Hybrid retriever: dense + sparse search fused into one ranking.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use word_core::{
    Corpus, Document, Embedder, FusedResult, RankedHit, Result, RetrievalConfig, Tokenizer,
    WordError,
};

use crate::dense::DenseIndex;
use crate::fusion::{fuse, normalize_weights, top_k};
use crate::sparse::{Bm25Index, KoreanTokenizer};

/// Everything one retrieval produced, in pipeline order.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// The query as given.
    pub query: String,

    /// Dense retriever hits.
    pub dense: Vec<RankedHit>,

    /// Sparse retriever hits.
    pub sparse: Vec<RankedHit>,

    /// Fused ranking, already cut to `top_k`.
    pub fused: Vec<FusedResult>,

    /// Wall-clock time spent retrieving.
    pub latency_ms: u64,
}

/// Index statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub documents: usize,
    pub dimension: usize,
    pub vocabulary_size: usize,
    pub average_doc_length: f32,
    pub fingerprint: String,
}

/// Both retrievers over one corpus, plus the fusion settings.
///
/// Built once at startup; every query after that is read-only, so a single
/// instance can serve concurrent callers.
pub struct HybridRetriever<E: ?Sized = dyn Embedder> {
    corpus: Arc<Corpus>,
    dense: DenseIndex,
    sparse: Bm25Index,
    embedder: Arc<E>,
    config: RetrievalConfig,
}

impl<E> HybridRetriever<E>
where
    E: Embedder + ?Sized,
{
    /// Index the corpus with the Korean analyzer, its lexicon extended with
    /// the corpus titles.
    pub async fn build(
        corpus: Arc<Corpus>,
        embedder: Arc<E>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let tokenizer = Arc::new(
            KoreanTokenizer::for_corpus(&corpus).with_compound_bigrams(config.compound_bigrams),
        );
        Self::build_with_tokenizer(corpus, embedder, tokenizer, config).await
    }

    /// Index the corpus with a caller-supplied analyzer.
    pub async fn build_with_tokenizer(
        corpus: Arc<Corpus>,
        embedder: Arc<E>,
        tokenizer: Arc<dyn Tokenizer>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        normalize_weights(&config.weights)?;
        if config.top_k == 0 {
            return Err(WordError::invalid_argument("top_k must be at least 1"));
        }

        let start = Instant::now();
        let dense = DenseIndex::build(&corpus, embedder.as_ref(), config.similarity).await?;
        let sparse = Bm25Index::build(&corpus, tokenizer, config.bm25);

        info!(
            "Hybrid retriever ready in {}ms ({} documents)",
            start.elapsed().as_millis(),
            corpus.len()
        );

        Ok(Self {
            corpus,
            dense,
            sparse,
            embedder,
            config,
        })
    }

    /// Run both retrievers concurrently, fuse and keep the top results.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        let start = Instant::now();

        info!("Retrieving for: {:?}", query);

        let (dense, sparse) = tokio::join!(
            self.dense
                .query(self.embedder.as_ref(), query, self.config.dense_k),
            async { Ok::<_, WordError>(self.sparse.query(query, self.config.sparse_k)) }
        );
        let dense = dense?;
        let sparse = sparse?;

        debug!(
            "Dense search returned {} results, sparse search returned {} results",
            dense.len(),
            sparse.len()
        );

        let fused = fuse(
            self.config.method,
            &dense,
            &sparse,
            self.config.weights,
            self.config.rrf_k,
        )?;
        let fused = top_k(fused, self.config.top_k);

        let latency_ms = start.elapsed().as_millis() as u64;

        info!(
            "Retrieval completed in {}ms, kept {} documents",
            latency_ms,
            fused.len()
        );

        Ok(Retrieval {
            query: query.to_string(),
            dense,
            sparse,
            fused,
            latency_ms,
        })
    }

    /// Resolve fused results to their documents, in fused order.
    pub fn documents(&self, fused: &[FusedResult]) -> Vec<&Document> {
        fused
            .iter()
            .filter_map(|f| self.corpus.get(f.document_id))
            .collect()
    }

    /// The indexed corpus.
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// The active retrieval settings.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.corpus.len(),
            dimension: self.dense.dimension(),
            vocabulary_size: self.sparse.vocabulary_size(),
            average_doc_length: self.sparse.average_doc_length(),
            fingerprint: self.corpus.fingerprint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use word_core::{FusionMethod, DEFAULT_CONTENT_TEMPLATE};

    /// One axis per known term; unknown text embeds to the last axis.
    struct AxisEmbedder {
        terms: Vec<&'static str>,
    }

    impl AxisEmbedder {
        fn embed(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0; self.terms.len() + 1];
            match self.terms.iter().position(|t| text.contains(t)) {
                Some(i) => v[i] = 1.0,
                None => v[self.terms.len()] = 1.0,
            }
            v
        }
    }

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| self.embed(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.embed(text))
        }

        fn dimension(&self) -> usize {
            self.terms.len() + 1
        }
    }

    fn corpus() -> Arc<Corpus> {
        let rows = [
            ("금리", "돈을 빌린 대가로 지불하는 이자율"),
            ("환율", "두 나라 화폐의 교환 비율"),
            ("물가", "상품과 서비스 가격의 평균 수준"),
            ("기준금리", "중앙은행이 정하는 정책 금리"),
        ];
        Arc::new(
            Corpus::new(
                rows.iter()
                    .enumerate()
                    .map(|(i, (t, b))| Document::new(i as u32, t, b, "", DEFAULT_CONTENT_TEMPLATE))
                    .collect(),
            )
            .unwrap(),
        )
    }

    async fn retriever(config: RetrievalConfig) -> HybridRetriever<AxisEmbedder> {
        let embedder = Arc::new(AxisEmbedder {
            terms: vec!["금리", "환율", "물가"],
        });
        HybridRetriever::build(corpus(), embedder, config).await.unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_fuses_both_lists() {
        let retriever = retriever(RetrievalConfig::default()).await;
        let retrieval = retriever.retrieve("금리가 뭐야?").await.unwrap();

        assert_eq!(retrieval.query, "금리가 뭐야?");
        assert!(retrieval.dense.len() <= 3);
        assert!(retrieval.sparse.len() <= 3);
        assert!(retrieval.fused.len() <= 3);
        assert!(!retrieval.fused.is_empty());

        // every fused document came from at least one list
        for f in &retrieval.fused {
            assert!(
                retrieval.dense.iter().any(|h| h.document_id == f.document_id)
                    || retrieval.sparse.iter().any(|h| h.document_id == f.document_id)
            );
        }
        for pair in retrieval.fused.windows(2) {
            assert!(pair[0].fused_score >= pair[1].fused_score);
        }

        let docs = retriever.documents(&retrieval.fused);
        assert_eq!(docs.len(), retrieval.fused.len());
        assert_eq!(docs[0].id, retrieval.fused[0].document_id);
    }

    #[tokio::test]
    async fn test_repeated_queries_identical() {
        let retriever = retriever(RetrievalConfig::default()).await;
        let a = retriever.retrieve("환율").await.unwrap();
        let b = retriever.retrieve("환율").await.unwrap();
        assert_eq!(a.fused, b.fused);
        assert_eq!(a.dense, b.dense);
        assert_eq!(a.sparse, b.sparse);
    }

    #[tokio::test]
    async fn test_top_k_respected() {
        let config = RetrievalConfig {
            top_k: 1,
            ..RetrievalConfig::default()
        };
        let retriever = retriever(config).await;
        let retrieval = retriever.retrieve("금리").await.unwrap();
        assert_eq!(retrieval.fused.len(), 1);
        assert_eq!(retrieval.fused[0].fused_rank, 1);
    }

    #[tokio::test]
    async fn test_rrf_method() {
        let config = RetrievalConfig {
            method: FusionMethod::Rrf,
            ..RetrievalConfig::default()
        };
        let retriever = retriever(config).await;
        let retrieval = retriever.retrieve("환율").await.unwrap();
        // 환율 is first in both lists
        assert_eq!(retrieval.fused[0].document_id, 1);
    }

    #[tokio::test]
    async fn test_invalid_weights_rejected() {
        let embedder = Arc::new(AxisEmbedder { terms: vec!["금리"] });
        let config = RetrievalConfig {
            weights: [0.0, 0.0],
            ..RetrievalConfig::default()
        };
        let result = HybridRetriever::build(corpus(), embedder, config).await;
        assert!(matches!(result, Err(WordError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_dyn_embedder_and_stats() {
        let embedder: Arc<dyn Embedder> = Arc::new(AxisEmbedder {
            terms: vec!["금리", "환율"],
        });
        let retriever: HybridRetriever =
            HybridRetriever::build(corpus(), embedder, RetrievalConfig::default())
                .await
                .unwrap();
        let stats = retriever.stats();
        assert_eq!(stats.documents, 4);
        assert_eq!(stats.dimension, 3);
        assert!(stats.vocabulary_size > 0);
        assert_eq!(stats.fingerprint, retriever.corpus().fingerprint());
    }
}
