//! BM25 Okapi index over the corpus.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use word_core::{Bm25Config, Corpus, DocumentId, RankedHit, Tokenizer};

/// A single entry in a term's postings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocumentId,
    /// Occurrences of the term in this document.
    pub term_frequency: u32,
}

/// Immutable inverted index with the statistics BM25 needs.
pub struct Bm25Index {
    tokenizer: Arc<dyn Tokenizer>,
    params: Bm25Config,
    /// term -> postings, ordered by doc id
    postings: HashMap<String, Vec<Posting>>,
    /// doc id -> number of tokens
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
}

impl Bm25Index {
    /// Tokenize every document's `content` and build the index.
    pub fn build(corpus: &Corpus, tokenizer: Arc<dyn Tokenizer>, params: Bm25Config) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut total_length: u64 = 0;

        for doc in corpus.iter() {
            let tokens = tokenizer.tokenize(&doc.content);
            doc_lengths.push(tokens.len() as u32);
            total_length += tokens.len() as u64;

            let mut tf_map: HashMap<&str, u32> = HashMap::new();
            for token in &tokens {
                *tf_map.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in tf_map {
                postings.entry(term.to_string()).or_default().push(Posting {
                    doc_id: doc.id,
                    term_frequency: tf,
                });
            }
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            total_length as f32 / doc_lengths.len() as f32
        };

        info!(
            "Built BM25 index: {} documents, {} terms, avgdl={:.1}",
            doc_lengths.len(),
            postings.len(),
            avg_doc_length
        );

        Self {
            tokenizer,
            params,
            postings,
            doc_lengths,
            avg_doc_length,
        }
    }

    /// Number of indexed documents.
    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Number of distinct terms.
    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    /// Average document length in tokens.
    pub fn average_doc_length(&self) -> f32 {
        self.avg_doc_length
    }

    /// Postings for a term, if indexed.
    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    /// Rank documents against `query`.
    ///
    /// Only documents sharing at least one term with the query are returned,
    /// so the result may hold fewer than `k` hits. Ties go to the lower id.
    pub fn query(&self, query: &str, k: usize) -> Vec<RankedHit> {
        let query_tokens = self.tokenizer.tokenize(query);
        if query_tokens.is_empty() || self.doc_lengths.is_empty() || k == 0 {
            return Vec::new();
        }

        let n = self.doc_lengths.len() as f32;
        let Bm25Config { k1, b } = self.params;

        let mut scores: HashMap<DocumentId, f32> = HashMap::new();
        for token in &query_tokens {
            let Some(postings) = self.postings.get(token) else {
                continue;
            };
            let df = postings.len() as f32;
            // IDF: ln((N - df + 0.5) / (df + 0.5) + 1), never negative
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                let dl = self.doc_lengths[posting.doc_id as usize] as f32;
                let tf = posting.term_frequency as f32;
                let length_norm = if self.avg_doc_length > 0.0 {
                    1.0 - b + b * dl / self.avg_doc_length
                } else {
                    1.0
                };
                let tf_norm = (tf * (k1 + 1.0)) / (tf + k1 * length_norm);
                *scores.entry(posting.doc_id).or_insert(0.0) += idf * tf_norm;
            }
        }

        let mut ranked: Vec<(DocumentId, f32)> =
            scores.into_iter().filter(|(_, score)| *score > 0.0).collect();
        ranked.sort_by(by_score_then_id);
        ranked.truncate(k);

        debug!(
            "BM25 query {:?}: {} tokens, {} hits",
            query,
            query_tokens.len(),
            ranked.len()
        );

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, (document_id, score))| RankedHit {
                document_id,
                score,
                rank: i as u32 + 1,
            })
            .collect()
    }
}

/// Descending score, ascending id.
pub(crate) fn by_score_then_id(a: &(DocumentId, f32), b: &(DocumentId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::KoreanTokenizer;
    use word_core::{Document, DEFAULT_CONTENT_TEMPLATE};

    fn corpus(rows: &[(&str, &str)]) -> Corpus {
        Corpus::new(
            rows.iter()
                .enumerate()
                .map(|(i, (title, body))| {
                    Document::new(i as u32, title, body, "", DEFAULT_CONTENT_TEMPLATE)
                })
                .collect(),
        )
        .unwrap()
    }

    fn index(rows: &[(&str, &str)]) -> Bm25Index {
        let corpus = corpus(rows);
        let tokenizer = Arc::new(KoreanTokenizer::for_corpus(&corpus));
        Bm25Index::build(&corpus, tokenizer, Bm25Config::default())
    }

    fn ids(hits: &[RankedHit]) -> Vec<DocumentId> {
        hits.iter().map(|h| h.document_id).collect()
    }

    #[test]
    fn test_empty_query() {
        let idx = index(&[("금리", "이자율")]);
        assert!(idx.query("", 3).is_empty());
        assert!(idx.query("?", 3).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let idx = index(&[]);
        assert!(idx.query("금리", 3).is_empty());
        assert_eq!(idx.average_doc_length(), 0.0);
    }

    #[test]
    fn test_finds_matching_docs_with_particles() {
        let idx = index(&[
            ("금리", "돈을 빌린 대가로 지불하는 이자율"),
            ("환율", "두 나라 화폐의 교환 비율"),
            ("기준금리", "중앙은행이 정하는 정책 금리"),
        ]);
        let hits = idx.query("금리가 오르면?", 3);
        let ids: Vec<DocumentId> = hits.iter().map(|h| h.document_id).collect();
        assert!(ids.contains(&0));
        assert!(ids.contains(&2));
        assert!(!ids.contains(&1), "no shared term with 환율");
    }

    #[test]
    fn test_single_syllable_title_matches_with_particle() {
        let idx = index(&[("빚", "갚아야 할 돈"), ("금리", "이자율")]);
        assert_eq!(ids(&idx.query("빚이 뭐야?", 3)), vec![0]);
        assert_eq!(ids(&idx.query("돈을 갚아야", 3)), vec![0]);
    }

    #[test]
    fn test_compound_titles_match_their_tails() {
        let idx = index(&[
            ("소비자물가", "가계가 사는 상품의 가격 변동"),
            ("총수요", "경제 전체의 지출 합계"),
        ]);
        assert_eq!(ids(&idx.query("물가", 3)), vec![0]);
        assert_eq!(ids(&idx.query("수요가 뭐야?", 3)), vec![1]);
        assert_eq!(ids(&idx.query("총수요", 3)), vec![1]);
    }

    #[test]
    fn test_unknown_compounds_match_without_lexicon() {
        let corpus = corpus(&[
            ("생산자물가", "생산 단계의 가격"),
            ("유효수요", "구매력이 있는 수요"),
        ]);
        let idx = Bm25Index::build(
            &corpus,
            Arc::new(KoreanTokenizer::new()),
            Bm25Config::default(),
        );
        assert_eq!(ids(&idx.query("물가", 3)), vec![0]);
        assert_eq!(ids(&idx.query("유효수요", 3))[0], 1);
    }

    #[test]
    fn test_no_padding_below_k() {
        let idx = index(&[("금리", "이자율"), ("환율", "교환 비율"), ("물가", "가격 수준")]);
        let hits = idx.query("환율", 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 1);
        assert_eq!(hits[0].rank, 1);
    }

    #[test]
    fn test_ranks_strictly_increasing() {
        let idx = index(&[
            ("금리", "금리 금리 금리"),
            ("금리 인상", "금리"),
            ("물가", "금리 영향"),
        ]);
        let hits = idx.query("금리", 3);
        assert_eq!(hits.len(), 3);
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.rank, i as u32 + 1);
            assert!(hit.score > 0.0);
        }
        assert_eq!(hits[0].document_id, 0, "higher term frequency ranks first");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_ties_broken_by_ascending_id() {
        let idx = index(&[("환율", "비율"), ("금리", "이자"), ("환율", "비율")]);
        let hits = idx.query("환율", 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, hits[1].score);
        assert_eq!(hits[0].document_id, 0);
        assert_eq!(hits[1].document_id, 2);
    }

    #[test]
    fn test_k_truncation() {
        let idx = index(&[("금리", "a"), ("금리", "b"), ("금리", "c"), ("금리", "d")]);
        assert_eq!(idx.query("금리", 2).len(), 2);
        assert!(idx.query("금리", 0).is_empty());
    }

    #[test]
    fn test_postings_statistics() {
        let idx = index(&[("금리", "금리 변동"), ("환율", "변동")]);
        assert_eq!(idx.doc_count(), 2);
        let postings = idx.postings("금리").unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].term_frequency, 2);
        assert_eq!(idx.postings("변동").unwrap().len(), 2);
    }
}
